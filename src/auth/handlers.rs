use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UpdateProfileRequest,
            UpdateProfileResponse, UserProfile,
        },
        extractors::AuthUser,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route("/profil", get(get_profile).put(update_profile))
        .route("/users", get(list_users))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = state.accounts.register(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Utilisateur créé avec succès",
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let session = state.accounts.login(payload).await?;
    Ok(Json(LoginResponse {
        message: "Connexion réussie",
        token: session.token,
        user: session.user,
    }))
}

#[instrument(skip(state, claims), fields(user_id = %claims.id))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserProfile>, AppError> {
    Ok(Json(state.accounts.get_profile(claims.id).await?))
}

#[instrument(skip(state, claims, payload), fields(user_id = %claims.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<UpdateProfileResponse>, AppError> {
    let user = state.accounts.update_profile(claims.id, payload).await?;
    Ok(Json(UpdateProfileResponse {
        message: "Profil mis à jour avec succès",
        user,
    }))
}

#[instrument(skip(state, claims), fields(user_id = %claims.id))]
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<UserProfile>>, AppError> {
    Ok(Json(state.accounts.list_users(claims.role).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::PublicUser;

    #[test]
    fn register_response_has_no_hash() {
        let response = RegisterResponse {
            message: "Utilisateur créé avec succès",
            user: PublicUser {
                id: uuid::Uuid::new_v4(),
                email: "a@x.com".to_string(),
                username: "A".to_string(),
            },
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["user"]["email"], "a@x.com");
        assert_eq!(json["user"]["username"], "A");
        assert_eq!(json["user"].as_object().unwrap().len(), 3);
    }
}
