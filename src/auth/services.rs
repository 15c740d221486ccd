use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, PublicUser, RegisterRequest, Session, UpdateProfileRequest, UserProfile},
        jwt::JwtKeys,
        password::{hash_password_blocking, verify_password_blocking},
        repo_types::{Role, User},
    },
    config::AdminSeed,
    error::{AppError, OrUnexpected},
    store::{StoreError, UserStore},
};

const REGISTER_FAILED: &str = "Erreur lors de l'inscription";
const LOGIN_FAILED: &str = "Erreur lors de la connexion";
const PROFILE_READ_FAILED: &str = "Erreur lors de la lecture du profil";
const PROFILE_UPDATE_FAILED: &str = "Erreur lors de la mise à jour du profil";
const LIST_FAILED: &str = "Erreur lors de la lecture des utilisateurs";

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

fn is_blank_username(name: &str) -> bool {
    name.trim().is_empty()
}

/// Owns the credential lifecycle: registration, login, profile access and the
/// admin listing. Talks to users only through the injected store.
#[derive(Clone)]
pub struct CredentialManager {
    store: Arc<dyn UserStore>,
    keys: JwtKeys,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn UserStore>, keys: JwtKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// A taken email is reported as `EmailTaken` before any field validation.
    pub async fn register(&self, req: RegisterRequest) -> Result<PublicUser, AppError> {
        if self
            .store
            .find_by_email(&req.email)
            .await
            .or_unexpected(REGISTER_FAILED)?
            .is_some()
        {
            warn!(email = %req.email, "email already registered");
            return Err(AppError::EmailTaken);
        }

        if !is_valid_email(&req.email) {
            warn!(email = %req.email, "invalid email");
            return Err(AppError::Validation("Email invalide".into()));
        }
        if req.password.is_empty() {
            return Err(AppError::Validation("Mot de passe requis".into()));
        }
        if is_blank_username(&req.username) {
            return Err(AppError::Validation("Nom d'utilisateur requis".into()));
        }

        let hash = hash_password_blocking(req.password)
            .await
            .or_unexpected(REGISTER_FAILED)?;

        let user = match self.store.insert(User::new(req.email, req.username, hash)).await {
            Ok(u) => u,
            Err(StoreError::DuplicateEmail) => {
                warn!("email registered concurrently");
                return Err(AppError::EmailTaken);
            }
            Err(e) => return Err(AppError::unexpected(REGISTER_FAILED, e)),
        };

        info!(user_id = %user.id, email = %user.email, "user registered");
        Ok(PublicUser::from(&user))
    }

    pub async fn login(&self, req: LoginRequest) -> Result<Session, AppError> {
        let user = match self
            .store
            .find_by_email(&req.email)
            .await
            .or_unexpected(LOGIN_FAILED)?
        {
            Some(u) => u,
            None => {
                warn!(email = %req.email, "login unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        let ok = verify_password_blocking(req.password, user.password_hash.clone())
            .await
            .or_unexpected(LOGIN_FAILED)?;
        if !ok {
            warn!(user_id = %user.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }

        let token = self.keys.sign(&user).or_unexpected(LOGIN_FAILED)?;

        info!(user_id = %user.id, email = %user.email, "user logged in");
        Ok(Session {
            token,
            user: PublicUser::from(&user),
        })
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Result<UserProfile, AppError> {
        self.store
            .find_by_id(user_id)
            .await
            .or_unexpected(PROFILE_READ_FAILED)?
            .map(UserProfile::from)
            .ok_or(AppError::UserNotFound)
    }

    /// A password change needs both `current_password` and `new_password`; if
    /// only one is given the password is left as is.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        req: UpdateProfileRequest,
    ) -> Result<UserProfile, AppError> {
        let mut user = self
            .store
            .find_by_id(user_id)
            .await
            .or_unexpected(PROFILE_UPDATE_FAILED)?
            .ok_or(AppError::UserNotFound)?;

        if let Some(username) = req.username.filter(|n| !is_blank_username(n)) {
            user.username = username;
        }

        if let (Some(current), Some(new)) =
            (non_empty(req.current_password), non_empty(req.new_password))
        {
            let ok = verify_password_blocking(current, user.password_hash.clone())
                .await
                .or_unexpected(PROFILE_UPDATE_FAILED)?;
            if !ok {
                warn!(user_id = %user.id, "wrong current password");
                return Err(AppError::WrongCurrentPassword);
            }
            user.password_hash = hash_password_blocking(new)
                .await
                .or_unexpected(PROFILE_UPDATE_FAILED)?;
            info!(user_id = %user.id, "password changed");
        }

        let updated = match self.store.update(user).await {
            Ok(u) => u,
            Err(StoreError::NotFound) => return Err(AppError::UserNotFound),
            Err(e) => return Err(AppError::unexpected(PROFILE_UPDATE_FAILED, e)),
        };
        Ok(UserProfile::from(updated))
    }

    pub async fn list_users(&self, role: Role) -> Result<Vec<UserProfile>, AppError> {
        if role != Role::Admin {
            return Err(AppError::Forbidden);
        }
        let users = self.store.list_all().await.or_unexpected(LIST_FAILED)?;
        Ok(users.into_iter().map(UserProfile::from).collect())
    }

    /// Creates the seeded admin account, or promotes it if it already exists.
    pub async fn ensure_admin(&self, seed: &AdminSeed) -> anyhow::Result<User> {
        match self.store.find_by_email(&seed.email).await? {
            Some(user) if user.role == Role::Admin => Ok(user),
            Some(user) => {
                let user = self.store.set_role(user.id, Role::Admin).await?;
                info!(user_id = %user.id, "user promoted to admin");
                Ok(user)
            }
            None => {
                let hash = hash_password_blocking(seed.password.clone()).await?;
                let mut user = User::new(seed.email.clone(), seed.username.clone(), hash);
                user.role = Role::Admin;
                let user = self.store.insert(user).await?;
                info!(user_id = %user.id, "admin account created");
                Ok(user)
            }
        }
    }
}
