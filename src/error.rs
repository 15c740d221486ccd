use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Cet email est déjà utilisé")]
    EmailTaken,
    #[error("{0}")]
    Validation(String),
    /// Same message for unknown email and wrong password.
    #[error("Email ou mot de passe incorrect")]
    InvalidCredentials,
    #[error("Token manquant")]
    MissingToken,
    #[error("Token invalide ou expiré")]
    InvalidToken,
    #[error("Mot de passe actuel incorrect")]
    WrongCurrentPassword,
    #[error("Utilisateur non trouvé")]
    UserNotFound,
    #[error("Accès non autorisé")]
    Forbidden,

    #[error("{context}")]
    Unexpected {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl AppError {
    pub fn unexpected(context: &'static str, source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected {
            context,
            source: source.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::EmailTaken | Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidCredentials
            | Self::MissingToken
            | Self::InvalidToken
            | Self::WrongCurrentPassword => StatusCode::UNAUTHORIZED,
            Self::UserNotFound => StatusCode::NOT_FOUND,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Unexpected { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::Unexpected { context, source } => {
                error!(error = %source, "{}", context);
                ErrorBody {
                    message: context.to_string(),
                    error: Some(source.to_string()),
                }
            }
            other => ErrorBody {
                message: other.to_string(),
                error: None,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Attaches the operation's 500 message to any unexpected failure.
pub(crate) trait OrUnexpected<T> {
    fn or_unexpected(self, context: &'static str) -> Result<T, AppError>;
}

impl<T, E> OrUnexpected<T> for Result<T, E>
where
    E: Into<anyhow::Error>,
{
    fn or_unexpected(self, context: &'static str) -> Result<T, AppError> {
        self.map_err(|e| AppError::unexpected(context, e))
    }
}
