use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, warn};

/// Everything a request can fail with. Each variant is surfaced to the user as
/// a message page; none are retried.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserExists,

    #[error("Please fill in all required fields ({0} is missing)")]
    ValidationMissingField(&'static str),

    #[error("Invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("You do not have access to this page")]
    Forbidden,

    #[error("This event has reached its capacity")]
    EventFull,

    #[error("You are already registered for this event")]
    AlreadyRegistered,

    #[error("Registrations are closed for this event")]
    RegistrationsClosed,

    #[error("Export failed: {0}")]
    ExportFailure(String),

    #[error(transparent)]
    Template(#[from] minijinja::Error),

    #[error("Session error: {0}")]
    Session(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserExists
            | AppError::EventFull
            | AppError::AlreadyRegistered
            | AppError::RegistrationsClosed => StatusCode::CONFLICT,
            AppError::ValidationMissingField(_) | AppError::InvalidField { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ExportFailure(_) | AppError::Template(_) | AppError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn invalid(field: &'static str, reason: impl ToString) -> Self {
        AppError::InvalidField {
            field,
            reason: reason.to_string(),
        }
    }
}

/// Left on error responses so the router can render them as message pages.
#[derive(Debug, Clone)]
pub struct ErrorMessage(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("request failed: {:?}", self);
        } else {
            warn!("request rejected: {}", self);
        }

        let message = self.to_string();
        let mut response = (status, message.clone()).into_response();
        response.extensions_mut().insert(ErrorMessage(message));
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::UserExists.status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::ValidationMissingField("title").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(AppError::NotFound("Event").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::ExportFailure("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn responses_carry_the_message() {
        let response = AppError::invalid("title", "<script>").into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let message = response.extensions().get::<ErrorMessage>().unwrap();
        assert_eq!(message.0, "Invalid title: <script>");
    }
}
