use shared::{
    domain::UserId,
    error::{ApiError, ErrorCode},
};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("transport failure: {message}")]
    Transport { message: String },
    #[error("not found: {detail}")]
    NotFound { detail: String },
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::NotFound {
            detail: detail.into(),
        }
    }
}

impl From<ApiError> for GatewayError {
    fn from(value: ApiError) -> Self {
        match value.code {
            ErrorCode::NotFound => Self::not_found(value.message),
            _ => Self::transport(value.to_string()),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(value: reqwest::Error) -> Self {
        Self::transport(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid API base url '{url}': {reason}")]
pub struct BaseUrlError {
    pub url: String,
    pub reason: String,
}

/// Rejected operator action. Nothing is sent when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("user {0} is not in the loaded user list")]
    UnknownUser(UserId),
    #[error("no user is selected")]
    NoUserSelected,
}
