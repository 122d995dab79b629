use spin_sdk::http::Response;
use std::fmt;

/// Domain-level failures raised by the graph/feed/reaction core.
#[derive(Debug)]
pub enum SocialError {
    SelfRelation,
    NotFound(String),
    Storage(String),
}

impl fmt::Display for SocialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SocialError::SelfRelation => write!(f, "You cannot follow/unfollow yourself."),
            SocialError::NotFound(what) => write!(f, "{} not found", what),
            SocialError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for SocialError {}

impl From<anyhow::Error> for SocialError {
    fn from(err: anyhow::Error) -> Self {
        SocialError::Storage(err.to_string())
    }
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Forbidden,
    NotFound(String),
    Conflict(String),
    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::Forbidden => write!(f, "Forbidden"),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::InternalError(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<SocialError> for ApiError {
    fn from(err: SocialError) -> Self {
        match err {
            SocialError::SelfRelation => {
                ApiError::BadRequest("You cannot follow/unfollow yourself.".to_string())
            }
            SocialError::NotFound(what) => ApiError::NotFound(format!("{} not found", what)),
            SocialError::Storage(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        let (status, msg) = match &err {
            ApiError::BadRequest(msg) => (400, msg.clone()),
            ApiError::Unauthorized => (401, "Unauthorized".to_string()),
            ApiError::Forbidden => (403, "Forbidden".to_string()),
            ApiError::NotFound(msg) => (404, msg.clone()),
            ApiError::Conflict(msg) => (409, msg.clone()),
            ApiError::InternalError(msg) => (500, msg.clone()),
        };
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .body(serde_json::to_vec(&serde_json::json!({ "error": msg })).unwrap())
            .build()
    }
}
