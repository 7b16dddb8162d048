use atlas::AtlasError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

// Broker-level failures, translated into OSB HTTP responses by the API
// layer.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("instance does not exist")]
    InstanceDoesNotExist,
    #[error("instance already exists")]
    InstanceAlreadyExists,
    #[error("an instance with the same ID but different attributes already exists")]
    ConflictingInstance,
    #[error("binding does not exist")]
    BindingDoesNotExist,
    #[error("binding already exists")]
    BindingAlreadyExists,
    #[error("plan ID not in the catalog")]
    PlanNotFound,
    #[error("invalid API key")]
    Unauthorized,
    #[error("this service plan requires client support for asynchronous service operations")]
    AsyncRequired,
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("upstream request failed: {0}")]
    UpstreamTransport(#[source] AtlasError),
    #[error("{0}")]
    NotSupported(String),
    #[error("internal error: {0}")]
    Internal(String),
    // Atlas API errors the broker has no mapping for, rendered verbatim.
    #[error(transparent)]
    Atlas(AtlasError),
}

impl From<AtlasError> for ApiError {
    fn from(err: AtlasError) -> Self {
        match err {
            AtlasError::ClusterNotFound => ApiError::InstanceDoesNotExist,
            AtlasError::ClusterAlreadyExists => ApiError::InstanceAlreadyExists,
            AtlasError::UserNotFound => ApiError::BindingDoesNotExist,
            AtlasError::UserAlreadyExists => ApiError::BindingAlreadyExists,
            AtlasError::Unauthorized => ApiError::Unauthorized,
            AtlasError::BadChallenge(_)
            | AtlasError::InvalidUrl(_)
            | AtlasError::Transport(_)
            | AtlasError::Decode(_) => ApiError::UpstreamTransport(err),
            AtlasError::Api { .. } => ApiError::Atlas(err),
        }
    }
}

impl ApiError {
    pub(crate) fn invalid_params(err: serde_json::Error) -> Self {
        ApiError::InvalidParameters(err.to_string())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InstanceDoesNotExist | ApiError::BindingDoesNotExist => StatusCode::GONE,
            ApiError::InstanceAlreadyExists
            | ApiError::ConflictingInstance
            | ApiError::BindingAlreadyExists => StatusCode::CONFLICT,
            ApiError::PlanNotFound | ApiError::InvalidParameters(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::AsyncRequired => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UpstreamTransport(_) => StatusCode::BAD_GATEWAY,
            ApiError::NotSupported(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) | ApiError::Atlas(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::InstanceDoesNotExist => "InstanceDoesNotExist",
            ApiError::InstanceAlreadyExists => "InstanceAlreadyExists",
            ApiError::ConflictingInstance => "ConflictingInstance",
            ApiError::BindingDoesNotExist => "BindingDoesNotExist",
            ApiError::BindingAlreadyExists => "BindingAlreadyExists",
            ApiError::PlanNotFound => "PlanIDNotFound",
            ApiError::Unauthorized => "Unauthorized",
            ApiError::AsyncRequired => "AsyncRequired",
            ApiError::InvalidParameters(_) => "InvalidParameters",
            ApiError::UpstreamTransport(_) => "UpstreamTransport",
            ApiError::NotSupported(_) => "NotSupported",
            ApiError::Internal(_) => "InternalError",
            ApiError::Atlas(_) => "AtlasError",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    description: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            description: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
