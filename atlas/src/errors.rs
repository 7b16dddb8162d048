use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default, rename = "errorCode")]
    pub code: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(thiserror::Error, Debug)]
pub enum AtlasError {
    #[error("cluster not found")]
    ClusterNotFound,
    #[error("cluster already exists")]
    ClusterAlreadyExists,
    #[error("database user not found")]
    UserNotFound,
    #[error("database user already exists")]
    UserAlreadyExists,
    #[error("invalid API key")]
    Unauthorized,
    #[error("atlas error: [{code}] {detail}")]
    Api { code: String, detail: String },
    #[error("digest challenge error: {0}")]
    BadChallenge(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AtlasError {
    pub(crate) fn from_error_code(code: String, detail: String) -> Self {
        match code.as_str() {
            // Deletion can only be requested once; a second request means
            // the cluster is already on its way out.
            "CLUSTER_NOT_FOUND" | "CLUSTER_ALREADY_REQUESTED_DELETION" => {
                AtlasError::ClusterNotFound
            }
            "DUPLICATE_CLUSTER_NAME" => AtlasError::ClusterAlreadyExists,
            "USER_ALREADY_EXISTS" => AtlasError::UserAlreadyExists,
            "USER_NOT_FOUND" => AtlasError::UserNotFound,
            _ => AtlasError::Api { code, detail },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_error_codes_map_to_variants() {
        assert!(matches!(
            AtlasError::from_error_code("CLUSTER_NOT_FOUND".into(), String::new()),
            AtlasError::ClusterNotFound
        ));
        assert!(matches!(
            AtlasError::from_error_code("CLUSTER_ALREADY_REQUESTED_DELETION".into(), String::new()),
            AtlasError::ClusterNotFound
        ));
        assert!(matches!(
            AtlasError::from_error_code("DUPLICATE_CLUSTER_NAME".into(), String::new()),
            AtlasError::ClusterAlreadyExists
        ));
        assert!(matches!(
            AtlasError::from_error_code("USER_ALREADY_EXISTS".into(), String::new()),
            AtlasError::UserAlreadyExists
        ));
        assert!(matches!(
            AtlasError::from_error_code("USER_NOT_FOUND".into(), String::new()),
            AtlasError::UserNotFound
        ));
    }

    #[test]
    fn unknown_error_codes_pass_through() {
        let err = AtlasError::from_error_code("GROUP_NOT_FOUND".into(), "No group found".into());
        assert_eq!(err.to_string(), "atlas error: [GROUP_NOT_FOUND] No group found");
    }
}
