use async_trait::async_trait;
use http::{Method, StatusCode};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE};
use serde::de::DeserializeOwned;
use url::Url;

use crate::cluster::Cluster;
use crate::digest::{self, Challenge};
use crate::errors::{ApiErrorBody, AtlasError};
use crate::provider::Provider;
use crate::user::DatabaseUser;

const PUBLIC_API_PATH: &str = "/api/atlas/v1.0";
const PRIVATE_API_PATH: &str = "/api/private/unauth";

// The HTTP client implements this; tests substitute an in-memory one.
#[async_trait]
pub trait AtlasApi: Send + Sync {
    async fn create_cluster(&self, cluster: Cluster) -> Result<Cluster, AtlasError>;
    async fn update_cluster(&self, cluster: Cluster) -> Result<Cluster, AtlasError>;
    async fn get_cluster(&self, name: &str) -> Result<Cluster, AtlasError>;
    async fn delete_cluster(&self, name: &str) -> Result<(), AtlasError>;

    async fn create_user(&self, user: DatabaseUser) -> Result<DatabaseUser, AtlasError>;
    async fn get_user(&self, name: &str) -> Result<DatabaseUser, AtlasError>;
    async fn delete_user(&self, name: &str) -> Result<(), AtlasError>;

    async fn get_provider(&self, name: &str) -> Result<Provider, AtlasError>;

    fn dashboard_url(&self, cluster_name: &str) -> String;
}

// Scoped to a single Atlas project. Construction is cheap; the broker
// builds one per inbound request from the platform's credentials.
pub struct AtlasClient {
    base_url: String,
    group_id: String,
    public_key: String,
    private_key: String,
    http: reqwest::Client,
}

impl AtlasClient {
    pub fn new(base_url: &str, group_id: &str, public_key: &str, private_key: &str) -> Self {
        AtlasClient {
            base_url: base_url.trim_end_matches('/').to_owned(),
            group_id: group_id.to_owned(),
            public_key: public_key.to_owned(),
            private_key: private_key.to_owned(),
            http: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn dashboard_url(&self, cluster_name: &str) -> String {
        format!(
            "{}/v2/{}#clusters/detail/{}",
            self.base_url, self.group_id, cluster_name
        )
    }

    pub(crate) async fn request_public<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<T, AtlasError> {
        let bytes = self.send(method, self.public_url(endpoint)?, body).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn request_public_empty(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(), AtlasError> {
        self.send(method, self.public_url(endpoint)?, body).await?;
        Ok(())
    }

    pub(crate) async fn request_private<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
    ) -> Result<T, AtlasError> {
        let url = Url::parse(&format!("{}{PRIVATE_API_PATH}/{endpoint}", self.base_url))?;
        let bytes = self.send(method, url, None).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn public_url(&self, endpoint: &str) -> Result<Url, AtlasError> {
        Ok(Url::parse(&format!(
            "{}{PUBLIC_API_PATH}/groups/{}/{endpoint}",
            self.base_url, self.group_id
        ))?)
    }

    // Runs the two-step digest exchange and returns the response body of
    // the authenticated request.
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, AtlasError> {
        // Step one: an unauthenticated request to obtain the challenge.
        let challenge_response = self
            .http
            .request(method.clone(), url.clone())
            .send()
            .await?;

        if challenge_response.status() != StatusCode::UNAUTHORIZED {
            return Err(AtlasError::BadChallenge(format!(
                "expected a 401 challenge, got {}",
                challenge_response.status()
            )));
        }

        let header = challenge_response
            .headers()
            .get(WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AtlasError::BadChallenge("missing WWW-Authenticate header".into()))?;
        let challenge = Challenge::parse(header)?;

        // The digest URI is the path with query, not the absolute URL.
        let uri = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_owned(),
        };
        let authorization = digest::authorization(
            &challenge,
            &self.public_key,
            &self.private_key,
            method.as_str(),
            &uri,
        );

        // Step two: the real request, answering the challenge.
        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, authorization)
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.bytes().await?.to_vec());
        }

        // A 401 at this point means the keypair itself was rejected.
        if status == StatusCode::UNAUTHORIZED {
            return Err(AtlasError::Unauthorized);
        }

        let body = response.bytes().await?;
        let error: ApiErrorBody = serde_json::from_slice(&body)?;
        Err(AtlasError::from_error_code(error.code, error.detail))
    }
}

#[async_trait]
impl AtlasApi for AtlasClient {
    async fn create_cluster(&self, cluster: Cluster) -> Result<Cluster, AtlasError> {
        AtlasClient::create_cluster(self, cluster).await
    }

    async fn update_cluster(&self, cluster: Cluster) -> Result<Cluster, AtlasError> {
        AtlasClient::update_cluster(self, cluster).await
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster, AtlasError> {
        AtlasClient::get_cluster(self, name).await
    }

    async fn delete_cluster(&self, name: &str) -> Result<(), AtlasError> {
        AtlasClient::delete_cluster(self, name).await
    }

    async fn create_user(&self, user: DatabaseUser) -> Result<DatabaseUser, AtlasError> {
        AtlasClient::create_user(self, user).await
    }

    async fn get_user(&self, name: &str) -> Result<DatabaseUser, AtlasError> {
        AtlasClient::get_user(self, name).await
    }

    async fn delete_user(&self, name: &str) -> Result<(), AtlasError> {
        AtlasClient::delete_user(self, name).await
    }

    async fn get_provider(&self, name: &str) -> Result<Provider, AtlasError> {
        AtlasClient::get_provider(self, name).await
    }

    fn dashboard_url(&self, cluster_name: &str) -> String {
        AtlasClient::dashboard_url(self, cluster_name)
    }
}
