use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::AtlasClient;
use crate::errors::AtlasError;

// All Atlas database users live in the `admin` database.
const USER_DATABASE: &str = "admin";

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseUser {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ldap_auth_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub roles: Vec<Role>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub role_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AtlasClient {
    // The authentication database is always `admin` regardless of what
    // the caller set. Atlas omits the password from its response, so the
    // submitted definition is returned as-is.
    pub async fn create_user(&self, mut user: DatabaseUser) -> Result<DatabaseUser, AtlasError> {
        user.database_name = USER_DATABASE.to_owned();
        let body = serde_json::to_vec(&user)?;
        self.request_public_empty(Method::POST, "databaseUsers", Some(body))
            .await?;
        Ok(user)
    }

    pub async fn get_user(&self, name: &str) -> Result<DatabaseUser, AtlasError> {
        self.request_public(Method::GET, &format!("databaseUsers/{USER_DATABASE}/{name}"), None)
            .await
    }

    pub async fn delete_user(&self, name: &str) -> Result<(), AtlasError> {
        self.request_public_empty(
            Method::DELETE,
            &format!("databaseUsers/{USER_DATABASE}/{name}"),
            None,
        )
        .await
    }
}
