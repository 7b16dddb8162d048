use atlas::{AtlasApi, DatabaseUser, Role};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::connection::{self, ConnectionStringParams};
use crate::errors::ApiError;
use crate::instances::normalize_cluster_name;
use crate::Broker;

// Returned to the platform when a binding is created. Credentials are
// handed out exactly once; the broker stores nothing.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionDetails {
    pub username: String,
    pub password: String,
    pub uri: String,
    pub connection_string: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Binding {
    pub credentials: ConnectionDetails,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct BindDetails {
    pub service_id: String,
    pub plan_id: String,
    pub parameters: Option<Value>,
}

// Unknown keys inside `user` pass through to Atlas, which validates
// them.
#[derive(Debug, Default, Deserialize)]
struct BindingParameters {
    #[serde(default)]
    user: Option<DatabaseUser>,
    #[serde(default, rename = "connectionString")]
    connection_string: Option<ConnectionStringParams>,
}

impl Broker {
    // Creates a database user with the binding ID as its username and a
    // generated password, and returns connection details for the cluster.
    pub async fn bind(
        &self,
        atlas: &dyn AtlasApi,
        instance_id: &str,
        binding_id: &str,
        details: &BindDetails,
    ) -> Result<Binding, ApiError> {
        tracing::info!(instance_id, binding_id, "creating binding");

        // The service and plan IDs must be valid per the OSB contract even
        // though bindings don't use them.
        self.catalog
            .find_provider_and_size(&details.service_id, &details.plan_id)?;

        let cluster = atlas
            .get_cluster(&normalize_cluster_name(instance_id))
            .await
            .map_err(|err| {
                tracing::error!(instance_id, error = %err, "failed to fetch existing cluster");
                ApiError::from(err)
            })?;

        let params: BindingParameters = match details.parameters.as_ref() {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(ApiError::invalid_params)?
            }
            None => BindingParameters::default(),
        };

        let password = generate_password()?;
        let user = atlas
            .create_user(user_from_params(binding_id, password, params.user))
            .await
            .map_err(|err| {
                tracing::error!(instance_id, binding_id, error = %err, "failed to create database user");
                ApiError::from(err)
            })?;

        tracing::info!(instance_id, binding_id, "created Atlas database user");

        let uri = cluster.srv_address.clone().ok_or_else(|| {
            ApiError::Internal(format!(
                "cluster {:?} has no SRV address yet",
                cluster.name
            ))
        })?;
        let connection_string = connection::build(
            &uri,
            &user.username,
            &user.password,
            &params.connection_string.unwrap_or_default(),
        )?;

        Ok(Binding {
            credentials: ConnectionDetails {
                username: user.username,
                password: user.password,
                uri,
                connection_string,
            },
        })
    }

    pub async fn unbind(
        &self,
        atlas: &dyn AtlasApi,
        instance_id: &str,
        binding_id: &str,
    ) -> Result<(), ApiError> {
        tracing::info!(instance_id, binding_id, "releasing binding");

        atlas
            .get_cluster(&normalize_cluster_name(instance_id))
            .await?;

        atlas.delete_user(binding_id).await.map_err(|err| {
            tracing::error!(instance_id, binding_id, error = %err, "failed to delete database user");
            ApiError::from(err)
        })?;

        tracing::info!(instance_id, binding_id, "deleted Atlas database user");
        Ok(())
    }
}

fn user_from_params(
    binding_id: &str,
    password: String,
    user: Option<DatabaseUser>,
) -> DatabaseUser {
    let mut user = user.unwrap_or_default();
    user.username = binding_id.to_owned();
    user.password = password;

    // No roles specified: default to read/write on any database, the
    // same default as users created through the Atlas UI.
    if user.roles.is_empty() {
        user.roles = vec![Role {
            role_name: "readWriteAnyDatabase".into(),
            database_name: "admin".into(),
            ..Default::default()
        }];
    }

    user
}

// 32 cryptographically random bytes, URL-safe base64 encoded for easy
// use in connection strings.
fn generate_password() -> Result<String, ApiError> {
    const PASSWORD_BYTES: usize = 32;

    let mut bytes = [0u8; PASSWORD_BYTES];
    OsRng.try_fill_bytes(&mut bytes).map_err(|err| {
        ApiError::Internal(format!("could not generate binding password: {err}"))
    })?;

    Ok(URL_SAFE.encode(bytes))
}
