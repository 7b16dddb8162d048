use std::collections::HashMap;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::client::AtlasClient;
use crate::errors::AtlasError;

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    // The private options endpoint labels the provider `@provider`.
    #[serde(alias = "@provider")]
    pub name: String,
    #[serde(default)]
    pub instance_sizes: HashMap<String, InstanceSize>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct InstanceSize {
    pub name: String,
}

impl AtlasClient {
    pub async fn get_provider(&self, name: &str) -> Result<Provider, AtlasError> {
        self.request_private(Method::GET, &format!("cloudProviders/{name}/options"))
            .await
    }
}
