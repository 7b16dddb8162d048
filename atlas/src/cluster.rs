use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::AtlasClient;
use crate::errors::AtlasError;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClusterState {
    Idle,
    Creating,
    Updating,
    Deleting,
    Deleted,
    Repairing,
    #[serde(other)]
    Unknown,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub enum ClusterType {
    #[serde(rename = "REPLICASET")]
    ReplicaSet,
    #[serde(rename = "SHARDED")]
    Sharded,
}

// Field names mirror the Atlas wire schema. Attributes not modeled here
// round-trip untouched through `extra`, and unset fields stay off the
// wire so Atlas applies its own defaults.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_settings: Option<ProviderSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_scaling: Option<AutoScaling>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bi_connector: Option<BiConnector>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_backup_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cluster_type: Option<ClusterType>,
    #[serde(rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<f64>,
    #[serde(rename = "mongoDBMajorVersion", skip_serializing_if = "Option::is_none")]
    pub mongo_db_major_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_shards: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encryption_at_rest_provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication_specs: Option<Vec<ReplicationSpec>>,
    // stateName and srvAddress are read-only, reported by Atlas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state_name: Option<ClusterState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub srv_address: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProviderSettings {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub provider_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub instance_size_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_provider_name: Option<String>,
    #[serde(rename = "diskIOPS", skip_serializing_if = "Option::is_none")]
    pub disk_iops: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_type_name: Option<String>,
    #[serde(rename = "encryptEBSVolume", skip_serializing_if = "Option::is_none")]
    pub encrypt_ebs_volume: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AutoScaling {
    #[serde(rename = "diskGBEnabled", skip_serializing_if = "Option::is_none")]
    pub disk_gb_enabled: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BiConnector {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_preference: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_shards: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions_config: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AtlasClient {
    pub async fn create_cluster(&self, cluster: Cluster) -> Result<Cluster, AtlasError> {
        let body = serde_json::to_vec(&cluster)?;
        self.request_public(Method::POST, "clusters", Some(body))
            .await
    }

    pub async fn update_cluster(&self, cluster: Cluster) -> Result<Cluster, AtlasError> {
        let endpoint = format!("clusters/{}", cluster.name);
        let body = serde_json::to_vec(&cluster)?;
        self.request_public(Method::PATCH, &endpoint, Some(body))
            .await
    }

    pub async fn get_cluster(&self, name: &str) -> Result<Cluster, AtlasError> {
        self.request_public(Method::GET, &format!("clusters/{name}"), None)
            .await
    }

    pub async fn delete_cluster(&self, name: &str) -> Result<(), AtlasError> {
        self.request_public_empty(Method::DELETE, &format!("clusters/{name}"), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_fields_round_trip() {
        let raw = json!({
            "name": "test-cluster",
            "backupEnabled": true,
            "diskSizeGB": 10.0,
            "mongoDBMajorVersion": "4.0",
            "pitEnabled": false,
            "providerSettings": {
                "providerName": "AWS",
                "instanceSizeName": "M10",
                "regionName": "EU_WEST_1",
                "autoScaling": {"compute": {"enabled": false}},
            },
            "replicationSpecs": [
                {
                    "numShards": 1,
                    "zoneName": "Zone 1",
                    "regionsConfig": {"EU_WEST_1": {"priority": 7}},
                },
            ],
        });

        let cluster: Cluster = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&cluster).unwrap(), raw);
    }

    #[test]
    fn unset_fields_stay_off_the_wire() {
        let cluster = Cluster {
            name: "test-cluster".into(),
            backup_enabled: Some(false),
            ..Default::default()
        };

        let value = serde_json::to_value(&cluster).unwrap();
        assert_eq!(value, json!({"name": "test-cluster", "backupEnabled": false}));
    }

    #[test]
    fn unrecognized_state_deserializes_as_unknown() {
        let cluster: Cluster =
            serde_json::from_value(json!({"name": "c", "stateName": "NEEDS_ATTENTION"})).unwrap();
        assert_eq!(cluster.state_name, Some(ClusterState::Unknown));
    }

    #[test]
    fn cluster_type_uses_atlas_names() {
        let cluster: Cluster =
            serde_json::from_value(json!({"name": "c", "clusterType": "REPLICASET"})).unwrap();
        assert_eq!(cluster.cluster_type, Some(ClusterType::ReplicaSet));
    }
}
