use std::str::FromStr;

use atlas::{AtlasApi, AtlasError, Cluster, ClusterState};
use serde::Deserialize;
use serde_json::Value;

use crate::compare;
use crate::errors::ApiError;
use crate::Broker;

// Handed to the platform on async operations and echoed back in
// last-operation polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Provision,
    Update,
    Deprovision,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Provision => "provision",
            Operation::Update => "update",
            Operation::Deprovision => "deprovision",
        }
    }
}

impl FromStr for Operation {
    type Err = ApiError;

    fn from_str(value: &str) -> Result<Self, ApiError> {
        match value {
            "provision" => Ok(Operation::Provision),
            "update" => Ok(Operation::Update),
            "deprovision" => Ok(Operation::Deprovision),
            other => Err(ApiError::InvalidParameters(format!(
                "unknown operation {other:?}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationState {
    Succeeded,
    InProgress,
    Failed,
}

impl OperationState {
    // OSB wire spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationState::Succeeded => "succeeded",
            OperationState::InProgress => "in progress",
            OperationState::Failed => "failed",
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProvisionDetails {
    pub service_id: String,
    pub plan_id: String,
    pub parameters: Option<Value>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UpdateDetails {
    pub service_id: String,
    // Only present when the platform wants the plan changed.
    pub plan_id: Option<String>,
    pub parameters: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProvisionedService {
    pub operation: Operation,
    pub dashboard_url: String,
    // True when an equivalent cluster already existed and no create was
    // issued; the API layer answers 200 instead of 202.
    pub already_exists: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdatedService {
    pub operation: Operation,
    pub dashboard_url: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeprovisionedService {
    pub operation: Operation,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LastOperation {
    pub state: OperationState,
}

// Keys inside `cluster` that the broker doesn't model pass through to
// Atlas, which validates them.
#[derive(Debug, Default, Deserialize)]
struct InstanceParameters {
    #[serde(default)]
    cluster: Option<Cluster>,
}

// Truncates an instance ID into a name Atlas accepts in every
// environment. A limit of 23 characters truncates UUIDs cleanly.
pub fn normalize_cluster_name(instance_id: &str) -> String {
    const MAX_NAME_LENGTH: usize = 23;
    instance_id.chars().take(MAX_NAME_LENGTH).collect()
}

impl Broker {
    // Creates a new Atlas cluster with the instance ID as its name. The
    // process is always async.
    pub async fn provision(
        &self,
        atlas: &dyn AtlasApi,
        instance_id: &str,
        details: &ProvisionDetails,
        async_allowed: bool,
    ) -> Result<ProvisionedService, ApiError> {
        tracing::info!(
            instance_id,
            service_id = %details.service_id,
            plan_id = %details.plan_id,
            "provisioning instance"
        );

        if !async_allowed {
            return Err(ApiError::AsyncRequired);
        }

        let desired = self.cluster_from_params(
            instance_id,
            &details.service_id,
            Some(&details.plan_id),
            details.parameters.as_ref(),
        )?;

        let existing = match atlas.get_cluster(&desired.name).await {
            Ok(existing) => existing,
            Err(AtlasError::ClusterNotFound) => {
                let created = atlas.create_cluster(desired).await.map_err(|err| {
                    tracing::error!(instance_id, error = %err, "failed to create Atlas cluster");
                    ApiError::from(err)
                })?;

                tracing::info!(instance_id, cluster = %created.name, "started Atlas cluster creation");

                return Ok(ProvisionedService {
                    operation: Operation::Provision,
                    dashboard_url: atlas.dashboard_url(&created.name),
                    already_exists: false,
                });
            }
            Err(err) => {
                tracing::error!(instance_id, error = %err, "failed to fetch existing cluster");
                return Err(err.into());
            }
        };

        // The name is taken. Equivalent clusters make the provision an
        // idempotent success; anything else is a conflict.
        if compare::clusters_match(&desired, &existing)? {
            tracing::info!(instance_id, "instance already provisioned with equivalent attributes");
            Ok(ProvisionedService {
                operation: Operation::Provision,
                dashboard_url: atlas.dashboard_url(&existing.name),
                already_exists: true,
            })
        } else {
            Err(ApiError::ConflictingInstance)
        }
    }

    pub async fn update(
        &self,
        atlas: &dyn AtlasApi,
        instance_id: &str,
        details: &UpdateDetails,
        async_allowed: bool,
    ) -> Result<UpdatedService, ApiError> {
        tracing::info!(instance_id, service_id = %details.service_id, "updating instance");

        if !async_allowed {
            return Err(ApiError::AsyncRequired);
        }

        // Atlas requires the provider name and instance size whenever any
        // provider setting is sent. The plan is absent from the OSB call
        // unless it changed, so missing values come from the live cluster.
        let existing = atlas
            .get_cluster(&normalize_cluster_name(instance_id))
            .await?;

        let mut cluster = self.cluster_from_params(
            instance_id,
            &details.service_id,
            details.plan_id.as_deref(),
            details.parameters.as_ref(),
        )?;

        if let (Some(settings), Some(current)) =
            (cluster.provider_settings.as_mut(), existing.provider_settings)
        {
            if settings.provider_name.is_empty() {
                settings.provider_name = current.provider_name;
            }
            if settings.instance_size_name.is_empty() {
                settings.instance_size_name = current.instance_size_name;
            }
        }

        let updated = atlas.update_cluster(cluster).await.map_err(|err| {
            tracing::error!(instance_id, error = %err, "failed to update Atlas cluster");
            ApiError::from(err)
        })?;

        tracing::info!(instance_id, cluster = %updated.name, "started Atlas cluster update");

        Ok(UpdatedService {
            operation: Operation::Update,
            dashboard_url: atlas.dashboard_url(&updated.name),
        })
    }

    pub async fn deprovision(
        &self,
        atlas: &dyn AtlasApi,
        instance_id: &str,
        async_allowed: bool,
    ) -> Result<DeprovisionedService, ApiError> {
        tracing::info!(instance_id, "deprovisioning instance");

        if !async_allowed {
            return Err(ApiError::AsyncRequired);
        }

        atlas
            .delete_cluster(&normalize_cluster_name(instance_id))
            .await
            .map_err(|err| {
                tracing::error!(instance_id, error = %err, "failed to delete Atlas cluster");
                ApiError::from(err)
            })?;

        tracing::info!(instance_id, "started Atlas cluster deletion");

        Ok(DeprovisionedService {
            operation: Operation::Deprovision,
        })
    }

    pub async fn last_operation(
        &self,
        atlas: &dyn AtlasApi,
        instance_id: &str,
        operation: Operation,
    ) -> Result<LastOperation, ApiError> {
        tracing::info!(instance_id, operation = operation.as_str(), "polling last operation");

        let result = atlas
            .get_cluster(&normalize_cluster_name(instance_id))
            .await;

        // Atlas reports finished deletions either as a missing cluster or
        // with a DELETED state; both mean the deprovision succeeded.
        if operation == Operation::Deprovision
            && matches!(result, Err(AtlasError::ClusterNotFound))
        {
            return Ok(LastOperation {
                state: OperationState::Succeeded,
            });
        }

        let cluster = result?;

        let state = match operation {
            Operation::Provision => match cluster.state_name {
                Some(ClusterState::Idle) => OperationState::Succeeded,
                Some(ClusterState::Creating) => OperationState::InProgress,
                _ => OperationState::Failed,
            },
            Operation::Deprovision => match cluster.state_name {
                Some(ClusterState::Deleted) => OperationState::Succeeded,
                Some(ClusterState::Deleting) => OperationState::InProgress,
                _ => OperationState::Failed,
            },
            Operation::Update => match cluster.state_name {
                Some(ClusterState::Idle) => OperationState::Succeeded,
                Some(ClusterState::Updating) => OperationState::InProgress,
                _ => OperationState::Failed,
            },
        };

        Ok(LastOperation { state })
    }

    // Builds the desired cluster from the instance ID, the referenced
    // plan, and the `cluster` parameter object. Plan-derived provider
    // settings fill in only where the caller left them unset.
    fn cluster_from_params(
        &self,
        instance_id: &str,
        service_id: &str,
        plan_id: Option<&str>,
        parameters: Option<&Value>,
    ) -> Result<Cluster, ApiError> {
        let params: InstanceParameters = match parameters {
            Some(value) => {
                serde_json::from_value(value.clone()).map_err(ApiError::invalid_params)?
            }
            None => InstanceParameters::default(),
        };

        let mut cluster = params.cluster.unwrap_or_default();

        if let Some(plan_id) = plan_id {
            let (provider, size) = self.catalog.find_provider_and_size(service_id, plan_id)?;

            let settings = cluster.provider_settings.get_or_insert_with(Default::default);
            if settings.provider_name.is_empty() {
                settings.provider_name = provider.to_owned();
            }
            if settings.instance_size_name.is_empty() {
                settings.instance_size_name = size.to_owned();
            }
        }

        cluster.name = normalize_cluster_name(instance_id);
        Ok(cluster)
    }
}
