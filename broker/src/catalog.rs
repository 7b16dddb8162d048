use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

pub const PROVIDER_NAMES: [&str; 4] = ["AWS", "GCP", "AZURE", "TENANT"];

// Allowed instance sizes per provider, loaded from a JSON file like
// {"AWS": ["M10", "M20"], "TENANT": ["M2", "M5"]}.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Whitelist(BTreeMap<String, Vec<String>>);

#[derive(thiserror::Error, Debug)]
pub enum WhitelistError {
    #[error("could not read whitelist file: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse whitelist file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid whitelist: unrecognized provider {0:?}")]
    UnrecognizedProvider(String),
}

impl Whitelist {
    pub fn from_file(path: &Path) -> Result<Self, WhitelistError> {
        let data = std::fs::read(path)?;
        let whitelist: Whitelist = serde_json::from_slice(&data)?;
        whitelist.validate()?;
        Ok(whitelist)
    }

    fn validate(&self) -> Result<(), WhitelistError> {
        for provider in self.0.keys() {
            if !PROVIDER_NAMES.contains(&provider.as_str()) {
                return Err(WhitelistError::UnrecognizedProvider(provider.clone()));
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Service {
    pub id: String,
    pub name: String,
    pub description: String,
    pub bindable: bool,
    pub instances_retrievable: bool,
    pub bindings_retrievable: bool,
    pub plans: Vec<Plan>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub description: String,
}

fn service_id(provider: &str) -> String {
    format!("aosb-cluster-service-{}", provider.to_lowercase())
}

fn plan_id(provider: &str, size: &str) -> String {
    format!(
        "aosb-cluster-plan-{}-{}",
        provider.to_lowercase(),
        size.to_lowercase()
    )
}

// OSB projection of a whitelist: one service per whitelisted provider,
// one plan per allowed size. Built once at startup and only read after.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    whitelist: Whitelist,
}

impl Catalog {
    pub fn new(whitelist: Whitelist) -> Self {
        Catalog { whitelist }
    }

    pub fn services(&self) -> Vec<Service> {
        self.whitelist
            .0
            .iter()
            .map(|(provider, sizes)| Service {
                id: service_id(provider),
                name: service_id(provider),
                description: format!("Cluster hosted on \"{provider}\""),
                bindable: true,
                instances_retrievable: false,
                bindings_retrievable: false,
                plans: sizes
                    .iter()
                    .map(|size| Plan {
                        id: plan_id(provider, size),
                        name: plan_id(provider, size),
                        description: format!("Instance size \"{size}\""),
                    })
                    .collect(),
            })
            .collect()
    }

    pub fn find_provider_and_size(
        &self,
        service: &str,
        plan: &str,
    ) -> Result<(&str, &str), ApiError> {
        for (provider, sizes) in &self.whitelist.0 {
            if service_id(provider) != service {
                continue;
            }
            for size in sizes {
                if plan_id(provider, size) == plan {
                    return Ok((provider.as_str(), size.as_str()));
                }
            }
        }
        Err(ApiError::PlanNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    fn write_tmp_file(contents: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        write!(tmp, "{contents}").expect("write whitelist");
        tmp
    }

    fn whitelist(value: serde_json::Value) -> Whitelist {
        serde_json::from_value(value).expect("whitelist literal")
    }

    #[test]
    fn loads_whitelist_from_file() {
        let tmp = write_tmp_file(r#"{"AWS": ["M10", "M20"], "GCP": ["M10"], "TENANT": ["M2", "M5"]}"#);
        let loaded = Whitelist::from_file(tmp.path()).expect("load whitelist");

        assert_eq!(
            loaded,
            whitelist(json!({"AWS": ["M10", "M20"], "GCP": ["M10"], "TENANT": ["M2", "M5"]}))
        );
    }

    #[test]
    fn rejects_unrecognized_providers() {
        let tmp = write_tmp_file(r#"{"AWS": ["M10"], "INVALID": ["X"]}"#);
        let err = Whitelist::from_file(tmp.path()).unwrap_err();

        assert!(err.to_string().contains("invalid whitelist"));
    }

    #[test]
    fn whitelist_round_trips_through_json() {
        let original = whitelist(json!({"AWS": ["M10", "M20"], "AZURE": ["M30"]}));
        let encoded = serde_json::to_string(&original).unwrap();
        let reparsed: Whitelist = serde_json::from_str(&encoded).unwrap();

        assert_eq!(reparsed, original);
    }

    #[test]
    fn catalog_projects_services_and_plans() {
        let catalog = Catalog::new(whitelist(json!({"AWS": ["M10", "M20"], "GCP": ["M10"]})));
        let services = catalog.services();

        assert_eq!(services.len(), 2);

        let aws = &services[0];
        assert_eq!(aws.id, "aosb-cluster-service-aws");
        assert_eq!(aws.description, "Cluster hosted on \"AWS\"");
        assert!(aws.bindable);
        assert!(!aws.instances_retrievable);
        assert!(!aws.bindings_retrievable);
        assert_eq!(aws.plans.len(), 2);
        assert_eq!(aws.plans[0].id, "aosb-cluster-plan-aws-m10");
        assert_eq!(aws.plans[0].description, "Instance size \"M10\"");

        assert_eq!(services[1].id, "aosb-cluster-service-gcp");
    }

    #[test]
    fn every_plan_id_resolves_back_to_its_origin() {
        let catalog = Catalog::new(whitelist(
            json!({"AWS": ["M10", "M20"], "AZURE": ["M30"], "TENANT": ["M2"]}),
        ));

        for service in catalog.services() {
            for plan in &service.plans {
                let (provider, size) = catalog
                    .find_provider_and_size(&service.id, &plan.id)
                    .expect("plan resolves");
                assert_eq!(service_id(provider), service.id);
                assert_eq!(plan_id(provider, size), plan.id);
            }
        }
    }

    #[test]
    fn unknown_plans_are_not_found() {
        let catalog = Catalog::new(whitelist(json!({"AWS": ["M10"]})));

        let err = catalog
            .find_provider_and_size("aosb-cluster-service-aws", "aosb-cluster-plan-aws-m99")
            .unwrap_err();
        assert!(matches!(err, ApiError::PlanNotFound));

        // A plan ID only counts under the service that owns it.
        let err = catalog
            .find_provider_and_size("aosb-cluster-service-gcp", "aosb-cluster-plan-aws-m10")
            .unwrap_err();
        assert!(matches!(err, ApiError::PlanNotFound));
    }

    #[test]
    fn missing_whitelist_yields_an_empty_catalog() {
        let catalog = Catalog::new(Whitelist::default());
        assert!(catalog.services().is_empty());
    }
}
