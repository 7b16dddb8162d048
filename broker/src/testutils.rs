use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use atlas::{
    AtlasApi, AtlasError, Cluster, ClusterState, DatabaseUser, InstanceSize, Provider,
};

use crate::{Broker, Whitelist};

pub(crate) const TEST_SERVICE_ID: &str = "aosb-cluster-service-aws";
pub(crate) const TEST_PLAN_ID: &str = "aosb-cluster-plan-aws-m10";

pub(crate) fn test_whitelist() -> Whitelist {
    serde_json::from_value(serde_json::json!({"AWS": ["M10", "M20"]})).expect("test whitelist")
}

pub(crate) fn test_broker() -> Broker {
    Broker::new(Some(test_whitelist()))
}

// In-memory Atlas stand-in: name-keyed clusters and users, state
// transitions, and the typed not-found/conflict errors.
#[derive(Default)]
pub(crate) struct MockAtlas {
    pub clusters: Mutex<HashMap<String, Cluster>>,
    pub users: Mutex<HashMap<String, DatabaseUser>>,
    // Total number of API calls, for zero-upstream-call assertions.
    pub calls: AtomicUsize,
    pub create_cluster_calls: AtomicUsize,
}

impl MockAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cluster_state(&self, name: &str, state: ClusterState) {
        if let Some(cluster) = self.clusters.lock().unwrap().get_mut(name) {
            cluster.state_name = Some(state);
        }
    }
}

#[async_trait]
impl AtlasApi for MockAtlas {
    async fn create_cluster(&self, mut cluster: Cluster) -> Result<Cluster, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.create_cluster_calls.fetch_add(1, Ordering::SeqCst);

        let mut clusters = self.clusters.lock().unwrap();
        if clusters.contains_key(&cluster.name) {
            return Err(AtlasError::ClusterAlreadyExists);
        }

        cluster.state_name = Some(ClusterState::Creating);
        cluster.srv_address = Some(format!("mongodb+srv://{}.mongodb.net", cluster.name));
        clusters.insert(cluster.name.clone(), cluster.clone());
        Ok(cluster)
    }

    async fn update_cluster(&self, cluster: Cluster) -> Result<Cluster, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut clusters = self.clusters.lock().unwrap();
        if !clusters.contains_key(&cluster.name) {
            return Err(AtlasError::ClusterNotFound);
        }

        clusters.insert(cluster.name.clone(), cluster.clone());
        Ok(cluster)
    }

    async fn get_cluster(&self, name: &str) -> Result<Cluster, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.clusters
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(AtlasError::ClusterNotFound)
    }

    async fn delete_cluster(&self, name: &str) -> Result<(), AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.clusters
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or(AtlasError::ClusterNotFound)
    }

    async fn create_user(&self, mut user: DatabaseUser) -> Result<DatabaseUser, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut users = self.users.lock().unwrap();
        if users.contains_key(&user.username) {
            return Err(AtlasError::UserAlreadyExists);
        }

        user.database_name = "admin".into();
        users.insert(user.username.clone(), user.clone());
        Ok(user)
    }

    async fn get_user(&self, name: &str) -> Result<DatabaseUser, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.users
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or(AtlasError::UserNotFound)
    }

    async fn delete_user(&self, name: &str) -> Result<(), AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        self.users
            .lock()
            .unwrap()
            .remove(name)
            .map(|_| ())
            .ok_or(AtlasError::UserNotFound)
    }

    async fn get_provider(&self, name: &str) -> Result<Provider, AtlasError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        Ok(Provider {
            name: name.to_owned(),
            instance_sizes: HashMap::from([
                ("M10".into(), InstanceSize { name: "M10".into() }),
                ("M20".into(), InstanceSize { name: "M20".into() }),
            ]),
        })
    }

    fn dashboard_url(&self, cluster_name: &str) -> String {
        format!("http://dashboard/{cluster_name}")
    }
}
