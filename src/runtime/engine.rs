use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use async_trait::async_trait;
use anyhow::{Result, anyhow};
use dashmap::DashMap;
use serde::{Serialize, Deserialize};
use uuid::Uuid;
use tracing::info;
use crate::model::loader::parse_graph;

/// A named, versioned submission accepted by the execution engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deployment {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// The process definition the engine derived from a deployment's graph resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProcessDefinitionRef {
    pub id: String,
    pub key: String,
    pub version: u32,
    pub deployment_id: String,
    #[serde(rename = "resource")]
    pub resource_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentRequest {
    pub name: String,
    pub resource_name: String,
    pub text: String,
    /// Existing deployment whose resources are carried into the new one.
    pub base_deployment_id: Option<String>,
}

// --- Interfaces ---

/// Deployment side of the external execution engine.
#[async_trait]
pub trait DeploymentEngine: Send + Sync {
    async fn submit(&self, request: DeploymentRequest) -> Result<Deployment>;
    async fn find_deployment(&self, deployment_id: &str) -> Result<Option<Deployment>>;
    async fn find_deployment_by_name(&self, name: &str) -> Result<Option<Deployment>>;
    async fn find_process_definition_by_deployment(&self, deployment_id: &str) -> Result<Option<ProcessDefinitionRef>>;
    /// Graph text the engine holds for a process definition.
    async fn graph_text(&self, definition: &ProcessDefinitionRef) -> Result<String>;
}

// --- Engine State ---

/// A deployment as the engine stand-ins hold it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoredDeployment {
    pub(crate) sequence: u64,
    pub(crate) deployment: Deployment,
    pub(crate) resources: BTreeMap<String, String>,
    pub(crate) definition: ProcessDefinitionRef,
}

/// Process key of a submission. Text that does not parse is rejected the way a
/// real engine rejects an invalid resource.
pub(crate) fn process_key(request: &DeploymentRequest) -> Result<String> {
    parse_graph(&request.text)
        .map(|graph| graph.id)
        .map_err(|e| anyhow!("Engine rejected resource {}: {}", request.resource_name, e))
}

impl StoredDeployment {
    /// `resources` are the ones carried over from the base deployment, if any.
    pub(crate) fn new(
        request: DeploymentRequest,
        key: String,
        mut resources: BTreeMap<String, String>,
        version: u32,
        sequence: u64,
    ) -> Self {
        resources.insert(request.resource_name.clone(), request.text);

        let deployment = Deployment {
            id: Uuid::new_v4().to_string(),
            name: request.name,
        };
        let definition = ProcessDefinitionRef {
            id: format!("{}:{}:{}", key, version, deployment.id),
            key,
            version,
            deployment_id: deployment.id.clone(),
            resource_name: request.resource_name,
        };

        Self {
            sequence,
            deployment,
            resources,
            definition,
        }
    }

    pub(crate) fn resource(&self, resource_name: &str) -> Result<String> {
        self.resources.get(resource_name)
            .cloned()
            .ok_or_else(|| anyhow!("Resource {} not found in deployment {}", resource_name, self.deployment.id))
    }
}

// --- In-Memory Implementation ---

/// Process-local engine stand-in: keeps deployments and derives one process
/// definition per deployment, versioned by process id.
pub struct InMemoryEngine {
    deployments: DashMap<String, StoredDeployment>,
    sequence: AtomicU64,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self {
            deployments: DashMap::new(),
            sequence: AtomicU64::new(0),
        }
    }

    pub fn deployment_count(&self) -> usize {
        self.deployments.len()
    }

    /// Resources held by a deployment, keyed by resource name.
    pub fn resources(&self, deployment_id: &str) -> Option<BTreeMap<String, String>> {
        self.deployments.get(deployment_id).map(|d| d.resources.clone())
    }

    fn next_version(&self, key: &str) -> u32 {
        let latest = self.deployments.iter()
            .filter(|d| d.definition.key == key)
            .map(|d| d.definition.version)
            .max()
            .unwrap_or(0);
        latest + 1
    }
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeploymentEngine for InMemoryEngine {
    async fn submit(&self, request: DeploymentRequest) -> Result<Deployment> {
        let key = process_key(&request)?;

        let resources = match &request.base_deployment_id {
            Some(base_id) => self.deployments.get(base_id)
                .map(|d| d.resources.clone())
                .ok_or_else(|| anyhow!("Base deployment not found: {}", base_id))?,
            None => BTreeMap::new(),
        };

        let version = self.next_version(&key);
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst);
        let stored = StoredDeployment::new(request, key, resources, version, sequence);
        let deployment = stored.deployment.clone();

        info!(deployment_id = %deployment.id, name = %deployment.name, version, "Deployment accepted");
        self.deployments.insert(deployment.id.clone(), stored);
        Ok(deployment)
    }

    async fn find_deployment(&self, deployment_id: &str) -> Result<Option<Deployment>> {
        Ok(self.deployments.get(deployment_id).map(|d| d.deployment.clone()))
    }

    async fn find_deployment_by_name(&self, name: &str) -> Result<Option<Deployment>> {
        Ok(self.deployments.iter()
            .filter(|d| d.deployment.name == name)
            .min_by_key(|d| d.sequence)
            .map(|d| d.deployment.clone()))
    }

    async fn find_process_definition_by_deployment(&self, deployment_id: &str) -> Result<Option<ProcessDefinitionRef>> {
        Ok(self.deployments.get(deployment_id).map(|d| d.definition.clone()))
    }

    async fn graph_text(&self, definition: &ProcessDefinitionRef) -> Result<String> {
        let stored = self.deployments.get(&definition.deployment_id)
            .ok_or_else(|| anyhow!("Deployment not found: {}", definition.deployment_id))?;
        stored.resource(&definition.resource_name)
    }
}
