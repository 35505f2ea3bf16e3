use std::collections::BTreeMap;
use async_trait::async_trait;
use anyhow::{Result, anyhow};
use redis::AsyncCommands;
use tracing::info;
use crate::runtime::engine::{
    process_key, Deployment, DeploymentEngine, DeploymentRequest, ProcessDefinitionRef, StoredDeployment,
};
use crate::runtime::redis_storage::RedisHash;

/// Engine stand-in that keeps its deployments in Redis, so deployment ids stay
/// valid across CLI runs. Same acceptance rules as the in-memory engine.
pub struct RedisEngine {
    deployments: RedisHash,
    sequence_key: String,
}

impl RedisEngine {
    pub fn new(client: redis::Client, key_prefix: &str) -> Self {
        Self {
            deployments: RedisHash::new(client, format!("{}:deployments", key_prefix)),
            sequence_key: format!("{}:deployments:seq", key_prefix),
        }
    }

    async fn stored(&self, deployment_id: &str) -> Result<Option<StoredDeployment>> {
        self.deployments.get(deployment_id).await
    }
}

#[async_trait]
impl DeploymentEngine for RedisEngine {
    async fn submit(&self, request: DeploymentRequest) -> Result<Deployment> {
        let key = process_key(&request)?;

        let resources = match &request.base_deployment_id {
            Some(base_id) => self.stored(base_id).await?
                .map(|d| d.resources)
                .ok_or_else(|| anyhow!("Base deployment not found: {}", base_id))?,
            None => BTreeMap::new(),
        };

        let all: Vec<StoredDeployment> = self.deployments.all().await?;
        let version = all.iter()
            .filter(|d| d.definition.key == key)
            .map(|d| d.definition.version)
            .max()
            .unwrap_or(0) + 1;

        let mut conn = self.deployments.connection().await?;
        let sequence: u64 = conn.incr(&self.sequence_key, 1).await?;

        let stored = StoredDeployment::new(request, key, resources, version, sequence);
        self.deployments.put(&stored.deployment.id, &stored).await?;

        info!(deployment_id = %stored.deployment.id, name = %stored.deployment.name, version, "Deployment accepted");
        Ok(stored.deployment)
    }

    async fn find_deployment(&self, deployment_id: &str) -> Result<Option<Deployment>> {
        Ok(self.stored(deployment_id).await?.map(|d| d.deployment))
    }

    async fn find_deployment_by_name(&self, name: &str) -> Result<Option<Deployment>> {
        let all: Vec<StoredDeployment> = self.deployments.all().await?;
        Ok(all.into_iter()
            .filter(|d| d.deployment.name == name)
            .min_by_key(|d| d.sequence)
            .map(|d| d.deployment))
    }

    async fn find_process_definition_by_deployment(&self, deployment_id: &str) -> Result<Option<ProcessDefinitionRef>> {
        Ok(self.stored(deployment_id).await?.map(|d| d.definition))
    }

    async fn graph_text(&self, definition: &ProcessDefinitionRef) -> Result<String> {
        let stored = self.stored(&definition.deployment_id).await?
            .ok_or_else(|| anyhow!("Deployment not found: {}", definition.deployment_id))?;
        stored.resource(&definition.resource_name)
    }
}
