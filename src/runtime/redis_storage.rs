use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::runtime::storage::{ensure_id, FormRecord, MetadataStore, WorkflowRecord};
use anyhow::Result;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::warn;

/// One Redis hash of JSON records keyed by id.
pub(crate) struct RedisHash {
    client: redis::Client,
    key: String,
}

impl RedisHash {
    pub(crate) fn new(client: redis::Client, key: String) -> Self {
        Self { client, key }
    }

    pub(crate) async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        Ok(self.client.get_multiplexed_async_connection().await?)
    }

    pub(crate) async fn put<T: Serialize + Sync>(&self, id: &str, record: &T) -> Result<()> {
        let mut conn = self.connection().await?;
        let serialized = serde_json::to_string(record)?;
        let _: () = conn.hset(&self.key, id, serialized).await?;
        Ok(())
    }

    pub(crate) async fn get<T: DeserializeOwned>(&self, id: &str) -> Result<Option<T>> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = conn.hget(&self.key, id).await?;

        if let Some(s) = raw {
            Ok(Some(serde_json::from_str(&s)?))
        } else {
            Ok(None)
        }
    }

    pub(crate) async fn remove(&self, id: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        let _: () = conn.hdel(&self.key, id).await?;
        Ok(())
    }

    pub(crate) async fn all<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut conn = self.connection().await?;
        let raw_map: HashMap<String, String> = conn.hgetall(&self.key).await?;

        let mut result = Vec::with_capacity(raw_map.len());
        for (id, json) in raw_map {
            match serde_json::from_str(&json) {
                Ok(record) => result.push(record),
                Err(e) => warn!(hash = %self.key, id = %id, error = %e, "Skipping undecodable record"),
            }
        }
        Ok(result)
    }
}

/// Metadata store keeping each record kind in one Redis hash (`id -> json`).
pub struct RedisMetadataStore {
    workflows: RedisHash,
    forms: RedisHash,
}

impl RedisMetadataStore {
    pub fn new(client: redis::Client, key_prefix: String) -> Self {
        Self {
            workflows: RedisHash::new(client.clone(), format!("{}:workflows", key_prefix)),
            forms: RedisHash::new(client, format!("{}:forms", key_prefix)),
        }
    }
}

#[async_trait]
impl MetadataStore for RedisMetadataStore {
    async fn save_workflow(&self, mut record: WorkflowRecord) -> Result<WorkflowRecord> {
        ensure_id(&mut record.id);
        self.workflows.put(&record.id, &record).await?;
        Ok(record)
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        self.workflows.get(id).await
    }

    async fn delete_workflow(&self, id: &str) -> Result<()> {
        self.workflows.remove(id).await
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>> {
        let mut all: Vec<WorkflowRecord> = self.workflows.all().await?;
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_workflow_by_name(&self, name: &str) -> Result<Option<WorkflowRecord>> {
        Ok(self.list_workflows().await?.into_iter().find(|r| r.name == name))
    }

    async fn find_workflow_by_deployment(&self, deployment_id: &str) -> Result<Option<WorkflowRecord>> {
        Ok(self.list_workflows().await?
            .into_iter()
            .find(|r| r.last_deployment_id.as_deref() == Some(deployment_id)))
    }

    async fn save_form(&self, mut record: FormRecord) -> Result<FormRecord> {
        ensure_id(&mut record.id);
        self.forms.put(&record.id, &record).await?;
        Ok(record)
    }

    async fn get_form(&self, id: &str) -> Result<Option<FormRecord>> {
        self.forms.get(id).await
    }

    async fn delete_form(&self, id: &str) -> Result<()> {
        self.forms.remove(id).await
    }

    async fn list_forms(&self) -> Result<Vec<FormRecord>> {
        let mut all: Vec<FormRecord> = self.forms.all().await?;
        all.sort_by(|a, b| a.form_key.cmp(&b.form_key).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_form_by_key(&self, form_key: &str) -> Result<Option<FormRecord>> {
        Ok(self.list_forms().await?.into_iter().find(|r| r.form_key == form_key))
    }
}
