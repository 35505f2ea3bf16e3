use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use uuid::Uuid;
use anyhow::Result;
use dashmap::DashMap;

// --- Records ---

/// Persisted metadata of a deployed workflow.
///
/// `last_deployment_id` only ever changes after a successful engine submission.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WorkflowRecord {
    pub id: String,
    pub name: String,
    pub resource_name: String,
    pub graph_text: String,
    pub last_deployment_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FormRecord {
    pub id: String,
    pub form_key: String,
    pub form_type: Option<String>,
    pub content: String,
}

pub(crate) fn ensure_id(id: &mut String) {
    if id.is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

// --- Interfaces ---

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Inserts or replaces by id. An empty id is replaced by a fresh one.
    async fn save_workflow(&self, record: WorkflowRecord) -> Result<WorkflowRecord>;
    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowRecord>>;
    async fn delete_workflow(&self, id: &str) -> Result<()>;
    async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>>;
    async fn find_workflow_by_name(&self, name: &str) -> Result<Option<WorkflowRecord>>;
    async fn find_workflow_by_deployment(&self, deployment_id: &str) -> Result<Option<WorkflowRecord>>;

    /// Inserts or replaces by id. An empty id is replaced by a fresh one.
    async fn save_form(&self, record: FormRecord) -> Result<FormRecord>;
    async fn get_form(&self, id: &str) -> Result<Option<FormRecord>>;
    async fn delete_form(&self, id: &str) -> Result<()>;
    async fn list_forms(&self) -> Result<Vec<FormRecord>>;
    async fn find_form_by_key(&self, form_key: &str) -> Result<Option<FormRecord>>;
}

// --- In-Memory Implementation ---

pub struct InMemoryMetadataStore {
    workflows: DashMap<String, WorkflowRecord>,
    forms: DashMap<String, FormRecord>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self {
            workflows: DashMap::new(),
            forms: DashMap::new(),
        }
    }
}

impl Default for InMemoryMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn save_workflow(&self, mut record: WorkflowRecord) -> Result<WorkflowRecord> {
        ensure_id(&mut record.id);
        self.workflows.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_workflow(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        Ok(self.workflows.get(id).map(|r| r.value().clone()))
    }

    async fn delete_workflow(&self, id: &str) -> Result<()> {
        self.workflows.remove(id);
        Ok(())
    }

    async fn list_workflows(&self) -> Result<Vec<WorkflowRecord>> {
        let mut all: Vec<WorkflowRecord> = self.workflows.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_workflow_by_name(&self, name: &str) -> Result<Option<WorkflowRecord>> {
        Ok(self.list_workflows().await?.into_iter().find(|r| r.name == name))
    }

    async fn find_workflow_by_deployment(&self, deployment_id: &str) -> Result<Option<WorkflowRecord>> {
        Ok(self.workflows.iter()
            .find(|r| r.last_deployment_id.as_deref() == Some(deployment_id))
            .map(|r| r.value().clone()))
    }

    async fn save_form(&self, mut record: FormRecord) -> Result<FormRecord> {
        ensure_id(&mut record.id);
        self.forms.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_form(&self, id: &str) -> Result<Option<FormRecord>> {
        Ok(self.forms.get(id).map(|r| r.value().clone()))
    }

    async fn delete_form(&self, id: &str) -> Result<()> {
        self.forms.remove(id);
        Ok(())
    }

    async fn list_forms(&self) -> Result<Vec<FormRecord>> {
        let mut all: Vec<FormRecord> = self.forms.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.form_key.cmp(&b.form_key).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn find_form_by_key(&self, form_key: &str) -> Result<Option<FormRecord>> {
        Ok(self.list_forms().await?.into_iter().find(|r| r.form_key == form_key))
    }
}
