use std::sync::Arc;
use tracing::{info, warn, error};
use uuid::Uuid;
use crate::compiler::Compiler;
use crate::config::BindingSettings;
use crate::error::{FlowError, FlowResult};
use crate::forms::sync::{FormSynchronizer, SyncOutcome};
use crate::model::ProcessGraph;
use crate::model::loader::{parse_graph, serialize_graph};
use crate::runtime::engine::{Deployment, DeploymentEngine, DeploymentRequest};
use crate::runtime::storage::{FormRecord, MetadataStore, WorkflowRecord};

/// How a graph is submitted to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitMode {
    /// Always a fresh deployment under a generated unique name.
    Create,
    /// Reuse a deployment with the workflow's name when the engine has one.
    Update,
}

/// Input of [`DeploymentCoordinator::update_task_routing`].
#[derive(Debug, Clone, Default)]
pub struct TaskRoutingUpdate {
    pub deployment_id: String,
    pub task_id: String,
    pub form_key: String,
    pub assignee: Option<String>,
    /// Deployment id the caller saw on its previous call, used when no workflow
    /// record points at `deployment_id` any more.
    pub last_known_deployment_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RoutingOutcome {
    FormUpdated { workflow: WorkflowRecord, form: FormRecord },
    NoGatewayFollows { workflow: WorkflowRecord },
}

impl RoutingOutcome {
    pub fn workflow(&self) -> &WorkflowRecord {
        match self {
            RoutingOutcome::FormUpdated { workflow, .. } => workflow,
            RoutingOutcome::NoGatewayFollows { workflow } => workflow,
        }
    }
}

/// Threads a graph through parse, validate, inject, bind, (sync), serialize,
/// submit and commit.
///
/// Nothing is written to the metadata store until the engine accepted the graph.
/// A store failure after that point is reported as `PartialCommit`.
pub struct DeploymentCoordinator {
    compiler: Compiler,
    engine: Arc<dyn DeploymentEngine>,
    store: Arc<dyn MetadataStore>,
    forms: FormSynchronizer,
}

impl DeploymentCoordinator {
    pub fn new(engine: Arc<dyn DeploymentEngine>, store: Arc<dyn MetadataStore>) -> Self {
        Self::with_bindings(engine, store, BindingSettings::default())
    }

    pub fn with_bindings(
        engine: Arc<dyn DeploymentEngine>,
        store: Arc<dyn MetadataStore>,
        bindings: BindingSettings,
    ) -> Self {
        Self {
            compiler: Compiler::new(bindings),
            forms: FormSynchronizer::new(store.clone()),
            engine,
            store,
        }
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    /// Deploys a new workflow and stores its record.
    pub async fn deploy_new(&self, name: &str, graph_text: &str) -> FlowResult<WorkflowRecord> {
        let graph = self.compiler.compile(graph_text)?;
        let text = serialize_graph(&graph)?;

        let deployment = self.submit(SubmitMode::Create, name, &graph.resource_name(), &text).await?;

        let record = WorkflowRecord {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            resource_name: graph.resource_name(),
            graph_text: text,
            last_deployment_id: Some(deployment.id.clone()),
        };
        let record = self.commit_workflow(&deployment, record).await?;

        info!(workflow_id = %record.id, deployment_id = %deployment.id, "Workflow deployed");
        Ok(record)
    }

    /// Replaces the graph of an existing workflow and re-deploys it.
    pub async fn redeploy(&self, id: &str, graph_text: &str, name: &str) -> FlowResult<WorkflowRecord> {
        let mut record = self.store.get_workflow(id).await
            .map_err(|e| FlowError::store_failed("load-workflow", e))?
            .ok_or_else(|| FlowError::not_found("workflow", id))?;

        let graph = self.compiler.compile(graph_text)?;
        let text = serialize_graph(&graph)?;

        let deployment = self.submit(SubmitMode::Update, name, &graph.resource_name(), &text).await?;

        record.name = name.to_string();
        record.resource_name = graph.resource_name();
        record.graph_text = text;
        record.last_deployment_id = Some(deployment.id.clone());
        let record = self.commit_workflow(&deployment, record).await?;

        info!(workflow_id = %record.id, deployment_id = %deployment.id, "Workflow redeployed");
        Ok(record)
    }

    /// Re-assigns a user task, rebuilds its decision form and re-deploys the
    /// graph the engine holds for `deployment_id`.
    pub async fn update_task_routing(&self, update: TaskRoutingUpdate) -> FlowResult<RoutingOutcome> {
        let definition = self.engine.find_process_definition_by_deployment(&update.deployment_id).await
            .map_err(|e| FlowError::deploy_failed("lookup-definition", e))?
            .ok_or_else(|| FlowError::not_found("deployment", &update.deployment_id))?;

        let current = self.engine.find_deployment(&definition.deployment_id).await
            .map_err(|e| FlowError::deploy_failed("lookup-deployment", e))?
            .ok_or_else(|| FlowError::not_found("deployment", &definition.deployment_id))?;

        let deployed_text = self.engine.graph_text(&definition).await
            .map_err(|e| FlowError::deploy_failed("fetch-graph", e))?;

        let mut graph = parse_graph(&deployed_text)?;
        assign_task(&mut graph, &update)?;
        self.compiler.prepare(&mut graph)?;

        let sync = self.forms.sync(&graph, &update.task_id, &update.form_key).await?;

        let mut record = self.find_workflow(&update).await?;
        let text = serialize_graph(&graph)?;

        // Cumulative: extend the deployment being updated under its own name.
        let deployment = self.send(DeploymentRequest {
            name: current.name,
            resource_name: definition.resource_name.clone(),
            text: text.clone(),
            base_deployment_id: Some(current.id),
        }).await?;

        record.graph_text = text;
        record.resource_name = definition.resource_name.clone();
        record.last_deployment_id = Some(deployment.id.clone());
        let workflow = self.commit_workflow(&deployment, record).await?;

        let outcome = match sync {
            SyncOutcome::Updated(form) => {
                let form = self.store.save_form(form).await.map_err(|e| {
                    error!(deployment_id = %deployment.id, form_key = %update.form_key, error = ?e, "Form not persisted after deploy");
                    FlowError::PartialCommit {
                        deployment_id: deployment.id.clone(),
                        step: "persist-form",
                        source: e,
                    }
                })?;
                RoutingOutcome::FormUpdated { workflow, form }
            }
            SyncOutcome::NoGatewayFollows => RoutingOutcome::NoGatewayFollows { workflow },
        };

        info!(task_id = %update.task_id, deployment_id = %deployment.id, "Task routing updated");
        Ok(outcome)
    }

    async fn find_workflow(&self, update: &TaskRoutingUpdate) -> FlowResult<WorkflowRecord> {
        let by_current = self.store.find_workflow_by_deployment(&update.deployment_id).await
            .map_err(|e| FlowError::store_failed("load-workflow", e))?;
        if let Some(record) = by_current {
            return Ok(record);
        }

        if let Some(last_known) = &update.last_known_deployment_id {
            warn!(deployment_id = %update.deployment_id, last_known = %last_known, "No workflow for deployment, trying last known id");
            let by_last = self.store.find_workflow_by_deployment(last_known).await
                .map_err(|e| FlowError::store_failed("load-workflow", e))?;
            if let Some(record) = by_last {
                return Ok(record);
            }
        }

        Err(FlowError::not_found("workflow", &update.deployment_id))
    }

    async fn submit(&self, mode: SubmitMode, name: &str, resource_name: &str, text: &str) -> FlowResult<Deployment> {
        let existing = match mode {
            SubmitMode::Create => None,
            SubmitMode::Update => self.engine.find_deployment_by_name(name).await
                .map_err(|e| FlowError::deploy_failed("lookup-deployment", e))?,
        };

        let request = match existing {
            Some(existing) => DeploymentRequest {
                name: existing.name,
                resource_name: resource_name.to_string(),
                text: text.to_string(),
                base_deployment_id: Some(existing.id),
            },
            None => DeploymentRequest {
                name: unique_deployment_name(name),
                resource_name: resource_name.to_string(),
                text: text.to_string(),
                base_deployment_id: None,
            },
        };

        self.send(request).await
    }

    async fn send(&self, request: DeploymentRequest) -> FlowResult<Deployment> {
        let name = request.name.clone();
        self.engine.submit(request).await.map_err(|e| {
            warn!(name = %name, error = ?e, "Engine rejected deployment, nothing persisted");
            FlowError::deploy_failed("submit", e)
        })
    }

    async fn commit_workflow(&self, deployment: &Deployment, record: WorkflowRecord) -> FlowResult<WorkflowRecord> {
        self.store.save_workflow(record).await.map_err(|e| {
            error!(deployment_id = %deployment.id, error = ?e, "Workflow record not persisted after deploy");
            FlowError::PartialCommit {
                deployment_id: deployment.id.clone(),
                step: "persist-workflow",
                source: e,
            }
        })
    }
}

/// Deployment name for a fresh submission: `{uuid}_{workflow name}`.
pub fn unique_deployment_name(workflow_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), workflow_name)
}

fn assign_task(graph: &mut ProcessGraph, update: &TaskRoutingUpdate) -> FlowResult<()> {
    let task = graph.user_task_mut(&update.task_id)
        .ok_or_else(|| FlowError::not_found("user task", &update.task_id))?;
    task.assignee = update.assignee.clone();
    task.form_key = Some(update.form_key.clone());
    Ok(())
}
