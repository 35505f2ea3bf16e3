use std::sync::Arc;
use tracing::{debug, info};
use crate::error::{FlowError, FlowResult};
use crate::forms::{FormOption, FormSchema};
use crate::model::ProcessGraph;
use crate::runtime::storage::{FormRecord, MetadataStore};

/// Result of synchronizing a task's decision form.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The form was rebuilt; the caller is responsible for persisting it.
    Updated(FormRecord),
    /// The task does not hand off to a single gateway, nothing to sync.
    NoGatewayFollows,
}

/// Keeps the `radio` options of a task's form in step with the outgoing flows of
/// the gateway that follows the task. Reads forms from the metadata store but
/// never writes them.
pub struct FormSynchronizer {
    store: Arc<dyn MetadataStore>,
}

impl FormSynchronizer {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    pub async fn sync(&self, graph: &ProcessGraph, task_id: &str, form_key: &str) -> FlowResult<SyncOutcome> {
        if graph.user_task(task_id).is_none() {
            return Err(FlowError::not_found("user task", task_id));
        }

        let Some(gateway) = graph.decision_gateway(task_id) else {
            info!(task_id = %task_id, "No gateway after task, form left unchanged");
            return Ok(SyncOutcome::NoGatewayFollows);
        };

        let mut record = self.store.find_form_by_key(form_key).await
            .map_err(|e| FlowError::store_failed("load-form", e))?
            .ok_or_else(|| FlowError::not_found("form", form_key))?;

        let mut schema = FormSchema::parse(form_key, &record.content)?;
        schema.set_decision_options(gateway_options(graph, &gateway.id));
        record.content = schema.to_json(form_key)?;

        debug!(task_id = %task_id, gateway_id = %gateway.id, form_key = %form_key, "Decision form rebuilt");
        Ok(SyncOutcome::Updated(record))
    }
}

/// One option per outgoing flow of the gateway, in declared order.
pub fn gateway_options(graph: &ProcessGraph, gateway_id: &str) -> Vec<FormOption> {
    graph.outgoing(gateway_id)
        .enumerate()
        .map(|(index, flow)| FormOption {
            value: index.to_string(),
            label: flow.label().to_string(),
        })
        .collect()
}
