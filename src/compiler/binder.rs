use crate::config::BindingSettings;
use crate::model::{ExecutionListener, FlowNode, ProcessGraph};

/// Fills in automation bindings the engine needs to run the graph.
///
/// Send tasks are always rebound to the notification handler, even when the
/// submitted graph configured something else.
pub struct DelegateBinder {
    bindings: BindingSettings,
}

impl DelegateBinder {
    pub fn new(bindings: BindingSettings) -> Self {
        Self { bindings }
    }

    pub fn completion_listener(&self) -> ExecutionListener {
        ExecutionListener {
            event: self.bindings.completion_event.clone(),
            class: self.bindings.completion_listener.clone(),
        }
    }

    pub fn bind(&self, graph: &mut ProcessGraph) {
        let listener = self.completion_listener();

        for node in graph.nodes.iter_mut() {
            match node {
                FlowNode::ServiceTask(task) => {
                    let unbound = task.automation_binding.as_deref().is_none_or(str::is_empty);
                    if unbound {
                        task.automation_binding = Some(self.bindings.service_task.clone());
                    }
                }
                FlowNode::SendTask(task) => {
                    task.automation_binding = Some(self.bindings.send_task.clone());
                }
                FlowNode::EndEvent(event) => {
                    if event.completion_binding.as_ref() != Some(&listener) {
                        event.completion_binding = Some(listener.clone());
                    }
                }
                FlowNode::StartEvent(_) | FlowNode::UserTask(_) | FlowNode::ExclusiveGateway(_) => {}
            }
        }
    }
}

impl Default for DelegateBinder {
    fn default() -> Self {
        Self::new(BindingSettings::default())
    }
}
