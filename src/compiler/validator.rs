use crate::error::{FlowError, FlowResult};
use crate::model::{FlowNode, ProcessGraph};

/// Structural checks run before anything is injected or submitted.
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Self
    }

    /// Returns the first violation in node-declaration order.
    pub fn validate(&self, graph: &ProcessGraph) -> FlowResult<()> {
        for node in &graph.nodes {
            match node {
                FlowNode::ExclusiveGateway(gateway) => {
                    let preceded_by_user_task = graph.incoming(&gateway.id).any(|flow| {
                        matches!(graph.node(&flow.source), Some(FlowNode::UserTask(_)))
                    });
                    if !preceded_by_user_task {
                        return Err(FlowError::StructuralViolation {
                            gateway_id: gateway.id.clone(),
                        });
                    }
                }
                FlowNode::StartEvent(_)
                | FlowNode::UserTask(_)
                | FlowNode::ServiceTask(_)
                | FlowNode::SendTask(_)
                | FlowNode::EndEvent(_) => {}
            }
        }
        Ok(())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn validate(graph: &ProcessGraph) -> FlowResult<()> {
    Validator::new().validate(graph)
}
