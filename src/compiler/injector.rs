use tracing::debug;
use crate::model::{FlowNode, ProcessGraph};

/// Routing variable the engine evaluates gateway conditions against.
pub const DECISION_VARIABLE: &str = "input";

pub fn condition_for(index: usize) -> String {
    format!("{} == {}", DECISION_VARIABLE, index)
}

pub fn default_label(index: usize) -> String {
    format!("Flow {}", index + 1)
}

/// Assigns `input == i` conditions and default labels to the outgoing flows of
/// every branching gateway.
///
/// Indices follow the declared order of the gateway's outgoing flows. Existing
/// conditions are always overwritten; names are only filled in when empty.
pub struct ConditionInjector;

impl ConditionInjector {
    pub fn new() -> Self {
        Self
    }

    pub fn inject(&self, graph: &mut ProcessGraph) {
        let gateway_ids: Vec<String> = graph.nodes.iter()
            .filter_map(|node| match node {
                FlowNode::ExclusiveGateway(gateway) => Some(gateway.id.clone()),
                _ => None,
            })
            .collect();

        for gateway_id in gateway_ids {
            let positions = graph.outgoing_positions(&gateway_id);
            if positions.len() <= 1 {
                continue;
            }

            for (index, position) in positions.into_iter().enumerate() {
                let flow = &mut graph.flows[position];
                flow.condition_expression = Some(condition_for(index));
                if !flow.has_name() {
                    flow.name = Some(default_label(index));
                }
            }
            debug!(gateway_id = %gateway_id, "Injected routing conditions");
        }
    }
}

impl Default for ConditionInjector {
    fn default() -> Self {
        Self::new()
    }
}
