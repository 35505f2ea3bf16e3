use std::collections::HashSet;
use std::fs;
use std::path::Path;
use anyhow::{Result, Context as AnyhowContext};
use crate::error::{FlowError, FlowResult};
use crate::model::ProcessGraph;

/// Parses exchange-format text into a graph and checks that it is well formed:
/// unique node ids, unique flow ids, and flows that only reference declared nodes.
pub fn parse_graph(text: &str) -> FlowResult<ProcessGraph> {
    let graph: ProcessGraph = serde_yaml::from_str(text)
        .map_err(|e| FlowError::MalformedGraph(e.to_string()))?;

    if graph.id.trim().is_empty() {
        return Err(FlowError::MalformedGraph("process id is empty".to_string()));
    }

    let mut node_ids = HashSet::new();
    for node in &graph.nodes {
        if node.id().is_empty() {
            return Err(FlowError::MalformedGraph("node with empty id".to_string()));
        }
        if !node_ids.insert(node.id()) {
            return Err(FlowError::MalformedGraph(format!("Duplicate node ID: {}", node.id())));
        }
    }

    let mut flow_ids = HashSet::new();
    for flow in &graph.flows {
        if !flow_ids.insert(flow.id.as_str()) {
            return Err(FlowError::MalformedGraph(format!("Duplicate flow ID: {}", flow.id)));
        }
        for endpoint in [&flow.source, &flow.target] {
            if !node_ids.contains(endpoint.as_str()) {
                return Err(FlowError::MalformedGraph(format!(
                    "Flow {} references unknown node: {}",
                    flow.id, endpoint
                )));
            }
        }
    }

    Ok(graph)
}

pub fn serialize_graph(graph: &ProcessGraph) -> FlowResult<String> {
    serde_yaml::to_string(graph).map_err(|e| FlowError::MalformedGraph(e.to_string()))
}

pub fn load_graph_from_yaml(file_path: impl AsRef<Path>) -> Result<ProcessGraph> {
    let file_path = file_path.as_ref();
    let yaml_content = fs::read_to_string(file_path)
        .with_context(|| format!("Failed to read graph file from {}", file_path.display()))?;

    let graph = parse_graph(&yaml_content)
        .with_context(|| format!("Failed to parse graph from {}", file_path.display()))?;

    Ok(graph)
}
