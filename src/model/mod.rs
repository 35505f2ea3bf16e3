pub mod builder;
pub mod loader;

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use serde_yaml::Mapping;
use evalexpr::{build_operator_tree, HashMapContext, ContextWithMutableVariables, DefaultNumericTypes};

/// Extension attributes carried through the pipeline untouched.
pub type Attributes = BTreeMap<String, String>;

// Keys no pass reads land in the `extra` mapping of their element and are
// written back as they came in.

/// 流程图 (exchange-format process graph)
///
/// Nodes and flows keep their declared order; every ordering rule in the
/// compiler passes is defined against this order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessGraph {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub flows: Vec<SequenceFlow>,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum FlowNode {
    StartEvent(StartEvent),
    UserTask(UserTask),
    ServiceTask(ServiceTask),
    SendTask(SendTask),
    ExclusiveGateway(ExclusiveGateway),
    EndEvent(EndEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    StartEvent,
    UserTask,
    ServiceTask,
    SendTask,
    ExclusiveGateway,
    EndEvent,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StartEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_key: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_binding: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendTask {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub automation_binding: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Branching node. Its outgoing flows are the graph's flows whose `source` is this id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExclusiveGateway {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub extra: Mapping,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EndEvent {
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_binding: Option<ExecutionListener>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: Attributes,
    #[serde(flatten)]
    pub extra: Mapping,
}

/// Listener the engine invokes on a lifecycle event of a node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionListener {
    pub event: String,
    pub class: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SequenceFlow {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub source: String,
    pub target: String,
    #[serde(default, rename = "condition", skip_serializing_if = "Option::is_none")]
    pub condition_expression: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl SequenceFlow {
    /// Name as shown to a form user; empty when the flow is unnamed.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn has_name(&self) -> bool {
        !self.label().is_empty()
    }
}

impl FlowNode {
    pub fn id(&self) -> &str {
        match self {
            FlowNode::StartEvent(n) => &n.id,
            FlowNode::UserTask(n) => &n.id,
            FlowNode::ServiceTask(n) => &n.id,
            FlowNode::SendTask(n) => &n.id,
            FlowNode::ExclusiveGateway(n) => &n.id,
            FlowNode::EndEvent(n) => &n.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            FlowNode::StartEvent(n) => &n.name,
            FlowNode::UserTask(n) => &n.name,
            FlowNode::ServiceTask(n) => &n.name,
            FlowNode::SendTask(n) => &n.name,
            FlowNode::ExclusiveGateway(n) => &n.name,
            FlowNode::EndEvent(n) => &n.name,
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            FlowNode::StartEvent(_) => NodeKind::StartEvent,
            FlowNode::UserTask(_) => NodeKind::UserTask,
            FlowNode::ServiceTask(_) => NodeKind::ServiceTask,
            FlowNode::SendTask(_) => NodeKind::SendTask,
            FlowNode::ExclusiveGateway(_) => NodeKind::ExclusiveGateway,
            FlowNode::EndEvent(_) => NodeKind::EndEvent,
        }
    }
}

impl ProcessGraph {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            nodes: Vec::new(),
            flows: Vec::new(),
            extra: Mapping::new(),
        }
    }

    /// Resource file name the graph is submitted under.
    pub fn resource_name(&self) -> String {
        format!("{}.bpmn", self.id)
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id() == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut FlowNode> {
        self.nodes.iter_mut().find(|n| n.id() == id)
    }

    pub fn nodes_of_kind(&self, kind: NodeKind) -> impl Iterator<Item = &FlowNode> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn user_task(&self, id: &str) -> Option<&UserTask> {
        match self.node(id) {
            Some(FlowNode::UserTask(task)) => Some(task),
            _ => None,
        }
    }

    pub fn user_task_mut(&mut self, id: &str) -> Option<&mut UserTask> {
        match self.node_mut(id) {
            Some(FlowNode::UserTask(task)) => Some(task),
            _ => None,
        }
    }

    /// Outgoing flows of `node_id` in declared order.
    pub fn outgoing<'a, 'b>(&'a self, node_id: &'b str) -> impl Iterator<Item = &'a SequenceFlow> {
        self.flows.iter().filter(move |f| f.source == node_id)
    }

    pub fn incoming<'a, 'b>(&'a self, node_id: &'b str) -> impl Iterator<Item = &'a SequenceFlow> {
        self.flows.iter().filter(move |f| f.target == node_id)
    }

    /// Positions in `flows` of the outgoing flows of `node_id`, in declared order.
    pub fn outgoing_positions(&self, node_id: &str) -> Vec<usize> {
        self.flows.iter()
            .enumerate()
            .filter(|(_, f)| f.source == node_id)
            .map(|(i, _)| i)
            .collect()
    }

    /// The gateway a task hands its decision to: the target of the task's only
    /// outgoing flow, when that target is an exclusive gateway.
    pub fn decision_gateway(&self, task_id: &str) -> Option<&ExclusiveGateway> {
        let mut outgoing = self.outgoing(task_id);
        let only = outgoing.next()?;
        if outgoing.next().is_some() {
            return None;
        }
        match self.node(&only.target) {
            Some(FlowNode::ExclusiveGateway(gateway)) => Some(gateway),
            _ => None,
        }
    }

    /// Picks the outgoing flow of a gateway the engine would take for a given
    /// decision `input`. Unconditioned or unparsable flows never match.
    pub fn select_route(&self, gateway_id: &str, input: i64) -> Option<&SequenceFlow> {
        let mut eval_ctx = HashMapContext::<DefaultNumericTypes>::new();
        if eval_ctx.set_value("input".to_string(), evalexpr::Value::Int(input)).is_err() {
            return None;
        }

        self.outgoing(gateway_id).find(|flow| {
            flow.condition_expression
                .as_deref()
                .and_then(|cond| build_operator_tree::<DefaultNumericTypes>(cond).ok())
                .map(|tree| tree.eval_boolean_with_context(&eval_ctx).unwrap_or(false))
                .unwrap_or(false)
        })
    }
}
