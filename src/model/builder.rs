use serde_yaml::Mapping;
use crate::model::{
    ProcessGraph, FlowNode, SequenceFlow, StartEvent, UserTask, ServiceTask, SendTask,
    ExclusiveGateway, EndEvent,
};

/// Fluent construction of process graphs, mostly for tests and tooling.
pub struct GraphBuilder {
    id: String,
    name: Option<String>,
    pub nodes: Vec<FlowNode>,
    flows: Vec<SequenceFlow>,
}

impl GraphBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: None,
            nodes: Vec::new(),
            flows: Vec::new(),
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn start(mut self, id: &str) -> Self {
        self.nodes.push(FlowNode::StartEvent(StartEvent {
            id: id.to_string(),
            ..Default::default()
        }));
        self
    }

    pub fn user_task(self, id: &str, name: &str) -> UserTaskBuilder {
        UserTaskBuilder {
            graph_builder: self,
            task: UserTask {
                id: id.to_string(),
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn service_task(mut self, id: &str, name: &str, binding: Option<&str>) -> Self {
        self.nodes.push(FlowNode::ServiceTask(ServiceTask {
            id: id.to_string(),
            name: name.to_string(),
            automation_binding: binding.map(str::to_string),
            ..Default::default()
        }));
        self
    }

    pub fn send_task(mut self, id: &str, name: &str, binding: Option<&str>) -> Self {
        self.nodes.push(FlowNode::SendTask(SendTask {
            id: id.to_string(),
            name: name.to_string(),
            automation_binding: binding.map(str::to_string),
            ..Default::default()
        }));
        self
    }

    pub fn gateway(mut self, id: &str) -> Self {
        self.nodes.push(FlowNode::ExclusiveGateway(ExclusiveGateway {
            id: id.to_string(),
            ..Default::default()
        }));
        self
    }

    pub fn end(mut self, id: &str) -> Self {
        self.nodes.push(FlowNode::EndEvent(EndEvent {
            id: id.to_string(),
            ..Default::default()
        }));
        self
    }

    pub fn connect(mut self, id: &str, source: &str, target: &str) -> Self {
        self.flows.push(SequenceFlow {
            id: id.to_string(),
            name: None,
            source: source.to_string(),
            target: target.to_string(),
            condition_expression: None,
            extra: Mapping::new(),
        });
        self
    }

    pub fn connect_named(mut self, id: &str, source: &str, target: &str, name: &str) -> Self {
        self.flows.push(SequenceFlow {
            id: id.to_string(),
            name: Some(name.to_string()),
            source: source.to_string(),
            target: target.to_string(),
            condition_expression: None,
            extra: Mapping::new(),
        });
        self
    }

    pub fn build(self) -> ProcessGraph {
        ProcessGraph {
            id: self.id,
            name: self.name,
            nodes: self.nodes,
            flows: self.flows,
            extra: Mapping::new(),
        }
    }
}

pub struct UserTaskBuilder {
    graph_builder: GraphBuilder,
    task: UserTask,
}

impl UserTaskBuilder {
    pub fn assignee(mut self, assignee: &str) -> Self {
        self.task.assignee = Some(assignee.to_string());
        self
    }

    pub fn form_key(mut self, form_key: &str) -> Self {
        self.task.form_key = Some(form_key.to_string());
        self
    }

    pub fn build(mut self) -> GraphBuilder {
        self.graph_builder.nodes.push(FlowNode::UserTask(self.task));
        self.graph_builder
    }
}
