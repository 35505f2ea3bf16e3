use tracing::debug;
use crate::compiler::binder::DelegateBinder;
use crate::compiler::injector::ConditionInjector;
use crate::compiler::validator::Validator;
use crate::config::BindingSettings;
use crate::error::FlowResult;
use crate::model::ProcessGraph;
use crate::model::loader::{parse_graph, serialize_graph};

/// Runs the graph passes in their fixed order: validate, inject, bind.
///
/// Validation failures abort before the graph is touched.
pub struct Compiler {
    validator: Validator,
    injector: ConditionInjector,
    binder: DelegateBinder,
}

impl Compiler {
    pub fn new(bindings: BindingSettings) -> Self {
        Self {
            validator: Validator::new(),
            injector: ConditionInjector::new(),
            binder: DelegateBinder::new(bindings),
        }
    }

    pub fn prepare(&self, graph: &mut ProcessGraph) -> FlowResult<()> {
        // 1. Pass 1: Validate
        self.validator.validate(graph)?;

        // 2. Pass 2: Inject routing
        self.injector.inject(graph);

        // 3. Pass 3: Bind delegates
        self.binder.bind(graph);

        debug!(process_id = %graph.id, nodes = graph.nodes.len(), flows = graph.flows.len(), "Graph prepared");
        Ok(())
    }

    /// Parse + prepare, returning the graph ready to serialize.
    pub fn compile(&self, text: &str) -> FlowResult<ProcessGraph> {
        let mut graph = parse_graph(text)?;
        self.prepare(&mut graph)?;
        Ok(graph)
    }

    /// Parse + prepare + serialize.
    pub fn compile_to_text(&self, text: &str) -> FlowResult<String> {
        let graph = self.compile(text)?;
        serialize_graph(&graph)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(BindingSettings::default())
    }
}
