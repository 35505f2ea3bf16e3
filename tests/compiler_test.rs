use flowsync::compiler::Compiler;
use flowsync::compiler::binder::DelegateBinder;
use flowsync::compiler::injector::ConditionInjector;
use flowsync::compiler::validator::validate;
use flowsync::config::BindingSettings;
use flowsync::error::FlowError;
use flowsync::model::{ExecutionListener, FlowNode, ProcessGraph};
use flowsync::model::builder::GraphBuilder;

fn branching_graph() -> ProcessGraph {
    GraphBuilder::new("branching")
        .start("start")
        .user_task("review", "Review").build()
        .gateway("decide")
        .service_task("a", "A", None)
        .service_task("b", "B", None)
        .service_task("c", "C", None)
        .end("end")
        .connect("f0", "start", "review")
        .connect("f1", "review", "decide")
        .connect("zz_first", "decide", "a")
        .connect_named("aa_second", "decide", "b", "Approve")
        .connect("mm_third", "decide", "c")
        .connect("fa", "a", "end")
        .connect("fb", "b", "end")
        .connect("fc", "c", "end")
        .build()
}

fn flow<'a>(graph: &'a ProcessGraph, id: &str) -> &'a flowsync::model::SequenceFlow {
    graph.flows.iter().find(|f| f.id == id).expect("flow exists")
}

#[test]
fn test_validator_accepts_gateway_after_user_task() {
    assert!(validate(&branching_graph()).is_ok());
}

#[test]
fn test_validator_rejects_gateway_after_service_task() {
    let graph = GraphBuilder::new("bad")
        .start("start")
        .service_task("auto", "Auto", None)
        .gateway("decide")
        .end("end")
        .connect("f0", "start", "auto")
        .connect("f1", "auto", "decide")
        .connect("f2", "decide", "end")
        .build();

    match validate(&graph) {
        Err(FlowError::StructuralViolation { gateway_id }) => assert_eq!(gateway_id, "decide"),
        other => panic!("Expected StructuralViolation, got {:?}", other),
    }
}

#[test]
fn test_validator_reports_first_violation_in_declaration_order() {
    let graph = GraphBuilder::new("two-bad")
        .start("start")
        .gateway("declared_first")
        .gateway("declared_second")
        .end("end")
        .connect("f0", "start", "declared_second")
        .connect("f1", "declared_second", "declared_first")
        .connect("f2", "declared_first", "end")
        .build();

    match validate(&graph) {
        Err(FlowError::StructuralViolation { gateway_id }) => assert_eq!(gateway_id, "declared_first"),
        other => panic!("Expected StructuralViolation, got {:?}", other),
    }
}

#[test]
fn test_validator_accepts_gateway_with_mixed_incoming() {
    let graph = GraphBuilder::new("mixed")
        .start("start")
        .user_task("review", "Review").build()
        .service_task("auto", "Auto", None)
        .gateway("decide")
        .end("end")
        .connect("f0", "start", "auto")
        .connect("f1", "auto", "decide")
        .connect("f2", "review", "decide")
        .connect("f3", "decide", "end")
        .build();

    assert!(validate(&graph).is_ok());
}

#[test]
fn test_injection_follows_declared_order_not_ids() {
    let mut graph = branching_graph();
    ConditionInjector::new().inject(&mut graph);

    assert_eq!(flow(&graph, "zz_first").condition_expression.as_deref(), Some("input == 0"));
    assert_eq!(flow(&graph, "aa_second").condition_expression.as_deref(), Some("input == 1"));
    assert_eq!(flow(&graph, "mm_third").condition_expression.as_deref(), Some("input == 2"));

    assert_eq!(flow(&graph, "zz_first").name.as_deref(), Some("Flow 1"));
    assert_eq!(flow(&graph, "aa_second").name.as_deref(), Some("Approve"));
    assert_eq!(flow(&graph, "mm_third").name.as_deref(), Some("Flow 3"));

    // Flows leaving non-gateway nodes are not touched.
    assert!(flow(&graph, "f1").condition_expression.is_none());
    assert!(flow(&graph, "f1").name.is_none());
}

#[test]
fn test_injection_overwrites_conditions_but_keeps_user_names() {
    let mut graph = branching_graph();
    for f in graph.flows.iter_mut().filter(|f| f.source == "decide") {
        f.condition_expression = Some("${approved}".to_string());
    }

    let injector = ConditionInjector::new();
    injector.inject(&mut graph);
    let once = graph.clone();
    injector.inject(&mut graph);

    assert_eq!(graph, once);
    assert_eq!(flow(&graph, "aa_second").name.as_deref(), Some("Approve"));
    assert_eq!(flow(&graph, "aa_second").condition_expression.as_deref(), Some("input == 1"));
}

#[test]
fn test_injection_skips_single_path_gateways() {
    let mut graph = GraphBuilder::new("single")
        .start("start")
        .user_task("review", "Review").build()
        .gateway("decide")
        .end("end")
        .connect("f0", "start", "review")
        .connect("f1", "review", "decide")
        .connect("f2", "decide", "end")
        .build();

    ConditionInjector::new().inject(&mut graph);
    assert!(flow(&graph, "f2").condition_expression.is_none());
    assert!(flow(&graph, "f2").name.is_none());
}

#[test]
fn test_injected_conditions_select_matching_route() {
    let mut graph = branching_graph();
    ConditionInjector::new().inject(&mut graph);

    assert_eq!(graph.select_route("decide", 0).map(|f| f.id.as_str()), Some("zz_first"));
    assert_eq!(graph.select_route("decide", 1).map(|f| f.id.as_str()), Some("aa_second"));
    assert_eq!(graph.select_route("decide", 2).map(|f| f.id.as_str()), Some("mm_third"));
    assert!(graph.select_route("decide", 3).is_none());
}

#[test]
fn test_binder_fills_service_task_and_overwrites_send_task() {
    let mut graph = GraphBuilder::new("bindings")
        .start("start")
        .service_task("unbound", "Unbound", None)
        .service_task("bound", "Bound", Some("#{bookShipPlace}"))
        .send_task("mail", "Mail", Some("${customMailer}"))
        .end("end")
        .build();

    let defaults = BindingSettings::default();
    DelegateBinder::default().bind(&mut graph);

    let binding = |id: &str| match graph.node(id) {
        Some(FlowNode::ServiceTask(t)) => t.automation_binding.clone(),
        Some(FlowNode::SendTask(t)) => t.automation_binding.clone(),
        _ => None,
    };
    assert_eq!(binding("unbound"), Some(defaults.service_task.clone()));
    assert_eq!(binding("unbound").as_deref(), Some("#{defaultCamundaDelegateClass}"));
    assert_eq!(binding("bound").as_deref(), Some("#{bookShipPlace}"));
    // Send tasks always get the notification binding, even over a custom one.
    assert_eq!(binding("mail"), Some(defaults.send_task.clone()));
}

#[test]
fn test_binder_attaches_completion_listener_once() {
    let mut graph = GraphBuilder::new("ends")
        .start("start")
        .end("end_a")
        .end("end_b")
        .build();

    let binder = DelegateBinder::default();
    binder.bind(&mut graph);
    let once = graph.clone();
    binder.bind(&mut graph);
    assert_eq!(graph, once);

    let expected = ExecutionListener {
        event: "end".to_string(),
        class: "com.example.workflow.listener.ProcessCompletionListener".to_string(),
    };
    for id in ["end_a", "end_b"] {
        match graph.node(id) {
            Some(FlowNode::EndEvent(e)) => assert_eq!(e.completion_binding.as_ref(), Some(&expected)),
            other => panic!("Expected end event, got {:?}", other),
        }
    }
}

#[test]
fn test_binder_uses_configured_identifiers() {
    let bindings = BindingSettings {
        service_task: "#{auditDelegate}".to_string(),
        send_task: "${smsDelegate}".to_string(),
        completion_listener: "acme.Done".to_string(),
        completion_event: "end".to_string(),
    };
    let mut graph = GraphBuilder::new("custom")
        .service_task("svc", "Svc", Some(""))
        .send_task("send", "Send", None)
        .end("end")
        .build();

    DelegateBinder::new(bindings).bind(&mut graph);

    match graph.node("svc") {
        Some(FlowNode::ServiceTask(t)) => assert_eq!(t.automation_binding.as_deref(), Some("#{auditDelegate}")),
        other => panic!("Unexpected node {:?}", other),
    }
    match graph.node("send") {
        Some(FlowNode::SendTask(t)) => assert_eq!(t.automation_binding.as_deref(), Some("${smsDelegate}")),
        other => panic!("Unexpected node {:?}", other),
    }
    match graph.node("end") {
        Some(FlowNode::EndEvent(e)) => assert_eq!(e.completion_binding.as_ref().map(|l| l.class.as_str()), Some("acme.Done")),
        other => panic!("Unexpected node {:?}", other),
    }
}

#[test]
fn test_compiler_rejects_before_mutating() {
    let text = r#"
id: bad
nodes:
  - type: ServiceTask
    id: auto
  - type: ExclusiveGateway
    id: decide
  - type: EndEvent
    id: a
  - type: EndEvent
    id: b
flows:
  - id: f1
    source: auto
    target: decide
  - id: f2
    source: decide
    target: a
  - id: f3
    source: decide
    target: b
"#;
    let err = Compiler::default().compile(text).unwrap_err();
    assert!(matches!(err, FlowError::StructuralViolation { ref gateway_id } if gateway_id == "decide"));
}

#[test]
fn test_compiler_output_is_stable() {
    let compiler = Compiler::default();
    let text = flowsync::model::loader::serialize_graph(&branching_graph()).unwrap();

    let first = compiler.compile_to_text(&text).expect("Compilation failed");
    let second = compiler.compile_to_text(&first).expect("Recompilation failed");
    assert_eq!(first, second);
    assert!(first.contains("input == 0"));
}
