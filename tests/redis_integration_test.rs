use flowsync::runtime::coordinator::{DeploymentCoordinator, RoutingOutcome, TaskRoutingUpdate};
use flowsync::runtime::engine::{DeploymentEngine, DeploymentRequest};
use flowsync::runtime::redis_engine::RedisEngine;
use flowsync::runtime::redis_storage::RedisMetadataStore;
use flowsync::runtime::storage::{FormRecord, MetadataStore, WorkflowRecord};
use std::sync::Arc;
use serde_json::json;
use redis::Client;

// Local Redis, db 6 is flushed by the tests.
fn get_redis_client() -> Client {
    let url = std::env::var("FLOWSYNC_TEST_REDIS").unwrap_or_else(|_| "redis://localhost:6379/6".to_string());
    redis::Client::open(url).expect("Invalid Redis URL")
}

async fn flushed_client() -> Client {
    let client = get_redis_client();
    let mut conn = client.get_multiplexed_async_connection().await.expect("Failed to connect to Redis");
    let _: () = redis::cmd("FLUSHDB").query_async(&mut conn).await.expect("Failed to flush db");
    client
}

async fn flushed_store(prefix: &str) -> RedisMetadataStore {
    RedisMetadataStore::new(flushed_client().await, prefix.to_string())
}

#[tokio::test]
#[ignore] // Needs a running Redis
async fn test_redis_store_records() {
    let store = flushed_store("flowsync:test").await;

    let workflow = store.save_workflow(WorkflowRecord {
        id: String::new(),
        name: "Loan".to_string(),
        resource_name: "loan.bpmn".to_string(),
        graph_text: "id: loan\n".to_string(),
        last_deployment_id: Some("d-1".to_string()),
    }).await.expect("Failed to save workflow");
    assert!(!workflow.id.is_empty());

    assert_eq!(store.get_workflow(&workflow.id).await.unwrap(), Some(workflow.clone()));
    assert_eq!(store.find_workflow_by_name("Loan").await.unwrap(), Some(workflow.clone()));
    assert_eq!(store.find_workflow_by_deployment("d-1").await.unwrap(), Some(workflow.clone()));
    assert!(store.find_workflow_by_deployment("d-2").await.unwrap().is_none());

    let form = store.save_form(FormRecord {
        id: String::new(),
        form_key: "review-form".to_string(),
        form_type: None,
        content: "{\"components\":[]}".to_string(),
    }).await.expect("Failed to save form");
    assert_eq!(store.find_form_by_key("review-form").await.unwrap(), Some(form.clone()));
    assert_eq!(store.list_forms().await.unwrap().len(), 1);

    store.delete_workflow(&workflow.id).await.unwrap();
    store.delete_form(&form.id).await.unwrap();
    assert!(store.list_workflows().await.unwrap().is_empty());
    assert!(store.list_forms().await.unwrap().is_empty());
}

#[tokio::test]
#[ignore] // Needs a running Redis
async fn test_redis_backed_routing_update() {
    let client = flushed_client().await;
    let store = Arc::new(RedisMetadataStore::new(client.clone(), "flowsync:routing".to_string()));
    let engine = Arc::new(RedisEngine::new(client, "flowsync:routing"));
    let coordinator = DeploymentCoordinator::new(engine, store.clone());

    let graph = r#"
id: expense
nodes:
  - type: StartEvent
    id: start
  - type: UserTask
    id: review
  - type: ExclusiveGateway
    id: decide
  - type: EndEvent
    id: paid
  - type: EndEvent
    id: refused
flows:
  - id: f0
    source: start
    target: review
  - id: f1
    source: review
    target: decide
  - id: f2
    source: decide
    target: paid
  - id: f3
    source: decide
    target: refused
"#;
    let record = coordinator.deploy_new("Expense", graph).await.expect("Deploy failed");
    store.save_form(FormRecord {
        id: String::new(),
        form_key: "expense-form".to_string(),
        form_type: None,
        content: json!({ "components": [] }).to_string(),
    }).await.unwrap();

    let outcome = coordinator.update_task_routing(TaskRoutingUpdate {
        deployment_id: record.last_deployment_id.clone().unwrap(),
        task_id: "review".to_string(),
        form_key: "expense-form".to_string(),
        assignee: Some("FINANCE".to_string()),
        last_known_deployment_id: None,
    }).await.expect("Routing update failed");

    assert!(matches!(outcome, RoutingOutcome::FormUpdated { .. }));
    let stored = store.get_workflow(&record.id).await.unwrap().unwrap();
    assert_eq!(&stored, outcome.workflow());
    let form = store.find_form_by_key("expense-form").await.unwrap().unwrap();
    assert!(form.content.contains("\"input\""));
}

#[tokio::test]
#[ignore] // Needs a running Redis
async fn test_redis_engine_keeps_deployments() {
    let engine = RedisEngine::new(flushed_client().await, "flowsync:engine");
    let text = "id: simple\nnodes:\n  - type: StartEvent\n    id: start\n";

    let first = engine.submit(DeploymentRequest {
        name: "shared".to_string(),
        resource_name: "legacy.bpmn".to_string(),
        text: text.to_string(),
        base_deployment_id: None,
    }).await.expect("Submit failed");
    let second = engine.submit(DeploymentRequest {
        name: "shared".to_string(),
        resource_name: "simple.bpmn".to_string(),
        text: text.to_string(),
        base_deployment_id: Some(first.id.clone()),
    }).await.expect("Submit failed");

    let definition = engine.find_process_definition_by_deployment(&second.id).await.unwrap().unwrap();
    assert_eq!(definition.version, 2);
    assert_eq!(engine.graph_text(&definition).await.unwrap(), text);
    assert_eq!(engine.find_deployment_by_name("shared").await.unwrap(), Some(first.clone()));
    assert_eq!(engine.find_deployment(&second.id).await.unwrap(), Some(second));

    // A second client sees the same state.
    let other = RedisEngine::new(get_redis_client(), "flowsync:engine");
    assert_eq!(other.find_deployment(&first.id).await.unwrap(), Some(first));
}
