//! Integration tests for the engine
//!
//! A stored project is driven through a `MockProvider` registered under the
//! `docker` name, so the status bookkeeping and rollback can be observed
//! without a container runtime.

use isolator::{Config, Engine, EngineError, ProjectStatus, ProviderRegistry};
use isolator_interchange::example_document;
use isolator_provider::mock::MockProvider;
use isolator_provider::{ProviderError, ServiceState};
use isolator_store::test_utils::create_test_store;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn engine_with(mock: Arc<MockProvider>) -> (Engine, TempDir) {
    let temp = tempfile::tempdir().unwrap();
    let mut registry = ProviderRegistry::new();
    registry.register_instance("docker", mock);

    let engine = Engine::from_parts(
        Config::with_home(temp.path()),
        create_test_store().await,
        registry,
    );

    let document = serde_json::to_value(example_document()).unwrap();
    engine.workspaces().import_workspace(&document, false).await.unwrap();
    (engine, temp)
}

async fn status(engine: &Engine) -> ProjectStatus {
    engine
        .store()
        .get_project_by_name("ecommerce-app")
        .await
        .unwrap()
        .status
}

#[tokio::test]
async fn test_start_runs_networks_then_services() {
    let mock = Arc::new(MockProvider::new());
    let (engine, _temp) = engine_with(mock.clone()).await;

    assert_eq!(status(&engine).await, ProjectStatus::Stopped);
    engine.start_project("ecommerce-app").await.unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            "network create ecommerce-app-ecommerce-network",
            "start ecommerce-app-backend",
            "start ecommerce-app-database",
            "start ecommerce-app-frontend",
        ]
    );
    assert_eq!(status(&engine).await, ProjectStatus::Running);
}

#[tokio::test]
async fn test_failed_start_rolls_back_and_marks_error() {
    let mock = Arc::new(MockProvider::new().fail_on_start("ecommerce-app-database"));
    let (engine, _temp) = engine_with(mock.clone()).await;

    let err = engine.start_project("ecommerce-app").await.unwrap_err();
    assert!(matches!(err, EngineError::Provider(ProviderError::Service { .. })));

    assert_eq!(mock.state_of("ecommerce-app-backend"), Some(ServiceState::Stopped));
    assert_eq!(mock.state_of("ecommerce-app-frontend"), None);
    assert!(mock.has_network("ecommerce-app-ecommerce-network"));
    assert_eq!(status(&engine).await, ProjectStatus::Error);
}

#[tokio::test]
async fn test_stop_and_remove_update_status() {
    let mock = Arc::new(MockProvider::new());
    let (engine, _temp) = engine_with(mock.clone()).await;
    engine.start_project("ecommerce-app").await.unwrap();

    assert!(engine.stop_project("ecommerce-app").await.unwrap());
    assert_eq!(status(&engine).await, ProjectStatus::Stopped);
    assert_eq!(mock.state_of("ecommerce-app-frontend"), Some(ServiceState::Stopped));

    assert!(engine.remove_project("ecommerce-app").await.unwrap());
    assert!(!mock.has_network("ecommerce-app-ecommerce-network"));
    assert_eq!(mock.state_of("ecommerce-app-backend"), None);

    // The stored definition survives runtime removal
    let project = engine.store().get_project_by_name("ecommerce-app").await.unwrap();
    assert_eq!(engine.store().list_services(&project.id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_partial_stop_marks_error() {
    let mock = Arc::new(MockProvider::new().fail_on_stop("ecommerce-app-backend"));
    let (engine, _temp) = engine_with(mock.clone()).await;
    engine.start_project("ecommerce-app").await.unwrap();

    assert!(!engine.stop_project("ecommerce-app").await.unwrap());
    assert_eq!(mock.state_of("ecommerce-app-database"), Some(ServiceState::Stopped));
    assert_eq!(status(&engine).await, ProjectStatus::Error);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_operations_on_one_project_wait_for_each_other() {
    let mock = Arc::new(MockProvider::new().with_start_delay(Duration::from_millis(200)));
    let (engine, _temp) = engine_with(mock.clone()).await;

    let start = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.start_project("ecommerce-app").await })
    };
    while !engine.is_busy("ecommerce-app") {
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let stop = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.stop_project("ecommerce-app").await })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The waiting stop has not touched the stored status
    assert_eq!(status(&engine).await, ProjectStatus::Starting);

    start.await.unwrap().unwrap();
    assert!(stop.await.unwrap().unwrap());
    assert_eq!(status(&engine).await, ProjectStatus::Stopped);
    assert!(!engine.is_busy("ecommerce-app"));

    let calls = mock.calls();
    let last_start = calls.iter().rposition(|c| c.starts_with("start ")).unwrap();
    let first_stop = calls.iter().position(|c| c.starts_with("stop ")).unwrap();
    assert!(last_start < first_stop);
}

#[tokio::test]
async fn test_unavailable_provider() {
    let (engine, _temp) = engine_with(Arc::new(MockProvider::unavailable())).await;

    let err = engine.start_project("ecommerce-app").await.unwrap_err();
    assert!(matches!(err, EngineError::Provider(ProviderError::Unavailable(_))));
    assert_eq!(status(&engine).await, ProjectStatus::Error);

    let report = engine.health_check(None).await;
    assert!(!report.available);
    assert_eq!(report.services_count, 0);

    let listing = engine.available_providers().await;
    assert_eq!(listing.get("docker"), Some(&false));
}

#[tokio::test]
async fn test_unknown_project() {
    let (engine, _temp) = engine_with(Arc::new(MockProvider::new())).await;
    let err = engine.start_project("missing").await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_health_check() {
    let mock = Arc::new(MockProvider::new().named("docker"));
    let (engine, _temp) = engine_with(mock).await;
    engine.start_project("ecommerce-app").await.unwrap();

    let report = engine.health_check(Some("docker")).await;
    assert_eq!(report.provider, "docker");
    assert!(report.available);
    assert_eq!(report.version.as_deref(), Some("mock 1.0"));
    assert_eq!(report.services_count, 3);
    assert_eq!(report.networks_count, 1);

    let unknown = engine.health_check(Some("podman")).await;
    assert_eq!(unknown.provider, "podman");
    assert!(!unknown.available);
}

#[tokio::test]
async fn test_open_creates_state_and_reuses_key() {
    let temp = tempfile::tempdir().unwrap();
    let home = temp.path().join("state");

    let engine = Engine::open(Config::with_home(&home)).await.unwrap();
    let workspace = engine
        .store()
        .create_workspace("persistent", None)
        .await
        .unwrap();
    let project = engine
        .store()
        .create_project(isolator_store::NewProject {
            workspace_id: workspace.id.clone(),
            name: "kept".into(),
            path: "/srv/kept".into(),
            provider: isolator_store::ProviderKind::Docker,
            metadata: None,
        })
        .await
        .unwrap();
    let service = engine
        .store()
        .create_service(isolator_store::NewService {
            project_id: project.id,
            name: "api".into(),
            service_type: "fastapi".into(),
            image: Some("python:3.11-slim".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    engine
        .store()
        .set_environment_variable(&service.id, "API_TOKEN", "abc123", true)
        .await
        .unwrap();

    assert!(home.join("isolator.db").exists());
    assert!(home.join("master.key").exists());
    assert!(engine.registry().names().contains(&"docker".to_string()));
    drop(engine);

    let reopened = Engine::open(Config::with_home(&home)).await.unwrap();
    assert!(reopened
        .store()
        .find_workspace_by_name("persistent")
        .await
        .unwrap()
        .is_some());
    let env = reopened
        .store()
        .get_environment_variables(&service.id)
        .await
        .unwrap();
    assert_eq!(env["API_TOKEN"], "abc123");
}
