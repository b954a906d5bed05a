//! Integration tests for isolator-interchange
//!
//! Exercises export/import against an in-memory store: redaction, collision
//! policy, placeholder handling and the file helpers.

use isolator_interchange::{
    example_document, InterchangeError, ProjectDraft, WorkspaceManager, SECRET_PLACEHOLDER,
};
use isolator_store::test_utils::create_test_store;
use isolator_store::{NewNetwork, NewProject, NewService, ProviderKind, Store};
use serde_json::json;

fn example_value() -> serde_json::Value {
    serde_json::to_value(example_document()).unwrap()
}

async fn seed_secret_project(store: &Store) -> String {
    let workspace = store.create_workspace("secrets-ws", None).await.unwrap();
    let project = store
        .create_project(NewProject {
            workspace_id: workspace.id.clone(),
            name: "vaulted".into(),
            path: "/srv/vaulted".into(),
            provider: ProviderKind::Docker,
            metadata: None,
        })
        .await
        .unwrap();
    let service = store
        .create_service(NewService {
            project_id: project.id.clone(),
            name: "api".into(),
            service_type: "fastapi".into(),
            port: Some(8000),
            image: Some("python:3.11-slim".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    store
        .set_environment_variable(&service.id, "SIGNING_SEED", "flagged-value", true)
        .await
        .unwrap();
    store
        .set_environment_variable(&service.id, "STRIPE_API_KEY", "sk_live_123", false)
        .await
        .unwrap();
    store
        .set_environment_variable(&service.id, "LOG_LEVEL", "info", false)
        .await
        .unwrap();

    workspace.id
}

#[tokio::test]
async fn test_import_canonical_example() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store.clone());

    let summary = manager.import_workspace(&example_value(), false).await.unwrap();
    assert_eq!(summary.projects_imported, 1);
    assert!(summary.skipped_projects.is_empty());

    let workspaces = store.list_workspaces().await.unwrap();
    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].id, summary.workspace_id);

    let projects = store.list_projects(Some(&summary.workspace_id)).await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].name, "ecommerce-app");

    let full = store.get_project_full_data(&projects[0].id).await.unwrap();
    assert_eq!(full.services.len(), 3);
    assert_eq!(full.networks.len(), 1);
    assert_eq!(full.networks[0].name, "ecommerce-network");

    let database = full.service("database").unwrap();
    assert_eq!(database.service.port, Some(5432));
    assert_eq!(database.environment["POSTGRES_PASSWORD"], "password");
    assert!(database.secret_keys.contains("POSTGRES_PASSWORD"));
    assert!(!database.secret_keys.contains("POSTGRES_DB"));
}

#[tokio::test]
async fn test_export_redacts_secrets_by_default() {
    let store = create_test_store().await;
    let workspace_id = seed_secret_project(&store).await;
    let manager = WorkspaceManager::new(store);

    let document = manager.export_workspace(Some(&workspace_id), false).await.unwrap();
    let env = &document.workspace.projects[0].services[0].environment;
    assert_eq!(env["SIGNING_SEED"], SECRET_PLACEHOLDER);
    assert_eq!(env["STRIPE_API_KEY"], SECRET_PLACEHOLDER);
    assert_eq!(env["LOG_LEVEL"], "info");

    let text = serde_json::to_string(&document).unwrap();
    assert!(!text.contains("flagged-value"));
    assert!(!text.contains("sk_live_123"));

    let with_secrets = manager.export_workspace(Some("secrets-ws"), true).await.unwrap();
    let env = &with_secrets.workspace.projects[0].services[0].environment;
    assert_eq!(env["SIGNING_SEED"], "flagged-value");
    assert_eq!(env["STRIPE_API_KEY"], "sk_live_123");
}

#[tokio::test]
async fn test_export_defaults_to_current_workspace() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store.clone());

    let err = manager.export_workspace(None, false).await.unwrap_err();
    assert!(matches!(err, InterchangeError::NotFound(_)));

    seed_secret_project(&store).await;
    let document = manager.export_workspace(None, false).await.unwrap();
    assert_eq!(document.workspace.name, "secrets-ws");
    assert_eq!(document.version, "2.0");
}

#[tokio::test]
async fn test_export_then_import_into_fresh_store() {
    let source = create_test_store().await;
    let source_manager = WorkspaceManager::new(source.clone());
    source_manager.import_workspace(&example_value(), false).await.unwrap();

    let project = source.get_project_by_name("ecommerce-app").await.unwrap();
    source
        .create_network(NewNetwork {
            project_id: project.id.clone(),
            name: "internal".into(),
            driver: Some("overlay".into()),
            subnet: Some("10.9.0.0/24".into()),
        })
        .await
        .unwrap();

    let document = source_manager.export_workspace(None, true).await.unwrap();

    let target = create_test_store().await;
    let target_manager = WorkspaceManager::new(target.clone());
    let value = serde_json::to_value(&document).unwrap();
    let summary = target_manager.import_workspace(&value, false).await.unwrap();
    assert_eq!(summary.projects_imported, 1);

    let original = source.get_project_full_data(&project.id).await.unwrap();
    let copied_id = target.get_project_by_name("ecommerce-app").await.unwrap().id;
    let copied = target.get_project_full_data(&copied_id).await.unwrap();

    let mut expected = ProjectDraft::from(&original);
    let mut actual = ProjectDraft::from(&copied);
    expected.id = None;
    actual.id = None;
    assert_eq!(actual, expected);
}

#[tokio::test]
async fn test_workspace_collision_requires_overwrite() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store.clone());

    let first = manager.import_workspace(&example_value(), false).await.unwrap();

    let err = manager.import_workspace(&example_value(), false).await.unwrap_err();
    assert!(matches!(err, InterchangeError::WouldOverwrite { entity: "Workspace", .. }));

    let second = manager.import_workspace(&example_value(), true).await.unwrap();
    assert_ne!(first.workspace_id, second.workspace_id);
    assert_eq!(second.projects_imported, 1);
    assert_eq!(store.list_workspaces().await.unwrap().len(), 1);
    assert!(store.get_workspace(&first.workspace_id).await.is_err());
}

#[tokio::test]
async fn test_failed_overwrite_keeps_the_existing_workspace() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store.clone());
    let original = manager.import_workspace(&example_value(), false).await.unwrap();

    let mut broken = example_value();
    broken["workspace"]["projects"][0]["services"][2]["environment"][""] = json!("orphan");

    let err = manager.import_workspace(&broken, true).await.unwrap_err();
    assert!(matches!(err, InterchangeError::Validation(_)));

    let workspace = store
        .get_workspace_by_name("Example Development Environment")
        .await
        .unwrap();
    assert_eq!(workspace.id, original.workspace_id);

    let project = store.get_project_by_name("ecommerce-app").await.unwrap();
    let database = store
        .find_service_by_name(&project.id, "database")
        .await
        .unwrap()
        .unwrap();
    let env = store.get_environment_variables(&database.id).await.unwrap();
    assert_eq!(env.len(), 3);
    assert_eq!(env["POSTGRES_DB"], "ecommerce");
}

#[tokio::test]
async fn test_project_collision_is_skipped_without_overwrite() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store.clone());
    manager.import_workspace(&example_value(), false).await.unwrap();

    let mut renamed = example_document();
    renamed.workspace.name = "Another Environment".into();
    renamed.workspace.projects[0].services.truncate(1);
    let mut extra = renamed.workspace.projects[0].clone();
    extra.name = "inventory".into();
    renamed.workspace.projects.push(extra);
    let value = serde_json::to_value(&renamed).unwrap();

    let summary = manager.import_workspace(&value, false).await.unwrap();
    assert_eq!(summary.projects_imported, 1);
    assert_eq!(summary.skipped_projects, vec!["ecommerce-app".to_string()]);

    // The original project keeps all three services
    let kept = store.get_project_by_name("ecommerce-app").await.unwrap();
    assert_eq!(store.list_services(&kept.id).await.unwrap().len(), 3);

    let mut third = renamed.clone();
    third.workspace.name = "Third Environment".into();
    let value = serde_json::to_value(&third).unwrap();
    let summary = manager.import_workspace(&value, true).await.unwrap();
    assert_eq!(summary.projects_imported, 2);

    let replaced = store.get_project_by_name("ecommerce-app").await.unwrap();
    assert_eq!(replaced.workspace_id, summary.workspace_id);
    assert_eq!(store.list_services(&replaced.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_placeholder_values_are_not_imported() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store.clone());

    let mut document = example_document();
    document.workspace.projects[0].services[2]
        .environment
        .insert("POSTGRES_PASSWORD".into(), SECRET_PLACEHOLDER.into());
    let value = serde_json::to_value(&document).unwrap();

    let summary = manager.import_workspace(&value, false).await.unwrap();
    assert_eq!(summary.skipped_variables, 1);

    let project = store.get_project_by_name("ecommerce-app").await.unwrap();
    let database = store
        .find_service_by_name(&project.id, "database")
        .await
        .unwrap()
        .unwrap();
    let env = store.get_environment_variables(&database.id).await.unwrap();
    assert!(!env.contains_key("POSTGRES_PASSWORD"));
    assert_eq!(env["POSTGRES_DB"], "ecommerce");
}

#[tokio::test]
async fn test_invalid_document_is_rejected_with_all_errors() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store.clone());

    let document = json!({
        "version": "2.0",
        "workspace": {
            "projects": [{
                "name": "bad",
                "path": "/bad",
                "services": [{"name": "api", "type": "fastapi", "port": 99999}]
            }]
        }
    });

    match manager.import_workspace(&document, false).await.unwrap_err() {
        InterchangeError::Validation(err) => {
            assert_eq!(err.errors.len(), 2);
            assert!(err.contains("workspace.name"));
            assert!(err.contains("port"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    assert!(store.list_workspaces().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_service_type_imports_with_warning() {
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store);

    let mut document = example_document();
    document.workspace.projects[0].services[1].service_type = "django".into();
    let value = serde_json::to_value(&document).unwrap();

    let summary = manager.import_workspace(&value, false).await.unwrap();
    assert_eq!(summary.projects_imported, 1);
    assert_eq!(summary.warnings.len(), 1);
}

#[tokio::test]
async fn test_file_helpers() {
    let temp = tempfile::tempdir().unwrap();
    let store = create_test_store().await;
    let manager = WorkspaceManager::new(store);

    let example_path = temp.path().join("nested").join("workspace.json");
    manager.write_example_file(&example_path).await.unwrap();
    assert!(manager.validate_file(&example_path).await.unwrap().warnings.is_empty());

    let summary = manager.import_from_file(&example_path, false).await.unwrap();
    assert_eq!(summary.projects_imported, 1);

    let export_path = temp.path().join("out").join("export.json");
    let exported = manager.export_to_file(&export_path, None, false).await.unwrap();
    let text = std::fs::read_to_string(&export_path).unwrap();
    let reread: isolator_interchange::WorkspaceDocument = serde_json::from_str(&text).unwrap();
    assert_eq!(reread, exported);
    assert!(text.contains(SECRET_PLACEHOLDER));

    let missing = manager
        .import_from_file(&temp.path().join("missing.json"), false)
        .await
        .unwrap_err();
    assert!(matches!(missing, InterchangeError::Io(_)));

    let garbage = temp.path().join("garbage.json");
    std::fs::write(&garbage, "{ not json").unwrap();
    assert!(matches!(
        manager.validate_file(&garbage).await.unwrap_err(),
        InterchangeError::Json(_)
    ));
}
