//! Translation from stored projects to provider plans.

use isolator_provider::{NetworkPlan, ProjectPlan, ServicePlan};
use isolator_store::{FullProject, FullService, Network};
use isolator_vault::DECRYPTION_PLACEHOLDER;
use std::path::Path;
use tracing::warn;

/// Build the runtime plan for a stored project.
///
/// Relative Dockerfile paths are resolved against the project path, which is
/// also the build context. Variables whose secret could not be decrypted are
/// left out rather than passed to the container as the placeholder.
pub fn project_plan(full: &FullProject) -> ProjectPlan {
    let root = Path::new(&full.project.path);

    ProjectPlan {
        name: full.project.name.clone(),
        services: full
            .services
            .iter()
            .map(|service| service_plan(&full.project.name, root, service))
            .collect(),
        networks: full.networks.iter().map(network_plan).collect(),
    }
}

fn service_plan(project: &str, root: &Path, full: &FullService) -> ServicePlan {
    let service = &full.service;

    let environment = full
        .environment
        .iter()
        .filter(|(key, value)| {
            let usable = value.as_str() != DECRYPTION_PLACEHOLDER;
            if !usable {
                warn!(project, service = %service.name, key = %key, "secret unavailable, not passed to service");
            }
            usable
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let dockerfile_path = service
        .dockerfile_path
        .as_deref()
        .map(|path| root.join(path).to_string_lossy().into_owned());

    ServicePlan {
        name: service.name.clone(),
        image: service.image.clone(),
        build_context: dockerfile_path
            .as_ref()
            .map(|_| root.to_string_lossy().into_owned()),
        dockerfile_path,
        command: service.command.clone(),
        port: service.port,
        environment,
    }
}

fn network_plan(network: &Network) -> NetworkPlan {
    NetworkPlan {
        name: network.name.clone(),
        driver: network.driver.clone(),
        subnet: network.subnet.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use isolator_store::test_utils::create_test_store;
    use isolator_store::{NewNetwork, NewProject, NewService, ProviderKind};

    #[tokio::test]
    async fn test_plan_resolves_paths_and_networks() {
        let store = create_test_store().await;
        let workspace = store.create_workspace("ws", None).await.unwrap();
        let project = store
            .create_project(NewProject {
                workspace_id: workspace.id,
                name: "blog".into(),
                path: "/srv/blog".into(),
                provider: ProviderKind::Docker,
                metadata: None,
            })
            .await
            .unwrap();
        let web = store
            .create_service(NewService {
                project_id: project.id.clone(),
                name: "web".into(),
                service_type: "nginx".into(),
                port: Some(8080),
                dockerfile_path: Some("docker/Dockerfile".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .set_environment_variable(&web.id, "API_TOKEN", "t0ken", true)
            .await
            .unwrap();
        store
            .create_network(NewNetwork {
                project_id: project.id.clone(),
                name: "public".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let plan = project_plan(&store.get_project_full_data(&project.id).await.unwrap());

        assert_eq!(plan.name, "blog");
        let web = &plan.services[0];
        assert_eq!(web.dockerfile_path.as_deref(), Some("/srv/blog/docker/Dockerfile"));
        assert_eq!(web.build_context.as_deref(), Some("/srv/blog"));
        assert_eq!(web.environment["API_TOKEN"], "t0ken");
        assert_eq!(plan.networks[0].driver, "bridge");
        assert_eq!(plan.network_resource_name("public"), "blog-public");
    }

    #[tokio::test]
    async fn test_undecryptable_secret_is_dropped() {
        let store = create_test_store().await;
        let workspace = store.create_workspace("ws", None).await.unwrap();
        let project = store
            .create_project(NewProject {
                workspace_id: workspace.id,
                name: "vaulted".into(),
                path: "/srv/vaulted".into(),
                provider: ProviderKind::Docker,
                metadata: None,
            })
            .await
            .unwrap();
        store
            .create_service(NewService {
                project_id: project.id.clone(),
                name: "api".into(),
                service_type: "fastapi".into(),
                image: Some("python:3.11-slim".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let mut full = store.get_project_full_data(&project.id).await.unwrap();
        let api = &mut full.services[0];
        api.environment.insert("DB_PASSWORD".into(), DECRYPTION_PLACEHOLDER.into());
        api.environment.insert("LOG_LEVEL".into(), "debug".into());

        let plan = project_plan(&full);
        assert!(!plan.services[0].environment.contains_key("DB_PASSWORD"));
        assert_eq!(plan.services[0].environment["LOG_LEVEL"], "debug");
        assert_eq!(plan.services[0].dockerfile_path, None);
        assert_eq!(plan.services[0].build_context, None);
    }
}
