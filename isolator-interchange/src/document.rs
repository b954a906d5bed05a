//! Typed form of the portable workspace document (`workspace.json`).

use isolator_store::ProviderKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// The only document version this build reads and writes.
pub const DOCUMENT_VERSION: &str = "2.0";

pub const SUPPORTED_VERSIONS: &[&str] = &[DOCUMENT_VERSION];

/// Service types with first-class support; others are accepted with a warning.
pub const KNOWN_SERVICE_TYPES: &[&str] = &["react", "fastapi", "postgresql", "redis", "nginx"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceDocument {
    pub version: String,
    pub workspace: WorkspaceEntry,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub provider: ProviderKind,
    #[serde(default)]
    pub services: Vec<ServiceEntry>,
    #[serde(default)]
    pub networks: Vec<NetworkEntry>,
    #[serde(default = "empty_object")]
    pub metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<String>,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A complete, valid document describing a three-tier web application.
pub fn example_document() -> WorkspaceDocument {
    let service = |name: &str, service_type: &str, port: u16, image: &str, environment| {
        ServiceEntry {
            name: name.to_string(),
            service_type: service_type.to_string(),
            port: Some(port),
            image: Some(image.to_string()),
            dockerfile_path: None,
            command: None,
            environment,
        }
    };

    WorkspaceDocument {
        version: DOCUMENT_VERSION.to_string(),
        workspace: WorkspaceEntry {
            id: None,
            name: "Example Development Environment".to_string(),
            description: Some("Example workspace for Isolator".to_string()),
            projects: vec![ProjectEntry {
                id: None,
                name: "ecommerce-app".to_string(),
                path: "./projects/ecommerce".to_string(),
                provider: ProviderKind::Docker,
                services: vec![
                    service(
                        "frontend",
                        "react",
                        3000,
                        "node:18-alpine",
                        env(&[
                            ("NODE_ENV", "development"),
                            ("REACT_APP_API_URL", "http://api.ecommerce-app.local"),
                        ]),
                    ),
                    service(
                        "backend",
                        "fastapi",
                        8000,
                        "python:3.11-slim",
                        env(&[
                            ("ENVIRONMENT", "development"),
                            ("DATABASE_URL", "postgresql://user:pass@db:5432/ecommerce"),
                        ]),
                    ),
                    service(
                        "database",
                        "postgresql",
                        5432,
                        "postgres:15-alpine",
                        env(&[
                            ("POSTGRES_DB", "ecommerce"),
                            ("POSTGRES_USER", "user"),
                            ("POSTGRES_PASSWORD", "password"),
                        ]),
                    ),
                ],
                networks: vec![NetworkEntry {
                    name: "ecommerce-network".to_string(),
                    driver: Some("bridge".to_string()),
                    subnet: None,
                }],
                metadata: empty_object(),
            }],
            created_at: None,
            updated_at: None,
        },
    }
}
