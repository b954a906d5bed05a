//! Structural validation of untyped workspace documents.
//!
//! Validation never stops at the first problem: every violation is collected
//! so a user can fix a document in one pass.

use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::document::{KNOWN_SERVICE_TYPES, SUPPORTED_VERSIONS};
use crate::error::ValidationError;
use isolator_store::ProviderKind;

/// Non-fatal findings from a successful validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub warnings: Vec<String>,
}

#[derive(Default)]
struct Collector {
    errors: Vec<String>,
    warnings: Vec<String>,
}

impl Collector {
    fn error(&mut self, message: String) {
        self.errors.push(message);
    }

    fn warn(&mut self, message: String) {
        self.warnings.push(message);
    }

    /// Require `field` to be present and a non-blank string.
    fn required_string(&mut self, object: &Map<String, Value>, path: &str, field: &str) {
        match object.get(field) {
            None | Some(Value::Null) => self.error(format!("Missing required field: {}.{}", path, field)),
            Some(Value::String(s)) if !s.trim().is_empty() => {}
            Some(_) => self.error(format!("{}.{} must be a non-empty string", path, field)),
        }
    }

    /// Allow `field` to be absent or null, otherwise require a string.
    fn optional_string(&mut self, object: &Map<String, Value>, path: &str, field: &str) {
        match object.get(field) {
            None | Some(Value::Null) | Some(Value::String(_)) => {}
            Some(_) => self.error(format!("{}.{} must be a string", path, field)),
        }
    }

    /// Return the array at `field`, treating absence as empty. `null` is not a list.
    fn optional_array<'a>(
        &mut self,
        object: &'a Map<String, Value>,
        path: &str,
        field: &str,
    ) -> &'a [Value] {
        match object.get(field) {
            None => &[],
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.error(format!("{}.{} must be a list", path, field));
                &[]
            }
        }
    }
}

/// Validate a document, returning warnings on success or every error found.
pub fn validate_document(document: &Value) -> Result<ValidationReport, ValidationError> {
    let mut c = Collector::default();

    let Some(root) = document.as_object() else {
        return Err(ValidationError {
            errors: vec!["Document must be a JSON object".to_string()],
        });
    };

    match root.get("version") {
        None | Some(Value::Null) => c.error("Missing required field: version".to_string()),
        Some(Value::String(v)) if SUPPORTED_VERSIONS.contains(&v.as_str()) => {}
        Some(other) => {
            let version = match other {
                Value::String(v) => v.clone(),
                v => v.to_string(),
            };
            c.error(format!(
                "Unsupported version: {}. Supported: {}",
                version,
                SUPPORTED_VERSIONS.join(", ")
            ))
        }
    }

    match root.get("workspace") {
        None | Some(Value::Null) => c.error("Missing required field: workspace".to_string()),
        Some(Value::Object(workspace)) => validate_workspace(&mut c, workspace),
        Some(_) => c.error("workspace must be an object".to_string()),
    }

    if c.errors.is_empty() {
        Ok(ValidationReport {
            warnings: c.warnings,
        })
    } else {
        Err(ValidationError { errors: c.errors })
    }
}

fn validate_workspace(c: &mut Collector, workspace: &Map<String, Value>) {
    c.required_string(workspace, "workspace", "name");
    for field in ["id", "description", "created_at", "updated_at"] {
        c.optional_string(workspace, "workspace", field);
    }

    let projects = c.optional_array(workspace, "workspace", "projects");
    let mut seen = HashSet::new();

    for (i, project) in projects.iter().enumerate() {
        let path = format!("projects[{}]", i);
        let Some(project) = project.as_object() else {
            c.error(format!("{} must be an object", path));
            continue;
        };

        if let Some(name) = project.get("name").and_then(Value::as_str) {
            if !seen.insert(name) {
                c.error(format!("Duplicate project name: {}", name));
            }
        }

        validate_project(c, project, &path);
    }
}

fn validate_project(c: &mut Collector, project: &Map<String, Value>, path: &str) {
    c.required_string(project, path, "name");
    c.required_string(project, path, "path");
    c.optional_string(project, path, "id");

    match project.get("provider") {
        None => {}
        Some(Value::String(p)) if p.parse::<ProviderKind>().is_ok() => {}
        Some(_) => c.error(format!(
            "{}.provider must be one of: {}",
            path,
            ProviderKind::ALL
                .iter()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }

    if let Some(metadata) = project.get("metadata") {
        if !(metadata.is_object() || metadata.is_null()) {
            c.error(format!("{}.metadata must be an object", path));
        }
    }

    let services = c.optional_array(project, path, "services");
    let mut seen = HashSet::new();
    for (i, service) in services.iter().enumerate() {
        let service_path = format!("{}.services[{}]", path, i);
        let Some(service) = service.as_object() else {
            c.error(format!("{} must be an object", service_path));
            continue;
        };

        if let Some(name) = service.get("name").and_then(Value::as_str) {
            if !seen.insert(name) {
                c.error(format!("{}: duplicate service name: {}", path, name));
            }
        }

        validate_service(c, service, &service_path);
    }

    let networks = c.optional_array(project, path, "networks");
    let mut seen = HashSet::new();
    for (i, network) in networks.iter().enumerate() {
        let network_path = format!("{}.networks[{}]", path, i);
        let Some(network) = network.as_object() else {
            c.error(format!("{} must be an object", network_path));
            continue;
        };

        if let Some(name) = network.get("name").and_then(Value::as_str) {
            if !seen.insert(name) {
                c.error(format!("{}: duplicate network name: {}", path, name));
            }
        }

        c.required_string(network, &network_path, "name");
        c.optional_string(network, &network_path, "driver");
        c.optional_string(network, &network_path, "subnet");
    }
}

fn validate_service(c: &mut Collector, service: &Map<String, Value>, path: &str) {
    c.required_string(service, path, "name");
    c.required_string(service, path, "type");

    if let Some(service_type) = service.get("type").and_then(Value::as_str) {
        if !service_type.trim().is_empty() && !KNOWN_SERVICE_TYPES.contains(&service_type) {
            c.warn(format!(
                "{}.type '{}' is not a known service type ({})",
                path,
                service_type,
                KNOWN_SERVICE_TYPES.join(", ")
            ));
        }
    }

    match service.get("port") {
        None | Some(Value::Null) => {}
        Some(port) => {
            let in_range = port
                .as_u64()
                .map(|p| (1..=65535).contains(&p))
                .unwrap_or(false);
            if !in_range {
                c.error(format!("{}.port must be an integer between 1 and 65535", path));
            }
        }
    }

    for field in ["image", "dockerfile_path", "command"] {
        c.optional_string(service, path, field);
    }

    match service.get("environment") {
        None => {}
        Some(Value::Object(env)) => {
            if env.values().any(|v| !v.is_string()) {
                c.error(format!(
                    "{}.environment entries must be string key-value pairs",
                    path
                ));
            }
            if env.keys().any(|k| k.trim().is_empty()) {
                c.error(format!("{}.environment keys must not be empty", path));
            }
        }
        Some(_) => c.error(format!("{}.environment must be a dictionary", path)),
    }
}
