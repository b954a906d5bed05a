//! Parsing of Docker CLI output.
//!
//! Listing commands are run with `--format '{{json .}}'`, which prints one
//! JSON object per line. Unknown fields are ignored and missing ones default,
//! and a line that does not parse at all is skipped, so a change in the
//! tool's output degrades the result instead of failing the call.

use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::types::{NetworkInfo, PortMapping, ServiceInfo, ServiceState, ServiceStats};

/// Map a container state word (`{{.State.Status}}`) onto [`ServiceState`].
pub fn map_docker_state(state: &str) -> ServiceState {
    match state.trim().to_ascii_lowercase().as_str() {
        "running" => ServiceState::Running,
        "exited" | "created" | "paused" => ServiceState::Stopped,
        "restarting" => ServiceState::Starting,
        "removing" => ServiceState::Stopping,
        "dead" => ServiceState::Error,
        _ => ServiceState::Error,
    }
}

/// Derive a state from the human status column of `docker ps` ("Up 2 hours").
pub fn state_from_ps_status(status: &str) -> ServiceState {
    let status = status.trim();
    if status.starts_with("Up") {
        if status.contains("(Paused)") {
            ServiceState::Stopped
        } else {
            ServiceState::Running
        }
    } else if status.starts_with("Exited") || status.starts_with("Created") {
        ServiceState::Stopped
    } else if status.starts_with("Restarting") {
        ServiceState::Starting
    } else if status.starts_with("Removal") {
        ServiceState::Stopping
    } else {
        ServiceState::Error
    }
}

/// Parse a ports column such as `0.0.0.0:8080->80/tcp, :::8080->80/tcp`.
///
/// Only published ports (those with `->`) are returned, deduplicated across
/// IPv4 and IPv6 bindings.
pub fn parse_port_mappings(ports: &str) -> Vec<PortMapping> {
    let mut mappings = BTreeSet::new();

    for entry in ports.split(',') {
        let Some((host_side, container_side)) = entry.trim().split_once("->") else {
            continue;
        };

        let host = host_side.rsplit(':').next().unwrap_or(host_side);
        let container = container_side
            .split('/')
            .next()
            .unwrap_or(container_side);

        if let (Ok(host), Ok(container)) = (host.parse::<u16>(), container.parse::<u16>()) {
            mappings.insert(PortMapping { host, container });
        }
    }

    mappings.into_iter().collect()
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ContainerRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Names")]
    names: String,
    #[serde(rename = "Image")]
    image: String,
    #[serde(rename = "Status")]
    status: String,
    #[serde(rename = "State")]
    state: String,
    #[serde(rename = "Ports")]
    ports: String,
}

/// Parse `docker ps --format '{{json .}}'` output.
pub fn parse_container_rows(output: &str) -> Vec<ServiceInfo> {
    json_lines::<ContainerRow>(output)
        .filter(|row| !row.id.is_empty())
        .map(|row| {
            let state = if row.state.is_empty() {
                state_from_ps_status(&row.status)
            } else {
                map_docker_state(&row.state)
            };

            let name = row
                .names
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();

            ServiceInfo {
                id: row.id,
                name,
                state,
                ports: parse_port_mappings(&row.ports),
                image: non_empty(row.image),
                raw_status: non_empty(row.status),
            }
        })
        .collect()
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct NetworkRow {
    #[serde(rename = "ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Driver")]
    driver: String,
    #[serde(rename = "Scope")]
    scope: String,
}

/// Parse `docker network ls --format '{{json .}}'` output.
pub fn parse_network_rows(output: &str) -> Vec<NetworkInfo> {
    json_lines::<NetworkRow>(output)
        .filter(|row| !row.name.is_empty())
        .map(|row| NetworkInfo {
            id: row.id,
            name: row.name,
            driver: row.driver,
            subnet: None,
            scope: non_empty(row.scope),
        })
        .collect()
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct InspectedNetwork {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Driver")]
    driver: String,
    #[serde(rename = "Scope")]
    scope: String,
    #[serde(rename = "IPAM")]
    ipam: Ipam,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct Ipam {
    #[serde(rename = "Config")]
    config: Option<Vec<IpamConfig>>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct IpamConfig {
    #[serde(rename = "Subnet")]
    subnet: String,
}

/// Parse the JSON array printed by `docker network inspect <name>`.
pub fn parse_network_inspect(output: &str) -> Option<NetworkInfo> {
    let networks: Vec<InspectedNetwork> = match serde_json::from_str(output.trim()) {
        Ok(networks) => networks,
        Err(e) => {
            debug!(error = %e, "unparseable network inspect output");
            return None;
        }
    };

    networks.into_iter().next().map(|n| NetworkInfo {
        id: n.id,
        name: n.name,
        driver: n.driver,
        subnet: n
            .ipam
            .config
            .unwrap_or_default()
            .into_iter()
            .map(|c| c.subnet)
            .find(|s| !s.is_empty()),
        scope: non_empty(n.scope),
    })
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct StatsRow {
    #[serde(rename = "CPUPerc")]
    cpu: String,
    #[serde(rename = "MemUsage")]
    memory: String,
    #[serde(rename = "NetIO")]
    network_io: String,
    #[serde(rename = "BlockIO")]
    block_io: String,
}

/// Parse `docker stats --no-stream --format '{{json .}}'` output.
pub fn parse_stats(output: &str) -> ServiceStats {
    let Some(row) = json_lines::<StatsRow>(output).next() else {
        return ServiceStats::default();
    };

    ServiceStats {
        cpu_percent: row.cpu.trim().trim_end_matches('%').parse().ok(),
        memory_usage: non_empty(row.memory),
        network_io: non_empty(row.network_io),
        block_io: non_empty(row.block_io),
    }
}

fn json_lines<'a, T>(output: &'a str) -> impl Iterator<Item = T> + 'a
where
    T: for<'de> Deserialize<'de> + 'a,
{
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<T>(line) {
            Ok(row) => Some(row),
            Err(e) => {
                debug!(error = %e, line, "skipping unparseable docker output line");
                None
            }
        })
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
