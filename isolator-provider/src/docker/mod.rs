// Docker provider implementation split into logical modules

pub(crate) mod command;
pub mod parse;

// Standard library
use std::sync::Arc;
use std::time::Duration;

// External crates
use tracing::{debug, info, instrument, warn};

// Internal imports
use crate::error::{ProviderError, Result};
use crate::provider::IsolationProvider;
use crate::runner::{CommandRunner, CommandTimeouts, SystemRunner};
use crate::types::{
    NetworkInfo, NetworkSpec, ServiceInfo, ServiceLaunch, ServiceState, ServiceStats,
    MANAGED_LABEL, PROJECT_LABEL,
};
use command::DockerCommand;
use parse::{map_docker_state, parse_container_rows, parse_network_inspect, parse_network_rows, parse_stats};

const JSON_FORMAT: &str = "{{json .}}";

/// Drives containers and networks through the `docker` CLI.
#[derive(Clone)]
pub struct DockerProvider {
    runner: Arc<dyn CommandRunner>,
    binary: String,
    timeouts: CommandTimeouts,
}

impl std::fmt::Debug for DockerProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DockerProvider")
            .field("binary", &self.binary)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

impl Default for DockerProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DockerProvider {
    pub fn new() -> Self {
        Self::with_runner(Arc::new(SystemRunner))
    }

    /// Use a custom runner, e.g. one replaying canned output in tests.
    pub fn with_runner(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            binary: "docker".to_string(),
            timeouts: CommandTimeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: CommandTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    fn command(&self, timeout: Duration) -> DockerCommand<'_> {
        DockerCommand::new(self.runner.as_ref(), &self.binary, timeout)
    }

    fn probe(&self) -> DockerCommand<'_> {
        self.command(self.timeouts.probe)
    }

    fn mutate(&self) -> DockerCommand<'_> {
        self.command(self.timeouts.command)
    }

    /// Resolve the image to run, building it first when a Dockerfile is given.
    fn resolve_image(&self, launch: &ServiceLaunch) -> Result<String> {
        if let Some(dockerfile) = &launch.dockerfile_path {
            let tag = format!("{}:latest", launch.name);
            let context = launch.build_context.as_deref().unwrap_or(".");
            self.build_image(dockerfile, &tag, context)?;
            return Ok(tag);
        }

        launch.image.clone().ok_or_else(|| {
            ProviderError::service(&launch.name, "no image or Dockerfile configured")
        })
    }

    fn run_args(&self, launch: &ServiceLaunch, image: &str) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            "--name".to_string(),
            launch.name.clone(),
            "--label".to_string(),
            format!("{}=true", MANAGED_LABEL),
        ];

        if let Some(project) = &launch.project {
            args.push("--label".to_string());
            args.push(format!("{}={}", PROJECT_LABEL, project));
        }

        for port in &launch.ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", port.host, port.container));
        }

        for (key, value) in &launch.environment {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }

        if let Some(network) = &launch.network {
            args.push("--network".to_string());
            args.push(network.clone());
        }

        args.push(image.to_string());

        if let Some(command) = &launch.command {
            args.extend(command.split_whitespace().map(str::to_string));
        }

        args
    }
}

impl IsolationProvider for DockerProvider {
    fn name(&self) -> &str {
        "docker"
    }

    fn is_available(&self) -> bool {
        // `version` only succeeds when the daemon answers, not merely when the CLI exists
        self.probe()
            .args(["version", "--format", "{{.Server.Version}}"])
            .succeeds()
    }

    fn version(&self) -> Result<String> {
        let output = self.probe().arg("--version").execute_with_output()?;
        Ok(output.trim().to_string())
    }

    #[instrument(skip(self, spec), fields(network = %spec.name))]
    fn create_network(&self, spec: &NetworkSpec) -> Result<NetworkInfo> {
        let mut cmd = self
            .mutate()
            .args(["network", "create", "--driver"])
            .arg(spec.driver.as_str());

        if let Some(subnet) = &spec.subnet {
            cmd = cmd.arg("--subnet").arg(subnet.as_str());
        }

        cmd = cmd.arg("--label").arg(format!("{}=true", MANAGED_LABEL));
        if let Some(project) = &spec.project {
            cmd = cmd.arg("--label").arg(format!("{}={}", PROJECT_LABEL, project));
        }

        let id = cmd
            .arg(spec.name.as_str())
            .execute_with_output()
            .map_err(|e| ProviderError::network(&spec.name, e))?;

        info!(driver = %spec.driver, "created network");
        Ok(NetworkInfo {
            id: id.trim().to_string(),
            name: spec.name.clone(),
            driver: spec.driver.clone(),
            subnet: spec.subnet.clone(),
            scope: None,
        })
    }

    fn delete_network(&self, name: &str) -> bool {
        let removed = self.mutate().args(["network", "rm", name]).succeeds();
        if !removed {
            warn!(network = %name, "failed to remove network");
        }
        removed
    }

    fn list_networks(&self) -> Result<Vec<NetworkInfo>> {
        let output = self
            .probe()
            .args(["network", "ls", "--filter"])
            .arg(format!("label={}=true", MANAGED_LABEL))
            .args(["--format", JSON_FORMAT])
            .execute_with_output()?;
        Ok(parse_network_rows(&output))
    }

    fn inspect_network(&self, name: &str) -> Result<Option<NetworkInfo>> {
        let output = self
            .probe()
            .args(["network", "inspect", name])
            .execute_raw()?;

        if !output.success() {
            debug!(network = %name, "network not found");
            return Ok(None);
        }
        Ok(parse_network_inspect(&output.stdout))
    }

    #[instrument(skip(self, launch), fields(service = %launch.name))]
    fn start_service(&self, launch: &ServiceLaunch) -> Result<ServiceInfo> {
        let image = self.resolve_image(launch)?;

        if self.service_exists(&launch.name) {
            debug!("replacing stale container");
            self.mutate().args(["rm", "-f", launch.name.as_str()]).succeeds();
        }

        let id = self
            .mutate()
            .args(self.run_args(launch, &image))
            .execute_with_output()
            .map_err(|e| ProviderError::service(&launch.name, e))?;

        let state = self.service_status(&launch.name);
        info!(image = %image, state = %state, "started service");

        Ok(ServiceInfo {
            id: id.trim().to_string(),
            name: launch.name.clone(),
            state,
            ports: launch.ports.clone(),
            image: Some(image),
            raw_status: None,
        })
    }

    fn stop_service(&self, name: &str) -> bool {
        let stopped = self.mutate().args(["stop", name]).succeeds();
        if stopped {
            info!(service = %name, "stopped service");
        } else {
            warn!(service = %name, "failed to stop service");
        }
        stopped
    }

    fn restart_service(&self, name: &str) -> bool {
        self.mutate().args(["restart", name]).succeeds()
    }

    fn remove_service(&self, name: &str) -> bool {
        // A container that is already stopped makes `stop` fail; only `rm` decides the result
        self.mutate().args(["stop", name]).succeeds();
        let removed = self.mutate().args(["rm", name]).succeeds();
        if !removed {
            warn!(service = %name, "failed to remove service");
        }
        removed
    }

    fn service_status(&self, name: &str) -> ServiceState {
        match self
            .probe()
            .args(["inspect", "--type", "container", "--format", "{{.State.Status}}", name])
            .execute_raw()
        {
            Ok(output) if output.success() => map_docker_state(&output.stdout),
            _ => ServiceState::Error,
        }
    }

    fn service_exists(&self, name: &str) -> bool {
        self.probe()
            .args(["inspect", "--type", "container", name])
            .succeeds()
    }

    fn list_services(&self) -> Result<Vec<ServiceInfo>> {
        let output = self
            .probe()
            .args(["ps", "-a", "--filter"])
            .arg(format!("label={}=true", MANAGED_LABEL))
            .args(["--format", JSON_FORMAT])
            .execute_with_output()?;
        Ok(parse_container_rows(&output))
    }

    fn service_logs(&self, name: &str, lines: usize) -> Result<Vec<String>> {
        let output = self
            .probe()
            .args(["logs", "--tail"])
            .arg(lines.to_string())
            .arg(name)
            .execute_raw()?;

        if !output.success() {
            return Err(ProviderError::service(name, output.error_text()));
        }

        // Containers write to both streams; docker replays them separately
        Ok(output
            .stdout
            .lines()
            .chain(output.stderr.lines())
            .map(str::to_string)
            .collect())
    }

    fn service_stats(&self, name: &str) -> Result<ServiceStats> {
        let output = self
            .probe()
            .args(["stats", name, "--no-stream", "--format", JSON_FORMAT])
            .execute_with_output()
            .map_err(|e| ProviderError::service(name, e))?;
        Ok(parse_stats(&output))
    }

    #[instrument(skip(self))]
    fn build_image(&self, dockerfile_path: &str, tag: &str, context: &str) -> Result<()> {
        info!("building image");
        self.command(self.timeouts.build)
            .args(["build", "-t", tag, "-f", dockerfile_path, context])
            .execute()
            .map_err(|e| ProviderError::service(tag, e))
    }

    #[instrument(skip(self))]
    fn pull_image(&self, image: &str) -> Result<()> {
        info!("pulling image");
        self.command(self.timeouts.build)
            .args(["pull", image])
            .execute()
            .map_err(|e| ProviderError::service(image, e))
    }

    fn image_exists(&self, image: &str) -> bool {
        self.probe().args(["image", "inspect", image]).succeeds()
    }
}
