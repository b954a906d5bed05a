//! Integration tests for the Docker provider
//!
//! Docker is replaced by a scripted `CommandRunner`: each rule answers the
//! invocations whose argument line starts with a given prefix, and every
//! invocation is recorded for later assertions.

use isolator_core::{CommandOutput, CoreError};
use isolator_provider::{
    start_project, CommandRunner, CommandTimeouts, DockerProvider, IsolationProvider,
    NetworkPlan, NetworkSpec, PortMapping, ProjectPlan, ProviderError, ServiceLaunch,
    ServicePlan, ServiceState,
};
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone)]
enum Step {
    Ok(&'static str),
    Fail(&'static str),
    Timeout,
    Missing,
}

#[derive(Default)]
struct ScriptedRunner {
    rules: Mutex<Vec<(String, Step)>>,
    calls: Mutex<Vec<(String, Duration)>>,
}

impl ScriptedRunner {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer invocations starting with `prefix`; later rules win.
    fn on(&self, prefix: &str, step: Step) {
        self.rules.lock().unwrap().push((prefix.to_string(), step));
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(c, _)| c.clone()).collect()
    }

    fn timeout_of(&self, prefix: &str) -> Option<Duration> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(c, _)| c.starts_with(prefix))
            .map(|(_, t)| *t)
    }

    fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(
        &self,
        program: &str,
        args: &[String],
        timeout: Duration,
    ) -> isolator_core::Result<CommandOutput> {
        let line = args.join(" ");
        self.calls.lock().unwrap().push((line.clone(), timeout));

        let step = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(prefix, _)| line.starts_with(prefix.as_str()))
            .map(|(_, step)| step.clone())
            .unwrap_or(Step::Fail("Error: No such object"));

        match step {
            Step::Ok(stdout) => Ok(CommandOutput {
                code: Some(0),
                stdout: stdout.to_string(),
                stderr: String::new(),
            }),
            Step::Fail(stderr) => Ok(CommandOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: stderr.to_string(),
            }),
            Step::Timeout => Err(CoreError::Timeout {
                command: format!("{} {}", program, line),
                secs: timeout.as_secs(),
            }),
            Step::Missing => Err(CoreError::Spawn {
                command: program.to_string(),
                source: io::Error::new(io::ErrorKind::NotFound, "No such file or directory"),
            }),
        }
    }
}

fn provider(runner: &Arc<ScriptedRunner>) -> DockerProvider {
    DockerProvider::with_runner(runner.clone())
}

const NETWORK_JSON: &str = r#"[{"Name":"shop-backend","Id":"abc","Driver":"bridge","Scope":"local","IPAM":{"Config":[]}}]"#;

#[test]
fn test_availability_probe() {
    let runner = ScriptedRunner::new();
    runner.on("version", Step::Ok("24.0.7\n"));
    runner.on("--version", Step::Ok("Docker version 24.0.7, build afdd53b\n"));

    let docker = provider(&runner);
    assert!(docker.is_available());
    assert_eq!(docker.version().unwrap(), "Docker version 24.0.7, build afdd53b");
    assert_eq!(docker.name(), "docker");
}

#[test]
fn test_missing_binary_is_unavailable() {
    let runner = ScriptedRunner::new();
    runner.on("", Step::Missing);

    let docker = provider(&runner);
    assert!(!docker.is_available());
    assert!(matches!(docker.version().unwrap_err(), ProviderError::Unavailable(_)));
    assert!(!docker.service_exists("anything"));
}

#[test]
fn test_daemon_down_is_unavailable() {
    let runner = ScriptedRunner::new();
    runner.on("version", Step::Fail("Cannot connect to the Docker daemon"));
    assert!(!provider(&runner).is_available());
}

#[test]
fn test_ensure_network_is_idempotent() {
    let runner = ScriptedRunner::new();
    runner.on("network create", Step::Ok("abc\n"));

    let docker = provider(&runner);
    let spec = NetworkSpec {
        project: Some("shop".into()),
        subnet: Some("172.28.0.0/16".into()),
        ..NetworkSpec::new("shop-backend")
    };

    let created = docker.ensure_network(&spec).unwrap();
    assert_eq!(created.id, "abc");

    // Now the network exists
    runner.on("network inspect shop-backend", Step::Ok(NETWORK_JSON));
    let again = docker.ensure_network(&spec).unwrap();
    assert_eq!(again.id, created.id);
    assert_eq!(runner.count("network create"), 1);

    let create = runner
        .calls()
        .into_iter()
        .find(|c| c.starts_with("network create"))
        .unwrap();
    assert_eq!(
        create,
        "network create --driver bridge --subnet 172.28.0.0/16 --label isolator.managed=true --label isolator.project=shop shop-backend"
    );
}

#[test]
fn test_network_create_failure_is_typed() {
    let runner = ScriptedRunner::new();
    runner.on("network create", Step::Fail("invalid subnet"));

    let err = provider(&runner)
        .create_network(&NetworkSpec::new("bad"))
        .unwrap_err();
    match err {
        ProviderError::Network { network, message } => {
            assert_eq!(network, "bad");
            assert!(message.contains("invalid subnet"));
            // The failing command line is part of the message
            assert!(message.contains("docker network create --driver bridge"));
        }
        other => panic!("expected network error, got {:?}", other),
    }
}

#[test]
fn test_start_service_builds_run_arguments() {
    let runner = ScriptedRunner::new();
    runner.on("run", Step::Ok("c0ffee\n"));
    runner.on("inspect --type container --format", Step::Ok("running\n"));

    let launch = ServiceLaunch {
        name: "shop-api".into(),
        project: Some("shop".into()),
        image: Some("python:3.11-slim".into()),
        command: Some("uvicorn main:app --port 8000".into()),
        ports: vec![PortMapping::same(8000)],
        environment: [("LOG_LEVEL".to_string(), "info".to_string())].into(),
        network: Some("shop-backend".into()),
        ..Default::default()
    };

    let info = provider(&runner).start_service(&launch).unwrap();
    assert_eq!(info.id, "c0ffee");
    assert_eq!(info.state, ServiceState::Running);

    let run = runner.calls().into_iter().find(|c| c.starts_with("run")).unwrap();
    assert_eq!(
        run,
        "run -d --name shop-api --label isolator.managed=true --label isolator.project=shop \
         -p 8000:8000 -e LOG_LEVEL=info --network shop-backend \
         python:3.11-slim uvicorn main:app --port 8000"
    );
    // No stale container, so nothing was force-removed
    assert_eq!(runner.count("rm -f"), 0);
}

#[test]
fn test_start_service_replaces_stale_container() {
    let runner = ScriptedRunner::new();
    runner.on("inspect --type container shop-db", Step::Ok("[{}]"));
    runner.on("rm -f shop-db", Step::Ok("shop-db\n"));
    runner.on("run", Step::Ok("beef\n"));
    runner.on("inspect --type container --format", Step::Ok("running\n"));

    let launch = ServiceLaunch {
        name: "shop-db".into(),
        image: Some("postgres:15-alpine".into()),
        ..Default::default()
    };
    provider(&runner).start_service(&launch).unwrap();

    let calls = runner.calls();
    let rm = calls.iter().position(|c| c == "rm -f shop-db").unwrap();
    let run = calls.iter().position(|c| c.starts_with("run")).unwrap();
    assert!(rm < run);
}

#[test]
fn test_start_service_builds_dockerfile_first() {
    let runner = ScriptedRunner::new();
    runner.on("build", Step::Ok(""));
    runner.on("run", Step::Ok("feed\n"));
    runner.on("inspect --type container --format", Step::Ok("created\n"));

    let launch = ServiceLaunch {
        name: "shop-web".into(),
        dockerfile_path: Some("/srv/shop/Dockerfile".into()),
        build_context: Some("/srv/shop".into()),
        ..Default::default()
    };
    let info = provider(&runner).start_service(&launch).unwrap();
    assert_eq!(info.image.as_deref(), Some("shop-web:latest"));
    assert_eq!(info.state, ServiceState::Stopped);

    assert!(runner
        .calls()
        .contains(&"build -t shop-web:latest -f /srv/shop/Dockerfile /srv/shop".to_string()));
    assert_eq!(
        runner.timeout_of("build"),
        Some(CommandTimeouts::default().build)
    );
}

#[test]
fn test_start_service_without_image_fails() {
    let runner = ScriptedRunner::new();
    let err = provider(&runner)
        .start_service(&ServiceLaunch {
            name: "shop-ghost".into(),
            ..Default::default()
        })
        .unwrap_err();

    assert!(matches!(err, ProviderError::Service { ref service, .. } if service == "shop-ghost"));
    assert_eq!(runner.count("run"), 0);
}

#[test]
fn test_timeout_is_surfaced() {
    let runner = ScriptedRunner::new();
    runner.on("run", Step::Timeout);

    let docker = provider(&runner).with_timeouts(CommandTimeouts {
        probe: Duration::from_secs(1),
        command: Duration::from_secs(7),
        build: Duration::from_secs(60),
    });
    let err = docker
        .start_service(&ServiceLaunch {
            name: "shop-slow".into(),
            image: Some("busybox".into()),
            ..Default::default()
        })
        .unwrap_err();

    assert!(err.to_string().contains("timed out"));
    assert_eq!(runner.timeout_of("run"), Some(Duration::from_secs(7)));
    assert_eq!(runner.timeout_of("inspect"), Some(Duration::from_secs(1)));
}

#[test]
fn test_check_operations_fold_failures_into_false() {
    let runner = ScriptedRunner::new();
    runner.on("stop", Step::Timeout);
    runner.on("rm", Step::Fail("No such container"));

    let docker = provider(&runner);
    assert!(!docker.stop_service("shop-api"));
    assert!(!docker.remove_service("shop-api"));
    assert!(!docker.delete_network("shop-backend"));
    assert!(!docker.image_exists("nope:latest"));
    assert_eq!(docker.service_status("shop-api"), ServiceState::Error);
}

#[test]
fn test_remove_stops_then_removes() {
    let runner = ScriptedRunner::new();
    runner.on("stop shop-api", Step::Fail("container is not running"));
    runner.on("rm shop-api", Step::Ok("shop-api\n"));

    assert!(provider(&runner).remove_service("shop-api"));
    assert_eq!(runner.calls(), vec!["stop shop-api", "rm shop-api"]);
}

#[test]
fn test_listing_and_observability() {
    let runner = ScriptedRunner::new();
    runner.on(
        "ps -a --filter label=isolator.managed=true",
        Step::Ok(concat!(
            r#"{"ID":"1","Names":"shop-api","Image":"python:3.11-slim","Status":"Up 2 minutes","State":"running","Ports":"0.0.0.0:8000->8000/tcp, :::8000->8000/tcp"}"#,
            "\n",
            r#"{"ID":"2","Names":"shop-db","Image":"postgres:15-alpine","Status":"Exited (0) 1 minute ago","State":"exited","Ports":""}"#,
            "\n"
        )),
    );
    runner.on(
        "network ls --filter label=isolator.managed=true",
        Step::Ok(r#"{"ID":"n1","Name":"shop-backend","Driver":"bridge","Scope":"local"}"#),
    );
    runner.on("logs --tail 2 shop-api", Step::Ok("line one\nline two\n"));
    runner.on(
        "stats shop-api --no-stream",
        Step::Ok(r#"{"CPUPerc":"3.50%","MemUsage":"64MiB / 2GiB","NetIO":"1kB / 0B","BlockIO":"0B / 0B"}"#),
    );

    let docker = provider(&runner);

    let services = docker.list_services().unwrap();
    assert_eq!(services.len(), 2);
    assert_eq!(services[0].ports, vec![PortMapping::same(8000)]);
    assert_eq!(services[1].state, ServiceState::Stopped);

    assert_eq!(docker.list_networks().unwrap()[0].name, "shop-backend");
    assert_eq!(docker.service_logs("shop-api", 2).unwrap(), vec!["line one", "line two"]);
    assert_eq!(docker.service_stats("shop-api").unwrap().cpu_percent, Some(3.5));

    assert!(matches!(
        docker.service_logs("shop-missing", 10).unwrap_err(),
        ProviderError::Service { .. }
    ));
}

#[test]
fn test_project_start_against_docker() {
    let runner = ScriptedRunner::new();
    runner.on("network create", Step::Ok("net1\n"));
    runner.on("run", Step::Ok("id\n"));
    runner.on("run -d --name shop-web", Step::Fail("port is already allocated"));
    runner.on("stop", Step::Ok(""));
    runner.on("inspect --type container --format", Step::Ok("running\n"));

    let plan = ProjectPlan {
        name: "shop".into(),
        services: ["db", "api", "web", "worker"]
            .iter()
            .map(|name| ServicePlan {
                name: name.to_string(),
                image: Some("busybox".into()),
                ..Default::default()
            })
            .collect(),
        networks: vec![NetworkPlan {
            name: "backend".into(),
            driver: "bridge".into(),
            subnet: None,
        }],
    };

    let err = start_project(&provider(&runner), &plan).unwrap_err();
    assert!(err.to_string().contains("port is already allocated"));

    let calls = runner.calls();
    let stops: Vec<_> = calls.iter().filter(|c| c.starts_with("stop")).collect();
    assert_eq!(stops, vec!["stop shop-api", "stop shop-db"]);
    assert_eq!(runner.count("run -d --name shop-worker"), 0);
    assert_eq!(runner.count("network rm"), 0);
}
