//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;

use reboot_trigger::action::{ActionError, CommandOutput, CommandRunner, Platform, RebootAction, RebootCommand};
use reboot_trigger::audit::AuditSink;
use reboot_trigger::config::TriggerConfig;
use reboot_trigger::security::{Authorizer, RateLimiter, SecretToken};
use reboot_trigger::{HttpServer, Shutdown, TriggerHandler};

pub const TOKEN: &str = "integration-secret";
pub const TRIGGER_PATH: &str = "/sys/hook/trigger-57829c4/";

/// Runner that never touches the host and answers with a canned result.
pub struct ScriptedRunner {
    calls: AtomicUsize,
    output: CommandOutput,
}

impl ScriptedRunner {
    pub fn succeeding(stdout: &str) -> Self {
        Self::with_output(CommandOutput {
            success: true,
            code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        })
    }

    pub fn with_output(output: CommandOutput) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            output,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, _command: &'a RebootCommand) -> BoxFuture<'a, Result<CommandOutput, ActionError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = self.output.clone();
        Box::pin(async move { Ok(output) })
    }
}

/// A plaintext server on an ephemeral loopback port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub runner: Arc<ScriptedRunner>,
    pub handler: Arc<TriggerHandler>,
    audit: AuditSink,
    dir: TempDir,
    shutdown: Shutdown,
    task: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start(runner: ScriptedRunner) -> Self {
        Self::start_on(runner, None).await
    }

    /// Start with an explicit platform instead of a configured command.
    pub async fn start_on(runner: ScriptedRunner, platform: Option<Platform>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = TriggerConfig::default();
        config.listener.bind_host = "127.0.0.1".to_string();
        config.listener.port = 0;
        config.auth.token = Some(TOKEN.to_string());
        config.audit.audit_log_path = dir.path().join("audit.log");
        config.audit.attempt_log_path = dir.path().join("requests.log");

        let runner = Arc::new(runner);
        let audit = AuditSink::spawn(&config.audit);
        let action = match platform {
            Some(platform) => RebootAction::new(platform, runner.clone(), Duration::from_secs(5)),
            None => RebootAction::new(Platform::Linux, runner.clone(), Duration::from_secs(5))
                .with_command(RebootCommand::new("reboot-stub", Vec::<String>::new())),
        };
        let handler = Arc::new(TriggerHandler::new(
            RateLimiter::from_config(&config.rate_limit),
            Authorizer::new(SecretToken::new(TOKEN)),
            audit.clone(),
            action,
            config.audit.log_presented_tokens,
        ));

        let listener = reboot_trigger::net::listener::bind(&config.listener).unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server = HttpServer::new(handler.clone(), &config);
        let task = tokio::spawn(server.run(listener, None, shutdown.subscribe()));

        Self {
            addr,
            runner,
            handler,
            audit,
            dir,
            shutdown,
            task,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Audit log lines, after everything queued so far has been written.
    pub async fn audit_lines(&self) -> Vec<serde_json::Value> {
        self.audit.flush().await;
        read_lines(&self.dir.path().join("audit.log"))
            .await
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    pub async fn attempt_lines(&self) -> Vec<String> {
        self.audit.flush().await;
        read_lines(&self.dir.path().join("requests.log")).await
    }

    pub async fn stop(self) {
        self.shutdown.trigger();
        let _ = tokio::time::timeout(Duration::from_secs(15), self.task).await;
    }
}

async fn read_lines(path: &std::path::Path) -> Vec<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => content.lines().map(str::to_string).collect(),
        Err(_) => Vec::new(),
    }
}

/// Send one raw HTTP/1.1 request and return every byte the server wrote back.
///
/// A reset connection counts as an empty reply.
pub async fn raw_request(addr: SocketAddr, method: &str, path: &str, headers: &[(&str, &str)]) -> Vec<u8> {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let mut request = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n");
    for (name, value) in headers {
        request.push_str(&format!("{name}: {value}\r\n"));
    }
    request.push_str("Connection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut received = Vec::new();
    let read = tokio::time::timeout(Duration::from_secs(5), stream.read_to_end(&mut received)).await;
    assert!(read.is_ok(), "server neither answered nor closed the connection");
    received
}
