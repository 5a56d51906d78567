use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{
    Connector, Link, REASON, REASON_PROCESS_FAILED, REASON_SPAWN_FAILED,
    reject_blank_endpoints,
};
use crate::events::{Event, EventBus};

/// Maximum captured output in bytes. Anything beyond this is truncated.
pub const MAX_OUTPUT_BYTES: usize = 16_000;

/// Flag appended to the arguments when a payload is piped in.
pub const DATA_FLAG: &str = "--data";

/// Environment variables passed through to the child. Everything else is stripped.
const SAFE_ENV_VARS: &[&str] = &["PATH", "HOME", "USER", "LANG", "LC_ALL", "TZ"];

#[derive(Debug, Clone)]
pub struct ProcessConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub max_output_bytes: usize,
}

impl ProcessConfig {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: None,
            max_output_bytes: MAX_OUTPUT_BYTES,
        }
    }
}

/// Delegates to an external program.
///
/// `connect` runs `program [args..] <source> <destination>`. A zero exit
/// counts as connected; if stdout is a JSON object its string fields are
/// merged into the detail (without touching `reason`, `source`,
/// `destination` or `source_type`), otherwise the raw text lands under `output`.
/// `process_data` runs `program [args..] --data` with the payload on stdin.
pub struct ExternalProcessConnector {
    name: String,
    config: ProcessConfig,
    events: EventBus,
}

impl ExternalProcessConnector {
    pub fn new(name: impl Into<String>, config: ProcessConfig, events: EventBus) -> Self {
        Self {
            name: name.into(),
            config,
            events,
        }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.program);
        cmd.args(&self.config.args)
            .env_clear()
            .envs(filtered_env())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd
    }

    async fn pipe_payload(&self, payload: &str) -> anyhow::Result<()> {
        let mut child = self
            .command()
            .arg(DATA_FLAG)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin while draining stderr, or a chatty child can block on a
        // full pipe. A child that exits without reading its input is judged
        // by its exit status.
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                match stdin.write_all(payload.as_bytes()).await {
                    Err(e) if e.kind() != ErrorKind::BrokenPipe => return Err(e),
                    _ => {}
                }
            }
            Ok(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output?;
        fed?;
        if !output.status.success() {
            anyhow::bail!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                truncate_output(
                    &String::from_utf8_lossy(&output.stderr),
                    self.config.max_output_bytes
                )
            );
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for ExternalProcessConnector {
    fn kind(&self) -> &str {
        "process"
    }

    async fn connect(&self, source: &str, destination: &str) -> Link {
        if let Some(rejected) = reject_blank_endpoints(source, destination) {
            return rejected;
        }

        let output = match self.command().arg(source).arg(destination).output().await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(
                    connector = %self.name,
                    program = %self.config.program,
                    error = %e,
                    "spawn failed"
                );
                return Link::failed(REASON_SPAWN_FAILED).with("message", e.to_string());
            }
        };

        let max = self.config.max_output_bytes;
        let stdout = String::from_utf8_lossy(&output.stdout);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Link::failed(REASON_PROCESS_FAILED)
                .with(
                    "exit_code",
                    output.status.code().unwrap_or(-1).to_string(),
                )
                .with("stderr", truncate_output(stderr.trim(), max));
        }

        let mut link = Link::connected()
            .with("source_type", "process")
            .with("source", source)
            .with("destination", destination);

        match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(stdout.trim()) {
            Ok(fields) => {
                // The child may add keys but never rewrite ours or claim a failure.
                for (key, value) in fields {
                    if key == REASON {
                        continue;
                    }
                    if let serde_json::Value::String(s) = value {
                        link.detail.entry(key).or_insert(s);
                    }
                }
            }
            Err(_) if !stdout.trim().is_empty() => {
                link = link.with("output", truncate_output(stdout.trim(), max));
            }
            Err(_) => {}
        }
        link
    }

    async fn process_data(&self, payload: &str) {
        match self.pipe_payload(payload).await {
            Ok(()) => {
                self.events.emit(Event::DataTransfer {
                    connector: self.name.clone(),
                    bytes: payload.len(),
                });
            }
            Err(e) => {
                self.events.emit(Event::ProcessingFailed {
                    connector: self.name.clone(),
                    error: e.to_string(),
                });
            }
        }
    }
}

fn filtered_env() -> Vec<(String, String)> {
    SAFE_ENV_VARS
        .iter()
        .filter_map(|key| std::env::var(key).ok().map(|val| (key.to_string(), val)))
        .collect()
}

fn truncate_output(output: &str, max_bytes: usize) -> String {
    if output.len() <= max_bytes {
        return output.to_string();
    }
    let mut end = max_bytes;
    while !output.is_char_boundary(end) {
        end -= 1;
    }
    format!(
        "{}\n[truncated: showing {}/{} bytes]",
        &output[..end],
        end,
        output.len()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::{REASON_INVALID_ENDPOINT, Status};

    fn sh(script: &str) -> ExternalProcessConnector {
        let args = vec!["-c".to_string(), script.to_string(), "gate".to_string()];
        ExternalProcessConnector::new("proc", ProcessConfig::new("sh", args), EventBus::default())
    }

    #[test]
    fn truncate_respects_char_boundary() {
        let s = "héllo";
        let out = truncate_output(s, 2);
        assert!(out.starts_with('h'));
        assert!(out.contains("[truncated: showing 1/6 bytes]"));
    }

    #[test]
    fn truncate_leaves_short_output() {
        assert_eq!(truncate_output("short", 100), "short");
    }

    #[tokio::test]
    async fn zero_exit_connects_and_passes_endpoints() {
        let link = sh("echo \"$1->$2\"").connect("A", "B").await;

        assert_eq!(link.status, Status::Connected);
        assert_eq!(link.detail.get("output").unwrap(), "A->B");
    }

    #[tokio::test]
    async fn json_stdout_merges_into_detail() {
        let link = sh(r#"printf '{"session": "s-1", "port": 9}'"#)
            .connect("A", "B")
            .await;

        assert_eq!(link.detail.get("session").unwrap(), "s-1");
        // only string fields are taken
        assert!(!link.detail.contains_key("port"));
        assert!(!link.detail.contains_key("output"));
    }

    #[tokio::test]
    async fn json_stdout_cannot_rewrite_reserved_keys() {
        let script = r#"printf '{"reason": "unknown_connector", "source": "EVIL", "source_type": "native", "extra": "ok"}'"#;
        let link = sh(script).connect("A", "B").await;

        assert_eq!(link.status, Status::Connected);
        assert!(!link.detail.contains_key(REASON));
        assert_eq!(link.detail.get("source").unwrap(), "A");
        assert_eq!(link.detail.get("destination").unwrap(), "B");
        assert_eq!(link.detail.get("source_type").unwrap(), "process");
        assert_eq!(link.detail.get("extra").unwrap(), "ok");
    }

    #[tokio::test]
    async fn blank_endpoint_is_rejected_without_spawning() {
        let connector = ExternalProcessConnector::new(
            "ghost",
            ProcessConfig::new("/nonexistent/gate-connector", vec![]),
            EventBus::default(),
        );
        let link = connector.connect("A", "  ").await;

        assert_eq!(link.status, Status::Failed);
        assert_eq!(link.detail.get(REASON).unwrap(), REASON_INVALID_ENDPOINT);
    }

    #[tokio::test]
    async fn non_zero_exit_fails_with_code() {
        let link = sh("echo nope >&2; exit 3").connect("A", "B").await;

        assert_eq!(link.status, Status::Failed);
        assert_eq!(link.detail.get(REASON).unwrap(), REASON_PROCESS_FAILED);
        assert_eq!(link.detail.get("exit_code").unwrap(), "3");
        assert_eq!(link.detail.get("stderr").unwrap(), "nope");
    }

    #[tokio::test]
    async fn missing_program_fails_to_spawn() {
        let connector = ExternalProcessConnector::new(
            "ghost",
            ProcessConfig::new("/nonexistent/gate-connector", vec![]),
            EventBus::default(),
        );
        let link = connector.connect("A", "B").await;

        assert_eq!(link.detail.get(REASON).unwrap(), REASON_SPAWN_FAILED);
    }

    #[tokio::test]
    async fn process_data_pipes_payload() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let args = vec![
            "-c".to_string(),
            r#"[ "$1" = "--data" ] && [ "$(cat)" = "payload" ]"#.to_string(),
            "gate".to_string(),
        ];
        let connector =
            ExternalProcessConnector::new("proc", ProcessConfig::new("sh", args), bus);

        connector.process_data("payload").await;

        assert_eq!(
            rx.recv().await.unwrap(),
            Event::DataTransfer {
                connector: "proc".to_string(),
                bytes: 7,
            }
        );
    }

    #[tokio::test]
    async fn child_ignoring_large_payload_still_succeeds() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let args = vec!["-c".to_string(), "echo busy >&2; exit 0".to_string()];
        let connector =
            ExternalProcessConnector::new("proc", ProcessConfig::new("sh", args), bus);
        let payload = "x".repeat(1 << 20);

        connector.process_data(&payload).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            Event::DataTransfer {
                connector: "proc".to_string(),
                bytes: 1 << 20,
            }
        );
    }

    #[tokio::test]
    async fn process_data_failure_is_an_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        let args = vec!["-c".to_string(), "exit 1".to_string()];
        let connector =
            ExternalProcessConnector::new("proc", ProcessConfig::new("sh", args), bus);

        connector.process_data("payload").await;

        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::ProcessingFailed { connector, .. } if connector == "proc"
        ));
    }
}
