//! JavaScript execution tool.
//!
//! Code runs in a separate Node.js process inside a fresh `vm` context.
//! A `vm` context alone does not isolate anything, so the child also runs
//! under Node's permission model with no filesystem, child process or
//! worker grants. It gets a cleared environment and a temp working
//! directory. The vm-level timeout is backed by a wall-clock timeout, and
//! stdout is read only up to the output cap. Console output is captured
//! and returned with the evaluated value.

use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use pipeclaw_config::ExecuteJsConfig;
use pipeclaw_core::error::ToolError;
use pipeclaw_core::tool::Tool;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::parse_args;

const TOOL_NAME: &str = "execute_js";

/// Extra wall-clock time granted over the vm timeout so the in-runtime
/// timeout reports first.
const KILL_GRACE: Duration = Duration::from_secs(1);

/// Stderr is only used for diagnostics.
const STDERR_LIMIT: u64 = 16 * 1024;

/// Reads the script from stdin, evaluates it in an isolated context and
/// prints a single JSON object to stdout.
const BOOTSTRAP: &str = r#"
const vm = require('vm');
const limit = Number(process.env.PIPECLAW_JS_TIMEOUT_MS) || 5000;
const chunks = [];
process.stdin.on('data', (c) => chunks.push(c));
process.stdin.on('end', () => {
  const src = Buffer.concat(chunks).toString('utf8');
  const out = [];
  const show = (v) => {
    if (typeof v === 'string') return v;
    try { const s = JSON.stringify(v); return s === undefined ? String(v) : s; } catch (_) { return String(v); }
  };
  const log = (...args) => { out.push(args.map(show).join(' ')); };
  const ctx = vm.createContext({ console: { log, info: log, warn: log, error: log } });
  let report;
  try {
    const value = vm.runInContext(src, ctx, { timeout: limit });
    let result = null;
    if (value !== undefined) {
      try {
        const s = JSON.stringify(value);
        result = s === undefined ? String(value) : JSON.parse(s);
      } catch (_) {
        result = String(value);
      }
    }
    report = { success: true, result, type: typeof value, console_output: out };
  } catch (err) {
    const message = err && err.message ? err.message : String(err);
    report = { success: false, error: message, console_output: out };
  }
  process.stdout.write(JSON.stringify(report));
});
"#;

pub struct ExecuteJsTool {
    runtime: String,
    timeout: Duration,
    max_output_bytes: usize,
    /// Permission flag for the runtime's version, probed once
    sandbox_flag: OnceCell<Option<&'static str>>,
}

impl ExecuteJsTool {
    pub fn new(runtime: impl Into<String>, timeout: Duration, max_output_bytes: usize) -> Self {
        Self {
            runtime: runtime.into(),
            timeout,
            max_output_bytes,
            sandbox_flag: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ExecuteJsConfig) -> Self {
        Self::new(
            config.runtime.clone(),
            Duration::from_secs(config.timeout_secs),
            config.max_output_bytes,
        )
    }

    pub fn runtime(&self) -> &str {
        &self.runtime
    }

    /// Whether the configured runtime can be launched.
    pub async fn runtime_available(&self) -> bool {
        self.runtime_version().await.is_some()
    }

    /// The flag that enables the permission model on this runtime, or `None`
    /// when the runtime is missing or too old to have one.
    pub async fn sandbox_flag(&self) -> Option<&'static str> {
        *self
            .sandbox_flag
            .get_or_init(|| async {
                let version = self.runtime_version().await?;
                let flag = permission_flag(&version);
                debug!(runtime = %self.runtime, %version, ?flag, "Probed JavaScript runtime");
                flag
            })
            .await
    }

    async fn runtime_version(&self) -> Option<String> {
        let output = Command::new(&self.runtime)
            .arg("--version")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn command(&self, sandbox_flag: &str) -> Command {
        let mut cmd = Command::new(&self.runtime);
        cmd.arg(sandbox_flag)
            .arg("--no-warnings")
            .arg("-e")
            .arg(BOOTSTRAP)
            .env_clear()
            .env("PIPECLAW_JS_TIMEOUT_MS", self.timeout.as_millis().to_string())
            .current_dir(std::env::temp_dir())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Ok(path) = std::env::var("PATH") {
            cmd.env("PATH", path);
        }
        cmd
    }

    async fn run(&self, code: &str) -> Result<serde_json::Value, ToolError> {
        let Some(flag) = self.sandbox_flag().await else {
            return Err(ToolError::SandboxViolation(format!(
                "runtime '{}' is unavailable or has no permission model (Node.js 20 or newer required)",
                self.runtime
            )));
        };

        let mut child = self.command(flag).spawn().map_err(|e| ToolError::ExecutionFailed {
            tool_name: TOOL_NAME.into(),
            reason: format!("failed to start '{}': {e}", self.runtime),
        })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(code.as_bytes())
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: TOOL_NAME.into(),
                    reason: format!("failed to send code: {e}"),
                })?;
        }

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let collected = tokio::time::timeout(
            self.timeout + KILL_GRACE,
            collect_output(&mut child, self.max_output_bytes, &mut stdout, &mut stderr),
        )
        .await;

        let status = match collected {
            Ok(Ok(Some(status))) => status,
            Ok(Ok(None)) => {
                return Err(ToolError::SandboxViolation(format!(
                    "output exceeded {} bytes",
                    self.max_output_bytes
                )));
            }
            Ok(Err(e)) => {
                return Err(ToolError::ExecutionFailed {
                    tool_name: TOOL_NAME.into(),
                    reason: e.to_string(),
                });
            }
            Err(_) => {
                warn!(timeout_secs = self.timeout.as_secs(), "JavaScript runtime killed after timeout");
                return Err(ToolError::Timeout {
                    tool_name: TOOL_NAME.into(),
                    timeout_secs: self.timeout.as_secs(),
                });
            }
        };

        serde_json::from_slice(&stdout).map_err(|e| {
            let stderr = String::from_utf8_lossy(&stderr);
            ToolError::ExecutionFailed {
                tool_name: TOOL_NAME.into(),
                reason: format!("runtime exited with {status}: {e}; {}", stderr.trim()),
            }
        })
    }
}

/// Drain the child's pipes, reading at most `max_stdout + 1` bytes of stdout.
///
/// Returns `None` once stdout goes over the cap; the child is left running
/// and is killed when dropped.
async fn collect_output(
    child: &mut Child,
    max_stdout: usize,
    stdout: &mut Vec<u8>,
    stderr: &mut Vec<u8>,
) -> std::io::Result<Option<ExitStatus>> {
    let out_pipe = child.stdout.take();
    let err_pipe = child.stderr.take();

    let read_out = async {
        match out_pipe {
            Some(pipe) => pipe.take(max_stdout as u64 + 1).read_to_end(stdout).await,
            None => Ok(0),
        }
    };
    let read_err = async {
        match err_pipe {
            Some(pipe) => pipe.take(STDERR_LIMIT).read_to_end(stderr).await,
            None => Ok(0),
        }
    };
    let (out, err) = tokio::join!(read_out, read_err);
    out?;
    err?;

    if stdout.len() > max_stdout {
        return Ok(None);
    }
    child.wait().await.map(Some)
}

/// Pick the permission-model flag for a `node --version` string such as
/// `v22.14.0`. Node 20 introduced it as experimental; 22.13 and 23.5
/// renamed it.
fn permission_flag(version: &str) -> Option<&'static str> {
    let mut parts = version.trim().trim_start_matches('v').split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next().and_then(|m| m.parse().ok()).unwrap_or(0);
    match (major, minor) {
        (0..=19, _) => None,
        (22, 13..) | (23, 5..) | (24.., _) => Some("--permission"),
        _ => Some("--experimental-permission"),
    }
}

#[derive(Deserialize)]
struct ExecuteJsArgs {
    code: String,
}

#[async_trait]
impl Tool for ExecuteJsTool {
    fn name(&self) -> &str {
        TOOL_NAME
    }

    fn description(&self) -> &str {
        "Execute JavaScript code in an isolated sandbox and return the result and console output."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The JavaScript code to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<serde_json::Value, ToolError> {
        let args: ExecuteJsArgs = parse_args(arguments)?;
        debug!(code_len = args.code.len(), runtime = %self.runtime, "Executing JavaScript");

        let mut report = self.run(&args.code).await?;
        if let Some(obj) = report.as_object_mut() {
            obj.insert("code".into(), serde_json::Value::String(args.code));
        }
        Ok(report)
    }
}
