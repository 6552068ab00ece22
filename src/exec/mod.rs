//! Subprocess execution of the `mloop` CLI.
//!
//! Executable::resolve -> program + leading args (MLOOP_PATH or "mloop")
//! MloopRunner::execute -> ExecuteResult | ExecError
//!
//! One shell-mediated child per call. stdout/stderr are drained concurrently
//! into per-call buffers; the first of {exit, deadline} decides the outcome.

pub mod args;
pub mod error;

use anyhow::{Context, Result, bail};
use shell_words::split as shell_split;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub use args::{ArgValue, build_args};
pub use error::{ExecError, format_error};

/// Environment variable that overrides the executable.
pub const PATH_ENV: &str = "MLOOP_PATH";
/// Executable used when no override is configured.
pub const DEFAULT_EXECUTABLE: &str = "mloop";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(300_000);

/// How long a timed-out child gets between SIGTERM and a hard kill.
const KILL_GRACE: Duration = Duration::from_secs(5);
const READ_CHUNK: usize = 8 * 1024;

/// The configured `mloop` command: a program plus any leading arguments
/// (e.g. `dotnet /opt/mloop/mloop.dll`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    program: String,
    leading_args: Vec<String>,
}

impl Executable {
    /// Split a command line with the platform's quoting rules: POSIX shell
    /// words, or `cmd`-style double quotes on Windows where `\` is a path
    /// separator rather than an escape.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            bail!("mloop executable is empty");
        }
        let split = if cfg!(windows) {
            split_windows(trimmed)
        } else {
            shell_split(trimmed).map_err(anyhow::Error::from)
        };
        let mut parts =
            split.with_context(|| format!("Failed to parse mloop executable: '{raw}'"))?;
        if parts.is_empty() || parts[0].is_empty() {
            bail!("No program name in mloop executable: '{raw}'");
        }
        let program = parts.remove(0);
        Ok(Executable {
            program,
            leading_args: parts,
        })
    }

    /// `MLOOP_PATH` if set and non-blank, otherwise `mloop`.
    pub fn resolve() -> Result<Self> {
        let raw = std::env::var(PATH_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EXECUTABLE.to_string());
        Self::parse(&raw)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Quoted command line for the platform shell.
    pub fn command_line(&self, args: &[String]) -> String {
        let tokens = std::iter::once(&self.program)
            .chain(self.leading_args.iter())
            .chain(args.iter());
        join_tokens(tokens)
    }
}

impl fmt::Display for Executable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.leading_args.is_empty() {
            f.write_str(&self.program)
        } else {
            write!(f, "{} {}", self.program, self.leading_args.join(" "))
        }
    }
}

/// Whitespace-separated tokens; double quotes group, backslashes are literal.
fn split_windows(line: &str) -> Result<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut quoted = false;

    for c in line.chars() {
        match c {
            '"' => {
                quoted = !quoted;
                in_token = true;
            }
            c if c.is_whitespace() && !quoted => {
                if in_token {
                    parts.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }
    if quoted {
        bail!("missing closing quote");
    }
    if in_token {
        parts.push(current);
    }
    Ok(parts)
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    pub cwd: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub env: HashMap<String, String>,
}

impl ExecuteOptions {
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Output of a process that exited with status 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecuteResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Spawns `mloop` invocations with shared defaults.
#[derive(Debug, Clone)]
pub struct MloopRunner {
    executable: Executable,
    default_timeout: Duration,
    env: HashMap<String, String>,
}

impl MloopRunner {
    pub fn new(executable: Executable) -> Self {
        MloopRunner {
            executable,
            default_timeout: DEFAULT_TIMEOUT,
            env: HashMap::new(),
        }
    }

    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Environment applied to every call, beneath per-call overrides.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn executable(&self) -> &Executable {
        &self.executable
    }

    /// Run `mloop <args>` and wait for exit, spawn failure or timeout.
    pub async fn execute(
        &self,
        args: &[String],
        options: ExecuteOptions,
    ) -> Result<ExecuteResult, ExecError> {
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let line = self.executable.command_line(args);

        let mut cmd = shell_command(&line);
        if let Some(dir) = &options.cwd {
            cmd.current_dir(dir);
        }
        cmd.envs(&self.env)
            .envs(&options.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(
            command = %line,
            cwd = ?options.cwd,
            timeout_ms = timeout.as_millis() as u64,
            "spawning mloop"
        );

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %line, error = %e, "failed to spawn mloop");
                return Err(ExecError::spawn_failed(e));
            }
        };

        let stdout = child.stdout.take().map(|s| tokio::spawn(accumulate(s)));
        let stderr = child.stderr.take().map(|s| tokio::spawn(accumulate(s)));

        let outcome =
            tokio::time::timeout(timeout, wait_and_drain(&mut child, stdout, stderr)).await;
        match outcome {
            Ok(Ok((code, stdout, stderr))) => {
                // A missing code (signal termination) counts as success.
                let exit_code = code.unwrap_or(0);
                debug!(
                    exit_code,
                    stdout_bytes = stdout.len(),
                    stderr_bytes = stderr.len(),
                    "mloop finished"
                );
                if exit_code != 0 {
                    return Err(ExecError::exited(exit_code, stdout, stderr));
                }
                Ok(ExecuteResult {
                    stdout,
                    stderr,
                    exit_code,
                })
            }
            Ok(Err(e)) => {
                warn!(command = %line, error = %e, "failed waiting for mloop");
                Err(ExecError::spawn_failed(e))
            }
            Err(_) => {
                warn!(
                    command = %line,
                    timeout_ms = timeout.as_millis() as u64,
                    "mloop timed out; terminating"
                );
                terminate(child);
                Err(ExecError::timed_out(timeout))
            }
        }
    }
}

/// Wait for exit, then collect everything both readers buffered.
async fn wait_and_drain(
    child: &mut Child,
    stdout: Option<JoinHandle<Vec<u8>>>,
    stderr: Option<JoinHandle<Vec<u8>>>,
) -> std::io::Result<(Option<i32>, String, String)> {
    let status = child.wait().await?;
    let stdout = collect(stdout).await;
    let stderr = collect(stderr).await;
    Ok((status.code(), stdout, stderr))
}

async fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    let bytes = match handle {
        Some(h) => h.await.unwrap_or_default(),
        None => Vec::new(),
    };
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Append chunks as they arrive until EOF.
async fn accumulate<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    buf
}

/// Graceful signal first; a detached reaper escalates after `KILL_GRACE`.
fn terminate(mut child: Child) {
    #[cfg(unix)]
    {
        match child.id() {
            Some(pid) => unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            },
            None => return,
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    tokio::spawn(async move {
        if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
    });
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    // exec: the signal on timeout reaches mloop, not an intermediate shell
    cmd.arg("-c").arg(format!("exec {line}"));
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(line).creation_flags(CREATE_NO_WINDOW);
    cmd
}

#[cfg(not(windows))]
fn join_tokens<'a>(tokens: impl Iterator<Item = &'a String>) -> String {
    shell_words::join(tokens)
}

#[cfg(windows)]
fn join_tokens<'a>(tokens: impl Iterator<Item = &'a String>) -> String {
    tokens
        .map(|t| {
            if !t.is_empty() && !t.contains(|c: char| c.is_whitespace() || c == '"') {
                t.clone()
            } else {
                format!("\"{}\"", t.replace('"', "\"\""))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn sh(script: &str) -> (MloopRunner, Vec<String>) {
        let runner = MloopRunner::new(Executable::parse("sh -c").unwrap());
        (runner, vec![script.to_string()])
    }

    #[test]
    fn parse_executable_with_leading_args() {
        let exe = Executable::parse(r#"dotnet "/opt/ml loop/mloop.dll""#).unwrap();
        assert_eq!(exe.program(), "dotnet");
        assert_eq!(exe.leading_args, vec!["/opt/ml loop/mloop.dll"]);
    }

    #[test]
    fn windows_split_keeps_backslashes() {
        let parts = split_windows(r"C:\Users\me\.dotnet\tools\mloop.exe").unwrap();
        assert_eq!(parts, vec![r"C:\Users\me\.dotnet\tools\mloop.exe"]);

        let parts =
            split_windows(r#""C:\Program Files\dotnet\dotnet.exe" D:\ml\mloop.dll"#).unwrap();
        assert_eq!(
            parts,
            vec![r"C:\Program Files\dotnet\dotnet.exe", r"D:\ml\mloop.dll"]
        );

        assert!(split_windows(r#""C:\unterminated"#).is_err());
    }

    #[cfg(windows)]
    #[test]
    fn parse_windows_path_program() {
        let exe = Executable::parse(r"C:\Users\me\.dotnet\tools\mloop.exe").unwrap();
        assert_eq!(exe.program(), r"C:\Users\me\.dotnet\tools\mloop.exe");
        assert!(exe.leading_args.is_empty());
    }

    #[test]
    fn empty_executable_rejected() {
        let err = Executable::parse("   ").unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[cfg(unix)]
    #[test]
    fn command_line_quotes_each_token() {
        let exe = Executable::parse("mloop").unwrap();
        let line = exe.command_line(&["train".into(), "my data.csv".into(), "it's".into()]);
        assert_eq!(line, r#"mloop train 'my data.csv' 'it'\''s'"#);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn success_collects_stdout_and_stderr() {
        let (runner, args) = sh("printf 'hello\\n'; printf 'warn' >&2");
        let out = runner.execute(&args, ExecuteOptions::default()).await.unwrap();
        assert_eq!(out.exit_code, 0);
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.stderr, "warn");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn non_zero_exit_is_execution_failure() {
        let (runner, args) = sh("printf 'bad label' >&2; printf 'partial'; exit 2");
        let err = runner
            .execute(&args, ExecuteOptions::default())
            .await
            .unwrap_err();
        match err {
            ExecError::Execution {
                exit_code,
                ref stdout,
                ref stderr,
                ..
            } => {
                assert_eq!(exit_code, 2);
                assert_eq!(stdout, "partial");
                assert_eq!(stderr, "bad label");
            }
            other => panic!("expected execution failure, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn timeout_wins_and_reports_duration() {
        let (runner, args) = sh("sleep 10");
        let started = Instant::now();
        let err = runner
            .execute(
                &args,
                ExecuteOptions::default().with_timeout(Duration::from_millis(200)),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout(), "expected timeout, got {err:?}");
        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            ExecError::Timeout { timeout, .. } => assert_eq!(timeout, Duration::from_millis(200)),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn missing_working_directory_fails_to_spawn() {
        let (runner, args) = sh("true");
        let err = runner
            .execute(
                &args,
                ExecuteOptions::default().in_dir("/definitely/not/a/dir"),
            )
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(-1));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn unknown_program_reports_shell_exit() {
        let runner = MloopRunner::new(Executable::parse("mloop-does-not-exist-xyz").unwrap());
        let err = runner
            .execute(&["status".into()], ExecuteOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(127));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn working_directory_and_env_are_applied() {
        let dir = tempfile::tempdir().unwrap();
        let runner = MloopRunner::new(Executable::parse("sh -c").unwrap()).with_env(
            HashMap::from([
                ("MLOOP_BASE".to_string(), "base".to_string()),
                ("MLOOP_LAYER".to_string(), "base".to_string()),
            ]),
        );
        let mut options = ExecuteOptions::default().in_dir(dir.path());
        options.env.insert("MLOOP_LAYER".into(), "call".into());
        let out = runner
            .execute(
                &["printf '%s %s ' \"$MLOOP_BASE\" \"$MLOOP_LAYER\"; pwd".to_string()],
                options,
            )
            .await
            .unwrap();
        let expected_dir = dir.path().canonicalize().unwrap();
        assert!(out.stdout.starts_with("base call "));
        assert!(
            out.stdout
                .trim_end()
                .ends_with(expected_dir.file_name().unwrap().to_str().unwrap())
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn large_output_is_fully_accumulated() {
        let (runner, args) = sh("i=0; while [ $i -lt 5000 ]; do echo line$i; i=$((i+1)); done");
        let out = runner.execute(&args, ExecuteOptions::default()).await.unwrap();
        assert_eq!(out.stdout.lines().count(), 5000);
        assert!(out.stdout.ends_with("line4999\n"));
    }
}
