use std::{
    io,
    path::PathBuf,
    process::Stdio,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::{
    io::{AsyncRead, AsyncReadExt as _, AsyncWriteExt as _},
    process::{ChildStdin, Command},
    task::JoinHandle,
    time::Instant,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureLimits {
    pub stdout_max_bytes: usize,
    pub stderr_max_bytes: usize,
}

impl Default for CaptureLimits {
    fn default() -> Self {
        Self {
            stdout_max_bytes: 16 << 20,
            stderr_max_bytes: 1 << 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProcessRequest<'a> {
    /// Passed to the shell as `-c <command>`.
    pub command: &'a str,
    pub stdin: &'a [u8],
    pub time_limit: Duration,
    pub capture: CaptureLimits,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStatus {
    Exited(i32),
    Signaled(i32),
    TimedOut,
}

impl ProcessStatus {
    pub fn success(&self) -> bool {
        *self == Self::Exited(0)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match *self {
            Self::Exited(code) => Some(code),
            _ => None,
        }
    }

    pub fn signal(&self) -> Option<i32> {
        match *self {
            Self::Signaled(sig) => Some(sig),
            _ => None,
        }
    }
}

impl From<std::process::ExitStatus> for ProcessStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            return Self::Exited(code);
        }
        #[cfg(unix)]
        {
            use std::os::unix::process::ExitStatusExt as _;
            if let Some(sig) = status.signal() {
                return Self::Signaled(sig);
            }
        }
        Self::Exited(-1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub status: ProcessStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

impl ProcessOutput {
    pub fn new(status: ProcessStatus, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
            elapsed: Duration::ZERO,
            stdout_truncated: false,
            stderr_truncated: false,
        }
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed = elapsed;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Shell '{}' not found", .0.to_string_lossy())]
    ShellNotFound(PathBuf),

    #[error("Command not found or not executable: '{command}' (exit status {code}) {stderr}")]
    CommandNotFound {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to communicate with subprocess '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: io::Error,
    },
}

/// Spawns a command, feeds its stdin and captures its output under a deadline.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, req: &ProcessRequest<'_>) -> Result<ProcessOutput, ProcessError>;
}

/// Runs commands through `<shell> -c`, each in its own process group.
///
/// The whole group is killed when the deadline passes and again when `run` returns
/// (or its future is dropped), so no descendant outlives the call.
#[derive(Debug, Clone)]
pub struct ShellProcessRunner {
    shell: PathBuf,
    work_dir: PathBuf,
}

/// Exit statuses with which POSIX shells report a missing or non-executable command.
const SHELL_CMD_NOT_EXECUTABLE: i32 = 126;
const SHELL_CMD_NOT_FOUND: i32 = 127;

impl ShellProcessRunner {
    pub const DEFAULT_SHELL: &str = "/bin/sh";
    const IO_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            shell: Self::DEFAULT_SHELL.into(),
            work_dir: work_dir.into(),
        }
    }

    pub fn shell(mut self, shell: impl Into<PathBuf>) -> Self {
        self.shell = shell.into();
        self
    }
}

#[async_trait]
impl ProcessRunner for ShellProcessRunner {
    async fn run(&self, req: &ProcessRequest<'_>) -> Result<ProcessOutput, ProcessError> {
        let io_err = |source| ProcessError::Io {
            command: req.command.to_owned(),
            source,
        };

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(req.command)
            .current_dir(&self.work_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut proc = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound if !self.shell.exists() => {
                ProcessError::ShellNotFound(self.shell.clone())
            }
            _ => ProcessError::Spawn {
                command: req.command.to_owned(),
                source: e,
            },
        })?;
        let start_at = Instant::now();
        let group = ProcessGroupGuard::new(proc.id());
        log::debug!("Spawned pid={:?}: {}", proc.id(), req.command);

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (proc.stdin.take(), proc.stdout.take(), proc.stderr.take())
        else {
            return Err(io_err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "stdio of subprocess is not piped",
            )));
        };

        let feeder = tokio::spawn(feed_stdin(stdin, req.stdin.to_vec()));
        let stdout_capture = Capture::spawn("stdout", stdout, req.capture.stdout_max_bytes);
        let stderr_capture = Capture::spawn("stderr", stderr, req.capture.stderr_max_bytes);

        let waited = tokio::time::timeout(req.time_limit, proc.wait()).await;
        let elapsed = start_at.elapsed();

        let status = match waited {
            Ok(Ok(exit_status)) => ProcessStatus::from(exit_status),
            Ok(Err(e)) => return Err(io_err(e)),
            Err(_) => {
                log::debug!(
                    "Time limit exceeded ({}ms); killing process group {:?}",
                    req.time_limit.as_millis(),
                    group.pgid
                );
                group.kill();
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill TLE process: {:#}", e));
                ProcessStatus::TimedOut
            }
        };

        // Descendants left behind may still hold the pipes open.
        group.kill();
        feeder.abort();

        // Processes that left the group (e.g. via setsid) are not killed; whatever was
        // read before the deadline is kept.
        let deadline = Instant::now() + Self::IO_CAPTURE_TIMEOUT;
        let (stdout, stdout_truncated) = stdout_capture.finish(deadline).await;
        let (stderr, stderr_truncated) = stderr_capture.finish(deadline).await;

        if let ProcessStatus::Exited(code @ (SHELL_CMD_NOT_EXECUTABLE | SHELL_CMD_NOT_FOUND)) =
            status
        {
            return Err(ProcessError::CommandNotFound {
                command: req.command.to_owned(),
                code,
                stderr: String::from_utf8_lossy(&stderr).trim_end().to_owned(),
            });
        }

        Ok(ProcessOutput {
            status,
            stdout,
            stderr,
            elapsed,
            stdout_truncated,
            stderr_truncated,
        })
    }
}

async fn feed_stdin(mut stdin: ChildStdin, input: Vec<u8>) {
    if let Err(e) = stdin.write_all(&input).await {
        // The program may exit without reading its input.
        if e.kind() != io::ErrorKind::BrokenPipe {
            log::debug!("Failed to pass input-data to stdin: {}", e);
        }
    }
    // dropping `stdin` closes the pipe
}

#[derive(Debug, Default)]
struct CaptureBuf {
    data: Vec<u8>,
    truncated: bool,
}

/// Reader task of one output stream. The task is aborted when this is dropped.
struct Capture {
    name: &'static str,
    buf: Arc<Mutex<CaptureBuf>>,
    task: JoinHandle<io::Result<()>>,
}

impl Capture {
    fn spawn<R>(name: &'static str, reader: R, max_bytes: usize) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(CaptureBuf::default()));
        let task = tokio::spawn(read_bounded(reader, max_bytes, Arc::clone(&buf)));
        Self { name, buf, task }
    }

    async fn finish(mut self, deadline: Instant) -> (Vec<u8>, bool) {
        match tokio::time::timeout_at(deadline, &mut self.task).await {
            Ok(Ok(Ok(()))) => (),
            Ok(Ok(Err(e))) => log::warn!("Failed to capture {}: {}", self.name, e),
            Ok(Err(e)) => log::warn!("{} capture task panicked: {}", self.name, e),
            Err(_) => {
                log::warn!(
                    "{} is still held open by a stray process; keeping what was read",
                    self.name
                );
                self.task.abort();
            }
        }

        let buf = std::mem::take(&mut *self.buf.lock().unwrap_or_else(PoisonError::into_inner));
        if buf.truncated {
            log::warn!("{} exceeded the capture limit; truncated", self.name);
        }
        (buf.data, buf.truncated)
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Reads until EOF, keeping at most `max_bytes` in `sink`. The rest is drained and discarded.
async fn read_bounded<R>(
    mut reader: R,
    max_bytes: usize,
    sink: Arc<Mutex<CaptureBuf>>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        let mut buf = sink.lock().unwrap_or_else(PoisonError::into_inner);
        let remaining = max_bytes.saturating_sub(buf.data.len());
        if n > remaining {
            buf.truncated = true;
        }
        buf.data.extend_from_slice(&chunk[..n.min(remaining)]);
    }
}

/// Kills the process group led by the spawned shell on drop.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(leader_pid: Option<u32>) -> Self {
        Self { pgid: leader_pid }
    }

    #[cfg(unix)]
    fn kill(&self) {
        use nix::{
            errno::Errno,
            sys::signal::{killpg, Signal},
            unistd::Pid,
        };

        let Some(pgid) = self.pgid else { return };
        match killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
            Ok(()) | Err(Errno::ESRCH) => (),
            Err(e) => log::debug!("Failed to kill process group {}: {}", pgid, e),
        }
    }

    #[cfg(not(unix))]
    fn kill(&self) {}
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(all(test, unix))]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    fn runner() -> ShellProcessRunner {
        ShellProcessRunner::new(std::env::temp_dir())
    }

    fn request<'a>(command: &'a str, stdin: &'a str, time_limit_ms: u64) -> ProcessRequest<'a> {
        ProcessRequest {
            command,
            stdin: stdin.as_bytes(),
            time_limit: Duration::from_millis(time_limit_ms),
            capture: CaptureLimits::default(),
        }
    }

    /// Running and not a zombie.
    fn is_alive(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !stat
                .rsplit_once(')')
                .map_or(false, |(_, rest)| rest.trim_start().starts_with('Z')),
            Err(_) => false,
        }
    }

    async fn wait_until_dead(pid: i32) -> bool {
        for _ in 0..50 {
            if !is_alive(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }

    #[tokio::test]
    async fn echo_stdin_and_capture_both_streams() {
        let out = runner()
            .run(&request("read x; echo \"hello_$x\"; echo oops >&2", "123\n", 2000))
            .await
            .unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert_eq!(out.stdout, b"hello_123\n");
        assert_eq!(out.stderr, b"oops\n");
        assert!(!out.stdout_truncated);
    }

    #[tokio::test]
    async fn exit_code_and_signal() {
        let out = runner().run(&request("echo hi; exit 42", "", 2000)).await.unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(42));
        assert_eq!(out.stdout, b"hi\n");

        let out = runner().run(&request("kill -SEGV $$", "", 2000)).await.unwrap();
        assert_eq!(out.status, ProcessStatus::Signaled(11));
    }

    #[tokio::test]
    async fn timeout_keeps_partial_output() {
        let out = runner()
            .run(&request("echo partial; sleep 5", "", 300))
            .await
            .unwrap();
        assert_eq!(out.status, ProcessStatus::TimedOut);
        assert_eq!(out.stdout, b"partial\n");
        assert!(out.elapsed < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn timeout_kills_descendants() {
        let out = runner()
            .run(&request("sleep 30 & echo $!; wait", "", 300))
            .await
            .unwrap();
        assert_eq!(out.status, ProcessStatus::TimedOut);

        let pid: i32 = String::from_utf8_lossy(&out.stdout).trim().parse().unwrap();
        assert!(wait_until_dead(pid).await, "pid {} is still alive", pid);
    }

    #[tokio::test]
    async fn background_descendant_does_not_block_capture() {
        let started = std::time::Instant::now();
        let out = runner()
            .run(&request("sleep 30 & echo $!; echo done", "", 5000))
            .await
            .unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert!(started.elapsed() < Duration::from_secs(4));

        let pid: i32 = String::from_utf8_lossy(&out.stdout)
            .lines()
            .next()
            .unwrap()
            .parse()
            .unwrap();
        assert!(wait_until_dead(pid).await, "pid {} is still alive", pid);
    }

    #[tokio::test]
    async fn output_is_kept_when_a_stray_process_holds_the_pipes() {
        let started = std::time::Instant::now();
        let out = runner()
            .run(&request("setsid sleep 30 & echo $! >&2; sleep 0.3; echo 3", "", 5000))
            .await
            .unwrap();
        let stray: i32 = String::from_utf8_lossy(&out.stderr).trim().parse().unwrap();
        nix::sys::signal::kill(nix::unistd::Pid::from_raw(stray), nix::sys::signal::SIGKILL)
            .ok();

        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert_eq!(out.stdout, b"3\n");
        let grace = ShellProcessRunner::IO_CAPTURE_TIMEOUT;
        assert!(started.elapsed() < grace + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn dropping_the_run_kills_descendants() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ShellProcessRunner::new(dir.path());
        let req = request("sleep 31 & echo $! > bg.pid; wait", "", 10_000);

        let res = tokio::time::timeout(Duration::from_millis(500), runner.run(&req)).await;
        assert!(res.is_err(), "run finished before it was dropped");

        let pid: i32 = std::fs::read_to_string(dir.path().join("bg.pid"))
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        assert!(wait_until_dead(pid).await, "pid {} is still alive", pid);
    }

    #[tokio::test]
    async fn ignored_large_stdin_does_not_hang() {
        let input = "x".repeat(4 << 20);
        let out = runner().run(&request("echo ok", &input, 3000)).await.unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert_eq!(out.stdout, b"ok\n");
    }

    #[tokio::test]
    async fn output_is_bounded() {
        let mut req = request("yes | head -c 100000", "", 3000);
        req.capture.stdout_max_bytes = 1000;
        let out = runner().run(&req).await.unwrap();
        assert_eq!(out.status, ProcessStatus::Exited(0));
        assert_eq!(out.stdout.len(), 1000);
        assert!(out.stdout_truncated);
    }

    #[tokio::test]
    async fn missing_command_is_setup_error() {
        let err = runner()
            .run(&request("./definitely-not-existing-binary", "", 2000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::CommandNotFound { code: 127, .. }));

        let err = runner()
            .shell("/no/such/shell")
            .run(&request("true", "", 2000))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::ShellNotFound(_)));
    }
}
