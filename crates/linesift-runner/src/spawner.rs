use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::handle::{Control, Lifecycle, ProcessHandle, ProcessState};
use crate::splitter::LineSplitter;
use crate::{ExitObserver, ExitReport, LineSink, OutputType, RunConfig, RunnerError};

/// Bytes requested per read on each pipe.
const READ_CHUNK: usize = 8 * 1024;

/// Lines buffered between the pipe readers and the sink.
const LINE_BUFFER: usize = 1024;

enum StreamEvent {
    Line { stream: OutputType, text: String },
    Error { stream: OutputType, error: std::io::Error },
}

/// Spawns commands and streams their output line by line.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: RunConfig,
}

impl ProcessRunner {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Start `command` (program followed by its arguments).
    ///
    /// Stdout and stderr are read independently and their lines handed to
    /// `sink` as they complete, in order within each stream. When the process
    /// ends, `on_exit` is called exactly once, after the last line.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S, O>(
        &self,
        command: &[String],
        sink: S,
        on_exit: O,
    ) -> Result<ProcessHandle, RunnerError>
    where
        S: LineSink,
        O: ExitObserver,
    {
        let (program, args) = command.split_first().ok_or(RunnerError::EmptyCommand)?;
        if program.trim().is_empty() {
            return Err(RunnerError::EmptyCommand);
        }
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(RunnerError::NoRuntime);
        }

        let binary = self.resolve(program)?;

        debug!(
            binary = %binary.display(),
            args = ?args,
            working_dir = %self.config.working_dir.display(),
            "Spawning process"
        );

        let mut cmd = Command::new(&binary);
        cmd.args(args)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // Own process group: a terminal Ctrl+C reaches us, not the command,
        // so stopping goes through `request_stop`, which signals the group.
        #[cfg(unix)]
        cmd.process_group(0);

        for (key, value) in &self.config.env_vars {
            cmd.env(key, value);
        }

        let (lifecycle, _) = watch::channel(Lifecycle::idle());
        let lifecycle = Arc::new(lifecycle);

        let mut child = cmd.spawn().map_err(|source| RunnerError::SpawnFailed {
            program: program.clone(),
            source,
        })?;

        // Dropping `child` on these error paths kills it.
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| not_captured(program, OutputType::Stdout))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| not_captured(program, OutputType::Stderr))?;

        let pid = child.id();
        lifecycle.send_modify(|l| l.state = ProcessState::Running);

        let (events_tx, events_rx) = mpsc::channel(LINE_BUFFER);
        let readers = vec![
            tokio::spawn(read_stream(stdout, OutputType::Stdout, events_tx.clone())),
            tokio::spawn(read_stream(stderr, OutputType::Stderr, events_tx)),
        ];

        let (control_tx, control_rx) = mpsc::unbounded_channel();

        let supervisor = Supervisor {
            child,
            events_rx,
            control_rx,
            readers,
            lifecycle: lifecycle.clone(),
            group: pid,
            drain_timeout: self.config.drain_timeout,
            started: Instant::now(),
            detached: false,
        };
        tokio::spawn(supervisor.run(Box::new(sink), Box::new(on_exit)));

        Ok(ProcessHandle::new(pid, program.clone(), lifecycle, control_tx))
    }

    /// Run `command` to completion, streaming lines to `sink`.
    pub async fn run<S: LineSink>(
        &self,
        command: &[String],
        sink: S,
    ) -> Result<ExitReport, RunnerError> {
        let (tx, rx) = oneshot::channel();
        let handle = self.spawn(command, sink, move |report: ExitReport| {
            let _ = tx.send(report);
        })?;
        match rx.await {
            Ok(report) => Ok(report),
            Err(_) => Ok(handle.wait().await),
        }
    }

    fn resolve(&self, program: &str) -> Result<PathBuf, RunnerError> {
        let path = self
            .config
            .env_vars
            .get("PATH")
            .map(std::ffi::OsString::from)
            .or_else(|| std::env::var_os("PATH"));

        which::which_in(program, path, &self.config.working_dir).map_err(|e| {
            debug!(program, error = %e, "Executable lookup failed");
            RunnerError::NotFound(program.to_string())
        })
    }
}

fn not_captured(program: &str, stream: OutputType) -> RunnerError {
    RunnerError::SpawnFailed {
        program: program.to_string(),
        source: std::io::Error::other(format!("{} was not captured", stream)),
    }
}

/// Read one pipe until EOF, forwarding complete lines.
async fn read_stream<R>(mut reader: R, stream: OutputType, tx: mpsc::Sender<StreamEvent>)
where
    R: AsyncRead + Unpin,
{
    let mut splitter = LineSplitter::new();
    let mut buf = vec![0u8; READ_CHUNK];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                if let Some(text) = splitter.finish() {
                    let _ = tx.send(StreamEvent::Line { stream, text }).await;
                }
                trace!(%stream, "Stream closed");
                return;
            }
            Ok(n) => {
                for text in splitter.push(&buf[..n]) {
                    if tx.send(StreamEvent::Line { stream, text }).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(error) => {
                warn!(%stream, error = %error, "Failed to read process output");
                let _ = tx.send(StreamEvent::Error { stream, error }).await;
                return;
            }
        }
    }
}

/// Owns the child process and is the only place sink and observer
/// callbacks run, so they never overlap.
struct Supervisor {
    child: Child,
    events_rx: mpsc::Receiver<StreamEvent>,
    control_rx: mpsc::UnboundedReceiver<Control>,
    readers: Vec<JoinHandle<()>>,
    lifecycle: Arc<watch::Sender<Lifecycle>>,
    /// Process group led by the child. Outlives the child's own pid once it
    /// has been reaped, as long as anything it started is still running.
    group: Option<u32>,
    drain_timeout: Duration,
    started: Instant,
    /// Set once the consumer detached; remaining output is dropped.
    detached: bool,
}

impl Supervisor {
    async fn run(mut self, mut sink: Box<dyn LineSink>, on_exit: Box<dyn ExitObserver>) {
        let status = loop {
            tokio::select! {
                biased;

                Some(control) = self.control_rx.recv() => {
                    self.apply(control);
                }
                Some(event) = self.events_rx.recv() => {
                    if !self.consumer_gone() {
                        deliver(sink.as_mut(), event);
                    }
                }
                status = self.child.wait() => break status,
            }
        };

        self.drain(sink.as_mut()).await;
        drop(sink);

        let report = self.finish(status);
        debug!(
            code = ?report.code,
            signal = ?report.signal,
            killed = report.killed,
            duration_ms = report.duration.as_millis(),
            "Process finished"
        );
        on_exit.on_exit(report);
    }

    fn apply(&mut self, control: Control) {
        let result = match control {
            Control::Terminate => terminate(&mut self.child, self.group),
            Control::Kill => {
                self.detached = true;
                kill(&mut self.child, self.group)
            }
        };
        if let Err(e) = result {
            // The process may already be gone.
            debug!(?control, error = %e, "Signal not delivered");
        }
    }

    /// A detach may land before its `Kill` is read; the lifecycle already
    /// shows it.
    fn consumer_gone(&self) -> bool {
        self.detached || self.lifecycle.borrow().state.is_terminal()
    }

    /// Deliver output still in flight, then close both readers. Anything not
    /// read within the drain window, or after a detach, is discarded.
    async fn drain(&mut self, sink: &mut dyn LineSink) {
        let deadline = tokio::time::sleep(self.drain_timeout);
        tokio::pin!(deadline);

        while !self.consumer_gone() {
            tokio::select! {
                biased;

                Some(control) = self.control_rx.recv() => {
                    self.apply(control);
                }
                event = self.events_rx.recv() => match event {
                    Some(event) => {
                        if !self.consumer_gone() {
                            deliver(sink, event);
                        }
                    }
                    None => break,
                },
                _ = &mut deadline => {
                    debug!("Output still open after exit, closing readers");
                    break;
                }
            }
        }

        // Whatever the command left behind still holds the pipes.
        if self.detached || self.lifecycle.borrow().stop_requested {
            if let Err(e) = kill(&mut self.child, self.group) {
                trace!(error = %e, "Process group already gone");
            }
        }
        self.close_readers();
    }

    fn close_readers(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
        self.events_rx.close();
    }

    /// Move to the terminal state exactly once and build the report.
    fn finish(&self, status: std::io::Result<ExitStatus>) -> ExitReport {
        let (code, signal) = match status {
            Ok(status) => (status.code(), exit_signal(&status)),
            Err(e) => {
                warn!(error = %e, "Failed to collect process exit status");
                (None, None)
            }
        };
        let duration = self.started.elapsed();

        let mut report = ExitReport {
            code,
            signal,
            killed: false,
            duration,
        };
        self.lifecycle.send_modify(|l| {
            report.killed = l.stop_requested;
            l.state = if report.killed {
                ProcessState::Killed { code, signal }
            } else {
                ProcessState::Exited { code, signal }
            };
            l.report = Some(report);
        });
        report
    }
}

fn deliver(sink: &mut dyn LineSink, event: StreamEvent) {
    match event {
        StreamEvent::Line { stream, text } => sink.on_line(&text, stream),
        StreamEvent::Error { stream, error } => sink.on_stream_error(stream, &error),
    }
}

/// SIGTERM the command's process group.
fn terminate(child: &mut Child, group: Option<u32>) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use nix::sys::signal::Signal;

        match group {
            Some(pgid) => signal_group(pgid, Signal::SIGTERM).or_else(|e| {
                debug!(pgid, error = %e, "Group signal failed, signalling child");
                signal_child(child, Signal::SIGTERM)
            }),
            None => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        let _ = group;
        child.start_kill()
    }
}

/// SIGKILL the command's process group, falling back to the child alone.
fn kill(child: &mut Child, group: Option<u32>) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        if let Some(pgid) = group {
            match signal_group(pgid, nix::sys::signal::Signal::SIGKILL) {
                Ok(()) => return Ok(()),
                Err(e) => debug!(pgid, error = %e, "Group kill failed, killing child"),
            }
        }
    }

    #[cfg(not(unix))]
    let _ = group;

    child.start_kill()
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: nix::sys::signal::Signal) -> std::io::Result<()> {
    use nix::unistd::Pid;

    nix::sys::signal::killpg(Pid::from_raw(pgid as i32), signal).map_err(std::io::Error::from)
}

#[cfg(unix)]
fn signal_child(child: &Child, signal: nix::sys::signal::Signal) -> std::io::Result<()> {
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => {
            nix::sys::signal::kill(Pid::from_raw(pid as i32), signal).map_err(std::io::Error::from)
        }
        None => Ok(()),
    }
}

fn exit_signal(status: &ExitStatus) -> Option<i32> {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal()
    }

    #[cfg(not(unix))]
    {
        let _ = status;
        None
    }
}
