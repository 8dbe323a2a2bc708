//! # One spawned child process and its I/O driver.
//!
//! [`ChildProcess`] wraps a single OS process spawned through
//! [`tokio::process`]. Starting it wires the process's pipes into the
//! runtime:
//!
//! ```text
//! run(callbacks)
//!   ├─► spawn(2) via ProcessSpec::command()            (synchronous)
//!   ├─► stdin writer task ◄── write_stdin() queue      (if piped)
//!   └─► driver task:
//!         ├─ pump stdout ──► on_stdout(chunk)
//!         ├─ pump stderr ──► on_stderr(chunk)          (interleaved, one
//!         │                                             task ⇒ never
//!         │                                             concurrent per child)
//!         └─ after both EOF: wait() ──► on_exit(code)
//! ```
//!
//! ## Rules
//! - `run` is non-blocking: it returns once the process image is confirmed
//!   spawned (or the spawn failed). It must be called within a Tokio runtime.
//! - Exactly one `on_exit` per successfully started child, after all output
//!   chunks were delivered.
//! - `terminate` is a request (SIGTERM), not a guarantee; the exit still
//!   arrives through `on_exit`.
//! - Exit codes: the process's own code, or `-(signal number)` when it was
//!   terminated by a signal.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use nix::errno::Errno;
use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin};
use tokio::sync::mpsc;

use crate::error::{ControlError, LaunchError};
use crate::process::{ProcessCallbacks, ProcessOptions, ProcessSpec};

/// Read granularity for the output pumps.
const READ_CHUNK: usize = 8 * 1024;

/// Sentinel exit code when the OS reports neither a code nor a signal.
const ABNORMAL_EXIT: i32 = -1;

/// Global counter backing [`ChildId`] assignment.
static NEXT_CHILD_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one launched child.
///
/// Assigned once per [`ChildProcess`] and never reused, unlike OS pids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChildId(u64);

/// Lifecycle of one child handle.
enum ChildState {
    /// Created but not started.
    Idle,
    /// Spawned; pid is live and stdin may accept writes.
    Running {
        pid: Pid,
        stdin: Option<mpsc::UnboundedSender<StdinWrite>>,
    },
    /// Exit observed by the driver.
    Exited,
}

/// One queued stdin write.
struct StdinWrite {
    bytes: Vec<u8>,
    close_after: bool,
}

/// A single externally-spawned child process.
///
/// Usable standalone (create, [`run`](ChildProcess::run), interact) or
/// through [`ProcessSupervisor`](crate::ProcessSupervisor), which adds
/// collection-level registration, broadcast termination and quiescence
/// waiting on top.
///
/// ## Example
/// ```no_run
/// use std::sync::Arc;
/// use procvisor::{ChildProcess, ProcessCallbacks, ProcessOptions, ProcessSpec};
///
/// # fn demo() -> Result<(), procvisor::LaunchError> {
/// let child = Arc::new(ChildProcess::new(
///     ProcessSpec::program("cat", Vec::<String>::new()),
///     ProcessOptions::default(),
/// ));
/// child.run(ProcessCallbacks::new().on_exit(|code| assert_eq!(code, 0)))?;
/// child.write_stdin(b"hello\n".to_vec(), true).ok();
/// # Ok(())
/// # }
/// ```
pub struct ChildProcess {
    id: ChildId,
    spec: ProcessSpec,
    options: ProcessOptions,
    state: Mutex<ChildState>,
}

impl ChildProcess {
    /// Creates an unstarted child handle for the given spec and options.
    pub fn new(spec: ProcessSpec, options: ProcessOptions) -> Self {
        Self {
            id: ChildId(NEXT_CHILD_ID.fetch_add(1, AtomicOrdering::Relaxed)),
            spec,
            options,
            state: Mutex::new(ChildState::Idle),
        }
    }

    /// Returns the stable identity of this handle.
    pub fn id(&self) -> ChildId {
        self.id
    }

    /// Returns the program path or shell command line, for logs.
    pub fn name(&self) -> &str {
        self.spec.display_name()
    }

    /// Returns the OS pid while the child is running.
    pub fn pid(&self) -> Option<u32> {
        match &*lock(&self.state) {
            ChildState::Running { pid, .. } => Some(pid.as_raw() as u32),
            _ => None,
        }
    }

    /// Returns true between a successful `run` and the observed exit.
    pub fn is_running(&self) -> bool {
        matches!(&*lock(&self.state), ChildState::Running { .. })
    }

    /// Spawns the process and wires its pipes into the runtime.
    ///
    /// Non-blocking: returns once the process image is confirmed spawned.
    /// On failure the handle stays `Idle` and no callback will ever fire.
    ///
    /// Must be called within a Tokio runtime (the I/O driver and stdin
    /// writer are spawned as tasks).
    pub fn run(self: &Arc<Self>, callbacks: ProcessCallbacks) -> Result<(), LaunchError> {
        let mut state = lock(&self.state);
        if !matches!(*state, ChildState::Idle) {
            return Err(LaunchError::AlreadyStarted);
        }

        let mut cmd = self.spec.command(&self.options);
        let mut child = cmd.spawn().map_err(|source| LaunchError::Spawn {
            program: self.spec.display_name().to_string(),
            source,
        })?;

        let Some(raw_pid) = child.id() else {
            // Should not happen for a freshly spawned child; reap it rather
            // than leak an untracked process.
            let _ = child.start_kill();
            return Err(LaunchError::NoPid {
                program: self.spec.display_name().to_string(),
            });
        };
        let pid = Pid::from_raw(raw_pid as i32);

        let stdin = child.stdin.take().map(spawn_stdin_writer);
        *state = ChildState::Running { pid, stdin };
        drop(state);

        tokio::spawn(drive(Arc::downgrade(self), child, callbacks));
        Ok(())
    }

    /// Requests termination by sending SIGTERM.
    ///
    /// Non-blocking and best-effort: the exit (with its negative signal
    /// sentinel code) is still reported through `on_exit`. Detached children
    /// are signaled as a whole process group.
    ///
    /// Fails with [`ControlError::NotRunning`] if the child never started or
    /// its exit has already been observed. A pid that disappeared between
    /// the state check and the signal counts as delivered.
    pub fn terminate(&self) -> Result<(), ControlError> {
        let pid = match &*lock(&self.state) {
            ChildState::Running { pid, .. } => *pid,
            _ => return Err(ControlError::NotRunning),
        };

        let delivered = if self.options.detached {
            killpg(pid, Signal::SIGTERM)
        } else {
            kill(pid, Signal::SIGTERM)
        };
        match delivered {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(ControlError::Signal {
                pid: pid.as_raw(),
                source,
            }),
        }
    }

    /// Queues bytes for asynchronous delivery to the child's stdin.
    ///
    /// With `close_after`, stdin is shut down once the queued bytes are
    /// flushed and no further writes are accepted.
    pub fn write_stdin(
        &self,
        bytes: impl Into<Vec<u8>>,
        close_after: bool,
    ) -> Result<(), ControlError> {
        let mut state = lock(&self.state);
        let ChildState::Running { stdin, .. } = &mut *state else {
            return Err(ControlError::NotRunning);
        };
        let Some(tx) = stdin.as_ref() else {
            return Err(ControlError::StdinClosed);
        };

        tx.send(StdinWrite {
            bytes: bytes.into(),
            close_after,
        })
        .map_err(|_| ControlError::StdinClosed)?;

        if close_after {
            *stdin = None;
        }
        Ok(())
    }

    /// Driver-side transition once the exit status has been collected.
    fn mark_exited(&self) {
        *lock(&self.state) = ChildState::Exited;
    }
}

impl std::fmt::Debug for ChildProcess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildProcess")
            .field("id", &self.id)
            .field("program", &self.spec.display_name())
            .field("pid", &self.pid())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Spawns the writer task that feeds queued bytes into the child's stdin.
fn spawn_stdin_writer(mut stdin: ChildStdin) -> mpsc::UnboundedSender<StdinWrite> {
    let (tx, mut rx) = mpsc::unbounded_channel::<StdinWrite>();
    tokio::spawn(async move {
        while let Some(write) = rx.recv().await {
            if stdin.write_all(&write.bytes).await.is_err() {
                break;
            }
            if write.close_after {
                let _ = stdin.flush().await;
                let _ = stdin.shutdown().await;
                break;
            }
        }
        // Dropping stdin closes the pipe if the writer exits early.
    });
    tx
}

/// Per-child driver: pumps output to the callbacks, then reaps the exit.
///
/// Holds only a weak reference to the handle so the callbacks stored by a
/// running child can never keep the handle alive after it is dropped
/// elsewhere.
async fn drive(handle: Weak<ChildProcess>, mut child: Child, mut callbacks: ProcessCallbacks) {
    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut out_buf = vec![0u8; READ_CHUNK];
    let mut err_buf = vec![0u8; READ_CHUNK];

    // Drain both streams to EOF before collecting the exit status so every
    // output chunk is delivered before on_exit fires.
    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            n = read_chunk(&mut stdout, &mut out_buf), if stdout.is_some() => match n {
                0 => stdout = None,
                n => {
                    if let Some(cb) = callbacks.on_stdout.as_mut() {
                        cb(&out_buf[..n]);
                    }
                }
            },
            n = read_chunk(&mut stderr, &mut err_buf), if stderr.is_some() => match n {
                0 => stderr = None,
                n => {
                    if let Some(cb) = callbacks.on_stderr.as_mut() {
                        cb(&err_buf[..n]);
                    }
                }
            },
        }
    }

    let code = match child.wait().await {
        Ok(status) => exit_code_of(status),
        Err(_) => ABNORMAL_EXIT,
    };

    // Flip the handle to Exited before the exit callback runs, so control
    // operations observed from inside the callback already see a dead child.
    if let Some(child) = handle.upgrade() {
        child.mark_exited();
    }
    if let Some(on_exit) = callbacks.on_exit.take() {
        on_exit(code);
    }
}

/// Reads one chunk from an optional stream; EOF and read errors map to 0.
async fn read_chunk<R>(stream: &mut Option<R>, buf: &mut [u8]) -> usize
where
    R: AsyncRead + Unpin,
{
    match stream.as_mut() {
        Some(reader) => reader.read(buf).await.unwrap_or(0),
        None => 0,
    }
}

/// Maps an OS exit status to the exit-code convention.
fn exit_code_of(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    match status.code() {
        Some(code) => code,
        None => status.signal().map(|sig| -sig).unwrap_or(ABNORMAL_EXIT),
    }
}
