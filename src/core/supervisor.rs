//! # Supervisor: launch, reap, terminate, and wait for quiescence.
//!
//! The [`ProcessSupervisor`] owns the set of currently-running children. Each
//! launch wraps the caller's exit callback with a reaper that deregisters the
//! child before the caller's callback runs and notifies waiters once the set
//! drains to empty.
//!
//! ## Key responsibilities
//! - register children at launch, keyed by [`ChildId`] (never by pid)
//! - intercept each child's exit to reap it from the running set
//! - broadcast best-effort termination requests
//! - wake [`wait`](ProcessSupervisor::wait) callers exactly when the set
//!   transitions to empty
//!
//! ## High-level architecture
//! ```text
//! caller ──► launch_program / launch_command
//!               │  wrap on_exit: Weak<ChildProcess> + caller's callback
//!               │  ChildProcess::run() ──spawn──► OS process
//!               └─ insert into children (atomic with the spawn)
//!
//! runtime worker (per child driver):
//!   on_exit(code) ──► reaper:
//!        1. lock children: upgrade weak handle, remove by id
//!        2. unlocked: invoke caller's on_exit(code)   (re-entrancy safe)
//!        3. lock children: if empty → notify waiters + QuiescenceReached
//!
//! terminate_all: snapshot children under the lock, SIGTERM each outside it
//! wait(max):     Notify waiter armed before the emptiness check (no lost
//!                wakeups), optional deadline
//! ```
//!
//! ## Rules
//! - The collection lock is held only for collection reads/writes and the
//!   synchronous spawn, never across a user callback or an await point.
//! - The reaper's closure captures the child **weakly**; the collection holds
//!   the only strong reference, so a reaped child's resources are released as
//!   soon as its driver finishes.
//! - Exits racing a concurrent `has_running_children` call may or may not be
//!   counted; the snapshot is only guaranteed consistent at the instant the
//!   lock was held.
//!
//! ## Example
//! ```no_run
//! use procvisor::{
//!     ProcessCallbacks, ProcessOptions, ProcessSupervisor, SupervisorConfig,
//! };
//!
//! #[tokio::main(flavor = "multi_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = ProcessSupervisor::new(SupervisorConfig::default());
//!
//!     sup.launch_program(
//!         "/bin/echo",
//!         ["hello, world"],
//!         ProcessOptions::default(),
//!         ProcessCallbacks::new().on_exit(|code| println!("exited: {code}")),
//!     )?;
//!
//!     // Block until every launched child has exited.
//!     assert!(sup.wait(None).await);
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::sync::Notify;

use crate::config::SupervisorConfig;
use crate::error::LaunchError;
use crate::events::{Bus, Event, EventKind};
use crate::process::{
    ChildId, ChildProcess, ExitFn, ProcessCallbacks, ProcessOptions, ProcessSpec,
};
use crate::subscribers::Subscribe;

/// Concurrent supervisor for externally-spawned child processes.
///
/// Cheap to clone (internally holds an `Arc`-backed state), so callbacks may
/// capture a clone and re-enter the supervisor (launch more children, query,
/// wait) without deadlocking.
#[derive(Clone)]
pub struct ProcessSupervisor {
    inner: Arc<Inner>,
}

/// Shared state: outlives the facade for as long as any child driver holds a
/// reaper closure.
struct Inner {
    cfg: SupervisorConfig,
    /// Currently-running children, keyed by handle identity (pids get reused).
    children: Mutex<HashMap<ChildId, Arc<ChildProcess>>>,
    /// Signaled when `children` transitions to empty.
    quiescent: Notify,
    /// Event side channel (logging, metrics, tests).
    bus: Bus,
}

impl ProcessSupervisor {
    /// Creates a supervisor with no subscribers attached.
    pub fn new(cfg: SupervisorConfig) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        Self {
            inner: Arc::new(Inner {
                cfg,
                children: Mutex::new(HashMap::new()),
                quiescent: Notify::new(),
                bus,
            }),
        }
    }

    /// Creates a supervisor and spawns one listener task that fans events
    /// out to the given subscribers, in order, per event.
    ///
    /// Must be called within a Tokio runtime.
    pub fn with_subscribers(cfg: SupervisorConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let sup = Self::new(cfg);
        if !subscribers.is_empty() {
            spawn_subscriber_listener(&sup.inner.bus, subscribers);
        }
        sup
    }

    /// Launches an executable directly with an ordered argument list.
    ///
    /// On success the child is registered and the caller's `on_exit` (if
    /// any) will eventually be invoked exactly once on a runtime worker. On
    /// failure the error is returned synchronously, nothing is registered,
    /// and no callback will ever fire.
    pub fn launch_program(
        &self,
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
        options: ProcessOptions,
        callbacks: ProcessCallbacks,
    ) -> Result<(), LaunchError> {
        self.launch(ProcessSpec::program(program, args), options, callbacks)
    }

    /// Launches a command line through a shell (`sh -c`).
    ///
    /// Exit codes follow the shell's convention: 127 when the requested
    /// command cannot be found or executed, the program's own code otherwise.
    pub fn launch_command(
        &self,
        command_line: impl Into<String>,
        options: ProcessOptions,
        callbacks: ProcessCallbacks,
    ) -> Result<(), LaunchError> {
        self.launch(ProcessSpec::shell(command_line), options, callbacks)
    }

    fn launch(
        &self,
        spec: ProcessSpec,
        options: ProcessOptions,
        mut callbacks: ProcessCallbacks,
    ) -> Result<(), LaunchError> {
        let child = Arc::new(ChildProcess::new(spec, options));

        // The reaper captures the child weakly: the collection below holds
        // the only strong reference, so the stored exit closure can never
        // keep a reaped child alive.
        let inner = Arc::clone(&self.inner);
        let handle = Arc::downgrade(&child);
        let program: Arc<str> = Arc::from(child.name());
        let caller_exit = callbacks.on_exit.take();
        let callbacks =
            callbacks.on_exit(move |code| inner.reap(&handle, program, code, caller_exit));

        {
            // Spawn and register under one lock hold: the driver task cannot
            // reap a child the map has not seen yet, even if the process
            // exits instantly.
            let mut children = lock(&self.inner.children);
            child.run(callbacks)?;
            children.insert(child.id(), Arc::clone(&child));
        }

        let mut ev = Event::new(EventKind::ProcessLaunched).with_program(child.name());
        if let Some(pid) = child.pid() {
            ev = ev.with_pid(pid);
        }
        self.inner.bus.publish(ev);
        Ok(())
    }

    /// Returns true iff at least one child is running at the moment of the
    /// call.
    ///
    /// Point-in-time snapshot: a child that is exiting right now may or may
    /// not be counted.
    pub fn has_running_children(&self) -> bool {
        !lock(&self.inner.children).is_empty()
    }

    /// Issues a termination request to every child running at snapshot time.
    ///
    /// Best-effort and non-blocking: per-child failures are published to the
    /// event bus and skipped, and the call does not wait for any child to
    /// actually exit. Callers needing that should [`wait`] afterwards.
    ///
    /// [`wait`]: ProcessSupervisor::wait
    pub fn terminate_all(&self) {
        // Copy the handles out, then signal without the lock: termination
        // can trigger immediate re-entrant exit activity that needs it.
        let snapshot: Vec<Arc<ChildProcess>> =
            lock(&self.inner.children).values().cloned().collect();

        for child in snapshot {
            let mut ev = Event::new(EventKind::TerminateRequested).with_program(child.name());
            if let Some(pid) = child.pid() {
                ev = ev.with_pid(pid);
            }
            self.inner.bus.publish(ev);

            if let Err(err) = child.terminate() {
                self.inner.bus.publish(
                    Event::new(EventKind::TerminateFailed)
                        .with_program(child.name())
                        .with_reason(err.to_string()),
                );
            }
        }
    }

    /// Waits until every launched child has exited.
    ///
    /// - `None`: blocks until the running set is empty, then returns true.
    /// - `Some(d)`: returns true iff the set was (or became) empty within
    ///   `d`; false otherwise. The timeout stops the waiting only, it cancels
    ///   nothing.
    ///
    /// Returns immediately when no children are running. The waiter is armed
    /// before the emptiness check, so an exit racing this call can never be
    /// missed.
    pub async fn wait(&self, max_wait: Option<Duration>) -> bool {
        let deadline = max_wait.map(|d| tokio::time::Instant::now() + d);

        loop {
            let notified = self.inner.quiescent.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if lock(&self.inner.children).is_empty() {
                return true;
            }

            match deadline {
                None => notified.await,
                Some(at) => {
                    if tokio::time::timeout_at(at, notified).await.is_err() {
                        return lock(&self.inner.children).is_empty();
                    }
                }
            }
        }
    }

    /// Terminate-then-wait convenience: requests termination of every
    /// running child and waits up to the configured
    /// [`kill_grace`](SupervisorConfig::kill_grace) for quiescence.
    ///
    /// Returns false if some children were still running when the grace
    /// elapsed.
    pub async fn shutdown(&self) -> bool {
        self.terminate_all();
        self.wait(Some(self.inner.cfg.kill_grace)).await
    }

    /// Creates a new receiver observing subsequent runtime events.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.inner.bus.subscribe()
    }
}

impl Inner {
    /// Reaps one exited child. Runs on the child's driver task; drivers for
    /// different children may invoke this concurrently.
    fn reap(&self, handle: &Weak<ChildProcess>, program: Arc<str>, code: i32, on_exit: Option<ExitFn>) {
        {
            // The upgrade cannot fail while the child is still registered:
            // the erase below releases the only strong reference. A failed
            // upgrade means the child is already gone and reaping is a no-op.
            let mut children = lock(&self.children);
            if let Some(child) = handle.upgrade() {
                children.remove(&child.id());
            }
        }

        // Invoke the caller's callback without the lock so it may re-enter
        // the supervisor (launch, query, wait).
        if let Some(cb) = on_exit {
            cb(code);
        }

        self.bus.publish(
            Event::new(EventKind::ProcessExited)
                .with_program(program)
                .with_code(code),
        );

        // Waiters are released only after the caller's cleanup above ran.
        if lock(&self.children).is_empty() {
            self.quiescent.notify_waiters();
            self.bus.publish(Event::new(EventKind::QuiescenceReached));
        }
    }
}

impl std::fmt::Debug for ProcessSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessSupervisor")
            .field("running", &lock(&self.inner.children).len())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Subscribes to the bus and forwards events to the subscribers, in order.
fn spawn_subscriber_listener(bus: &Bus, subscribers: Vec<Arc<dyn Subscribe>>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => {
                    for sub in &subscribers {
                        sub.on_event(&ev).await;
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex as StdMutex;
    use tokio::sync::oneshot;
    use tokio::time::timeout;

    fn sup() -> ProcessSupervisor {
        ProcessSupervisor::new(SupervisorConfig::default())
    }

    #[tokio::test]
    async fn echo_reports_exit_zero() {
        let sup = sup();
        let (tx, rx) = oneshot::channel();

        sup.launch_program(
            "/bin/echo",
            ["Hello, world! This is a string to echo!"],
            ProcessOptions::default(),
            ProcessCallbacks::new().on_exit(move |code| {
                let _ = tx.send(code);
            }),
        )
        .expect("launch echo");

        assert!(sup.wait(Some(Duration::from_secs(5))).await);
        assert_eq!(rx.await.unwrap(), 0);
        assert!(!sup.has_running_children());
    }

    #[tokio::test]
    async fn shell_output_is_complete_and_ordered_before_exit() {
        let sup = sup();
        let output = Arc::new(StdMutex::new(Vec::new()));
        let sink = Arc::clone(&output);
        let at_exit = Arc::clone(&output);
        let (tx, rx) = oneshot::channel();

        sup.launch_command(
            "i=0; while [ $i -lt 10 ]; do echo $i; i=$((i+1)); done",
            ProcessOptions::default(),
            ProcessCallbacks::new()
                .on_stdout(move |chunk| sink.lock().unwrap().extend_from_slice(chunk))
                .on_exit(move |code| {
                    // Snapshot what was delivered before the exit callback.
                    let seen = at_exit.lock().unwrap().clone();
                    let _ = tx.send((code, seen));
                }),
        )
        .expect("launch shell loop");

        assert!(sup.wait(Some(Duration::from_secs(5))).await);
        let (code, seen) = rx.await.unwrap();
        assert_eq!(code, 0);
        assert_eq!(seen.as_slice(), b"0\n1\n2\n3\n4\n5\n6\n7\n8\n9\n");
    }

    #[tokio::test]
    async fn shell_reports_127_for_unknown_command() {
        let sup = sup();
        let (tx, rx) = oneshot::channel();

        sup.launch_command(
            "this is not a valid command",
            ProcessOptions::default(),
            ProcessCallbacks::new().on_exit(move |code| {
                let _ = tx.send(code);
            }),
        )
        .expect("shell itself must start");

        assert!(sup.wait(Some(Duration::from_secs(5))).await);
        assert_eq!(rx.await.unwrap(), 127);
    }

    #[tokio::test]
    async fn failed_launch_registers_nothing() {
        let sup = sup();

        let err = sup
            .launch_program(
                "/definitely/not/a/binary",
                Vec::<String>::new(),
                ProcessOptions::default(),
                ProcessCallbacks::new().on_exit(|_| panic!("must never fire")),
            )
            .unwrap_err();

        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert!(!sup.has_running_children());
        assert!(sup.wait(Some(Duration::ZERO)).await);
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_idle() {
        let sup = sup();
        // Indefinite wait on an empty supervisor must not block.
        assert!(timeout(Duration::from_secs(1), sup.wait(None))
            .await
            .expect("wait(None) must return immediately when empty"));
        assert!(sup.wait(Some(Duration::ZERO)).await);
    }

    #[tokio::test]
    async fn indefinite_wait_blocks_until_children_exit() {
        let sup = sup();
        let (tx, rx) = oneshot::channel();

        sup.launch_program(
            "sleep",
            ["0.2"],
            ProcessOptions::default(),
            ProcessCallbacks::new().on_exit(move |code| {
                let _ = tx.send(code);
            }),
        )
        .expect("launch sleep");

        assert!(sup.has_running_children());
        assert!(timeout(Duration::from_secs(5), sup.wait(None))
            .await
            .expect("wait(None) must finish once the child exits"));
        assert!(!sup.has_running_children());
        assert_eq!(rx.await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn wait_times_out_then_succeeds_after_terminate_all() {
        let sup = sup();
        let (tx, rx) = oneshot::channel();

        sup.launch_program(
            "sleep",
            ["30"],
            ProcessOptions::default(),
            ProcessCallbacks::new().on_exit(move |code| {
                let _ = tx.send(code);
            }),
        )
        .expect("launch sleep");

        assert!(sup.has_running_children());
        assert!(!sup.wait(Some(Duration::from_millis(100))).await);

        sup.terminate_all();
        assert!(sup.wait(Some(Duration::from_secs(5))).await);
        assert!(!sup.has_running_children());

        let code = rx.await.unwrap();
        assert_eq!(code, -(nix::sys::signal::Signal::SIGTERM as i32));
    }

    #[tokio::test]
    async fn child_is_reaped_before_its_exit_callback_runs() {
        let sup = sup();
        let probe = sup.clone();
        let (tx, rx) = oneshot::channel();

        sup.launch_program(
            "/bin/echo",
            ["done"],
            ProcessOptions::default(),
            ProcessCallbacks::new().on_exit(move |_| {
                let _ = tx.send(probe.has_running_children());
            }),
        )
        .expect("launch echo");

        assert!(sup.wait(Some(Duration::from_secs(5))).await);
        // Single child: by the time its exit callback ran, it was deregistered.
        assert!(!rx.await.unwrap());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_children_drain_to_quiescence() {
        let sup = sup();
        let exited = Arc::new(AtomicUsize::new(0));

        for i in 0..5 {
            let exited = Arc::clone(&exited);
            sup.launch_program(
                "/bin/echo",
                [format!("child-{i}")],
                ProcessOptions::default(),
                ProcessCallbacks::new().on_exit(move |code| {
                    assert_eq!(code, 0);
                    exited.fetch_add(1, AtomicOrdering::SeqCst);
                }),
            )
            .expect("launch echo");
        }

        assert!(sup.wait(Some(Duration::from_secs(5))).await);
        assert_eq!(exited.load(AtomicOrdering::SeqCst), 5);
        assert!(!sup.has_running_children());
    }

    #[tokio::test]
    async fn exit_callback_may_reenter_the_supervisor() {
        let sup = sup();
        let reentrant = sup.clone();
        let (tx, rx) = oneshot::channel();

        sup.launch_program(
            "true",
            Vec::<String>::new(),
            ProcessOptions::default(),
            ProcessCallbacks::new().on_exit(move |_| {
                // Launch a second child from inside the first one's callback.
                let result = reentrant.launch_program(
                    "true",
                    Vec::<String>::new(),
                    ProcessOptions::default(),
                    ProcessCallbacks::new(),
                );
                let _ = tx.send(result.is_ok());
            }),
        )
        .expect("launch true");

        assert!(rx.await.unwrap());
        assert!(sup.wait(Some(Duration::from_secs(5))).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn terminate_failures_are_published_and_skipped() {
        let sup = sup();
        let mut rx = sup.events();

        sup.launch_program(
            "sleep",
            ["30"],
            ProcessOptions::default(),
            ProcessCallbacks::new(),
        )
        .expect("launch sleep");

        // A handle that was never started cannot be signaled; inject one so
        // the sweep hits the failure path deterministically.
        let stale = Arc::new(ChildProcess::new(
            ProcessSpec::program("true", Vec::<String>::new()),
            ProcessOptions::default(),
        ));
        lock(&sup.inner.children).insert(stale.id(), Arc::clone(&stale));

        sup.terminate_all();
        lock(&sup.inner.children).remove(&stale.id());

        // The failed entry was skipped: the running child was still signaled.
        assert!(sup.wait(Some(Duration::from_secs(5))).await);

        let mut failed = None;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::TerminateFailed {
                failed = Some(ev);
            }
        }
        let ev = failed.expect("termination failure must be published");
        assert_eq!(ev.program.as_deref(), Some("true"));
        assert_eq!(ev.reason.as_deref(), Some("child process is not running"));
    }

    #[tokio::test]
    async fn terminate_all_on_empty_supervisor_is_a_no_op() {
        let sup = sup();
        sup.terminate_all();
        assert!(sup.wait(Some(Duration::ZERO)).await);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn shutdown_terminates_and_waits() {
        let sup = sup();
        sup.launch_program(
            "sleep",
            ["30"],
            ProcessOptions::default(),
            ProcessCallbacks::new(),
        )
        .expect("launch sleep");

        assert!(sup.shutdown().await);
        assert!(!sup.has_running_children());
    }

    struct Recorder(Arc<StdMutex<Vec<EventKind>>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, event: &Event) {
            self.0.lock().unwrap().push(event.kind);
        }
    }

    #[tokio::test]
    async fn lifecycle_events_reach_subscribers() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let sup = ProcessSupervisor::with_subscribers(
            SupervisorConfig::default(),
            vec![Arc::new(Recorder(Arc::clone(&seen)))],
        );

        sup.launch_program(
            "/bin/echo",
            ["observed"],
            ProcessOptions::default(),
            ProcessCallbacks::new(),
        )
        .expect("launch echo");
        assert!(sup.wait(Some(Duration::from_secs(5))).await);

        // Delivery is asynchronous; poll briefly for the terminal event.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            {
                let seen = seen.lock().unwrap();
                if seen.contains(&EventKind::QuiescenceReached) {
                    assert!(seen.contains(&EventKind::ProcessLaunched));
                    assert!(seen.contains(&EventKind::ProcessExited));
                    break;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "events never reached the subscriber"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn direct_event_receiver_observes_termination_requests() {
        let sup = sup();
        let mut rx = sup.events();

        sup.launch_program(
            "sleep",
            ["30"],
            ProcessOptions::default(),
            ProcessCallbacks::new(),
        )
        .expect("launch sleep");
        sup.terminate_all();
        assert!(sup.wait(Some(Duration::from_secs(5))).await);

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ProcessLaunched));
        assert!(kinds.contains(&EventKind::TerminateRequested));
        assert!(kinds.contains(&EventKind::ProcessExited));
    }
}
