//! Tokio driver for a [`Supervisor`]
//!
//! One task owns the supervisor. Ticks from an interval and page events
//! from a bounded channel are serialized by `select!`, so cycles never
//! overlap. Page time is measured from the moment the runtime starts.

use crate::error::VigilError;
use crate::supervisor::{EventOutcome, Supervisor};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use vigil_dom::PageEvent;
use vigil_watchdog::WatchdogId;

type Inspect = Box<dyn FnOnce(&mut Supervisor, Duration) + Send>;

enum Command {
    Event(PageEvent, Option<oneshot::Sender<Result<EventOutcome, VigilError>>>),
    Unregister(WatchdogId, oneshot::Sender<Result<(), VigilError>>),
    Inspect(Inspect),
}

/// Spawns the driver task
#[derive(Debug)]
pub struct WatchdogRuntime;

impl WatchdogRuntime {
    /// Start driving `supervisor` on the current Tokio runtime
    #[must_use]
    pub fn spawn(supervisor: Supervisor) -> RuntimeHandle {
        let tick = supervisor.config().scheduler.tick_interval();
        let buffer = supervisor.config().scheduler.event_buffer;
        let (sender, receiver) = mpsc::channel(buffer);
        let (shutdown, shutdown_rx) = oneshot::channel();

        let task = tokio::spawn(drive(supervisor, receiver, shutdown_rx, tick));
        tracing::info!(tick_ms = tick.as_millis() as u64, "watchdog runtime started");

        RuntimeHandle {
            sender,
            shutdown: Some(shutdown),
            task,
        }
    }
}

/// Handle to a running [`WatchdogRuntime`]
#[derive(Debug)]
pub struct RuntimeHandle {
    sender: mpsc::Sender<Command>,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<Supervisor>,
}

impl RuntimeHandle {
    /// Queue a page event without waiting for it to be handled
    ///
    /// # Errors
    /// Returns [`VigilError::RuntimeStopped`] if the driver has exited.
    pub async fn send(&self, event: PageEvent) -> Result<(), VigilError> {
        self.sender
            .send(Command::Event(event, None))
            .await
            .map_err(|_| VigilError::RuntimeStopped)
    }

    /// Deliver a page event and wait for its outcome
    ///
    /// # Errors
    /// Returns [`VigilError::RuntimeStopped`] if the driver has exited, or
    /// the supervisor's error for this event.
    pub async fn dispatch(&self, event: PageEvent) -> Result<EventOutcome, VigilError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Event(event, Some(tx)))
            .await
            .map_err(|_| VigilError::RuntimeStopped)?;
        rx.await.map_err(|_| VigilError::RuntimeStopped)?
    }

    /// Remove a watchdog from the running scheduler
    ///
    /// # Errors
    /// Returns [`VigilError::RuntimeStopped`] if the driver has exited, or
    /// `WatchdogError::NotFound` for unknown ids.
    pub async fn unregister(&self, id: WatchdogId) -> Result<(), VigilError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(Command::Unregister(id, tx))
            .await
            .map_err(|_| VigilError::RuntimeStopped)?;
        rx.await.map_err(|_| VigilError::RuntimeStopped)?
    }

    /// Run `f` against the supervisor between cycles
    ///
    /// `f` also receives the current page time.
    ///
    /// # Errors
    /// Returns [`VigilError::RuntimeStopped`] if the driver has exited.
    pub async fn with<R, F>(&self, f: F) -> Result<R, VigilError>
    where
        R: Send + 'static,
        F: FnOnce(&mut Supervisor, Duration) -> R + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let inspect: Inspect = Box::new(move |supervisor, now| {
            let _ = tx.send(f(supervisor, now));
        });
        self.sender
            .send(Command::Inspect(inspect))
            .await
            .map_err(|_| VigilError::RuntimeStopped)?;
        rx.await.map_err(|_| VigilError::RuntimeStopped)
    }

    /// Whether the driver task has exited
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the driver and return the torn-down supervisor
    ///
    /// # Errors
    /// Returns [`VigilError::RuntimeStopped`] if the driver task panicked.
    pub async fn shutdown(mut self) -> Result<Supervisor, VigilError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        self.task.await.map_err(|e| {
            tracing::error!(error = %e, "watchdog runtime task failed");
            VigilError::RuntimeStopped
        })
    }
}

async fn drive(
    mut supervisor: Supervisor,
    mut commands: mpsc::Receiver<Command>,
    mut shutdown: oneshot::Receiver<()>,
    tick: Duration,
) -> Supervisor {
    let started = Instant::now();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => {
                tracing::info!("watchdog runtime shutting down");
                break;
            }

            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::info!("all runtime handles dropped");
                    break;
                };
                let now = started.elapsed();
                match command {
                    Command::Event(event, reply) => {
                        let result = supervisor.handle_event(event, now);
                        if let Err(e) = &result {
                            tracing::error!(error = %e, "page event failed");
                        }
                        if let Some(reply) = reply {
                            let _ = reply.send(result);
                        }
                    }
                    Command::Unregister(id, reply) => {
                        let _ = reply.send(supervisor.unregister(id));
                    }
                    Command::Inspect(f) => f(&mut supervisor, now),
                }
            }

            _ = ticker.tick() => {
                if let Err(e) = supervisor.tick(started.elapsed()) {
                    tracing::error!(error = %e, "tick failed");
                    if !e.is_recoverable() {
                        break;
                    }
                }
            }
        }
    }

    supervisor.teardown();
    supervisor
}
