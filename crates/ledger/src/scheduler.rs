use crate::file::LedgerSink;
use crate::{LedgerBook, LedgerError, Result};
use log::{debug, error, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::time::{self, Instant};

#[derive(Debug, Clone, Copy)]
pub struct FlushConfig {
    /// Quiescence window after the last mutation before the book is written.
    pub debounce: Duration,
    /// Wait before a failed write is attempted again.
    pub retry_delay: Duration,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            retry_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FlushHealth {
    pub last_flush: Option<SystemTime>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub flushes: u64,
    pub pending_mutations: usize,
}

/// Debounced writer for a [`LedgerBook`].
///
/// A background task owns the deadline. Every [`notify_mutated`] pushes it
/// back by the debounce window; when the window passes quietly the whole
/// book is handed to the sink once. Mutations made after the last flush are
/// lost if the process dies before the deadline, so shutdown paths call
/// [`flush_now`] or [`shutdown`].
///
/// [`notify_mutated`]: FlushScheduler::notify_mutated
/// [`flush_now`]: FlushScheduler::flush_now
/// [`shutdown`]: FlushScheduler::shutdown
#[derive(Clone)]
pub struct FlushScheduler {
    inner: Arc<FlushSchedulerInner>,
}

struct FlushSchedulerInner {
    command_tx: mpsc::UnboundedSender<FlushCommand>,
    health_tx: watch::Sender<FlushHealth>,
}

enum FlushCommand {
    Mutated,
    FlushNow { ack: oneshot::Sender<Result<()>> },
    Shutdown { ack: oneshot::Sender<Result<()>> },
}

impl FlushScheduler {
    /// Spawns the flush task on the current tokio runtime.
    pub fn start(
        book: Arc<Mutex<LedgerBook>>,
        sink: Arc<dyn LedgerSink>,
        config: FlushConfig,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (health_tx, _) = watch::channel(FlushHealth::default());

        spawn_flush_loop(book, sink, config, command_rx, health_tx.clone());

        Self {
            inner: Arc::new(FlushSchedulerInner {
                command_tx,
                health_tx,
            }),
        }
    }

    pub fn notify_mutated(&self) {
        if self.inner.command_tx.send(FlushCommand::Mutated).is_err() {
            warn!("Ledger mutated after the flush scheduler stopped; change stays in memory only");
        }
    }

    /// Writes the book immediately and waits for the outcome.
    pub async fn flush_now(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.inner
            .command_tx
            .send(FlushCommand::FlushNow { ack })
            .map_err(|_| LedgerError::SchedulerClosed)?;
        done.await.map_err(|_| LedgerError::SchedulerClosed)?
    }

    /// Writes pending changes, if any, and stops the background task.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack, done) = oneshot::channel();
        self.inner
            .command_tx
            .send(FlushCommand::Shutdown { ack })
            .map_err(|_| LedgerError::SchedulerClosed)?;
        done.await.map_err(|_| LedgerError::SchedulerClosed)?
    }

    #[must_use]
    pub fn health_snapshot(&self) -> FlushHealth {
        self.inner.health_tx.borrow().clone()
    }
}

fn spawn_flush_loop(
    book: Arc<Mutex<LedgerBook>>,
    sink: Arc<dyn LedgerSink>,
    config: FlushConfig,
    mut command_rx: mpsc::UnboundedReceiver<FlushCommand>,
    health_tx: watch::Sender<FlushHealth>,
) {
    tokio::spawn(async move {
        let mut state = DebounceState::new(config.debounce);
        let mut health = FlushHealth::default();

        loop {
            let next_deadline = state.next_deadline();

            tokio::select! {
                cmd = command_rx.recv() => {
                    match cmd {
                        Some(FlushCommand::Mutated) => {
                            state.record_mutation();
                            health.pending_mutations = state.pending();
                            health_tx.send_replace(health.clone());
                        }
                        Some(FlushCommand::FlushNow { ack }) => {
                            let result = run_flush(&book, sink.as_ref(), &mut state, &mut health, config).await;
                            health_tx.send_replace(health.clone());
                            let _ = ack.send(result);
                        }
                        Some(FlushCommand::Shutdown { ack }) => {
                            let result = if state.is_dirty() {
                                run_flush(&book, sink.as_ref(), &mut state, &mut health, config).await
                            } else {
                                Ok(())
                            };
                            health_tx.send_replace(health.clone());
                            let _ = ack.send(result);
                            break;
                        }
                        None => {
                            // Every handle is gone; keep what we can.
                            if state.is_dirty() {
                                let _ = run_flush(&book, sink.as_ref(), &mut state, &mut health, config).await;
                            }
                            break;
                        }
                    }
                }
                () = async {
                    if let Some(deadline) = next_deadline {
                        time::sleep_until(deadline).await;
                    }
                }, if next_deadline.is_some() => {
                    let _ = run_flush(&book, sink.as_ref(), &mut state, &mut health, config).await;
                    health_tx.send_replace(health.clone());
                }
            }
        }
        debug!("Ledger flush scheduler stopped");
    });
}

async fn run_flush(
    book: &Mutex<LedgerBook>,
    sink: &dyn LedgerSink,
    state: &mut DebounceState,
    health: &mut FlushHealth,
    config: FlushConfig,
) -> Result<()> {
    let snapshot = book.lock().await.clone();
    let pending = state.pending();
    state.reset();

    let result = sink.persist(&snapshot).await;
    match &result {
        Ok(()) => {
            debug!(
                "Ledger flushed: {} chats, {pending} coalesced mutations",
                snapshot.len()
            );
            health.last_flush = Some(SystemTime::now());
            health.last_error = None;
            health.consecutive_failures = 0;
            health.flushes += 1;
        }
        Err(err) => {
            error!(
                "Ledger flush failed (retrying in {:?}): {err}",
                config.retry_delay
            );
            health.last_error = Some(err.to_string());
            health.consecutive_failures += 1;
            state.schedule_retry(config.retry_delay, pending);
        }
    }
    health.pending_mutations = state.pending();
    result
}

struct DebounceState {
    debounce: Duration,
    dirty: bool,
    pending: usize,
    last_event: Option<Instant>,
    retry_at: Option<Instant>,
}

impl DebounceState {
    const fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            dirty: false,
            pending: 0,
            last_event: None,
            retry_at: None,
        }
    }

    fn record_mutation(&mut self) {
        self.pending += 1;
        self.last_event = Some(Instant::now());
        self.retry_at = None;
        self.dirty = true;
    }

    fn schedule_retry(&mut self, delay: Duration, pending: usize) {
        self.pending += pending.max(1);
        self.retry_at = Some(Instant::now() + delay);
        self.dirty = true;
    }

    const fn pending(&self) -> usize {
        self.pending
    }

    const fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn next_deadline(&self) -> Option<Instant> {
        if !self.dirty {
            return None;
        }
        self.retry_at
            .or_else(|| self.last_event.map(|last| last + self.debounce))
    }

    fn reset(&mut self) {
        self.dirty = false;
        self.pending = 0;
        self.last_event = None;
        self.retry_at = None;
    }
}
