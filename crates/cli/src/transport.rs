use anyhow::{Context as AnyhowContext, Result};
use log::{debug, error, info, warn};
use racha_commands::{ChatRoster, CommandRouter, SnapshotRoster};
use racha_protocol::{serialize_json, IncomingMessage, OutgoingReply};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Builds the roster a message is handled against.
pub type RosterFactory = Arc<dyn Fn(&IncomingMessage) -> Arc<dyn ChatRoster> + Send + Sync>;

/// Roster taken from the chat info each message carries, plus its sender.
#[must_use]
pub fn snapshot_rosters() -> RosterFactory {
    Arc::new(|message: &IncomingMessage| -> Arc<dyn ChatRoster> {
        let roster =
            SnapshotRoster::new(message.chat.clone()).with_contact(message.sender.clone());
        Arc::new(roster)
    })
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServeStats {
    pub messages: usize,
    pub malformed: usize,
}

/// Runs the JSON-lines transport until `input` ends or `shutdown` resolves.
///
/// Each line of `input` is one [`IncomingMessage`]; replies are written to
/// `output` one [`OutgoingReply`] per line. Messages of the same chat are
/// handled strictly in arrival order by that chat's worker; chats run
/// concurrently. On exit the workers are drained and the ledger flushed.
pub async fn serve<R, W>(
    router: CommandRouter,
    input: R,
    output: W,
    shutdown: impl Future<Output = ()>,
) -> Result<ServeStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    serve_with_rosters(router, snapshot_rosters(), input, output, shutdown).await
}

/// [`serve`] with a custom roster source. A failing or panicking handler is
/// logged and the chat's next message is handled as usual.
pub async fn serve_with_rosters<R, W>(
    router: CommandRouter,
    rosters: RosterFactory,
    input: R,
    output: W,
    shutdown: impl Future<Output = ()>,
) -> Result<ServeStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_replies(output, reply_rx));
    let mut dispatcher = Dispatcher::new(router.clone(), rosters, reply_tx);
    let mut stats = ServeStats::default();

    let mut lines = input.lines();
    tokio::pin!(shutdown);
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            () = &mut shutdown => {
                info!("Shutdown requested");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                error!("Failed to read input: {err}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<IncomingMessage>(&line) {
            Ok(message) => {
                stats.messages += 1;
                dispatcher.dispatch(message);
            }
            Err(err) => {
                stats.malformed += 1;
                warn!("Skipping malformed message: {err}");
            }
        }
    }

    dispatcher.drain().await;
    match writer.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!("Reply writer failed: {err:#}"),
        Err(err) => error!("Reply writer panicked: {err}"),
    }
    router
        .store()
        .shutdown()
        .await
        .context("Failed to flush ledger on shutdown")?;
    let health = router.store().scheduler().health_snapshot();
    info!(
        "Transport stopped ({} messages, {} malformed, {} ledger writes, {} failed in a row)",
        stats.messages, stats.malformed, health.flushes, health.consecutive_failures
    );
    if let Some(err) = &health.last_error {
        warn!("Last ledger write error: {err}");
    }
    Ok(stats)
}

/// One worker task per chat, created on the chat's first message.
struct Dispatcher {
    router: CommandRouter,
    rosters: RosterFactory,
    replies: mpsc::UnboundedSender<OutgoingReply>,
    workers: HashMap<String, mpsc::UnboundedSender<IncomingMessage>>,
    handles: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    fn new(
        router: CommandRouter,
        rosters: RosterFactory,
        replies: mpsc::UnboundedSender<OutgoingReply>,
    ) -> Self {
        Self {
            router,
            rosters,
            replies,
            workers: HashMap::new(),
            handles: Vec::new(),
        }
    }

    fn dispatch(&mut self, message: IncomingMessage) {
        let chat_id = message.chat.id.clone();
        let message = match self.workers.get(&chat_id) {
            Some(queue) => match queue.send(message) {
                Ok(()) => return,
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        debug!("Starting worker for chat {chat_id}");
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = chat_worker(
            chat_id.clone(),
            self.router.clone(),
            self.rosters.clone(),
            rx,
            self.replies.clone(),
        );
        self.handles.push(tokio::spawn(worker));
        // A fresh receiver is alive until the worker drops it.
        let _ = tx.send(message);
        self.workers.insert(chat_id, tx);
    }

    async fn drain(self) {
        drop(self.workers);
        for handle in self.handles {
            if let Err(err) = handle.await {
                error!("Chat worker terminated abnormally: {err}");
            }
        }
    }
}

async fn chat_worker(
    chat_id: String,
    router: CommandRouter,
    rosters: RosterFactory,
    mut queue: mpsc::UnboundedReceiver<IncomingMessage>,
    replies: mpsc::UnboundedSender<OutgoingReply>,
) {
    while let Some(message) = queue.recv().await {
        let router = router.clone();
        let rosters = rosters.clone();
        let handler = tokio::spawn(async move {
            let roster = rosters(&message);
            router.handle_incoming(&message, roster.as_ref()).await
        });
        match handler.await {
            Ok(Ok(Some(reply))) => {
                if replies.send(reply).is_err() {
                    warn!("Reply writer closed; dropping reply for {chat_id}");
                }
            }
            Ok(Ok(None)) => {}
            Ok(Err(err)) => error!("Failed to handle message in {chat_id}: {err:#}"),
            Err(err) => error!("Message handler for {chat_id} panicked: {err}"),
        }
    }
    debug!("Worker for chat {chat_id} finished");
}

async fn write_replies<W>(
    mut output: W,
    mut replies: mpsc::UnboundedReceiver<OutgoingReply>,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(reply) = replies.recv().await {
        let mut line = serialize_json(&reply)?;
        line.push('\n');
        if let Err(err) = output.write_all(line.as_bytes()).await {
            if err.kind() == std::io::ErrorKind::BrokenPipe {
                warn!("Reply sink closed");
                return Ok(());
            }
            return Err(err.into());
        }
        output.flush().await?;
    }
    let _ = output.shutdown().await;
    Ok(())
}
