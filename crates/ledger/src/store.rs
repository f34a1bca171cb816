use crate::file::{LedgerFile, LedgerSink};
use crate::scheduler::{FlushConfig, FlushScheduler};
use crate::{Category, LedgerBook, LedgerEntry, Result};
use chrono::Utc;
use log::info;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Shared handle to the process ledger.
///
/// Each operation runs in one critical section without suspension points, so
/// concurrent handlers never interleave a read-modify-write. Mutations notify
/// the flush scheduler after the lock is released.
#[derive(Clone)]
pub struct LedgerStore {
    book: Arc<Mutex<LedgerBook>>,
    scheduler: FlushScheduler,
}

impl LedgerStore {
    /// Loads (or creates) the ledger file and starts its flush scheduler.
    pub async fn open(file: LedgerFile, config: FlushConfig) -> Result<Self> {
        let book = file.load_or_init().await?;
        info!(
            "Loaded ledger {} ({} chats)",
            file.path().display(),
            book.len()
        );
        Ok(Self::with_sink(book, Arc::new(file), config))
    }

    pub fn with_sink(book: LedgerBook, sink: Arc<dyn LedgerSink>, config: FlushConfig) -> Self {
        let book = Arc::new(Mutex::new(book));
        let scheduler = FlushScheduler::start(book.clone(), sink, config);
        Self { book, scheduler }
    }

    /// Returns the chat's entry, creating an empty one on first reference.
    pub async fn ensure_entry(&self, chat_id: &str) -> LedgerEntry {
        self.book
            .lock()
            .await
            .ensure_entry(chat_id, Utc::now())
            .clone()
    }

    /// Read-only snapshot of a chat's entry, with the same lazy creation as
    /// [`LedgerStore::ensure_entry`].
    pub async fn get_entry(&self, chat_id: &str) -> LedgerEntry {
        self.ensure_entry(chat_id).await
    }

    /// Records a payment. Returns `false` when it was already recorded; the
    /// entry is stamped and a flush scheduled either way.
    pub async fn mark_paid(&self, chat_id: &str, category: Category, participant: &str) -> bool {
        let newly_paid =
            self.book
                .lock()
                .await
                .mark_paid(chat_id, category, participant, Utc::now());
        self.scheduler.notify_mutated();
        info!("{chat_id}: {participant} paid {category} (new: {newly_paid})");
        newly_paid
    }

    /// Empties one category of one chat. Returns how many records were dropped.
    pub async fn clear_category(&self, chat_id: &str, category: Category) -> usize {
        let dropped = self
            .book
            .lock()
            .await
            .clear_category(chat_id, category, Utc::now());
        self.scheduler.notify_mutated();
        info!("{chat_id}: cleared {category} ({dropped} records)");
        dropped
    }

    pub async fn snapshot(&self) -> LedgerBook {
        self.book.lock().await.clone()
    }

    #[must_use]
    pub const fn scheduler(&self) -> &FlushScheduler {
        &self.scheduler
    }

    pub async fn flush_now(&self) -> Result<()> {
        self.scheduler.flush_now().await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.scheduler.shutdown().await
    }
}
