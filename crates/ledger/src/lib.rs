//! # Racha Ledger
//!
//! Per-chat payment ledger with debounced JSON persistence.
//!
//! ## Lifecycle
//!
//! ```text
//! payments.json ──load once──> LedgerBook (in memory)
//!                                   │
//!        mark_paid / clear_category ┤──> FlushScheduler (debounce window)
//!                                   │            │
//!                                   │            └──> whole book rewritten
//!                                   └──> LedgerEntry snapshots for reports
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use racha_ledger::{Category, FlushConfig, LedgerFile, LedgerStore};
//!
//! #[tokio::main]
//! async fn main() -> racha_ledger::Result<()> {
//!     let store = LedgerStore::open(LedgerFile::new("data/payments.json"), FlushConfig::default()).await?;
//!     store.mark_paid("120363@g.us", Category::Mensalidade, "Ana").await;
//!     store.shutdown().await
//! }
//! ```

mod book;
mod category;
mod entry;
mod error;
mod file;
mod scheduler;
mod store;

pub use book::LedgerBook;
pub use category::Category;
pub use entry::{ChatId, LedgerEntry, PaidMap, Payments};
pub use error::{LedgerError, Result};
pub use file::{LedgerFile, LedgerSink};
pub use scheduler::{FlushConfig, FlushHealth, FlushScheduler};
pub use store::LedgerStore;
