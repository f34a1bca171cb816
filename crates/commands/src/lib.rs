//! # Racha Commands
//!
//! Interprets group chat messages for the payment ledger.
//!
//! ## Flow
//!
//! ```text
//! message body
//!     │
//!     ├──> normalize      (lower-case, no accents, trimmed)
//!     ├──> classify       (ordered rules -> Command)
//!     ├──> is_admin       (clear commands only)
//!     │
//!     └──> CommandRouter
//!            ├─> LedgerStore mutation   (paguei ..., limpar ...)
//!            └─> report rendering       (lista ..., minha situacao, ajuda)
//! ```

mod auth;
mod command;
mod normalize;
pub mod report;
mod roster;
mod router;

pub use auth::is_admin;
pub use command::{classify, Command};
pub use normalize::normalize;
pub use roster::{participant_display_name, sender_display_name, ChatRoster, SnapshotRoster};
pub use router::{CommandRouter, MessageContext};
