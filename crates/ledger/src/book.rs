use crate::entry::{ChatId, LedgerEntry};
use crate::Category;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Every chat ledger of the process, keyed by chat id.
///
/// Serializes as the persisted document: a JSON object from chat id to entry.
/// Decoding goes through [`LedgerBook::from_entries`].
/// All mutations take an explicit `now` so callers decide the clock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LedgerBook {
    entries: BTreeMap<ChatId, LedgerEntry>,
}

impl LedgerBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a book from a decoded document, restoring each entry's chat id
    /// from its key.
    pub fn from_entries(mut entries: BTreeMap<ChatId, LedgerEntry>) -> Self {
        for (chat_id, entry) in &mut entries {
            entry.chat_id.clone_from(chat_id);
        }
        Self { entries }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, chat_id: &str) -> Option<&LedgerEntry> {
        self.entries.get(chat_id)
    }

    /// Returns the chat's entry, inserting an empty one stamped with `now`.
    pub fn ensure_entry(&mut self, chat_id: &str, now: DateTime<Utc>) -> &mut LedgerEntry {
        self.entries
            .entry(chat_id.to_string())
            .or_insert_with(|| LedgerEntry::new(chat_id, now))
    }

    /// Marks `participant` as paid. Returns `false` when they already were;
    /// the entry is stamped either way.
    pub fn mark_paid(
        &mut self,
        chat_id: &str,
        category: Category,
        participant: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let entry = self.ensure_entry(chat_id, now);
        let previous = entry
            .payments
            .get_mut(category)
            .insert(participant.to_string(), true);
        entry.touch(now);
        previous != Some(true)
    }

    /// Empties one category of one chat. Returns how many records were dropped.
    pub fn clear_category(
        &mut self,
        chat_id: &str,
        category: Category,
        now: DateTime<Utc>,
    ) -> usize {
        let entry = self.ensure_entry(chat_id, now);
        let dropped = std::mem::take(entry.payments.get_mut(category)).len();
        entry.touch(now);
        dropped
    }
}
