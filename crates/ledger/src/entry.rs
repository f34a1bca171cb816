use crate::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type ChatId = String;

/// Participant display name -> paid flag. Absence means unpaid.
pub type PaidMap = BTreeMap<String, bool>;

/// The three category maps of one chat. Every key is always present, also
/// when a persisted document omits it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payments {
    #[serde(default)]
    pub mensalidade: PaidMap,
    #[serde(default)]
    pub churrasco: PaidMap,
    #[serde(default)]
    pub diaria: PaidMap,
}

impl Payments {
    #[must_use]
    pub const fn get(&self, category: Category) -> &PaidMap {
        match category {
            Category::Mensalidade => &self.mensalidade,
            Category::Churrasco => &self.churrasco,
            Category::Diaria => &self.diaria,
        }
    }

    pub fn get_mut(&mut self, category: Category) -> &mut PaidMap {
        match category {
            Category::Mensalidade => &mut self.mensalidade,
            Category::Churrasco => &mut self.churrasco,
            Category::Diaria => &mut self.diaria,
        }
    }
}

/// Ledger of a single chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    /// Restored from the map key when loading; not repeated in the document.
    #[serde(skip)]
    pub chat_id: ChatId,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub payments: Payments,
}

impl LedgerEntry {
    pub fn new(chat_id: impl Into<ChatId>, now: DateTime<Utc>) -> Self {
        Self {
            chat_id: chat_id.into(),
            updated_at: now,
            payments: Payments::default(),
        }
    }

    #[must_use]
    pub fn is_paid(&self, category: Category, participant: &str) -> bool {
        self.payments
            .get(category)
            .get(participant)
            .copied()
            .unwrap_or(false)
    }

    /// Names recorded as paid for `category`, in key order.
    pub fn paid_names(&self, category: Category) -> impl Iterator<Item = &str> {
        self.payments
            .get(category)
            .iter()
            .filter(|(_, paid)| **paid)
            .map(|(name, _)| name.as_str())
    }

    /// Stamps a mutation. The timestamp never moves backwards.
    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}
