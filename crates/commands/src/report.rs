use chrono::{Local, TimeZone};
use racha_ledger::{Category, LedgerEntry};
use std::fmt::{self, Write as _};

const PAID: &str = "✅";
const UNPAID: &str = "❌";
const UPDATED_AT_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

pub const ADMIN_ONLY_REPLY: &str = "⚠️ Apenas administradores do grupo podem limpar listas.";
pub const CLEAR_USAGE_REPLY: &str = "Use: limpar mensal | limpar churrasco | limpar diaria";

pub const HELP_TEXT: &str = "⚽ Bot do Racha — comandos disponíveis:

• \"paguei mensalidade\" → registra sua mensalidade ✅
• \"paguei churrasco\"   → registra seu churrasco ✅
• \"paguei diaria\"      → registra sua diária ✅

• \"lista mensal\"       → mostra lista de mensalidade
• \"lista churrasco\"    → mostra lista do churrasco
• \"lista diaria\"       → mostra lista da diária

• \"minha situacao\"     → mostra seus pagamentos
• \"limpar mensal\" | \"limpar churrasco\" | \"limpar diaria\"
  (somente administradores do grupo)

Dica: escreva exatamente as palavras acima.";

const fn glyph(paid: bool) -> &'static str {
    if paid {
        PAID
    } else {
        UNPAID
    }
}

#[must_use]
pub fn paid_reply(name: &str, category: Category) -> String {
    format!("✅ Registrado: {name} pagou {}", category.shout_label())
}

#[must_use]
pub fn cleared_reply(category: Category) -> String {
    format!("🧹 Lista de {} zerada.", category.shout_label())
}

/// Renders the numbered roster of `category`, one line per current member
/// in roster order, with the update time in the host's local time zone.
#[must_use]
pub fn build_list(roster: &[String], entry: &LedgerEntry, category: Category) -> String {
    build_list_in(roster, entry, category, &Local)
}

/// [`build_list`] with an explicit time zone for the header.
pub fn build_list_in<Tz>(
    roster: &[String],
    entry: &LedgerEntry,
    category: Category,
    tz: &Tz,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    let updated = entry.updated_at.with_timezone(tz).format(UPDATED_AT_FORMAT);
    let mut out = format!(
        "📋 Lista {}\n(Atualizado: {updated})\n",
        category.list_title()
    );
    for (idx, name) in roster.iter().enumerate() {
        let _ = write!(
            out,
            "\n{}. {name} {}",
            idx + 1,
            glyph(entry.is_paid(category, name))
        );
    }
    out
}

/// Payment status of one participant across every category. Works for
/// people who already left the chat.
#[must_use]
pub fn my_status(entry: &LedgerEntry, name: &str) -> String {
    let mut out = format!("👤 {name}");
    for category in Category::ALL {
        let _ = write!(
            out,
            "\n{}: {}",
            category.status_label(),
            glyph(entry.is_paid(category, name))
        );
    }
    out
}
