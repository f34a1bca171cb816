use crate::auth::is_admin;
use crate::command::{classify, Command};
use crate::normalize::normalize;
use crate::report::{
    build_list, cleared_reply, my_status, paid_reply, ADMIN_ONLY_REPLY, CLEAR_USAGE_REPLY,
    HELP_TEXT,
};
use crate::roster::{participant_display_name, sender_display_name, ChatRoster};
use anyhow::{Context as _, Result};
use log::debug;
use racha_ledger::{Category, LedgerStore};
use racha_protocol::{IncomingMessage, OutgoingReply};

/// Who sent a message and where.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub chat_id: &'a str,
    pub is_group: bool,
    pub sender_id: &'a str,
    /// Resolved display name; also the sender's ledger key.
    pub sender_name: &'a str,
}

/// Turns chat messages into ledger operations and reply text.
///
/// Holds no per-message state; every message is classified and executed on
/// its own.
#[derive(Clone)]
pub struct CommandRouter {
    store: LedgerStore,
}

impl CommandRouter {
    pub const fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    #[must_use]
    pub const fn store(&self) -> &LedgerStore {
        &self.store
    }

    /// Handles a message as delivered by the transport. The sender's ledger
    /// key is resolved through the roster, like the names on a list.
    pub async fn handle_incoming(
        &self,
        message: &IncomingMessage,
        roster: &dyn ChatRoster,
    ) -> Result<Option<OutgoingReply>> {
        let sender_name =
            sender_display_name(roster, &message.chat.id, &message.sender).await;
        let ctx = MessageContext {
            chat_id: &message.chat.id,
            is_group: message.chat.is_group,
            sender_id: &message.sender.id,
            sender_name: &sender_name,
        };
        let reply = self.handle(&ctx, &message.body, roster).await?;
        Ok(reply.map(|text| OutgoingReply::to_message(message, text)))
    }

    /// Classifies `body` and runs the command. `Ok(None)` means the bot stays
    /// silent: the message came from outside a group or asked for nothing.
    pub async fn handle(
        &self,
        ctx: &MessageContext<'_>,
        body: &str,
        roster: &dyn ChatRoster,
    ) -> Result<Option<String>> {
        if !ctx.is_group {
            debug!("Ignoring message outside a group chat ({})", ctx.chat_id);
            return Ok(None);
        }
        let command = classify(&normalize(body));
        if command != Command::NoOp {
            debug!("{}: {} -> {command:?}", ctx.chat_id, ctx.sender_name);
        }
        self.dispatch(ctx, command, roster).await
    }

    pub async fn dispatch(
        &self,
        ctx: &MessageContext<'_>,
        command: Command,
        roster: &dyn ChatRoster,
    ) -> Result<Option<String>> {
        if command.requires_admin() && !is_admin(roster, ctx.chat_id, ctx.sender_id).await {
            return Ok(Some(ADMIN_ONLY_REPLY.to_string()));
        }

        let reply = match command {
            Command::MarkPaid(category) => {
                self.store
                    .mark_paid(ctx.chat_id, category, ctx.sender_name)
                    .await;
                paid_reply(ctx.sender_name, category)
            }
            Command::ListCategory(category) => self.list(ctx.chat_id, category, roster).await?,
            Command::MyStatus => {
                let entry = self.store.get_entry(ctx.chat_id).await;
                my_status(&entry, ctx.sender_name)
            }
            Command::ClearCategory(category) => {
                self.store.clear_category(ctx.chat_id, category).await;
                cleared_reply(category)
            }
            Command::ClearUsage => CLEAR_USAGE_REPLY.to_string(),
            Command::Help => HELP_TEXT.to_string(),
            Command::NoOp => return Ok(None),
        };
        Ok(Some(reply))
    }

    async fn list(
        &self,
        chat_id: &str,
        category: Category,
        roster: &dyn ChatRoster,
    ) -> Result<String> {
        let participants = roster
            .participants(chat_id)
            .await
            .with_context(|| format!("Failed to load roster of {chat_id}"))?;
        let mut names = Vec::with_capacity(participants.len());
        for participant in &participants {
            names.push(participant_display_name(roster, participant).await);
        }
        let entry = self.store.get_entry(chat_id).await;
        Ok(build_list(&names, &entry, category))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SnapshotRoster;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use racha_ledger::{FlushConfig, LedgerBook, LedgerSink};
    use racha_protocol::{ChatInfo, Contact, ParticipantRecord};
    use std::sync::Arc;

    struct DiscardSink;

    #[async_trait]
    impl LedgerSink for DiscardSink {
        async fn persist(&self, _book: &LedgerBook) -> racha_ledger::Result<()> {
            Ok(())
        }
    }

    fn router() -> CommandRouter {
        CommandRouter::new(LedgerStore::with_sink(
            LedgerBook::new(),
            Arc::new(DiscardSink),
            FlushConfig::default(),
        ))
    }

    fn member(id: &str, name: &str, is_admin: bool) -> ParticipantRecord {
        ParticipantRecord {
            id: id.to_string(),
            is_admin,
            is_super_admin: false,
            contact: Some(Contact {
                id: id.to_string(),
                pushname: Some(name.to_string()),
                ..Contact::default()
            }),
        }
    }

    fn roster() -> SnapshotRoster {
        SnapshotRoster::new(ChatInfo {
            id: "G1".to_string(),
            is_group: true,
            participants: vec![
                member("ana@c.us", "Ana", true),
                member("bruno@c.us", "Bruno", false),
                member("carla@c.us", "Carla", false),
            ],
        })
    }

    fn ctx<'a>(sender_id: &'a str, sender_name: &'a str) -> MessageContext<'a> {
        MessageContext {
            chat_id: "G1",
            is_group: true,
            sender_id,
            sender_name,
        }
    }

    async fn send(
        router: &CommandRouter,
        ctx: &MessageContext<'_>,
        body: &str,
    ) -> Option<String> {
        router.handle(ctx, body, &roster()).await.unwrap()
    }

    #[tokio::test]
    async fn marked_payment_shows_up_in_the_list() {
        let router = router();
        let bruno = ctx("bruno@c.us", "Bruno");

        let reply = send(&router, &bruno, "  Paguei MENSALIDADE!  ").await;
        assert_eq!(reply.as_deref(), Some("✅ Registrado: Bruno pagou MENSALIDADE"));

        let list = send(&router, &bruno, "lista mensal").await.unwrap();
        assert!(list.starts_with("📋 Lista Mensalidade (R$45,00)\n(Atualizado: "));
        assert!(list.ends_with("\n1. Ana ❌\n2. Bruno ✅\n3. Carla ❌"));
    }

    #[tokio::test]
    async fn accents_and_case_do_not_matter() {
        let router = router();
        let carla = ctx("carla@c.us", "Carla");
        let reply = send(&router, &carla, "PAGUEI DIÁRIA").await;
        assert_eq!(reply.as_deref(), Some("✅ Registrado: Carla pagou DIÁRIA"));
        let status = send(&router, &carla, "Minha Situação").await.unwrap();
        assert_eq!(status, "👤 Carla\nMensalidade: ❌\nChurrasco: ❌\nDiária: ✅");
    }

    #[tokio::test]
    async fn repeated_payment_is_idempotent() {
        let router = router();
        let bruno = ctx("bruno@c.us", "Bruno");
        send(&router, &bruno, "paguei churrasco").await;
        let reply = send(&router, &bruno, "paguei churrasco").await;
        assert_eq!(reply.as_deref(), Some("✅ Registrado: Bruno pagou CHURRASCO"));
        let entry = router.store().get_entry("G1").await;
        assert_eq!(entry.paid_names(Category::Churrasco).collect::<Vec<_>>(), vec!["Bruno"]);
    }

    #[tokio::test]
    async fn members_cannot_clear_lists() {
        let router = router();
        let bruno = ctx("bruno@c.us", "Bruno");
        send(&router, &bruno, "paguei mensalidade").await;

        let reply = send(&router, &bruno, "limpar mensal").await;
        assert_eq!(reply.as_deref(), Some(ADMIN_ONLY_REPLY));
        let reply = send(&router, &bruno, "limpar tudo").await;
        assert_eq!(reply.as_deref(), Some(ADMIN_ONLY_REPLY));

        let entry = router.store().get_entry("G1").await;
        assert!(entry.is_paid(Category::Mensalidade, "Bruno"));
    }

    #[tokio::test]
    async fn admins_clear_one_category() {
        let router = router();
        let bruno = ctx("bruno@c.us", "Bruno");
        send(&router, &bruno, "paguei mensalidade").await;
        send(&router, &bruno, "paguei diaria").await;

        let ana = ctx("ana@c.us", "Ana");
        let reply = send(&router, &ana, "limpar mensalidade").await;
        assert_eq!(reply.as_deref(), Some("🧹 Lista de MENSALIDADE zerada."));

        let entry = router.store().get_entry("G1").await;
        assert!(!entry.is_paid(Category::Mensalidade, "Bruno"));
        assert!(entry.is_paid(Category::Diaria, "Bruno"));
    }

    #[tokio::test]
    async fn unknown_clear_target_gets_usage_without_mutation() {
        let router = router();
        let bruno = ctx("bruno@c.us", "Bruno");
        send(&router, &bruno, "paguei churrasco").await;
        let before = router.store().snapshot().await;

        let reply = send(&router, &ctx("ana@c.us", "Ana"), "limpar tudo").await;
        assert_eq!(reply.as_deref(), Some(CLEAR_USAGE_REPLY));
        assert_eq!(router.store().snapshot().await, before);
    }

    #[tokio::test]
    async fn help_needs_the_exact_word() {
        let router = router();
        let bruno = ctx("bruno@c.us", "Bruno");
        assert_eq!(send(&router, &bruno, " Ajuda ").await.as_deref(), Some(HELP_TEXT));
        assert_eq!(send(&router, &bruno, "ajuda por favor").await, None);
        assert_eq!(send(&router, &bruno, "bom dia").await, None);
    }

    #[tokio::test]
    async fn direct_messages_are_ignored() {
        let router = router();
        let direct = MessageContext {
            is_group: false,
            ..ctx("bruno@c.us", "Bruno")
        };
        assert_eq!(send(&router, &direct, "paguei mensalidade").await, None);
        assert!(router.store().snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn incoming_messages_reply_to_their_chat() {
        let router = router();
        let message = IncomingMessage {
            id: Some("m1".to_string()),
            chat: ChatInfo {
                id: "G1".to_string(),
                is_group: true,
                participants: vec![member("bruno@c.us", "Bruno", false)],
            },
            sender: Contact {
                id: "bruno@c.us".to_string(),
                pushname: Some("Bruno".to_string()),
                ..Contact::default()
            },
            body: "paguei diaria".to_string(),
        };
        let roster = SnapshotRoster::new(message.chat.clone());
        let reply = router
            .handle_incoming(&message, &roster)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.chat_id, "G1");
        assert_eq!(reply.in_reply_to.as_deref(), Some("m1"));
        assert_eq!(reply.text, "✅ Registrado: Bruno pagou DIÁRIA");
    }

    #[tokio::test]
    async fn sender_contact_mismatch_keeps_one_ledger_key() {
        let router = router();
        let mut message = IncomingMessage {
            id: None,
            chat: ChatInfo {
                id: "G1".to_string(),
                is_group: true,
                participants: vec![member("bruno@c.us", "Bruno", false)],
            },
            sender: Contact {
                id: "bruno@c.us".to_string(),
                pushname: Some("Bruno Silva".to_string()),
                ..Contact::default()
            },
            body: "paguei mensalidade".to_string(),
        };
        let roster =
            SnapshotRoster::new(message.chat.clone()).with_contact(message.sender.clone());
        let paid = router
            .handle_incoming(&message, &roster)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paid.text, "✅ Registrado: Bruno pagou MENSALIDADE");

        message.body = "lista mensal".to_string();
        let list = router
            .handle_incoming(&message, &roster)
            .await
            .unwrap()
            .unwrap();
        assert!(list.text.ends_with("\n1. Bruno ✅"), "{}", list.text);
    }
}
