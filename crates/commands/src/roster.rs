use anyhow::{anyhow, Result};
use async_trait::async_trait;
use racha_protocol::{ChatInfo, Contact, ParticipantRecord};

/// Live view of a chat's members, supplied by the transport.
#[async_trait]
pub trait ChatRoster: Send + Sync {
    /// Current participants, in the transport's roster order.
    async fn participants(&self, chat_id: &str) -> Result<Vec<ParticipantRecord>>;

    /// Contact details for a participant id.
    async fn contact(&self, id: &str) -> Result<Contact>;
}

/// Resolves the name shown for a participant. Never fails: a contact lookup
/// error falls back to a contact known only by its id.
pub async fn participant_display_name(
    roster: &dyn ChatRoster,
    participant: &ParticipantRecord,
) -> String {
    if let Some(contact) = &participant.contact {
        return contact.display_name();
    }
    match roster.contact(&participant.id).await {
        Ok(contact) => contact.display_name(),
        Err(err) => {
            log::debug!("Contact lookup for {} failed: {err}", participant.id);
            Contact::from_id(participant.id.clone()).display_name()
        }
    }
}

/// Resolves the sender's name the same way lists resolve participants: the
/// roster record's contact wins over the contact attached to the message.
pub async fn sender_display_name(
    roster: &dyn ChatRoster,
    chat_id: &str,
    sender: &Contact,
) -> String {
    let record = match roster.participants(chat_id).await {
        Ok(participants) => participants.into_iter().find(|p| p.id == sender.id),
        Err(err) => {
            log::debug!("Roster lookup for sender {} failed: {err}", sender.id);
            None
        }
    };
    match record.and_then(|p| p.contact) {
        Some(contact) => contact.display_name(),
        None => sender.display_name(),
    }
}

/// Roster captured alongside a delivered message.
///
/// Transports that ship the participant list with every message (as the
/// stdio transport does) hand this to the router; it is as live as the
/// message that carried it.
#[derive(Debug, Clone, Default)]
pub struct SnapshotRoster {
    chat: ChatInfo,
    extra_contacts: Vec<Contact>,
}

impl SnapshotRoster {
    pub fn new(chat: ChatInfo) -> Self {
        Self {
            chat,
            extra_contacts: Vec::new(),
        }
    }

    /// Adds contacts known from elsewhere, such as the message sender.
    #[must_use]
    pub fn with_contact(mut self, contact: Contact) -> Self {
        self.extra_contacts.push(contact);
        self
    }
}

#[async_trait]
impl ChatRoster for SnapshotRoster {
    async fn participants(&self, chat_id: &str) -> Result<Vec<ParticipantRecord>> {
        if chat_id != self.chat.id {
            return Err(anyhow!(
                "roster snapshot belongs to {}, not {chat_id}",
                self.chat.id
            ));
        }
        Ok(self.chat.participants.clone())
    }

    async fn contact(&self, id: &str) -> Result<Contact> {
        self.chat
            .participants
            .iter()
            .filter(|p| p.id == id)
            .find_map(|p| p.contact.clone())
            .or_else(|| self.extra_contacts.iter().find(|c| c.id == id).cloned())
            .ok_or_else(|| anyhow!("unknown contact {id}"))
    }
}
