use anyhow::Result;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label used when no part of a contact can produce a display name.
pub const FALLBACK_DISPLAY_NAME: &str = "Sem Nome";

/// Contact details as the chat transport reports them.
///
/// Every field except `id` is optional: the transport fills in whatever the
/// account exposes, and [`Contact::display_name`] picks the best one.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    /// Raw transport identifier, e.g. `5511999990000@c.us`.
    #[serde(default)]
    pub id: String,
    /// Alias the user chose for themselves.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pushname: Option<String>,
    /// Name saved in the bot's address book.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_name: Option<String>,
    /// Phone number without the leading `+`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
}

impl Contact {
    /// A contact known only by its identifier.
    pub fn from_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Resolves the name shown in replies and used as the ledger key.
    ///
    /// Fallback chain: alias, profile name, short name, `+<number>`, the user
    /// part of the raw id, and finally [`FALLBACK_DISPLAY_NAME`].
    #[must_use]
    pub fn display_name(&self) -> String {
        let named = [&self.pushname, &self.name, &self.short_name]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty());
        if let Some(name) = named {
            return name.clone();
        }
        if let Some(number) = self.number.as_deref().filter(|n| !n.is_empty()) {
            return format!("+{number}");
        }
        let user = self.id.split('@').next().unwrap_or_default();
        if user.is_empty() {
            FALLBACK_DISPLAY_NAME.to_string()
        } else {
            user.to_string()
        }
    }
}

/// One member of a chat roster.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantRecord {
    pub id: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub is_super_admin: bool,
    /// Contact details, when the transport resolved them up front.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<Contact>,
}

impl ParticipantRecord {
    #[must_use]
    pub const fn has_admin_rights(&self) -> bool {
        self.is_admin || self.is_super_admin
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatInfo {
    pub id: String,
    #[serde(default)]
    pub is_group: bool,
    /// Current roster, in the order the transport lists it.
    #[serde(default)]
    pub participants: Vec<ParticipantRecord>,
}

/// A chat message delivered by the transport (one JSON object per line).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomingMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub chat: ChatInfo,
    pub sender: Contact,
    #[serde(default)]
    pub body: String,
}

/// Plain-text reply handed back to the transport.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingReply {
    pub chat_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    pub text: String,
}

impl OutgoingReply {
    pub fn to_message(message: &IncomingMessage, text: impl Into<String>) -> Self {
        Self {
            chat_id: message.chat.id.clone(),
            in_reply_to: message.id.clone(),
            text: text.into(),
        }
    }
}

/// JSON schema of both directions of the stdio protocol.
pub fn wire_schema() -> Result<serde_json::Value> {
    Ok(serde_json::json!({
        "incoming": serde_json::to_value(schemars::schema_for!(IncomingMessage))?,
        "outgoing": serde_json::to_value(schemars::schema_for!(OutgoingReply))?,
    }))
}

pub fn serialize_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(Into::into)
}
