use crate::roster::ChatRoster;
use racha_protocol::ParticipantRecord;

/// Whether `sender_id` administers the chat, according to its own roster
/// record. Any lookup failure counts as "not an admin".
pub async fn is_admin(roster: &dyn ChatRoster, chat_id: &str, sender_id: &str) -> bool {
    match roster.participants(chat_id).await {
        Ok(participants) => participants
            .iter()
            .find(|p| p.id == sender_id)
            .is_some_and(ParticipantRecord::has_admin_rights),
        Err(err) => {
            log::debug!("Admin lookup for {sender_id} in {chat_id} failed: {err}");
            false
        }
    }
}
