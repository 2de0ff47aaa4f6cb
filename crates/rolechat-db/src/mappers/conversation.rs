//! Conversation entity <-> model mapper

use rolechat_core::entities::{Conversation, ParticipantPair};
use rolechat_core::error::DomainError;
use rolechat_core::value_objects::Snowflake;

use crate::models::ConversationModel;

impl TryFrom<ConversationModel> for Conversation {
    type Error = DomainError;

    fn try_from(model: ConversationModel) -> Result<Self, Self::Error> {
        let participants = ParticipantPair::new(
            Snowflake::new(model.participant_1),
            Snowflake::new(model.participant_2),
        )
        .map_err(|_| {
            DomainError::DatabaseError(format!("conversation {} has one participant", model.id))
        })?;

        Ok(Conversation {
            id: Snowflake::new(model.id),
            participants,
            last_message_at: model.last_message_at,
            created_at: model.created_at,
        })
    }
}
