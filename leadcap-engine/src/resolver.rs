//! Lead identity resolution
//!
//! A single visitor may start in the web form (session id assigned) and
//! later continue in chat (conversation id assigned), or vice versa.
//! Resolving by whichever identifier is present prevents duplicate lead
//! rows for what is semantically one prospect. Two genuinely different
//! people who share no keys are never merged: false negatives are safe,
//! false positives are not.

use crate::lead::LeadRecord;
use crate::repository::LeadRepository;
use leadcap_common::Result;

/// Locates the durable lead record a submission belongs to
pub struct IdentityResolver<'a> {
    repo: &'a LeadRepository,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(repo: &'a LeadRepository) -> Self {
        Self { repo }
    }

    /// Conversation-id lookup first when present (chat-originated
    /// submissions are keyed primarily by conversation, since a visitor may
    /// not keep a stable session across the chat widget lifecycle), then
    /// session-id fallback. `None` means the merge engine should create.
    pub async fn resolve(
        &self,
        session_id: &str,
        conversation_id: Option<&str>,
    ) -> Result<Option<LeadRecord>> {
        if let Some(conversation_id) = conversation_id {
            if let Some(lead) = self.repo.find_by_conversation(conversation_id).await? {
                return Ok(Some(lead));
            }
        }

        self.repo.find_by_session(session_id).await
    }
}
