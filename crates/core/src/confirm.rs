use std::collections::HashMap;

use thiserror::Error;

use crate::connections::ConnectionId;

/// A remote call that cannot be undone and therefore needs the user's
/// explicit consent before it is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestructiveAction {
    DeleteConnection(ConnectionId),
    DeleteFavorite(i64),
    DeleteHistoryEntry(i64),
    ClearConversations(ConnectionId),
}

impl DestructiveAction {
    #[must_use]
    pub fn prompt(&self) -> &'static str {
        match self {
            Self::DeleteConnection(_) => "Are you sure you want to delete this connection?",
            Self::DeleteFavorite(_) => "Delete this favorite query?",
            Self::DeleteHistoryEntry(_) => "Delete this query from history?",
            Self::ClearConversations(_) => "Clear all AI conversations for this connection?",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfirmationToken(String);

impl ConfirmationToken {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Proof that the user accepted one specific destructive action. Only the
/// guard can mint it, and every destructive gateway call asks for one.
#[derive(Debug, PartialEq, Eq)]
pub struct Confirmed {
    action: DestructiveAction,
}

impl Confirmed {
    #[must_use]
    pub fn action(&self) -> DestructiveAction {
        self.action
    }

    #[cfg(test)]
    pub(crate) fn for_tests(action: DestructiveAction) -> Self {
        Self { action }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfirmError {
    #[error("confirmation token is invalid or expired")]
    InvalidToken,
    #[error("confirmation token was issued for a different action")]
    ActionMismatch,
}

#[derive(Debug, Default)]
pub struct ConfirmationGuard {
    nonce: u64,
    pending: HashMap<String, DestructiveAction>,
}

impl ConfirmationGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&mut self, action: DestructiveAction) -> ConfirmationToken {
        self.nonce = self.nonce.saturating_add(1);
        let token = format!("confirm-{}", self.nonce);
        self.pending.insert(token.clone(), action);
        ConfirmationToken(token)
    }

    /// Consumes the token. A token is single use even when the action does
    /// not match.
    pub fn confirm(
        &mut self,
        token: &ConfirmationToken,
        action: DestructiveAction,
    ) -> Result<Confirmed, ConfirmError> {
        let Some(pending) = self.pending.remove(token.as_str()) else {
            return Err(ConfirmError::InvalidToken);
        };
        if pending != action {
            return Err(ConfirmError::ActionMismatch);
        }
        Ok(Confirmed { action })
    }

    pub fn decline(&mut self, token: &ConfirmationToken) {
        self.pending.remove(token.as_str());
    }

    #[must_use]
    pub fn pending_action(&self, token: &ConfirmationToken) -> Option<DestructiveAction> {
        self.pending.get(token.as_str()).copied()
    }
}
