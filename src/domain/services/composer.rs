#[cfg(test)]
#[path = "composer_test.rs"]
mod tests;

use crate::domain::models::BookApiBox;
use crate::domain::models::BookDraft;
use crate::domain::models::CreateError;
use crate::domain::models::SessionHandle;

/// Publishes new recommendations as the signed in user.
pub struct Composer {
    api: BookApiBox,
    session: SessionHandle,
}

impl Composer {
    pub fn new(api: BookApiBox, session: SessionHandle) -> Composer {
        return Composer { api, session };
    }

    /// Validates the draft, then posts it. Returns the backend's message.
    pub async fn publish(&self, draft: &BookDraft) -> Result<String, CreateError> {
        let book = draft.validate()?;
        let token = self.session.token().ok_or_else(CreateError::unauthenticated)?;

        tracing::debug!(title = %book.title, rating = %book.rating, "Publishing recommendation");
        let message = self.api.create_book(&token, &book).await.map_err(|err| {
            tracing::error!(error = %err, "Failed to publish recommendation");
            return CreateError::from(err);
        })?;

        return Ok(message);
    }
}
