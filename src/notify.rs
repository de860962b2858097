use std::fmt;

use crate::models::signing_token::SigningToken;

#[derive(Debug)]
pub struct NotifyError(pub String);

impl fmt::Display for NotifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Notification failed: {}", self.0)
    }
}

impl std::error::Error for NotifyError {}

/// Delivers a signing link to the person bound to a token.
pub trait SignerNotifier: Send + Sync {
    fn notify_signer(&self, token: &SigningToken, signing_url: &str) -> Result<(), NotifyError>;
}

/// Writes the dispatch to the log instead of sending anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl SignerNotifier for LogNotifier {
    fn notify_signer(&self, token: &SigningToken, signing_url: &str) -> Result<(), NotifyError> {
        let recipient = token
            .signer_email
            .as_deref()
            .or(token.signer_phone.as_deref())
            .unwrap_or("(no contact on file)");
        log::info!(
            "Signing link for document {} role {} sent to {}: {}",
            token.document_id,
            token.role,
            recipient,
            signing_url
        );
        Ok(())
    }
}
