//! Credential verification interface.
//!
//! The lock session never inspects the secret itself. It hands a
//! [`SecretProvider`] to a [`CredentialVerifier`], and the verifier asks the
//! provider for answers to its prompts (zero or more per round), in the same
//! way a PAM conversation function is driven.
//!
//! - [`BufferSecretProvider`]: answers text prompts from the password buffer
//! - [`MockVerifier`]: scripted verifier for tests

mod mock;

pub use mock::MockVerifier;

use secrecy::SecretSlice;

use crate::buffer::PasswordBuffer;

/// Error type for verifier session setup.
#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    /// The authentication service refused to start a session.
    #[error("failed to start authentication session: {0}")]
    Start(String),

    /// No identity to authenticate as.
    #[error("no identity to authenticate")]
    NoIdentity,
}

/// Outcome of one authentication round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthResult {
    /// The secret was accepted; the session may unlock.
    Accepted,
    /// The secret was wrong.
    Rejected(String),
    /// The round could not be completed (conversation failure, service error).
    Error(String),
}

impl AuthResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, AuthResult::Accepted)
    }
}

impl std::fmt::Display for AuthResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthResult::Accepted => write!(f, "accepted"),
            AuthResult::Rejected(reason) => write!(f, "rejected: {}", reason),
            AuthResult::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

/// Kind of message a verifier sends during a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PromptStyle {
    /// Secret input, not echoed.
    HiddenText,
    /// Text input that would normally be echoed.
    VisibleText,
    /// An error message for the user; no answer expected.
    ErrorMessage,
    /// An informational message; no answer expected.
    Info,
}

impl PromptStyle {
    /// Whether the verifier expects text back for this style.
    pub fn expects_answer(&self) -> bool {
        matches!(self, PromptStyle::HiddenText | PromptStyle::VisibleText)
    }
}

/// A single message from the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prompt<'a> {
    pub style: PromptStyle,
    pub message: &'a str,
}

/// Answers verifier prompts during one authentication round.
pub trait SecretProvider {
    /// Answer `prompt`, or `None` when there is nothing to answer with.
    fn respond(&self, prompt: &Prompt<'_>) -> Option<SecretSlice<u8>>;
}

/// Answers every text prompt of a round with the current buffer contents.
///
/// Stateless apart from the borrowed buffer; info and error messages get no
/// answer.
pub struct BufferSecretProvider<'a> {
    buffer: &'a PasswordBuffer,
}

impl<'a> BufferSecretProvider<'a> {
    pub fn new(buffer: &'a PasswordBuffer) -> Self {
        Self { buffer }
    }
}

impl SecretProvider for BufferSecretProvider<'_> {
    fn respond(&self, prompt: &Prompt<'_>) -> Option<SecretSlice<u8>> {
        prompt.style.expects_answer().then(|| self.buffer.snapshot())
    }
}

/// Verifies a candidate secret synchronously.
///
/// Implementations must treat anything other than an explicit success as
/// `Rejected` or `Error`; a session only unlocks on `Accepted`.
pub trait CredentialVerifier {
    /// Run one authentication round, pulling the secret from `secrets`.
    fn authenticate(&mut self, secrets: &dyn SecretProvider) -> AuthResult;

    /// Close the session with the authentication service.
    ///
    /// Called once when the lock session ends. Implementations should also
    /// clean up on drop in case it never runs.
    fn end_session(&mut self) {}
}

/// Starts verifier sessions for an identity.
pub trait VerifierService {
    type Session: CredentialVerifier;

    fn start_session(&self, identity: &str) -> Result<Self::Session, VerifierError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn buffer_provider_answers_text_prompts_only() {
        let mut buffer = PasswordBuffer::new();
        buffer.try_append(b"hi");
        let provider = BufferSecretProvider::new(&buffer);

        let hidden = Prompt {
            style: PromptStyle::HiddenText,
            message: "Password: ",
        };
        let visible = Prompt {
            style: PromptStyle::VisibleText,
            message: "Token: ",
        };
        let info = Prompt {
            style: PromptStyle::Info,
            message: "Touch your key",
        };
        let error = Prompt {
            style: PromptStyle::ErrorMessage,
            message: "Try again",
        };

        assert_eq!(provider.respond(&hidden).unwrap().expose_secret(), b"hi");
        assert_eq!(provider.respond(&visible).unwrap().expose_secret(), b"hi");
        assert!(provider.respond(&info).is_none());
        assert!(provider.respond(&error).is_none());
    }

    #[test]
    fn auth_result_display() {
        assert_eq!(AuthResult::Accepted.to_string(), "accepted");
        assert_eq!(
            AuthResult::Rejected("Authentication failure".into()).to_string(),
            "rejected: Authentication failure"
        );
        assert_eq!(
            AuthResult::Error("conversation failed".into()).to_string(),
            "error: conversation failed"
        );
    }

    #[test]
    fn only_accepted_is_accepted() {
        assert!(AuthResult::Accepted.is_accepted());
        assert!(!AuthResult::Rejected(String::new()).is_accepted());
        assert!(!AuthResult::Error(String::new()).is_accepted());
    }
}
