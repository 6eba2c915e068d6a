//! Mock credential verifier for testing.
//!
//! This module provides a configurable implementation of
//! [`CredentialVerifier`] that can be used in tests without PAM.

use std::collections::VecDeque;

use secrecy::ExposeSecret;
use zeroize::Zeroizing;

use super::{AuthResult, CredentialVerifier, Prompt, PromptStyle, SecretProvider};

/// A mock verifier for testing.
///
/// It drives the [`SecretProvider`] with a configurable list of prompts,
/// like a PAM module would, records every secret it was given and decides
/// the outcome either by comparing against an expected secret or from a
/// script.
///
/// # Example
///
/// ```
/// use shroud_core::buffer::PasswordBuffer;
/// use shroud_core::verifier::{BufferSecretProvider, CredentialVerifier, MockVerifier};
///
/// let mut verifier = MockVerifier::accepting("hi");
///
/// let mut buffer = PasswordBuffer::new();
/// buffer.try_append(b"hi");
///
/// let result = verifier.authenticate(&BufferSecretProvider::new(&buffer));
/// assert!(result.is_accepted());
/// assert_eq!(verifier.call_count(), 1);
/// ```
pub struct MockVerifier {
    /// Secret that is accepted, if any.
    expected: Option<Zeroizing<Vec<u8>>>,
    /// Results returned in order, overriding `expected` while non-empty.
    script: VecDeque<AuthResult>,
    /// Result returned for every round once the script is empty.
    persistent: Option<AuthResult>,
    /// Messages sent to the provider each round.
    prompts: Vec<(PromptStyle, String)>,
    /// Secrets received, one entry per answered text prompt.
    received: Vec<Zeroizing<Vec<u8>>>,
    /// Number of authenticate calls.
    calls: usize,
    /// Whether end_session was called.
    ended: bool,
}

impl MockVerifier {
    fn new(expected: Option<Vec<u8>>, script: Vec<AuthResult>) -> Self {
        Self {
            expected: expected.map(Zeroizing::new),
            script: script.into(),
            persistent: None,
            prompts: vec![(PromptStyle::HiddenText, "Password: ".to_string())],
            received: Vec::new(),
            calls: 0,
            ended: false,
        }
    }

    /// Create a mock that accepts exactly `secret` and rejects anything else.
    pub fn accepting(secret: impl AsRef<[u8]>) -> Self {
        Self::new(Some(secret.as_ref().to_vec()), Vec::new())
    }

    /// Create a mock that rejects every secret.
    pub fn rejecting() -> Self {
        Self::new(None, Vec::new())
    }

    /// Create a mock that returns `results` in order, then rejects.
    pub fn with_results(results: Vec<AuthResult>) -> Self {
        Self::new(None, results)
    }

    /// Create a mock whose every round ends in a service error.
    pub fn failing(reason: impl Into<String>) -> Self {
        let mut mock = Self::rejecting();
        mock.persistent = Some(AuthResult::Error(reason.into()));
        mock
    }

    /// Replace the messages sent to the provider each round.
    pub fn with_prompts(mut self, prompts: Vec<(PromptStyle, String)>) -> Self {
        self.prompts = prompts;
        self
    }

    /// Number of times authenticate was called.
    pub fn call_count(&self) -> usize {
        self.calls
    }

    /// Secrets received so far, oldest first.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.iter().map(|secret| secret.to_vec()).collect()
    }

    /// Whether end_session was called.
    pub fn ended(&self) -> bool {
        self.ended
    }

    fn decide(&mut self, answer: Option<&[u8]>) -> AuthResult {
        if let Some(result) = self.script.pop_front() {
            return result;
        }
        if let Some(result) = &self.persistent {
            return result.clone();
        }
        match (&self.expected, answer) {
            (Some(expected), Some(answer)) if expected.as_slice() == answer => AuthResult::Accepted,
            _ => AuthResult::Rejected("Authentication failure".to_string()),
        }
    }
}

impl Default for MockVerifier {
    fn default() -> Self {
        Self::accepting("mock-password")
    }
}

impl CredentialVerifier for MockVerifier {
    fn authenticate(&mut self, secrets: &dyn SecretProvider) -> AuthResult {
        self.calls += 1;

        let mut last_answer = None;
        for (style, message) in &self.prompts {
            let prompt = Prompt {
                style: *style,
                message,
            };
            let answer = secrets.respond(&prompt);
            if !style.expects_answer() {
                continue;
            }
            match answer {
                Some(secret) => {
                    let bytes = Zeroizing::new(secret.expose_secret().to_vec());
                    self.received.push(bytes.clone());
                    last_answer = Some(bytes);
                }
                None => return AuthResult::Error("conversation failed".to_string()),
            }
        }

        self.decide(last_answer.as_deref().map(Vec::as_slice))
    }

    fn end_session(&mut self) {
        self.ended = true;
    }
}
