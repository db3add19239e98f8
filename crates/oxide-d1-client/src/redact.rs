//! Masking secrets in diagnostic output.
//!
//! A [`Redactor`] is owned by whoever emits the diagnostics (each
//! `Connection` holds one built from its config). There is no shared list:
//! two connections with different tokens each mask only their own.

use std::borrow::Cow;

/// Replacement text for a masked secret.
pub const MASK: &str = "*****";

/// Replaces known secrets in text with [`MASK`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Redactor {
    secrets: Vec<String>,
}

impl Redactor {
    /// Creates a redactor with no secrets.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            secrets: Vec::new(),
        }
    }

    /// Adds a secret. Empty strings are ignored.
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() && !self.secrets.contains(&secret) {
            self.secrets.push(secret);
        }
        self
    }

    /// Returns true if no secrets are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    /// Masks every registered secret in `text`.
    #[must_use]
    pub fn redact<'a>(&self, text: &'a str) -> Cow<'a, str> {
        let mut out = Cow::Borrowed(text);
        for secret in &self.secrets {
            if out.contains(secret.as_str()) {
                out = Cow::Owned(out.replace(secret.as_str(), MASK));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_masks_every_occurrence() {
        let redactor = Redactor::new().with_secret("tok123");
        assert_eq!(
            redactor.redact("Bearer tok123, again tok123"),
            "Bearer *****, again *****"
        );
    }

    #[test]
    fn test_untouched_text_is_borrowed() {
        let redactor = Redactor::new().with_secret("tok123");
        assert!(matches!(redactor.redact("nothing here"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_empty_secret_is_ignored() {
        let redactor = Redactor::new().with_secret("");
        assert!(redactor.is_empty());
        assert_eq!(redactor.redact("abc"), "abc");
    }

    #[test]
    fn test_redactors_are_independent() {
        let a = Redactor::new().with_secret("alpha");
        let b = Redactor::new().with_secret("beta");
        assert_eq!(a.redact("alpha beta"), "***** beta");
        assert_eq!(b.redact("alpha beta"), "alpha *****");
    }
}
