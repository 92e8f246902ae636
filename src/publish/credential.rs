//! Publish credential.

use std::fmt;

/// Username the package index expects for token authentication
pub const TOKEN_USERNAME: &str = "__token__";

/// API token for the package index
///
/// Never printed: `Debug` and `Display` redact the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    token: String,
}

impl Credential {
    /// Wrap a token; blank tokens count as absent
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into().trim().to_string();
        (!token.is_empty()).then_some(Self { token })
    }

    /// Fixed username for token authentication
    pub fn username(&self) -> &'static str {
        TOKEN_USERNAME
    }

    /// The secret itself, for the HTTP client only
    pub(crate) fn secret(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_token_is_absent() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   ").is_none());
    }

    #[test]
    fn test_token_is_redacted() {
        let credential = Credential::new("pypi-AgEIcHlwaS5vcmc").unwrap();
        assert_eq!(format!("{credential:?}"), "Credential(***)");
        assert_eq!(credential.to_string(), "***");
        assert_eq!(credential.username(), "__token__");
        assert_eq!(credential.secret(), "pypi-AgEIcHlwaS5vcmc");
    }
}
