//! Shared-secret verification.

use subtle::ConstantTimeEq;

/// Header carrying the presented credential.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The process-wide shared secret. Never printed.
#[derive(Clone)]
pub struct SecretToken(String);

impl SecretToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretToken([REDACTED])")
    }
}

/// Result of checking a presented credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Valid,
    Invalid,
}

/// Validates presented tokens against the configured secret.
#[derive(Debug, Clone)]
pub struct Authorizer {
    secret: SecretToken,
}

impl Authorizer {
    pub fn new(secret: SecretToken) -> Self {
        Self { secret }
    }

    /// Absent, empty and mismatched tokens are all `Invalid`.
    pub fn verify(&self, presented: Option<&str>) -> Verdict {
        match presented {
            Some(token) if !token.is_empty() && constant_time_compare(token, self.secret.expose()) => {
                Verdict::Valid
            }
            _ => Verdict::Invalid,
        }
    }
}

/// Compare two strings without leaking the position of the first mismatch.
///
/// Both inputs are padded to the longer length with different fill bytes so
/// the running time depends only on that length.
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    let max_len = a.len().max(b.len());

    let mut a_padded = vec![0u8; max_len];
    let mut b_padded = vec![0xFFu8; max_len];
    a_padded[..a.len()].copy_from_slice(a.as_bytes());
    b_padded[..b.len()].copy_from_slice(b.as_bytes());

    let lengths_equal = a.len().ct_eq(&b.len());
    let contents_equal = a_padded.ct_eq(&b_padded);

    (lengths_equal & contents_equal).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer() -> Authorizer {
        Authorizer::new(SecretToken::new("correct-horse"))
    }

    #[test]
    fn test_exact_match_valid() {
        assert_eq!(authorizer().verify(Some("correct-horse")), Verdict::Valid);
    }

    #[test]
    fn test_invalid_inputs_indistinguishable() {
        let auth = authorizer();
        for presented in [None, Some(""), Some("correct-hors"), Some("correct-horse "), Some("CORRECT-HORSE")] {
            assert_eq!(auth.verify(presented), Verdict::Invalid, "{presented:?}");
        }
    }

    #[test]
    fn test_empty_secret_never_matches() {
        let auth = Authorizer::new(SecretToken::new(""));
        assert_eq!(auth.verify(Some("")), Verdict::Invalid);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
        assert!(!constant_time_compare("", "a"));
        assert!(constant_time_compare("", ""));
    }

    #[test]
    fn test_secret_not_in_debug() {
        let auth = authorizer();
        assert!(!format!("{auth:?}").contains("correct-horse"));
    }
}
