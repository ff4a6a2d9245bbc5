use crate::validation::ValidationError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype {
    ($name:ident, $doc:expr, $pattern:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parses a validated identifier from a string.
            pub fn parse(value: impl Into<String>) -> Result<Self, ValidationError> {
                let s = value.into();
                if !Regex::new($pattern).expect("invalid regex").is_match(&s) {
                    return Err(ValidationError::PatternMismatch {
                        field: stringify!($name),
                        value: s,
                    });
                }
                Ok(Self(s))
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(value)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype!(
    UserId,
    "Account identifier supplied by the session layer. The character set is \
     restricted so the id is safe as a file name (pattern: `[A-Za-z0-9_.@-]{1,128}`, \
     not starting with a dot).",
    r"^[A-Za-z0-9_@-][A-Za-z0-9_.@-]{0,127}$"
);
newtype!(
    KeyId,
    "RFC 7638 JWK thumbprint (SHA-256, base64url without padding).",
    r"^[A-Za-z0-9_-]{43}$"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_accepts_common_forms() {
        for id in ["42", "alice", "user-7f3a", "a.b@example.com", "ORD_1"] {
            assert!(UserId::parse(id).is_ok(), "{id} should parse");
        }
    }

    #[test]
    fn user_id_rejects_path_like_values() {
        let long = "x".repeat(129);
        let cases: [&str; 6] = ["", "../etc", ".hidden", "a/b", "a b", long.as_str()];
        for id in cases {
            assert!(UserId::parse(id).is_err(), "{id:?} should be rejected");
        }
    }

    #[test]
    fn user_id_deserialization_validates() {
        let ok: Result<UserId, _> = serde_json::from_str(r#""alice""#);
        assert!(ok.is_ok());
        let bad: Result<UserId, _> = serde_json::from_str(r#""a/b""#);
        assert!(bad.is_err());
    }
}
