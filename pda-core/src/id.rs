//! Typed token wrappers for interaction requests and file handles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Typed tokens prevent mixing up a request id with a file handle.
/// These are just strings underneath — no required format, no ordering.
/// The protocol only asks that each one be fresh and unique.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing token, e.g. one deserialized off the wire.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Mint a fresh, unique token.
            pub fn fresh() -> Self {
                Self(uuid::Uuid::new_v4().to_string())
            }

            /// Borrow the inner string.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }
    };
}

typed_id!(RequestId, "Unique identifier for an interaction request.");
typed_id!(FileHandle, "Opaque token referring to a blob in the File Handle Store.");
typed_id!(VendorId, "Unique identifier for a vendor within a pool.");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_tokens_are_distinct() {
        let a = RequestId::fresh();
        let b = RequestId::fresh();
        assert_ne!(a, b);
    }

    #[test]
    fn display_round_trips_through_as_str() {
        let h = FileHandle::from("blob-123");
        assert_eq!(h.to_string(), "blob-123");
        assert_eq!(h.as_str(), "blob-123");
    }
}
