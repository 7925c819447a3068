//! Strongly-typed identifiers.
//!
//! All IDs are validated at construction time and implement common traits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator used by the snapshot format for composite `(process, resource)`
/// keys. Identifiers may not contain it.
pub const KEY_DELIMITER: char = '|';

/// Macro to define a strongly-typed ID newtype wrapper.
///
/// Generates: struct, `from_string()`, `must()`, `as_str()`, Display,
/// Serialize, Deserialize.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn from_string(s: String) -> Result<Self, &'static str> {
                if s.is_empty() {
                    return Err(concat!(stringify!($name), " cannot be empty"));
                }
                if s.contains(KEY_DELIMITER) {
                    return Err(concat!(stringify!($name), " cannot contain '|'"));
                }
                Ok(Self(s))
            }

            /// Construct from a literal known to be valid.
            ///
            /// Panics on an invalid label; intended for tests and constants.
            #[allow(clippy::panic)]
            pub fn must(s: &str) -> Self {
                match Self::from_string(s.to_string()) {
                    Ok(id) => id,
                    Err(e) => panic!("{}: {:?}", e, s),
                }
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(ProcessId);
define_id!(ResourceId);
