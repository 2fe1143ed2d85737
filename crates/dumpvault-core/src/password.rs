//! Database password held in memory.
//!
//! A [`DatabasePassword`] comes from one of three places: the clear-text
//! `password` key of the configuration file, the `DUMPVAULT_DB_PASSWORD`
//! environment variable, or a `password_sealed` value opened with the
//! [`HostKey`](crate::context::HostKey). Wherever it ends up afterwards
//! (config dumps, `tracing` fields, JSON output) it prints as `[REDACTED]`.
//! The buffer is zeroed when the password is dropped.
//!
//! # Examples
//!
//! ```
//! use dumpvault_core::DatabasePassword;
//!
//! let password = DatabasePassword::new("s3cret!");
//! assert_eq!(format!("{:?}", password), "DatabasePassword([REDACTED])");
//! assert_eq!(password.expose(), "s3cret!");
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

const REDACTED: &str = "[REDACTED]";

/// Clear-text database password, redacted in every rendering.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct DatabasePassword(String);

impl DatabasePassword {
    pub fn new(password: impl Into<String>) -> Self {
        Self(password.into())
    }

    /// The clear text, for handing to the driver. Never log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// An empty password means "authenticate without one".
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for DatabasePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DatabasePassword({})", REDACTED)
    }
}

impl fmt::Display for DatabasePassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for DatabasePassword {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for DatabasePassword {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(DatabasePassword)
    }
}
