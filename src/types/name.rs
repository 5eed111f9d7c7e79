use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// PostgreSQL truncates identifiers longer than NAMEDATALEN - 1 bytes.
const MAX_IDENTIFIER_LEN: usize = 63;

const RESERVED_SCHEMAS: &[&str] = &["public", "information_schema"];

fn is_valid_identifier_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

fn validate_identifier(name: &str, entity: &'static str) -> Result<()> {
    let invalid = |reason: &str| Error::InvalidIdentifier {
        entity,
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("cannot be empty"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid(&format!(
            "cannot exceed {MAX_IDENTIFIER_LEN} characters"
        )));
    }
    if !name.chars().all(is_valid_identifier_char) {
        return Err(invalid(
            "can only contain lowercase letters, digits, and underscores",
        ));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(invalid("cannot start with a digit"));
    }
    Ok(())
}

/// Name of a bundle, which is also the name of the schema it installs.
///
/// Bundle names are interpolated into DDL, so only plain lowercase identifiers
/// are accepted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BundleName(String);

impl BundleName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name, "bundle")?;

        if name.starts_with("pg_") {
            return Err(Error::InvalidIdentifier {
                entity: "bundle",
                name,
                reason: "the pg_ prefix is reserved for system schemas".to_string(),
            });
        }
        if RESERVED_SCHEMAS.contains(&name.as_str()) {
            return Err(Error::InvalidIdentifier {
                entity: "bundle",
                name,
                reason: "collides with a built-in schema".to_string(),
            });
        }

        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Double-quoted form for use in statement text.
    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

/// Database role that receives default privileges on bundle schemas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoleName(String);

impl RoleName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_identifier(&name, "role")?;
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn quoted(&self) -> String {
        format!("\"{}\"", self.0)
    }
}

macro_rules! impl_name_traits {
    ($ty:ty) => {
        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $ty {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self> {
                Self::new(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = Error;

            fn try_from(s: String) -> Result<Self> {
                Self::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(name: $ty) -> String {
                name.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

impl_name_traits!(BundleName);
impl_name_traits!(RoleName);
