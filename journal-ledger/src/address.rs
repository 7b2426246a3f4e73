//! Address space
//!
//! Every ledger-resident record lives at a 70 character hex address:
//!
//! ```text
//! <namespace:6> <type code:2> <hash:62>
//! ```
//!
//! The namespace is the first six hex characters of SHA-512 over the family
//! name. The type code makes the entity kind derivable from the address alone.

use crate::error::{protocol, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use std::fmt;
use std::sync::OnceLock;
use uuid::Uuid;

/// Transaction family name
pub const FAMILY_NAME: &str = "alexandria";

/// Transaction family version
pub const FAMILY_VERSION: &str = "1.0";

/// Total address length in hex characters
pub const ADDRESS_LENGTH: usize = 70;

const NAMESPACE_LENGTH: usize = 6;
const TYPE_CODE_LENGTH: usize = 2;
const HASH_LENGTH: usize = ADDRESS_LENGTH - NAMESPACE_LENGTH - TYPE_CODE_LENGTH;

/// Hex SHA-512 digest of arbitrary content.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha512::digest(bytes))
}

/// Namespace prefix shared by all addresses of the family.
pub fn namespace() -> &'static str {
    static NAMESPACE: OnceLock<String> = OnceLock::new();
    NAMESPACE.get_or_init(|| content_hash(FAMILY_NAME.as_bytes())[..NAMESPACE_LENGTH].to_string())
}

/// Entity kind encoded in an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    /// Settings singleton
    Settings,
    /// Person
    Person,
    /// Journal
    Journal,
    /// Volume of a journal
    Volume,
    /// Manuscript version
    Manuscript,
    /// Version lineage of a manuscript
    ManuscriptThread,
    /// Review of a manuscript
    Review,
}

impl EntityKind {
    /// Two character type code
    pub fn code(&self) -> &'static str {
        match self {
            EntityKind::Settings => "00",
            EntityKind::Manuscript => "10",
            EntityKind::ManuscriptThread => "18",
            EntityKind::Journal => "20",
            EntityKind::Volume => "28",
            EntityKind::Person => "30",
            EntityKind::Review => "40",
        }
    }

    /// Parse a type code
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "00" => Some(EntityKind::Settings),
            "10" => Some(EntityKind::Manuscript),
            "18" => Some(EntityKind::ManuscriptThread),
            "20" => Some(EntityKind::Journal),
            "28" => Some(EntityKind::Volume),
            "30" => Some(EntityKind::Person),
            "40" => Some(EntityKind::Review),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Settings => "settings",
            EntityKind::Person => "person",
            EntityKind::Journal => "journal",
            EntityKind::Volume => "volume",
            EntityKind::Manuscript => "manuscript",
            EntityKind::ManuscriptThread => "manuscript thread",
            EntityKind::Review => "review",
        };
        f.write_str(name)
    }
}

/// Typed ledger address
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parse and validate an address string
    pub fn parse(s: &str) -> Result<Self> {
        if s.len() != ADDRESS_LENGTH {
            return protocol(format!("address {s:?} has length {}, expected {ADDRESS_LENGTH}", s.len()));
        }
        if !s.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)) {
            return protocol(format!("address {s:?} is not lowercase hex"));
        }
        if &s[..NAMESPACE_LENGTH] != namespace() {
            return protocol(format!("address {s:?} is outside the {FAMILY_NAME} namespace"));
        }
        let code = &s[NAMESPACE_LENGTH..NAMESPACE_LENGTH + TYPE_CODE_LENGTH];
        match EntityKind::from_code(code) {
            Some(EntityKind::Settings) if s != Self::settings().as_str() => {
                protocol(format!("address {s:?} uses the settings code"))
            }
            Some(_) => Ok(Self(s.to_string())),
            None => protocol(format!("address {s:?} has unknown type code {code}")),
        }
    }

    /// The settings singleton address
    pub fn settings() -> Self {
        Self(format!("{}{}", namespace(), "0".repeat(ADDRESS_LENGTH - NAMESPACE_LENGTH)))
    }

    /// Address of an entity whose hash part is derived from `seed`
    pub fn derive(kind: EntityKind, seed: &[u8]) -> Self {
        if kind == EntityKind::Settings {
            return Self::settings();
        }
        let hash = content_hash(seed);
        Self(format!("{}{}{}", namespace(), kind.code(), &hash[..HASH_LENGTH]))
    }

    /// Fresh random address for a new entity
    pub fn create(kind: EntityKind) -> Self {
        Self::derive(kind, Uuid::new_v4().as_bytes())
    }

    /// Entity kind encoded in the type code
    pub fn kind(&self) -> EntityKind {
        let code = &self.0[NAMESPACE_LENGTH..NAMESPACE_LENGTH + TYPE_CODE_LENGTH];
        // parse() and the constructors only admit known codes
        EntityKind::from_code(code).unwrap_or(EntityKind::Settings)
    }

    /// Whether the address has the given kind
    pub fn is(&self, kind: EntityKind) -> bool {
        self.kind() == kind
    }

    /// Protocol error unless the address has the given kind
    pub fn expect_kind(&self, kind: EntityKind, role: &str) -> Result<()> {
        if self.is(kind) {
            Ok(())
        } else {
            protocol(format!("{role} {self} is a {}, expected a {kind}", self.kind()))
        }
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = crate::Error;

    fn try_from(s: String) -> Result<Self> {
        Address::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
