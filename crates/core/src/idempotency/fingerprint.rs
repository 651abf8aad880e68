//! Fingerprint computation and verification.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::{Result, ValidationError};

/// Which dedup set a fingerprint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FingerprintKind {
    /// Keyed by identity.
    Registration,
    /// Keyed by identity and the new symbol.
    Update,
}

impl fmt::Display for FingerprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => write!(f, "Registration"),
            Self::Update => write!(f, "Update"),
        }
    }
}

/// A mutation fingerprint: lower-case hex SHA-256 of its key fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    kind: FingerprintKind,
    digest: String,
}

impl Fingerprint {
    /// Fingerprint of a registration, `sha256(identity)`.
    pub fn registration(identity: &str) -> Self {
        Self {
            kind: FingerprintKind::Registration,
            digest: compute_digest(&[identity]),
        }
    }

    /// Fingerprint of a symbol update, `sha256(identity ++ symbol)`.
    ///
    /// The fields are concatenated in that order with no separator.
    pub fn update(identity: &str, symbol: &str) -> Self {
        Self {
            kind: FingerprintKind::Update,
            digest: compute_digest(&[identity, symbol]),
        }
    }

    /// Rehydrate a fingerprint loaded from durable storage.
    pub fn from_stored(kind: FingerprintKind, digest: impl Into<String>) -> Self {
        Self {
            kind,
            digest: digest.into(),
        }
    }

    pub fn kind(&self) -> FingerprintKind {
        self.kind
    }

    pub fn digest(&self) -> &str {
        &self.digest
    }

    /// Check a caller-supplied fingerprint against this recomputed one.
    pub fn verify(&self, supplied: &str) -> Result<()> {
        if supplied == self.digest {
            Ok(())
        } else {
            Err(ValidationError::FingerprintMismatch(self.kind).into())
        }
    }
}

fn compute_digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// Fingerprint changes that ride along with one durable mutation.
///
/// The storage layer persists them in the same transaction as the business
/// change; the guard mirrors them into its cache once that transaction commits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintEffects {
    pub commit: Option<Fingerprint>,
    pub revoke: Vec<Fingerprint>,
}

impl FingerprintEffects {
    pub fn commit(fingerprint: Fingerprint) -> Self {
        Self {
            commit: Some(fingerprint),
            revoke: Vec::new(),
        }
    }

    pub fn revoking(mut self, fingerprint: Fingerprint) -> Self {
        self.revoke.push(fingerprint);
        self
    }
}
