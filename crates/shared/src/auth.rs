//! Authentication types for JWT claims.
//!
//! Token issuance belongs to the identity collaborator; the ledger only needs
//! to know who is calling and in which capacity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of principal a token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalKind {
    /// A human user holding multi-currency balances.
    User,
    /// A game agent holding a single point balance.
    Agent,
    /// A game service that credits and debits agents.
    Service,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user, agent, or service ID).
    pub sub: Uuid,
    /// Principal kind of the subject.
    pub kind: PrincipalKind,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a principal.
    #[must_use]
    pub fn new(subject: Uuid, kind: PrincipalKind, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: subject,
            kind,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the subject ID from claims.
    #[must_use]
    pub const fn subject(&self) -> Uuid {
        self.sub
    }

    /// Returns true if the claims were issued to the given principal kind.
    #[must_use]
    pub fn is(&self, kind: PrincipalKind) -> bool {
        self.kind == kind
    }
}
