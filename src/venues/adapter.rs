// Venue adapter module
// This file defines the identifier and request types shared across the core
// and the adapter traits for the two external collaborators: venue execution
// and liquidity sourcing.

use crate::errors::VenueError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Maximum accepted `amount_in`. Keeps every basis-point product inside
/// u128 without overflow branches in the pure routing math.
pub const MAX_AMOUNT_IN: u128 = 1 << 96;

/// Basis points in one whole (100%).
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Trader / committer address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(String);

impl Address {
    pub fn new(addr: impl Into<String>) -> Self {
        Self(addr.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Token identifier (symbol or mint address, collaborator-defined).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Token(String);

impl Token {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Liquidity venue identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VenueId(String);

impl VenueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VenueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VenueId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A caller's swap request. Ephemeral, one per call; the commitment hash is
/// computed over every field, so any change invalidates a pending reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRequest {
    pub token_in: Token,
    pub token_out: Token,
    pub amount_in: u128,
    pub min_amount_out: u128,
    pub recipient: Address,
    /// Absolute unix-seconds deadline forwarded to venue execution.
    pub deadline: u64,
}

/// One venue's offer for a token pair, as reported by the liquidity source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VenueCandidate {
    pub venue: VenueId,
    pub token_in: Token,
    pub token_out: Token,
    /// Liquidity available on the input side, in `token_in` units.
    pub liquidity: u128,
    pub fee_bps: u32,
}

impl VenueCandidate {
    pub fn matches_pair(&self, token_in: &Token, token_out: &Token) -> bool {
        self.token_in == *token_in && self.token_out == *token_out
    }
}

/// Venue-execution collaborator. One call per allocation leg; a failure
/// aborts the whole swap and is propagated verbatim.
#[async_trait]
pub trait VenueExecutor: Send + Sync {
    async fn execute_exact_input(
        &self,
        venue: &VenueId,
        token_in: &Token,
        token_out: &Token,
        amount_in: u128,
        recipient: &Address,
        deadline: u64,
    ) -> Result<u128, VenueError>;
}

/// Liquidity-source collaborator. Freshness and staleness of the candidate
/// set are its responsibility, not the core's.
#[async_trait]
pub trait LiquiditySource: Send + Sync {
    async fn candidate_venues(&self, token_in: &Token, token_out: &Token) -> Vec<VenueCandidate>;
}
