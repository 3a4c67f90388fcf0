// Error types and error handling module
// This file defines the error taxonomy for the sealed-aggr core: every
// public operation fails with a SwapError, and every failure aborts the
// whole atomic call with no partial state retained.

use crate::venues::adapter::{Address, Token, VenueId};
use thiserror::Error;

/// Top-level error returned by every public core operation.
#[derive(Debug, Error)]
pub enum SwapError {
    #[error("validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("commitment state: {0}")]
    State(#[from] StateError),

    /// Output below the caller's minimum, before or after venue execution.
    #[error("slippage exceeded during {phase}: output {actual} below minimum {minimum}")]
    SlippageExceeded {
        minimum: u128,
        actual: u128,
        phase: SlippagePhase,
    },

    #[error("liquidity: {0}")]
    Liquidity(#[from] LiquidityError),

    /// A state-mutating call re-entered while another call for the same
    /// committer was still in flight.
    #[error("reentrant call rejected for {committer}")]
    Reentrancy { committer: Address },

    /// Venue collaborator failure, propagated verbatim.
    #[error(transparent)]
    Venue(#[from] VenueError),
}

impl SwapError {
    /// Coarse failure class, used as a metrics label.
    pub fn class(&self) -> &'static str {
        match self {
            SwapError::Validation(_) => "validation",
            SwapError::State(_) => "state",
            SwapError::SlippageExceeded { .. } => "slippage",
            SwapError::Liquidity(_) => "liquidity",
            SwapError::Reentrancy { .. } => "reentrancy",
            SwapError::Venue(_) => "venue",
        }
    }
}

/// Which slippage guard tripped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlippagePhase {
    /// Pre-execution check against the optimizer's estimate.
    Estimate,
    /// Post-execution check against realized venue output.
    Realized,
}

impl std::fmt::Display for SlippagePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlippagePhase::Estimate => f.write_str("estimate"),
            SlippagePhase::Realized => f.write_str("execution"),
        }
    }
}

/// Request and parameter validation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("amount_in must be positive")]
    ZeroAmountIn,
    #[error("min_amount_out must be positive")]
    ZeroMinAmountOut,
    #[error("amount_in {amount} exceeds maximum {max}")]
    AmountTooLarge { amount: u128, max: u128 },
    #[error("token_in and token_out are the same ({token})")]
    IdenticalTokens { token: Token },
    #[error("request deadline {deadline} already passed (now {now})")]
    DeadlineExpired { deadline: u64, now: u64 },
    #[error("commit deadline {deadline} outside allowed window [{min}, {max}]")]
    DeadlineOutOfWindow { deadline: u64, min: u64, max: u64 },
    #[error("insufficient {token} balance for {owner}: have {available}, need {required}")]
    InsufficientBalance {
        owner: Address,
        token: Token,
        available: u128,
        required: u128,
    },
}

/// Commit-reveal state machine violations. None of these mutate the ledger.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    #[error("no commitment on record for {committer}")]
    NotCommitted { committer: Address },
    #[error("{committer} already holds a live commitment")]
    AlreadyCommitted { committer: Address },
    #[error("commitment hash {hash} was already used")]
    CommitmentReused { hash: String },
    #[error("revealed parameters do not match the stored commitment")]
    InvalidReveal,
    #[error("reveal window opens at {opens_at} (now {now})")]
    RevealTooEarly { opens_at: u64, now: u64 },
    #[error("commitment expired at {deadline} (now {now})")]
    CommitmentExpired { deadline: u64, now: u64 },
    #[error("commitment for {committer} already revealed")]
    AlreadyRevealed { committer: Address },
    #[error("commitment for {committer} not yet revealed")]
    NotRevealed { committer: Address },
    #[error("commitment for {committer} already executed")]
    AlreadyExecuted { committer: Address },
}

/// No usable venues, or not enough aggregate capacity to fill the request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LiquidityError {
    #[error("no venues available for {token_in}/{token_out}")]
    NoVenues { token_in: Token, token_out: Token },
    #[error("aggregate venue capacity fills only {fillable} of {requested}")]
    PartialFill { fillable: u128, requested: u128 },
}

/// Failure reported by the venue-execution collaborator.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("venue {venue} execution failed: {reason}")]
pub struct VenueError {
    pub venue: VenueId,
    pub reason: String,
}

impl VenueError {
    pub fn new(venue: VenueId, reason: impl Into<String>) -> Self {
        Self {
            venue,
            reason: reason.into(),
        }
    }
}
