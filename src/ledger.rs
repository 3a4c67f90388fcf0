// Commit-reveal ledger
// Tracks one pending commitment per committer, a global set of consumed
// hashes, and the FIFO queue of revealed-but-unsettled committers. All of
// it lives behind a single mutex: every operation is serializable and
// all-or-nothing, and failed operations never mutate state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::time::{SystemTime, UNIX_EPOCH};

use blake2::{Blake2b512, Digest};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::ProtocolParams;
use crate::errors::{StateError, SwapError, ValidationError};
use crate::venues::adapter::{Address, SwapRequest};

/// Wall-clock time as unix seconds. Ledger operations take `now` explicitly
/// so deadline arithmetic stays deterministic under test.
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock set before the unix epoch")
        .as_secs()
}

/// Commitment digest binding the committer to every request field plus the
/// blinding nonce and salt. Length-delimited so adjacent fields cannot be
/// confused, hex-encoded to 32 bytes.
pub fn commitment_hash(
    committer: &Address,
    request: &SwapRequest,
    nonce: u64,
    salt: &str,
) -> String {
    let mut hasher = Blake2b512::new();
    let mut absorb = |bytes: &[u8]| {
        hasher.update((bytes.len() as u64).to_be_bytes());
        hasher.update(bytes);
    };
    absorb(committer.as_str().as_bytes());
    absorb(request.token_in.as_str().as_bytes());
    absorb(request.token_out.as_str().as_bytes());
    absorb(&request.amount_in.to_be_bytes());
    absorb(&request.min_amount_out.to_be_bytes());
    absorb(request.recipient.as_str().as_bytes());
    absorb(&request.deadline.to_be_bytes());
    absorb(&nonce.to_be_bytes());
    absorb(salt.as_bytes());
    let hash = hasher.finalize();
    hex::encode(&hash[..32])
}

/// A committer's pending commitment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commitment {
    pub hash: String,
    pub deadline: u64,
    pub revealed: bool,
    pub executed: bool,
}

impl Commitment {
    /// Derived lifecycle phase. Expiry is a function of the clock, not a
    /// stored flag: a commitment past its deadline without execution is
    /// permanently Expired.
    pub fn phase(&self, now: u64) -> CommitmentPhase {
        if self.executed {
            CommitmentPhase::Executed
        } else if now > self.deadline {
            CommitmentPhase::Expired
        } else if self.revealed {
            CommitmentPhase::Revealed
        } else {
            CommitmentPhase::Committed
        }
    }

    /// Whether the slot can accept a fresh commitment.
    fn slot_free(&self, now: u64) -> bool {
        matches!(
            self.phase(now),
            CommitmentPhase::Executed | CommitmentPhase::Expired
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitmentPhase {
    Committed,
    Revealed,
    Executed,
    Expired,
}

/// Result of one batch-settlement pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSettlement {
    /// Committers marked Executed, in queue order.
    pub executed: Vec<Address>,
    /// Committers found past deadline; left permanently Expired.
    pub expired: Vec<Address>,
}

#[derive(Debug, Clone, Copy, serde::Serialize)]
pub struct LedgerStats {
    pub tracked_commitments: usize,
    pub queued_reveals: usize,
    pub consumed_hashes: usize,
}

#[derive(Default)]
struct LedgerState {
    commitments: HashMap<Address, Commitment>,
    used_hashes: HashSet<String>,
    revealed_queue: VecDeque<Address>,
}

pub struct CommitRevealLedger {
    min_reveal_delay: u64,
    max_commit_window: u64,
    max_batch_size: usize,
    inner: Mutex<LedgerState>,
}

impl CommitRevealLedger {
    pub fn new(params: ProtocolParams) -> Self {
        Self {
            min_reveal_delay: params.min_reveal_delay.as_secs(),
            max_commit_window: params.max_commit_window.as_secs(),
            max_batch_size: params.max_batch_size,
            inner: Mutex::new(LedgerState::default()),
        }
    }

    /// Record a new commitment. The hash is consumed forever at this point:
    /// even if the commitment later expires unrevealed, no address can ever
    /// commit it again.
    pub async fn commit(
        &self,
        committer: &Address,
        hash: &str,
        deadline: u64,
        now: u64,
    ) -> Result<(), SwapError> {
        let mut state = self.inner.lock().await;

        if let Some(existing) = state.commitments.get(committer) {
            if !existing.slot_free(now) {
                return Err(StateError::AlreadyCommitted {
                    committer: committer.clone(),
                }
                .into());
            }
        }
        if state.used_hashes.contains(hash) {
            return Err(StateError::CommitmentReused {
                hash: hash.to_string(),
            }
            .into());
        }
        let earliest = now + self.min_reveal_delay;
        let latest = now + self.max_commit_window;
        if deadline < earliest || deadline > latest {
            return Err(ValidationError::DeadlineOutOfWindow {
                deadline,
                min: earliest,
                max: latest,
            }
            .into());
        }

        state.used_hashes.insert(hash.to_string());
        // A stale queue entry from a replaced (expired) commitment must not
        // be settled against the new one.
        state.revealed_queue.retain(|c| c != committer);
        state.commitments.insert(
            committer.clone(),
            Commitment {
                hash: hash.to_string(),
                deadline,
                revealed: false,
                executed: false,
            },
        );
        debug!(committer = %committer, deadline = deadline, "commitment recorded");
        Ok(())
    }

    /// Reveal a pending commitment and enqueue it for batch settlement.
    pub async fn reveal(
        &self,
        committer: &Address,
        request: &SwapRequest,
        nonce: u64,
        salt: &str,
        now: u64,
    ) -> Result<(), SwapError> {
        self.reveal_inner(committer, request, nonce, salt, now, true)
            .await
    }

    /// Reveal for inline execution: same checks and transition, but the
    /// committer never enters the settlement queue because the commitment is
    /// executed within the same atomic call.
    pub(crate) async fn reveal_for_inline(
        &self,
        committer: &Address,
        request: &SwapRequest,
        nonce: u64,
        salt: &str,
        now: u64,
    ) -> Result<(), SwapError> {
        self.reveal_inner(committer, request, nonce, salt, now, false)
            .await
    }

    async fn reveal_inner(
        &self,
        committer: &Address,
        request: &SwapRequest,
        nonce: u64,
        salt: &str,
        now: u64,
        enqueue: bool,
    ) -> Result<(), SwapError> {
        let mut state = self.inner.lock().await;

        let commitment = state.commitments.get(committer).ok_or_else(|| {
            SwapError::from(StateError::NotCommitted {
                committer: committer.clone(),
            })
        })?;
        if commitment.executed || commitment.revealed {
            return Err(StateError::AlreadyRevealed {
                committer: committer.clone(),
            }
            .into());
        }
        if commitment_hash(committer, request, nonce, salt) != commitment.hash {
            return Err(StateError::InvalidReveal.into());
        }
        if now > commitment.deadline {
            return Err(StateError::CommitmentExpired {
                deadline: commitment.deadline,
                now,
            }
            .into());
        }
        let opens_at = commitment.deadline.saturating_sub(self.min_reveal_delay);
        if now < opens_at {
            return Err(StateError::RevealTooEarly { opens_at, now }.into());
        }

        let commitment = state
            .commitments
            .get_mut(committer)
            .expect("commitment present under held lock");
        commitment.revealed = true;
        if enqueue {
            state.revealed_queue.push_back(committer.clone());
        }
        debug!(committer = %committer, enqueued = enqueue, "commitment revealed");
        Ok(())
    }

    /// Compensation for a failed inline execution: restore the commitment to
    /// Committed so the caller can retry within its window.
    pub(crate) async fn rollback_reveal(&self, committer: &Address) {
        let mut state = self.inner.lock().await;
        if let Some(commitment) = state.commitments.get_mut(committer) {
            if commitment.revealed && !commitment.executed {
                commitment.revealed = false;
            }
        }
        state.revealed_queue.retain(|c| c != committer);
    }

    /// Settle a single revealed commitment (settle-one path). Never settles
    /// past the deadline.
    pub async fn mark_executed(&self, committer: &Address, now: u64) -> Result<(), SwapError> {
        let mut state = self.inner.lock().await;

        let commitment = state.commitments.get_mut(committer).ok_or_else(|| {
            SwapError::from(StateError::NotCommitted {
                committer: committer.clone(),
            })
        })?;
        if commitment.executed {
            return Err(StateError::AlreadyExecuted {
                committer: committer.clone(),
            }
            .into());
        }
        if !commitment.revealed {
            return Err(StateError::NotRevealed {
                committer: committer.clone(),
            }
            .into());
        }
        if now > commitment.deadline {
            return Err(StateError::CommitmentExpired {
                deadline: commitment.deadline,
                now,
            }
            .into());
        }

        commitment.executed = true;
        state.revealed_queue.retain(|c| c != committer);
        debug!(committer = %committer, "commitment executed");
        Ok(())
    }

    /// Drain the revealed queue FIFO, processing at most `max_batch_size`
    /// entries. In-window entries are marked Executed; entries past their
    /// deadline are reported expired and never auto-executed.
    pub async fn batch_settle(&self, now: u64) -> BatchSettlement {
        let mut state = self.inner.lock().await;
        let mut settlement = BatchSettlement::default();

        let mut processed = 0;
        while processed < self.max_batch_size {
            let Some(committer) = state.revealed_queue.pop_front() else {
                break;
            };
            processed += 1;

            let Some(commitment) = state.commitments.get_mut(&committer) else {
                continue;
            };
            if commitment.executed || !commitment.revealed {
                // Stale entry; the commitment was settled or replaced.
                continue;
            }
            if now > commitment.deadline {
                settlement.expired.push(committer);
                continue;
            }
            commitment.executed = true;
            settlement.executed.push(committer);
        }

        debug!(
            executed = settlement.executed.len(),
            expired = settlement.expired.len(),
            remaining = state.revealed_queue.len(),
            "batch settlement pass"
        );
        settlement
    }

    pub async fn commitment_of(&self, committer: &Address) -> Option<Commitment> {
        self.inner.lock().await.commitments.get(committer).cloned()
    }

    pub async fn phase_of(&self, committer: &Address, now: u64) -> Option<CommitmentPhase> {
        self.inner
            .lock()
            .await
            .commitments
            .get(committer)
            .map(|c| c.phase(now))
    }

    pub async fn stats(&self) -> LedgerStats {
        let state = self.inner.lock().await;
        LedgerStats {
            tracked_commitments: state.commitments.len(),
            queued_reveals: state.revealed_queue.len(),
            consumed_hashes: state.used_hashes.len(),
        }
    }
}
