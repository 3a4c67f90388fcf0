// Protected swap executor - custody, routing, venue execution, and the
// commit-reveal flows, composed into all-or-nothing operations.
// Funds are pulled from the caller's vault balance before any venue call
// and refunded on every failure path; the recipient is credited only after
// the realized output clears the final slippage guard.

use crate::config::ProtocolParams;
use crate::control::AdmissionControl;
use crate::custody::CustodyVault;
use crate::errors::{LiquidityError, SlippagePhase, SwapError};
use crate::ledger::{unix_now, BatchSettlement, CommitRevealLedger};
use crate::metrics::{COMMITMENT_PHASES, SWAP_LATENCY, SWAP_OUTCOMES};
use crate::router::optimizer::RouteOptimizer;
use crate::router::routes::{FillStatus, RouteAllocation, RouteQuote};
use crate::router::validation::validate_swap_request;
use crate::venues::adapter::{
    Address, LiquiditySource, SwapRequest, Token, VenueExecutor,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{info, warn};

/// Executor statistics for monitoring
#[derive(Debug, Clone, serde::Serialize)]
pub struct ExecutorStats {
    pub total_swaps: u64,
    pub successful_swaps: u64,
    pub failed_swaps: u64,
    pub success_rate: f64,
    pub batches_settled: u64,
    pub orders_settled: u64,
    pub gas_saved_total: u64,
}

/// Result of one protected swap, with timing information.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SwapReceipt {
    /// Realized output credited to the recipient.
    pub amount_out: u128,
    pub allocation: RouteAllocation,
    pub elapsed_ms: f64,
}

/// Result of one batch-settlement call.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BatchReport {
    pub settled: Vec<Address>,
    pub expired: Vec<Address>,
    /// Synthetic per-order constant times settled count. A reporting
    /// figure only, not a measurement.
    pub gas_saved: u64,
}

pub struct ProtectedSwapExecutor {
    params: ProtocolParams,
    optimizer: RouteOptimizer,
    ledger: Arc<CommitRevealLedger>,
    vault: Arc<CustodyVault>,
    liquidity: Arc<dyn LiquiditySource>,
    venues: Arc<dyn VenueExecutor>,
    admission: AdmissionControl,
    /// Committers with a state-mutating call in flight.
    inflight: Mutex<HashSet<Address>>,
    total_swaps: AtomicU64,
    successful_swaps: AtomicU64,
    failed_swaps: AtomicU64,
    batches_settled: AtomicU64,
    orders_settled: AtomicU64,
    gas_saved_total: AtomicU64,
}

impl ProtectedSwapExecutor {
    pub fn new(
        params: ProtocolParams,
        ledger: Arc<CommitRevealLedger>,
        vault: Arc<CustodyVault>,
        liquidity: Arc<dyn LiquiditySource>,
        venues: Arc<dyn VenueExecutor>,
        admission: AdmissionControl,
    ) -> Self {
        Self {
            params,
            optimizer: RouteOptimizer::new(params),
            ledger,
            vault,
            liquidity,
            venues,
            admission,
            inflight: Mutex::new(HashSet::new()),
            total_swaps: AtomicU64::new(0),
            successful_swaps: AtomicU64::new(0),
            failed_swaps: AtomicU64::new(0),
            batches_settled: AtomicU64::new(0),
            orders_settled: AtomicU64::new(0),
            gas_saved_total: AtomicU64::new(0),
        }
    }

    /// Record a commitment for later reveal.
    #[tracing::instrument(skip_all, fields(committer = %committer, deadline = deadline))]
    pub async fn commit(
        &self,
        committer: &Address,
        hash: &str,
        deadline: u64,
    ) -> Result<(), SwapError> {
        self.commit_at(committer, hash, deadline, unix_now()).await
    }

    pub(crate) async fn commit_at(
        &self,
        committer: &Address,
        hash: &str,
        deadline: u64,
        now: u64,
    ) -> Result<(), SwapError> {
        let _guard = self.lock_committer(committer)?;
        self.ledger.commit(committer, hash, deadline, now).await?;
        COMMITMENT_PHASES.with_label_values(&["committed"]).inc();
        Ok(())
    }

    /// Reveal a commitment into the batch-settlement queue.
    #[tracing::instrument(skip_all, fields(committer = %committer))]
    pub async fn reveal(
        &self,
        committer: &Address,
        request: &SwapRequest,
        nonce: u64,
        salt: &str,
    ) -> Result<(), SwapError> {
        self.reveal_at(committer, request, nonce, salt, unix_now())
            .await
    }

    pub(crate) async fn reveal_at(
        &self,
        committer: &Address,
        request: &SwapRequest,
        nonce: u64,
        salt: &str,
        now: u64,
    ) -> Result<(), SwapError> {
        let _guard = self.lock_committer(committer)?;
        self.ledger
            .reveal(committer, request, nonce, salt, now)
            .await?;
        COMMITMENT_PHASES.with_label_values(&["revealed"]).inc();
        Ok(())
    }

    /// Swap without a prior commitment: custody pull, routed execution, and
    /// both slippage guards, as one atomic unit.
    #[tracing::instrument(skip_all, fields(caller = %caller, amount_in = request.amount_in))]
    pub async fn protected_swap(
        &self,
        caller: &Address,
        request: &SwapRequest,
    ) -> Result<SwapReceipt, SwapError> {
        self.protected_swap_at(caller, request, unix_now()).await
    }

    pub(crate) async fn protected_swap_at(
        &self,
        caller: &Address,
        request: &SwapRequest,
        now: u64,
    ) -> Result<SwapReceipt, SwapError> {
        let _permit = self.admission.acquire().await;
        let started = Instant::now();
        self.total_swaps.fetch_add(1, Ordering::Relaxed);

        let result = async {
            let _guard = self.lock_committer(caller)?;
            let (allocation, realized) = self.fill_route(caller, request, now).await?;
            self.vault
                .deposit(&request.recipient, &request.token_out, realized)
                .await;
            Ok((allocation, realized))
        }
        .await;

        self.finish_swap("protected_swap", caller, result, started)
    }

    /// Reveal a commitment and execute it inline within the same atomic
    /// unit. On any failure the reveal itself is unwound, so the commitment
    /// stays Committed and can be retried within its window.
    #[tracing::instrument(skip_all, fields(committer = %committer, amount_in = request.amount_in))]
    pub async fn reveal_and_execute(
        &self,
        committer: &Address,
        request: &SwapRequest,
        nonce: u64,
        salt: &str,
    ) -> Result<SwapReceipt, SwapError> {
        self.reveal_and_execute_at(committer, request, nonce, salt, unix_now())
            .await
    }

    pub(crate) async fn reveal_and_execute_at(
        &self,
        committer: &Address,
        request: &SwapRequest,
        nonce: u64,
        salt: &str,
        now: u64,
    ) -> Result<SwapReceipt, SwapError> {
        let _permit = self.admission.acquire().await;
        let started = Instant::now();
        self.total_swaps.fetch_add(1, Ordering::Relaxed);

        let result = async {
            let _guard = self.lock_committer(committer)?;
            // Inline reveal: the commitment never enters the settlement
            // queue, so batch settlement cannot race this call.
            self.ledger
                .reveal_for_inline(committer, request, nonce, salt, now)
                .await?;
            COMMITMENT_PHASES.with_label_values(&["revealed"]).inc();

            let filled = self.fill_route(committer, request, now).await;
            let (allocation, realized) = match filled {
                Ok(filled) => filled,
                Err(err) => {
                    self.ledger.rollback_reveal(committer).await;
                    return Err(err);
                }
            };
            if let Err(err) = self.ledger.mark_executed(committer, now).await {
                // Unreachable under a single `now` snapshot, but funds must
                // not outlive a failed settlement.
                self.vault
                    .deposit(committer, &request.token_in, allocation.total_in)
                    .await;
                self.ledger.rollback_reveal(committer).await;
                return Err(err);
            }
            COMMITMENT_PHASES.with_label_values(&["executed"]).inc();
            self.vault
                .deposit(&request.recipient, &request.token_out, realized)
                .await;
            Ok((allocation, realized))
        }
        .await;

        self.finish_swap("reveal_and_execute", committer, result, started)
    }

    /// Drain the revealed queue up to the batch cap, marking entries
    /// Executed and reporting the synthetic gas saving.
    #[tracing::instrument(skip_all)]
    pub async fn batch_execute_revealed(&self) -> BatchReport {
        self.batch_execute_revealed_at(unix_now()).await
    }

    pub(crate) async fn batch_execute_revealed_at(&self, now: u64) -> BatchReport {
        let BatchSettlement { executed, expired } = self.ledger.batch_settle(now).await;
        let gas_saved = executed.len() as u64 * self.params.batch_gas_saved_per_order;

        self.batches_settled.fetch_add(1, Ordering::Relaxed);
        self.orders_settled
            .fetch_add(executed.len() as u64, Ordering::Relaxed);
        self.gas_saved_total.fetch_add(gas_saved, Ordering::Relaxed);
        COMMITMENT_PHASES
            .with_label_values(&["executed"])
            .inc_by(executed.len() as f64);
        COMMITMENT_PHASES
            .with_label_values(&["expired"])
            .inc_by(expired.len() as f64);

        if !expired.is_empty() {
            warn!(expired = expired.len(), "batch skipped expired commitments");
        }
        info!(
            settled = executed.len(),
            expired = expired.len(),
            gas_saved = gas_saved,
            "batch settlement"
        );
        BatchReport {
            settled: executed,
            expired,
            gas_saved,
        }
    }

    /// Read-only route quote for a pair and amount.
    pub async fn quote_optimal_route(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: u128,
    ) -> Result<RouteQuote, SwapError> {
        use crate::errors::ValidationError;
        use crate::venues::adapter::MAX_AMOUNT_IN;

        if amount_in == 0 {
            return Err(ValidationError::ZeroAmountIn.into());
        }
        if amount_in > MAX_AMOUNT_IN {
            return Err(ValidationError::AmountTooLarge {
                amount: amount_in,
                max: MAX_AMOUNT_IN,
            }
            .into());
        }
        if token_in == token_out {
            return Err(ValidationError::IdenticalTokens {
                token: token_in.clone(),
            }
            .into());
        }

        let candidates = self.liquidity.candidate_venues(token_in, token_out).await;
        let quote = self
            .optimizer
            .optimize_pair(token_in, token_out, amount_in, &candidates);
        if quote.allocation.is_empty() {
            return Err(LiquidityError::NoVenues {
                token_in: token_in.clone(),
                token_out: token_out.clone(),
            }
            .into());
        }
        Ok(quote)
    }

    /// Executor statistics snapshot.
    pub fn stats(&self) -> ExecutorStats {
        let total = self.total_swaps.load(Ordering::Relaxed);
        let successful = self.successful_swaps.load(Ordering::Relaxed);
        ExecutorStats {
            total_swaps: total,
            successful_swaps: successful,
            failed_swaps: self.failed_swaps.load(Ordering::Relaxed),
            success_rate: if total > 0 {
                successful as f64 / total as f64
            } else {
                0.0
            },
            batches_settled: self.batches_settled.load(Ordering::Relaxed),
            orders_settled: self.orders_settled.load(Ordering::Relaxed),
            gas_saved_total: self.gas_saved_total.load(Ordering::Relaxed),
        }
    }

    /// Pull, route, execute, and guard. On success the caller has been
    /// debited `allocation.total_in` and nobody credited yet; every error
    /// path refunds the caller in full first.
    async fn fill_route(
        &self,
        caller: &Address,
        request: &SwapRequest,
        now: u64,
    ) -> Result<(RouteAllocation, u128), SwapError> {
        validate_swap_request(request, now)?;

        // 1. Custody pull. Everything after this must refund on failure.
        self.vault
            .withdraw(caller, &request.token_in, request.amount_in)
            .await?;

        // 2. Route.
        let candidates = self
            .liquidity
            .candidate_venues(&request.token_in, &request.token_out)
            .await;
        let quote = self.optimizer.optimize(request, &candidates);
        if quote.allocation.is_empty() {
            let err = LiquidityError::NoVenues {
                token_in: request.token_in.clone(),
                token_out: request.token_out.clone(),
            };
            return Err(self.refunded(caller, request, err.into()).await);
        }
        if let FillStatus::Partial { unfilled } = quote.allocation.fill {
            let err = LiquidityError::PartialFill {
                fillable: request.amount_in - unfilled,
                requested: request.amount_in,
            };
            return Err(self.refunded(caller, request, err.into()).await);
        }

        // 3. Estimate guard before any venue call.
        if quote.expected_out < request.min_amount_out {
            let err = SwapError::SlippageExceeded {
                minimum: request.min_amount_out,
                actual: quote.expected_out,
                phase: SlippagePhase::Estimate,
            };
            return Err(self.refunded(caller, request, err).await);
        }

        // 4. Execute legs sequentially, summing realized output.
        let mut realized: u128 = 0;
        for leg in &quote.allocation.legs {
            let leg_out = self
                .venues
                .execute_exact_input(
                    &leg.venue,
                    &request.token_in,
                    &request.token_out,
                    leg.amount_in,
                    &request.recipient,
                    request.deadline,
                )
                .await;
            match leg_out {
                Ok(out) => realized = realized.saturating_add(out),
                Err(err) => return Err(self.refunded(caller, request, err.into()).await),
            }
        }

        // 5. Final guard on what the venues actually produced.
        if realized < request.min_amount_out {
            let err = SwapError::SlippageExceeded {
                minimum: request.min_amount_out,
                actual: realized,
                phase: SlippagePhase::Realized,
            };
            return Err(self.refunded(caller, request, err).await);
        }

        Ok((quote.allocation, realized))
    }

    /// Return the pulled input to the caller and pass the error through.
    async fn refunded(
        &self,
        caller: &Address,
        request: &SwapRequest,
        err: SwapError,
    ) -> SwapError {
        self.vault
            .deposit(caller, &request.token_in, request.amount_in)
            .await;
        err
    }

    fn finish_swap(
        &self,
        entry: &'static str,
        caller: &Address,
        result: Result<(RouteAllocation, u128), SwapError>,
        started: Instant,
    ) -> Result<SwapReceipt, SwapError> {
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        SWAP_LATENCY
            .with_label_values(&[entry])
            .observe(elapsed_ms / 1000.0);

        match result {
            Ok((allocation, amount_out)) => {
                self.successful_swaps.fetch_add(1, Ordering::Relaxed);
                SWAP_OUTCOMES.with_label_values(&[entry, "success"]).inc();
                info!(
                    caller = %caller,
                    amount_out = amount_out,
                    legs = allocation.legs.len(),
                    elapsed_ms = elapsed_ms,
                    "swap executed"
                );
                Ok(SwapReceipt {
                    amount_out,
                    allocation,
                    elapsed_ms,
                })
            }
            Err(err) => {
                self.failed_swaps.fetch_add(1, Ordering::Relaxed);
                SWAP_OUTCOMES
                    .with_label_values(&[entry, err.class()])
                    .inc();
                warn!(caller = %caller, error = %err, "swap aborted");
                Err(err)
            }
        }
    }

    /// Per-committer critical section. Rejects nested entry instead of
    /// queueing, released by the returned guard on every exit path.
    fn lock_committer(&self, committer: &Address) -> Result<CommitterGuard<'_>, SwapError> {
        let mut inflight = self.inflight.lock().expect("inflight set poisoned");
        if !inflight.insert(committer.clone()) {
            return Err(SwapError::Reentrancy {
                committer: committer.clone(),
            });
        }
        Ok(CommitterGuard {
            inflight: &self.inflight,
            committer: committer.clone(),
        })
    }
}

struct CommitterGuard<'a> {
    inflight: &'a Mutex<HashSet<Address>>,
    committer: Address,
}

impl Drop for CommitterGuard<'_> {
    fn drop(&mut self) {
        self.inflight
            .lock()
            .expect("inflight set poisoned")
            .remove(&self.committer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{StateError, ValidationError, VenueError};
    use crate::ledger::{commitment_hash, CommitmentPhase};
    use crate::venues::adapter::{VenueCandidate, VenueId};
    use crate::venues::paper::PaperVenue;
    use crate::venues::registry::VenueRegistry;
    use async_trait::async_trait;

    const NOW: u64 = 1_000_000;

    struct Harness {
        executor: ProtectedSwapExecutor,
        vault: Arc<CustodyVault>,
        paper: Arc<PaperVenue>,
        ledger: Arc<CommitRevealLedger>,
    }

    /// One deep USDC/WETH venue, fee 30 bps, capacity far above test sizes.
    async fn harness() -> Harness {
        harness_with(vec![VenueCandidate {
            venue: VenueId::from("uni-v3"),
            token_in: Token::from("USDC"),
            token_out: Token::from("WETH"),
            liquidity: 100_000_000,
            fee_bps: 30,
        }])
        .await
    }

    async fn harness_with(candidates: Vec<VenueCandidate>) -> Harness {
        let params = ProtocolParams::default();
        let registry = Arc::new(VenueRegistry::new());
        for candidate in candidates {
            registry.register(candidate).await;
        }
        let paper = Arc::new(PaperVenue::new(Arc::clone(&registry)));
        let ledger = Arc::new(CommitRevealLedger::new(params));
        let vault = Arc::new(CustodyVault::new());
        let executor = ProtectedSwapExecutor::new(
            params,
            Arc::clone(&ledger),
            Arc::clone(&vault),
            registry,
            Arc::clone(&paper) as Arc<dyn VenueExecutor>,
            AdmissionControl::new(8, None),
        );
        Harness {
            executor,
            vault,
            paper,
            ledger,
        }
    }

    fn request() -> SwapRequest {
        SwapRequest {
            token_in: Token::from("USDC"),
            token_out: Token::from("WETH"),
            amount_in: 1_000_000,
            min_amount_out: 990_000,
            recipient: Address::from("recipient-1"),
            deadline: NOW + 600,
        }
    }

    fn caller() -> Address {
        Address::from("trader-1")
    }

    async fn fund_caller(h: &Harness) {
        h.vault
            .deposit(&caller(), &Token::from("USDC"), 1_000_000)
            .await;
    }

    #[tokio::test]
    async fn protected_swap_moves_funds_end_to_end() {
        let h = harness().await;
        fund_caller(&h).await;

        let receipt = h
            .executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap();

        // Fee 30 bps on 1_000_000.
        assert_eq!(receipt.amount_out, 997_000);
        assert_eq!(receipt.allocation.legs.len(), 1);
        assert_eq!(
            h.vault.balance_of(&caller(), &Token::from("USDC")).await,
            0
        );
        assert_eq!(
            h.vault
                .balance_of(&Address::from("recipient-1"), &Token::from("WETH"))
                .await,
            997_000
        );
        let stats = h.executor.stats();
        assert_eq!(stats.total_swaps, 1);
        assert_eq!(stats.successful_swaps, 1);
    }

    #[tokio::test]
    async fn unfunded_caller_is_rejected() {
        let h = harness().await;
        let err = h
            .executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Validation(ValidationError::InsufficientBalance { .. })
        ));
        assert_eq!(h.executor.stats().failed_swaps, 1);
    }

    #[tokio::test]
    async fn estimate_guard_aborts_and_refunds() {
        let h = harness().await;
        fund_caller(&h).await;

        // Expected out is 992_015 (fee then slippage factor); ask for more.
        let mut req = request();
        req.min_amount_out = 995_000;
        let err = h
            .executor
            .protected_swap_at(&caller(), &req, NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::SlippageExceeded {
                phase: SlippagePhase::Estimate,
                ..
            }
        ));
        assert_eq!(
            h.vault.balance_of(&caller(), &Token::from("USDC")).await,
            1_000_000
        );
    }

    #[tokio::test]
    async fn realized_guard_aborts_and_refunds() {
        let h = harness().await;
        fund_caller(&h).await;

        // Estimate passes (992_015 >= 990_000) but the venue drifts the
        // fill down to 987_030, below the minimum.
        h.paper.set_drift_bps(-100);
        let err = h
            .executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::SlippageExceeded {
                phase: SlippagePhase::Realized,
                actual: 987_030,
                ..
            }
        ));
        assert_eq!(
            h.vault.balance_of(&caller(), &Token::from("USDC")).await,
            1_000_000
        );
        assert_eq!(
            h.vault
                .balance_of(&Address::from("recipient-1"), &Token::from("WETH"))
                .await,
            0
        );
    }

    #[tokio::test]
    async fn missing_pair_is_liquidity_error_with_refund() {
        let h = harness_with(Vec::new()).await;
        fund_caller(&h).await;

        let err = h
            .executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Liquidity(LiquidityError::NoVenues { .. })
        ));
        assert_eq!(
            h.vault.balance_of(&caller(), &Token::from("USDC")).await,
            1_000_000
        );
    }

    #[tokio::test]
    async fn partial_fill_is_rejected_with_refund() {
        // Single venue capacity: 30% of 1_000_000 = 300_000 < requested.
        let h = harness_with(vec![VenueCandidate {
            venue: VenueId::from("thin"),
            token_in: Token::from("USDC"),
            token_out: Token::from("WETH"),
            liquidity: 1_000_000,
            fee_bps: 30,
        }])
        .await;
        fund_caller(&h).await;

        let err = h
            .executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Liquidity(LiquidityError::PartialFill {
                fillable: 300_000,
                requested: 1_000_000,
            })
        ));
        assert_eq!(
            h.vault.balance_of(&caller(), &Token::from("USDC")).await,
            1_000_000
        );
    }

    struct HaltedVenue;

    #[async_trait]
    impl VenueExecutor for HaltedVenue {
        async fn execute_exact_input(
            &self,
            venue: &VenueId,
            _token_in: &Token,
            _token_out: &Token,
            _amount_in: u128,
            _recipient: &Address,
            _deadline: u64,
        ) -> Result<u128, VenueError> {
            Err(VenueError::new(venue.clone(), "venue halted"))
        }
    }

    #[tokio::test]
    async fn venue_failure_propagates_and_refunds() {
        let params = ProtocolParams::default();
        let registry = Arc::new(VenueRegistry::new());
        registry
            .register(VenueCandidate {
                venue: VenueId::from("uni-v3"),
                token_in: Token::from("USDC"),
                token_out: Token::from("WETH"),
                liquidity: 100_000_000,
                fee_bps: 30,
            })
            .await;
        let vault = Arc::new(CustodyVault::new());
        let executor = ProtectedSwapExecutor::new(
            params,
            Arc::new(CommitRevealLedger::new(params)),
            Arc::clone(&vault),
            registry,
            Arc::new(HaltedVenue),
            AdmissionControl::new(8, None),
        );
        vault.deposit(&caller(), &Token::from("USDC"), 1_000_000).await;

        let err = executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Venue(_)));
        assert_eq!(
            vault.balance_of(&caller(), &Token::from("USDC")).await,
            1_000_000
        );
    }

    #[tokio::test]
    async fn reveal_and_execute_settles_the_commitment() {
        let h = harness().await;
        fund_caller(&h).await;

        let hash = commitment_hash(&caller(), &request(), 7, "salt");
        h.executor
            .commit_at(&caller(), &hash, NOW + 120, NOW)
            .await
            .unwrap();

        let receipt = h
            .executor
            .reveal_and_execute_at(&caller(), &request(), 7, "salt", NOW + 90)
            .await
            .unwrap();
        assert_eq!(receipt.amount_out, 997_000);
        assert_eq!(
            h.ledger.phase_of(&caller(), NOW + 90).await,
            Some(CommitmentPhase::Executed)
        );
        // Inline execution never rides the batch queue.
        assert_eq!(h.ledger.stats().await.queued_reveals, 0);
    }

    #[tokio::test]
    async fn failed_inline_execution_unwinds_the_reveal() {
        let h = harness().await;
        fund_caller(&h).await;
        h.paper.set_drift_bps(-100);

        let hash = commitment_hash(&caller(), &request(), 7, "salt");
        h.executor
            .commit_at(&caller(), &hash, NOW + 120, NOW)
            .await
            .unwrap();

        let err = h
            .executor
            .reveal_and_execute_at(&caller(), &request(), 7, "salt", NOW + 90)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::SlippageExceeded { .. }));
        assert_eq!(
            h.vault.balance_of(&caller(), &Token::from("USDC")).await,
            1_000_000
        );
        assert_eq!(
            h.ledger.phase_of(&caller(), NOW + 90).await,
            Some(CommitmentPhase::Committed)
        );

        // The same commitment still settles once conditions recover.
        h.paper.set_drift_bps(0);
        h.executor
            .reveal_and_execute_at(&caller(), &request(), 7, "salt", NOW + 95)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn wrong_reveal_leaves_funds_untouched() {
        let h = harness().await;
        fund_caller(&h).await;

        let hash = commitment_hash(&caller(), &request(), 7, "salt");
        h.executor
            .commit_at(&caller(), &hash, NOW + 120, NOW)
            .await
            .unwrap();

        let err = h
            .executor
            .reveal_and_execute_at(&caller(), &request(), 8, "salt", NOW + 90)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::State(StateError::InvalidReveal)));
        assert_eq!(
            h.vault.balance_of(&caller(), &Token::from("USDC")).await,
            1_000_000
        );
    }

    #[tokio::test]
    async fn nested_entry_for_one_committer_is_rejected() {
        let h = harness().await;
        fund_caller(&h).await;

        let _held = h.executor.lock_committer(&caller()).unwrap();
        let err = h
            .executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap_err();
        assert!(matches!(err, SwapError::Reentrancy { .. }));

        // Other committers are unaffected.
        let other = Address::from("trader-2");
        h.vault.deposit(&other, &Token::from("USDC"), 1_000_000).await;
        h.executor
            .protected_swap_at(&other, &request(), NOW)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn guard_releases_after_failed_call() {
        let h = harness().await;
        // First call fails on funding; the guard must not linger.
        h.executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap_err();
        fund_caller(&h).await;
        h.executor
            .protected_swap_at(&caller(), &request(), NOW)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn batch_reports_synthetic_gas_savings() {
        let h = harness().await;
        let mut committers = Vec::new();
        for n in 0..3 {
            let committer = Address::new(format!("batch-{n}"));
            let hash = commitment_hash(&committer, &request(), n as u64, "salt");
            h.executor
                .commit_at(&committer, &hash, NOW + 120, NOW)
                .await
                .unwrap();
            h.executor
                .reveal_at(&committer, &request(), n as u64, "salt", NOW + 90)
                .await
                .unwrap();
            committers.push(committer);
        }

        let report = h.executor.batch_execute_revealed_at(NOW + 95).await;
        assert_eq!(report.settled, committers);
        assert!(report.expired.is_empty());
        assert_eq!(report.gas_saved, 3 * 120_000);
        for committer in &committers {
            assert_eq!(
                h.ledger.phase_of(committer, NOW + 95).await,
                Some(CommitmentPhase::Executed)
            );
        }

        let stats = h.executor.stats();
        assert_eq!(stats.batches_settled, 1);
        assert_eq!(stats.orders_settled, 3);
        assert_eq!(stats.gas_saved_total, 360_000);
    }

    #[tokio::test]
    async fn quote_reports_allocation_and_estimate() {
        let h = harness_with(vec![
            VenueCandidate {
                venue: VenueId::from("venue-a"),
                token_in: Token::from("USDC"),
                token_out: Token::from("WETH"),
                liquidity: 200,
                fee_bps: 30,
            },
            VenueCandidate {
                venue: VenueId::from("venue-b"),
                token_in: Token::from("USDC"),
                token_out: Token::from("WETH"),
                liquidity: 400,
                fee_bps: 30,
            },
        ])
        .await;

        let quote = h
            .executor
            .quote_optimal_route(&Token::from("USDC"), &Token::from("WETH"), 100)
            .await
            .unwrap();
        assert_eq!(quote.allocation.legs.len(), 2);
        assert_eq!(quote.allocation.legs[0].amount_in, 60);
        assert_eq!(quote.allocation.legs[1].amount_in, 40);

        let err = h
            .executor
            .quote_optimal_route(&Token::from("USDC"), &Token::from("WETH"), 0)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Validation(ValidationError::ZeroAmountIn)
        ));

        let err = h
            .executor
            .quote_optimal_route(&Token::from("WBTC"), &Token::from("WETH"), 100)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SwapError::Liquidity(LiquidityError::NoVenues { .. })
        ));
    }
}
