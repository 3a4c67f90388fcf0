// Route optimizer - splits a swap across venues to bound price impact
// Pure allocation logic: iterates the candidate set in source order, caps
// each leg at a fixed fraction of the venue's reported liquidity, and
// estimates output with fee-adjusted integer basis-point arithmetic.

use crate::config::ProtocolParams;
use crate::router::routes::{apply_bps, FillStatus, RouteAllocation, RouteLeg, RouteQuote};
use crate::venues::adapter::{SwapRequest, Token, VenueCandidate, BPS_DENOMINATOR};

pub struct RouteOptimizer {
    params: ProtocolParams,
}

impl RouteOptimizer {
    pub fn new(params: ProtocolParams) -> Self {
        Self { params }
    }

    /// Allocate `request.amount_in` across matching candidates.
    ///
    /// Deterministic given candidate order; never exceeds the configured
    /// leg cap; never mixes token pairs. Returns an empty allocation when
    /// no candidate matches, and a flagged partial fill when aggregate
    /// capacity falls short of the requested amount - the caller decides
    /// whether either is an error.
    pub fn optimize(&self, request: &SwapRequest, candidates: &[VenueCandidate]) -> RouteQuote {
        self.optimize_pair(
            &request.token_in,
            &request.token_out,
            request.amount_in,
            candidates,
        )
    }

    /// Pair-addressed variant backing the read-only quote surface.
    pub fn optimize_pair(
        &self,
        token_in: &Token,
        token_out: &Token,
        amount_in: u128,
        candidates: &[VenueCandidate],
    ) -> RouteQuote {
        if amount_in == 0 {
            return RouteQuote::empty();
        }

        let mut legs = Vec::new();
        let mut remaining = amount_in;
        let mut expected_out: u128 = 0;

        for candidate in candidates {
            if remaining == 0 || legs.len() >= self.params.max_route_legs {
                break;
            }
            if !candidate.matches_pair(token_in, token_out) {
                continue;
            }

            // Cap per-venue input to bound price impact on thin books.
            let capacity = apply_bps(candidate.liquidity, self.params.venue_capacity_bps);
            if capacity == 0 {
                continue;
            }

            let leg_in = remaining.min(capacity);
            expected_out += self.leg_expected_out(leg_in, candidate.fee_bps);
            legs.push(RouteLeg {
                venue: candidate.venue.clone(),
                amount_in: leg_in,
                percentage_bps: percentage_of(leg_in, amount_in),
            });
            remaining -= leg_in;
        }

        let total_in = amount_in - remaining;
        let fill = if remaining == 0 {
            FillStatus::Full
        } else {
            FillStatus::Partial { unfilled: remaining }
        };

        RouteQuote {
            allocation: RouteAllocation {
                legs,
                total_in,
                fill,
            },
            expected_out,
        }
    }

    /// Fee-adjusted constant-output estimate for one leg. Both divisions
    /// truncate so the estimate is conservative and deterministic.
    fn leg_expected_out(&self, leg_in: u128, fee_bps: u32) -> u128 {
        let fee_kept_bps = BPS_DENOMINATOR.saturating_sub(u128::from(fee_bps)) as u32;
        let after_fee = apply_bps(leg_in, fee_kept_bps);
        apply_bps(after_fee, self.params.slippage_factor_bps)
    }
}

fn percentage_of(leg_in: u128, amount_in: u128) -> u32 {
    // leg_in <= amount_in, so the quotient is at most 10000.
    (leg_in.saturating_mul(BPS_DENOMINATOR) / amount_in) as u32
}
