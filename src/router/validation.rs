// Pre-trade validation module
// Structural checks on a swap request before it touches custody, routing,
// or the commitment ledger. First failed check wins.

use crate::errors::{SwapError, ValidationError};
use crate::venues::adapter::{SwapRequest, MAX_AMOUNT_IN};

/// Validate a swap request before routing and execution.
pub fn validate_swap_request(request: &SwapRequest, now: u64) -> Result<(), SwapError> {
    if request.amount_in == 0 {
        return Err(ValidationError::ZeroAmountIn.into());
    }
    if request.amount_in > MAX_AMOUNT_IN {
        return Err(ValidationError::AmountTooLarge {
            amount: request.amount_in,
            max: MAX_AMOUNT_IN,
        }
        .into());
    }
    if request.min_amount_out == 0 {
        return Err(ValidationError::ZeroMinAmountOut.into());
    }
    if request.token_in == request.token_out {
        return Err(ValidationError::IdenticalTokens {
            token: request.token_in.clone(),
        }
        .into());
    }
    if request.deadline < now {
        return Err(ValidationError::DeadlineExpired {
            deadline: request.deadline,
            now,
        }
        .into());
    }
    Ok(())
}
