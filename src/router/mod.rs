// Router module - allocation and protected execution plane
// This module covers the route optimizer, pre-trade validation, and the
// executor composing custody, routing, and the commit-reveal ledger.

pub mod execution;
pub mod optimizer;
pub mod routes;
pub mod validation;

pub use execution::{BatchReport, ExecutorStats, ProtectedSwapExecutor, SwapReceipt};
pub use optimizer::RouteOptimizer;
pub use routes::{FillStatus, RouteAllocation, RouteLeg, RouteQuote};
