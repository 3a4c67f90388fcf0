// Metrics and observability module
// Prometheus counters and histograms for the protected swap pipeline:
// swap outcomes by entry point, end-to-end swap latency, and
// commitment-phase transitions.

use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

pub static SWAP_OUTCOMES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "swap_outcomes_total",
        "protected swaps by entry point and outcome",
        &["entry", "outcome"]
    )
    .unwrap()
});

pub static SWAP_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "swap_latency_seconds",
        "end-to-end protected swap latency",
        &["entry"]
    )
    .unwrap()
});

pub static COMMITMENT_PHASES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "commitment_phases_total",
        "commitment lifecycle transitions",
        &["phase"]
    )
    .unwrap()
});
