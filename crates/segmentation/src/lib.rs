//! Midpoint smoothing of XY moves read from the controller's file channel.

pub mod interpolator;
mod runner;

pub use interpolator::{
    Baseline, Decision, InterpolationStats, Interpolator, InterpolatorOptions, PassReason,
    Replacement,
};
pub use runner::run_interception;

use shared::{domain::CodeChannel, protocol::InterceptionMode};

/// Codes are rewritten before the controller starts processing them.
pub const INTERCEPTION_MODE: InterceptionMode = InterceptionMode::Pre;
/// Only moves played back from a file are smoothed.
pub const CHANNELS: [CodeChannel; 1] = [CodeChannel::File];
/// Rapid and linear moves.
pub const FILTERS: [&str; 2] = ["G0", "G1"];
