mod engine;
mod sampler;
pub mod stats;
mod types;

pub use engine::{
    DEFAULT_RUNS, build_confidence_bands, run_monte_carlo, run_monte_carlo_with_cancel,
    simulate_once,
};
pub use sampler::{Sampler, SeededSampler, derive_seed};
pub use types::{
    CancelToken, ConfidenceBands, DescriptiveStats, MonthState, Params, Regression,
    SimulationResults, Strategy, StrategyResult, Trajectory,
};
