// Evolutionary parameter search over the strategy space
pub mod fitness;
pub mod optimizer;
pub mod parameter_space;
pub mod phases;
pub mod reporting;

pub use fitness::FitnessWeights;
pub use optimizer::{
    Candidate, EvolutionaryOptimizer, GenerationStats, Lineage, OptimizationBudget,
    OptimizationOutcome, OptimizerSettings, optimize_parameters,
};
pub use parameter_space::{ParameterRange, SearchSpace};
pub use phases::{OptimizationPhase, PhaseProfile};
