use serde::{Deserialize, Serialize};
use std::fmt;

/// The four sequential regimes of the evolutionary search.
///
/// Each phase fixes its own mutation strength, crossover rate and
/// random-injection rate; the schedule splits a total generation budget
/// across them in fixed proportions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OptimizationPhase {
    /// Wide mutation and heavy random injection to map the space.
    Exploration,
    /// Narrow mutation and high crossover to refine promising regions.
    Intensification,
    /// Reintroduced randomness to escape local optima.
    Diversification,
    /// Minimal mutation to polish the incumbent best.
    Convergence,
}

impl fmt::Display for OptimizationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptimizationPhase::Exploration => "exploration",
            OptimizationPhase::Intensification => "intensification",
            OptimizationPhase::Diversification => "diversification",
            OptimizationPhase::Convergence => "convergence",
        };
        write!(f, "{}", name)
    }
}

/// Per-phase reproduction rates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseProfile {
    /// Mutation magnitude as a fraction of each parameter's range.
    pub mutation_strength: f64,
    /// Probability that an individual gene mutates.
    pub mutation_probability: f64,
    /// Probability that a new candidate comes from crossover.
    pub crossover_rate: f64,
    /// Probability that a new candidate is injected at random.
    pub random_injection_rate: f64,
}

impl OptimizationPhase {
    pub const ALL: [OptimizationPhase; 4] = [
        OptimizationPhase::Exploration,
        OptimizationPhase::Intensification,
        OptimizationPhase::Diversification,
        OptimizationPhase::Convergence,
    ];

    /// Fraction of the total generation budget assigned to each phase.
    fn budget_share(&self) -> f64 {
        match self {
            OptimizationPhase::Exploration => 0.30,
            OptimizationPhase::Intensification => 0.30,
            OptimizationPhase::Diversification => 0.20,
            OptimizationPhase::Convergence => 0.20,
        }
    }

    pub fn profile(&self) -> PhaseProfile {
        match self {
            OptimizationPhase::Exploration => PhaseProfile {
                mutation_strength: 0.30,
                mutation_probability: 0.50,
                crossover_rate: 0.30,
                random_injection_rate: 0.25,
            },
            OptimizationPhase::Intensification => PhaseProfile {
                mutation_strength: 0.10,
                mutation_probability: 0.35,
                crossover_rate: 0.55,
                random_injection_rate: 0.05,
            },
            OptimizationPhase::Diversification => PhaseProfile {
                mutation_strength: 0.25,
                mutation_probability: 0.45,
                crossover_rate: 0.35,
                random_injection_rate: 0.20,
            },
            OptimizationPhase::Convergence => PhaseProfile {
                mutation_strength: 0.04,
                mutation_probability: 0.25,
                crossover_rate: 0.60,
                random_injection_rate: 0.02,
            },
        }
    }

    /// The phase active at `generation` for a run of `total` generations.
    ///
    /// Phase boundaries are fixed up front from the budget shares; very
    /// small budgets may leave some phases with no generations at all.
    pub fn at(generation: usize, total: usize) -> OptimizationPhase {
        let schedule = Self::schedule(total);
        let mut cursor = 0usize;
        for (phase, span) in schedule {
            cursor += span;
            if generation < cursor {
                return phase;
            }
        }
        OptimizationPhase::Convergence
    }

    /// Per-phase generation counts summing to `total`.
    pub fn schedule(total: usize) -> [(OptimizationPhase, usize); 4] {
        let mut spans = [0usize; 4];
        let mut assigned = 0usize;

        for (i, phase) in Self::ALL.iter().enumerate() {
            let span = if i == 3 {
                total.saturating_sub(assigned)
            } else {
                ((total as f64 * phase.budget_share()).round() as usize)
                    .min(total.saturating_sub(assigned))
            };
            spans[i] = span;
            assigned += span;
        }

        [
            (OptimizationPhase::Exploration, spans[0]),
            (OptimizationPhase::Intensification, spans[1]),
            (OptimizationPhase::Diversification, spans[2]),
            (OptimizationPhase::Convergence, spans[3]),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_spans_sum_to_total() {
        for total in [1, 4, 10, 15, 40, 100] {
            let schedule = OptimizationPhase::schedule(total);
            let sum: usize = schedule.iter().map(|(_, span)| span).sum();
            assert_eq!(sum, total, "schedule for {} generations", total);
        }
    }

    #[test]
    fn test_phases_run_in_order() {
        let total = 40;
        let mut last_index = 0usize;
        for generation in 0..total {
            let phase = OptimizationPhase::at(generation, total);
            let index = OptimizationPhase::ALL
                .iter()
                .position(|p| *p == phase)
                .expect("phase is known");
            assert!(index >= last_index, "phases must never move backwards");
            last_index = index;
        }
    }

    #[test]
    fn test_forty_generations_cover_all_phases() {
        let seen: Vec<OptimizationPhase> =
            (0..40).map(|g| OptimizationPhase::at(g, 40)).collect();
        for phase in OptimizationPhase::ALL {
            assert!(seen.contains(&phase), "{} missing from schedule", phase);
        }
    }

    #[test]
    fn test_exploration_mutates_wider_than_convergence() {
        let exploration = OptimizationPhase::Exploration.profile();
        let convergence = OptimizationPhase::Convergence.profile();
        assert!(exploration.mutation_strength > convergence.mutation_strength);
        assert!(exploration.random_injection_rate > convergence.random_injection_rate);
    }
}
