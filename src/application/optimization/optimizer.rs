use crate::application::backtest::simulator::{MIN_SAMPLES, run_backtest};
use crate::application::optimization::fitness::FitnessWeights;
use crate::application::optimization::parameter_space::{GENE_COUNT, SearchSpace};
use crate::application::optimization::phases::{OptimizationPhase, PhaseProfile};
use crate::domain::errors::BacktestError;
use crate::domain::market::PriceSeries;
use crate::domain::performance::report::PerformanceReport;
use crate::domain::trading::parameters::ParameterSet;
use crate::domain::trading::portfolio::Portfolio;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Fitness assigned to a candidate whose evaluation failed. Large and
/// negative so the candidate sinks to the bottom of every ranking, but
/// finite so rankings and serialized histories stay well behaved.
pub const MIN_FITNESS: f64 = -1.0e9;

/// How a candidate entered its generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Lineage {
    Seeded,
    Injected,
    Crossover,
    Mutant,
    Elite,
}

/// One evaluated member of a generation.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub parameters: ParameterSet,
    pub fitness: f64,
    pub generation: usize,
    pub lineage: Lineage,
}

/// Fitness and diversity summary of one completed generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationStats {
    pub generation: usize,
    pub phase: OptimizationPhase,
    pub best_fitness: f64,
    pub mean_fitness: f64,
    pub worst_fitness: f64,
    pub diversity: f64,
    pub mutation_scale: f64,
}

/// Knobs of the evolutionary engine itself, as opposed to the strategy
/// parameter bounds in [`SearchSpace`].
#[derive(Debug, Clone)]
pub struct OptimizerSettings {
    pub population_size: usize,
    pub elite_count: usize,
    pub tournament_size: usize,
    /// Range extension of blend crossover: genes are sampled from the
    /// segment between both parents stretched by this factor on each side.
    pub blend_alpha: f64,
    pub weights: FitnessWeights,
    /// Starting portfolio value (units of B) for every fitness backtest.
    pub initial_value: Decimal,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            population_size: 32,
            elite_count: 4,
            tournament_size: 3,
            blend_alpha: 0.25,
            weights: FitnessWeights::default(),
            initial_value: dec!(10_000),
        }
    }
}

/// Iteration and wall-clock budget of a search run.
#[derive(Debug, Clone)]
pub struct OptimizationBudget {
    pub generations: usize,
    pub max_duration: Option<Duration>,
}

impl OptimizationBudget {
    pub fn generations(generations: usize) -> Self {
        Self {
            generations,
            max_duration: None,
        }
    }
}

/// Final result of a search run.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationOutcome {
    pub best_parameters: ParameterSet,
    pub best_fitness: f64,
    /// Backtest report of the best parameter set over the full series.
    pub report: PerformanceReport,
    pub history: Vec<GenerationStats>,
    /// Last fully evaluated generation, ranked best first.
    pub final_population: Vec<Candidate>,
    pub generations_completed: usize,
    /// Estimate in [0, 1] that the search converged on a true optimum,
    /// from the convergence trend, diversity retention and how long the
    /// final best has survived the late phases.
    pub confidence: f64,
}

/// Four-phase evolutionary search over the strategy parameter space, with
/// the backtest simulator as its fitness oracle.
///
/// All randomness comes from one caller-seeded generator, so a (series,
/// budget, seed) triple always reproduces the same outcome. Candidate
/// evaluation within a generation runs on rayon with one isolated portfolio
/// per run; ranking stays deterministic because ties keep creation order.
pub struct EvolutionaryOptimizer<'a> {
    series: &'a PriceSeries,
    space: SearchSpace,
    settings: OptimizerSettings,
}

impl<'a> EvolutionaryOptimizer<'a> {
    pub fn new(
        series: &'a PriceSeries,
        space: SearchSpace,
        settings: OptimizerSettings,
    ) -> Result<Self, BacktestError> {
        space.validate()?;

        if settings.population_size < 2 {
            return Err(BacktestError::InvalidParameter {
                name: "population_size",
                value: settings.population_size as f64,
                reason: "must be at least 2",
            });
        }
        if settings.elite_count == 0 || settings.elite_count >= settings.population_size {
            return Err(BacktestError::InvalidParameter {
                name: "elite_count",
                value: settings.elite_count as f64,
                reason: "must be in [1, population_size)",
            });
        }
        if settings.tournament_size == 0 {
            return Err(BacktestError::InvalidParameter {
                name: "tournament_size",
                value: 0.0,
                reason: "must be at least 1",
            });
        }

        // The smallest admissible lookback must leave room to simulate,
        // otherwise every candidate would fail its backtest.
        let required = space.lookback_window.min.round().max(1.0) as usize + MIN_SAMPLES;
        if series.len() < required {
            return Err(BacktestError::InsufficientData {
                required,
                actual: series.len(),
            });
        }

        Ok(Self {
            series,
            space,
            settings,
        })
    }

    pub fn run(
        &self,
        budget: &OptimizationBudget,
        seed: u64,
    ) -> Result<OptimizationOutcome, BacktestError> {
        let cancel = AtomicBool::new(false);
        self.run_cancellable(budget, seed, &cancel)
    }

    /// Run the search, checking the cancel flag between generations. On
    /// cancellation or an exhausted time budget the best candidate of the
    /// last fully completed generation is returned, never a partially
    /// evaluated one.
    pub fn run_cancellable(
        &self,
        budget: &OptimizationBudget,
        seed: u64,
        cancel: &AtomicBool,
    ) -> Result<OptimizationOutcome, BacktestError> {
        if budget.generations == 0 {
            return Err(BacktestError::InvalidParameter {
                name: "generations",
                value: 0.0,
                reason: "must be at least 1",
            });
        }

        let started = Instant::now();
        let mut rng = StdRng::seed_from_u64(seed);
        let total = budget.generations;

        info!(
            population = self.settings.population_size,
            generations = total,
            seed,
            "starting evolutionary parameter search"
        );

        // Generation 0 is pure random seeding
        let seeds: Vec<(ParameterSet, Lineage)> = (0..self.settings.population_size)
            .map(|_| (self.space.sample(&mut rng), Lineage::Seeded))
            .collect();
        let mut population = self.evaluate_generation(seeds, 0);

        let mut history: Vec<GenerationStats> = Vec::with_capacity(total);
        let mut mutation_scale = 1.0f64;
        let mut stagnant_generations = 0usize;
        let mut best_fitness = population[0].fitness;

        history.push(self.generation_stats(
            0,
            OptimizationPhase::at(0, total),
            &population,
            mutation_scale,
        ));
        self.log_generation(history.last().expect("just pushed"));

        let mut generations_completed = 1usize;

        for generation in 1..total {
            if cancel.load(Ordering::Relaxed) {
                info!(generation, "search cancelled, keeping last completed generation");
                break;
            }
            if let Some(limit) = budget.max_duration
                && started.elapsed() >= limit
            {
                info!(generation, "time budget exhausted");
                break;
            }

            let phase = OptimizationPhase::at(generation, total);
            let profile = phase.profile();

            // Elites survive unchanged; the rest of the generation is bred
            let elites: Vec<Candidate> = population
                .iter()
                .take(self.settings.elite_count)
                .map(|c| Candidate {
                    parameters: c.parameters.clone(),
                    fitness: c.fitness,
                    generation: c.generation,
                    lineage: Lineage::Elite,
                })
                .collect();

            let offspring =
                self.breed_offspring(&population, &profile, mutation_scale, &mut rng);
            let mut next = elites;
            next.extend(self.evaluate_generation(offspring, generation));
            next.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
            population = next;

            // Adaptive mutation: tighten while improving, widen when stuck
            if population[0].fitness > best_fitness + f64::EPSILON {
                best_fitness = population[0].fitness;
                stagnant_generations = 0;
                mutation_scale = (mutation_scale * 0.90).max(0.5);
            } else {
                stagnant_generations += 1;
                if stagnant_generations >= 3 {
                    mutation_scale = (mutation_scale * 1.20).min(2.5);
                }
            }

            history.push(self.generation_stats(generation, phase, &population, mutation_scale));
            self.log_generation(history.last().expect("just pushed"));
            generations_completed = generation + 1;
        }

        let best = population[0].clone();
        let report = self.final_report(&best.parameters)?;
        let confidence = Self::search_confidence(&history);

        info!(
            fitness = best.fitness,
            confidence, generations_completed, "search finished"
        );

        Ok(OptimizationOutcome {
            best_parameters: best.parameters.clone(),
            best_fitness: best.fitness,
            report,
            history,
            final_population: population,
            generations_completed,
            confidence,
        })
    }

    /// Evaluate a batch of bred parameter sets into ranked candidates.
    ///
    /// Runs on rayon: each backtest gets its own portfolio and touches no
    /// shared state, and the barrier at `collect` means a generation is
    /// ranked only when every member has finished. The sort is stable, so
    /// fitness ties keep creation order and rankings stay deterministic.
    fn evaluate_generation(
        &self,
        bred: Vec<(ParameterSet, Lineage)>,
        generation: usize,
    ) -> Vec<Candidate> {
        let mut candidates: Vec<Candidate> = bred
            .into_par_iter()
            .map(|(parameters, lineage)| {
                let fitness = self.evaluate(&parameters);
                Candidate {
                    parameters,
                    fitness,
                    generation,
                    lineage,
                }
            })
            .collect();

        candidates.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        candidates
    }

    /// Fitness of one parameter set. A failed evaluation is isolated with
    /// [`MIN_FITNESS`] instead of aborting the generation.
    fn evaluate(&self, parameters: &ParameterSet) -> f64 {
        let first_ratio = self.series.first_ratio().unwrap_or(1.0);
        let initial = Portfolio::balanced(self.settings.initial_value, first_ratio);

        match run_backtest(self.series, parameters, initial) {
            Ok(result) => {
                let score = self.settings.weights.score(&result.report);
                if score.is_finite() { score } else { MIN_FITNESS }
            }
            Err(err) => {
                debug!(%err, "candidate evaluation failed, assigning minimal fitness");
                MIN_FITNESS
            }
        }
    }

    fn breed_offspring(
        &self,
        population: &[Candidate],
        profile: &PhaseProfile,
        mutation_scale: f64,
        rng: &mut StdRng,
    ) -> Vec<(ParameterSet, Lineage)> {
        let slots = self.settings.population_size - self.settings.elite_count;
        let mut offspring = Vec::with_capacity(slots);

        for _ in 0..slots {
            let roll: f64 = rng.random();
            if roll < profile.random_injection_rate {
                offspring.push((self.space.sample(rng), Lineage::Injected));
            } else if roll < profile.random_injection_rate + profile.crossover_rate {
                let mother = self.tournament(population, rng);
                let father = self.tournament(population, rng);
                offspring.push((self.crossover(mother, father, rng), Lineage::Crossover));
            } else {
                let parent = self.tournament(population, rng);
                offspring.push((
                    self.mutate(parent, profile, mutation_scale, rng),
                    Lineage::Mutant,
                ));
            }
        }

        offspring
    }

    /// Tournament selection: sample `tournament_size` candidates, keep the
    /// fittest. Ties go to the earlier-ranked candidate.
    fn tournament<'p>(&self, population: &'p [Candidate], rng: &mut StdRng) -> &'p ParameterSet {
        let mut best_index = rng.random_range(0..population.len());
        for _ in 1..self.settings.tournament_size {
            let index = rng.random_range(0..population.len());
            if population[index].fitness > population[best_index].fitness {
                best_index = index;
            }
        }
        &population[best_index].parameters
    }

    /// Per-parameter blend crossover. Each gene is drawn from the segment
    /// between the parents extended by `blend_alpha` on both sides, then
    /// clipped back into bounds.
    fn crossover(
        &self,
        mother: &ParameterSet,
        father: &ParameterSet,
        rng: &mut StdRng,
    ) -> ParameterSet {
        let a = self.space.encode(mother);
        let b = self.space.encode(father);
        let alpha = self.settings.blend_alpha;

        let mut genes = [0.0; GENE_COUNT];
        for i in 0..GENE_COUNT {
            let t: f64 = rng.random_range(-alpha..=1.0 + alpha);
            genes[i] = a[i] + t * (b[i] - a[i]);
        }

        self.space.decode(genes)
    }

    /// Independent per-gene mutation. Perturbation magnitude scales with the
    /// phase's mutation strength, the adaptive scale, and the declared range
    /// of the parameter.
    fn mutate(
        &self,
        parent: &ParameterSet,
        profile: &PhaseProfile,
        mutation_scale: f64,
        rng: &mut StdRng,
    ) -> ParameterSet {
        let mut genes = self.space.encode(parent);
        let ranges = self.space.dimensions();

        for i in 0..genes.len() {
            if rng.random_bool(profile.mutation_probability.clamp(0.0, 1.0)) {
                let magnitude = profile.mutation_strength * mutation_scale * ranges[i].1.span();
                let delta = (rng.random::<f64>() * 2.0 - 1.0) * magnitude;
                genes[i] += delta;
            }
        }

        self.space.decode(genes)
    }

    fn generation_stats(
        &self,
        generation: usize,
        phase: OptimizationPhase,
        population: &[Candidate],
        mutation_scale: f64,
    ) -> GenerationStats {
        let best_fitness = population[0].fitness;
        let worst_fitness = population[population.len() - 1].fitness;
        let mean_fitness =
            population.iter().map(|c| c.fitness).sum::<f64>() / population.len() as f64;

        GenerationStats {
            generation,
            phase,
            best_fitness,
            mean_fitness,
            worst_fitness,
            diversity: self.population_diversity(population),
            mutation_scale,
        }
    }

    /// Mean pairwise normalized distance across the generation, in [0, 1].
    fn population_diversity(&self, population: &[Candidate]) -> f64 {
        if population.len() < 2 {
            return 0.0;
        }

        let mut total = 0.0;
        let mut pairs = 0usize;
        for i in 0..population.len() {
            for j in (i + 1)..population.len() {
                total += self
                    .space
                    .normalized_distance(&population[i].parameters, &population[j].parameters);
                pairs += 1;
            }
        }

        total / pairs as f64
    }

    fn log_generation(&self, stats: &GenerationStats) {
        info!(
            generation = stats.generation,
            phase = %stats.phase,
            best = stats.best_fitness,
            mean = stats.mean_fitness,
            diversity = stats.diversity,
            "generation complete"
        );
    }

    fn final_report(&self, parameters: &ParameterSet) -> Result<PerformanceReport, BacktestError> {
        let first_ratio = self.series.first_ratio().unwrap_or(1.0);
        let initial = Portfolio::balanced(self.settings.initial_value, first_ratio);
        Ok(run_backtest(self.series, parameters, initial)?.report)
    }

    /// Estimate that the search reached a true optimum.
    ///
    /// Blends three signals: how little the best improved over the final
    /// quarter of the run (convergence trend), how much population diversity
    /// survived relative to the start (the space kept being probed), and for
    /// what share of the diversification-and-later generations the final
    /// best was already in place.
    fn search_confidence(history: &[GenerationStats]) -> f64 {
        if history.len() < 4 {
            return 0.0;
        }

        let final_best = history[history.len() - 1].best_fitness;
        let scale = final_best.abs().max(1e-6);

        let tail_len = (history.len() / 4).max(1);
        let tail_start = &history[history.len() - tail_len];
        let tail_gain = final_best - tail_start.best_fitness;
        let trend = 1.0 - (tail_gain / scale).clamp(0.0, 1.0);

        let initial_diversity = history[0].diversity.max(1e-9);
        let diversity_retention =
            (history[history.len() - 1].diversity / initial_diversity).clamp(0.0, 1.0);

        let late: Vec<&GenerationStats> = history
            .iter()
            .filter(|s| {
                matches!(
                    s.phase,
                    OptimizationPhase::Diversification | OptimizationPhase::Convergence
                )
            })
            .collect();
        let consistency = if late.is_empty() {
            0.0
        } else {
            let settled = late
                .iter()
                .filter(|s| final_best - s.best_fitness <= 1e-9 * scale)
                .count();
            settled as f64 / late.len() as f64
        };

        (0.45 * trend + 0.25 * diversity_retention + 0.30 * consistency).clamp(0.0, 1.0)
    }
}

/// Search `search_space` for the parameter set maximizing fitness over
/// `series`, with default engine settings.
pub fn optimize_parameters(
    series: &PriceSeries,
    search_space: &SearchSpace,
    budget: &OptimizationBudget,
    seed: u64,
) -> Result<OptimizationOutcome, BacktestError> {
    EvolutionaryOptimizer::new(series, search_space.clone(), OptimizerSettings::default())?
        .run(budget, seed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::PriceObservation;

    fn wavy_series(len: usize) -> PriceSeries {
        let observations = (0..len)
            .map(|i| PriceObservation {
                timestamp: 86_400 * i as i64,
                ratio: 1.0 + 0.15 * ((i as f64) * 0.45).sin(),
            })
            .collect();
        PriceSeries::new(observations).expect("series is valid")
    }

    fn small_settings() -> OptimizerSettings {
        OptimizerSettings {
            population_size: 12,
            elite_count: 2,
            ..Default::default()
        }
    }

    fn small_space() -> SearchSpace {
        SearchSpace {
            lookback_window: crate::application::optimization::parameter_space::ParameterRange::new(
                5.0, 20.0,
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_same_seed_reproduces_the_run() {
        let series = wavy_series(120);
        let budget = OptimizationBudget::generations(8);

        let optimizer = EvolutionaryOptimizer::new(&series, small_space(), small_settings())
            .expect("optimizer builds");
        let a = optimizer.run(&budget, 99).expect("first run");
        let b = optimizer.run(&budget, 99).expect("second run");

        assert_eq!(a.best_parameters, b.best_parameters);
        assert_eq!(a.best_fitness, b.best_fitness);
        assert_eq!(a.history.len(), b.history.len());
        for (x, y) in a.history.iter().zip(b.history.iter()) {
            assert_eq!(x.best_fitness, y.best_fitness);
            assert_eq!(x.diversity, y.diversity);
        }
    }

    #[test]
    fn test_different_seeds_diverge() {
        let series = wavy_series(120);
        let budget = OptimizationBudget::generations(6);

        let optimizer = EvolutionaryOptimizer::new(&series, small_space(), small_settings())
            .expect("optimizer builds");
        let a = optimizer.run(&budget, 1).expect("run a");
        let b = optimizer.run(&budget, 2).expect("run b");

        // Seeded populations differ, so the search paths must differ
        let same_history = a
            .history
            .iter()
            .zip(b.history.iter())
            .all(|(x, y)| x.mean_fitness == y.mean_fitness);
        assert!(!same_history, "different seeds should explore differently");
    }

    #[test]
    fn test_best_fitness_is_monotone_across_generations() {
        let series = wavy_series(150);
        let budget = OptimizationBudget::generations(12);

        let outcome = optimize_parameters(&series, &small_space(), &budget, 7)
            .expect("optimization runs");

        let mut last = f64::MIN;
        for stats in &outcome.history {
            assert!(
                stats.best_fitness >= last,
                "elitism guarantees non-decreasing best: {} < {}",
                stats.best_fitness,
                last
            );
            last = stats.best_fitness;
        }
        assert_eq!(outcome.best_fitness, last);
    }

    #[test]
    fn test_best_parameters_are_valid_and_in_bounds() {
        let series = wavy_series(100);
        let space = small_space();
        let outcome =
            optimize_parameters(&series, &space, &OptimizationBudget::generations(5), 3)
                .expect("optimization runs");

        let best = &outcome.best_parameters;
        assert!(best.validate().is_ok());
        assert!(best.z_score_threshold >= space.z_score_threshold.min);
        assert!(best.z_score_threshold <= space.z_score_threshold.max);
        assert!(best.lookback_window >= 5 && best.lookback_window <= 20);
    }

    #[test]
    fn test_cancelled_run_returns_last_completed_generation() {
        let series = wavy_series(100);
        let optimizer = EvolutionaryOptimizer::new(&series, small_space(), small_settings())
            .expect("optimizer builds");

        let cancel = AtomicBool::new(true);
        let outcome = optimizer
            .run_cancellable(&OptimizationBudget::generations(50), 11, &cancel)
            .expect("cancelled run still yields a result");

        // Only the seeded generation completed before the flag was seen
        assert_eq!(outcome.generations_completed, 1);
        assert_eq!(outcome.history.len(), 1);
        assert!(outcome.best_parameters.validate().is_ok());
    }

    #[test]
    fn test_short_series_fails_before_searching() {
        let series = wavy_series(8);
        let result = EvolutionaryOptimizer::new(&series, small_space(), small_settings());
        assert!(matches!(
            result,
            Err(BacktestError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_unevaluable_candidates_are_isolated() {
        // Lookbacks up to 90 cannot simulate on 60 observations; those
        // candidates sink with minimal fitness instead of failing the run
        let series = wavy_series(60);
        let space = SearchSpace {
            lookback_window:
                crate::application::optimization::parameter_space::ParameterRange::new(5.0, 90.0),
            ..Default::default()
        };

        let outcome =
            optimize_parameters(&series, &space, &OptimizationBudget::generations(4), 13)
                .expect("search survives failing candidates");

        assert!(outcome.best_fitness > MIN_FITNESS);
        assert!(outcome.best_parameters.lookback_window + MIN_SAMPLES <= 60);
    }

    #[test]
    fn test_generation_numbers_and_phases_are_recorded() {
        let series = wavy_series(100);
        let outcome =
            optimize_parameters(&series, &small_space(), &OptimizationBudget::generations(10), 5)
                .expect("optimization runs");

        assert_eq!(outcome.generations_completed, 10);
        assert_eq!(outcome.history.len(), 10);
        for (i, stats) in outcome.history.iter().enumerate() {
            assert_eq!(stats.generation, i);
            assert!(stats.diversity >= 0.0 && stats.diversity <= 1.0);
            assert!(stats.best_fitness >= stats.mean_fitness - 1e-9);
            assert!(stats.mean_fitness >= stats.worst_fitness - 1e-9);
        }
        assert_eq!(outcome.history[0].phase, OptimizationPhase::Exploration);
        assert!(outcome.confidence >= 0.0 && outcome.confidence <= 1.0);
    }

    #[test]
    fn test_final_population_is_ranked() {
        let series = wavy_series(100);
        let outcome =
            optimize_parameters(&series, &small_space(), &OptimizationBudget::generations(6), 21)
                .expect("optimization runs");

        for pair in outcome.final_population.windows(2) {
            assert!(pair[0].fitness >= pair[1].fitness);
        }
        assert!(
            outcome
                .final_population
                .iter()
                .any(|c| c.lineage == Lineage::Elite),
            "later generations must carry elites"
        );
    }
}
