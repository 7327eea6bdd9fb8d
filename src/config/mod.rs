//! Configuration for the optimizer binaries.
//!
//! Everything has a sensible default; a TOML file overrides whichever keys
//! it names. Strategy parameter bounds live in the `[search_space]` table,
//! fitness weights in `[fitness]`.

use crate::application::optimization::fitness::FitnessWeights;
use crate::application::optimization::optimizer::OptimizerSettings;
use crate::application::optimization::parameter_space::SearchSpace;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizeConfig {
    pub population_size: usize,
    pub elite_count: usize,
    pub tournament_size: usize,
    pub blend_alpha: f64,
    pub generations: usize,
    pub seed: u64,
    /// Starting portfolio value in units of B for every fitness backtest.
    pub initial_value: f64,
    pub search_space: SearchSpace,
    pub fitness: FitnessWeights,
}

impl Default for OptimizeConfig {
    fn default() -> Self {
        Self {
            population_size: 32,
            elite_count: 4,
            tournament_size: 3,
            blend_alpha: 0.25,
            generations: 40,
            seed: 42,
            initial_value: 10_000.0,
            search_space: SearchSpace::default(),
            fitness: FitnessWeights::default(),
        }
    }
}

impl OptimizeConfig {
    /// Loads configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {:?}", path))?;
        let config: OptimizeConfig =
            toml::from_str(&content).context(format!("Failed to parse config TOML: {:?}", path))?;
        Ok(config)
    }

    /// Engine settings derived from this configuration.
    pub fn optimizer_settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            population_size: self.population_size,
            elite_count: self.elite_count,
            tournament_size: self.tournament_size,
            blend_alpha: self.blend_alpha,
            weights: self.fitness.clone(),
            initial_value: Decimal::from_f64_retain(self.initial_value)
                .unwrap_or_else(|| Decimal::from(10_000)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_round_trip_through_toml() {
        let config = OptimizeConfig::default();
        let serialized = toml::to_string(&config).expect("config serializes");
        let parsed: OptimizeConfig = toml::from_str(&serialized).expect("config parses");

        assert_eq!(parsed.population_size, config.population_size);
        assert_eq!(parsed.search_space, config.search_space);
        assert_eq!(parsed.fitness, config.fitness);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: OptimizeConfig =
            toml::from_str("generations = 12\nseed = 7\n").expect("partial config parses");

        assert_eq!(parsed.generations, 12);
        assert_eq!(parsed.seed, 7);
        assert_eq!(parsed.population_size, OptimizeConfig::default().population_size);
    }

    #[test]
    fn test_load_from_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("pairbal_config_{}.toml", std::process::id()));
        let mut file = std::fs::File::create(&path).expect("temp file");
        file.write_all(b"population_size = 16\n\n[search_space.lookback_window]\nmin = 10.0\nmax = 30.0\n")
            .expect("write config");

        let config = OptimizeConfig::load(&path).expect("config loads");
        assert_eq!(config.population_size, 16);
        assert_eq!(config.search_space.lookback_window.min, 10.0);
        assert_eq!(config.search_space.lookback_window.max, 30.0);

        std::fs::remove_file(path).ok();
    }
}
