//! # Oracle Search — Randomized Configuration Hunt
//!
//! Sample random gate configurations, score each one over the whole 8-bit
//! input domain and stop at the first configuration whose hit count falls
//! strictly inside the acceptance band.
//!
//! ## Key Properties
//!
//! - **Deterministic**: same config + same seed = same outcome (ChaCha20 RNG)
//! - **Sequential**: one candidate per iteration, in order
//! - **Exhaustion is an outcome**: running out of iterations reports the
//!   lowest hit count seen instead of failing
//!
//! ## Example
//!
//! ```rust
//! use gate_oracle::search::{run, SearchConfig};
//!
//! let config = SearchConfig {
//!     max_iterations: 1000,
//!     seed: Some(42),
//!     ..SearchConfig::default()
//! };
//!
//! let first = run(&config).unwrap();
//! let second = run(&config).unwrap();
//! assert_eq!(first.outcome, second.outcome);
//! ```

use crate::oracle_ir::{random_configuration, Configuration, Operation};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tracing::{debug, info};

/// Bits 5, 6 and 7 of the register.
pub const HIGH_BITS_MASK: u8 = 0b1110_0000;

pub const DEFAULT_MAX_ITERATIONS: usize = 400_000;
pub const DEFAULT_CONFIGURATION_LENGTH: usize = 4;

/// Which outputs count as a hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HitRule {
    /// Output has at least one masked bit set
    #[default]
    AnyHighBitSet,
    /// Output has every masked bit clear
    HighBitsClear,
}

impl HitRule {
    /// Parse a rule from its CLI name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "any-set" | "any_high_bit_set" => Some(HitRule::AnyHighBitSet),
            "clear" | "high_bits_clear" => Some(HitRule::HighBitsClear),
            _ => None,
        }
    }

    /// Get canonical string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            HitRule::AnyHighBitSet => "any-set",
            HitRule::HighBitsClear => "clear",
        }
    }

    pub fn is_hit(self, output: u8, mask: u8) -> bool {
        match self {
            HitRule::AnyHighBitSet => output & mask != 0,
            HitRule::HighBitsClear => output & mask == 0,
        }
    }
}

/// Count the inputs in `0..=255` whose output is a hit.
pub fn hit_count(configuration: &Configuration, rule: HitRule, mask: u8) -> u32 {
    (0..=u8::MAX)
        .filter(|&input| rule.is_hit(configuration.evaluate(input), mask))
        .count() as u32
}

/// Open interval `(lower, upper)` of accepted hit counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceBand {
    /// Exclusive lower bound
    pub lower: u32,
    /// Exclusive upper bound
    pub upper: u32,
}

impl Default for AcceptanceBand {
    fn default() -> Self {
        AcceptanceBand { lower: 1, upper: 8 }
    }
}

impl AcceptanceBand {
    pub fn accepts(&self, hits: u32) -> bool {
        self.lower < hits && hits < self.upper
    }

    /// True when no hit count can satisfy the band.
    pub fn is_empty(&self) -> bool {
        self.upper <= self.lower.saturating_add(1)
    }
}

/// Configuration for a search run.
///
/// Missing fields in a JSON config file take the defaults: 400000
/// iterations, 4 gates, band (1, 8), all four operations, any masked bit set
/// counts as a hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Candidates to try before giving up
    pub max_iterations: usize,
    /// Gates per candidate
    pub configuration_length: usize,
    /// Accepted hit counts
    pub band: AcceptanceBand,
    /// Operations the generator may draw from
    pub operations: Vec<Operation>,
    pub hit_rule: HitRule,
    pub hit_mask: u8,
    /// RNG seed; a time-based seed is used when absent
    pub seed: Option<u64>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            configuration_length: DEFAULT_CONFIGURATION_LENGTH,
            band: AcceptanceBand::default(),
            operations: Operation::ALL.to_vec(),
            hit_rule: HitRule::default(),
            hit_mask: HIGH_BITS_MASK,
            seed: None,
        }
    }
}

/// Errors that reject a search before it starts.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("operation set is empty")]
    NoOperations,
    #[error("acceptance band ({lower}, {upper}) admits no hit count")]
    EmptyBand { lower: u32, upper: u32 },
    #[error("failed to read search config {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid search config {path}: {source}")]
    ConfigFormat {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl SearchConfig {
    pub fn validate(&self) -> Result<(), SearchError> {
        if self.operations.is_empty() {
            return Err(SearchError::NoOperations);
        }
        if self.band.is_empty() {
            return Err(SearchError::EmptyBand {
                lower: self.band.lower,
                upper: self.band.upper,
            });
        }
        Ok(())
    }

    /// Load a config from a JSON file. The result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SearchError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SearchError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        let config: SearchConfig =
            serde_json::from_str(&text).map_err(|source| SearchError::ConfigFormat {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }
}

/// A configuration together with its hit count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoredConfiguration {
    pub configuration: Configuration,
    pub hits: u32,
}

/// How a search ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SearchOutcome {
    /// A candidate landed inside the band
    Accepted {
        best: ScoredConfiguration,
        /// Candidates evaluated, including the accepted one
        iterations: usize,
        lowest_hits: u32,
    },
    /// The iteration budget ran out
    Exhausted {
        iterations: usize,
        /// `None` only when no candidate was evaluated
        lowest_hits: Option<u32>,
        /// First candidate that reached `lowest_hits`
        best: Option<ScoredConfiguration>,
    },
}

impl SearchOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, SearchOutcome::Accepted { .. })
    }

    pub fn lowest_hits(&self) -> Option<u32> {
        match self {
            SearchOutcome::Accepted { lowest_hits, .. } => Some(*lowest_hits),
            SearchOutcome::Exhausted { lowest_hits, .. } => *lowest_hits,
        }
    }

    pub fn best(&self) -> Option<&ScoredConfiguration> {
        match self {
            SearchOutcome::Accepted { best, .. } => Some(best),
            SearchOutcome::Exhausted { best, .. } => best.as_ref(),
        }
    }

    pub fn iterations(&self) -> usize {
        match self {
            SearchOutcome::Accepted { iterations, .. } | SearchOutcome::Exhausted { iterations, .. } => {
                *iterations
            }
        }
    }
}

/// A finished run and the seed that reproduces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRun {
    pub seed: u64,
    pub outcome: SearchOutcome,
}

/// Run the search loop with the caller's RNG.
pub fn search<R: Rng>(config: &SearchConfig, rng: &mut R) -> Result<SearchOutcome, SearchError> {
    config.validate()?;
    let mut best: Option<ScoredConfiguration> = None;

    for iteration in 0..config.max_iterations {
        let candidate =
            random_configuration(rng, config.configuration_length, &config.operations);
        let hits = hit_count(&candidate, config.hit_rule, config.hit_mask);

        if config.band.accepts(hits) {
            let lowest_hits = best.as_ref().map_or(hits, |b| b.hits.min(hits));
            info!(
                iteration,
                hits,
                lowest_hits,
                config_hash = %candidate.hash(),
                "configuration accepted"
            );
            return Ok(SearchOutcome::Accepted {
                best: ScoredConfiguration {
                    configuration: candidate,
                    hits,
                },
                iterations: iteration + 1,
                lowest_hits,
            });
        }

        if best.as_ref().map_or(true, |b| hits < b.hits) {
            debug!(
                iteration,
                hits,
                config_hash = %candidate.hash(),
                configuration = %candidate,
                "new lowest hit count"
            );
            best = Some(ScoredConfiguration {
                configuration: candidate,
                hits,
            });
        }
    }

    let lowest_hits = best.as_ref().map(|b| b.hits);
    info!(
        iterations = config.max_iterations,
        lowest_hits = ?lowest_hits,
        "search exhausted without an accepted configuration"
    );
    Ok(SearchOutcome::Exhausted {
        iterations: config.max_iterations,
        lowest_hits,
        best,
    })
}

/// Seed a ChaCha20 RNG from the config (or the clock) and run the search.
pub fn run(config: &SearchConfig) -> Result<SearchRun, SearchError> {
    let seed = config.seed.unwrap_or_else(time_seed);
    debug!(seed, "seeding search rng");
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let outcome = search(config, &mut rng)?;
    Ok(SearchRun { seed, outcome })
}

fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}
