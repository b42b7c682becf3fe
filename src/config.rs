use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

pub(crate) const READ_BUFFER_SIZE :usize = 16 * 1024 * 1024;

pub const DEFAULT_LOG_DIR :&str = "logs";

pub const DEFAULT_RESOLUTION :f64 = 1.0;

/// Correlation needs at least two observations per metric.
pub const MIN_CORRELATION_OBSERVATIONS :usize = 2;

/// What to do when an external node measure fails to converge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvergencePolicy {
    /// Surface the convergence error to the caller.
    #[default]
    Fail,
    /// Replace the measure by zero for every node and keep going.
    DefaultToZero,
}

/// Options of one evaluation run, usually read from a YAML file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    pub log_dir: String, // Where `default.log` is written.
    pub resolution: f64, // Modularity resolution.
    /// Passed by library callers to [`crate::node_measures::NodeMeasureTable::build`];
    /// the command line computes no node measures.
    pub convergence_policy: ConvergencePolicy,
    pub parallel: bool, // Evaluate partitions on the rayon pool.
    pub directed: bool, // Build directed graphs from edge lists.
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            log_dir: DEFAULT_LOG_DIR.to_owned(),
            resolution: DEFAULT_RESOLUTION,
            convergence_policy: ConvergencePolicy::default(),
            parallel: true,
            directed: false,
        }
    }
}

impl EvalConfig {
    /// Parse a configuration from YAML text, `source` names it in errors.
    pub fn from_yaml_str(text: &str, source: &str) -> Result<EvalConfig> {
        let config: EvalConfig = serde_yaml::from_str(text).map_err(|e| EvalError::MalformedInput {
            input: source.to_owned(),
            line: e.location().map(|loc| loc.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        config.validate(source)?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<EvalConfig> {
        let path = path.as_ref();
        let source = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|error| EvalError::Io {
            input: source.clone(),
            error,
        })?;
        EvalConfig::from_yaml_str(&text, &source)
    }

    /// Check the values, `source` names where they came from. Run again
    /// after overriding fields.
    pub fn validate(&self, source: &str) -> Result<()> {
        if !self.resolution.is_finite() || self.resolution < 0.0 {
            return Err(EvalError::MalformedInput {
                input: source.to_owned(),
                line: 0,
                message: format!("resolution must be a finite non-negative number, got {}", self.resolution),
            });
        }
        Ok(())
    }
}
