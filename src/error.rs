use thiserror::Error;

pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors raised while loading inputs or evaluating partitions.
/// Every variant names the file, partition or method it comes from.
#[derive(Error, Debug)]
pub enum EvalError {
    /// A graph, partition or config file breaks its line/field layout.
    /// `line` is 1-based, 0 when the error is not tied to a line.
    #[error("malformed input {input} (line {line}): {message}")]
    MalformedInput {
        input: String,
        line: usize,
        message: String,
    },

    /// The whole result is undefined, e.g. every community has zero volume.
    #[error("degenerate input for {metric} of {partition}: {reason}")]
    DegenerateInput {
        partition: String,
        metric: &'static str,
        reason: String,
    },

    /// Too few observations to correlate.
    #[error("insufficient data in {context}: {observations} observations, at least {required} required")]
    InsufficientData {
        context: String,
        observations: usize,
        required: usize,
    },

    /// An iterative node measure stopped before converging.
    #[error("{measure} did not converge after {iterations} iterations")]
    Convergence {
        measure: String,
        iterations: usize,
    },

    #[error("cannot read {input}: {error}")]
    Io {
        input: String,
        #[source]
        error: std::io::Error,
    },
}

impl EvalError {
    pub(crate) fn malformed(input: &str, line: usize, message: impl Into<String>) -> EvalError {
        EvalError::MalformedInput {
            input: input.to_owned(),
            line,
            message: message.into(),
        }
    }

    pub(crate) fn degenerate(partition: &str, metric: &'static str, reason: impl Into<String>) -> EvalError {
        EvalError::DegenerateInput {
            partition: partition.to_owned(),
            metric,
            reason: reason.into(),
        }
    }
}
