use std::collections::BTreeMap;

use log::warn;

use crate::config::{ConvergencePolicy, MIN_CORRELATION_OBSERVATIONS};
use crate::error::{EvalError, Result};
use crate::graph::{GraphSnapshot, VInt};
use crate::report::CorrelationMatrix;

/// A per-vertex measure computed outside of this crate, e.g. a centrality
/// from a graph library. Iterative measures report non-convergence as
/// [`EvalError::Convergence`].
pub trait CentralityMeasure {
    fn name(&self) -> &str;

    fn compute(&self, graph: &GraphSnapshot) -> Result<BTreeMap<VInt, f64>>;
}

/// One row per vertex, one column per measure.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMeasureTable {
    vertices: Vec<VInt>,
    columns: Vec<(String, Vec<f64>)>,
}

impl NodeMeasureTable {
    /// Run every measure over `graph`. A vertex missing from a measure's
    /// output gets 0.0. Non-convergence is handled according to `policy`.
    pub fn build(
        graph: &GraphSnapshot,
        measures: &[&dyn CentralityMeasure],
        policy: ConvergencePolicy,
    ) -> Result<NodeMeasureTable> {
        let vertices: Vec<VInt> = graph.nodes().collect();
        let mut columns = Vec::with_capacity(measures.len());
        for measure in measures {
            let values = match measure.compute(graph) {
                Ok(values) => values,
                Err(EvalError::Convergence { measure: name, iterations })
                    if policy == ConvergencePolicy::DefaultToZero => {
                    warn!("{} did not converge after {} iterations, using 0 for every vertex",
                          name, iterations);
                    BTreeMap::new()
                }
                Err(e) => return Err(e),
            };
            let column = vertices.iter()
                .map(|vertex| values.get(vertex).copied().unwrap_or(0.0))
                .collect();
            columns.push((measure.name().to_owned(), column));
        }
        Ok(NodeMeasureTable { vertices, columns })
    }

    pub fn vertices(&self) -> &[VInt] {
        &self.vertices
    }

    pub fn measure_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    /// Value of `measure` at `vertex`.
    pub fn value(&self, vertex: &VInt, measure: &str) -> Option<f64> {
        let row = self.vertices.binary_search(vertex).ok()?;
        self.columns.iter()
            .find(|(name, _)| name == measure)
            .map(|(_, column)| column[row])
    }

    /// Correlate the measures, each vertex being one observation.
    pub fn correlate(&self) -> Result<CorrelationMatrix> {
        if self.vertices.len() < MIN_CORRELATION_OBSERVATIONS {
            return Err(EvalError::InsufficientData {
                context: "node measure table".to_owned(),
                observations: self.vertices.len(),
                required: MIN_CORRELATION_OBSERVATIONS,
            });
        }
        Ok(CorrelationMatrix::from_columns(&self.columns))
    }
}
