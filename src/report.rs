use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use itertools::Itertools;
use log::info;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{EvalConfig, MIN_CORRELATION_OBSERVATIONS};
use crate::error::{EvalError, Result};
use crate::graph::GraphSnapshot;
use crate::metrics::{evaluate_entropy, evaluate_quality, EntropyRecord, QualityRecord};
use crate::partition::{Labeling, Partition};

/// Metric name to value, for one partition or method.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricRecord(BTreeMap<String, f64>);

impl MetricRecord {
    pub fn new() -> MetricRecord {
        MetricRecord(BTreeMap::new())
    }

    pub fn with(mut self, metric: &str, value: f64) -> MetricRecord {
        self.0.insert(metric.to_owned(), value);
        self
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.0.get(metric).copied()
    }

    pub fn metrics(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<QualityRecord> for MetricRecord {
    fn from(record: QualityRecord) -> MetricRecord {
        MetricRecord::new()
            .with("modularity", record.modularity)
            .with("conductance", record.conductance)
            .with("ncut", record.ncut)
    }
}

impl From<EntropyRecord> for MetricRecord {
    fn from(record: EntropyRecord) -> MetricRecord {
        MetricRecord::new().with("entropy", record.entropy)
    }
}

/// Pairwise Pearson correlation between metrics. `None` marks an undefined
/// coefficient (a metric that is constant over every observation).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub metrics: Vec<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.metrics.iter().position(|m| m == a)?;
        let j = self.metrics.iter().position(|m| m == b)?;
        self.values[i][j]
    }

    /// Correlate named columns of equal length, one row per observation.
    pub(crate) fn from_columns(columns: &[(String, Vec<f64>)]) -> CorrelationMatrix {
        let values = columns.iter()
            .map(|(_, xs)| columns.iter().map(|(_, ys)| pearson(xs, ys)).collect())
            .collect();
        CorrelationMatrix {
            metrics: columns.iter().map(|(name, _)| name.clone()).collect(),
            values,
        }
    }
}

impl fmt::Display for CorrelationMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.metrics.iter().map(String::len).max().unwrap_or(0).max(8);
        writeln!(f, "{:width$} {}", "", self.metrics.iter().map(|m| format!("{:>width$}", m)).join(" "))?;
        for (metric, row) in self.metrics.iter().zip(&self.values) {
            let cells = row.iter()
                .map(|value| match value {
                    Some(r) => format!("{:>width$.4}", r),
                    None => format!("{:>width$}", "NaN"),
                })
                .join(" ");
            writeln!(f, "{:width$} {}", metric, cells)?;
        }
        Ok(())
    }
}

/// Pearson correlation coefficient, `None` when undefined.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < MIN_CORRELATION_OBSERVATIONS {
        return None;
    }
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let (mut cov, mut var_x, mut var_y) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// Metric records of several methods, kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonReport {
    results: Vec<(String, MetricRecord)>,
}

impl ComparisonReport {
    pub fn new() -> ComparisonReport {
        ComparisonReport::default()
    }

    /// Record the metrics of `method`, replacing an earlier record of the same name.
    pub fn add_result(&mut self, method: impl Into<String>, record: impl Into<MetricRecord>) {
        let method = method.into();
        let record = record.into();
        match self.results.iter_mut().find(|(name, _)| *name == method) {
            Some(entry) => entry.1 = record,
            None => self.results.push((method, record)),
        }
    }

    pub fn results(&self) -> &[(String, MetricRecord)] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Metric names present in every record, sorted.
    pub fn shared_metrics(&self) -> Vec<String> {
        let mut records = self.results.iter().map(|(_, record)| record);
        let first: BTreeSet<&str> = match records.next() {
            None => return vec![],
            Some(record) => record.metrics().collect(),
        };
        records
            .fold(first, |shared, record| {
                let names: BTreeSet<&str> = record.metrics().collect();
                shared.intersection(&names).copied().collect()
            })
            .into_iter()
            .map(str::to_owned)
            .collect()
    }

    /// Correlate metrics across methods, one observation per method.
    pub fn correlate(&self) -> Result<CorrelationMatrix> {
        if self.results.len() < MIN_CORRELATION_OBSERVATIONS {
            return Err(EvalError::InsufficientData {
                context: format!("comparison of [{}]", self.results.iter().map(|(m, _)| m).join(", ")),
                observations: self.results.len(),
                required: MIN_CORRELATION_OBSERVATIONS,
            });
        }
        let columns: Vec<(String, Vec<f64>)> = self.shared_metrics()
            .into_iter()
            .map(|metric| {
                let column = self.results.iter()
                    .filter_map(|(_, record)| record.get(&metric))
                    .collect();
                (metric, column)
            })
            .collect();
        Ok(CorrelationMatrix::from_columns(&columns))
    }

    /// Read a `{method: {metric: value}}` JSON object.
    pub fn from_json(text: &str, source: &str) -> Result<ComparisonReport> {
        let parsed: BTreeMap<String, MetricRecord> = serde_json::from_str(text)
            .map_err(|e| EvalError::malformed(source, e.line(), e.to_string()))?;
        let mut report = ComparisonReport::new();
        for (method, record) in parsed {
            report.add_result(method, record);
        }
        Ok(report)
    }

    /// Write the records as a `{method: {metric: value}}` JSON object.
    pub fn to_json(&self) -> String {
        let map: BTreeMap<&str, &MetricRecord> = self.results
            .iter()
            .map(|(method, record)| (method.as_str(), record))
            .collect();
        // A map of string keys to finite or NaN floats always serializes.
        serde_json::to_string_pretty(&map).unwrap_or_default()
    }
}

impl fmt::Display for ComparisonReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (method, record) in &self.results {
            writeln!(f, "Results for {}:", method)?;
            for (metric, value) in &record.0 {
                writeln!(f, "  {}: {}", metric, value)?;
            }
        }
        Ok(())
    }
}

/// Score every partition against `graph`, in input order.
pub fn compare_quality(
    graph: &GraphSnapshot,
    partitions: &[(String, Partition)],
    config: &EvalConfig,
) -> Result<ComparisonReport> {
    info!("Evaluating {} partitions (parallel: {})", partitions.len(), config.parallel);
    let evaluate = |(name, partition): &(String, Partition)| {
        evaluate_quality(graph, name, partition, config.resolution)
    };
    let records: Vec<QualityRecord> = if config.parallel {
        partitions.par_iter().map(evaluate).collect::<Result<Vec<_>>>()?
    } else {
        partitions.iter().map(evaluate).collect::<Result<Vec<_>>>()?
    };
    let mut report = ComparisonReport::new();
    for ((name, _), record) in partitions.iter().zip(records) {
        report.add_result(name.clone(), record);
    }
    Ok(report)
}

/// Score every detected labeling against the ground truth, in input order.
pub fn compare_entropy(
    graph: &GraphSnapshot,
    truth: &Labeling,
    labelings: &[(String, Labeling)],
    config: &EvalConfig,
) -> ComparisonReport {
    info!("Evaluating entropy of {} labelings (parallel: {})", labelings.len(), config.parallel);
    let evaluate = |(name, detected): &(String, Labeling)| evaluate_entropy(graph, name, detected, truth);
    let records: Vec<EntropyRecord> = if config.parallel {
        labelings.par_iter().map(evaluate).collect()
    } else {
        labelings.iter().map(evaluate).collect()
    };
    let mut report = ComparisonReport::new();
    for ((name, _), record) in labelings.iter().zip(records) {
        report.add_result(name.clone(), record);
    }
    report
}
