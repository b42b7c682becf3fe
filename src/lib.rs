//! # comm_eval
//!
//! Scores community detection results: partition quality against the graph
//! (modularity, conductance, normalized cut), agreement with a ground truth
//! (entropy), and correlation of those scores across methods.

pub mod config;
pub mod error;
pub mod graph;
pub mod loader;
pub mod logger;
pub mod metrics;
pub mod node_measures;
pub mod partition;
pub mod report;

pub use error::{EvalError, Result};
pub use graph::{GraphSnapshot, VInt};
pub use metrics::{
    complement_volume, conductance, cut_size, entropy, evaluate_entropy, evaluate_quality, modularity,
    modularity_with_resolution, normalized_cut, volume, EntropyRecord, QualityRecord,
};
pub use node_measures::{CentralityMeasure, NodeMeasureTable};
pub use partition::{group_by_label, Label, Labeling, Partition};
pub use report::{compare_entropy, compare_quality, pearson, ComparisonReport, CorrelationMatrix, MetricRecord};
