//! Partition quality and agreement metrics.
//!
//! Every function reads the graph and the partition without mutating them,
//! so calls can be repeated or run side by side on the same snapshot.
//!
//! Conventions shared by all metrics:
//!
//! - `cut_size` counts each crossing edge once: the sum, over vertices of the
//!   community, of neighbors (successors when directed) outside of it.
//! - `volume` is the sum of degrees, so `2m` is [`GraphSnapshot::total_degree`].
//!   A self-loop adds 2 to its vertex's degree and counts as one internal edge.
//! - Vertices that are not in the graph have no neighbors and zero degree,
//!   they contribute nothing to any metric. This is the same as intersecting
//!   each community with the graph's vertex set first.
//! - Communities that share vertices are scored independently of each other;
//!   modularity then counts a shared vertex once per community it belongs to.
//! - Conductance is `cut / min(vol(S), 2m - vol(S))`.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};
use crate::graph::{GraphSnapshot, VInt};
use crate::partition::{Label, Labeling, Partition};

/// Quality of one partition against the graph structure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityRecord {
    pub modularity: f64,
    pub conductance: f64,
    pub ncut: f64,
}

/// Agreement of one detected labeling with the ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntropyRecord {
    pub entropy: f64,
}

/// Number of edges leaving `community`.
pub fn cut_size(graph: &GraphSnapshot, community: &BTreeSet<VInt>) -> usize {
    community.iter()
        .map(|vertex| {
            graph.neighbors(vertex)
                .iter()
                .filter(|neighbor| !community.contains(neighbor))
                .count()
        })
        .sum()
}

/// Sum of the degrees of the vertices in `community`.
pub fn volume(graph: &GraphSnapshot, community: &BTreeSet<VInt>) -> usize {
    community.iter().map(|vertex| graph.degree(vertex)).sum()
}

/// Volume of every graph vertex outside of `community`.
pub fn complement_volume(graph: &GraphSnapshot, community: &BTreeSet<VInt>) -> usize {
    // Vertices missing from the graph have degree 0, so the subtraction is exact.
    graph.total_degree() - volume(graph, community)
}

/// Mean conductance over the communities with positive volume.
///
/// A community whose complement has zero volume has no cut either and scores 0.
/// Fails when no community has positive volume.
pub fn conductance(graph: &GraphSnapshot, partition: &Partition, name: &str) -> Result<f64> {
    let total_degree = graph.total_degree();
    let mut values = Vec::with_capacity(partition.len());
    for (index, community) in partition.communities().iter().enumerate() {
        let vol = volume(graph, community);
        if vol == 0 {
            debug!("{}: community {} has zero volume, no conductance", name, index);
            continue;
        }
        let cut = cut_size(graph, community);
        let denominator = vol.min(total_degree - vol);
        values.push(if denominator == 0 { 0.0 } else { cut as f64 / denominator as f64 });
    }
    mean(&values).ok_or_else(|| {
        EvalError::degenerate(name, "conductance", "no community has positive volume")
    })
}

/// Sum of `cut/vol(S) + cut/vol(V \ S)` divided by the number of communities.
///
/// A community with zero volume, or whose complement has zero volume, adds
/// nothing to the sum but still counts in the divisor. A single community
/// covering the graph therefore scores 0. Fails when no community has
/// positive volume.
pub fn normalized_cut(graph: &GraphSnapshot, partition: &Partition, name: &str) -> Result<f64> {
    let total_degree = graph.total_degree();
    let mut total = 0.0f64;
    let mut has_volume = false;
    for (index, community) in partition.communities().iter().enumerate() {
        let vol = volume(graph, community);
        let complement_vol = total_degree - vol;
        has_volume |= vol > 0;
        if vol == 0 || complement_vol == 0 {
            debug!("{}: community {} (volume {}, complement volume {}) adds 0 to ncut",
                   name, index, vol, complement_vol);
            continue;
        }
        let cut = cut_size(graph, community) as f64;
        total += cut / vol as f64 + cut / complement_vol as f64;
    }
    if !has_volume {
        return Err(EvalError::degenerate(name, "ncut", "no community has positive volume"));
    }
    Ok(total / partition.len() as f64)
}

/// Newman modularity with resolution 1.
pub fn modularity(graph: &GraphSnapshot, partition: &Partition, name: &str) -> Result<f64> {
    modularity_with_resolution(graph, partition, 1.0, name)
}

/// Modularity with a resolution parameter `gamma`.
///
/// Undirected: `sum_c L_c / m - gamma * (vol_c / 2m)^2` where `L_c` counts
/// internal edges. Directed: `sum_c L_c / m - gamma * out_c * in_c / m^2`.
/// A graph without edges has no modularity.
pub fn modularity_with_resolution(
    graph: &GraphSnapshot,
    partition: &Partition,
    gamma: f64,
    name: &str,
) -> Result<f64> {
    if graph.edge_count() == 0 {
        return Err(EvalError::degenerate(name, "modularity", "graph has no edges"));
    }

    // Edge endpoints inside the community. Undirected self-loops have both
    // endpoints in a single adjacency entry.
    let loop_weight = if graph.is_directed() { 1 } else { 2 };
    let internal = |community: &BTreeSet<VInt>| -> f64 {
        community.iter()
            .map(|vertex| {
                graph.neighbors(vertex)
                    .iter()
                    .filter(|neighbor| community.contains(neighbor))
                    .map(|neighbor| if neighbor == vertex { loop_weight } else { 1 })
                    .sum::<usize>()
            })
            .sum::<usize>() as f64
    };

    let q = if graph.is_directed() {
        let m = graph.edge_count() as f64;
        partition.communities().iter().fold(0.0f64, |q, community| {
            let out_c: usize = community.iter().map(|vertex| graph.out_degree(vertex)).sum();
            let in_c: usize = community.iter().map(|vertex| graph.in_degree(vertex)).sum();
            q + internal(community) / m - gamma * (out_c as f64 * in_c as f64) / (m * m)
        })
    } else {
        // Each internal edge is seen from both ends, hence the 2m normaliser.
        let two_m = graph.total_degree() as f64;
        partition.communities().iter().fold(0.0f64, |q, community| {
            let vol = volume(graph, community) as f64;
            q + internal(community) / two_m - gamma * (vol / two_m).powi(2)
        })
    };
    Ok(q)
}

/// Mean Shannon entropy (bits) of the detected labels inside each
/// ground-truth group.
///
/// Only vertices present in the graph and in both labelings are counted.
/// Groups left without any such vertex are skipped; when no group remains the
/// result is 0.0.
pub fn entropy(graph: &GraphSnapshot, detected: &Labeling, truth: &Labeling) -> f64 {
    let mut group_counts: BTreeMap<Label, BTreeMap<Label, usize>> = BTreeMap::new();
    for (vertex, truth_label) in truth {
        if !graph.has_node(vertex) {
            continue;
        }
        if let Some(detected_label) = detected.get(vertex) {
            *group_counts.entry(*truth_label)
                .or_insert_with(BTreeMap::new)
                .entry(*detected_label)
                .or_insert(0) += 1;
        }
    }

    let truth_groups = truth.values().collect::<BTreeSet<_>>().len();
    if group_counts.len() < truth_groups {
        warn!("{} of {} ground-truth groups have no vertex in the graph and the detected labeling, skipped",
              truth_groups - group_counts.len(), truth_groups);
    }

    let values: Vec<f64> = group_counts.values()
        .map(|detected_counts| {
            let total = detected_counts.values().sum::<usize>() as f64;
            detected_counts.values().fold(0.0f64, |h, count| {
                let p = *count as f64 / total;
                h + p * -p.log2()
            })
        })
        .collect();
    mean(&values).unwrap_or(0.0)
}

/// Compute modularity, conductance and ncut of one partition.
pub fn evaluate_quality(
    graph: &GraphSnapshot,
    name: &str,
    partition: &Partition,
    resolution: f64,
) -> Result<QualityRecord> {
    let filtered = partition.restrict_to(graph, name);
    if !filtered.is_disjoint() {
        warn!("{}: communities overlap, every membership is scored separately", name);
    }
    let record = QualityRecord {
        modularity: modularity_with_resolution(graph, &filtered, resolution, name)?,
        conductance: conductance(graph, &filtered, name)?,
        ncut: normalized_cut(graph, &filtered, name)?,
    };
    info!("{}: {} communities, modularity {:.6}, conductance {:.6}, ncut {:.6}",
          name, filtered.len(), record.modularity, record.conductance, record.ncut);
    Ok(record)
}

/// Compute the ground-truth entropy of one detected labeling.
pub fn evaluate_entropy(
    graph: &GraphSnapshot,
    name: &str,
    detected: &Labeling,
    truth: &Labeling,
) -> EntropyRecord {
    let record = EntropyRecord {
        entropy: entropy(graph, detected, truth),
    };
    info!("{}: entropy {:.6}", name, record.entropy);
    record
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().fold(0.0f64, |acc, v| acc + v) / values.len() as f64)
    }
}

#[cfg(test)]
mod test_metrics {
    use std::collections::BTreeSet;

    use crate::error::EvalError;
    use crate::graph::GraphSnapshot;
    use crate::metrics::{complement_volume, conductance, cut_size, entropy, evaluate_quality,
                         modularity, modularity_with_resolution, normalized_cut, volume};
    use crate::partition::{group_by_label, Labeling, Partition};

    const EPS: f64 = 1e-9;

    fn path_graph() -> GraphSnapshot {
        GraphSnapshot::from_edges(vec![(1, 2), (2, 3), (3, 4)], false)
    }

    fn two_triangles() -> GraphSnapshot {
        // a - b ---- d - e
        //  \  |       \  |
        //     c          f
        GraphSnapshot::from_edges(
            vec![(1, 2), (2, 3), (3, 1), (4, 2), (4, 5), (5, 6), (6, 4)], false)
    }

    fn labeling(pairs: &[(u32, u32)]) -> Labeling {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_path_cut_and_volume() {
        let g = path_graph();
        let left = BTreeSet::from([1, 2]);
        assert_eq!(cut_size(&g, &left), 1);
        assert_eq!(volume(&g, &left), 3);
        assert_eq!(complement_volume(&g, &left), 3);
    }

    #[test]
    fn test_path_conductance() {
        let g = path_graph();
        let partition = Partition::from_communities(vec![vec![1, 2], vec![3, 4]]);
        let value = conductance(&g, &partition, "path").unwrap();
        assert!((value - 1.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_path_ncut() {
        let g = path_graph();
        let partition = Partition::from_communities(vec![vec![1, 2], vec![3, 4]]);
        // 1/3 + 1/3 for each side.
        let value = normalized_cut(&g, &partition, "path").unwrap();
        assert!((value - 2.0 / 3.0).abs() < EPS);
    }

    #[test]
    fn test_whole_graph_community() {
        let g = two_triangles();
        let whole: BTreeSet<u32> = g.nodes().collect();
        assert_eq!(cut_size(&g, &whole), 0);
        let partition = Partition::from_communities(vec![whole]);
        assert_eq!(conductance(&g, &partition, "whole").unwrap(), 0.0);
        // The only community has an empty complement and adds nothing.
        assert_eq!(normalized_cut(&g, &partition, "whole").unwrap(), 0.0);

        let record = evaluate_quality(&g, "whole", &partition, 1.0).unwrap();
        assert!(record.modularity.abs() < EPS);
        assert_eq!(record.conductance, 0.0);
        assert_eq!(record.ncut, 0.0);
    }

    #[test]
    fn test_singletons() {
        let g = two_triangles();
        let partition = Partition::from_communities(g.nodes().map(|v| vec![v]));
        for community in partition.communities() {
            let vertex = community.iter().next().unwrap();
            assert_eq!(volume(&g, community), g.degree(vertex));
            assert_eq!(cut_size(&g, community), g.degree(vertex));
        }
        // Every singleton has cut == volume.
        assert!((conductance(&g, &partition, "singletons").unwrap() - 1.0).abs() < EPS);
    }

    #[test]
    fn test_zero_volume_skipped() {
        let mut g = path_graph();
        g.insert_vertex(10);
        let partition = Partition::from_communities(vec![vec![1, 2], vec![3, 4], vec![10]]);
        let value = conductance(&g, &partition, "isolated").unwrap();
        assert!((value - 1.0 / 3.0).abs() < EPS);
        // The isolated community adds 0 but still counts: (2/3 + 2/3) / 3.
        let value = normalized_cut(&g, &partition, "isolated").unwrap();
        assert!((value - 4.0 / 9.0).abs() < EPS);
    }

    #[test]
    fn test_self_loop_normaliser() {
        // A loop on 1 plus the edge 1-2: m = 2, deg(1) = 3, deg(2) = 1.
        let g = GraphSnapshot::from_edges(vec![(1, 1), (1, 2)], false);
        assert_eq!(g.total_degree(), 4);
        let singletons = Partition::from_communities(vec![vec![1], vec![2]]);
        // (2/4 - (3/4)^2) + (0 - (1/4)^2)
        let q = modularity(&g, &singletons, "loop").unwrap();
        assert!((q + 0.125).abs() < EPS);

        let one = BTreeSet::from([1]);
        assert_eq!(volume(&g, &one), 3);
        assert_eq!(cut_size(&g, &one), 1);
        assert_eq!(complement_volume(&g, &one), 1);
        // min(3, 4 - 3) = 1 for {1}, min(1, 3) = 1 for {2}.
        assert!((conductance(&g, &singletons, "loop").unwrap() - 1.0).abs() < EPS);
        // (1/3 + 1/1) for both communities, averaged.
        assert!((normalized_cut(&g, &singletons, "loop").unwrap() - 4.0 / 3.0).abs() < EPS);

        // Everything in one community: the loop is an internal edge.
        let whole = Partition::from_communities(vec![vec![1, 2]]);
        assert!(modularity(&g, &whole, "whole").unwrap().abs() < EPS);
    }

    #[test]
    fn test_all_zero_volume_is_degenerate() {
        let mut g = path_graph();
        g.insert_vertex(10);
        g.insert_vertex(11);
        let partition = Partition::from_communities(vec![vec![10], vec![11, 12]]);
        assert!(matches!(conductance(&g, &partition, "p"),
                         Err(EvalError::DegenerateInput { metric: "conductance", .. })));
        assert!(matches!(normalized_cut(&g, &partition, "p"),
                         Err(EvalError::DegenerateInput { metric: "ncut", .. })));
    }

    #[test]
    fn test_foreign_vertices_ignored() {
        let g = path_graph();
        let clean = Partition::from_communities(vec![vec![1, 2], vec![3, 4]]);
        let noisy = Partition::from_communities(vec![vec![1, 2, 100], vec![3, 4, 200, 201]]);
        assert_eq!(conductance(&g, &clean, "clean").unwrap(), conductance(&g, &noisy, "noisy").unwrap());
        assert_eq!(normalized_cut(&g, &clean, "clean").unwrap(), normalized_cut(&g, &noisy, "noisy").unwrap());
        assert_eq!(modularity(&g, &clean, "clean").unwrap(), modularity(&g, &noisy, "noisy").unwrap());
    }

    #[test]
    fn test_modularity_two_triangles() {
        let g = two_triangles();
        let partition = Partition::from_communities(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        let q = modularity(&g, &partition, "triangles").unwrap();
        assert!((q - 0.3571428571428571).abs() < EPS);

        // One community holding everything scores 0.
        let whole = Partition::from_communities(vec![g.nodes().collect::<Vec<_>>()]);
        assert!(modularity(&g, &whole, "whole").unwrap().abs() < EPS);
    }

    #[test]
    fn test_modularity_resolution() {
        let g = two_triangles();
        let partition = Partition::from_communities(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        // 2 * (6/14 - 0.5 * (7/14)^2)
        let q = modularity_with_resolution(&g, &partition, 0.5, "triangles").unwrap();
        assert!((q - (12.0 / 14.0 - 0.25)).abs() < EPS);
    }

    #[test]
    fn test_modularity_relabel_invariant() {
        let g = two_triangles();
        let a = group_by_label(&labeling(&[(1, 0), (2, 0), (3, 0), (4, 1), (5, 1), (6, 1)]));
        let b = group_by_label(&labeling(&[(1, 9), (2, 9), (3, 9), (4, 2), (5, 2), (6, 2)]));
        assert_eq!(modularity(&g, &a, "a").unwrap(), modularity(&g, &b, "b").unwrap());
    }

    #[test]
    fn test_modularity_directed() {
        // 1 -> 2 -> 3 -> 1 and 4 -> 5 -> 6 -> 4 joined by 3 -> 4.
        let g = GraphSnapshot::from_edges(
            vec![(1, 2), (2, 3), (3, 1), (4, 5), (5, 6), (6, 4), (3, 4)], true);
        let partition = Partition::from_communities(vec![vec![1, 2, 3], vec![4, 5, 6]]);
        // L_c = 3 each, out = (4, 3), in = (3, 4), m = 7.
        let expected = 6.0 / 7.0 - 2.0 * 12.0 / 49.0;
        let q = modularity(&g, &partition, "directed").unwrap();
        assert!((q - expected).abs() < EPS);
    }

    #[test]
    fn test_modularity_without_edges() {
        let mut g = GraphSnapshot::new(false);
        g.insert_vertex(1);
        let partition = Partition::from_communities(vec![vec![1]]);
        assert!(matches!(modularity(&g, &partition, "empty"),
                         Err(EvalError::DegenerateInput { metric: "modularity", .. })));
    }

    #[test]
    fn test_overlap_does_not_panic() {
        let g = path_graph();
        let partition = Partition::from_communities(vec![vec![1, 2, 3], vec![3, 4]]);
        let record = evaluate_quality(&g, "overlap", &partition, 1.0).unwrap();
        assert!(record.modularity.is_finite());
        assert!(record.conductance.is_finite());
        assert!(record.ncut.is_finite());
    }

    #[test]
    fn test_entropy_perfect_agreement() {
        let g = path_graph();
        let truth = labeling(&[(1, 0), (2, 0), (3, 1), (4, 1)]);
        let detected = labeling(&[(1, 10), (2, 10), (3, 11), (4, 11)]);
        let h = entropy(&g, &detected, &truth);
        assert_eq!(h, 0.0);
        assert!(h.is_sign_positive());
    }

    #[test]
    fn test_entropy_even_split() {
        let g = path_graph();
        let truth = labeling(&[(1, 0), (2, 0), (3, 1), (4, 1)]);
        let detected = labeling(&[(1, 10), (2, 11), (3, 10), (4, 11)]);
        assert!((entropy(&g, &detected, &truth) - 1.0).abs() < EPS);
    }

    #[test]
    fn test_entropy_log2_k() {
        let g = GraphSnapshot::from_edges((1..6).map(|v| (v, v + 1)), false);
        let truth = labeling(&[(1, 0), (2, 0), (3, 0), (4, 0), (5, 0), (6, 0)]);
        let detected = labeling(&[(1, 1), (2, 1), (3, 2), (4, 2), (5, 3), (6, 3)]);
        assert!((entropy(&g, &detected, &truth) - 3f64.log2()).abs() < EPS);
    }

    #[test]
    fn test_entropy_filters_and_skips_groups() {
        let g = path_graph();
        // Group 2 only has vertices outside the graph; vertex 4 lacks a detected label.
        let truth = labeling(&[(1, 0), (2, 0), (3, 1), (4, 1), (50, 2), (51, 2)]);
        let detected = labeling(&[(1, 7), (2, 8), (3, 7), (50, 1)]);
        // Group 0 is split 50/50, group 1 holds only vertex 3.
        assert!((entropy(&g, &detected, &truth) - 0.5).abs() < EPS);
    }

    #[test]
    fn test_entropy_empty_is_zero() {
        let g = path_graph();
        let truth = labeling(&[(90, 0), (91, 1)]);
        let detected = labeling(&[(1, 0)]);
        assert_eq!(entropy(&g, &detected, &truth), 0.0);
        assert_eq!(entropy(&g, &Labeling::new(), &Labeling::new()), 0.0);
    }

    #[test]
    fn test_repeatable() {
        let g = two_triangles();
        let partition = Partition::from_communities(vec![vec![1, 2], vec![3, 4], vec![5, 6]]);
        let first = evaluate_quality(&g, "p", &partition, 1.0).unwrap();
        let second = evaluate_quality(&g, "p", &partition, 1.0).unwrap();
        assert_eq!(first, second);
    }
}
