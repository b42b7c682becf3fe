use std::collections::{BTreeMap, BTreeSet};

use log::warn;

use crate::graph::{GraphSnapshot, VInt};

/// A community label, e.g. a METIS part id or a ground-truth line number.
pub type Label = u32;

/// One label per vertex, ordered by vertex id.
pub type Labeling = BTreeMap<VInt, Label>;

/// An ordered collection of communities.
///
/// Communities are expected to be disjoint and to hold only graph vertices,
/// but neither is enforced: metrics work on the copy returned by
/// [`Partition::restrict_to`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    communities: Vec<BTreeSet<VInt>>,
}

impl Partition {
    pub fn from_communities<C, I>(communities: I) -> Partition
    where
        I: IntoIterator<Item = C>,
        C: IntoIterator<Item = VInt>,
    {
        Partition {
            communities: communities
                .into_iter()
                .map(|community| community.into_iter().collect())
                .collect(),
        }
    }

    pub fn communities(&self) -> &[BTreeSet<VInt>] {
        &self.communities
    }

    pub fn len(&self) -> usize {
        self.communities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.communities.is_empty()
    }

    /// Filtered copy keeping only vertices of `graph`. Community positions are
    /// preserved, so a community may come out empty; each one is logged.
    pub fn restrict_to(&self, graph: &GraphSnapshot, name: &str) -> Partition {
        let communities: Vec<BTreeSet<VInt>> = self.communities
            .iter()
            .map(|community| {
                community.iter()
                    .filter(|vertex| graph.has_node(vertex))
                    .copied()
                    .collect()
            })
            .collect();
        for (index, community) in communities.iter().enumerate() {
            if community.is_empty() {
                warn!("{}: community {} has no vertex in the graph, skipped", name, index);
            }
        }
        Partition { communities }
    }

    /// Whether no vertex belongs to two communities.
    pub fn is_disjoint(&self) -> bool {
        let mut seen = BTreeSet::new();
        self.communities
            .iter()
            .flat_map(|community| community.iter())
            .all(|vertex| seen.insert(*vertex))
    }

    /// Number of distinct vertices over all communities.
    pub fn vertex_count(&self) -> usize {
        self.communities
            .iter()
            .flat_map(|community| community.iter())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Group a flat vertex-to-label mapping into communities, ordered by label.
pub fn group_by_label(labeling: &Labeling) -> Partition {
    let grouped = labeling.iter().fold(
        BTreeMap::<Label, BTreeSet<VInt>>::new(),
        |mut acc, (vertex, label)| {
            acc.entry(*label).or_insert_with(BTreeSet::new).insert(*vertex);
            acc
        },
    );
    Partition {
        communities: grouped.into_values().collect(),
    }
}
