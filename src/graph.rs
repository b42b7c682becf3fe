use std::collections::BTreeMap;
use std::fmt;

pub type VInt = u32;

/// Read-only adjacency view that every metric is computed on.
///
/// Undirected graphs keep each edge in both neighbor lists. Directed graphs
/// keep successors only and count predecessors in `in_degree_map`.
/// Parallel edges collapse; a self-loop is kept once in its own list but,
/// as in networkx, adds 2 to the degree of its vertex.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GraphSnapshot {
    pub(crate) adj_map: BTreeMap<VInt, Vec<VInt>>,
    in_degree_map: BTreeMap<VInt, u32>, // Only filled for directed graphs.
    pub(crate) v_size: u32,
    pub(crate) e_size: u32,
    is_directed: bool,
}

impl GraphSnapshot {
    pub fn new(is_directed: bool) -> GraphSnapshot {
        // Create a new empty Graph Snapshot.
        GraphSnapshot {
            adj_map: BTreeMap::new(),
            in_degree_map: BTreeMap::new(),
            v_size: 0u32,
            e_size: 0u32,
            is_directed,
        }
    }

    /// Build a graph from an edge iterator, duplicates are dropped.
    pub fn from_edges(edges_iter: impl IntoIterator<Item = (VInt, VInt)>, is_directed: bool) -> GraphSnapshot {
        let mut adj_map = BTreeMap::<VInt, Vec<VInt>>::new();
        for (u, v) in edges_iter {
            adj_map.entry(u).or_insert_with(Vec::new).push(v);
            if is_directed {
                adj_map.entry(v).or_insert_with(Vec::new);
            } else if u != v {
                // The other direction.
                adj_map.entry(v).or_insert_with(Vec::new).push(u);
            }
        }
        for neighbors in adj_map.values_mut() {
            neighbors.sort_unstable();
            neighbors.dedup();
        }
        GraphSnapshot::from_adj_map(adj_map, is_directed)
    }

    /// Wrap an already symmetric (or successor-only) adjacency map.
    pub(crate) fn from_adj_map(adj_map: BTreeMap<VInt, Vec<VInt>>, is_directed: bool) -> GraphSnapshot {
        let mut in_degree_map = BTreeMap::new();
        let mut e_size = 0u32;
        let mut self_loops = 0u32;
        for (vertex, neighbors) in &adj_map {
            e_size += neighbors.len() as u32;
            if is_directed {
                for neighbor in neighbors {
                    *in_degree_map.entry(*neighbor).or_insert(0u32) += 1;
                }
            } else if neighbors.contains(vertex) {
                self_loops += 1;
            }
        }
        if !is_directed {
            // Every non-loop edge sits in two lists.
            e_size = (e_size - self_loops) / 2 + self_loops;
        }
        GraphSnapshot {
            v_size: adj_map.len() as u32,
            adj_map,
            in_degree_map,
            e_size,
            is_directed,
        }
    }

    pub fn insert_vertex(&mut self, u: VInt) {
        if !self.adj_map.contains_key(&u) {
            self.adj_map.insert(u, Vec::new());
            self.v_size += 1;
        }
    }

    /// Insert an edge, returns false when it already exists.
    pub fn insert_edge(&mut self, u: VInt, v: VInt) -> bool {
        self.insert_vertex(u);
        self.insert_vertex(v);

        // The successor direction.
        let successors = self.adj_map.entry(u).or_insert_with(Vec::new);
        if successors.contains(&v) {
            return false;
        }
        successors.push(v);

        if self.is_directed {
            *self.in_degree_map.entry(v).or_insert(0) += 1;
        } else if u != v {
            // The predecessor direction.
            self.adj_map.entry(v).or_insert_with(Vec::new).push(u);
        }
        self.e_size += 1;
        true
    }

    /// Neighbors of a vertex (successors when directed), empty if absent.
    pub fn neighbors(&self, vertex_id: &VInt) -> &[VInt] {
        match self.adj_map.get(vertex_id) {
            None => &[],
            Some(neighbors) => neighbors.as_slice(),
        }
    }

    pub fn has_self_loop(&self, vertex_id: &VInt) -> bool {
        self.neighbors(vertex_id).contains(vertex_id)
    }

    /// Edge endpoints at a vertex, in + out for directed graphs.
    /// A self-loop contributes both of its endpoints.
    pub fn degree(&self, vertex_id: &VInt) -> usize {
        if self.is_directed {
            self.out_degree(vertex_id) + self.in_degree(vertex_id)
        } else {
            self.neighbors(vertex_id).len() + self.has_self_loop(vertex_id) as usize
        }
    }

    pub fn out_degree(&self, vertex_id: &VInt) -> usize {
        if self.is_directed {
            self.neighbors(vertex_id).len()
        } else {
            self.degree(vertex_id)
        }
    }

    pub fn in_degree(&self, vertex_id: &VInt) -> usize {
        if self.is_directed {
            self.in_degree_map.get(vertex_id).copied().unwrap_or(0) as usize
        } else {
            self.degree(vertex_id)
        }
    }

    /// Vertices in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = VInt> + '_ {
        self.adj_map.keys().copied()
    }

    pub fn has_node(&self, vertex_id: &VInt) -> bool {
        self.adj_map.contains_key(vertex_id)
    }

    pub fn vertex_count(&self) -> u32 {
        self.v_size
    }

    /// Distinct edges, a self-loop counts once.
    pub fn edge_count(&self) -> u32 {
        self.e_size
    }

    /// Sum of all degrees, i.e. `2 * edge_count`. This is the `2m`
    /// normaliser of the quality metrics.
    pub fn total_degree(&self) -> usize {
        2 * self.e_size as usize
    }

    pub fn is_directed(&self) -> bool {
        self.is_directed
    }
}

impl fmt::Display for GraphSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Graph Snapshot ({} vertices, {} edges):", self.v_size, self.e_size)?;
        for (vertex, neighbors) in &self.adj_map {
            write!(f, "{}->", vertex)?;
            for v in neighbors {
                write!(f, "{}->", v)?;
            }
            writeln!(f, "END")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test_graph {
    use crate::graph::GraphSnapshot;

    fn path_graph() -> GraphSnapshot {
        GraphSnapshot::from_edges(vec![(1, 2), (2, 3), (3, 4)], false)
    }

    #[test]
    fn test_undirected_degrees() {
        let g = path_graph();
        assert_eq!(g.vertex_count(), 4);
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.degree(&1), 1);
        assert_eq!(g.degree(&2), 2);
        assert_eq!(g.degree(&3), 2);
        assert_eq!(g.degree(&4), 1);
        assert_eq!(g.total_degree(), 6);
        assert_eq!(g.neighbors(&2), &[1, 3]);
        assert!(g.neighbors(&9).is_empty());
        assert_eq!(g.degree(&9), 0);
    }

    #[test]
    fn test_duplicate_edges_collapse() {
        // Both directions listed, like a METIS adjacency file.
        let g = GraphSnapshot::from_edges(vec![(1, 2), (2, 1), (1, 2), (2, 3), (3, 2)], false);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.degree(&2), 2);
        assert_eq!(g.neighbors(&1), &[2]);
    }

    #[test]
    fn test_insert_edge() {
        let mut g = path_graph();
        assert!(g.insert_edge(4, 1));
        assert!(!g.insert_edge(1, 4));
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.degree(&1), 2);

        g.insert_vertex(7);
        assert!(g.has_node(&7));
        assert_eq!(g.vertex_count(), 5);
        assert_eq!(g.degree(&7), 0);
        assert_eq!(g.nodes().collect::<Vec<_>>(), vec![1, 2, 3, 4, 7]);
    }

    #[test]
    fn test_self_loop_degree() {
        let g = GraphSnapshot::from_edges(vec![(1, 1), (1, 2)], false);
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.neighbors(&1), &[1, 2]);
        assert!(g.has_self_loop(&1));
        assert!(!g.has_self_loop(&2));
        assert_eq!(g.degree(&1), 3);
        assert_eq!(g.degree(&2), 1);
        assert_eq!(g.total_degree(), 4);
        assert_eq!(g.nodes().map(|v| g.degree(&v)).sum::<usize>(), g.total_degree());

        let mut h = GraphSnapshot::new(false);
        h.insert_edge(5, 5);
        assert_eq!(h.edge_count(), 1);
        assert_eq!(h.degree(&5), 2);

        let d = GraphSnapshot::from_edges(vec![(1, 1), (1, 2)], true);
        assert_eq!(d.degree(&1), 3);
        assert_eq!(d.total_degree(), 4);
    }

    #[test]
    fn test_directed_degrees() {
        let g = GraphSnapshot::from_edges(vec![(1, 2), (2, 3), (1, 3)], true);
        assert!(g.is_directed());
        assert_eq!(g.edge_count(), 3);
        assert_eq!(g.neighbors(&1), &[2, 3]);
        assert!(g.neighbors(&3).is_empty());
        assert_eq!(g.out_degree(&1), 2);
        assert_eq!(g.in_degree(&3), 2);
        assert_eq!(g.degree(&3), 2);
        assert_eq!(g.degree(&2), 2);
        assert_eq!(g.total_degree(), 6);

        let mut h = GraphSnapshot::new(true);
        h.insert_edge(1, 2);
        h.insert_edge(2, 1);
        assert_eq!(h.edge_count(), 2);
        assert_eq!(h.degree(&1), 2);
    }

    #[test]
    fn test_display() {
        let text = path_graph().to_string();
        assert!(text.contains("2->1->3->END"));
    }
}
