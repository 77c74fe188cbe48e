//! Forced-edge inference
//!
//! Works out which lines of a position are already decided. Two copies of
//! the lattice are kept: the *inferred* graph starts as the live board and
//! loses edges nobody will sensibly play, while the *forced* graph starts
//! empty and gains edges that some future capture must remove.
//!
//! Level 1: strip components that can be captured right now
//! Level 2: a box with exactly two edges left is forced through both
//! Level 3: a box forced through two edges drops its other edges
//!
//! Levels 2 and 3 alternate over a shrinking frontier until nothing changes.

use rustc_hash::FxHashMap;

use crate::graph::{Edge, Vertex, VertexSet};
use crate::topology::{is_inner_vertex, BoardTopology};

#[derive(Clone, Debug)]
pub struct InferredState {
    pub inferred: BoardTopology,
    pub forced: BoardTopology,
    /// One entry per box the mover can capture immediately
    pub boxes_forced_to_be_taken: Vec<Vertex>,
}

impl InferredState {
    /// Run inference over every vertex of `topology`
    pub fn new(topology: &BoardTopology) -> Self {
        let frontier: VertexSet = topology.vertices().collect();
        Self::from_frontier(topology, frontier)
    }

    /// Run inference seeded with the given frontier
    pub fn from_frontier(topology: &BoardTopology, frontier: VertexSet) -> Self {
        let mut state = Self {
            inferred: topology.clone(),
            forced: BoardTopology::empty(),
            boxes_forced_to_be_taken: Vec::new(),
        };

        let mut next_round = state.disconnect_capturable_components(&frontier);
        while !next_round.is_empty() {
            next_round = state.force_any_two_edges(&next_round);
            if next_round.is_empty() {
                break;
            }
            next_round = state.delete_edges_if_clearly_forced(&next_round);
        }

        state
    }

    pub fn number_of_boxes_forced(&self) -> usize {
        self.boxes_forced_to_be_taken.len()
    }

    /// Remove every chain hanging off a degree-1 box, stopping at the first
    /// vertex with more than two edges
    fn disconnect_capturable_components(&mut self, frontier: &VertexSet) -> VertexSet {
        let mut next_round = frontier.clone();
        let mut visited = VertexSet::new();
        let mut edges_to_delete: Vec<Edge> = Vec::new();

        for vertex in frontier.iter() {
            if self.inferred.degree(vertex) != 1 || !is_inner_vertex(vertex) || visited.contains(vertex) {
                continue;
            }

            let mut parent = vertex;
            for v in self.inferred.graph().dfs(vertex) {
                if v == vertex {
                    continue;
                }
                edges_to_delete.push(Edge::new(parent, v));
                parent = v;
                next_round.remove(v);
                if self.inferred.degree(v) > 2 {
                    if is_inner_vertex(v) {
                        next_round.insert(v);
                    }
                    break;
                }
                visited.insert(v);
            }
        }

        for Edge { u, v } in edges_to_delete {
            self.inferred.remove_edge_if_exists(u, v);
            self.forced.remove_edge_if_exists(u, v);

            // Both checks credit `u`; only the count is ever read
            if self.inferred.degree(u) == 0 && is_inner_vertex(u) {
                self.boxes_forced_to_be_taken.push(u);
            }
            if self.inferred.degree(v) == 0 && is_inner_vertex(v) {
                self.boxes_forced_to_be_taken.push(u);
            }
        }

        next_round
    }

    fn force_any_two_edges(&mut self, frontier: &VertexSet) -> VertexSet {
        let mut next_round = VertexSet::new();

        for vertex in frontier.iter() {
            let degree = self.inferred.degree(vertex);
            let forced_count = self.forced.degree(vertex);
            if degree != 2 || forced_count >= 2 {
                continue;
            }

            let neighbors: Vec<Vertex> = self.inferred.neighbors(vertex).to_vec();
            for neighbor in neighbors {
                if !self.forced.has_edge(neighbor, vertex) {
                    if let Err(err) = self.forced.add_edge(neighbor, vertex) {
                        panic!("inferred edge {neighbor}-{vertex} is not on the lattice: {err}");
                    }
                }
                if is_inner_vertex(neighbor) {
                    next_round.insert(neighbor);
                }
            }
        }

        next_round
    }

    fn delete_edges_if_clearly_forced(&mut self, frontier: &VertexSet) -> VertexSet {
        let mut next_round = VertexSet::new();
        let mut remaining: FxHashMap<Vertex, VertexSet> = FxHashMap::default();
        let mut edges_to_remove: Vec<(Vertex, Vertex)> = Vec::new();

        for vertex in frontier.iter() {
            let degree = self.inferred.degree(vertex);
            let forced = self.forced.neighbors(vertex);
            if degree == 2 || forced.len() < 2 {
                continue;
            }

            for &neighbor in self.inferred.neighbors(vertex) {
                if forced.contains(&neighbor) {
                    continue;
                }
                edges_to_remove.push((vertex, neighbor));

                let inferred = &self.inferred;
                remaining
                    .entry(vertex)
                    .or_insert_with(|| inferred.neighbors(vertex).iter().copied().collect())
                    .remove(neighbor);
                remaining
                    .entry(neighbor)
                    .or_insert_with(|| inferred.neighbors(neighbor).iter().copied().collect())
                    .remove(vertex);
            }
        }

        for (u, v) in edges_to_remove {
            let (Some(left_u), Some(left_v)) = (remaining.get(&u), remaining.get(&v)) else {
                panic!("vertex escaped recording while pruning {u}-{v}");
            };

            // Never strand a box with fewer than two edges
            if (is_inner_vertex(u) && left_u.len() < 2) || (is_inner_vertex(v) && left_v.len() < 2) {
                continue;
            }

            self.inferred.remove_edge_if_exists(u, v);
            self.forced.remove_edge_if_exists(u, v);

            if is_inner_vertex(v) {
                next_round.insert(v);
            }
        }

        next_round
    }
}
