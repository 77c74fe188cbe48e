//! Fixed 4x6 Dots and Boxes lattice
//!
//! Each box is an *inner* vertex; a ring of *outer* vertices links border
//! boxes to the outside. An edge of this dual graph is an undrawn line of
//! the game. Vertex ids are `row * 10 + col`:
//!
//! ```text
//!       01 02 03 04 05 06
//!    10 11 12 13 14 15 16 17
//!    20 21 22 23 24 25 26 27
//!    30 31 32 33 34 35 36 37
//!    40 41 42 43 44 45 46 47
//!       51 52 53 54 55 56
//! ```
//!
//! Every one of the 58 lattice edges has a stable bit index, and the
//! topology keeps a 58-bit presence hash up to date on every change.

use crate::error::{GameError, Result};
use crate::graph::{Edge, UndirectedGraph, Vertex, VertexSet};

pub const ROWS_OF_BOXES: u8 = 4;
pub const COLUMNS_OF_BOXES: u8 = 6;
pub const ROW_FACTOR: u8 = 10;

pub const NUM_BOXES: usize = (ROWS_OF_BOXES * COLUMNS_OF_BOXES) as usize;
pub const NUM_EDGES: usize = 58;
/// Number of horizontal (`v - u == 10`) edges; they occupy indices `0..30`
pub const NUM_HORIZONTAL_EDGES: usize = 30;

/// Hash of a fresh board: every edge present
pub const EMPTY_HASH: u64 = (1u64 << NUM_EDGES) - 1;

// ============================================================================
// STATIC TABLES
// ============================================================================

/// Edge at each bit index of the presence hash
pub const EDGE_TABLE: [Edge; NUM_EDGES] = build_edge_table();

/// Box vertex for each box index, row-major
pub const BOX_VERTICES: [Vertex; NUM_BOXES] = build_box_vertices();

const fn build_edge_table() -> [Edge; NUM_EDGES] {
    let mut table = [Edge { u: 0, v: 0 }; NUM_EDGES];
    let mut i = 0;

    // Horizontal: a box and the box (or outer vertex) below it
    let mut r = 0;
    while r <= ROWS_OF_BOXES {
        let mut c = 1;
        while c <= COLUMNS_OF_BOXES {
            let u = r * ROW_FACTOR + c;
            table[i] = Edge { u, v: u + ROW_FACTOR };
            i += 1;
            c += 1;
        }
        r += 1;
    }

    // Vertical: a box and its right neighbor
    let mut r = 1;
    while r <= ROWS_OF_BOXES {
        let mut c = 0;
        while c <= COLUMNS_OF_BOXES {
            let u = r * ROW_FACTOR + c;
            table[i] = Edge { u, v: u + 1 };
            i += 1;
            c += 1;
        }
        r += 1;
    }

    table
}

const fn build_box_vertices() -> [Vertex; NUM_BOXES] {
    let mut boxes = [0; NUM_BOXES];
    let mut i = 0;
    while i < NUM_BOXES {
        let row = (i as u8) / COLUMNS_OF_BOXES + 1;
        let col = (i as u8) % COLUMNS_OF_BOXES + 1;
        boxes[i] = row * ROW_FACTOR + col;
        i += 1;
    }
    boxes
}

// ============================================================================
// COORDINATES
// ============================================================================

#[inline]
pub fn is_inner_vertex(v: Vertex) -> bool {
    let (row, col) = (v / ROW_FACTOR, v % ROW_FACTOR);
    (1..=ROWS_OF_BOXES).contains(&row) && (1..=COLUMNS_OF_BOXES).contains(&col)
}

#[inline]
pub fn is_outer_vertex(v: Vertex) -> bool {
    let (row, col) = (v / ROW_FACTOR, v % ROW_FACTOR);
    let top_or_bottom = (row == 0 || row == ROWS_OF_BOXES + 1) && (1..=COLUMNS_OF_BOXES).contains(&col);
    let left_or_right = (col == 0 || col == COLUMNS_OF_BOXES + 1) && (1..=ROWS_OF_BOXES).contains(&row);
    top_or_bottom || left_or_right
}

/// Row-major index of a box vertex, `(row-1)*6 + (col-1)`
#[inline]
pub fn box_index(v: Vertex) -> Option<usize> {
    is_inner_vertex(v).then(|| {
        ((v / ROW_FACTOR - 1) * COLUMNS_OF_BOXES + (v % ROW_FACTOR - 1)) as usize
    })
}

/// Bit index of a lattice edge, or `None` if `u`-`v` is not a lattice edge.
///
/// Closed form: horizontal edges (`v - u == 10`) map to
/// `((u-1)/10)*6 + (u-1)%10`, vertical ones to `30 + 7*(u/10 - 1) + u%10`.
pub fn edge_index(u: Vertex, v: Vertex) -> Option<usize> {
    let edge = Edge::new(u, v);
    let (u, v) = (edge.u as usize, edge.v as usize);
    let factor = ROW_FACTOR as usize;

    let index = if v - u == factor {
        let below = u.checked_sub(1)?;
        (below / factor) * COLUMNS_OF_BOXES as usize + below % factor
    } else {
        let row = (u / factor).checked_sub(1)?;
        NUM_HORIZONTAL_EDGES + 7 * row + u % factor
    };

    (index < NUM_EDGES && EDGE_TABLE[index] == edge).then_some(index)
}

/// Edge at a bit index
pub fn edge_at(index: usize) -> Result<Edge> {
    EDGE_TABLE
        .get(index)
        .copied()
        .ok_or(GameError::EdgeIndexOutOfRange(index))
}

// ============================================================================
// TOPOLOGY
// ============================================================================

/// The board lattice with incremental hash and degree-1 tracking
#[derive(Clone, Debug)]
pub struct BoardTopology {
    graph: UndirectedGraph,
    edge_hash: u64,
    /// Bit `i` set iff box `i` currently has exactly one edge
    degree_one_boxes: u32,
}

impl Default for BoardTopology {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardTopology {
    /// Fresh board with all 58 edges present
    pub fn new() -> Self {
        let mut graph = UndirectedGraph::new();

        for &v in &BOX_VERTICES {
            graph.add_vertex(v);
        }
        for col in 1..=COLUMNS_OF_BOXES {
            graph.add_vertex(col);
        }
        for col in 1..=COLUMNS_OF_BOXES {
            graph.add_vertex((ROWS_OF_BOXES + 1) * ROW_FACTOR + col);
        }
        for row in 1..=ROWS_OF_BOXES {
            graph.add_vertex(row * ROW_FACTOR);
        }
        for row in 1..=ROWS_OF_BOXES {
            graph.add_vertex(row * ROW_FACTOR + COLUMNS_OF_BOXES + 1);
        }

        let mut topology = Self {
            graph,
            edge_hash: 0,
            degree_one_boxes: 0,
        };

        // North, east, south, west of every box
        for &v in &BOX_VERTICES {
            for neighbor in [v - ROW_FACTOR, v + 1, v + ROW_FACTOR, v - 1] {
                if let Err(err) = topology.add_edge(v, neighbor) {
                    panic!("lattice construction failed: {err}");
                }
            }
        }

        topology
    }

    /// Lattice with every vertex but no edges
    pub fn empty() -> Self {
        Self::from_hash(0)
    }

    /// Rebuild a topology from its presence hash
    pub fn from_hash(hash: u64) -> Self {
        let mut topology = Self::new();
        for (index, edge) in EDGE_TABLE.iter().enumerate() {
            if hash & (1u64 << index) == 0 {
                topology.remove_edge_if_exists(edge.u, edge.v);
            }
        }
        topology
    }

    pub fn graph(&self) -> &UndirectedGraph {
        &self.graph
    }

    pub fn edge_hash(&self) -> u64 {
        self.edge_hash
    }

    /// Recompute the presence hash from scratch
    pub fn compute_hash(&self) -> u64 {
        EDGE_TABLE
            .iter()
            .enumerate()
            .filter(|(_, e)| self.graph.has_edge(e.u, e.v))
            .fold(0, |hash, (i, _)| hash | (1u64 << i))
    }

    pub fn add_edge(&mut self, u: Vertex, v: Vertex) -> Result<()> {
        let index = edge_index(u, v).ok_or(GameError::IllegalMove(Edge::new(u, v)))?;
        self.graph.add_edge(u, v)?;
        self.edge_hash |= 1u64 << index;
        self.update_degree_one(u);
        self.update_degree_one(v);
        Ok(())
    }

    pub fn remove_edge(&mut self, u: Vertex, v: Vertex) -> Result<Edge> {
        let removed = self.graph.remove_edge(u, v)?;
        if let Some(index) = edge_index(u, v) {
            self.edge_hash &= !(1u64 << index);
        }
        self.update_degree_one(u);
        self.update_degree_one(v);
        Ok(removed)
    }

    pub fn remove_edge_if_exists(&mut self, u: Vertex, v: Vertex) -> Option<Edge> {
        if self.graph.has_edge(u, v) {
            self.remove_edge(u, v).ok()
        } else {
            None
        }
    }

    fn update_degree_one(&mut self, v: Vertex) {
        if let Some(index) = box_index(v) {
            if self.graph.degree(v) == 1 {
                self.degree_one_boxes |= 1 << index;
            } else {
                self.degree_one_boxes &= !(1 << index);
            }
        }
    }

    /// Inner vertices currently at degree 1, row-major
    pub fn degree_one_inner_vertices(&self) -> VertexSet {
        BOX_VERTICES
            .iter()
            .enumerate()
            .filter(|(i, _)| self.degree_one_boxes & (1 << i) != 0)
            .map(|(_, &v)| v)
            .collect()
    }

    pub fn inner_vertices(&self) -> impl Iterator<Item = Vertex> {
        BOX_VERTICES.into_iter()
    }

    pub fn is_inner_vertex(&self, v: Vertex) -> bool {
        is_inner_vertex(v)
    }

    pub fn is_outer_vertex(&self, v: Vertex) -> bool {
        is_outer_vertex(v)
    }

    // Graph delegates

    pub fn has_edge(&self, u: Vertex, v: Vertex) -> bool {
        self.graph.has_edge(u, v)
    }

    pub fn get_edge(&self, u: Vertex, v: Vertex) -> Result<Edge> {
        self.graph.get_edge(u, v)
    }

    pub fn neighbors(&self, v: Vertex) -> &[Vertex] {
        self.graph.neighbors(v)
    }

    pub fn degree(&self, v: Vertex) -> usize {
        self.graph.degree(v)
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.graph.edges()
    }

    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.graph.vertices()
    }

    pub fn number_of_edges(&self) -> usize {
        self.graph.number_of_edges()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_shape() {
        let topology = BoardTopology::new();
        assert_eq!(topology.graph().number_of_vertices(), 58);
        assert_eq!(topology.number_of_edges(), NUM_EDGES);
        assert_eq!(topology.edge_hash(), EMPTY_HASH);
        assert_eq!(topology.compute_hash(), EMPTY_HASH);

        // Corner box: north, east, south, west
        assert_eq!(topology.neighbors(11), &[1, 12, 21, 10]);
        assert_eq!(topology.degree(1), 1);
        assert_eq!(topology.degree(23), 4);
        assert!(topology.degree_one_inner_vertices().is_empty());
    }

    #[test]
    fn test_vertex_classification() {
        assert_eq!(BOX_VERTICES.iter().filter(|&&v| is_inner_vertex(v)).count(), 24);
        assert!(is_outer_vertex(1) && is_outer_vertex(56) && is_outer_vertex(10) && is_outer_vertex(47));
        assert!(!is_outer_vertex(0) && !is_outer_vertex(57) && !is_inner_vertex(0));
        assert_eq!(box_index(11), Some(0));
        assert_eq!(box_index(46), Some(23));
        assert_eq!(box_index(50), None);
    }

    #[test]
    fn test_edge_index_round_trips() {
        for (i, edge) in EDGE_TABLE.iter().enumerate() {
            assert_eq!(edge_index(edge.u, edge.v), Some(i));
            assert_eq!(edge_index(edge.v, edge.u), Some(i));
            assert_eq!(edge_at(i).unwrap(), *edge);
        }
        assert_eq!(edge_index(11, 22), None);
        assert_eq!(edge_index(0, 1), None);
        assert!(edge_at(58).is_err());
    }

    #[test]
    fn test_edge_table_endpoints() {
        assert_eq!(EDGE_TABLE[0], Edge::new(1, 11));
        assert_eq!(EDGE_TABLE[29], Edge::new(46, 56));
        assert_eq!(EDGE_TABLE[30], Edge::new(10, 11));
        assert_eq!(EDGE_TABLE[57], Edge::new(46, 47));
    }

    #[test]
    fn test_remove_toggles_one_bit() {
        let mut topology = BoardTopology::new();
        topology.remove_edge(21, 31).unwrap();
        let index = edge_index(21, 31).unwrap();
        assert_eq!(topology.edge_hash(), EMPTY_HASH & !(1 << index));
        assert_eq!(topology.edge_hash(), topology.compute_hash());

        topology.add_edge(31, 21).unwrap();
        assert_eq!(topology.edge_hash(), EMPTY_HASH);
    }

    #[test]
    fn test_degree_one_tracking() {
        let mut topology = BoardTopology::new();
        topology.remove_edge(1, 11).unwrap();
        topology.remove_edge(10, 11).unwrap();
        assert!(topology.degree_one_inner_vertices().is_empty());

        topology.remove_edge(11, 12).unwrap();
        assert_eq!(topology.degree_one_inner_vertices().as_slice(), &[11]);

        topology.remove_edge(11, 21).unwrap();
        assert!(topology.degree_one_inner_vertices().is_empty());
    }

    #[test]
    fn test_from_hash_round_trips() {
        let mut topology = BoardTopology::new();
        for (u, v) in [(1, 11), (22, 23), (36, 37), (45, 55)] {
            topology.remove_edge(u, v).unwrap();
        }
        let rebuilt = BoardTopology::from_hash(topology.edge_hash());
        assert_eq!(rebuilt.edge_hash(), topology.edge_hash());
        assert_eq!(rebuilt.number_of_edges(), NUM_EDGES - 4);
        assert!(!rebuilt.has_edge(22, 23));

        let empty = BoardTopology::empty();
        assert_eq!(empty.number_of_edges(), 0);
        assert_eq!(empty.edge_hash(), 0);
    }

    #[test]
    fn test_non_lattice_edge_rejected() {
        let mut topology = BoardTopology::new();
        assert!(topology.add_edge(11, 22).is_err());
        assert!(topology.remove_edge(11, 22).is_err());
    }
}
