//! Undirected graph over small integer vertex ids
//!
//! Adjacency lists keep insertion order, so traversal order is fully
//! deterministic: removing a neighbor and adding it back moves it to the end
//! of the list. Every search built on top of this graph relies on that order
//! when it breaks ties.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Vertex identifier. Board vertices use `row * 10 + col`.
pub type Vertex = u8;

// ============================================================================
// EDGE
// ============================================================================

/// Undirected edge, always stored with `u <= v`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "RawEdge")]
pub struct Edge {
    pub u: Vertex,
    pub v: Vertex,
}

#[derive(Deserialize)]
struct RawEdge {
    u: Vertex,
    v: Vertex,
}

impl From<RawEdge> for Edge {
    fn from(raw: RawEdge) -> Self {
        Edge::new(raw.u, raw.v)
    }
}

impl Edge {
    /// Build a canonical edge from endpoints in any order
    pub const fn new(a: Vertex, b: Vertex) -> Self {
        if a <= b {
            Self { u: a, v: b }
        } else {
            Self { u: b, v: a }
        }
    }

    /// The endpoint that isn't `x`
    pub fn other(&self, x: Vertex) -> Vertex {
        if self.u == x {
            self.v
        } else {
            self.u
        }
    }

    pub fn touches(&self, x: Vertex) -> bool {
        self.u == x || self.v == x
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.u, self.v)
    }
}

impl FromStr for Edge {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.split_whitespace();
        let parse = |part: Option<&str>| {
            part.and_then(|p| p.parse::<Vertex>().ok())
                .ok_or_else(|| GameError::InvalidEdge(s.to_string()))
        };
        let a = parse(parts.next())?;
        let b = parse(parts.next())?;
        if parts.next().is_some() {
            return Err(GameError::InvalidEdge(s.to_string()));
        }
        Ok(Edge::new(a, b))
    }
}

// ============================================================================
// VERTEX SETS
// ============================================================================

/// Membership bitmask covering the whole `Vertex` range
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct VertexMask([u64; 4]);

impl VertexMask {
    #[inline]
    fn contains(&self, v: Vertex) -> bool {
        self.0[(v >> 6) as usize] & (1u64 << (v & 63)) != 0
    }

    #[inline]
    fn insert(&mut self, v: Vertex) -> bool {
        let fresh = !self.contains(v);
        self.0[(v >> 6) as usize] |= 1u64 << (v & 63);
        fresh
    }

    #[inline]
    fn remove(&mut self, v: Vertex) -> bool {
        let present = self.contains(v);
        self.0[(v >> 6) as usize] &= !(1u64 << (v & 63));
        present
    }
}

/// Insertion-ordered vertex set with O(1) membership
///
/// Iteration yields vertices in the order they were first inserted; removing
/// a vertex and inserting it again moves it to the back.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VertexSet {
    order: Vec<Vertex>,
    members: VertexMask,
}

impl VertexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, v: Vertex) -> bool {
        self.members.contains(v)
    }

    /// Returns `true` if the vertex wasn't already present
    pub fn insert(&mut self, v: Vertex) -> bool {
        if self.members.insert(v) {
            self.order.push(v);
            true
        } else {
            false
        }
    }

    /// Returns `true` if the vertex was present
    pub fn remove(&mut self, v: Vertex) -> bool {
        if self.members.remove(v) {
            if let Some(pos) = self.order.iter().position(|&x| x == v) {
                self.order.remove(pos);
            }
            true
        } else {
            false
        }
    }

    pub fn first(&self) -> Option<Vertex> {
        self.order.first().copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.order.iter().copied()
    }

    pub fn as_slice(&self) -> &[Vertex] {
        &self.order
    }
}

impl FromIterator<Vertex> for VertexSet {
    fn from_iter<I: IntoIterator<Item = Vertex>>(iter: I) -> Self {
        let mut set = VertexSet::new();
        set.extend(iter);
        set
    }
}

impl Extend<Vertex> for VertexSet {
    fn extend<I: IntoIterator<Item = Vertex>>(&mut self, iter: I) {
        for v in iter {
            self.insert(v);
        }
    }
}

// ============================================================================
// GRAPH
// ============================================================================

/// Undirected simple graph with insertion-ordered adjacency lists
#[derive(Clone, Debug, Default)]
pub struct UndirectedGraph {
    /// Indexed by vertex id; `None` means the vertex was never added
    adjacency: Vec<Option<Vec<Vertex>>>,
    /// Vertices in insertion order
    order: Vec<Vertex>,
    edge_count: usize,
}

impl UndirectedGraph {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn slot(&self, v: Vertex) -> Option<&Vec<Vertex>> {
        self.adjacency.get(v as usize).and_then(Option::as_ref)
    }

    #[inline]
    fn slot_mut(&mut self, v: Vertex) -> Option<&mut Vec<Vertex>> {
        self.adjacency.get_mut(v as usize).and_then(Option::as_mut)
    }

    /// Add a vertex; adding an existing vertex is a no-op
    pub fn add_vertex(&mut self, v: Vertex) {
        if self.contains_vertex(v) {
            return;
        }
        let index = v as usize;
        if self.adjacency.len() <= index {
            self.adjacency.resize(index + 1, None);
        }
        self.adjacency[index] = Some(Vec::with_capacity(4));
        self.order.push(v);
    }

    pub fn contains_vertex(&self, v: Vertex) -> bool {
        self.slot(v).is_some()
    }

    /// Connect `u` and `v`. Idempotent if the edge is already present.
    pub fn add_edge(&mut self, u: Vertex, v: Vertex) -> Result<()> {
        if !self.contains_vertex(u) {
            return Err(GameError::MissingVertex(u));
        }
        if !self.contains_vertex(v) {
            return Err(GameError::MissingVertex(v));
        }
        if u == v {
            return Err(GameError::SelfLoop(u));
        }

        if !self.has_edge(u, v) {
            if let Some(list) = self.slot_mut(u) {
                list.push(v);
            }
            if let Some(list) = self.slot_mut(v) {
                list.push(u);
            }
            self.edge_count += 1;
        }
        Ok(())
    }

    pub fn has_edge(&self, u: Vertex, v: Vertex) -> bool {
        match (self.slot(u), self.slot(v)) {
            (Some(us), Some(_)) => us.contains(&v),
            _ => false,
        }
    }

    /// Canonical edge between `u` and `v`, or an error if absent
    pub fn get_edge(&self, u: Vertex, v: Vertex) -> Result<Edge> {
        self.get_edge_if_exists(u, v)
            .ok_or(GameError::EdgeAbsent(Edge::new(u, v)))
    }

    pub fn get_edge_if_exists(&self, u: Vertex, v: Vertex) -> Option<Edge> {
        self.has_edge(u, v).then(|| Edge::new(u, v))
    }

    /// Disconnect `u` and `v`, returning the canonical edge removed
    pub fn remove_edge(&mut self, u: Vertex, v: Vertex) -> Result<Edge> {
        if !self.has_edge(u, v) {
            return Err(GameError::EdgeAbsent(Edge::new(u, v)));
        }
        if let Some(list) = self.slot_mut(u) {
            if let Some(pos) = list.iter().position(|&x| x == v) {
                list.remove(pos);
            }
        }
        if let Some(list) = self.slot_mut(v) {
            if let Some(pos) = list.iter().position(|&x| x == u) {
                list.remove(pos);
            }
        }
        self.edge_count -= 1;
        Ok(Edge::new(u, v))
    }

    pub fn remove_edge_if_exists(&mut self, u: Vertex, v: Vertex) -> Option<Edge> {
        self.remove_edge(u, v).ok()
    }

    /// Adjacent vertices in insertion order.
    ///
    /// # Panics
    /// If `v` is not a vertex of this graph. Use [`try_neighbors`] for
    /// untrusted input.
    ///
    /// [`try_neighbors`]: UndirectedGraph::try_neighbors
    pub fn neighbors(&self, v: Vertex) -> &[Vertex] {
        match self.slot(v) {
            Some(list) => list,
            None => panic!("{v} is not a vertex in the graph"),
        }
    }

    pub fn try_neighbors(&self, v: Vertex) -> Result<&[Vertex]> {
        self.slot(v)
            .map(Vec::as_slice)
            .ok_or(GameError::MissingVertex(v))
    }

    /// Number of adjacent vertices. Panics like [`UndirectedGraph::neighbors`].
    pub fn degree(&self, v: Vertex) -> usize {
        self.neighbors(v).len()
    }

    pub fn try_degree(&self, v: Vertex) -> Result<usize> {
        self.try_neighbors(v).map(<[Vertex]>::len)
    }

    /// Vertices in insertion order
    pub fn vertices(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.order.iter().copied()
    }

    /// Every edge once, canonicalized, grouped by its lower endpoint in
    /// vertex insertion order
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.order.iter().flat_map(move |&u| {
            self.neighbors(u)
                .iter()
                .filter(move |&&v| u < v)
                .map(move |&v| Edge { u, v })
        })
    }

    pub fn number_of_edges(&self) -> usize {
        self.edge_count
    }

    pub fn number_of_vertices(&self) -> usize {
        self.order.len()
    }

    /// Lazy depth-first traversal starting at `start`
    pub fn dfs(&self, start: Vertex) -> Dfs<'_> {
        Dfs {
            graph: self,
            stack: vec![start],
            visited: VertexMask::default(),
        }
    }

    /// Lazy breadth-first traversal starting at `start`
    ///
    /// Newly discovered neighbors go to the front of the queue.
    pub fn bfs(&self, start: Vertex) -> Bfs<'_> {
        Bfs {
            graph: self,
            queue: VecDeque::from([start]),
            visited: VertexMask::default(),
        }
    }
}

// ============================================================================
// TRAVERSALS
// ============================================================================

pub struct Dfs<'a> {
    graph: &'a UndirectedGraph,
    stack: Vec<Vertex>,
    visited: VertexMask,
}

impl Iterator for Dfs<'_> {
    type Item = Vertex;

    fn next(&mut self) -> Option<Vertex> {
        while let Some(current) = self.stack.pop() {
            if !self.visited.insert(current) {
                continue;
            }
            for &n in self.graph.neighbors(current) {
                if !self.visited.contains(n) {
                    self.stack.push(n);
                }
            }
            return Some(current);
        }
        None
    }
}

pub struct Bfs<'a> {
    graph: &'a UndirectedGraph,
    queue: VecDeque<Vertex>,
    visited: VertexMask,
}

impl Iterator for Bfs<'_> {
    type Item = Vertex;

    fn next(&mut self) -> Option<Vertex> {
        while let Some(current) = self.queue.pop_front() {
            if !self.visited.insert(current) {
                continue;
            }
            for &n in self.graph.neighbors(current) {
                if !self.visited.contains(n) {
                    self.queue.push_front(n);
                }
            }
            return Some(current);
        }
        None
    }
}
