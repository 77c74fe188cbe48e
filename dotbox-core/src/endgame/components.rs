//! Chain and loop decomposition of a position
//!
//! Every live box is classified by degree, then grouped into components:
//!
//! - **capturable**: starts at a box with one edge left and runs until a
//!   joint (a box with three or more edges) or the boundary. Ordered so
//!   that taking them one after another is always legal, with joints
//!   resolved as the boxes around them disappear.
//! - **non-capturable**: chains hanging off the boundary, chains between
//!   joints, and closed loops of degree-2 boxes.
//!
//! The decomposition is a simulation; the board itself is never touched.

use rustc_hash::FxHashMap;

use crate::graph::{Edge, Vertex, VertexSet};
use crate::player::GameResult;
use crate::rules::{Board, Move};
use crate::topology::{is_inner_vertex, is_outer_vertex};

// ============================================================================
// COMPONENTS
// ============================================================================

/// Boxes that can be taken one after another starting now
///
/// `vertices[0]` has a single edge left. Each vertex is adjacent to the
/// next, and the last one is attached to `tail_joint` when there is one.
/// Without a tail joint the chain is *closed*: both ends are free boxes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CapturableComponent {
    pub vertices: Vec<Vertex>,
    pub tail_joint: Option<Vertex>,
}

impl CapturableComponent {
    pub fn is_closed(&self) -> bool {
        self.tail_joint.is_none()
    }

    /// Long enough to decline the last boxes and pass the turn
    pub fn can_hand_out(&self) -> bool {
        let boxes = self.vertices.len();
        boxes >= 4 || (boxes >= 2 && self.tail_joint.is_some())
    }

    /// Capturing turns needed for the full capture. The closing edge of a
    /// closed chain takes two boxes at once and counts once.
    pub fn boxes_captured_in_full_capture(&self) -> usize {
        match self.tail_joint {
            Some(_) => self.vertices.len(),
            None => self.vertices.len().saturating_sub(1),
        }
    }

    /// Sort key for the capture sequence. Handout candidates go last so the
    /// final component is the one worth declining.
    fn capture_order(&self, joints: &VertexSet) -> (bool, bool, usize, bool) {
        let attached = self.tail_joint.is_some_and(|t| joints.contains(t));
        (self.can_hand_out(), !attached, self.vertices.len(), !self.is_closed())
    }
}

/// Structure the mover can only open, handing boxes to the opponent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NonCapturableComponent {
    /// Boxes between `head` and `tail`. Head and tail are joints or outer
    /// vertices and are not part of the chain.
    Chain {
        head: Vertex,
        vertices: Vec<Vertex>,
        tail: Option<Vertex>,
    },
    /// Closed cycle of degree-2 boxes
    Loop { vertices: Vec<Vertex> },
}

impl NonCapturableComponent {
    pub fn vertices(&self) -> &[Vertex] {
        match self {
            Self::Chain { vertices, .. } | Self::Loop { vertices } => vertices,
        }
    }

    pub fn len(&self) -> usize {
        self.vertices().len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices().is_empty()
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Self::Loop { .. })
    }
}

/// A capturable component broken up around the decision to hand out
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureSplit {
    /// Played whichever way the mover decides
    pub intersection: Vec<Edge>,
    /// Finishes the capture after the intersection
    pub full_capture_suffix: Vec<Edge>,
    /// Declines the last one or two boxes after the intersection
    pub handout_suffix: Option<Edge>,
}

#[derive(Clone, Debug, Default)]
pub struct Decomposition {
    /// In capture order
    pub capturable: Vec<CapturableComponent>,
    /// Shortest first
    pub non_capturable: Vec<NonCapturableComponent>,
}

// ============================================================================
// DECOMPOSER
// ============================================================================

/// Working sets of one decomposition
struct Decomposer<'a> {
    board: &'a Board,
    /// Inner vertices with one edge
    one: VertexSet,
    /// Outer vertices that still have their edge
    outer: VertexSet,
    /// Inner vertices with two edges
    two: VertexSet,
    /// Inner vertices with three or four edges
    joints: VertexSet,
    /// Neighbors of each joint that are still standing in the simulation
    virtual_neighbors: FxHashMap<Vertex, VertexSet>,
    /// Boxes taken by the capture sequence
    captured: VertexSet,
}

impl<'a> Decomposer<'a> {
    fn empty(board: &'a Board) -> Self {
        Self {
            board,
            one: VertexSet::new(),
            outer: VertexSet::new(),
            two: VertexSet::new(),
            joints: VertexSet::new(),
            virtual_neighbors: FxHashMap::default(),
            captured: VertexSet::new(),
        }
    }

    fn classify(board: &'a Board) -> Self {
        let mut decomposer = Self::empty(board);

        for vertex in board.topology().vertices() {
            let degree = board.degree(vertex);
            if degree == 0 {
                continue;
            }
            if is_outer_vertex(vertex) {
                decomposer.outer.insert(vertex);
                continue;
            }
            match degree {
                1 => {
                    decomposer.one.insert(vertex);
                }
                2 => {
                    decomposer.two.insert(vertex);
                }
                3 | 4 => {
                    decomposer.joints.insert(vertex);
                    decomposer
                        .virtual_neighbors
                        .insert(vertex, board.neighbors(vertex).iter().copied().collect());
                }
                _ => panic!("impossible degree {degree} at vertex {vertex}"),
            }
        }

        decomposer
    }

    fn seeded(board: &'a Board, one: VertexSet) -> Self {
        Self {
            one,
            ..Self::empty(board)
        }
    }

    fn neighbors(&self, v: Vertex) -> &'a [Vertex] {
        self.board.neighbors(v)
    }

    /// Walk from a free box until the first joint or outer vertex, which
    /// becomes the tail. Joints are crossed through their virtual
    /// neighbors. With `lazy_joints`, an unclassified vertex of degree 3+
    /// is promoted to a joint on the spot.
    fn capture_traversal(
        &mut self,
        start: Vertex,
        lazy_joints: bool,
        already_visited: Option<Vertex>,
    ) -> (Vec<Vertex>, Option<Vertex>) {
        let mut vertices = Vec::new();
        let mut stack = vec![start];
        let mut visited: VertexSet = already_visited.into_iter().collect();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }

            let actual = self.neighbors(current);
            let has_virtual = match self.virtual_neighbors.get(&current) {
                Some(set) => {
                    stack.extend(set.iter().filter(|&n| !visited.contains(n)));
                    true
                }
                None => {
                    stack.extend(actual.iter().copied().filter(|&n| !visited.contains(n)));
                    false
                }
            };

            let mut is_joint = self.joints.contains(current);
            if lazy_joints && !is_joint && actual.len() >= 3 && !has_virtual {
                is_joint = true;
                self.joints.insert(current);
                self.virtual_neighbors
                    .insert(current, actual.iter().copied().collect());
            }

            if is_joint || is_outer_vertex(current) {
                self.outer.remove(current);
                return (vertices, Some(current));
            }

            vertices.push(current);
            self.one.remove(current);
            self.two.remove(current);
        }

        (vertices, None)
    }

    /// Build the capturable components and order them so that playing
    /// their full captures in turn is legal
    fn capture_sequence(&mut self) -> Vec<CapturableComponent> {
        if self.one.is_empty() {
            return Vec::new();
        }

        let mut arena: Vec<CapturableComponent> = Vec::new();
        let mut attached: FxHashMap<Vertex, Vec<usize>> = FxHashMap::default();

        while let Some(start) = self.one.first() {
            let (vertices, tail_joint) = self.capture_traversal(start, true, None);
            // A free box is never a joint, so the walk always consumes it
            self.one.remove(start);

            if let Some(joint) = tail_joint.filter(|&t| is_inner_vertex(t)) {
                attached.entry(joint).or_default().push(arena.len());
            }
            arena.push(CapturableComponent { vertices, tail_joint });
        }

        let mut pending: Vec<usize> = (0..arena.len()).collect();
        pending.sort_by_key(|&id| arena[id].capture_order(&self.joints));

        let mut sequence: Vec<usize> = Vec::with_capacity(pending.len());
        while !pending.is_empty() {
            let id = pending.remove(0);
            sequence.push(id);

            let Some(joint) = arena[id].tail_joint.filter(|&t| !is_outer_vertex(t)) else {
                continue;
            };
            let Some(&adjacent_box) = arena[id].vertices.last() else {
                panic!("capturable component without boxes at joint {joint}");
            };

            let (remaining, virtual_left) = {
                let (Some(neighbors_of_joint), Some(virtual_set)) =
                    (attached.get_mut(&joint), self.virtual_neighbors.get_mut(&joint))
                else {
                    panic!("joint {joint} escaped recording");
                };

                let Some(position) = neighbors_of_joint.iter().position(|&c| c == id) else {
                    panic!("component ending at {adjacent_box} is not attached to joint {joint}");
                };
                neighbors_of_joint.remove(position);
                virtual_set.remove(adjacent_box);

                if virtual_set.len() > 2 {
                    continue;
                }
                (neighbors_of_joint.clone(), virtual_set.as_slice().to_vec())
            };

            // Down to two boxes around it: no longer a joint
            self.joints.remove(joint);

            match remaining.as_slice() {
                &[] => {
                    self.two.insert(joint);
                    continue;
                }
                &[extended] => {
                    let attachment = arena[extended].vertices.last().copied();
                    arena[extended].vertices.push(joint);

                    let Some(&next) = virtual_left.iter().rev().find(|&&n| Some(n) != attachment) else {
                        panic!("joint {joint} has nowhere left to continue");
                    };
                    let (more, tail_joint) = self.capture_traversal(next, false, Some(joint));
                    arena[extended].vertices.extend(more);
                    arena[extended].tail_joint = tail_joint;

                    if let Some(t) = tail_joint.filter(|&t| is_inner_vertex(t)) {
                        attached.entry(t).or_default().push(extended);
                    }
                }
                &[first, second] => {
                    let Some(position) = pending.iter().position(|&c| c == second) else {
                        panic!("component attached to joint {joint} is not pending");
                    };
                    pending.remove(position);

                    let mut fused = std::mem::take(&mut arena[second].vertices);
                    fused.reverse();
                    arena[first].vertices.push(joint);
                    arena[first].vertices.extend(fused);
                    arena[first].tail_joint = None;
                }
                _ => {}
            }

            pending.sort_by_key(|&id| arena[id].capture_order(&self.joints));
        }

        let components: Vec<CapturableComponent> = sequence
            .into_iter()
            .map(|id| std::mem::take(&mut arena[id]))
            .collect();
        for component in &components {
            self.captured.extend(component.vertices.iter().copied());
        }
        components
    }

    /// Depth-first walk over boxes the capture sequence leaves standing.
    /// Stops at the first vertex accepted by `stop` and returns the boxes
    /// walked before it. The edge from `start` back to `skip_back` is not
    /// followed.
    fn walk(
        &self,
        start: Vertex,
        skip_back: Option<Vertex>,
        stop: impl Fn(Vertex) -> bool,
    ) -> (Vec<Vertex>, Option<Vertex>) {
        let mut vertices = Vec::new();
        let mut stack = vec![start];
        let mut visited = VertexSet::new();

        while let Some(current) = stack.pop() {
            if !visited.insert(current) {
                continue;
            }
            if stop(current) {
                return (vertices, Some(current));
            }
            vertices.push(current);

            for &n in self.neighbors(current) {
                if visited.contains(n) || self.captured.contains(n) {
                    continue;
                }
                if current == start && Some(n) == skip_back {
                    continue;
                }
                stack.push(n);
            }
        }

        (vertices, None)
    }

    fn non_capturable_components(&mut self) -> Vec<NonCapturableComponent> {
        let mut components = Vec::new();

        // Chains hanging off the boundary
        while let Some(head) = self.outer.first() {
            let (mut vertices, tail) = self.walk(head, None, |v| {
                v != head && (self.joints.contains(v) || is_outer_vertex(v))
            });
            vertices.retain(|&v| v != head);

            for &v in &vertices {
                self.two.remove(v);
            }
            if let Some(t) = tail {
                self.outer.remove(t);
            }
            self.outer.remove(head);
            components.push(NonCapturableComponent::Chain { head, vertices, tail });
        }

        // Chains between joints, one per neighbor
        while let Some(joint) = self.joints.first() {
            for &neighbor in self.neighbors(joint) {
                if !self.two.contains(neighbor) && !self.joints.contains(neighbor) {
                    continue;
                }
                let (vertices, tail) = self.walk(neighbor, Some(joint), |v| self.joints.contains(v));
                for &v in &vertices {
                    self.two.remove(v);
                }
                components.push(NonCapturableComponent::Chain {
                    head: joint,
                    vertices,
                    tail,
                });
            }
            self.joints.remove(joint);
        }

        // Whatever is left can only be closed loops
        let left = self.two.len();
        if left > 0 && (left % 2 != 0 || left < 4) {
            panic!("invalid parity for loops: {left} degree-2 boxes left over");
        }
        while let Some(start) = self.two.first() {
            let (vertices, _) = self.walk(start, None, |_| false);
            for &v in &vertices {
                self.two.remove(v);
            }
            components.push(NonCapturableComponent::Loop { vertices });
        }

        components.sort_by_key(NonCapturableComponent::len);
        components
    }
}

// ============================================================================
// ENDGAME STATE
// ============================================================================

/// A board viewed as components, played with whole moves
#[derive(Clone, Debug)]
pub struct EndgameState {
    board: Board,
}

impl EndgameState {
    pub fn new(board: Board) -> Self {
        Self { board }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn into_board(self) -> Board {
        self.board
    }

    /// Capture sequence plus everything that is left to open
    pub fn compute_all_current_components(&self) -> Decomposition {
        let mut decomposer = Decomposer::classify(&self.board);
        let capturable = decomposer.capture_sequence();
        let non_capturable = decomposer.non_capturable_components();
        Decomposition {
            capturable,
            non_capturable,
        }
    }

    /// Capture sequence seeded only from the free boxes, with joints
    /// discovered as the walks reach them. Works outside the endgame.
    pub fn capturable_components_from_degree_one_vertices(&self) -> Vec<CapturableComponent> {
        let seeds = self.board.topology().degree_one_inner_vertices();
        Decomposer::seeded(&self.board, seeds).capture_sequence()
    }

    pub fn split_capturable_component(&self, component: &CapturableComponent) -> CaptureSplit {
        let v = &component.vertices;
        let n = v.len();
        let cutoff = match component.tail_joint {
            Some(_) => n.saturating_sub(2),
            None => n.saturating_sub(4),
        };

        let intersection = (0..cutoff).map(|i| Edge::new(v[i], v[i + 1])).collect();

        let mut full_capture_suffix: Vec<Edge> =
            (cutoff..n.saturating_sub(1)).map(|i| Edge::new(v[i], v[i + 1])).collect();
        if let (Some(tail), Some(&last)) = (component.tail_joint, v.last()) {
            full_capture_suffix.push(Edge::new(last, tail));
        }

        let handout_suffix = if component.can_hand_out() {
            match component.tail_joint {
                Some(tail) => Some(Edge::new(v[n - 1], tail)),
                None => Some(Edge::new(v[n - 3], v[n - 2])),
            }
        } else {
            None
        };

        CaptureSplit {
            intersection,
            full_capture_suffix,
            handout_suffix,
        }
    }

    pub fn full_capture_move(&self, component: &CapturableComponent) -> Vec<Edge> {
        let v = &component.vertices;
        let mut edges: Vec<Edge> = v.windows(2).map(|w| Edge::new(w[0], w[1])).collect();
        if let (Some(tail), Some(&last)) = (component.tail_joint, v.last()) {
            edges.push(Edge::new(last, tail));
        }
        edges
    }

    pub fn boxes_captured_in_full_capture(&self, component: &CapturableComponent) -> usize {
        component.boxes_captured_in_full_capture()
    }

    /// The edge that opens a component for the opponent
    ///
    /// # Panics
    /// On an empty chain without a tail.
    pub fn non_capturable_open_move(&self, component: &NonCapturableComponent) -> Edge {
        match component {
            NonCapturableComponent::Loop { vertices } => Edge::new(vertices[0], vertices[1]),
            NonCapturableComponent::Chain { head, vertices, tail } => match (vertices.as_slice(), tail) {
                ([], Some(tail)) => Edge::new(*head, *tail),
                ([], None) => panic!("empty chain at {head} has no tail"),
                ([first], _) => Edge::new(*head, *first),
                ([first, ..], Some(tail)) if tail == head => Edge::new(*head, *first),
                ([first, second, ..], _) => Edge::new(*first, *second),
            },
        }
    }

    /// Score difference, optionally crediting every untaken box to the mover
    pub fn evaluate(&self, all_remaining_to_mover: bool) -> i32 {
        let mut difference = self.board.score_difference();
        if all_remaining_to_mover {
            let unowned = self.board.unowned_boxes().count() as i32;
            difference += self.board.current_player().sign() * unowned;
        }
        difference
    }

    pub fn is_player1s_turn(&self) -> bool {
        self.board.is_player1s_turn()
    }

    /// Transposition key: the full board hash followed by the search window
    /// clamped to the reachable score range, then the recursion depth
    ///
    /// Each bound lands in 24..=72 and gets its own 7-bit field.
    pub fn state_hash(&self, alpha: f64, beta: f64, depth: u32) -> u128 {
        let clamp = |x: f64| (x.clamp(-24.0, 24.0) as i64 + 48) as u128;
        let base = self.board.full_hash();
        ((((base << 7) | clamp(alpha)) << 7) | clamp(beta)) << 8 | depth as u128
    }

    /// # Panics
    /// If the move is illegal on the current board.
    pub fn execute(&mut self, mv: &Move) {
        if let Err(err) = self.board.make_move(mv) {
            panic!("endgame search played an illegal move {mv:?}: {err}");
        }
    }

    pub fn revert(&mut self, mv: &Move) {
        if let Err(err) = self.board.revert_move(mv) {
            panic!("endgame search could not undo {mv:?}: {err}");
        }
    }

    /// Edges that give nothing away
    pub fn normal_actions(&self) -> Vec<Edge> {
        self.board.unclaimed_edges_that_do_not_create_a_box()
    }

    pub fn all_actions(&self) -> Vec<Edge> {
        self.board.unclaimed_edges()
    }

    pub fn is_end_game(&self) -> bool {
        self.board.is_end_game()
    }

    pub fn is_game_over(&self) -> bool {
        self.board.is_game_over()
    }

    pub fn result(&self) -> GameResult {
        self.board.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    const BASE_MOVES: [(Vertex, Vertex); 30] = [
        (1, 11), (46, 47), (2, 12), (26, 36), (3, 13), (31, 41), (4, 14), (23, 24),
        (5, 15), (30, 31), (35, 36), (15, 16), (46, 56), (32, 42), (22, 23), (20, 21),
        (22, 32), (10, 11), (13, 23), (23, 33), (41, 42), (43, 53), (26, 27), (44, 54),
        (45, 55), (16, 17), (33, 34), (34, 44), (14, 24), (25, 35),
    ];

    fn board_after(moves: &[(Vertex, Vertex)]) -> Board {
        let mut board = Board::new();
        for &(u, v) in moves {
            board.make_single_move(Edge::new(u, v)).unwrap();
        }
        board
    }

    /// Play every full capture in order and check nothing was missed
    fn assert_sequence_clears_board(board: &mut Board) {
        let state = EndgameState::new(board.clone());
        let decomposition = state.compute_all_current_components();

        let handouts: Vec<bool> = decomposition
            .capturable
            .iter()
            .map(CapturableComponent::can_hand_out)
            .collect();
        if handouts.last() == Some(&false) {
            assert!(!handouts.contains(&true), "{handouts:?}");
        }

        for component in &decomposition.capturable {
            let edges = state.full_capture_move(component);
            for result in board.make_move(&Move::from(edges)).unwrap() {
                assert!(result.completed_box);
            }
        }

        for v in board.topology().inner_vertices() {
            assert_ne!(board.degree(v), 1, "box {v} is still capturable");
        }
    }

    #[test]
    fn test_joint_captures_cover_every_free_box() {
        let base = board_after(&BASE_MOVES);
        assert!(base.is_end_game());

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut edges = base.unclaimed_edges();
        for count in 1..=20 {
            for _ in 0..10 {
                edges.shuffle(&mut rng);
                let mut board = base.clone();
                for &edge in &edges[..count] {
                    board.make_single_move(edge).unwrap();
                }
                assert!(board.is_end_game());
                assert_sequence_clears_board(&mut board);
            }
        }
    }

    #[test]
    fn test_random_endgames_decompose() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..50 {
            let mut board = Board::new();
            while !board.is_end_game() {
                let safe = board.unclaimed_edges_that_do_not_create_a_box();
                let edge = *safe.choose(&mut rng).unwrap();
                board.make_single_move(edge).unwrap();
            }

            let mut remaining = board.unclaimed_edges();
            remaining.shuffle(&mut rng);
            let count = rng.gen_range(0..remaining.len());
            for &edge in &remaining[..count] {
                board.make_single_move(edge).unwrap();
            }

            assert_sequence_clears_board(&mut board);
        }
    }

    #[test]
    fn test_one_edge_left_is_all_capturable() {
        let mut board = board_after(&BASE_MOVES);
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut edges = board.unclaimed_edges();
        edges.shuffle(&mut rng);
        edges.pop();
        for edge in edges {
            board.make_single_move(edge).unwrap();
        }
        assert!(!board.is_game_over());

        let decomposition = EndgameState::new(board).compute_all_current_components();
        assert!(decomposition.non_capturable.is_empty());
        assert!(!decomposition.capturable.is_empty());
    }

    #[test]
    fn test_finished_game_has_no_components() {
        let mut board = board_after(&BASE_MOVES);
        for edge in board.unclaimed_edges() {
            board.make_single_move(edge).unwrap();
        }
        assert!(board.is_game_over());

        let decomposition = EndgameState::new(board).compute_all_current_components();
        assert!(decomposition.non_capturable.is_empty());
        assert!(decomposition.capturable.is_empty());
    }

    #[test]
    fn test_capturable_components_outside_the_endgame() {
        let board = board_after(&[
            (5, 15), (1, 11), (33, 34), (46, 56), (4, 14), (40, 41), (21, 31), (46, 47),
            (3, 13), (16, 17), (34, 44), (6, 16), (35, 36), (10, 11), (45, 55), (41, 51),
            (31, 32), (12, 13), (25, 26), (42, 43), (43, 44), (36, 37), (32, 42), (20, 21),
            (12, 22), (26, 27), (15, 25), (35, 45), (14, 24),
        ]);
        assert!(!board.is_end_game());

        let mut state = EndgameState::new(board);
        assert!(state.capturable_components_from_degree_one_vertices().is_empty());

        state.execute(&Move::Edge(Edge::new(30, 31)));
        let components = state.capturable_components_from_degree_one_vertices();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].vertices, vec![31, 41, 42]);
        assert_eq!(components[0].tail_joint, Some(52));
    }

    #[test]
    fn test_short_open_chain_split() {
        // 11 is free and leads into 12, which still meets 13 and 22
        let board = board_after(&[(1, 11), (10, 11), (11, 21), (2, 12)]);
        let state = EndgameState::new(board);
        let components = state.capturable_components_from_degree_one_vertices();
        assert_eq!(components.len(), 1);

        let component = &components[0];
        assert_eq!(component.vertices, vec![11]);
        assert_eq!(component.tail_joint, Some(12));
        assert!(!component.can_hand_out());
        assert_eq!(state.full_capture_move(component), vec![Edge::new(11, 12)]);

        let split = state.split_capturable_component(component);
        assert!(split.intersection.is_empty());
        assert_eq!(split.full_capture_suffix, vec![Edge::new(11, 12)]);
        assert_eq!(split.handout_suffix, None);
    }

    #[test]
    fn test_open_chain_handout_split() {
        // 11 -> 12 -> 13 with 13 still on 14 and 23
        let board = board_after(&[(1, 11), (10, 11), (11, 21), (2, 12), (12, 22), (3, 13)]);
        let state = EndgameState::new(board);
        let components = state.capturable_components_from_degree_one_vertices();
        let component = &components[0];
        assert_eq!(component.vertices, vec![11, 12]);
        assert_eq!(component.tail_joint, Some(13));
        assert!(component.can_hand_out());
        assert_eq!(component.boxes_captured_in_full_capture(), 2);

        let split = state.split_capturable_component(component);
        assert!(split.intersection.is_empty());
        assert_eq!(split.full_capture_suffix, vec![Edge::new(11, 12), Edge::new(12, 13)]);
        assert_eq!(split.handout_suffix, Some(Edge::new(12, 13)));
    }

    #[test]
    fn test_open_moves() {
        let state = EndgameState::new(Board::new());
        let chain = NonCapturableComponent::Chain {
            head: 1,
            vertices: vec![11, 21, 31],
            tail: Some(41),
        };
        assert_eq!(state.non_capturable_open_move(&chain), Edge::new(11, 21));

        let single = NonCapturableComponent::Chain {
            head: 1,
            vertices: vec![11],
            tail: Some(21),
        };
        assert_eq!(state.non_capturable_open_move(&single), Edge::new(1, 11));

        let bare = NonCapturableComponent::Chain {
            head: 12,
            vertices: vec![],
            tail: Some(13),
        };
        assert_eq!(state.non_capturable_open_move(&bare), Edge::new(12, 13));

        let around = NonCapturableComponent::Chain {
            head: 22,
            vertices: vec![12, 11, 21],
            tail: Some(22),
        };
        assert_eq!(state.non_capturable_open_move(&around), Edge::new(22, 12));

        let ring = NonCapturableComponent::Loop {
            vertices: vec![11, 12, 22, 21],
        };
        assert!(ring.is_loop());
        assert_eq!(state.non_capturable_open_move(&ring), Edge::new(11, 12));
    }

    #[test]
    fn test_evaluate_credits_mover() {
        let board = board_after(&[(1, 11), (10, 11), (11, 21), (11, 12)]);
        // Player 2 took box 11 and moves again
        assert!(!board.is_player1s_turn());
        let state = EndgameState::new(board);
        assert_eq!(state.evaluate(false), -1);
        assert_eq!(state.evaluate(true), -24);
    }

    #[test]
    fn test_state_hash_separates_windows() {
        let state = EndgameState::new(Board::new());
        let a = state.state_hash(f64::NEG_INFINITY, f64::INFINITY, 1);
        let b = state.state_hash(-24.0, 24.0, 1);
        assert_eq!(a, b);
        assert_ne!(a, state.state_hash(-3.0, 24.0, 1));
        assert_ne!(a, state.state_hash(-24.0, 24.0, 2));
        assert_ne!(a, state.state_hash(-23.0, f64::INFINITY, 1));
    }

    #[test]
    fn test_state_hash_window_fields_do_not_overlap() {
        let board = board_after(&[(1, 11), (10, 11), (11, 21), (11, 12)]);
        let state = EndgameState::new(board);

        let mut keys = rustc_hash::FxHashSet::default();
        for alpha in -24..=24 {
            for beta in -24..=24 {
                assert!(keys.insert(state.state_hash(alpha as f64, beta as f64, 3)));
            }
        }

        // The widest window leaves the board hash untouched
        let key = state.state_hash(24.0, 24.0, 255);
        assert_eq!(key >> 22, state.board().full_hash());
    }
}
