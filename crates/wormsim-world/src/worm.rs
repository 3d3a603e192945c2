//! Worm state and its life-status state machine.
//!
//! A worm never moves itself: the simulation decides where a head goes because that
//! requires looking at the shared board. The worm owns its body, stomach and status and
//! enforces the rules that only concern itself.

use crate::board::Board;
use crate::registry::{type_info, WormTypeInfo};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use wormsim_core::{
    Direction, Error, MetabolismConfig, Position, Result, WormId, WormKind, WormStatus,
};

/// A worm in the simulation. `body[0]` is the head.
#[derive(Debug, Clone)]
pub struct Worm {
    id: WormId,
    body: VecDeque<Position>,
    direction: Direction,
    status: WormStatus,
    stomach: i32,
    type_info: &'static WormTypeInfo,
}

/// The tail half cut off a sliced worm, waiting for the simulation to register it as a
/// worm of its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceRemainder {
    pub body: VecDeque<Position>,
    pub direction: Direction,
    pub kind: WormKind,
    pub stomach: i32,
}

impl Worm {
    /// Create a single-segment worm on a free square of `board`.
    pub fn spawn(
        id: WormId,
        position: Position,
        direction: Direction,
        type_info: &'static WormTypeInfo,
        stomach: i32,
        board: &Board,
    ) -> Result<Self> {
        let square = board.get_screen_square_at(position)?;
        if !square.is_free() {
            return Err(Error::Occupied {
                x: position.x,
                y: position.y,
            });
        }

        Ok(Self {
            id,
            body: VecDeque::from([position]),
            direction,
            status: WormStatus::Alive,
            stomach,
            type_info,
        })
    }

    /// Turn a slice remainder into a living worm with its own id
    pub(crate) fn from_remainder(id: WormId, remainder: SliceRemainder) -> Self {
        Self {
            id,
            body: remainder.body,
            direction: remainder.direction,
            status: WormStatus::Alive,
            stomach: remainder.stomach,
            type_info: type_info(remainder.kind),
        }
    }

    pub fn id(&self) -> WormId {
        self.id
    }

    pub fn body(&self) -> &VecDeque<Position> {
        &self.body
    }

    pub fn head(&self) -> Option<Position> {
        self.body.front().copied()
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn status(&self) -> WormStatus {
        self.status
    }

    pub fn is_alive(&self) -> bool {
        self.status == WormStatus::Alive
    }

    pub fn stomach(&self) -> i32 {
        self.stomach
    }

    pub fn type_info(&self) -> &'static WormTypeInfo {
        self.type_info
    }

    pub fn kind(&self) -> WormKind {
        self.type_info.kind
    }

    pub fn attr(&self) -> i32 {
        self.type_info.attr
    }

    /// Food another worm gains by eating this one; proportional to body length
    pub fn food_value(&self) -> i32 {
        self.body.len() as i32 * self.type_info.food_value_per_segment
    }

    /// Index of the segment at `position`, if any
    pub fn segment_index_at(&self, position: Position) -> Option<usize> {
        self.body.iter().position(|&segment| segment == position)
    }

    /// Consecutive segments are always neighbouring squares
    pub fn are_all_segments_contiguous(&self) -> bool {
        self.body
            .iter()
            .zip(self.body.iter().skip(1))
            .all(|(a, b)| a.is_adjacent(b))
    }

    pub fn check_contiguity(&self) -> Result<()> {
        if self.are_all_segments_contiguous() {
            Ok(())
        } else {
            Err(Error::InvariantViolation(format!(
                "{} has non-contiguous segments: {:?}",
                self.id, self.body
            )))
        }
    }

    /// Most food the stomach can hold; grows with the body
    pub fn capacity(&self, metabolism: &MetabolismConfig) -> i32 {
        (self.body.len() as i32)
            .saturating_mul(self.type_info.capacity_per_segment)
            .saturating_mul(metabolism.capacity_scale)
    }

    /// A living worm is hungry while its stomach is below three quarters of capacity.
    /// Only hungry worms eat.
    pub fn is_hungry(&self, metabolism: &MetabolismConfig) -> bool {
        self.is_alive() && 4 * i64::from(self.stomach) < 3 * i64::from(self.capacity(metabolism))
    }

    /// Run one tick of metabolism: anything over capacity is lost, then the tick's food
    /// is burned. Returns true if the worm starved during this call.
    pub fn live(&mut self, metabolism: &MetabolismConfig) -> bool {
        if !self.is_alive() {
            return false;
        }

        self.stomach = self.stomach.min(self.capacity(metabolism));
        self.stomach -= metabolism.metabolism_rate;
        self.update_status_based_on_stomach(metabolism.starvation_threshold)
    }

    fn update_status_based_on_stomach(&mut self, starvation_threshold: i32) -> bool {
        if self.is_alive() && self.stomach < starvation_threshold {
            self.status = WormStatus::Dead;
            return true;
        }
        false
    }

    /// Mark the worm as eaten and hand back the squares its body covered.
    /// Calling this on a worm that is no longer alive does nothing.
    pub fn on_was_eaten(&mut self) -> Vec<Position> {
        if !self.is_alive() {
            return Vec::new();
        }

        self.status = WormStatus::Eaten;
        self.body.drain(..).collect()
    }

    /// Cut the worm behind segment `index`.
    ///
    /// The head side, including the struck segment, stays with this worm. The rest is
    /// returned as a remainder that inherits heading and kind and starts with
    /// `remainder_stomach`. Striking the head or the last segment cuts nothing.
    pub fn on_was_sliced_at_segment_index(
        &mut self,
        index: usize,
        remainder_stomach: i32,
    ) -> Result<Option<SliceRemainder>> {
        let len = self.body.len();
        if index >= len {
            return Err(Error::InvalidSliceIndex { index, len });
        }
        if index == 0 || index == len - 1 {
            return Ok(None);
        }

        let tail = self.body.split_off(index + 1);
        let kept = self.body.len();
        self.stomach = (self.stomach as i64 * kept as i64 / len as i64) as i32;

        Ok(Some(SliceRemainder {
            body: tail,
            direction: self.direction,
            kind: self.kind(),
            stomach: remainder_stomach,
        }))
    }

    /// Move the head to `position`. The tail follows unless `grow` is set.
    /// Returns the square the tail vacated.
    pub(crate) fn advance_to(&mut self, position: Position, grow: bool) -> Option<Position> {
        self.body.push_front(position);
        if grow {
            None
        } else {
            self.body.pop_back()
        }
    }

    pub(crate) fn turn(&mut self, direction: Direction) {
        self.direction = direction;
    }

    pub(crate) fn feed(&mut self, amount: i32) {
        self.stomach += amount;
    }
}

/// Serializable worm snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WormData {
    pub id: WormId,
    pub kind: WormKind,
    pub status: WormStatus,
    pub direction: Direction,
    pub stomach: i32,
    pub body: Vec<Position>,
}

impl From<&Worm> for WormData {
    fn from(worm: &Worm) -> Self {
        Self {
            id: worm.id,
            kind: worm.kind(),
            status: worm.status,
            direction: worm.direction,
            stomach: worm.stomach,
            body: worm.body.iter().copied().collect(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use wormsim_core::BoardConfig;

    fn test_board() -> Board {
        Board::new(&BoardConfig {
            width: 10,
            height: 10,
            ..Default::default()
        })
    }

    /// A worm with an explicit body (head first) and a stomach of 20
    pub(crate) fn worm_with_body(
        id: u64,
        kind: WormKind,
        body: Vec<Position>,
        direction: Direction,
    ) -> Worm {
        Worm {
            id: WormId(id),
            body: body.into(),
            direction,
            status: WormStatus::Alive,
            stomach: 20,
            type_info: type_info(kind),
        }
    }

    /// The same worm with a different stomach
    pub(crate) fn with_stomach(mut worm: Worm, stomach: i32) -> Worm {
        worm.stomach = stomach;
        worm
    }

    /// A straight worm heading east whose head is at `head` and whose body trails west
    pub(crate) fn straight_worm(id: u64, kind: WormKind, head: Position, len: usize) -> Worm {
        let body = (0..len as i32).map(|i| head.add(-i, 0)).collect();
        worm_with_body(id, kind, body, Direction::East)
    }

    #[test]
    fn test_worm_spawn() {
        let board = test_board();
        let worm = Worm::spawn(
            WormId(1),
            Position::new(4, 4),
            Direction::North,
            type_info(WormKind::Vegetarian),
            30,
            &board,
        )
        .unwrap();

        assert_eq!(worm.len(), 1);
        assert_eq!(worm.head(), Some(Position::new(4, 4)));
        assert!(worm.is_alive());
        assert_eq!(worm.kind(), WormKind::Vegetarian);
        assert!(worm.are_all_segments_contiguous());
    }

    #[test]
    fn test_spawn_out_of_bounds_fails() {
        let board = test_board();
        let result = Worm::spawn(
            WormId(1),
            Position::new(10, 0),
            Direction::North,
            type_info(WormKind::Vegetarian),
            30,
            &board,
        );
        assert!(matches!(result, Err(Error::OutOfBounds { .. })));
    }

    #[test]
    fn test_spawn_on_carrot_fails() {
        let mut board = test_board();
        let pos = Position::new(2, 3);
        board.set_passive_square_at(pos, wormsim_core::Terrain::Carrot).unwrap();
        board.update_board_with_worms_and_carrots(std::iter::empty::<&Worm>());

        let result = Worm::spawn(
            WormId(1),
            pos,
            Direction::North,
            type_info(WormKind::Cannibal),
            30,
            &board,
        );
        assert!(matches!(result, Err(Error::Occupied { x: 2, y: 3 })));
    }

    #[test]
    fn test_live_starves_below_threshold() {
        let metabolism = MetabolismConfig {
            metabolism_rate: 1,
            starvation_threshold: 1,
            ..Default::default()
        };
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 2);
        worm.stomach = 2;

        assert!(!worm.live(&metabolism));
        assert_eq!(worm.stomach(), 1);
        assert!(worm.is_alive());

        assert!(worm.live(&metabolism));
        assert_eq!(worm.status(), WormStatus::Dead);

        // Terminal: further ticks change nothing
        assert!(!worm.live(&metabolism));
        assert_eq!(worm.stomach(), 0);
        assert_eq!(worm.status(), WormStatus::Dead);
    }

    #[test]
    fn test_on_was_eaten_is_idempotent() {
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 3);
        let released = worm.on_was_eaten();
        assert_eq!(released.len(), 3);
        assert_eq!(worm.status(), WormStatus::Eaten);
        assert!(worm.is_empty());

        assert!(worm.on_was_eaten().is_empty());
        assert_eq!(worm.status(), WormStatus::Eaten);
    }

    #[test]
    fn test_dead_worm_cannot_be_eaten() {
        let mut worm = straight_worm(1, WormKind::Cannibal, Position::new(5, 5), 3);
        worm.stomach = 0;
        worm.live(&MetabolismConfig::default());
        assert_eq!(worm.status(), WormStatus::Dead);

        assert!(worm.on_was_eaten().is_empty());
        assert_eq!(worm.status(), WormStatus::Dead);
        assert_eq!(worm.len(), 3);
    }

    #[test]
    fn test_slice_in_the_middle() {
        let mut worm = straight_worm(1, WormKind::Scissorhead, Position::new(8, 5), 5);
        worm.stomach = 10;

        let remainder = worm.on_was_sliced_at_segment_index(2, 30).unwrap().unwrap();

        assert_eq!(worm.len(), 3);
        assert_eq!(remainder.body.len(), 2);
        assert_eq!(remainder.body[0], Position::new(5, 5));
        assert_eq!(remainder.direction, Direction::East);
        assert_eq!(remainder.kind, WormKind::Scissorhead);
        assert_eq!(remainder.stomach, 30);
        // Stomach shrinks with the body: 10 * 3 / 5
        assert_eq!(worm.stomach(), 6);
        assert!(worm.are_all_segments_contiguous());
    }

    #[test]
    fn test_slice_at_ends_is_a_no_op() {
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(8, 5), 4);
        assert_eq!(worm.on_was_sliced_at_segment_index(0, 30).unwrap(), None);
        assert_eq!(worm.on_was_sliced_at_segment_index(3, 30).unwrap(), None);
        assert_eq!(worm.len(), 4);
        assert_eq!(worm.stomach(), 20);
    }

    #[test]
    fn test_slice_out_of_range_is_reported() {
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(8, 5), 4);
        let result = worm.on_was_sliced_at_segment_index(4, 30);
        assert!(matches!(
            result,
            Err(Error::InvalidSliceIndex { index: 4, len: 4 })
        ));
        assert_eq!(worm.len(), 4);
    }

    #[test]
    fn test_segment_index_at() {
        let worm = straight_worm(1, WormKind::Vegetarian, Position::new(8, 5), 4);
        assert_eq!(worm.segment_index_at(Position::new(8, 5)), Some(0));
        assert_eq!(worm.segment_index_at(Position::new(6, 5)), Some(2));
        assert_eq!(worm.segment_index_at(Position::new(6, 6)), None);
    }

    #[test]
    fn test_advance_and_grow() {
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 3);
        let vacated = worm.advance_to(Position::new(6, 5), false);
        assert_eq!(vacated, Some(Position::new(3, 5)));
        assert_eq!(worm.len(), 3);

        assert_eq!(worm.advance_to(Position::new(7, 6), true), None);
        assert_eq!(worm.len(), 4);
        assert_eq!(worm.head(), Some(Position::new(7, 6)));
        assert!(worm.are_all_segments_contiguous());
    }

    #[test]
    fn test_contiguity_violation_is_detected() {
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 2);
        worm.advance_to(Position::new(8, 8), false);
        assert!(!worm.are_all_segments_contiguous());
        assert!(matches!(
            worm.check_contiguity(),
            Err(Error::InvariantViolation(_))
        ));
    }

    #[test]
    fn test_food_value_scales_with_length() {
        let worm = straight_worm(1, WormKind::Cannibal, Position::new(5, 5), 3);
        assert_eq!(worm.food_value(), 3 * type_info(WormKind::Cannibal).food_value_per_segment);
    }

    #[test]
    fn test_live_caps_stomach_at_capacity() {
        let metabolism = MetabolismConfig::default();
        // 2 segments * 3 per segment * scale 10
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 2);
        assert_eq!(worm.capacity(&metabolism), 60);

        worm.stomach = 100;
        assert!(!worm.live(&metabolism));
        assert_eq!(worm.stomach(), 60 - metabolism.metabolism_rate);
    }

    #[test]
    fn test_hunger_threshold() {
        let metabolism = MetabolismConfig::default();
        let mut worm = straight_worm(1, WormKind::Cannibal, Position::new(5, 5), 1);
        assert_eq!(worm.capacity(&metabolism), 50);

        // Hungry strictly below three quarters of capacity
        worm.stomach = 37;
        assert!(worm.is_hungry(&metabolism));
        worm.stomach = 38;
        assert!(!worm.is_hungry(&metabolism));

        worm.stomach = 0;
        worm.on_was_eaten();
        assert!(!worm.is_hungry(&metabolism));
    }

    proptest! {
        #[test]
        fn prop_slice_conserves_segments(len in 3usize..12, cut in 1usize..11) {
            prop_assume!(cut < len - 1);
            let mut worm = straight_worm(1, WormKind::Scissorhead, Position::new(20, 5), len);
            let remainder = worm.on_was_sliced_at_segment_index(cut, 30).unwrap().unwrap();
            let rest = Worm::from_remainder(WormId(2), remainder);

            prop_assert_eq!(worm.len() + rest.len(), len);
            prop_assert!(worm.are_all_segments_contiguous());
            prop_assert!(rest.are_all_segments_contiguous());
            prop_assert_ne!(worm.id(), rest.id());
        }

        #[test]
        fn prop_status_never_returns_to_alive(stomach in -5i32..10, ticks in 1usize..20) {
            let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 2);
            worm.stomach = stomach;
            let metabolism = MetabolismConfig::default();
            let mut seen_terminal = false;
            for _ in 0..ticks {
                worm.live(&metabolism);
                if seen_terminal {
                    prop_assert!(worm.status().is_terminal());
                }
                seen_terminal |= worm.status().is_terminal();
            }
        }
    }
}
