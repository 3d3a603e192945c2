//! Double-buffered 2D board.
//!
//! The passive buffer holds terrain only (carrots, dead markers). The screen buffer is
//! terrain plus the squares covered by living worms. The screen buffer is always rebuilt
//! from scratch out of the passive buffer and the worm list, never patched, so occupancy
//! can not go stale between ticks.

use crate::square::{Occupant, Square};
use crate::worm::Worm;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use wormsim_core::{BoardConfig, Error, Position, Result, Terrain};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    width: i32,
    height: i32,
    max_probes: usize,
    passive: Vec<Square>,
    screen: Vec<Square>,
    high_water_mark: usize,
}

impl Board {
    /// Create an empty board. Requested dimensions are clamped to `1..=max`.
    pub fn new(config: &BoardConfig) -> Self {
        let width = config.width.clamp(1, config.max_board_width.max(1));
        let height = config.height.clamp(1, config.max_board_height.max(1));
        let size = width as usize * height as usize;
        Self {
            width,
            height,
            max_probes: config.max_probes,
            passive: vec![Square::empty(); size],
            screen: vec![Square::empty(); size],
            high_water_mark: 0,
        }
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.x < self.width && pos.y >= 0 && pos.y < self.height
    }

    fn index_of(&self, pos: Position) -> Result<usize> {
        if !self.contains(pos) {
            return Err(Error::OutOfBounds {
                x: pos.x,
                y: pos.y,
                width: self.width,
                height: self.height,
            });
        }
        Ok((pos.y * self.width + pos.x) as usize)
    }

    /// Get position from index
    pub fn index_to_pos(&self, index: usize) -> Position {
        let x = (index as i32) % self.width;
        let y = (index as i32) / self.width;
        Position::new(x, y)
    }

    /// Iterator over all positions
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.passive.len()).map(move |i| self.index_to_pos(i))
    }

    /// Terrain of the passive buffer at `pos`
    pub fn get_attr_at(&self, pos: Position) -> Result<Terrain> {
        Ok(self.get_passive_square_at(pos)?.terrain)
    }

    pub fn set_passive_square_at(&mut self, pos: Position, terrain: Terrain) -> Result<()> {
        let index = self.index_of(pos)?;
        self.passive[index] = Square::with_terrain(terrain);
        Ok(())
    }

    pub fn get_passive_square_at(&self, pos: Position) -> Result<&Square> {
        let index = self.index_of(pos)?;
        Ok(&self.passive[index])
    }

    pub fn get_screen_square_at(&self, pos: Position) -> Result<&Square> {
        let index = self.index_of(pos)?;
        Ok(&self.screen[index])
    }

    /// Remove the carrot at `pos` from the passive buffer.
    /// Returns true iff there was a carrot to remove.
    pub fn try_to_eat_carrot_at(&mut self, pos: Position) -> Result<bool> {
        let index = self.index_of(pos)?;
        if self.passive[index].is_carrot() {
            self.passive[index].terrain = Terrain::Empty;
            return Ok(true);
        }
        Ok(false)
    }

    /// Reset every passive square to empty terrain
    pub fn clear_passive(&mut self) {
        self.passive.fill(Square::empty());
    }

    fn is_free_index(&self, index: usize) -> bool {
        !self.passive[index].is_carrot() && self.screen[index].is_free()
    }

    pub fn is_free(&self, pos: Position) -> bool {
        self.index_of(pos)
            .map(|index| self.is_free_index(index))
            .unwrap_or(false)
    }

    /// Pick a random square with no carrot and no worm on it.
    ///
    /// Makes up to `max_probes` uniform probes, then falls back to choosing uniformly
    /// among every free square so a nearly full board still finds its last gaps.
    pub fn find_slot<R: Rng>(&self, rng: &mut R) -> Result<Position> {
        for _ in 0..self.max_probes {
            let index = rng.gen_range(0..self.passive.len());
            if self.is_free_index(index) {
                return Ok(self.index_to_pos(index));
            }
        }

        let free: Vec<usize> = (0..self.passive.len())
            .filter(|&index| self.is_free_index(index))
            .collect();
        free.choose(rng)
            .map(|&index| self.index_to_pos(index))
            .ok_or(Error::BoardFull)
    }

    /// Place up to `count` carrots on random empty, unoccupied squares.
    /// Returns the number actually placed.
    pub fn sprinkle_carrots<R: Rng>(&mut self, count: usize, rng: &mut R) -> usize {
        let candidates: Vec<usize> = (0..self.passive.len())
            .filter(|&index| {
                self.passive[index].terrain == Terrain::Empty && !self.screen[index].is_occupied()
            })
            .collect();

        let mut placed = 0;
        for &index in candidates.choose_multiple(rng, count) {
            self.passive[index].terrain = Terrain::Carrot;
            placed += 1;
        }
        placed
    }

    /// Cover `density` of the currently empty, unoccupied squares with carrots
    pub fn sprinkle_carrots_by_density<R: Rng>(
        &mut self,
        density: f32,
        rng: &mut R,
    ) -> usize {
        let empty = self
            .passive
            .iter()
            .zip(&self.screen)
            .filter(|(passive, screen)| passive.terrain == Terrain::Empty && !screen.is_occupied())
            .count();
        let count = (empty as f32 * density.clamp(0.0, 1.0)).round() as usize;
        self.sprinkle_carrots(count, rng)
    }

    /// Number of carrots on the passive buffer
    pub fn carrot_count(&self) -> usize {
        self.passive.iter().filter(|square| square.is_carrot()).count()
    }

    /// Stamp a living worm's segments onto the screen buffer. Worms that are not alive
    /// are skipped.
    pub fn update_board_with_worm(&mut self, worm: &Worm) {
        if !worm.is_alive() {
            return;
        }
        for (segment, &pos) in worm.body().iter().enumerate() {
            if let Ok(index) = self.index_of(pos) {
                self.screen[index].occupant = Some(Occupant {
                    worm: worm.id(),
                    segment,
                });
            }
        }
    }

    /// Rebuild the screen buffer: terrain from the passive buffer, then every living worm
    pub fn update_board_with_worms_and_carrots<'a, I>(&mut self, worms: I)
    where
        I: IntoIterator<Item = &'a Worm>,
    {
        self.screen.clone_from(&self.passive);
        for worm in worms {
            self.update_board_with_worm(worm);
        }
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Record the current live population; the mark only ever goes up
    pub fn note_population(&mut self, live_worms: usize) {
        self.high_water_mark = self.high_water_mark.max(live_worms);
    }

    pub fn reset_high_water_mark(&mut self) {
        self.high_water_mark = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worm::tests::straight_worm;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use wormsim_core::WormKind;

    fn board(width: i32, height: i32) -> Board {
        Board::new(&BoardConfig {
            width,
            height,
            ..Default::default()
        })
    }

    #[test]
    fn test_board_creation() {
        let board = board(10, 10);
        assert_eq!(board.width(), 10);
        assert_eq!(board.height(), 10);
        assert_eq!(board.passive.len(), 100);
        assert_eq!(board.positions().count(), 100);
        assert_eq!(board.high_water_mark(), 0);
    }

    #[test]
    fn test_dimensions_are_clamped() {
        let board = Board::new(&BoardConfig {
            width: 500,
            height: -3,
            max_board_width: 100,
            max_board_height: 100,
            ..Default::default()
        });
        assert_eq!(board.width(), 100);
        assert_eq!(board.height(), 1);
    }

    #[test]
    fn test_out_of_bounds_access() {
        let mut board = board(10, 10);
        assert!(matches!(
            board.get_attr_at(Position::new(-1, 0)),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(matches!(
            board.set_passive_square_at(Position::new(0, 10), Terrain::Carrot),
            Err(Error::OutOfBounds { .. })
        ));
        assert!(board.get_screen_square_at(Position::new(9, 9)).is_ok());
    }

    #[test]
    fn test_eat_carrot() {
        let mut board = board(10, 10);
        let pos = Position::new(3, 4);
        board.set_passive_square_at(pos, Terrain::Carrot).unwrap();
        assert_eq!(board.get_attr_at(pos).unwrap(), Terrain::Carrot);

        assert!(board.try_to_eat_carrot_at(pos).unwrap());
        assert_eq!(board.get_attr_at(pos).unwrap(), Terrain::Empty);
        assert!(!board.try_to_eat_carrot_at(pos).unwrap());
    }

    #[test]
    fn test_screen_is_rebuilt_not_patched() {
        let mut board = board(10, 10);
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 3);
        board.update_board_with_worms_and_carrots([&worm]);
        assert!(board.get_screen_square_at(Position::new(3, 5)).unwrap().is_occupied());

        worm.advance_to(Position::new(6, 5), false);
        board.update_board_with_worms_and_carrots([&worm]);

        // The square the tail left is clear again
        assert!(!board.get_screen_square_at(Position::new(3, 5)).unwrap().is_occupied());
        let head = board.get_screen_square_at(Position::new(6, 5)).unwrap();
        assert_eq!(head.occupant, Some(Occupant { worm: worm.id(), segment: 0 }));
    }

    #[test]
    fn test_eaten_worms_are_not_drawn() {
        let mut board = board(10, 10);
        let mut worm = straight_worm(1, WormKind::Vegetarian, Position::new(5, 5), 3);
        worm.on_was_eaten();
        board.update_board_with_worms_and_carrots([&worm]);
        assert!(board.positions().all(|p| !board.get_screen_square_at(p).unwrap().is_occupied()));
    }

    #[test]
    fn test_sprinkle_carrots_is_best_effort() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let mut board = board(3, 3);
        assert_eq!(board.sprinkle_carrots(4, &mut rng), 4);
        assert_eq!(board.carrot_count(), 4);

        // Only five empty squares remain
        assert_eq!(board.sprinkle_carrots(100, &mut rng), 5);
        assert_eq!(board.carrot_count(), 9);
    }

    #[test]
    fn test_sprinkle_skips_worms() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut board = board(4, 1);
        let worm = straight_worm(1, WormKind::Cannibal, Position::new(1, 0), 2);
        board.update_board_with_worms_and_carrots([&worm]);

        assert_eq!(board.sprinkle_carrots_by_density(1.0, &mut rng), 2);
        assert_eq!(board.get_attr_at(Position::new(0, 0)).unwrap(), Terrain::Empty);
        assert_eq!(board.get_attr_at(Position::new(1, 0)).unwrap(), Terrain::Empty);
    }

    #[test]
    fn test_find_slot_on_full_board() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut board = board(5, 5);
        board.sprinkle_carrots(25, &mut rng);
        board.update_board_with_worms_and_carrots(std::iter::empty::<&Worm>());
        assert!(matches!(board.find_slot(&mut rng), Err(Error::BoardFull)));
    }

    #[test]
    fn test_find_slot_finds_the_last_gap() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut board = Board::new(&BoardConfig {
            width: 20,
            height: 20,
            max_probes: 1,
            ..Default::default()
        });
        let gap = Position::new(13, 7);
        for pos in board.positions().collect::<Vec<_>>() {
            if pos != gap {
                board.set_passive_square_at(pos, Terrain::Carrot).unwrap();
            }
        }
        board.update_board_with_worms_and_carrots(std::iter::empty::<&Worm>());
        assert_eq!(board.find_slot(&mut rng).unwrap(), gap);
    }

    #[test]
    fn test_high_water_mark_never_drops() {
        let mut board = board(5, 5);
        board.note_population(4);
        board.note_population(2);
        assert_eq!(board.high_water_mark(), 4);
        board.note_population(7);
        assert_eq!(board.high_water_mark(), 7);
        board.reset_high_water_mark();
        assert_eq!(board.high_water_mark(), 0);
    }

    proptest! {
        #[test]
        fn prop_find_slot_returns_free_square(seed in 0u64..500, carrots in 0usize..60, worm_len in 1usize..8) {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let mut board = board(8, 8);
            let worm = straight_worm(1, WormKind::Vegetarian, Position::new(7, 3), worm_len);
            board.update_board_with_worms_and_carrots([&worm]);
            board.sprinkle_carrots(carrots, &mut rng);
            board.update_board_with_worms_and_carrots([&worm]);

            if let Ok(pos) = board.find_slot(&mut rng) {
                prop_assert!(board.get_attr_at(pos).unwrap() != Terrain::Carrot);
                prop_assert!(worm.segment_index_at(pos).is_none());
            } else {
                prop_assert_eq!(board.carrot_count() + worm_len, 64);
            }
        }
    }
}
