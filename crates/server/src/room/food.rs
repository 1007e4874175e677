//! Food population maintenance.

use glam::Vec2;
use protocol::{ChunkId, Point};
use rand::Rng;

use crate::entity::{Food, random_color};
use crate::room::chunks::ChunkIndex;
use crate::spatial::WorldGrid;

/// Keeps a room's food population at its target.
#[derive(Debug, Clone)]
pub struct FoodPool {
    max_amount: usize,
    radius: f32,
    count: usize,
}

impl FoodPool {
    pub fn new(max_amount: usize, radius: f32) -> Self {
        Self {
            max_amount,
            radius,
            count: 0,
        }
    }

    /// Current food count.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn max_amount(&self) -> usize {
        self.max_amount
    }

    /// How many items are missing.
    #[inline]
    pub fn deficit(&self) -> usize {
        self.max_amount.saturating_sub(self.count)
    }

    /// Spawn the deficit at random integer positions and file each item
    /// under the first chunk containing it. Returns the number spawned.
    pub fn top_up<R: Rng + ?Sized>(
        &mut self,
        grid: &WorldGrid,
        index: &mut ChunkIndex,
        rng: &mut R,
    ) -> usize {
        let bounds = grid.bounds();
        let (min_x, max_x) = (bounds.min_x.ceil() as i32, bounds.max_x.floor() as i32);
        let (min_y, max_y) = (bounds.min_y.ceil() as i32, bounds.max_y.floor() as i32);

        let mut spawned = 0;
        for _ in 0..self.deficit() {
            let position = Vec2::new(
                rng.random_range(min_x..=max_x) as f32,
                rng.random_range(min_y..=max_y) as f32,
            );
            let Some(chunk) = grid.chunk_at(position) else {
                continue;
            };
            index.add_food(chunk, Food::new(position, self.radius, random_color(rng)));
            spawned += 1;
        }
        self.count += spawned;
        spawned
    }

    /// Remove the first item lying exactly at `point` in `chunk` or one of
    /// its neighbours.
    pub fn consume(
        &mut self,
        grid: &WorldGrid,
        index: &mut ChunkIndex,
        chunk: ChunkId,
        point: Point,
    ) -> bool {
        for c in grid.neighbourhood(chunk) {
            if index.take_food_at(c, point).is_some() {
                self.count = self.count.saturating_sub(1);
                return true;
            }
        }
        false
    }

    /// Forget every item (the caller clears the chunk lists).
    pub fn clear(&mut self) {
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup(max: usize) -> (WorldGrid, ChunkIndex, FoodPool) {
        let grid = WorldGrid::new(1000.0, 1000.0, 4);
        let index = ChunkIndex::new(grid.len());
        (grid, index, FoodPool::new(max, 10.0))
    }

    #[test]
    fn test_top_up_fills_to_max() {
        let (grid, mut index, mut pool) = setup(500);
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(pool.top_up(&grid, &mut index, &mut rng), 500);
        assert_eq!(pool.count(), 500);
        assert_eq!(index.food_len(), 500);
        assert_eq!(pool.top_up(&grid, &mut index, &mut rng), 0);
        assert_eq!(index.food_len(), 500);
    }

    #[test]
    fn test_food_lands_in_containing_chunk() {
        let (grid, mut index, mut pool) = setup(300);
        let mut rng = StdRng::seed_from_u64(11);
        pool.top_up(&grid, &mut index, &mut rng);
        for chunk in grid.chunks() {
            for food in index.food(chunk.id) {
                assert!(chunk.bounds.contains(food.position));
                assert_eq!(food.position.x.fract(), 0.0);
                assert_eq!(food.position.y.fract(), 0.0);
            }
        }
    }

    #[test]
    fn test_consume_then_refill() {
        let (grid, mut index, mut pool) = setup(200);
        let mut rng = StdRng::seed_from_u64(5);
        pool.top_up(&grid, &mut index, &mut rng);

        let (chunk, target) = grid
            .chunks()
            .iter()
            .find_map(|c| index.food(c.id).first().map(|f| (c.id, Point::from(f.position))))
            .unwrap();
        assert!(pool.consume(&grid, &mut index, chunk, target));
        assert_eq!(pool.count(), 199);
        assert!(!pool.consume(&grid, &mut index, chunk, Point::new(0.5, 0.5)));
        assert_eq!(pool.deficit(), 1);

        assert_eq!(pool.top_up(&grid, &mut index, &mut rng), 1);
        assert_eq!(pool.count(), 200);
    }

    #[test]
    fn test_consume_searches_neighbours_only() {
        let (grid, mut index, mut pool) = setup(0);
        let near = Vec2::new(-400.0, -400.0); // chunk 5, diagonal neighbour of 0
        let far = Vec2::new(900.0, 900.0); // chunk 15
        index.add_food(grid.chunk_at(near).unwrap(), Food::new(near, 10.0, Default::default()));
        index.add_food(grid.chunk_at(far).unwrap(), Food::new(far, 10.0, Default::default()));

        assert!(!pool.consume(&grid, &mut index, 0, far.into()));
        assert!(pool.consume(&grid, &mut index, 0, near.into()));
        assert_eq!(index.food_len(), 1);
    }
}
