//! Immutable chunk grid and neighbour graph.

use glam::Vec2;
use protocol::ChunkId;
use rand::Rng;

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Inclusive on all four sides, so a point on a shared edge is inside
    /// both rectangles.
    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min_x && p.y >= self.min_y && p.x <= self.max_x && p.y <= self.max_y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.max_x - self.min_x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.max_y - self.min_y
    }

    #[inline]
    pub fn min(&self) -> Vec2 {
        Vec2::new(self.min_x, self.min_y)
    }

    /// Clamp a point into the rectangle.
    #[inline]
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        p.clamp(self.min(), Vec2::new(self.max_x, self.max_y))
    }
}

/// Geometry and adjacency of one chunk. Never changes after construction.
#[derive(Debug, Clone)]
pub struct ChunkGeometry {
    pub id: ChunkId,
    pub bounds: Bounds,
    /// Up to 8 neighbours, clipped at the grid edges.
    pub neighbours: Vec<ChunkId>,
}

/// The N x N partition of `[-width, width] x [-height, height]`.
///
/// Chunk ids are column-major: the chunk in column `x`, row `y` has id
/// `x * N + y`. Traversal order for tie-breaking is ascending id.
#[derive(Debug, Clone)]
pub struct WorldGrid {
    bounds: Bounds,
    chunks_per_axis: usize,
    chunk_width: f32,
    chunk_height: f32,
    chunks: Vec<ChunkGeometry>,
}

impl WorldGrid {
    /// Build the grid for a world of half-extents `width` x `height`.
    pub fn new(width: f32, height: f32, chunks_per_axis: usize) -> Self {
        let n = chunks_per_axis.max(1);
        let bounds = Bounds::new(-width, -height, width, height);
        let chunk_width = bounds.width() / n as f32;
        let chunk_height = bounds.height() / n as f32;

        let mut chunks = Vec::with_capacity(n * n);
        for x in 0..n {
            for y in 0..n {
                let (min_x, max_x) = column_span(bounds.min_x, bounds.max_x, chunk_width, n, x);
                let (min_y, max_y) = column_span(bounds.min_y, bounds.max_y, chunk_height, n, y);
                chunks.push(ChunkGeometry {
                    id: x * n + y,
                    bounds: Bounds::new(min_x, min_y, max_x, max_y),
                    neighbours: moore_neighbours(x, y, n),
                });
            }
        }

        Self {
            bounds,
            chunks_per_axis: n,
            chunk_width,
            chunk_height,
            chunks,
        }
    }

    /// World rectangle.
    #[inline]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    #[inline]
    pub fn chunks_per_axis(&self) -> usize {
        self.chunks_per_axis
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    #[inline]
    pub fn chunk(&self, id: ChunkId) -> Option<&ChunkGeometry> {
        self.chunks.get(id)
    }

    #[inline]
    pub fn chunks(&self) -> &[ChunkGeometry] {
        &self.chunks
    }

    /// Neighbours of `id` (empty for an unknown id).
    #[inline]
    pub fn neighbours(&self, id: ChunkId) -> &[ChunkId] {
        self.chunks.get(id).map(|c| c.neighbours.as_slice()).unwrap_or(&[])
    }

    /// The chunk itself followed by its neighbours.
    pub fn neighbourhood(&self, id: ChunkId) -> impl Iterator<Item = ChunkId> + '_ {
        let this = (id < self.chunks.len()).then_some(id);
        this.into_iter().chain(self.neighbours(id).iter().copied())
    }

    /// Whether chunk `id` contains `p`.
    #[inline]
    pub fn contains(&self, id: ChunkId, p: Vec2) -> bool {
        self.chunks.get(id).is_some_and(|c| c.bounds.contains(p))
    }

    /// First chunk (in id order) containing `p`, by scanning every chunk.
    pub fn find_chunk_linear(&self, p: Vec2) -> Option<ChunkId> {
        self.chunks.iter().position(|c| c.bounds.contains(p))
    }

    /// First chunk (in id order) containing `p`, computed arithmetically.
    ///
    /// Gives the same answer as [`find_chunk_linear`](Self::find_chunk_linear):
    /// a point on a shared edge resolves to the lower column, then the lower row.
    pub fn chunk_at(&self, p: Vec2) -> Option<ChunkId> {
        let n = self.chunks_per_axis;
        let x = axis_index(p.x, self.bounds.min_x, self.bounds.max_x, self.chunk_width, n)?;
        let y = axis_index(p.y, self.bounds.min_y, self.bounds.max_y, self.chunk_height, n)?;
        Some(x * self.chunks_per_axis + y)
    }

    /// Clamp a point into the world.
    #[inline]
    pub fn clamp(&self, p: Vec2) -> Vec2 {
        self.bounds.clamp(p)
    }

    /// Uniformly random point inside the world.
    pub fn random_position<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec2 {
        Vec2::new(
            rng.random_range(self.bounds.min_x..=self.bounds.max_x),
            rng.random_range(self.bounds.min_y..=self.bounds.max_y),
        )
    }
}

/// Edge `index` along one axis. Edge `n` is pinned to `max`, so the last
/// column ends exactly on the world border and neighbouring columns share
/// the same edge value.
#[inline]
fn column_edge(origin: f32, max: f32, size: f32, n: usize, index: usize) -> f32 {
    if index >= n {
        max
    } else {
        (origin + index as f32 * size).min(max)
    }
}

/// Inclusive span of column `index`.
#[inline]
fn column_span(origin: f32, max: f32, size: f32, n: usize, index: usize) -> (f32, f32) {
    (
        column_edge(origin, max, size, n, index),
        column_edge(origin, max, size, n, index + 1),
    )
}

/// Lowest index along one axis whose inclusive span contains `v`.
fn axis_index(v: f32, origin: f32, max: f32, size: f32, n: usize) -> Option<usize> {
    let guess = ((v - origin) / size).floor();
    if !guess.is_finite() {
        return None;
    }
    let guess = (guess.max(0.0) as usize).min(n - 1);
    let lo = guess.saturating_sub(1);
    let hi = (guess + 1).min(n - 1);
    (lo..=hi).find(|&i| {
        let (min, max) = column_span(origin, max, size, n, i);
        v >= min && v <= max
    })
}

fn moore_neighbours(x: usize, y: usize, n: usize) -> Vec<ChunkId> {
    let mut out = Vec::with_capacity(8);
    for dx in -1i64..=1 {
        for dy in -1i64..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            if nx < 0 || ny < 0 || nx >= n as i64 || ny >= n as i64 {
                continue;
            }
            out.push(nx as usize * n + ny as usize);
        }
    }
    out
}
