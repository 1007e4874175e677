//! Food pellet.

use glam::Vec2;
use protocol::packets::FoodView;
use protocol::{Color, Point};

/// A food pellet that can be eaten by players.
#[derive(Debug, Clone, PartialEq)]
pub struct Food {
    /// Integer-valued, assigned by the server and never moved.
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
}

impl Food {
    /// Create a new food pellet.
    pub fn new(position: Vec2, radius: f32, color: Color) -> Self {
        Self { position, radius, color }
    }

    /// Exact coordinate match against a client-reported point.
    #[inline]
    pub fn is_at(&self, p: Point) -> bool {
        self.position.x == p.x && self.position.y == p.y
    }

    pub fn view(&self) -> FoodView {
        FoodView {
            x: self.position.x,
            y: self.position.y,
            r: self.radius,
            color: self.color,
        }
    }
}
