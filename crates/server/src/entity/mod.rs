//! Game entities.

mod food;
mod player;

pub use food::Food;
pub use player::Player;

use protocol::Color;
use rand::Rng;

/// Generate a random color.
#[inline]
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Color {
    Color::new(
        rng.random_range(0..=255),
        rng.random_range(0..=255),
        rng.random_range(0..=255),
    )
}
