pub use action::*;
pub use board::*;
pub use errors::*;
pub use game::*;
pub use geometry::*;
pub use player_state::*;
pub use protocol::*;
pub use tiles::*;
pub use turn::*;

mod action;
#[cfg(test)]
mod arbitrary;
mod board;
mod errors;
mod game;
mod geometry;
mod player_state;
mod protocol;
pub mod rules;
mod tiles;
mod turn;
