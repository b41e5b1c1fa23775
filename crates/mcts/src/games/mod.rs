//! Small environments for validating the search.
//!
//! Both have known optimal play, so tests can check that the engine finds it.

pub mod corridor;
pub mod two_arm;

pub use corridor::{Corridor, CorridorState, LEFT, RIGHT};
pub use two_arm::{TwoArm, TwoArmState};
