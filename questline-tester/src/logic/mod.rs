pub mod player;
pub mod reports;
pub mod tester;

pub use player::{PlayerStyle, SimulatedPlayer};
pub use tester::*;
