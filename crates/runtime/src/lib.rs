pub mod frame;
pub mod generation;
pub mod tween;

pub use frame::*;
pub use generation::*;
pub use tween::*;
