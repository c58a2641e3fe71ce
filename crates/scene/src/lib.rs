pub mod camera;
pub mod components;
pub mod entity;
pub mod picking;
pub mod selection;
pub mod spatial;
pub mod world;

pub use world::*;
