pub mod attributes;
pub mod layer;
pub mod project;
pub mod query;
pub mod rise;
pub mod symbology;
pub mod tiles;
pub mod vector;

pub use attributes::*;
pub use layer::*;
pub use project::*;
