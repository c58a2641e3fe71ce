pub mod material;
pub mod mesh;
pub mod tile_ref;
pub mod transform;
pub mod visibility;

pub use material::*;
pub use mesh::*;
pub use tile_ref::*;
pub use transform::*;
pub use visibility::*;
