pub mod client;
pub mod features;
pub mod request;
pub mod texture;

pub use client::*;
pub use features::*;
pub use request::*;
pub use texture::*;
