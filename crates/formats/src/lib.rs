pub mod address;
pub mod geojson;
pub mod gml;
pub mod project_file;
pub mod scene_ingest;
pub mod snapshot;
pub mod view_params;

pub use project_file::*;
pub use scene_ingest::*;
pub use view_params::*;
