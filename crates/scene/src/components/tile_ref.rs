use foundation::bounds::Extent;
use foundation::ids::TileId;

/// Back-reference from a tile plane to the geographic cell it shows, so a
/// click can re-derive which area to load vector data for.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRef {
    pub tile: TileId,
    pub extent: Extent,
    pub row: i32,
    pub column: i32,
    /// Data source URL template the tile was built from.
    pub source_url: Option<String>,
}
