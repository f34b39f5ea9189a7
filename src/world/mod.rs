pub mod bsp;
mod camera;
pub mod demo;
mod geometry;
mod texture;

pub use geometry::{
    BBox, Level, Linedef, LinedefFlags, LinedefId, Node, NodeId, Sector, SectorId, Seg, SegmentId,
    Sidedef, SidedefId, Subsector, SubsectorId, Thing, ThingFlags, ThingId, Vertex, VertexId,
};

pub use camera::Camera;

pub use texture::{
    BlendTable, Colormaps, FLAT_SIZE, Flat, FlatId, INVERSE_COLORMAP, NO_TEXTURE, Palette, Post,
    SKY_FLAT_NAME, Texture, TextureBank, TextureError, TextureId, Translations,
};
