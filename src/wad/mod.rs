//! IWAD/PWAD access: the lump directory, classic map lumps and the
//! pictures a map needs, converted into a [`Level`](crate::world::Level)
//! and a [`TextureBank`](crate::world::TextureBank).

mod level;
mod loader;
mod raw;

pub use level::{
    LevelError, RawLevel, RawLinedef, RawNode, RawSector, RawSeg, RawSidedef, RawSubsector,
    RawThing, RawVertex,
};
pub use loader::{LoadError, LoadedLevel, PlayerStart, load_level};
pub use raw::{LumpInfo, Wad, WadError};
