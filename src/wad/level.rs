use crate::wad::{Wad, WadError};
use bincode::Decode;
use once_cell::sync::Lazy;
use regex::Regex;

/*=======================================================================*/
/*                         Raw binary structs                            */
/*=======================================================================*/

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawThing {
    pub x: i16,
    pub y: i16,
    pub angle: i16,
    pub type_: i16,
    pub options: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawLinedef {
    pub v1: u16,
    pub v2: u16,
    pub flags: u16,
    pub special: u16,
    pub tag: u16,
    /// `0xffff` = no sidedef.
    pub sidenum: [u16; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSidedef {
    pub x_off: i16,
    pub y_off: i16,
    pub top_tex: [u8; 8],
    pub bottom_tex: [u8; 8],
    pub mid_tex: [u8; 8],
    pub sector: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawVertex {
    pub x: i16,
    pub y: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSeg {
    pub v1: u16,
    pub v2: u16,
    /// Upper 16 bits of a binary angle.
    pub angle: u16,
    pub linedef: u16,
    /// 0 = seg runs along the linedef's front side.
    pub side: u16,
    pub offset: i16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSubsector {
    pub seg_count: u16,
    pub first_seg: u16,
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawNode {
    pub x: i16,
    pub y: i16,
    pub dx: i16,
    pub dy: i16,
    /// `[top, bottom, left, right]` for the front and back child.
    pub bbox: [[i16; 4]; 2],
    pub child: [u16; 2],
}

#[repr(C)]
#[derive(Clone, Copy, Decode, Debug)]
pub struct RawSector {
    pub floor_h: i16,
    pub ceil_h: i16,
    pub floor_tex: [u8; 8],
    pub ceil_tex: [u8; 8],
    pub light: i16,
    pub special: i16,
    pub tag: i16,
}

/*=======================================================================*/
/*                     Aggregate returned by `parse_level`               */
/*=======================================================================*/
#[derive(Debug)]
pub struct RawLevel {
    pub name: String,
    pub things: Vec<RawThing>,
    pub linedefs: Vec<RawLinedef>,
    pub sidedefs: Vec<RawSidedef>,
    pub vertices: Vec<RawVertex>,
    pub segs: Vec<RawSeg>,
    pub subsectors: Vec<RawSubsector>,
    pub nodes: Vec<RawNode>,
    pub sectors: Vec<RawSector>,
}

/*=======================================================================*/
/*                                Errors                                 */
/*=======================================================================*/

#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("marker index {0} out of bounds")]
    MarkerOob(usize),

    #[error("no map called `{0}`")]
    UnknownMap(String),

    #[error("expected lump `{0}` not found after level marker")]
    Missing(&'static str),

    #[error(transparent)]
    Wad(#[from] WadError),
}

static MAP_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(E[1-4]M[1-9]|MAP[0-3][0-9])$").expect("map name pattern is valid")
});

/*=======================================================================*/
/*                     Convenience helpers on `Wad`                      */
/*=======================================================================*/
impl Wad {
    /// Return directory indices of every map marker (`E#M#`, `MAP##`).
    pub fn level_indices(&self) -> Vec<usize> {
        self.lumps()
            .iter()
            .enumerate()
            .filter(|(_, l)| l.size == 0 && MAP_NAME.is_match(Self::lump_name_str(&l.name)))
            .map(|(i, _)| i)
            .collect()
    }

    /// Marker index of the map called `name` (`E1M1`, `map07`, ...).
    pub fn find_level(&self, name: &str) -> Result<usize, LevelError> {
        self.level_indices()
            .into_iter()
            .find(|&i| self.lump_name(i).eq_ignore_ascii_case(name))
            .ok_or_else(|| LevelError::UnknownMap(name.to_owned()))
    }

    /// Return `at` if the lump there is called `name`.
    fn idx_of(&self, at: usize, name: &'static str) -> Result<usize, LevelError> {
        let l = self.lumps().get(at).ok_or(LevelError::Missing(name))?;
        match Self::lump_name_str(&l.name) == name {
            true => Ok(at),
            false => Err(LevelError::Missing(name)),
        }
    }

    /// Decode the eight map lumps the renderer needs.
    pub fn parse_level(&self, marker_idx: usize) -> Result<RawLevel, LevelError> {
        if marker_idx >= self.lumps().len() {
            return Err(LevelError::MarkerOob(marker_idx));
        }

        // --- fixed lump order after marker -------------------------------
        let things_idx = self.idx_of(marker_idx + 1, "THINGS")?;
        let linedefs_idx = self.idx_of(marker_idx + 2, "LINEDEFS")?;
        let sidedefs_idx = self.idx_of(marker_idx + 3, "SIDEDEFS")?;
        let vertices_idx = self.idx_of(marker_idx + 4, "VERTEXES")?;
        let segs_idx = self.idx_of(marker_idx + 5, "SEGS")?;
        let ssectors_idx = self.idx_of(marker_idx + 6, "SSECTORS")?;
        let nodes_idx = self.idx_of(marker_idx + 7, "NODES")?;
        let sectors_idx = self.idx_of(marker_idx + 8, "SECTORS")?;
        // REJECT and BLOCKMAP only matter to the game

        Ok(RawLevel {
            name: self.lump_name(marker_idx).to_owned(),
            things: self.lump_to_vec(things_idx)?,
            linedefs: self.lump_to_vec(linedefs_idx)?,
            sidedefs: self.lump_to_vec(sidedefs_idx)?,
            vertices: self.lump_to_vec(vertices_idx)?,
            segs: self.lump_to_vec(segs_idx)?,
            subsectors: self.lump_to_vec(ssectors_idx)?,
            nodes: self.lump_to_vec(nodes_idx)?,
            sectors: self.lump_to_vec(sectors_idx)?,
        })
    }
}


/*=======================================================================*/
/*                                Tests                                  */
/*=======================================================================*/
