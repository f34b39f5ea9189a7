// ──────────────────────────────────────────────────────────────────────────
// wad/loader.rs
//
//  *   RawLevel   (wad::level)           ──╮
//  *   PLAYPAL / COLORMAP / patches        │   --->  world::Level (16.16)
//  *   TextureBank (mut)                   │          + populated TextureBank
//                                          ╯
// ──────────────────────────────────────────────────────────────────────────

use std::collections::HashMap;

use byteorder::{ByteOrder, LittleEndian as LE};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::{
    error::RenderError,
    fixed::{Angle, Fixed, degrees_to_angle, int_to_fixed},
    wad::{
        level::{LevelError, RawLevel},
        raw::{Wad, WadError},
    },
    world::{
        BBox, Colormaps, FLAT_SIZE, Flat, FlatId, Level, Linedef, LinedefFlags, NO_TEXTURE, Node,
        Palette, SKY_FLAT_NAME, Sector, Seg, Sidedef, Subsector, Texture, TextureBank,
        TextureError, TextureId, Thing, ThingFlags, Vertex,
    },
};

/*──────────────────────────── Error type ───────────────────────────*/

#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Wad(#[from] WadError),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error(transparent)]
    Texture(#[from] TextureError),

    #[error("map failed validation: {0}")]
    Render(#[from] RenderError),

    #[error("PLAYPAL lump missing - cannot build palette")]
    NoPalette,

    #[error("lump {0} is truncated or malformed")]
    BadLump(String),

    #[error("{what} {index} references a missing {target}")]
    BadReference {
        what: &'static str,
        index: usize,
        target: &'static str,
    },
}

/// Where player 1 starts, for placing the camera.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlayerStart {
    pub x: Fixed,
    pub y: Fixed,
    pub angle: Angle,
}

#[derive(Debug)]
pub struct LoadedLevel {
    pub level: Level,
    pub player_start: Option<PlayerStart>,
}

/// Skill bit of the things spawned (classic "hurt me plenty").
const SKILL_MEDIUM: i16 = 0x0002;
const MULTIPLAYER_ONLY: i16 = 0x0010;

/// Editor number → front-facing sprite lump and draw flags.
const THING_SPRITES: &[(i16, &str, ThingFlags)] = &[
    (3004, "POSSA1", ThingFlags::empty()),
    (9, "SPOSA1", ThingFlags::empty()),
    (65, "CPOSA1", ThingFlags::empty()),
    (3001, "TROOA1", ThingFlags::empty()),
    (3002, "SARGA1", ThingFlags::empty()),
    (58, "SARGA1", ThingFlags::SHADOW),
    (3006, "SKULA1", ThingFlags::FULLBRIGHT),
    (3005, "HEADA1", ThingFlags::empty()),
    (3003, "BOSSA1", ThingFlags::empty()),
    (16, "CYBRA1", ThingFlags::empty()),
    (7, "SPIDA1", ThingFlags::empty()),
    (2035, "BAR1A0", ThingFlags::empty()),
    (2028, "COLUA0", ThingFlags::FULLBRIGHT),
    (48, "ELECA0", ThingFlags::empty()),
    (34, "CANDA0", ThingFlags::FULLBRIGHT),
    (35, "CBRAA0", ThingFlags::FULLBRIGHT),
    (44, "TBLUA0", ThingFlags::FULLBRIGHT),
    (45, "TGRNA0", ThingFlags::FULLBRIGHT),
    (46, "TREDA0", ThingFlags::FULLBRIGHT),
    (2011, "STIMA0", ThingFlags::empty()),
    (2012, "MEDIA0", ThingFlags::empty()),
    (2014, "BON1A0", ThingFlags::empty()),
    (2015, "BON2A0", ThingFlags::empty()),
    (2018, "ARM1A0", ThingFlags::empty()),
    (2019, "ARM2A0", ThingFlags::empty()),
    (2001, "SHOTA0", ThingFlags::empty()),
    (2002, "MGUNA0", ThingFlags::empty()),
    (2007, "CLIPA0", ThingFlags::empty()),
    (2008, "SHELA0", ThingFlags::empty()),
    (2048, "AMMOA0", ThingFlags::empty()),
    (2049, "SBOXA0", ThingFlags::empty()),
    (8, "BPAKA0", ThingFlags::empty()),
    (5, "BKEYA0", ThingFlags::empty()),
    (6, "YKEYA0", ThingFlags::empty()),
    (13, "RKEYA0", ThingFlags::empty()),
    (10, "PLAYW0", ThingFlags::empty()),
    (15, "PLAYN0", ThingFlags::empty()),
    (24, "POL5A0", ThingFlags::empty()),
];

/*====================================================================*/
/*                       Public API                                   */
/*====================================================================*/

/// Load the map at `marker` into a fixed-point `Level` and populate `bank`
/// with the palette, colormaps and every picture that map references.
/// Unknown texture names draw as the bank's checkerboard (id 0).
pub fn load_level(wad: &Wad, marker: usize, bank: &mut TextureBank) -> Result<LoadedLevel, LoadError> {
    let raw = wad.parse_level(marker)?;

    bank.set_palette(load_palette(wad)?);
    let colormaps = match load_colormaps(wad)? {
        Some(c) => c,
        None => {
            warn!("no COLORMAP lump, deriving light tables from the palette");
            Colormaps::from_palette(bank.palette())
        }
    };
    bank.set_colormaps(colormaps);

    let mut gfx = Graphics::new(wad)?;
    let level = convert(&raw, &mut gfx, bank)?;

    let sky_name = sky_for_map(&raw.name);
    let sky = match gfx.texture(sky_name, bank)? {
        Some(id) => Some(id),
        None => gfx.texture("SKY1", bank)?,
    };
    match sky {
        Some(id) => bank.set_sky_texture(id),
        None => warn!(sky = sky_name, "no sky texture"),
    }

    let player_start = raw.things.iter().find(|t| t.type_ == 1).map(|t| PlayerStart {
        x: int_to_fixed(t.x as i32),
        y: int_to_fixed(t.y as i32),
        angle: degrees_to_angle(t.angle as i32),
    });

    let mut loaded = LoadedLevel { level, player_start };
    loaded.level.finalise()?;
    debug!(
        map = %loaded.level.name,
        textures = bank.len(),
        things = loaded.level.things.len(),
        "map loaded"
    );
    Ok(loaded)
}

/// Sky texture by episode, or by map number for `MAPxx` names.
fn sky_for_map(name: &str) -> &'static str {
    let upper = name.to_ascii_uppercase();
    if let Some(num) = upper.strip_prefix("MAP").and_then(|n| n.parse::<u32>().ok()) {
        return match num {
            0..=11 => "SKY1",
            12..=20 => "SKY2",
            _ => "SKY3",
        };
    }
    match upper.as_bytes().get(1) {
        Some(b'2') => "SKY2",
        Some(b'3') => "SKY3",
        Some(b'4') => "SKY4",
        _ => "SKY1",
    }
}

/*====================================================================*/
/*                  Raw → Level conversion                            */
/*====================================================================*/

fn convert(raw: &RawLevel, gfx: &mut Graphics<'_>, bank: &mut TextureBank) -> Result<Level, LoadError> {
    let side = |id: u16| (id != 0xffff).then_some(id);

    let vertices = raw
        .vertices
        .iter()
        .map(|v| Vertex {
            x: int_to_fixed(v.x as i32),
            y: int_to_fixed(v.y as i32),
        })
        .collect();

    let linedefs = raw
        .linedefs
        .iter()
        .map(|l| Linedef {
            v1: l.v1,
            v2: l.v2,
            flags: LinedefFlags::from_bits_truncate(l.flags),
            special: l.special,
            tag: l.tag,
            front_sidedef: side(l.sidenum[0]),
            back_sidedef: side(l.sidenum[1]),
        })
        .collect();

    let mut sidedefs = Vec::with_capacity(raw.sidedefs.len());
    for s in &raw.sidedefs {
        sidedefs.push(Sidedef {
            texture_offset: int_to_fixed(s.x_off as i32),
            row_offset: int_to_fixed(s.y_off as i32),
            top: gfx.wall(&s.top_tex, bank)?,
            bottom: gfx.wall(&s.bottom_tex, bank)?,
            mid: gfx.wall(&s.mid_tex, bank)?,
            sector: s.sector,
        });
    }

    let mut sectors = Vec::with_capacity(raw.sectors.len());
    for s in &raw.sectors {
        sectors.push(Sector {
            floor_height: int_to_fixed(s.floor_h as i32),
            ceiling_height: int_to_fixed(s.ceil_h as i32),
            floor_pic: gfx.flat(&s.floor_tex, bank)?,
            ceiling_pic: gfx.flat(&s.ceil_tex, bank)?,
            light: s.light,
            special: s.special,
            tag: s.tag,
            things: Vec::new(),
        });
    }

    let sector_of = |what: &'static str, index: usize, sidedef: u16| {
        raw.sidedefs
            .get(sidedef as usize)
            .map(|s| s.sector)
            .ok_or(LoadError::BadReference {
                what,
                index,
                target: "sidedef",
            })
    };

    let mut segs = Vec::with_capacity(raw.segs.len());
    for (i, s) in raw.segs.iter().enumerate() {
        let line = raw.linedefs.get(s.linedef as usize).ok_or(LoadError::BadReference {
            what: "seg",
            index: i,
            target: "linedef",
        })?;
        let dir = (s.side != 0) as usize;
        let sidedef = line.sidenum[dir];
        let front_sector = sector_of("seg", i, sidedef)?;
        let two_sided = LinedefFlags::from_bits_truncate(line.flags).contains(LinedefFlags::TWO_SIDED);
        let back_sector = match side(line.sidenum[dir ^ 1]) {
            Some(back) if two_sided => Some(sector_of("seg", i, back)?),
            _ => None,
        };
        segs.push(Seg {
            v1: s.v1,
            v2: s.v2,
            angle: (s.angle as Angle) << 16,
            offset: int_to_fixed(s.offset as i32),
            linedef: s.linedef,
            sidedef,
            front_sector,
            back_sector,
        });
    }

    let mut subsectors = Vec::with_capacity(raw.subsectors.len());
    for (i, ss) in raw.subsectors.iter().enumerate() {
        let first: &Seg = segs.get(ss.first_seg as usize).ok_or(LoadError::BadReference {
            what: "subsector",
            index: i,
            target: "seg",
        })?;
        subsectors.push(Subsector {
            first_seg: ss.first_seg,
            seg_count: ss.seg_count,
            sector: first.front_sector,
        });
    }

    let bbox = |b: &[i16; 4]| BBox {
        top: int_to_fixed(b[0] as i32),
        bottom: int_to_fixed(b[1] as i32),
        left: int_to_fixed(b[2] as i32),
        right: int_to_fixed(b[3] as i32),
    };
    let nodes = raw
        .nodes
        .iter()
        .map(|n| Node {
            x: int_to_fixed(n.x as i32),
            y: int_to_fixed(n.y as i32),
            dx: int_to_fixed(n.dx as i32),
            dy: int_to_fixed(n.dy as i32),
            bbox: [bbox(&n.bbox[0]), bbox(&n.bbox[1])],
            child: n.child,
        })
        .collect();

    let mut things = Vec::new();
    for t in &raw.things {
        if t.options & MULTIPLAYER_ONLY != 0 || t.options & SKILL_MEDIUM == 0 {
            continue;
        }
        let Some(&(_, lump, flags)) = THING_SPRITES.iter().find(|(ty, ..)| *ty == t.type_) else {
            trace!(type_id = t.type_, "thing has no sprite");
            continue;
        };
        things.push(Thing {
            x: int_to_fixed(t.x as i32),
            y: int_to_fixed(t.y as i32),
            z: None,
            angle: degrees_to_angle(t.angle as i32),
            type_id: t.type_ as u16,
            sprite: gfx.sprite(lump, bank)?,
            flags,
            translation: 0,
            sector: 0,
        });
    }

    Ok(Level {
        name: raw.name.clone(),
        things,
        linedefs,
        sidedefs,
        vertices,
        segs,
        subsectors,
        nodes,
        sectors,
    })
}

/*====================================================================*/
/*                  Palette / patch / texture helpers                 */
/*====================================================================*/

fn read_u16(b: &[u8], at: usize, lump: &str) -> Result<u16, LoadError> {
    b.get(at..at + 2)
        .map(LE::read_u16)
        .ok_or_else(|| LoadError::BadLump(lump.to_owned()))
}

fn read_i16(b: &[u8], at: usize, lump: &str) -> Result<i16, LoadError> {
    b.get(at..at + 2)
        .map(LE::read_i16)
        .ok_or_else(|| LoadError::BadLump(lump.to_owned()))
}

fn read_u32(b: &[u8], at: usize, lump: &str) -> Result<u32, LoadError> {
    b.get(at..at + 4)
        .map(LE::read_u32)
        .ok_or_else(|| LoadError::BadLump(lump.to_owned()))
}

fn read_name(b: &[u8], at: usize, lump: &str) -> Result<String, LoadError> {
    let raw: &[u8; 8] = b
        .get(at..at + 8)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| LoadError::BadLump(lump.to_owned()))?;
    Ok(Wad::lump_name_str(raw).to_ascii_uppercase())
}

fn load_palette(wad: &Wad) -> Result<Palette, LoadError> {
    let idx = wad.find_lump("PLAYPAL").ok_or(LoadError::NoPalette)?;
    let bytes = wad.lump_bytes(idx)?;
    if bytes.len() < 768 {
        return Err(LoadError::BadLump("PLAYPAL".into()));
    }
    let mut pal = Palette::default();
    for (i, rgb) in bytes[..768].chunks_exact(3).enumerate() {
        pal[i] = 0xff00_0000 | (rgb[0] as u32) << 16 | (rgb[1] as u32) << 8 | rgb[2] as u32;
    }
    Ok(pal)
}

/// The 34 light tables, or `None` if the WAD ships none.
fn load_colormaps(wad: &Wad) -> Result<Option<Colormaps>, LoadError> {
    let Some(idx) = wad.find_lump("COLORMAP") else {
        return Ok(None);
    };
    let bytes = wad.lump_bytes(idx)?;
    if bytes.len() < 34 * 256 {
        return Err(LoadError::BadLump("COLORMAP".into()));
    }
    let mut cm = Colormaps::default();
    for (table, src) in cm.0.iter_mut().zip(bytes.chunks_exact(256)) {
        table.copy_from_slice(src);
    }
    Ok(Some(cm))
}

/// Decode a patch in column/post format; gaps stay transparent.
fn decode_patch(name: &str, raw: &[u8]) -> Result<Texture, LoadError> {
    let w = read_u16(raw, 0, name)? as usize;
    let h = read_u16(raw, 2, name)? as usize;
    let left = read_i16(raw, 4, name)? as i32;
    let top = read_i16(raw, 6, name)? as i32;
    let bad = || LoadError::BadLump(name.to_owned());
    if w == 0 || h == 0 {
        return Err(bad());
    }

    let mut texels = vec![None; w * h];
    for x in 0..w {
        let mut p = read_u32(raw, 8 + x * 4, name)? as usize;
        loop {
            let row = *raw.get(p).ok_or_else(bad)? as usize;
            if row == 0xff {
                break;
            }
            let len = *raw.get(p + 1).ok_or_else(bad)? as usize;
            let data = raw.get(p + 3..p + 3 + len).ok_or_else(bad)?;
            for (i, &c) in data.iter().enumerate() {
                if row + i < h {
                    texels[(row + i) * w + x] = Some(c);
                }
            }
            p += len + 4;
        }
    }
    Ok(Texture::from_fn(name, w, h, |x, y| texels[y * w + x]).with_offsets(left, top))
}

/// Lazy access to the WAD's pictures, inserting them into the bank on
/// first use.
struct Graphics<'w> {
    wad: &'w Wad,
    /// PNAMES in order.
    pnames: Vec<String>,
    patches: HashMap<usize, Texture>,
    /// Composite texture definitions from TEXTURE1/TEXTURE2 by name.
    defs: HashMap<String, &'w [u8]>,
}

impl<'w> Graphics<'w> {
    fn new(wad: &'w Wad) -> Result<Self, LoadError> {
        let mut pnames = Vec::new();
        if let Some(idx) = wad.find_lump("PNAMES") {
            let bytes = wad.lump_bytes(idx)?;
            let n = read_u32(bytes, 0, "PNAMES")? as usize;
            for i in 0..n {
                pnames.push(read_name(bytes, 4 + i * 8, "PNAMES")?);
            }
        }

        let mut defs = HashMap::new();
        for table in ["TEXTURE1", "TEXTURE2"] {
            let Some(idx) = wad.find_lump(table) else {
                continue;
            };
            let bytes = wad.lump_bytes(idx)?;
            let n = read_u32(bytes, 0, table)? as usize;
            for i in 0..n {
                let off = read_u32(bytes, 4 + i * 4, table)? as usize;
                let name = read_name(bytes, off, table)?;
                defs.entry(name).or_insert(&bytes[off..]);
            }
        }
        debug!(patches = pnames.len(), textures = defs.len(), "texture directory read");

        Ok(Self {
            wad,
            pnames,
            patches: HashMap::new(),
            defs,
        })
    }

    /// Sidedef texture slot: `None` for "-", checkerboard for unknown names.
    fn wall(&mut self, name: &[u8; 8], bank: &mut TextureBank) -> Result<Option<TextureId>, LoadError> {
        let name = Wad::lump_name_str(name).to_ascii_uppercase();
        if name.is_empty() || name == "-" {
            return Ok(None);
        }
        match self.texture(&name, bank)? {
            Some(id) => Ok(Some(id)),
            None => {
                warn!(texture = %name, "unknown wall texture");
                Ok(Some(NO_TEXTURE))
            }
        }
    }

    /// Composite texture by name, built and inserted on first request.
    fn texture(&mut self, name: &str, bank: &mut TextureBank) -> Result<Option<TextureId>, LoadError> {
        if let Some(id) = bank.id(name) {
            return Ok(Some(id));
        }
        let Some(&entry) = self.defs.get(name) else {
            return Ok(None);
        };
        let tex = self.compose(name, entry)?;
        Ok(Some(bank.insert(name, tex)?))
    }

    fn patch(&mut self, index: usize) -> Result<Option<&Texture>, LoadError> {
        if !self.patches.contains_key(&index) {
            let Some(name) = self.pnames.get(index) else {
                return Ok(None);
            };
            let Some(lump) = self.wad.find_lump(name) else {
                warn!(patch = %name, "patch lump missing");
                return Ok(None);
            };
            let tex = decode_patch(name, self.wad.lump_bytes(lump)?)?;
            self.patches.insert(index, tex);
        }
        Ok(self.patches.get(&index))
    }

    /// Paint every patch of a texture definition onto one canvas.
    fn compose(&mut self, name: &str, entry: &[u8]) -> Result<Texture, LoadError> {
        let w = read_i16(entry, 12, name)?.max(1) as usize;
        let h = read_i16(entry, 14, name)?.max(1) as usize;
        let count = read_i16(entry, 20, name)?.max(0) as usize;

        let mut canvas: Vec<Option<u8>> = vec![None; w * h];
        for i in 0..count {
            let at = 22 + i * 10;
            let ox = read_i16(entry, at, name)? as i32;
            let oy = read_i16(entry, at + 2, name)? as i32;
            let index = read_u16(entry, at + 4, name)? as usize;
            let Some(patch) = self.patch(index)? else {
                continue;
            };
            for px in 0..patch.width {
                let dx = ox + px as i32;
                if !(0..w as i32).contains(&dx) {
                    continue;
                }
                let column = patch.column(px as i32);
                for post in patch.posts(px as i32) {
                    for py in post.top as usize..(post.top + post.len) as usize {
                        let dy = oy + py as i32;
                        if (0..h as i32).contains(&dy) {
                            canvas[dy as usize * w + dx as usize] = Some(column[py]);
                        }
                    }
                }
            }
        }
        trace!(texture = name, w, h, patches = count, "texture composed");
        Ok(Texture::from_fn(name, w, h, |x, y| canvas[y * w + x]))
    }

    /// Floor or ceiling picture; unknown names draw the checkerboard flat.
    fn flat(&mut self, name: &[u8; 8], bank: &mut TextureBank) -> Result<FlatId, LoadError> {
        let name = Wad::lump_name_str(name).to_ascii_uppercase();
        if let Some(id) = bank.flat_id(&name) {
            return Ok(id);
        }
        let lump = self.wad.find_lump(&name);
        let bytes = match lump {
            Some(idx) => self.wad.lump_bytes(idx)?,
            None => {
                warn!(flat = %name, "unknown flat");
                return Ok(0);
            }
        };
        if bytes.len() < FLAT_SIZE * FLAT_SIZE {
            if name != SKY_FLAT_NAME {
                return Err(LoadError::BadLump(name));
            }
            // the sky flat is only a marker, its pixels are never drawn
            return Ok(bank.insert_flat(Flat::from_fn(name, |_, _| 0))?);
        }
        let flat = Flat::from_fn(name, |x, y| bytes[y * FLAT_SIZE + x]);
        Ok(bank.insert_flat(flat)?)
    }

    /// Sprite picture by lump name.
    fn sprite(&mut self, lump: &str, bank: &mut TextureBank) -> Result<TextureId, LoadError> {
        if let Some(id) = bank.id(lump) {
            return Ok(id);
        }
        let Some(idx) = self.wad.find_lump(lump) else {
            warn!(sprite = lump, "sprite lump missing");
            return Ok(NO_TEXTURE);
        };
        let tex = decode_patch(lump, self.wad.lump_bytes(idx)?)?;
        Ok(bank.insert(lump, tex)?)
    }
}

/*====================================================================*/
/*                               Tests                                */
/*====================================================================*/
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        fixed::ANG90,
        wad::{
            level::testing::square_room,
            raw::testing::{WadWriter, name8, shorts},
        },
    };
    use std::io::Write;

    /// Patch with one post per column covering rows `from..to`.
    fn patch(w: u16, h: u16, left: i16, top: i16, from: u8, to: u8, color: u8) -> Vec<u8> {
        let mut out = shorts(&[w as i16, h as i16, left, top]);
        let header = 8 + 4 * w as usize;
        let column_len = 4 + (to - from) as usize + 1;
        for x in 0..w as usize {
            out.extend(((header + x * column_len) as u32).to_le_bytes());
        }
        for _ in 0..w {
            out.extend([from, to - from, 0]);
            out.extend(std::iter::repeat(color).take((to - from) as usize));
            out.extend([0, 0xff]);
        }
        out
    }

    /// One TEXTURE1 entry made of `(x, y, pname index)` patches.
    fn texture_lump(defs: &[(&str, i16, i16, &[(i16, i16, i16)])]) -> Vec<u8> {
        let mut entries = Vec::new();
        let mut offsets = Vec::new();
        let base = 4 + 4 * defs.len();
        for (name, w, h, patches) in defs {
            offsets.push((base + entries.len()) as u32);
            entries.extend(name8(name));
            entries.extend([0u8; 4]);
            entries.extend(shorts(&[*w, *h]));
            entries.extend([0u8; 4]);
            entries.extend(shorts(&[patches.len() as i16]));
            for &(x, y, p) in *patches {
                entries.extend(shorts(&[x, y, p, 1, 0]));
            }
        }
        let mut out = (defs.len() as u32).to_le_bytes().to_vec();
        for o in offsets {
            out.extend(o.to_le_bytes());
        }
        out.extend(entries);
        out
    }

    fn pnames(names: &[&str]) -> Vec<u8> {
        let mut out = (names.len() as u32).to_le_bytes().to_vec();
        for n in names {
            out.extend(name8(n));
        }
        out
    }

    fn graphics(with_colormap: bool) -> WadWriter {
        let palette: Vec<u8> = (0..=255u8).flat_map(|i| [i, i, i]).collect();
        let mut w = WadWriter::default().lump("PLAYPAL", palette);
        if with_colormap {
            let maps: Vec<u8> = (0..34).flat_map(|_| 0..=255u8).collect();
            w = w.lump("COLORMAP", maps);
        }
        w.lump("PNAMES", pnames(&["WALLP", "BARSP"]))
            .lump("WALLP", patch(8, 16, 0, 0, 0, 16, 0x40))
            // rows 4..12 only: a see-through grate
            .lump("BARSP", patch(8, 16, 0, 0, 4, 12, 0x50))
            .lump(
                "TEXTURE1",
                texture_lump(&[
                    ("WALL", 16, 16, &[(0, 0, 0), (8, 0, 0)]),
                    ("BARS", 8, 16, &[(0, 0, 1)]),
                    ("SKY1", 16, 16, &[(0, 0, 0), (8, 0, 0)]),
                ]),
            )
            .lump("BAR1A0", patch(4, 8, 2, 8, 0, 8, 0x60))
            .marker("F_START")
            .lump("FLOOR0_1", vec![0x33u8; 4096])
            .lump("F_SKY1", vec![0u8; 4096])
            .marker("F_END")
    }

    fn room_things() -> Vec<[i16; 5]> {
        vec![
            [64, 32, 90, 1, 7],       // player 1 start
            [64, 96, 0, 2035, 7],     // barrel
            [32, 96, 0, 2035, 0x17],  // multiplayer only
            [96, 96, 0, 2035, 0x01],  // easy skill only
            [32, 32, 0, 9999, 7],     // no sprite
        ]
    }

    fn load(w: WadWriter) -> Result<(LoadedLevel, TextureBank), LoadError> {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&w.build()).unwrap();
        let wad = Wad::from_file(tmp.path())?;
        let mut bank = TextureBank::default_with_checker();
        let marker = wad.find_level("E1M1")?;
        let loaded = load_level(&wad, marker, &mut bank)?;
        Ok((loaded, bank))
    }

    #[test]
    fn empty_patch_is_rejected() {
        let flat = shorts(&[0, 16, 0, 0]);
        assert!(matches!(decode_patch("ZEROW", &flat), Err(LoadError::BadLump(n)) if n == "ZEROW"));
        // one column offset, no rows
        let mut tall = shorts(&[1, 0, 0, 0]);
        tall.extend(12u32.to_le_bytes());
        tall.push(0xff);
        assert!(matches!(decode_patch("ZEROH", &tall), Err(LoadError::BadLump(_))));
        assert!(decode_patch("WALLP", &patch(8, 16, 0, 0, 0, 16, 0x40)).is_ok());
    }

    #[test]
    fn room_converts_to_fixed_point() {
        let (loaded, bank) = load(square_room(graphics(true), "E1M1", &room_things())).unwrap();
        let level = &loaded.level;

        assert_eq!(level.vertices[2], Vertex { x: int_to_fixed(128), y: int_to_fixed(128) });
        assert_eq!(level.segs[1].angle, 0);
        assert_eq!(level.segs[0].angle, ANG90);
        assert!(level.segs.iter().all(|s| s.back_sector.is_none() && s.front_sector == 0));
        assert_eq!(level.subsectors[0].sector, 0);
        assert_eq!(level.sectors[0].ceiling_height, int_to_fixed(128));
        assert_eq!(level.sectors[0].light, 160);

        let wall = bank.id("WALL").unwrap();
        assert_eq!(level.sidedefs[0].mid, Some(wall));
        assert_eq!(level.sidedefs[0].top, None);

        assert!(bank.is_sky(level.sectors[0].ceiling_pic));
        assert_eq!(bank.flat(level.sectors[0].floor_pic).pixels[0], 0x33);
        assert_eq!(bank.sky_texture(), bank.id("SKY1").unwrap());

        assert_eq!(
            loaded.player_start,
            Some(PlayerStart {
                x: int_to_fixed(64),
                y: int_to_fixed(32),
                angle: ANG90,
            })
        );
    }

    #[test]
    fn only_single_player_things_with_sprites_spawn() {
        let (loaded, bank) = load(square_room(graphics(true), "E1M1", &room_things())).unwrap();
        let things = &loaded.level.things;
        assert_eq!(things.len(), 1);
        assert_eq!(things[0].type_id, 2035);
        assert_eq!(things[0].sprite, bank.id("BAR1A0").unwrap());
        // linked by finalise
        assert_eq!(loaded.level.sectors[0].things, vec![0]);

        let sprite = bank.texture(things[0].sprite).unwrap();
        assert_eq!((sprite.left_offset, sprite.top_offset), (2, 8));
    }

    #[test]
    fn composite_textures_keep_their_holes() {
        let (_, mut bank) = load(square_room(graphics(true), "E1M1", &[])).unwrap();
        let wad = Wad::from_bytes(square_room(graphics(true), "E1M1", &[]).build()).unwrap();
        let mut gfx = Graphics::new(&wad).unwrap();
        let bars = gfx.texture("BARS", &mut bank).unwrap().unwrap();

        let tex = bank.texture(bars).unwrap();
        assert_eq!((tex.width, tex.height), (8, 16));
        let posts = tex.posts(3);
        assert_eq!(posts.len(), 1);
        assert_eq!((posts[0].top, posts[0].len), (4, 8));
        assert_eq!(tex.column(3)[5], 0x50);

        // a second request reuses the bank entry
        assert_eq!(gfx.texture("BARS", &mut bank).unwrap(), Some(bars));
        assert_eq!(gfx.texture("NOPE", &mut bank).unwrap(), None);
    }

    #[test]
    fn colormaps_fall_back_to_the_palette() {
        let (_, bank) = load(square_room(graphics(false), "E1M1", &[])).unwrap();
        // full brightness keeps white white, the dimmest map darkens it
        assert_eq!(bank.colormaps()[0][255], 255);
        assert!(bank.colormaps()[31][255] < 255);
    }

    #[test]
    fn unknown_names_use_the_checkerboard() {
        let mut w = WadWriter::default().lump("PLAYPAL", vec![0u8; 768]);
        w = square_room(w, "E1M1", &[]);
        let (loaded, bank) = load(w).unwrap();
        assert_eq!(loaded.level.sidedefs[0].mid, Some(NO_TEXTURE));
        assert_eq!(loaded.level.sectors[0].floor_pic, 0);
        assert_eq!(bank.sky_texture(), NO_TEXTURE);
    }

    #[test]
    fn broken_data_is_reported() {
        let w = square_room(WadWriter::default(), "E1M1", &[]);
        assert!(matches!(load(w), Err(LoadError::NoPalette)));

        let w = graphics(true).lump("WALLP", vec![8u8, 0, 16]);
        let w = square_room(w, "E1M1", &[]);
        assert!(matches!(load(w), Err(LoadError::BadLump(name)) if name == "WALLP"));
    }

    #[test]
    fn sky_follows_the_episode() {
        assert_eq!(sky_for_map("E1M1"), "SKY1");
        assert_eq!(sky_for_map("e3m4"), "SKY3");
        assert_eq!(sky_for_map("MAP11"), "SKY1");
        assert_eq!(sky_for_map("MAP12"), "SKY2");
        assert_eq!(sky_for_map("MAP28"), "SKY3");
    }
}
