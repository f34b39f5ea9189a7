// Format-agnostic repository of wall textures, sprite patches, flats and
// the colour tables the drawers remap through.
// The renderer and world logic interact through ids only.

use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use smallvec::SmallVec;

/// Runtime handle for a wall texture or sprite patch in this bank.
///
/// *Guaranteed* to remain stable for the lifetime of the bank.
pub type TextureId = u16;

/// Runtime handle for a 64×64 flat.
pub type FlatId = u16;

/// `TextureId` whose pixels are the checkerboard fallback.
/// Always = 0 because `TextureBank::new()` inserts it first.
pub const NO_TEXTURE: TextureId = 0;

/// Flats are always this wide and tall.
pub const FLAT_SIZE: usize = 64;

/// Name that marks a sector ceiling or floor as open sky.
pub const SKY_FLAT_NAME: &str = "F_SKY1";

/// Colormap index of the invulnerability table.
pub const INVERSE_COLORMAP: u8 = 32;

/// One opaque run inside a texture column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Post {
    pub top: u16,
    pub len: u16,
}

/// Palette-indexed picture, stored column-major.
///
/// Each column is padded to a power-of-two height so that texture `v`
/// wraps with a mask. Transparent texels are absent from [`Texture::posts`].
#[derive(Clone, Debug, PartialEq)]
pub struct Texture {
    pub name: String,
    pub width: usize,
    pub height: usize,
    /// Patch origin relative to the thing's position (sprites only).
    pub left_offset: i32,
    pub top_offset: i32,
    stride: usize,
    pixels: Vec<u8>,
    posts: Vec<SmallVec<[Post; 2]>>,
}

impl Texture {
    /// Build from a texel function; `None` is transparent.
    pub fn from_fn(
        name: impl Into<String>,
        width: usize,
        height: usize,
        texel: impl Fn(usize, usize) -> Option<u8>,
    ) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let stride = height.next_power_of_two();
        let mut pixels = vec![0u8; width * stride];
        let mut posts = Vec::with_capacity(width);

        for x in 0..width {
            let col = &mut pixels[x * stride..(x + 1) * stride];
            let mut runs: SmallVec<[Post; 2]> = SmallVec::new();
            let mut open: Option<usize> = None;
            for y in 0..height {
                match texel(x, y) {
                    Some(c) => {
                        col[y] = c;
                        open.get_or_insert(y);
                    }
                    None => {
                        if let Some(top) = open.take() {
                            runs.push(Post { top: top as u16, len: (y - top) as u16 });
                        }
                    }
                }
            }
            if let Some(top) = open {
                runs.push(Post { top: top as u16, len: (height - top) as u16 });
            }
            // padding repeats the picture so masked lookups tile
            for y in height..stride {
                col[y] = col[y % height];
            }
            posts.push(runs);
        }

        Self {
            name: name.into(),
            width,
            height,
            left_offset: 0,
            top_offset: 0,
            stride,
            pixels,
            posts,
        }
    }

    /// Fully opaque texture from a row-major index buffer.
    pub fn from_rows(name: impl Into<String>, width: usize, height: usize, rows: &[u8]) -> Self {
        Self::from_fn(name, width, height, |x, y| rows.get(y * width + x).copied())
    }

    pub fn with_offsets(mut self, left: i32, top: i32) -> Self {
        self.left_offset = left;
        self.top_offset = top;
        self
    }

    /// Column `x`, wrapped horizontally.
    #[inline]
    pub fn column(&self, x: i32) -> &[u8] {
        let x = x.rem_euclid(self.width as i32) as usize;
        &self.pixels[x * self.stride..(x + 1) * self.stride]
    }

    #[inline]
    pub fn posts(&self, x: i32) -> &[Post] {
        let x = x.rem_euclid(self.width as i32) as usize;
        &self.posts[x]
    }

    /// `(frac >> FRACBITS) & height_mask` indexes a column.
    #[inline]
    pub fn height_mask(&self) -> i32 {
        self.stride as i32 - 1
    }
}

/// Convenience checkerboard 8×8 (dark/light grey).
impl Default for Texture {
    fn default() -> Self {
        const LIGHT_IDX: u8 = 8;
        const DARK_IDX: u8 = 16;
        Texture::from_fn("CHECKER", 8, 8, |x, y| {
            Some(if (x ^ y) & 1 == 0 { LIGHT_IDX } else { DARK_IDX })
        })
    }
}

/// 64×64 row-major floor/ceiling picture.
#[derive(Clone, Debug, PartialEq)]
pub struct Flat {
    pub name: String,
    pub pixels: Box<[u8; FLAT_SIZE * FLAT_SIZE]>,
}

impl Flat {
    pub fn from_fn(name: impl Into<String>, texel: impl Fn(usize, usize) -> u8) -> Self {
        let mut pixels = Box::new([0u8; FLAT_SIZE * FLAT_SIZE]);
        for (i, p) in pixels.iter_mut().enumerate() {
            *p = texel(i % FLAT_SIZE, i / FLAT_SIZE);
        }
        Self {
            name: name.into(),
            pixels,
        }
    }
}

/// Things that can go wrong when using the bank.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextureError {
    /// Attempted to insert a second texture with an existing name.
    #[error("texture name `{0}` already present in bank")]
    Duplicate(String),

    /// Requested ID is outside `0 .. bank.len()`.
    #[error("texture id {0} out of range")]
    BadId(TextureId),
}

/*──────────────────────────── colour tables ────────────────────────────*/

#[derive(Clone, Debug, PartialEq)]
pub struct Palette(pub [u32; 256]);
impl Default for Palette {
    fn default() -> Self {
        Palette([0u32; 256])
    }
}
impl Index<usize> for Palette {
    type Output = u32;
    fn index(&self, idx: usize) -> &u32 {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Palette {
    fn index_mut(&mut self, idx: usize) -> &mut u32 {
        &mut self.0[idx]
    }
}

#[inline]
fn rgb(c: u32) -> (i32, i32, i32) {
    (((c >> 16) & 0xff) as i32, ((c >> 8) & 0xff) as i32, (c & 0xff) as i32)
}

/// 5-bit-per-channel cube of nearest palette entries.
struct ColorCube(Vec<u8>);

impl ColorCube {
    fn new(palette: &Palette) -> Self {
        let expand = |c: usize| ((c << 3) | (c >> 2)) as i32;
        let cube = (0..32 * 32 * 32)
            .map(|i| {
                let (r, g, b) = (expand(i >> 10), expand((i >> 5) & 31), expand(i & 31));
                let mut best = 0u8;
                let mut best_d = i32::MAX;
                for (idx, &c) in palette.0.iter().enumerate() {
                    let (pr, pg, pb) = rgb(c);
                    let d = (pr - r).pow(2) + (pg - g).pow(2) + (pb - b).pow(2);
                    if d < best_d {
                        best_d = d;
                        best = idx as u8;
                    }
                }
                best
            })
            .collect();
        Self(cube)
    }

    #[inline]
    fn nearest(&self, r: i32, g: i32, b: i32) -> u8 {
        let q = |v: i32| (v.clamp(0, 255) >> 3) as usize;
        self.0[(q(r) << 10) | (q(g) << 5) | q(b)]
    }
}

/// 32 light levels, the invulnerability map and an all-black map.
#[derive(Clone, Debug, PartialEq)]
pub struct Colormaps(pub Box<[[u8; 256]; 34]>);

impl Default for Colormaps {
    fn default() -> Self {
        Colormaps(Box::new([[0u8; 256]; 34]))
    }
}
impl Index<usize> for Colormaps {
    type Output = [u8; 256];
    fn index(&self, idx: usize) -> &Self::Output {
        &self.0[idx]
    }
}
impl IndexMut<usize> for Colormaps {
    fn index_mut(&mut self, idx: usize) -> &mut [u8; 256] {
        &mut self.0[idx]
    }
}

impl Colormaps {
    /// Every table maps an index to itself.
    pub fn identity() -> Self {
        let mut maps = Self::default();
        for table in maps.0.iter_mut() {
            for (i, v) in table.iter_mut().enumerate() {
                *v = i as u8;
            }
        }
        maps
    }

    /// Fade tables derived from a palette, for data sets that ship none.
    pub fn from_palette(palette: &Palette) -> Self {
        let cube = ColorCube::new(palette);
        let mut maps = Self::default();
        for (level, table) in maps.0.iter_mut().take(32).enumerate() {
            let keep = 32 - level as i32;
            for (i, v) in table.iter_mut().enumerate() {
                let (r, g, b) = rgb(palette[i]);
                *v = cube.nearest(r * keep / 32, g * keep / 32, b * keep / 32);
            }
        }
        for (i, v) in maps.0[INVERSE_COLORMAP as usize].iter_mut().enumerate() {
            let (r, g, b) = rgb(palette[i]);
            let grey = 255 - (r * 77 + g * 150 + b * 29) / 256;
            *v = cube.nearest(grey, grey, grey);
        }
        maps.0[33] = [cube.nearest(0, 0, 0); 256];
        maps
    }
}

/// 50/50 mix of two palette indices, for translucent columns at 8 bpp.
#[derive(Clone, Debug, PartialEq)]
pub struct BlendTable(Box<[[u8; 256]; 256]>);

impl Default for BlendTable {
    fn default() -> Self {
        BlendTable(Box::new([[0u8; 256]; 256]))
    }
}

impl BlendTable {
    pub fn from_palette(palette: &Palette) -> Self {
        let cube = ColorCube::new(palette);
        let mut table = Self::default();
        for a in 0..256 {
            let (ar, ag, ab) = rgb(palette[a]);
            for b in a..256 {
                let (br, bg, bb) = rgb(palette[b]);
                let m = cube.nearest((ar + br) / 2, (ag + bg) / 2, (ab + bb) / 2);
                table.0[a][b] = m;
                table.0[b][a] = m;
            }
        }
        table
    }

    #[inline(always)]
    pub fn mix(&self, dst: u8, src: u8) -> u8 {
        self.0[dst as usize][src as usize]
    }
}

/// Index remaps for player colours; translation `0` means "none".
#[derive(Clone, Debug, PartialEq)]
pub struct Translations(Vec<[u8; 256]>);

impl Default for Translations {
    /// Green player ramp (0x70‥0x7f) to grey, brown and red.
    fn default() -> Self {
        let tables = [0x60u8, 0x40, 0x20]
            .into_iter()
            .map(|base| {
                let mut t = [0u8; 256];
                for (i, v) in t.iter_mut().enumerate() {
                    *v = if (0x70..=0x7f).contains(&i) {
                        base + (i as u8 & 0xf)
                    } else {
                        i as u8
                    };
                }
                t
            })
            .collect();
        Translations(tables)
    }
}

impl Translations {
    pub fn get(&self, translation: u8) -> Option<&[u8; 256]> {
        translation
            .checked_sub(1)
            .and_then(|i| self.0.get(i as usize))
    }
}

/*──────────────────────────────── bank ─────────────────────────────────*/

/// A format-agnostic cache of textures, flats and colour tables.
///
/// * Does **not** know about WADs; that’s the loader’s job.
/// * Stores exactly one copy of every name.
/// * ID **0** is always the “missing” checkerboard.
pub struct TextureBank {
    by_name: HashMap<String, TextureId>,
    data: Vec<Texture>,
    flat_by_name: HashMap<String, FlatId>,
    flats: Vec<Flat>,
    palette: Palette,
    colormaps: Colormaps,
    blend: BlendTable,
    translations: Translations,
    sky_texture: TextureId,
    sky_flat: Option<FlatId>,
}

impl TextureBank {
    // ---------------------------------------------------------------------
    // Constructors
    // ---------------------------------------------------------------------

    /// Create an empty bank with a mandatory *missing* texture used as
    /// fallback.  The texture is inserted under the fixed name `"MISSING"`
    /// and obtains the handle **0**. Flat 0 is a checkerboard as well.
    pub fn new(missing_tex: Texture) -> Self {
        let mut by_name = HashMap::new();
        by_name.insert("MISSING".into(), NO_TEXTURE);
        let missing_flat = Flat::from_fn("MISSING", |x, y| if ((x ^ y) >> 3) & 1 == 0 { 8 } else { 16 });
        let mut flat_by_name = HashMap::new();
        flat_by_name.insert("MISSING".into(), 0);
        Self {
            by_name,
            data: vec![missing_tex],
            flat_by_name,
            flats: vec![missing_flat],
            palette: Palette::default(),
            colormaps: Colormaps::identity(),
            blend: BlendTable::default(),
            translations: Translations::default(),
            sky_texture: NO_TEXTURE,
            sky_flat: None,
        }
    }

    pub fn default_with_checker() -> Self {
        Self::new(Texture::default())
    }

    /// Installing a palette also rebuilds the translucency table.
    pub fn set_palette(&mut self, palette: Palette) {
        self.blend = BlendTable::from_palette(&palette);
        self.palette = palette;
    }

    pub fn set_colormaps(&mut self, colormaps: Colormaps) {
        self.colormaps = colormaps;
    }

    pub fn set_sky_texture(&mut self, id: TextureId) {
        self.sky_texture = id;
    }

    // ---------------------------------------------------------------------
    // Query helpers
    // ---------------------------------------------------------------------

    /// Number of textures stored (including the “missing” one).
    pub fn len(&self) -> usize {
        self.data.len()
    }
    pub fn is_empty(&self) -> bool {
        self.data.len() == 1
    } // only checker

    /// Obtain the id for a *loaded* texture by name.
    /// Returns `None` if the name is unknown.
    pub fn id(&self, name: &str) -> Option<TextureId> {
        self.by_name.get(name).copied()
    }

    /// Borrow a texture by id, with bounds-checking.
    pub fn texture(&self, id: TextureId) -> Result<&Texture, TextureError> {
        self.data.get(id as usize).ok_or(TextureError::BadId(id))
    }

    /// Renderer path: bad ids draw the checkerboard.
    #[inline]
    pub fn texture_or_missing(&self, id: TextureId) -> &Texture {
        self.data.get(id as usize).unwrap_or(&self.data[0])
    }

    pub fn flat_id(&self, name: &str) -> Option<FlatId> {
        self.flat_by_name.get(name).copied()
    }

    #[inline]
    pub fn flat(&self, id: FlatId) -> &Flat {
        self.flats.get(id as usize).unwrap_or(&self.flats[0])
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }
    pub fn colormaps(&self) -> &Colormaps {
        &self.colormaps
    }
    pub fn blend(&self) -> &BlendTable {
        &self.blend
    }
    pub fn translations(&self) -> &Translations {
        &self.translations
    }
    pub fn sky_texture(&self) -> TextureId {
        self.sky_texture
    }

    #[inline]
    pub fn is_sky(&self, flat: FlatId) -> bool {
        self.sky_flat == Some(flat)
    }

    // ---------------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------------

    /// Insert a texture under `name`.
    ///
    /// * Returns the newly assigned `TextureId`.
    /// * Fails if the name already exists (`Duplicate`).
    pub fn insert<S: Into<String>>(
        &mut self,
        name: S,
        tex: Texture,
    ) -> Result<TextureId, TextureError> {
        let name = name.into();
        if self.by_name.contains_key(&name) {
            return Err(TextureError::Duplicate(name));
        }
        let id = self.data.len() as TextureId;
        self.data.push(tex);
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Insert a flat; the sky flat name is remembered.
    pub fn insert_flat(&mut self, flat: Flat) -> Result<FlatId, TextureError> {
        if self.flat_by_name.contains_key(&flat.name) {
            return Err(TextureError::Duplicate(flat.name));
        }
        let id = self.flats.len() as FlatId;
        if flat.name == SKY_FLAT_NAME {
            self.sky_flat = Some(id);
        }
        self.flat_by_name.insert(flat.name.clone(), id);
        self.flats.push(flat);
        Ok(id)
    }
}

/*======================================================================*/
/*                               Tests                                  */
/*======================================================================*/
