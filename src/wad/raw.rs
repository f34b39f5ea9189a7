//! # Doom WAD reader
//!
//! * Reads the entire file into RAM.
//! * Provides zero-copy access to individual lumps.
//! * Decodes fixed-size binary records into typed vectors with **bincode 2**.

use bincode::{Decode, config, decode_from_slice};
use byteorder::{LittleEndian as LE, ReadBytesExt};
use std::{
    collections::HashMap,
    fs,
    io::{self, Read},
    mem,
    ops::Range,
    path::Path,
};
use thiserror::Error;
use tracing::debug;

/// Size of one directory entry on disk.
const DIR_ENTRY_SIZE: usize = 16;

/// One entry in the lump directory.
#[derive(Clone, Debug)]
pub struct LumpInfo {
    pub name: [u8; 8],
    pub offset: u32,
    pub size: u32,
}

/// Entire WAD in memory (raw bytes + parsed directory).
#[derive(Debug)]
pub struct Wad {
    lumps: Vec<LumpInfo>,
    bytes: Vec<u8>,
    by_name: HashMap<String, usize>,
}

#[derive(Error, Debug)]
pub enum WadError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("file is neither an IWAD nor a PWAD")]
    BadMagic,

    #[error("directory extends beyond end of file")]
    DirectoryOutOfBounds,

    #[error("lump index {0} out of range")]
    BadIndex(usize),

    #[error("lump {name} (# {index}) slice {offset}+{size} past EOF ({file_size})")]
    BadOffset {
        index: usize,
        name: String,
        offset: u32,
        size: u32,
        file_size: usize,
    },

    #[error("lump {name} (# {index}) size {size} not multiple of element {elem_size}")]
    BadLumpSize {
        index: usize,
        name: String,
        size: usize,
        elem_size: usize,
    },

    #[error("lump {name} (# {index}) element {elem}: {source}")]
    BadElement {
        index: usize,
        name: String,
        elem: usize,
        source: bincode::error::DecodeError,
    },
}

impl Wad {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, WadError> {
        let bytes = fs::read(path.as_ref())?;
        let wad = Self::from_bytes(bytes)?;
        debug!(path = %path.as_ref().display(), lumps = wad.lumps.len(), "wad opened");
        Ok(wad)
    }

    /// Parse a WAD image already in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, WadError> {
        let mut header = bytes.as_slice();
        let mut magic = [0u8; 4];
        header.read_exact(&mut magic)?;
        if &magic != b"IWAD" && &magic != b"PWAD" {
            return Err(WadError::BadMagic);
        }
        let num_lumps = header.read_u32::<LE>()? as usize;
        let dir_offset = header.read_u32::<LE>()? as usize;

        let dir_end = dir_offset
            .checked_add(num_lumps.saturating_mul(DIR_ENTRY_SIZE))
            .filter(|&end| end <= bytes.len())
            .ok_or(WadError::DirectoryOutOfBounds)?;

        let mut lumps = Vec::with_capacity(num_lumps);
        let mut cur = &bytes[dir_offset..dir_end];
        for _ in 0..num_lumps {
            let offset = cur.read_u32::<LE>()?;
            let size = cur.read_u32::<LE>()?;
            let mut name = [0u8; 8];
            cur.read_exact(&mut name)?;
            lumps.push(LumpInfo { name, offset, size });
        }

        for (i, l) in lumps.iter().enumerate() {
            let end = l.offset as usize + l.size as usize;
            if end > bytes.len() {
                return Err(WadError::BadOffset {
                    index: i,
                    name: Self::lump_name_str(&l.name).into(),
                    offset: l.offset,
                    size: l.size,
                    file_size: bytes.len(),
                });
            }
        }

        // later lumps shadow earlier ones
        let mut by_name = HashMap::with_capacity(lumps.len());
        for (i, l) in lumps.iter().enumerate() {
            by_name.insert(Self::lump_name_str(&l.name).to_ascii_uppercase(), i);
        }

        Ok(Self {
            lumps,
            bytes,
            by_name,
        })
    }

    /// Directory as a read-only slice.
    pub fn lumps(&self) -> &[LumpInfo] {
        &self.lumps
    }

    /// `&str` view of an 8-byte lump name (trimmed at the first NUL).
    pub fn lump_name_str(name: &[u8; 8]) -> &str {
        let end = name.iter().position(|&b| b == 0).unwrap_or(name.len());
        std::str::from_utf8(&name[..end]).unwrap_or("?")
    }

    pub fn lump_name(&self, idx: usize) -> &str {
        self.lumps
            .get(idx)
            .map_or("?", |l| Self::lump_name_str(&l.name))
    }

    pub fn lump_bytes(&self, idx: usize) -> Result<&[u8], WadError> {
        let l = self.lumps.get(idx).ok_or(WadError::BadIndex(idx))?;
        let start = l.offset as usize;
        Ok(&self.bytes[start..start + l.size as usize])
    }

    /// Last lump called `name`, ignoring ASCII case.
    pub fn find_lump(&self, name: &str) -> Option<usize> {
        self.by_name.get(&name.to_ascii_uppercase()).copied()
    }

    /// Directory indices strictly between the markers `start` and `end`,
    /// e.g. `F_START`/`F_END`.
    pub fn lumps_between(&self, start: &str, end: &str) -> Option<Range<usize>> {
        let first = self
            .lumps
            .iter()
            .position(|l| Self::lump_name_str(&l.name).eq_ignore_ascii_case(start))?;
        let last = self.lumps[first..]
            .iter()
            .position(|l| Self::lump_name_str(&l.name).eq_ignore_ascii_case(end))?;
        Some(first + 1..first + last)
    }

    /// Decode a lump made of fixed-size little-endian records.
    pub fn lump_to_vec<T>(&self, idx: usize) -> Result<Vec<T>, WadError>
    where
        T: Decode<()>,
    {
        let bytes = self.lump_bytes(idx)?;
        let elem = mem::size_of::<T>();
        let name = || self.lump_name(idx).to_owned();

        if bytes.len() % elem != 0 {
            return Err(WadError::BadLumpSize {
                index: idx,
                name: name(),
                size: bytes.len(),
                elem_size: elem,
            });
        }

        let cfg = config::standard()
            .with_fixed_int_encoding()
            .with_little_endian();
        let mut out = Vec::with_capacity(bytes.len() / elem);
        let mut slice = bytes;
        while !slice.is_empty() {
            let (val, read) =
                decode_from_slice::<T, _>(slice, cfg).map_err(|e| WadError::BadElement {
                    index: idx,
                    name: name(),
                    elem: out.len(),
                    source: e,
                })?;
            out.push(val);
            slice = &slice[read..];
        }
        Ok(out)
    }
}

/// Assemble WAD images in memory for tests.
#[cfg(test)]
pub(crate) mod testing {
    #[derive(Default)]
    pub struct WadWriter {
        lumps: Vec<(String, Vec<u8>)>,
    }

    impl WadWriter {
        pub fn lump(mut self, name: &str, data: impl Into<Vec<u8>>) -> Self {
            self.lumps.push((name.to_owned(), data.into()));
            self
        }

        pub fn marker(self, name: &str) -> Self {
            self.lump(name, Vec::new())
        }

        pub fn build(&self) -> Vec<u8> {
            let data_len: usize = self.lumps.iter().map(|(_, d)| d.len()).sum();
            let dir_offset = 12 + data_len;
            let mut out = Vec::new();
            out.extend_from_slice(b"IWAD");
            out.extend((self.lumps.len() as u32).to_le_bytes());
            out.extend((dir_offset as u32).to_le_bytes());
            for (_, d) in &self.lumps {
                out.extend_from_slice(d);
            }
            let mut offset = 12u32;
            for (name, d) in &self.lumps {
                out.extend(offset.to_le_bytes());
                out.extend((d.len() as u32).to_le_bytes());
                let mut raw = [0u8; 8];
                raw[..name.len()].copy_from_slice(name.as_bytes());
                out.extend(raw);
                offset += d.len() as u32;
            }
            out
        }
    }

    /// Little-endian i16 record bytes.
    pub fn shorts(values: &[i16]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    pub fn name8(name: &str) -> [u8; 8] {
        let mut raw = [0u8; 8];
        raw[..name.len()].copy_from_slice(name.as_bytes());
        raw
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use std::io::Write;

    #[test]
    fn opens_file_and_finds_lumps() {
        let image = WadWriter::default()
            .lump("PLAYPAL", vec![1u8; 768])
            .marker("F_START")
            .lump("FLOOR0_1", vec![7u8; 4096])
            .marker("F_END")
            .lump("playpal", vec![2u8; 768])
            .build();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(&image).unwrap();

        let wad = Wad::from_file(tmp.path()).unwrap();
        assert_eq!(wad.lumps().len(), 5);
        // later lump wins, lookups ignore case
        assert_eq!(wad.find_lump("PLAYPAL"), Some(4));
        assert_eq!(wad.lump_bytes(4).unwrap()[0], 2);
        assert_eq!(wad.lumps_between("F_START", "F_END"), Some(2..3));
        assert_eq!(wad.lump_name(2), "FLOOR0_1");
        assert!(matches!(wad.lump_bytes(9), Err(WadError::BadIndex(9))));
    }

    #[test]
    fn rejects_garbage_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"NOTWAD_____").unwrap();
        let err = Wad::from_file(tmp.path()).unwrap_err();
        assert!(matches!(err, WadError::BadMagic));
    }

    #[test]
    fn truncated_header_is_io_error() {
        assert!(matches!(Wad::from_bytes(b"IWAD\x01".to_vec()), Err(WadError::Io(_))));
    }

    #[test]
    fn directory_entry_out_of_bounds() {
        let mut image = Vec::new();
        image.extend_from_slice(b"IWAD");
        image.extend(1u32.to_le_bytes());
        image.extend(12u32.to_le_bytes());
        image.extend(1_000u32.to_le_bytes()); // lump offset past EOF
        image.extend(4u32.to_le_bytes());
        image.extend(b"BAD\0\0\0\0\0");
        let err = Wad::from_bytes(image).unwrap_err();
        assert!(matches!(err, WadError::BadOffset { index: 0, .. }));

        let mut image = Vec::new();
        image.extend_from_slice(b"IWAD");
        image.extend(4u32.to_le_bytes());
        image.extend(12u32.to_le_bytes());
        assert!(matches!(
            Wad::from_bytes(image),
            Err(WadError::DirectoryOutOfBounds)
        ));
    }

    #[test]
    fn lump_to_vec_decodes_records() {
        #[repr(C)]
        #[derive(Clone, Copy, Debug, PartialEq, bincode::Decode)]
        struct Pair {
            a: i16,
            b: i16,
        }

        let image = WadWriter::default()
            .lump("PAIRS", shorts(&[1, 2, 3, -4]))
            .lump("ODD", vec![0u8; 5])
            .build();
        let wad = Wad::from_bytes(image).unwrap();

        let v: Vec<Pair> = wad.lump_to_vec(0).unwrap();
        assert_eq!(v, vec![Pair { a: 1, b: 2 }, Pair { a: 3, b: -4 }]);

        let err = wad.lump_to_vec::<Pair>(1).unwrap_err();
        assert!(matches!(err, WadError::BadLumpSize { size: 5, elem_size: 4, .. }));
    }
}
