//! PC Screen Font, versions 1 and 2.
//!
//! PSF1 is the fixed-width-8 DOS variant: header `0x36 0x04 mode
//! charsize`, 256 or 512 glyphs, optionally followed by a UCS-2 table
//! with `0xFFFF` separators. PSF2 is the modern one: a 32-byte
//! little-endian header, row-padded bitmaps of any size, and a UTF-8
//! unicode table with `0xFF` separators and `0xFE` sequence groups.

use crate::geometry::size;
use crate::glyph::Glyph;
use crate::unimap::UnicodeMap;
use crate::{Error, Font, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

const PSF1_MAGIC: [u8; 2] = [0x36, 0x04];
const PSF2_MAGIC: [u8; 4] = [0x72, 0xB5, 0x4A, 0x86];

const PSF1_MODE_512: u8 = 0x01;
const PSF1_MODE_TAB: u8 = 0x02;
const PSF2_HAS_TAB: u32 = 0x01;
const PSF2_HEADER_LEN: u32 = 32;

/// Loads either PSF version, picked by magic.
pub fn load(path: &Path) -> Result<Font> {
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;
    if data.starts_with(&PSF2_MAGIC) {
        load_psf2(path, &data)
    } else if data.starts_with(&PSF1_MAGIC) {
        load_psf1(path, &data)
    } else {
        Err(Error::format(path, "not a PSF file (bad magic)"))
    }
}

fn load_psf1(path: &Path, data: &[u8]) -> Result<Font> {
    if data.len() < 4 {
        return Err(Error::format(path, "truncated PSF1 header"));
    }
    let mode = data[2];
    let charsize = data[3] as usize;
    if charsize == 0 {
        return Err(Error::format(path, "PSF1 charsize is zero"));
    }
    let count = if mode & PSF1_MODE_512 != 0 { 512 } else { 256 };
    let bitmaps = &data[4..];
    if bitmaps.len() < count * charsize {
        return Err(Error::format(path, "truncated PSF1 glyph data"));
    }
    let mut font = Font::new();
    for i in 0..count {
        let cell = &bitmaps[i * charsize..(i + 1) * charsize];
        font.glyphs.push(Glyph::from_rpad(size(8, charsize as u32), cell)?);
    }
    if mode & (PSF1_MODE_TAB | 0x04) != 0 {
        font.map = Some(read_psf1_table(&bitmaps[count * charsize..], count));
    }
    Ok(font)
}

/// UCS-2 stream: singles per glyph up to the `0xFFFF` separator;
/// `0xFFFE` opens combining sequences, which are skipped.
fn read_psf1_table(mut data: &[u8], count: usize) -> UnicodeMap {
    let mut map = UnicodeMap::new();
    let mut idx = 0;
    let mut in_seq = false;
    while data.len() >= 2 && idx < count {
        let unit = u16::from_le_bytes([data[0], data[1]]);
        data = &data[2..];
        match unit {
            0xFFFF => {
                idx += 1;
                in_seq = false;
            }
            0xFFFE => in_seq = true,
            cp if !in_seq => map.add_i2u(idx, cp as u32),
            _ => {}
        }
    }
    map
}

fn read_u32(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

fn load_psf2(path: &Path, data: &[u8]) -> Result<Font> {
    let field = |at: usize| read_u32(data, at).ok_or_else(|| Error::format(path, "truncated PSF2 header"));
    let _version = field(4)?;
    let headersize = field(8)? as usize;
    let flags = field(12)?;
    let length = field(16)? as usize;
    let charsize = field(20)? as usize;
    let height = field(24)?;
    let width = field(28)?;
    if width == 0 || height == 0 || charsize != (width as usize + 7) / 8 * height as usize {
        return Err(Error::format(
            path,
            format!("inconsistent PSF2 geometry {}x{} charsize {}", width, height, charsize),
        ));
    }
    let bitmaps = data
        .get(headersize..)
        .ok_or_else(|| Error::format(path, "PSF2 header size beyond file"))?;
    if bitmaps.len() < length * charsize {
        return Err(Error::format(path, "truncated PSF2 glyph data"));
    }
    let mut font = Font::new();
    for i in 0..length {
        let cell = &bitmaps[i * charsize..(i + 1) * charsize];
        font.glyphs.push(Glyph::from_rpad(size(width, height), cell)?);
    }
    if flags & PSF2_HAS_TAB != 0 {
        font.map = Some(read_psf2_table(&bitmaps[length * charsize..], length));
    }
    Ok(font)
}

/// UTF-8 stream: codepoints per glyph up to the `0xFF` separator;
/// `0xFE` opens sequence groups, which are skipped.
fn read_psf2_table(data: &[u8], count: usize) -> UnicodeMap {
    let mut map = UnicodeMap::new();
    let mut idx = 0;
    let mut at = 0;
    let mut in_seq = false;
    while at < data.len() && idx < count {
        match data[at] {
            0xFF => {
                idx += 1;
                in_seq = false;
                at += 1;
            }
            0xFE => {
                in_seq = true;
                at += 1;
            }
            lead => {
                let len = match lead {
                    0x00..=0x7F => 1,
                    0xC0..=0xDF => 2,
                    0xE0..=0xEF => 3,
                    _ => 4,
                };
                let end = (at + len).min(data.len());
                if !in_seq {
                    if let Ok(s) = std::str::from_utf8(&data[at..end]) {
                        if let Some(c) = s.chars().next() {
                            map.add_i2u(idx, c as u32);
                        }
                    }
                }
                at = end;
            }
        }
    }
    map
}

/// Writes PSF1. The font must be 8 pixels wide and have 256 or 512
/// glyphs for the header to be expressible.
pub fn save_psf1(font: &Font, out: &mut dyn Write) -> Result<()> {
    let sz = font
        .nominal_size()
        .ok_or_else(|| Error::Precondition("savepsf: font is empty".into()))?;
    if sz.w != 8 {
        return Err(Error::Precondition(format!(
            "savepsf: PSF1 requires width 8, font is {}",
            sz.w
        )));
    }
    let mut mode = 0;
    if font.glyphs.len() > 256 {
        mode |= PSF1_MODE_512;
    }
    if font.map.is_some() {
        mode |= PSF1_MODE_TAB;
    }
    let io = |e| Error::io("-", e);
    out.write_all(&[PSF1_MAGIC[0], PSF1_MAGIC[1], mode, sz.h as u8])
        .map_err(io)?;
    let count = if mode & PSF1_MODE_512 != 0 { 512 } else { 256 };
    let blank = Glyph::blank(sz);
    for i in 0..count {
        let g = font.glyphs.get(i).unwrap_or(&blank);
        out.write_all(&g.as_rowpad()).map_err(io)?;
    }
    if let Some(map) = &font.map {
        for i in 0..count {
            for cp in map.to_unicode(i) {
                if cp <= 0xFFFD {
                    out.write_all(&(cp as u16).to_le_bytes()).map_err(io)?;
                }
            }
            out.write_all(&0xFFFFu16.to_le_bytes()).map_err(io)?;
        }
    }
    Ok(())
}

/// Writes PSF2 with a unicode table when the font carries a map.
pub fn save_psf2(font: &Font, out: &mut dyn Write) -> Result<()> {
    let sz = font
        .nominal_size()
        .ok_or_else(|| Error::Precondition("savepsf: font is empty".into()))?;
    let charsize = (sz.w as usize + 7) / 8 * sz.h as usize;
    let flags = if font.map.is_some() { PSF2_HAS_TAB } else { 0 };
    let io = |e| Error::io("-", e);
    out.write_all(&PSF2_MAGIC).map_err(io)?;
    for word in &[
        0u32,
        PSF2_HEADER_LEN,
        flags,
        font.glyphs.len() as u32,
        charsize as u32,
        sz.h,
        sz.w,
    ] {
        out.write_all(&word.to_le_bytes()).map_err(io)?;
    }
    for g in &font.glyphs {
        out.write_all(&g.as_rowpad()).map_err(io)?;
    }
    if let Some(map) = &font.map {
        for i in 0..font.glyphs.len() {
            for cp in map.to_unicode(i) {
                let mut buf = [0u8; 4];
                if let Some(c) = std::char::from_u32(cp) {
                    out.write_all(c.encode_utf8(&mut buf).as_bytes()).map_err(io)?;
                }
            }
            out.write_all(&[0xFF]).map_err(io)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    fn tmpfile(name: &str, bytes: &[u8]) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(bytes).unwrap();
        path
    }

    #[test]
    fn psf2_round_trip_with_map() {
        let mut font = Font::blank_256(size(8, 16));
        font.glyphs[65].set_pixel(3, 3, true);
        let mut map = UnicodeMap::new();
        map.add_i2u(65, 0x41);
        map.add_i2u(65, 0x391);
        font.map = Some(map);

        let mut bytes = Vec::new();
        save_psf2(&font, &mut bytes).unwrap();
        let path = tmpfile("vfontas-test-rt.psf", &bytes);
        let back = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(back.glyphs.len(), 256);
        assert_eq!(back.glyphs[65], font.glyphs[65]);
        let map = back.map.unwrap();
        assert_eq!(map.to_index(0x41), Some(65));
        assert_eq!(map.to_index(0x391), Some(65));
    }

    #[test]
    fn psf1_geometry() {
        let font = Font::blank_256(size(8, 14));
        let mut bytes = Vec::new();
        save_psf1(&font, &mut bytes).unwrap();
        assert_eq!(&bytes[..4], &[0x36, 0x04, 0x00, 14]);
        assert_eq!(bytes.len(), 4 + 256 * 14);
        let path = tmpfile("vfontas-test-p1.psf", &bytes);
        let back = load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(back.glyphs.len(), 256);
        assert_eq!(back.nominal_size(), Some(size(8, 14)));
        assert!(back.map.is_none());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let path = tmpfile("vfontas-test-bad.psf", b"nonsense");
        let err = load(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(err.to_string().contains("magic"));
    }
}
