//! DOS code-page information files. A CPI starts with the
//! `0xFF "FONT    "` file header (one pointer of type 1 to the font
//! info header), followed by a chain of codepage entry headers, each
//! pointing at a codepage info header with one or more screen fonts.
//!
//! The `.ice` variant stores the `next_cpeh_offset` and `cpih_offset`
//! fields as segment:offset words; they are translated with
//! `(x >> 12) + (x & 0xFFFF)` before use.

use crate::formats::fnt;
use crate::geometry::size;
use crate::glyph::Glyph;
use crate::{Error, Font, Result};
use log::warn;
use std::fs;
use std::path::Path;

const MAGIC: &[u8; 8] = b"FONT    ";

const DEVICE_SCREEN: u16 = 1;
const DEVICE_PRINTER: u16 = 2;

/// One screen font pulled out of a codepage entry.
#[derive(Debug)]
pub struct CodepageFont {
    pub codepage: u16,
    pub font: Font,
}

/// The segment:offset translation of the `.ice` variant.
fn seg_offset(x: u32) -> u32 {
    (x >> 12) + (x & 0xFFFF)
}

fn u16_at(path: &Path, data: &[u8], at: usize) -> Result<u16> {
    data.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| Error::format(path, format!("truncated at offset {}", at)))
}

fn u32_at(path: &Path, data: &[u8], at: usize) -> Result<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| Error::format(path, format!("truncated at offset {}", at)))
}

/// Loads every screen font of every codepage. Printer entries are
/// chained past; `ice` applies the segment-offset translation.
pub fn load(path: &Path, ice: bool) -> Result<Vec<CodepageFont>> {
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;
    parse(path, &data, ice)
}

fn parse(path: &Path, data: &[u8], ice: bool) -> Result<Vec<CodepageFont>> {
    if data.len() < 24 || data[0] != 0xFF || &data[1..9] != MAGIC {
        return Err(Error::format(path, "not a CPI file (bad magic)"));
    }
    let pnum = u16_at(path, data, 17)?;
    let ptyp = data[19];
    if pnum != 1 || ptyp != 1 {
        return Err(Error::format(
            path,
            format!("unsupported pointer layout pnum={} ptyp={}", pnum, ptyp),
        ));
    }
    let fih_offset = u32_at(path, data, 20)? as usize;
    let count = u16_at(path, data, fih_offset)? as usize;
    let xlat = |x: u32| if ice { seg_offset(x) } else { x };

    let mut out = Vec::new();
    let mut cpeh = fih_offset + 2;
    for entry in 0..count {
        let next = xlat(u32_at(path, data, cpeh + 2)?) as usize;
        let device_type = u16_at(path, data, cpeh + 6)?;
        let codepage = u16_at(path, data, cpeh + 16)?;
        let cpih = xlat(u32_at(path, data, cpeh + 24)?) as usize;
        match device_type {
            DEVICE_SCREEN => {
                let version = u16_at(path, data, cpih)?;
                if version != 1 {
                    warn!(
                        "codepage {}: info header version {} not understood, skipping",
                        codepage, version
                    );
                } else {
                    read_screen_fonts(path, data, cpih, codepage, &mut out)?;
                }
            }
            DEVICE_PRINTER => {
                warn!("codepage {}: printer font skipped", codepage);
            }
            other => {
                return Err(Error::format(
                    path,
                    format!("codepage {}: unknown device type {}", codepage, other),
                ));
            }
        }
        if entry + 1 < count {
            if next <= cpeh || next >= data.len() {
                return Err(Error::format(
                    path,
                    format!("broken codepage chain at offset {}", next),
                ));
            }
            cpeh = next;
        }
    }
    Ok(out)
}

fn read_screen_fonts(
    path: &Path,
    data: &[u8],
    cpih: usize,
    codepage: u16,
    out: &mut Vec<CodepageFont>,
) -> Result<()> {
    let num_fonts = u16_at(path, data, cpih + 2)? as usize;
    let mut at = cpih + 6;
    for _ in 0..num_fonts {
        let head = data
            .get(at..at + 6)
            .ok_or_else(|| Error::format(path, "truncated screen font header"))?;
        let (h, w) = (head[0] as u32, head[1] as u32);
        let num_chars = u16::from_le_bytes([head[4], head[5]]) as usize;
        if w == 0 || h == 0 {
            return Err(Error::format(
                path,
                format!("codepage {}: degenerate font size {}x{}", codepage, w, h),
            ));
        }
        let cell = (w as usize + 7) / 8 * h as usize;
        let bitmaps = data
            .get(at + 6..at + 6 + num_chars * cell)
            .ok_or_else(|| Error::format(path, "truncated screen font bitmap"))?;
        let mut font = Font::new();
        for chunk in bitmaps.chunks(cell) {
            font.glyphs.push(Glyph::from_rpad(size(w, h), chunk)?);
        }
        out.push(CodepageFont { codepage, font });
        at += 6 + num_chars * cell;
    }
    Ok(())
}

/// Extracts every screen font into `dir` as a raw glyph dump named
/// `cp<codepage><sep><w>x<h>.fnt`.
pub fn extract(path: &Path, dir: &Path, ice: bool, sep: &str) -> Result<()> {
    let fonts = load(path, ice)?;
    if fonts.is_empty() {
        warn!("{}: no screen fonts found", path.display());
        return Ok(());
    }
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    for cf in &fonts {
        let sz = match cf.font.nominal_size() {
            Some(sz) => sz,
            None => continue,
        };
        let name = format!("cp{}{}{}x{}.fnt", cf.codepage, sep, sz.w, sz.h);
        let file = dir.join(&name);
        let mut out = fs::File::create(&file).map_err(|e| Error::io(&file, e))?;
        fnt::save(&cf.font, &mut out).map_err(|e| Error::io(&file, e))?;
    }
    Ok(())
}
