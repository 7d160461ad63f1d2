//! Raw glyph dumps: the classic DOS/VGA `.fnt` layout of 256 glyphs,
//! 8 pixels wide, one byte per row, nothing else.

use crate::geometry::size;
use crate::glyph::Glyph;
use crate::{Error, Font, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Loads a 256-glyph 8xN dump; the height is the file size over 256.
pub fn load(path: &Path) -> Result<Font> {
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;
    if data.is_empty() || data.len() % 256 != 0 {
        return Err(Error::format(
            path,
            format!("size {} is not a multiple of 256", data.len()),
        ));
    }
    let h = data.len() / 256;
    if h > 32 {
        return Err(Error::format(path, format!("implausible glyph height {}", h)));
    }
    load_cells(path, &data, 8, h as u32)
}

/// Loads a raw dump with explicit cell size.
pub fn load_raw(path: &Path, w: u32, h: u32) -> Result<Font> {
    if w == 0 || h == 0 {
        return Err(Error::Precondition(format!(
            "loadraw: bad cell size {}x{}",
            w, h
        )));
    }
    let data = fs::read(path).map_err(|e| Error::io(path, e))?;
    load_cells(path, &data, w, h)
}

fn load_cells(path: &Path, data: &[u8], w: u32, h: u32) -> Result<Font> {
    let cell = (w as usize + 7) / 8 * h as usize;
    if data.len() % cell != 0 {
        return Err(Error::format(
            path,
            format!("size {} is not a multiple of the {}-byte cell", data.len(), cell),
        ));
    }
    let mut font = Font::new();
    for chunk in data.chunks(cell) {
        font.glyphs.push(Glyph::from_rpad(size(w, h), chunk)?);
    }
    Ok(font)
}

/// Writes the row-padded bitmaps back to back.
pub fn save(font: &Font, out: &mut dyn Write) -> std::io::Result<()> {
    for g in &font.glyphs {
        out.write_all(&g.as_rowpad())?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn blank_font_dump_is_4096_zeroes() {
        let font = Font::blank_256(size(8, 16));
        let mut out = Vec::new();
        save(&font, &mut out).unwrap();
        assert_eq!(out.len(), 256 * 16);
        assert!(out.iter().all(|&b| b == 0));
    }
}
