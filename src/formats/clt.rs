//! Consoleet text glyphs: a directory with one `PCLT` text file per
//! glyph, two characters per pixel, named after the codepoint.

use crate::geometry::size;
use crate::glyph::Glyph;
use crate::unimap::UnicodeMap;
use crate::{Error, Font, Result};
use std::fs;
use std::path::Path;

/// Parses one `PCLT` file body.
pub fn parse(path: &Path, text: &str) -> Result<Glyph> {
    let mut lines = text.lines();
    let bad = |reason: &str| Error::format(path, reason.to_owned());
    if lines.next().map(str::trim) != Some("PCLT") {
        return Err(bad("missing PCLT header"));
    }
    let dims = lines.next().ok_or_else(|| bad("missing size line"))?;
    let mut words = dims.split_whitespace();
    let w: u32 = words
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| bad("bad width"))?;
    let h: u32 = words
        .next()
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| bad("bad height"))?;
    let mut glyph = Glyph::blank(size(w, h));
    for y in 0..h as usize {
        let row = lines.next().ok_or_else(|| bad("truncated pixel rows"))?;
        let cells: Vec<char> = row.chars().collect();
        for x in 0..w as usize {
            if cells.get(x * 2).copied() == Some('#') {
                glyph.set_pixel(x as i32, y as i32, true);
            }
        }
    }
    Ok(glyph)
}

/// Loads every `*.txt` glyph file in `dir`, ordered and mapped by the
/// hexadecimal codepoint in the file name.
pub fn load_dir(dir: &Path) -> Result<Font> {
    let mut entries: Vec<(u32, std::path::PathBuf)> = Vec::new();
    let rd = fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
    for entry in rd {
        let entry = entry.map_err(|e| Error::io(dir, e))?;
        let path = entry.path();
        let stem = match path.file_stem().and_then(|s| s.to_str()) {
            Some(stem) => stem,
            None => continue,
        };
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let cp = match u32::from_str_radix(stem, 16) {
            Ok(cp) => cp,
            Err(_) => continue,
        };
        entries.push((cp, path));
    }
    entries.sort();
    let mut font = Font::new();
    let mut map = UnicodeMap::new();
    for (cp, path) in entries {
        let text = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let glyph = parse(&path, &text)?;
        map.add_i2u(font.glyphs.len(), cp);
        font.glyphs.push(glyph);
    }
    font.map = Some(map);
    Ok(font)
}

/// Writes one `<codepoint>.txt` per glyph into `dir`, using the first
/// mapped codepoint (the glyph index without a map).
pub fn save_dir(font: &Font, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    for (idx, glyph) in font.glyphs.iter().enumerate() {
        let cp = match &font.map {
            Some(map) => map
                .to_unicode(idx)
                .into_iter()
                .next()
                .unwrap_or(idx as u32),
            None => idx as u32,
        };
        let path = dir.join(format!("{:04x}.txt", cp));
        fs::write(&path, glyph.as_pclt()).map_err(|e| Error::io(&path, e))?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_round_trips_as_pclt() {
        let mut g = Glyph::blank(size(3, 2));
        g.set_pixel(0, 0, true);
        g.set_pixel(2, 1, true);
        let text = g.as_pclt();
        let back = parse(Path::new("x"), &text).unwrap();
        assert_eq!(back, g);
    }

    #[test]
    fn rejects_wrong_header() {
        assert!(parse(Path::new("x"), "PCNT\n2 2\n....\n....\n").is_err());
    }
}
