//! GNU Unifont style `.hex` files: one `<codepoint>:<hex-bytes>` line
//! per glyph, 16 data bytes meaning 8x16 and 32 meaning 16x16.

use crate::geometry::size;
use crate::glyph::Glyph;
use crate::unimap::UnicodeMap;
use crate::{Error, Font, Result};
use std::fs;
use std::path::Path;

pub fn load(path: &Path) -> Result<Font> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let mut font = Font::new();
    let mut map = UnicodeMap::new();
    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let bad = |reason: &str| {
            Error::format(path, format!("line {}: {}", lineno + 1, reason))
        };
        let (cp_text, bitmap_text) = line
            .split_once(':')
            .ok_or_else(|| bad("missing \":\""))?;
        let cp = u32::from_str_radix(cp_text.trim(), 16)
            .map_err(|_| bad("bad codepoint"))?;
        let bytes = decode_hex(bitmap_text.trim()).ok_or_else(|| bad("bad bitmap hex"))?;
        let glyph = match bytes.len() {
            16 => Glyph::from_rpad(size(8, 16), &bytes)?,
            32 => Glyph::from_rpad(size(16, 16), &bytes)?,
            n => return Err(bad(&format!("unsupported bitmap length {}", n))),
        };
        map.add_i2u(font.glyphs.len(), cp);
        font.glyphs.push(glyph);
    }
    font.map = Some(map);
    Ok(font)
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&text[i..i + 2], 16).ok())
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn capital_a_profile() {
        let path = std::env::temp_dir().join("vfontas-test-a.hex");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "0041:00001818242442427E7E818181810000").unwrap();
        drop(f);
        let font = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(font.glyphs.len(), 1);
        assert_eq!(font.nominal_size(), Some(size(8, 16)));
        assert_eq!(font.map.as_ref().unwrap().to_index(0x41), Some(0));
        let pbm = font.glyphs[0].as_pbm();
        let expect = "P1\n8 16\n\
                      00000000\n00000000\n00011000\n00011000\n\
                      00100100\n00100100\n01000010\n01000010\n\
                      01111110\n01111110\n10000001\n10000001\n\
                      10000001\n10000001\n00000000\n00000000\n";
        assert_eq!(pbm, expect);
    }

    #[test]
    fn wide_glyphs_are_16x16() {
        let path = std::env::temp_dir().join("vfontas-test-w.hex");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(
            f,
            "4E00:0000000000000000FFFE000000000000000000000000000000000000000000FF"
        )
        .unwrap();
        drop(f);
        let font = load(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(font.nominal_size(), Some(size(16, 16)));
    }
}
