//! BDF, the plain-text bitmap font format understood by `gbdfed`,
//! `bdftopcf` and most font editors.

use crate::geometry::size;
use crate::glyph::Glyph;
use crate::unimap::UnicodeMap;
use crate::{Error, Font, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

/// Writes the font as BDF 2.1. The descent comes from the `descent`
/// property (default 0), mirroring the SFD writer.
pub fn save(font: &Font, out: &mut dyn Write) -> Result<()> {
    let sz = font
        .nominal_size()
        .ok_or_else(|| Error::Precondition("savebdf: font is empty".into()))?;
    let descent: i32 = font
        .props
        .get("descent")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let io = |e| Error::io("-", e);
    let mut w = |line: String| out.write_all(line.as_bytes()).and_then(|_| out.write_all(b"\n"));

    w(format!("STARTFONT 2.1")).map_err(io)?;
    w(format!("FONT {}", font.name())).map_err(io)?;
    w(format!("SIZE {} 75 75", sz.h)).map_err(io)?;
    w(format!("FONTBOUNDINGBOX {} {} 0 {}", sz.w, sz.h, -descent)).map_err(io)?;
    w(format!("STARTPROPERTIES 2")).map_err(io)?;
    w(format!("FONT_ASCENT {}", sz.h as i32 - descent)).map_err(io)?;
    w(format!("FONT_DESCENT {}", descent)).map_err(io)?;
    w(format!("ENDPROPERTIES")).map_err(io)?;
    w(format!("CHARS {}", font.glyphs.len())).map_err(io)?;
    for (idx, glyph) in font.glyphs.iter().enumerate() {
        let cp = match &font.map {
            Some(map) => map
                .to_unicode(idx)
                .into_iter()
                .next()
                .unwrap_or(idx as u32),
            None => idx as u32,
        };
        w(format!("STARTCHAR uni{:04X}", cp)).map_err(io)?;
        w(format!("ENCODING {}", cp)).map_err(io)?;
        w(format!("SWIDTH {} 0", sz.w as u64 * 1000 / sz.h.max(1) as u64)).map_err(io)?;
        w(format!("DWIDTH {} 0", sz.w)).map_err(io)?;
        w(format!("BBX {} {} 0 {}", sz.w, sz.h, -descent)).map_err(io)?;
        w(format!("BITMAP")).map_err(io)?;
        let stride = (sz.w as usize + 7) / 8;
        let rows = glyph.as_rowpad();
        for row in rows.chunks(stride) {
            let mut line = String::new();
            for byte in row {
                line.push_str(&format!("{:02X}", byte));
            }
            w(line).map_err(io)?;
        }
        w(format!("ENDCHAR")).map_err(io)?;
    }
    w(format!("ENDFONT")).map_err(io)?;
    Ok(())
}

/// Reads BDF back. Only the pieces our writer emits are honored:
/// per-char encodings, bounding boxes, and bitmap rows. Glyphs keep
/// their BBX size; offsets are ignored.
pub fn load(path: &Path) -> Result<Font> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    if !text.starts_with("STARTFONT") {
        return Err(Error::format(path, "missing STARTFONT"));
    }
    let mut font = Font::new();
    let mut map = UnicodeMap::new();
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        let mut words = line.split_whitespace();
        match words.next() {
            Some("FONT") => {
                if let Some(name) = words.next() {
                    font.set_prop("name", name);
                }
            }
            Some("STARTCHAR") => {
                let mut encoding: Option<u32> = None;
                let mut bbx: Option<(u32, u32)> = None;
                let mut bitmap: Vec<u8> = Vec::new();
                let mut in_bitmap = false;
                for body in lines.by_ref() {
                    let mut bw = body.split_whitespace();
                    match bw.next() {
                        Some("ENCODING") => {
                            encoding = bw.next().and_then(|v| v.parse().ok());
                        }
                        Some("BBX") => {
                            let w = bw.next().and_then(|v| v.parse().ok());
                            let h = bw.next().and_then(|v| v.parse().ok());
                            if let (Some(w), Some(h)) = (w, h) {
                                bbx = Some((w, h));
                            }
                        }
                        Some("BITMAP") => in_bitmap = true,
                        Some("ENDCHAR") => break,
                        Some(hex) if in_bitmap => {
                            for i in (0..hex.len()).step_by(2) {
                                let byte = hex
                                    .get(i..i + 2)
                                    .and_then(|p| u8::from_str_radix(p, 16).ok())
                                    .ok_or_else(|| {
                                        Error::format(path, format!("bad bitmap row \"{}\"", hex))
                                    })?;
                                bitmap.push(byte);
                            }
                        }
                        _ => {}
                    }
                }
                let (w, h) = bbx.ok_or_else(|| Error::format(path, "char without BBX"))?;
                let glyph = Glyph::from_rpad(size(w, h), &bitmap)
                    .map_err(|e| Error::format(path, e.to_string()))?;
                if let Some(cp) = encoding {
                    map.add_i2u(font.glyphs.len(), cp);
                }
                font.glyphs.push(glyph);
            }
            _ => {}
        }
    }
    if !map.is_empty() {
        font.map = Some(map);
    }
    Ok(font)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn save_load_round_trip() {
        let mut font = Font::blank_256(size(8, 16));
        font.glyphs[65].set_pixel(1, 2, true);
        font.glyphs[65].set_pixel(6, 13, true);
        let mut map = UnicodeMap::new();
        map.add_i2u(65, 0x41);
        font.map = Some(map);
        font.set_prop("name", "testfont");

        let mut bytes = Vec::new();
        save(&font, &mut bytes).unwrap();
        let path = std::env::temp_dir().join("vfontas-test.bdf");
        let mut f = fs::File::create(&path).unwrap();
        f.write_all(&bytes).unwrap();
        drop(f);
        let back = load(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(back.glyphs.len(), 256);
        assert_eq!(back.glyphs[65], font.glyphs[65]);
        assert_eq!(back.props.get("name").map(String::as_str), Some("testfont"));
        assert_eq!(back.map.unwrap().to_index(0x41), Some(65));
    }
}
