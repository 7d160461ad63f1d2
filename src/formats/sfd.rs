//! FontForge Spline Font Database output, the vectorizer's primary
//! sink. Every glyph is traced into closed polygons and written as a
//! `SplineSet` of straight segments.

use crate::font::PLACEHOLDER_NAME;
use crate::outliner::{self, Strategy};
use crate::{Error, Font, Result};
use log::warn;
use std::io::Write;

/// Outline units per pixel step. Even, so the half-pixel diagonal
/// cuts of the `n2` strategies stay on integer coordinates.
const UNITS_PER_PIXEL: i32 = 64;

pub fn save(font: &Font, out: &mut dyn Write, strategy: Strategy) -> Result<()> {
    let sz = font
        .nominal_size()
        .ok_or_else(|| Error::Precondition("savesfd: font is empty".into()))?;
    if font.props.get("name").is_none() {
        warn!(
            "font name is still \"{}\"; consider setname before exporting",
            PLACEHOLDER_NAME
        );
    }
    let descent: i32 = font
        .props
        .get("descent")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let name = font.name().replace(' ', "");
    let ascent = (sz.h as i32 - descent) * UNITS_PER_PIXEL;
    let io = |e| Error::io("-", e);
    let mut w = |line: String| out.write_all(line.as_bytes()).and_then(|_| out.write_all(b"\n"));

    w(format!("SplineFontDB: 3.0")).map_err(io)?;
    w(format!("FontName: {}", name)).map_err(io)?;
    w(format!("FullName: {}", font.name())).map_err(io)?;
    w(format!("FamilyName: {}", font.name())).map_err(io)?;
    w(format!("Weight: Medium")).map_err(io)?;
    w(format!("Version: 001.000")).map_err(io)?;
    w(format!("ItalicAngle: 0")).map_err(io)?;
    w(format!("UnderlinePosition: {}", -(UNITS_PER_PIXEL * descent.max(1)))).map_err(io)?;
    w(format!("UnderlineWidth: {}", UNITS_PER_PIXEL / 2)).map_err(io)?;
    w(format!("Ascent: {}", ascent)).map_err(io)?;
    w(format!("Descent: {}", descent * UNITS_PER_PIXEL)).map_err(io)?;
    w(format!("LayerCount: 2")).map_err(io)?;
    w(format!("Layer: 0 0 \"Back\" 1")).map_err(io)?;
    w(format!("Layer: 1 0 \"Fore\" 0")).map_err(io)?;
    w(format!("Encoding: UnicodeFull")).map_err(io)?;
    w(format!("BeginChars: 1114112 {}", font.glyphs.len())).map_err(io)?;

    for (idx, glyph) in font.glyphs.iter().enumerate() {
        let cps = match &font.map {
            Some(map) => map.to_unicode(idx),
            None => std::iter::once(idx as u32).collect(),
        };
        let cp = cps.iter().next().copied().unwrap_or(idx as u32);
        let polys = outliner::vectorize(glyph, strategy, UNITS_PER_PIXEL, UNITS_PER_PIXEL, descent);

        w(String::new()).map_err(io)?;
        w(format!("StartChar: uni{:04X}", cp)).map_err(io)?;
        w(format!("Encoding: {} {} {}", cp, cp, idx)).map_err(io)?;
        w(format!("Width: {}", glyph.size().w as i32 * UNITS_PER_PIXEL)).map_err(io)?;
        w(format!("Flags: W")).map_err(io)?;
        w(format!("LayerCount: 2")).map_err(io)?;
        if !polys.is_empty() {
            w(format!("Fore")).map_err(io)?;
            w(format!("SplineSet")).map_err(io)?;
            for poly in &polys {
                if let Some(first) = poly.edges.first() {
                    w(format!("{} {} m 1", first.start.x, first.start.y)).map_err(io)?;
                    for e in &poly.edges {
                        w(format!(" {} {} l 1", e.end.x, e.end.y)).map_err(io)?;
                    }
                }
            }
            w(format!("EndSplineSet")).map_err(io)?;
        }
        w(format!("EndChar")).map_err(io)?;
    }
    w(format!("EndChars")).map_err(io)?;
    w(format!("EndSplineFont")).map_err(io)?;
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::size;
    use crate::Glyph;

    #[test]
    fn emits_closed_splinesets() {
        let mut font = Font::new();
        let mut g = Glyph::blank(size(4, 4));
        g.set_pixel(1, 1, true);
        g.set_pixel(2, 1, true);
        g.set_pixel(1, 2, true);
        g.set_pixel(2, 2, true);
        font.glyphs.push(g);

        let mut bytes = Vec::new();
        save(&font, &mut bytes, Strategy::Simple).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("SplineFontDB: 3.0\n"));
        assert!(text.contains("StartChar: uni0000"));
        assert!(text.contains("SplineSet"));
        // the 2x2 block is one square: a moveto plus four linetos, the
        // last returning to the start point
        let m_lines = text.lines().filter(|l| l.ends_with(" m 1")).count();
        let l_lines = text.lines().filter(|l| l.ends_with(" l 1")).count();
        assert_eq!(m_lines, 1);
        assert_eq!(l_lines, 4);
        let start = text
            .lines()
            .find(|l| l.ends_with(" m 1"))
            .unwrap()
            .replace(" m 1", "");
        let last = text
            .lines()
            .filter(|l| l.ends_with(" l 1"))
            .last()
            .unwrap()
            .trim_start()
            .replace(" l 1", "");
        assert_eq!(start, last);
    }
}
