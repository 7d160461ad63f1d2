use crate::geometry::{rect, Rect, Size};
use crate::glyph::Glyph;
use crate::unimap::UnicodeMap;
use log::warn;
use std::collections::BTreeMap;

/// The default placeholder put into the name property by `blankfnt`
/// and loaders that carry no name of their own. Writers that embed the
/// name hint at `setname` while this is still in place.
pub const PLACEHOLDER_NAME: &str = "Untitled1";

/// A bitmap font: an indexed sequence of glyphs, an optional
/// index/codepoint relation, and free-form string properties consumed
/// by the format writers (name, descent, and the like).
///
/// The first glyph's size is the nominal size reported in format
/// headers; loaders keep all glyphs the same size.
#[derive(Clone, Debug, Default)]
pub struct Font {
    pub glyphs: Vec<Glyph>,
    pub map: Option<UnicodeMap>,
    pub props: BTreeMap<String, String>,
}

impl Font {
    pub fn new() -> Font {
        Font::default()
    }

    /// 256 blank 8x16 glyphs, the shape of a classic VGA text font.
    pub fn blank_256(size: Size) -> Font {
        Font {
            glyphs: vec![Glyph::blank(size); 256],
            map: None,
            props: BTreeMap::new(),
        }
    }

    /// The nominal glyph size, taken from the first glyph.
    pub fn nominal_size(&self) -> Option<Size> {
        self.glyphs.first().map(|g| g.size())
    }

    pub fn set_prop(&mut self, key: &str, value: &str) {
        self.props.insert(key.to_owned(), value.to_owned());
    }

    /// The font name for format headers, or the placeholder.
    pub fn name(&self) -> &str {
        self.props
            .get("name")
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_NAME)
    }

    /// Applies a pure glyph transform to every glyph.
    pub fn map_glyphs(&mut self, f: impl Fn(&Glyph) -> Glyph) {
        for g in &mut self.glyphs {
            *g = f(g);
        }
    }

    /// Re-cuts every glyph onto a `w` x `h` canvas anchored at the
    /// current origin. Skips with a warning on a degenerate size.
    pub fn canvas(&mut self, w: i32, h: i32) {
        if w <= 0 || h <= 0 {
            warn!("canvas: ignoring non-positive size {}x{}", w, h);
            return;
        }
        self.map_glyphs(|g| g.crop(rect(0, 0, w as u32, h as u32)));
    }

    /// Crops every glyph to `r`.
    pub fn crop(&mut self, r: Rect) {
        if r.size.area() == 0 {
            warn!("crop: ignoring empty rectangle");
            return;
        }
        self.map_glyphs(|g| g.crop(r));
    }

    /// Plain-copies a window of every glyph onto another position of
    /// the same glyph (the `copy` command).
    pub fn copy_window(&mut self, src: Rect, dst: Rect) {
        self.map_glyphs(|g| g.copy_rect_to(src, g, dst, true));
    }

    /// Pixel replication. Zero factors are skipped with a warning.
    pub fn upscale(&mut self, fx: u32, fy: u32) {
        if fx == 0 || fy == 0 {
            warn!("upscale: ignoring zero factor {}x{}", fx, fy);
            return;
        }
        self.map_glyphs(|g| g.upscale(fx, fy));
    }

    pub fn overstrike(&mut self, px: u32) {
        self.map_glyphs(|g| g.overstrike(px));
    }

    /// Ninth-column replication for the classic VGA line-graphics
    /// index range 0xC0..=0xDF.
    pub fn lge(&mut self) {
        for (idx, g) in self.glyphs.iter_mut().enumerate() {
            if (0xC0..=0xDF).contains(&idx) {
                *g = g.lge(1);
            }
        }
    }

    /// Ninth-column replication for glyphs mapped to Unicode box
    /// drawing (U+2500..=U+257F); with `full` also block elements
    /// (U+2580..=U+259F). Needs a unicode map.
    pub fn lge_unicode(&mut self, full: bool) {
        let map = match &self.map {
            Some(map) => map.clone(),
            None => {
                warn!("lgeu: no unicode map loaded, skipping");
                return;
            }
        };
        let hi: u32 = if full { 0x259F } else { 0x257F };
        for cp in 0x2500..=hi {
            if let Some(idx) = map.to_index(cp) {
                if let Some(g) = self.glyphs.get_mut(idx) {
                    *g = g.lge(1);
                }
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::size;

    #[test]
    fn blank_font_shape() {
        let f = Font::blank_256(size(8, 16));
        assert_eq!(f.glyphs.len(), 256);
        assert_eq!(f.nominal_size(), Some(size(8, 16)));
        assert_eq!(f.name(), PLACEHOLDER_NAME);
    }

    #[test]
    fn lgeu_needs_map() {
        let mut f = Font::blank_256(size(9, 16));
        f.glyphs[65].set_pixel(7, 3, true);
        f.lge_unicode(false);
        assert!(!f.glyphs[65].get(8, 3));

        let mut map = UnicodeMap::new();
        map.add_i2u(65, 0x2500);
        f.map = Some(map);
        f.lge_unicode(false);
        assert!(f.glyphs[65].get(8, 3));
    }

    #[test]
    fn canvas_rejects_degenerate() {
        let mut f = Font::blank_256(size(8, 16));
        f.canvas(-1, 12);
        assert_eq!(f.nominal_size(), Some(size(8, 16)));
        f.canvas(8, 12);
        assert_eq!(f.nominal_size(), Some(size(8, 12)));
    }
}
