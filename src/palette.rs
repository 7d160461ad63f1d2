//! The 16-entry terminal palette and its perceptual operations.
//!
//! A palette is cached in two representations at once: the sRGB888
//! triples that terminals consume, and their CIE LCh equivalents that
//! the perceptual commands operate on. Every mutation updates one side
//! and recomputes the other through the active [`ColorEngine`], so the
//! two views never drift apart.

use crate::color::{self, ColorEngine, Hsl, Lch, Srgb888};
use crate::expr::{Expr, RegisterBank};
use crate::{Error, Result};
use log::warn;
use ordered_float::OrderedFloat;
use std::fs;
use std::path::Path;

/// Number of entries in a terminal palette.
pub const PALETTE_LEN: usize = 16;

const VGA: [u32; PALETTE_LEN] = [
    0x000000, 0xAA0000, 0x00AA00, 0xAA5500, 0x0000AA, 0xAA00AA, 0x00AAAA, 0xAAAAAA,
    0x555555, 0xFF5555, 0x55FF55, 0xFFFF55, 0x5555FF, 0xFF55FF, 0x55FFFF, 0xFFFFFF,
];

// the saturated variant: plain olive instead of the half-green brown
const VGS: [u32; PALETTE_LEN] = [
    0x000000, 0xAA0000, 0x00AA00, 0xAAAA00, 0x0000AA, 0xAA00AA, 0x00AAAA, 0xAAAAAA,
    0x555555, 0xFF5555, 0x55FF55, 0xFFFF55, 0x5555FF, 0xFF55FF, 0x55FFFF, 0xFFFFFF,
];

const WIN: [u32; PALETTE_LEN] = [
    0x000000, 0x800000, 0x008000, 0x808000, 0x000080, 0x800080, 0x008080, 0xC0C0C0,
    0x808080, 0xFF0000, 0x00FF00, 0xFFFF00, 0x0000FF, 0xFF00FF, 0x00FFFF, 0xFFFFFF,
];

/// The palette register: parallel sRGB and LCh caches plus the three
/// free scalars the expression language can use.
#[derive(Clone, Debug, Default)]
pub struct Palette {
    rgb: Vec<Srgb888>,
    lch: Vec<Lch>,
    pub scalars: [f64; 3],
}

impl Palette {
    pub fn new() -> Palette {
        Palette::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rgb.is_empty()
    }

    pub fn rgb(&self) -> &[Srgb888] {
        &self.rgb
    }

    pub fn lch(&self) -> &[Lch] {
        &self.lch
    }

    fn from_words(engine: &ColorEngine, words: &[u32; PALETTE_LEN]) -> Palette {
        let mut pal = Palette {
            rgb: words
                .iter()
                .map(|&w| Srgb888::new((w >> 16) as u8, (w >> 8) as u8, w as u8))
                .collect(),
            lch: Vec::new(),
            scalars: [0.0; 3],
        };
        pal.sync_from_rgb(engine);
        pal
    }

    pub fn vga(engine: &ColorEngine) -> Palette {
        Palette::from_words(engine, &VGA)
    }

    pub fn vgs(engine: &ColorEngine) -> Palette {
        Palette::from_words(engine, &VGS)
    }

    pub fn win(engine: &ColorEngine) -> Palette {
        Palette::from_words(engine, &WIN)
    }

    /// Loads `#rrggbb` lines, one entry per line, padded to 16 with
    /// black.
    pub fn load(engine: &ColorEngine, path: &Path) -> Result<Palette> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut rgb = Vec::new();
        for (lineno, line) in text.lines().enumerate() {
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') && word.len() == 1 {
                continue;
            }
            let c = Srgb888::from_hex(word).ok_or_else(|| {
                Error::format(path, format!("line {}: bad color \"{}\"", lineno + 1, word))
            })?;
            rgb.push(c);
            if rgb.len() == PALETTE_LEN {
                break;
            }
        }
        rgb.resize(PALETTE_LEN, Srgb888::default());
        let mut pal = Palette {
            rgb,
            lch: Vec::new(),
            scalars: [0.0; 3],
        };
        pal.sync_from_rgb(engine);
        Ok(pal)
    }

    /// Recomputes the LCh cache from the sRGB side.
    pub fn sync_from_rgb(&mut self, engine: &ColorEngine) {
        self.lch = self.rgb.iter().map(|&c| engine.srgb_to_lch(c)).collect();
    }

    /// Recomputes the sRGB cache from the LCh side.
    pub fn sync_from_lch(&mut self, engine: &ColorEngine) {
        self.rgb = self.lch.iter().map(|&c| engine.lch_to_srgb(c)).collect();
    }

    /// Spaces the L* values of a set of entries linearly: the darkest
    /// keeps its L* as a baseline offset, the rest land evenly across
    /// `[lo, hi]` above it, in their existing lightness order.
    fn equalize(&mut self, engine: &ColorEngine, indices: &[usize], lo: f64, hi: f64) {
        if indices.len() < 2 {
            return;
        }
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by_key(|&i| OrderedFloat(self.lch[i].l));
        let base = self.lch[order[0]].l;
        let steps = (order.len() - 2).max(1) as f64;
        for (k, &idx) in order.iter().enumerate().skip(1) {
            self.lch[idx].l = base + lo + (hi - lo) * (k as f64 - 1.0) / steps;
        }
        // only the touched entries get their companion recomputed
        for &idx in indices {
            self.rgb[idx] = engine.lch_to_srgb(self.lch[idx]);
        }
    }

    /// `eq[=b]`: all 16 entries, second-darkest at `b` above the
    /// baseline, default 100/16.
    pub fn eq(&mut self, engine: &ColorEngine, b: Option<f64>) {
        if self.guard_empty("eq") {
            return;
        }
        let b = b.unwrap_or(100.0 / PALETTE_LEN as f64);
        let hi = 100.0 * (PALETTE_LEN as f64 - 1.0) / PALETTE_LEN as f64;
        let indices: Vec<usize> = (0..self.rgb.len()).collect();
        self.equalize(engine, &indices, b, hi);
    }

    /// `loeq[=b[,g]]`: the low half plus dark gray (indices 0..=8),
    /// defaults 100/9 and 800/9.
    pub fn loeq(&mut self, engine: &ColorEngine, b: Option<f64>, g: Option<f64>) {
        if self.guard_empty("loeq") {
            return;
        }
        let b = b.unwrap_or(100.0 / 9.0);
        let g = g.unwrap_or(800.0 / 9.0);
        let indices: Vec<usize> = (0..9.min(self.rgb.len())).collect();
        self.equalize(engine, &indices, b, g);
    }

    /// Retints every entry in HSL, replacing hue and saturation while
    /// keeping lightness.
    pub fn tint_hsl(&mut self, engine: &ColorEngine, h: f64, s: f64) {
        if self.guard_empty("hsltint") {
            return;
        }
        for c in &mut self.rgb {
            let hsl = color::srgb_to_hsl(*c);
            *c = color::hsl_to_srgb(Hsl { h, s, l: hsl.l });
        }
        self.sync_from_rgb(engine);
    }

    /// Retints every entry in LCh, replacing chroma and hue while
    /// keeping L*.
    pub fn tint_lch(&mut self, engine: &ColorEngine, c: f64, h: f64) {
        if self.guard_empty("lchtint") {
            return;
        }
        for entry in &mut self.lch {
            entry.c = c;
            entry.h = color::norm_hue(h);
        }
        self.sync_from_lch(engine);
    }

    /// Mixes `pct` percent of `other` into this palette in linear RGB.
    pub fn blend(&mut self, engine: &ColorEngine, pct: f64, other: &Palette) {
        if self.guard_empty("blend") || other.is_empty() {
            return;
        }
        let t = (pct / 100.0).max(0.0).min(1.0);
        for (a, &b) in self.rgb.iter_mut().zip(other.rgb.iter()) {
            let mix = |x: u8, y: u8| {
                let lin = engine.expand(x as f64 / 255.0) * (1.0 - t)
                    + engine.expand(y as f64 / 255.0) * t;
                (engine.compress(lin) * 255.0).round().max(0.0).min(255.0) as u8
            };
            *a = Srgb888::new(mix(a.r, b.r), mix(a.g, b.g), mix(a.b, b.b));
        }
        self.sync_from_rgb(engine);
    }

    /// Inverts every entry in RGB.
    pub fn invert(&mut self, engine: &ColorEngine) {
        if self.guard_empty("inv16") {
            return;
        }
        for c in &mut self.rgb {
            *c = Srgb888::new(255 - c.r, 255 - c.g, 255 - c.b);
        }
        self.sync_from_rgb(engine);
    }

    /// Evaluates a parsed expression once per selected entry (all of
    /// them by default). Register reads and writes go straight through
    /// the entry's caches; each write resynchronizes the companion
    /// side.
    pub fn eval(
        &mut self,
        engine: &ColorEngine,
        expr: &Expr,
        indices: Option<&[usize]>,
    ) -> Result<()> {
        if self.guard_empty("eval") {
            return Ok(());
        }
        let all: Vec<usize> = (0..self.rgb.len()).collect();
        for &idx in indices.unwrap_or(&all) {
            if idx >= self.rgb.len() {
                warn!("eval: entry {} out of range, skipping", idx);
                continue;
            }
            let mut bank = EntryBank {
                palette: self,
                engine,
                idx,
            };
            expr.eval(&mut bank)?;
        }
        Ok(())
    }

    fn guard_empty(&self, what: &str) -> bool {
        if self.is_empty() {
            warn!("{}: palette is empty, skipping", what);
            true
        } else {
            false
        }
    }
}

/// One palette entry viewed as an expression register bank.
struct EntryBank<'a> {
    palette: &'a mut Palette,
    engine: &'a ColorEngine,
    idx: usize,
}

impl RegisterBank for EntryBank<'_> {
    fn get(&self, reg: char) -> Option<f64> {
        let rgb = self.palette.rgb[self.idx];
        let lch = self.palette.lch[self.idx];
        match reg {
            'r' => Some(rgb.r as f64),
            'g' => Some(rgb.g as f64),
            'b' => Some(rgb.b as f64),
            'l' => Some(lch.l),
            'c' | 's' => Some(lch.c),
            'h' => Some(lch.h),
            'x' => Some(self.palette.scalars[0]),
            'y' => Some(self.palette.scalars[1]),
            'z' => Some(self.palette.scalars[2]),
            _ => None,
        }
    }

    fn set(&mut self, reg: char, value: f64) -> bool {
        let clamp8 = |v: f64| v.round().max(0.0).min(255.0) as u8;
        match reg {
            'r' | 'g' | 'b' => {
                let entry = &mut self.palette.rgb[self.idx];
                match reg {
                    'r' => entry.r = clamp8(value),
                    'g' => entry.g = clamp8(value),
                    _ => entry.b = clamp8(value),
                }
                self.palette.lch[self.idx] = self.engine.srgb_to_lch(*entry);
            }
            'l' | 'c' | 's' | 'h' => {
                let entry = &mut self.palette.lch[self.idx];
                match reg {
                    'l' => entry.l = value,
                    'c' | 's' => entry.c = value,
                    _ => entry.h = color::norm_hue(value),
                }
                self.palette.rgb[self.idx] = self.engine.lch_to_srgb(*entry);
            }
            'x' => self.palette.scalars[0] = value,
            'y' => self.palette.scalars[1] = value,
            'z' => self.palette.scalars[2] = value,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vga_starts_as_expected() {
        let engine = ColorEngine::new();
        let pal = Palette::vga(&engine);
        assert_eq!(pal.rgb()[0].to_hex(), "#000000");
        assert_eq!(pal.rgb()[1].to_hex(), "#aa0000");
        assert_eq!(pal.rgb()[2].to_hex(), "#00aa00");
        assert_eq!(pal.rgb()[3].to_hex(), "#aa5500");
        assert_eq!(pal.rgb()[15].to_hex(), "#ffffff");
        assert_eq!(pal.lch().len(), PALETTE_LEN);
    }

    #[test]
    fn eval_scoped_assignment() {
        let engine = ColorEngine::new();
        let mut pal = Palette::vga(&engine);
        let expr = Expr::parse("l=0").unwrap();
        pal.eval(&engine, &expr, Some(&[0])).unwrap();
        let expr = Expr::parse("l=100").unwrap();
        pal.eval(&engine, &expr, Some(&[0])).unwrap();
        assert_relative_eq!(pal.lch()[0].l, 100.0, epsilon = 1e-9);
        // other entries untouched
        assert_eq!(pal.rgb()[1].to_hex(), "#aa0000");
    }

    #[test]
    fn eval_zeroes_lch_everywhere() {
        let engine = ColorEngine::new();
        let mut pal = Palette::vga(&engine);
        let expr = Expr::parse("(l=l*0, c=c*0, h=h*0)").unwrap();
        pal.eval(&engine, &expr, None).unwrap();
        for lch in pal.lch() {
            assert_relative_eq!(lch.l, 0.0, epsilon = 1e-9);
            assert_relative_eq!(lch.c, 0.0, epsilon = 1e-9);
            assert_relative_eq!(lch.h, 0.0, epsilon = 1e-9);
        }
        for rgb in pal.rgb() {
            assert_eq!(*rgb, Srgb888::new(0, 0, 0));
        }
    }

    #[test]
    fn self_assignment_keeps_palette() {
        let engine = ColorEngine::new();
        let mut pal = Palette::vga(&engine);
        let before = pal.rgb().to_vec();
        let expr = Expr::parse("(l=l)").unwrap();
        pal.eval(&engine, &expr, None).unwrap();
        for (a, b) in before.iter().zip(pal.rgb()) {
            assert!((a.r as i32 - b.r as i32).abs() <= 1);
            assert!((a.g as i32 - b.g as i32).abs() <= 1);
            assert!((a.b as i32 - b.b as i32).abs() <= 1);
        }
    }

    #[test]
    fn eq_spaces_lightness() {
        let engine = ColorEngine::new();
        let mut pal = Palette::vga(&engine);
        pal.eq(&engine, None);
        let mut ls: Vec<f64> = pal.lch().iter().map(|c| c.l).collect();
        ls.sort_by_key(|&l| OrderedFloat(l));
        // black stays the baseline
        assert_relative_eq!(ls[0], 0.0, epsilon = 1e-6);
        assert_relative_eq!(ls[1], 6.25, epsilon = 0.5);
        let step = ls[2] - ls[1];
        for w in ls[1..].windows(2) {
            assert_relative_eq!(w[1] - w[0], step, epsilon = 0.5);
        }
    }

    #[test]
    fn blend_identity_and_full() {
        let engine = ColorEngine::new();
        let mut a = Palette::vga(&engine);
        let b = Palette::win(&engine);
        let orig = a.rgb().to_vec();
        a.blend(&engine, 0.0, &b);
        assert_eq!(a.rgb(), &orig[..]);
        a.blend(&engine, 100.0, &b);
        assert_eq!(a.rgb(), b.rgb());
    }

    #[test]
    fn invert_twice_is_identity() {
        let engine = ColorEngine::new();
        let mut pal = Palette::vga(&engine);
        let orig = pal.rgb().to_vec();
        pal.invert(&engine);
        assert_eq!(pal.rgb()[0].to_hex(), "#ffffff");
        pal.invert(&engine);
        assert_eq!(pal.rgb(), &orig[..]);
    }
}
