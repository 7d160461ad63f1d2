//! Foreground/background contrast analysis over a 16-entry palette.
//!
//! Two analyzers share the same reporting: a plain L\* difference in
//! LCh space, and APCA (the SAPC/W3 accessible-contrast algorithm,
//! version 0.0.98G). Each produces a 16x16 `delta[bg][fg]` matrix that
//! is then summarized over three sub-grids: all 16x16 pairs, the 8
//! background colors against all 16 foregrounds, and the classic 8x8
//! corner.

use crate::color::{Lch, Srgb888};
use std::fmt;

// APCA 0.0.98G constants
const NORM_BG: f64 = 0.56;
const NORM_TXT: f64 = 0.57;
const REV_TXT: f64 = 0.62;
const REV_BG: f64 = 0.65;
const BLACK_THRESH: f64 = 0.022;
const BLACK_CLAMP: f64 = 1.414;
const SCALE_BOW: f64 = 1.14;
const SCALE_WOB: f64 = 1.14;
const LO_OFFSET: f64 = 0.027;
const DELTA_Y_MIN: f64 = 5e-4;

/// Below this L* difference a pair is considered unreadable.
pub const L_DELTA_PENALTY: f64 = 7.0;
/// Below this APCA magnitude a pair is considered unreadable.
pub const APCA_PENALTY: f64 = 7.3;

/// APCA screen luminance: simple 2.4-exponent expansion with the SAPC
/// channel weights, deliberately not the engine's companding.
fn screen_luminance(c: Srgb888) -> f64 {
    let f = |v: u8| (v as f64 / 255.0).powf(2.4);
    0.212_672_9 * f(c.r) + 0.715_152_2 * f(c.g) + 0.072_175_0 * f(c.b)
}

fn soft_black_clamp(y: f64) -> f64 {
    if y <= BLACK_THRESH {
        y + (BLACK_THRESH - y).powf(BLACK_CLAMP)
    } else {
        y
    }
}

/// The signed APCA contrast of text on a background, in the usual
/// roughly -108..=106 range. Near-identical luminances report 0.
pub fn apca(text: Srgb888, bg: Srgb888) -> f64 {
    let ytxt = soft_black_clamp(screen_luminance(text));
    let ybg = soft_black_clamp(screen_luminance(bg));
    if (ybg - ytxt).abs() < DELTA_Y_MIN {
        return 0.0;
    }
    let out = if ybg > ytxt {
        (ybg.powf(NORM_BG) - ytxt.powf(NORM_TXT)) * SCALE_BOW - LO_OFFSET
    } else {
        (ybg.powf(REV_BG) - ytxt.powf(REV_TXT)) * SCALE_WOB + LO_OFFSET
    };
    out * 100.0
}

/// `delta[bg][fg] = |L*(fg) - L*(bg)|`.
pub fn l_delta_matrix(lch: &[Lch]) -> Vec<Vec<f64>> {
    lch.iter()
        .map(|bg| lch.iter().map(|fg| (fg.l - bg.l).abs()).collect())
        .collect()
}

/// `delta[bg][fg] = |apca(fg on bg)|`.
pub fn apca_matrix(rgb: &[Srgb888]) -> Vec<Vec<f64>> {
    rgb.iter()
        .map(|&bg| rgb.iter().map(|&fg| apca(fg, bg).abs()).collect())
        .collect()
}

/// Summary of one sub-grid of the delta matrix.
#[derive(Clone, Debug)]
pub struct GridReport {
    pub bgs: usize,
    pub fgs: usize,
    pub pairs: usize,
    pub penalized: usize,
    pub sum: f64,
    /// Sum over the pairs that are not penalized.
    pub adjusted_sum: f64,
}

impl GridReport {
    pub fn mean(&self) -> f64 {
        if self.pairs == 0 {
            0.0
        } else {
            self.sum / self.pairs as f64
        }
    }

    pub fn adjusted_mean(&self) -> f64 {
        let ok = self.pairs - self.penalized;
        if ok == 0 {
            0.0
        } else {
            self.adjusted_sum / ok as f64
        }
    }
}

impl fmt::Display for GridReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}: pairs={} penalized={} sum={:.2} mean={:.2} adjsum={:.2} adjmean={:.2}",
            self.bgs,
            self.fgs,
            self.pairs,
            self.penalized,
            self.sum,
            self.mean(),
            self.adjusted_sum,
            self.adjusted_mean()
        )
    }
}

/// Summarizes the delta matrix over the 16x16, 8x16 and 8x8 grids.
/// `penalty` marks a delta as unreadable.
pub fn analyze(delta: &[Vec<f64>], penalty: impl Fn(f64) -> bool) -> Vec<GridReport> {
    [(16usize, 16usize), (8, 16), (8, 8)]
        .iter()
        .map(|&(bgs, fgs)| {
            let mut report = GridReport {
                bgs,
                fgs,
                pairs: 0,
                penalized: 0,
                sum: 0.0,
                adjusted_sum: 0.0,
            };
            for row in delta.iter().take(bgs) {
                for &d in row.iter().take(fgs) {
                    report.pairs += 1;
                    report.sum += d;
                    if penalty(d) {
                        report.penalized += 1;
                    } else {
                        report.adjusted_sum += d;
                    }
                }
            }
            report
        })
        .collect()
}
