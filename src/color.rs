//! Color spaces for the palette pipeline: sRGB (8-bit and linear),
//! CIE XYZ, CIE L\*a\*b\* / L\*C\*h\*, and HSL.
//!
//! The XYZ conversions depend on a whitepoint; everything stateful
//! (whitepoint, derived sRGB matrix, optional gamma override) lives in
//! a [`ColorEngine`] value that the command dispatcher threads through
//! every conversion.

/// An 8-bit-per-channel sRGB triple, the storage form of palette
/// entries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Srgb888 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Srgb888 {
    pub fn new(r: u8, g: u8, b: u8) -> Srgb888 {
        Srgb888 { r, g, b }
    }

    /// Parses `rrggbb` with an optional `#` prefix.
    pub fn from_hex(s: &str) -> Option<Srgb888> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some(Srgb888::new(r, g, b))
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// CIE L\*C\*h\*: perceptual lightness, chroma, hue angle in degrees.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Lch {
    pub l: f64,
    pub c: f64,
    pub h: f64,
}

/// CIE 1931 XYZ.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Xyz {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Hue (degrees), saturation, lightness, all derived straight from
/// sRGB values without touching the whitepoint.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Hsl {
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

const EPSILON: f64 = 216.0 / 24389.0;
const KAPPA: f64 = 24389.0 / 27.0;

// sRGB primaries (CIE xy)
const PRIMARIES: [(f64, f64); 3] = [(0.64, 0.33), (0.30, 0.60), (0.15, 0.06)];

/// The XYZ of illuminant D at a correlated color temperature, per the
/// CIE daylight polynomial. Kept as the raw chromaticity coordinates
/// `(x, y, 1-x-y)`, so the luminance of white varies with the
/// temperature and an `ild` change is visible even on grays.
fn illuminant_d(cct: f64) -> Xyz {
    let x = if cct <= 7000.0 {
        0.244063 + 0.09911e3 / cct + 2.9678e6 / (cct * cct) - 4.6070e9 / (cct * cct * cct)
    } else {
        0.237040 + 0.24748e3 / cct + 1.9018e6 / (cct * cct) - 2.0064e9 / (cct * cct * cct)
    };
    let y = -3.0 * x * x + 2.87 * x - 0.275;
    Xyz {
        x,
        y,
        z: 1.0 - x - y,
    }
}

/// The whitepoint- and gamma-dependent half of the pipeline.
///
/// The L\*a\*b\* reference white stays pinned at D 6500 K; `ild` only
/// moves the whitepoint the sRGB matrix is balanced against, so a
/// temperature change shows up as a lightness/chroma shift even on
/// grays.
#[derive(Clone, Debug)]
pub struct ColorEngine {
    white: Xyz,
    lab_white: Xyz,
    m: [[f64; 3]; 3],
    m_inv: [[f64; 3]; 3],
    gamma: Option<f64>,
}

impl Default for ColorEngine {
    fn default() -> ColorEngine {
        ColorEngine::new()
    }
}

impl ColorEngine {
    /// An engine at illuminant D 6500 K with standard sRGB companding.
    pub fn new() -> ColorEngine {
        let mut engine = ColorEngine {
            white: Xyz::default(),
            lab_white: illuminant_d(6500.0),
            m: [[0.0; 3]; 3],
            m_inv: [[0.0; 3]; 3],
            gamma: None,
        };
        engine.set_illuminant(6500.0);
        engine
    }

    /// Recomputes the matrix whitepoint from a daylight correlated
    /// color temperature and rederives the sRGB<->XYZ matrices.
    pub fn set_illuminant(&mut self, cct: f64) {
        self.white = illuminant_d(cct);
        self.derive_matrix();
    }

    /// Replaces the piecewise sRGB transfer with a pure power curve.
    pub fn set_gamma(&mut self, gamma: f64) {
        self.gamma = Some(gamma);
    }

    pub fn white(&self) -> Xyz {
        self.white
    }

    /// Builds the RGB->XYZ matrix from the primaries' chromaticities
    /// scaled so that RGB (1,1,1) maps onto the current whitepoint.
    fn derive_matrix(&mut self) {
        let mut mp = [[0.0; 3]; 3];
        for (col, &(x, y)) in PRIMARIES.iter().enumerate() {
            mp[0][col] = x;
            mp[1][col] = y;
            mp[2][col] = 1.0 - x - y;
        }
        let mp_inv = invert3(&mp);
        let w = self.white;
        let s = [
            mp_inv[0][0] * w.x + mp_inv[0][1] * w.y + mp_inv[0][2] * w.z,
            mp_inv[1][0] * w.x + mp_inv[1][1] * w.y + mp_inv[1][2] * w.z,
            mp_inv[2][0] * w.x + mp_inv[2][1] * w.y + mp_inv[2][2] * w.z,
        ];
        for row in 0..3 {
            for col in 0..3 {
                self.m[row][col] = mp[row][col] * s[col];
            }
        }
        self.m_inv = invert3(&self.m);
    }

    /// sRGB channel to linear light.
    pub fn expand(&self, c: f64) -> f64 {
        match self.gamma {
            Some(g) => c.max(0.0).powf(g),
            None => {
                if c <= 0.04045 {
                    c / 12.92
                } else {
                    ((c + 0.055) / 1.055).powf(2.4)
                }
            }
        }
    }

    /// Linear light back to an sRGB channel.
    pub fn compress(&self, c: f64) -> f64 {
        match self.gamma {
            Some(g) => c.max(0.0).powf(1.0 / g),
            None => {
                if c <= 0.003_130_8 {
                    c * 12.92
                } else {
                    1.055 * c.powf(1.0 / 2.4) - 0.055
                }
            }
        }
    }

    pub fn srgb_to_xyz(&self, rgb: Srgb888) -> Xyz {
        let r = self.expand(rgb.r as f64 / 255.0);
        let g = self.expand(rgb.g as f64 / 255.0);
        let b = self.expand(rgb.b as f64 / 255.0);
        Xyz {
            x: self.m[0][0] * r + self.m[0][1] * g + self.m[0][2] * b,
            y: self.m[1][0] * r + self.m[1][1] * g + self.m[1][2] * b,
            z: self.m[2][0] * r + self.m[2][1] * g + self.m[2][2] * b,
        }
    }

    pub fn xyz_to_srgb(&self, xyz: Xyz) -> Srgb888 {
        let r = self.m_inv[0][0] * xyz.x + self.m_inv[0][1] * xyz.y + self.m_inv[0][2] * xyz.z;
        let g = self.m_inv[1][0] * xyz.x + self.m_inv[1][1] * xyz.y + self.m_inv[1][2] * xyz.z;
        let b = self.m_inv[2][0] * xyz.x + self.m_inv[2][1] * xyz.y + self.m_inv[2][2] * xyz.z;
        let q = |c: f64| (self.compress(c.max(0.0)) * 255.0).round().max(0.0).min(255.0) as u8;
        Srgb888::new(q(r), q(g), q(b))
    }

    pub fn xyz_to_lch(&self, xyz: Xyz) -> Lch {
        let f = |t: f64| {
            if t > EPSILON {
                t.cbrt()
            } else {
                (KAPPA * t + 16.0) / 116.0
            }
        };
        let fx = f(xyz.x / self.lab_white.x);
        let fy = f(xyz.y / self.lab_white.y);
        let fz = f(xyz.z / self.lab_white.z);
        let l = 116.0 * fy - 16.0;
        let a = 500.0 * (fx - fy);
        let b = 200.0 * (fy - fz);
        Lch {
            l,
            c: a.hypot(b),
            h: norm_hue(b.atan2(a).to_degrees()),
        }
    }

    pub fn lch_to_xyz(&self, lch: Lch) -> Xyz {
        let a = lch.c * lch.h.to_radians().cos();
        let b = lch.c * lch.h.to_radians().sin();
        let fy = (lch.l + 16.0) / 116.0;
        let fx = fy + a / 500.0;
        let fz = fy - b / 200.0;
        let finv = |t: f64| {
            let t3 = t * t * t;
            if t3 > EPSILON {
                t3
            } else {
                (116.0 * t - 16.0) / KAPPA
            }
        };
        let yr = if lch.l > KAPPA * EPSILON {
            fy * fy * fy
        } else {
            lch.l / KAPPA
        };
        Xyz {
            x: finv(fx) * self.lab_white.x,
            y: yr * self.lab_white.y,
            z: finv(fz) * self.lab_white.z,
        }
    }

    pub fn srgb_to_lch(&self, rgb: Srgb888) -> Lch {
        self.xyz_to_lch(self.srgb_to_xyz(rgb))
    }

    pub fn lch_to_srgb(&self, lch: Lch) -> Srgb888 {
        self.xyz_to_srgb(self.lch_to_xyz(lch))
    }
}

/// Normalizes a hue angle into `[0, 360)`.
pub fn norm_hue(h: f64) -> f64 {
    let h = h % 360.0;
    if h < 0.0 {
        h + 360.0
    } else {
        h
    }
}

pub fn srgb_to_hsl(rgb: Srgb888) -> Hsl {
    let r = rgb.r as f64 / 255.0;
    let g = rgb.g as f64 / 255.0;
    let b = rgb.b as f64 / 255.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    if max == min {
        return Hsl { h: 0.0, s: 0.0, l };
    }
    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };
    let h = if max == r {
        60.0 * ((g - b) / d)
    } else if max == g {
        60.0 * ((b - r) / d + 2.0)
    } else {
        60.0 * ((r - g) / d + 4.0)
    };
    Hsl {
        h: norm_hue(h),
        s,
        l,
    }
}

pub fn hsl_to_srgb(hsl: Hsl) -> Srgb888 {
    let c = (1.0 - (2.0 * hsl.l - 1.0).abs()) * hsl.s;
    let hp = norm_hue(hsl.h) / 60.0;
    let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
    let (r1, g1, b1) = match hp as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    let m = hsl.l - c / 2.0;
    let q = |v: f64| ((v + m) * 255.0).round().max(0.0).min(255.0) as u8;
    Srgb888::new(q(r1), q(g1), q(b1))
}

fn invert3(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    let mut inv = [[0.0; 3]; 3];
    inv[0][0] = (m[1][1] * m[2][2] - m[1][2] * m[2][1]) / det;
    inv[0][1] = (m[0][2] * m[2][1] - m[0][1] * m[2][2]) / det;
    inv[0][2] = (m[0][1] * m[1][2] - m[0][2] * m[1][1]) / det;
    inv[1][0] = (m[1][2] * m[2][0] - m[1][0] * m[2][2]) / det;
    inv[1][1] = (m[0][0] * m[2][2] - m[0][2] * m[2][0]) / det;
    inv[1][2] = (m[0][2] * m[1][0] - m[0][0] * m[1][2]) / det;
    inv[2][0] = (m[1][0] * m[2][1] - m[1][1] * m[2][0]) / det;
    inv[2][1] = (m[0][1] * m[2][0] - m[0][0] * m[2][1]) / det;
    inv[2][2] = (m[0][0] * m[1][1] - m[0][1] * m[1][0]) / det;
    inv
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn hex_round_trip() {
        let c = Srgb888::from_hex("#aa5500").unwrap();
        assert_eq!(c, Srgb888::new(0xAA, 0x55, 0x00));
        assert_eq!(c.to_hex(), "#aa5500");
        assert!(Srgb888::from_hex("#12345").is_none());
    }

    #[test]
    fn matrix_maps_white_onto_whitepoint() {
        let e = ColorEngine::new();
        let w = e.white();
        let sum = |row: usize| e.m[row][0] + e.m[row][1] + e.m[row][2];
        assert_relative_eq!(sum(0), w.x, epsilon = 1e-9);
        assert_relative_eq!(sum(1), w.y, epsilon = 1e-9);
        assert_relative_eq!(sum(2), w.z, epsilon = 1e-9);
    }

    #[test]
    fn mid_gray_lightness() {
        let e = ColorEngine::new();
        // sRGB 0.5 gray: the textbook L* of about 53.4, zero chroma
        let xyz = {
            let g = e.expand(0.5);
            Xyz {
                x: e.m[0][0] * g + e.m[0][1] * g + e.m[0][2] * g,
                y: e.m[1][0] * g + e.m[1][1] * g + e.m[1][2] * g,
                z: e.m[2][0] * g + e.m[2][1] * g + e.m[2][2] * g,
            }
        };
        let lch = e.xyz_to_lch(xyz);
        assert_relative_eq!(lch.l, 53.4, epsilon = 0.1);
        assert!(lch.c < 1e-6);
    }

    #[test]
    fn black_and_white_anchors() {
        let e = ColorEngine::new();
        let black = e.srgb_to_lch(Srgb888::new(0, 0, 0));
        let white = e.srgb_to_lch(Srgb888::new(255, 255, 255));
        assert_relative_eq!(black.l, 0.0, epsilon = 1e-9);
        assert_relative_eq!(white.l, 100.0, epsilon = 1e-9);
        assert!(white.c < 1e-6);
    }

    #[test]
    fn srgb_lch_round_trip_within_one() {
        let e = ColorEngine::new();
        for &c in &[
            Srgb888::new(0xAA, 0x00, 0x00),
            Srgb888::new(0x00, 0xAA, 0x00),
            Srgb888::new(0xAA, 0x55, 0x00),
            Srgb888::new(0x55, 0x55, 0xFF),
            Srgb888::new(0x12, 0x34, 0x56),
        ] {
            let back = e.lch_to_srgb(e.srgb_to_lch(c));
            assert!((back.r as i32 - c.r as i32).abs() <= 1, "{:?} -> {:?}", c, back);
            assert!((back.g as i32 - c.g as i32).abs() <= 1, "{:?} -> {:?}", c, back);
            assert!((back.b as i32 - c.b as i32).abs() <= 1, "{:?} -> {:?}", c, back);
        }
    }

    #[test]
    fn whitepoint_changes_propagate() {
        let mut e = ColorEngine::new();
        let a = e.srgb_to_lch(Srgb888::new(0xAA, 0xAA, 0xAA));
        assert!(a.c < 1e-6);
        e.set_illuminant(5000.0);
        let b = e.srgb_to_lch(Srgb888::new(0xAA, 0xAA, 0xAA));
        // the matrix white moved away from the Lab reference, so even
        // a gray picks up a cast
        assert!(b.c > 0.1);
        assert!((a.l - b.l).abs() > 1e-3 || b.c > 0.1);
    }

    #[test]
    fn hsl_round_trip() {
        for &c in &[
            Srgb888::new(0xFF, 0x55, 0x55),
            Srgb888::new(0x00, 0xAA, 0xAA),
            Srgb888::new(0x30, 0x30, 0x30),
        ] {
            let back = hsl_to_srgb(srgb_to_hsl(c));
            assert!((back.r as i32 - c.r as i32).abs() <= 1);
            assert!((back.g as i32 - c.g as i32).abs() <= 1);
            assert!((back.b as i32 - c.b as i32).abs() <= 1);
        }
    }
}
