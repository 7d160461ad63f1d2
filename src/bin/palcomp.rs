//! The terminal palette composer. Commands run in argv order against
//! one palette register, e.g.:
//!
//! ```text
//! palcomp vga loeq hsltint=280,0.3 cxa xfce
//! ```
//!
//! A command starting with `(` or looking like `<reg>=...` is
//! shorthand for `eval=`.

use anyhow::{bail, Context, Result};
use vfontas::color::{ColorEngine, Srgb888};
use vfontas::contrast::{self, APCA_PENALTY, L_DELTA_PENALTY};
use vfontas::expr::Expr;
use vfontas::palette::Palette;
use vfontas::Error;
use std::collections::BTreeMap;
use std::path::Path;

struct Composer {
    engine: ColorEngine,
    palette: Palette,
    registry: BTreeMap<String, Palette>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
    if let Err(err) = run() {
        eprintln!("palcomp: {:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut composer = Composer {
        engine: ColorEngine::new(),
        palette: Palette::new(),
        registry: BTreeMap::new(),
    };
    for word in std::env::args().skip(1) {
        let word = word.strip_prefix('-').unwrap_or(&word).to_owned();
        composer
            .exec(&word)
            .with_context(|| format!("command \"{}\"", word))?;
    }
    Ok(())
}

/// `a,b-c,...` entry selections for `eval@`.
fn parse_indices(text: &str) -> Result<Vec<usize>> {
    let mut out = Vec::new();
    for part in text.split(',') {
        match part.split_once('-') {
            Some((a, b)) => {
                let lo: usize = a.parse().with_context(|| format!("bad index \"{}\"", a))?;
                let hi: usize = b.parse().with_context(|| format!("bad index \"{}\"", b))?;
                out.extend(lo..=hi);
            }
            None => out.push(part.parse().with_context(|| format!("bad index \"{}\"", part))?),
        }
    }
    Ok(out)
}

/// Nearest entry of the xterm 256-color extension (the 6x6x6 cube or
/// the grayscale ramp).
fn nearest_256(c: Srgb888) -> u8 {
    let q = |v: u8| -> u32 {
        // cube levels 0, 95, 135, 175, 215, 255
        if v < 48 {
            0
        } else if v < 115 {
            1
        } else {
            ((v as u32 - 35) / 40).min(5)
        }
    };
    let level = |i: u32| if i == 0 { 0i32 } else { (55 + 40 * i) as i32 };
    let (qr, qg, qb) = (q(c.r), q(c.g), q(c.b));
    let cube_idx = 16 + 36 * qr + 6 * qg + qb;
    let cube_err = (level(qr) - c.r as i32).pow(2)
        + (level(qg) - c.g as i32).pow(2)
        + (level(qb) - c.b as i32).pow(2);
    let gray_avg = (c.r as i32 + c.g as i32 + c.b as i32) / 3;
    let gray_step = ((gray_avg - 8).max(0) / 10).min(23);
    let gray_val = 8 + 10 * gray_step;
    let gray_idx = 232 + gray_step as u32;
    let gray_err = (gray_val - c.r as i32).pow(2)
        + (gray_val - c.g as i32).pow(2)
        + (gray_val - c.b as i32).pow(2);
    if gray_err < cube_err {
        gray_idx as u8
    } else {
        cube_idx as u8
    }
}

impl Composer {
    fn exec(&mut self, word: &str) -> Result<()> {
        // eval shorthand
        if word.starts_with('(') {
            return self.eval(word, None);
        }
        if word.len() >= 2 && word.as_bytes()[1] == b'=' && word.as_bytes()[0].is_ascii_lowercase()
        {
            return self.eval(word, None);
        }
        let (verb, arg) = match word.split_once('=') {
            Some((v, a)) => (v, Some(a)),
            None => (word, None),
        };
        if let Some(list) = verb.strip_prefix("eval@") {
            let indices = parse_indices(list)?;
            let text = arg.ok_or_else(|| anyhow::anyhow!("eval@ needs an expression"))?;
            return self.eval(text, Some(indices));
        }
        match (verb, arg) {
            ("vga", None) => self.palette = Palette::vga(&self.engine),
            ("vgs", None) => self.palette = Palette::vgs(&self.engine),
            ("win", None) => self.palette = Palette::win(&self.engine),
            ("loadpal", Some(file)) => {
                self.palette = Palette::load(&self.engine, Path::new(file))?
            }
            ("loadreg", Some(name)) => match self.registry.get(name) {
                Some(pal) => self.palette = pal.clone(),
                None => bail!("no saved register \"{}\"", name),
            },
            ("savereg", Some(name)) => {
                self.registry.insert(name.to_owned(), self.palette.clone());
            }
            ("blend", Some(spec)) => {
                let (pct, name) = spec
                    .split_once(',')
                    .ok_or_else(|| anyhow::anyhow!("blend needs PCT,NAME"))?;
                let pct: f64 = pct.parse().context("bad percentage")?;
                let other = self
                    .registry
                    .get(name)
                    .ok_or_else(|| anyhow::anyhow!("no saved register \"{}\"", name))?
                    .clone();
                self.palette.blend(&self.engine, pct, &other);
            }
            ("eq", arg) => {
                let b = arg.map(|a| a.parse().context("bad lightness")).transpose()?;
                self.palette.eq(&self.engine, b);
            }
            ("loeq", arg) => {
                let (b, g) = match arg {
                    None => (None, None),
                    Some(spec) => match spec.split_once(',') {
                        Some((b, g)) => (
                            Some(b.parse().context("bad lightness")?),
                            Some(g.parse().context("bad lightness")?),
                        ),
                        None => (Some(spec.parse().context("bad lightness")?), None),
                    },
                };
                self.palette.loeq(&self.engine, b, g);
            }
            ("hsltint", Some(spec)) => {
                let (h, s) = split2(spec, "hsltint needs HUE,SAT")?;
                self.palette.tint_hsl(&self.engine, h, s);
            }
            ("lchtint", Some(spec)) => {
                let (c, h) = split2(spec, "lchtint needs CHROMA,HUE")?;
                self.palette.tint_lch(&self.engine, c, h);
            }
            ("ild", Some(t)) => {
                let t: f64 = t.parse().context("bad color temperature")?;
                self.engine.set_illuminant(t);
                self.palette.sync_from_rgb(&self.engine);
            }
            ("cfgamma", Some(g)) => {
                let g: f64 = g.parse().context("bad gamma")?;
                self.engine.set_gamma(g);
                self.palette.sync_from_rgb(&self.engine);
            }
            ("syncfromrgb", None) => self.palette.sync_from_rgb(&self.engine),
            ("syncfromlch", None) => self.palette.sync_from_lch(&self.engine),
            ("inv16", None) => self.palette.invert(&self.engine),
            ("lch", None) => {
                for (idx, lch) in self.palette.lch().iter().enumerate() {
                    println!(
                        "{:2}: L={:6.2} C={:6.2} h={:6.2}",
                        idx, lch.l, lch.c, lch.h
                    );
                }
            }
            ("cxl", None) => {
                let delta = contrast::l_delta_matrix(self.palette.lch());
                println!("L* difference analysis:");
                for report in contrast::analyze(&delta, |d| d < L_DELTA_PENALTY) {
                    println!("  {}", report);
                }
            }
            ("cxa", None) => {
                let delta = contrast::apca_matrix(self.palette.rgb());
                println!("APCA analysis:");
                for report in contrast::analyze(&delta, |d| d < APCA_PENALTY) {
                    println!("  {}", report);
                }
            }
            ("ct", None) => self.color_table(false),
            ("ct256", None) => self.color_table(true),
            ("emit", None) => println!("{}", self.palette_line()),
            ("xfce", None) => self.xfce_scheme(),
            ("xterm", None) => {
                for (idx, c) in self.palette.rgb().iter().enumerate() {
                    println!("*color{}: {}", idx, c.to_hex());
                }
            }
            ("fg", None) => self.osc("10", 7)?,
            ("bg", None) => self.osc("11", 0)?,
            ("bd", None) => self.osc("5;0", 15)?,
            ("b0", None) => self.osc("4;0", 0)?,
            ("eval", Some(text)) => return self.eval(text, None),
            _ => bail!("unknown command"),
        }
        Ok(())
    }

    fn eval(&mut self, text: &str, indices: Option<Vec<usize>>) -> Result<()> {
        let result = match Expr::parse(text) {
            Ok(expr) => self.palette.eval(&self.engine, &expr, indices.as_deref()),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => Ok(()),
            Err(Error::Expr { pos, reason }) => {
                eprintln!("palcomp: {}", reason);
                eprintln!("  {}", text);
                eprintln!("  {:>width$}", "^", width = pos + 1);
                bail!("expression failed");
            }
            Err(other) => Err(other.into()),
        }
    }

    fn palette_line(&self) -> String {
        let mut line = String::from("ColorPalette=");
        for c in self.palette.rgb() {
            line.push_str(&c.to_hex());
            line.push(';');
        }
        line
    }

    /// A complete xfce4-terminal color scheme snippet, ready to drop
    /// into a terminalrc or a colorschemes file.
    fn xfce_scheme(&self) {
        println!("[Scheme]");
        println!("Name=palcomp");
        println!("{}", self.palette_line());
        if let (Some(fg), Some(bg)) = (self.palette.rgb().get(7), self.palette.rgb().get(0)) {
            println!("ColorForeground={}", fg.to_hex());
            println!("ColorBackground={}", bg.to_hex());
            println!("ColorCursor={}", fg.to_hex());
        }
        println!("ColorBold=");
        println!("ColorBoldUseDefault=TRUE");
    }

    /// A 16x16 sample grid, every foreground on every background.
    fn color_table(&self, indexed: bool) {
        for (bg_idx, bg) in self.palette.rgb().iter().enumerate() {
            for (fg_idx, fg) in self.palette.rgb().iter().enumerate() {
                if indexed {
                    print!(
                        "\x1b[38;5;{};48;5;{}m{:x}{:x}",
                        nearest_256(*fg),
                        nearest_256(*bg),
                        fg_idx,
                        bg_idx
                    );
                } else {
                    print!(
                        "\x1b[38;2;{};{};{};48;2;{};{};{}m{:x}{:x}",
                        fg.r, fg.g, fg.b, bg.r, bg.g, bg.b, fg_idx, bg_idx
                    );
                }
            }
            println!("\x1b[0m");
        }
    }

    fn osc(&self, code: &str, entry: usize) -> Result<()> {
        match self.palette.rgb().get(entry) {
            Some(c) => {
                print!("\x1b]{};{}\x1b\\", code, c.to_hex());
                Ok(())
            }
            None => {
                log::warn!("palette is empty, skipping");
                Ok(())
            }
        }
    }
}

fn split2(spec: &str, msg: &str) -> Result<(f64, f64)> {
    let (a, b) = spec.split_once(',').ok_or_else(|| anyhow::anyhow!("{}", msg))?;
    Ok((
        a.parse().with_context(|| format!("bad number \"{}\"", a))?,
        b.parse().with_context(|| format!("bad number \"{}\"", b))?,
    ))
}
