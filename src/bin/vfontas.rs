//! The bitmap font assembler. Commands are executed in argv order
//! against a single font container, e.g.:
//!
//! ```text
//! vfontas loadpsf lat1-16.psf setname MyFont saven2 myfont.sfd
//! ```
//!
//! Each command word is either a bare verb followed by its arguments
//! (`canvas 8 16`) or the compact `verb=arg1,arg2` form. A leading
//! dash on a verb is ignored.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use vfontas::formats::{bdf, clt, cpi, fnt, hex, pbm, psf, sfd};
use vfontas::outliner::Strategy;
use vfontas::{rect, size, Font, UnicodeMap};

struct Session {
    font: Font,
    /// Separator used in file names written by `xcpi`, set by `cpisep`.
    cpisep: String,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();
    if let Err(err) = run() {
        eprintln!("vfontas: {:#}", err);
        std::process::exit(1);
    }
}

fn arity(verb: &str) -> Option<usize> {
    Some(match verb {
        "blankfnt" | "clearmap" | "fliph" | "flipv" | "invert" | "lge" | "lgeu" | "lgeuf"
        | "setbold" => 0,
        "cpisep" | "loadbdf" | "loadclt" | "loadcpi" | "loadfnt" | "loadhex" | "loadmap"
        | "loadpcf" | "loadpsf" | "overstrike" | "savebdf" | "saveclt" | "savefnt" | "savemap"
        | "saven1" | "saven2" | "saven2ev" | "savepbm" | "savepsf" | "savesfd" | "setname" => 1,
        "canvas" | "move" | "upscale" | "xlat" | "setprop" | "xcpi" | "xcpi.ice" => 2,
        "loadraw" => 3,
        "crop" => 4,
        "copy" => 6,
        _ => return None,
    })
}

fn run() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    if argv.is_empty() {
        bail!("no commands given (try: blankfnt savefnt -)");
    }
    let mut session = Session {
        font: Font::new(),
        cpisep: "-".to_owned(),
    };
    let mut i = 0;
    while i < argv.len() {
        let word = argv[i].strip_prefix('-').unwrap_or(&argv[i]);
        i += 1;
        let (verb, args): (&str, Vec<String>) = match word.split_once('=') {
            Some((verb, rest)) => (verb, rest.split(',').map(str::to_owned).collect()),
            None => {
                let n = arity(word).ok_or_else(|| anyhow::anyhow!("unknown command \"{}\"", word))?;
                if i + n > argv.len() {
                    bail!("command \"{}\" needs {} argument(s)", word, n);
                }
                let args = argv[i..i + n].to_vec();
                i += n;
                (word, args)
            }
        };
        exec(&mut session, verb, &args).with_context(|| format!("command \"{}\"", verb))?;
    }
    Ok(())
}

fn num<T: std::str::FromStr>(args: &[String], at: usize) -> Result<T> {
    args.get(at)
        .and_then(|v| v.parse().ok())
        .ok_or_else(|| anyhow::anyhow!("bad numeric argument #{}", at + 1))
}

fn out_stream(path: &str) -> Result<Box<dyn Write>> {
    if path == "-" {
        Ok(Box::new(io::stdout()))
    } else {
        let file = File::create(path).with_context(|| format!("cannot create {}", path))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

fn exec(session: &mut Session, verb: &str, args: &[String]) -> Result<()> {
    if let Some(n) = arity(verb) {
        if args.len() < n {
            bail!("needs {} argument(s), got {}", n, args.len());
        }
    }
    let font = &mut session.font;
    match verb {
        "blankfnt" => *font = Font::blank_256(size(8, 16)),
        "canvas" => font.canvas(num(args, 0)?, num(args, 1)?),
        "clearmap" => font.map = None,
        "copy" => {
            let src = rect(num(args, 0)?, num(args, 1)?, num(args, 2)?, num(args, 3)?);
            let dst = rect(num(args, 4)?, num(args, 5)?, src.size.w, src.size.h);
            font.copy_window(src, dst);
        }
        "crop" => font.crop(rect(
            num(args, 0)?,
            num(args, 1)?,
            num(args, 2)?,
            num(args, 3)?,
        )),
        "fliph" => font.map_glyphs(|g| g.flip(true, false)),
        "flipv" => font.map_glyphs(|g| g.flip(false, true)),
        "invert" => font.map_glyphs(|g| g.invert()),
        "lge" => font.lge(),
        "lgeu" => font.lge_unicode(false),
        "lgeuf" => font.lge_unicode(true),
        "cpisep" => session.cpisep = args[0].clone(),
        "loadbdf" => *font = bdf::load(Path::new(&args[0]))?,
        "loadclt" => *font = clt::load_dir(Path::new(&args[0]))?,
        "loadcpi" => {
            let mut fonts = cpi::load(Path::new(&args[0]), false)?;
            if fonts.is_empty() {
                bail!("{}: no screen fonts found", args[0]);
            }
            if fonts.len() > 1 {
                log::warn!(
                    "{}: {} screen fonts present, taking the first (use xcpi for all)",
                    args[0],
                    fonts.len()
                );
            }
            *font = fonts.remove(0).font;
        }
        "loadfnt" => *font = fnt::load(Path::new(&args[0]))?,
        "loadhex" => *font = hex::load(Path::new(&args[0]))?,
        "loadmap" => font.map = Some(UnicodeMap::load(Path::new(&args[0]))?),
        "loadpsf" => *font = psf::load(Path::new(&args[0]))?,
        "loadraw" => *font = fnt::load_raw(Path::new(&args[0]), num(args, 1)?, num(args, 2)?)?,
        "move" => {
            let (dx, dy) = (num(args, 0)?, num(args, 1)?);
            font.map_glyphs(|g| g.translate(dx, dy, false));
        }
        "overstrike" => {
            let px = num(args, 0)?;
            font.overstrike(px);
        }
        "savebdf" => bdf::save(font, &mut *out_stream(&args[0])?)?,
        "saveclt" => clt::save_dir(font, Path::new(&args[0]))?,
        "savefnt" => fnt::save(font, &mut *out_stream(&args[0])?)?,
        "savemap" => match &font.map {
            Some(map) => map.save(Path::new(&args[0]))?,
            None => log::warn!("savemap: no unicode map loaded, skipping"),
        },
        "saven1" => sfd::save(font, &mut *out_stream(&args[0])?, Strategy::N1)?,
        "saven2" => sfd::save(font, &mut *out_stream(&args[0])?, Strategy::N2)?,
        "saven2ev" => sfd::save(font, &mut *out_stream(&args[0])?, Strategy::N2Ev)?,
        "savepbm" => pbm::save_dir(font, Path::new(&args[0]))?,
        "savepsf" => psf::save_psf2(font, &mut *out_stream(&args[0])?)?,
        "savesfd" => sfd::save(font, &mut *out_stream(&args[0])?, Strategy::Simple)?,
        "setbold" => font.overstrike(1),
        "setname" => font.set_prop("name", &args[0]),
        "setprop" => font.set_prop(&args[0], &args[1]),
        "upscale" => font.upscale(num(args, 0)?, num(args, 1)?),
        "xcpi" => cpi::extract(
            Path::new(&args[0]),
            Path::new(&args[1]),
            false,
            &session.cpisep,
        )?,
        "xcpi.ice" => cpi::extract(
            Path::new(&args[0]),
            Path::new(&args[1]),
            true,
            &session.cpisep,
        )?,
        "xlat" => {
            let (dx, dy) = (num(args, 0)?, num(args, 1)?);
            font.map_glyphs(|g| g.translate(dx, dy, true));
        }
        "loadpcf" => bail!("\"{}\" is not supported by this build", verb),
        _ => bail!("unknown command \"{}\"", verb),
    }
    Ok(())
}
