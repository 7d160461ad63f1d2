//! Console typography tools.
//!
//! This crate is the library behind two command line utilities:
//!
//! * `vfontas`, a bitmap font assembler. It loads raster console fonts
//!   (PSF, BDF, HEX, CLT, raw dumps), applies pixel-level transforms
//!   (canvas changes, mirroring, upscaling, emboldening, VGA-style
//!   ninth-column replication), and writes the result back out: either
//!   as another bitmap format or as spline outlines in FontForge's SFD
//!   format.
//! * `palcomp`, a terminal palette composer. It keeps an sRGB and a
//!   CIE L\*C\*h\* view of a 16-color palette coherent, retints and
//!   equalizes entries perceptually, evaluates small arithmetic
//!   expressions over per-entry registers, and analyses
//!   foreground/background contrast with both plain L\* differences
//!   and the APCA algorithm.
//!
//! The interesting machinery is the bitmap-to-outline vectorizer in
//! [`outliner`]: it converts a monochrome glyph into closed, oriented
//! polygons using one of three strategies (`simple`, `n1`, `n2`) with
//! distinct visual properties. See the module documentation for how
//! the edge graph and the polygon walk work.
//!
//! Notable things this crate does not do:
//!
//! * Anti-aliased or grayscale glyphs; everything is 1 bit per pixel.
//! * Hinting, kerning, or OpenType feature tables.
//! * Parsing outline font formats; input is always a bitmap font.

mod font;
mod geometry;
mod glyph;
mod unimap;

pub mod color;
pub mod contrast;
pub mod expr;
pub mod formats;
pub mod outliner;
pub mod palette;

pub use crate::font::Font;
pub use crate::geometry::{edge, pos, rect, size, vertex, Edge, Pos, Rect, Size, Vertex};
pub use crate::glyph::Glyph;
pub use crate::unimap::UnicodeMap;

use std::path::PathBuf;

/// The crate-wide error type.
///
/// The variants mirror how failures are reported to the user: I/O
/// errors carry the file they happened on, malformed inputs carry a
/// reason naming what was wrong, and semantic preconditions are plain
/// messages that the command layer may downgrade to warnings.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}: invalid format: {reason}", path.display())]
    InvalidFormat { path: PathBuf, reason: String },
    #[error("{0}")]
    Precondition(String),
    #[error("parse error at column {pos}: {reason}")]
    Expr { pos: usize, reason: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::InvalidFormat {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
