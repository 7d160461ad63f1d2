//! Per-glyph P1 portable bitmaps, for eyeballing glyphs with image
//! tools.

use crate::{Error, Font, Result};
use std::fs;
use std::path::Path;

/// Writes one `<codepoint>.pbm` per glyph into `dir`.
pub fn save_dir(font: &Font, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    for (idx, glyph) in font.glyphs.iter().enumerate() {
        let cp = match &font.map {
            Some(map) => map
                .to_unicode(idx)
                .into_iter()
                .next()
                .unwrap_or(idx as u32),
            None => idx as u32,
        };
        let path = dir.join(format!("{:04x}.pbm", cp));
        fs::write(&path, glyph.as_pbm()).map_err(|e| Error::io(&path, e))?;
    }
    Ok(())
}
