//! Raster model and unicode map scenarios.

use std::fs;
use std::io::Write as _;
use vfontas::formats::fnt;
use vfontas::{rect, size, Font, Glyph, UnicodeMap};

fn checker(w: u32, h: u32) -> Glyph {
    let mut g = Glyph::blank(size(w, h));
    for y in 0..h as i32 {
        for x in 0..w as i32 {
            if (x + y) % 2 == 0 {
                g.set_pixel(x, y, true);
            }
        }
    }
    g
}

#[test]
fn rowpad_round_trip_odd_widths() {
    for &(w, h) in &[(5u32, 7u32), (8, 16), (9, 16), (16, 16), (1, 1)] {
        let g = checker(w, h);
        let back = Glyph::from_rpad(g.size(), &g.as_rowpad()).unwrap();
        assert_eq!(back, g, "{}x{}", w, h);
    }
}

#[test]
fn copy_to_blank_full_rect_is_identity() {
    let g = checker(7, 5);
    let out = g.copy_rect_to(
        rect(0, 0, 7, 5),
        &Glyph::blank(size(7, 5)),
        rect(0, 0, 7, 5),
        true,
    );
    assert_eq!(out, g);
}

#[test]
fn copy_clips_both_canvases() {
    let g = checker(8, 8);
    // sample a window hanging off the source, land it hanging off the
    // destination
    let out = g.copy_rect_to(
        rect(4, 4, 8, 8),
        &Glyph::blank(size(4, 4)),
        rect(2, 2, 8, 8),
        false,
    );
    assert_eq!(out.size(), size(4, 4));
    assert_eq!(out.get(2, 2), g.get(4, 4));
    assert_eq!(out.get(3, 3), g.get(5, 5));
    assert!(!out.get(0, 0));
}

#[test]
fn overstrike_widens_but_never_clears() {
    let g = checker(8, 4);
    let bold = g.overstrike(2);
    for y in 0..4 {
        for x in 0..8 {
            if g.get(x, y) {
                assert!(bold.get(x, y));
            }
        }
    }
}

#[test]
fn whole_font_canvas_then_upscale() {
    let mut font = Font::blank_256(size(8, 16));
    font.glyphs[0x41].set_pixel(7, 15, true);
    font.canvas(9, 16);
    assert_eq!(font.nominal_size(), Some(size(9, 16)));
    assert!(font.glyphs[0x41].get(7, 15));
    font.upscale(2, 2);
    assert_eq!(font.nominal_size(), Some(size(18, 32)));
    assert!(font.glyphs[0x41].get(15, 31));
    // zero factor is refused, size unchanged
    font.upscale(0, 3);
    assert_eq!(font.nominal_size(), Some(size(18, 32)));
}

#[test]
fn blankfnt_dump_is_zero_filled() {
    let font = Font::blank_256(size(8, 16));
    let mut out = Vec::new();
    fnt::save(&font, &mut out).unwrap();
    assert_eq!(out, vec![0u8; 4096]);
}

#[test]
fn raw_dump_round_trip() {
    let mut font = Font::blank_256(size(8, 16));
    font.glyphs[2].set_pixel(0, 0, true);
    font.glyphs[255].set_pixel(7, 15, true);
    let mut bytes = Vec::new();
    fnt::save(&font, &mut bytes).unwrap();

    let path = std::env::temp_dir().join("vfontas-test-rt.fnt");
    fs::write(&path, &bytes).unwrap();
    let back = fnt::load(&path).unwrap();
    fs::remove_file(&path).ok();
    assert_eq!(back.glyphs.len(), 256);
    assert_eq!(back.glyphs[2], font.glyphs[2]);
    assert_eq!(back.glyphs[255], font.glyphs[255]);
}

#[test]
fn unimap_text_round_trip() {
    let path = std::env::temp_dir().join("vfontas-test.uni");
    let mut f = fs::File::create(&path).unwrap();
    writeln!(f, "# box drawing").unwrap();
    writeln!(f, "0x00-0x1f idem").unwrap();
    writeln!(f, "0x41 U+0041 U+0391  # A and Alpha").unwrap();
    writeln!(f, "66 U+0042").unwrap();
    drop(f);
    let map = UnicodeMap::load(&path).unwrap();
    fs::remove_file(&path).ok();

    assert_eq!(map.to_index(0x41), Some(0x41));
    assert_eq!(map.to_index(0x391), Some(0x41));
    assert_eq!(map.to_index(0x42), Some(66));
    // idem lines store nothing; identity is the default anyway
    assert_eq!(
        map.to_unicode(3).iter().copied().collect::<Vec<_>>(),
        [3]
    );

    let out = std::env::temp_dir().join("vfontas-test-out.uni");
    map.save(&out).unwrap();
    let back = UnicodeMap::load(&out).unwrap();
    fs::remove_file(&out).ok();
    assert_eq!(back, map);
}

#[test]
fn ranged_index_requires_idem() {
    let path = std::env::temp_dir().join("vfontas-test-bad.uni");
    fs::write(&path, "0x20-0x30 U+2500\n").unwrap();
    let err = UnicodeMap::load(&path).unwrap_err();
    fs::remove_file(&path).ok();
    assert!(err.to_string().contains("idem"));
}

#[test]
fn lge_unicode_applies_via_map() {
    let mut font = Font::blank_256(size(9, 16));
    font.glyphs[0xC4].set_pixel(7, 8, true);
    let mut map = UnicodeMap::new();
    map.add_i2u(0xC4, 0x2500);
    font.map = Some(map);
    font.lge_unicode(false);
    assert!(font.glyphs[0xC4].get(8, 8));
    // block elements only with the full variant
    font.glyphs[0xDB].set_pixel(7, 4, true);
    font.map.as_mut().unwrap().add_i2u(0xDB, 0x2588);
    font.lge_unicode(false);
    assert!(!font.glyphs[0xDB].get(8, 4));
    font.lge_unicode(true);
    assert!(font.glyphs[0xDB].get(8, 4));
}
