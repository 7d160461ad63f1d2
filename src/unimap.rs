use crate::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// The bidirectional glyph-index / codepoint relation of a font.
///
/// Two maps are kept mutually consistent: `i2u` takes a glyph index to
/// the set of codepoints rendered by it, `u2i` takes a codepoint back
/// to its glyph. An index with no `i2u` entry maps to itself, so a bare
/// 256-glyph font without a table behaves like a Latin-1-ish identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnicodeMap {
    i2u: BTreeMap<usize, BTreeSet<u32>>,
    u2i: BTreeMap<u32, usize>,
}

impl UnicodeMap {
    pub fn new() -> UnicodeMap {
        UnicodeMap::default()
    }

    pub fn is_empty(&self) -> bool {
        self.i2u.is_empty()
    }

    /// Associates codepoint `cp` with glyph `idx`. A codepoint already
    /// owned by another glyph is taken over.
    pub fn add_i2u(&mut self, idx: usize, cp: u32) {
        self.i2u.entry(idx).or_default().insert(cp);
        self.u2i.insert(cp, idx);
    }

    /// The codepoints rendered by glyph `idx`; the identity set `{idx}`
    /// when the glyph has no entry.
    pub fn to_unicode(&self, idx: usize) -> BTreeSet<u32> {
        match self.i2u.get(&idx) {
            Some(set) => set.clone(),
            None => {
                let mut set = BTreeSet::new();
                set.insert(idx as u32);
                set
            }
        }
    }

    /// The glyph index for `cp`, if any.
    pub fn to_index(&self, cp: u32) -> Option<usize> {
        self.u2i.get(&cp).copied()
    }

    /// Exchanges the entries at indices `a` and `b` in both relations.
    pub fn swap_idx(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        let ea = self.i2u.remove(&a);
        let eb = self.i2u.remove(&b);
        if let Some(set) = ea {
            for &cp in &set {
                self.u2i.insert(cp, b);
            }
            self.i2u.insert(b, set);
        }
        if let Some(set) = eb {
            for &cp in &set {
                self.u2i.insert(cp, a);
            }
            self.i2u.insert(a, set);
        }
    }

    /// Iterates `(index, codepoints)` pairs in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &BTreeSet<u32>)> {
        self.i2u.iter().map(|(&i, set)| (i, set))
    }

    /// Loads a unimap text file. Lines are
    /// `<index>[-<index>] <mapping>` where the mapping is either the
    /// word `idem` (entries map to themselves, so nothing is stored) or
    /// whitespace-separated `U+hhhh` codepoints, all attached to the
    /// same index. `#` starts a comment. Ranged indices are only valid
    /// with `idem`.
    pub fn load(path: &Path) -> Result<UnicodeMap> {
        let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut map = UnicodeMap::new();
        for (lineno, raw) in text.lines().enumerate() {
            let line = match raw.find('#') {
                Some(at) => &raw[..at],
                None => raw,
            };
            let mut words = line.split_whitespace();
            let lhs = match words.next() {
                Some(w) => w,
                None => continue,
            };
            let (lo, hi) = parse_index_range(path, lineno, lhs)?;
            let mut any = false;
            for word in words {
                if word == "idem" {
                    any = true;
                    continue;
                }
                if hi != lo {
                    return Err(Error::format(
                        path,
                        format!("line {}: ranged index needs \"idem\"", lineno + 1),
                    ));
                }
                let cp = parse_codepoint(path, lineno, word)?;
                map.add_i2u(lo, cp);
                any = true;
            }
            if !any {
                return Err(Error::format(
                    path,
                    format!("line {}: missing mapping", lineno + 1),
                ));
            }
        }
        Ok(map)
    }

    /// Writes the relation back as unimap text, one index per line.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut out = String::new();
        for (idx, set) in self.iter() {
            out.push_str(&format!("0x{:02x}", idx));
            for cp in set {
                out.push_str(&format!(" U+{:04X}", cp));
            }
            out.push('\n');
        }
        fs::write(path, out).map_err(|e| Error::io(path, e))
    }
}

/// Accepts decimal, `0x` hex, or `0` octal, like strtoul base 0.
pub(crate) fn parse_int(word: &str) -> Option<u32> {
    if let Some(hex) = word.strip_prefix("0x").or_else(|| word.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).ok()
    } else if word.len() > 1 && word.starts_with('0') {
        u32::from_str_radix(&word[1..], 8).ok()
    } else {
        word.parse().ok()
    }
}

fn parse_index_range(path: &Path, lineno: usize, word: &str) -> Result<(usize, usize)> {
    let bad = || {
        Error::format(
            path,
            format!("line {}: bad glyph index \"{}\"", lineno + 1, word),
        )
    };
    match word.split_once('-') {
        Some((a, b)) => {
            let lo = parse_int(a).ok_or_else(bad)?;
            let hi = parse_int(b).ok_or_else(bad)?;
            Ok((lo as usize, hi as usize))
        }
        None => {
            let idx = parse_int(word).ok_or_else(bad)? as usize;
            Ok((idx, idx))
        }
    }
}

fn parse_codepoint(path: &Path, lineno: usize, word: &str) -> Result<u32> {
    word.strip_prefix("U+")
        .or_else(|| word.strip_prefix("u+"))
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .ok_or_else(|| {
            Error::format(
                path,
                format!("line {}: bad codepoint \"{}\"", lineno + 1, word),
            )
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn last_add_wins() {
        let mut map = UnicodeMap::new();
        map.add_i2u(3, 0x41);
        map.add_i2u(7, 0x41);
        assert_eq!(map.to_index(0x41), Some(7));
        assert!(map.to_unicode(3).contains(&0x41));
        assert!(map.to_unicode(7).contains(&0x41));
    }

    #[test]
    fn identity_default() {
        let map = UnicodeMap::new();
        let set = map.to_unicode(0x61);
        assert_eq!(set.len(), 1);
        assert!(set.contains(&0x61));
        assert_eq!(map.to_index(0x61), None);
    }

    #[test]
    fn swap_twice_is_noop() {
        let mut map = UnicodeMap::new();
        map.add_i2u(1, 0x100);
        map.add_i2u(2, 0x200);
        map.add_i2u(2, 0x201);
        let before = map.clone();
        map.swap_idx(1, 2);
        assert_eq!(map.to_index(0x100), Some(2));
        assert_eq!(map.to_index(0x201), Some(1));
        map.swap_idx(1, 2);
        assert_eq!(map, before);
    }

    #[test]
    fn swap_with_identity_side() {
        let mut map = UnicodeMap::new();
        map.add_i2u(4, 0x2500);
        map.swap_idx(4, 9);
        assert_eq!(map.to_index(0x2500), Some(9));
        // index 4 fell back to the identity mapping
        assert_eq!(map.to_unicode(4).iter().copied().collect::<Vec<_>>(), [4]);
    }

    #[test]
    fn strtoul_base_zero() {
        assert_eq!(parse_int("0x20"), Some(32));
        assert_eq!(parse_int("020"), Some(16));
        assert_eq!(parse_int("20"), Some(20));
        assert_eq!(parse_int("zz"), None);
    }
}
