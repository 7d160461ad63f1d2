//! The bitmap-to-outline vectorizer.
//!
//! A glyph is converted into a list of closed, oriented polygons in an
//! integer-scaled coordinate space (y grows towards the ascender, the
//! interior of a shape lies to the right of each directed edge). Three
//! strategies are available:
//!
//! * [`Strategy::Simple`] emits one square per set pixel and fuses
//!   them; the result reproduces the bitmap exactly.
//! * [`Strategy::N1`] emits per-pixel diamonds and corner triangles
//!   chosen from the 3x3 neighborhood, rounding corners at emission
//!   time.
//! * [`Strategy::N2`] (and its extra-vertex variant
//!   [`Strategy::N2Ev`]) runs the square pass and then replaces
//!   rectilinear staircases with short diagonal cuts per polygon,
//!   preserving deliberate one-pixel features.
//!
//! All strategies share the same working store: an ordered edge set
//! with at most one edge per `(start, end)` pair. Squares that touch
//! cancel along their shared edges (an edge and its reverse annihilate),
//! and what remains is walked into polygons by always taking the branch
//! that keeps the interior on the right.

use crate::geometry::{edge, vertex, Edge, Vertex};
use crate::glyph::Glyph;
use log::debug;
use smallvec::SmallVec;
use std::collections::BTreeSet;

/// Which vectorization algorithm to run.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Strategy {
    Simple,
    N1,
    N2,
    /// `n2` with the isthmus neighborhood test enabled while walking,
    /// which takes the outward branch at unremarkable crossings.
    N2Ev,
}

/// A closed outline. Consecutive edges chain `end == start`, and the
/// last edge closes back on the first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Polygon {
    pub edges: Vec<Edge>,
}

impl Polygon {
    pub fn is_closed(&self) -> bool {
        self.edges.windows(2).all(|w| w[0].end == w[1].start)
            && match (self.edges.first(), self.edges.last()) {
                (Some(first), Some(last)) => last.end == first.start,
                _ => true,
            }
    }

    /// Twice the signed shoelace area. Positive for filled outlines,
    /// negative for enclaves.
    pub fn signed_area2(&self) -> i64 {
        self.edges
            .iter()
            .map(|e| {
                e.start.x as i64 * e.end.y as i64 - e.end.x as i64 * e.start.y as i64
            })
            .sum()
    }

    /// `(min, max)` corners over all vertices, or `None` when empty.
    pub fn bounds(&self) -> Option<(Vertex, Vertex)> {
        let mut it = self.edges.iter().flat_map(|e| [e.start, e.end]);
        let first = it.next()?;
        let mut lo = first;
        let mut hi = first;
        for v in it {
            lo.y = lo.y.min(v.y);
            lo.x = lo.x.min(v.x);
            hi.y = hi.y.max(v.y);
            hi.x = hi.x.max(v.x);
        }
        Some((lo, hi))
    }
}

/// Vectorizes `glyph` with the given strategy. `sx`/`sy` scale bitmap
/// pixels to outline units and must be even for the `n2` strategies
/// (their diagonal cuts land on half-pixel points). `descent` shifts
/// the origin so rows below the baseline get negative coordinates.
pub fn vectorize(glyph: &Glyph, strategy: Strategy, sx: i32, sy: i32, descent: i32) -> Vec<Polygon> {
    let mut tracer = Tracer {
        glyph,
        sx,
        sy,
        descent,
        edges: BTreeSet::new(),
    };
    match strategy {
        Strategy::Simple => {
            tracer.make_squares();
            tracer.delete_internal_edges();
            tracer.extract(SIMPLIFY_LINES)
        }
        Strategy::N1 => {
            tracer.make_n1_shapes();
            tracer.delete_internal_edges();
            tracer.extract(SIMPLIFY_LINES)
        }
        Strategy::N2 | Strategy::N2Ev => {
            tracer.make_squares();
            tracer.delete_internal_edges();
            let flags = if strategy == Strategy::N2Ev { ISTHMUS } else { 0 };
            let mut polys = tracer.extract(flags);
            for poly in &mut polys {
                n2_angle(poly, sx / 2, sy / 2);
            }
            polys
        }
    }
}

/// Merge runs of same-direction edges while walking.
const SIMPLIFY_LINES: u32 = 1 << 0;
/// Decide crossings by bitmap neighborhood instead of always inward.
const ISTHMUS: u32 = 1 << 1;

struct Tracer<'a> {
    glyph: &'a Glyph,
    sx: i32,
    sy: i32,
    descent: i32,
    edges: BTreeSet<Edge>,
}

impl Tracer<'_> {
    /// Flipped row coordinate: bitmap row 0 is the ascender side.
    fn flip_y(&self, y: i32) -> i32 {
        self.glyph.size().h as i32 - 1 - y - self.descent
    }

    /// One counter-oriented square per set pixel: left edge downward,
    /// bottom rightward, right upward, top leftward, so the interior
    /// stays on the right of each edge.
    fn make_squares(&mut self) {
        let size = self.glyph.size();
        for by in 0..size.h as i32 {
            for bx in 0..size.w as i32 {
                if !self.glyph.get(bx, by) {
                    continue;
                }
                let yy = self.flip_y(by);
                let (x0, x1) = (bx * self.sx, (bx + 1) * self.sx);
                let (y0, y1) = (yy * self.sy, (yy + 1) * self.sy);
                self.edges.insert(edge(vertex(y1, x0), vertex(y0, x0)));
                self.edges.insert(edge(vertex(y0, x0), vertex(y0, x1)));
                self.edges.insert(edge(vertex(y0, x1), vertex(y1, x1)));
                self.edges.insert(edge(vertex(y1, x1), vertex(y1, x0)));
            }
        }
    }

    /// The five-shape emission of the `n1` strategy: a center diamond
    /// plus four corner triangles, each enabled by a hand-tuned
    /// predicate over the 3x3 neighborhood. Triangles of neighboring
    /// cells share reversed hypotenuses with the diamonds, so the
    /// usual internal-edge cancellation welds them together.
    fn make_n1_shapes(&mut self) {
        let size = self.glyph.size();
        let (hx, hy) = (self.sx / 2, self.sy / 2);
        for uy in 0..size.h as i32 {
            for ux in 0..size.w as i32 {
                let c = |dx: i32, dy: i32| self.glyph.get(ux + dx, uy + dy);
                let (c1, c2, c3) = (c(-1, -1), c(0, -1), c(1, -1));
                let (c4, c5, c6) = (c(-1, 0), c(0, 0), c(1, 0));
                let (c7, c8, c9) = (c(-1, 1), c(0, 1), c(1, 1));

                let di = c5;
                let tl = (c4 && ((c8 && ((!c7 && (c1 || c3 || c9))
                    || (!c1 && !c2)
                    || (!c6 && !c9)))
                    || c5))
                    || (c5 && ((!c1 && !c9) || c7 || c8));
                let tr = (((!c7 && !c3) || c9 || c8 || c6) && c5)
                    || (((!c9 && (c1 || c3 || c7)) || (!c2 && !c3) || (!c4 && !c7))
                        && c8
                        && c6);
                let bl = (c5 && (c1 || c2 || (!c3 && !c7) || c4))
                    || (c2
                        && c4
                        && ((!c1 && (c3 || c7 || c9)) || (!c3 && !c6) || (!c7 && !c8)));
                let br = (c2 && ((c6 && ((!c3 && (c1 || c7 || c9))
                    || (!c1 && !c4)
                    || (!c8 && !c9)))
                    || c5))
                    || (c5 && ((!c1 && !c9) || c3 || c6));

                if !(di || tl || tr || bl || br) {
                    continue;
                }
                let yy = self.flip_y(uy);
                let (x0, x1) = (ux * self.sx, (ux + 1) * self.sx);
                let (y0, y1) = (yy * self.sy, (yy + 1) * self.sy);
                // edge midpoints and cell corners of the scaled cell
                let t = vertex(y1, x0 + hx);
                let l = vertex(y0 + hy, x0);
                let b = vertex(y0, x0 + hx);
                let r = vertex(y0 + hy, x1);
                let c_tl = vertex(y1, x0);
                let c_tr = vertex(y1, x1);
                let c_bl = vertex(y0, x0);
                let c_br = vertex(y0, x1);

                if di {
                    self.edges.insert(edge(t, l));
                    self.edges.insert(edge(l, b));
                    self.edges.insert(edge(b, r));
                    self.edges.insert(edge(r, t));
                }
                if tl {
                    self.edges.insert(edge(c_tl, l));
                    self.edges.insert(edge(l, t));
                    self.edges.insert(edge(t, c_tl));
                }
                if tr {
                    self.edges.insert(edge(t, r));
                    self.edges.insert(edge(r, c_tr));
                    self.edges.insert(edge(c_tr, t));
                }
                if bl {
                    self.edges.insert(edge(b, l));
                    self.edges.insert(edge(l, c_bl));
                    self.edges.insert(edge(c_bl, b));
                }
                if br {
                    self.edges.insert(edge(r, b));
                    self.edges.insert(edge(b, c_br));
                    self.edges.insert(edge(c_br, r));
                }
            }
        }
    }

    /// Removes every edge whose exact reverse is also present. Two
    /// adjacent shapes fuse along the cancelled pair without touching
    /// the orientation of anything that remains.
    fn delete_internal_edges(&mut self) {
        let mut doomed = Vec::new();
        for &e in &self.edges {
            if e.start == e.end {
                debug!("corrupt outline: self-loop at {:?}", e.start);
                doomed.push(e);
            } else if self.edges.contains(&edge(e.end, e.start)) {
                doomed.push(e);
            }
        }
        for e in doomed {
            self.edges.remove(&e);
        }
    }

    /// The edges leaving `v`, in lexicographic order. Square and
    /// triangle emission guarantees there are at most two.
    fn neigh_edges(&self, v: Vertex) -> SmallVec<[Edge; 2]> {
        let lo = edge(v, vertex(i32::min_value(), i32::min_value()));
        let hi = edge(v, vertex(i32::max_value(), i32::max_value()));
        self.edges.range(lo..=hi).copied().collect()
    }

    /// Chooses the continuation of `cur` out of its tail vertex. With
    /// two candidates the default is the inward branch (the one whose
    /// endpoint lies on the interior side of the current direction),
    /// which makes self-touching shapes come out as one polygon. The
    /// isthmus test instead consults the bitmap and takes the outward
    /// branch at crossings that are not worth keeping apart.
    fn next_edge(&self, cur: Edge, flags: u32) -> Option<Edge> {
        let cand = self.neigh_edges(cur.end);
        match cand.len() {
            0 => None,
            1 => Some(cand[0]),
            _ => {
                let inward = match cur.trivial_dir() {
                    Some(0) | Some(270) => cand[1],
                    Some(90) | Some(180) => cand[0],
                    _ => cand[0],
                };
                if flags & ISTHMUS != 0 && !self.antijoinworthy(cur.end) {
                    let outward = if inward == cand[0] { cand[1] } else { cand[0] };
                    Some(outward)
                } else {
                    Some(inward)
                }
            }
        }
    }

    /// The isthmus pattern library. A crossing sits on a pixel corner
    /// whose 2x2 neighborhood is set along one diagonal; it is worth
    /// keeping apart (antijoinworthy) only when the clear cell beside
    /// the diagonal is a one-pixel pocket, enclosed by its two far
    /// orthogonal neighbors as well. There are exactly two such
    /// patterns, one per diagonal; crossings with no joinworthy
    /// pattern exist and intentionally stay unmatched.
    fn antijoinworthy(&self, corner: Vertex) -> bool {
        if self.sx == 0 || self.sy == 0 {
            return false;
        }
        let cx = corner.x / self.sx;
        let yy = corner.y / self.sy;
        let by = self.glyph.size().h as i32 - 1 - self.descent - yy;
        let g = |dx: i32, dy: i32| self.glyph.get(cx + dx, by + dy);
        // visual orientation: (0,0) is up-right of the corner
        let nw = g(-1, 0);
        let ne = g(0, 0);
        let sw = g(-1, 1);
        let se = g(0, 1);
        if nw && se && !ne && !sw {
            // clear NE cell pocketed from above and the right
            return g(0, -1) && g(1, 0);
        }
        if ne && sw && !nw && !se {
            // clear NW cell pocketed from above and the left
            return g(-1, -1) && g(-2, 0);
        }
        false
    }

    /// Pops one polygon off the edge set: seed with the smallest edge,
    /// then follow tail-to-head until the walk returns to the seed.
    /// A walk that runs out of edges early is reported and closed off
    /// as-is rather than aborting the whole glyph.
    fn pop_poly(&mut self, flags: u32) -> Option<Polygon> {
        let seed = *self.edges.iter().next()?;
        self.edges.remove(&seed);
        let mut edges = vec![seed];
        let mut cur = seed;
        while cur.end != seed.start {
            let next = match self.next_edge(cur, flags) {
                Some(next) => next,
                None => {
                    debug!("corrupt outline: no continuation at {:?}", cur.end);
                    break;
                }
            };
            self.edges.remove(&next);
            if flags & SIMPLIFY_LINES != 0
                && next.trivial_dir() == cur.trivial_dir()
            {
                if let Some(last) = edges.last_mut() {
                    last.end = next.end;
                    cur = *last;
                }
            } else {
                edges.push(next);
                cur = next;
            }
        }
        Some(Polygon { edges })
    }

    fn extract(&mut self, flags: u32) -> Vec<Polygon> {
        let mut polys = Vec::new();
        while let Some(poly) = self.pop_poly(flags) {
            polys.push(poly);
        }
        polys
    }
}

const HEAD: u8 = 1 << 0;
const TAIL: u8 = 1 << 1;
const XHEAD: u8 = 1 << 2;
const XTAIL: u8 = 1 << 3;

/// The `n2` post-pass: walks a cyclic 7-edge window over the polygon
/// and tags edge junctions where a staircase step should be cut into a
/// diagonal. One-pixel bumps on flat runs are vetoed so deliberate
/// features (an `f` crossbar, the stem tip of `4`) keep their width;
/// one-pixel sinks are tagged from both sides so they collapse; plain
/// staircases turn into diagonals. After tagging, each cuttable
/// junction gets a diagonal spliced in and the two neighbors shortened
/// by a half-pixel step.
pub fn n2_angle(poly: &mut Polygon, hx: i32, hy: i32) {
    let n = poly.edges.len();
    if n < 4 {
        return;
    }
    let dirs: Vec<i32> = poly
        .edges
        .iter()
        .map(|e| e.trivial_dir().unwrap_or(-1))
        .collect();
    let at = |i: usize, k: isize| -> i32 {
        dirs[(i as isize + k).rem_euclid(n as isize) as usize]
    };
    let idx = |i: usize, k: isize| -> usize { (i as isize + k).rem_euclid(n as isize) as usize };

    let mut flags = vec![0u8; n];
    for i in 0..n {
        let (dm3, dm2, dm1) = (at(i, -3), at(i, -2), at(i, -1));
        let d00 = at(i, 0);
        let (dp1, dp2, dp3) = (at(i, 1), at(i, 2), at(i, 3));
        if d00 < 0 {
            continue;
        }

        if d00 == dm2 && d00 == dp2 {
            if dm1 == (dm2 + 90) % 360
                && dp1 == (dm2 + 270) % 360
                && (dm3 == d00 || dm3 == dp1)
                && (dp3 == d00 || dp3 == dm1)
            {
                // pimple: a one-pixel bump between flats; veto any cut
                // touching its five edges
                for k in -2..=2 {
                    flags[idx(i, k)] |= XHEAD | XTAIL;
                }
                continue;
            }
            if dm1 == (dm2 + 270) % 360 && dp1 == (dm2 + 90) % 360 {
                // dimple: a one-pixel sink; tag whichever side has a
                // flat run so the sink gets cut away
                if dm3 == dm2 {
                    flags[idx(i, -2)] |= TAIL;
                    flags[idx(i, -1)] |= HEAD | TAIL;
                    flags[i] |= HEAD;
                }
                if dp3 == dp2 {
                    flags[i] |= TAIL;
                    flags[idx(i, 1)] |= HEAD | TAIL;
                    flags[idx(i, 2)] |= HEAD;
                }
                continue;
            }
        }

        if dm1 == dp1 && (dp1 == (d00 + 90) % 360 || dp1 == (d00 + 270) % 360) {
            // chicane: a rectilinear step
            let serif_a = dm2 == dm1
                && d00 == (dm1 + 270) % 360
                && dp2 == (dm1 + 90) % 360
                && dp3 == dp2;
            let serif_b = dp2 == dp1
                && d00 == (dp1 + 90) % 360
                && dm2 == (dp1 + 270) % 360
                && dm3 == dm2;
            if serif_a || serif_b {
                continue;
            }
            flags[idx(i, -1)] |= TAIL;
            flags[i] |= HEAD | TAIL;
            flags[idx(i, 1)] |= HEAD;
            if dp2 == d00 {
                // the stairs continue to the right
                flags[idx(i, 1)] |= TAIL;
                flags[idx(i, 2)] |= HEAD;
            }
            if dm2 == d00 {
                flags[idx(i, -2)] |= TAIL;
                flags[idx(i, -1)] |= HEAD;
            }
        }
    }

    let cut: Vec<bool> = (0..n)
        .map(|i| {
            let j = (i + 1) % n;
            flags[i] & TAIL != 0
                && flags[j] & HEAD != 0
                && flags[i] & XTAIL == 0
                && flags[j] & XHEAD == 0
        })
        .collect();
    if !cut.iter().any(|&c| c) {
        return;
    }

    let mut out: Vec<Edge> = Vec::with_capacity(n + cut.len());
    for i in 0..n {
        let mut e = poly.edges[i];
        if cut[idx(i, -1)] {
            e.start = step(e.start, dirs[i], hx, hy, 1);
        }
        if cut[i] {
            e.end = step(e.end, dirs[i], hx, hy, -1);
        }
        out.push(e);
        if cut[i] {
            let j = (i + 1) % n;
            let to = step(poly.edges[j].start, dirs[j], hx, hy, 1);
            out.push(edge(e.end, to));
        }
    }

    out.retain(|e| e.start != e.end);
    // coalesce straight runs, including across the seam
    let mut merged: Vec<Edge> = Vec::with_capacity(out.len());
    for e in out {
        if let Some(last) = merged.last_mut() {
            if last.end == e.start && last.trivial_dir() == e.trivial_dir() {
                last.end = e.end;
                continue;
            }
        }
        merged.push(e);
    }
    while merged.len() > 1 {
        let first = merged[0];
        let last = merged[merged.len() - 1];
        if last.end == first.start && last.trivial_dir() == first.trivial_dir() {
            merged[0].start = last.start;
            merged.pop();
        } else {
            break;
        }
    }
    poly.edges = merged;
}

/// One half-pixel step along (or against, `sign` -1) direction `d`.
fn step(v: Vertex, d: i32, hx: i32, hy: i32, sign: i32) -> Vertex {
    let (dy, dx) = match d {
        0 => (hy, 0),
        45 => (hy, hx),
        90 => (0, hx),
        135 => (-hy, hx),
        180 => (-hy, 0),
        225 => (-hy, -hx),
        270 => (0, -hx),
        315 => (hy, -hx),
        _ => (0, 0),
    };
    vertex(v.y + sign * dy, v.x + sign * dx)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::size;

    fn glyph_from(rows: &[&str]) -> Glyph {
        let h = rows.len() as u32;
        let w = rows.first().map_or(0, |r| r.len()) as u32;
        let mut g = Glyph::blank(size(w, h));
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                if ch == '#' {
                    g.set_pixel(x as i32, y as i32, true);
                }
            }
        }
        g
    }

    #[test]
    fn single_pixel_simple_square() {
        let g = glyph_from(&["#"]);
        let polys = vectorize(&g, Strategy::Simple, 2, 2, 0);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].edges.len(), 4);
        assert!(polys[0].is_closed());
        assert!(polys[0].signed_area2() > 0);
    }

    #[test]
    fn block_fuses_into_one_rectangle() {
        let g = glyph_from(&["##", "##"]);
        let polys = vectorize(&g, Strategy::Simple, 2, 2, 0);
        assert_eq!(polys.len(), 1);
        assert_eq!(polys[0].edges.len(), 4);
        let (lo, hi) = polys[0].bounds().unwrap();
        assert_eq!((lo, hi), (vertex(0, 0), vertex(4, 4)));
    }

    #[test]
    fn ring_enclave_is_negative() {
        let g = glyph_from(&["#####", "#...#", "#...#", "#####"]);
        let polys = vectorize(&g, Strategy::Simple, 2, 2, 0);
        assert_eq!(polys.len(), 2);
        let outer: i64 = polys.iter().map(|p| p.signed_area2()).max().unwrap();
        let inner: i64 = polys.iter().map(|p| p.signed_area2()).min().unwrap();
        assert!(outer > 0);
        assert!(inner < 0);
        for p in &polys {
            assert!(p.is_closed());
        }
    }

    #[test]
    fn deterministic_output() {
        let g = glyph_from(&[".##.", "#..#", "#..#", ".##."]);
        for &strat in &[Strategy::Simple, Strategy::N1, Strategy::N2, Strategy::N2Ev] {
            let a = vectorize(&g, strat, 2, 2, 0);
            let b = vectorize(&g, strat, 2, 2, 0);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn diagonal_walks_as_one_polygon() {
        let g = glyph_from(&[
            "#....",
            ".#...",
            "..#..",
            "...#.",
            "....#",
        ]);
        let polys = vectorize(&g, Strategy::N2, 2, 2, 0);
        assert_eq!(polys.len(), 1);
        assert!(polys[0].is_closed());
        let (lo, hi) = polys[0].bounds().unwrap();
        assert_eq!((lo, hi), (vertex(0, 0), vertex(10, 10)));
        let diagonals = polys[0]
            .edges
            .iter()
            .filter(|e| matches!(e.trivial_dir(), Some(45) | Some(135) | Some(225) | Some(315)))
            .count();
        assert!(diagonals >= 1);
        assert!(polys[0].edges.len() <= 8);
    }

    #[test]
    fn pimple_keeps_its_top() {
        // one-pixel bump on a wide bar: the bump's top edge must
        // survive the staircase pass untouched
        let g = glyph_from(&["..#..", "#####"]);
        let polys = vectorize(&g, Strategy::N2, 2, 2, 0);
        assert_eq!(polys.len(), 1);
        let top = polys[0]
            .edges
            .iter()
            .any(|e| e.start == vertex(4, 6) && e.end == vertex(4, 4));
        assert!(top, "bump top missing from {:?}", polys[0].edges);
    }

    #[test]
    fn dimple_is_truncated() {
        let g = glyph_from(&["##.##", "#####"]);
        let polys = vectorize(&g, Strategy::N2, 2, 2, 0);
        assert_eq!(polys.len(), 1);
        // the sink's floor edge must have been cut away
        let floor = polys[0]
            .edges
            .iter()
            .any(|e| e.start == vertex(2, 6) && e.end == vertex(2, 4));
        assert!(!floor, "sink floor survived in {:?}", polys[0].edges);
    }

    #[test]
    fn n1_single_pixel_is_full_square() {
        let g = glyph_from(&["#"]);
        let polys = vectorize(&g, Strategy::N1, 2, 2, 0);
        assert_eq!(polys.len(), 1);
        assert!(polys[0].is_closed());
        // all five sub-shapes fuse back into the plain square
        assert_eq!(polys[0].edges.len(), 4);
        let (lo, hi) = polys[0].bounds().unwrap();
        assert_eq!((lo, hi), (vertex(0, 0), vertex(2, 2)));
    }

    #[test]
    fn simple_reproduces_bitmap_by_even_odd_fill() {
        let g = glyph_from(&[".##.", "#..#", "#.##", ".##."]);
        let polys = vectorize(&g, Strategy::Simple, 2, 2, 0);
        let h = g.size().h as i32;
        for by in 0..h {
            for bx in 0..g.size().w as i32 {
                // pixel center in outline space
                let py = (h - 1 - by) * 2 + 1;
                let px = bx * 2 + 1;
                let mut crossings = 0;
                for p in &polys {
                    for e in &p.edges {
                        if e.start.x == e.end.x
                            && e.start.x > px
                            && (e.start.y.min(e.end.y)..e.start.y.max(e.end.y))
                                .contains(&py)
                        {
                            crossings += 1;
                        }
                    }
                }
                assert_eq!(
                    crossings % 2 == 1,
                    g.get(bx, by),
                    "mismatch at ({}, {})",
                    bx,
                    by
                );
            }
        }
    }
}
