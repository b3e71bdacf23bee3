//! Polygon kernel: metrics, line cuts, offsetting and simplification
//!
//! Rings are stored counter-clockwise: a positive signed area means CCW, and
//! the left normal of an edge (`rotate90`) points into the polygon.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::core::types::Point;

/// Intersection parameters strictly inside this margin count as proper crossings
const DELTA: f64 = 0.000001;

/// Solve `p + d1 * t1 == q + d2 * t2` for `(t1, t2)`
///
/// Returns `None` when the directions are parallel or degenerate.
pub fn intersect_lines(p: Point, d1: Point, q: Point, d2: Point) -> Option<(f64, f64)> {
    let d = d1.x * d2.y - d1.y * d2.x;
    if d == 0.0 {
        return None;
    }

    let t2 = (d1.y * (q.x - p.x) - d1.x * (q.y - p.y)) / d;
    let t1 = if d1.x != 0.0 {
        (q.x - p.x + d2.x * t2) / d1.x
    } else {
        (q.y - p.y + d2.y * t2) / d1.y
    };

    Some((t1, t2))
}

/// Signed distance from `x` to the line through `p` along `d`
pub fn distance_to_line(p: Point, d: Point, x: Point) -> f64 {
    (d.x * x.y - d.y * x.x + (p.y + d.y) * p.x - (p.x + d.x) * p.y) / d.length()
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Point,
    pub max: Point,
}

impl Bounds {
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }
}

/// A closed ring of coordinates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub vertices: Vec<Point>,
}

impl Polygon {
    pub fn new(vertices: Vec<Point>) -> Self {
        Self { vertices }
    }

    /// Axis-aligned `w × h` rectangle centred on the origin
    pub fn rect(w: f64, h: f64) -> Self {
        Self::new(vec![
            Point::new(-w / 2.0, -h / 2.0),
            Point::new(w / 2.0, -h / 2.0),
            Point::new(w / 2.0, h / 2.0),
            Point::new(-w / 2.0, h / 2.0),
        ])
    }

    /// Regular `n`-gon of radius `r` centred on the origin
    pub fn regular(n: usize, r: f64) -> Self {
        let vertices = (0..n)
            .map(|i| {
                let a = i as f64 / n as f64 * PI * 2.0;
                Point::new(r * a.cos(), r * a.sin())
            })
            .collect();
        Self::new(vertices)
    }

    pub fn circle(r: f64) -> Self {
        Self::regular(16, r)
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Iterate edges as `(index, start, end)`, closing the ring
    pub fn edges(&self) -> impl Iterator<Item = (usize, Point, Point)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (i, self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Signed area, positive for counter-clockwise rings
    pub fn area(&self) -> f64 {
        let s: f64 = self.edges().map(|(_, v0, v1)| v0.cross(&v1)).sum();
        s * 0.5
    }

    pub fn perimeter(&self) -> f64 {
        self.edges().map(|(_, v0, v1)| v0.distance(&v1)).sum()
    }

    /// Isoperimetric ratio, 1.0 for a circle
    pub fn compactness(&self) -> f64 {
        let p = self.perimeter();
        4.0 * PI * self.area() / (p * p)
    }

    /// Vertex average
    pub fn center(&self) -> Point {
        let sum = self.vertices.iter().fold(Point::ZERO, |acc, v| acc + *v);
        sum * (1.0 / self.vertices.len() as f64)
    }

    /// Area-weighted centroid
    pub fn centroid(&self) -> Point {
        let mut x = 0.0;
        let mut y = 0.0;
        let mut a = 0.0;
        for (_, v0, v1) in self.edges() {
            let f = v0.cross(&v1);
            a += f;
            x += (v0.x + v1.x) * f;
            y += (v0.y + v1.y) * f;
        }
        let s6 = 1.0 / (3.0 * a);
        Point::new(s6 * x, s6 * y)
    }

    pub fn bounds(&self) -> Bounds {
        let first = self.vertices.first().copied().unwrap_or_default();
        let mut bounds = Bounds { min: first, max: first };
        for v in &self.vertices {
            bounds.min.x = bounds.min.x.min(v.x);
            bounds.min.y = bounds.min.y.min(v.y);
            bounds.max.x = bounds.max.x.max(v.x);
            bounds.max.y = bounds.max.y.max(v.y);
        }
        bounds
    }

    /// Distance from `p` to the nearest vertex
    pub fn distance(&self, p: &Point) -> f64 {
        self.vertices
            .iter()
            .map(|v| v.distance(p))
            .fold(f64::INFINITY, f64::min)
    }

    pub fn next_index(&self, i: usize) -> usize {
        (i + 1) % self.vertices.len()
    }

    pub fn prev_index(&self, i: usize) -> usize {
        (i + self.vertices.len() - 1) % self.vertices.len()
    }

    /// Edge vector starting at vertex `i`
    pub fn vector(&self, i: usize) -> Point {
        self.vertices[self.next_index(i)] - self.vertices[i]
    }

    /// First index whose coordinates equal `p`
    pub fn index_of(&self, p: &Point) -> Option<usize> {
        self.vertices.iter().position(|v| v == p)
    }

    pub fn is_convex_vertex(&self, i: usize) -> bool {
        let v0 = self.vertices[self.prev_index(i)];
        let v1 = self.vertices[i];
        let v2 = self.vertices[self.next_index(i)];
        (v1 - v0).cross(&(v2 - v1)) > 0.0
    }

    pub fn is_convex(&self) -> bool {
        (0..self.vertices.len()).all(|i| self.is_convex_vertex(i))
    }

    /// Index of the vertex minimizing `f`; ties keep the first
    pub fn min_by<F: Fn(&Point) -> f64>(&self, f: F) -> usize {
        let mut best = 0;
        let mut min = f64::INFINITY;
        for (i, v) in self.vertices.iter().enumerate() {
            let m = f(v);
            if i == 0 || m < min {
                best = i;
                min = m;
            }
        }
        best
    }

    /// Start index of the longest edge; ties keep the first
    pub fn longest_edge(&self) -> usize {
        let mut best = 0;
        let mut length = -1.0;
        for (i, v0, v1) in self.edges() {
            let len = v0.distance(&v1);
            if len > length {
                length = len;
                best = i;
            }
        }
        best
    }

    /// Position of vertex `i` after one smoothing step with weight `f`
    pub fn smoothed_vertex(&self, i: usize, f: f64) -> Point {
        let prev = self.vertices[self.prev_index(i)];
        let v = self.vertices[i];
        let next = self.vertices[self.next_index(i)];
        Point::new(
            (prev.x + v.x * f + next.x) / (2.0 + f),
            (prev.y + v.y * f + next.y) / (2.0 + f),
        )
    }

    /// Smooth the listed vertices in one simultaneous update
    pub fn smooth_vertices(&mut self, f: f64, indices: &[usize]) {
        let moved: Vec<(usize, Point)> = indices
            .iter()
            .filter(|&&i| i < self.vertices.len())
            .map(|&i| (i, self.smoothed_vertex(i, f)))
            .collect();
        for (i, p) in moved {
            self.vertices[i] = p;
        }
    }

    pub fn offset(&mut self, d: Point) {
        for v in &mut self.vertices {
            *v = *v + d;
        }
    }

    pub fn rotate(&mut self, angle: f64) {
        for v in &mut self.vertices {
            *v = v.rotate(angle);
        }
    }

    pub fn reversed(&self) -> Self {
        let mut vertices = self.vertices.clone();
        vertices.reverse();
        Self::new(vertices)
    }

    /// Inverse-distance weights of every vertex relative to `p`, summing to 1
    pub fn interpolate(&self, p: &Point) -> Vec<f64> {
        if let Some(i) = self.vertices.iter().position(|v| v == p) {
            let mut weights = vec![0.0; self.vertices.len()];
            weights[i] = 1.0;
            return weights;
        }

        let inverse: Vec<f64> = self.vertices.iter().map(|v| 1.0 / v.distance(p)).collect();
        let sum: f64 = inverse.iter().sum();
        inverse.into_iter().map(|d| d / sum).collect()
    }

    /// Cut along the infinite line through `p1 -> p2`
    ///
    /// Returns two halves, the one left of the line first, when the line
    /// crosses exactly two edges; otherwise the ring itself. A positive `gap`
    /// peels `gap / 2` off each half along the cut.
    pub fn cut(&self, p1: Point, p2: Point, gap: f64) -> Vec<Polygon> {
        let dir = p2 - p1;
        let len = self.vertices.len();

        let mut hits: Vec<(usize, f64)> = Vec::with_capacity(2);
        let mut count = 0;
        for (i, v0, v1) in self.edges() {
            if let Some((t1, t2)) = intersect_lines(p1, dir, v0, v1 - v0) {
                if (0.0..=1.0).contains(&t2) {
                    if count < 2 {
                        hits.push((i, t1));
                    }
                    count += 1;
                }
            }
        }

        if count != 2 {
            return vec![self.clone()];
        }

        let (edge1, ratio1) = hits[0];
        let (edge2, ratio2) = hits[1];
        let point1 = p1 + dir * ratio1;
        let point2 = p1 + dir * ratio2;

        let mut half1 = Vec::with_capacity(edge2 - edge1 + 2);
        half1.push(point1);
        half1.extend_from_slice(&self.vertices[edge1 + 1..=edge2]);
        half1.push(point2);

        let mut half2 = Vec::with_capacity(len - (edge2 - edge1) + 2);
        half2.push(point2);
        half2.extend_from_slice(&self.vertices[edge2 + 1..]);
        half2.extend_from_slice(&self.vertices[..=edge1]);
        half2.push(point1);

        let mut half1 = Polygon::new(half1);
        let mut half2 = Polygon::new(half2);
        if gap > 0.0 {
            half1 = half1.peel(&point2, gap / 2.0);
            half2 = half2.peel(&point1, gap / 2.0);
        }

        if dir.cross(&self.vector(edge1)) > 0.0 {
            vec![half1, half2]
        } else {
            vec![half2, half1]
        }
    }

    /// Trim a strip of width `d` off the edge starting at `v1`
    pub fn peel(&self, v1: &Point, d: f64) -> Polygon {
        let Some(i1) = self.index_of(v1) else {
            return self.clone();
        };
        let v2 = self.vertices[self.next_index(i1)];
        let n = (v2 - *v1).rotate90().normalize(d);
        self.cut(*v1 + n, v2 + n, 0.0).swap_remove(0)
    }

    /// Inset each edge by its entry in `d`, resolving self-intersections
    ///
    /// Offset edges may overlap on concave rings. The offset ring is split at
    /// every proper crossing, decomposed into simple cycles and the cycle with
    /// the largest signed area is kept.
    pub fn buffer(&self, d: &[f64]) -> Polygon {
        let mut q: Vec<Point> = Vec::with_capacity(self.vertices.len() * 2);
        // Coincident neighbours would produce zero-length edges
        let push = |q: &mut Vec<Point>, p: Point| {
            if q.last() != Some(&p) {
                q.push(p);
            }
        };
        for (i, v0, v1) in self.edges() {
            let dd = d.get(i).copied().unwrap_or(0.0);
            if dd == 0.0 {
                push(&mut q, v0);
                push(&mut q, v1);
            } else {
                let n = (v1 - v0).rotate90().normalize(dd);
                push(&mut q, v0 + n);
                push(&mut q, v1 + n);
            }
        }
        while q.len() > 1 && q.first() == q.last() {
            q.pop();
        }
        if q.len() < 3 {
            return self.clone();
        }

        let max_cuts = q.len() * q.len();
        let mut cuts = 0;
        let mut last_edge = 0;
        'scan: while cuts < max_cuts {
            let n = q.len();
            for i in last_edge..n.saturating_sub(2) {
                last_edge = i;
                let a = q[i];
                let da = q[i + 1] - a;
                let end = if i > 0 { n } else { n - 1 };
                for j in i + 2..end {
                    let b = q[j];
                    let db = q[(j + 1) % n] - b;
                    if let Some((t1, t2)) = intersect_lines(a, da, b, db) {
                        if t1 > DELTA && t1 < 1.0 - DELTA && t2 > DELTA && t2 < 1.0 - DELTA {
                            let pn = a + da * t1;
                            q.insert(j + 1, pn);
                            q.insert(i + 1, pn);
                            cuts += 1;
                            continue 'scan;
                        }
                    }
                }
            }
            break;
        }

        let n = q.len();
        let mut remaining: Vec<bool> = vec![true; n];
        let mut best: Option<Polygon> = None;
        let mut best_area = f64::NEG_INFINITY;

        while let Some(start) = remaining.iter().position(|&r| r) {
            let mut indices = Vec::new();
            let mut i = start;
            loop {
                if !remaining[i] {
                    break;
                }
                indices.push(i);
                remaining[i] = false;

                let next = (i + 1) % n;
                let v = q[next];
                let first = q.iter().position(|p| *p == v).unwrap_or(next);
                i = if first == next {
                    q.iter().rposition(|p| *p == v).unwrap_or(next)
                } else {
                    first
                };
                if i == start {
                    break;
                }
            }

            let part = Polygon::new(indices.iter().map(|&k| q[k]).collect());
            let s = part.area();
            if s > best_area {
                best_area = s;
                best = Some(part);
            }
        }

        best.unwrap_or_else(|| self.clone())
    }

    /// Inset each edge by its entry in `d` by cutting along the offset lines
    ///
    /// Cheaper than [`Polygon::buffer`] but only reliable for convex rings.
    pub fn shrink(&self, d: &[f64]) -> Polygon {
        let mut q = self.clone();
        for (i, v1, v2) in self.edges() {
            let dd = d.get(i).copied().unwrap_or(0.0);
            if dd > 0.0 {
                let n = (v2 - v1).rotate90().normalize(dd);
                q = q.cut(v1 + n, v2 + n, 0.0).swap_remove(0);
            }
        }
        q
    }

    pub fn shrink_eq(&self, d: f64) -> Polygon {
        self.shrink(&vec![d; self.vertices.len()])
    }

    /// Merge near-coincident vertices, then drop vertices that barely bend the outline
    pub fn simplify(&self, threshold: f64) -> Polygon {
        let mut v = self.vertices.clone();
        if v.len() < 3 {
            return Polygon::new(v);
        }
        let threshold_sq = threshold * threshold;

        let mut i = 0;
        while i < v.len() && v.len() > 3 {
            let current = v[i];
            let next = v[(i + 1) % v.len()];
            if current.distance_sq(&next) > threshold_sq {
                i += 1;
                continue;
            }
            let merged = current.midpoint(&next);
            if i == v.len() - 1 {
                v[i] = merged;
                v.remove(0);
            } else {
                v[i] = merged;
                v.remove(i + 1);
            }
        }

        let mut i = 0;
        while i < v.len() && v.len() > 3 {
            let len = v.len();
            let prev = v[(i + len - 1) % len];
            let next = v[(i + 1) % len];
            let edge = (next - prev).normalize(1.0);
            if (v[i] - prev).cross(&edge).abs() < threshold {
                v.remove(i);
            } else {
                i += 1;
            }
        }

        Polygon::new(v)
    }
}

impl From<&Polygon> for Vec<[f64; 2]> {
    fn from(p: &Polygon) -> Self {
        p.vertices.iter().map(|v| [v.x, v.y]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Polygon {
        Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ])
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_area_sign_follows_winding() {
        let sq = square(10.0);
        assert!(approx(sq.area(), 100.0));
        assert!(approx(sq.reversed().area(), -100.0));
    }

    #[test]
    fn test_square_metrics() {
        let sq = square(10.0);
        assert!(approx(sq.perimeter(), 40.0));
        assert!(approx(sq.compactness(), PI / 4.0));
        let c = sq.centroid();
        assert!(approx(c.x, 5.0) && approx(c.y, 5.0));
        assert!(sq.is_convex());
        let b = sq.bounds();
        assert!(approx(b.width(), 10.0) && approx(b.height(), 10.0));
    }

    #[test]
    fn test_centroid_is_area_weighted() {
        // Extra vertices on one side drag the vertex average but not the centroid
        let p = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(4.0, 0.0),
            Point::new(6.0, 0.0),
            Point::new(6.0, 6.0),
            Point::new(0.0, 6.0),
        ]);
        let c = p.centroid();
        assert!(approx(c.x, 3.0) && approx(c.y, 3.0));
        assert!(p.center().y < 3.0);
    }

    #[test]
    fn test_reflex_vertex_not_convex() {
        let p = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(5.0, 3.0),
            Point::new(0.0, 10.0),
        ]);
        assert!(!p.is_convex_vertex(3));
        assert!(p.is_convex_vertex(1));
        assert!(!p.is_convex());
    }

    #[test]
    fn test_intersect_parallel_lines() {
        let r = intersect_lines(
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(2.0, 0.0),
        );
        assert!(r.is_none());
    }

    #[test]
    fn test_intersect_crossing_lines() {
        let (t1, t2) = intersect_lines(
            Point::new(0.0, 1.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
        )
        .unwrap();
        assert!(approx(t1, 1.0));
        assert!(approx(t2, 0.1));
    }

    #[test]
    fn test_cut_splits_square() {
        let sq = square(10.0);
        let halves = sq.cut(Point::new(5.0, -5.0), Point::new(5.0, 15.0), 0.0);
        assert_eq!(halves.len(), 2);
        assert!(approx(halves[0].area() + halves[1].area(), 100.0));
        assert!(approx(halves[0].area(), 50.0));
    }

    #[test]
    fn test_cut_left_half_first() {
        let sq = square(10.0);
        let halves = sq.cut(Point::new(0.0, 1.0), Point::new(10.0, 1.0), 0.0);
        assert_eq!(halves.len(), 2);
        // Left of an eastward line is the northern part
        assert!(approx(halves[0].area(), 90.0));
        assert!(halves[0].vertices.iter().all(|v| v.y >= 1.0 - 1e-9));
    }

    #[test]
    fn test_cut_with_gap_removes_strip() {
        let sq = square(10.0);
        let halves = sq.cut(Point::new(5.0, -5.0), Point::new(5.0, 15.0), 1.0);
        assert_eq!(halves.len(), 2);
        assert!(approx(halves[0].area() + halves[1].area(), 90.0));
    }

    #[test]
    fn test_cut_missing_polygon_is_noop() {
        let sq = square(10.0);
        let result = sq.cut(Point::new(20.0, 0.0), Point::new(20.0, 1.0), 0.0);
        assert_eq!(result, vec![sq]);
    }

    #[test]
    fn test_shrink_square() {
        let inner = square(10.0).shrink_eq(1.0);
        assert!(approx(inner.area(), 64.0));
    }

    #[test]
    fn test_shrink_skips_zero_edges() {
        let inner = square(10.0).shrink(&[1.0, 0.0, 0.0, 0.0]);
        assert!(approx(inner.area(), 90.0));
    }

    #[test]
    fn test_buffer_matches_shrink_on_convex() {
        let sq = square(10.0);
        let d = [1.0, 1.0, 1.0, 1.0];
        let buffered = sq.buffer(&d);
        assert!(approx(buffered.area(), 64.0));
    }

    #[test]
    fn test_buffer_zero_keeps_shape() {
        let sq = square(10.0);
        let buffered = sq.buffer(&[0.0; 4]);
        assert!(approx(buffered.area(), 100.0));
        assert_eq!(buffered.len(), 4);
    }

    #[test]
    fn test_buffer_concave_keeps_main_body() {
        // L-shaped ring
        let l = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(20.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 10.0),
            Point::new(10.0, 20.0),
            Point::new(0.0, 20.0),
        ]);
        let buffered = l.buffer(&[1.0; 6]);
        // 300 minus a 1-wide band along the 80-long outline plus corners
        assert!(buffered.area() > 200.0 && buffered.area() < 300.0);
        assert!(buffered.area() > 0.0);
    }

    #[test]
    fn test_simplify_drops_collinear_and_close_points() {
        let p = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.01),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(10.05, 10.0),
            Point::new(0.0, 10.0),
        ]);
        let s = p.simplify(0.1);
        assert_eq!(s.len(), 4);
    }

    #[test]
    fn test_simplify_keeps_triangles() {
        let t = Polygon::new(vec![
            Point::new(0.0, 0.0),
            Point::new(0.01, 0.0),
            Point::new(0.0, 0.01),
        ]);
        assert_eq!(t.simplify(0.1).len(), 3);
    }

    #[test]
    fn test_smoothing_is_simultaneous() {
        let mut sq = square(10.0);
        sq.smooth_vertices(1.0, &[0, 1]);
        // Vertex 1 must use the original position of vertex 0
        let expected = Point::new((0.0 + 10.0 + 10.0) / 3.0, (0.0 + 0.0 + 10.0) / 3.0);
        assert!(approx(sq.vertices[1].x, expected.x));
        assert!(approx(sq.vertices[1].y, expected.y));
    }

    #[test]
    fn test_interpolate_weights_sum_to_one() {
        let sq = square(10.0);
        let w = sq.interpolate(&Point::new(3.0, 4.0));
        assert!(approx(w.iter().sum::<f64>(), 1.0));
        let at_vertex = sq.interpolate(&Point::new(10.0, 0.0));
        assert_eq!(at_vertex, vec![0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_regular_polygon_area() {
        let c = Polygon::circle(1.0);
        assert_eq!(c.len(), 16);
        assert!(c.area() > 3.0 && c.area() < PI);
        let r = Polygon::rect(2.0, 4.0);
        assert!(approx(r.area(), 8.0));
    }

    #[test]
    fn test_distance_to_line_sign() {
        let p = Point::new(0.0, 0.0);
        let d = Point::new(10.0, 0.0);
        assert!(approx(distance_to_line(p, d, Point::new(3.0, 2.0)), 2.0));
        assert!(approx(distance_to_line(p, d, Point::new(3.0, -2.0)), -2.0));
    }
}
