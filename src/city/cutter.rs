//! Polygon cutters used to carve blocks into lots and sectors

use ordered_float::OrderedFloat;

use crate::core::types::Point;
use crate::spatial::polygon::Polygon;

/// Cut across the edge starting at `vertex`
///
/// The cut line passes through the point at `ratio` along the edge and is
/// perpendicular to it, turned by `angle` radians.
pub fn bisect(poly: &Polygon, vertex: usize, ratio: f64, angle: f64, gap: f64) -> Vec<Polygon> {
    let v0 = poly.vertices[vertex];
    let v1 = poly.vertices[poly.next_index(vertex)];

    let p1 = v0.lerp(&v1, ratio);
    let d = (v1 - v0).rotate(angle);
    let p2 = Point::new(p1.x - d.y, p1.y + d.x);

    poly.cut(p1, p2, gap)
}

/// Triangular sectors from `center` to every edge
pub fn radial(poly: &Polygon, center: Point, gap: f64) -> Vec<Polygon> {
    poly.edges()
        .map(|(_, v0, v1)| {
            let sector = Polygon::new(vec![center, v0, v1]);
            if gap > 0.0 {
                sector.shrink(&[gap / 2.0, 0.0, gap / 2.0])
            } else {
                sector
            }
        })
        .collect()
}

/// Sectors fanned out of the vertex closest to the centroid
///
/// Edges touching that vertex produce no sector, and sides lying on the
/// outline keep their full width.
pub fn semi_radial(poly: &Polygon, gap: f64) -> Vec<Polygon> {
    let centroid = poly.centroid();
    let ci = poly.min_by(|v| v.distance(&centroid));
    let center = poly.vertices[ci];
    let half = gap / 2.0;

    poly.edges()
        .filter(|&(i, _, _)| i != ci && poly.next_index(i) != ci)
        .map(|(i, v0, v1)| {
            let sector = Polygon::new(vec![center, v0, v1]);
            if half > 0.0 {
                let d0 = if poly.next_index(ci) == i { 0.0 } else { half };
                let d2 = if poly.next_index(poly.next_index(i)) == ci { 0.0 } else { half };
                sector.shrink(&[d0, 0.0, d2])
            } else {
                sector
            }
        })
        .collect()
}

/// Peel a band of `thickness` along every edge, shortest edges first
pub fn ring(poly: &Polygon, thickness: f64) -> Vec<Polygon> {
    let mut slices: Vec<(Point, Point, f64)> = poly
        .edges()
        .map(|(_, v1, v2)| {
            let v = v2 - v1;
            let n = v.rotate90().normalize(thickness);
            (v1 + n, v2 + n, v.length())
        })
        .collect();
    slices.sort_by_key(|s| OrderedFloat(s.2));

    let mut peel = Vec::with_capacity(slices.len());
    let mut p = poly.clone();
    for (p1, p2, _) in slices {
        let mut halves = p.cut(p1, p2, 0.0);
        if halves.len() == 2 {
            peel.push(halves.swap_remove(1));
        }
        p = halves.swap_remove(0);
    }
    peel
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

    #[test]
    fn test_bisect_halves_square() {
        let halves = bisect(&square(10.0), 0, 0.5, 0.0, 0.0);
        assert_eq!(halves.len(), 2);
        for half in &halves {
            assert!((half.area() - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_bisect_gap_removes_strip() {
        let halves = bisect(&square(10.0), 0, 0.5, 0.0, 1.0);
        let total: f64 = halves.iter().map(|h| h.area()).sum();
        assert!((total - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_radial_one_sector_per_edge() {
        let poly = square(10.0);
        let sectors = radial(&poly, poly.centroid(), 0.0);
        assert_eq!(sectors.len(), 4);
        let total: f64 = sectors.iter().map(|s| s.area()).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_semi_radial_skips_center_edges() {
        let poly = Polygon::regular(6, 10.0);
        let sectors = semi_radial(&poly, 0.0);
        assert_eq!(sectors.len(), 4);
        let total: f64 = sectors.iter().map(|s| s.area()).sum();
        assert!((total - poly.area()).abs() < 1e-6);
    }

    #[test]
    fn test_ring_peels_each_side() {
        let poly = square(20.0);
        let peel = ring(&poly, 2.0);
        assert_eq!(peel.len(), 4);
        let total: f64 = peel.iter().map(|p| p.area()).sum();
        // 20x20 minus the 16x16 core
        assert!((total - 144.0).abs() < 1e-6);
    }
}
