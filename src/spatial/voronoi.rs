//! Incremental Delaunay triangulation and its Voronoi dual
//!
//! Sites are inserted one at a time with Bowyer-Watson cavity
//! retriangulation inside a padded bounding frame. Each site's region is the
//! ring of circumcenters of its incident triangles.

use crate::core::error::{Result, TownError};
use crate::core::types::Point;

/// Sites `0..4` of every diagram are the frame corners
const FRAME: [usize; 4] = [0, 1, 2, 3];

#[derive(Debug, Clone)]
pub struct Triangle {
    pub p1: usize,
    pub p2: usize,
    pub p3: usize,
    /// Circumcenter
    pub c: Point,
    /// Circumradius
    pub r: f64,
}

impl Triangle {
    fn new(points: &[Point], a: usize, b: usize, c: usize) -> Self {
        let p1 = points[a];
        let p2 = points[b];
        let p3 = points[c];

        // Keep a consistent winding
        let s = (p2.x - p1.x) * (p2.y + p1.y)
            + (p3.x - p2.x) * (p3.y + p2.y)
            + (p1.x - p3.x) * (p1.y + p3.y);
        let (second, third) = if s > 0.0 { (b, c) } else { (c, b) };

        let x1 = (p1.x + p2.x) / 2.0;
        let y1 = (p1.y + p2.y) / 2.0;
        let x2 = (p2.x + p3.x) / 2.0;
        let y2 = (p2.y + p3.y) / 2.0;

        let dx1 = p1.y - p2.y;
        let dy1 = p2.x - p1.x;
        let dx2 = p2.y - p3.y;
        let dy2 = p3.x - p2.x;

        let tg1 = dy1 / dx1;
        let t2 = ((y1 - y2) - (x1 - x2) * tg1) / (dy2 - dx2 * tg1);

        let center = Point::new(x2 + dx2 * t2, y2 + dy2 * t2);
        Self {
            p1: a,
            p2: second,
            p3: third,
            c: center,
            r: center.distance(&p1),
        }
    }

    fn has_edge(&self, a: usize, b: usize) -> bool {
        (self.p1 == a && self.p2 == b) || (self.p2 == a && self.p3 == b) || (self.p3 == a && self.p1 == b)
    }

    fn has_vertex(&self, p: usize) -> bool {
        self.p1 == p || self.p2 == p || self.p3 == p
    }

    fn touches_frame(&self) -> bool {
        FRAME.iter().any(|&f| self.has_vertex(f))
    }
}

/// Voronoi cell of one site: indices into [`Voronoi::triangles`] sorted around the site
#[derive(Debug, Clone)]
pub struct Region {
    pub seed: usize,
    pub triangles: Vec<usize>,
}

impl Region {
    /// Mean of the cell's circumcenters
    pub fn center(&self, voronoi: &Voronoi) -> Point {
        let sum = self
            .triangles
            .iter()
            .fold(Point::ZERO, |acc, &t| acc + voronoi.triangles[t].c);
        sum * (1.0 / self.triangles.len() as f64)
    }

    pub fn vertices<'a>(&'a self, voronoi: &'a Voronoi) -> impl Iterator<Item = Point> + 'a {
        self.triangles.iter().map(move |&t| voronoi.triangles[t].c)
    }
}

#[derive(Debug, Clone)]
pub struct Voronoi {
    pub points: Vec<Point>,
    pub triangles: Vec<Triangle>,
}

impl Voronoi {
    /// Empty diagram covering the rectangle with two frame triangles
    pub fn new(minx: f64, miny: f64, maxx: f64, maxy: f64) -> Self {
        let points = vec![
            Point::new(minx, miny),
            Point::new(minx, maxy),
            Point::new(maxx, miny),
            Point::new(maxx, maxy),
        ];
        let triangles = vec![Triangle::new(&points, 0, 1, 2), Triangle::new(&points, 1, 2, 3)];
        Self { points, triangles }
    }

    /// Triangulate `vertices` inside a frame padded by half the extent
    ///
    /// Fails when an insertion leaves the triangulation broken.
    pub fn build(vertices: &[Point]) -> Result<Self> {
        let mut minx = f64::INFINITY;
        let mut miny = f64::INFINITY;
        let mut maxx = f64::NEG_INFINITY;
        let mut maxy = f64::NEG_INFINITY;
        for v in vertices {
            minx = minx.min(v.x);
            miny = miny.min(v.y);
            maxx = maxx.max(v.x);
            maxy = maxy.max(v.y);
        }
        let dx = (maxx - minx) * 0.5;
        let dy = (maxy - miny) * 0.5;

        let mut voronoi = Voronoi::new(minx - dx / 2.0, miny - dy / 2.0, maxx + dx / 2.0, maxy + dy / 2.0);
        for v in vertices {
            voronoi.add_point(*v)?;
        }
        Ok(voronoi)
    }

    /// Insert a site; a point outside every circumcircle is ignored
    ///
    /// The cavity boundary must form a single closed loop, otherwise the
    /// insertion fails with a geometry error.
    pub fn add_point(&mut self, p: Point) -> Result<()> {
        let cavity: Vec<usize> = self
            .triangles
            .iter()
            .enumerate()
            .filter(|(_, tr)| p.distance(&tr.c) < tr.r)
            .map(|(i, _)| i)
            .collect();
        if cavity.is_empty() {
            return Ok(());
        }

        self.points.push(p);
        let site = self.points.len() - 1;

        // Cavity edges not shared with another cavity triangle
        let mut a: Vec<usize> = Vec::new();
        let mut b: Vec<usize> = Vec::new();
        for &i in &cavity {
            let t1 = &self.triangles[i];
            let (mut e1, mut e2, mut e3) = (true, true, true);
            for &j in &cavity {
                if j == i {
                    continue;
                }
                let t2 = &self.triangles[j];
                if e1 && t2.has_edge(t1.p2, t1.p1) {
                    e1 = false;
                }
                if e2 && t2.has_edge(t1.p3, t1.p2) {
                    e2 = false;
                }
                if e3 && t2.has_edge(t1.p1, t1.p3) {
                    e3 = false;
                }
                if !(e1 || e2 || e3) {
                    break;
                }
            }
            if e1 {
                a.push(t1.p1);
                b.push(t1.p2);
            }
            if e2 {
                a.push(t1.p2);
                b.push(t1.p3);
            }
            if e3 {
                a.push(t1.p3);
                b.push(t1.p1);
            }
        }

        // Walk the cavity boundary, fanning new triangles out of the site
        let mut created = Vec::with_capacity(a.len());
        let mut index = 0;
        let mut closed = false;
        for _ in 0..a.len() {
            created.push(Triangle::new(&self.points, site, a[index], b[index]));
            match a.iter().position(|&x| x == b[index]) {
                Some(0) => {
                    closed = true;
                    break;
                }
                None => break,
                Some(next) => index = next,
            }
        }
        if !closed || created.len() != a.len() {
            self.points.pop();
            return Err(TownError::Geometry(format!(
                "cavity boundary around site {} does not close ({} of {} edges)",
                site,
                created.len(),
                a.len()
            )));
        }

        let mut i = 0;
        self.triangles.retain(|_| {
            let keep = !cavity.contains(&i);
            i += 1;
            keep
        });
        self.triangles.extend(created);
        Ok(())
    }

    fn build_region(&self, seed: usize) -> Region {
        let origin = self.points[seed];
        let mut keyed: Vec<(u8, f64, usize)> = self
            .triangles
            .iter()
            .enumerate()
            .filter(|(_, tr)| tr.has_vertex(seed))
            .map(|(i, tr)| {
                let (half, t) = pseudo_angle(tr.c - origin);
                (half, t, i)
            })
            .collect();
        keyed.sort_by(|x, y| x.0.cmp(&y.0).then_with(|| x.1.total_cmp(&y.1)));
        Region {
            seed,
            triangles: keyed.into_iter().map(|(_, _, i)| i).collect(),
        }
    }

    /// Triangles that do not touch the frame
    pub fn triangulation(&self) -> Vec<&Triangle> {
        self.triangles.iter().filter(|tr| !tr.touches_frame()).collect()
    }

    /// Regions built only from real triangles, in site order
    pub fn partitioning(&self) -> Vec<Region> {
        (0..self.points.len())
            .map(|i| self.build_region(i))
            .filter(|r| !r.triangles.is_empty())
            .filter(|r| r.triangles.iter().all(|&t| !self.triangles[t].touches_frame()))
            .collect()
    }

    /// Lloyd step: move the listed sites to the mean of their region and rebuild
    ///
    /// Relaxed sites are appended after the untouched ones.
    pub fn relax(&self, to_relax: &[usize]) -> Result<Voronoi> {
        let moved: Vec<Region> = self
            .partitioning()
            .into_iter()
            .filter(|r| to_relax.contains(&r.seed))
            .collect();

        let mut sites: Vec<Point> = self
            .points
            .iter()
            .enumerate()
            .filter(|(i, _)| !FRAME.contains(i) && !moved.iter().any(|r| r.seed == *i))
            .map(|(_, p)| *p)
            .collect();
        sites.extend(moved.iter().map(|r| r.center(self)));

        Voronoi::build(&sites)
    }
}

/// Monotone angle key: the left half-plane first, then counter-clockwise
fn pseudo_angle(v: Point) -> (u8, f64) {
    let norm = v.x.abs() + v.y.abs();
    if v.x < 0.0 {
        (0, -v.y / norm)
    } else {
        (1, v.y / norm)
    }
}
