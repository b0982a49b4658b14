use super::{AABB, FloatType, WorldPoint, WorldVector};

/// Triangle in the edge form used by the intersection unit.
/// `e1 = p0 - p1`, `e2 = p2 - p0`, `n = e1 x e2` (not normalized).
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Triangle {
    pub p0: WorldPoint,
    pub e1: WorldVector,
    pub e2: WorldVector,
    pub n: WorldVector,
}

impl Triangle {
    pub fn new(p0: WorldPoint, p1: WorldPoint, p2: WorldPoint) -> Triangle {
        let e1 = p0 - p1;
        let e2 = p2 - p0;
        Triangle {
            p0,
            e1,
            e2,
            n: e1.cross(&e2),
        }
    }

    pub fn p1(&self) -> WorldPoint {
        self.p0 - self.e1
    }

    pub fn p2(&self) -> WorldPoint {
        self.p0 + self.e2
    }

    pub fn vertices(&self) -> [WorldPoint; 3] {
        [self.p0, self.p1(), self.p2()]
    }

    pub fn centroid(&self) -> WorldPoint {
        let [a, b, c] = self.vertices();
        WorldPoint::from((a.coords + b.coords + c.coords) * (1.0 / 3.0))
    }

    pub fn bounding_box(&self) -> AABB {
        AABB::from_points(&self.vertices())
    }

    /// Normal vector of the triangle, not normalized.
    pub fn normal(&self) -> WorldVector {
        self.n
    }
}

/// Position of a point on a triangle, as weights of `p1` and `p2`.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct BarycentricCoordinates {
    pub u: FloatType,
    pub v: FloatType,
}

impl BarycentricCoordinates {
    pub fn interpolate(&self, a: &WorldPoint, b: &WorldPoint, c: &WorldPoint) -> WorldPoint {
        let w = 1.0 - self.u - self.v;
        WorldPoint::from(a.coords * w + b.coords * self.u + c.coords * self.v)
    }

    pub fn interpolate_triangle(&self, triangle: &Triangle) -> WorldPoint {
        let [a, b, c] = triangle.vertices();
        self.interpolate(&a, &b, &c)
    }
}
