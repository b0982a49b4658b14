use super::{FloatType, WorldPoint, WorldVector};

/// Axis aligned bounding box.
/// Every valid box has `min <= max` on all axes, the only exception being `AABB::EMPTY`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AABB {
    pub min: WorldPoint,
    pub max: WorldPoint,
}

impl AABB {
    /// Box that contains nothing, identity for `extend`.
    pub const EMPTY: AABB = AABB {
        min: WorldPoint::new(FloatType::INFINITY, FloatType::INFINITY, FloatType::INFINITY),
        max: WorldPoint::new(
            FloatType::NEG_INFINITY,
            FloatType::NEG_INFINITY,
            FloatType::NEG_INFINITY,
        ),
    };

    pub fn new(min: WorldPoint, max: WorldPoint) -> AABB {
        AABB { min, max }
    }

    /// Smallest box containing all the points, `EMPTY` if there are none.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a WorldPoint>) -> AABB {
        points.into_iter().fold(AABB::EMPTY, |mut acc, p| {
            acc.extend_point(p);
            acc
        })
    }

    /// Builds a box from the memory layout used by the node array,
    /// `[xmin, xmax, ymin, ymax, zmin, zmax]`.
    pub fn from_bounds(bounds: [FloatType; 6]) -> AABB {
        AABB {
            min: WorldPoint::new(bounds[0], bounds[2], bounds[4]),
            max: WorldPoint::new(bounds[1], bounds[3], bounds[5]),
        }
    }

    pub fn bounds(&self) -> [FloatType; 6] {
        [
            self.min.x, self.max.x, self.min.y, self.max.y, self.min.z, self.max.z,
        ]
    }

    pub fn reset(&mut self) {
        *self = AABB::EMPTY;
    }

    pub fn is_empty(&self) -> bool {
        (0..3).any(|axis| self.min[axis] > self.max[axis])
    }

    /// Grows the box to also contain `other`.
    pub fn extend(&mut self, other: &AABB) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(other.min[axis]);
            self.max[axis] = self.max[axis].max(other.max[axis]);
        }
    }

    pub fn extend_point(&mut self, p: &WorldPoint) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    pub fn union(mut self, other: &AABB) -> AABB {
        self.extend(other);
        self
    }

    /// Half of the surface area of the box.
    pub fn half_area(&self) -> FloatType {
        let d = self.size();
        (d.x + d.y) * d.z + d.x * d.y
    }

    pub fn size(&self) -> WorldVector {
        self.max - self.min
    }

    pub fn center(&self) -> WorldPoint {
        WorldPoint::from((self.min.coords + self.max.coords) / 2.0)
    }

    /// Returns true if `other` lies completely inside this box (touching faces count as inside).
    pub fn contains(&self, other: &AABB) -> bool {
        (0..3).all(|axis| self.min[axis] <= other.min[axis] && other.max[axis] <= self.max[axis])
    }

    pub fn contains_point(&self, p: &WorldPoint) -> bool {
        (0..3).all(|axis| self.min[axis] <= p[axis] && p[axis] <= self.max[axis])
    }
}

impl Default for AABB {
    fn default() -> Self {
        AABB::EMPTY
    }
}

impl From<[WorldPoint; 2]> for AABB {
    fn from(value: [WorldPoint; 2]) -> Self {
        let [min, max] = value;
        AABB { min, max }
    }
}

impl From<(WorldPoint, WorldPoint)> for AABB {
    fn from(value: (WorldPoint, WorldPoint)) -> Self {
        let (min, max) = value;
        AABB { min, max }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::test::WorldPointWrapper;

    use assert2::assert;
    use test_case::test_case;
    use test_strategy::proptest;

    fn unit_box() -> AABB {
        AABB::new(WorldPoint::new(0.0, 0.0, 0.0), WorldPoint::new(1.0, 1.0, 1.0))
    }

    #[test]
    fn empty_is_identity() {
        let mut b = AABB::EMPTY;
        assert!(b.is_empty());
        b.extend(&unit_box());
        assert!(b == unit_box());
        assert!(!b.is_empty());
    }

    #[test]
    fn reset_empties() {
        let mut b = unit_box();
        b.reset();
        assert!(b == AABB::EMPTY);
    }

    #[test_case([0.0, 1.0, 0.0, 1.0, 0.0, 1.0], 3.0 ; "unit_cube")]
    #[test_case([0.0, 2.0, 0.0, 3.0, 0.0, 4.0], 26.0 ; "cuboid")]
    #[test_case([0.0, 1.0, 0.0, 1.0, 0.0, 0.0], 1.0 ; "flat")]
    #[test_case([1.0, 1.0, 2.0, 2.0, 3.0, 3.0], 0.0 ; "point")]
    fn half_area(bounds: [f32; 6], expected: f32) {
        assert!(AABB::from_bounds(bounds).half_area() == expected);
    }

    #[test]
    fn bounds_layout() {
        let b = AABB::new(WorldPoint::new(1.0, 2.0, 3.0), WorldPoint::new(4.0, 5.0, 6.0));
        assert!(b.bounds() == [1.0, 4.0, 2.0, 5.0, 3.0, 6.0]);
        assert!(AABB::from_bounds(b.bounds()) == b);
    }

    #[proptest]
    fn from_points_contains_all(points: Vec<WorldPointWrapper>) {
        let b = AABB::from_points(points.iter().map(|p| &p.0));
        assert!(points.is_empty() == b.is_empty());
        for p in &points {
            assert!(b.contains_point(p));
        }
    }

    #[proptest]
    fn union_contains_both(a: [WorldPointWrapper; 2], b: [WorldPointWrapper; 2]) {
        let a = AABB::from_points(a.iter().map(|p| &p.0));
        let b = AABB::from_points(b.iter().map(|p| &p.0));
        let u = a.union(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(u.half_area() >= a.half_area().max(b.half_area()));
    }
}
