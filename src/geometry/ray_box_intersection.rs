use super::{AABB, DIRECTION_EPSILON, FloatType, RayRequest, WorldPoint, WorldVector};

/// Per ray constants of the slab test, precomputed when the ray enters the accelerator.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlabRay {
    /// Set for axes where the direction is negative; on these axes the box's max face is hit
    /// first.
    pub octant: [bool; 3],
    pub inv_direction: WorldVector,
    /// `-origin * inv_direction`, so that the distance to a plane is a single multiply-add.
    pub scaled_origin: WorldVector,
    /// Set for axes where the direction is below `DIRECTION_EPSILON`.
    /// The slab of such an axis is either unbounded or missed, decided by the origin alone.
    pub parallel: [bool; 3],
    pub origin: WorldPoint,
}

/// Result of a slab test against one box.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SlabHit {
    pub hit: bool,
    /// Distance along the ray where it enters the box; only meaningful if `hit`.
    pub entry: FloatType,
}

impl SlabRay {
    pub fn new(ray: &RayRequest) -> SlabRay {
        let parallel = [0, 1, 2].map(|axis| ray.direction[axis].abs() < DIRECTION_EPSILON);
        // Near zero components get a signed epsilon, keeping the reciprocal finite
        let inv_direction = ray.direction.map(|d| {
            let d = if d.abs() < DIRECTION_EPSILON {
                DIRECTION_EPSILON.copysign(d)
            } else {
                d
            };
            1.0 / d
        });
        // Taken from the reciprocal so that -0.0 gets the same sign as its substitute
        let octant = [0, 1, 2].map(|axis| inv_direction[axis] < 0.0);
        let scaled_origin = (-ray.origin.coords).component_mul(&inv_direction);

        SlabRay {
            octant,
            inv_direction,
            scaled_origin,
            parallel,
            origin: ray.origin,
        }
    }

    /// Distance to the entry (`far == false`) or exit plane of `bbox` on a non parallel axis.
    pub fn plane(&self, bbox: &AABB, axis: usize, far: bool) -> FloatType {
        let use_max = self.octant[axis] != far;
        let bound = if use_max { bbox.max[axis] } else { bbox.min[axis] };
        self.inv_direction[axis] * bound + self.scaled_origin[axis]
    }

    /// Tests the ray against a box.
    /// The ray hits if the entry distance is not larger than the exit distance, there is no
    /// clipping to `[0, tmax]`.
    /// On parallel axes the origin has to lie inside the slab, faces included.
    pub fn test(&self, bbox: &AABB) -> SlabHit {
        let mut entry = FloatType::NEG_INFINITY;
        let mut exit = FloatType::INFINITY;
        let mut inside_parallel = true;
        for axis in 0..3 {
            if self.parallel[axis] {
                let o = self.origin[axis];
                inside_parallel &= bbox.min[axis] <= o && o <= bbox.max[axis];
            } else {
                entry = entry.max(self.plane(bbox, axis, false));
                exit = exit.min(self.plane(bbox, axis, true));
            }
        }

        SlabHit {
            hit: inside_parallel && entry <= exit,
            entry,
        }
    }
}

#[cfg(test)]
pub mod test {
    use assert2::assert;
    use test_case::{test_case, test_matrix};

    use super::*;

    use crate::geometry::{WorldPoint, WorldVector};

    fn test_box() -> AABB {
        AABB::new([5.0, 5.0, 5.0].into(), [10.0, 10.0, 10.0].into())
    }

    fn entry_exit(ray: &RayRequest, b: &AABB) -> Option<(f32, f32)> {
        let slab = SlabRay::new(ray);
        let hit = slab.test(b);
        let exit = (0..3)
            .filter(|&axis| !slab.parallel[axis])
            .map(|axis| slab.plane(b, axis, true))
            .fold(f32::INFINITY, f32::min);
        hit.hit.then_some((hit.entry, exit))
    }

    /// Checks cases when the ray hits the box, including some corner cases.
    #[test_matrix(
        [5.0, 7.0, 10.0],
        [5.0, 7.0, 10.0],
        [5.0, 7.0, 10.0],
        [-1.0, 0.0, 2.0],
        [-1.0, 0.0, 2.0],
        [-1.0, 0.0, 2.0],
        [-10.0, -1.0, 0.0, 2.0, 5.0, 20.0]
    )]
    fn hit(px: f32, py: f32, pz: f32, dx: f32, dy: f32, dz: f32, origin_pos: f32) {
        if dx == 0.0 && dy == 0.0 && dz == 0.0 {
            return;
        }
        let p = WorldPoint::new(px, py, pz);
        let d = WorldVector::new(dx, dy, dz);

        let b = test_box();
        let origin = p + d * origin_pos;
        let r = RayRequest::new(origin, d);

        let (t1, t2) = entry_exit(&r, &b)
            .expect("The ray passes through a point in/on the box, we should always have a hit");

        assert!(t1 <= t2);
        let entry_point = r.point_at(t1);
        assert!(point_is_on_box_surface(&entry_point, &b), "{entry_point:?} must be on {b:?}");
    }

    /// Just a manual example of ray grazing along an edge.
    #[test]
    fn hit_along_edge() {
        let r = RayRequest::new(WorldPoint::new(5.0, 5.0, 0.0), WorldVector::new(0.0, 0.0, 1.0));

        let slab_hit = SlabRay::new(&r).test(&test_box());

        assert!(slab_hit.hit);
        assert!(slab_hit.entry == 5.0);
    }

    /// Boxes behind the ray origin still count as hit, the test does not clip the ray.
    #[test]
    fn box_behind_origin() {
        let r = RayRequest::new(
            WorldPoint::new(7.0, 7.0, 20.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );

        let slab_hit = SlabRay::new(&r).test(&test_box());

        assert!(slab_hit.hit);
        assert!(slab_hit.entry == -15.0);
    }

    /// Rays that lie parallel to one axis and start outside the corresponding slab
    /// must miss, even if they move toward the box on other axes or remain unchanged.
    #[test_case( 0.0,  7.0,  7.0,   0.0, 1.0, 0.0 ; "low_x_parallel_miss")]
    #[test_case(12.0,  7.0,  7.0,   0.0, 1.0, 0.0 ; "high_x_parallel_miss")]
    #[test_case( 7.0,  0.0,  7.0,   1.0, 0.0, 0.0 ; "low_y_parallel_miss")]
    #[test_case( 7.0, 12.0,  7.0,   1.0, 0.0, 0.0 ; "high_y_parallel_miss")]
    #[test_case( 7.0,  7.0,  0.0,   1.0, 0.0, 0.0 ; "low_z_parallel_miss")]
    #[test_case( 7.0,  7.0, 12.0,   1.0, 0.0, 0.0 ; "high_z_parallel_miss")]
    #[test_case( 0.0,  5.0,  7.0,   1.0, 0.0, 1.0 ; "corner_miss")]
    #[test_case( 0.0,  0.0,  0.0,  -1.0, 1.0, 1.0 ; "corner_miss2")]
    fn only_misses(px: f32, py: f32, pz: f32, dx: f32, dy: f32, dz: f32) {
        let r = RayRequest::new(WorldPoint::new(px, py, pz), WorldVector::new(dx, dy, dz));

        assert!(entry_exit(&r, &test_box()) == None);
    }

    /// Axis parallel rays lying in a face plane of the box graze it along that face.
    #[test_case(5.0, 7.0, -0.0 ; "min_face_negative_zero")]
    #[test_case(10.0, 7.0, 0.0 ; "max_face_positive_zero")]
    #[test_case(5.0, 5.0, -0.0 ; "edge_negative_zero")]
    #[test_case(10.0, 10.0, 1e-9 ; "corner_tiny_component")]
    fn grazing_parallel_ray_hits(px: f32, py: f32, dxy: f32) {
        let r = RayRequest::new(WorldPoint::new(px, py, 20.0), WorldVector::new(dxy, dxy, -1.0));

        let slab_hit = SlabRay::new(&r).test(&test_box());

        assert!(slab_hit.hit);
        assert!(slab_hit.entry == 10.0);
    }

    #[test_case(4.999, 7.0 ; "below_min_face")]
    #[test_case(7.0, 10.001 ; "above_max_face")]
    fn parallel_ray_beside_face_misses(px: f32, py: f32) {
        let r = RayRequest::new(WorldPoint::new(px, py, 20.0), -WorldVector::z());

        assert!(!SlabRay::new(&r).test(&test_box()).hit);
    }

    #[test]
    fn empty_box_never_hit() {
        for d in [
            WorldVector::new(1.0, 1.0, 1.0),
            WorldVector::new(-1.0, 0.0, 0.5),
            WorldVector::new(0.0, -0.0, -1.0),
        ] {
            let r = RayRequest::new(WorldPoint::new(0.5, -3.0, 2.0), d);
            assert!(!SlabRay::new(&r).test(&AABB::EMPTY).hit);
        }
    }

    #[test_case(0.0, false ; "positive_zero")]
    #[test_case(-0.0, true ; "negative_zero")]
    #[test_case(1e-9, false ; "tiny_positive")]
    #[test_case(-1e-9, true ; "tiny_negative")]
    fn near_zero_direction_is_clamped(dx: f32, negative: bool) {
        let r = RayRequest::new(WorldPoint::origin(), WorldVector::new(dx, 1.0, 0.0));
        let slab = SlabRay::new(&r);

        assert!(slab.inv_direction.x.is_finite());
        assert!(slab.inv_direction.x.abs() == 1.0 / f32::EPSILON);
        assert!((slab.inv_direction.x < 0.0) == negative);
        assert!(slab.octant[0] == negative);
        assert!(slab.parallel == [true, false, true]);
    }

    fn point_is_on_box_surface(p: &WorldPoint, b: &AABB) -> bool {
        const TOLERANCE: f32 = 1e-3;

        let inside = (0..3).all(|axis| {
            p[axis] >= b.min[axis] - TOLERANCE && p[axis] <= b.max[axis] + TOLERANCE
        });
        let on_face = (0..3).any(|axis| {
            (p[axis] - b.min[axis]).abs() <= TOLERANCE || (p[axis] - b.max[axis]).abs() <= TOLERANCE
        });

        inside && on_face
    }
}
