use super::{BarycentricCoordinates, FloatType, RayRequest, Triangle};

/// Raw outcome of intersecting a ray's supporting line with a triangle's plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Candidate {
    pub t: FloatType,
    pub uv: BarycentricCoordinates,
}

impl Triangle {
    /// Intersects the (two sided) triangle with the line of the ray, no acceptance test.
    /// Values may be infinite or NaN if the ray is parallel to the triangle plane.
    pub fn intersect(&self, ray: &RayRequest) -> Candidate {
        let c = self.p0 - ray.origin;
        let r = ray.direction.cross(&c);
        let inv_det = 1.0 / ray.direction.dot(&self.n);

        Candidate {
            t: inv_det * c.dot(&self.n),
            uv: BarycentricCoordinates {
                u: inv_det * self.e2.dot(&r),
                v: inv_det * self.e1.dot(&r),
            },
        }
    }
}

impl Candidate {
    /// Checks that the point lies inside the triangle and in the `(0, tmax]` range of the ray.
    /// Any NaN fails the comparisons, so degenerate configurations are rejected.
    pub fn accepted(&self, tmax: FloatType) -> bool {
        let BarycentricCoordinates { u, v } = self.uv;
        u >= 0.0 && v >= 0.0 && u + v <= 1.0 && self.t > 0.0 && self.t <= tmax
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::geometry::{
        WorldPoint, WorldVector,
        test::{NonzeroWorldVectorWrapper, TriangleWrapper, WorldPointWrapper, grid_float},
    };

    use assert2::assert;
    use proptest::prelude::*;
    use test_case::test_case;
    use test_strategy::proptest;

    fn unit_triangle() -> Triangle {
        Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        )
    }

    #[test]
    fn straight_hit() {
        let ray = RayRequest::new(
            WorldPoint::new(0.25, 0.25, 1.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );

        let candidate = unit_triangle().intersect(&ray);

        assert!(candidate.accepted(ray.tmax));
        assert!(candidate.t == 1.0);
        assert!(candidate.uv == BarycentricCoordinates { u: 0.25, v: 0.25 });
    }

    #[test]
    fn pointing_away() {
        let ray = RayRequest::new(
            WorldPoint::new(0.25, 0.25, 1.0),
            WorldVector::new(0.0, 0.0, 1.0),
        );

        let candidate = unit_triangle().intersect(&ray);

        assert!(candidate.t == -1.0);
        assert!(!candidate.accepted(ray.tmax));
    }

    #[test_case(0.5, true ; "tmax_beyond")]
    #[test_case(0.25, true ; "tmax_exact")]
    #[test_case(0.2, false ; "tmax_short")]
    fn tmax_is_inclusive(tmax: f32, expected: bool) {
        let ray = RayRequest::new(
            WorldPoint::new(0.25, 0.25, 1.0),
            WorldVector::new(0.0, 0.0, -4.0),
        );

        let candidate = unit_triangle().intersect(&ray);

        assert!(candidate.t == 0.25);
        assert!(candidate.accepted(tmax) == expected);
    }

    #[test_case(1.5, 0.25 ; "outside_u")]
    #[test_case(0.25, -0.5 ; "outside_v")]
    #[test_case(0.75, 0.75 ; "outside_hypotenuse")]
    fn outside_misses(x: f32, y: f32) {
        let ray = RayRequest::new(WorldPoint::new(x, y, 1.0), WorldVector::new(0.0, 0.0, -1.0));
        assert!(!unit_triangle().intersect(&ray).accepted(f32::INFINITY));
    }

    #[test]
    fn origin_on_plane_is_rejected() {
        let ray = RayRequest::new(
            WorldPoint::new(0.25, 0.25, 0.0),
            WorldVector::new(0.0, 0.0, -1.0),
        );
        let candidate = unit_triangle().intersect(&ray);
        assert!(candidate.t == 0.0);
        assert!(!candidate.accepted(f32::INFINITY));
    }

    /// Rays parallel to the triangle plane never produce a hit.
    #[proptest]
    fn parallel_rays_never_hit(
        #[strategy(proptest::array::uniform6(grid_float()))] xy: [f32; 6],
        #[strategy(grid_float())] z: f32,
        #[strategy(grid_float())] dx: f32,
        #[strategy(grid_float())] dy: f32,
        origin: WorldPointWrapper,
    ) {
        // Triangle in a z = const plane, its normal only has a z component
        let triangle = Triangle::new(
            WorldPoint::new(xy[0], xy[1], z),
            WorldPoint::new(xy[2], xy[3], z),
            WorldPoint::new(xy[4], xy[5], z),
        );
        let ray = RayRequest::new(*origin, WorldVector::new(dx, dy, 0.0));

        assert!(!triangle.intersect(&ray).accepted(f32::INFINITY));
    }

    /// Accepted intersections lie on the triangle at the reported distance.
    #[proptest]
    fn accepted_point_matches_barycentric(
        triangle: TriangleWrapper,
        #[strategy(0.0f32..1.0)] u: f32,
        #[strategy(0.0f32..1.0)] v: f32,
        direction: NonzeroWorldVectorWrapper,
    ) {
        let n = triangle.normal();
        prop_assume!(n.norm() > 0.1 * triangle.e1.norm() * triangle.e2.norm());
        prop_assume!(direction.norm() > 0.5);
        prop_assume!(direction.normalize().dot(&n.normalize()).abs() > 0.3);
        let (u, v) = if u + v > 1.0 { (1.0 - u, 1.0 - v) } else { (u, v) };
        let target = BarycentricCoordinates { u, v }.interpolate_triangle(&triangle);
        let ray = RayRequest::new(target - *direction, *direction);

        let candidate = triangle.intersect(&ray);

        assert!((candidate.t - 1.0).abs() < 1e-3);
        let on_triangle = candidate.uv.interpolate_triangle(&triangle);
        assert!((on_triangle - target).norm() < 1e-2);
    }
}
