use super::{
    list::TriangleJob,
    ray_state::{PoolWrite, RayId, RayStatePool},
};
use crate::bvh::Bvh;

/// Combinational result of the intersection unit for one candidate.
#[derive(Clone, Debug, PartialEq)]
pub struct IstOutput {
    pub write: Option<PoolWrite>,
    /// Ray whose candidates are exhausted and that continues traversal
    pub resume: Option<RayId>,
}

/// Tests one candidate triangle against the current state of its ray.
/// An accepted hit lands in the pool on this clock edge, so the next candidate of the same ray
/// already sees the shortened `tmax`.
pub fn intersect(job: &TriangleJob, pool: &RayStatePool, bvh: &Bvh) -> IstOutput {
    let state = pool.get(job.ray);
    let candidate = bvh.triangle(job.triangle).intersect(&state.ray);

    IstOutput {
        write: candidate
            .accepted(state.ray.tmax)
            .then_some(PoolWrite::RecordHit {
                ray: job.ray,
                triangle: job.triangle,
                candidate,
            }),
        resume: job.last.then_some(job.ray),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        bvh::TriangleIdx,
        geometry::{RayRequest, Triangle, WorldPoint, WorldVector},
    };

    use assert2::{assert, let_assert};

    fn setup(tmax: f32) -> (Bvh, RayStatePool) {
        let bvh = Bvh::build(vec![Triangle::new(
            WorldPoint::new(0.0, 0.0, 0.0),
            WorldPoint::new(1.0, 0.0, 0.0),
            WorldPoint::new(0.0, 1.0, 0.0),
        )]);
        let mut pool = RayStatePool::new(1);
        pool.commit([PoolWrite::Bind {
            ray: RayId::from_usize(0),
            request: RayRequest::new(WorldPoint::new(0.25, 0.25, 1.0), -WorldVector::z())
                .with_tmax(tmax),
        }]);
        (bvh, pool)
    }

    fn job(last: bool) -> TriangleJob {
        TriangleJob {
            ray: RayId::from_usize(0),
            triangle: TriangleIdx::from_usize(0),
            last,
        }
    }

    #[test]
    fn accepted_hit_is_written() {
        let (bvh, pool) = setup(f32::INFINITY);
        let output = intersect(&job(false), &pool, &bvh);

        let_assert!(Some(PoolWrite::RecordHit { candidate, .. }) = output.write);
        assert!(candidate.t == 1.0);
        assert!(output.resume == None);
    }

    #[test]
    fn beyond_tmax_is_rejected() {
        let (bvh, pool) = setup(0.5);
        let output = intersect(&job(true), &pool, &bvh);

        assert!(output.write == None);
        assert!(output.resume == Some(RayId::from_usize(0)));
    }
}
