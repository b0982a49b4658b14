mod aabb;
mod ray_box_intersection;
mod ray_triangle_intersection;
mod triangle;

pub use aabb::AABB;
pub use ray_box_intersection::{SlabHit, SlabRay};
pub use ray_triangle_intersection::Candidate;
pub use triangle::{BarycentricCoordinates, Triangle};

pub type FloatType = f32;
pub type WorldPoint = nalgebra::Point3<FloatType>;
pub type WorldVector = nalgebra::Vector3<FloatType>;

/// Magnitude below which a direction component is treated as zero before taking its reciprocal.
pub const DIRECTION_EPSILON: FloatType = FloatType::EPSILON;

/// A ray as it is presented to the accelerator.
/// Direction does not need to be normalized, distances along the ray are in multiples of it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayRequest {
    pub origin: WorldPoint,
    pub direction: WorldVector,
    pub tmax: FloatType,
}

impl RayRequest {
    /// Creates a ray with unbounded maximum distance.
    pub fn new(origin: WorldPoint, direction: WorldVector) -> RayRequest {
        RayRequest {
            origin,
            direction,
            tmax: FloatType::INFINITY,
        }
    }

    pub fn with_tmax(self, tmax: FloatType) -> RayRequest {
        RayRequest { tmax, ..self }
    }

    pub fn point_at(&self, t: FloatType) -> WorldPoint {
        self.origin + self.direction * t
    }
}
