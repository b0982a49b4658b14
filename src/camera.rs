use bon::bon;
use nalgebra::Unit;
use thiserror::Error;

use crate::geometry::{AABB, FloatType, RayRequest, WorldPoint, WorldVector};

pub type ScreenPoint = nalgebra::Point2<u32>;
pub type ScreenSize = nalgebra::Vector2<u32>;

const FRAME_EPSILON: FloatType = 1e-6;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CameraError {
    #[error("Forward vector must be non-zero")]
    ZeroForward,

    #[error("`up` and `forward` must be linearly independent")]
    DegenerateUp,

    #[error("Resolution must be non-zero in both directions")]
    EmptyResolution,

    #[error("Film width and focal length must be positive")]
    InvalidOptics,
}

/// Pinhole ray source, one ray through the center of every pixel.
#[derive(Copy, Clone, Debug)]
pub struct PinholeCamera {
    center: WorldPoint,

    resolution: ScreenSize,

    up: Unit<WorldVector>,
    right: Unit<WorldVector>,
    film_origin_offset: WorldVector,

    /// Distance between pixels on the film
    pixel_pitch: FloatType,
}

#[bon]
impl PinholeCamera {
    #[builder]
    pub fn new(
        center: WorldPoint,
        forward: WorldVector,
        up: WorldVector,
        resolution: ScreenSize,
        #[builder(default = 36e-3)] film_width: FloatType,
        #[builder(default = 50e-3)] focal_length: FloatType,
    ) -> Result<Self, CameraError> {
        let forward = Unit::try_new(forward, FRAME_EPSILON).ok_or(CameraError::ZeroForward)?;
        let up = Unit::try_new(up, FRAME_EPSILON).ok_or(CameraError::DegenerateUp)?;
        let right =
            Unit::try_new(forward.cross(&up), FRAME_EPSILON).ok_or(CameraError::DegenerateUp)?;
        let up = Unit::new_normalize(right.cross(&forward));

        if resolution.x == 0 || resolution.y == 0 {
            return Err(CameraError::EmptyResolution);
        }
        if !(film_width > 0.0 && focal_length > 0.0) {
            return Err(CameraError::InvalidOptics);
        }

        let pixel_pitch = film_width / (resolution.x as FloatType);
        let resolution_minus_one = ScreenSize::new(resolution.x - 1, resolution.y - 1);
        let film_origin_uv = resolution_minus_one.cast::<FloatType>() * pixel_pitch / 2.0;
        let film_origin_offset = -forward.as_ref() * focal_length
            + right.as_ref() * film_origin_uv.x
            - up.as_ref() * film_origin_uv.y;

        Ok(PinholeCamera {
            center,
            resolution,
            up,
            right,
            film_origin_offset,
            pixel_pitch,
        })
    }
}

impl PinholeCamera {
    /// Camera on the +z side of a box, looking down -z with the whole box in view.
    pub fn framing(bbox: &AABB, resolution: ScreenSize) -> Result<PinholeCamera, CameraError> {
        let bbox = if bbox.is_empty() {
            AABB::new(WorldPoint::new(-1.0, -1.0, -1.0), WorldPoint::new(1.0, 1.0, 1.0))
        } else {
            *bbox
        };
        let diagonal = bbox.size().norm().max(FRAME_EPSILON);
        let center = bbox.center() + WorldVector::z() * (bbox.size().z / 2.0 + 2.0 * diagonal);

        PinholeCamera::builder()
            .center(center)
            .forward(-WorldVector::z())
            .up(WorldVector::y())
            .resolution(resolution)
            .build()
    }

    pub fn resolution(&self) -> ScreenSize {
        self.resolution
    }

    pub fn pixel_count(&self) -> usize {
        self.resolution.x as usize * self.resolution.y as usize
    }

    /// Ray through the center of a pixel, `(0, 0)` is the top left corner.
    pub fn ray(&self, point: &ScreenPoint) -> RayRequest {
        let film_point_offset = self.film_origin_offset
            + self.up.as_ref() * (point.y as FloatType * self.pixel_pitch)
            - self.right.as_ref() * (point.x as FloatType * self.pixel_pitch);

        RayRequest::new(self.center, -film_point_offset)
    }

    /// Rays of all pixels, row by row.
    pub fn rays(&self) -> impl Iterator<Item = RayRequest> + '_ {
        (0..self.resolution.y)
            .flat_map(|y| (0..self.resolution.x).map(move |x| ScreenPoint::new(x, y)))
            .map(|point| self.ray(&point))
    }
}
