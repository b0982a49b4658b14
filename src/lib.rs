pub mod bvh;
mod camera;
pub mod geometry;
pub mod reference;
pub mod rtcore;
pub mod scene;
mod util;

pub use bvh::Bvh;
pub use camera::{CameraError, PinholeCamera, ScreenPoint, ScreenSize};
pub use rtcore::{CoreConfig, CoreError, Hit, RayResult, ResumeRoute, RtCore};
pub use util::Stats;
