//! Scene inputs: triangle lists from OBJ files or generated procedurally.

mod obj;
mod primitives;

pub use obj::{ObjOpenError, load_obj, parse_obj};
pub use primitives::{grid_scene, quad, random_scene, unit_quad};
