use std::{fs, path::Path};

use thiserror::Error;

use crate::geometry::{Triangle, WorldPoint};

#[derive(Debug, Error)]
pub enum ObjOpenError {
    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse file: {0}")]
    ParseError(#[from] wavefront_obj::ParseError),
}

/// Loads all triangles of all objects in a Wavefront OBJ file.
/// Other primitives (points, lines) are skipped.
pub fn load_obj(p: impl AsRef<Path>) -> Result<Vec<Triangle>, ObjOpenError> {
    let content = fs::read_to_string(p)?;
    parse_obj(content)
}

pub fn parse_obj(content: String) -> Result<Vec<Triangle>, ObjOpenError> {
    let parsed = wavefront_obj::obj::parse(content)?;

    let mut triangles = Vec::new();
    let mut skipped = 0usize;
    for o in parsed.objects {
        let position = |vtindex: (usize, Option<usize>, Option<usize>)| {
            let vertex = &o.vertices[vtindex.0];
            WorldPoint::new(vertex.x as f32, vertex.y as f32, vertex.z as f32)
        };

        for geometry in &o.geometry {
            for shape in &geometry.shapes {
                let wavefront_obj::obj::Primitive::Triangle(a, b, c) = shape.primitive else {
                    skipped += 1;
                    continue;
                };
                triangles.push(Triangle::new(position(a), position(b), position(c)));
            }
        }
    }

    if skipped > 0 {
        tracing::warn!(skipped, "non-triangle primitives ignored");
    }
    tracing::debug!(triangles = triangles.len(), "OBJ loaded");

    Ok(triangles)
}
