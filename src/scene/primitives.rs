use rand::{Rng, SeedableRng, rngs::SmallRng};

use crate::geometry::{Triangle, WorldPoint, WorldVector};

/// Unit square in the z = 0 plane, split along its diagonal.
pub fn unit_quad() -> [Triangle; 2] {
    quad(WorldPoint::origin(), WorldVector::x(), WorldVector::y())
}

/// Parallelogram spanned by two edges from a corner, as two triangles sharing the diagonal.
pub fn quad(corner: WorldPoint, a: WorldVector, b: WorldVector) -> [Triangle; 2] {
    let diagonal = corner + a + b;
    [
        Triangle::new(corner, corner + a, diagonal),
        Triangle::new(corner, diagonal, corner + b),
    ]
}

/// `width x height` unit cells in the z = 0 plane, two triangles per cell.
pub fn grid_scene(width: usize, height: usize) -> Vec<Triangle> {
    (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .flat_map(|(x, y)| {
            quad(
                WorldPoint::new(x as f32, y as f32, 0.0),
                WorldVector::x(),
                WorldVector::y(),
            )
        })
        .collect()
}

/// Random soup of small triangles scattered in a `[-10, 10]` cube.
pub fn random_scene(count: usize, seed: u64) -> Vec<Triangle> {
    let mut rng = SmallRng::seed_from_u64(seed);

    (0..count)
        .map(|_| {
            let center = random_point(&mut rng, 10.0).coords;
            let [a, b, c] = [0; 3].map(|_| random_point(&mut rng, 1.0) + center);
            Triangle::new(a, b, c)
        })
        .collect()
}

fn random_point(rng: &mut impl Rng, extent: f32) -> WorldPoint {
    WorldPoint::new(
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
        rng.random_range(-extent..extent),
    )
}

#[cfg(test)]
mod test {
    use super::*;

    use assert2::assert;

    #[test]
    fn quad_shares_diagonal() {
        let [a, b] = unit_quad();
        assert!(a.p0 == b.p0);
        assert!(a.p2() == b.p1());
        assert!(a.p2() == WorldPoint::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn grid_size() {
        let grid = grid_scene(4, 3);
        assert!(grid.len() == 24);
        assert!(grid.iter().all(|t| t.p0.z == 0.0));
    }

    #[test]
    fn random_scene_is_reproducible() {
        assert!(random_scene(20, 3) == random_scene(20, 3));
        assert!(random_scene(20, 3) != random_scene(20, 4));
        assert!(random_scene(20, 3).iter().all(|t| t.p0.coords.amax() <= 11.0));
    }
}
