//! Sequential oracles for checking the pipeline.

use index_vec::IndexSlice;

use crate::{
    bvh::{Bvh, NodeIdx, TriangleIdx},
    geometry::{RayRequest, SlabRay, Triangle},
    rtcore::Hit,
};

/// Tests `triangle` against the ray and tightens `ray.tmax` if it is accepted.
fn test_triangle(
    ray: &mut RayRequest,
    best: &mut Option<Hit>,
    index: TriangleIdx,
    triangle: &Triangle,
) {
    let candidate = triangle.intersect(ray);
    if candidate.accepted(ray.tmax) {
        ray.tmax = candidate.t;
        *best = Some(Hit {
            triangle: index,
            t: candidate.t,
            uv: candidate.uv,
        });
    }
}

/// Brute force nearest hit, testing all triangles in index order.
pub fn nearest_hit(
    triangles: &IndexSlice<TriangleIdx, [Triangle]>,
    ray: &RayRequest,
) -> Option<Hit> {
    let mut ray = *ray;
    let mut best = None;
    for (index, triangle) in triangles.iter_enumerated() {
        test_triangle(&mut ray, &mut best, index, triangle);
    }
    best
}

/// Nearest hit found by the same traversal order the pipeline uses, without the timing.
/// Results are bit identical to the pipeline's, including the choice between equally
/// distant triangles.
pub fn traverse(bvh: &Bvh, ray: &RayRequest) -> Option<Hit> {
    let slab = SlabRay::new(ray);
    let mut ray = *ray;
    let mut best = None;
    let mut stack = Vec::new();
    let mut pair = NodeIdx::root_pair();

    loop {
        let nodes = [pair, pair.sibling()].map(|index| bvh.node(index));
        let hits = nodes.map(|node| slab.test(&node.bbox));

        for (node, hit) in nodes.iter().zip(&hits) {
            if hit.hit {
                for index in node.triangle_indices() {
                    test_triangle(&mut ray, &mut best, index, bvh.triangle(index));
                }
            }
        }

        let descend = [0, 1].map(|i| nodes[i].left_child().filter(|_| hits[i].hit));
        let next = match descend {
            [Some(left), Some(right)] => {
                if hits[0].entry > hits[1].entry {
                    stack.push(left);
                    Some(right)
                } else {
                    stack.push(right);
                    Some(left)
                }
            }
            [Some(child), None] | [None, Some(child)] => Some(child),
            [None, None] => stack.pop(),
        };

        match next {
            Some(next) => pair = next,
            None => return best,
        }
    }
}
