use index_vec::IndexVec;
use ordered_float::OrderedFloat;

use crate::geometry::{AABB, FloatType, Triangle, WorldPoint};

use super::{Bvh, MAX_DEPTH, Node, NodeIdx, NodeKind, TriangleIdx};

impl Bvh {
    /// Builds the hierarchy with a full SAH sweep over centroid orderings on all three axes.
    /// The result depends only on the input order and f32 arithmetic.
    #[tracing::instrument(skip_all, fields(triangle_count = triangles.len()))]
    pub fn build(triangles: Vec<Triangle>) -> Bvh {
        let boxes: Vec<AABB> = triangles.iter().map(Triangle::bounding_box).collect();
        let centers: Vec<WorldPoint> = triangles.iter().map(Triangle::centroid).collect();
        let global_box = boxes.iter().fold(AABB::EMPTY, |acc, b| acc.union(b));
        tracing::debug!(min = ?global_box.min, max = ?global_box.max, "global bounding box");

        let mut sweep = SweepBuilder::new(&boxes, &centers);
        let max_depth = sweep.run(global_box);

        let [order, _, _] = sweep.references;
        let triangles: IndexVec<TriangleIdx, Triangle> =
            order.iter().map(|&i| triangles[i]).collect();

        tracing::info!(
            nodes = sweep.nodes.len(),
            triangles = triangles.len(),
            max_depth,
            "BVH built"
        );

        Bvh {
            nodes: sweep.nodes,
            triangles,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Split {
    axis: usize,
    /// First position (in the axis ordering) that goes to the right child
    index: usize,
}

#[derive(Copy, Clone, Debug)]
struct WorkItem {
    node: NodeIdx,
    begin: usize,
    end: usize,
    depth: usize,
}

impl WorkItem {
    fn len(&self) -> usize {
        self.end - self.begin
    }
}

struct SweepBuilder<'a> {
    boxes: &'a [AABB],
    /// Triangle indices sorted by centroid coordinate, one ordering per axis.
    /// Every work item's range holds the same set of triangles in all three.
    references: [Vec<usize>; 3],
    /// Suffix costs of the sweep currently being evaluated
    costs: Vec<FloatType>,
    /// Per triangle flag, set when assigned to the left child of the current split
    marks: Vec<bool>,
    nodes: IndexVec<NodeIdx, Node>,
}

impl<'a> SweepBuilder<'a> {
    fn new(boxes: &'a [AABB], centers: &[WorldPoint]) -> Self {
        let n = boxes.len();
        let references = [0, 1, 2].map(|axis| {
            let mut refs: Vec<usize> = (0..n).collect();
            // Stable, ties keep the input order
            refs.sort_by_key(|&i| OrderedFloat(centers[i][axis]));
            refs
        });

        SweepBuilder {
            boxes,
            references,
            costs: vec![0.0; n],
            marks: vec![false; n],
            nodes: IndexVec::with_capacity(2 * n.max(1)),
        }
    }

    /// Builds the whole tree, returns its depth.
    fn run(&mut self, root_box: AABB) -> usize {
        let n = self.boxes.len();
        let root = self.push_node(root_box, 0, n);

        let mut stack = Vec::new();
        let mut current = Some(WorkItem {
            node: root,
            begin: 0,
            end: n,
            depth: 0,
        });
        let mut max_depth = 0;

        while let Some(item) = current.take().or_else(|| stack.pop()) {
            max_depth = max_depth.max(item.depth);

            let Some(split) = self.find_split(&item) else {
                // Node was pushed as a leaf covering its range already
                continue;
            };

            let (left, right) = self.split(&item, split);
            let left = WorkItem {
                node: left,
                begin: item.begin,
                end: split.index,
                depth: item.depth + 1,
            };
            let right = WorkItem {
                node: right,
                begin: split.index,
                end: item.end,
                depth: item.depth + 1,
            };

            // Continue with the smaller subtree, this bounds the stack size
            let (next, deferred) = if left.len() < right.len() {
                (left, right)
            } else {
                (right, left)
            };
            stack.push(deferred);
            current = Some(next);
        }

        max_depth
    }

    /// Finds the cheapest split of the item's range, or None if it should stay a leaf.
    fn find_split(&mut self, item: &WorkItem) -> Option<Split> {
        let WorkItem {
            begin, end, depth, ..
        } = *item;
        let count = end - begin;
        if count <= 1 || depth >= MAX_DEPTH {
            return None;
        }

        let mut best: Option<(FloatType, Split)> = None;
        for axis in 0..3 {
            let refs = &self.references[axis];

            let mut suffix = AABB::EMPTY;
            for i in (begin + 1..end).rev() {
                suffix.extend(&self.boxes[refs[i]]);
                self.costs[i] = suffix.half_area() * (end - i) as FloatType;
            }

            let mut prefix = AABB::EMPTY;
            for i in begin..end - 1 {
                prefix.extend(&self.boxes[refs[i]]);
                let cost = prefix.half_area() * (i + 1 - begin) as FloatType + self.costs[i + 1];
                if cost < best.map_or(FloatType::INFINITY, |(best_cost, _)| best_cost) {
                    best = Some((cost, Split { axis, index: i + 1 }));
                }
            }
        }

        let leaf_cost = self.nodes[item.node].bbox.half_area() * (count - 1) as FloatType;
        best.filter(|(cost, _)| *cost < leaf_cost)
            .map(|(_, split)| split)
    }

    /// Turns the item's node into an internal node with a fresh sibling pair of children and
    /// partitions the other two orderings to match.
    fn split(&mut self, item: &WorkItem, split: Split) -> (NodeIdx, NodeIdx) {
        let sorted = &self.references[split.axis];
        for &r in &sorted[item.begin..split.index] {
            self.marks[r] = true;
        }
        for &r in &sorted[split.index..item.end] {
            self.marks[r] = false;
        }

        let left_box = self.range_box(split.axis, item.begin, split.index);
        let right_box = self.range_box(split.axis, split.index, item.end);

        for axis in (0..3).filter(|&axis| axis != split.axis) {
            let range = &mut self.references[axis][item.begin..item.end];
            let (left, right): (Vec<usize>, Vec<usize>) =
                range.iter().partition(|&&r| self.marks[r]);
            for (dst, src) in range.iter_mut().zip(left.into_iter().chain(right)) {
                *dst = src;
            }
        }

        let left = self.push_node(left_box, item.begin, split.index);
        let right = self.push_node(right_box, split.index, item.end);
        self.nodes[item.node].kind = NodeKind::Internal { left_child: left };

        (left, right)
    }

    fn range_box(&self, axis: usize, begin: usize, end: usize) -> AABB {
        self.references[axis][begin..end]
            .iter()
            .fold(AABB::EMPTY, |acc, &r| acc.union(&self.boxes[r]))
    }

    /// Pushes a node that starts out as a leaf over the given range.
    fn push_node(&mut self, bbox: AABB, begin: usize, end: usize) -> NodeIdx {
        self.nodes.push(Node {
            bbox,
            kind: NodeKind::Leaf {
                first: TriangleIdx::from_usize(begin),
                count: (end - begin) as u32,
            },
        })
    }
}
