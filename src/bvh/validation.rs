use thiserror::Error;

use super::{Bvh, MAX_DEPTH, NodeIdx, NodeKind};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BvhInvariantError {
    #[error("node array is empty")]
    NoRoot,

    #[error("node {node} has its child pair at {left_child}, pairs must start at odd indices")]
    UnpairedChildren { node: NodeIdx, left_child: NodeIdx },

    #[error("node {node} has its child pair at {left_child}, outside of the node array")]
    ChildOutOfRange { node: NodeIdx, left_child: NodeIdx },

    #[error("node {node} is referenced {count} times")]
    NotATree { node: NodeIdx, count: usize },

    #[error("{count} nodes are not reachable from the root")]
    Unreachable { count: usize },

    #[error("box of node {child} is not contained in the box of its parent {parent}")]
    BoxNotContained { parent: NodeIdx, child: NodeIdx },

    #[error("leaf {node} starts at triangle {first}, expected {expected}")]
    LeafRangeGap {
        node: NodeIdx,
        first: usize,
        expected: usize,
    },

    #[error("leaves cover {covered} out of {total} triangles")]
    IncompleteCoverage { covered: usize, total: usize },

    #[error("node {node} is at depth {depth}, limit is {MAX_DEPTH}")]
    TooDeep { node: NodeIdx, depth: usize },
}

impl Bvh {
    /// Checks the structural invariants the accelerator relies on:
    /// sibling pairs, tree shape, box containment, leaf ranges partitioning the triangle array
    /// in depth first order and bounded depth.
    pub fn validate(&self) -> Result<(), BvhInvariantError> {
        if self.nodes.is_empty() {
            return Err(BvhInvariantError::NoRoot);
        }

        let mut references = vec![0usize; self.nodes.len()];
        for (node, n) in self.nodes.iter_enumerated() {
            let NodeKind::Internal { left_child } = n.kind else {
                continue;
            };
            if left_child.index() % 2 != 1 {
                return Err(BvhInvariantError::UnpairedChildren { node, left_child });
            }
            if left_child.sibling().index() >= self.nodes.len() {
                return Err(BvhInvariantError::ChildOutOfRange { node, left_child });
            }
            references[left_child.index()] += 1;
            references[left_child.sibling().index()] += 1;
        }
        for (index, &count) in references.iter().enumerate() {
            let expected = if index == 0 { 0 } else { 1 };
            if count != expected {
                return Err(BvhInvariantError::NotATree {
                    node: NodeIdx::from_usize(index),
                    count,
                });
            }
        }

        // Depth first, left child first, which is the order of leaf ranges
        let mut stack = vec![(NodeIdx::root(), 0usize)];
        let mut visited = 0;
        let mut covered = 0;
        while let Some((index, depth)) = stack.pop() {
            visited += 1;
            if depth > MAX_DEPTH {
                return Err(BvhInvariantError::TooDeep { node: index, depth });
            }

            let node = &self.nodes[index];
            match node.kind {
                NodeKind::Leaf { first, count } => {
                    if first.index() != covered {
                        return Err(BvhInvariantError::LeafRangeGap {
                            node: index,
                            first: first.index(),
                            expected: covered,
                        });
                    }
                    covered += count as usize;
                }
                NodeKind::Internal { left_child } => {
                    for child in [left_child.sibling(), left_child] {
                        if !node.bbox.contains(&self.nodes[child].bbox) {
                            return Err(BvhInvariantError::BoxNotContained {
                                parent: index,
                                child,
                            });
                        }
                        stack.push((child, depth + 1));
                    }
                }
            }
        }

        if visited != self.nodes.len() {
            return Err(BvhInvariantError::Unreachable {
                count: self.nodes.len() - visited,
            });
        }
        if covered != self.triangles.len() {
            return Err(BvhInvariantError::IncompleteCoverage {
                covered,
                total: self.triangles.len(),
            });
        }

        Ok(())
    }
}
