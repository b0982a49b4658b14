mod building;
mod printing;
mod validation;

use index_vec::IndexVec;

use crate::geometry::{AABB, Triangle};

pub use printing::{BvhStatistics, TreeDisplay};
pub use validation::BvhInvariantError;

/// Nodes deeper than this are always leaves.
pub const MAX_DEPTH: usize = 30;

/// Capacity of the per ray traversal stack.
/// Pushed pairs have strictly increasing depths in `2..=MAX_DEPTH`.
pub const TRAVERSAL_STACK_DEPTH: usize = MAX_DEPTH - 1;

index_vec::define_index_type! {
    pub struct NodeIdx = u32;
    DISPLAY_FORMAT = "{}";
    IMPL_RAW_CONVERSIONS = true;
}

index_vec::define_index_type! {
    pub struct TriangleIdx = u32;
    DISPLAY_FORMAT = "{}";
    IMPL_RAW_CONVERSIONS = true;
}

impl NodeIdx {
    pub fn root() -> NodeIdx {
        NodeIdx::from_usize(0)
    }

    /// Left node of the root's child pair, where every traversal starts.
    pub fn root_pair() -> NodeIdx {
        NodeIdx::from_usize(1)
    }

    /// The other node of a sibling pair.
    pub fn sibling(self) -> NodeIdx {
        self + 1
    }
}

/// Immutable scene structure consumed by the accelerator.
/// Triangles are stored in leaf order, each leaf references a contiguous range.
#[derive(Clone, Debug, PartialEq)]
pub struct Bvh {
    nodes: IndexVec<NodeIdx, Node>,
    triangles: IndexVec<TriangleIdx, Triangle>,
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Node {
    pub bbox: AABB,
    pub kind: NodeKind,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Leaf { first: TriangleIdx, count: u32 },
    /// Children are always allocated as a pair, right child is `left_child + 1`.
    Internal { left_child: NodeIdx },
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn triangle_count(&self) -> usize {
        match self.kind {
            NodeKind::Leaf { count, .. } => count as usize,
            NodeKind::Internal { .. } => 0,
        }
    }

    /// Left child of an internal node.
    pub fn left_child(&self) -> Option<NodeIdx> {
        match self.kind {
            NodeKind::Leaf { .. } => None,
            NodeKind::Internal { left_child } => Some(left_child),
        }
    }

    /// Triangle indices referenced by a leaf, empty for internal nodes.
    pub fn triangle_indices(&self) -> impl Iterator<Item = TriangleIdx> + use<> {
        let range = match self.kind {
            NodeKind::Leaf { first, count } => first.index()..first.index() + count as usize,
            NodeKind::Internal { .. } => 0..0,
        };
        range.map(TriangleIdx::from_usize)
    }
}

impl Bvh {
    pub fn nodes(&self) -> &IndexVec<NodeIdx, Node> {
        &self.nodes
    }

    pub fn triangles(&self) -> &IndexVec<TriangleIdx, Triangle> {
        &self.triangles
    }

    pub fn node(&self, index: NodeIdx) -> &Node {
        &self.nodes[index]
    }

    pub fn triangle(&self, index: TriangleIdx) -> &Triangle {
        &self.triangles[index]
    }

    pub fn root(&self) -> &Node {
        &self.nodes[NodeIdx::root()]
    }

    pub fn bounding_box(&self) -> &AABB {
        &self.root().bbox
    }

    /// Rewrites a scene whose root is a leaf so that the root becomes internal.
    /// The old leaf becomes the left child and its sibling is an empty leaf with an empty box,
    /// which no ray can hit. Scenes with an internal root are returned unchanged.
    pub fn with_internal_root(mut self) -> Bvh {
        let root = self.nodes[NodeIdx::root()];
        if !root.is_leaf() {
            return self;
        }

        let empty = Node {
            bbox: AABB::EMPTY,
            kind: NodeKind::Leaf {
                first: TriangleIdx::from_usize(self.triangles.len()),
                count: 0,
            },
        };
        self.nodes = IndexVec::from_vec(vec![
            Node {
                bbox: root.bbox,
                kind: NodeKind::Internal {
                    left_child: NodeIdx::root_pair(),
                },
            },
            root,
            empty,
        ]);

        self
    }
}
