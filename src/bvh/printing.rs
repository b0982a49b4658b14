use std::fmt::{self, Display};

use crate::util::Stats;

use super::{Bvh, NodeIdx, NodeKind};

#[derive(Clone, Debug, PartialEq)]
pub struct BvhStatistics {
    pub node_count: usize,
    pub triangle_count: usize,
    pub leaf_depth: Stats,
    pub leaf_size: Stats,
}

impl Display for BvhStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} nodes, {} triangles",
            self.node_count, self.triangle_count
        )?;
        writeln!(f, "Leaf depth: {}", self.leaf_depth)?;
        write!(f, "Leaf size: {}", self.leaf_size)
    }
}

/// Indented dump of the tree, one node per line, leaves followed by their triangles.
pub struct TreeDisplay<'a> {
    bvh: &'a Bvh,
    with_triangles: bool,
}

impl Bvh {
    pub fn statistics(&self) -> BvhStatistics {
        let leaves: Vec<_> = self
            .depth_first()
            .filter(|(index, _)| self.nodes[*index].is_leaf())
            .collect();
        let leaf_depth: Stats = leaves.iter().map(|(_, depth)| *depth).collect();
        let leaf_size: Stats = leaves
            .iter()
            .map(|(index, _)| self.nodes[*index].triangle_count())
            .collect();

        BvhStatistics {
            node_count: self.nodes.len(),
            triangle_count: self.triangles.len(),
            leaf_depth,
            leaf_size,
        }
    }

    pub fn tree_display(&self, with_triangles: bool) -> TreeDisplay<'_> {
        TreeDisplay {
            bvh: self,
            with_triangles,
        }
    }

    /// Pre-order walk over the tree with node depths, left children first.
    fn depth_first(&self) -> impl Iterator<Item = (NodeIdx, usize)> + '_ {
        let mut stack = vec![(NodeIdx::root(), 0)];
        std::iter::from_fn(move || {
            let (index, depth) = stack.pop()?;
            if let NodeKind::Internal { left_child } = self.nodes[index].kind {
                stack.push((left_child.sibling(), depth + 1));
                stack.push((left_child, depth + 1));
            }
            Some((index, depth))
        })
    }
}

impl Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, depth) in self.bvh.depth_first() {
            let node = &self.bvh.nodes[index];
            let indent = "  ".repeat(depth);
            match node.kind {
                NodeKind::Internal { .. } => {
                    writeln!(f, "{indent}- I{index}: {:?}-{:?}", node.bbox.min, node.bbox.max)?
                }
                NodeKind::Leaf { first, count } => {
                    writeln!(
                        f,
                        "{indent}- L{index} [{first}; {count}]: {:?}-{:?}",
                        node.bbox.min, node.bbox.max
                    )?;
                    if self.with_triangles {
                        for triangle in node.triangle_indices() {
                            let [a, b, c] = self.bvh.triangles[triangle].vertices();
                            writeln!(f, "{indent}    {triangle}: {a:?}, {b:?}, {c:?}")?;
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
