use crate::graph::{GraphHost, InputSource, NodeId, SceneGraph};
use crate::prelude::*;

/// Distance between two neighbouring nodes in the same row, and between two
/// consecutive rows.
const NODE_SPACING: Vec2 = Vec2::new(3.0, 1.5);

/// Returns the row of every child in `container`: sources sit in row 0 and
/// every other node one row below its deepest input.
fn node_depths(graph: &SceneGraph, container: NodeId) -> HashMap<NodeId, usize> {
    fn depth_of(graph: &SceneGraph, node: NodeId, depths: &mut HashMap<NodeId, usize>) -> usize {
        if let Some(depth) = depths.get(&node) {
            return *depth;
        }
        let depth = graph.nodes[node]
            .inputs
            .iter()
            .flatten()
            .filter_map(|input| match input {
                InputSource::Node(src) => Some(depth_of(graph, *src, depths) + 1),
                InputSource::SubnetInput(_) => None,
            })
            .max()
            .unwrap_or(0);
        depths.insert(node, depth);
        depth
    }

    let mut depths = HashMap::new();
    for &child in graph.children(container) {
        depth_of(graph, child, &mut depths);
    }
    depths
}

/// Positions the children of `container` in rows by depth, flowing
/// downwards. Each row is centered horizontally and keeps creation order.
pub(super) fn layout_children(graph: &mut SceneGraph, container: NodeId) {
    let depths = node_depths(graph, container);
    let rows = graph
        .children(container)
        .iter()
        .copied()
        .into_group_map_by(|child| depths[child]);

    for (depth, row) in rows {
        let half_width = (row.len() as f32 - 1.0) * 0.5;
        for (i, child) in row.into_iter().enumerate() {
            graph.nodes[child].position = Vec2::new(
                (i as f32 - half_width) * NODE_SPACING.x,
                depth as f32 * NODE_SPACING.y,
            );
        }
    }
    log::debug!(
        "Laid out {} nodes in {}",
        graph.children(container).len(),
        graph.path(container)
    );
}
