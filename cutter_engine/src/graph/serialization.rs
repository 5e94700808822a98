use std::path::Path;

use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;

use super::{
    ExposedControl, GraphHost, InputSource, Node, NodeId, ParamValue, SceneGraph, ROOT_NAME,
};
use crate::prelude::*;

#[derive(Serialize, Deserialize, PartialEq, Eq, Debug)]
pub struct SerializationVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SerializationVersion {
    pub fn latest() -> Self {
        Self {
            major: 0,
            minor: 1,
            patch: 0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub enum SerializedParamValue {
    Int(i64),
    Float(f32),
    Toggle(bool),
    String(String),
    Vector(Vec3),
    IntVector(IVec3),
    /// Only the source text is stored. References are parsed again on load.
    Expression(String),
}

#[derive(Serialize, Deserialize, Debug)]
pub enum SerializedInputSource {
    Node { node_idx: usize },
    SubnetInput(usize),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct SerializedNode {
    pub op_type: String,
    pub name: String,
    pub parent_idx: Option<usize>,
    pub params: Vec<(String, SerializedParamValue)>,
    pub inputs: Vec<Option<SerializedInputSource>>,
    #[serde(default)]
    pub controls: Vec<ExposedControl>,
    #[serde(default)]
    pub display: bool,
    #[serde(default)]
    pub position: Vec2,
}

/// The scene file. Nodes are stored in a flat list and refer to each other
/// by their index in that list. Parents always come before their children.
#[derive(Serialize, Deserialize, Debug)]
pub struct SerializedScene {
    pub version: SerializationVersion,
    pub nodes: Vec<SerializedNode>,
}

/// Maps slotmap ids to serialized indices.
type IdToIdx = SecondaryMap<NodeId, usize>;

impl SerializedScene {
    pub fn from_runtime_data(graph: &SceneGraph) -> Self {
        // Depth first from the root, so parents are written before children
        let mut order = vec![];
        let mut stack = vec![graph.root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(graph.nodes[id].children.iter().rev());
        }
        let id_to_idx: IdToIdx = order.iter().copied().zip(0..).collect();

        let nodes = order
            .iter()
            .map(|&id| SerializedNode::from_runtime_data(&graph.nodes[id], &id_to_idx))
            .collect();

        Self {
            version: SerializationVersion::latest(),
            nodes,
        }
    }

    /// Rebuilds the scene through the same host operations used to build it
    /// in the first place, so a file can't describe a graph the host would
    /// have refused: unknown operators, children under non-networks,
    /// duplicate names, cycles or wires crossing networks.
    pub fn into_runtime(self) -> Result<SceneGraph> {
        if self.version.major != SerializationVersion::latest().major {
            bail!(
                "Unsupported scene version {}.{}.{}",
                self.version.major,
                self.version.minor,
                self.version.patch
            );
        }

        let mut graph = SceneGraph::new();
        match self.nodes.first() {
            Some(root) if root.parent_idx.is_none() && root.name == ROOT_NAME => {}
            _ => bail!("The first node in a scene must be the root, '{ROOT_NAME}'"),
        }

        // First pass: create every node. Parents must come before their
        // children, so the parent is always known by the time it's needed.
        let mut idx_to_id: Vec<NodeId> = vec![graph.root()];
        for (idx, serialized) in self.nodes.iter().enumerate().skip(1) {
            let parent = match serialized.parent_idx {
                Some(parent_idx) if parent_idx < idx => idx_to_id[parent_idx],
                Some(parent_idx) => bail!(
                    "Node {} is listed before its parent (index {parent_idx})",
                    serialized.name
                ),
                None => bail!("Node {} has no parent", serialized.name),
            };
            let id = graph
                .create_node(parent, &serialized.op_type, Some(&serialized.name))
                .with_context(|| format!("Invalid node at index {idx}"))?;
            let num_inputs = graph.nodes[id].inputs.len();
            if serialized.inputs.len() != num_inputs {
                bail!(
                    "Node {} has {} inputs, but {} takes {num_inputs}",
                    graph.path(id),
                    serialized.inputs.len(),
                    serialized.op_type,
                );
            }
            idx_to_id.push(id);
        }
        let lookup = |idx: usize| -> Result<NodeId> {
            idx_to_id
                .get(idx)
                .copied()
                .ok_or_else(|| anyhow!("Node index {idx} out of bounds"))
        };

        // Second pass: controls, parameters, wires and flags, now that every
        // node a wire may point to exists.
        for (idx, serialized) in self.nodes.into_iter().enumerate().skip(1) {
            let id = idx_to_id[idx];
            for control in serialized.controls {
                graph.add_control(id, control)?;
            }
            for (name, value) in serialized.params {
                graph.set_param(id, &name, value.into_runtime()?)?;
            }
            for (slot, input) in serialized.inputs.into_iter().enumerate() {
                let source = match input {
                    Some(SerializedInputSource::Node { node_idx }) => {
                        InputSource::Node(lookup(node_idx)?)
                    }
                    Some(SerializedInputSource::SubnetInput(i)) => InputSource::SubnetInput(i),
                    None => continue,
                };
                graph.set_input(id, slot, source)?;
            }
            if serialized.display {
                if let Some(parent) = graph.nodes[id].parent {
                    if let Some(other) = graph.display_node(parent) {
                        bail!(
                            "Both {} and {} have the display flag",
                            graph.path(other),
                            graph.path(id)
                        );
                    }
                }
                graph.set_display_flag(id)?;
            }
            graph.nodes[id].position = serialized.position;
        }

        Ok(graph)
    }

    pub fn to_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    pub fn load_from_string(data: &str) -> Result<Self> {
        Ok(ron::from_str(data)?)
    }
}

impl SerializedNode {
    fn from_runtime_data(node: &Node, id_to_idx: &IdToIdx) -> Self {
        let Node {
            op_type,
            name,
            parent,
            children: _,
            params,
            inputs,
            controls,
            display,
            position,
        } = node;

        Self {
            op_type: op_type.clone(),
            name: name.clone(),
            parent_idx: parent.map(|p| id_to_idx[p]),
            params: params
                .iter()
                .map(|(name, value)| (name.clone(), SerializedParamValue::from_runtime_data(value)))
                .collect(),
            inputs: inputs
                .iter()
                .map(|input| {
                    input.map(|input| match input {
                        InputSource::Node(src) => SerializedInputSource::Node {
                            node_idx: id_to_idx[src],
                        },
                        InputSource::SubnetInput(i) => SerializedInputSource::SubnetInput(i),
                    })
                })
                .collect(),
            controls: controls.clone(),
            display: *display,
            position: *position,
        }
    }
}

impl SerializedParamValue {
    fn from_runtime_data(value: &ParamValue) -> Self {
        match value {
            ParamValue::Int(v) => Self::Int(*v),
            ParamValue::Float(v) => Self::Float(*v),
            ParamValue::Toggle(v) => Self::Toggle(*v),
            ParamValue::String(v) => Self::String(v.clone()),
            ParamValue::Vector(v) => Self::Vector(*v),
            ParamValue::IntVector(v) => Self::IntVector(*v),
            ParamValue::Expression(expr) => Self::Expression(expr.source().to_string()),
        }
    }

    fn into_runtime(self) -> Result<ParamValue> {
        Ok(match self {
            Self::Int(v) => ParamValue::Int(v),
            Self::Float(v) => ParamValue::Float(v),
            Self::Toggle(v) => ParamValue::Toggle(v),
            Self::String(v) => ParamValue::String(v),
            Self::Vector(v) => ParamValue::Vector(v),
            Self::IntVector(v) => ParamValue::IntVector(v),
            Self::Expression(source) => ParamValue::Expression(Expression::parse(source)?),
        })
    }
}

impl SceneGraph {
    /// Writes this scene to `path` in the scene file format.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = SerializedScene::from_runtime_data(self).to_string()?;
        std::fs::write(path, data)
            .with_context(|| format!("Could not write scene file {}", path.display()))?;
        log::info!("Saved scene to {}", path.display());
        Ok(())
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read scene file {}", path.display()))?;
        SerializedScene::load_from_string(&data)?.into_runtime()
    }
}
