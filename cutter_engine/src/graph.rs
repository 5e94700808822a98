// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Write;

use crate::operators::{self, OperatorDefinition};
use crate::prelude::*;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// Arranges the children of a network for display
pub mod layout;

/// The scene file format
pub mod serialization;

/// Consistency checks over a built network
pub mod validation;

slotmap::new_key_type! { pub struct NodeId; }

/// The value stored in a node parameter. Expressions are kept apart from
/// literals: the host evaluates them at cook time, never at construction.
#[derive(Clone, PartialEq, Debug)]
pub enum ParamValue {
    Int(i64),
    Float(f32),
    Toggle(bool),
    String(String),
    Vector(Vec3),
    IntVector(IVec3),
    Expression(Expression),
}

impl ParamValue {
    pub fn as_expression(&self) -> Option<&Expression> {
        match self {
            ParamValue::Expression(expr) => Some(expr),
            _ => None,
        }
    }

    pub fn is_literal(&self) -> bool {
        !matches!(self, ParamValue::Expression(_))
    }
}

impl From<Expression> for ParamValue {
    fn from(expr: Expression) -> Self {
        ParamValue::Expression(expr)
    }
}

/// Where a node input takes its geometry from.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum InputSource {
    /// The output of a sibling node in the same network.
    Node(NodeId),
    /// One of the inputs of the enclosing subnet, seen from inside it.
    SubnetInput(usize),
}

/// A named integer parameter declared on a subnet. Nodes inside the subnet
/// read it through `ch(...)` expressions instead of graph connections.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ExposedControl {
    pub name: String,
    pub label: String,
    pub default: i64,
    /// The slider range shown to users. Values outside of it are allowed
    /// unless `min` / `max` say otherwise.
    pub ui_range: (i64, i64),
    pub min: Option<i64>,
    pub max: Option<i64>,
    /// The label of the parameter folder this control is shown under.
    pub folder: Option<String>,
}

impl ExposedControl {
    fn check_bounds(&self, value: i64) -> Result<()> {
        if let Some(min) = self.min {
            if value < min {
                bail!("Value {value} is below the minimum {min} for '{}'", self.name);
            }
        }
        if let Some(max) = self.max {
            if value > max {
                bail!("Value {value} is above the maximum {max} for '{}'", self.name);
            }
        }
        Ok(())
    }
}

/// A node in the scene. Containers hold other nodes as children.
#[derive(Clone, Debug)]
pub struct Node {
    pub op_type: String,
    pub name: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub params: BTreeMap<String, ParamValue>,
    /// One entry per input slot of the operator. `None` means unwired.
    pub inputs: Vec<Option<InputSource>>,
    pub controls: Vec<ExposedControl>,
    /// Whether this node is the visible result of its network.
    pub display: bool,
    pub position: Vec2,
}

impl Node {
    fn new(op_type: &str, name: String, parent: Option<NodeId>, num_inputs: usize) -> Self {
        Self {
            op_type: op_type.to_string(),
            name,
            parent,
            children: vec![],
            params: Default::default(),
            inputs: vec![None; num_inputs],
            controls: vec![],
            display: false,
            position: Vec2::ZERO,
        }
    }

    pub fn control(&self, name: &str) -> Option<&ExposedControl> {
        self.controls.iter().find(|c| c.name == name)
    }
}

/// The operations a graph host offers to build a network. Every created node
/// is addressed through the returned handle afterwards. No operation is
/// transactional: a failure leaves whatever was built so far in place.
pub trait GraphHost {
    /// The top level network new tools are created in.
    fn root(&self) -> NodeId;

    /// Creates a node of type `op_type` inside `parent`. Without an explicit
    /// name, the host picks `<op_type><n>`.
    fn create_node(&mut self, parent: NodeId, op_type: &str, name: Option<&str>)
        -> Result<NodeId>;

    fn set_param(&mut self, node: NodeId, name: &str, value: ParamValue) -> Result<()>;

    /// Wires `source` into input `slot` of `node`.
    fn set_input(&mut self, node: NodeId, slot: usize, source: InputSource) -> Result<()>;

    /// Declares an integer control on a subnet.
    fn add_control(&mut self, container: NodeId, control: ExposedControl) -> Result<()>;

    /// Makes `node` the visible result of its network.
    fn set_display_flag(&mut self, node: NodeId) -> Result<()>;

    fn layout_children(&mut self, container: NodeId) -> Result<()>;

    /// The name the node was created with, or picked by the host.
    fn name(&self, node: NodeId) -> Option<String>;

    /// A human readable path for `node`, used in log messages.
    fn path(&self, node: NodeId) -> String;
}

/// The in-memory graph host. Stores a scene as a tree of networks with a
/// single root, `/obj`.
#[derive(Debug)]
pub struct SceneGraph {
    pub nodes: SlotMap<NodeId, Node>,
    root: NodeId,
}

pub const ROOT_NAME: &str = "obj";

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Constructs a scene with an empty root network
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(ROOT_NAME, ROOT_NAME.into(), None, 0));
        Self { nodes, root }
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    fn node_or_err(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| anyhow!("Node {id:?} does not exist"))
    }

    fn node_mut_or_err(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| anyhow!("Node {id:?} does not exist"))
    }

    /// Returns the operator definition for a node. The root has none.
    pub fn definition(&self, id: NodeId) -> Option<&'static OperatorDefinition> {
        if id == self.root {
            return None;
        }
        self.nodes
            .get(id)
            .and_then(|node| operators::operator(&node.op_type).ok())
    }

    /// Returns whether the node can hold children.
    pub fn is_network(&self, id: NodeId) -> bool {
        id == self.root || self.definition(id).map_or(false, |def| def.is_container)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.nodes[child].name == name)
    }

    /// Returns all the children of `parent` with the given operator type, in
    /// creation order.
    pub fn children_of_type(&self, parent: NodeId, op_type: &str) -> Vec<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .filter(|&child| self.nodes[child].op_type == op_type)
            .collect()
    }

    pub fn param(&self, node: NodeId, name: &str) -> Option<&ParamValue> {
        self.nodes.get(node).and_then(|n| n.params.get(name))
    }

    pub fn input(&self, node: NodeId, slot: usize) -> Option<InputSource> {
        self.nodes
            .get(node)
            .and_then(|n| n.inputs.get(slot).copied().flatten())
    }

    /// Returns the node with the display flag inside `container`, if any.
    pub fn display_node(&self, container: NodeId) -> Option<NodeId> {
        self.children(container)
            .iter()
            .copied()
            .find(|&child| self.nodes[child].display)
    }

    /// Looks up a node by its absolute path, e.g. `/obj/fractured_geo/box1`.
    pub fn node_at_path(&self, path: &str) -> Option<NodeId> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        if segments.next() != Some(ROOT_NAME) {
            return None;
        }
        segments.try_fold(self.root, |current, name| self.child_by_name(current, name))
    }

    /// Resolves `path` as seen from `from`. `.` is the node itself, `..` its
    /// parent, and any other segment a child. Absolute paths are also
    /// accepted.
    pub fn resolve_relative(&self, from: NodeId, path: &str) -> Option<NodeId> {
        if path.starts_with('/') {
            return self.node_at_path(path);
        }
        self.nodes.get(from)?;
        path.split('/')
            .filter(|s| !s.is_empty())
            .try_fold(from, |current, segment| match segment {
                "." => Some(current),
                ".." => self.nodes[current].parent,
                name => self.child_by_name(current, name),
            })
    }

    /// Returns whether `ancestor` feeds into `node`, following node inputs.
    fn is_upstream(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut stack = vec![node];
        let mut visited = HashSet::new();
        while let Some(current) = stack.pop() {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            for input in self.nodes[current].inputs.iter().flatten() {
                if let InputSource::Node(src) = input {
                    stack.push(*src);
                }
            }
        }
        false
    }

    fn unique_name(&self, parent: NodeId, op_type: &str) -> String {
        (1..)
            .map(|n| format!("{op_type}{n}"))
            .find(|name| self.child_by_name(parent, name).is_none())
            .expect("Infinite iterator")
    }

    /// Renders the tree of nodes below `container` as text, one node per
    /// line, with their wired inputs and parameters.
    pub fn describe(&self, container: NodeId) -> String {
        let mut out = String::new();
        self.describe_rec(container, 0, &mut out);
        out
    }

    fn describe_rec(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = &self.nodes[id];
        let indent = "    ".repeat(depth);
        let inputs = node
            .inputs
            .iter()
            .map(|input| match input {
                Some(InputSource::Node(src)) => self.nodes[*src].name.clone(),
                Some(InputSource::SubnetInput(idx)) => format!("<input {idx}>"),
                None => "-".into(),
            })
            .join(", ");
        let flag = if node.display { " [display]" } else { "" };
        // Writing to a String can't fail
        writeln!(out, "{indent}{} ({}){flag}", node.name, node.op_type).unwrap();
        if !node.inputs.is_empty() {
            writeln!(out, "{indent}    inputs: {inputs}").unwrap();
        }
        for control in &node.controls {
            writeln!(
                out,
                "{indent}    control {}: \"{}\" default {} range {}..{}",
                control.name, control.label, control.default, control.ui_range.0, control.ui_range.1
            )
            .unwrap();
        }
        for (name, value) in &node.params {
            writeln!(out, "{indent}    {name} = {}", describe_value(value)).unwrap();
        }
        for &child in &node.children {
            self.describe_rec(child, depth + 1, out);
        }
    }
}

fn describe_value(value: &ParamValue) -> String {
    match value {
        ParamValue::Int(i) => i.to_string(),
        ParamValue::Float(f) => f.to_string(),
        ParamValue::Toggle(b) => b.to_string(),
        ParamValue::String(s) => format!("\"{s}\""),
        ParamValue::Vector(v) => format!("({}, {}, {})", v.x, v.y, v.z),
        ParamValue::IntVector(v) => format!("({}, {}, {})", v.x, v.y, v.z),
        ParamValue::Expression(expr) => format!("`{expr}`"),
    }
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl GraphHost for SceneGraph {
    fn root(&self) -> NodeId {
        self.root
    }

    fn create_node(
        &mut self,
        parent: NodeId,
        op_type: &str,
        name: Option<&str>,
    ) -> Result<NodeId> {
        let def = operators::operator(op_type)?;
        self.node_or_err(parent)?;
        if !self.is_network(parent) {
            bail!("Node {} can't contain other nodes", self.path(parent));
        }

        let name = match name {
            Some(name) => {
                if !is_valid_name(name) {
                    bail!("Invalid node name '{name}'");
                }
                if self.child_by_name(parent, name).is_some() {
                    bail!("Node {name} already exists in {}", self.path(parent));
                }
                name.to_string()
            }
            None => self.unique_name(parent, op_type),
        };

        let id = self
            .nodes
            .insert(Node::new(op_type, name, Some(parent), def.max_inputs));
        self.nodes[parent].children.push(id);
        log::debug!("Created {} ({op_type})", self.path(id));
        Ok(id)
    }

    fn set_param(&mut self, node_id: NodeId, name: &str, value: ParamValue) -> Result<()> {
        let path = self.path(node_id);
        let def = self.definition(node_id);
        let node = self.node_mut_or_err(node_id)?;

        if let Some(control) = node.control(name) {
            match &value {
                ParamValue::Int(v) => control.check_bounds(*v)?,
                ParamValue::Expression(_) => {}
                other => bail!("Control {name} on {path} is an integer, got {other:?}"),
            }
        } else {
            let param_def = def
                .and_then(|def| def.param(name))
                .ok_or_else(|| anyhow!("Parameter {name} does not exist for node {path}"))?;
            if !param_def.kind.accepts(&value) {
                bail!(
                    "Incompatible value for {path}/{name}. Parameter is {:?}, got {value:?}",
                    param_def.kind
                );
            }
        }

        log::trace!("{path}/{name} = {}", describe_value(&value));
        node.params.insert(name.to_string(), value);
        Ok(())
    }

    fn set_input(&mut self, node_id: NodeId, slot: usize, source: InputSource) -> Result<()> {
        let node = self.node_or_err(node_id)?;
        if slot >= node.inputs.len() {
            bail!(
                "Node {} has {} inputs, can't connect input {slot}",
                self.path(node_id),
                node.inputs.len()
            );
        }
        let parent = node.parent;

        match source {
            InputSource::Node(src) => {
                let src_node = self.node_or_err(src)?;
                if src_node.parent != parent {
                    bail!(
                        "Can't connect {} to {}: they are in different networks",
                        self.path(src),
                        self.path(node_id)
                    );
                }
                if self.is_upstream(node_id, src) {
                    bail!(
                        "Connecting {} to {} would create a cycle",
                        self.path(src),
                        self.path(node_id)
                    );
                }
            }
            InputSource::SubnetInput(idx) => {
                let subnet = parent
                    .filter(|&p| self.nodes[p].op_type == "subnet")
                    .ok_or_else(|| {
                        anyhow!("Node {} is not inside a subnet", self.path(node_id))
                    })?;
                if idx >= self.nodes[subnet].inputs.len() {
                    bail!("Subnet {} has no input {idx}", self.path(subnet));
                }
            }
        }

        log::debug!(
            "Connected {} input {slot} <- {}",
            self.path(node_id),
            match source {
                InputSource::Node(src) => self.path(src),
                InputSource::SubnetInput(idx) => format!("subnet input {idx}"),
            }
        );
        self.nodes[node_id].inputs[slot] = Some(source);
        Ok(())
    }

    fn add_control(&mut self, container: NodeId, control: ExposedControl) -> Result<()> {
        let path = self.path(container);
        let node = self.node_mut_or_err(container)?;
        if node.op_type != "subnet" {
            bail!("Controls can only be added to subnets, {path} is a {}", node.op_type);
        }
        if !is_valid_name(&control.name) {
            bail!("Invalid control name '{}'", control.name);
        }
        if node.control(&control.name).is_some() {
            bail!("Control {} already exists for node {path}", control.name);
        }
        control.check_bounds(control.default)?;

        log::debug!("Added control {}/{}", path, control.name);
        node.params
            .insert(control.name.clone(), ParamValue::Int(control.default));
        node.controls.push(control);
        Ok(())
    }

    fn set_display_flag(&mut self, node_id: NodeId) -> Result<()> {
        let parent = self
            .node_or_err(node_id)?
            .parent
            .ok_or_else(|| anyhow!("The root node can't be displayed"))?;
        for sibling in self.nodes[parent].children.clone() {
            self.nodes[sibling].display = sibling == node_id;
        }
        Ok(())
    }

    fn layout_children(&mut self, container: NodeId) -> Result<()> {
        self.node_or_err(container)?;
        layout::layout_children(self, container);
        Ok(())
    }

    fn name(&self, node: NodeId) -> Option<String> {
        self.nodes.get(node).map(|n| n.name.clone())
    }

    fn path(&self, node: NodeId) -> String {
        let mut segments = vec![];
        let mut current = Some(node);
        while let Some(id) = current {
            match self.nodes.get(id) {
                Some(n) => {
                    segments.push(n.name.as_str());
                    current = n.parent;
                }
                None => return format!("<missing node {id:?}>"),
            }
        }
        format!("/{}", segments.iter().rev().join("/"))
    }
}
