// Copyright (C) 2023 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::graph::ExposedControl;
use crate::prelude::*;
use crate::prompt::{PromptResponse, UserPrompt};

/// Tunable constants and their file format
pub mod config;

pub use config::{CancelPolicy, CutterToolConfig};

/// The text of the path prompt. It names the subnet holding the controls.
pub fn prompt_message(tool_name: &str) -> String {
    format!(
        "Insert a file path or leave empty to load test geo. \
        Controls for this tool can be found on the node '{tool_name}'."
    )
}

pub const PROMPT_BUTTONS: &[&str] = &["OK", "Cancel"];

/// Exposed control driving the number of scattered cutters.
pub const CUTTER_NUM: &str = "cutterNum";
/// Exposed control added to the noise element size.
pub const DETAIL_VALUE: &str = "detailValue";

const CONTROLS_FOLDER: &str = "Cutter Tool";

/// The geometry that gets fractured.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum GeometrySource {
    /// A procedural box, used when no file is given.
    TestBox(NodeId),
    /// A file node reading the mesh at `path`.
    File { node: NodeId, path: String },
}

impl GeometrySource {
    pub fn node(&self) -> NodeId {
        match self {
            GeometrySource::TestBox(node) => *node,
            GeometrySource::File { node, .. } => *node,
        }
    }
}

/// The nodes inside the cutter subnet, in build order.
#[derive(Clone, Copy, Debug)]
pub struct CutterStages {
    pub geo_input: NodeId,
    pub bound: NodeId,
    pub iso_offset: NodeId,
    pub scatter: NodeId,
    pub randomize: NodeId,
    pub grid: NodeId,
    pub copy_to_points: NodeId,
    pub noise_low_freq: NodeId,
    pub noise_high_freq: NodeId,
    pub trim_group: NodeId,
    pub blast: NodeId,
    pub output: NodeId,
}

impl CutterStages {
    pub fn all(&self) -> [NodeId; 12] {
        [
            self.geo_input,
            self.bound,
            self.iso_offset,
            self.scatter,
            self.randomize,
            self.grid,
            self.copy_to_points,
            self.noise_low_freq,
            self.noise_high_freq,
            self.trim_group,
            self.blast,
            self.output,
        ]
    }
}

/// Handles to everything `build_cutter_tool` created.
#[derive(Clone, Debug)]
pub struct CutterToolHandles {
    pub container: NodeId,
    pub source: GeometrySource,
    pub cutter_tool: NodeId,
    pub stages: CutterStages,
    pub boolean: NodeId,
    pub assemble: NodeId,
}

/// Builds the boolean cutter fracture tool in `host`.
///
/// The user is asked for a geometry file first. Then a geometry container is
/// created under the host root, holding the geometry source, the `cutterTool`
/// subnet that generates the noisy cutting surfaces, and a boolean shatter
/// followed by an assemble node, which is left as the visible result.
///
/// The build is not transactional: if a host call fails, the nodes created
/// so far are left in place. Building twice into the same host fails because
/// the container name is already taken.
pub fn build_cutter_tool(
    host: &mut impl GraphHost,
    prompt: &mut impl UserPrompt,
    config: &CutterToolConfig,
) -> Result<CutterToolHandles> {
    let path = match prompt.read_input(&prompt_message(&config.tool_name), PROMPT_BUTTONS)? {
        PromptResponse::Confirmed(path) => path,
        PromptResponse::Cancelled => match config.on_cancel {
            CancelPolicy::Abort => bail!("Cutter tool creation was cancelled"),
            CancelPolicy::UseTestGeometry => String::new(),
        },
    };

    let root = host.root();
    let container = host.create_node(root, "geo", Some(&config.container_name))?;
    log::info!("Building cutter tool in {}", host.path(container));

    let source = create_geometry_source(host, container, path, config)?;
    let cutter_tool = create_cutter_subnet(host, container, source.node(), config)?;
    let stages = build_cutter_stages(host, cutter_tool, config)?;
    let boolean = create_boolean_shatter(host, container, source.node(), cutter_tool)?;
    let assemble = create_assemble(host, container, boolean)?;
    host.layout_children(container)?;

    log::info!("Cutter tool ready, controls are on {}", host.path(cutter_tool));
    Ok(CutterToolHandles {
        container,
        source,
        cutter_tool,
        stages,
        boolean,
        assemble,
    })
}

fn create_geometry_source(
    host: &mut impl GraphHost,
    container: NodeId,
    path: String,
    config: &CutterToolConfig,
) -> Result<GeometrySource> {
    if path.is_empty() {
        let node = host.create_node(container, "box", None)?;
        host.set_param(node, "type", ParamValue::String("polymesh".into()))?;
        host.set_param(node, "scale", ParamValue::Float(config.test_geometry.scale))?;
        host.set_param(
            node,
            "divrate",
            ParamValue::IntVector(IVec3::from(config.test_geometry.divisions)),
        )?;
        log::info!("No geometry file given, using a test box");
        Ok(GeometrySource::TestBox(node))
    } else {
        // The path is not checked here, the host reports missing files when
        // the file node cooks.
        let node = host.create_node(container, "file", None)?;
        host.set_param(node, "file", ParamValue::String(path.clone()))?;
        log::info!("Reading geometry from {path}");
        Ok(GeometrySource::File { node, path })
    }
}

fn control(name: &str, label: &str, config: &config::ControlConfig) -> ExposedControl {
    ExposedControl {
        name: name.into(),
        label: label.into(),
        default: config.default,
        ui_range: config.ui_range,
        min: None,
        max: None,
        folder: Some(CONTROLS_FOLDER.into()),
    }
}

fn create_cutter_subnet(
    host: &mut impl GraphHost,
    container: NodeId,
    source: NodeId,
    config: &CutterToolConfig,
) -> Result<NodeId> {
    let subnet = host.create_node(container, "subnet", Some(&config.tool_name))?;
    host.add_control(
        subnet,
        control(CUTTER_NUM, "Number of Cutters", &config.cutter_count),
    )?;
    host.add_control(subnet, control(DETAIL_VALUE, "Detail Value", &config.detail))?;
    host.set_input(subnet, 0, InputSource::Node(source))?;
    Ok(subnet)
}

/// Reads one of the subnet's exposed controls from a node inside it.
fn control_expr(control: &str) -> Result<Expression> {
    Expression::parse(format!(r#"ch("../{control}")"#))
}

/// Twice the width of the node named `bound`, a sibling of the reader.
fn grid_size_expr(bound: &str) -> Result<Expression> {
    Expression::parse(format!(r#"bbox("../{bound}/", D_XSIZE) * 2"#))
}

/// Top of the reader's own input plus the detail control.
fn noise_size_expr() -> Result<Expression> {
    Expression::parse(format!(
        r#"bbox(opinputpath(".",0), D_YMAX) + ch("../{DETAIL_VALUE}")"#
    ))
}

/// Creates a node inside `network` and wires `inputs` into its first slots.
fn create_stage(
    host: &mut impl GraphHost,
    network: NodeId,
    op_type: &str,
    name: Option<&str>,
    inputs: &[InputSource],
) -> Result<NodeId> {
    let node = host.create_node(network, op_type, name)?;
    for (slot, input) in inputs.iter().enumerate() {
        host.set_input(node, slot, *input)?;
    }
    Ok(node)
}

/// Populates the cutter subnet. The resulting surfaces are a grid copied
/// onto randomly oriented points scattered inside the padded bounds of the
/// input, displaced by two layers of noise and trimmed back to those bounds.
fn build_cutter_stages(
    host: &mut impl GraphHost,
    subnet: NodeId,
    config: &CutterToolConfig,
) -> Result<CutterStages> {
    use InputSource::{Node, SubnetInput};

    let geo_input = create_stage(host, subnet, "null", Some("GEO_INPUT"), &[SubnetInput(0)])?;

    let bound = create_stage(host, subnet, "bound", None, &[Node(geo_input)])?;
    let padding = ParamValue::Vector(Vec3::splat(config.bound_padding));
    host.set_param(bound, "minpad", padding.clone())?;
    host.set_param(bound, "maxpad", padding)?;

    let iso_offset = create_stage(host, subnet, "isooffset", None, &[Node(bound)])?;
    host.set_param(iso_offset, "samplediv", ParamValue::Int(config.iso_divisions))?;

    let scatter = create_stage(host, subnet, "scatter", None, &[Node(iso_offset)])?;
    host.set_param(scatter, "npts", control_expr(CUTTER_NUM)?.into())?;

    let randomize = create_stage(host, subnet, "attribrandomize", None, &[Node(scatter)])?;
    host.set_param(randomize, "name", ParamValue::String("N".into()))?;
    host.set_param(
        randomize,
        "distribution",
        ParamValue::String("uniformorient".into()),
    )?;

    // Reads the bound node through its expressions only, no wire.
    let grid = create_stage(host, subnet, "grid", None, &[])?;
    let bound_name = host
        .name(bound)
        .ok_or_else(|| anyhow!("Bound node vanished from {}", host.path(subnet)))?;
    host.set_param(grid, "sizex", grid_size_expr(&bound_name)?.into())?;
    host.set_param(grid, "sizey", grid_size_expr(&bound_name)?.into())?;
    host.set_param(grid, "rows", ParamValue::Int(config.grid_resolution))?;
    host.set_param(grid, "cols", ParamValue::Int(config.grid_resolution))?;

    let copy_to_points = create_stage(
        host,
        subnet,
        "copytopoints",
        None,
        &[Node(grid), Node(randomize)],
    )?;

    let noise_low_freq = create_stage(
        host,
        subnet,
        "attribnoise",
        Some("noise_low_freq"),
        &[Node(copy_to_points)],
    )?;
    host.set_param(noise_low_freq, "attribs", ParamValue::String("P".into()))?;
    host.set_param(noise_low_freq, "elementsize", noise_size_expr()?.into())?;
    host.set_param(noise_low_freq, "centernoise", ParamValue::Toggle(true))?;

    let noise_high_freq = create_stage(
        host,
        subnet,
        "mountain",
        Some("noise_high_freq"),
        &[Node(noise_low_freq)],
    )?;
    host.set_param(noise_high_freq, "height", noise_size_expr()?.into())?;
    host.set_param(noise_high_freq, "elementsize", noise_size_expr()?.into())?;
    host.set_param(noise_high_freq, "centernoise", ParamValue::Toggle(true))?;

    let trim_group = create_stage(
        host,
        subnet,
        "groupcreate",
        Some("trimArea_group"),
        &[Node(noise_high_freq), Node(bound)],
    )?;
    host.set_param(
        trim_group,
        "groupname",
        ParamValue::String(config.trim_group.clone()),
    )?;
    host.set_param(trim_group, "grouptype", ParamValue::String("point".into()))?;
    host.set_param(trim_group, "groupbase", ParamValue::Toggle(false))?;
    host.set_param(trim_group, "groupbounding", ParamValue::Toggle(true))?;
    host.set_param(trim_group, "boundtype", ParamValue::String("usebobject".into()))?;

    // Deletes every point outside of the trim group
    let blast = create_stage(host, subnet, "blast", None, &[Node(trim_group)])?;
    host.set_param(blast, "group", ParamValue::String(config.trim_group.clone()))?;
    host.set_param(blast, "negate", ParamValue::Toggle(true))?;

    let output = create_stage(host, subnet, "output", None, &[Node(blast)])?;

    host.layout_children(subnet)?;

    Ok(CutterStages {
        geo_input,
        bound,
        iso_offset,
        scatter,
        randomize,
        grid,
        copy_to_points,
        noise_low_freq,
        noise_high_freq,
        trim_group,
        blast,
        output,
    })
}

fn create_boolean_shatter(
    host: &mut impl GraphHost,
    container: NodeId,
    source: NodeId,
    cutter_tool: NodeId,
) -> Result<NodeId> {
    let boolean = create_stage(
        host,
        container,
        "boolean",
        Some("boolean_shattter"),
        &[InputSource::Node(source), InputSource::Node(cutter_tool)],
    )?;
    host.set_param(boolean, "bsurface", ParamValue::String("surface".into()))?;
    host.set_param(boolean, "booleanop", ParamValue::String("shatter".into()))?;
    host.set_display_flag(boolean)?;
    Ok(boolean)
}

fn create_assemble(host: &mut impl GraphHost, container: NodeId, boolean: NodeId) -> Result<NodeId> {
    let assemble = create_stage(
        host,
        container,
        "assemble",
        None,
        &[InputSource::Node(boolean)],
    )?;
    host.set_display_flag(assemble)?;
    Ok(assemble)
}
