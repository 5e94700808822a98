use crate::cutter_tool::{
    build_cutter_tool, CancelPolicy, CutterToolConfig, CutterToolHandles, GeometrySource,
    CUTTER_NUM, DETAIL_VALUE,
};
use crate::expression::SymbolRef;
use crate::graph::ExposedControl;
use crate::prelude::*;
use crate::prompt::{FixedPrompt, PromptResponse, UserPrompt};

fn build_with_path(path: &str) -> (SceneGraph, CutterToolHandles) {
    let mut graph = SceneGraph::new();
    let handles = build_cutter_tool(
        &mut graph,
        &mut FixedPrompt::confirm(path),
        &CutterToolConfig::default(),
    )
    .unwrap();
    (graph, handles)
}

fn string(s: &str) -> ParamValue {
    ParamValue::String(s.into())
}

fn expr_at<'a>(graph: &'a SceneGraph, node: NodeId, param: &str) -> &'a Expression {
    graph
        .param(node, param)
        .and_then(|v| v.as_expression())
        .unwrap_or_else(|| panic!("{}/{param} is not an expression", graph.path(node)))
}

/// Every (node, param) pair in the scene whose value is an expression.
fn all_expressions(graph: &SceneGraph) -> Vec<(NodeId, String, Expression)> {
    graph
        .nodes
        .iter()
        .flat_map(|(id, node)| {
            node.params.iter().filter_map(move |(name, value)| {
                value.as_expression().map(|e| (id, name.clone(), e.clone()))
            })
        })
        .collect()
}

#[test]
pub fn test_empty_path_builds_test_box() {
    let (graph, handles) = build_with_path("");
    let bx = match handles.source {
        GeometrySource::TestBox(bx) => bx,
        other => panic!("Expected a test box, got {other:?}"),
    };
    assert_eq!(graph.path(bx), "/obj/fractured_geo/box1");
    assert_eq!(graph.param(bx, "scale"), Some(&ParamValue::Float(5.0)));
    assert_eq!(
        graph.param(bx, "divrate"),
        Some(&ParamValue::IntVector(IVec3::new(10, 10, 10)))
    );
    assert_eq!(graph.param(bx, "type"), Some(&string("polymesh")));
    assert!(graph.children_of_type(handles.container, "file").is_empty());
}

#[test]
pub fn test_path_builds_file_reference() {
    for path in ["/tmp/mesh.obj", "relative/rock.bgeo", "  spaced name.fbx"] {
        let (graph, handles) = build_with_path(path);
        let file = match &handles.source {
            GeometrySource::File { node, path: p } => {
                assert_eq!(p, path);
                *node
            }
            other => panic!("Expected a file node, got {other:?}"),
        };
        assert_eq!(graph.param(file, "file"), Some(&string(path)));
        assert!(graph.children_of_type(handles.container, "box").is_empty());
        assert_eq!(graph.input(handles.cutter_tool, 0), Some(InputSource::Node(file)));
        assert_eq!(graph.input(handles.boolean, 0), Some(InputSource::Node(file)));
    }
}

#[test]
pub fn test_exposed_controls() {
    let (graph, handles) = build_with_path("");
    let tool = &graph.nodes[handles.cutter_tool];
    assert_eq!(graph.path(handles.cutter_tool), "/obj/fractured_geo/cutterTool");

    let names = tool.controls.iter().map(|c| c.name.as_str()).collect_vec();
    assert_eq!(names, vec![CUTTER_NUM, DETAIL_VALUE]);

    let cutter_num = tool.control(CUTTER_NUM).unwrap();
    assert_eq!(
        cutter_num,
        &ExposedControl {
            name: CUTTER_NUM.into(),
            label: "Number of Cutters".into(),
            default: 1,
            ui_range: (10, 100),
            min: None,
            max: None,
            folder: Some("Cutter Tool".into()),
        }
    );
    let detail = tool.control(DETAIL_VALUE).unwrap();
    assert_eq!(detail.default, 1);
    assert_eq!(detail.ui_range, (1, 100));
    assert_eq!(detail.max, None);

    assert_eq!(graph.param(handles.cutter_tool, CUTTER_NUM), Some(&ParamValue::Int(1)));
    assert_eq!(graph.param(handles.cutter_tool, DETAIL_VALUE), Some(&ParamValue::Int(1)));
}

#[test]
pub fn test_stage_chain() {
    let (graph, handles) = build_with_path("");
    let s = handles.stages;
    let node = InputSource::Node;

    let names = s.all().iter().map(|&id| graph.nodes[id].name.clone()).collect_vec();
    assert_eq!(
        names,
        vec![
            "GEO_INPUT",
            "bound1",
            "isooffset1",
            "scatter1",
            "attribrandomize1",
            "grid1",
            "copytopoints1",
            "noise_low_freq",
            "noise_high_freq",
            "trimArea_group",
            "blast1",
            "output1",
        ]
    );
    assert_eq!(graph.children(handles.cutter_tool), &s.all());

    assert_eq!(graph.input(s.geo_input, 0), Some(InputSource::SubnetInput(0)));
    assert_eq!(graph.input(s.bound, 0), Some(node(s.geo_input)));
    assert_eq!(graph.input(s.iso_offset, 0), Some(node(s.bound)));
    assert_eq!(graph.input(s.scatter, 0), Some(node(s.iso_offset)));
    assert_eq!(graph.input(s.randomize, 0), Some(node(s.scatter)));
    assert!(graph.nodes[s.grid].inputs.is_empty());
    assert_eq!(graph.input(s.copy_to_points, 0), Some(node(s.grid)));
    assert_eq!(graph.input(s.copy_to_points, 1), Some(node(s.randomize)));
    assert_eq!(graph.input(s.noise_low_freq, 0), Some(node(s.copy_to_points)));
    assert_eq!(graph.input(s.noise_high_freq, 0), Some(node(s.noise_low_freq)));
    assert_eq!(graph.input(s.trim_group, 0), Some(node(s.noise_high_freq)));
    assert_eq!(graph.input(s.trim_group, 1), Some(node(s.bound)));
    assert_eq!(graph.input(s.blast, 0), Some(node(s.trim_group)));
    assert_eq!(graph.input(s.output, 0), Some(node(s.blast)));
}

#[test]
pub fn test_stage_params() {
    let (graph, handles) = build_with_path("");
    let s = handles.stages;

    let pad = Some(ParamValue::Vector(Vec3::ONE));
    assert_eq!(graph.param(s.bound, "minpad").cloned(), pad);
    assert_eq!(graph.param(s.bound, "maxpad").cloned(), pad);
    assert_eq!(graph.param(s.iso_offset, "samplediv"), Some(&ParamValue::Int(100)));
    assert_eq!(graph.param(s.randomize, "name"), Some(&string("N")));
    assert_eq!(graph.param(s.randomize, "distribution"), Some(&string("uniformorient")));
    assert_eq!(graph.param(s.grid, "rows"), Some(&ParamValue::Int(300)));
    assert_eq!(graph.param(s.grid, "cols"), Some(&ParamValue::Int(300)));
    assert_eq!(graph.param(s.noise_low_freq, "attribs"), Some(&string("P")));
    assert_eq!(graph.param(s.noise_low_freq, "centernoise"), Some(&ParamValue::Toggle(true)));
    assert_eq!(graph.param(s.noise_high_freq, "centernoise"), Some(&ParamValue::Toggle(true)));

    assert_eq!(graph.param(s.trim_group, "groupname"), Some(&string("trim_area")));
    assert_eq!(graph.param(s.trim_group, "grouptype"), Some(&string("point")));
    assert_eq!(graph.param(s.trim_group, "groupbase"), Some(&ParamValue::Toggle(false)));
    assert_eq!(graph.param(s.trim_group, "groupbounding"), Some(&ParamValue::Toggle(true)));
    assert_eq!(graph.param(s.trim_group, "boundtype"), Some(&string("usebobject")));

    assert_eq!(graph.param(s.blast, "group"), Some(&string("trim_area")));
    assert_eq!(graph.param(s.blast, "negate"), Some(&ParamValue::Toggle(true)));

    assert_eq!(graph.param(handles.boolean, "bsurface"), Some(&string("surface")));
    assert_eq!(graph.param(handles.boolean, "booleanop"), Some(&string("shatter")));
}

#[test]
pub fn test_stage_expressions() {
    let (graph, handles) = build_with_path("");
    let s = handles.stages;

    let npts = expr_at(&graph, s.scatter, "npts");
    assert_eq!(npts.source(), r#"ch("../cutterNum")"#);
    assert!(npts.reads_channel(CUTTER_NUM));
    assert_eq!(
        graph.resolve_relative(s.scatter, ".."),
        Some(handles.cutter_tool)
    );

    for param in ["sizex", "sizey"] {
        let size = expr_at(&graph, s.grid, param);
        assert_eq!(size.source(), r#"bbox("../bound1/", D_XSIZE) * 2"#);
        match size.references() {
            [SymbolRef::Bounds { node_path, .. }] => {
                assert_eq!(graph.resolve_relative(s.grid, node_path), Some(s.bound))
            }
            other => panic!("Unexpected references {other:?}"),
        }
    }

    for (node, param) in [
        (s.noise_low_freq, "elementsize"),
        (s.noise_high_freq, "elementsize"),
        (s.noise_high_freq, "height"),
    ] {
        let size = expr_at(&graph, node, param);
        assert!(size.reads_channel(DETAIL_VALUE));
        assert!(size.reads_bounds());
        assert!(!size.reads_channel(CUTTER_NUM));
    }
}

#[test]
pub fn test_cutter_count_is_only_read_by_scatter() {
    let (mut graph, handles) = build_with_path("");

    let readers = all_expressions(&graph)
        .into_iter()
        .filter(|(_, _, expr)| expr.reads_channel(CUTTER_NUM))
        .map(|(node, param, _)| (node, param))
        .collect_vec();
    assert_eq!(readers, vec![(handles.stages.scatter, "npts".to_string())]);

    let literals = |graph: &SceneGraph| {
        graph
            .nodes
            .iter()
            .filter(|(id, _)| *id != handles.cutter_tool)
            .map(|(id, node)| {
                let literals = node
                    .params
                    .iter()
                    .filter(|(_, v)| v.is_literal())
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect_vec();
                (id, literals)
            })
            .collect::<HashMap<_, _>>()
    };
    let before = literals(&graph);
    graph
        .set_param(handles.cutter_tool, CUTTER_NUM, ParamValue::Int(50))
        .unwrap();
    assert_eq!(literals(&graph), before);
    assert_eq!(graph.param(handles.cutter_tool, CUTTER_NUM), Some(&ParamValue::Int(50)));
    graph.validate_network(handles.container).unwrap();
}

#[test]
pub fn test_assemble_is_displayed() {
    for path in ["", "/tmp/mesh.obj"] {
        let (graph, handles) = build_with_path(path);
        assert_eq!(graph.display_node(handles.container), Some(handles.assemble));
        assert!(!graph.nodes[handles.boolean].display);
        assert_eq!(
            graph.input(handles.assemble, 0),
            Some(InputSource::Node(handles.boolean))
        );
        assert_eq!(
            graph.input(handles.boolean, 1),
            Some(InputSource::Node(handles.cutter_tool))
        );
        assert_eq!(graph.path(handles.boolean), "/obj/fractured_geo/boolean_shattter");
    }
}

#[test]
pub fn test_built_network_is_valid() {
    for path in ["", "/does/not/exist.obj"] {
        let (graph, handles) = build_with_path(path);
        graph.validate_network(graph.root()).unwrap();
        assert_eq!(graph.children(graph.root()), &[handles.container]);
        assert_eq!(graph.children(handles.container).len(), 4);
    }
}

#[test]
pub fn test_layout_assigns_distinct_positions() {
    let (graph, handles) = build_with_path("");
    for network in [handles.container, handles.cutter_tool] {
        let positions = graph
            .children(network)
            .iter()
            .map(|&id| graph.nodes[id].position)
            .collect_vec();
        for (i, a) in positions.iter().enumerate() {
            for b in &positions[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
    let s = handles.stages;
    assert!(graph.nodes[s.output].position.y > graph.nodes[s.geo_input].position.y);
}

#[test]
pub fn test_building_twice_conflicts() {
    let mut graph = SceneGraph::new();
    let config = CutterToolConfig::default();
    let first = build_cutter_tool(&mut graph, &mut FixedPrompt::confirm(""), &config).unwrap();
    let num_nodes = graph.nodes.len();

    let err = build_cutter_tool(&mut graph, &mut FixedPrompt::confirm(""), &config).unwrap_err();
    assert!(err.to_string().contains("already exists"));
    assert_eq!(graph.nodes.len(), num_nodes);
    assert_eq!(graph.children(graph.root()), &[first.container]);
}

#[test]
pub fn test_cancel() {
    let mut graph = SceneGraph::new();
    let config = CutterToolConfig::default();
    assert!(build_cutter_tool(&mut graph, &mut FixedPrompt::cancel(), &config).is_err());
    assert!(graph.children(graph.root()).is_empty());

    let config = CutterToolConfig {
        on_cancel: CancelPolicy::UseTestGeometry,
        ..Default::default()
    };
    let handles = build_cutter_tool(&mut graph, &mut FixedPrompt::cancel(), &config).unwrap();
    assert!(matches!(handles.source, GeometrySource::TestBox(_)));
}

#[test]
pub fn test_partial_build_is_left_in_place() {
    let mut graph = SceneGraph::new();
    // Subnet named like the container's box: creation fails midway.
    let config = CutterToolConfig {
        tool_name: "box1".into(),
        ..Default::default()
    };
    assert!(build_cutter_tool(&mut graph, &mut FixedPrompt::confirm(""), &config).is_err());
    let container = graph.node_at_path("/obj/fractured_geo").unwrap();
    assert_eq!(graph.children(container).len(), 1);
    assert!(graph.validate_network(container).is_ok());
}

/// Answers with an empty path and remembers every message it was shown.
#[derive(Default)]
struct RecordingPrompt {
    messages: Vec<String>,
}

impl UserPrompt for RecordingPrompt {
    fn read_input(&mut self, message: &str, _buttons: &[&str]) -> Result<PromptResponse> {
        self.messages.push(message.to_string());
        Ok(PromptResponse::Confirmed(String::new()))
    }
}

#[test]
pub fn test_prompt_names_the_controls_node() {
    let mut graph = SceneGraph::new();
    let mut prompt = RecordingPrompt::default();
    build_cutter_tool(&mut graph, &mut prompt, &CutterToolConfig::default()).unwrap();
    assert_eq!(prompt.messages.len(), 1);
    assert!(prompt.messages[0].contains("on the node 'cutterTool'"));

    let mut graph = SceneGraph::new();
    let mut prompt = RecordingPrompt::default();
    let config = CutterToolConfig {
        tool_name: "shatterControls".into(),
        ..Default::default()
    };
    let handles = build_cutter_tool(&mut graph, &mut prompt, &config).unwrap();
    assert!(prompt.messages[0].contains("on the node 'shatterControls'"));
    assert!(!prompt.messages[0].contains("cutterTool"));
    assert_eq!(
        graph.node_at_path("/obj/fractured_geo/shatterControls"),
        Some(handles.cutter_tool)
    );
}
