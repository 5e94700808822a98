// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::graph::ParamValue;
use crate::prelude::*;

/// The kinds of parameters an operator can declare.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ParamKind {
    Int,
    Float,
    Toggle,
    String,
    /// A string parameter restricted to one of the given tokens.
    Menu(&'static [&'static str]),
    Vector,
    IntVector,
}

impl ParamKind {
    /// Returns whether the given value can be stored in a parameter of this
    /// kind. Expressions are only accepted by scalar parameters.
    pub fn accepts(&self, value: &ParamValue) -> bool {
        match (self, value) {
            (ParamKind::Int, ParamValue::Int(_)) => true,
            (ParamKind::Float, ParamValue::Float(_) | ParamValue::Int(_)) => true,
            (ParamKind::Int | ParamKind::Float, ParamValue::Expression(_)) => true,
            (ParamKind::Toggle, ParamValue::Toggle(_)) => true,
            (ParamKind::String, ParamValue::String(_)) => true,
            (ParamKind::Menu(tokens), ParamValue::String(s)) => tokens.contains(&s.as_str()),
            (ParamKind::Vector, ParamValue::Vector(_)) => true,
            (ParamKind::IntVector, ParamValue::IntVector(_)) => true,
            _ => false,
        }
    }
}

/// The definition of a parameter inside an operator definition.
#[derive(Copy, Clone, Debug)]
pub struct ParamDefinition {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// An operator the host knows how to create, identified by its type tag.
#[derive(Clone, Debug)]
pub struct OperatorDefinition {
    /// The type tag passed to `create_node`
    pub op_type: &'static str,
    /// The name that will be displayed to users
    pub label: &'static str,
    /// Containers hold a child network. Only containers can be parents.
    pub is_container: bool,
    /// Input slots below this index must be wired for the node to cook.
    pub required_inputs: usize,
    /// Total number of input slots.
    pub max_inputs: usize,
    pub params: &'static [ParamDefinition],
}

impl OperatorDefinition {
    pub fn param(&self, name: &str) -> Option<&ParamDefinition> {
        self.params.iter().find(|p| p.name == name)
    }
}

const fn param(name: &'static str, kind: ParamKind) -> ParamDefinition {
    ParamDefinition { name, kind }
}

const fn op(
    op_type: &'static str,
    label: &'static str,
    required_inputs: usize,
    max_inputs: usize,
    params: &'static [ParamDefinition],
) -> OperatorDefinition {
    OperatorDefinition {
        op_type,
        label,
        is_container: false,
        required_inputs,
        max_inputs,
        params,
    }
}

const fn container(
    op_type: &'static str,
    label: &'static str,
    max_inputs: usize,
) -> OperatorDefinition {
    OperatorDefinition {
        op_type,
        label,
        is_container: true,
        required_inputs: 0,
        max_inputs,
        params: &[],
    }
}

use ParamKind::{Float, Int, IntVector, Menu, Toggle, Vector};

const BOX_TYPES: &[&str] = &["primitive", "polymesh", "mesh", "polysoup"];
const DISTRIBUTIONS: &[&str] = &["uniform", "normal", "exponential", "direction", "uniformorient"];
const GROUP_TYPES: &[&str] = &["primitive", "point", "edge", "vertex"];
const BOUND_TYPES: &[&str] = &["usebbox", "usebsphere", "usebobject", "usebvolume"];
const SURFACE_TYPES: &[&str] = &["solid", "surface"];
const BOOLEAN_OPS: &[&str] = &[
    "union", "intersect", "subtract", "shatter", "custom", "seam", "detail",
];

const BOX_PARAMS: &[ParamDefinition] = &[
    param("type", Menu(BOX_TYPES)),
    param("scale", Float),
    param("divrate", IntVector),
];
const FILE_PARAMS: &[ParamDefinition] = &[param("file", ParamKind::String)];
const BOUND_PARAMS: &[ParamDefinition] = &[param("minpad", Vector), param("maxpad", Vector)];
const ISOOFFSET_PARAMS: &[ParamDefinition] = &[param("samplediv", Int)];
const SCATTER_PARAMS: &[ParamDefinition] = &[param("npts", Int)];
const RANDOMIZE_PARAMS: &[ParamDefinition] = &[
    param("name", ParamKind::String),
    param("distribution", Menu(DISTRIBUTIONS)),
];
const GRID_PARAMS: &[ParamDefinition] = &[
    param("sizex", Float),
    param("sizey", Float),
    param("rows", Int),
    param("cols", Int),
];
const ATTRIBNOISE_PARAMS: &[ParamDefinition] = &[
    param("attribs", ParamKind::String),
    param("elementsize", Float),
    param("centernoise", Toggle),
];
const MOUNTAIN_PARAMS: &[ParamDefinition] = &[
    param("height", Float),
    param("elementsize", Float),
    param("centernoise", Toggle),
];
const GROUPCREATE_PARAMS: &[ParamDefinition] = &[
    param("groupname", ParamKind::String),
    param("grouptype", Menu(GROUP_TYPES)),
    param("groupbase", Toggle),
    param("groupbounding", Toggle),
    param("boundtype", Menu(BOUND_TYPES)),
];
const BLAST_PARAMS: &[ParamDefinition] = &[
    param("group", ParamKind::String),
    param("negate", Toggle),
];
const BOOLEAN_PARAMS: &[ParamDefinition] = &[
    param("asurface", Menu(SURFACE_TYPES)),
    param("bsurface", Menu(SURFACE_TYPES)),
    param("booleanop", Menu(BOOLEAN_OPS)),
];

/// Every operator known to the in-memory host.
pub static OPERATORS: &[OperatorDefinition] = &[
    container("geo", "Geometry", 0),
    container("subnet", "Subnetwork", 4),
    op("box", "Box", 0, 1, BOX_PARAMS),
    op("file", "File", 0, 1, FILE_PARAMS),
    op("null", "Null", 1, 1, &[]),
    op("bound", "Bound", 1, 1, BOUND_PARAMS),
    op("isooffset", "IsoOffset", 1, 1, ISOOFFSET_PARAMS),
    op("scatter", "Scatter", 1, 1, SCATTER_PARAMS),
    op("attribrandomize", "Attribute Randomize", 1, 1, RANDOMIZE_PARAMS),
    op("grid", "Grid", 0, 0, GRID_PARAMS),
    op("copytopoints", "Copy to Points", 2, 2, &[]),
    op("attribnoise", "Attribute Noise", 1, 1, ATTRIBNOISE_PARAMS),
    op("mountain", "Mountain", 1, 1, MOUNTAIN_PARAMS),
    op("groupcreate", "Group Create", 1, 2, GROUPCREATE_PARAMS),
    op("blast", "Blast", 1, 1, BLAST_PARAMS),
    op("output", "Output", 1, 1, &[]),
    op("boolean", "Boolean", 1, 2, BOOLEAN_PARAMS),
    op("assemble", "Assemble", 1, 1, &[]),
];

/// Looks up the definition for an operator type tag.
pub fn operator(op_type: &str) -> Result<&'static OperatorDefinition> {
    OPERATORS
        .iter()
        .find(|def| def.op_type == op_type)
        .ok_or_else(|| anyhow!("Unknown operator type '{op_type}'"))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lookup() {
        assert!(operator("scatter").is_ok());
        assert!(operator("subnet").unwrap().is_container);
        assert!(operator("voronoifracture").is_err());

        let op_types = OPERATORS.iter().map(|def| def.op_type).collect::<HashSet<_>>();
        assert_eq!(op_types.len(), OPERATORS.len(), "Duplicate operator definitions");
    }

    #[test]
    fn test_accepts() {
        let kind = operator("boolean").unwrap().param("booleanop").unwrap().kind;
        assert!(kind.accepts(&ParamValue::String("shatter".into())));
        assert!(!kind.accepts(&ParamValue::String("smash".into())));
        assert!(!kind.accepts(&ParamValue::Int(3)));

        let expr = Expression::parse(r#"ch("../cutterNum")"#).unwrap();
        assert!(ParamKind::Int.accepts(&ParamValue::Expression(expr.clone())));
        assert!(!ParamKind::String.accepts(&ParamValue::Expression(expr)));
        assert!(ParamKind::Float.accepts(&ParamValue::Int(5)));
        assert!(!ParamKind::Int.accepts(&ParamValue::Float(5.0)));
    }
}
