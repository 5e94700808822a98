// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt::Display;

use crate::prelude::*;

/// One of the bounding box queries understood by `bbox(...)`. The token is
/// written as `D_<NAME>` in expression text.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum BoundsComponent {
    XMin,
    XMax,
    YMin,
    YMax,
    ZMin,
    ZMax,
    XSize,
    YSize,
    ZSize,
}

impl BoundsComponent {
    pub fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "D_XMIN" => Self::XMin,
            "D_XMAX" => Self::XMax,
            "D_YMIN" => Self::YMin,
            "D_YMAX" => Self::YMax,
            "D_ZMIN" => Self::ZMin,
            "D_ZMAX" => Self::ZMax,
            "D_XSIZE" => Self::XSize,
            "D_YSIZE" => Self::YSize,
            "D_ZSIZE" => Self::ZSize,
            _ => return None,
        })
    }

    pub fn token(&self) -> &'static str {
        match self {
            Self::XMin => "D_XMIN",
            Self::XMax => "D_XMAX",
            Self::YMin => "D_YMIN",
            Self::YMax => "D_YMAX",
            Self::ZMin => "D_ZMIN",
            Self::ZMax => "D_ZMAX",
            Self::XSize => "D_XSIZE",
            Self::YSize => "D_YSIZE",
            Self::ZSize => "D_ZSIZE",
        }
    }
}

/// A symbol read by an expression when the host evaluates it. Node paths are
/// kept exactly as written, relative to the node owning the expression.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SymbolRef {
    /// `ch("../cutterNum")`: the value of a parameter on some node.
    Channel { node_path: String, param: String },
    /// `bbox("../bound1/", D_XSIZE)`: the bounding box of a node's geometry.
    Bounds {
        node_path: String,
        component: BoundsComponent,
    },
    /// `bbox(opinputpath(".", 0), D_YMAX)`: the bounding box of whatever is
    /// wired into one of the owner's own inputs.
    InputBounds {
        input: usize,
        component: BoundsComponent,
    },
    /// A bare `opinputpath(".", n)`.
    Input { input: usize },
}

/// A formula evaluated lazily by the host at cook time. Only the source text
/// is stored; the references are extracted once, on construction, so callers
/// can check that they resolve without evaluating anything.
#[derive(Clone, PartialEq, Debug)]
pub struct Expression {
    source: String,
    references: Vec<SymbolRef>,
}

impl Expression {
    pub fn parse(source: impl Into<String>) -> Result<Self> {
        let source = source.into();
        let references = parser::scan_references(&source)?;
        Ok(Self { source, references })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn references(&self) -> &[SymbolRef] {
        &self.references
    }

    /// Returns whether any `ch(...)` in this expression reads a parameter
    /// named `param`, regardless of which node it is read from.
    pub fn reads_channel(&self, param: &str) -> bool {
        self.references
            .iter()
            .any(|r| matches!(r, SymbolRef::Channel { param: p, .. } if p == param))
    }

    /// Returns whether this expression depends on some node's bounding box.
    pub fn reads_bounds(&self) -> bool {
        self.references.iter().any(|r| {
            matches!(
                r,
                SymbolRef::Bounds { .. } | SymbolRef::InputBounds { .. }
            )
        })
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

mod parser {
    use super::{BoundsComponent, SymbolRef};
    use crate::prelude::*;

    use nom::{
        branch::alt,
        bytes::complete::{tag, take_while},
        character::complete::{alpha1, char, digit1, multispace0},
        combinator::{map, map_res, recognize, verify},
        sequence::{delimited, pair, preceded, tuple},
        IResult, Parser,
    };

    /// Function names that introduce a reference. Text that calls one of
    /// these but does not parse as a reference is rejected.
    const REFERENCE_CALLS: &[&str] = &["ch", "bbox", "opinputpath"];

    fn quoted(input: &str) -> IResult<&str, &str> {
        delimited(char('"'), take_while(|c| c != '"'), char('"')).parse(input)
    }

    fn comma(input: &str) -> IResult<&str, char> {
        delimited(multispace0, char(','), multispace0).parse(input)
    }

    fn open_call<'a>(name: &'static str) -> impl FnMut(&'a str) -> IResult<&'a str, ()> {
        map(
            tuple((tag(name), multispace0, char('('), multispace0)),
            |_| (),
        )
    }

    fn close_call(input: &str) -> IResult<&str, char> {
        preceded(multispace0, char(')')).parse(input)
    }

    fn component(input: &str) -> IResult<&str, BoundsComponent> {
        map_res(recognize(pair(tag("D_"), alpha1)), |token: &str| {
            BoundsComponent::from_token(token).ok_or(())
        })
        .parse(input)
    }

    /// `opinputpath(".", n)`. Only inputs of the owner node itself are
    /// supported.
    fn input_path(input: &str) -> IResult<&str, usize> {
        map_res(
            tuple((
                open_call("opinputpath"),
                verify(quoted, |p: &str| p == "."),
                comma,
                digit1,
                close_call,
            )),
            |(_, _, _, idx, _): (_, _, _, &str, _)| idx.parse::<usize>(),
        )
        .parse(input)
    }

    fn channel(input: &str) -> IResult<&str, SymbolRef> {
        map_res(
            tuple((open_call("ch"), quoted, close_call)),
            |(_, path, _)| split_channel_path(path).ok_or(()),
        )
        .parse(input)
    }

    fn bounds(input: &str) -> IResult<&str, SymbolRef> {
        enum Target<'a> {
            Path(&'a str),
            Input(usize),
        }

        map(
            tuple((
                open_call("bbox"),
                alt((map(input_path, Target::Input), map(quoted, Target::Path))),
                comma,
                component,
                close_call,
            )),
            |(_, target, _, component, _)| match target {
                Target::Path(path) => SymbolRef::Bounds {
                    node_path: path.to_string(),
                    component,
                },
                Target::Input(input) => SymbolRef::InputBounds { input, component },
            },
        )
        .parse(input)
    }

    fn reference(input: &str) -> IResult<&str, SymbolRef> {
        alt((
            channel,
            bounds,
            map(input_path, |input| SymbolRef::Input { input }),
        ))
        .parse(input)
    }

    /// Splits `../cutterNum` into the node path `..` and the parameter name
    /// `cutterNum`. A path without slashes reads from the owner itself.
    fn split_channel_path(path: &str) -> Option<SymbolRef> {
        let (node_path, param) = match path.rsplit_once('/') {
            Some((node, param)) => (if node.is_empty() { "/" } else { node }, param),
            None => (".", path),
        };
        if param.is_empty() {
            return None;
        }
        Some(SymbolRef::Channel {
            node_path: node_path.to_string(),
            param: param.to_string(),
        })
    }

    fn starts_reference_call(input: &str) -> bool {
        REFERENCE_CALLS.iter().any(|name| {
            input
                .strip_prefix(name)
                .map_or(false, |rest| rest.trim_start().starts_with('('))
        })
    }

    pub fn scan_references(source: &str) -> Result<Vec<SymbolRef>> {
        let mut references = vec![];
        let mut rest = source;
        let mut prev: Option<char> = None;

        while let Some(c) = rest.chars().next() {
            let at_word_start = !prev.map_or(false, |p| p.is_alphanumeric() || p == '_');
            if at_word_start {
                if let Ok((remaining, symbol)) = reference(rest) {
                    references.push(symbol);
                    prev = Some(')');
                    rest = remaining;
                    continue;
                }
                if starts_reference_call(rest) {
                    bail!("Malformed reference in expression '{source}', near '{rest}'");
                }
            }
            prev = Some(c);
            rest = &rest[c.len_utf8()..];
        }

        Ok(references)
    }
}
