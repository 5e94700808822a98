pub use anyhow::{anyhow, bail, Context, Result};

pub use glam::{IVec3, Vec2, Vec3};

pub use itertools::Itertools;
pub use std::collections::{BTreeMap, HashMap, HashSet};

pub use crate::expression::Expression;
pub use crate::graph::{GraphHost, InputSource, NodeId, ParamValue, SceneGraph};
