use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::prelude::*;

/// What to do when the user cancels the geometry path prompt.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub enum CancelPolicy {
    /// Stop before anything is created.
    #[default]
    Abort,
    /// Continue as if an empty path had been given.
    UseTestGeometry,
}

/// The procedural box used when no geometry file is given.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct TestGeometryConfig {
    pub scale: f32,
    pub divisions: [i32; 3],
}

impl Default for TestGeometryConfig {
    fn default() -> Self {
        Self {
            scale: 5.0,
            divisions: [10, 10, 10],
        }
    }
}

/// Initial value and slider range of an exposed control.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct ControlConfig {
    pub default: i64,
    pub ui_range: (i64, i64),
}

/// Tunable constants of the cutter tool. The defaults build the tool exactly
/// as it has always been built; a RON file can override any subset.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CutterToolConfig {
    pub container_name: String,
    pub tool_name: String,
    pub test_geometry: TestGeometryConfig,
    pub cutter_count: ControlConfig,
    pub detail: ControlConfig,
    /// Padding added on every side of the input's bounding box.
    pub bound_padding: f32,
    pub iso_divisions: i64,
    /// Rows and columns of the cutting grid.
    pub grid_resolution: i64,
    pub trim_group: String,
    pub on_cancel: CancelPolicy,
}

impl Default for CutterToolConfig {
    fn default() -> Self {
        Self {
            container_name: "fractured_geo".into(),
            tool_name: "cutterTool".into(),
            test_geometry: Default::default(),
            cutter_count: ControlConfig {
                default: 1,
                ui_range: (10, 100),
            },
            detail: ControlConfig {
                default: 1,
                ui_range: (1, 100),
            },
            bound_padding: 1.0,
            iso_divisions: 100,
            grid_resolution: 300,
            trim_group: "trim_area".into(),
            on_cancel: CancelPolicy::Abort,
        }
    }
}

impl CutterToolConfig {
    pub fn load_from_string(data: &str) -> Result<Self> {
        Ok(ron::from_str(data)?)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read config file {}", path.display()))?;
        Self::load_from_string(&data)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }
}
