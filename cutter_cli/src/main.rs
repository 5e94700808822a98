// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use anyhow::Result;
use clap::Parser;
use cutter_engine::cutter_tool::{build_cutter_tool, CutterToolConfig};
use cutter_engine::graph::{GraphHost, SceneGraph};
use cutter_engine::prompt::{FixedPrompt, TerminalPrompt, UserPrompt};

/// Command line arguments
pub mod cli_args;

fn run(args: cli_args::Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => CutterToolConfig::load_from_file(path)?,
        None => CutterToolConfig::default(),
    };
    log::debug!("Using {config:?}");

    let mut prompt: Box<dyn UserPrompt> = match args.path {
        Some(path) => Box::new(FixedPrompt::confirm(path)),
        None => Box::new(TerminalPrompt::new(
            std::io::stdin().lock(),
            std::io::stderr(),
        )),
    };

    let mut scene = SceneGraph::new();
    let handles = build_cutter_tool(&mut scene, &mut prompt, &config)?;

    if !args.no_validate {
        scene.validate_network(handles.container)?;
    }

    print!("{}", scene.describe(scene.root()));

    if let Some(save_path) = &args.save {
        scene.save_to_file(save_path)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    // Setup logging
    env_logger::init();

    run(cli_args::Args::parse())
}
