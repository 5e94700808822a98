// Copyright (C) 2022 setzer22 and contributors
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/// Some useful re-exports
pub mod prelude;

/// The node graph host: scene storage, wiring and the `GraphHost` trait.
pub mod graph;

/// Definitions for every operator type the host knows how to create.
pub mod operators;

/// Parameter expressions and the symbols they reference.
pub mod expression;

/// Blocking user interaction.
pub mod prompt;

/// The boolean cutter fracture tool.
pub mod cutter_tool;

#[cfg(test)]
mod builder_tests;
