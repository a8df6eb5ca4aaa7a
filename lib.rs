/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Tech-tree editor core.
//!
//! - `graph`: node model and the prerequisite validator
//! - `render`: viewport virtualization, connection geometry and metrics
//! - `app`: the state store all surfaces read and write through
//! - `input`: the canvas controller (camera, drag, keyboard navigation)
//! - `persistence`: snapshot blob stores
//! - `services`: clock, timers and event buses shared by the above

pub mod app;
pub mod config;
pub mod graph;
pub mod input;
pub mod persistence;
pub mod render;
pub mod services;

pub use app::{EditorState, StateChangeEvent, StatePatch, StateStore};
pub use config::EditorConfig;
pub use graph::validator::GraphValidator;
pub use graph::{Node, NodeChanges, NodeId, NodeStatus};
pub use input::{CanvasController, ConfirmationRequest, DropOutcome, NavKey};
pub use render::{Connection, PerformanceMetrics, ViewportInfo, VirtualNode, Virtualizer};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
