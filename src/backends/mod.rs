// SPDX-License-Identifier: GPL-3.0-only

//! Collaborators at the edges of the detection pipeline
//!
//! - [`camera`]: frame acquisition (V4L2 webcams, still images)
//! - [`announce`]: spoken announcements (TTS command, log, background thread)
//!
//! ```text
//! ┌─────────────┐   frames   ┌──────────────────┐  label-sets  ┌─────────────┐
//! │   Camera    │ ─────────▶ │ Detection worker │ ───────────▶ │  Announcer  │
//! │ (V4L2/imgs) │            │                  │              │ (TTS / log) │
//! └─────────────┘            └──────────────────┘              └─────────────┘
//! ```

pub mod announce;
pub mod camera;
