//! # DSP (Digital Signal Processing) Core
//!
//! The per-block signal path of the effect, framework-free and unit
//! tested in isolation:
//!
//! - **`filter`**: cascaded 4th-order Butterworth high-pass ("low cut")
//!   and low-pass ("high cut") built from biquad sections, with
//!   per-channel state.
//!
//! - **`delay_line`**: a circular per-channel sample buffer with
//!   block-oriented, ramped, wrap-splitting write and read.
//!
//! - **`mixer`**: the ramped dry/wet combination driven by the gain
//!   knob.
//!
//! - **`engine`**: ties the three together into the per-block
//!   orchestration the plugin shell calls, including tempo-to-samples
//!   conversion and the engine lifecycle.

pub mod delay_line;
pub mod engine;
pub mod filter;
pub mod mixer;
