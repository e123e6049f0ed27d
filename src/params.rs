//! # Plugin Parameters
//!
//! Parameters are the knobs the user sees in the DAW. Each parameter has:
//!
//! - A **unique string ID** (`#[id = "..."]`) that the host uses to
//!   save and recall presets. Once published, never change these IDs
//!   or existing presets will break.
//! - A **human-readable name** shown in the DAW's UI.
//! - A **range** (min, max, and optional skew).
//! - A **default value**.
//!
//! ## Why no parameter smoothers?
//!
//! The usual nih-plug pattern is to attach a per-sample smoother to every
//! parameter, but this engine reads exactly one parameter snapshot per
//! block (see [`crate::dsp::engine::EngineParams`]) and performs its own
//! ramping inside the delay write, delay read, and wet/dry mix.
//! Host-side smoothing on top of that would smooth twice and blur the
//! one-snapshot-per-block contract, so these parameters are deliberately
//! raw.

use std::sync::Arc;

use nih_plug::prelude::*;

/// All user-facing parameters for the Pulse Delay plugin.
///
/// The `#[derive(Params)]` macro generates the code that registers these
/// with the host, serializes them for presets, and maps them to
/// automation lanes. This derive is the *only* persisted state in the
/// plugin — the delay buffers themselves are never saved.
#[derive(Params)]
pub struct PluginParams {
    /// **Timing** — what fraction of a beat the delay buffer spans.
    ///
    /// The delay buffer length is `sample_rate * (60 / bpm) * timing`,
    /// so at 120 BPM a timing of 1/4 gives a quarter-beat buffer.
    /// Stepped in 1/16-beat increments from 1/16 to a full beat.
    #[id = "timing"]
    pub timing: FloatParam,

    /// **Low Cut** — cutoff of the 4th-order Butterworth high-pass that
    /// the input passes through before entering the delay.
    ///
    /// At the 20 Hz minimum the filter passes essentially everything.
    /// There is no ordering constraint against High Cut: setting Low Cut
    /// above High Cut yields a band-reject-like response and is accepted
    /// as-is.
    #[id = "low cut"]
    pub low_cut: FloatParam,

    /// **High Cut** — cutoff of the 4th-order Butterworth low-pass that
    /// follows the high-pass. At the 20 kHz maximum it passes
    /// essentially everything.
    #[id = "high cut"]
    pub high_cut: FloatParam,

    /// **Gain** — level of the delayed (wet) signal added onto the dry
    /// signal. Ramped across each block by the mixer so moving the knob
    /// never produces a click.
    #[id = "gain"]
    pub gain: FloatParam,
}

impl Default for PluginParams {
    fn default() -> Self {
        Self {
            timing: FloatParam::new(
                "Timing",
                0.125, // Default: 1/8 beat
                FloatRange::Linear {
                    min: 0.0625,
                    max: 1.0,
                },
            )
            // Snap to the 1/16-beat grid; intermediate divisions aren't
            // musically meaningful for this effect.
            .with_step_size(0.0625)
            // Display as a fraction of a beat: 0.125 → "2/16".
            .with_value_to_string(Arc::new(|value| {
                format!("{}/16", (value * 16.0).round() as i32)
            }))
            .with_string_to_value(Arc::new(|string| {
                let string = string.trim();
                if let Some(numerator) = string.strip_suffix("/16") {
                    numerator.trim().parse::<f32>().ok().map(|n| n / 16.0)
                } else {
                    string.parse::<f32>().ok()
                }
            })),

            low_cut: FloatParam::new(
                "Low Cut",
                20.0, // Default: fully open (high-pass effectively off)
                FloatRange::Skewed {
                    min: 20.0,
                    max: 20_000.0,
                    // Human frequency perception is roughly logarithmic,
                    // so give the lower decades more knob travel.
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_unit(" Hz")
            .with_step_size(1.0),

            high_cut: FloatParam::new(
                "High Cut",
                20_000.0, // Default: fully open (low-pass effectively off)
                FloatRange::Skewed {
                    min: 20.0,
                    max: 20_000.0,
                    factor: FloatRange::skew_factor(-2.0),
                },
            )
            .with_unit(" Hz")
            .with_step_size(1.0),

            gain: FloatParam::new(
                "Gain",
                0.5, // Default: echoes at half level
                FloatRange::Linear { min: 0.1, max: 1.0 },
            )
            .with_value_to_string(formatters::v2s_f32_percentage(1))
            .with_string_to_value(formatters::s2v_f32_percentage())
            .with_unit("%"),
        }
    }
}
