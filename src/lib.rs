//! # Pulse Delay — An AU/VST3/CLAP Tempo-Synced Delay Plugin
//!
//! A delay effect whose buffer length follows the host tempo, built
//! with [nih-plug](https://github.com/robbert-vdh/nih-plug). Outputs
//! Audio Unit (AUv2), VST3, and CLAP formats from a single codebase.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──► [Low Cut HP] ──► [High Cut LP] ──┬──────────────── dry ──┐
//!            4th-order        4th-order      │                       │
//!            Butterworth      Butterworth    ▼                       │
//!                                     [Delay Buffer]                 │
//!                                 length = sr·(60/bpm)·timing        │
//!                                            │                       │
//!                              read head: 1 second behind write      │
//!                                            │                       ▼
//!                                            └── wet ── × gain ───►(+)──► Output
//! ```
//!
//! This file is only the host-facing shell: parameter plumbing, bus
//! layouts, transport snapshots, and the format export macros. All of
//! the audio processing lives in [`dsp::engine::BlockEngine`], which is
//! framework-free and tested on plain slices.

pub mod dsp;
mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::engine::{BlockEngine, EngineParams, TransportInfo};
use nih_plug::prelude::*;
use params::PluginParams;

/// The main plugin struct.
///
/// Parameters (`PluginParams`) are shared with the host via `Arc` and
/// can be read from any thread (the audio thread, the UI thread, the
/// host's automation thread). The engine is owned exclusively by the
/// audio thread and only touched in `initialize()`/`reset()`/
/// `process()`/`deactivate()`. That split keeps the design thread-safe
/// without locks: the only data crossing the boundary is the atomic
/// per-block parameter snapshot built in `process()`.
pub struct PulseDelay {
    params: Arc<PluginParams>,

    /// The current sample rate in Hz. Set in `initialize()`; used for
    /// the tail-length report (the read head trails by one second).
    sample_rate: f32,

    /// The whole signal path: filters, per-channel delay buffers,
    /// shared write cursor, wet/dry mixer.
    engine: BlockEngine,
}

impl Default for PulseDelay {
    fn default() -> Self {
        Self {
            params: Arc::new(PluginParams::default()),
            // Placeholder until the host reports the real configuration
            // in initialize().
            sample_rate: 44_100.0,
            engine: BlockEngine::new(),
        }
    }
}

impl Plugin for PulseDelay {
    const NAME: &'static str = "Pulse Delay";
    const VENDOR: &'static str = "Pulse Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // Supported audio channel layouts. The host picks the first layout
    // that matches the track configuration: stereo first, mono as the
    // fallback. Anything fancier is out of scope.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    // We don't use MIDI.
    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // The engine samples every parameter exactly once per block and
    // ramps internally, so splitting blocks at automation points would
    // buy nothing.
    const SAMPLE_ACCURATE_AUTOMATION: bool = false;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called when the plugin is loaded or the audio configuration
    /// changes. This is where the engine allocates its per-channel
    /// state: both the channel count and the sample rate are only known
    /// here.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        self.sample_rate = buffer_config.sample_rate;

        let num_channels = audio_io_layout
            .main_input_channels
            .map(|c| c.get() as usize)
            .unwrap_or(2);

        self.engine.prepare(
            f64::from(buffer_config.sample_rate),
            buffer_config.max_buffer_size as usize,
            num_channels,
        );

        nih_log!(
            "Prepared: {num_channels} channel(s) at {} Hz, blocks up to {}",
            buffer_config.sample_rate,
            buffer_config.max_buffer_size
        );

        true
    }

    /// Called when playback stops or the plugin is bypassed. Clears
    /// buffered echoes and filter memory so stale audio doesn't bleed
    /// into the next playback.
    fn reset(&mut self) {
        self.engine.reset();
    }

    /// The audio callback. Takes one tear-free snapshot of the four
    /// parameters and the transport tempo, then hands the whole block
    /// to the engine, which processes it in place.
    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        let params = EngineParams {
            timing_divisor: self.params.timing.value(),
            low_cut_hz: self.params.low_cut.value(),
            high_cut_hz: self.params.high_cut.value(),
            gain: self.params.gain.value(),
        };
        let transport = TransportInfo {
            bpm: context.transport().tempo,
        };

        self.engine.process_block(buffer.as_slice(), transport, params);

        // The read head trails the write head by one second, so that's
        // how long the host must keep calling process() after the
        // input goes silent for the last echo to play out.
        ProcessStatus::Tail(self.sample_rate.round() as u32)
    }

    /// Counterpart of `initialize()`: the host is done processing, so
    /// the engine can drop its buffers.
    fn deactivate(&mut self) {
        self.engine.release();
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for PulseDelay {
    const CLAP_ID: &'static str = "com.pulse-audio.pulse-delay";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A tempo-synchronized delay with Butterworth cut filters");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for PulseDelay {
    // A 16-byte class ID that must be globally unique across all VST3
    // plugins ever made. The `*b"..."` syntax creates a `[u8; 16]`
    // from a 16-character ASCII string literal.
    const VST3_CLASS_ID: [u8; 16] = *b"PulseDelay...v01";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// These generate the C-compatible entry points that hosts use to
// discover and load the plugin. nih_export_clap! exports `clap_entry`
// for CLAP hosts, nih_export_vst3! exports `GetPluginFactory` for
// VST3, and clap_wrapper re-exports the CLAP entry point as AUv2 so
// Logic Pro (Audio Units only) can load it.

nih_export_clap!(PulseDelay);
nih_export_vst3!(PulseDelay);

clap_wrapper::export_auv2!();
