//! # Block Engine
//!
//! Orchestrates one processing block end to end. Per block, in order:
//!
//! 1. take the parameter snapshot (passed in by the plugin shell),
//! 2. redesign the filter coefficients from the cutoff knobs,
//! 3. recompute the tempo-derived delay length and resize if it moved,
//! 4. run the Butterworth chain over each channel in place,
//! 5. write the filtered block into each channel's delay buffer,
//! 6. read the delayed block back out,
//! 7. add the delayed (wet) block onto the dry block under the gain ramp,
//! 8. advance the shared write cursor.
//!
//! ## Lifecycle
//!
//! ```text
//! Uninitialized ──prepare()──► Prepared ──process_block()──► Processing ⟲
//!                                  ▲                             │
//!                                  └────────prepare()────release()──► Released
//! ```
//!
//! `process_block` is only meaningful in `Prepared`/`Processing`; in any
//! other state it leaves the buffers untouched (debug builds also trip
//! an assertion). After `release()` the engine owns no audio buffers
//! until `prepare()` is called again.
//!
//! ## Tempo sync and the fixed read offset
//!
//! The buffer length is `sample_rate * (60 / bpm) * timing_divisor`,
//! recomputed every block and clamped to at least one sample. The read
//! cursor, however, trails the write cursor by a constant one-second
//! offset that does *not* follow the tempo-derived length — the delay a
//! user hears is tied to that fixed offset, not the timing knob. This
//! mismatch is deliberate, documented behavior; see DESIGN.md before
//! "fixing" it. The offset is reduced modulo the
//! buffer length so the read stays in bounds when the buffer is shorter
//! than one second (which it usually is).
//!
//! ## Real-time safety
//!
//! Nothing on the block path locks, blocks, or allocates — with one
//! documented exception: when the tempo-derived length changes, every
//! channel's delay buffer is reallocated right here on the audio
//! thread (wrapped in `permit_alloc` so the debug allocation sentinel
//! accepts it). The resize also discards the buffered audio, which is
//! an audible transient. Both effects are accepted, documented behavior.

use nih_plug::nih_debug_assert;
use nih_plug::util::permit_alloc;

use super::delay_line::DelayLine;
use super::filter::{FilterChainCoeffs, FilterChannelState};
use super::mixer::Mixer;

/// Tempo assumed when the host's transport reports no BPM, and for
/// sizing the initial buffers in `prepare()` before the first real
/// transport snapshot arrives.
pub const DEFAULT_BPM: f64 = 120.0;

/// Timing divisor assumed at `prepare()` time, matching the parameter
/// default of 1/8 beat.
const DEFAULT_TIMING_DIVISOR: f32 = 0.125;

/// Level at which filtered blocks are written into the delay buffer.
/// Constant, so the write ramp is flat; the machinery still ramps
/// between block-boundary levels should this ever become dynamic.
const WRITE_LEVEL: f32 = 1.0;

/// One tear-free snapshot of the user parameters, taken once per block.
///
/// The control/UI context mutates the parameter store concurrently with
/// audio processing; the plugin shell reads each value exactly once per
/// `process()` call and hands the engine this `Copy` struct, so a knob
/// move can never change a value mid-block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineParams {
    /// Fraction of a beat the delay buffer spans, in (0, 1].
    pub timing_divisor: f32,
    /// High-pass ("low cut") cutoff in Hz, 20..=20000.
    pub low_cut_hz: f32,
    /// Low-pass ("high cut") cutoff in Hz, 20..=20000.
    pub high_cut_hz: f32,
    /// Wet level, 0.1..=1.0.
    pub gain: f32,
}

/// Per-block transport snapshot from the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransportInfo {
    /// Host tempo. Hosts without a playing transport may omit it; the
    /// engine then falls back to [`DEFAULT_BPM`].
    pub bpm: Option<f64>,
}

/// Engine lifecycle; see the module docs for the transition diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    Uninitialized,
    Prepared,
    Processing,
    Released,
}

/// Everything one audio channel owns: its filter memory and its delay
/// buffer. Channels never share state.
struct ChannelState {
    filter: FilterChannelState,
    delay: DelayLine,
}

/// The per-block signal path: Butterworth cut filters → tempo-sized
/// delay buffer → ramped wet/dry mix.
pub struct BlockEngine {
    state: EngineState,
    sample_rate: f64,
    channels: Vec<ChannelState>,
    /// Current filter design, shared by all channels. Kept across
    /// blocks so an unstable design can fall back to the last good one.
    coeffs: FilterChainCoeffs,
    /// Engine-wide write cursor, shared by every channel's buffer.
    /// Invariant: `write_pos < delay_length_samples()`.
    write_pos: usize,
    /// Fixed read offset: one second, in samples.
    read_offset: usize,
    mixer: Mixer,
    /// Scratch block for the delayed signal, allocated at prepare time
    /// so reads don't allocate per block.
    wet_scratch: Vec<f32>,
}

/// Tempo-to-samples conversion: how many samples one `timing_divisor`
/// fraction of a beat spans at the given rate, never less than one
/// sample. Degenerate inputs (zero, negative, or non-finite tempo or
/// divisor) clamp to the one-sample floor instead of poisoning the
/// modulo arithmetic downstream.
pub fn delay_length_samples(sample_rate: f64, bpm: f64, timing_divisor: f32) -> usize {
    let length = sample_rate * (60.0 / bpm) * f64::from(timing_divisor);
    if length.is_finite() {
        (length as usize).max(1)
    } else {
        1
    }
}

impl BlockEngine {
    /// An engine that owns nothing yet; call [`prepare`](Self::prepare)
    /// before processing.
    pub fn new() -> Self {
        Self {
            state: EngineState::Uninitialized,
            sample_rate: 0.0,
            channels: Vec::new(),
            coeffs: FilterChainCoeffs::default(),
            write_pos: 0,
            read_offset: 0,
            mixer: Mixer::new(),
            wet_scratch: Vec::new(),
        }
    }

    /// Allocate per-channel filter state and delay buffers.
    ///
    /// The initial buffer length assumes [`DEFAULT_BPM`] and the default
    /// timing divisor; the first `process_block` with a real transport
    /// resizes to the actual tempo. Valid from any state (a released
    /// engine can be prepared again).
    pub fn prepare(&mut self, sample_rate: f64, max_block_size: usize, num_channels: usize) {
        let initial_length = delay_length_samples(sample_rate, DEFAULT_BPM, DEFAULT_TIMING_DIVISOR);

        self.sample_rate = sample_rate;
        self.read_offset = (sample_rate.round() as usize).max(1);
        self.channels = (0..num_channels)
            .map(|_| ChannelState {
                filter: FilterChannelState::default(),
                delay: DelayLine::new(initial_length),
            })
            .collect();
        self.coeffs = FilterChainCoeffs::default();
        self.write_pos = 0;
        self.mixer.reset();
        self.wet_scratch = vec![0.0; max_block_size.max(1)];
        self.state = EngineState::Prepared;
    }

    /// Clear all audio state (filter memory, buffered echoes, gain
    /// history) without deallocating, e.g. when playback stops. Stale
    /// echoes must not bleed into the next play session.
    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.filter.reset();
            channel.delay.clear();
        }
        self.mixer.reset();
        self.write_pos = 0;
    }

    /// Free the engine-owned buffers. `process_block` becomes a no-op
    /// until the next `prepare()`.
    pub fn release(&mut self) {
        self.channels = Vec::new();
        self.wet_scratch = Vec::new();
        self.write_pos = 0;
        self.mixer.reset();
        self.state = EngineState::Released;
    }

    /// Process one block in place.
    ///
    /// `buffers` holds one sample slice per channel, all the same
    /// length. Channels beyond the count given to `prepare()` are left
    /// untouched. This call never panics and never fails: every
    /// recoverable condition (missing tempo, degenerate length,
    /// unstable filter design) is handled with the documented fallback.
    pub fn process_block(
        &mut self,
        buffers: &mut [&mut [f32]],
        transport: TransportInfo,
        params: EngineParams,
    ) {
        if !matches!(
            self.state,
            EngineState::Prepared | EngineState::Processing
        ) {
            nih_debug_assert!(false, "process_block called outside Prepared/Processing");
            return;
        }
        let num_samples = match buffers.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return,
        };

        // (2) Redesign the filters from this block's snapshot. Caching
        // against the previous block's cutoffs would save a redundant
        // recompute, but the design math is cheap enough per block. An
        // unstable design (shouldn't happen inside the clamped range)
        // keeps the previous block's coefficients instead of
        // propagating.
        let designed = FilterChainCoeffs::design(
            params.low_cut_hz,
            params.high_cut_hz,
            self.sample_rate as f32,
        );
        if designed.is_stable() {
            self.coeffs = designed;
        }

        // (3) Tempo-derived buffer length; missing or nonsense tempo
        // falls back to the default rather than failing the block.
        let bpm = transport
            .bpm
            .filter(|bpm| bpm.is_finite() && *bpm > 0.0)
            .unwrap_or(DEFAULT_BPM);
        let new_length = delay_length_samples(self.sample_rate, bpm, params.timing_divisor);
        if new_length != self.delay_length() {
            // The documented real-time-safety exception: reallocating
            // on the audio thread, discarding buffered echoes.
            permit_alloc(|| {
                for channel in &mut self.channels {
                    channel.delay.resize(new_length);
                }
            });
            self.write_pos %= new_length;
        }

        // Defensive: a host that sends a block larger than the promised
        // maximum gets a scratch regrow instead of a panic.
        if num_samples > self.wet_scratch.len() {
            permit_alloc(|| self.wet_scratch.resize(num_samples, 0.0));
        }

        let ramp = self.mixer.begin_block(params.gain);
        let delay_length = new_length;
        // One-second offset folded into the (usually shorter) buffer.
        let read_offset = self.read_offset % delay_length;
        let read_pos = (self.write_pos + delay_length - read_offset) % delay_length;

        for (buffer, channel) in buffers.iter_mut().zip(&mut self.channels) {
            let block = &mut buffer[..num_samples];

            // (4) Low cut then high cut, in place.
            for sample in block.iter_mut() {
                *sample = self.coeffs.process(*sample, &mut channel.filter);
            }

            // (5) Store the filtered block, (6) fetch the delayed one.
            channel
                .delay
                .write_from(self.write_pos, block, WRITE_LEVEL, WRITE_LEVEL);
            let wet = &mut self.wet_scratch[..num_samples];
            channel.delay.read_into(read_pos, wet);

            // (7) Dry + wet * gain, ramped from the previous block's
            // gain so knob moves never click.
            ramp.apply_add(block, wet);
        }

        // (8) Advance the shared cursor for the next block.
        self.write_pos = (self.write_pos + num_samples) % delay_length;
        self.state = EngineState::Processing;
    }

    /// Current delay buffer length in samples (1 before `prepare()`).
    pub fn delay_length(&self) -> usize {
        self.channels.first().map_or(1, |ch| ch.delay.len())
    }

    /// Current shared write cursor. Always `< delay_length()`.
    pub fn write_position(&self) -> usize {
        self.write_pos
    }
}

impl Default for BlockEngine {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
