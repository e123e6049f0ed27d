//! # Butterworth Cut Filters
//!
//! Before the input reaches the delay buffer it passes through two
//! cascaded filters per channel:
//!
//! 1. a 4th-order Butterworth **high-pass** ("low cut") that removes
//!    rumble below the low-cut knob, then
//! 2. a 4th-order Butterworth **low-pass** ("high cut") that removes
//!    content above the high-cut knob.
//!
//! A 4th-order filter is built as a cascade of two biquads (2nd-order
//! sections). Running one 4th-order polynomial directly is numerically
//! fragile in `f32`; two biquads in series give the same response with
//! well-conditioned coefficients.
//!
//! ## Biquad difference equation
//!
//! Each section runs the transposed direct form II:
//!
//! ```text
//! y[n]  = b0*x[n] + z1
//! z1    = b1*x[n] + z2 - a1*y[n]
//! z2    = b2*x[n]      - a2*y[n]
//! ```
//!
//! with coefficients normalized so `a0 = 1`. The `z1`/`z2` values are
//! the filter's memory and live in a per-channel state struct, passed by
//! exclusive reference into every call — channels never share state, so
//! the stereo image is preserved.
//!
//! ## Butterworth section Q
//!
//! Splitting an order-2N Butterworth into N biquads requires a specific
//! Q per section, derived from the pole angles
//! `theta_k = π(2k + 2N - 1) / 4N`, `Q = 1 / (2 cos theta_k)`. For the
//! 4th order used here the pair is 0.5412 and 1.3066.

use std::f32::consts::PI;

/// Per-stage Q values for a 4th-order Butterworth split into two
/// second-order sections.
const BUTTERWORTH_Q4: [f32; 2] = [0.541_196_1, 1.306_563];

/// Normalized coefficients of one second-order section (`a0 == 1`).
///
/// `b*` are the feed-forward (input) taps, `a*` the feedback (output)
/// taps. Coefficients are plain data: the same set is shared by every
/// channel while each channel keeps its own [`BiquadState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

/// The two delayed taps of one section — the only mutable filter state.
#[derive(Debug, Clone, Copy, Default)]
pub struct BiquadState {
    z1: f32,
    z2: f32,
}

impl BiquadState {
    /// Clear the section's memory. Called when playback stops so the
    /// tail of the previous session can't leak into the next one.
    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}

impl BiquadCoeffs {
    /// A section that passes its input through unchanged.
    pub const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Design a 2nd-order low-pass section (RBJ bilinear-transform
    /// form) at `cutoff_hz` with the given section Q.
    ///
    /// The cutoff is clamped to `[20, 0.49 * sample_rate]`: at the warp
    /// point `omega = π` (Nyquist) the bilinear transform degenerates,
    /// so we stay just below it. 20 Hz is the bottom of the parameter
    /// range and keeps the pole radius safely inside the unit circle in
    /// `f32`.
    pub fn lowpass(cutoff_hz: f32, sample_rate: f32, q: f32) -> Self {
        let omega = 2.0 * PI * Self::safe_cutoff(cutoff_hz, sample_rate) / sample_rate;
        let (sin, cos) = omega.sin_cos();
        let alpha = sin / (2.0 * q);

        let b1 = 1.0 - cos;
        let b0 = b1 * 0.5;
        Self::normalized(b0, b1, b0, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
    }

    /// Design a 2nd-order high-pass section at `cutoff_hz` with the
    /// given section Q. Same clamping rules as [`Self::lowpass`].
    pub fn highpass(cutoff_hz: f32, sample_rate: f32, q: f32) -> Self {
        let omega = 2.0 * PI * Self::safe_cutoff(cutoff_hz, sample_rate) / sample_rate;
        let (sin, cos) = omega.sin_cos();
        let alpha = sin / (2.0 * q);

        let b0 = (1.0 + cos) * 0.5;
        let b1 = -(1.0 + cos);
        Self::normalized(b0, b1, b0, 1.0 + alpha, -2.0 * cos, 1.0 - alpha)
    }

    fn safe_cutoff(cutoff_hz: f32, sample_rate: f32) -> f32 {
        cutoff_hz.clamp(20.0, sample_rate * 0.49)
    }

    fn normalized(b0: f32, b1: f32, b2: f32, a0: f32, a1: f32, a2: f32) -> Self {
        let norm = 1.0 / a0;
        Self {
            b0: b0 * norm,
            b1: b1 * norm,
            b2: b2 * norm,
            a1: a1 * norm,
            a2: a2 * norm,
        }
    }

    /// Whether both poles lie strictly inside the unit circle, via the
    /// stability triangle for normalized 2nd-order polynomials:
    /// `|a2| < 1` and `|a1| < 1 + a2`.
    pub fn is_stable(&self) -> bool {
        self.a2.abs() < 1.0 && self.a1.abs() < 1.0 + self.a2
    }

    /// Run one sample through the section, updating `state`.
    #[inline]
    pub fn process(&self, input: f32, state: &mut BiquadState) -> f32 {
        let output = input.mul_add(self.b0, state.z1);
        state.z1 = input.mul_add(self.b1, state.z2) - self.a1 * output;
        state.z2 = input * self.b2 - self.a2 * output;
        output
    }
}

/// Coefficients for one 4th-order response: two biquads in series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeCoeffs {
    sections: [BiquadCoeffs; 2],
}

/// Delay taps for both sections of one channel's cascade.
#[derive(Debug, Clone, Copy, Default)]
pub struct CascadeState {
    sections: [BiquadState; 2],
}

impl CascadeState {
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.reset();
        }
    }
}

impl CascadeCoeffs {
    pub const IDENTITY: Self = Self {
        sections: [BiquadCoeffs::IDENTITY; 2],
    };

    /// 4th-order Butterworth high-pass at `cutoff_hz`.
    pub fn butterworth_highpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            sections: [
                BiquadCoeffs::highpass(cutoff_hz, sample_rate, BUTTERWORTH_Q4[0]),
                BiquadCoeffs::highpass(cutoff_hz, sample_rate, BUTTERWORTH_Q4[1]),
            ],
        }
    }

    /// 4th-order Butterworth low-pass at `cutoff_hz`.
    pub fn butterworth_lowpass(cutoff_hz: f32, sample_rate: f32) -> Self {
        Self {
            sections: [
                BiquadCoeffs::lowpass(cutoff_hz, sample_rate, BUTTERWORTH_Q4[0]),
                BiquadCoeffs::lowpass(cutoff_hz, sample_rate, BUTTERWORTH_Q4[1]),
            ],
        }
    }

    pub fn is_stable(&self) -> bool {
        self.sections.iter().all(BiquadCoeffs::is_stable)
    }

    #[inline]
    pub fn process(&self, input: f32, state: &mut CascadeState) -> f32 {
        let mid = self.sections[0].process(input, &mut state.sections[0]);
        self.sections[1].process(mid, &mut state.sections[1])
    }
}

/// The full per-block coefficient set: high-pass cascade ("low cut")
/// followed by low-pass cascade ("high cut"). One instance is designed
/// per block and shared by all channels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterChainCoeffs {
    high_pass: CascadeCoeffs,
    low_pass: CascadeCoeffs,
}

/// One channel's complete filter memory: high-pass cascade taps
/// followed by low-pass cascade taps. Owned exclusively by that
/// channel; created at prepare time and mutated every block.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterChannelState {
    high_pass: CascadeState,
    low_pass: CascadeState,
}

impl FilterChannelState {
    pub fn reset(&mut self) {
        self.high_pass.reset();
        self.low_pass.reset();
    }
}

impl FilterChainCoeffs {
    /// Design both cascades from the current cutoff parameters.
    ///
    /// The two cutoffs are designed independently; `low_cut_hz` above
    /// `high_cut_hz` is accepted and yields a band-reject-like response.
    pub fn design(low_cut_hz: f32, high_cut_hz: f32, sample_rate: f32) -> Self {
        Self {
            high_pass: CascadeCoeffs::butterworth_highpass(low_cut_hz, sample_rate),
            low_pass: CascadeCoeffs::butterworth_lowpass(high_cut_hz, sample_rate),
        }
    }

    pub fn is_stable(&self) -> bool {
        self.high_pass.is_stable() && self.low_pass.is_stable()
    }

    /// Run one sample through high-pass then low-pass, updating the
    /// channel's state.
    #[inline]
    pub fn process(&self, input: f32, state: &mut FilterChannelState) -> f32 {
        let high_passed = self.high_pass.process(input, &mut state.high_pass);
        self.low_pass.process(high_passed, &mut state.low_pass)
    }
}

impl Default for FilterChainCoeffs {
    /// Both cascades as identity: the chain passes audio unchanged
    /// until the first block designs real coefficients.
    fn default() -> Self {
        Self {
            high_pass: CascadeCoeffs::IDENTITY,
            low_pass: CascadeCoeffs::IDENTITY,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a chain with a sine and return the output peak once the
    /// transient has settled.
    fn settled_sine_peak(coeffs: &FilterChainCoeffs, freq: f32, sample_rate: f32) -> f32 {
        let mut state = FilterChannelState::default();
        let mut peak = 0.0_f32;
        for n in 0..4000 {
            let input = (2.0 * PI * freq * n as f32 / sample_rate).sin();
            let output = coeffs.process(input, &mut state);
            if n >= 3000 {
                peak = peak.max(output.abs());
            }
        }
        peak
    }

    /// Identity coefficients must be exactly transparent.
    #[test]
    fn test_identity_passthrough() {
        let coeffs = FilterChainCoeffs::default();
        let mut state = FilterChannelState::default();

        for input in [1.0, -0.5, 0.25, 0.0] {
            let output = coeffs.process(input, &mut state);
            assert!(
                (output - input).abs() < 1e-6,
                "Identity chain changed {input} into {output}"
            );
        }
    }

    /// Every cutoff across the full parameter range, at the common
    /// sample rates, must produce poles inside the unit circle.
    #[test]
    fn test_designs_stable_across_range() {
        for &sample_rate in &[44_100.0, 48_000.0, 96_000.0] {
            for &cutoff in &[20.0, 55.0, 200.0, 1_000.0, 5_000.0, 12_000.0, 20_000.0] {
                let hp = CascadeCoeffs::butterworth_highpass(cutoff, sample_rate);
                let lp = CascadeCoeffs::butterworth_lowpass(cutoff, sample_rate);
                assert!(
                    hp.is_stable(),
                    "High-pass unstable at {cutoff} Hz / {sample_rate} Hz"
                );
                assert!(
                    lp.is_stable(),
                    "Low-pass unstable at {cutoff} Hz / {sample_rate} Hz"
                );
            }
        }
    }

    /// Bounded input must give bounded output over a long run, at both
    /// ends of the cutoff range. A diverging filter would blow well past
    /// the bound within 10k samples.
    #[test]
    fn test_bounded_in_bounded_out() {
        for &sample_rate in &[44_100.0, 48_000.0, 96_000.0] {
            for &(low_cut, high_cut) in &[(20.0, 20_000.0), (20_000.0, 20.0), (500.0, 500.0)] {
                let coeffs = FilterChainCoeffs::design(low_cut, high_cut, sample_rate);
                let mut state = FilterChannelState::default();

                for n in 0..10_000 {
                    // Worst-ish case: full-scale square wave.
                    let input = if (n / 16) % 2 == 0 { 1.0 } else { -1.0 };
                    let output = coeffs.process(input, &mut state);
                    assert!(
                        output.abs() < 100.0,
                        "Diverged at sample {n} (cutoffs {low_cut}/{high_cut}, \
                         rate {sample_rate}): {output}"
                    );
                }
            }
        }
    }

    /// With both knobs wide open the chain is close to transparent in
    /// the midband.
    #[test]
    fn test_open_chain_passes_midband() {
        let coeffs = FilterChainCoeffs::design(20.0, 20_000.0, 48_000.0);
        let peak = settled_sine_peak(&coeffs, 1_000.0, 48_000.0);
        assert!(
            (peak - 1.0).abs() < 0.05,
            "1 kHz through an open chain should be near unity, got {peak}"
        );
    }

    /// A 4th-order high-pass two octaves above the test tone should
    /// attenuate it by roughly 48 dB; we just require "a lot".
    #[test]
    fn test_high_pass_cuts_low_frequencies() {
        let coeffs = FilterChainCoeffs::design(4_000.0, 20_000.0, 48_000.0);
        let peak = settled_sine_peak(&coeffs, 1_000.0, 48_000.0);
        assert!(
            peak < 0.02,
            "1 kHz should be buried under a 4 kHz low cut, got {peak}"
        );
    }

    /// Same in the other direction for the low-pass.
    #[test]
    fn test_low_pass_cuts_high_frequencies() {
        let coeffs = FilterChainCoeffs::design(20.0, 1_000.0, 48_000.0);
        let peak = settled_sine_peak(&coeffs, 8_000.0, 48_000.0);
        assert!(
            peak < 0.01,
            "8 kHz should be buried under a 1 kHz high cut, got {peak}"
        );
    }

    /// Low cut above high cut is accepted input; the overlap region is
    /// strongly attenuated (band-reject-like), not an error.
    #[test]
    fn test_inverted_cutoffs_attenuate_everything_between() {
        let coeffs = FilterChainCoeffs::design(2_000.0, 200.0, 48_000.0);
        assert!(coeffs.is_stable());

        let peak = settled_sine_peak(&coeffs, 632.0, 48_000.0);
        assert!(
            peak < 0.05,
            "Midband should be rejected when low cut > high cut, got {peak}"
        );
    }

    /// Resetting the state must silence the tail.
    #[test]
    fn test_reset_clears_state() {
        let coeffs = FilterChainCoeffs::design(200.0, 5_000.0, 48_000.0);
        let mut state = FilterChannelState::default();

        coeffs.process(1.0, &mut state);
        coeffs.process(-1.0, &mut state);
        state.reset();

        let output = coeffs.process(0.0, &mut state);
        assert!(
            output.abs() < 1e-6,
            "Zero input after reset should give zero output, got {output}"
        );
    }
}
