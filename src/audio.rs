//! Sample-buffer post-processing: volume scaling, peak normalization,
//! clamping, and PCM16 conversion helpers.
//!
//! WAV container encoding itself is an external concern (§6); this module
//! only produces/consumes the float sample buffers the core is responsible
//! for.

const NORMALIZE_TARGET_PEAK: f32 = 0.95;

/// Multiply every sample by `volume`, optionally peak-normalize to 0.95
/// (skipped if the input peak is zero), then clamp to `[-1.0, 1.0]`.
#[must_use]
pub fn post_process(mut samples: Vec<f32>, volume: f32, normalize: bool) -> Vec<f32> {
    for sample in &mut samples {
        *sample *= volume;
    }

    if normalize {
        let peak = samples.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()));
        if peak > 0.0 {
            let scale = NORMALIZE_TARGET_PEAK / peak;
            for sample in &mut samples {
                *sample *= scale;
            }
        }
    }

    for sample in &mut samples {
        *sample = sample.clamp(-1.0, 1.0);
    }

    samples
}

/// Convert `[-1.0, 1.0]` float samples to signed 16-bit PCM.
#[must_use]
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32).round() as i16)
        .collect()
}

/// Convert signed 16-bit PCM samples back to `[-1.0, 1.0]` floats.
#[must_use]
pub fn pcm16_to_float(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| s as f32 / i16::MAX as f32).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_scales_before_normalization() {
        let samples = post_process(vec![0.1, -0.2, 0.05], 1.0, false);
        assert_eq!(samples, vec![0.1, -0.2, 0.05]);
    }

    #[test]
    fn normalize_brings_peak_to_target() {
        let samples = post_process(vec![0.1, -0.4, 0.2], 1.0, true);
        let peak = samples.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()));
        assert!((peak - NORMALIZE_TARGET_PEAK).abs() < 1e-4);
    }

    #[test]
    fn normalize_is_skipped_when_peak_is_zero() {
        let samples = post_process(vec![0.0, 0.0, 0.0], 1.0, true);
        assert_eq!(samples, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn output_is_always_clamped_to_unit_range() {
        let samples = post_process(vec![2.0, -2.0], 1.0, false);
        assert_eq!(samples, vec![1.0, -1.0]);
    }

    #[test]
    fn pcm16_round_trip_preserves_samples_within_tolerance() {
        let original = vec![0.0_f32, 0.5, -0.5, 0.999, -1.0];
        let pcm = float_to_pcm16(&original);
        let restored = pcm16_to_float(&pcm);
        for (a, b) in original.iter().zip(restored.iter()) {
            assert!((a - b).abs() <= 2.0 / 32767.0 + 1e-6, "{a} vs {b}");
        }
    }
}
