//! Cache-key fingerprint derivation.

use super::types::SynthesisRequest;

/// Format a float to 2 decimal places for stable fingerprinting.
fn fmt2(value: f32) -> String {
    format!("{value:.2}")
}

/// `hash(text | voice_id | f(speed) | f(pitch) | f(volume) | phonemes_override?)`,
/// blake3 over the pipe-joined string.
#[must_use]
pub fn fingerprint(request: &SynthesisRequest) -> String {
    let joined = format!(
        "{}|{}|{}|{}|{}|{}",
        request.text,
        request.voice_id,
        fmt2(request.speed),
        fmt2(request.pitch),
        fmt2(request.volume),
        request.phonemes.as_deref().unwrap_or(""),
    );
    blake3::hash(joined.as_bytes()).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(text: &str, voice_id: &str) -> SynthesisRequest {
        SynthesisRequest {
            text: text.to_owned(),
            voice_id: voice_id.to_owned(),
            ..Default::default()
        }
    }

    #[test]
    fn identical_requests_fingerprint_identically() {
        assert_eq!(
            fingerprint(&request("こんにちは", "jf_alpha")),
            fingerprint(&request("こんにちは", "jf_alpha"))
        );
    }

    #[test]
    fn different_text_fingerprints_differently() {
        assert_ne!(
            fingerprint(&request("こんにちは", "jf_alpha")),
            fingerprint(&request("さようなら", "jf_alpha"))
        );
    }

    #[test]
    fn speed_rounding_to_two_decimals_collapses_near_identical_values() {
        let mut a = request("x", "jf_alpha");
        a.speed = 1.001;
        let mut b = request("x", "jf_alpha");
        b.speed = 1.004;
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn phoneme_override_changes_the_fingerprint() {
        let mut a = request("x", "jf_alpha");
        a.phonemes = Some("k o".to_owned());
        let b = request("x", "jf_alpha");
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
