// Float sample -> 16-bit PCM conversion for outgoing audio

/// Convert one sample in [-1.0, 1.0] to signed 16-bit PCM
///
/// Out-of-range input is clamped. Negative values scale by 32768 and
/// non-negative values by 32767, so both ends of the i16 range are reachable
/// without overflow. The fractional part is truncated toward zero.
pub fn sample_to_pcm16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Convert float samples to little-endian 16-bit PCM bytes
pub fn samples_to_pcm16_le(samples: &[f32]) -> Vec<u8> {
    samples
        .iter()
        .flat_map(|&s| sample_to_pcm16(s).to_le_bytes())
        .collect()
}

/// Read little-endian 16-bit PCM bytes back into samples
///
/// A trailing odd byte is ignored.
pub fn pcm16_le_to_samples(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_endpoints() {
        assert_eq!(sample_to_pcm16(1.0), 32767);
        assert_eq!(sample_to_pcm16(-1.0), -32768);
        assert_eq!(sample_to_pcm16(0.0), 0);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(sample_to_pcm16(1.5), 32767);
        assert_eq!(sample_to_pcm16(-7.0), -32768);
    }

    #[test]
    fn test_asymmetric_scale() {
        assert_eq!(sample_to_pcm16(0.5), 16383);
        assert_eq!(sample_to_pcm16(-0.5), -16384);
    }

    #[test]
    fn test_nan_maps_to_silence() {
        assert_eq!(sample_to_pcm16(f32::NAN), 0);
    }

    #[test]
    fn test_little_endian_layout() {
        let bytes = samples_to_pcm16_le(&[1.0, -1.0]);
        assert_eq!(bytes, vec![0xFF, 0x7F, 0x00, 0x80]);
        assert_eq!(pcm16_le_to_samples(&bytes), vec![32767, -32768]);
    }
}
