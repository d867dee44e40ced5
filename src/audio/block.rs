// Block shaping for captured audio
//
// Device callbacks deliver buffers of arbitrary size, channel count and
// sample rate. The pipeline wants fixed-size mono blocks at the session
// rate, so every callback buffer goes through down-mix -> resample ->
// accumulate, and complete blocks come out the other end.

use super::backend::AudioBlock;

/// Linear-interpolation resampler that carries its phase across buffers
#[derive(Debug, Clone)]
pub struct LinearResampler {
    /// Input samples advanced per output sample
    step: f64,
    /// Read position relative to `last` (index 0) followed by the next buffer
    pos: f64,
    last: f32,
}

impl LinearResampler {
    pub fn new(input_rate: u32, output_rate: u32) -> Self {
        Self {
            step: input_rate as f64 / output_rate.max(1) as f64,
            pos: 1.0,
            last: 0.0,
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.step == 1.0
    }

    pub fn process(&mut self, input: &[f32], out: &mut Vec<f32>) {
        if self.is_passthrough() {
            out.extend_from_slice(input);
            return;
        }
        if input.is_empty() {
            return;
        }

        let len = input.len() as f64;
        while self.pos < len {
            let i = self.pos.floor() as usize;
            let frac = (self.pos - i as f64) as f32;
            let a = if i == 0 { self.last } else { input[i - 1] };
            let b = input[i];
            out.push(a + (b - a) * frac);
            self.pos += self.step;
        }

        self.pos -= len;
        self.last = input[input.len() - 1];
    }
}

/// Average interleaved frames down to a single channel
pub fn downmix_to_mono(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Turns arbitrary device buffers into fixed-size mono blocks
#[derive(Debug)]
pub struct BlockShaper {
    input_channels: u16,
    output_rate: u32,
    block_size: usize,
    resampler: LinearResampler,
    pending: Vec<f32>,
    emitted_samples: u64,
}

impl BlockShaper {
    pub fn new(input_rate: u32, input_channels: u16, output_rate: u32, block_size: usize) -> Self {
        Self {
            input_channels,
            output_rate,
            block_size: block_size.max(1),
            resampler: LinearResampler::new(input_rate, output_rate),
            pending: Vec::with_capacity(block_size * 2),
            emitted_samples: 0,
        }
    }

    /// Feed one interleaved device buffer, returning every completed block
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<AudioBlock> {
        let mono = downmix_to_mono(interleaved, self.input_channels);
        self.resampler.process(&mono, &mut self.pending);

        let mut blocks = Vec::new();
        while self.pending.len() >= self.block_size {
            let samples: Vec<f32> = self.pending.drain(..self.block_size).collect();
            let timestamp_ms = self.emitted_samples * 1000 / self.output_rate.max(1) as u64;
            self.emitted_samples += samples.len() as u64;

            blocks.push(AudioBlock {
                samples,
                sample_rate: self.output_rate,
                timestamp_ms,
            });
        }

        blocks
    }

    /// Samples waiting for a block to fill
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocks_are_fixed_size() {
        let mut shaper = BlockShaper::new(16000, 1, 16000, 512);

        assert!(shaper.push(&[0.1; 300]).is_empty());
        let blocks = shaper.push(&[0.1; 800]);

        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.samples.len() == 512));
        assert_eq!(shaper.pending_len(), 1100 - 1024);
        assert_eq!(blocks[0].timestamp_ms, 0);
        assert_eq!(blocks[1].timestamp_ms, 32);
    }

    #[test]
    fn test_stereo_is_averaged() {
        let mono = downmix_to_mono(&[1.0, 0.0, -0.5, -0.5], 2);
        assert_eq!(mono, vec![0.5, -0.5]);
    }

    #[test]
    fn test_downsample_48k_to_16k() {
        let mut resampler = LinearResampler::new(48000, 16000);
        let mut out = Vec::new();
        for _ in 0..10 {
            resampler.process(&[0.25; 480], &mut out);
        }
        // 4800 input samples at a 3:1 ratio
        assert!((out.len() as i64 - 1600).abs() <= 1, "got {}", out.len());
        assert!(out[10..].iter().all(|&s| (s - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_passthrough_keeps_samples() {
        let mut resampler = LinearResampler::new(16000, 16000);
        let mut out = Vec::new();
        resampler.process(&[0.1, 0.2, 0.3], &mut out);
        assert_eq!(out, vec![0.1, 0.2, 0.3]);
    }
}
