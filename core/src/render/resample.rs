use crate::math::kernel::KernelHelper;
use serde::{Deserialize, Serialize};

/// Stateless sample-rate conversion algorithm.
///
/// The caller owns all continuity state: `resample` may be restarted from
/// any fractional read position and must produce the same output for the
/// same input.
pub trait Resampler: Send {
    /// Half-width of the interpolation kernel in input samples.
    fn wing_size(&self, factor: f64) -> f64;

    /// Writes `out_len` samples to `output[out_off..]`, reading `input`
    /// from fractional position `read_pos` and advancing `1 / factor`
    /// input samples per output sample.
    fn resample(
        &self,
        input: &[f32],
        read_pos: f64,
        output: &mut [f32],
        out_off: usize,
        out_len: usize,
        factor: f64,
    );
}

/// Quality presets selectable per job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResamplerQuality {
    Linear,
    #[default]
    Medium,
    High,
}

impl ResamplerQuality {
    pub fn build(&self) -> Box<dyn Resampler> {
        match self {
            ResamplerQuality::Linear => Box::new(LinearResampler),
            ResamplerQuality::Medium => Box::new(SincResampler::new(8, 7.0)),
            ResamplerQuality::High => Box::new(SincResampler::new(24, 9.0)),
        }
    }
}

/// Two-point linear interpolation.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearResampler;

impl Resampler for LinearResampler {
    fn wing_size(&self, _factor: f64) -> f64 {
        1.0
    }

    fn resample(
        &self,
        input: &[f32],
        read_pos: f64,
        output: &mut [f32],
        out_off: usize,
        out_len: usize,
        factor: f64,
    ) {
        let step = 1.0 / factor;
        let last = input.len().saturating_sub(1);
        for (k, out) in output[out_off..out_off + out_len].iter_mut().enumerate() {
            let pos = read_pos + k as f64 * step;
            let idx = (pos.floor().max(0.0) as usize).min(last);
            let frac = (pos - idx as f64).clamp(0.0, 1.0) as f32;
            let a = input[idx];
            let b = input[(idx + 1).min(last)];
            *out = a + (b - a) * frac;
        }
    }
}

/// Kaiser-windowed sinc interpolation.
///
/// When downsampling the kernel is widened by `1 / factor` so that its
/// cutoff follows the target Nyquist frequency.
#[derive(Debug, Clone, Copy)]
pub struct SincResampler {
    zero_crossings: usize,
    beta: f64,
}

impl SincResampler {
    pub fn new(zero_crossings: usize, beta: f64) -> Self {
        Self {
            zero_crossings: zero_crossings.max(1),
            beta,
        }
    }
}

impl Default for SincResampler {
    fn default() -> Self {
        Self::new(8, 7.0)
    }
}

impl Resampler for SincResampler {
    fn wing_size(&self, factor: f64) -> f64 {
        self.zero_crossings as f64 / factor.min(1.0)
    }

    fn resample(
        &self,
        input: &[f32],
        read_pos: f64,
        output: &mut [f32],
        out_off: usize,
        out_len: usize,
        factor: f64,
    ) {
        let step = 1.0 / factor;
        let scale = factor.min(1.0);
        let wing = self.wing_size(factor);
        let last = input.len() as i64 - 1;

        for (k, out) in output[out_off..out_off + out_len].iter_mut().enumerate() {
            let pos = read_pos + k as f64 * step;
            let first = ((pos - wing).ceil() as i64).max(0);
            let stop = ((pos + wing).floor() as i64).min(last);

            let mut acc = 0.0f64;
            let mut weight_sum = 0.0f64;
            for idx in first..=stop {
                let dist = pos - idx as f64;
                let weight = KernelHelper::sinc(dist * scale)
                    * KernelHelper::kaiser(dist / wing, self.beta);
                acc += weight * input[idx as usize] as f64;
                weight_sum += weight;
            }
            *out = if weight_sum.abs() > f64::EPSILON {
                (acc / weight_sum) as f32
            } else {
                0.0
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sinc_at_unity_reproduces_integer_positions() {
        let rsmp = SincResampler::default();
        let input: Vec<f32> = (0..64).map(|i| ((i * 7) % 13) as f32 - 6.0).collect();
        let mut output = vec![0.0; 32];
        rsmp.resample(&input, 16.0, &mut output, 0, 32, 1.0);
        for (k, value) in output.iter().enumerate() {
            assert!((value - input[16 + k]).abs() < 1e-4);
        }
    }

    #[test]
    fn wing_widens_when_downsampling() {
        let rsmp = SincResampler::new(8, 7.0);
        assert_eq!(rsmp.wing_size(2.0), 8.0);
        assert_eq!(rsmp.wing_size(0.5), 16.0);
        assert_eq!(LinearResampler.wing_size(0.25), 1.0);
    }

    #[test]
    fn constant_signal_stays_constant() {
        let input = vec![3.5f32; 200];
        let mut output = vec![0.0; 40];
        for factor in [0.3, 0.5, 2.0, 3.0] {
            SincResampler::default().resample(&input, 60.0, &mut output, 0, 40, factor);
            assert!(output.iter().all(|v| (v - 3.5).abs() < 1e-4));
        }
    }

    #[test]
    fn linear_interpolates_between_neighbours() {
        let input = [0.0f32, 1.0, 2.0, 3.0];
        let mut output = vec![0.0; 5];
        LinearResampler.resample(&input, 0.5, &mut output, 1, 4, 2.0);
        assert_eq!(output, vec![0.0, 0.5, 1.0, 1.5, 2.0]);
    }

    #[test]
    fn restarting_mid_stream_is_deterministic() {
        let rsmp = SincResampler::default();
        let input: Vec<f32> = (0..128).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut whole = vec![0.0; 20];
        rsmp.resample(&input, 40.0, &mut whole, 0, 20, 1.5);

        let mut tail = vec![0.0; 10];
        rsmp.resample(&input, 40.0 + 10.0 / 1.5, &mut tail, 0, 10, 1.5);
        for (a, b) in whole[10..].iter().zip(&tail) {
            assert!((a - b).abs() < 1e-6);
        }
    }
}
