pub struct StatsHelper;

impl StatsHelper {
    pub fn rms(samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f32 = samples.iter().map(|&v| v * v).sum();
        (sum_sq / samples.len() as f32).sqrt()
    }

    pub fn peak(samples: &[f32]) -> f32 {
        samples.iter().fold(0.0f32, |acc, &v| acc.max(v.abs()))
    }

    /// Largest Euclidean distance between corresponding points.
    pub fn max_deviation(a: &[[f32; 2]], b: &[[f32; 2]]) -> f32 {
        a.iter()
            .zip(b)
            .map(|(p, q)| ((p[0] - q[0]).powi(2) + (p[1] - q[1]).powi(2)).sqrt())
            .fold(0.0f32, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_zero_sequence_yields_zero() {
        assert_eq!(StatsHelper::rms(&[]), 0.0);
        assert_eq!(StatsHelper::rms(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn rms_handles_single_value() {
        assert_eq!(StatsHelper::rms(&[4.0]), 4.0);
    }

    #[test]
    fn peak_uses_magnitude() {
        assert_eq!(StatsHelper::peak(&[0.5, -2.0, 1.0]), 2.0);
    }

    #[test]
    fn deviation_of_identical_paths_is_zero() {
        let path = [[0.0, 0.0], [1.0, 1.0]];
        assert_eq!(StatsHelper::max_deviation(&path, &path), 0.0);
        assert_eq!(StatsHelper::max_deviation(&path, &[[3.0, 4.0]]), 5.0);
    }
}
