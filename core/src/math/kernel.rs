use std::f64::consts::PI;

/// Helpers for windowed-sinc interpolation kernels.
pub struct KernelHelper;

impl KernelHelper {
    /// Normalised sinc, `sin(πx) / (πx)`.
    pub fn sinc(x: f64) -> f64 {
        if x.abs() < 1e-12 {
            1.0
        } else {
            let px = PI * x;
            px.sin() / px
        }
    }

    /// Zeroth-order modified Bessel function of the first kind (power series).
    pub fn bessel_i0(x: f64) -> f64 {
        let half = x * 0.5;
        let mut sum = 1.0;
        let mut term = 1.0;
        for k in 1..64 {
            let ratio = half / k as f64;
            term *= ratio * ratio;
            sum += term;
            if term < sum * 1e-16 {
                break;
            }
        }
        sum
    }

    /// Kaiser window evaluated at `t` in `[-1, 1]`; zero outside.
    pub fn kaiser(t: f64, beta: f64) -> f64 {
        if t.abs() > 1.0 {
            return 0.0;
        }
        Self::bessel_i0(beta * (1.0 - t * t).sqrt()) / Self::bessel_i0(beta)
    }
}
