//! Pulse envelope helpers.

use num_complex::Complex64;

/// A sin² envelope of `n` samples: a smooth bump rising from zero at the
/// first sample and falling back to zero at the last.
pub fn sin2(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![1.0];
    }
    (0..n)
        .map(|k| {
            let x = k as f64 / (n - 1) as f64;
            let s = (std::f64::consts::PI * x).sin();
            s * s
        })
        .collect()
}

/// Scale a real envelope into a complex template with equal I and Q
/// amplitudes, the shape `setup_template` consumes.
pub fn scaled_template(envelope: &[f64], amplitude: f64) -> Vec<Complex64> {
    envelope
        .iter()
        .map(|&e| Complex64::new(amplitude * e, amplitude * e))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sin2_endpoints() {
        let env = sin2(64);
        assert_eq!(env.len(), 64);
        assert!(env[0].abs() < 1e-12);
        assert!(env[63].abs() < 1e-12);
        // peak in the middle
        let max = env.iter().cloned().fold(0.0f64, f64::max);
        assert!((max - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_sin2_degenerate() {
        assert!(sin2(0).is_empty());
        assert_eq!(sin2(1), vec![1.0]);
    }

    #[test]
    fn test_scaled_template() {
        let tpl = scaled_template(&[0.0, 1.0], 0.5);
        assert_eq!(tpl[1], Complex64::new(0.5, 0.5));
    }
}
