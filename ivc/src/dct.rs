/// Orthonormal 2-D DCT-II for square blocks, applied as separable row and
/// column passes over a precomputed basis.
#[derive(Debug, Clone)]
pub struct Dct {
    n: usize,
    /// `basis[k * n + i]` is the weight of sample `i` in coefficient `k`.
    basis: Vec<f64>,
}

impl Dct {
    pub fn new(n: usize) -> Self {
        let nf = n as f64;
        let mut basis = vec![0.0; n * n];
        for k in 0..n {
            let scale = if k == 0 { (1.0 / nf).sqrt() } else { (2.0 / nf).sqrt() };
            for i in 0..n {
                let angle = std::f64::consts::PI * (2 * i + 1) as f64 * k as f64 / (2.0 * nf);
                basis[k * n + i] = scale * angle.cos();
            }
        }
        Self { n, basis }
    }

    fn fwd_1d(&self, data: &mut [f64], offset: usize, stride: usize, scratch: &mut [f64]) {
        let n = self.n;
        for (k, out) in scratch.iter_mut().enumerate() {
            let row = &self.basis[k * n..(k + 1) * n];
            *out = row
                .iter()
                .enumerate()
                .map(|(i, &b)| b * data[offset + i * stride])
                .sum();
        }
        for (i, &v) in scratch.iter().enumerate() {
            data[offset + i * stride] = v;
        }
    }

    fn inv_1d(&self, data: &mut [f64], offset: usize, stride: usize, scratch: &mut [f64]) {
        let n = self.n;
        for (i, out) in scratch.iter_mut().enumerate() {
            *out = (0..n)
                .map(|k| self.basis[k * n + i] * data[offset + k * stride])
                .sum();
        }
        for (i, &v) in scratch.iter().enumerate() {
            data[offset + i * stride] = v;
        }
    }

    /// Row-major residual in, row-major coefficients out.
    pub fn forward(&self, residual: &[i32]) -> Vec<f64> {
        let n = self.n;
        let mut data: Vec<f64> = residual.iter().map(|&v| v as f64).collect();
        let mut scratch = vec![0.0; n];
        for r in 0..n {
            self.fwd_1d(&mut data, r * n, 1, &mut scratch);
        }
        for c in 0..n {
            self.fwd_1d(&mut data, c, n, &mut scratch);
        }
        data
    }

    pub fn inverse(&self, coeffs: &[f64]) -> Vec<f64> {
        let n = self.n;
        let mut data = coeffs.to_vec();
        let mut scratch = vec![0.0; n];
        for c in 0..n {
            self.inv_1d(&mut data, c, n, &mut scratch);
        }
        for r in 0..n {
            self.inv_1d(&mut data, r * n, 1, &mut scratch);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_zero_produces_all_zero() {
        let dct = Dct::new(4);
        assert!(dct.forward(&[0; 16]).iter().all(|&c| c == 0.0));
    }

    #[test]
    fn constant_block_is_dc_only() {
        for n in [2usize, 4, 8, 16] {
            let dct = Dct::new(n);
            let coeffs = dct.forward(&vec![10; n * n]);
            assert!((coeffs[0] - 10.0 * n as f64).abs() < 1e-9, "n={n}");
            assert!(coeffs[1..].iter().all(|c| c.abs() < 1e-9), "n={n}");
        }
    }

    #[test]
    fn roundtrip_recovers_residual() {
        let dct = Dct::new(8);
        let residual: Vec<i32> = (0..64).map(|i| (i * 37 % 255) - 128).collect();
        let back = dct.inverse(&dct.forward(&residual));
        for (a, b) in residual.iter().zip(&back) {
            assert!((*a as f64 - b).abs() < 1e-9);
        }
    }

    #[test]
    fn transform_preserves_energy() {
        let dct = Dct::new(16);
        let residual: Vec<i32> = (0..256).map(|i| (i * 91 % 61) - 30).collect();
        let coeffs = dct.forward(&residual);
        let spatial: f64 = residual.iter().map(|&v| (v * v) as f64).sum();
        let freq: f64 = coeffs.iter().map(|c| c * c).sum();
        assert!((spatial - freq).abs() < 1e-6 * spatial);
    }

    #[test]
    fn horizontal_ramp_lands_in_first_row() {
        let dct = Dct::new(4);
        let residual: Vec<i32> = (0..16).map(|i| (i % 4) * 8).collect();
        let coeffs = dct.forward(&residual);
        assert!(coeffs[1].abs() > 1.0);
        for r in 1..4 {
            assert!(coeffs[r * 4..r * 4 + 4].iter().all(|c| c.abs() < 1e-9));
        }
    }
}
