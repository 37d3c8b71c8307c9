use crate::plane::Plane;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PredictionMode {
    Planar = 0,
    Dc = 1,
    Horizontal = 2,
    Vertical = 3,
}

/// Mode tree codes, one adaptive context per depth.
const MODE_BINS: [&[bool]; 4] = [
    &[false],
    &[true, false],
    &[true, true, false],
    &[true, true, true],
];

impl PredictionMode {
    /// Enumeration order; also the RD search order and tie-break priority.
    pub const ALL: [PredictionMode; 4] = [
        PredictionMode::Planar,
        PredictionMode::Dc,
        PredictionMode::Horizontal,
        PredictionMode::Vertical,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn bins(self) -> &'static [bool] {
        MODE_BINS[self.index()]
    }

    pub fn name(self) -> &'static str {
        match self {
            PredictionMode::Planar => "planar",
            PredictionMode::Dc => "dc",
            PredictionMode::Horizontal => "horizontal",
            PredictionMode::Vertical => "vertical",
        }
    }
}

struct Neighbours {
    above: Vec<u8>,
    left: Vec<u8>,
    have_above: bool,
    have_left: bool,
}

// Missing edges borrow the nearest available neighbour sample, or mid-grey
// when the block has no neighbours at all.
fn gather_neighbours(recon: &Plane, x: usize, y: usize, n: usize) -> Neighbours {
    let have_above = y > 0;
    let have_left = x > 0;

    let above = if have_above {
        (0..n).map(|c| recon.sample(x + c, y - 1)).collect()
    } else if have_left {
        vec![recon.sample(x - 1, y); n]
    } else {
        vec![128; n]
    };

    let left = if have_left {
        (0..n).map(|r| recon.sample(x - 1, y + r)).collect()
    } else if have_above {
        vec![recon.sample(x, y - 1); n]
    } else {
        vec![128; n]
    };

    Neighbours {
        above,
        left,
        have_above,
        have_left,
    }
}

fn predict_dc(above: &[u8], left: &[u8], have_above: bool, have_left: bool, w: usize, h: usize) -> Vec<u8> {
    let val = if have_above && have_left {
        let sum: u32 = above[..w].iter().chain(left[..h].iter()).map(|&x| x as u32).sum();
        ((sum + (w + h) as u32 / 2) / (w + h) as u32) as u8
    } else if have_above {
        let sum: u32 = above[..w].iter().map(|&x| x as u32).sum();
        ((sum + w as u32 / 2) / w as u32) as u8
    } else if have_left {
        let sum: u32 = left[..h].iter().map(|&x| x as u32).sum();
        ((sum + h as u32 / 2) / h as u32) as u8
    } else {
        128
    };
    vec![val; w * h]
}

fn predict_v(above: &[u8], w: usize, h: usize) -> Vec<u8> {
    let mut out = vec![0u8; w * h];
    for r in 0..h {
        out[r * w..r * w + w].copy_from_slice(&above[..w]);
    }
    out
}

fn predict_h(left: &[u8], w: usize, h: usize) -> Vec<u8> {
    let mut out = vec![0u8; w * h];
    for r in 0..h {
        out[r * w..r * w + w].fill(left[r]);
    }
    out
}

fn predict_planar(above: &[u8], left: &[u8], n: usize) -> Vec<u8> {
    let shift = n.trailing_zeros() + 1;
    let top_right = above[n - 1] as u32;
    let bottom_left = left[n - 1] as u32;
    let mut out = vec![0u8; n * n];
    for r in 0..n {
        for c in 0..n {
            let horz = (n - 1 - c) as u32 * left[r] as u32 + (c + 1) as u32 * top_right;
            let vert = (n - 1 - r) as u32 * above[c] as u32 + (r + 1) as u32 * bottom_left;
            out[r * n + c] = ((horz + vert + n as u32) >> shift) as u8;
        }
    }
    out
}

/// Predicts the `n x n` block at `(x, y)` from the reconstructed samples
/// directly above and to the left of it.
pub fn predict(recon: &Plane, x: usize, y: usize, n: usize, mode: PredictionMode) -> Vec<u8> {
    let nb = gather_neighbours(recon, x, y, n);
    match mode {
        PredictionMode::Planar => predict_planar(&nb.above, &nb.left, n),
        PredictionMode::Dc => predict_dc(&nb.above, &nb.left, nb.have_above, nb.have_left, n, n),
        PredictionMode::Horizontal => predict_h(&nb.left, n, n),
        PredictionMode::Vertical => predict_v(&nb.above, n, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_plane() -> Plane {
        let samples = (0..64u32).map(|i| ((i % 8) * 10 + (i / 8) * 3) as u8).collect();
        Plane::from_samples(8, 8, samples).unwrap()
    }

    #[test]
    fn mode_bins_follow_truncated_unary_tree() {
        assert_eq!(PredictionMode::Planar.bins(), &[false]);
        assert_eq!(PredictionMode::Dc.bins(), &[true, false]);
        assert_eq!(PredictionMode::Horizontal.bins(), &[true, true, false]);
        assert_eq!(PredictionMode::Vertical.bins(), &[true, true, true]);
    }

    #[test]
    fn enumeration_order_matches_index() {
        for (i, mode) in PredictionMode::ALL.iter().enumerate() {
            assert_eq!(mode.index(), i);
        }
    }

    #[test]
    fn first_block_predicts_mid_grey_for_every_mode() {
        let recon = gradient_plane();
        for mode in PredictionMode::ALL {
            assert_eq!(predict(&recon, 0, 0, 4, mode), vec![128; 16], "{mode:?}");
        }
    }

    #[test]
    fn v_pred_copies_above_row() {
        let recon = gradient_plane();
        let pred = predict(&recon, 4, 4, 4, PredictionMode::Vertical);
        let above: Vec<u8> = (4..8).map(|c| recon.sample(c, 3)).collect();
        for r in 0..4 {
            assert_eq!(&pred[r * 4..r * 4 + 4], &above[..]);
        }
    }

    #[test]
    fn h_pred_copies_left_column() {
        let recon = gradient_plane();
        let pred = predict(&recon, 4, 4, 4, PredictionMode::Horizontal);
        for r in 0..4 {
            assert!(pred[r * 4..r * 4 + 4].iter().all(|&s| s == recon.sample(3, 4 + r)));
        }
    }

    #[test]
    fn dc_prediction_top_only() {
        let recon = gradient_plane();
        let pred = predict(&recon, 0, 4, 4, PredictionMode::Dc);
        let sum: u32 = (0..4).map(|c| recon.sample(c, 3) as u32).sum();
        assert_eq!(pred[0] as u32, (sum + 2) / 4);
    }

    #[test]
    fn left_only_block_substitutes_above_row() {
        let recon = gradient_plane();
        let pred = predict(&recon, 4, 0, 4, PredictionMode::Vertical);
        assert!(pred.iter().all(|&s| s == recon.sample(3, 0)));
    }

    #[test]
    fn planar_on_flat_neighbours_is_flat() {
        let recon = Plane::solid(16, 16, 77);
        for n in [2, 4, 8] {
            assert!(predict(&recon, n, n, n, PredictionMode::Planar).iter().all(|&s| s == 77));
        }
    }

    #[test]
    fn planar_blends_toward_corners() {
        let mut recon = Plane::solid(8, 8, 0);
        for c in 0..8 {
            recon.samples[3 * 8 + c] = 200;
        }
        let pred = predict(&recon, 4, 4, 4, PredictionMode::Planar);
        assert!(pred[0] > pred[12], "top row should be closer to the bright above row");
    }
}
