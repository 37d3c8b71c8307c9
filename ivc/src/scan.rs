/// Diagonal scan for an `n x n` block: entry `i` is the raster index of the
/// coefficient at scan position `i`.
///
/// Anti-diagonals are visited from the DC corner outwards and each one is
/// read from its bottom-left end to its top-right end.
pub fn diagonal_scan(n: usize) -> Vec<u16> {
    let mut scan = Vec::with_capacity(n * n);
    for line in 1..(2 * n) {
        let start_col = line.saturating_sub(n);
        let count = line.min(n - start_col).min(n);
        for j in 0..count {
            let row = line.min(n) - j - 1;
            let col = start_col + j;
            scan.push((row * n + col) as u16);
        }
    }
    scan
}

/// Reorders a raster block into scan order.
pub fn to_scan_order(raster: &[i32], scan: &[u16]) -> Vec<i32> {
    scan.iter().map(|&pos| raster[pos as usize]).collect()
}

/// Inverse of [`to_scan_order`].
pub fn from_scan_order(scanned: &[i32], scan: &[u16]) -> Vec<i32> {
    let mut raster = vec![0i32; scanned.len()];
    for (&value, &pos) in scanned.iter().zip(scan) {
        raster[pos as usize] = value;
    }
    raster
}
