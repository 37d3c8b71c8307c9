use ivc::{EncodeConfig, Plane};

fn create_test_image(width: u32, height: u32, pixel_fn: impl Fn(u32, u32) -> u8) -> Plane {
    let samples = (0..height)
        .flat_map(|row| (0..width).map(move |col| (col, row)))
        .map(|(col, row)| pixel_fn(col, row))
        .collect();
    Plane::from_samples(width, height, samples).unwrap()
}

fn psnr(a: &Plane, b: &Plane) -> f64 {
    let mse = a
        .samples
        .iter()
        .zip(&b.samples)
        .map(|(&x, &y)| (x as f64 - y as f64).powi(2))
        .sum::<f64>()
        / a.samples.len() as f64;
    if mse == 0.0 {
        f64::INFINITY
    } else {
        10.0 * (255.0 * 255.0 / mse).log10()
    }
}

fn main() {
    test_pattern("row_gradient", 320, 240, |_col, row| (row * 256 / 240) as u8);

    test_pattern("stripes", 320, 240, |col, _row| if (col / 4) % 2 == 0 { 200 } else { 50 });

    test_pattern("failing_pattern", 320, 240, |col, row| {
        ((row % 256) as u8)
            .wrapping_add((col % 64) as u8)
            .wrapping_mul(3)
    });

    test_pattern("odd_size", 101, 77, |col, row| ((col * col + row * 3) % 256) as u8);
}

fn test_pattern(name: &str, w: u32, h: u32, f: impl Fn(u32, u32) -> u8) {
    let image = create_test_image(w, h, f);
    let dir = std::env::temp_dir();
    image.write_pgm(&dir.join(format!("ivc_{name}.pgm"))).unwrap();

    for qp in [8u8, 24, 36] {
        let config = EncodeConfig {
            qp,
            ..Default::default()
        };
        let stream = ivc::encode(&image, &config).unwrap();
        std::fs::write(dir.join(format!("ivc_{name}_q{qp}.ivc")), &stream).unwrap();

        let status = match ivc::decode(&stream) {
            Ok(decoded) => format!(
                "{} bytes, {:.3} bpp, PSNR {:.2} dB",
                stream.len(),
                stream.len() as f64 * 8.0 / (w * h) as f64,
                psnr(&image, &decoded)
            ),
            Err(e) => format!("FAIL: {e}"),
        };
        eprintln!("{name} ({w}x{h}) qp {qp}: {status}");
    }
}
