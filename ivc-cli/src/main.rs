#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use log::{LevelFilter, info};

use ivc::{DecodeConfig, Decoder, EncodeConfig, Encoder, ModeDecision, Plane, PredictionMode, StreamVersion};

#[derive(Parser, Debug)]
#[command(name = "ivc", version, about = "Block-based still-image codec")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a PGM image (or a generated test pattern) into an ivc stream.
    Encode(EncodeArgs),
    /// Decode an ivc stream into a PGM image.
    Decode(DecodeArgs),
}

#[derive(clap::Args, Debug)]
struct EncodeArgs {
    /// Input PGM (P5 or P2). Omit when using --pattern.
    #[arg(required_unless_present = "pattern")]
    input: Option<PathBuf>,

    /// Output stream path.
    #[arg(short, long)]
    output: PathBuf,

    /// Generate a test pattern instead of reading a file.
    #[arg(long, value_enum, conflicts_with = "input")]
    pattern: Option<Pattern>,

    /// Pattern size as WIDTHxHEIGHT.
    #[arg(long, default_value = "256x256", value_parser = parse_size)]
    size: Size,

    /// Block size: power of two in 2..=64.
    #[arg(short, long, default_value_t = ivc::DEFAULT_BLOCK_SIZE)]
    block_size: u16,

    /// Quantization parameter; the step size doubles every 4.
    #[arg(short, long, default_value_t = ivc::DEFAULT_QP)]
    qp: u8,

    /// Lagrange multiplier; derived from the QP when omitted.
    #[arg(long)]
    lambda: Option<f64>,

    /// Prediction mode decision.
    #[arg(short, long, value_enum, default_value_t = ModeArg::Rd)]
    mode: ModeArg,

    /// Write the legacy raw format instead of the coded format.
    #[arg(long)]
    raw: bool,

    /// Also write the encoder's reconstruction as PGM.
    #[arg(long)]
    recon: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct DecodeArgs {
    /// Input stream path.
    input: PathBuf,

    /// Output PGM path.
    #[arg(short, long)]
    output: PathBuf,

    /// Decode raw-format block columns in parallel.
    #[arg(short, long)]
    parallel: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ModeArg {
    Rd,
    Planar,
    Dc,
    Horizontal,
    Vertical,
}

impl From<ModeArg> for ModeDecision {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Rd => ModeDecision::RateDistortion,
            ModeArg::Planar => ModeDecision::Fixed(PredictionMode::Planar),
            ModeArg::Dc => ModeDecision::Fixed(PredictionMode::Dc),
            ModeArg::Horizontal => ModeDecision::Fixed(PredictionMode::Horizontal),
            ModeArg::Vertical => ModeDecision::Fixed(PredictionMode::Vertical),
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Pattern {
    /// Light grid lines over a dark background.
    Grid,
    /// Diagonal luma ramp.
    Gradient,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Size {
    width: u32,
    height: u32,
}

fn parse_size(s: &str) -> Result<Size, String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("invalid size '{s}': expected WIDTHxHEIGHT"))?;
    let parse = |v: &str| {
        v.parse::<u32>()
            .map_err(|_| format!("invalid size '{s}': '{v}' is not a number"))
    };
    Ok(Size {
        width: parse(w)?,
        height: parse(h)?,
    })
}

fn generate_pattern(pattern: Pattern, Size { width, height }: Size) -> Result<Plane> {
    let samples = (0..height)
        .flat_map(|y| (0..width).map(move |x| (x, y)))
        .map(|(x, y)| match pattern {
            Pattern::Grid => {
                if x % 32 < 2 || y % 32 < 2 {
                    220
                } else {
                    40
                }
            }
            Pattern::Gradient => ((x + y) * 255 / (width + height).max(2)) as u8,
        })
        .collect();
    Ok(Plane::from_samples(width, height, samples)?)
}

fn psnr(a: &Plane, b: &Plane) -> f64 {
    let ssd: f64 = a
        .samples
        .iter()
        .zip(&b.samples)
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum();
    if ssd == 0.0 {
        return f64::INFINITY;
    }
    let mse = ssd / a.samples.len() as f64;
    10.0 * (255.0 * 255.0 / mse).log10()
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let image = match (&args.input, args.pattern) {
        (Some(path), _) => {
            Plane::read_pgm(path).with_context(|| format!("failed to read {}", path.display()))?
        }
        (None, Some(pattern)) => generate_pattern(pattern, args.size)?,
        (None, None) => bail!("no input given"),
    };

    let config = EncodeConfig {
        block_size: args.block_size,
        qp: args.qp,
        lambda: args.lambda,
        mode_decision: args.mode.into(),
        version: if args.raw {
            StreamVersion::Raw
        } else {
            StreamVersion::Coded
        },
    };

    let start = Instant::now();
    let encoder = Encoder::new(config).context("invalid encoder settings")?;
    let out = encoder.encode(&image)?;
    let elapsed = start.elapsed();

    fs::write(&args.output, &out.bitstream)
        .with_context(|| format!("failed to write {}", args.output.display()))?;

    let bpp = out.bitstream.len() as f64 * 8.0 / (image.width as f64 * image.height as f64);
    info!(
        "{}x{} -> {} bytes ({bpp:.3} bpp), PSNR {:.2} dB, {:.1} ms",
        image.width,
        image.height,
        out.bitstream.len(),
        psnr(&image, &out.reconstruction),
        elapsed.as_secs_f64() * 1000.0
    );
    if out.stats.mode_counts.iter().any(|&c| c > 0) {
        let counts: Vec<String> = PredictionMode::ALL
            .iter()
            .map(|m| format!("{}={}", m.name(), out.stats.mode_counts[m.index()]))
            .collect();
        info!("modes: {}", counts.join(" "));
    }

    if let Some(path) = &args.recon {
        out.reconstruction
            .write_pgm(path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn run_decode(args: DecodeArgs) -> Result<()> {
    let data = fs::read(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;

    let start = Instant::now();
    let decoder = Decoder::new(DecodeConfig {
        parallel: args.parallel,
    });
    let image = decoder
        .decode(&data)
        .with_context(|| format!("failed to decode {}", args.input.display()))?;
    info!(
        "decoded {}x{} in {:.1} ms",
        image.width,
        image.height,
        start.elapsed().as_secs_f64() * 1000.0
    );

    image
        .write_pgm(&args.output)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();

    match cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn size_parses_width_and_height() {
        assert_eq!(
            parse_size("640x480"),
            Ok(Size {
                width: 640,
                height: 480
            })
        );
        assert_eq!(parse_size("3X2").map(|s| s.height), Ok(2));
        assert!(parse_size("640").is_err());
        assert!(parse_size("ax2").is_err());
    }

    #[test]
    fn mode_argument_maps_to_decision() {
        assert_eq!(ModeDecision::from(ModeArg::Rd), ModeDecision::RateDistortion);
        assert_eq!(
            ModeDecision::from(ModeArg::Vertical),
            ModeDecision::Fixed(PredictionMode::Vertical)
        );
    }

    #[test]
    fn encode_args_parse() {
        let cli = Cli::try_parse_from([
            "ivc", "-v", "encode", "in.pgm", "-o", "out.ivc", "-q", "30", "--raw",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 1);
        match cli.command {
            Command::Encode(args) => {
                assert_eq!(args.qp, 30);
                assert!(args.raw);
                assert_eq!(args.block_size, ivc::DEFAULT_BLOCK_SIZE);
                assert_eq!(args.mode, ModeArg::Rd);
            }
            Command::Decode(_) => panic!("expected encode"),
        }
    }

    #[test]
    fn pattern_replaces_input() {
        let cli = Cli::try_parse_from([
            "ivc", "encode", "--pattern", "grid", "--size", "64x32", "-o", "o.ivc",
        ])
        .unwrap();
        let Command::Encode(args) = cli.command else {
            panic!("expected encode");
        };
        assert_eq!(args.pattern, Some(Pattern::Grid));
        let plane = generate_pattern(Pattern::Grid, args.size).unwrap();
        assert_eq!((plane.width, plane.height), (64, 32));
        assert_eq!(plane.sample(0, 5), 220);
        assert_eq!(plane.sample(5, 5), 40);
    }

    #[test]
    fn encode_requires_input_or_pattern() {
        assert!(Cli::try_parse_from(["ivc", "encode", "-o", "o.ivc"]).is_err());
    }

    #[test]
    fn psnr_of_identical_planes_is_infinite() {
        let plane = Plane::solid(4, 4, 9);
        assert!(psnr(&plane, &plane).is_infinite());
    }
}
