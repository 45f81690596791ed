use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use qrsight::{
    Binarizer, DecoderConfig, ECLevel, ErrorCategory, MaskPattern, QRBuilder, QRReader, Version,
};

#[derive(Parser, Debug)]
#[command(name = "qrsight", version, about = "Read QR codes from images and render test symbols")]
struct Cli {
    /// Enable debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Decode the QR code in an image
    Decode {
        image: PathBuf,

        /// Threshold per block instead of one global threshold
        #[arg(long)]
        adaptive: bool,

        /// Luminance range below which an image is rejected
        #[arg(long, default_value_t = 8)]
        min_contrast: u8,
    },
    /// Encode text into a QR code
    Encode {
        text: String,

        /// Output png, prints the symbol to the terminal when absent
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Smallest fitting version when absent
        #[arg(long = "version")]
        qr_version: Option<usize>,

        #[arg(long, default_value = "M")]
        ec: ECLevel,

        /// Lowest penalty mask when absent
        #[arg(long)]
        mask: Option<u8>,

        /// Pixels per module
        #[arg(long, default_value_t = 8)]
        scale: u32,
    },
}

fn init_cli_logger(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qrsight=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("qrsight=info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

fn exit_code(category: ErrorCategory) -> ExitCode {
    match category {
        ErrorCategory::NoCode => ExitCode::from(2),
        ErrorCategory::Damaged => ExitCode::from(3),
        ErrorCategory::Malformed => ExitCode::from(4),
    }
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_cli_logger(cli.verbose);

    match cli.command {
        Commands::Decode { image: path, adaptive, min_contrast } => {
            let img = image::open(&path)
                .with_context(|| format!("Failed to open image {}", path.display()))?;

            let mut config = DecoderConfig::new();
            config.min_contrast(min_contrast);
            if adaptive {
                config.binarizer(Binarizer::Adaptive);
            }

            match QRReader::new(config).decode(&img) {
                Ok(payload) => {
                    info!(metadata = %payload.metadata, mode = ?payload.mode, "Decoded");
                    println!("{}", payload.text);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    let category = e.category();
                    eprintln!("{e} ({category:?}): {}", category.guidance());
                    Ok(exit_code(category))
                }
            }
        }
        Commands::Encode { text, output, qr_version, ec, mask, scale } => {
            let mut builder = QRBuilder::new(text.as_bytes());
            builder.ec_level(ec);
            if let Some(v) = qr_version {
                builder.version(Version::new(v));
            }
            if let Some(m) = mask {
                builder.mask(MaskPattern::try_from(m)?);
            }
            let qr = builder.build()?;
            info!(metadata = %qr.metadata(), "Encoded");

            match output {
                Some(path) => {
                    qr.to_image(scale)
                        .save(&path)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    info!(path = %path.display(), "Saved");
                }
                None => print!("{}", qr.to_str(1)),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
