use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use focus_stack_rs::focus_stack::{BitDepth, FocusStackPipeline, StackConfig};
use focus_stack_rs::logger;

use tracing::info;

#[derive(Parser)]
#[command(name = "focus-stack")]
#[command(version, about = "Merge a focus bracket into one all-in-focus image", long_about = None)]
struct Args {
    /// Input frames; the first one is the reference
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Output file (.tif/.tiff via the TIFF encoder, other extensions via image)
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Treat frames as already aligned
    #[arg(long)]
    no_align: bool,

    /// Keep the full frame instead of the common area
    #[arg(long)]
    no_crop: bool,

    /// Write 16 bits per channel
    #[arg(long = "16bit")]
    sixteen_bit: bool,
}

impl Args {
    fn config(&self) -> StackConfig {
        StackConfig::builder()
            .previews(false)
            .align(!self.no_align)
            .crop(!self.no_crop)
            .output_depth(if self.sixteen_bit { BitDepth::Sixteen } else { BitDepth::Eight })
            .build()
    }
}

fn main() -> anyhow::Result<()> {
    logger::init();

    let args = Args::parse();
    info!("Stacking {} frames into {}", args.inputs.len(), args.output.display());

    let pipeline = FocusStackPipeline::new(args.config());
    let output = pipeline
        .stack_to_file(&args.inputs, &args.output, |progress| {
            if progress.is_running {
                info!(
                    "Progress: {}/{} ({:.0}%)",
                    progress.current,
                    progress.limit,
                    progress.fraction() * 100.0
                );
            }
        })
        .with_context(|| format!("failed to stack into {}", args.output.display()))?;

    let fallbacks = output.reports.iter().filter(|r| r.used_fallback()).count();
    info!(
        "Done: {}x{} (crop at {},{}), {} frame(s) used the rough alignment",
        output.image.width, output.image.height, output.crop.x, output.crop.y, fallbacks
    );
    Ok(())
}
