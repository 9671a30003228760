//! Command-line entry point.

use anyhow::Context;
use clap::Parser;
use log::{error, info};
use prism::core::config::Config;
use prism::core::renderer::Renderer;
use prism::loaders;
use std::path::PathBuf;
use std::process::ExitCode;

/// A spectral CPU path tracer.
#[derive(Parser, Debug)]
#[command(name = "prism", version)]
struct Args {
    /// Scene file to render.
    input: PathBuf,

    /// Output PNG path.
    output: PathBuf,

    /// Path samples per pixel.
    samples: usize,

    /// Output width in pixels.
    width: usize,

    /// Output height in pixels.
    height: usize,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return ExitCode::FAILURE;
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    Config::install(Config {
        path_samples: args.samples,
        ..Config::default()
    });
    info!("Overriding # of path samples to {}", args.samples);

    let mut renderer = Renderer::new();

    info!("Parsing scene...");
    let mut scene = loaders::load(&args.input)
        .with_context(|| format!("unable to parse scene \"{}\"", args.input.display()))?;

    info!("Rendering scene...");
    let image = renderer.render(&mut scene, args.width, args.height);
    anyhow::ensure!(
        image.colours.len() == args.width * args.height,
        "renderer produced no image"
    );
    info!("Finished rendering in {:.3} seconds!", image.time);
    info!(
        "Time breakdown:\n\t  Preprocessing: {:.3} seconds\n\t  Rendering: {:.3} seconds\n\t  PostProcessing: {:.3} seconds",
        image.prepare,
        image.time - image.prepare - image.post,
        image.post
    );

    info!("Saving image to {}...", args.output.display());
    image
        .save(&args.output)
        .with_context(|| format!("unable to save image \"{}\"", args.output.display()))?;
    renderer
        .save_composites(&args.output)
        .context("unable to save composite files")?;
    info!("Finished saving image!");
    Ok(())
}
