use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

use geoyolo::utils::{create_progress_bar, track_sources};
use geoyolo::{
    label_ids, load_rasters, read_label_dir, AnnotationParser, Args, BoxGeoreferencer,
    Capabilities, Chipper, Persister, Result,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // Check that the input directories exist
    for (name, dir) in [("labels_dir", &args.labels_dir), ("images_dir", &args.images_dir)] {
        if !dir.is_dir() {
            error!("The specified {} does not exist: {}", name, dir.display());
            return ExitCode::FAILURE;
        }
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let capabilities = Capabilities::detect();
    let image_ids = label_ids(&args.labels_dir)?;
    let records = read_label_dir(&args.labels_dir)?;
    info!(
        "Found {} box records for {} images",
        records.len(),
        image_ids.len()
    );

    let pb = create_progress_bar(image_ids.len() as u64, "Chipping");

    // Every label file gets a table, so images without boxes are still chipped
    let tables = AnnotationParser::new(records.into_iter().map(Ok), &capabilities)?
        .with_image_ids(image_ids.clone());
    let rasters = track_sources(load_rasters(&args.images_dir, image_ids), &pb);
    let geometries =
        BoxGeoreferencer::new(rasters, tables, &capabilities)?.with_pairing(args.pairing());
    let chips = Chipper::new(geometries, args.window_spec(), &capabilities)?
        .with_windower(args.windower());
    let mut persister = Persister::new(chips, args.persist_config(), &capabilities)?;

    for item in persister.by_ref() {
        item.inspect_err(|_| pb.abandon())?;
    }
    pb.finish_with_message("Done");

    persister.stats().print_summary();
    info!(
        "Dataset written to {}",
        persister.output_dirs().images_dir.display()
    );
    Ok(())
}
