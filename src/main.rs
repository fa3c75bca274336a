use clap::Parser;
use raiplay_dl::results::BatchSummary;
use raiplay_dl::{DownloaderConfig, Error, Pipeline};
use std::process::ExitCode;

mod args;
use args::{Args, Command, apply_overrides};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            ::log::error!("{} stage failed: {}", e.stage(), e);
            eprintln!("Error ({}): {}", e.stage(), e);
            ExitCode::FAILURE
        }
    }
}

/// Runs the selected command; `Ok(false)` means some items failed
async fn run(args: Args) -> Result<bool, Error> {
    let config = match &args.config {
        Some(path) => {
            ::log::info!("Loading configuration from {}", path.display());
            DownloaderConfig::from_file(path)?
        }
        None => DownloaderConfig::default(),
    }
    .with_env_overrides();
    let config = apply_overrides(&args, config);

    let pipeline = Pipeline::new(config)?.with_progress(!args.no_progress);
    let start_time = std::time::Instant::now();

    let ok = match &args.command {
        Command::Page { url, all } => {
            let summary = pipeline.download_page(url, *all).await?;
            if *all {
                print_summary(&summary);
            }
            summary.all_succeeded()
        }
        Command::Episode { url } => match pipeline.download_episode(url).await {
            Ok(_) => true,
            Err(e @ Error::Download { .. }) => {
                // Show what is available so a different format can be chosen
                match pipeline.list_formats(url).await {
                    Ok(listing) => eprintln!("Available formats:\n{}", listing),
                    Err(list_err) => ::log::warn!("Could not list formats: {}", list_err),
                }
                return Err(e);
            }
            Err(e) => return Err(e),
        },
        Command::Series {
            url,
            season,
            first_episode,
            ..
        } => {
            let season_index = (*season as usize).saturating_sub(1);
            let summary = pipeline
                .download_series(url, season_index, *first_episode)
                .await?;
            print_summary(&summary);
            summary.all_succeeded()
        }
        Command::Formats { url } => {
            print!("{}", pipeline.list_formats(url).await?);
            true
        }
    };

    ::log::info!(
        "Finished in {:.2} seconds",
        start_time.elapsed().as_secs_f64()
    );
    Ok(ok)
}

fn print_summary(summary: &BatchSummary) {
    let rule = "=".repeat(60);
    println!("\n{}", rule);
    println!("BATCH DOWNLOAD SUMMARY");
    println!("{}", rule);
    println!("Total: {}", summary.total());
    println!("✓ Successful: {}", summary.succeeded());
    println!("✗ Failed: {}", summary.failed());

    if summary.failed() > 0 {
        println!("\nFailed downloads:");
        for (url, reason) in summary.failures() {
            println!("  ✗ {}: {}", url, reason);
        }
    }
}
