//! archivist: download whole albums from track listing pages.

mod cli;
mod logging;
mod progress;
mod report;

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use archivist_engine::{
    album_dir_name, parse_album, run_batch, write_manifest, AudioPageResolver, BatchOptions,
    DownloadSettings, FetchSettings, HttpTrackDownloader, PageFetcher, ProgressSink,
};
use clap::Parser;
use engine_logging::{engine_error, engine_info};

use crate::cli::Args;
use crate::progress::TerminalProgress;

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    logging::initialize(&args.log_file, args.verbose);

    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            eprintln!("{failed} track(s) failed; see the log for details");
            ExitCode::FAILURE
        }
        Err(err) => {
            engine_error!("fatal: {err:#}");
            eprintln!("archivist error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Fetch, parse and download one album. Returns the failed track count; a
/// hard error here means nothing could even start.
async fn run(args: Args) -> anyhow::Result<usize> {
    let album_url = args.album_url_or_prompt().context("reading album URL")?;
    if album_url.is_empty() {
        anyhow::bail!("no album URL given");
    }

    let fetcher = PageFetcher::new(&FetchSettings::default())?;
    let started = Instant::now();

    engine_info!("fetching album page {album_url}");
    let page = fetcher.fetch_html(&album_url).await?;
    let album = parse_album(&page.html, &page.url)?;

    println!("{}", report::album_block(&album.info, album.tracks.len()));

    let album_dir = args.output_dir.join(album_dir_name(&album.info.name));
    let resolver = Arc::new(AudioPageResolver::new(fetcher));
    let downloader = Arc::new(HttpTrackDownloader::new(&DownloadSettings::default())?);
    let progress = Arc::new(TerminalProgress::new(album.tracks.len()));
    let sink: Arc<dyn ProgressSink> = progress.clone();

    let options = BatchOptions {
        worker_count: args.workers,
    };
    let summary = run_batch(resolver, downloader, album.tracks, &album_dir, &options, sink).await?;
    progress.finish();

    if !args.no_manifest {
        let saved_utc = chrono::Utc::now().to_rfc3339();
        write_manifest(&album_dir, &album.info, &album_url, &saved_utc, &summary)
            .context("writing album.json")?;
    }

    print!("{}", report::summary_block(&summary, started.elapsed()));
    println!("Saved to {}", album_dir.display());
    Ok(summary.failed())
}
