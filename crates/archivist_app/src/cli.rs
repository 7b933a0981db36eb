//! Command line surface for the archivist binary.

use std::io::{self, Write};
use std::path::PathBuf;

use archivist_engine::DEFAULT_WORKER_COUNT;
use clap::Parser;

/// Download a full album from a khinsider-style track listing.
#[derive(Debug, Parser)]
#[command(name = "archivist")]
#[command(version, about = "Download full albums from track listing pages", long_about = None)]
pub struct Args {
    /// Album page URL. Prompted for when omitted.
    pub album_url: Option<String>,

    /// Directory the album folder is created in.
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Tracks downloaded at the same time.
    #[arg(short, long, value_name = "N", default_value_t = DEFAULT_WORKER_COUNT)]
    pub workers: usize,

    /// Log debug detail to the log file.
    #[arg(short, long)]
    pub verbose: bool,

    /// Where the log file goes.
    #[arg(long, value_name = "FILE", default_value = "archivist.log")]
    pub log_file: PathBuf,

    /// Skip writing album.json next to the tracks.
    #[arg(long)]
    pub no_manifest: bool,
}

impl Args {
    /// The album URL, read from the terminal when it was not on the command
    /// line. Lets the binary work when launched with no arguments at all.
    pub fn album_url_or_prompt(&self) -> io::Result<String> {
        if let Some(url) = &self.album_url {
            return Ok(url.trim().to_string());
        }
        let mut out = io::stdout();
        write!(out, "Album URL: ")?;
        out.flush()?;
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}
