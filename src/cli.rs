//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use iiif_downloader_core::{PageRange, parse_range};

/// Download every page image of a IIIF manifest.
///
/// Accepts a Presentation API 2 or 3 manifest, or a collection of them, from a
/// local file or a URL. Each manifest is saved to its own directory; a
/// directory whose pages did not all download is prefixed with `ERR_`.
#[derive(Parser, Debug)]
#[command(name = "iiif-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Manifest or collection: local path or http(s) URL
    #[arg(short, long, value_name = "PATH_OR_URL")]
    pub manifest: String,

    /// Directory under which one folder per manifest is created [default: .]
    #[arg(short, long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Pages to download: `all` or FIRST-LAST (1-based, inclusive)
    #[arg(short, long, default_value = "all", value_parser = parse_pages)]
    pub pages: PageRange,

    /// Download pages whose file already exists
    #[arg(short, long)]
    pub force: bool,

    /// Name files after canvas labels instead of p001, p002, ...
    #[arg(long)]
    pub use_labels: bool,

    /// Download every image of a canvas, not only the first
    #[arg(long)]
    pub all_images: bool,

    /// Request every page at this width in pixels
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    pub width: Option<u32>,

    /// Referer header sent with every request
    #[arg(long)]
    pub referer: Option<String>,

    /// Query each image service's info.json for a larger width
    #[arg(long)]
    pub image_info: bool,

    /// Per-request timeout in seconds (1-3600) [default: 30]
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..=3600))]
    pub timeout: Option<u64>,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

fn parse_pages(value: &str) -> Result<PageRange, String> {
    parse_range(value).map_err(|e| e.to_string())
}
