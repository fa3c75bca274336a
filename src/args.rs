use clap::{Parser, Subcommand, ValueEnum};
use raiplay_dl::DownloaderConfig;
use raiplay_dl::downloaders::DownloaderKind;
use raiplay_dl::parsers::ParserBackend;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "raiplay-dl")]
#[command(about = "Download RaiPlay episodes and media linked from web pages")]
#[command(version)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory to save downloads in
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    /// HTML parser backend
    #[arg(long, value_enum, global = true)]
    pub parser: Option<ParserArg>,

    /// Media download delegate
    #[arg(long, value_enum, global = true)]
    pub downloader: Option<DownloaderArg>,

    /// Extra attempts for page fetches that fail transiently
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Do not draw progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download media found on any web page
    Page {
        /// Page URL
        url: String,

        /// Download every media reference instead of the first one
        #[arg(long)]
        all: bool,
    },

    /// Download a single RaiPlay episode
    Episode {
        /// Episode page URL (ending in .html)
        url: String,
    },

    /// Download the episodes of a RaiPlay series season
    Series {
        /// Series page URL
        url: String,

        /// Season number, starting at 1
        #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
        season: u32,

        /// Index of the first episode to download (0 for all)
        #[arg(short, long, default_value_t = 0)]
        first_episode: usize,

        /// Number of episodes downloaded at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// List the formats yt-dlp can fetch for a URL
    Formats {
        /// Page or media URL
        url: String,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ParserArg {
    Dom,
    Fast,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum DownloaderArg {
    Auto,
    YtDlp,
    Http,
}

impl From<ParserArg> for ParserBackend {
    fn from(arg: ParserArg) -> Self {
        match arg {
            ParserArg::Dom => ParserBackend::Dom,
            ParserArg::Fast => ParserBackend::Fast,
        }
    }
}

impl From<DownloaderArg> for DownloaderKind {
    fn from(arg: DownloaderArg) -> Self {
        match arg {
            DownloaderArg::Auto => DownloaderKind::Auto,
            DownloaderArg::YtDlp => DownloaderKind::YtDlp,
            DownloaderArg::Http => DownloaderKind::Http,
        }
    }
}

/// Apply command-line overrides on top of the loaded configuration
pub fn apply_overrides(args: &Args, mut config: DownloaderConfig) -> DownloaderConfig {
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(parser) = args.parser {
        config.parser_backend = parser.into();
    }
    if let Some(downloader) = args.downloader {
        config.downloader = downloader.into();
    }
    if let Some(retries) = args.retries {
        config.retries = retries;
    }
    if let Command::Series {
        concurrency: Some(concurrency),
        ..
    } = &args.command
    {
        config.max_concurrency = *concurrency;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_arguments() {
        let args = Args::try_parse_from([
            "raiplay-dl",
            "--output",
            "/tmp/out",
            "series",
            "https://www.raiplay.it/programmi/x",
            "--season",
            "2",
            "--first-episode",
            "3",
            "--concurrency",
            "4",
            "--parser",
            "fast",
        ])
        .unwrap();

        let config = apply_overrides(&args, DownloaderConfig::default());
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.parser_backend, ParserBackend::Fast);
        assert_eq!(config.max_concurrency, 4);

        match args.command {
            Command::Series {
                season,
                first_episode,
                ..
            } => {
                assert_eq!(season, 2);
                assert_eq!(first_episode, 3);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_season_zero_rejected() {
        let result = Args::try_parse_from(["raiplay-dl", "series", "https://x.test", "-s", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_downloader_names() {
        let args =
            Args::try_parse_from(["raiplay-dl", "--downloader", "yt-dlp", "page", "https://x.test"])
                .unwrap();
        let config = apply_overrides(&args, DownloaderConfig::default());
        assert_eq!(config.downloader, DownloaderKind::YtDlp);
    }
}
