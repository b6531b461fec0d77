//! recwatch: poll live-stream channels and record whatever is live.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use stream_monitor::auth::{CredentialCache, HelixTokenExchange};
use stream_monitor::{MonitorConfig, PlatformProbe, Scheduler, StreamlinkRecorder};

#[derive(Parser, Debug)]
#[command(author, version, about = "Watches live channels and records their streams")]
struct Args {
    /// Twitch application client id
    #[arg(long, env = "TWITCH_CLIENT_ID")]
    twitch_client_id: String,

    /// Twitch application client secret
    #[arg(long, env = "TWITCH_CLIENT_SECRET")]
    twitch_client_secret: String,

    /// Twitch channel names to watch
    #[arg(long, env = "TWITCH_CHANNELS", value_delimiter = ',')]
    twitch_channels: Vec<String>,

    /// YouTube channel handles to watch (e.g. @somechannel)
    #[arg(long, env = "YOUTUBE_CHANNELS", value_delimiter = ',')]
    youtube_channels: Vec<String>,

    /// Seconds to sleep between polling cycles
    #[arg(long, env = "CHECK_INTERVAL", default_value_t = 300)]
    check_interval: u64,

    /// Maximum simultaneous downloads (worker pool size)
    #[arg(long, env = "MAX_CONCURRENT_DOWNLOADS", default_value_t = 4)]
    max_concurrent_downloads: usize,

    /// Stream quality passed to streamlink
    #[arg(long, env = "QUALITY", default_value = "best")]
    quality: String,

    /// Directory recordings are written to
    #[arg(long, env = "OUTPUT_DIR", default_value = "downloads")]
    output_dir: PathBuf,

    /// Cookie file used for YouTube session state
    #[arg(long, env = "COOKIES_FILE", default_value = "cookies.txt")]
    cookies_file: PathBuf,

    /// How many segments from the live edge streamlink starts buffering
    #[arg(long, env = "HLS_LIVE_EDGE", default_value_t = 3)]
    hls_live_edge: u32,

    /// streamlink binary to invoke
    #[arg(long, env = "STREAMLINK_PATH", default_value = "streamlink")]
    streamlink_path: String,

    /// yt-dlp binary to invoke
    #[arg(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    ytdlp_path: String,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Log errors only
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

fn monitor_config(args: &Args) -> MonitorConfig {
    MonitorConfig {
        twitch_client_id: args.twitch_client_id.clone(),
        twitch_client_secret: args.twitch_client_secret.clone(),
        channels: MonitorConfig::build_channels(&args.twitch_channels, &args.youtube_channels),
        poll_interval: Duration::from_secs(args.check_interval),
        max_concurrent_downloads: args.max_concurrent_downloads,
        quality: args.quality.clone(),
        output_dir: args.output_dir.clone(),
        cookies_file: args.cookies_file.clone(),
        hls_live_edge: args.hls_live_edge,
        streamlink_path: args.streamlink_path.clone(),
        ytdlp_path: args.ytdlp_path.clone(),
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("fatal error: {e:#}");
        process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = monitor_config(&args);
    config.validate().context("invalid configuration")?;

    let client = reqwest::Client::new();
    let exchange = HelixTokenExchange::new(
        client.clone(),
        config.twitch_client_id.clone(),
        config.twitch_client_secret.clone(),
    );
    let credentials = Arc::new(CredentialCache::new(Arc::new(exchange)));
    let probe = Arc::new(PlatformProbe::new(
        client,
        credentials,
        config.twitch_client_id.clone(),
        config.ytdlp_path.clone(),
        config.cookies_file.clone(),
    ));
    let recorder = Arc::new(StreamlinkRecorder::new(
        config.streamlink_path.clone(),
        config.quality.clone(),
        config.hls_live_edge,
        config.cookies_file.clone(),
    ));

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received; shutting down");
            signal_token.cancel();
        }
    });

    let mut scheduler = Scheduler::new(&config, probe, recorder, shutdown);
    scheduler.run().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stream_monitor::{Channel, Platform};

    fn parse(extra: &[&str]) -> Args {
        let mut argv = vec![
            "recwatch",
            "--twitch-client-id",
            "id",
            "--twitch-client-secret",
            "secret",
        ];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    #[test]
    fn channels_parse_in_declared_order() {
        let args = parse(&[
            "--twitch-channels",
            "a,b",
            "--youtube-channels",
            "@c",
        ]);
        let config = monitor_config(&args);
        assert_eq!(
            config.channels,
            vec![
                Channel::new(Platform::Twitch, "a"),
                Channel::new(Platform::Twitch, "b"),
                Channel::new(Platform::Youtube, "@c"),
            ]
        );
    }

    #[test]
    fn defaults_match_the_documented_surface() {
        let args = parse(&[]);
        let config = monitor_config(&args);
        assert_eq!(config.poll_interval, Duration::from_secs(300));
        assert_eq!(config.max_concurrent_downloads, 4);
        assert_eq!(config.quality, "best");
        assert_eq!(config.output_dir, PathBuf::from("downloads"));
        assert_eq!(config.hls_live_edge, 3);
    }
}
