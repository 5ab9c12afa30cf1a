//! Standalone console window for `plugin_console` producers.
//!
//! Binds the channel, renders one producer session at a time and exits on Ctrl+C.

use std::{io, path::PathBuf, process::ExitCode};

use clap::Parser;
use plugin_console::{ChannelAddress, ChannelName, Viewer, ViewerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};
use tracing_subscriber::EnvFilter;

/// Console viewer for plugin log lines
#[derive(Parser, Debug)]
#[command(name = "plugin-console-viewer")]
#[command(about = "Shows lines logged by a plugin in a separate console window")]
#[command(version)]
struct Args {
    /// Channel name shared with the plugin [env: PLUGIN_CONSOLE_CHANNEL, default: PluginConsole]
    #[arg(short, long, value_parser = parse_channel)]
    channel: Option<ChannelName>,

    /// Directory holding the channel socket (Unix only)
    #[arg(long, value_name = "DIR")]
    runtime_dir: Option<PathBuf>,

    /// Disable colours (also disabled when NO_COLOR is set)
    #[arg(long)]
    no_color: bool,

    /// Longest accepted line in bytes; longer lines are dropped with a warning
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..))]
    max_line_bytes: Option<u64>,

    /// Diagnostic log filter written to stderr (e.g. "debug" or "plugin_console=trace")
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_channel(raw: &str) -> Result<ChannelName, String> {
    ChannelName::new(raw).ok_or_else(|| {
        format!(
            "invalid channel name `{raw}`: use up to {} ASCII letters, digits, `.`, `_` or `-`, \
             starting with a letter or digit",
            ChannelName::MAX_BYTES
        )
    })
}

impl Args {
    fn into_config(self) -> ViewerConfig {
        let defaults = ViewerConfig::default();
        let address = ChannelAddress::new(
            self.channel
                .unwrap_or_else(|| defaults.address.name().clone()),
            self.runtime_dir
                .unwrap_or_else(|| defaults.address.runtime_dir().to_path_buf()),
        );
        let max_line_bytes = self
            .max_line_bytes
            .and_then(|bytes| usize::try_from(bytes).ok())
            .unwrap_or(defaults.max_line_bytes);

        ViewerConfig {
            address,
            max_line_bytes,
            color: defaults.color && !self.no_color,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let config = args.into_config();
    debug!(endpoint = %config.address.endpoint(), ?config, "starting viewer");

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let mut viewer = Viewer::new(config, io::stdout());
    match viewer.run(&cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "viewer stopped");
            eprintln!("plugin-console-viewer: {err}");
            ExitCode::FAILURE
        }
    }
}
