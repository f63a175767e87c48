use clap::Parser;
use dotenv::dotenv;
use std::error::Error;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use sitewatch::monitor::config::Config;
use sitewatch::monitor::service::Monitor;
use sitewatch::monitor::shutdown;
use sitewatch::monitor::transport::ReqwestTransport;
use sitewatch::notifications::senders::webhook::WebhookSender;
use sitewatch::notifications::service::NotificationService;
use sitewatch::version::VERSION;

#[derive(Parser, Debug)]
#[command(name = "sitewatch", about = "Watches websites for status and content changes")]
struct Args {
    /// Config file; `.toml` files are read as TOML, anything else as JSON.
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Directory for the daily rotated JSON log files.
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,
}

fn init_logging(log_dir: &Path) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily(log_dir, "sitewatch.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // Default to `info` level if RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    if std::env::args().any(|arg| arg == "--version") {
        println!("sitewatch version: {}", VERSION);
        return Ok(());
    }
    let args = Args::parse();

    dotenv().ok();
    init_logging(&args.log_dir);
    info!(version = VERSION, "Starting sitewatch...");

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Critical error loading configuration. Exiting.");
            return Err(e.into());
        }
    };
    info!(
        targets = config.targets.len(),
        reference = %config.online_check_reference,
        "Configuration loaded."
    );

    let transport = ReqwestTransport::new(config.request_timeout)?;
    let sender = WebhookSender::new(config.request_timeout)?;
    let notifier = NotificationService::new(Box::new(sender), config.notification_queue_limit);
    let mut monitor = Monitor::new(config, Box::new(transport), notifier)?;

    let (trigger, signal) = shutdown::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, finishing the current step.");
                trigger.trigger();
            }
            Err(e) => warn!(error = %e, "Failed to listen for interrupt signal."),
        }
    });

    monitor.run(signal).await?;
    info!("sitewatch stopped.");
    Ok(())
}
