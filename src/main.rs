use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{error, info};
use nebra_bootstrap::{bootstrap, config::AppConfig};
use std::io::Write;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize();

    let config = AppConfig::load().context("failed to load application configuration")?;

    let report = bootstrap::run(&config).await;

    info!(
        "bootstrap done: manufacturing={} hostname={:?} wan_ip={:?}",
        report.manufacturing.in_manufacturing(),
        report.device_hostname,
        report.wan_ip
    );

    Ok(())
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));
}
