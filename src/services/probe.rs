//! Active reachability probe towards the manufacturing fixture.

use anyhow::{Context, Result, ensure};
use log::debug;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use std::{net::Ipv4Addr, path::PathBuf, process::Stdio, time::Duration};
use tokio::{process::Command, time::timeout};
use trait_variant::make;

#[make(Send)]
#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait ReachabilityProbe {
    /// Ok if the target answered, Err with the reason otherwise
    async fn probe(&self) -> Result<()>;
}

/// Probe that shells out to the OS `ping` utility
#[derive(Clone, Debug)]
pub struct PingProbe {
    program: PathBuf,
    target: Ipv4Addr,
    overall_timeout: Duration,
}

impl PingProbe {
    const COUNT: &str = "2";
    const INTERVAL_SECS: &str = "0.5";
    const PER_PACKET_TIMEOUT_SECS: &str = "1";
    // two packets half a second apart, each waiting at most one second
    const OVERALL_TIMEOUT: Duration = Duration::from_secs(3);

    pub fn new(program: impl Into<PathBuf>, target: Ipv4Addr) -> Self {
        Self {
            program: program.into(),
            target,
            overall_timeout: Self::OVERALL_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, overall_timeout: Duration) -> Self {
        self.overall_timeout = overall_timeout;
        self
    }

    fn args(&self) -> Vec<String> {
        vec![
            "-c".to_string(),
            Self::COUNT.to_string(),
            "-i".to_string(),
            Self::INTERVAL_SECS.to_string(),
            "-W".to_string(),
            Self::PER_PACKET_TIMEOUT_SECS.to_string(),
            self.target.to_string(),
        ]
    }
}

impl ReachabilityProbe for PingProbe {
    async fn probe(&self) -> Result<()> {
        let args = self.args();
        debug!("run {:?} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn {:?}", self.program))?;

        let status = timeout(self.overall_timeout, child.wait())
            .await
            .with_context(|| {
                format!(
                    "ping {} timed out after {:?}",
                    self.target, self.overall_timeout
                )
            })?
            .context("failed to wait for ping")?;

        ensure!(status.success(), "ping {} failed: {status}", self.target);

        Ok(())
    }
}
