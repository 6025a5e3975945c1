/// Probe capabilities - one attempt against a target
///
/// A probe only answers "did this attempt succeed"; timing, retries and the
/// verdict live in the monitoring module.
pub mod backup;
pub mod http;

#[cfg(feature = "aws")]
pub mod aws;

pub use backup::{BackupCatalog, BackupItem, BackupPolicy, DirectoryCatalog};
pub use http::{HttpProbe, TransportConfig};

/// Perform one probe attempt against a target
#[async_trait::async_trait]
pub trait Probe: Send + Sync {
    /// Identifier of the target reported in results
    fn endpoint(&self) -> &str;

    /// Run one attempt. Any error, whether the target is unhealthy or the
    /// transport failed, becomes the attempt's failure reason.
    async fn attempt(&self) -> anyhow::Result<()>;
}
