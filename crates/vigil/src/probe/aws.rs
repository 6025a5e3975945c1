//! Backup catalogs backed by AWS: S3 objects, RDS snapshots and AMIs.
//!
//! Credentials come from the SDK's default provider chain.

use aws_config::{BehaviorVersion, Region, SdkConfig};
use chrono::{DateTime, Utc};

use super::backup::{BackupCatalog, BackupItem};
use crate::error::CheckError;

pub const DEFAULT_REGION: &str = "eu-west-1";

const AVAILABLE: &str = "available";

async fn load_config(region: Option<&str>) -> SdkConfig {
    let region = region.filter(|r| !r.is_empty()).unwrap_or(DEFAULT_REGION).to_string();
    aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region)).load().await
}

fn to_utc(secs: i64, nanos: u32) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, nanos)
}

fn catalog_error(catalog: &str, reason: impl std::fmt::Display) -> CheckError {
    CheckError::Catalog { catalog: catalog.to_string(), reason: reason.to_string() }
}

/// Objects under a prefix of an S3 bucket; every object is available
pub struct S3BucketCatalog {
    endpoint: String,
    bucket: String,
    prefix: String,
    client: aws_sdk_s3::Client,
}

impl S3BucketCatalog {
    pub async fn connect(region: Option<&str>, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        let bucket = bucket.into();
        let prefix = prefix.into();
        let config = load_config(region).await;

        Self {
            endpoint: format!("s3://{bucket}/{prefix}"),
            bucket,
            prefix,
            client: aws_sdk_s3::Client::new(&config),
        }
    }
}

#[async_trait::async_trait]
impl BackupCatalog for S3BucketCatalog {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn list(&self) -> Result<Vec<BackupItem>, CheckError> {
        let mut items = Vec::new();
        let mut token = None;

        loop {
            let output = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(&self.prefix)
                .set_continuation_token(token.take())
                .send()
                .await
                .map_err(|e| catalog_error(&self.endpoint, aws_sdk_s3::error::DisplayErrorContext(&e)))?;

            for object in output.contents() {
                let Some(modified) = object.last_modified().and_then(|t| to_utc(t.secs(), t.subsec_nanos()))
                else {
                    continue;
                };
                let size = object.size().and_then(|s| u64::try_from(s).ok());
                items.push(BackupItem::available(modified, size));
            }

            match output.next_continuation_token() {
                Some(next) if output.is_truncated().unwrap_or(false) => token = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(items)
    }
}

/// Manual and automated snapshots of one RDS instance
pub struct RdsSnapshotCatalog {
    instance: String,
    client: aws_sdk_rds::Client,
}

impl RdsSnapshotCatalog {
    pub async fn connect(region: Option<&str>, instance: impl Into<String>) -> Self {
        let config = load_config(region).await;
        Self { instance: instance.into(), client: aws_sdk_rds::Client::new(&config) }
    }
}

#[async_trait::async_trait]
impl BackupCatalog for RdsSnapshotCatalog {
    fn endpoint(&self) -> &str {
        &self.instance
    }

    async fn list(&self) -> Result<Vec<BackupItem>, CheckError> {
        let mut items = Vec::new();
        let mut marker = None;

        loop {
            let output = self
                .client
                .describe_db_snapshots()
                .db_instance_identifier(&self.instance)
                .include_public(false)
                .include_shared(false)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| catalog_error(&self.instance, aws_sdk_rds::error::DisplayErrorContext(&e)))?;

            for snapshot in output.db_snapshots() {
                let Some(created_at) =
                    snapshot.snapshot_create_time().and_then(|t| to_utc(t.secs(), t.subsec_nanos()))
                else {
                    continue;
                };
                items.push(BackupItem {
                    created_at,
                    size: None,
                    available: snapshot.status() == Some(AVAILABLE),
                });
            }

            match output.marker() {
                Some(next) if !next.is_empty() => marker = Some(next.to_string()),
                _ => break,
            }
        }

        Ok(items)
    }
}

/// Machine images visible to the account whose name starts with a prefix.
/// A non-empty `owners` list (account ids, `self`, `amazon`) narrows the
/// search to those owners.
pub struct AmiCatalog {
    prefix: String,
    owners: Vec<String>,
    client: aws_sdk_ec2::Client,
}

impl AmiCatalog {
    pub async fn connect(region: Option<&str>, prefix: impl Into<String>, owners: Vec<String>) -> Self {
        let config = load_config(region).await;
        Self { prefix: prefix.into(), owners, client: aws_sdk_ec2::Client::new(&config) }
    }
}

#[async_trait::async_trait]
impl BackupCatalog for AmiCatalog {
    fn endpoint(&self) -> &str {
        &self.prefix
    }

    async fn list(&self) -> Result<Vec<BackupItem>, CheckError> {
        let filter = aws_sdk_ec2::types::Filter::builder()
            .name("name")
            .values(format!("{}*", self.prefix))
            .build();

        let output = self
            .client
            .describe_images()
            .set_owners((!self.owners.is_empty()).then(|| self.owners.clone()))
            .filters(filter)
            .send()
            .await
            .map_err(|e| catalog_error(&self.prefix, aws_sdk_ec2::error::DisplayErrorContext(&e)))?;

        let items = output
            .images()
            .iter()
            .filter_map(|image| {
                let created_at = image
                    .creation_date()
                    .and_then(|d| DateTime::parse_from_rfc3339(d).ok())?
                    .with_timezone(&Utc);
                Some(BackupItem {
                    created_at,
                    size: None,
                    available: image.state() == Some(&aws_sdk_ec2::types::ImageState::Available),
                })
            })
            .collect();

        Ok(items)
    }
}
