use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use lt_config::ProvisionConfig;
use orion_error::op_context;
use orion_error::ErrorOwe;
use orion_error::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{RuntimeReason, RuntimeResult};
use crate::store::destination_path;

/// Result of [`Provisioner::ensure`]: where records for `resource_id` are
/// delivered and how to undo it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provisioned {
    pub resource_id: String,
    /// Log group name, used as the tail source.
    pub source: String,
    pub destination: PathBuf,
    pub association: String,
    /// `false` when everything already existed.
    pub created: bool,
}

/// Creates and removes the log destination plus the delivery association
/// that feeds it. `ensure` is idempotent.
#[async_trait]
pub trait Provisioner: Send + Sync {
    async fn ensure(&self, resource_id: &str) -> RuntimeResult<Provisioned>;
    async fn teardown(&self, provisioned: &Provisioned) -> RuntimeResult<()>;
}

// ---------------------------------------------------------------------------
// FileProvisioner
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct AssociationManifest {
    query_log_name: String,
    log_group_name: String,
    retention_days: u32,
    resource_ids: Vec<String>,
}

/// Provisioner for [`FileLogStore`](crate::store::FileLogStore) layouts:
/// the destination is the log group's JSONL file and the association is a
/// manifest at `<root>/associations/<query_log_name>.json`.
#[derive(Debug, Clone)]
pub struct FileProvisioner {
    root: PathBuf,
    config: ProvisionConfig,
}

impl FileProvisioner {
    /// Relative `store_dir` values are resolved against `base_dir`.
    pub fn new(config: ProvisionConfig, base_dir: &Path) -> Self {
        let root = if config.store_dir.is_relative() {
            base_dir.join(&config.store_dir)
        } else {
            config.store_dir.clone()
        };
        Self { root, config }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn destination(&self) -> PathBuf {
        destination_path(&self.root, &self.config.log_group_name)
    }

    fn manifest_path(&self) -> PathBuf {
        self.root
            .join("associations")
            .join(format!("{}.json", self.config.query_log_name))
    }

    async fn read_manifest(&self) -> RuntimeResult<Option<AssociationManifest>> {
        let path = self.manifest_path();
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str(&text).map(Some).map_err(|e| {
                StructError::from(RuntimeReason::Provision)
                    .with_detail(format!("corrupt manifest {}: {e}", path.display()))
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StructError::from(RuntimeReason::Provision)
                .with_detail(format!("reading {}: {e}", path.display()))),
        }
    }

    async fn write_manifest(&self, manifest: &AssociationManifest) -> RuntimeResult<()> {
        let path = self.manifest_path();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.owe_sys()?;
        }
        let text = serde_json::to_string_pretty(manifest).owe_data()?;
        tokio::fs::write(&path, text).await.owe_sys()
    }
}

#[async_trait]
impl Provisioner for FileProvisioner {
    async fn ensure(&self, resource_id: &str) -> RuntimeResult<Provisioned> {
        let mut op = op_context!("provision-ensure").with_auto_log();
        op.record("resource_id", resource_id);
        op.record("log_group", self.config.log_group_name.as_str());

        if resource_id.trim().is_empty() {
            return Err(StructError::from(RuntimeReason::Provision)
                .with_detail("resource id must not be empty"));
        }

        let destination = self.destination();
        let mut created = false;
        if tokio::fs::metadata(&destination).await.is_err() {
            lt_info!(conf, path = %destination.display(), "creating log destination");
            if let Some(parent) = destination.parent() {
                tokio::fs::create_dir_all(parent).await.owe_sys()?;
            }
            tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&destination)
                .await
                .owe_sys()?;
            created = true;
        }

        let mut manifest = self.read_manifest().await?.unwrap_or_else(|| AssociationManifest {
            query_log_name: self.config.query_log_name.clone(),
            log_group_name: self.config.log_group_name.clone(),
            retention_days: self.config.retention_days,
            resource_ids: Vec::new(),
        });
        if !manifest.resource_ids.iter().any(|id| id == resource_id) {
            lt_info!(
                conf,
                association = %self.config.query_log_name,
                resource_id,
                "associating resource with query log"
            );
            manifest.resource_ids.push(resource_id.to_string());
            self.write_manifest(&manifest).await?;
            created = true;
        }

        op.mark_suc();
        Ok(Provisioned {
            resource_id: resource_id.to_string(),
            source: self.config.log_group_name.clone(),
            destination,
            association: self.config.query_log_name.clone(),
            created,
        })
    }

    /// Disassociate the resource; once no association remains, delete the
    /// manifest and then the destination.
    async fn teardown(&self, provisioned: &Provisioned) -> RuntimeResult<()> {
        let mut op = op_context!("provision-teardown").with_auto_log();
        op.record("resource_id", provisioned.resource_id.as_str());

        if let Some(mut manifest) = self.read_manifest().await? {
            manifest.resource_ids.retain(|id| id != &provisioned.resource_id);
            if manifest.resource_ids.is_empty() {
                remove_if_exists(&self.manifest_path()).await?;
            } else {
                self.write_manifest(&manifest).await?;
                op.mark_suc();
                return Ok(());
            }
        }

        lt_info!(conf, path = %provisioned.destination.display(), "deleting log destination");
        remove_if_exists(&provisioned.destination).await?;
        op.mark_suc();
        Ok(())
    }
}

async fn remove_if_exists(path: &Path) -> RuntimeResult<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StructError::from(RuntimeReason::Provision)
            .with_detail(format!("removing {}: {e}", path.display()))),
    }
}
