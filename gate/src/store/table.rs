//! Row store kept in memory, optionally mirrored to a JSON file

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::deploy::fsm::{check_transition, DeploymentStatus};
use crate::errors::GateError;
use crate::filesys::file::File;
use crate::models::deployment::{DeploymentRecord, NewDeployment, TransitionFields};

use super::{paginate, DeploymentStore, ListPage, ListQuery};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Table {
    next_id: u64,
    rows: BTreeMap<u64, DeploymentRecord>,
}

impl Default for Table {
    fn default() -> Self {
        Self {
            next_id: 1,
            rows: BTreeMap::new(),
        }
    }
}

/// Deployment table guarded by a single lock.
///
/// Mutations are made on a copy, persisted, then swapped in, so a failed
/// write leaves both the file and memory at the previous state.
#[derive(Debug, Default)]
pub struct TableStore {
    table: RwLock<Table>,
    file: Option<File>,
}

impl TableStore {
    /// A store that lives only as long as the process
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open a store backed by `file`, loading existing rows if present
    pub async fn open(file: File) -> Result<Self, GateError> {
        let table = if file.exists().await {
            let table: Table = file.read_json().await?;
            info!(
                path = %file.path().display(),
                rows = table.rows.len(),
                "Loaded deployment table"
            );
            table
        } else {
            Table::default()
        };

        Ok(Self {
            table: RwLock::new(table),
            file: Some(file),
        })
    }

    async fn persist(&self, table: &Table) -> Result<(), GateError> {
        if let Some(file) = &self.file {
            file.write_json_atomic(table).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl DeploymentStore for TableStore {
    async fn create(&self, fields: NewDeployment) -> Result<DeploymentRecord, GateError> {
        let mut table = self.table.write().await;

        let mut next = table.clone();
        let id = next.next_id;
        next.next_id += 1;

        let record = DeploymentRecord {
            id,
            name: fields.name,
            description: fields.description,
            target: fields.target,
            status: DeploymentStatus::Pending,
            files_manifest: fields.files_manifest,
            validation_result: fields.validation_result,
            created_by: fields.created_by,
            created_at: Utc::now(),
            reviewed_by: None,
            reviewed_at: None,
            deployed_at: None,
            rolled_back_at: None,
        };
        next.rows.insert(id, record.clone());

        self.persist(&next).await?;
        *table = next;

        debug!(deployment_id = id, "Created deployment record");
        Ok(record)
    }

    async fn get(&self, id: u64) -> Result<DeploymentRecord, GateError> {
        self.table
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or(GateError::NotFound(id))
    }

    async fn list(&self, query: &ListQuery) -> Result<ListPage, GateError> {
        let table = self.table.read().await;
        Ok(paginate(table.rows.values(), query))
    }

    async fn transition(
        &self,
        id: u64,
        to: DeploymentStatus,
        fields: TransitionFields,
    ) -> Result<DeploymentRecord, GateError> {
        let mut table = self.table.write().await;

        let current = table.rows.get(&id).ok_or(GateError::NotFound(id))?;
        check_transition(current.status, to)?;

        let mut updated = current.clone();
        updated.status = to;
        fields.apply(&mut updated);

        let mut next = table.clone();
        next.rows.insert(id, updated.clone());
        self.persist(&next).await?;
        *table = next;

        debug!(deployment_id = id, status = %to, "Transitioned deployment");
        Ok(updated)
    }
}
