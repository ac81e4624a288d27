//! Deployment record storage
//!
//! The store owns every `DeploymentRecord` and is the only place a status
//! changes. `transition` checks the current status against the graph and
//! applies the update under one lock, so two racing reviewers cannot both
//! move the same record out of `pending`.

mod table;

pub use table::TableStore;

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::deploy::fsm::DeploymentStatus;
use crate::errors::GateError;
use crate::models::deployment::{DeploymentRecord, NewDeployment, TransitionFields};
use crate::models::target::TargetType;

pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 100;

/// Columns a listing may be ordered by
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortColumn {
    Id,
    Name,
    Status,
    TargetType,
    #[default]
    CreatedAt,
    DeployedAt,
}

impl SortColumn {
    /// Unknown columns fall back to `created_at`
    pub fn from_param(value: Option<&str>) -> Self {
        match value.unwrap_or_default() {
            "id" => SortColumn::Id,
            "deployment_name" | "name" => SortColumn::Name,
            "status" => SortColumn::Status,
            "target_type" => SortColumn::TargetType,
            "deployed_at" => SortColumn::DeployedAt,
            _ => SortColumn::CreatedAt,
        }
    }

    fn compare(&self, a: &DeploymentRecord, b: &DeploymentRecord) -> Ordering {
        match self {
            SortColumn::Id => a.id.cmp(&b.id),
            SortColumn::Name => a.name.cmp(&b.name),
            SortColumn::Status => a.status.as_str().cmp(b.status.as_str()),
            SortColumn::TargetType => a.target.kind.as_str().cmp(b.target.kind.as_str()),
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            SortColumn::DeployedAt => a.deployed_at.cmp(&b.deployed_at),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some(v) if v.eq_ignore_ascii_case("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        }
    }
}

/// Filter, paging and ordering for `list`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<DeploymentStatus>,
    pub target_type: Option<TargetType>,
    pub page: u32,
    pub per_page: u32,
    pub orderby: SortColumn,
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            status: None,
            target_type: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
            orderby: SortColumn::default(),
            order: SortOrder::default(),
        }
    }
}

impl ListQuery {
    /// Clamp paging into `page >= 1` and `1 <= per_page <= 100`
    pub fn clamped(mut self) -> Self {
        self.page = self.page.max(1);
        self.per_page = self.per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    fn matches(&self, record: &DeploymentRecord) -> bool {
        self.status.is_none_or(|s| record.status == s)
            && self.target_type.is_none_or(|t| record.target.kind == t)
    }

    fn compare(&self, a: &DeploymentRecord, b: &DeploymentRecord) -> Ordering {
        let ord = self.orderby.compare(a, b).then_with(|| a.id.cmp(&b.id));
        match self.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    }
}

/// One page of a listing
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    pub items: Vec<DeploymentRecord>,
    pub total: u64,
    pub page_count: u64,
}

/// Backend for deployment records
#[async_trait]
pub trait DeploymentStore: Send + Sync {
    /// Insert a new record in `pending`; returns it with its assigned id
    async fn create(&self, fields: NewDeployment) -> Result<DeploymentRecord, GateError>;

    async fn get(&self, id: u64) -> Result<DeploymentRecord, GateError>;

    async fn list(&self, query: &ListQuery) -> Result<ListPage, GateError>;

    /// Move a record to `to` if the graph allows it, writing `fields` in the
    /// same update. Returns the updated record.
    async fn transition(
        &self,
        id: u64,
        to: DeploymentStatus,
        fields: TransitionFields,
    ) -> Result<DeploymentRecord, GateError>;
}

/// Filter, sort and paginate a full set of rows
pub(crate) fn paginate<'a>(
    rows: impl Iterator<Item = &'a DeploymentRecord>,
    query: &ListQuery,
) -> ListPage {
    let query = query.clone().clamped();
    let mut matching: Vec<&DeploymentRecord> = rows.filter(|r| query.matches(r)).collect();
    matching.sort_by(|a, b| query.compare(a, b));

    let total = matching.len() as u64;
    let per_page = u64::from(query.per_page);
    let page_count = total.div_ceil(per_page);
    let offset = (u64::from(query.page) - 1) * per_page;

    let items = matching
        .into_iter()
        .skip(offset as usize)
        .take(query.per_page as usize)
        .cloned()
        .collect();

    ListPage {
        items,
        total,
        page_count,
    }
}
