//! Alumni directory: member records with composable filters and sorting.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::store::DocumentStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRecord {
    #[serde(default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub programme: String,
    #[serde(default)]
    pub grad_year: Option<i32>,
    #[serde(default)]
    pub location: String,
    /// Approval status set by admins: Active, Inactive or Pending
    #[serde(default)]
    pub status: Option<String>,
}

/// Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectoryFilter {
    pub search: String,
    pub department: String,
    pub grad_year: Option<i32>,
    pub location: String,
}

impl DirectoryFilter {
    pub fn matches(&self, rec: &MemberRecord) -> bool {
        let term = self.search.trim().to_lowercase();
        if !term.is_empty() && !rec.full_name.to_lowercase().contains(&term) {
            return false;
        }
        if !self.department.is_empty() && rec.department != self.department {
            return false;
        }
        if let Some(year) = self.grad_year {
            if rec.grad_year != Some(year) { return false; }
        }
        if !self.location.is_empty() && rec.location != self.location {
            return false;
        }
        true
    }

    pub fn apply<'a>(&self, records: &'a [MemberRecord]) -> Vec<&'a MemberRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Distinct, sorted values for the filter drop-downs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryOptions {
    pub departments: Vec<String>,
    pub grad_years: Vec<i32>,
    pub locations: Vec<String>,
}

impl DirectoryOptions {
    pub fn from_records(records: &[MemberRecord]) -> Self {
        let mut departments = BTreeSet::new();
        let mut years = BTreeSet::new();
        let mut locations = BTreeSet::new();
        for r in records {
            if !r.department.is_empty() { departments.insert(r.department.clone()); }
            if let Some(y) = r.grad_year { years.insert(y); }
            if !r.location.is_empty() { locations.insert(r.location.clone()); }
        }
        Self {
            departments: departments.into_iter().collect(),
            grad_years: years.into_iter().collect(),
            locations: locations.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Name,
    GradYear,
}

/// Stable sort; ties keep name order for `GradYear`. Records without a year sort last.
pub fn sort_records(records: &mut [&MemberRecord], key: SortKey, descending: bool) {
    records.sort_by(|a, b| {
        let by_name = || a.full_name.to_lowercase().cmp(&b.full_name.to_lowercase());
        match key {
            SortKey::Name => if descending { by_name().reverse() } else { by_name() },
            SortKey::GradYear => {
                let ord = match (a.grad_year, b.grad_year) {
                    (Some(x), Some(y)) => if descending { y.cmp(&x) } else { x.cmp(&y) },
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                };
                ord.then_with(by_name)
            }
        }
    });
}

/// Read every member record in `collection`, skipping documents that do not parse.
pub async fn load_directory(store: &dyn DocumentStore, collection: &str) -> AppResult<Vec<MemberRecord>> {
    let docs = store.list(collection).await?;
    let mut out = Vec::with_capacity(docs.len());
    for doc in docs {
        match serde_json::from_value::<MemberRecord>(doc.data) {
            Ok(mut rec) => {
                rec.id = doc.key;
                out.push(rec);
            }
            Err(e) => warn!(target: "alumni_portal::directory", "skipping malformed member '{}': {}", doc.key, e),
        }
    }
    debug!(target: "alumni_portal::directory", "directory.load collection={} records={}", collection, out.len());
    Ok(out)
}
