use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::PortalConfig;
use crate::error::AppResult;
use crate::store::{self, DocumentStore};

/// Domain authorization level derived for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
    #[default]
    None,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Member => "member",
            Role::None => "none",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.as_str()) }
}

/// Derive the role for an identity from two existence checks.
/// The administrators collection is probed first and wins when both documents exist.
/// Both lookups run before deciding; the first store error aborts resolution.
pub async fn resolve_role(store: &dyn DocumentStore, cfg: &PortalConfig, identity_id: &str) -> AppResult<Role> {
    let is_admin = store::exists(store, &cfg.administrators_collection, identity_id).await?;
    let is_member = store::exists(store, &cfg.members_collection, identity_id).await?;
    if is_admin && is_member {
        debug!(target: "alumni_portal::auth", "identity '{}' present in both '{}' and '{}', admin wins", identity_id, cfg.administrators_collection, cfg.members_collection);
    }
    let role = if is_admin {
        Role::Admin
    } else if is_member {
        Role::Member
    } else {
        Role::None
    };
    Ok(role)
}
