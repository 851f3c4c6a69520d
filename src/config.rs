use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::AppResult;

/// Portal-wide settings. Unspecified JSON fields fall back to `Default`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// Collection whose documents, keyed by identity id, grant the admin role
    pub administrators_collection: String,
    /// Collection whose documents, keyed by identity id, grant the member role
    pub members_collection: String,
    pub replies_collection: String,

    pub member_login_target: String,
    /// Admin and member sign-in entry points may differ
    pub admin_login_target: String,
    pub member_home: String,
    pub admin_home: String,
    /// Where unknown paths are sent
    pub fallback_route: String,

    pub moderation_keywords: Vec<String>,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            administrators_collection: "administrators".to_string(),
            members_collection: "members".to_string(),
            replies_collection: "replies".to_string(),

            member_login_target: "/login".to_string(),
            admin_login_target: "/admin/login".to_string(),
            member_home: "/dashboard".to_string(),
            admin_home: "/admin/dashboard".to_string(),
            fallback_route: "/".to_string(),

            moderation_keywords: crate::moderation::DEFAULT_KEYWORDS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl PortalConfig {
    /// Defaults overlaid with `ALUMNI_*` environment variables.
    pub fn from_env() -> Self { Self::default().with_env_overrides() }

    pub fn with_env_overrides(self) -> Self { self.overlay(|k| std::env::var(k).ok()) }

    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: PortalConfig = serde_json::from_str(&text)?;
        tracing::debug!(target: "alumni_portal::config", "loaded config from '{}'", path.display());
        Ok(cfg)
    }

    pub(crate) fn overlay<F: Fn(&str) -> Option<String>>(mut self, get: F) -> Self {
        let slots: [(&str, &mut String); 8] = [
            ("ALUMNI_ADMINISTRATORS_COLLECTION", &mut self.administrators_collection),
            ("ALUMNI_MEMBERS_COLLECTION", &mut self.members_collection),
            ("ALUMNI_REPLIES_COLLECTION", &mut self.replies_collection),
            ("ALUMNI_MEMBER_LOGIN", &mut self.member_login_target),
            ("ALUMNI_ADMIN_LOGIN", &mut self.admin_login_target),
            ("ALUMNI_MEMBER_HOME", &mut self.member_home),
            ("ALUMNI_ADMIN_HOME", &mut self.admin_home),
            ("ALUMNI_FALLBACK_ROUTE", &mut self.fallback_route),
        ];
        for (key, slot) in slots {
            if let Some(v) = get(key).filter(|v| !v.trim().is_empty()) {
                *slot = v;
            }
        }
        // comma separated
        if let Some(words) = get("ALUMNI_MODERATION_KEYWORDS") {
            self.moderation_keywords = words
                .split(',')
                .map(|w| w.trim().to_string())
                .filter(|w| !w.is_empty())
                .collect();
        }
        self
    }
}
