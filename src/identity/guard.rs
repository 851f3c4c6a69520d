use serde::Serialize;

use super::authorizer::Role;
use super::session::SessionState;
use crate::config::PortalConfig;

/// Outcome of a guard evaluation, consumed by the navigation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Session still resolving: show a loading indicator, never redirect.
    Pending,
    Allow,
    /// `from` carries the requested location so sign-in can return there.
    Deny { redirect: String, from: Option<String> },
}

/// Gate in front of a protected view. Member and admin gates are two instances
/// of this type differing only in required role and redirect target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guard {
    required_role: Role,
    redirect_target: String,
}

impl Guard {
    pub fn new<S: Into<String>>(required_role: Role, redirect_target: S) -> Self {
        Self { required_role, redirect_target: redirect_target.into() }
    }

    pub fn member(cfg: &PortalConfig) -> Self { Self::new(Role::Member, cfg.member_login_target.clone()) }

    pub fn admin(cfg: &PortalConfig) -> Self { Self::new(Role::Admin, cfg.admin_login_target.clone()) }

    pub fn required_role(&self) -> Role { self.required_role }

    pub fn redirect_target(&self) -> &str { &self.redirect_target }

    /// Recomputed from the given snapshot on every call; no memory of earlier verdicts.
    pub fn evaluate(&self, session: &SessionState, location: Option<&str>) -> Verdict {
        if session.resolving {
            return Verdict::Pending;
        }
        // role none never passes, even for a gate built with Role::None
        let passes = session.identity.is_some() && session.role != Role::None && session.role == self.required_role;
        if passes {
            Verdict::Allow
        } else {
            Verdict::Deny { redirect: self.redirect_target.clone(), from: location.map(|l| l.to_string()) }
        }
    }
}
