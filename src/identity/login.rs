use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use super::authorizer::{resolve_role, Role};
use super::principal::Identity;
use super::provider::{AuthProvider, LocalAuthProvider};
use super::session::SessionState;
use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::navigation::RouteTable;
use crate::store::DocumentStore;

/// Where a freshly signed-in identity should land.
/// Returns `from` when the resolved role may view it, otherwise the role's home.
pub async fn landing_for(
    store: &dyn DocumentStore,
    cfg: &PortalConfig,
    routes: &RouteTable,
    identity: &Identity,
    from: Option<&str>,
) -> AppResult<String> {
    let role = resolve_role(store, cfg, &identity.id).await?;
    let home = match role {
        Role::Admin => cfg.admin_home.clone(),
        Role::Member => cfg.member_home.clone(),
        Role::None => return Err(AppError::auth("no_account", "No account found for this user.")),
    };
    let session = SessionState { identity: Some(identity.clone()), role, resolving: false };
    let dest = match from {
        Some(f) if routes.permits(f, &session) => f.to_string(),
        _ => home,
    };
    info!(target: "alumni_portal::auth", "login.landing id={} role={} dest={}", identity.id, role, dest);
    Ok(dest)
}

/// `landing_for`, signing the provider out when the identity has no portal account.
pub async fn complete_sign_in(
    provider: &dyn AuthProvider,
    store: &dyn DocumentStore,
    cfg: &PortalConfig,
    routes: &RouteTable,
    identity: &Identity,
    from: Option<&str>,
) -> AppResult<String> {
    match landing_for(store, cfg, routes, identity, from).await {
        Err(err) if err.code_str() == "no_account" => {
            warn!(target: "alumni_portal::auth", "login.no_account id={}, signing out", identity.id);
            provider.sign_out()?;
            Err(err)
        }
        other => other,
    }
}

/// Registration form for a new alumni member.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub grad_year: Option<i32>,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub programme: String,
    #[serde(default)]
    pub photo_url: Option<String>,
}

/// Create the account, write its member profile keyed by the new identity id, then sign in.
/// The profile is written before any session notification, so the first resolution for the
/// new identity already sees the member document.
pub async fn sign_up(
    provider: &LocalAuthProvider,
    store: &dyn DocumentStore,
    cfg: &PortalConfig,
    form: &SignUpForm,
) -> AppResult<Identity> {
    if form.full_name.trim().is_empty() {
        return Err(AppError::user("missing_name", "Full name is required."));
    }
    let identity = provider.register(&form.email, &form.password, &form.full_name)?;
    let profile = json!({
        "fullName": form.full_name.trim(),
        "gradYear": form.grad_year,
        "department": form.department,
        "programme": form.programme,
        "email": identity.email,
        "photoURL": form.photo_url,
        "createdAt": Utc::now().to_rfc3339(),
    });
    if let Err(err) = store.put(&cfg.members_collection, &identity.id, profile).await {
        warn!(target: "alumni_portal::auth", "signup.profile_failed id={}: {}", identity.id, err);
        return Err(err);
    }
    info!(target: "alumni_portal::auth", "signup.member id={} collection={}", identity.id, cfg.members_collection);
    provider.sign_in_with_password(&form.email, &form.password)
}
