use std::path::Path;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use alumni_portal::identity::{Guard, Identity, LocalAuthProvider, SessionResolver};
use alumni_portal::navigation::RouteTable;
use alumni_portal::store::MemoryStore;
use alumni_portal::PortalConfig;

/// Usage: alumni_portal <identity-id> [path]
/// Seeds an in-memory store from ALUMNI_SEED, restores a session for the identity
/// and prints where the navigation layer would send it.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;
    fmt().with_env_filter(filter).init();

    let cfg = match std::env::var("ALUMNI_CONFIG") {
        Ok(p) => PortalConfig::from_json_file(Path::new(&p))?.with_env_overrides(),
        Err(_) => PortalConfig::from_env(),
    };
    let seed = std::env::var("ALUMNI_SEED").ok();
    let store = match &seed {
        Some(p) => MemoryStore::from_json_file(Path::new(p))?,
        None => MemoryStore::new(),
    };

    let mut args = std::env::args().skip(1);
    let Some(identity_id) = args.next() else {
        anyhow::bail!("usage: alumni_portal <identity-id> [path]");
    };
    let path = args.next().unwrap_or_else(|| cfg.member_home.clone());
    info!(
        target: "alumni_portal",
        "alumni_portal starting: seed='{}', identity='{}', path='{}'",
        seed.as_deref().unwrap_or("<none>"), identity_id, path
    );

    let routes = RouteTable::new(cfg.fallback_route.clone())
        .public(&cfg.fallback_route)
        .public(&cfg.member_login_target)
        .public(&cfg.admin_login_target)
        .protected(&cfg.member_home, Guard::member(&cfg))
        .protected("/admin/*", Guard::admin(&cfg));

    let provider = LocalAuthProvider::new();
    let resolver = SessionResolver::new(Arc::new(store), cfg.clone());
    let subscription = resolver.attach(&provider)?;
    provider.restore(Identity::new(identity_id.clone(), String::new(), identity_id));

    let mut rx = resolver.watch();
    let session = rx.wait_for(|s| !s.resolving).await?.clone();
    let outcome = routes.navigate(&path, &session);
    println!("{}", serde_json::to_string_pretty(&serde_json::json!({
        "session": session,
        "navigation": outcome,
    }))?);

    subscription.unsubscribe();
    Ok(())
}
