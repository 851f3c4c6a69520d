//! Identity, role resolution and session state for the portal.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod authorizer;
mod listeners;
mod provider;
mod reporter;
mod session;
mod guard;
mod login;

pub use principal::Identity;
pub use authorizer::{Role, resolve_role};
pub use listeners::{Callback, Subscription};
pub use provider::{AuthProvider, LocalAuthProvider, SessionCallback};
pub use reporter::{ErrorReporter, TracingReporter};
pub use session::{SessionResolver, SessionState};
pub use guard::{Guard, Verdict};
pub use login::{complete_sign_in, landing_for, sign_up, SignUpForm};
