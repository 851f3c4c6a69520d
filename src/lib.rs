pub mod error;
pub mod config;
pub mod store;
pub mod identity;
pub mod navigation;
pub mod moderation;
pub mod directory;

pub use error::{AppError, AppResult};
pub use config::PortalConfig;
