mod commands;
mod init;
mod levels;
mod user;

pub use commands::{AdminCommands, UserCommands};
pub use init::run_init;
pub use levels::run_levels;
pub use user::{run_user_add, run_user_list};

use std::path::{Path, PathBuf};

use crate::store::SqliteStore;

pub(crate) const DB_FILE: &str = "steadfast.db";
pub(crate) const ADMIN_TOKEN_FILE: &str = ".admin_token";

/// Initialize store from data directory, checking it exists
pub fn init_store(data_dir: &str) -> anyhow::Result<SqliteStore> {
    let data_path: PathBuf = data_dir.into();
    let db_path = data_path.join(DB_FILE);

    if !db_path.exists() {
        anyhow::bail!(
            "Database not found at {}. Run 'steadfast admin init' first.",
            db_path.display()
        );
    }

    SqliteStore::new(&db_path).map_err(Into::into)
}

#[cfg(unix)]
pub(crate) fn set_restrictive_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[cfg(not(unix))]
pub(crate) fn set_restrictive_permissions(_path: &Path) {}
