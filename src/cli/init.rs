use std::fs;
use std::path::PathBuf;

use anyhow::bail;

use crate::auth::TokenGenerator;
use crate::store::{SqliteStore, Store};

use super::user::create_user_with_token;
use super::{ADMIN_TOKEN_FILE, DB_FILE, set_restrictive_permissions};

pub fn run_init(data_dir: String, non_interactive: bool) -> anyhow::Result<()> {
    let data_path: PathBuf = data_dir.into();
    fs::create_dir_all(&data_path)?;

    let store = SqliteStore::new(data_path.join(DB_FILE))?;
    store.initialize()?;

    let token_file = data_path.join(ADMIN_TOKEN_FILE);

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let generator = TokenGenerator::new();
    let (token, raw_token) = generator.issue(None, true, None)?;

    store.create_token(&token)?;
    fs::write(&token_file, &raw_token)?;
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    if !non_interactive {
        create_default_user_prompt(&store, &generator)?;
    }

    Ok(())
}

fn create_default_user_prompt(store: &SqliteStore, generator: &TokenGenerator) -> anyhow::Result<()> {
    let create_user = inquire::Confirm::new("Would you like to create a default user?")
        .with_default(false)
        .prompt()?;

    if !create_user {
        return Ok(());
    }

    let name = super::user::prompt_display_name()?;
    let (user, raw_token) = create_user_with_token(store, generator, &name, None)?;

    println!();
    println!("========================================");
    println!("Created user '{}' ({}) with token:", user.display_name, user.id);
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}
