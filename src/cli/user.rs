use chrono::Utc;
use inquire::{Confirm, Text};
use uuid::Uuid;

use crate::auth::TokenGenerator;
use crate::progression::LevelTable;
use crate::server::validation::validate_display_name;
use crate::store::{SqliteStore, Store};
use crate::types::User;

use super::init_store;

const LIST_PAGE_SIZE: i32 = 100;

pub(crate) fn prompt_display_name() -> anyhow::Result<String> {
    let name = Text::new("Display name:")
        .with_validator(|input: &str| {
            Ok(validate_display_name(input)
                .map(|_| inquire::validator::Validation::Valid)
                .unwrap_or_else(|e| inquire::validator::Validation::Invalid(e.into())))
        })
        .prompt()?;

    validate_display_name(&name).map_err(anyhow::Error::msg)
}

fn create_user(store: &SqliteStore, name: &str) -> anyhow::Result<User> {
    let user = User::new(Uuid::new_v4().to_string(), name.to_string(), Utc::now());
    store.create_user(&user)?;
    Ok(user)
}

/// Creates a user plus a non-admin token, returning the raw token.
pub(crate) fn create_user_with_token(
    store: &SqliteStore,
    generator: &TokenGenerator,
    name: &str,
    expires_at: Option<chrono::DateTime<Utc>>,
) -> anyhow::Result<(User, String)> {
    let user = create_user(store, name)?;
    let (token, raw_token) = generator.issue(Some(user.id.clone()), false, expires_at)?;
    store.create_token(&token)?;
    Ok((user, raw_token))
}

pub fn run_user_add(
    data_dir: String,
    name: Option<String>,
    create_token_flag: bool,
    non_interactive: bool,
) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let name = if let Some(name) = name {
        validate_display_name(&name).map_err(anyhow::Error::msg)?
    } else if non_interactive {
        anyhow::bail!("--name is required in non-interactive mode");
    } else {
        prompt_display_name()?
    };

    let should_create_token = if create_token_flag {
        true
    } else if non_interactive {
        false
    } else {
        Confirm::new("Create access token?")
            .with_default(true)
            .prompt()?
    };

    if should_create_token {
        let generator = TokenGenerator::new();
        let (user, raw_token) = create_user_with_token(&store, &generator, &name, None)?;

        println!();
        println!("Created user \"{}\" ({})", user.display_name, user.id);
        println!();
        println!("Token created: {raw_token}");
        println!("  Save this now - it cannot be retrieved later.");
    } else {
        let user = create_user(&store, &name)?;

        println!();
        println!("Created user \"{}\" ({})", user.display_name, user.id);
    }

    println!();

    Ok(())
}

pub fn run_user_list(data_dir: String, json: bool) -> anyhow::Result<()> {
    let store = init_store(&data_dir)?;

    let mut users = Vec::new();
    let mut cursor = String::new();
    loop {
        let page = store.list_users(&cursor, LIST_PAGE_SIZE)?;
        let done = page.len() < LIST_PAGE_SIZE as usize;
        if let Some(last) = page.last() {
            cursor = last.id.clone();
        }
        users.extend(page);
        if done {
            break;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    if users.is_empty() {
        println!("No users.");
        return Ok(());
    }

    // The CLI reads the built-in table; a server started with --levels-path
    // may name tiers differently.
    let levels = LevelTable::builtin();

    println!(
        "{:<36}  {:<20}  {:>5}  {:<12}  {:>7}  {:>8}",
        "ID", "NAME", "LEVEL", "TIER", "XP", "RELAPSES"
    );
    for user in &users {
        println!(
            "{:<36}  {:<20}  {:>5}  {:<12}  {:>7}  {:>8}",
            user.id,
            user.display_name,
            user.level,
            levels.resolve_tier(user.level).name,
            user.xp,
            user.total_relapses
        );
    }

    Ok(())
}
