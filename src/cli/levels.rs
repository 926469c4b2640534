use std::path::PathBuf;

use crate::progression::LevelTable;

/// Prints the level table, validating an override file if one is given.
pub fn run_levels(levels_path: Option<PathBuf>, json: bool) -> anyhow::Result<()> {
    let loaded;
    let table = match &levels_path {
        Some(path) => {
            loaded = LevelTable::load(path)?;
            &loaded
        }
        None => LevelTable::builtin(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(table)?);
        return Ok(());
    }

    match &levels_path {
        Some(path) => println!("Level table v{} ({})", table.version(), path.display()),
        None => println!("Level table v{} (built-in)", table.version()),
    }
    println!();
    println!("{:>5}  {:<12}  {:>8}  {:<8}  DESCRIPTION", "LEVEL", "NAME", "XP", "COLOR");
    for tier in table.tiers() {
        println!(
            "{:>5}  {:<12}  {:>8}  {:<8}  {}",
            tier.level, tier.name, tier.xp_threshold, tier.color, tier.description
        );
    }

    Ok(())
}
