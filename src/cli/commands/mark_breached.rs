//! Mark breached accounts command handler

use crate::config::Config;
use crate::db::Store;

/// Flags each user for a forced password reset. Returns the usernames that
/// did not match any account.
pub async fn mark_breached(store: &Store, usernames: &[String]) -> anyhow::Result<Vec<String>> {
    let mut missing = Vec::new();

    for username in usernames {
        if store.set_force_password_reset(username, true).await? {
            tracing::info!("Flagged '{username}' for a forced password reset");
        } else {
            missing.push(username.clone());
        }
    }

    Ok(missing)
}

pub async fn cmd_mark_breached(config: &Config, usernames: &[String]) -> anyhow::Result<()> {
    let store = Store::new(config.database_url()).await?;
    let missing = mark_breached(&store, usernames).await?;

    let flagged = usernames.len() - missing.len();
    println!("✓ {flagged} user(s) must reset their password at next login");

    if !missing.is_empty() {
        println!("Not found:");
        for username in &missing {
            println!("  {username}");
        }
    }

    Ok(())
}
