//! Commands that read or change buckets on the Redis server.

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use rpipe_core::Advance;
use serde_json::Value;

use super::Target;

/// Execute the `register` command.
///
/// The file holds either a single message object or an array of them.
pub async fn register(target: &Target, file: &Path) -> Result<()> {
    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read messages: {}", file.display()))?;
    let messages = match serde_json::from_str::<Value>(&content)
        .with_context(|| format!("Failed to parse messages: {}", file.display()))?
    {
        Value::Array(messages) => messages,
        single => vec![single],
    };

    let engine = target.engine().await?;
    let added = engine.register_messages(&messages).await?;

    println!(
        "{} {added} of {} message(s) into '{}'",
        "Registered".green(),
        messages.len(),
        engine.collector_name()
    );
    Ok(())
}

/// Execute the `add` command.
pub async fn add(target: &Target, id: &str, state: &str, value: &str) -> Result<()> {
    let engine = target.engine().await?;
    if engine.add(id, state, value).await? {
        println!("{} {id}/{state}", "Added to".green());
    } else {
        println!("{} {id}/{state}", "Already in".yellow());
    }
    Ok(())
}

/// Execute the `members` command.
pub async fn members(target: &Target, id: &str, state: &str) -> Result<()> {
    let engine = target.engine().await?;
    print_members(&engine.get_members(id, state).await?);
    Ok(())
}

/// Execute the `collected` command.
pub async fn collected(target: &Target, id: &str) -> Result<()> {
    let engine = target.engine().await?;
    print_members(&engine.get_collected(id).await?);
    Ok(())
}

/// Execute the `move` command.
pub async fn move_bucket(target: &Target, id: &str, from: &str, to: &str) -> Result<()> {
    let engine = target.engine().await?;
    engine.move_id(id, from, to).await?;
    println!("{} {id}: {from} -> {}", "Moved".green(), to.cyan());
    Ok(())
}

/// Execute the `next` command.
pub async fn next(target: &Target, id: &str, from: &str) -> Result<()> {
    let engine = target.engine().await?;
    match engine.next(id, from).await? {
        Advance::Moved { from, to } => {
            println!("{} {id}: {from} -> {}", "Moved".green(), to.cyan());
        }
        Advance::Terminal => {
            println!("{} '{from}' is the last state", "Nothing to do:".yellow());
        }
    }
    Ok(())
}

/// Execute the `merge` command.
pub async fn merge(target: &Target, id: &str, to: &str, from: &[String]) -> Result<()> {
    let engine = target.engine().await?;
    let members = engine.merge(id, to, from).await?;
    println!(
        "{} {} into {id}/{}",
        "Merged".green(),
        from.join(", "),
        to.cyan()
    );
    print_members(&members);
    Ok(())
}

/// Execute the `clear` command.
pub async fn clear(target: &Target, id: &str, state: &str) -> Result<()> {
    let engine = target.engine().await?;
    let removed = engine.clear(id, state).await?;
    if removed > 0 {
        println!("{} {id}/{state}", "Cleared".green());
    } else {
        println!("{} {id}/{state} was already empty", "Nothing to do:".yellow());
    }
    Ok(())
}

fn print_members(members: &[String]) {
    if members.is_empty() {
        println!("{}", "(empty)".dimmed());
        return;
    }
    for member in members {
        println!("{member}");
    }
}
