//! Commands answered from the configuration alone.

use anyhow::Result;
use colored::Colorize;

use super::Target;

/// Execute the `states` command: print the chain, one state per line.
pub async fn states(target: &Target) -> Result<()> {
    let codec = target.codec().await?;
    let chain = codec.chain();

    for (position, state) in chain.states().iter().enumerate() {
        let marker = if position == 0 {
            " (collector)".dimmed().to_string()
        } else if state == chain.terminal() {
            " (terminal)".dimmed().to_string()
        } else {
            String::new()
        };
        println!("{position:>3}  {}{marker}", state.cyan());
    }
    Ok(())
}

/// Execute the `key` command.
pub async fn key(target: &Target, id: &str, state: &str) -> Result<()> {
    let codec = target.codec().await?;
    println!("{}", codec.checked_format(id, state)?);
    Ok(())
}

/// Execute the `parse` command.
pub async fn parse(target: &Target, key: &str) -> Result<()> {
    let codec = target.codec().await?;
    let parsed = codec.parse(key)?;

    println!("{:7} {}", "id:".bold(), parsed.id);
    println!("{:7} {}", "state:".bold(), parsed.state.cyan());
    Ok(())
}
