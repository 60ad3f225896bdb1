//! Bot command catalogue commands.

use aiq_admin::api::BotApi;
use aiq_core::{Command, CommandId};

use super::{CliError, client, token};

/// Print every command, grouped by category.
#[allow(clippy::print_stdout)]
pub async fn list() -> Result<(), CliError> {
    let mut commands = client()?.list_commands(&token()?).await?;
    commands.sort_by(|a, b| a.category.cmp(&b.category).then(a.text.cmp(&b.text)));

    println!("{} commands", commands.len());
    for command in &commands {
        println!("{}", format_row(command));
    }
    Ok(())
}

fn format_row(command: &Command) -> String {
    format!(
        "{}  [{}] {:<20} {}  {}",
        command.id,
        if command.category.is_empty() {
            "-"
        } else {
            command.category.as_str()
        },
        command.text,
        if command.is_active { "active" } else { "inactive" },
        command.description.as_deref().unwrap_or("")
    )
}

/// Flip a command's active flag.
#[allow(clippy::print_stdout)]
pub async fn toggle(id: &str) -> Result<(), CliError> {
    let id = CommandId::new(id.trim());
    client()?.toggle_command(&token()?, &id).await?;
    println!("Toggled command {id}");
    Ok(())
}
