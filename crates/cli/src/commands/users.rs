//! User listing command.

use aiq_admin::api::{BotApi, UserQuery};
use aiq_core::{CreditFilter, Page, User, normalize_page};

use super::{CliError, client, token};

/// Print one page of users.
#[allow(clippy::print_stdout)]
pub async fn list(page: Option<u32>, filter: CreditFilter) -> Result<(), CliError> {
    let query = UserQuery::page(normalize_page(page), filter);
    let users = client()?.list_users(&token()?, &query).await?;

    println!("{}", format_header(&users, filter));
    for user in &users.data {
        println!("{}", format_row(user));
    }
    Ok(())
}

fn format_header(users: &Page<User>, filter: CreditFilter) -> String {
    format!(
        "Page {} of {} ({} users, filter: {})",
        users.pagination.page,
        users.pagination.pages.max(1),
        users.pagination.total,
        filter.label()
    )
}

fn format_row(user: &User) -> String {
    format!(
        "{}  {:<24} {:>6} credits  {:>5} interactions  {}",
        user.id, user.display_name, user.credits, user.interaction_count, user.line_user_id
    )
}
