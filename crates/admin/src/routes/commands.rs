//! Bot command management route handlers.

use std::collections::BTreeMap;

use askama::Template;
use axum::{
    Form, Router,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{info, instrument};

use aiq_core::forms::CommandDraft;
use aiq_core::{Command, CommandId};

use crate::{
    api::encode_segment,
    error::AppError,
    filters,
    middleware::{RequireAdminAuth, set_flash, take_flash},
    models::AdminSession,
    state::AppState,
};

use super::dashboard::AdminUserView;
use super::{inline_error, render, render_rejected};

/// Group label for commands without a category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Listing query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CommandsQuery {
    /// Id of the command to load into the form.
    pub edit: Option<String>,
}

/// Create/update form input.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CommandForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl From<&Command> for CommandForm {
    fn from(command: &Command) -> Self {
        Self {
            text: command.text.clone(),
            category: command.category.clone(),
            description: command.description.clone().unwrap_or_default(),
        }
    }
}

/// Command row view for templates.
#[derive(Debug, Clone)]
pub struct CommandView {
    pub id: String,
    pub text: String,
    pub description: String,
    pub is_active: bool,
    pub updated_at: String,
    pub edit_href: String,
    pub toggle_action: String,
    pub delete_action: String,
}

impl From<&Command> for CommandView {
    fn from(command: &Command) -> Self {
        let segment = encode_segment(command.id.as_str());
        Self {
            id: command.id.to_string(),
            text: command.text.clone(),
            description: command.description.clone().unwrap_or_default(),
            is_active: command.is_active,
            updated_at: command
                .updated_at
                .or(command.created_at)
                .map_or_else(|| "-".to_string(), |dt| dt.format("%Y-%m-%d").to_string()),
            edit_href: format!("/commands?edit={segment}"),
            toggle_action: format!("/commands/{segment}/toggle"),
            delete_action: format!("/commands/{segment}/delete"),
        }
    }
}

/// Commands sharing a category.
#[derive(Debug, Clone)]
pub struct CommandGroup {
    pub category: String,
    pub commands: Vec<CommandView>,
}

/// Group commands by category, categories sorted by name.
#[must_use]
pub fn group_by_category(commands: &[Command]) -> Vec<CommandGroup> {
    let mut groups: BTreeMap<String, Vec<CommandView>> = BTreeMap::new();
    for command in commands {
        let category = command.category.trim();
        let category = if category.is_empty() {
            UNCATEGORIZED
        } else {
            category
        };
        groups
            .entry(category.to_string())
            .or_default()
            .push(CommandView::from(command));
    }

    groups
        .into_iter()
        .map(|(category, commands)| CommandGroup { category, commands })
        .collect()
}

/// State of the create/edit form.
#[derive(Debug, Clone)]
pub struct CommandFormView {
    /// Id of the command being edited; `None` for the create form.
    pub editing: Option<String>,
    pub action: String,
    pub values: CommandForm,
    pub error: Option<String>,
}

impl CommandFormView {
    fn create(values: CommandForm, error: Option<String>) -> Self {
        Self {
            editing: None,
            action: "/commands".to_string(),
            values,
            error,
        }
    }

    fn edit(id: &CommandId, values: CommandForm, error: Option<String>) -> Self {
        Self {
            editing: Some(id.to_string()),
            action: format!("/commands/{}", encode_segment(id.as_str())),
            values,
            error,
        }
    }
}

/// Commands page template.
#[derive(Template)]
#[template(path = "commands/index.html")]
pub struct CommandsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub flash: Option<String>,
    pub groups: Vec<CommandGroup>,
    pub categories: Vec<String>,
    pub total: usize,
    pub form: CommandFormView,
    /// Failure of a row action (toggle or delete).
    pub action_error: Option<String>,
}

/// Build the commands router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/commands", get(index).post(create))
        .route("/commands/{id}", post(update))
        .route("/commands/{id}/toggle", post(toggle))
        .route("/commands/{id}/delete", post(delete))
}

async fn page_template(
    state: &AppState,
    auth: &AdminSession,
    flash: Option<String>,
    form: CommandFormView,
    action_error: Option<String>,
) -> Result<CommandsIndexTemplate, AppError> {
    let commands = state.api().list_commands(&auth.token).await?;
    Ok(build_template(auth, &commands, flash, form, action_error))
}

fn build_template(
    auth: &AdminSession,
    commands: &[Command],
    flash: Option<String>,
    form: CommandFormView,
    action_error: Option<String>,
) -> CommandsIndexTemplate {
    let groups = group_by_category(commands);
    let categories = groups
        .iter()
        .map(|g| g.category.clone())
        .filter(|c| c != UNCATEGORIZED)
        .collect();

    CommandsIndexTemplate {
        admin_user: AdminUserView::from(&auth.admin),
        current_path: "/commands".to_string(),
        flash,
        groups,
        categories,
        total: commands.len(),
        form,
        action_error,
    }
}

/// Commands page handler.
///
/// GET /commands
#[instrument(skip(auth, state, session))]
pub async fn index(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CommandsQuery>,
) -> Result<Response, AppError> {
    let commands = state.api().list_commands(&auth.token).await?;

    let form = match query.edit.filter(|id| !id.is_empty()) {
        Some(id) => {
            let id = CommandId::new(id);
            let command = commands
                .iter()
                .find(|c| c.id == id)
                .ok_or_else(|| AppError::NotFound(format!("command {id}")))?;
            CommandFormView::edit(&id, CommandForm::from(command), None)
        }
        None => CommandFormView::create(CommandForm::default(), None),
    };

    let flash = take_flash(&session).await;
    Ok(render(&build_template(&auth, &commands, flash, form, None)).into_response())
}

/// Create a command.
///
/// POST /commands
#[instrument(skip(auth, state, session, form), fields(admin = %auth.admin.username))]
pub async fn create(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<CommandForm>,
) -> Result<Response, AppError> {
    let error = match CommandDraft::parse(&form.text, &form.category, &form.description) {
        Ok(draft) => match state.api().create_command(&auth.token, &draft).await {
            Ok(()) => {
                info!(text = %draft.text, "Command created");
                set_flash(&session, format!("Command {} created", draft.text)).await;
                return Ok(Redirect::to("/commands").into_response());
            }
            Err(err) => inline_error(err)?,
        },
        Err(err) => err.to_string(),
    };

    let template = page_template(
        &state,
        &auth,
        None,
        CommandFormView::create(form, Some(error)),
        None,
    )
    .await?;
    Ok(render_rejected(&template))
}

/// Replace a command's fields.
///
/// POST /commands/{id}
#[instrument(
    skip(auth, state, session, form),
    fields(admin = %auth.admin.username, command_id = %id)
)]
pub async fn update(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<CommandForm>,
) -> Result<Response, AppError> {
    let id = CommandId::new(id);
    let error = match CommandDraft::parse(&form.text, &form.category, &form.description) {
        Ok(draft) => match state.api().update_command(&auth.token, &id, &draft).await {
            Ok(()) => {
                info!("Command updated");
                set_flash(&session, format!("Command {} updated", draft.text)).await;
                return Ok(Redirect::to("/commands").into_response());
            }
            Err(err) => inline_error(err)?,
        },
        Err(err) => err.to_string(),
    };

    let template = page_template(
        &state,
        &auth,
        None,
        CommandFormView::edit(&id, form, Some(error)),
        None,
    )
    .await?;
    Ok(render_rejected(&template))
}

/// Flip a command's active flag.
///
/// POST /commands/{id}/toggle
#[instrument(skip(auth, state), fields(admin = %auth.admin.username, command_id = %id))]
pub async fn toggle(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = CommandId::new(id);
    match state.api().toggle_command(&auth.token, &id).await {
        Ok(()) => {
            info!("Command toggled");
            Ok(Redirect::to("/commands").into_response())
        }
        Err(err) => row_action_failed(&state, &auth, err).await,
    }
}

/// Remove a command.
///
/// POST /commands/{id}/delete
#[instrument(
    skip(auth, state, session),
    fields(admin = %auth.admin.username, command_id = %id)
)]
pub async fn delete(
    RequireAdminAuth(auth): RequireAdminAuth,
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let id = CommandId::new(id);
    match state.api().delete_command(&auth.token, &id).await {
        Ok(()) => {
            info!("Command deleted");
            set_flash(&session, "Command deleted").await;
            Ok(Redirect::to("/commands").into_response())
        }
        Err(err) => row_action_failed(&state, &auth, err).await,
    }
}

async fn row_action_failed(
    state: &AppState,
    auth: &AdminSession,
    err: crate::api::ApiError,
) -> Result<Response, AppError> {
    let message = inline_error(err)?;
    let template = page_template(
        state,
        auth,
        None,
        CommandFormView::create(CommandForm::default(), None),
        Some(message),
    )
    .await?;
    Ok(render_rejected(&template))
}
