use std::path::PathBuf;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use pgai_adapters::export::{default_export_file_name, export_result_to_csv, CsvOptions};
use pgai_core::actions::{ActionId, ActionRegistry};
use pgai_core::autocomplete::{apply_completion, completion_prefix, Suggestion};
use pgai_core::confirm::{ConfirmationToken, DestructiveAction};
use pgai_core::connections::ConnectionId;
use pgai_core::favorites::{group_by_folder, FavoriteQuery};
use pgai_core::insights::{AiAction, AiInsight, InsightOutcome};
use pgai_core::results::{render_mode, RenderMode};
use pgai_core::tabs::{ApplyOutcome, InsertMode};
use pgai_core::workspace::{Workspace, WorkspaceError};
use tracing::warn;

use crate::jobs::{Completion, Job};

pub(crate) const SUGGESTION_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Msg {
    Quit,
    Action(ActionId),
    NextConnection,
    UseChatSql,
    Input(char),
    Enter,
    Backspace,
    Complete,
    Escape,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PromptPurpose {
    AskAi,
    FavoriteName,
    RenameTab,
}

impl PromptPurpose {
    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::AskAi => "Ask AI",
            Self::FavoriteName => "Save favorite as",
            Self::RenameTab => "Rename tab",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LibraryView {
    Favorites,
    History,
}

impl LibraryView {
    pub(crate) fn title(self) -> &'static str {
        match self {
            Self::Favorites => "Favorites",
            Self::History => "History",
        }
    }

    pub(crate) fn empty_hint(self) -> &'static str {
        match self {
            Self::Favorites => "No favorites saved yet (Ctrl+S saves the editor)",
            Self::History => "No queries in history for this connection",
        }
    }

    fn toggle(self) -> Self {
        match self {
            Self::Favorites => Self::History,
            Self::History => Self::Favorites,
        }
    }
}

/// One row of the favorites/history pane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LibraryEntry<'a> {
    pub(crate) folder: Option<&'a str>,
    pub(crate) label: String,
    pub(crate) query: &'a str,
    pub(crate) delete: Option<DestructiveAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mode {
    Editing,
    Prompt {
        purpose: PromptPurpose,
        buffer: String,
    },
    Library {
        view: LibraryView,
        selected: usize,
    },
    Confirm {
        token: ConfirmationToken,
        action: DestructiveAction,
        view: LibraryView,
        selected: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TuiOptions {
    pub export_delimiter: char,
    pub export_dir: PathBuf,
}

impl Default for TuiOptions {
    fn default() -> Self {
        Self {
            export_delimiter: ',',
            export_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug)]
pub(crate) struct TuiApp {
    pub(crate) workspace: Workspace,
    pub(crate) actions: ActionRegistry,
    pub(crate) mode: Mode,
    pub(crate) options: TuiOptions,
    pub(crate) status_line: String,
    pub(crate) chat_sql: Option<String>,
    pub(crate) generating: bool,
    pub(crate) should_quit: bool,
}

impl TuiApp {
    pub(crate) fn new(workspace: Workspace, options: TuiOptions) -> Self {
        Self {
            workspace,
            actions: ActionRegistry,
            mode: Mode::Editing,
            options,
            status_line: "Loading connections...".to_string(),
            chat_sql: None,
            generating: false,
            should_quit: false,
        }
    }

    pub(crate) fn startup_jobs() -> Vec<Job> {
        vec![Job::LoadConnections, Job::LoadFavorites]
    }

    pub(crate) fn suggestions(&self) -> Vec<Suggestion> {
        let content = self.workspace.active_tab().content();
        let prefix = completion_prefix(content);
        if prefix.is_empty() {
            return Vec::new();
        }
        let mut suggestions = self.workspace.suggest(prefix);
        suggestions.truncate(SUGGESTION_LIMIT);
        suggestions
    }

    /// Favorites come grouped by folder; history keeps the backend order.
    pub(crate) fn library_entries(&self, view: LibraryView) -> Vec<LibraryEntry<'_>> {
        match view {
            LibraryView::Favorites => group_by_folder(self.workspace.favorites())
                .into_iter()
                .flat_map(|(folder, favorites)| {
                    favorites.into_iter().map(move |favorite| LibraryEntry {
                        folder: Some(folder),
                        label: favorite.name.clone(),
                        query: favorite.query.as_str(),
                        delete: favorite.id.map(DestructiveAction::DeleteFavorite),
                    })
                })
                .collect(),
            LibraryView::History => self
                .workspace
                .history()
                .iter()
                .map(|entry| LibraryEntry {
                    folder: None,
                    label: format!("{} ({:.3}s)", entry.executed_at, entry.execution_time),
                    query: entry.query.as_str(),
                    delete: Some(DestructiveAction::DeleteHistoryEntry(entry.id)),
                })
                .collect(),
        }
    }

    pub(crate) fn handle(&mut self, msg: Msg) -> Vec<Job> {
        match self.mode {
            Mode::Prompt { .. } => return self.handle_prompt(msg),
            Mode::Library { view, selected } => return self.handle_library(view, selected, msg),
            Mode::Confirm { .. } => return self.handle_confirm(msg),
            Mode::Editing => {}
        }

        match msg {
            Msg::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Msg::Action(action) => self.invoke(action),
            Msg::NextConnection => self.next_connection(),
            Msg::UseChatSql => {
                match self.chat_sql.take() {
                    Some(sql) if self.workspace.insert_sql_into_active(&sql, InsertMode::Append) => {
                        self.status_line = "Generated SQL added to the editor".to_string();
                    }
                    _ => self.status_line = "No generated SQL to use".to_string(),
                }
                Vec::new()
            }
            Msg::Input(ch) => {
                self.edit_active(|content| content.push(ch));
                Vec::new()
            }
            Msg::Enter => {
                self.edit_active(|content| content.push('\n'));
                Vec::new()
            }
            Msg::Backspace => {
                self.edit_active(|content| {
                    content.pop();
                });
                Vec::new()
            }
            Msg::Complete => {
                self.complete_word();
                Vec::new()
            }
            Msg::Escape => {
                if self.workspace.insight().displayed().is_some() {
                    self.invoke(ActionId::DismissInsight)
                } else {
                    Vec::new()
                }
            }
            Msg::Up | Msg::Down => Vec::new(),
        }
    }

    fn handle_prompt(&mut self, msg: Msg) -> Vec<Job> {
        let Mode::Prompt { purpose, buffer } = &mut self.mode else {
            return Vec::new();
        };
        match msg {
            Msg::Quit => {
                self.should_quit = true;
                Vec::new()
            }
            Msg::Input(ch) => {
                buffer.push(ch);
                Vec::new()
            }
            Msg::Backspace => {
                buffer.pop();
                Vec::new()
            }
            Msg::Escape => {
                self.mode = Mode::Editing;
                self.status_line = "Cancelled".to_string();
                Vec::new()
            }
            Msg::Enter => {
                let purpose = *purpose;
                let text = std::mem::take(buffer);
                self.mode = Mode::Editing;
                self.submit_prompt(purpose, &text)
            }
            Msg::Action(_)
            | Msg::NextConnection
            | Msg::UseChatSql
            | Msg::Complete
            | Msg::Up
            | Msg::Down => Vec::new(),
        }
    }

    fn handle_library(&mut self, view: LibraryView, selected: usize, msg: Msg) -> Vec<Job> {
        let last = self.library_entries(view).len().saturating_sub(1);
        let selected = selected.min(last);
        match msg {
            Msg::Quit => self.should_quit = true,
            Msg::Escape => self.mode = Mode::Editing,
            Msg::Up => {
                self.mode = Mode::Library {
                    view,
                    selected: selected.saturating_sub(1),
                };
            }
            Msg::Down => {
                self.mode = Mode::Library {
                    view,
                    selected: (selected + 1).min(last),
                };
            }
            Msg::Complete => {
                self.mode = Mode::Library {
                    view: view.toggle(),
                    selected: 0,
                };
            }
            Msg::Enter => self.open_library_entry(view, selected),
            Msg::Input('d') => self.request_delete(view, selected),
            _ => {}
        }
        Vec::new()
    }

    fn open_library_entry(&mut self, view: LibraryView, selected: usize) {
        let entry = self
            .library_entries(view)
            .get(selected)
            .map(|entry| (entry.label.clone(), entry.query.to_string()));
        let Some((label, query)) = entry else {
            self.status_line = view.empty_hint().to_string();
            return;
        };
        if self.workspace.open_query(&query) {
            self.mode = Mode::Editing;
            self.status_line = format!("Opened {label}");
        }
    }

    fn request_delete(&mut self, view: LibraryView, selected: usize) {
        let target = self
            .library_entries(view)
            .get(selected)
            .and_then(|entry| entry.delete);
        let Some(action) = target else {
            self.status_line = "Nothing to delete".to_string();
            return;
        };
        let token = self.workspace.request_confirmation(action);
        self.mode = Mode::Confirm {
            token,
            action,
            view,
            selected,
        };
    }

    fn handle_confirm(&mut self, msg: Msg) -> Vec<Job> {
        let accepted = match msg {
            Msg::Input('y' | 'Y') => true,
            Msg::Input('n' | 'N') | Msg::Escape => false,
            Msg::Quit => {
                self.should_quit = true;
                return Vec::new();
            }
            _ => return Vec::new(),
        };
        let Mode::Confirm {
            token,
            action,
            view,
            selected,
        } = std::mem::replace(&mut self.mode, Mode::Editing)
        else {
            return Vec::new();
        };
        self.mode = Mode::Library { view, selected };

        if !accepted {
            self.workspace.decline(&token);
            self.status_line = "Cancelled".to_string();
            return Vec::new();
        }
        match self.workspace.confirm(&token, action) {
            Ok(proof) => {
                self.status_line = "Deleting...".to_string();
                vec![Job::Destructive(self.workspace.begin_destructive(proof))]
            }
            Err(error) => {
                self.status_line = error.to_string();
                Vec::new()
            }
        }
    }

    fn submit_prompt(&mut self, purpose: PromptPurpose, text: &str) -> Vec<Job> {
        match purpose {
            PromptPurpose::AskAi => match self.workspace.begin_generate(text) {
                Some((pending, registration)) => {
                    self.generating = true;
                    self.status_line = "Generating SQL...".to_string();
                    vec![Job::Generate {
                        pending,
                        registration,
                    }]
                }
                None => {
                    self.status_line = "Enter a question for the assistant".to_string();
                    Vec::new()
                }
            },
            PromptPurpose::RenameTab => {
                let tab = self.workspace.tabs().active_id();
                self.status_line = if self.workspace.rename_tab(tab, text) {
                    format!("Renamed tab to {}", text.trim())
                } else {
                    "Tab name cannot be blank".to_string()
                };
                Vec::new()
            }
            PromptPurpose::FavoriteName => {
                let favorite = FavoriteQuery::new(
                    text,
                    self.workspace.active_tab().content(),
                    self.workspace.current_connection(),
                );
                match favorite {
                    Some(favorite) => {
                        self.status_line = format!("Saving favorite `{}`...", favorite.name);
                        vec![Job::SaveFavorite(favorite)]
                    }
                    None => {
                        self.status_line = "Favorite needs a name".to_string();
                        Vec::new()
                    }
                }
            }
        }
    }

    fn edit_active(&mut self, edit: impl FnOnce(&mut String)) {
        let tab = self.workspace.tabs().active_id();
        let mut content = self.workspace.active_tab().content().to_string();
        edit(&mut content);
        self.workspace.update_content(tab, content);
    }

    fn complete_word(&mut self) {
        let Some(suggestion) = self.suggestions().into_iter().next() else {
            self.edit_active(|content| content.push_str("    "));
            return;
        };
        let completed = apply_completion(self.workspace.active_tab().content(), &suggestion);
        let tab = self.workspace.tabs().active_id();
        self.workspace.update_content(tab, completed);
    }

    fn next_connection(&mut self) -> Vec<Job> {
        let connections = self.workspace.connections().connections();
        if connections.is_empty() {
            self.status_line = "No saved connections".to_string();
            return Vec::new();
        }
        let current = self.workspace.current_connection();
        let position = connections
            .iter()
            .position(|connection| Some(connection.id) == current);
        let next = position.map_or(0, |index| (index + 1) % connections.len());
        let id = connections[next].id;
        if !self.workspace.switch_connection(id) {
            return Vec::new();
        }
        self.chat_sql = None;
        self.generating = false;
        self.status_line = format!("Switched to {}", self.connection_label());
        self.connection_jobs(id)
    }

    fn connection_jobs(&mut self, connection: ConnectionId) -> Vec<Job> {
        let mut jobs = Vec::new();
        if let Some((pending, registration)) = self.workspace.begin_load_conversations() {
            jobs.push(Job::LoadConversations {
                pending,
                registration,
            });
        }
        if let Some((pending, registration)) = self.workspace.begin_autocomplete() {
            jobs.push(Job::Autocomplete {
                pending,
                registration,
                refresh: false,
            });
        }
        jobs.push(Job::LoadHistory(connection));
        jobs
    }

    pub(crate) fn connection_label(&self) -> String {
        self.workspace
            .connections()
            .current()
            .map_or_else(
                || "no connection".to_string(),
                |connection| format!("{} ({})", connection.name, connection.address()),
            )
    }

    pub(crate) fn invoke(&mut self, action: ActionId) -> Vec<Job> {
        let context = self.workspace.action_context();
        if let Err(error) = self.actions.ensure_enabled(action, &context) {
            self.status_line = error.to_string();
            return Vec::new();
        }
        let active = self.workspace.tabs().active_id();

        match action {
            ActionId::Execute => match self.workspace.begin_execute(active, None) {
                Some((pending, registration)) => {
                    self.status_line = "Running query...".to_string();
                    vec![Job::Execute {
                        pending,
                        registration,
                        row_limit: self.workspace.row_limit(),
                    }]
                }
                None => Vec::new(),
            },
            ActionId::Format => match self.workspace.begin_format(active) {
                Some((pending, registration)) => vec![Job::Format {
                    pending,
                    registration,
                }],
                None => Vec::new(),
            },
            ActionId::SaveFavorite => self.open_prompt(PromptPurpose::FavoriteName),
            ActionId::AskAi => self.open_prompt(PromptPurpose::AskAi),
            ActionId::Explain => self.request_insight(AiAction::Explain),
            ActionId::Debug => self.request_insight(AiAction::Debug),
            ActionId::Optimize => self.request_insight(AiAction::Optimize),
            ActionId::Analyze => self.request_insight(AiAction::Analyze),
            ActionId::SuggestIndexes => self.request_insight(AiAction::Indexes),
            ActionId::NewTab => {
                self.workspace.add_tab();
                Vec::new()
            }
            ActionId::CloseTab => {
                self.workspace.close_tab(active);
                Vec::new()
            }
            ActionId::NextTab => {
                self.workspace.next_tab();
                Vec::new()
            }
            ActionId::RenameTab => {
                self.mode = Mode::Prompt {
                    purpose: PromptPurpose::RenameTab,
                    buffer: self.workspace.active_tab().name().to_string(),
                };
                Vec::new()
            }
            ActionId::OpenLibrary => {
                self.mode = Mode::Library {
                    view: LibraryView::Favorites,
                    selected: 0,
                };
                let mut jobs = vec![Job::LoadFavorites];
                if let Some(connection) = self.workspace.current_connection() {
                    jobs.push(Job::LoadHistory(connection));
                }
                jobs
            }
            ActionId::PreviousPage => {
                self.workspace.previous_page();
                Vec::new()
            }
            ActionId::NextPage => {
                self.workspace.next_page();
                Vec::new()
            }
            ActionId::CyclePageSize => {
                let size = self.workspace.cycle_page_size();
                self.status_line = format!("{} rows per page", size.rows());
                Vec::new()
            }
            ActionId::ExportCsv => {
                self.export_active_result();
                Vec::new()
            }
            ActionId::InsertInsightSql => {
                if self.workspace.insert_insight_sql().is_some() {
                    self.status_line = "Inserted SQL from the assistant".to_string();
                }
                Vec::new()
            }
            ActionId::DismissInsight => {
                self.workspace.dismiss_insight();
                Vec::new()
            }
            ActionId::RefreshSchema => match self.workspace.begin_autocomplete() {
                Some((pending, registration)) => {
                    self.status_line = "Refreshing schema...".to_string();
                    vec![Job::Autocomplete {
                        pending,
                        registration,
                        refresh: true,
                    }]
                }
                None => Vec::new(),
            },
        }
    }

    fn open_prompt(&mut self, purpose: PromptPurpose) -> Vec<Job> {
        self.mode = Mode::Prompt {
            purpose,
            buffer: String::new(),
        };
        Vec::new()
    }

    fn request_insight(&mut self, action: AiAction) -> Vec<Job> {
        match self.workspace.begin_insight(action) {
            Some((pending, registration)) => {
                self.status_line = format!("Requesting {}...", action.title());
                vec![Job::Insight {
                    pending,
                    registration,
                }]
            }
            None => {
                self.status_line = format!("{}: nothing to send", action.title());
                Vec::new()
            }
        }
    }

    fn export_active_result(&mut self) {
        let Some(result) = self.workspace.active_tab().result() else {
            return;
        };
        let path = self.options.export_dir.join(default_export_file_name());
        let options = CsvOptions {
            delimiter: self.options.export_delimiter,
        };
        self.status_line = match export_result_to_csv(&path, result, options) {
            Ok(rows) => format!("Exported {rows} rows to {}", path.display()),
            Err(error) => {
                warn!(%error, "export failed");
                error.to_string()
            }
        };
    }

    pub(crate) fn complete(&mut self, completion: Completion) -> Vec<Job> {
        match completion {
            Completion::Execute { pending, outcome } => {
                let tab = pending.ticket.tab;
                let applied = self.workspace.finish_execute(pending, outcome);
                if applied == ApplyOutcome::Applied && tab == self.workspace.tabs().active_id() {
                    self.status_line = self.result_status();
                }
                Vec::new()
            }
            Completion::Format { pending, outcome } => {
                match self.workspace.finish_format(pending, outcome) {
                    Some(ApplyOutcome::Applied) => self.status_line = "Formatted".to_string(),
                    Some(_) => self.status_line = "Editor changed; formatting skipped".to_string(),
                    None => {}
                }
                Vec::new()
            }
            Completion::Insight { pending, outcome } => {
                let action = pending.ticket.ticket.action;
                match self.workspace.finish_insight(pending, outcome) {
                    InsightOutcome::Displayed => self.status_line = format!("{} ready", action.title()),
                    InsightOutcome::Failed(error) => self.status_line = error.to_string(),
                    InsightOutcome::Stale => {}
                }
                Vec::new()
            }
            Completion::Generate { pending, outcome } => {
                self.generating = false;
                match self.workspace.finish_generate(pending, outcome) {
                    Ok(AiInsight::Generated { sql, .. }) => {
                        self.chat_sql = Some(sql);
                        self.status_line = "SQL generated (Ctrl+Y to use it)".to_string();
                    }
                    Ok(_) | Err(WorkspaceError::Cancelled) => {}
                    Err(error) => self.status_line = error.to_string(),
                }
                Vec::new()
            }
            Completion::Conversations { pending, outcome } => {
                if let Err(error) = self.workspace.finish_load_conversations(pending, outcome) {
                    if !matches!(error, WorkspaceError::Cancelled) {
                        self.status_line = format!("Failed to load conversations: {error}");
                    }
                }
                Vec::new()
            }
            Completion::Autocomplete { pending, outcome } => {
                let refreshed = match &outcome {
                    Ok(Ok((count, _))) => *count,
                    _ => None,
                };
                let outcome = outcome.map(|fetched| fetched.map(|(_, data)| data));
                match self.workspace.finish_autocomplete(pending, outcome) {
                    Ok(()) => {
                        if let Some(count) = refreshed {
                            self.status_line = format!("Schema refreshed: {count} tables");
                        }
                    }
                    Err(WorkspaceError::Cancelled) => {}
                    Err(error) => self.status_line = format!("Failed to load schema: {error}"),
                }
                Vec::new()
            }
            Completion::Connections(Ok(connections)) => {
                let moved = self.workspace.install_connections(connections);
                self.status_line = if self.workspace.connections().connections().is_empty() {
                    "No saved connections".to_string()
                } else {
                    format!("Connected to {}", self.connection_label())
                };
                match moved {
                    Some(Some(connection)) => self.connection_jobs(connection),
                    _ => Vec::new(),
                }
            }
            Completion::Connections(Err(error)) => {
                self.status_line = error.user_message("Failed to load connections");
                Vec::new()
            }
            Completion::Favorites(Ok(favorites)) => {
                self.workspace.install_favorites(favorites);
                Vec::new()
            }
            Completion::Favorites(Err(error)) => {
                warn!(%error, "loading favorites failed");
                Vec::new()
            }
            Completion::History(connection, Ok(entries)) => {
                self.workspace.install_history(connection, entries);
                Vec::new()
            }
            Completion::History(connection, Err(error)) => {
                warn!(%connection, %error, "loading history failed");
                Vec::new()
            }
            Completion::FavoriteSaved(Ok(_)) => {
                self.status_line = "Favorite saved".to_string();
                vec![Job::LoadFavorites]
            }
            Completion::FavoriteSaved(Err(error)) => {
                self.status_line = error.user_message("Failed to save favorite");
                Vec::new()
            }
            Completion::Destructive { request, outcome } => {
                self.status_line = match self.workspace.finish_destructive(request, outcome) {
                    Ok(action) => deleted_status(action).to_string(),
                    Err(WorkspaceError::Gateway(error)) => error.user_message("Delete failed"),
                    Err(error) => error.to_string(),
                };
                Vec::new()
            }
        }
    }

    fn result_status(&self) -> String {
        match self.workspace.active_tab().result() {
            Some(result) => match render_mode(result) {
                RenderMode::Error(message) => format!("Error: {message}"),
                RenderMode::Status { message, .. } => message.to_string(),
                RenderMode::Empty | RenderMode::Grid => result.summary_line(),
            },
            None => String::new(),
        }
    }
}

fn deleted_status(action: DestructiveAction) -> &'static str {
    match action {
        DestructiveAction::DeleteConnection(_) => "Connection deleted",
        DestructiveAction::DeleteFavorite(_) => "Favorite deleted",
        DestructiveAction::DeleteHistoryEntry(_) => "History entry deleted",
        DestructiveAction::ClearConversations(_) => "Conversations cleared",
    }
}

pub(crate) fn map_key_event(key: KeyEvent) -> Option<Msg> {
    match (key.modifiers, key.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('q')) => Some(Msg::Quit),
        (KeyModifiers::CONTROL, KeyCode::Char('f')) => Some(Msg::Action(ActionId::Format)),
        (KeyModifiers::CONTROL, KeyCode::Char('s')) => Some(Msg::Action(ActionId::SaveFavorite)),
        (KeyModifiers::CONTROL, KeyCode::Char('g')) => Some(Msg::Action(ActionId::AskAi)),
        (KeyModifiers::CONTROL, KeyCode::Char('t')) => Some(Msg::Action(ActionId::NewTab)),
        (KeyModifiers::CONTROL, KeyCode::Char('w')) => Some(Msg::Action(ActionId::CloseTab)),
        (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(Msg::Action(ActionId::NextTab)),
        (KeyModifiers::CONTROL, KeyCode::Char('p')) => Some(Msg::Action(ActionId::CyclePageSize)),
        (KeyModifiers::CONTROL, KeyCode::Char('e')) => Some(Msg::Action(ActionId::ExportCsv)),
        (KeyModifiers::CONTROL, KeyCode::Char('u')) => {
            Some(Msg::Action(ActionId::InsertInsightSql))
        }
        (KeyModifiers::CONTROL, KeyCode::Char('r')) => Some(Msg::Action(ActionId::RefreshSchema)),
        (KeyModifiers::CONTROL, KeyCode::Char('y')) => Some(Msg::UseChatSql),
        (KeyModifiers::CONTROL, KeyCode::Char('o')) => Some(Msg::Action(ActionId::OpenLibrary)),
        (_, KeyCode::F(3)) => Some(Msg::Action(ActionId::RenameTab)),
        (_, KeyCode::F(5)) => Some(Msg::Action(ActionId::Execute)),
        (_, KeyCode::F(6)) => Some(Msg::Action(ActionId::Explain)),
        (_, KeyCode::F(7)) => Some(Msg::Action(ActionId::Debug)),
        (_, KeyCode::F(8)) => Some(Msg::Action(ActionId::Optimize)),
        (_, KeyCode::F(9)) => Some(Msg::Action(ActionId::Analyze)),
        (_, KeyCode::F(10)) => Some(Msg::Action(ActionId::SuggestIndexes)),
        (_, KeyCode::F(2)) => Some(Msg::NextConnection),
        (_, KeyCode::PageUp) => Some(Msg::Action(ActionId::PreviousPage)),
        (_, KeyCode::PageDown) => Some(Msg::Action(ActionId::NextPage)),
        (_, KeyCode::Esc) => Some(Msg::Escape),
        (_, KeyCode::Enter) => Some(Msg::Enter),
        (_, KeyCode::Backspace) => Some(Msg::Backspace),
        (_, KeyCode::Tab) => Some(Msg::Complete),
        (_, KeyCode::Up) => Some(Msg::Up),
        (_, KeyCode::Down) => Some(Msg::Down),
        (KeyModifiers::NONE | KeyModifiers::SHIFT, KeyCode::Char(ch)) => Some(Msg::Input(ch)),
        _ => None,
    }
}
