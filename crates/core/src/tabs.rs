use std::fmt;

use crate::results::QueryResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QueryTab {
    id: TabId,
    name: String,
    content: String,
    result: Option<QueryResult>,
    generation: u64,
    pending: Option<u64>,
}

impl QueryTab {
    fn new(id: TabId, name: String) -> Self {
        Self {
            id,
            name,
            content: String::new(),
            result: None,
            generation: 0,
            pending: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> TabId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn result(&self) -> Option<&QueryResult> {
        self.result.as_ref()
    }

    #[must_use]
    pub fn is_executing(&self) -> bool {
        self.pending.is_some()
    }

    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.result
            .as_ref()
            .filter(|result| !result.success)
            .and_then(QueryResult::error_message)
    }

    #[must_use]
    pub fn last_execution_time(&self) -> Option<f64> {
        self.result
            .as_ref()
            .filter(|result| result.success)
            .and_then(|result| result.execution_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertMode {
    Replace,
    /// Appends after a blank line when the tab already holds text.
    Append,
}

/// Captured when an execution starts; the result only lands if the tab is
/// still on the same generation when it resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionTicket {
    pub tab: TabId,
    pub generation: u64,
    pub sql: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatTicket {
    pub tab: TabId,
    pub original: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// A newer request superseded this one, or the tab content moved on.
    Stale,
    TabClosed,
}

#[derive(Debug, Clone)]
pub struct TabRegistry {
    tabs: Vec<QueryTab>,
    active: TabId,
    next_id: u64,
}

impl Default for TabRegistry {
    fn default() -> Self {
        let first = TabId(1);
        Self {
            tabs: vec![QueryTab::new(first, "Query 1".to_string())],
            active: first,
            next_id: 2,
        }
    }
}

impl TabRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn tabs(&self) -> &[QueryTab] {
        &self.tabs
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: TabId) -> Option<&QueryTab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    fn get_mut(&mut self, id: TabId) -> Option<&mut QueryTab> {
        self.tabs.iter_mut().find(|tab| tab.id == id)
    }

    #[must_use]
    pub fn active_id(&self) -> TabId {
        self.active
    }

    #[must_use]
    pub fn active(&self) -> &QueryTab {
        self.get(self.active).unwrap_or(&self.tabs[0])
    }

    pub fn add_tab(&mut self) -> TabId {
        let id = TabId(self.next_id);
        self.next_id += 1;
        let name = format!("Query {}", self.tabs.len() + 1);
        self.tabs.push(QueryTab::new(id, name));
        self.active = id;
        id
    }

    /// Closing the last remaining tab is refused.
    pub fn close_tab(&mut self, id: TabId) -> bool {
        if self.tabs.len() <= 1 {
            return false;
        }
        let Some(position) = self.tabs.iter().position(|tab| tab.id == id) else {
            return false;
        };

        self.tabs.remove(position);
        if self.active == id {
            self.active = self.tabs[0].id;
        }
        true
    }

    pub fn rename_tab(&mut self, id: TabId, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() {
            return false;
        }
        let Some(tab) = self.get_mut(id) else {
            return false;
        };
        tab.name = name.to_string();
        true
    }

    pub fn set_active(&mut self, id: TabId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.active = id;
        true
    }

    pub fn activate_next(&mut self) -> TabId {
        let position = self
            .tabs
            .iter()
            .position(|tab| tab.id == self.active)
            .unwrap_or(0);
        self.active = self.tabs[(position + 1) % self.tabs.len()].id;
        self.active
    }

    pub fn update_content(&mut self, id: TabId, content: impl Into<String>) -> bool {
        let Some(tab) = self.get_mut(id) else {
            return false;
        };
        tab.content = content.into();
        true
    }

    pub fn update_result(&mut self, id: TabId, result: QueryResult) -> bool {
        let Some(tab) = self.get_mut(id) else {
            return false;
        };
        tab.result = Some(result);
        true
    }

    pub fn insert_sql(&mut self, id: TabId, sql: &str, mode: InsertMode) -> bool {
        let Some(tab) = self.get(id) else {
            return false;
        };
        let content = match mode {
            InsertMode::Append if !tab.content.trim().is_empty() => {
                format!("{}\n\n{sql}", tab.content)
            }
            InsertMode::Append | InsertMode::Replace => sql.to_string(),
        };
        self.update_content(id, content)
    }

    /// Starts an execution using the selection when it has text, else the
    /// whole tab. Blank input yields no ticket and leaves the tab untouched.
    pub fn begin_execution(&mut self, id: TabId, selection: Option<&str>) -> Option<ExecutionTicket> {
        let tab = self.get_mut(id)?;
        let sql = selection
            .filter(|selected| !selected.is_empty())
            .unwrap_or(tab.content.as_str());
        if sql.trim().is_empty() {
            return None;
        }
        let sql = sql.to_string();

        tab.generation += 1;
        tab.pending = Some(tab.generation);
        Some(ExecutionTicket {
            tab: id,
            generation: tab.generation,
            sql,
        })
    }

    pub fn complete_execution(&mut self, ticket: &ExecutionTicket, result: QueryResult) -> ApplyOutcome {
        let Some(tab) = self.get_mut(ticket.tab) else {
            return ApplyOutcome::TabClosed;
        };
        if tab.generation != ticket.generation {
            return ApplyOutcome::Stale;
        }
        tab.result = Some(result);
        tab.pending = None;
        ApplyOutcome::Applied
    }

    /// Forgets any in-flight execution so a late result can no longer land.
    pub fn abandon_execution(&mut self, id: TabId) {
        if let Some(tab) = self.get_mut(id) {
            if tab.pending.take().is_some() {
                tab.generation += 1;
            }
        }
    }

    pub fn begin_format(&self, id: TabId) -> Option<FormatTicket> {
        let tab = self.get(id)?;
        if tab.content.trim().is_empty() {
            return None;
        }
        Some(FormatTicket {
            tab: id,
            original: tab.content.clone(),
        })
    }

    /// Applies formatted text only if the tab still holds what was sent.
    pub fn complete_format(&mut self, ticket: &FormatTicket, formatted: String) -> ApplyOutcome {
        let Some(tab) = self.get_mut(ticket.tab) else {
            return ApplyOutcome::TabClosed;
        };
        if tab.content != ticket.original {
            return ApplyOutcome::Stale;
        }
        tab.content = formatted;
        ApplyOutcome::Applied
    }
}
