use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ActionId {
    Execute,
    Format,
    SaveFavorite,
    Explain,
    Debug,
    Optimize,
    Analyze,
    SuggestIndexes,
    AskAi,
    NewTab,
    CloseTab,
    NextTab,
    RenameTab,
    OpenLibrary,
    PreviousPage,
    NextPage,
    CyclePageSize,
    ExportCsv,
    InsertInsightSql,
    DismissInsight,
    RefreshSchema,
}

/// Snapshot of the workspace the enablement rules look at.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ActionContext {
    pub has_connection: bool,
    pub content_blank: bool,
    pub query_running: bool,
    pub last_result_failed: bool,
    pub has_rows: bool,
    pub tab_count: usize,
    pub insight_displayed: bool,
    pub insight_insertable: bool,
    pub can_page_next: bool,
    pub can_page_previous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionDefinition {
    pub id: ActionId,
    pub title: &'static str,
    pub key_hint: &'static str,
}

const ACTIONS: [ActionDefinition; 21] = [
    ActionDefinition {
        id: ActionId::Execute,
        title: "Run",
        key_hint: "F5",
    },
    ActionDefinition {
        id: ActionId::Format,
        title: "Format",
        key_hint: "Ctrl+F",
    },
    ActionDefinition {
        id: ActionId::SaveFavorite,
        title: "Save favorite",
        key_hint: "Ctrl+S",
    },
    ActionDefinition {
        id: ActionId::Explain,
        title: "Explain",
        key_hint: "F6",
    },
    ActionDefinition {
        id: ActionId::Debug,
        title: "Debug",
        key_hint: "F7",
    },
    ActionDefinition {
        id: ActionId::Optimize,
        title: "Optimize",
        key_hint: "F8",
    },
    ActionDefinition {
        id: ActionId::Analyze,
        title: "Analyze plan",
        key_hint: "F9",
    },
    ActionDefinition {
        id: ActionId::SuggestIndexes,
        title: "Suggest indexes",
        key_hint: "F10",
    },
    ActionDefinition {
        id: ActionId::AskAi,
        title: "Ask AI",
        key_hint: "Ctrl+G",
    },
    ActionDefinition {
        id: ActionId::NewTab,
        title: "New tab",
        key_hint: "Ctrl+T",
    },
    ActionDefinition {
        id: ActionId::CloseTab,
        title: "Close tab",
        key_hint: "Ctrl+W",
    },
    ActionDefinition {
        id: ActionId::NextTab,
        title: "Next tab",
        key_hint: "Ctrl+N",
    },
    ActionDefinition {
        id: ActionId::RenameTab,
        title: "Rename tab",
        key_hint: "F3",
    },
    ActionDefinition {
        id: ActionId::OpenLibrary,
        title: "Favorites/history",
        key_hint: "Ctrl+O",
    },
    ActionDefinition {
        id: ActionId::PreviousPage,
        title: "Prev page",
        key_hint: "PgUp",
    },
    ActionDefinition {
        id: ActionId::NextPage,
        title: "Next page",
        key_hint: "PgDn",
    },
    ActionDefinition {
        id: ActionId::CyclePageSize,
        title: "Page size",
        key_hint: "Ctrl+P",
    },
    ActionDefinition {
        id: ActionId::ExportCsv,
        title: "Export CSV",
        key_hint: "Ctrl+E",
    },
    ActionDefinition {
        id: ActionId::InsertInsightSql,
        title: "Use SQL",
        key_hint: "Ctrl+U",
    },
    ActionDefinition {
        id: ActionId::DismissInsight,
        title: "Dismiss",
        key_hint: "Esc",
    },
    ActionDefinition {
        id: ActionId::RefreshSchema,
        title: "Refresh schema",
        key_hint: "Ctrl+R",
    },
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("action `{0:?}` is disabled in the current context")]
    Disabled(ActionId),
}

#[derive(Debug, Default)]
pub struct ActionRegistry;

impl ActionRegistry {
    #[must_use]
    pub fn all(&self) -> &'static [ActionDefinition] {
        &ACTIONS
    }

    #[must_use]
    pub fn find(&self, action_id: ActionId) -> Option<ActionDefinition> {
        ACTIONS
            .iter()
            .copied()
            .find(|action| action.id == action_id)
    }

    #[must_use]
    pub fn enabled_actions(&self, context: &ActionContext) -> Vec<ActionDefinition> {
        ACTIONS
            .iter()
            .copied()
            .filter(|action| action_enabled(action.id, context))
            .collect()
    }

    pub fn ensure_enabled(
        &self,
        action_id: ActionId,
        context: &ActionContext,
    ) -> Result<(), ActionError> {
        if action_enabled(action_id, context) {
            Ok(())
        } else {
            Err(ActionError::Disabled(action_id))
        }
    }
}

fn action_enabled(action_id: ActionId, context: &ActionContext) -> bool {
    let has_query = !context.content_blank;
    match action_id {
        ActionId::Execute => context.has_connection && has_query && !context.query_running,
        ActionId::Format | ActionId::Explain | ActionId::Optimize | ActionId::Analyze => {
            context.has_connection && has_query
        }
        ActionId::SaveFavorite => has_query,
        ActionId::Debug => context.has_connection && has_query && context.last_result_failed,
        ActionId::SuggestIndexes | ActionId::AskAi | ActionId::RefreshSchema => {
            context.has_connection
        }
        ActionId::NewTab | ActionId::NextTab | ActionId::RenameTab | ActionId::OpenLibrary => true,
        ActionId::CloseTab => context.tab_count > 1,
        ActionId::PreviousPage => context.has_rows && context.can_page_previous,
        ActionId::NextPage => context.has_rows && context.can_page_next,
        ActionId::CyclePageSize | ActionId::ExportCsv => context.has_rows,
        ActionId::InsertInsightSql => context.insight_insertable,
        ActionId::DismissInsight => context.insight_displayed,
    }
}

#[cfg(test)]
mod tests {
    use super::{ActionContext, ActionError, ActionId, ActionRegistry};

    fn ids(context: &ActionContext) -> Vec<ActionId> {
        ActionRegistry
            .enabled_actions(context)
            .into_iter()
            .map(|action| action.id)
            .collect()
    }

    #[test]
    fn without_connection_only_local_actions_are_enabled() {
        let context = ActionContext {
            tab_count: 1,
            ..ActionContext::default()
        };
        assert_eq!(
            ids(&context),
            vec![
                ActionId::SaveFavorite,
                ActionId::NewTab,
                ActionId::NextTab,
                ActionId::RenameTab,
                ActionId::OpenLibrary,
            ]
        );
    }

    #[test]
    fn debug_requires_a_failed_result() {
        let mut context = ActionContext {
            has_connection: true,
            tab_count: 1,
            ..ActionContext::default()
        };
        assert!(!ids(&context).contains(&ActionId::Debug));

        context.last_result_failed = true;
        assert!(ids(&context).contains(&ActionId::Debug));
    }

    #[test]
    fn running_query_disables_execute_only() {
        let context = ActionContext {
            has_connection: true,
            query_running: true,
            tab_count: 2,
            ..ActionContext::default()
        };
        let enabled = ids(&context);
        assert!(!enabled.contains(&ActionId::Execute));
        assert!(enabled.contains(&ActionId::Explain));
        assert!(enabled.contains(&ActionId::CloseTab));
        assert_eq!(
            ActionRegistry.ensure_enabled(ActionId::Execute, &context),
            Err(ActionError::Disabled(ActionId::Execute))
        );
    }

    #[test]
    fn blank_editor_disables_content_bound_actions() {
        let context = ActionContext {
            has_connection: true,
            content_blank: true,
            tab_count: 1,
            ..ActionContext::default()
        };
        let enabled = ids(&context);
        for action in [
            ActionId::Execute,
            ActionId::Format,
            ActionId::SaveFavorite,
            ActionId::Explain,
            ActionId::Optimize,
            ActionId::Analyze,
        ] {
            assert!(!enabled.contains(&action), "{action:?} should be disabled");
        }
        assert!(enabled.contains(&ActionId::SuggestIndexes));
    }

    #[test]
    fn pagination_and_insight_actions_follow_state() {
        let context = ActionContext {
            has_rows: true,
            can_page_next: true,
            insight_displayed: true,
            tab_count: 1,
            ..ActionContext::default()
        };
        let enabled = ids(&context);
        assert!(enabled.contains(&ActionId::NextPage));
        assert!(!enabled.contains(&ActionId::PreviousPage));
        assert!(enabled.contains(&ActionId::ExportCsv));
        assert!(enabled.contains(&ActionId::DismissInsight));
        assert!(!enabled.contains(&ActionId::InsertInsightSql));
        assert_eq!(
            ActionRegistry.find(ActionId::NextPage).map(|action| action.key_hint),
            Some("PgDn")
        );
    }
}
