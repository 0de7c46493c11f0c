use std::collections::HashMap;

use futures_util::future::{AbortHandle, AbortRegistration, Abortable, Aborted};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::actions::ActionContext;
use crate::autocomplete::{
    fetch_autocomplete, refresh_and_fetch, AutocompleteCache, AutocompleteData, Suggestion,
};
use crate::confirm::{
    ConfirmError, ConfirmationGuard, ConfirmationToken, Confirmed, DestructiveAction,
};
use crate::connections::{Connection, ConnectionDraft, ConnectionId, ConnectionRegistry};
use crate::conversations::{
    delete_conversations, generate_and_reload, load_conversations, AiConversation,
    ConversationError, ConversationStore, PendingGeneration,
};
use crate::execution::QueryRunner;
use crate::favorites::FavoriteQuery;
use crate::gateway::{AiGateway, GatewayError, PersistenceGateway, QueryGateway, SchemaGateway};
use crate::history::QueryHistoryEntry;
use crate::insights::{
    AiAction, AiInsight, InsightError, InsightOrchestrator, InsightOutcome, InsightRequest,
    InsightSlot, InsightTicket,
};
use crate::results::{render_mode, PageSize, Paginator, QueryResult, RenderMode, ResultRow};
use crate::tabs::{
    ApplyOutcome, ExecutionTicket, FormatTicket, InsertMode, QueryTab, TabId, TabRegistry,
};

/// What an in-flight request belongs to. Aborting works per scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestScope {
    Execution(TabId),
    Format(TabId),
    Insight,
    Generate(ConnectionId),
    Conversations(ConnectionId),
    Autocomplete(ConnectionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestKey {
    pub scope: RequestScope,
    seq: u64,
}

#[derive(Debug, Default)]
struct InFlight {
    next_seq: u64,
    handles: HashMap<RequestKey, AbortHandle>,
}

impl InFlight {
    fn register(&mut self, scope: RequestScope) -> (RequestKey, AbortRegistration) {
        self.next_seq += 1;
        let key = RequestKey {
            scope,
            seq: self.next_seq,
        };
        let (handle, registration) = AbortHandle::new_pair();
        self.handles.insert(key, handle);
        (key, registration)
    }

    fn settle(&mut self, key: RequestKey) {
        self.handles.remove(&key);
    }

    fn contains(&self, key: RequestKey) -> bool {
        self.handles.contains_key(&key)
    }

    fn abort_where(&mut self, predicate: impl Fn(&RequestScope) -> bool) -> usize {
        let keys: Vec<RequestKey> = self
            .handles
            .keys()
            .filter(|key| predicate(&key.scope))
            .copied()
            .collect();
        for key in &keys {
            if let Some(handle) = self.handles.remove(key) {
                handle.abort();
            }
        }
        keys.len()
    }
}

/// A request the workspace is waiting on. Run the remote call under the
/// paired [`AbortRegistration`] and hand both back to the matching `finish_*`.
#[derive(Debug)]
#[must_use]
pub struct Pending<T> {
    key: RequestKey,
    pub connection: ConnectionId,
    pub ticket: T,
}

impl<T> Pending<T> {
    #[must_use]
    pub fn key(&self) -> RequestKey {
        self.key
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightJob {
    pub ticket: InsightTicket,
    pub request: InsightRequest,
}

#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error("request was cancelled")]
    Cancelled,
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Insight(#[from] InsightError),
    #[error(transparent)]
    Conversation(#[from] ConversationError),
    #[error(transparent)]
    Confirm(#[from] ConfirmError),
}

/// Runs a remote call so that aborting its request stops it.
pub async fn abortable<F: std::future::Future>(
    registration: AbortRegistration,
    future: F,
) -> Result<F::Output, Aborted> {
    Abortable::new(future, registration).await
}

/// The query workspace: tabs, the current connection and everything keyed by
/// it, the single insight slot, and every request still in flight.
#[derive(Debug)]
pub struct Workspace {
    connections: ConnectionRegistry,
    tabs: TabRegistry,
    insight: InsightSlot,
    conversations: ConversationStore,
    autocomplete: AutocompleteCache,
    confirmations: ConfirmationGuard,
    favorites: Vec<FavoriteQuery>,
    history: Vec<QueryHistoryEntry>,
    paginator: Paginator,
    row_limit: Option<u32>,
    in_flight: InFlight,
}

impl Default for Workspace {
    fn default() -> Self {
        Self::new(PageSize::default(), None)
    }
}

impl Workspace {
    #[must_use]
    pub fn new(page_size: PageSize, row_limit: Option<u32>) -> Self {
        Self {
            connections: ConnectionRegistry::new(),
            tabs: TabRegistry::new(),
            insight: InsightSlot::new(),
            conversations: ConversationStore::new(),
            autocomplete: AutocompleteCache::new(),
            confirmations: ConfirmationGuard::new(),
            favorites: Vec::new(),
            history: Vec::new(),
            paginator: Paginator::new(page_size),
            row_limit,
            in_flight: InFlight::default(),
        }
    }

    #[must_use]
    pub fn connections(&self) -> &ConnectionRegistry {
        &self.connections
    }

    #[must_use]
    pub fn current_connection(&self) -> Option<ConnectionId> {
        self.connections.current_id()
    }

    #[must_use]
    pub fn tabs(&self) -> &TabRegistry {
        &self.tabs
    }

    #[must_use]
    pub fn active_tab(&self) -> &QueryTab {
        self.tabs.active()
    }

    #[must_use]
    pub fn insight(&self) -> &InsightSlot {
        &self.insight
    }

    #[must_use]
    pub fn conversations(&self) -> Vec<&AiConversation> {
        self.connections
            .current_id()
            .map(|connection| self.conversations.oldest_first(connection))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn favorites(&self) -> &[FavoriteQuery] {
        &self.favorites
    }

    #[must_use]
    pub fn history(&self) -> &[QueryHistoryEntry] {
        &self.history
    }

    #[must_use]
    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    #[must_use]
    pub fn row_limit(&self) -> Option<u32> {
        self.row_limit
    }

    #[must_use]
    pub fn is_in_flight(&self, key: RequestKey) -> bool {
        self.in_flight.contains(key)
    }

    #[must_use]
    pub fn suggest(&self, prefix: &str) -> Vec<Suggestion> {
        self.autocomplete
            .suggest(self.connections.current_id(), prefix)
    }

    // Tabs

    pub fn add_tab(&mut self) -> TabId {
        let id = self.tabs.add_tab();
        self.paginator.reset();
        id
    }

    /// Also aborts the tab's pending execution and formatting.
    pub fn close_tab(&mut self, id: TabId) -> bool {
        let was_active = self.tabs.active_id() == id;
        if !self.tabs.close_tab(id) {
            return false;
        }
        let aborted = self.in_flight.abort_where(|scope| {
            matches!(scope, RequestScope::Execution(tab) | RequestScope::Format(tab) if *tab == id)
        });
        if aborted > 0 {
            debug!(tab = %id, aborted, "aborted requests of closed tab");
        }
        if was_active {
            self.paginator.reset();
        }
        true
    }

    pub fn rename_tab(&mut self, id: TabId, name: &str) -> bool {
        self.tabs.rename_tab(id, name)
    }

    pub fn set_active_tab(&mut self, id: TabId) -> bool {
        if self.tabs.active_id() == id || !self.tabs.set_active(id) {
            return false;
        }
        self.paginator.reset();
        true
    }

    pub fn next_tab(&mut self) -> TabId {
        self.paginator.reset();
        self.tabs.activate_next()
    }

    pub fn update_content(&mut self, id: TabId, content: impl Into<String>) -> bool {
        self.tabs.update_content(id, content)
    }

    /// The sink every SQL-producing feature writes through.
    pub fn insert_sql_into_active(&mut self, sql: &str, mode: InsertMode) -> bool {
        if sql.trim().is_empty() {
            return false;
        }
        let active = self.tabs.active_id();
        self.tabs.insert_sql(active, sql, mode)
    }

    /// Replaces the active tab with a favorite or history query.
    pub fn open_query(&mut self, query: &str) -> bool {
        self.insert_sql_into_active(query, InsertMode::Replace)
    }

    /// Moves the displayed insight's SQL into its originating tab, or the
    /// active tab if that one was closed, and dismisses the insight.
    pub fn insert_insight_sql(&mut self) -> Option<TabId> {
        let (origin, insertion) = self.insight.take_insertion()?;
        let target = if self.tabs.get(origin).is_some() {
            origin
        } else {
            self.tabs.active_id()
        };
        self.tabs.insert_sql(target, &insertion.sql, insertion.mode);
        Some(target)
    }

    pub fn dismiss_insight(&mut self) {
        self.insight.dismiss();
    }

    // Results

    #[must_use]
    pub fn grid_rows(&self) -> &[ResultRow] {
        match self.tabs.active().result() {
            Some(result) if render_mode(result) == RenderMode::Grid => &result.rows,
            _ => &[],
        }
    }

    #[must_use]
    pub fn visible_rows(&self) -> &[ResultRow] {
        self.paginator.page_rows(self.grid_rows())
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.grid_rows().len();
        self.paginator.next_page(total)
    }

    pub fn previous_page(&mut self) -> bool {
        self.paginator.previous_page()
    }

    pub fn cycle_page_size(&mut self) -> PageSize {
        let next = self.paginator.page_size().next();
        self.paginator.set_page_size(next);
        next
    }

    #[must_use]
    pub fn action_context(&self) -> ActionContext {
        let tab = self.tabs.active();
        let rows = self.grid_rows().len();
        ActionContext {
            has_connection: self.connections.current_id().is_some(),
            content_blank: tab.content().trim().is_empty(),
            query_running: tab.is_executing(),
            last_result_failed: tab.result().is_some_and(|result| !result.success),
            has_rows: rows > 0,
            tab_count: self.tabs.len(),
            insight_displayed: self.insight.displayed().is_some(),
            insight_insertable: self
                .insight
                .displayed()
                .and_then(AiInsight::insertable_sql)
                .is_some(),
            can_page_next: self.paginator.can_next(rows),
            can_page_previous: self.paginator.can_previous(),
        }
    }

    // Connections

    /// Installs the authoritative connection list. Returns the new current
    /// id when the pointer moved.
    pub fn install_connections(&mut self, connections: Vec<Connection>) -> Option<Option<ConnectionId>> {
        let moved = self.connections.replace_all(connections);
        if moved.is_some() {
            self.connection_changed();
        }
        moved
    }

    /// Aborts everything in flight and drops the displayed insight.
    pub fn switch_connection(&mut self, id: ConnectionId) -> bool {
        if !self.connections.select(id) {
            return false;
        }
        self.connection_changed();
        true
    }

    fn connection_changed(&mut self) {
        let aborted = self.in_flight.abort_where(|_| true);
        let tab_ids: Vec<TabId> = self.tabs.tabs().iter().map(QueryTab::id).collect();
        for tab in tab_ids {
            self.tabs.abandon_execution(tab);
        }
        self.insight.invalidate();
        self.history.clear();
        info!(
            connection = ?self.connections.current_id(),
            aborted,
            "current connection changed"
        );
    }

    // Execution

    pub fn begin_execute(
        &mut self,
        tab: TabId,
        selection: Option<&str>,
    ) -> Option<(Pending<ExecutionTicket>, AbortRegistration)> {
        let connection = self.connections.current_id()?;
        let ticket = self.tabs.begin_execution(tab, selection)?;
        let superseded = self
            .in_flight
            .abort_where(|scope| *scope == RequestScope::Execution(tab));
        if superseded > 0 {
            debug!(%tab, "aborted superseded execution");
        }
        let (key, registration) = self.in_flight.register(RequestScope::Execution(tab));
        Some((
            Pending {
                key,
                connection,
                ticket,
            },
            registration,
        ))
    }

    pub fn finish_execute(
        &mut self,
        pending: Pending<ExecutionTicket>,
        outcome: Result<QueryResult, Aborted>,
    ) -> ApplyOutcome {
        self.in_flight.settle(pending.key);
        let tab = pending.ticket.tab;
        let Ok(result) = outcome else {
            debug!(%tab, "execution aborted");
            return ApplyOutcome::Stale;
        };

        let applied = self.tabs.complete_execution(&pending.ticket, result);
        match applied {
            ApplyOutcome::Applied => {
                if tab == self.tabs.active_id() {
                    self.paginator.reset();
                }
            }
            ApplyOutcome::Stale | ApplyOutcome::TabClosed => {
                warn!(%tab, ?applied, "discarding late execution result");
            }
        }
        applied
    }

    /// `None` when nothing was sent: no connection, or blank input.
    pub async fn execute<G: QueryGateway + ?Sized>(
        &mut self,
        gateway: &G,
        tab: TabId,
        selection: Option<&str>,
    ) -> Option<ApplyOutcome> {
        let (pending, registration) = self.begin_execute(tab, selection)?;
        let runner = QueryRunner::new(gateway).with_row_limit(self.row_limit);
        let outcome = abortable(registration, runner.execute(pending.connection, &pending.ticket)).await;
        Some(self.finish_execute(pending, outcome))
    }

    // Formatting

    pub fn begin_format(&mut self, tab: TabId) -> Option<(Pending<FormatTicket>, AbortRegistration)> {
        let connection = self.connections.current_id()?;
        let ticket = self.tabs.begin_format(tab)?;
        self.in_flight
            .abort_where(|scope| *scope == RequestScope::Format(tab));
        let (key, registration) = self.in_flight.register(RequestScope::Format(tab));
        Some((
            Pending {
                key,
                connection,
                ticket,
            },
            registration,
        ))
    }

    /// `None` when there was nothing to apply.
    pub fn finish_format(
        &mut self,
        pending: Pending<FormatTicket>,
        outcome: Result<Option<String>, Aborted>,
    ) -> Option<ApplyOutcome> {
        self.in_flight.settle(pending.key);
        let formatted = outcome.ok().flatten()?;
        let applied = self.tabs.complete_format(&pending.ticket, formatted);
        if applied != ApplyOutcome::Applied {
            debug!(tab = %pending.ticket.tab, ?applied, "formatted text discarded");
        }
        Some(applied)
    }

    pub async fn format<G: QueryGateway + ?Sized>(
        &mut self,
        gateway: &G,
        tab: TabId,
    ) -> Option<ApplyOutcome> {
        let (pending, registration) = self.begin_format(tab)?;
        let runner = QueryRunner::new(gateway);
        let outcome = abortable(registration, runner.format(pending.connection, &pending.ticket)).await;
        self.finish_format(pending, outcome)
    }

    // Insights

    /// Starts an insight for the active tab. Only the latest request may
    /// display, so an older one still in flight is aborted.
    pub fn begin_insight(&mut self, action: AiAction) -> Option<(Pending<InsightJob>, AbortRegistration)> {
        let connection = self.connections.current_id()?;
        let origin = self.tabs.active_id();
        let request = InsightRequest::from_tab(action, self.tabs.active())?;
        self.in_flight
            .abort_where(|scope| *scope == RequestScope::Insight);

        let ticket = self.insight.begin(origin, action);
        let (key, registration) = self.in_flight.register(RequestScope::Insight);
        Some((
            Pending {
                key,
                connection,
                ticket: InsightJob { ticket, request },
            },
            registration,
        ))
    }

    pub fn finish_insight(
        &mut self,
        pending: Pending<InsightJob>,
        outcome: Result<Result<AiInsight, InsightError>, Aborted>,
    ) -> InsightOutcome {
        self.in_flight.settle(pending.key);
        match outcome {
            Ok(result) => self.insight.complete(pending.ticket.ticket, result),
            Err(Aborted) => InsightOutcome::Stale,
        }
    }

    pub async fn request_insight<G: AiGateway + ?Sized>(
        &mut self,
        gateway: &G,
        action: AiAction,
    ) -> Option<InsightOutcome> {
        let (pending, registration) = self.begin_insight(action)?;
        let orchestrator = InsightOrchestrator::new(gateway);
        let outcome = abortable(
            registration,
            orchestrator.run(pending.connection, &pending.ticket.request),
        )
        .await;
        Some(self.finish_insight(pending, outcome))
    }

    // AI chat

    pub fn begin_generate(&mut self, prompt: &str) -> Option<(Pending<PendingGeneration>, AbortRegistration)> {
        let connection = self.connections.current_id()?;
        let generation = self.conversations.begin_generate(connection, prompt)?;
        let (key, registration) = self.in_flight.register(RequestScope::Generate(connection));
        Some((
            Pending {
                key,
                connection,
                ticket: generation,
            },
            registration,
        ))
    }

    /// On success returns the generated insight; the chat list already holds
    /// the reloaded conversations.
    pub fn finish_generate(
        &mut self,
        pending: Pending<PendingGeneration>,
        outcome: Result<Result<(AiInsight, Vec<AiConversation>), ConversationError>, Aborted>,
    ) -> Result<AiInsight, WorkspaceError> {
        self.in_flight.settle(pending.key);
        let Ok(outcome) = outcome else {
            self.conversations.abandon(&pending.ticket);
            return Err(WorkspaceError::Cancelled);
        };
        self.conversations
            .finish_generate(&pending.ticket, outcome)
            .map_err(WorkspaceError::from)
    }

    pub async fn generate<G: AiGateway + ?Sized>(
        &mut self,
        gateway: &G,
        prompt: &str,
    ) -> Option<Result<AiInsight, WorkspaceError>> {
        let (pending, registration) = self.begin_generate(prompt)?;
        let outcome = abortable(registration, generate_and_reload(gateway, &pending.ticket)).await;
        Some(self.finish_generate(pending, outcome))
    }

    pub fn begin_load_conversations(&mut self) -> Option<(Pending<()>, AbortRegistration)> {
        let connection = self.connections.current_id()?;
        self.in_flight
            .abort_where(|scope| *scope == RequestScope::Conversations(connection));
        let (key, registration) = self
            .in_flight
            .register(RequestScope::Conversations(connection));
        Some((
            Pending {
                key,
                connection,
                ticket: (),
            },
            registration,
        ))
    }

    pub fn finish_load_conversations(
        &mut self,
        pending: Pending<()>,
        outcome: Result<Result<Vec<AiConversation>, GatewayError>, Aborted>,
    ) -> Result<usize, WorkspaceError> {
        self.in_flight.settle(pending.key);
        let conversations = outcome.map_err(|Aborted| WorkspaceError::Cancelled)??;
        let count = conversations.len();
        self.conversations.replace(pending.connection, conversations);
        Ok(count)
    }

    pub async fn load_conversations<G: AiGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> Option<Result<usize, WorkspaceError>> {
        let (pending, registration) = self.begin_load_conversations()?;
        let outcome = abortable(registration, load_conversations(gateway, pending.connection)).await;
        Some(self.finish_load_conversations(pending, outcome))
    }

    // Autocomplete

    /// A newer load for the same connection replaces an older one.
    pub fn begin_autocomplete(&mut self) -> Option<(Pending<()>, AbortRegistration)> {
        let connection = self.connections.current_id()?;
        self.in_flight
            .abort_where(|scope| *scope == RequestScope::Autocomplete(connection));
        let (key, registration) = self
            .in_flight
            .register(RequestScope::Autocomplete(connection));
        Some((
            Pending {
                key,
                connection,
                ticket: (),
            },
            registration,
        ))
    }

    /// Failure leaves the previous snapshot in place.
    pub fn finish_autocomplete(
        &mut self,
        pending: Pending<()>,
        outcome: Result<Result<AutocompleteData, GatewayError>, Aborted>,
    ) -> Result<(), WorkspaceError> {
        self.in_flight.settle(pending.key);
        match outcome {
            Ok(Ok(data)) => {
                self.autocomplete.replace(pending.connection, data);
                Ok(())
            }
            Ok(Err(error)) => {
                warn!(connection = %pending.connection, %error, "autocomplete load failed");
                Err(error.into())
            }
            Err(Aborted) => Err(WorkspaceError::Cancelled),
        }
    }

    pub async fn load_autocomplete<G: SchemaGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> Option<Result<(), WorkspaceError>> {
        let (pending, registration) = self.begin_autocomplete()?;
        let outcome = abortable(registration, fetch_autocomplete(gateway, pending.connection)).await;
        Some(self.finish_autocomplete(pending, outcome))
    }

    /// Rebuilds the backend schema cache, then reloads suggestions. Returns
    /// the table count the backend reported.
    pub async fn refresh_schema<G: SchemaGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> Option<Result<usize, WorkspaceError>> {
        let (pending, registration) = self.begin_autocomplete()?;
        let outcome = abortable(registration, refresh_and_fetch(gateway, pending.connection)).await;
        let count = match &outcome {
            Ok(Ok((count, _))) => *count,
            _ => 0,
        };
        let outcome = outcome.map(|fetched| fetched.map(|(_, data)| data));
        Some(self.finish_autocomplete(pending, outcome).map(|()| count))
    }

    // Persistence

    pub async fn reload_connections<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> Result<Option<Option<ConnectionId>>, WorkspaceError> {
        let connections = gateway.connections().await?;
        Ok(self.install_connections(connections))
    }

    /// Creates a connection, or updates `id`, then reloads the list.
    pub async fn save_connection<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &G,
        id: Option<ConnectionId>,
        draft: &ConnectionDraft,
    ) -> Result<Connection, WorkspaceError> {
        let saved = match id {
            Some(id) => gateway.update_connection(id, draft).await?,
            None => gateway.create_connection(draft).await?,
        };
        self.reload_connections(gateway).await?;
        Ok(saved)
    }

    pub fn install_favorites(&mut self, favorites: Vec<FavoriteQuery>) {
        self.favorites = favorites;
    }

    pub async fn reload_favorites<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> Result<(), WorkspaceError> {
        let favorites = gateway.favorites().await?;
        self.install_favorites(favorites);
        Ok(())
    }

    /// Saves the active tab under `name`. `None` when the name or the
    /// content is blank; nothing is sent then.
    pub async fn save_favorite<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &G,
        name: &str,
    ) -> Option<Result<i64, WorkspaceError>> {
        let favorite = FavoriteQuery::new(
            name,
            self.tabs.active().content(),
            self.connections.current_id(),
        )?;
        Some(match gateway.create_favorite(&favorite).await {
            Ok(id) => {
                self.favorites.push(FavoriteQuery {
                    id: Some(id),
                    ..favorite
                });
                Ok(id)
            }
            Err(error) => {
                warn!(%error, "saving favorite failed");
                Err(error.into())
            }
        })
    }

    /// Replaces favorite `id` on the backend, then locally.
    pub async fn update_favorite<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &G,
        id: i64,
        favorite: &FavoriteQuery,
    ) -> Result<(), WorkspaceError> {
        gateway.update_favorite(id, favorite).await?;
        if let Some(existing) = self
            .favorites
            .iter_mut()
            .find(|existing| existing.id == Some(id))
        {
            *existing = FavoriteQuery {
                id: Some(id),
                ..favorite.clone()
            };
        }
        Ok(())
    }

    pub fn install_history(&mut self, connection: ConnectionId, entries: Vec<QueryHistoryEntry>) {
        if self.connections.current_id() == Some(connection) {
            self.history = entries;
        }
    }

    pub async fn reload_history<G: PersistenceGateway + ?Sized>(
        &mut self,
        gateway: &G,
    ) -> Option<Result<(), WorkspaceError>> {
        let connection = self.connections.current_id()?;
        Some(match gateway.history(connection).await {
            Ok(entries) => {
                self.install_history(connection, entries);
                Ok(())
            }
            Err(error) => Err(error.into()),
        })
    }

    // Destructive actions

    pub fn request_confirmation(&mut self, action: DestructiveAction) -> ConfirmationToken {
        self.confirmations.request(action)
    }

    pub fn confirm(
        &mut self,
        token: &ConfirmationToken,
        action: DestructiveAction,
    ) -> Result<Confirmed, ConfirmError> {
        self.confirmations.confirm(token, action)
    }

    pub fn decline(&mut self, token: &ConfirmationToken) {
        self.confirmations.decline(token);
    }

    #[must_use]
    pub fn pending_confirmation(&self, token: &ConfirmationToken) -> Option<DestructiveAction> {
        self.confirmations.pending_action(token)
    }

    /// Captures what a confirmed action needs to be issued. Clearing
    /// conversations removes the ones persisted at this point.
    pub fn begin_destructive(&self, proof: Confirmed) -> DestructiveRequest {
        let conversations = match proof.action() {
            DestructiveAction::ClearConversations(connection) => {
                self.conversations.persisted_ids(connection)
            }
            _ => Vec::new(),
        };
        DestructiveRequest {
            proof,
            conversations,
        }
    }

    /// Applies the action locally once the backend accepted it. The proof is
    /// spent either way.
    pub fn finish_destructive(
        &mut self,
        request: DestructiveRequest,
        outcome: Result<(), GatewayError>,
    ) -> Result<DestructiveAction, WorkspaceError> {
        let action = request.action();
        if let Err(error) = outcome {
            warn!(?action, %error, "destructive action failed");
            return Err(error.into());
        }
        match action {
            DestructiveAction::DeleteConnection(id) => {
                self.autocomplete.remove(id);
                self.conversations.remove(id);
                if self.connections.remove(id) {
                    self.connection_changed();
                }
            }
            DestructiveAction::DeleteFavorite(id) => {
                self.favorites.retain(|favorite| favorite.id != Some(id));
            }
            DestructiveAction::DeleteHistoryEntry(id) => {
                self.history.retain(|entry| entry.id != id);
            }
            DestructiveAction::ClearConversations(connection) => {
                self.conversations.replace(connection, Vec::new());
            }
        }
        info!(?action, "destructive action applied");
        Ok(action)
    }

    pub async fn perform<G>(
        &mut self,
        gateway: &G,
        proof: Confirmed,
    ) -> Result<DestructiveAction, WorkspaceError>
    where
        G: AiGateway + PersistenceGateway + ?Sized,
    {
        let request = self.begin_destructive(proof);
        let outcome = request.issue(gateway).await;
        self.finish_destructive(request, outcome)
    }
}

/// A confirmed destructive call that has not been issued yet.
#[derive(Debug)]
#[must_use]
pub struct DestructiveRequest {
    proof: Confirmed,
    conversations: Vec<i64>,
}

impl DestructiveRequest {
    pub fn action(&self) -> DestructiveAction {
        self.proof.action()
    }

    pub async fn issue<G>(&self, gateway: &G) -> Result<(), GatewayError>
    where
        G: AiGateway + PersistenceGateway + ?Sized,
    {
        let proof = &self.proof;
        match proof.action() {
            DestructiveAction::DeleteConnection(id) => gateway.delete_connection(id, proof).await,
            DestructiveAction::DeleteFavorite(id) => gateway.delete_favorite(id, proof).await,
            DestructiveAction::DeleteHistoryEntry(id) => gateway.delete_history(id, proof).await,
            DestructiveAction::ClearConversations(_) => {
                delete_conversations(gateway, &self.conversations, proof).await
            }
        }
    }
}
