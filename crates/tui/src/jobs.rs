use std::sync::Arc;

use futures_util::future::{AbortRegistration, Aborted};
use pgai_core::autocomplete::{fetch_autocomplete, refresh_and_fetch, AutocompleteData};
use pgai_core::connections::{Connection, ConnectionId};
use pgai_core::conversations::{
    generate_and_reload, load_conversations, AiConversation, ConversationError, PendingGeneration,
};
use pgai_core::execution::QueryRunner;
use pgai_core::favorites::FavoriteQuery;
use pgai_core::gateway::{Gateway, GatewayError};
use pgai_core::history::QueryHistoryEntry;
use pgai_core::insights::{AiInsight, InsightError, InsightOrchestrator};
use pgai_core::results::QueryResult;
use pgai_core::tabs::{ExecutionTicket, FormatTicket};
use pgai_core::workspace::{abortable, DestructiveRequest, InsightJob, Pending};
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Remote work the UI asked for. Everything tied to a workspace request
/// carries its pending ticket and the abort registration that goes with it.
#[derive(Debug)]
pub(crate) enum Job {
    Execute {
        pending: Pending<ExecutionTicket>,
        registration: AbortRegistration,
        row_limit: Option<u32>,
    },
    Format {
        pending: Pending<FormatTicket>,
        registration: AbortRegistration,
    },
    Insight {
        pending: Pending<InsightJob>,
        registration: AbortRegistration,
    },
    Generate {
        pending: Pending<PendingGeneration>,
        registration: AbortRegistration,
    },
    LoadConversations {
        pending: Pending<()>,
        registration: AbortRegistration,
    },
    Autocomplete {
        pending: Pending<()>,
        registration: AbortRegistration,
        refresh: bool,
    },
    LoadConnections,
    LoadFavorites,
    LoadHistory(ConnectionId),
    SaveFavorite(FavoriteQuery),
    Destructive(DestructiveRequest),
}

impl Job {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Execute { .. } => "execute",
            Self::Format { .. } => "format",
            Self::Insight { .. } => "insight",
            Self::Generate { .. } => "generate",
            Self::LoadConversations { .. } => "conversations",
            Self::Autocomplete { .. } => "autocomplete",
            Self::LoadConnections => "connections",
            Self::LoadFavorites => "favorites",
            Self::LoadHistory(_) => "history",
            Self::SaveFavorite(_) => "save-favorite",
            Self::Destructive(_) => "destructive",
        }
    }
}

pub(crate) type Refreshed = (Option<usize>, AutocompleteData);

#[derive(Debug)]
pub(crate) enum Completion {
    Execute {
        pending: Pending<ExecutionTicket>,
        outcome: Result<QueryResult, Aborted>,
    },
    Format {
        pending: Pending<FormatTicket>,
        outcome: Result<Option<String>, Aborted>,
    },
    Insight {
        pending: Pending<InsightJob>,
        outcome: Result<Result<AiInsight, InsightError>, Aborted>,
    },
    Generate {
        pending: Pending<PendingGeneration>,
        outcome: Result<Result<(AiInsight, Vec<AiConversation>), ConversationError>, Aborted>,
    },
    Conversations {
        pending: Pending<()>,
        outcome: Result<Result<Vec<AiConversation>, GatewayError>, Aborted>,
    },
    Autocomplete {
        pending: Pending<()>,
        outcome: Result<Result<Refreshed, GatewayError>, Aborted>,
    },
    Connections(Result<Vec<Connection>, GatewayError>),
    Favorites(Result<Vec<FavoriteQuery>, GatewayError>),
    History(ConnectionId, Result<Vec<QueryHistoryEntry>, GatewayError>),
    FavoriteSaved(Result<i64, GatewayError>),
    Destructive {
        request: DestructiveRequest,
        outcome: Result<(), GatewayError>,
    },
}

/// Runs jobs on the runtime and reports each one back over the channel.
#[derive(Debug)]
pub(crate) struct JobRunner<G> {
    runtime: Handle,
    gateway: Arc<G>,
    completions: UnboundedSender<Completion>,
}

impl<G: Gateway + 'static> JobRunner<G> {
    pub(crate) fn new(
        runtime: Handle,
        gateway: Arc<G>,
        completions: UnboundedSender<Completion>,
    ) -> Self {
        Self {
            runtime,
            gateway,
            completions,
        }
    }

    pub(crate) fn spawn(&self, job: Job) {
        debug!(job = job.label(), "spawning gateway job");
        let gateway = Arc::clone(&self.gateway);
        let completions = self.completions.clone();
        self.runtime.spawn(async move {
            let completion = run_job(gateway.as_ref(), job).await;
            if completions.send(completion).is_err() {
                debug!("ui is gone, dropping job completion");
            }
        });
    }
}

async fn run_job<G: Gateway + ?Sized>(gateway: &G, job: Job) -> Completion {
    match job {
        Job::Execute {
            pending,
            registration,
            row_limit,
        } => {
            let runner = QueryRunner::new(gateway).with_row_limit(row_limit);
            let outcome =
                abortable(registration, runner.execute(pending.connection, &pending.ticket)).await;
            Completion::Execute { pending, outcome }
        }
        Job::Format {
            pending,
            registration,
        } => {
            let runner = QueryRunner::new(gateway);
            let outcome =
                abortable(registration, runner.format(pending.connection, &pending.ticket)).await;
            Completion::Format { pending, outcome }
        }
        Job::Insight {
            pending,
            registration,
        } => {
            let orchestrator = InsightOrchestrator::new(gateway);
            let outcome = abortable(
                registration,
                orchestrator.run(pending.connection, &pending.ticket.request),
            )
            .await;
            Completion::Insight { pending, outcome }
        }
        Job::Generate {
            pending,
            registration,
        } => {
            let outcome = abortable(registration, generate_and_reload(gateway, &pending.ticket)).await;
            Completion::Generate { pending, outcome }
        }
        Job::LoadConversations {
            pending,
            registration,
        } => {
            let outcome =
                abortable(registration, load_conversations(gateway, pending.connection)).await;
            Completion::Conversations { pending, outcome }
        }
        Job::Autocomplete {
            pending,
            registration,
            refresh,
        } => {
            let connection = pending.connection;
            let outcome = abortable(registration, async move {
                if refresh {
                    refresh_and_fetch(gateway, connection)
                        .await
                        .map(|(count, data)| (Some(count), data))
                } else {
                    fetch_autocomplete(gateway, connection)
                        .await
                        .map(|data| (None, data))
                }
            })
            .await;
            Completion::Autocomplete { pending, outcome }
        }
        Job::LoadConnections => Completion::Connections(gateway.connections().await),
        Job::LoadFavorites => Completion::Favorites(gateway.favorites().await),
        Job::LoadHistory(connection) => {
            Completion::History(connection, gateway.history(connection).await)
        }
        Job::SaveFavorite(favorite) => {
            Completion::FavoriteSaved(gateway.create_favorite(&favorite).await)
        }
        Job::Destructive(request) => {
            let outcome = request.issue(gateway).await;
            Completion::Destructive { request, outcome }
        }
    }
}
