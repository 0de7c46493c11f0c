mod args;
mod report;

use std::error::Error;
use std::io::{self, BufRead, Write};

use pgai_adapters::export::{export_result_to_csv, export_result_to_json, CsvOptions};
use pgai_adapters::HttpGateway;
use pgai_core::config::{ClientConfig, FileConfigStore};
use pgai_core::confirm::DestructiveAction;
use pgai_core::connections::{Connection, ConnectionDraft, ConnectionId};
use pgai_core::favorites::FavoriteQuery;
use pgai_core::gateway::{PersistenceGateway, SchemaGateway};
use pgai_core::history::analyze_slow_queries;
use pgai_core::results::{render_mode, RenderMode};
use pgai_core::schema::load_table_details;
use pgai_core::tabs::ApplyOutcome;
use pgai_core::workspace::Workspace;

use args::{io_other, parse_args_from, print_help, Command, ExecConfig, OutputFormat, ParseOutcome};

type ExecResult = Result<(), Box<dyn Error>>;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExecResult {
    let args = parse_args()?;

    let store = FileConfigStore::load_default()?;
    let mut config = store.config().clone();
    if let Some(url) = &args.gateway_url {
        config.gateway_url.clone_from(url);
    }
    let gateway = HttpGateway::new(&config)?;
    let mut workspace = Workspace::new(
        config.default_page_size,
        args.row_limit.or(config.row_limit),
    );

    match args.command {
        Command::Query => run_query(&gateway, &mut workspace, &config, &args).await,
        Command::Connections => {
            workspace.reload_connections(&gateway).await?;
            print_lines(report::connection_lines(workspace.connections().connections()));
            Ok(())
        }
        Command::TestConnection => {
            let outcome = gateway
                .test_connection(ConnectionId(args.require_connection()?))
                .await?;
            if !outcome.success {
                return Err(io_other(outcome.message).into());
            }
            println!("{}", outcome.message);
            Ok(())
        }
        Command::SaveConnection => save_connection(&gateway, &mut workspace, &args).await,
        Command::DeleteConnection => {
            let id = ConnectionId(args.require_connection()?);
            workspace.reload_connections(&gateway).await?;
            if workspace.connections().get(id).is_none() {
                return Err(io_other(format!("no saved connection with id {id}")).into());
            }
            let action = DestructiveAction::DeleteConnection(id);
            confirm_and_perform(&gateway, &mut workspace, action, args.yes).await
        }
        Command::ClearConversations => {
            let connection = ConnectionId(args.require_connection()?);
            select_connection(&gateway, &mut workspace, connection).await?;
            let loaded = workspace.load_conversations(&gateway).await.transpose()?;
            if loaded.unwrap_or_default() == 0 {
                println!("No conversations to clear");
                return Ok(());
            }
            let action = DestructiveAction::ClearConversations(connection);
            confirm_and_perform(&gateway, &mut workspace, action, args.yes).await
        }
        Command::Tables => {
            let tables = gateway
                .tables(ConnectionId(args.require_connection()?))
                .await?;
            let filter = args.filter.as_deref().unwrap_or_default();
            print_lines(report::table_listing_lines(&tables, filter));
            Ok(())
        }
        Command::Table => {
            let connection = ConnectionId(args.require_connection()?);
            let table = args
                .table
                .as_deref()
                .ok_or_else(|| io_other("`--table` is required"))?;
            let details = load_table_details(&gateway, connection, table).await?;
            print_lines(report::table_details_lines(&details));
            Ok(())
        }
        Command::Health => {
            let report = gateway
                .health(ConnectionId(args.require_connection()?))
                .await?;
            print_lines(report::health_lines(&report));
            Ok(())
        }
        Command::SlowQueries => {
            let connection = ConnectionId(args.require_connection()?);
            let listing = gateway
                .slow_queries(connection, &args.slow_query_filter())
                .await?;
            print_lines(report::slow_query_lines(&listing));
            if args.analyze {
                if let Some(analysis) =
                    analyze_slow_queries(&gateway, connection, &listing.queries).await?
                {
                    println!();
                    print_lines(report::slow_analysis_lines(&analysis));
                }
            }
            Ok(())
        }
        Command::Favorites => {
            workspace.reload_favorites(&gateway).await?;
            print_lines(report::favorite_lines(workspace.favorites()));
            Ok(())
        }
        Command::UpdateFavorite => {
            let id = args.require_id()?;
            workspace.reload_favorites(&gateway).await?;
            let mut favorite = workspace
                .favorites()
                .iter()
                .find(|favorite| favorite.id == Some(id))
                .cloned()
                .ok_or_else(|| io_other(format!("no favorite with id {id}")))?;
            apply_favorite_edits(&mut favorite, &args)?;
            workspace.update_favorite(&gateway, id, &favorite).await?;
            println!("Updated favorite {id}: {}", favorite.name);
            Ok(())
        }
        Command::DeleteFavorite => {
            let action = DestructiveAction::DeleteFavorite(args.require_id()?);
            confirm_and_perform(&gateway, &mut workspace, action, args.yes).await
        }
        Command::Settings => {
            let update = args.settings_update();
            if !update.is_empty() {
                gateway.update_settings(&update).await?;
                println!("Settings updated");
            }
            print_lines(report::settings_lines(&gateway.settings().await?));
            Ok(())
        }
    }
}

fn parse_args() -> io::Result<ExecConfig> {
    let mut config = ExecConfig::default();
    let outcome = parse_args_from(std::env::args().skip(1), &mut config)?;
    if outcome == ParseOutcome::HelpRequested {
        print_help();
        std::process::exit(0);
    }
    Ok(config)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{line}");
    }
}

async fn select_connection(
    gateway: &HttpGateway,
    workspace: &mut Workspace,
    connection: ConnectionId,
) -> io::Result<()> {
    workspace
        .reload_connections(gateway)
        .await
        .map_err(io_other)?;
    if workspace.current_connection() == Some(connection) || workspace.switch_connection(connection)
    {
        return Ok(());
    }
    Err(io_other(format!("no saved connection with id {connection}")))
}

async fn run_query(
    gateway: &HttpGateway,
    workspace: &mut Workspace,
    config: &ClientConfig,
    args: &ExecConfig,
) -> ExecResult {
    let connection = ConnectionId(args.require_connection()?);
    let sql = args
        .sql
        .clone()
        .ok_or_else(|| io_other("`--sql` is required"))?;
    select_connection(gateway, workspace, connection).await?;

    let tab = workspace.tabs().active_id();
    workspace.update_content(tab, sql);
    match workspace.execute(gateway, tab, None).await {
        Some(ApplyOutcome::Applied) => {}
        Some(outcome) => return Err(io_other(format!("result was not applied: {outcome:?}")).into()),
        None => return Err(io_other("nothing to execute").into()),
    }

    let result = workspace
        .active_tab()
        .result()
        .ok_or_else(|| io_other("query finished without a result"))?;

    match render_mode(result) {
        RenderMode::Error(message) => return Err(io_other(message).into()),
        RenderMode::Status { message, .. } => println!("{message}"),
        RenderMode::Empty | RenderMode::Grid => match &args.out {
            Some(path) => {
                let rows = match args.format {
                    OutputFormat::Csv => {
                        let options = CsvOptions {
                            delimiter: args.delimiter.unwrap_or(config.export_delimiter),
                        };
                        export_result_to_csv(path, result, options)?
                    }
                    OutputFormat::Json => export_result_to_json(path, result)?,
                };
                println!("{} (wrote {rows} rows to {})", result.summary_line(), path.display());
            }
            None => println!("{}", result.summary_line()),
        },
    }

    Ok(())
}

async fn save_connection(
    gateway: &HttpGateway,
    workspace: &mut Workspace,
    args: &ExecConfig,
) -> ExecResult {
    workspace.reload_connections(gateway).await?;
    let id = args.id.map(ConnectionId);
    let existing = match id {
        Some(id) => Some(
            workspace
                .connections()
                .get(id)
                .cloned()
                .ok_or_else(|| io_other(format!("no saved connection with id {id}")))?,
        ),
        None => None,
    };
    let draft = connection_draft(args, existing.as_ref())?;
    let saved = workspace.save_connection(gateway, id, &draft).await?;
    println!("Saved connection {}: {} ({})", saved.id, saved.name, saved.address());
    Ok(())
}

/// Flags override the stored connection. A new connection needs name, host,
/// database and user; the port defaults to Postgres'.
fn connection_draft(args: &ExecConfig, existing: Option<&Connection>) -> io::Result<ConnectionDraft> {
    let mut draft = match existing {
        Some(connection) => ConnectionDraft::from_connection(connection),
        None => {
            let required = |value: &Option<String>, flag: &str| {
                value
                    .clone()
                    .ok_or_else(|| io_other(format!("`{flag}` is required for a new connection")))
            };
            ConnectionDraft::new(
                required(&args.name, "--name")?,
                required(&args.host, "--host")?,
                required(&args.database, "--database")?,
                required(&args.user, "--user")?,
            )
        }
    };

    if let Some(name) = &args.name {
        draft.name.clone_from(name);
    }
    if let Some(host) = &args.host {
        draft.host.clone_from(host);
    }
    if let Some(database) = &args.database {
        draft.database.clone_from(database);
    }
    if let Some(user) = &args.user {
        draft.username.clone_from(user);
    }
    if let Some(port) = args.port {
        draft.port = port;
    }
    if let Some(ssl) = args.ssl {
        draft.ssl_enabled = ssl;
    }
    if args.password.is_some() {
        draft.password.clone_from(&args.password);
    }
    Ok(draft)
}

fn apply_favorite_edits(favorite: &mut FavoriteQuery, args: &ExecConfig) -> io::Result<()> {
    if let Some(name) = &args.name {
        let name = name.trim();
        if name.is_empty() {
            return Err(io_other("favorite name cannot be blank"));
        }
        favorite.name = name.to_string();
    }
    if let Some(sql) = &args.sql {
        if sql.trim().is_empty() {
            return Err(io_other("favorite query cannot be blank"));
        }
        favorite.query.clone_from(sql);
    }
    if let Some(folder) = &args.folder {
        favorite.folder = non_blank(folder);
    }
    if let Some(description) = &args.description {
        favorite.description = non_blank(description);
    }
    Ok(())
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

async fn confirm_and_perform(
    gateway: &HttpGateway,
    workspace: &mut Workspace,
    action: DestructiveAction,
    assume_yes: bool,
) -> ExecResult {
    let token = workspace.request_confirmation(action);
    if !assume_yes && !ask(action.prompt())? {
        workspace.decline(&token);
        println!("Cancelled");
        return Ok(());
    }
    let proof = workspace.confirm(&token, action)?;
    workspace.perform(gateway, proof).await?;
    println!("Deleted");
    Ok(())
}

fn ask(prompt: &str) -> io::Result<bool> {
    print!("{prompt} [y/N] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(accepts(&answer))
}

fn accepts(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
