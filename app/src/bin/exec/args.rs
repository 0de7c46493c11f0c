use std::fmt::Display;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use pgai_core::history::{SlowQueryFilter, SlowQuerySource};
use pgai_core::settings::SettingsUpdate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ParseOutcome {
    Config,
    HelpRequested,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Command {
    #[default]
    Query,
    Connections,
    TestConnection,
    SaveConnection,
    DeleteConnection,
    ClearConversations,
    Tables,
    Table,
    Health,
    SlowQueries,
    Favorites,
    UpdateFavorite,
    DeleteFavorite,
    Settings,
}

impl Command {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "query" => Self::Query,
            "connections" => Self::Connections,
            "test-connection" => Self::TestConnection,
            "save-connection" => Self::SaveConnection,
            "delete-connection" => Self::DeleteConnection,
            "clear-conversations" => Self::ClearConversations,
            "tables" => Self::Tables,
            "table" => Self::Table,
            "health" => Self::Health,
            "slow-queries" => Self::SlowQueries,
            "favorites" => Self::Favorites,
            "update-favorite" => Self::UpdateFavorite,
            "delete-favorite" => Self::DeleteFavorite,
            "settings" => Self::Settings,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err("expected `csv` or `json`".to_string()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct ExecConfig {
    pub(crate) command: Command,
    pub(crate) gateway_url: Option<String>,
    pub(crate) connection: Option<i64>,
    pub(crate) yes: bool,

    pub(crate) sql: Option<String>,
    pub(crate) row_limit: Option<u32>,
    pub(crate) out: Option<PathBuf>,
    pub(crate) format: OutputFormat,
    pub(crate) delimiter: Option<char>,

    pub(crate) id: Option<i64>,
    pub(crate) name: Option<String>,
    pub(crate) host: Option<String>,
    pub(crate) port: Option<u16>,
    pub(crate) database: Option<String>,
    pub(crate) user: Option<String>,
    pub(crate) password: Option<String>,
    pub(crate) ssl: Option<bool>,

    pub(crate) filter: Option<String>,
    pub(crate) table: Option<String>,

    pub(crate) min_time: Option<f64>,
    pub(crate) top: Option<u32>,
    pub(crate) source: Option<SlowQuerySource>,
    pub(crate) analyze: bool,

    pub(crate) folder: Option<String>,
    pub(crate) description: Option<String>,

    pub(crate) model: Option<String>,
    pub(crate) api_key: Option<String>,
    pub(crate) query_limit: Option<u32>,
    pub(crate) autocomplete: Option<bool>,
}

impl ExecConfig {
    pub(crate) fn require_connection(&self) -> io::Result<i64> {
        self.connection
            .ok_or_else(|| io_other("`--connection` is required"))
    }

    pub(crate) fn require_id(&self) -> io::Result<i64> {
        self.id.ok_or_else(|| io_other("`--id` is required"))
    }

    pub(crate) fn slow_query_filter(&self) -> SlowQueryFilter {
        let defaults = SlowQueryFilter::default();
        SlowQueryFilter {
            min_time: self.min_time.unwrap_or(defaults.min_time),
            limit: self.top.unwrap_or(defaults.limit),
            source: self.source.unwrap_or(defaults.source),
        }
    }

    pub(crate) fn settings_update(&self) -> SettingsUpdate {
        let update = SettingsUpdate {
            openai_model: self.model.clone(),
            default_query_limit: self.query_limit,
            auto_complete_enabled: self.autocomplete,
            ..SettingsUpdate::default()
        };
        match &self.api_key {
            Some(key) => update.with_api_key(key.as_str()),
            None => update,
        }
    }
}

pub(crate) fn parse_args_from(
    args: impl IntoIterator<Item = String>,
    config: &mut ExecConfig,
) -> io::Result<ParseOutcome> {
    let mut args = args.into_iter().peekable();

    if let Some(first) = args.next_if(|arg| !arg.starts_with('-')) {
        config.command =
            Command::parse(&first).ok_or_else(|| io_other(format!("unknown command `{first}`")))?;
    }

    while let Some(flag) = args.next() {
        match flag.as_str() {
            "-h" | "--help" => return Ok(ParseOutcome::HelpRequested),
            "--gateway" => config.gateway_url = Some(next_value(&mut args, "--gateway")?),
            "--connection" => config.connection = Some(parse_value(&mut args, "--connection")?),
            "-y" | "--yes" => config.yes = true,
            "--sql" => config.sql = Some(next_value(&mut args, "--sql")?),
            "--limit" => config.row_limit = Some(parse_value(&mut args, "--limit")?),
            "--out" => config.out = Some(PathBuf::from(next_value(&mut args, "--out")?)),
            "--format" => config.format = parse_value(&mut args, "--format")?,
            "--delimiter" => {
                let raw = next_value(&mut args, "--delimiter")?;
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(delimiter), None) => config.delimiter = Some(delimiter),
                    _ => {
                        return Err(io_other(format!(
                            "invalid --delimiter value `{raw}`: expected one character"
                        )))
                    }
                }
            }
            "--id" => config.id = Some(parse_value(&mut args, "--id")?),
            "--name" => config.name = Some(next_value(&mut args, "--name")?),
            "--host" => config.host = Some(next_value(&mut args, "--host")?),
            "--port" => config.port = Some(parse_value(&mut args, "--port")?),
            "--database" => config.database = Some(next_value(&mut args, "--database")?),
            "--user" => config.user = Some(next_value(&mut args, "--user")?),
            "--password" => config.password = Some(next_value(&mut args, "--password")?),
            "--ssl" => config.ssl = Some(parse_switch(&mut args, "--ssl")?),
            "--filter" => config.filter = Some(next_value(&mut args, "--filter")?),
            "--table" => config.table = Some(next_value(&mut args, "--table")?),
            "--min-time" => config.min_time = Some(parse_value(&mut args, "--min-time")?),
            "--top" => config.top = Some(parse_value(&mut args, "--top")?),
            "--source" => {
                let raw = next_value(&mut args, "--source")?;
                config.source = Some(match raw.as_str() {
                    "auto" => SlowQuerySource::Auto,
                    "pg_stat" => SlowQuerySource::PgStat,
                    "history" => SlowQuerySource::History,
                    _ => {
                        return Err(io_other(format!(
                            "invalid --source value `{raw}`: expected auto, pg_stat or history"
                        )))
                    }
                });
            }
            "--analyze" => config.analyze = true,
            "--folder" => config.folder = Some(next_value(&mut args, "--folder")?),
            "--description" => config.description = Some(next_value(&mut args, "--description")?),
            "--model" => config.model = Some(next_value(&mut args, "--model")?),
            "--api-key" => config.api_key = Some(next_value(&mut args, "--api-key")?),
            "--query-limit" => config.query_limit = Some(parse_value(&mut args, "--query-limit")?),
            "--autocomplete" => {
                config.autocomplete = Some(parse_switch(&mut args, "--autocomplete")?);
            }
            _ => {
                return Err(io_other(format!("unknown argument `{flag}`")));
            }
        }
    }

    Ok(ParseOutcome::Config)
}

pub(crate) fn next_value(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<String> {
    args.next()
        .ok_or_else(|| io_other(format!("missing value for `{flag}`")))
}

fn parse_value<T>(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    next_value(args, flag)?
        .parse::<T>()
        .map_err(|error| io_other(format!("invalid {flag} value: {error}")))
}

fn parse_switch(args: &mut impl Iterator<Item = String>, flag: &str) -> io::Result<bool> {
    let raw = next_value(args, flag)?;
    match raw.as_str() {
        "on" | "true" | "yes" => Ok(true),
        "off" | "false" | "no" => Ok(false),
        _ => Err(io_other(format!("invalid {flag} value `{raw}`: expected on or off"))),
    }
}

pub(crate) fn print_help() {
    println!(
        "pgai headless client\n\n\
Usage:\n  pgai-exec [COMMAND] [OPTIONS]\n\n\
Commands:\n  query               Run --sql against --connection (default)\n  connections         List saved connections\n  test-connection     Check that --connection can be reached\n  save-connection     Create a connection, or update --id\n  delete-connection   Delete --connection after confirmation\n  clear-conversations Delete the AI conversations of --connection after confirmation\n  tables              List tables of --connection, optionally --filter\n  table               Show columns, indexes, relations and DDL of --table\n  health              Database health report for --connection\n  slow-queries        List slow queries, --analyze asks the assistant\n  favorites           List favorites grouped by folder\n  update-favorite     Edit favorite --id\n  delete-favorite     Delete favorite --id after confirmation\n  settings            Show settings, or update them with the settings flags\n\n\
Common options:\n  --connection <id>     Saved connection to use\n  --gateway <url>       Backend base URL (default: config gateway_url)\n  -y, --yes             Skip the confirmation prompt of delete commands\n\n\
Query options:\n  --sql <query>         Query to execute\n  --limit <rows>        Row limit sent with the query (default: config row_limit)\n  --out <file>          Export all rows to this file\n  --format <csv|json>   Export format (default: csv)\n  --delimiter <char>    CSV field delimiter (default: config export_delimiter)\n\n\
Connection options:\n  --id <id> --name <name> --host <host> --port <port> --database <db>\n  --user <user> --password <password> --ssl <on|off>\n\n\
Schema options:\n  --filter <text>       Only tables whose name contains this text\n  --table <name>        Table to describe\n\n\
Slow query options:\n  --min-time <seconds>  Threshold (default: 1)\n  --top <n>             Maximum queries (default: 50)\n  --source <auto|pg_stat|history>\n  --analyze             Send the listed queries for AI analysis\n\n\
Favorite options:\n  --id <id> --name <name> --sql <query> --folder <folder> --description <text>\n\n\
Settings options:\n  --model <name> --api-key <key> --query-limit <rows> --autocomplete <on|off>\n\n\
Environment:\n  PGAI_GATEWAY_URL overrides the configured backend URL.\n"
    );
}

pub(crate) fn io_other(error: impl Display) -> io::Error {
    io::Error::other(error.to_string())
}
