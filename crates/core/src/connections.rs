use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub i64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A saved connection as the persistence service reports it.
///
/// The password is write-only: the service never sends it back, so it is
/// normally `None` on anything that was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: ConnectionId,
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_used: Option<String>,
}

impl Connection {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}/{}", self.host, self.port, self.database)
    }
}

/// Fields sent when creating or editing a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionDraft {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    /// `None` on update keeps whatever password is already stored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl ConnectionDraft {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        host: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_POSTGRES_PORT,
            database: database.into(),
            username: username.into(),
            password: None,
            ssl_enabled: false,
            color: None,
        }
    }

    #[must_use]
    pub fn from_connection(connection: &Connection) -> Self {
        Self {
            name: connection.name.clone(),
            host: connection.host.clone(),
            port: connection.port,
            database: connection.database.clone(),
            username: connection.username.clone(),
            password: None,
            ssl_enabled: connection.ssl_enabled,
            color: connection.color.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

/// Saved connections plus the one the workspace is pointed at.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    connections: Vec<Connection>,
    current: Option<ConnectionId>,
}

impl ConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    #[must_use]
    pub fn get(&self, id: ConnectionId) -> Option<&Connection> {
        self.connections
            .iter()
            .find(|connection| connection.id == id)
    }

    #[must_use]
    pub fn current_id(&self) -> Option<ConnectionId> {
        self.current
    }

    #[must_use]
    pub fn current(&self) -> Option<&Connection> {
        self.current.and_then(|id| self.get(id))
    }

    /// Installs the authoritative list. Returns the new current id when the
    /// pointer moved, so the caller can reload per-connection state.
    pub fn replace_all(&mut self, connections: Vec<Connection>) -> Option<Option<ConnectionId>> {
        let before = self.current;
        self.connections = connections;

        if let Some(current) = self.current {
            if self.get(current).is_none() {
                self.current = None;
            }
        }
        if self.current.is_none() {
            self.current = self.connections.first().map(|connection| connection.id);
        }

        (before != self.current).then_some(self.current)
    }

    pub fn select(&mut self, id: ConnectionId) -> bool {
        if self.current == Some(id) || self.get(id).is_none() {
            return false;
        }
        self.current = Some(id);
        true
    }

    /// Drops a connection locally. Returns `true` when it was the current one.
    pub fn remove(&mut self, id: ConnectionId) -> bool {
        self.connections.retain(|connection| connection.id != id);
        if self.current == Some(id) {
            self.current = None;
            return true;
        }
        false
    }
}

#[cfg(test)]
pub(crate) fn sample_connection(id: i64, name: &str) -> Connection {
    Connection {
        id: ConnectionId(id),
        name: name.to_string(),
        host: "127.0.0.1".to_string(),
        port: DEFAULT_POSTGRES_PORT,
        database: "app".to_string(),
        username: "postgres".to_string(),
        password: None,
        ssl_enabled: false,
        color: None,
        created_at: None,
        last_used: None,
    }
}
