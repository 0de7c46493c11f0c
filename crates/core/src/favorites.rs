use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::connections::ConnectionId;

pub const UNCATEGORIZED_FOLDER: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl FavoriteQuery {
    /// Builds an unsaved favorite. Blank names or queries are rejected.
    #[must_use]
    pub fn new(name: &str, query: &str, connection: Option<ConnectionId>) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() || query.trim().is_empty() {
            return None;
        }
        Some(Self {
            id: None,
            name: name.to_string(),
            description: None,
            query: query.to_string(),
            folder: None,
            connection_id: connection,
            created_at: None,
        })
    }

    #[must_use]
    pub fn folder_name(&self) -> &str {
        self.folder
            .as_deref()
            .map(str::trim)
            .filter(|folder| !folder.is_empty())
            .unwrap_or(UNCATEGORIZED_FOLDER)
    }
}

/// Groups favorites by folder, folders sorted by name and favorites by name
/// within each folder.
#[must_use]
pub fn group_by_folder(favorites: &[FavoriteQuery]) -> BTreeMap<&str, Vec<&FavoriteQuery>> {
    let mut grouped: BTreeMap<&str, Vec<&FavoriteQuery>> = BTreeMap::new();
    for favorite in favorites {
        grouped
            .entry(favorite.folder_name())
            .or_default()
            .push(favorite);
    }
    for members in grouped.values_mut() {
        members.sort_by(|left, right| left.name.cmp(&right.name));
    }
    grouped
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{group_by_folder, FavoriteQuery, UNCATEGORIZED_FOLDER};
    use crate::connections::ConnectionId;

    fn favorite(name: &str, folder: Option<&str>) -> FavoriteQuery {
        let mut favorite =
            FavoriteQuery::new(name, "SELECT 1", Some(ConnectionId(1))).expect("valid favorite");
        favorite.folder = folder.map(str::to_string);
        favorite
    }

    #[test]
    fn blank_name_or_query_is_not_a_favorite() {
        assert!(FavoriteQuery::new("  ", "SELECT 1", None).is_none());
        assert!(FavoriteQuery::new("daily", " \n", None).is_none());

        let saved = FavoriteQuery::new(" daily ", "SELECT 1", Some(ConnectionId(4)))
            .expect("valid favorite");
        assert_eq!(saved.name, "daily");
        let body = serde_json::to_value(&saved).expect("favorite should encode");
        assert_eq!(
            body,
            json!({"name": "daily", "query": "SELECT 1", "connection_id": 4})
        );
    }

    #[test]
    fn missing_or_blank_folder_groups_under_uncategorized() {
        let favorites = vec![
            favorite("zeta", Some("reports")),
            favorite("alpha", None),
            favorite("beta", Some("  ")),
            favorite("gamma", Some("reports")),
        ];

        let grouped = group_by_folder(&favorites);
        assert_eq!(
            grouped.keys().copied().collect::<Vec<_>>(),
            vec![UNCATEGORIZED_FOLDER, "reports"]
        );
        let reports: Vec<&str> = grouped["reports"].iter().map(|f| f.name.as_str()).collect();
        assert_eq!(reports, vec!["gamma", "zeta"]);
        assert_eq!(grouped[UNCATEGORIZED_FOLDER].len(), 2);
    }
}
