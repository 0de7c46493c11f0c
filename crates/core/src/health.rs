use std::cmp::Ordering;

use serde::Deserialize;
use serde_json::Value;

use crate::insights::AiResponse;

const BLOAT_THRESHOLD_PERCENT: f64 = 10.0;
const POOR_CACHE_RATIO: f64 = 90.0;
pub const ANALYSIS_UNAVAILABLE: &str = "AI analysis unavailable";

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TableBloat {
    pub tablename: String,
    #[serde(default)]
    pub total_size: String,
    #[serde(default)]
    pub bloat_percent: f64,
    #[serde(default)]
    pub n_dead_tup: u64,
    #[serde(default)]
    pub last_autovacuum: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct BloatReport {
    #[serde(default)]
    pub tables: Vec<TableBloat>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct IndexUsage {
    pub indexname: String,
    #[serde(default)]
    pub tablename: String,
    #[serde(default)]
    pub index_size: String,
    #[serde(default)]
    pub idx_scan: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct IndexReport {
    #[serde(default)]
    pub indexes: Vec<IndexUsage>,
    #[serde(default)]
    pub duplicates: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CacheRatio {
    #[serde(default)]
    pub cache_hit_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TableCache {
    pub tablename: String,
    #[serde(default)]
    pub cache_hit_ratio: f64,
    #[serde(default)]
    pub heap_blks_read: u64,
    #[serde(default)]
    pub heap_blks_hit: u64,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct CacheReport {
    #[serde(default)]
    pub overall: CacheRatio,
    #[serde(default)]
    pub tables: Vec<TableCache>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionPriority {
    Critical,
    High,
    Medium,
    Low,
    Unknown,
}

impl ActionPriority {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "critical" => Self::Critical,
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct ActionItem {
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub fix_sql: Option<String>,
    #[serde(default)]
    pub impact: String,
}

impl ActionItem {
    #[must_use]
    pub fn priority(&self) -> ActionPriority {
        ActionPriority::parse(&self.priority)
    }

    #[must_use]
    pub fn fix_sql(&self) -> Option<&str> {
        self.fix_sql.as_deref().filter(|sql| !sql.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct HealthAnalysis {
    #[serde(default)]
    pub health_score: f64,
    #[serde(default)]
    pub grade: String,
    #[serde(default)]
    pub critical_issues: Vec<Value>,
    #[serde(default)]
    pub action_items: Vec<ActionItem>,
    #[serde(default)]
    pub summary: String,
}

impl HealthAnalysis {
    #[must_use]
    pub fn band(&self) -> HealthBand {
        HealthBand::classify(self.health_score)
    }

    /// Most urgent first; ties keep the model's order.
    #[must_use]
    pub fn sorted_action_items(&self) -> Vec<&ActionItem> {
        let mut items: Vec<&ActionItem> = self.action_items.iter().collect();
        items.sort_by_key(|item| item.priority());
        items
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthReport {
    #[serde(default)]
    pub bloat: BloatReport,
    #[serde(default)]
    pub indexes: IndexReport,
    #[serde(default)]
    pub cache: CacheReport,
    #[serde(default)]
    pub ai_analysis: Option<AiResponse<HealthAnalysis>>,
}

impl HealthReport {
    #[must_use]
    pub fn analysis(&self) -> Option<&HealthAnalysis> {
        self.ai_analysis
            .as_ref()
            .filter(|response| response.success)
            .map(|response| &response.payload)
    }

    /// Why the AI section is missing, if it is.
    #[must_use]
    pub fn analysis_error(&self) -> Option<&str> {
        if self.analysis().is_some() {
            return None;
        }
        Some(
            self.ai_analysis
                .as_ref()
                .and_then(|response| response.error.as_deref())
                .filter(|error| !error.trim().is_empty())
                .unwrap_or(ANALYSIS_UNAVAILABLE),
        )
    }

    /// Tables above 10% bloat, worst first.
    #[must_use]
    pub fn bloated_tables(&self) -> Vec<&TableBloat> {
        let mut tables: Vec<&TableBloat> = self
            .bloat
            .tables
            .iter()
            .filter(|table| table.bloat_percent > BLOAT_THRESHOLD_PERCENT)
            .collect();
        tables.sort_by(|left, right| {
            right
                .bloat_percent
                .partial_cmp(&left.bloat_percent)
                .unwrap_or(Ordering::Equal)
        });
        tables
    }

    #[must_use]
    pub fn unused_indexes(&self) -> Vec<&IndexUsage> {
        self.indexes
            .indexes
            .iter()
            .filter(|index| index.idx_scan == 0)
            .collect()
    }

    #[must_use]
    pub fn poorly_cached_tables(&self) -> Vec<&TableCache> {
        self.cache
            .tables
            .iter()
            .filter(|table| table.cache_hit_ratio < POOR_CACHE_RATIO)
            .collect()
    }

    #[must_use]
    pub fn cache_band(&self) -> HealthBand {
        HealthBand::classify(self.cache.overall.cache_hit_ratio)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum HealthBand {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthBand {
    /// Classifies a 0-100 score or percentage.
    #[must_use]
    pub fn classify(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 60.0 {
            Self::Fair
        } else if score >= 40.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::Critical => "Critical",
        }
    }
}
