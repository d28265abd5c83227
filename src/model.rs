use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub const ALL: [ArticleStatus; 2] = [ArticleStatus::Draft, ArticleStatus::Published];

    pub fn as_str(self) -> &'static str {
        match self {
            ArticleStatus::Draft => "draft",
            ArticleStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for ArticleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArticleCategory {
    Mining,
    Crypto,
}

impl ArticleCategory {
    pub const ALL: [ArticleCategory; 2] = [ArticleCategory::Mining, ArticleCategory::Crypto];

    pub fn as_str(self) -> &'static str {
        match self {
            ArticleCategory::Mining => "mining",
            ArticleCategory::Crypto => "crypto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }
}

impl fmt::Display for ArticleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub publish_date: DateTime<Utc>,
    pub status: ArticleStatus,
    pub category: ArticleCategory,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub created_at: DateTime<Utc>,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn date_line(&self) -> String {
        self.publish_date.format("%Y-%m-%d %H:%M").to_string()
    }

    /// Overwrites every field present in `changes`.
    pub fn merge(&mut self, changes: ArticleChanges) {
        if let Some(v) = changes.title { self.title = v; }
        if let Some(v) = changes.content { self.content = v; }
        if let Some(v) = changes.author { self.author = v; }
        if let Some(v) = changes.publish_date { self.publish_date = v; }
        if let Some(v) = changes.status { self.status = v; }
        if let Some(v) = changes.category { self.category = v; }
        if let Some(v) = changes.created_at { self.created_at = v; }
        if let Some(v) = changes.updated_at { self.updated_at = v; }
    }
}

/// POST body: an article before the server has assigned id and timestamps.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleForm {
    pub title: String,
    pub content: String,
    pub author: String,
    pub publish_date: DateTime<Utc>,
    pub status: ArticleStatus,
    pub category: ArticleCategory,
}

/// PUT body. Unset fields are left out of the JSON entirely.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticlePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ArticleStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ArticleCategory>,
}

impl From<ArticleForm> for ArticlePatch {
    fn from(form: ArticleForm) -> Self {
        Self {
            title: Some(form.title),
            content: Some(form.content),
            author: Some(form.author),
            publish_date: Some(form.publish_date),
            status: Some(form.status),
            category: Some(form.category),
        }
    }
}

/// PUT response. The backend echoes the whole article, but only what is
/// present gets merged; the id is never taken from it.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleChanges {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub publish_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub status: Option<ArticleStatus>,
    #[serde(default)]
    pub category: Option<ArticleCategory>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub updated_at: Option<DateTime<Utc>>,
}

const MIN_EPOCH_DIGITS: usize = 10;

/// Accepts RFC 3339, naive ISO-8601 (read as UTC), a bare date, or epoch
/// milliseconds. Epoch values need at least `MIN_EPOCH_DIGITS` digits so a
/// bare year or day number is not read as a moment in 1970.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    if s.len() < MIN_EPOCH_DIGITS || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<i64>().ok().and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}

mod timestamp {
    use chrono::{DateTime, Utc};
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn deserialize<'de, D>(de: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(de)?;
        super::parse_timestamp(&raw)
            .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn deserialize_opt<'de, D>(de: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(de)? {
            None => Ok(None),
            Some(raw) => super::parse_timestamp(&raw)
                .map(Some)
                .ok_or_else(|| D::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }
}
