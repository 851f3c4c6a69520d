//! Forum moderation: keyword flagging over reply text.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::PortalConfig;
use crate::error::{AppError, AppResult};
use crate::store::DocumentStore;

pub const DEFAULT_KEYWORDS: &[&str] = &["hate", "idiot", "stupid", "dumb", "kill", "kill yourself"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    /// Document key; not stored in the document body.
    #[serde(default, skip_serializing)]
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Case-insensitive substring match against a keyword list.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    // None when the keyword list is empty
    matcher: Option<Regex>,
}

impl ContentFilter {
    pub fn new<I, S>(keywords: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let alternation = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_string())
            .filter(|k| !k.is_empty())
            .map(|k| regex::escape(&k))
            .collect::<Vec<_>>()
            .join("|");
        if alternation.is_empty() {
            return Ok(Self { matcher: None });
        }
        let matcher = RegexBuilder::new(&alternation)
            .case_insensitive(true)
            .build()
            .map_err(|e| AppError::user("invalid_keywords".to_string(), e.to_string()))?;
        Ok(Self { matcher: Some(matcher) })
    }

    pub fn from_config(cfg: &PortalConfig) -> AppResult<Self> { Self::new(&cfg.moderation_keywords) }

    pub fn contains_abuse(&self, text: &str) -> bool {
        match &self.matcher {
            Some(re) => !text.is_empty() && re.is_match(text),
            None => false,
        }
    }

    /// Ids of the replies whose text trips the filter.
    pub fn flagged(&self, replies: &[Reply]) -> HashSet<String> {
        replies.iter().filter(|r| self.contains_abuse(&r.text)).map(|r| r.id.clone()).collect()
    }
}

/// All replies in `collection`, newest first. Malformed documents are skipped.
pub async fn load_replies(store: &dyn DocumentStore, collection: &str) -> AppResult<Vec<Reply>> {
    let docs = store.list(collection).await?;
    let mut replies = Vec::with_capacity(docs.len());
    for doc in docs {
        match serde_json::from_value::<Reply>(doc.data) {
            Ok(mut r) => {
                r.id = doc.key;
                replies.push(r);
            }
            Err(e) => warn!(target: "alumni_portal::moderation", "skipping malformed reply '{}': {}", doc.key, e),
        }
    }
    replies.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(replies)
}

pub async fn remove_reply(store: &dyn DocumentStore, collection: &str, id: &str) -> AppResult<bool> {
    let removed = store.delete(collection, id).await?;
    info!(target: "alumni_portal::moderation", "moderation.remove collection={} id={} removed={}", collection, id, removed);
    Ok(removed)
}

/// Replies newest first, with the ids the filter flagged.
#[derive(Debug, Clone)]
pub struct Review {
    pub replies: Vec<Reply>,
    pub flagged: HashSet<String>,
}

/// Admin moderation over the configured replies collection and keyword list.
#[derive(Debug, Clone)]
pub struct Moderator {
    filter: ContentFilter,
    collection: String,
}

impl Moderator {
    pub fn from_config(cfg: &PortalConfig) -> AppResult<Self> {
        Ok(Self { filter: ContentFilter::from_config(cfg)?, collection: cfg.replies_collection.clone() })
    }

    pub async fn review(&self, store: &dyn DocumentStore) -> AppResult<Review> {
        let replies = load_replies(store, &self.collection).await?;
        let flagged = self.filter.flagged(&replies);
        info!(target: "alumni_portal::moderation", "moderation.review collection={} replies={} flagged={}", self.collection, replies.len(), flagged.len());
        Ok(Review { replies, flagged })
    }

    pub async fn remove(&self, store: &dyn DocumentStore, id: &str) -> AppResult<bool> {
        remove_reply(store, &self.collection, id).await
    }
}
