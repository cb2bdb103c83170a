/// Leaderboard and top-N aggregators.
///
/// Joins comments and poems against users by identity, counts per key
/// inside a time window, and ranks the result. Accumulators are
/// insertion-ordered maps so that equal counts keep the order in which keys
/// were first seen; the sort is stable and has no secondary key.
use chrono::{DateTime, TimeZone};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::model::{Comment, Poem, User};
use crate::store::Document;
use crate::window::TimeWindow;

/// Default number of rows in a leaderboard.
pub const DEFAULT_LIMIT: usize = 5;

/// Rows kept in the top-poems list.
pub const TOP_POEMS_LIMIT: usize = 5;

/// Identity key used when a record carries no identity at all.
pub const UNKNOWN_IDENTITY: &str = "Unknown";

/// A poem ranked by comment count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPoem {
    pub slug: String,
    pub title: String,
    pub comment_count: u64,
}

/// A user ranked by number of comments or poems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: String,
    pub name: String,
    pub count: u64,
}

/// Which collection a leaderboard counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LeaderboardKind {
    /// Users ranked by comments written
    MostCommentedUsers,
    /// Poets ranked by poems posted
    MostActivePoets,
}

/// Resolution key → display name, in user iteration order.
pub type UserNames = IndexMap<String, String>;

/// Build the display-name table from user documents.
///
/// Later users with the same resolution key overwrite earlier ones.
pub fn user_names(users: &[Document]) -> UserNames {
    users
        .iter()
        .map(User::from_document)
        .map(|user| (user.resolution_key().to_owned(), user.display_name().to_owned()))
        .collect()
}

/// The identity-bearing fields of one scanned record.
struct IdentityFields<'a> {
    user_id: Option<&'a str>,
    email: Option<&'a str>,
    name: Option<&'a str>,
    author: Option<&'a str>,
}

impl<'a> IdentityFields<'a> {
    fn of_comment(c: &'a Comment) -> Self {
        Self {
            user_id: c.user_id.as_deref(),
            email: c.email.as_deref(),
            name: c.name.as_deref(),
            author: None,
        }
    }

    fn of_poem(p: &'a Poem) -> Self {
        Self {
            user_id: p.user_id.as_deref(),
            email: p.email.as_deref(),
            name: p.name.as_deref(),
            author: p.author.as_deref(),
        }
    }

    /// First present candidate of userId, email, name, author; else "Unknown".
    fn key(&self) -> &'a str {
        [self.user_id, self.email, self.name, self.author]
            .into_iter()
            .flatten()
            .next()
            .unwrap_or(UNKNOWN_IDENTITY)
    }
}

/// Running state for one leaderboard row.
struct Tally {
    name: Option<String>,
    email: Option<String>,
    count: u64,
}

/// Count records per identity key inside `window` and rank them.
fn rank_identities<'a, Tz: TimeZone>(
    records: impl Iterator<Item = (IdentityFields<'a>, Option<DateTime<chrono::Utc>>)>,
    names: &UserNames,
    window: TimeWindow,
    now: &DateTime<Tz>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let mut tallies: IndexMap<String, Tally> = IndexMap::new();

    for (identity, instant) in records {
        let Some(instant) = instant else {
            continue;
        };
        if !window.contains(now, &instant) {
            continue;
        }

        let key = identity.key();
        let tally = tallies.entry(key.to_owned()).or_insert_with(|| Tally {
            name: identity.name.map(str::to_owned),
            email: identity.email.map(str::to_owned),
            count: 0,
        });
        tally.count += 1;
    }

    let mut entries: Vec<LeaderboardEntry> = tallies
        .into_iter()
        .map(|(key, tally)| {
            // Final name pass: record name, users table, email, key itself
            let name = tally
                .name
                .or_else(|| names.get(&key).cloned())
                .or(tally.email)
                .or_else(|| (!key.is_empty()).then(|| key.clone()))
                .unwrap_or_else(|| UNKNOWN_IDENTITY.to_owned());
            LeaderboardEntry {
                user_id: key,
                name,
                count: tally.count,
            }
        })
        .collect();

    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(limit);
    entries
}

/// Users ranked by number of comments inside `window`.
pub fn most_commented_users<Tz: TimeZone>(
    comments: &[Document],
    users: &[Document],
    window: TimeWindow,
    now: &DateTime<Tz>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let names = user_names(users);
    let tz = now.timezone();
    let comments: Vec<Comment> = comments.iter().map(Comment::from_document).collect();
    let records = comments
        .iter()
        .map(|c| (IdentityFields::of_comment(c), c.timestamp.normalize(&tz)));
    rank_identities(records, &names, window, now, limit)
}

/// Poets ranked by number of poems posted inside `window`.
pub fn most_active_poets<Tz: TimeZone>(
    poems: &[Document],
    users: &[Document],
    window: TimeWindow,
    now: &DateTime<Tz>,
    limit: usize,
) -> Vec<LeaderboardEntry> {
    let names = user_names(users);
    let tz = now.timezone();
    let poems: Vec<Poem> = poems.iter().map(Poem::from_document).collect();
    let records = poems
        .iter()
        .map(|p| (IdentityFields::of_poem(p), p.date_posted.normalize(&tz)));
    rank_identities(records, &names, window, now, limit)
}

/// Poems ranked by comments received inside `window`, at most five.
///
/// Comments pointing at a slug no poem carries (deleted poems) are ignored,
/// as are comments without a valid timestamp. Poems with no qualifying
/// comments are left out.
pub fn top_poems_by_comments<Tz: TimeZone>(
    poems: &[Document],
    comments: &[Document],
    window: TimeWindow,
    now: &DateTime<Tz>,
) -> Vec<TopPoem> {
    let tz = now.timezone();
    let mut by_slug: IndexMap<String, TopPoem> = IndexMap::new();
    for poem in poems.iter().map(Poem::from_document) {
        let Some(slug) = poem.slug else {
            tracing::debug!(id = %poem.id, "Poem without slug cannot receive comments");
            continue;
        };
        by_slug.entry(slug.clone()).or_insert_with(|| TopPoem {
            title: poem.title.unwrap_or_else(|| slug.clone()),
            slug,
            comment_count: 0,
        });
    }

    let mut orphaned = 0usize;
    for comment in comments.iter().map(Comment::from_document) {
        let Some(instant) = comment.timestamp.normalize(&tz) else {
            continue;
        };
        let Some(slug) = comment.poem_slug.as_deref() else {
            continue;
        };
        match by_slug.get_mut(slug) {
            Some(poem) if window.contains(now, &instant) => poem.comment_count += 1,
            Some(_) => {}
            None => orphaned += 1,
        }
    }
    if orphaned > 0 {
        tracing::debug!(orphaned, "Ignored comments on deleted poems");
    }

    let mut ranked: Vec<TopPoem> = by_slug
        .into_values()
        .filter(|poem| poem.comment_count > 0)
        .collect();
    ranked.sort_by(|a, b| b.comment_count.cmp(&a.comment_count));
    ranked.truncate(TOP_POEMS_LIMIT);
    ranked
}
