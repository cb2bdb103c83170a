/// Dashboard stats facade.
///
/// Answers the fixed set of analytics queries the admin overview needs.
/// Every query reads the collections it needs afresh (nothing is cached
/// between calls) and never fails: store errors are logged and replaced by
/// an empty or zero result of the same shape.
use anyhow::Result;
use chrono::{DateTime, Datelike, Utc};
use futures_util::{join, try_join};
use std::sync::Arc;

use crate::buckets::{bucket_series, EntitySource, Granularity, SeriesPoint};
use crate::leaderboard::{
    self, LeaderboardEntry, LeaderboardKind, TopPoem, UserNames, UNKNOWN_IDENTITY,
};
use crate::model::{Comment, PoemRequest};
use crate::stats::{
    DashboardReport, DashboardSummary, Rankings, ReplyBacklog, QueuedRequest, SeriesSet,
};
use crate::store::{Collection, DocumentStore};
use crate::timefmt::{format_instant, format_zoned};
use crate::window::{Clock, SystemClock, TimeWindow};

/// Report layout version written into [`DashboardReport::schema_version`].
const REPORT_SCHEMA_VERSION: i32 = 1;

/// Log a failed query and substitute its fallback.
fn fail_soft<T>(query: &str, result: Result<T>, fallback: impl FnOnce() -> T) -> T {
    match result {
        Ok(value) => value,
        Err(e) => {
            tracing::error!(query, error = %format!("{:#}", e), "Dashboard query failed, returning default");
            fallback()
        }
    }
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

/// Analytics queries over a document store.
pub struct DashboardStats<C: Clock = SystemClock> {
    store: Arc<dyn DocumentStore>,
    clock: C,
}

impl DashboardStats<SystemClock> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<C: Clock> DashboardStats<C> {
    pub fn with_clock(store: Arc<dyn DocumentStore>, clock: C) -> Self {
        Self { store, clock }
    }

    // ------------------------------------------------------------------
    // Summary
    // ------------------------------------------------------------------

    /// Headline counters; all six are zero if anything goes wrong.
    pub async fn dashboard_summary(&self) -> DashboardSummary {
        fail_soft("dashboard_summary", self.try_summary().await, DashboardSummary::default)
    }

    async fn try_summary(&self) -> Result<DashboardSummary> {
        let store = &self.store;
        let (total_poems, total_users, pending_requests, poems, users) = try_join!(
            store.count(Collection::Poems),
            store.count(Collection::Users),
            store.count(Collection::PoemRequests),
            store.list_all(Collection::Poems),
            store.list_all(Collection::Users),
        )?;

        let now = self.clock.now();
        let tz = now.timezone();
        let poem_instants = EntitySource::Poems.instants(&poems, &tz);
        let user_instants = EntitySource::Users.instants(&users, &tz);
        let count_in = |instants: &[DateTime<Utc>], window: TimeWindow| {
            to_u64(instants.iter().filter(|i| window.contains(&now, i)).count())
        };

        let summary = DashboardSummary {
            total_poems: to_u64(total_poems),
            total_users: to_u64(total_users),
            pending_requests: to_u64(pending_requests),
            poems_this_month: count_in(&poem_instants, TimeWindow::Month),
            poems_this_year: count_in(&poem_instants, TimeWindow::Year),
            users_this_year: count_in(&user_instants, TimeWindow::Year),
        };
        tracing::info!(?summary, "Computed dashboard summary");
        Ok(summary)
    }

    // ------------------------------------------------------------------
    // Series
    // ------------------------------------------------------------------

    /// Bucketed counts of poems or users.
    ///
    /// On store failure fixed shapes still return every bucket, all zero;
    /// the year series returns no buckets.
    pub async fn series(&self, source: EntitySource, granularity: Granularity) -> Vec<SeriesPoint> {
        let now = self.clock.now();
        let result = self
            .store
            .list_all(source.collection())
            .await
            .map(|docs| bucket_series(&source.instants(&docs, &now.timezone()), granularity, &now));
        fail_soft("series", result, || bucket_series(&[], granularity, &now))
    }

    pub async fn poems_per_hour_today(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Poems, Granularity::HourOfDay).await
    }

    pub async fn users_per_hour_today(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Users, Granularity::HourOfDay).await
    }

    pub async fn poems_per_day_this_week(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Poems, Granularity::DayOfWeek).await
    }

    pub async fn users_per_day_this_week(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Users, Granularity::DayOfWeek).await
    }

    pub async fn poems_per_day_this_month(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Poems, Granularity::DayOfMonth).await
    }

    pub async fn users_per_day_this_month(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Users, Granularity::DayOfMonth).await
    }

    pub async fn poems_per_month(&self, year: i32) -> Vec<SeriesPoint> {
        self.series(EntitySource::Poems, Granularity::MonthOfYear(year)).await
    }

    pub async fn users_per_month(&self, year: i32) -> Vec<SeriesPoint> {
        self.series(EntitySource::Users, Granularity::MonthOfYear(year)).await
    }

    pub async fn poems_per_year(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Poems, Granularity::Year).await
    }

    pub async fn users_per_year(&self) -> Vec<SeriesPoint> {
        self.series(EntitySource::Users, Granularity::Year).await
    }

    async fn series_set(&self, source: EntitySource, year: i32) -> SeriesSet {
        let (per_hour_today, per_day_this_week, per_day_this_month, per_month, per_year) = join!(
            self.series(source, Granularity::HourOfDay),
            self.series(source, Granularity::DayOfWeek),
            self.series(source, Granularity::DayOfMonth),
            self.series(source, Granularity::MonthOfYear(year)),
            self.series(source, Granularity::Year),
        );
        SeriesSet {
            per_hour_today,
            per_day_this_week,
            per_day_this_month,
            per_month,
            per_year,
        }
    }

    // ------------------------------------------------------------------
    // Rankings
    // ------------------------------------------------------------------

    /// Up to five poems with the most comments inside `window`.
    pub async fn top_poems_by_comments(&self, window: TimeWindow) -> Vec<TopPoem> {
        let result = async {
            let (poems, comments) = try_join!(
                self.store.list_all(Collection::Poems),
                self.store.list_all(Collection::Comments),
            )?;
            Ok::<_, anyhow::Error>(leaderboard::top_poems_by_comments(
                &poems,
                &comments,
                window,
                &self.clock.now(),
            ))
        }
        .await;
        fail_soft("top_poems_by_comments", result, Vec::new)
    }

    pub async fn top_poems_by_comments_all_time(&self) -> Vec<TopPoem> {
        self.top_poems_by_comments(TimeWindow::All).await
    }

    /// Users or poets ranked by activity inside `window`.
    pub async fn leaderboard(
        &self,
        kind: LeaderboardKind,
        window: TimeWindow,
        limit: usize,
    ) -> Vec<LeaderboardEntry> {
        let source = match kind {
            LeaderboardKind::MostCommentedUsers => Collection::Comments,
            LeaderboardKind::MostActivePoets => Collection::Poems,
        };
        let result = async {
            let (records, users) = try_join!(
                self.store.list_all(source),
                self.store.list_all(Collection::Users),
            )?;
            let now = self.clock.now();
            Ok::<_, anyhow::Error>(match kind {
                LeaderboardKind::MostCommentedUsers => {
                    leaderboard::most_commented_users(&records, &users, window, &now, limit)
                }
                LeaderboardKind::MostActivePoets => {
                    leaderboard::most_active_poets(&records, &users, window, &now, limit)
                }
            })
        }
        .await;
        fail_soft("leaderboard", result, Vec::new)
    }

    pub async fn most_commented_users(&self, window: TimeWindow, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard(LeaderboardKind::MostCommentedUsers, window, limit)
            .await
    }

    pub async fn most_commented_users_all_time(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.most_commented_users(TimeWindow::All, limit).await
    }

    pub async fn most_active_poets(&self, window: TimeWindow, limit: usize) -> Vec<LeaderboardEntry> {
        self.leaderboard(LeaderboardKind::MostActivePoets, window, limit)
            .await
    }

    pub async fn most_active_poets_all_time(&self, limit: usize) -> Vec<LeaderboardEntry> {
        self.most_active_poets(TimeWindow::All, limit).await
    }

    async fn rankings(&self, window: TimeWindow, limit: usize) -> Rankings {
        let (top_poems, most_commented_users, most_active_poets) = join!(
            self.top_poems_by_comments(window),
            self.most_commented_users(window, limit),
            self.most_active_poets(window, limit),
        );
        Rankings {
            top_poems,
            most_commented_users,
            most_active_poets,
        }
    }

    /// Resolution key → display name for every user.
    pub async fn user_names_map(&self) -> UserNames {
        let result = self
            .store
            .list_all(Collection::Users)
            .await
            .map(|users| leaderboard::user_names(&users));
        fail_soft("user_names_map", result, UserNames::new)
    }

    // ------------------------------------------------------------------
    // Moderation queues
    // ------------------------------------------------------------------

    /// Comments with and without a moderator reply.
    pub async fn reply_backlog(&self) -> ReplyBacklog {
        let result = self.store.list_all(Collection::Comments).await.map(|docs| {
            let replied = docs
                .iter()
                .map(Comment::from_document)
                .filter(Comment::is_replied)
                .count();
            ReplyBacklog {
                total_comments: to_u64(docs.len()),
                replied: to_u64(replied),
                awaiting_reply: to_u64(docs.len() - replied),
            }
        });
        fail_soft("reply_backlog", result, ReplyBacklog::default)
    }

    /// Pending poem requests, oldest first; undated requests come last.
    pub async fn request_queue(&self, limit: usize) -> Vec<QueuedRequest> {
        let tz = self.clock.now().timezone();
        let result = self
            .store
            .list_all(Collection::PoemRequests)
            .await
            .map(|docs| {
                let mut dated: Vec<(Option<DateTime<Utc>>, PoemRequest)> = docs
                    .iter()
                    .map(PoemRequest::from_document)
                    .map(|req| (req.timestamp.normalize(&tz), req))
                    .collect();
                dated.sort_by_key(|(instant, _)| (instant.is_none(), *instant));
                dated
                    .into_iter()
                    .take(limit)
                    .map(|(instant, req)| QueuedRequest {
                        title: req.title.unwrap_or_else(|| "(untitled)".to_string()),
                        requested_by: req
                            .user_name
                            .or(req.email)
                            .or(req.user_id)
                            .unwrap_or_else(|| UNKNOWN_IDENTITY.to_string()),
                        submitted_at: instant.as_ref().map(format_instant),
                        id: req.id,
                    })
                    .collect()
            });
        fail_soft("request_queue", result, Vec::new)
    }

    // ------------------------------------------------------------------
    // Full report
    // ------------------------------------------------------------------

    /// Every dashboard query, issued concurrently.
    ///
    /// `year` selects the month-of-year series; it defaults to the current
    /// year when `None`.
    pub async fn report(&self, window: TimeWindow, year: Option<i32>, limit: usize) -> DashboardReport {
        let now = self.clock.now();
        let year = year.unwrap_or_else(|| now.year());

        let (summary, reply_backlog, request_queue, poems, users, rankings, rankings_all_time, user_names) = join!(
            self.dashboard_summary(),
            self.reply_backlog(),
            self.request_queue(limit),
            self.series_set(EntitySource::Poems, year),
            self.series_set(EntitySource::Users, year),
            self.rankings(window, limit),
            self.rankings(TimeWindow::All, limit),
            self.user_names_map(),
        );

        tracing::info!(window = %window, year, "Built dashboard report");
        DashboardReport {
            schema_version: REPORT_SCHEMA_VERSION,
            generated_at: format_zoned(&now),
            window,
            year,
            summary,
            reply_backlog,
            request_queue,
            poems,
            users,
            rankings,
            rankings_all_time,
            user_names,
        }
    }
}
