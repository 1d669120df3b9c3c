//! `PostgreSQL`-backed implementations of the chat-ingestion repository
//! ports (spec §4.3), grounded on
//! [`composable_rust_postgres::delivery::DeliveryStore`]'s row-mapping and
//! migration conventions (see also `link-service::postgres`).

use crate::model::{ChannelViewer, ChatCommand, Clip, Message, Stream, Viewer};
use crate::repository::{
    ChannelViewerRepository, ChatCommandRepository, ClipRepository, MessageRepository,
    StreamRepository, ViewerRepository,
};
use chrono::{DateTime, Utc};
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::{CoreError, Result};
use composable_rust_core::pagination::{Page, Paginated};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::future::Future;
use std::pin::Pin;

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {e}"))
}

fn row_to_stream(row: &PgRow) -> Stream {
    Stream {
        id: row.get("id"),
        channel: row.get("channel"),
        title: row.get("title"),
        game_name: row.get("game_name"),
        game_id: row.get("game_id"),
        started_at: row.get("started_at"),
        ended_at: row.get("ended_at"),
        peak_viewers: row.get("peak_viewers"),
        rolling_avg_viewers: row.get("rolling_avg_viewers"),
        total_message_count: row.get("total_message_count"),
        is_active: row.get("is_active"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_message(row: &PgRow) -> Message {
    Message {
        id: row.get("id"),
        stream_id: row.get("stream_id"),
        channel: row.get("channel"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        body: row.get("body"),
        is_moderator: row.get("is_moderator"),
        is_subscriber: row.get("is_subscriber"),
        is_vip: row.get("is_vip"),
        is_broadcaster: row.get("is_broadcaster"),
        sent_at: row.get("sent_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_viewer(row: &PgRow) -> Viewer {
    Viewer {
        id: row.get("id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        first_seen: row.get("first_seen"),
        last_seen: row.get("last_seen"),
        total_messages: row.get("total_messages"),
        total_streams_watched: row.get("total_streams_watched"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_channel_viewer(row: &PgRow) -> ChannelViewer {
    ChannelViewer {
        id: row.get("id"),
        viewer_id: row.get("viewer_id"),
        channel: row.get("channel"),
        username: row.get("username"),
        display_name: row.get("display_name"),
        first_seen: row.get("first_seen"),
        last_seen: row.get("last_seen"),
        is_moderator: row.get("is_moderator"),
        is_vip: row.get("is_vip"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_clip(row: &PgRow) -> Clip {
    Clip {
        id: row.get("id"),
        stream_id: row.get("stream_id"),
        external_clip_id: row.get("external_clip_id"),
        title: row.get("title"),
        url: row.get("url"),
        embed_url: row.get("embed_url"),
        thumbnail_url: row.get("thumbnail_url"),
        creator: row.get("creator"),
        view_count: row.get("view_count"),
        duration_seconds: row.get("duration_seconds"),
        external_created_at: row.get("external_created_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_chat_command(row: &PgRow) -> ChatCommand {
    ChatCommand {
        id: row.get("id"),
        name: row.get("name"),
        response_template: row.get("response_template"),
        is_active: row.get("is_active"),
        moderator_only: row.get("moderator_only"),
        subscriber_only: row.get("subscriber_only"),
        cooldown_seconds: row.get("cooldown_seconds"),
        usage_count: row.get("usage_count"),
        last_used: row.get("last_used"),
        deleted_at: row.get("deleted_at"),
    }
}

/// `PostgreSQL`-backed repositories for every chat-ingestion aggregate,
/// grouped behind one migration runner since they share a single migrations
/// directory.
pub struct PostgresMigrator {
    pool: PgPool,
}

impl PostgresMigrator {
    /// Build a new migrator over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run this crate's migrations.
    ///
    /// # Errors
    ///
    /// Returns an error if the migration run fails.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::Internal(format!("migration failed: {e}")))
    }
}

/// `PostgreSQL`-backed [`StreamRepository`].
pub struct PostgresStreamRepository {
    pool: PgPool,
}

impl PostgresStreamRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl StreamRepository for PostgresStreamRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, stream: Stream) -> Pin<Box<dyn Future<Output = Result<Stream>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO streams (
                    id, channel, title, game_name, game_id, started_at, ended_at,
                    peak_viewers, rolling_avg_viewers, total_message_count, is_active, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(&stream.id)
            .bind(&stream.channel)
            .bind(&stream.title)
            .bind(&stream.game_name)
            .bind(&stream.game_id)
            .bind(stream.started_at)
            .bind(stream.ended_at)
            .bind(stream.peak_viewers)
            .bind(stream.rolling_avg_viewers)
            .bind(stream.total_message_count)
            .bind(stream.is_active)
            .bind(stream.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(stream)
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Stream>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, channel, title, game_name, game_id, started_at, ended_at,
                       peak_viewers, rolling_avg_viewers, total_message_count, is_active, deleted_at
                FROM streams WHERE id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_stream))
        })
    }

    fn get_active_for_channel<'a>(&'a self, _ctx: &'a RequestContext, channel: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Stream>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, channel, title, game_name, game_id, started_at, ended_at,
                       peak_viewers, rolling_avg_viewers, total_message_count, is_active, deleted_at
                FROM streams
                WHERE channel = $1 AND is_active AND deleted_at IS NULL
                ",
            )
            .bind(channel)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_stream))
        })
    }

    fn list_active_stale<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        older_than: DateTime<Utc>,
        page: Page,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Stream>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT s.id, s.channel, s.title, s.game_name, s.game_id, s.started_at, s.ended_at,
                       s.peak_viewers, s.rolling_avg_viewers, s.total_message_count, s.is_active, s.deleted_at
                FROM streams s
                WHERE s.is_active AND s.deleted_at IS NULL
                  AND COALESCE(
                        (SELECT MAX(m.sent_at) FROM messages m WHERE m.stream_id = s.id AND m.deleted_at IS NULL),
                        s.started_at
                      ) < $1
                ORDER BY s.id ASC
                OFFSET $2 LIMIT $3
                ",
            )
            .bind(older_than)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(rows.iter().map(row_to_stream).collect())
        })
    }

    fn list<'a>(&'a self, _ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Stream>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, channel, title, game_name, game_id, started_at, ended_at,
                       peak_viewers, rolling_avg_viewers, total_message_count, is_active, deleted_at
                FROM streams
                WHERE deleted_at IS NULL
                ORDER BY started_at DESC
                OFFSET $1 LIMIT $2
                ",
            )
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM streams WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_stream).collect(), total))
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, stream: Stream) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE streams
                SET title = $1, game_name = $2, game_id = $3, ended_at = $4,
                    peak_viewers = $5, rolling_avg_viewers = $6, total_message_count = $7, is_active = $8
                WHERE id = $9
                ",
            )
            .bind(&stream.title)
            .bind(&stream.game_name)
            .bind(&stream.game_id)
            .bind(stream.ended_at)
            .bind(stream.peak_viewers)
            .bind(stream.rolling_avg_viewers)
            .bind(stream.total_message_count)
            .bind(stream.is_active)
            .bind(&stream.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`MessageRepository`].
pub struct PostgresMessageRepository {
    pool: PgPool,
}

impl PostgresMessageRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl MessageRepository for PostgresMessageRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, message: Message) -> Pin<Box<dyn Future<Output = Result<Message>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO messages (
                    id, stream_id, channel, user_id, username, display_name, body,
                    is_moderator, is_subscriber, is_vip, is_broadcaster, sent_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
                ",
            )
            .bind(&message.id)
            .bind(&message.stream_id)
            .bind(&message.channel)
            .bind(&message.user_id)
            .bind(&message.username)
            .bind(&message.display_name)
            .bind(&message.body)
            .bind(message.is_moderator)
            .bind(message.is_subscriber)
            .bind(message.is_vip)
            .bind(message.is_broadcaster)
            .bind(message.sent_at)
            .bind(message.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(message)
        })
    }

    fn list_for_stream<'a>(&'a self, _ctx: &'a RequestContext, stream_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Message>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, stream_id, channel, user_id, username, display_name, body,
                       is_moderator, is_subscriber, is_vip, is_broadcaster, sent_at, deleted_at
                FROM messages
                WHERE stream_id = $1 AND deleted_at IS NULL
                ORDER BY sent_at DESC
                OFFSET $2 LIMIT $3
                ",
            )
            .bind(stream_id)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM messages WHERE stream_id = $1 AND deleted_at IS NULL")
                .bind(stream_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_message).collect(), total))
        })
    }

    fn last_message_at<'a>(&'a self, _ctx: &'a RequestContext, stream_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<DateTime<Utc>>>> + Send + 'a>> {
        Box::pin(async move {
            let row: Option<(DateTime<Utc>,)> = sqlx::query_as(
                r"SELECT MAX(sent_at) FROM messages WHERE stream_id = $1 AND deleted_at IS NULL HAVING MAX(sent_at) IS NOT NULL",
            )
            .bind(stream_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.map(|(at,)| at))
        })
    }

    fn delete_older_than<'a>(&'a self, _ctx: &'a RequestContext, older_than: DateTime<Utc>, page_size: i64) -> Pin<Box<dyn Future<Output = Result<i64>> + Send + 'a>> {
        Box::pin(async move {
            let result = sqlx::query(
                r"
                UPDATE messages SET deleted_at = NOW()
                WHERE id IN (
                    SELECT id FROM messages WHERE sent_at < $1 AND deleted_at IS NULL LIMIT $2
                )
                ",
            )
            .bind(older_than)
            .bind(page_size)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(i64::try_from(result.rows_affected()).unwrap_or(i64::MAX))
        })
    }
}

/// `PostgreSQL`-backed [`ViewerRepository`].
pub struct PostgresViewerRepository {
    pool: PgPool,
}

impl PostgresViewerRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ViewerRepository for PostgresViewerRepository {
    fn get_by_user_id<'a>(&'a self, _ctx: &'a RequestContext, user_id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Viewer>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, user_id, username, display_name, first_seen, last_seen,
                       total_messages, total_streams_watched, deleted_at
                FROM viewers WHERE user_id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_viewer))
        })
    }

    fn create<'a>(&'a self, _ctx: &'a RequestContext, viewer: Viewer) -> Pin<Box<dyn Future<Output = Result<Viewer>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO viewers (
                    id, user_id, username, display_name, first_seen, last_seen,
                    total_messages, total_streams_watched, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(&viewer.id)
            .bind(&viewer.user_id)
            .bind(&viewer.username)
            .bind(&viewer.display_name)
            .bind(viewer.first_seen)
            .bind(viewer.last_seen)
            .bind(viewer.total_messages)
            .bind(viewer.total_streams_watched)
            .bind(viewer.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(viewer)
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, viewer: Viewer) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE viewers
                SET username = $1, display_name = $2, last_seen = $3,
                    total_messages = $4, total_streams_watched = $5
                WHERE id = $6
                ",
            )
            .bind(&viewer.username)
            .bind(&viewer.display_name)
            .bind(viewer.last_seen)
            .bind(viewer.total_messages)
            .bind(viewer.total_streams_watched)
            .bind(&viewer.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`ChannelViewerRepository`].
pub struct PostgresChannelViewerRepository {
    pool: PgPool,
}

impl PostgresChannelViewerRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ChannelViewerRepository for PostgresChannelViewerRepository {
    fn get<'a>(&'a self, _ctx: &'a RequestContext, viewer_id: &'a str, channel: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChannelViewer>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, viewer_id, channel, username, display_name, first_seen, last_seen,
                       is_moderator, is_vip, deleted_at
                FROM channel_viewers WHERE viewer_id = $1 AND channel = $2 AND deleted_at IS NULL
                ",
            )
            .bind(viewer_id)
            .bind(channel)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_channel_viewer))
        })
    }

    fn create<'a>(&'a self, _ctx: &'a RequestContext, row: ChannelViewer) -> Pin<Box<dyn Future<Output = Result<ChannelViewer>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO channel_viewers (
                    id, viewer_id, channel, username, display_name, first_seen, last_seen,
                    is_moderator, is_vip, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(&row.id)
            .bind(&row.viewer_id)
            .bind(&row.channel)
            .bind(&row.username)
            .bind(&row.display_name)
            .bind(row.first_seen)
            .bind(row.last_seen)
            .bind(row.is_moderator)
            .bind(row.is_vip)
            .bind(row.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row)
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, row: ChannelViewer) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE channel_viewers
                SET username = $1, display_name = $2, last_seen = $3, is_moderator = $4, is_vip = $5
                WHERE id = $6
                ",
            )
            .bind(&row.username)
            .bind(&row.display_name)
            .bind(row.last_seen)
            .bind(row.is_moderator)
            .bind(row.is_vip)
            .bind(&row.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`ClipRepository`].
pub struct PostgresClipRepository {
    pool: PgPool,
}

impl PostgresClipRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ClipRepository for PostgresClipRepository {
    fn create<'a>(&'a self, _ctx: &'a RequestContext, clip: Clip) -> Pin<Box<dyn Future<Output = Result<Clip>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO clips (
                    id, stream_id, external_clip_id, title, url, embed_url, thumbnail_url,
                    creator, view_count, duration_seconds, external_created_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                ",
            )
            .bind(&clip.id)
            .bind(&clip.stream_id)
            .bind(&clip.external_clip_id)
            .bind(&clip.title)
            .bind(&clip.url)
            .bind(&clip.embed_url)
            .bind(&clip.thumbnail_url)
            .bind(&clip.creator)
            .bind(clip.view_count)
            .bind(clip.duration_seconds)
            .bind(clip.external_created_at)
            .bind(clip.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(clip)
        })
    }

    fn list_for_stream<'a>(&'a self, _ctx: &'a RequestContext, stream_id: &'a str, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Clip>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, stream_id, external_clip_id, title, url, embed_url, thumbnail_url,
                       creator, view_count, duration_seconds, external_created_at, deleted_at
                FROM clips
                WHERE stream_id = $1 AND deleted_at IS NULL
                ORDER BY external_created_at DESC
                OFFSET $2 LIMIT $3
                ",
            )
            .bind(stream_id)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM clips WHERE stream_id = $1 AND deleted_at IS NULL")
                .bind(stream_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_clip).collect(), total))
        })
    }
}

/// `PostgreSQL`-backed [`ChatCommandRepository`].
pub struct PostgresChatCommandRepository {
    pool: PgPool,
}

impl PostgresChatCommandRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ChatCommandRepository for PostgresChatCommandRepository {
    fn get_by_name<'a>(&'a self, _ctx: &'a RequestContext, name: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChatCommand>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, name, response_template, is_active, moderator_only, subscriber_only,
                       cooldown_seconds, usage_count, last_used, deleted_at
                FROM chat_commands WHERE name = $1 AND deleted_at IS NULL
                ",
            )
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_chat_command))
        })
    }

    fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChatCommand>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, name, response_template, is_active, moderator_only, subscriber_only,
                       cooldown_seconds, usage_count, last_used, deleted_at
                FROM chat_commands WHERE id = $1 AND deleted_at IS NULL
                ",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_chat_command))
        })
    }

    fn create<'a>(&'a self, _ctx: &'a RequestContext, command: ChatCommand) -> Pin<Box<dyn Future<Output = Result<ChatCommand>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO chat_commands (
                    id, name, response_template, is_active, moderator_only, subscriber_only,
                    cooldown_seconds, usage_count, last_used, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                ",
            )
            .bind(&command.id)
            .bind(&command.name)
            .bind(&command.response_template)
            .bind(command.is_active)
            .bind(command.moderator_only)
            .bind(command.subscriber_only)
            .bind(command.cooldown_seconds)
            .bind(command.usage_count)
            .bind(command.last_used)
            .bind(command.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(command)
        })
    }

    fn list<'a>(&'a self, _ctx: &'a RequestContext, page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ChatCommand>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, name, response_template, is_active, moderator_only, subscriber_only,
                       cooldown_seconds, usage_count, last_used, deleted_at
                FROM chat_commands
                WHERE deleted_at IS NULL
                ORDER BY name ASC
                OFFSET $1 LIMIT $2
                ",
            )
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM chat_commands WHERE deleted_at IS NULL")
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_chat_command).collect(), total))
        })
    }

    fn update<'a>(&'a self, _ctx: &'a RequestContext, command: ChatCommand) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE chat_commands
                SET response_template = $1, is_active = $2, moderator_only = $3, subscriber_only = $4,
                    cooldown_seconds = $5, usage_count = $6, last_used = $7, deleted_at = $8
                WHERE id = $9
                ",
            )
            .bind(&command.response_template)
            .bind(command.is_active)
            .bind(command.moderator_only)
            .bind(command.subscriber_only)
            .bind(command.cooldown_seconds)
            .bind(command.usage_count)
            .bind(command.last_used)
            .bind(command.deleted_at)
            .bind(&command.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }
}
