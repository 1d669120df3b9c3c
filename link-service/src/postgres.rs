//! `PostgreSQL`-backed implementations of the shortener repository ports
//! (spec §4.3), grounded on
//! [`composable_rust_postgres::delivery::DeliveryStore`]'s row-mapping and
//! migration conventions.

use crate::model::{Click, ShortLink};
use crate::repository::{ClickRepository, ShortLinkRepository};
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::{CoreError, Result};
use composable_rust_core::pagination::{Page, Paginated};
use sqlx::{postgres::PgRow, PgPool, Row};
use std::future::Future;
use std::pin::Pin;

fn db_err(e: sqlx::Error) -> CoreError {
    CoreError::Internal(format!("database error: {e}"))
}

fn row_to_link(row: &PgRow) -> ShortLink {
    ShortLink {
        id: row.get("id"),
        original_url: row.get("original_url"),
        short_code: row.get("short_code"),
        title: row.get("title"),
        description: row.get("description"),
        expires_at: row.get("expires_at"),
        is_active: row.get("is_active"),
        click_count: row.get("click_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

fn row_to_click(row: &PgRow) -> Click {
    Click {
        id: row.get("id"),
        link_id: row.get("link_id"),
        ip: row.get("ip"),
        user_agent: row.get("user_agent"),
        referer: row.get("referer"),
        country: row.get("country"),
        city: row.get("city"),
        device_type: row.get("device_type"),
        clicked_at: row.get("clicked_at"),
    }
}

/// `PostgreSQL`-backed [`ShortLinkRepository`].
pub struct PostgresShortLinkRepository {
    pool: PgPool,
}

impl PostgresShortLinkRepository {
    /// Build a new repository over an existing connection pool.
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

impl ShortLinkRepository for PostgresShortLinkRepository {
    fn create<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        link: ShortLink,
    ) -> Pin<Box<dyn Future<Output = Result<ShortLink>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO short_links (
                    id, original_url, short_code, title, description, expires_at,
                    is_active, click_count, created_at, updated_at, deleted_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                ",
            )
            .bind(&link.id)
            .bind(&link.original_url)
            .bind(&link.short_code)
            .bind(&link.title)
            .bind(&link.description)
            .bind(link.expires_at)
            .bind(link.is_active)
            .bind(link.click_count)
            .bind(link.created_at)
            .bind(link.updated_at)
            .bind(link.deleted_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(link)
        })
    }

    fn get_by_id<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        id: &'a str,
        include_deleted: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShortLink>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, original_url, short_code, title, description, expires_at,
                       is_active, click_count, created_at, updated_at, deleted_at
                FROM short_links
                WHERE id = $1 AND ($2 OR deleted_at IS NULL)
                ",
            )
            .bind(id)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_link))
        })
    }

    fn get_by_short_code<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        short_code: &'a str,
        include_deleted: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Option<ShortLink>>> + Send + 'a>> {
        Box::pin(async move {
            let row = sqlx::query(
                r"
                SELECT id, original_url, short_code, title, description, expires_at,
                       is_active, click_count, created_at, updated_at, deleted_at
                FROM short_links
                WHERE short_code = $1 AND ($2 OR deleted_at IS NULL)
                ",
            )
            .bind(short_code)
            .bind(include_deleted)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(row.as_ref().map(row_to_link))
        })
    }

    fn short_code_exists<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        short_code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
        Box::pin(async move {
            let (count,): (i64,) = sqlx::query_as(
                r"SELECT COUNT(*) FROM short_links WHERE short_code = $1 AND deleted_at IS NULL",
            )
            .bind(short_code)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(count > 0)
        })
    }

    fn list<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        page: Page,
        include_deleted: bool,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ShortLink>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, original_url, short_code, title, description, expires_at,
                       is_active, click_count, created_at, updated_at, deleted_at
                FROM short_links
                WHERE ($1 OR deleted_at IS NULL)
                ORDER BY created_at DESC
                OFFSET $2 LIMIT $3
                ",
            )
            .bind(include_deleted)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(
                r"SELECT COUNT(*) FROM short_links WHERE ($1 OR deleted_at IS NULL)",
            )
            .bind(include_deleted)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_link).collect(), total))
        })
    }

    fn list_active_page<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        page: Page,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ShortLink>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, original_url, short_code, title, description, expires_at,
                       is_active, click_count, created_at, updated_at, deleted_at
                FROM short_links
                WHERE is_active AND expires_at IS NOT NULL AND expires_at <= NOW() AND deleted_at IS NULL
                ORDER BY id ASC
                OFFSET $1 LIMIT $2
                ",
            )
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(rows.iter().map(row_to_link).collect())
        })
    }

    fn update<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        link: ShortLink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                UPDATE short_links
                SET title = $1, description = $2, expires_at = $3, is_active = $4,
                    click_count = $5, updated_at = $6
                WHERE id = $7
                ",
            )
            .bind(&link.title)
            .bind(&link.description)
            .bind(link.expires_at)
            .bind(link.is_active)
            .bind(link.click_count)
            .bind(link.updated_at)
            .bind(&link.id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(())
        })
    }

    fn delete<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        id: &'a str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(r"UPDATE short_links SET deleted_at = $1, updated_at = $1 WHERE id = $2")
                .bind(now)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(())
        })
    }
}

/// `PostgreSQL`-backed [`ClickRepository`].
pub struct PostgresClickRepository {
    pool: PgPool,
}

impl PostgresClickRepository {
    /// Build a new repository over an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ClickRepository for PostgresClickRepository {
    fn create<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        click: Click,
    ) -> Pin<Box<dyn Future<Output = Result<Click>> + Send + 'a>> {
        Box::pin(async move {
            sqlx::query(
                r"
                INSERT INTO clicks (
                    id, link_id, ip, user_agent, referer, country, city, device_type, clicked_at
                ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                ",
            )
            .bind(&click.id)
            .bind(&click.link_id)
            .bind(&click.ip)
            .bind(&click.user_agent)
            .bind(&click.referer)
            .bind(&click.country)
            .bind(&click.city)
            .bind(&click.device_type)
            .bind(click.clicked_at)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

            Ok(click)
        })
    }

    fn list_for_link<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        link_id: &'a str,
        page: Page,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<Click>>> + Send + 'a>> {
        Box::pin(async move {
            let rows = sqlx::query(
                r"
                SELECT id, link_id, ip, user_agent, referer, country, city, device_type, clicked_at
                FROM clicks
                WHERE link_id = $1
                ORDER BY clicked_at DESC
                OFFSET $2 LIMIT $3
                ",
            )
            .bind(link_id)
            .bind(page.offset)
            .bind(page.limit)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

            let (total,): (i64,) = sqlx::query_as(r"SELECT COUNT(*) FROM clicks WHERE link_id = $1")
                .bind(link_id)
                .fetch_one(&self.pool)
                .await
                .map_err(db_err)?;

            Ok(Paginated::new(rows.iter().map(row_to_click).collect(), total))
        })
    }
}
