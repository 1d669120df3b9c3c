//! Command/query handlers for the shortener service (spec §4.4).

use crate::commands::{
    CreateShortLink, DeactivateExpiredLink, DeleteShortLink, IncrementClick, RecordClick,
    UpdateShortLink,
};
use crate::events::LinkEvent;
use crate::model::{Click, ShortLink};
use crate::queries::{self, GetLinkStats, GetShortLinkByCode, LinkStats, ListShortLinks};
use crate::repository::{ClickRepository, ShortLinkRepository};
use chrono::Utc;
use composable_rust_core::command::CommandHandler;
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::Result;
use composable_rust_core::pagination::Paginated;
use composable_rust_core::publisher::EventPublisher;
use composable_rust_core::model::new_id;
use composable_rust_core::query::QueryHandler;
use composable_rust_core::CoreError;
use rand::seq::SliceRandom;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use url::Url;

/// 62-character alphabet used by the short-code generator (spec §4.4.1,
/// §6): lowercase, uppercase, then digits.
const SHORT_CODE_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Length of an auto-generated short code (spec §4.4.1).
const SHORT_CODE_LENGTH: usize = 6;

/// Total short-code generation attempts (1 initial + 10 retries) before
/// giving up with a conflict (spec §4.4.1, §8: "a conflict after exactly
/// 11 probes").
const SHORT_CODE_MAX_ATTEMPTS: usize = 11;

fn generate_short_code() -> String {
    let mut rng = rand::thread_rng();
    (0..SHORT_CODE_LENGTH)
        .map(|_| {
            let byte = SHORT_CODE_ALPHABET
                .choose(&mut rng)
                .copied()
                .unwrap_or(b'a');
            byte as char
        })
        .collect()
}

/// Validate a destination URL per spec §4.4.1: must parse, scheme must be
/// `http` or `https`, host must be non-empty.
fn validate_original_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| CoreError::invalid(format!("original_url is not a valid URL: {e}")))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(CoreError::invalid("original_url must use the http or https scheme"));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(CoreError::invalid("original_url must have a non-empty host"));
    }
    Ok(())
}

/// Handles [`CreateShortLink`] (spec §4.4, §4.4.1).
pub struct CreateShortLinkHandler {
    links: Arc<dyn ShortLinkRepository>,
    events: Arc<EventPublisher>,
}

impl CreateShortLinkHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>, events: Arc<EventPublisher>) -> Self {
        Self { links, events }
    }

    async fn resolve_short_code(&self, ctx: &RequestContext, custom_alias: Option<&str>) -> Result<String> {
        if let Some(alias) = custom_alias {
            if self.links.short_code_exists(ctx, alias).await? {
                return Err(CoreError::conflict("short_code"));
            }
            return Ok(alias.to_string());
        }

        for _ in 0..SHORT_CODE_MAX_ATTEMPTS {
            let candidate = generate_short_code();
            if !self.links.short_code_exists(ctx, &candidate).await? {
                return Ok(candidate);
            }
        }
        Err(CoreError::conflict("short_code"))
    }
}

impl CommandHandler<CreateShortLink> for CreateShortLinkHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateShortLink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            validate_original_url(&cmd.original_url)?;

            let short_code = self
                .resolve_short_code(ctx, cmd.custom_alias.as_deref())
                .await?;

            let now = Utc::now();
            let link = ShortLink {
                id: new_id(),
                original_url: cmd.original_url.clone(),
                short_code,
                title: cmd.title.clone(),
                description: cmd.description.clone(),
                expires_at: cmd.expires_at,
                is_active: true,
                click_count: 0,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            };

            let created = self.links.create(ctx, link).await?;
            let event = LinkEvent::created(&created);
            self.events.publish(&event.topic(), &created.id, &event).await;

            cmd.aggregate_id = Some(created.id.clone());
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`UpdateShortLink`] (spec §4.4 explicit-presence update).
pub struct UpdateShortLinkHandler {
    links: Arc<dyn ShortLinkRepository>,
    events: Arc<EventPublisher>,
}

impl UpdateShortLinkHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>, events: Arc<EventPublisher>) -> Self {
        Self { links, events }
    }
}

impl CommandHandler<UpdateShortLink> for UpdateShortLinkHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut UpdateShortLink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;

            let mut link = self
                .links
                .get_by_id(ctx, &cmd.id, false)
                .await?
                .ok_or_else(|| CoreError::not_found("ShortLink"))?;

            let was_active = link.is_active;
            cmd.title.clone().apply_to_option(&mut link.title);
            cmd.description.clone().apply_to_option(&mut link.description);
            cmd.expires_at.clone().apply_to_option(&mut link.expires_at);
            cmd.is_active.clone().apply_to(&mut link.is_active);
            link.updated_at = Utc::now();

            self.links.update(ctx, link.clone()).await?;

            self.events
                .publish(&LinkEvent::Updated { id: link.id.clone() }.topic(), &link.id, &LinkEvent::Updated { id: link.id.clone() })
                .await;

            if !was_active && link.is_active {
                let event = LinkEvent::Activated { id: link.id.clone() };
                self.events.publish(&event.topic(), &link.id, &event).await;
            } else if was_active && !link.is_active {
                let event = LinkEvent::Deactivated { id: link.id.clone() };
                self.events.publish(&event.topic(), &link.id, &event).await;
            }

            Ok(())
        })
    }
}

/// Handles [`DeleteShortLink`] (soft-delete).
pub struct DeleteShortLinkHandler {
    links: Arc<dyn ShortLinkRepository>,
    events: Arc<EventPublisher>,
}

impl DeleteShortLinkHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>, events: Arc<EventPublisher>) -> Self {
        Self { links, events }
    }
}

impl CommandHandler<DeleteShortLink> for DeleteShortLinkHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut DeleteShortLink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let exists = self.links.get_by_id(ctx, &cmd.id, false).await?;
            if exists.is_none() {
                return Err(CoreError::not_found("ShortLink"));
            }
            self.links.delete(ctx, &cmd.id, Utc::now()).await?;

            let event = LinkEvent::Deleted { id: cmd.id.clone() };
            self.events.publish(&event.topic(), &cmd.id, &event).await;
            Ok(())
        })
    }
}

/// Handles [`DeactivateExpiredLink`], dispatched only by the expiration
/// sweeper (spec §4.5). Idempotent: deactivating an already-inactive link
/// is a no-op write, not an error.
pub struct DeactivateExpiredLinkHandler {
    links: Arc<dyn ShortLinkRepository>,
    events: Arc<EventPublisher>,
}

impl DeactivateExpiredLinkHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>, events: Arc<EventPublisher>) -> Self {
        Self { links, events }
    }
}

impl CommandHandler<DeactivateExpiredLink> for DeactivateExpiredLinkHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut DeactivateExpiredLink,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let Some(mut link) = self.links.get_by_id(ctx, &cmd.id, false).await? else {
                return Err(CoreError::not_found("ShortLink"));
            };

            if !link.is_active {
                return Ok(());
            }

            link.is_active = false;
            link.updated_at = Utc::now();
            self.links.update(ctx, link.clone()).await?;

            let event = LinkEvent::Expired { id: link.id.clone() };
            self.events.publish(&event.topic(), &link.id, &event).await;
            Ok(())
        })
    }
}

/// Handles [`IncrementClick`] (spec §4.4.2): resolves by short code and
/// bumps the counter, independent of the detailed click row.
pub struct IncrementClickHandler {
    links: Arc<dyn ShortLinkRepository>,
    events: Arc<EventPublisher>,
}

impl IncrementClickHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>, events: Arc<EventPublisher>) -> Self {
        Self { links, events }
    }
}

impl CommandHandler<IncrementClick> for IncrementClickHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut IncrementClick,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();
            let mut link = self
                .links
                .get_by_short_code(ctx, &cmd.short_code, false)
                .await?
                .ok_or_else(|| queries::not_found(&cmd.short_code))?;

            if !link.is_available(now) {
                return Err(queries::not_found(&cmd.short_code));
            }

            link.click_count += 1;
            link.updated_at = now;
            self.links.update(ctx, link.clone()).await?;

            let event = LinkEvent::Clicked { id: link.id.clone(), click_count: link.click_count };
            self.events.publish(&event.topic(), &link.id, &event).await;

            cmd.new_click_count = Some(link.click_count);
            Ok(())
        })
    }
}

/// Handles [`RecordClick`] (spec §4.4.2): writes the detailed, immutable
/// click row. Requires the link to currently be available.
pub struct RecordClickHandler {
    links: Arc<dyn ShortLinkRepository>,
    clicks: Arc<dyn ClickRepository>,
}

impl RecordClickHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>, clicks: Arc<dyn ClickRepository>) -> Self {
        Self { links, clicks }
    }
}

impl CommandHandler<RecordClick> for RecordClickHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut RecordClick,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();
            let link = self
                .links
                .get_by_id(ctx, &cmd.link_id, false)
                .await?
                .ok_or_else(|| CoreError::not_found("ShortLink"))?;

            if !link.is_available(now) {
                return Err(CoreError::not_found("ShortLink"));
            }

            let click = Click {
                id: new_id(),
                link_id: cmd.link_id.clone(),
                ip: cmd.ip.clone(),
                user_agent: cmd.user_agent.clone(),
                referer: cmd.referer.clone(),
                country: cmd.country.clone(),
                city: cmd.city.clone(),
                device_type: cmd.device_type.clone(),
                clicked_at: now,
            };

            let created = self.clicks.create(ctx, click).await?;
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`GetShortLinkByCode`] (spec §6): collapses "unknown" and
/// "unavailable" into a single not-found, per spec §9.
pub struct GetShortLinkByCodeHandler {
    links: Arc<dyn ShortLinkRepository>,
}

impl GetShortLinkByCodeHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>) -> Self {
        Self { links }
    }
}

impl QueryHandler<GetShortLinkByCode> for GetShortLinkByCodeHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a GetShortLinkByCode,
    ) -> Pin<Box<dyn Future<Output = Result<ShortLink>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let link = self
                .links
                .get_by_short_code(ctx, &query.short_code, false)
                .await?
                .ok_or_else(|| queries::not_found(&query.short_code))?;

            if !link.is_available(Utc::now()) {
                return Err(queries::not_found(&query.short_code));
            }
            Ok(link)
        })
    }
}

/// Handles [`ListShortLinks`].
pub struct ListShortLinksHandler {
    links: Arc<dyn ShortLinkRepository>,
}

impl ListShortLinksHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(links: Arc<dyn ShortLinkRepository>) -> Self {
        Self { links }
    }
}

impl QueryHandler<ListShortLinks> for ListShortLinksHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListShortLinks,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ShortLink>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.links.list(ctx, query.page, query.include_deleted).await
        })
    }
}

/// Handles [`GetLinkStats`] (spec §6): summarizes the click history of a
/// single link.
pub struct GetLinkStatsHandler {
    clicks: Arc<dyn ClickRepository>,
}

impl GetLinkStatsHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(clicks: Arc<dyn ClickRepository>) -> Self {
        Self { clicks }
    }
}

impl QueryHandler<GetLinkStats> for GetLinkStatsHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a GetLinkStats,
    ) -> Pin<Box<dyn Future<Output = Result<LinkStats>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();
            let day_ago = now - chrono::Duration::hours(24);
            let week_ago = now - chrono::Duration::days(7);
            let month_ago = now - chrono::Duration::days(30);

            let mut stats = LinkStats::default();
            let mut offset = 0_i64;
            const PAGE_SIZE: i64 = 500;
            let mut unique_ips = std::collections::HashSet::new();
            let mut referer_counts: std::collections::HashMap<String, i64> = std::collections::HashMap::new();

            loop {
                let page = composable_rust_core::pagination::Page::new(offset, PAGE_SIZE);
                let Paginated { items, total } = self
                    .clicks
                    .list_for_link(ctx, &query.link_id, page)
                    .await?;
                if items.is_empty() {
                    break;
                }

                for click in &items {
                    stats.total_clicks += 1;
                    unique_ips.insert(click.ip.clone());
                    if click.clicked_at >= day_ago {
                        stats.clicks_today += 1;
                    }
                    if click.clicked_at >= week_ago {
                        stats.clicks_week += 1;
                    }
                    if click.clicked_at >= month_ago {
                        stats.clicks_month += 1;
                    }
                    if let Some(country) = &click.country {
                        *stats.by_country.entry(country.clone()).or_insert(0) += 1;
                    }
                    if let Some(device) = &click.device_type {
                        *stats.by_device.entry(device.clone()).or_insert(0) += 1;
                    }
                    if let Some(referer) = &click.referer {
                        *referer_counts.entry(referer.clone()).or_insert(0) += 1;
                    }
                }

                offset += i64::try_from(items.len()).unwrap_or(PAGE_SIZE);
                if offset >= total {
                    break;
                }
            }

            stats.unique_ips = i64::try_from(unique_ips.len()).unwrap_or(i64::MAX);
            let mut top: Vec<(String, i64)> = referer_counts.into_iter().collect();
            top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            top.truncate(10);
            stats.top_referers = top;

            Ok(stats)
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use composable_rust_testing::InMemoryEventBus;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryLinks {
        by_id: Mutex<HashMap<String, ShortLink>>,
    }

    impl ShortLinkRepository for InMemoryLinks {
        fn create<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            link: ShortLink,
        ) -> Pin<Box<dyn Future<Output = Result<ShortLink>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(link.id.clone(), link.clone());
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
                let links = self.by_id.lock().unwrap();
                Ok(links.get(id).filter(|l| include_deleted || l.deleted_at.is_none()).cloned())
            })
        }

        fn get_by_short_code<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            short_code: &'a str,
            include_deleted: bool,
        ) -> Pin<Box<dyn Future<Output = Result<Option<ShortLink>>> + Send + 'a>> {
            Box::pin(async move {
                let links = self.by_id.lock().unwrap();
                Ok(links
                    .values()
                    .find(|l| l.short_code == short_code && (include_deleted || l.deleted_at.is_none()))
                    .cloned())
            })
        }

        fn short_code_exists<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            short_code: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
            Box::pin(async move {
                Ok(self.by_id.lock().unwrap().values().any(|l| l.short_code == short_code && l.deleted_at.is_none()))
            })
        }

        fn list<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _page: composable_rust_core::pagination::Page,
            _include_deleted: bool,
        ) -> Pin<Box<dyn Future<Output = Result<Paginated<ShortLink>>> + Send + 'a>> {
            Box::pin(async move { Ok(Paginated::new(vec![], 0)) })
        }

        fn list_active_page<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _page: composable_rust_core::pagination::Page,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ShortLink>>> + Send + 'a>> {
            Box::pin(async move {
                let now = Utc::now();
                Ok(self
                    .by_id
                    .lock()
                    .unwrap()
                    .values()
                    .filter(|l| l.is_active && l.is_expired(now))
                    .cloned()
                    .collect())
            })
        }

        fn update<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            link: ShortLink,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(link.id.clone(), link);
                Ok(())
            })
        }

        fn delete<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            id: &'a str,
            now: chrono::DateTime<Utc>,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                if let Some(link) = self.by_id.lock().unwrap().get_mut(id) {
                    link.deleted_at = Some(now);
                }
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct InMemoryClicks {
        rows: Mutex<Vec<Click>>,
    }

    impl ClickRepository for InMemoryClicks {
        fn create<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            click: Click,
        ) -> Pin<Box<dyn Future<Output = Result<Click>> + Send + 'a>> {
            Box::pin(async move {
                self.rows.lock().unwrap().push(click.clone());
                Ok(click)
            })
        }

        fn list_for_link<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            link_id: &'a str,
            _page: composable_rust_core::pagination::Page,
        ) -> Pin<Box<dyn Future<Output = Result<Paginated<Click>>> + Send + 'a>> {
            Box::pin(async move {
                let rows: Vec<Click> = self.rows.lock().unwrap().iter().filter(|c| c.link_id == link_id).cloned().collect();
                let total = i64::try_from(rows.len()).unwrap();
                Ok(Paginated::new(rows, total))
            })
        }
    }

    fn publisher() -> Arc<EventPublisher> {
        Arc::new(EventPublisher::new(Arc::new(InMemoryEventBus::new())))
    }

    #[tokio::test]
    async fn create_short_link_generates_unique_code_and_publishes_created() {
        let links = Arc::new(InMemoryLinks::default());
        let events = publisher();
        let handler = CreateShortLinkHandler::new(links.clone(), events.clone());
        let ctx = RequestContext::new(None);
        let mut cmd = CreateShortLink {
            original_url: "https://example.com/page".into(),
            ..Default::default()
        };

        handler.handle(&ctx, &mut cmd).await.unwrap();

        let created = cmd.created.expect("handler populates created link");
        assert_eq!(created.short_code.len(), SHORT_CODE_LENGTH);
        assert!(created.is_active);
    }

    #[tokio::test]
    async fn create_short_link_rejects_non_http_scheme() {
        let links = Arc::new(InMemoryLinks::default());
        let handler = CreateShortLinkHandler::new(links, publisher());
        let ctx = RequestContext::new(None);
        let mut cmd = CreateShortLink {
            original_url: "ftp://example.com/file".into(),
            ..Default::default()
        };

        let err = handler.handle(&ctx, &mut cmd).await.unwrap_err();
        assert!(matches!(err, CoreError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn create_short_link_rejects_duplicate_custom_alias() {
        let links = Arc::new(InMemoryLinks::default());
        let handler = CreateShortLinkHandler::new(links.clone(), publisher());
        let ctx = RequestContext::new(None);

        let mut first = CreateShortLink {
            original_url: "https://example.com/a".into(),
            custom_alias: Some("mylink".into()),
            ..Default::default()
        };
        handler.handle(&ctx, &mut first).await.unwrap();

        let mut second = CreateShortLink {
            original_url: "https://example.com/b".into(),
            custom_alias: Some("mylink".into()),
            ..Default::default()
        };
        let err = handler.handle(&ctx, &mut second).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn get_by_code_is_not_found_for_inactive_link() {
        let links = Arc::new(InMemoryLinks::default());
        let create_handler = CreateShortLinkHandler::new(links.clone(), publisher());
        let ctx = RequestContext::new(None);
        let mut create = CreateShortLink {
            original_url: "https://example.com".into(),
            custom_alias: Some("deadlink".into()),
            ..Default::default()
        };
        create_handler.handle(&ctx, &mut create).await.unwrap();
        let id = create.created.unwrap().id;

        let update_handler = UpdateShortLinkHandler::new(links.clone(), publisher());
        let mut update = UpdateShortLink {
            id,
            is_active: composable_rust_core::patch::Patch::Set(false),
            ..Default::default()
        };
        update_handler.handle(&ctx, &mut update).await.unwrap();

        let query_handler = GetShortLinkByCodeHandler::new(links);
        let err = query_handler
            .handle(&ctx, &GetShortLinkByCode { short_code: "deadlink".into() })
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn record_click_returns_not_found_when_link_unavailable() {
        let links = Arc::new(InMemoryLinks::default());
        let clicks = Arc::new(InMemoryClicks::default());
        let create_handler = CreateShortLinkHandler::new(links.clone(), publisher());
        let ctx = RequestContext::new(None);
        let mut create = CreateShortLink {
            original_url: "https://example.com".into(),
            expires_at: Some(Utc::now() - chrono::Duration::hours(1)),
            ..Default::default()
        };
        create_handler.handle(&ctx, &mut create).await.unwrap();
        let link_id = create.created.unwrap().id;

        let record_handler = RecordClickHandler::new(links, clicks);
        let mut cmd = RecordClick {
            link_id,
            ip: "127.0.0.1".into(),
            user_agent: "test-agent".into(),
            ..Default::default()
        };
        let err = record_handler.handle(&ctx, &mut cmd).await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn increment_click_bumps_counter_and_publishes() {
        let links = Arc::new(InMemoryLinks::default());
        let create_handler = CreateShortLinkHandler::new(links.clone(), publisher());
        let ctx = RequestContext::new(None);
        let mut create = CreateShortLink {
            original_url: "https://example.com".into(),
            custom_alias: Some("clickme".into()),
            ..Default::default()
        };
        create_handler.handle(&ctx, &mut create).await.unwrap();

        let increment_handler = IncrementClickHandler::new(links, publisher());
        let mut cmd = IncrementClick { short_code: "clickme".into(), new_click_count: None };
        increment_handler.handle(&ctx, &mut cmd).await.unwrap();
        assert_eq!(cmd.new_click_count, Some(1));
    }

    /// Repository fake whose `short_code_exists` reports `true` for every
    /// probe, counting how many times it was called.
    #[derive(Default)]
    struct AlwaysExistsLinks {
        probes: Mutex<usize>,
    }

    impl ShortLinkRepository for AlwaysExistsLinks {
        fn create<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            link: ShortLink,
        ) -> Pin<Box<dyn Future<Output = Result<ShortLink>> + Send + 'a>> {
            Box::pin(async move { Ok(link) })
        }

        fn get_by_id<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _id: &'a str,
            _include_deleted: bool,
        ) -> Pin<Box<dyn Future<Output = Result<Option<ShortLink>>> + Send + 'a>> {
            Box::pin(async move { Ok(None) })
        }

        fn get_by_short_code<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _short_code: &'a str,
            _include_deleted: bool,
        ) -> Pin<Box<dyn Future<Output = Result<Option<ShortLink>>> + Send + 'a>> {
            Box::pin(async move { Ok(None) })
        }

        fn short_code_exists<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _short_code: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<bool>> + Send + 'a>> {
            Box::pin(async move {
                *self.probes.lock().unwrap() += 1;
                Ok(true)
            })
        }

        fn list<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _page: composable_rust_core::pagination::Page,
            _include_deleted: bool,
        ) -> Pin<Box<dyn Future<Output = Result<Paginated<ShortLink>>> + Send + 'a>> {
            Box::pin(async move { Ok(Paginated::new(vec![], 0)) })
        }

        fn list_active_page<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _page: composable_rust_core::pagination::Page,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<ShortLink>>> + Send + 'a>> {
            Box::pin(async move { Ok(vec![]) })
        }

        fn update<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _link: ShortLink,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move { Ok(()) })
        }

        fn delete<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _id: &'a str,
            _now: chrono::DateTime<Utc>,
        ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move { Ok(()) })
        }
    }

    #[tokio::test]
    async fn create_short_link_reports_conflict_after_exactly_eleven_probes() {
        let links = Arc::new(AlwaysExistsLinks::default());
        let handler = CreateShortLinkHandler::new(links.clone(), publisher());
        let ctx = RequestContext::new(None);

        let err = handler.resolve_short_code(&ctx, None).await.unwrap_err();
        assert!(matches!(err, CoreError::Conflict(_)));
        assert_eq!(*links.probes.lock().unwrap(), SHORT_CODE_MAX_ATTEMPTS);
    }
}
