//! Command/query handlers for the chat-ingestion service (spec §4.4, §4.8, §4.9).

use crate::commands::{
    CreateChatCommand, CreateClip, CreateMessage, CreateStream, DeleteChatCommand, EndStream,
    ExecuteChatCommand, UpdateChatCommand, UpdateStream,
};
use crate::events::TwitchbotEvent;
use crate::model::{ChannelViewer, ChatCommand, Clip, Message, Stream, Viewer};
use crate::queries::{
    GetActiveStream, ListChatCommands, ListClipsForStream, ListMessagesForStream, ListStreams,
};
use crate::repository::{
    ChannelViewerRepository, ChatCommandRepository, ClipRepository, MessageRepository,
    StreamRepository, ViewerRepository,
};
use chrono::Utc;
use composable_rust_core::command::CommandHandler;
use composable_rust_core::context::RequestContext;
use composable_rust_core::error::Result;
use composable_rust_core::model::new_id;
use composable_rust_core::pagination::Paginated;
use composable_rust_core::publisher::EventPublisher;
use composable_rust_core::query::QueryHandler;
use composable_rust_core::CoreError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Handles [`CreateStream`], dispatched by the stream poller when a joined
/// channel transitions to live (spec §4.5).
pub struct CreateStreamHandler {
    streams: Arc<dyn StreamRepository>,
    events: Arc<EventPublisher>,
}

impl CreateStreamHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(streams: Arc<dyn StreamRepository>, events: Arc<EventPublisher>) -> Self {
        Self { streams, events }
    }
}

impl CommandHandler<CreateStream> for CreateStreamHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateStream,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();
            let stream = Stream {
                id: new_id(),
                channel: cmd.channel.clone(),
                title: cmd.title.clone(),
                game_name: cmd.game_name.clone(),
                game_id: cmd.game_id.clone(),
                started_at: now,
                ended_at: None,
                peak_viewers: cmd.initial_viewers,
                rolling_avg_viewers: cmd.initial_viewers,
                total_message_count: 0,
                is_active: true,
                deleted_at: None,
            };

            let created = self.streams.create(ctx, stream).await?;
            let event = TwitchbotEvent::stream_started(&created);
            self.events.publish(&event.topic(), &created.id, &event).await;

            cmd.aggregate_id = Some(created.id.clone());
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`UpdateStream`] (spec §4.5: peak/rolling-average viewer update).
pub struct UpdateStreamHandler {
    streams: Arc<dyn StreamRepository>,
    events: Arc<EventPublisher>,
}

impl UpdateStreamHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(streams: Arc<dyn StreamRepository>, events: Arc<EventPublisher>) -> Self {
        Self { streams, events }
    }
}

impl CommandHandler<UpdateStream> for UpdateStreamHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut UpdateStream,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let mut stream = self
                .streams
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("Stream"))?;

            cmd.title.clone().apply_to(&mut stream.title);
            cmd.game_name.clone().apply_to(&mut stream.game_name);
            cmd.game_id.clone().apply_to(&mut stream.game_id);

            if let Some(current) = cmd.current_viewers {
                stream.peak_viewers = stream.peak_viewers.max(current);
                stream.rolling_avg_viewers = (stream.rolling_avg_viewers + current) / 2;
            }

            self.streams.update(ctx, stream.clone()).await?;

            let event = TwitchbotEvent::StreamUpdated { id: stream.id.clone() };
            self.events.publish(&event.topic(), &stream.id, &event).await;
            Ok(())
        })
    }
}

/// Handles [`EndStream`] (spec §4.5): idempotent against an already-ended
/// stream, used by both the stream poller and the inactive-stream closer.
pub struct EndStreamHandler {
    streams: Arc<dyn StreamRepository>,
    events: Arc<EventPublisher>,
}

impl EndStreamHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(streams: Arc<dyn StreamRepository>, events: Arc<EventPublisher>) -> Self {
        Self { streams, events }
    }
}

impl CommandHandler<EndStream> for EndStreamHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut EndStream,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let Some(mut stream) = self.streams.get_by_id(ctx, &cmd.id).await? else {
                return Err(CoreError::not_found("Stream"));
            };

            if !stream.is_active {
                return Ok(());
            }

            stream.is_active = false;
            stream.ended_at = Some(Utc::now());
            self.streams.update(ctx, stream.clone()).await?;

            let event = TwitchbotEvent::stream_ended(&stream);
            self.events.publish(&event.topic(), &stream.id, &event).await;
            Ok(())
        })
    }
}

/// Handles [`CreateMessage`] (spec §4.4, §4.8): persists the message and
/// upserts the sender's Viewer/ChannelViewer rows and the stream's running
/// message count.
pub struct CreateMessageHandler {
    streams: Arc<dyn StreamRepository>,
    messages: Arc<dyn MessageRepository>,
    viewers: Arc<dyn ViewerRepository>,
    channel_viewers: Arc<dyn ChannelViewerRepository>,
    events: Arc<EventPublisher>,
}

impl CreateMessageHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(
        streams: Arc<dyn StreamRepository>,
        messages: Arc<dyn MessageRepository>,
        viewers: Arc<dyn ViewerRepository>,
        channel_viewers: Arc<dyn ChannelViewerRepository>,
        events: Arc<EventPublisher>,
    ) -> Self {
        Self { streams, messages, viewers, channel_viewers, events }
    }

    async fn upsert_viewer(&self, ctx: &RequestContext, cmd: &CreateMessage, now: chrono::DateTime<Utc>) -> Result<Viewer> {
        if let Some(mut viewer) = self.viewers.get_by_user_id(ctx, &cmd.user_id).await? {
            viewer.username = cmd.username.clone();
            viewer.display_name = cmd.display_name.clone();
            viewer.last_seen = now;
            viewer.total_messages += 1;
            self.viewers.update(ctx, viewer.clone()).await?;
            Ok(viewer)
        } else {
            let viewer = Viewer {
                id: new_id(),
                user_id: cmd.user_id.clone(),
                username: cmd.username.clone(),
                display_name: cmd.display_name.clone(),
                first_seen: now,
                last_seen: now,
                total_messages: 1,
                total_streams_watched: 1,
                deleted_at: None,
            };
            self.viewers.create(ctx, viewer).await
        }
    }

    /// Upsert the per-channel presence row. `total_streams_watched` on the
    /// global viewer is approximated by first-appearance-per-channel, since
    /// this service has no separate viewer/stream join table (spec is
    /// silent on the exact accounting; see DESIGN.md).
    async fn upsert_channel_viewer(
        &self,
        ctx: &RequestContext,
        cmd: &CreateMessage,
        viewer_id: &str,
        now: chrono::DateTime<Utc>,
    ) -> Result<()> {
        if let Some(mut row) = self.channel_viewers.get(ctx, viewer_id, &cmd.channel).await? {
            row.username = cmd.username.clone();
            row.display_name = cmd.display_name.clone();
            row.last_seen = now;
            row.is_moderator = row.is_moderator || cmd.is_moderator;
            row.is_vip = row.is_vip || cmd.is_vip;
            self.channel_viewers.update(ctx, row).await
        } else {
            let row = ChannelViewer {
                id: new_id(),
                viewer_id: viewer_id.to_string(),
                channel: cmd.channel.clone(),
                username: cmd.username.clone(),
                display_name: cmd.display_name.clone(),
                first_seen: now,
                last_seen: now,
                is_moderator: cmd.is_moderator,
                is_vip: cmd.is_vip,
                deleted_at: None,
            };
            self.channel_viewers.create(ctx, row).await.map(|_| ())
        }
    }
}

impl CommandHandler<CreateMessage> for CreateMessageHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateMessage,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();

            let message = Message {
                id: new_id(),
                stream_id: cmd.stream_id.clone(),
                channel: cmd.channel.clone(),
                user_id: cmd.user_id.clone(),
                username: cmd.username.clone(),
                display_name: cmd.display_name.clone(),
                body: cmd.body.clone(),
                is_moderator: cmd.is_moderator,
                is_subscriber: cmd.is_subscriber,
                is_vip: cmd.is_vip,
                is_broadcaster: cmd.is_broadcaster,
                sent_at: now,
                deleted_at: None,
            };
            let created = self.messages.create(ctx, message).await?;

            let viewer = self.upsert_viewer(ctx, cmd, now).await?;
            self.upsert_channel_viewer(ctx, cmd, &viewer.id, now).await?;

            if let Some(mut stream) = self.streams.get_by_id(ctx, &cmd.stream_id).await? {
                stream.total_message_count += 1;
                self.streams.update(ctx, stream).await?;
            }

            let event = TwitchbotEvent::message_received(&created);
            self.events.publish(&event.topic(), &created.id, &event).await;

            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`ExecuteChatCommand`] (spec §4.8, §4.9): permission, cooldown,
/// and bookkeeping for a `!`-prefixed chat invocation.
pub struct ExecuteChatCommandHandler {
    commands: Arc<dyn ChatCommandRepository>,
    events: Arc<EventPublisher>,
}

impl ExecuteChatCommandHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(commands: Arc<dyn ChatCommandRepository>, events: Arc<EventPublisher>) -> Self {
        Self { commands, events }
    }
}

impl CommandHandler<ExecuteChatCommand> for ExecuteChatCommandHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut ExecuteChatCommand,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let now = Utc::now();
            let mut stored = self
                .commands
                .get_by_name(ctx, &cmd.name)
                .await?
                .ok_or_else(|| CoreError::not_found("ChatCommand"))?;

            if !stored.is_active {
                return Err(CoreError::NotAuthorized(format!("command {} is inactive", cmd.name)));
            }
            if !stored.permits(cmd.invoker_is_moderator, cmd.invoker_is_subscriber) {
                return Err(CoreError::NotAuthorized(format!("command {} requires higher privileges", cmd.name)));
            }
            if stored.is_on_cooldown(now) {
                return Err(CoreError::RateLimited(format!("command {} is on cooldown", cmd.name)));
            }

            stored.usage_count += 1;
            stored.last_used = Some(now);
            self.commands.update(ctx, stored.clone()).await?;

            let event = TwitchbotEvent::CommandExecuted { id: stored.id.clone(), name: stored.name.clone() };
            self.events.publish(&event.topic(), &stored.id, &event).await;

            cmd.response = Some(stored.response_template);
            Ok(())
        })
    }
}

/// Handles [`CreateChatCommand`] (admin registration).
pub struct CreateChatCommandHandler {
    commands: Arc<dyn ChatCommandRepository>,
}

impl CreateChatCommandHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(commands: Arc<dyn ChatCommandRepository>) -> Self {
        Self { commands }
    }
}

impl CommandHandler<CreateChatCommand> for CreateChatCommandHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateChatCommand,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            if self.commands.get_by_name(ctx, &cmd.name).await?.is_some() {
                return Err(CoreError::conflict("name"));
            }

            let command = ChatCommand {
                id: new_id(),
                name: cmd.name.clone(),
                response_template: cmd.response_template.clone(),
                is_active: true,
                moderator_only: cmd.moderator_only,
                subscriber_only: cmd.subscriber_only,
                cooldown_seconds: cmd.cooldown_seconds,
                usage_count: 0,
                last_used: None,
                deleted_at: None,
            };
            let created = self.commands.create(ctx, command).await?;
            cmd.aggregate_id = Some(created.id);
            Ok(())
        })
    }
}

/// Handles [`UpdateChatCommand`] (spec §4.4 explicit-presence update).
pub struct UpdateChatCommandHandler {
    commands: Arc<dyn ChatCommandRepository>,
}

impl UpdateChatCommandHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(commands: Arc<dyn ChatCommandRepository>) -> Self {
        Self { commands }
    }
}

impl CommandHandler<UpdateChatCommand> for UpdateChatCommandHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut UpdateChatCommand,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let mut command = self
                .commands
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ChatCommand"))?;

            cmd.response_template.clone().apply_to(&mut command.response_template);
            cmd.is_active.clone().apply_to(&mut command.is_active);
            cmd.moderator_only.clone().apply_to(&mut command.moderator_only);
            cmd.subscriber_only.clone().apply_to(&mut command.subscriber_only);
            cmd.cooldown_seconds.clone().apply_to(&mut command.cooldown_seconds);

            self.commands.update(ctx, command).await
        })
    }
}

/// Handles [`DeleteChatCommand`] (soft-delete).
pub struct DeleteChatCommandHandler {
    commands: Arc<dyn ChatCommandRepository>,
}

impl DeleteChatCommandHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(commands: Arc<dyn ChatCommandRepository>) -> Self {
        Self { commands }
    }
}

impl CommandHandler<DeleteChatCommand> for DeleteChatCommandHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut DeleteChatCommand,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            let mut command = self
                .commands
                .get_by_id(ctx, &cmd.id)
                .await?
                .ok_or_else(|| CoreError::not_found("ChatCommand"))?;
            command.deleted_at = Some(Utc::now());
            self.commands.update(ctx, command).await
        })
    }
}

/// Handles [`CreateClip`].
pub struct CreateClipHandler {
    streams: Arc<dyn StreamRepository>,
    clips: Arc<dyn ClipRepository>,
}

impl CreateClipHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(streams: Arc<dyn StreamRepository>, clips: Arc<dyn ClipRepository>) -> Self {
        Self { streams, clips }
    }
}

impl CommandHandler<CreateClip> for CreateClipHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        cmd: &'a mut CreateClip,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            if self.streams.get_by_id(ctx, &cmd.stream_id).await?.is_none() {
                return Err(CoreError::not_found("Stream"));
            }

            let clip = Clip {
                id: new_id(),
                stream_id: cmd.stream_id.clone(),
                external_clip_id: cmd.external_clip_id.clone(),
                title: cmd.title.clone(),
                url: cmd.url.clone(),
                embed_url: cmd.embed_url.clone(),
                thumbnail_url: cmd.thumbnail_url.clone(),
                creator: cmd.creator.clone(),
                view_count: cmd.view_count,
                duration_seconds: cmd.duration_seconds,
                external_created_at: cmd.external_created_at,
                deleted_at: None,
            };
            let created = self.clips.create(ctx, clip).await?;
            cmd.created = Some(created);
            Ok(())
        })
    }
}

/// Handles [`GetActiveStream`] (spec §6).
pub struct GetActiveStreamHandler {
    streams: Arc<dyn StreamRepository>,
}

impl GetActiveStreamHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(streams: Arc<dyn StreamRepository>) -> Self {
        Self { streams }
    }
}

impl QueryHandler<GetActiveStream> for GetActiveStreamHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a GetActiveStream,
    ) -> Pin<Box<dyn Future<Output = Result<Option<Stream>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.streams.get_active_for_channel(ctx, &query.channel).await
        })
    }
}

/// Handles [`ListStreams`].
pub struct ListStreamsHandler {
    streams: Arc<dyn StreamRepository>,
}

impl ListStreamsHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(streams: Arc<dyn StreamRepository>) -> Self {
        Self { streams }
    }
}

impl QueryHandler<ListStreams> for ListStreamsHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListStreams,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<Stream>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.streams.list(ctx, query.page).await
        })
    }
}

/// Handles [`ListMessagesForStream`].
pub struct ListMessagesForStreamHandler {
    messages: Arc<dyn MessageRepository>,
}

impl ListMessagesForStreamHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(messages: Arc<dyn MessageRepository>) -> Self {
        Self { messages }
    }
}

impl QueryHandler<ListMessagesForStream> for ListMessagesForStreamHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListMessagesForStream,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<Message>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.messages.list_for_stream(ctx, &query.stream_id, query.page).await
        })
    }
}

/// Handles [`ListClipsForStream`].
pub struct ListClipsForStreamHandler {
    clips: Arc<dyn ClipRepository>,
}

impl ListClipsForStreamHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(clips: Arc<dyn ClipRepository>) -> Self {
        Self { clips }
    }
}

impl QueryHandler<ListClipsForStream> for ListClipsForStreamHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListClipsForStream,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<Clip>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.clips.list_for_stream(ctx, &query.stream_id, query.page).await
        })
    }
}

/// Handles [`ListChatCommands`].
pub struct ListChatCommandsHandler {
    commands: Arc<dyn ChatCommandRepository>,
}

impl ListChatCommandsHandler {
    /// Build a new handler.
    #[must_use]
    pub fn new(commands: Arc<dyn ChatCommandRepository>) -> Self {
        Self { commands }
    }
}

impl QueryHandler<ListChatCommands> for ListChatCommandsHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a RequestContext,
        query: &'a ListChatCommands,
    ) -> Pin<Box<dyn Future<Output = Result<Paginated<ChatCommand>>> + Send + 'a>> {
        Box::pin(async move {
            ctx.check_cancelled()?;
            self.commands.list(ctx, query.page).await
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use composable_rust_core::pagination::Page;
    use composable_rust_testing::InMemoryEventBus;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryStreams {
        by_id: Mutex<HashMap<String, Stream>>,
    }

    impl StreamRepository for InMemoryStreams {
        fn create<'a>(&'a self, _ctx: &'a RequestContext, stream: Stream) -> Pin<Box<dyn Future<Output = Result<Stream>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(stream.id.clone(), stream.clone());
                Ok(stream)
            })
        }

        fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Stream>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.by_id.lock().unwrap().get(id).cloned()) })
        }

        fn get_active_for_channel<'a>(&'a self, _ctx: &'a RequestContext, channel: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<Stream>>> + Send + 'a>> {
            Box::pin(async move {
                Ok(self.by_id.lock().unwrap().values().find(|s| s.channel == channel && s.is_active).cloned())
            })
        }

        fn list_active_stale<'a>(
            &'a self,
            _ctx: &'a RequestContext,
            _older_than: chrono::DateTime<Utc>,
            _page: Page,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<Stream>>> + Send + 'a>> {
            Box::pin(async move { Ok(vec![]) })
        }

        fn list<'a>(&'a self, _ctx: &'a RequestContext, _page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<Stream>>> + Send + 'a>> {
            Box::pin(async move { Ok(Paginated::new(vec![], 0)) })
        }

        fn update<'a>(&'a self, _ctx: &'a RequestContext, stream: Stream) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(stream.id.clone(), stream);
                Ok(())
            })
        }
    }

    #[derive(Default)]
    struct InMemoryChatCommands {
        by_id: Mutex<HashMap<String, ChatCommand>>,
    }

    impl ChatCommandRepository for InMemoryChatCommands {
        fn get_by_name<'a>(&'a self, _ctx: &'a RequestContext, name: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChatCommand>>> + Send + 'a>> {
            Box::pin(async move {
                Ok(self.by_id.lock().unwrap().values().find(|c| c.name == name && c.deleted_at.is_none()).cloned())
            })
        }

        fn get_by_id<'a>(&'a self, _ctx: &'a RequestContext, id: &'a str) -> Pin<Box<dyn Future<Output = Result<Option<ChatCommand>>> + Send + 'a>> {
            Box::pin(async move { Ok(self.by_id.lock().unwrap().get(id).cloned()) })
        }

        fn create<'a>(&'a self, _ctx: &'a RequestContext, command: ChatCommand) -> Pin<Box<dyn Future<Output = Result<ChatCommand>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(command.id.clone(), command.clone());
                Ok(command)
            })
        }

        fn list<'a>(&'a self, _ctx: &'a RequestContext, _page: Page) -> Pin<Box<dyn Future<Output = Result<Paginated<ChatCommand>>> + Send + 'a>> {
            Box::pin(async move { Ok(Paginated::new(vec![], 0)) })
        }

        fn update<'a>(&'a self, _ctx: &'a RequestContext, command: ChatCommand) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
            Box::pin(async move {
                self.by_id.lock().unwrap().insert(command.id.clone(), command);
                Ok(())
            })
        }
    }

    fn publisher() -> Arc<EventPublisher> {
        Arc::new(EventPublisher::new(Arc::new(InMemoryEventBus::new())))
    }

    #[tokio::test]
    async fn create_stream_seeds_peak_and_average_from_initial_viewers() {
        let streams = Arc::new(InMemoryStreams::default());
        let handler = CreateStreamHandler::new(streams, publisher());
        let ctx = RequestContext::new(None);
        let mut cmd = CreateStream { channel: "somechannel".into(), initial_viewers: 42, ..Default::default() };

        handler.handle(&ctx, &mut cmd).await.unwrap();

        let created = cmd.created.expect("handler populates created stream");
        assert_eq!(created.peak_viewers, 42);
        assert_eq!(created.rolling_avg_viewers, 42);
        assert!(created.is_active);
    }

    #[tokio::test]
    async fn update_stream_tracks_peak_and_rolling_average() {
        let streams = Arc::new(InMemoryStreams::default());
        let create_handler = CreateStreamHandler::new(streams.clone(), publisher());
        let ctx = RequestContext::new(None);
        let mut create = CreateStream { channel: "c".into(), initial_viewers: 10, ..Default::default() };
        create_handler.handle(&ctx, &mut create).await.unwrap();
        let id = create.created.unwrap().id;

        let update_handler = UpdateStreamHandler::new(streams.clone(), publisher());
        let mut update = UpdateStream { id, current_viewers: Some(20), ..Default::default() };
        update_handler.handle(&ctx, &mut update).await.unwrap();

        let stream = streams.get_by_id(&ctx, &update.id).await.unwrap().unwrap();
        assert_eq!(stream.peak_viewers, 20);
        assert_eq!(stream.rolling_avg_viewers, 15);
    }

    #[tokio::test]
    async fn end_stream_is_idempotent() {
        let streams = Arc::new(InMemoryStreams::default());
        let create_handler = CreateStreamHandler::new(streams.clone(), publisher());
        let ctx = RequestContext::new(None);
        let mut create = CreateStream { channel: "c".into(), initial_viewers: 1, ..Default::default() };
        create_handler.handle(&ctx, &mut create).await.unwrap();
        let id = create.created.unwrap().id;

        let end_handler = EndStreamHandler::new(streams, publisher());
        let mut end = EndStream { id: id.clone() };
        end_handler.handle(&ctx, &mut end).await.unwrap();
        end_handler.handle(&ctx, &mut EndStream { id }).await.unwrap();
    }

    #[tokio::test]
    async fn execute_chat_command_enforces_cooldown() {
        let commands = Arc::new(InMemoryChatCommands::default());
        let create_handler = CreateChatCommandHandler::new(commands.clone());
        let ctx = RequestContext::new(None);
        let mut create = CreateChatCommand {
            name: "hello".into(),
            response_template: "hi there".into(),
            cooldown_seconds: 60,
            ..Default::default()
        };
        create_handler.handle(&ctx, &mut create).await.unwrap();

        let exec_handler = ExecuteChatCommandHandler::new(commands, publisher());
        let mut first = ExecuteChatCommand { name: "hello".into(), ..Default::default() };
        exec_handler.handle(&ctx, &mut first).await.unwrap();
        assert_eq!(first.response, Some("hi there".into()));

        let mut second = ExecuteChatCommand { name: "hello".into(), ..Default::default() };
        let err = exec_handler.handle(&ctx, &mut second).await.unwrap_err();
        assert!(matches!(err, CoreError::RateLimited(_)));
    }

    #[tokio::test]
    async fn execute_chat_command_rejects_subscriber_only_for_plain_viewer() {
        let commands = Arc::new(InMemoryChatCommands::default());
        let create_handler = CreateChatCommandHandler::new(commands.clone());
        let ctx = RequestContext::new(None);
        let mut create = CreateChatCommand {
            name: "subonly".into(),
            response_template: "subs rule".into(),
            subscriber_only: true,
            ..Default::default()
        };
        create_handler.handle(&ctx, &mut create).await.unwrap();

        let exec_handler = ExecuteChatCommandHandler::new(commands, publisher());
        let mut cmd = ExecuteChatCommand { name: "subonly".into(), ..Default::default() };
        let err = exec_handler.handle(&ctx, &mut cmd).await.unwrap_err();
        assert!(matches!(err, CoreError::NotAuthorized(_)));

        let mut moderator_cmd = ExecuteChatCommand {
            name: "subonly".into(),
            invoker_is_moderator: true,
            ..Default::default()
        };
        exec_handler.handle(&ctx, &mut moderator_cmd).await.unwrap();
    }
}
