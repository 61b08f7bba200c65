//! Update routing and the long-polling run loop.
//!
//! One [`App`] instance owns the state store, the authorization engine
//! and the Telegram file fetcher; every update is routed through
//! [`App::handle`].

use std::sync::Arc;

use teloxide::prelude::*;
use tracing::{debug, error, info, warn};

use groupvault_core::{
    ArchiveMode, AwaitedInput, ChatKind, Identity, InboundMessage, PendingAction,
};
use groupvault_providers::google::GoogleStorage;

use crate::auth::{AuthEngine, LinkOutcome};
use crate::commands::{self, Command};
use crate::config::BotConfig;
use crate::dispatch::{self, ArchiveOutcome};
use crate::error::BotResult;
use crate::provision;
use crate::replies;
use crate::session::SessionCoordinator;
use crate::state::StateStore;
use crate::telegram::{self, TelegramFiles};

/// Shared bot application state.
pub struct App {
    config: BotConfig,
    state: tokio::sync::Mutex<StateStore>,
    auth: AuthEngine,
    files: TelegramFiles,
}

impl App {
    pub fn new(config: BotConfig, bot: Bot) -> Self {
        let sessions = Arc::new(SessionCoordinator::new());
        let auth = AuthEngine::new(config.google.clone(), sessions);
        let state = tokio::sync::Mutex::new(StateStore::load(config.state_path()));

        Self {
            config,
            state,
            auth,
            files: TelegramFiles::new(bot),
        }
    }

    /// Routes one incoming message.
    pub async fn handle(&self, bot: &Bot, message: &InboundMessage) -> BotResult<()> {
        match message.chat_kind {
            ChatKind::Private => self.handle_private(bot, message).await,
            ChatKind::Group => self.handle_group(bot, message).await,
        }
    }

    async fn lang_of(&self, user: Option<Identity>) -> String {
        let state = self.state.lock().await;
        user.and_then(|id| state.user(id))
            .map(|record| record.lang.clone())
            .unwrap_or_else(|| "en".to_string())
    }

    async fn reply(&self, bot: &Bot, chat: Identity, text: String) {
        if let Err(e) = bot.send_message(ChatId(chat.0), text).await {
            warn!(%chat, error = %e, "failed to send reply");
        }
    }

    // ----- private chats ------------------------------------------------

    async fn handle_private(&self, bot: &Bot, message: &InboundMessage) -> BotResult<()> {
        let Some(user) = message.sender.as_ref().map(|s| s.id) else {
            return Ok(());
        };
        let lang = self.lang_of(Some(user)).await;

        let command = message.text.as_deref().and_then(commands::parse);
        match command {
            Some(Command::Start) => {
                self.touch_user(user).await?;
                self.reply(bot, message.chat, replies::welcome(&lang)).await;
            }
            Some(Command::Link) => self.handle_link(bot, message, user, &lang).await?,
            Some(Command::Verify) => self.handle_verify(bot, message, user, &lang).await?,
            Some(Command::Lang(arg)) => self.handle_lang(bot, message, user, &lang, arg).await?,
            Some(_) => {
                // Group-scoped command sent in private.
                self.reply(bot, message.chat, replies::welcome(&lang)).await;
            }
            None => {
                if let Some(text) = message.text.as_deref() {
                    self.handle_awaited_input(bot, message, user, &lang, text)
                        .await?;
                }
            }
        }
        Ok(())
    }

    async fn touch_user(&self, user: Identity) -> BotResult<()> {
        let mut state = self.state.lock().await;
        state.user_mut(user);
        state.persist()
    }

    async fn handle_link(
        &self,
        bot: &Bot,
        message: &InboundMessage,
        user: Identity,
        lang: &str,
    ) -> BotResult<()> {
        let has_setup = {
            let state = self.state.lock().await;
            state.pending(user).is_some()
        };
        if !has_setup {
            self.reply(bot, message.chat, replies::link_no_setup(lang))
                .await;
            return Ok(());
        }

        match self.auth.begin_link(user).await {
            Ok(flow) => {
                self.reply(
                    bot,
                    message.chat,
                    replies::link_started(lang, &flow.user_code, &flow.verification_url),
                )
                .await;
            }
            Err(e) => {
                error!(%user, error = %e, "device flow start failed");
                self.reply(
                    bot,
                    message.chat,
                    replies::archive_outcome(lang, &ArchiveOutcome::Failed(e.to_string())),
                )
                .await;
            }
        }
        Ok(())
    }

    async fn handle_verify(
        &self,
        bot: &Bot,
        message: &InboundMessage,
        user: Identity,
        lang: &str,
    ) -> BotResult<()> {
        let outcome = match self.auth.verify(user).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(%user, error = %e, "device flow poll failed");
                self.reply(
                    bot,
                    message.chat,
                    replies::archive_outcome(lang, &ArchiveOutcome::Failed(e.to_string())),
                )
                .await;
                return Ok(());
            }
        };

        if outcome == LinkOutcome::Authorized {
            self.bind_group(bot, user).await?;
        }

        self.reply(bot, message.chat, replies::verify_outcome(lang, outcome))
            .await;
        Ok(())
    }

    /// Binds the group recorded at `/setup` to the freshly authorized
    /// identity and provisions its structure eagerly.
    async fn bind_group(&self, bot: &Bot, user: Identity) -> BotResult<()> {
        let group = {
            let mut state = self.state.lock().await;
            state.user_mut(user).creds_file = Some(self.auth.credentials().blob_path(user));
            let group = state.take_pending(user).map(|pending| pending.chat);
            if let Some(group) = group {
                state.group_mut(group).linked_user = Some(user);
            }
            state.persist()?;
            group
        };

        let Some(group) = group else {
            warn!(%user, "authorized without a pending group mapping");
            return Ok(());
        };
        info!(%user, %group, "group linked");

        // Eager provisioning; failures here are tolerated because the
        // dispatcher provisions lazily on first archive anyway.
        let title = match bot.get_chat(ChatId(group.0)).await {
            Ok(chat) => chat.title().map(String::from).unwrap_or_default(),
            Err(e) => {
                warn!(%group, error = %e, "could not fetch chat title, deferring provisioning");
                return Ok(());
            }
        };

        match self.auth.credentials().resolve(user).await {
            Ok(handle) => {
                let storage = GoogleStorage::new(&self.config.google, &handle);
                let mut state = self.state.lock().await;
                let record = state.group_mut(group);
                if let Err(e) =
                    provision::ensure(&storage, &self.config.app_name, group, &title, record).await
                {
                    warn!(%group, error = %e, "eager provisioning failed");
                }
                state.persist()?;
            }
            Err(e) => warn!(%user, error = %e, "credential resolve failed after verify"),
        }
        Ok(())
    }

    async fn handle_lang(
        &self,
        bot: &Bot,
        message: &InboundMessage,
        user: Identity,
        lang: &str,
        arg: Option<String>,
    ) -> BotResult<()> {
        let Some(requested) = arg else {
            self.reply(bot, message.chat, replies::lang_invalid(lang))
                .await;
            return Ok(());
        };

        let requested = requested.to_lowercase();
        if !replies::SUPPORTED_LANGS.contains(&requested.as_str()) {
            self.reply(bot, message.chat, replies::lang_invalid(lang))
                .await;
            return Ok(());
        }

        {
            let mut state = self.state.lock().await;
            state.user_mut(user).lang = requested.clone();
            state.persist()?;
        }
        self.reply(bot, message.chat, replies::lang_set(&requested))
            .await;
        Ok(())
    }

    /// Consumes a pending free-text input (interval or keyword list).
    async fn handle_awaited_input(
        &self,
        bot: &Bot,
        message: &InboundMessage,
        user: Identity,
        lang: &str,
        text: &str,
    ) -> BotResult<()> {
        let pending = {
            let state = self.state.lock().await;
            state
                .pending(user)
                .filter(|p| p.awaiting.is_some())
                .cloned()
        };
        let Some(pending) = pending else {
            return Ok(());
        };

        match pending.awaiting {
            Some(AwaitedInput::Interval) => {
                let Some(hours) = commands::parse_interval(text) else {
                    self.reply(bot, message.chat, replies::interval_invalid(lang))
                        .await;
                    return Ok(());
                };
                let mut state = self.state.lock().await;
                state.group_mut(pending.chat).auto.notify_interval_hours = hours;
                // Keep the chat mapping, drop the awaited marker.
                state.set_pending(user, PendingAction::new(pending.chat));
                state.persist()?;
                drop(state);
                self.reply(bot, message.chat, replies::interval_set(lang, hours))
                    .await;
            }
            Some(AwaitedInput::Keywords) => {
                let keywords = commands::parse_keywords(text);
                let count = keywords.len();
                let mut state = self.state.lock().await;
                state.group_mut(pending.chat).keywords = keywords;
                state.set_pending(user, PendingAction::new(pending.chat));
                state.persist()?;
                drop(state);
                self.reply(bot, message.chat, replies::keywords_set(lang, count))
                    .await;
            }
            None => {}
        }
        Ok(())
    }

    // ----- group chats --------------------------------------------------

    async fn handle_group(&self, bot: &Bot, message: &InboundMessage) -> BotResult<()> {
        let sender = message.sender.as_ref().map(|s| s.id);
        let lang = self.lang_of(sender).await;

        if let Some(command) = message.text.as_deref().and_then(commands::parse) {
            return self
                .handle_group_command(bot, message, sender, &lang, command)
                .await;
        }

        // Non-command group traffic: active auto mode archives
        // everything; reply mode reacts to keyword triggers.
        let (enabled, mode, auto_active, keyword_hit) = {
            let state = self.state.lock().await;
            match state.group(message.chat) {
                Some(record) => (
                    record.enabled,
                    record.mode,
                    record.auto_archives(),
                    message
                        .text
                        .as_deref()
                        .is_some_and(|t| commands::is_archive_trigger(t, record)),
                ),
                None => return Ok(()),
            }
        };
        if !enabled {
            return Ok(());
        }

        match mode {
            ArchiveMode::Auto if auto_active => {
                let outcome = self.run_archive(message).await;
                self.surface(bot, message, &lang, &outcome, false).await;
            }
            // Auto mode selected but switched off: stay idle.
            ArchiveMode::Auto => {}
            ArchiveMode::Reply => {
                if keyword_hit && message.reply_to.is_some() {
                    let outcome = self.run_archive(message).await;
                    self.surface(bot, message, &lang, &outcome, true).await;
                }
            }
        }
        Ok(())
    }

    async fn handle_group_command(
        &self,
        bot: &Bot,
        message: &InboundMessage,
        sender: Option<Identity>,
        lang: &str,
        command: Command,
    ) -> BotResult<()> {
        let Some(user) = sender else {
            return Ok(());
        };

        // `/archive` is open to every member; settings are admin-gated.
        if command == Command::Archive {
            let outcome = self.run_archive(message).await;
            self.surface(bot, message, lang, &outcome, true).await;
            return Ok(());
        }

        match telegram::is_admin(bot, message.chat, user).await {
            Ok(true) => {}
            Ok(false) => {
                self.reply(bot, message.chat, replies::admin_only(lang)).await;
                return Ok(());
            }
            Err(e) => {
                warn!(chat = %message.chat, error = %e, "admin lookup failed");
                return Ok(());
            }
        }

        match command {
            Command::Setup => {
                let mut state = self.state.lock().await;
                state.user_mut(user);
                state.set_pending(user, PendingAction::new(message.chat));
                state.group_mut(message.chat);
                state.persist()?;
                drop(state);
                self.reply(bot, message.chat, replies::setup_done(lang)).await;
            }
            Command::Unlink => {
                let mut state = self.state.lock().await;
                state.group_mut(message.chat).unlink();
                state.persist()?;
                drop(state);
                self.reply(bot, message.chat, replies::unlinked(lang)).await;
            }
            Command::Mode => {
                let auto = {
                    let mut state = self.state.lock().await;
                    let record = state.group_mut(message.chat);
                    record.mode = match record.mode {
                        ArchiveMode::Reply => ArchiveMode::Auto,
                        ArchiveMode::Auto => ArchiveMode::Reply,
                    };
                    // Keep the auto switch in lockstep with the mode.
                    record.auto.enabled = record.mode == ArchiveMode::Auto;
                    let auto = record.auto.enabled;
                    state.persist()?;
                    auto
                };
                self.reply(bot, message.chat, replies::mode_set(lang, auto))
                    .await;
            }
            Command::AutoArchive => {
                let auto = {
                    let mut state = self.state.lock().await;
                    let record = state.group_mut(message.chat);
                    record.auto.enabled = !record.auto.enabled;
                    record.mode = if record.auto.enabled {
                        ArchiveMode::Auto
                    } else {
                        ArchiveMode::Reply
                    };
                    let auto = record.auto.enabled;
                    state.persist()?;
                    auto
                };
                self.reply(bot, message.chat, replies::mode_set(lang, auto))
                    .await;
            }
            Command::Interval(Some(arg)) => {
                let reply = match commands::parse_interval(&arg) {
                    Some(hours) => {
                        let mut state = self.state.lock().await;
                        state.group_mut(message.chat).auto.notify_interval_hours = hours;
                        state.persist()?;
                        replies::interval_set(lang, hours)
                    }
                    None => replies::interval_invalid(lang),
                };
                self.reply(bot, message.chat, reply).await;
            }
            Command::Interval(None) => {
                let mut state = self.state.lock().await;
                state.set_pending(
                    user,
                    PendingAction::awaiting(message.chat, AwaitedInput::Interval),
                );
                state.persist()?;
                drop(state);
                self.reply(bot, message.chat, replies::interval_prompt(lang))
                    .await;
            }
            Command::Keywords(Some(arg)) => {
                let keywords = commands::parse_keywords(&arg);
                let count = keywords.len();
                let mut state = self.state.lock().await;
                state.group_mut(message.chat).keywords = keywords;
                state.persist()?;
                drop(state);
                self.reply(bot, message.chat, replies::keywords_set(lang, count))
                    .await;
            }
            Command::Keywords(None) => {
                let mut state = self.state.lock().await;
                state.set_pending(
                    user,
                    PendingAction::awaiting(message.chat, AwaitedInput::Keywords),
                );
                state.persist()?;
                drop(state);
                self.reply(bot, message.chat, replies::keywords_prompt(lang))
                    .await;
            }
            Command::Start | Command::Link | Command::Verify | Command::Lang(_) => {
                self.reply(bot, message.chat, replies::setup_group_only(lang))
                    .await;
            }
            Command::Archive => unreachable!("handled above"),
        }
        Ok(())
    }

    // ----- archiving ----------------------------------------------------

    /// Runs the full precondition chain and one archive attempt.
    ///
    /// Order: enabled, source selection per mode, credential resolve,
    /// then the dispatcher. The group record is persisted afterwards
    /// in every case because inline provisioning may have added refs.
    async fn run_archive(&self, message: &InboundMessage) -> ArchiveOutcome {
        let group = message.chat;
        let mut state = self.state.lock().await;
        let outcome = {
            let record = state.group_mut(group);

            if !record.enabled {
                ArchiveOutcome::NotEnabled
            } else {
                match dispatch::select_source(message, record.mode) {
                    Err(outcome) => outcome,
                    Ok(source) => match record.linked_user {
                        None => ArchiveOutcome::NotLinked,
                        Some(owner) => match self.auth.credentials().resolve(owner).await {
                            Err(e) => {
                                debug!(%owner, error = %e, "credential resolve failed");
                                dispatch::outcome_for_credentials(&e)
                            }
                            Ok(handle) => {
                                let storage = GoogleStorage::new(&self.config.google, &handle);
                                let dispatcher = dispatch::Dispatcher {
                                    provider: &storage,
                                    files: &self.files,
                                    scratch_dir: &self.config.scratch_dir,
                                    app_name: &self.config.app_name,
                                };
                                dispatcher.archive(source, group, record).await
                            }
                        },
                    },
                }
            }
        };

        if let Err(e) = state.persist() {
            error!(%group, error = %e, "failed to persist state after archive");
        }
        outcome
    }

    /// Reports an archive outcome back to the chat.
    ///
    /// Reply mode surfaces everything; auto mode stays silent except
    /// for a revoked credential, which needs the user to act.
    async fn surface(
        &self,
        bot: &Bot,
        message: &InboundMessage,
        lang: &str,
        outcome: &ArchiveOutcome,
        reply_mode: bool,
    ) {
        if reply_mode || *outcome == ArchiveOutcome::RelinkRequired {
            self.reply(bot, message.chat, replies::archive_outcome(lang, outcome))
                .await;
        } else {
            debug!(chat = %message.chat, ?outcome, "auto archive outcome");
        }
    }
}

/// Starts long polling and blocks until shutdown.
pub async fn run(config: BotConfig) -> BotResult<()> {
    let bot = Bot::new(&config.bot_token);
    let app = Arc::new(App::new(config, bot.clone()));

    info!("starting Telegram long polling");

    let handler = Update::filter_message().endpoint(
        |bot: Bot, msg: Message, app: Arc<App>| async move {
            let inbound = telegram::to_inbound(&msg);
            if let Err(e) = app.handle(&bot, &inbound).await {
                error!(chat = inbound.chat.0, error = %e, "update handling failed");
            }
            respond(())
        },
    );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
