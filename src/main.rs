use std::env;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use matchchat::api::ApiClient;
use matchchat::attachments::{attachment_summaries, AttachmentDownloader};
use matchchat::config::ClientConfig;
use matchchat::conversation::list::ConversationList;
use matchchat::conversation::window::{requested_window, UrlLocation, WindowKeys};
use matchchat::conversation::{ConversationView, EmitOutcome};
use matchchat::model::message::{Language, Message};
use matchchat::notify::{toast_channel, ToastLevel, Toaster};
use matchchat::storage::DownloadDir;
use matchchat::ws::{InboundEvent, SocketClient, SocketTransport};

const USAGE: &str = "usage: matchchat <conversation-id> [location-url]";

/// Everything the command loop works on.
struct Session {
    api: ApiClient,
    page_size: usize,
    view: ConversationView,
    location: UrlLocation,
    threads: ConversationList,
    threads_location: UrlLocation,
    downloader: AttachmentDownloader,
    toaster: Toaster,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // -----------------------------
    // Logging
    // -----------------------------
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::from_env()?;
    let args: Vec<String> = env::args().skip(1).collect();
    let conversation_id = args.first().cloned().context(USAGE)?;
    let mut location = match args.get(1) {
        Some(raw) => UrlLocation::parse(raw)?,
        None => UrlLocation::parse(&format!("matchchat://messages/{conversation_id}"))?,
    };

    // -----------------------------
    // Initial history
    // -----------------------------
    let api = ApiClient::new(&config.api_url, config.token.clone())?;
    let (page, page_size) = requested_window(&location, WindowKeys::MESSAGES, config.page_size);
    let history = api
        .conversation_messages(&conversation_id, page, page_size)
        .await
        .with_context(|| format!("failed to load conversation {conversation_id}"))?;

    let mut threads = ConversationList::new(config.user_id.clone());
    let mut threads_location = UrlLocation::parse("matchchat://messages")?;
    let (list_page, list_size) =
        requested_window(&threads_location, WindowKeys::CONVERSATIONS, config.page_size);
    match api.conversations(list_page, list_size).await {
        Ok(page) => threads.load(page, &mut threads_location),
        Err(err) => warn!(error = %err, "conversation list unavailable"),
    }
    let partner = threads
        .get(&conversation_id)
        .and_then(|c| c.partner_id(&config.user_id))
        .map(str::to_string)
        .or_else(|| partner_from_messages(&history.items, &config.user_id));

    // -----------------------------
    // Socket + view
    // -----------------------------
    let (socket, mut events) = SocketClient::connect(&config.socket_url, Some(&config.token)).await?;
    let transport: Arc<dyn SocketTransport> = Arc::new(socket.clone());

    let mut view = ConversationView::new(config.user_id.clone(), conversation_id.clone(), transport);
    view.set_language(config.language);
    view.load(history, &mut location);
    if let Some(partner) = partner.as_deref() {
        view.set_partner(partner);
    }

    let downloader = AttachmentDownloader::new(DownloadDir::new(&config.download_dir).await?);
    let (toaster, mut toasts) = toast_channel();

    info!(
        conversation_id = conversation_id.as_str(),
        partner = partner.as_deref().unwrap_or(""),
        location = location.url().as_str(),
        "conversation ready"
    );

    let mut session = Session {
        api,
        page_size: config.page_size,
        view,
        location,
        threads,
        threads_location,
        downloader,
        toaster,
    };
    session.render();

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(event) => {
                    if let InboundEvent::NewMessage(msg) = &event {
                        session.threads.note_message(msg);
                    }
                    if session.view.handle_event(event) {
                        session.render();
                    }
                }
                None => {
                    warn!("socket closed by server");
                    break;
                }
            },
            line = stdin.next_line() => match line? {
                Some(line) => {
                    if !session.run_command(line.trim()).await {
                        break;
                    }
                }
                None => break,
            },
            Some(toast) = toasts.recv() => match toast.level {
                ToastLevel::Info => info!(toast = toast.text.as_str(), "notice"),
                ToastLevel::Error => warn!(toast = toast.text.as_str(), "notice"),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    socket.disconnect();
    Ok(())
}

fn partner_from_messages(messages: &[Message], me: &str) -> Option<String> {
    messages.iter().find_map(|m| {
        if m.sender_id == me {
            Some(m.receiver_id.clone())
        } else if m.receiver_id == me {
            Some(m.sender_id.clone())
        } else {
            None
        }
    })
}

impl Session {
    /// Returns `false` when the user asked to quit.
    async fn run_command(&mut self, line: &str) -> bool {
        if line.is_empty() {
            return true;
        }
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();

        let outcome = match cmd {
            "/quit" => return false,
            "/more" => {
                self.reveal_older().await;
                self.render();
                return true;
            }
            "/threads" => {
                if rest == "more" {
                    // scrolling to the bottom of the list
                    self.threads.on_sentinel(true, &mut self.threads_location);
                    self.threads.on_sentinel(false, &mut self.threads_location);
                }
                self.render_threads();
                return true;
            }
            "/lang" => {
                self.view.set_language(Language::from_code(rest));
                self.render();
                return true;
            }
            "/reply" => {
                let (target, text) = rest.split_once(' ').unwrap_or((rest, ""));
                self.view.send_message(text, Some(target))
            }
            "/delete" => self.view.toggle_deletion(rest, true),
            "/restore" => self.view.toggle_deletion(rest, false),
            "/rmatt" => {
                let (message_id, attachment_id) = rest.split_once(' ').unwrap_or((rest, ""));
                self.view.delete_attachment(attachment_id.trim(), message_id)
            }
            "/download" => {
                match self.view.store().get(rest) {
                    Some(msg) if !msg.is_deleted && !msg.attachments.is_empty() => {
                        for att in &msg.attachments {
                            self.downloader.spawn_download(att.clone(), self.toaster.clone());
                        }
                    }
                    _ => self.toaster.error(format!("No attachments for {rest}")),
                }
                return true;
            }
            _ if cmd.starts_with('/') => {
                warn!(command = cmd, "unknown command");
                return true;
            }
            _ => self.view.send_message(line, None),
        };

        if outcome == EmitOutcome::Dropped {
            warn!(command = cmd, "not sent; socket unavailable or nothing to send");
        }
        true
    }

    /// Scrolling to the top brings the sentinel into view and back out. When the
    /// grown window reaches past the loaded history, the page the location now
    /// describes is fetched and merged.
    async fn reveal_older(&mut self) {
        let grown = self.view.on_sentinel(true, &mut self.location);
        self.view.on_sentinel(false, &mut self.location);

        let Some(size) = grown else {
            info!("all history is visible");
            return;
        };
        info!(window = size, location = self.location.url().as_str(), "window grown");
        if !self.view.needs_history() {
            return;
        }

        let (page, page_size) =
            requested_window(&self.location, WindowKeys::MESSAGES, self.page_size);
        let conversation_id = self.view.conversation_id().to_string();
        let fetched = self
            .api
            .conversation_messages(&conversation_id, page, page_size)
            .await;
        match fetched {
            Ok(history) => {
                let added = self.view.merge_history(history);
                info!(added, "older messages loaded");
            }
            Err(err) => {
                warn!(error = %err, "history fetch failed");
                self.toaster.error("Could not load older messages");
            }
        }
    }

    fn render(&self) {
        let view = &self.view;
        let status = if view.is_partner_online() { "online" } else { "offline" };
        println!(
            "--- {} ({} of {} messages, partner {status}) ---",
            view.conversation_id(),
            view.visible().len(),
            view.store().len()
        );

        for row in view.visible() {
            let msg = row.message;
            if row.starts_group {
                println!("{}:", msg.sender_id);
            }
            if let Some(reply) = row.reply_to {
                let quoted = view.text_of(reply).unwrap_or("(message deleted)");
                println!("    > {quoted}");
            }
            let text = if msg.is_deleted {
                "(message deleted)".to_string()
            } else {
                let mut parts: Vec<String> =
                    view.text_of(msg).map(str::to_string).into_iter().collect();
                parts.extend(attachment_summaries(&msg.attachments));
                parts.join(" ")
            };
            println!(
                "  [{}] {text}  <{}>",
                msg.created_at.format("%Y-%m-%d %H:%M"),
                msg.id
            );
        }
    }

    fn render_threads(&self) {
        let visible = self.threads.visible();
        println!(
            "--- conversations ({} of {}) ---",
            visible.len(),
            self.threads.window().total_items()
        );
        for conv in visible {
            let who = conv
                .partner(self.threads.me())
                .map(|u| u.display_name())
                .unwrap_or_else(|| conv.id.clone());
            println!(
                "  [{}] {who}: {}  <{}>",
                conv.updated_at.format("%Y-%m-%d %H:%M"),
                conv.last_message.as_deref().unwrap_or(""),
                conv.id
            );
        }
    }
}
