//! Main GUI application
//!
//! The window owns a long-lived tokio runtime with the backend actor running
//! on it. All download state lives behind the command/event channels; the UI
//! only renders what the backend reports and drains pending events on a
//! 100 ms tick.

use crate::backend::{spawn_backend, BackendCommand, BackendEvent};
use crate::classify;
use crate::downloader::{DownloadOutcome, DownloadRequest};
use crate::gui::clipboard;
use crate::utils::config::AppConfig;
use crate::utils::notify::{self, NotifyKind};
use iced::widget::{
    button, checkbox, column, container, progress_bar, row, scrollable, text, text_input,
};
use iced::{event, window, Application, Command, Element, Event, Length, Subscription, Theme};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;
use tokio::sync::mpsc;
use tracing::warn;

fn log_scroll_id() -> scrollable::Id {
    scrollable::Id::new("download-log")
}

/// Main application state
pub struct Mp3LoaderApp {
    // Keep a long-lived runtime so backend tasks stay alive
    runtime: Arc<Runtime>,
    command_tx: mpsc::Sender<BackendCommand>,
    event_rx: mpsc::UnboundedReceiver<BackendEvent>,

    config: AppConfig,

    // UI state
    url_input: String,
    folder_input: String,
    status_message: String,
    url_error: Option<String>,
    log_lines: Vec<String>,
    progress_fraction: f32,
    progress_label: String,
    downloading: bool,
}

/// Application messages
#[derive(Debug, Clone)]
pub enum Message {
    // Input events
    UrlChanged(String),
    PasteUrl,
    ClearUrl,
    FolderChanged(String),
    BrowseFolder,
    FolderPicked(Option<PathBuf>),
    OpenFolder,

    // Settings
    AuthToggled(bool),
    NotificationsToggled(bool),

    // Download control
    StartPressed,
    StopPressed,
    CopyLog,

    // System
    Tick,
    WindowResized(u32, u32),
    WindowMoved(i32, i32),
}

impl Application for Mp3LoaderApp {
    type Executor = iced::executor::Default;
    type Message = Message;
    type Theme = Theme;
    type Flags = AppConfig;

    fn new(config: Self::Flags) -> (Self, Command<Message>) {
        let runtime = Arc::new(Runtime::new().expect("Failed to create tokio runtime"));
        let handle = spawn_backend(&runtime);

        let folder_input = config.download_path.clone();

        let app = Self {
            runtime,
            command_tx: handle.command_tx,
            event_rx: handle.event_rx,
            config,
            url_input: String::new(),
            folder_input,
            status_message: "Ready".to_string(),
            url_error: None,
            log_lines: Vec::new(),
            progress_fraction: 0.0,
            progress_label: String::new(),
            downloading: false,
        };

        (app, Command::none())
    }

    fn title(&self) -> String {
        String::from("YouTube MP3 Downloader")
    }

    fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::UrlChanged(url) => {
                self.url_input = url;
                self.url_error = None;
                Command::none()
            }

            Message::PasteUrl => {
                match clipboard::get_clipboard_content() {
                    Ok(content) => {
                        self.url_input = content.trim().to_string();
                        self.url_error = None;
                    }
                    Err(e) => {
                        self.status_message = format!("Could not paste: {}", e);
                    }
                }
                Command::none()
            }

            Message::ClearUrl => {
                self.url_input.clear();
                self.url_error = None;
                Command::none()
            }

            Message::FolderChanged(folder) => {
                self.folder_input = folder;
                Command::none()
            }

            Message::BrowseFolder => Command::perform(
                async {
                    rfd::AsyncFileDialog::new()
                        .pick_folder()
                        .await
                        .map(|handle| handle.path().to_path_buf())
                },
                Message::FolderPicked,
            ),

            Message::FolderPicked(path) => {
                if let Some(path) = path {
                    self.folder_input = path.to_string_lossy().to_string();
                    self.config.download_path = self.folder_input.clone();
                    self.persist_config();
                }
                Command::none()
            }

            Message::OpenFolder => {
                if let Err(e) = open::that(&self.folder_input) {
                    self.status_message = format!("Could not open folder: {}", e);
                }
                Command::none()
            }

            Message::AuthToggled(enabled) => {
                self.config.use_youtube_auth = enabled;
                self.persist_config();
                Command::none()
            }

            Message::NotificationsToggled(enabled) => {
                self.config.notifications_enabled = enabled;
                self.persist_config();
                Command::none()
            }

            Message::StartPressed => {
                if self.downloading {
                    return Command::none();
                }
                self.start_download()
            }

            Message::StopPressed => {
                if self.downloading {
                    self.status_message = "Stopping...".to_string();
                    if let Err(e) = self.command_tx.try_send(BackendCommand::Stop) {
                        warn!("Stop command not delivered: {}", e);
                    }
                }
                Command::none()
            }

            Message::CopyLog => {
                let content = self.log_lines.join("\n");
                match clipboard::set_clipboard_content(&content) {
                    Ok(()) => self.status_message = "Log copied to clipboard".to_string(),
                    Err(e) => self.status_message = format!("Could not copy log: {}", e),
                }
                Command::none()
            }

            Message::Tick => self.drain_backend_events(),

            Message::WindowResized(width, height) => {
                self.config.window_width = width;
                self.config.window_height = height;
                self.persist_config();
                Command::none()
            }

            Message::WindowMoved(x, y) => {
                self.config.window_x = Some(x);
                self.config.window_y = Some(y);
                self.persist_config();
                Command::none()
            }
        }
    }

    fn view(&self) -> Element<'_, Message> {
        let url_row = row![
            text_input("YouTube video, playlist or shorts URL", &self.url_input)
                .on_input(Message::UrlChanged)
                .on_submit(Message::StartPressed)
                .width(Length::Fill),
            button("Paste").on_press(Message::PasteUrl),
            button("Clear").on_press(Message::ClearUrl),
        ]
        .spacing(8);

        let folder_row = row![
            text_input("Download folder", &self.folder_input)
                .on_input(Message::FolderChanged)
                .width(Length::Fill),
            button("Browse...").on_press(Message::BrowseFolder),
            button("Open").on_press(Message::OpenFolder),
        ]
        .spacing(8);

        let options_row = row![
            checkbox(
                "Use YouTube authentication (Firefox cookies)",
                self.config.use_youtube_auth
            )
            .on_toggle(Message::AuthToggled),
            checkbox("Desktop notifications", self.config.notifications_enabled)
                .on_toggle(Message::NotificationsToggled),
        ]
        .spacing(20);

        let download_button = button(text("Download MP3"))
            .style(iced::theme::Button::Primary)
            .padding([8, 16])
            .on_press_maybe((!self.downloading).then_some(Message::StartPressed));

        let stop_button = button(text("Stop"))
            .style(iced::theme::Button::Destructive)
            .padding([8, 16])
            .on_press_maybe(self.downloading.then_some(Message::StopPressed));

        let copy_button = button(text("Copy Log"))
            .style(iced::theme::Button::Secondary)
            .padding([8, 16])
            .on_press_maybe((!self.log_lines.is_empty()).then_some(Message::CopyLog));

        let controls_row = row![download_button, stop_button, copy_button].spacing(8);

        let progress = column![
            progress_bar(0.0..=1.0, self.progress_fraction),
            text(&self.progress_label).size(13),
        ]
        .spacing(4);

        let log_view = scrollable(
            column(
                self.log_lines
                    .iter()
                    .map(|line| text(line).size(13).into())
                    .collect::<Vec<Element<'_, Message>>>(),
            )
            .spacing(2)
            .width(Length::Fill),
        )
        .id(log_scroll_id())
        .height(Length::Fill);

        let mut content = column![url_row].spacing(12).padding(16);

        if let Some(error) = &self.url_error {
            content = content.push(
                text(error)
                    .size(13)
                    .style(iced::theme::Text::Color(iced::Color::from_rgb(
                        0.9, 0.3, 0.3,
                    ))),
            );
        }

        content = content
            .push(folder_row)
            .push(options_row)
            .push(controls_row)
            .push(progress)
            .push(log_view)
            .push(text(&self.status_message).size(13));

        container(content)
            .width(Length::Fill)
            .height(Length::Fill)
            .into()
    }

    fn subscription(&self) -> Subscription<Message> {
        let tick = iced::time::every(std::time::Duration::from_millis(100)).map(|_| Message::Tick);

        let window_events = event::listen_with(|event, _status| match event {
            Event::Window(_, window::Event::Resized { width, height }) => {
                Some(Message::WindowResized(width, height))
            }
            Event::Window(_, window::Event::Moved { x, y }) => Some(Message::WindowMoved(x, y)),
            _ => None,
        });

        Subscription::batch([tick, window_events])
    }

    fn theme(&self) -> Self::Theme {
        Theme::Dark
    }
}

impl Mp3LoaderApp {
    fn persist_config(&self) {
        if let Err(e) = self.config.save() {
            warn!("Could not save configuration: {}", e);
        }
    }

    fn start_download(&mut self) -> Command<Message> {
        let url = self.url_input.trim().to_string();
        if url.is_empty() {
            self.url_error = Some("Please enter a YouTube URL".to_string());
            return Command::none();
        }

        let Some(kind) = classify::classify(&url) else {
            self.url_error = Some(match classify::loose_watch_id(&url) {
                Some(id) if id.len() != 11 => format!(
                    "Video ids are exactly 11 characters; \"{}\" has {}",
                    id,
                    id.len()
                ),
                _ => "Not a recognized YouTube video, playlist or shorts URL".to_string(),
            });
            return Command::none();
        };

        self.config.download_path = self.folder_input.clone();
        self.persist_config();

        let request = DownloadRequest {
            url,
            kind,
            dest_dir: PathBuf::from(&self.folder_input),
            use_auth: self.config.use_youtube_auth,
        };

        if let Err(e) = self
            .command_tx
            .try_send(BackendCommand::StartDownload(request))
        {
            self.status_message = format!("Could not start download: {}", e);
            return Command::none();
        }

        self.downloading = true;
        self.url_error = None;
        self.log_lines.clear();
        self.progress_fraction = 0.0;
        self.progress_label = String::new();
        self.status_message = format!("Downloading {}...", kind.as_str().to_lowercase());
        self.log_lines
            .push(format!("Detected URL type: {}", kind.as_str()));

        Command::none()
    }

    fn drain_backend_events(&mut self) -> Command<Message> {
        let mut appended = false;

        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                BackendEvent::Log(line) => {
                    self.log_lines.push(line);
                    appended = true;
                }
                BackendEvent::Progress { fraction, label } => {
                    if let Some(fraction) = fraction {
                        self.progress_fraction = fraction.clamp(0.0, 1.0);
                    }
                    if let Some(label) = label {
                        self.progress_label = label;
                    }
                }
                BackendEvent::CleanupFinished { deleted } => {
                    self.status_message = if deleted > 0 {
                        format!("Stopped; {} partial file(s) removed", deleted)
                    } else {
                        "Stopped".to_string()
                    };
                }
                BackendEvent::Finished(outcome) => {
                    self.downloading = false;
                    self.apply_outcome(outcome);
                }
                BackendEvent::Failed(error) => {
                    self.downloading = false;
                    self.progress_label.clear();
                    self.status_message = format!("Error: {}", error);
                    self.log_lines.push(format!("✗ {}", error));
                    appended = true;
                    self.notify("Download failed", &error, NotifyKind::Warning);
                }
            }
        }

        if appended {
            scrollable::snap_to(log_scroll_id(), scrollable::RelativeOffset::END)
        } else {
            Command::none()
        }
    }

    fn apply_outcome(&mut self, outcome: DownloadOutcome) {
        match outcome {
            DownloadOutcome::CancelledBeforeStart => {
                self.status_message = "Cancelled".to_string();
            }
            DownloadOutcome::Stopped { completed } => {
                self.status_message = if completed > 0 {
                    format!("Stopped after {} completed file(s)", completed)
                } else {
                    "Stopped".to_string()
                };
            }
            DownloadOutcome::Completed { downloaded, failed } => {
                if failed.is_empty() {
                    self.progress_fraction = 1.0;
                    self.status_message = format!("Done: {} file(s) downloaded", downloaded);
                    self.notify(
                        "Download complete",
                        &format!("{} MP3 file(s) saved", downloaded),
                        NotifyKind::Success,
                    );
                } else {
                    self.status_message = format!(
                        "Done with warnings: {} downloaded, {} unavailable",
                        downloaded,
                        failed.len()
                    );
                    self.notify(
                        "Download finished with warnings",
                        &format!("{} saved, {} unavailable", downloaded, failed.len()),
                        NotifyKind::Warning,
                    );
                }
            }
            DownloadOutcome::NothingDownloaded => {
                self.status_message = "Finished, but nothing was downloaded".to_string();
                self.notify(
                    "Nothing downloaded",
                    "The download finished without producing any files",
                    NotifyKind::Warning,
                );
            }
            DownloadOutcome::Failed { exit_code } => {
                self.status_message = format!(
                    "Download failed (exit code {})",
                    exit_code.map_or_else(|| "?".to_string(), |c| c.to_string())
                );
                self.notify("Download failed", &self.status_message.clone(), NotifyKind::Warning);
            }
        }
    }

    fn notify(&self, title: &str, body: &str, kind: NotifyKind) {
        if !self.config.notifications_enabled {
            return;
        }
        let title = title.to_string();
        let body = body.to_string();
        // Notification backends can block; keep them off the UI thread.
        self.runtime.spawn_blocking(move || {
            notify::send(&title, &body, kind);
        });
    }
}
