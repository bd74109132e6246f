use crate::conversation::{Attachment, Author, ChatEntry, Conversation, EntryBody};
use crate::event::AppEvent;
use crate::gemini::GeminiClient;
use crate::media;
use crate::settings::{Settings, DEFAULT_MODEL};
use crate::theme::Theme;
use eframe::egui::{self, RichText, ScrollArea};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, TryRecvError};
use tracing::warn;

const GREETING: &str = "Hi, I'm Gemchat. Ask me anything, or attach an image to go with it.";

struct StagedAttachment {
    path: PathBuf,
    attachment: Attachment,
}

#[derive(Default)]
struct SettingsDraft {
    api_key: String,
    model: String,
}

pub struct GemchatApp {
    rx: Receiver<AppEvent>,
    conversation: Conversation<GeminiClient>,
    settings: Settings,
    theme: Theme,
    input_buffer: String,
    staged_attachment: Option<StagedAttachment>,
    attachment_error: Option<String>,
    settings_open: bool,
    settings_draft: SettingsDraft,
    scroll_to_bottom: bool,
}

impl GemchatApp {
    pub fn new(rx: Receiver<AppEvent>, settings: Settings, client: GeminiClient) -> Self {
        let mut conversation = Conversation::new(client);
        conversation.note(GREETING);

        Self {
            rx,
            conversation,
            settings,
            theme: Theme::default(),
            input_buffer: String::new(),
            staged_attachment: None,
            attachment_error: None,
            settings_open: false,
            settings_draft: SettingsDraft::default(),
            scroll_to_bottom: true,
        }
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(AppEvent::ResponseReady { request_id, text }) => {
                    self.conversation.on_response(request_id, text);
                    self.scroll_to_bottom = true;
                }
                Ok(AppEvent::ResponseFailed {
                    request_id,
                    message,
                }) => {
                    self.conversation.on_failure(request_id, message);
                    self.scroll_to_bottom = true;
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    warn!("completion channel disconnected");
                    break;
                }
            }
        }
    }

    fn submit(&mut self) {
        let text = std::mem::take(&mut self.input_buffer);
        let attachment = self
            .staged_attachment
            .take()
            .map(|staged| staged.attachment);
        self.attachment_error = None;
        self.conversation.submit(&text, attachment);
        self.scroll_to_bottom = true;
    }

    fn pick_attachment(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Attach an image")
            .add_filter("Images", &["png", "jpg", "jpeg", "gif", "webp", "bmp"])
            .pick_file()
        else {
            return;
        };

        match media::load_image(&path) {
            Ok(attachment) => {
                self.attachment_error = None;
                self.staged_attachment = Some(StagedAttachment { path, attachment });
            }
            Err(err) => {
                warn!(error = %err, "attachment rejected");
                self.attachment_error = Some(err.to_string());
                self.staged_attachment = None;
            }
        }
    }

    fn open_settings(&mut self) {
        self.settings_draft = SettingsDraft {
            api_key: self.settings.api_key.clone().unwrap_or_default(),
            model: self.settings.model.clone(),
        };
        self.settings_open = true;
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let mut open_settings = false;
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.strong("Gemchat");
                ui.separator();
                ui.label(RichText::new(&self.settings.model).color(self.theme.text_muted));
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Settings").clicked() {
                        open_settings = true;
                    }
                    if self.conversation.is_busy() {
                        ui.label(RichText::new("Waiting for Gemini").color(self.theme.text_muted));
                        ui.add(egui::Spinner::new().size(14.0));
                    }
                });
            });
        });

        if open_settings {
            self.open_settings();
        }
    }

    fn render_settings_window(&mut self, ctx: &egui::Context) {
        if !self.settings_open {
            return;
        }

        let mut keep_open = true;
        let mut save_clicked = false;
        let mut cancel_clicked = false;

        egui::Window::new("Settings")
            .open(&mut keep_open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Gemini API key");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings_draft.api_key)
                        .password(true)
                        .desired_width(320.0),
                );
                ui.add_space(4.0);
                ui.label("Model");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings_draft.model)
                        .desired_width(320.0),
                );
                ui.add_space(8.0);
                ui.horizontal(|ui| {
                    if ui.button("Save").clicked() {
                        save_clicked = true;
                    }
                    if ui.button("Cancel").clicked() {
                        cancel_clicked = true;
                    }
                });
            });

        if save_clicked {
            self.settings.set_api_key(&self.settings_draft.api_key);
            let model = self.settings_draft.model.trim();
            self.settings.model = if model.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model.to_string()
            };
            if let Err(err) = self.settings.save() {
                warn!(error = %err, "failed to persist settings");
                self.conversation
                    .note(format!("Could not save settings: {err}"));
            }
            self.conversation
                .responder_mut()
                .apply_settings(&self.settings);
        }

        self.settings_open = keep_open && !save_clicked && !cancel_clicked;
    }

    fn render_composer(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("composer").show(ctx, |ui| {
            ui.add_space(4.0);

            let mut clear_staged = false;
            if let Some(staged) = &self.staged_attachment {
                ui.horizontal(|ui| {
                    self.theme.chip_frame().show(ui, |ui| {
                        ui.label(
                            RichText::new(format!(
                                "\u{1F4CE} {} ({})",
                                file_label(&staged.path),
                                format_size(staged.attachment.data.len())
                            ))
                            .color(self.theme.text_muted),
                        );
                        if ui.small_button("\u{2715}").clicked() {
                            clear_staged = true;
                        }
                    });
                });
            }
            if clear_staged {
                self.staged_attachment = None;
            }

            if let Some(error) = &self.attachment_error {
                ui.label(RichText::new(error).color(self.theme.danger));
            }

            let busy = self.conversation.is_busy();
            let mut send_now = false;
            let mut attach_now = false;

            self.theme.composer_frame().show(ui, |ui| {
                ui.horizontal(|ui| {
                    if ui
                        .add_enabled(!busy, egui::Button::new("\u{1F4CE}"))
                        .on_hover_text("Attach an image")
                        .clicked()
                    {
                        attach_now = true;
                    }

                    let hint = if busy {
                        "Waiting for the reply..."
                    } else {
                        "Type a message..."
                    };
                    let has_content = !self.input_buffer.trim().is_empty()
                        || self.staged_attachment.is_some();

                    let send_width = 64.0;
                    let input = ui.add_enabled(
                        !busy,
                        egui::TextEdit::singleline(&mut self.input_buffer)
                            .desired_width(ui.available_width() - send_width - 12.0)
                            .hint_text(hint),
                    );
                    if input.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        send_now = true;
                    }

                    if ui
                        .add_enabled(!busy && has_content, egui::Button::new("Send"))
                        .clicked()
                    {
                        send_now = true;
                    }
                });
            });
            ui.add_space(4.0);

            if attach_now {
                self.pick_attachment();
            }
            if send_now && !busy {
                self.submit();
            }
        });
    }

    fn render_transcript(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ScrollArea::vertical()
                .id_salt("chat_transcript")
                .stick_to_bottom(true)
                .show(ui, |ui| {
                    let max_width = ui.available_width() * 0.82;
                    for entry in self.conversation.transcript().iter() {
                        match entry.author {
                            Author::User => {
                                ui.with_layout(
                                    egui::Layout::right_to_left(egui::Align::TOP),
                                    |ui| self.message_bubble(ui, entry, max_width),
                                );
                            }
                            Author::Assistant => {
                                ui.horizontal(|ui| self.message_bubble(ui, entry, max_width));
                            }
                        }
                    }

                    if self.scroll_to_bottom {
                        ui.scroll_to_cursor(Some(egui::Align::BOTTOM));
                    }
                });
        });
        self.scroll_to_bottom = false;
    }

    fn message_bubble(&self, ui: &mut egui::Ui, entry: &ChatEntry, max_width: f32) {
        self.theme.bubble_frame(entry.author).show(ui, |ui| {
            ui.set_max_width(max_width);
            match &entry.body {
                EntryBody::Text(text) => {
                    ui.label(text);
                }
                EntryBody::Image(attachment) => {
                    ui.label(
                        RichText::new(format!(
                            "\u{1F4CE} {} ({})",
                            attachment.mime,
                            format_size(attachment.data.len())
                        ))
                        .color(self.theme.text_muted),
                    );
                }
                EntryBody::Pending => {
                    ui.add(egui::Spinner::new().size(14.0));
                }
            }
        });
    }
}

impl eframe::App for GemchatApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_events();
        self.render_top_bar(ctx);
        self.render_settings_window(ctx);
        self.render_composer(ctx);
        self.render_transcript(ctx);
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn format_size(bytes: usize) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f32 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f32 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::{file_label, format_size};
    use std::path::Path;

    #[test]
    fn format_size_picks_a_sensible_unit() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn file_label_prefers_the_file_name() {
        assert_eq!(file_label(Path::new("/tmp/photos/cat.png")), "cat.png");
    }
}
