use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};

use crate::conversation::Author;

#[derive(Debug, Clone)]
pub struct Theme {
    pub surface_window: Color32,
    pub surface_panel: Color32,
    pub surface_raised: Color32,
    pub bubble_user: Color32,
    pub bubble_assistant: Color32,
    pub accent: Color32,
    pub danger: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub border_subtle: Color32,
    pub bubble_radius: u8,
    pub bubble_padding: i8,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            surface_window: Color32::from_rgb(0x0F, 0x11, 0x15),
            surface_panel: Color32::from_rgb(0x16, 0x1A, 0x20),
            surface_raised: Color32::from_rgb(0x1C, 0x22, 0x2B),
            bubble_user: Color32::from_rgb(0x24, 0x43, 0x6E),
            bubble_assistant: Color32::from_rgb(0x20, 0x26, 0x2F),
            accent: Color32::from_rgb(0x3B, 0x82, 0xF6),
            danger: Color32::from_rgb(0xEF, 0x44, 0x44),
            text_primary: Color32::from_rgb(0xE6, 0xED, 0xF3),
            text_muted: Color32::from_rgb(0x8B, 0x94, 0x9E),
            border_subtle: Color32::from_rgba_premultiplied(255, 255, 255, 13),
            bubble_radius: 10,
            bubble_padding: 10,
        }
    }
}

impl Theme {
    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = self.surface_panel;
        visuals.window_fill = self.surface_raised;
        visuals.extreme_bg_color = self.surface_window;
        visuals.override_text_color = Some(self.text_primary);
        visuals.widgets.noninteractive.bg_fill = self.surface_raised;
        visuals.widgets.noninteractive.fg_stroke.color = self.text_primary;
        visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, self.border_subtle);
        visuals.widgets.inactive.bg_fill = self.surface_raised;
        visuals.widgets.inactive.fg_stroke.color = self.text_primary;
        visuals.widgets.hovered.bg_fill = self.surface_raised.gamma_multiply(1.3);
        visuals.widgets.active.bg_fill = self.accent;
        visuals.selection.bg_fill = self.accent.gamma_multiply(0.6);
        visuals.hyperlink_color = self.accent;
        visuals.window_corner_radius = CornerRadius::same(self.bubble_radius);

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(8.0, 8.0);
        style.spacing.button_padding = egui::vec2(12.0, 6.0);
        style
            .text_styles
            .insert(TextStyle::Heading, FontId::proportional(17.0));
        style
            .text_styles
            .insert(TextStyle::Body, FontId::proportional(14.0));
        style
            .text_styles
            .insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn bubble_frame(&self, author: Author) -> Frame {
        let fill = match author {
            Author::User => self.bubble_user,
            Author::Assistant => self.bubble_assistant,
        };
        Frame::new()
            .fill(fill)
            .inner_margin(Margin::same(self.bubble_padding))
            .corner_radius(CornerRadius::same(self.bubble_radius))
            .stroke(Stroke::NONE)
    }

    pub fn composer_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_raised)
            .inner_margin(Margin::symmetric(self.bubble_padding, 8))
            .corner_radius(CornerRadius::same(self.bubble_radius))
            .stroke(Stroke::new(1.0, self.border_subtle))
    }

    pub fn chip_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_raised)
            .inner_margin(Margin::symmetric(8, 4))
            .corner_radius(CornerRadius::same(self.bubble_radius))
            .stroke(Stroke::new(1.0, self.border_subtle))
    }
}
