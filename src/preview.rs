//! Conversation data and the HTML preview the capture pipeline consumes.
//!
//! [`render_preview`] emits a standalone document whose capture root is the
//! element with id [`PREVIEW_ID`]. The markup only uses what the software
//! rasterizer lays out: stacked blocks with explicit widths, margins,
//! padding and background colours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dom::style::{parse_length, Edges};
use crate::dom::Rgba;
use crate::platform::{apply_theme, StyleDescriptor, Theme, TimestampFormat};
use crate::rendering::layout::ADVANCE_EM;

/// Id of the capture root in rendered previews.
pub const PREVIEW_ID: &str = "dm-preview";

/// Width of the rendered phone screen in CSS px.
pub const PREVIEW_WIDTH: f32 = 375.0;

const HEADER_AVATAR: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Contact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    /// `content` is an image source
    Image,
    Emoji,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Sent,
    Delivered,
    Read,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub content: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MessageStatus>,
}

impl Message {
    /// Text message with a fresh id.
    pub fn new(sender: Sender, content: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            content: content.into(),
            sender,
            timestamp,
            kind: MessageKind::Text,
            status: None,
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_status(mut self, status: MessageStatus) -> Self {
        self.status = Some(status);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatData {
    pub contact_name: String,
    pub contact_image: Option<String>,
    pub user_image: Option<String>,
    pub messages: Vec<Message>,
}

impl ChatData {
    pub fn new(contact_name: impl Into<String>) -> Self {
        Self {
            contact_name: contact_name.into(),
            ..Default::default()
        }
    }

    /// Append a message and return its id.
    pub fn push_message(&mut self, message: Message) -> String {
        let id = message.id.clone();
        self.messages.push(message);
        id
    }

    pub fn message(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Replace the content of message `id`. Returns false if it is missing.
    pub fn update_message(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(m) => {
                m.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn remove_message(&mut self, id: &str) -> Option<Message> {
        let idx = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(idx))
    }

    /// Name shown in the header, with a placeholder for empty input.
    pub fn display_name(&self) -> &str {
        let name = self.contact_name.trim();
        if name.is_empty() {
            "Contact"
        } else {
            name
        }
    }
}

/// Format a message time for a platform.
pub fn format_timestamp(at: &DateTime<Utc>, format: TimestampFormat) -> String {
    match format {
        TimestampFormat::TwelveHour => at.format("%-I:%M %p").to_string(),
        TimestampFormat::TwentyFourHour => at.format("%H:%M").to_string(),
    }
}

/// Render `chat` with the `descriptor` skin under `theme`.
pub fn render_preview(chat: &ChatData, descriptor: &StyleDescriptor, theme: Theme) -> String {
    let config = apply_theme(descriptor.clone(), theme);
    let colors = &config.colors;
    let font = escape(&config.typography.font_family);
    let container = Edges::parse_shorthand(&config.layout.padding.container);
    let inner_width = (PREVIEW_WIDTH - container.horizontal()).max(0.0);

    let mut html = String::with_capacity(1024 + chat.messages.len() * 256);
    html.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    html.push_str(&format!("<title>{}</title></head><body>", escape(chat.display_name())));
    html.push_str(&format!(
        "<div id=\"{}\" class=\"dm-preview platform-{} theme-{}\" style=\"width: {}px; background-color: {}; color: {}; font-family: {}\">",
        PREVIEW_ID, config.id, theme, PREVIEW_WIDTH, colors.background, colors.text, font
    ));

    push_header(&mut html, chat, &config);

    html.push_str(&format!(
        "<div class=\"dm-messages\" style=\"padding: {}\">",
        escape(&config.layout.padding.container)
    ));
    for (i, message) in chat.messages.iter().enumerate() {
        // timestamp under the last message of each run from one sender
        let last_in_run = chat
            .messages
            .get(i + 1)
            .map_or(true, |next| next.sender != message.sender);
        push_message(&mut html, message, &config, inner_width, last_in_run);
    }
    html.push_str("</div></div></body></html>");
    html
}

fn push_header(html: &mut String, chat: &ChatData, config: &StyleDescriptor) {
    let colors = &config.colors;
    html.push_str("<div class=\"dm-header\" style=\"padding: 12px 16px\">");
    match chat.contact_image.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(src) => html.push_str(&format!(
            "<img class=\"dm-avatar\" src=\"{}\" alt=\"{}\" width=\"{}\" height=\"{}\">",
            escape(src),
            escape(chat.display_name()),
            HEADER_AVATAR,
            HEADER_AVATAR
        )),
        None => {
            let initial: String = chat
                .display_name()
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect())
                .unwrap_or_default();
            html.push_str(&format!(
                "<div class=\"dm-avatar\" style=\"width: {0}px; height: {0}px; background-color: {1}; color: #FFFFFF; font-size: 12px\">{2}</div>",
                HEADER_AVATAR,
                colors.text_secondary,
                escape(&initial)
            ));
        }
    }
    html.push_str(&format!(
        "<div class=\"dm-contact-name\" style=\"font-size: 16px; line-height: 20px; color: {}\">{}</div>",
        colors.text,
        escape(chat.display_name())
    ));
    if config.features.has_online_status {
        html.push_str(&format!(
            "<div class=\"dm-status\" style=\"font-size: 12px; line-height: 16px; color: {}\">Active now</div>",
            colors.text_secondary
        ));
    }
    html.push_str("</div>");
}

fn push_message(html: &mut String, message: &Message, config: &StyleDescriptor, inner_width: f32, show_time: bool) {
    let colors = &config.colors;
    let is_user = message.sender == Sender::User;
    let font_size = parse_length(&config.typography.message_size).unwrap_or(14.0);
    let padding = Edges::parse_shorthand(&config.layout.padding.message);
    let max_width = bubble_max_width(&config.layout.max_bubble_width, inner_width);

    let bubble_color = if is_user { &colors.user_bubble } else { &colors.contact_bubble };
    let text_color = if is_user && is_dark(bubble_color) { "#FFFFFF" } else { colors.text.as_str() };

    let sender_class = if is_user { "dm-user" } else { "dm-contact" };
    html.push_str(&format!(
        "<div class=\"dm-message {}\" data-message-id=\"{}\" style=\"margin: {}\">",
        sender_class,
        escape(&message.id),
        escape(&config.layout.margins.message)
    ));

    match message.kind {
        MessageKind::Image => {
            let width = max_width.min(200.0);
            let offset = if is_user { inner_width - width } else { 0.0 };
            html.push_str(&format!(
                "<img class=\"dm-bubble dm-image\" src=\"{}\" width=\"{}\" style=\"margin-left: {}px\">",
                escape(&message.content),
                width,
                offset.max(0.0)
            ));
        }
        MessageKind::Text | MessageKind::Emoji => {
            let font_size = if message.kind == MessageKind::Emoji { font_size * 2.0 } else { font_size };
            let chars = message.content.chars().count() as f32;
            let natural = chars * font_size * ADVANCE_EM + padding.horizontal() + 1.0;
            let width = natural.min(max_width).max(padding.horizontal() + font_size);
            let offset = if is_user { inner_width - width } else { 0.0 };
            html.push_str(&format!(
                "<div class=\"dm-bubble\" style=\"width: {}px; margin-left: {}px; padding: {}; background-color: {}; color: {}; font-size: {}px\">{}</div>",
                width.round(),
                offset.max(0.0).round(),
                escape(&config.layout.padding.message),
                bubble_color,
                text_color,
                font_size,
                escape(&message.content)
            ));
        }
    }

    if show_time {
        let stamp = format_timestamp(&message.timestamp, config.features.timestamp_format);
        let status = match (is_user && config.features.has_status_indicators, message.status) {
            (true, Some(MessageStatus::Read)) => " · Seen",
            (true, Some(MessageStatus::Delivered)) => " · Delivered",
            (true, Some(MessageStatus::Failed)) => " · Not delivered",
            _ => "",
        };
        let text = format!("{}{}", stamp, status);
        let size = parse_length(&config.typography.timestamp_size).unwrap_or(11.0);
        let width = text.chars().count() as f32 * size * ADVANCE_EM + 1.0;
        let offset = if is_user { (inner_width - width).max(0.0) } else { 0.0 };
        html.push_str(&format!(
            "<div class=\"dm-timestamp\" style=\"margin-left: {}px; margin-top: 4px; font-size: {}px; color: {}\">{}</div>",
            offset.round(),
            size,
            colors.text_secondary,
            escape(&text)
        ));
    }
    html.push_str("</div>");
}

fn bubble_max_width(value: &str, inner_width: f32) -> f32 {
    let value = value.trim();
    let width = match value.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().ok().map(|p| inner_width * p / 100.0),
        None => parse_length(value),
    };
    width.unwrap_or(inner_width).min(inner_width)
}

fn is_dark(color: &str) -> bool {
    match Rgba::parse(color) {
        Some(c) => {
            let luma = 0.299 * f32::from(c.r) + 0.587 * f32::from(c.g) + 0.114 * f32::from(c.b);
            luma < 186.0
        }
        None => false,
    }
}

/// Escape text for HTML element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;
    use crate::platform::{get_config, PlatformId};
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, h, m, 0).unwrap()
    }

    fn sample() -> ChatData {
        let mut chat = ChatData::new("Jane <Doe>");
        chat.push_message(Message::new(Sender::Contact, "hey there", at(9, 5)));
        chat.push_message(Message::new(Sender::User, "hi & bye", at(21, 30)).with_status(MessageStatus::Read));
        chat
    }

    #[test]
    fn message_editing() {
        let mut chat = ChatData::new("A");
        let id = chat.push_message(Message::new(Sender::User, "one", at(1, 0)));
        assert!(chat.update_message(&id, "two"));
        assert_eq!(chat.message(&id).unwrap().content, "two");
        assert!(!chat.update_message("missing", "x"));
        assert_eq!(chat.remove_message(&id).unwrap().content, "two");
        assert!(chat.messages.is_empty());
    }

    #[test]
    fn timestamps_follow_platform_format() {
        assert_eq!(format_timestamp(&at(21, 30), TimestampFormat::TwelveHour), "9:30 PM");
        assert_eq!(format_timestamp(&at(9, 5), TimestampFormat::TwentyFourHour), "09:05");
    }

    #[test]
    fn preview_root_parses_with_expected_width() {
        let html = render_preview(&sample(), &get_config(PlatformId::Instagram), Theme::Light);
        let doc = Document::parse(&html);
        let root = doc.element_by_id(PREVIEW_ID).unwrap();
        let rect = doc.bounding_box(root).unwrap();
        assert_eq!(rect.width, PREVIEW_WIDTH);
        assert!(rect.height > 0.0);
        assert!(doc.get(root).unwrap().classes.contains(&"platform-instagram".to_string()));
    }

    #[test]
    fn text_is_escaped() {
        let html = render_preview(&sample(), &get_config(PlatformId::Twitter), Theme::Light);
        assert!(html.contains("Jane &lt;Doe&gt;"));
        assert!(html.contains("hi &amp; bye"));
        assert!(!html.contains("<Doe>"));
        assert!(html.contains("9:30 PM · Seen"));
    }

    #[test]
    fn dark_theme_changes_background() {
        let light = render_preview(&sample(), &get_config(PlatformId::WhatsApp), Theme::Light);
        let dark = render_preview(&sample(), &get_config(PlatformId::WhatsApp), Theme::Dark);
        assert!(light.contains("background-color: #E5DDD5"));
        assert!(dark.contains("background-color: #0B141A"));
        assert!(dark.contains("21:30"));
    }

    #[test]
    fn user_bubbles_are_right_aligned() {
        let html = render_preview(&sample(), &get_config(PlatformId::Instagram), Theme::Light);
        let doc = Document::parse(&html);
        let tree = doc.layout();
        let bubbles: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .filter(|n| doc.get(*n).unwrap().classes.iter().any(|c| c == "dm-bubble"))
            .map(|n| tree.find(n).unwrap().rect)
            .collect();
        assert_eq!(bubbles.len(), 2);
        let container = 16.0;
        assert_eq!(bubbles[0].x, container);
        assert!((bubbles[1].x + bubbles[1].width - (PREVIEW_WIDTH - container)).abs() <= 1.0);
    }

    #[test]
    fn chat_json_uses_camel_case() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["contactName"], "Jane <Doe>");
        assert_eq!(json["messages"][0]["type"], "text");
        assert_eq!(json["messages"][1]["status"], "read");
        let back: ChatData = serde_json::from_value(json).unwrap();
        assert_eq!(back.messages[1].content, "hi & bye");
        assert_eq!(back.messages[1].timestamp, at(21, 30));
    }
}
