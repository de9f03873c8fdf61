//! Platform style descriptors: colours, typography, layout and feature flags
//! for each chat skin the preview renderer supports.
//!
//! Lookups never fail. An unknown platform name resolves to the default
//! (Instagram) descriptor with a warning, so a stale or hand-edited id in a
//! saved conversation still renders.

mod presets;
pub mod theme;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dom::Rgba;
use crate::{Error, Result};

pub use theme::{apply_theme, config_with_theme, Theme};

/// Supported chat platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformId {
    #[default]
    Instagram,
    Twitter,
    WhatsApp,
    Facebook,
    Tinder,
    LinkedIn,
}

impl PlatformId {
    pub const ALL: [PlatformId; 6] = [
        PlatformId::Instagram,
        PlatformId::Twitter,
        PlatformId::WhatsApp,
        PlatformId::Facebook,
        PlatformId::Tinder,
        PlatformId::LinkedIn,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PlatformId::Instagram => "instagram",
            PlatformId::Twitter => "twitter",
            PlatformId::WhatsApp => "whatsapp",
            PlatformId::Facebook => "facebook",
            PlatformId::Tinder => "tinder",
            PlatformId::LinkedIn => "linkedin",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlatformId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        PlatformId::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| Error::Config(format!("unknown platform '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gradient {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Colors {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub user_bubble: String,
    pub contact_bubble: String,
    pub text: String,
    pub text_secondary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gradient: Option<Gradient>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontWeights {
    pub normal: String,
    pub medium: String,
    pub bold: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Typography {
    pub font_family: String,
    pub message_size: String,
    pub name_size: String,
    pub timestamp_size: String,
    pub font_weight: FontWeights,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub message: String,
    pub container: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Margins {
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub bubble_radius: String,
    pub spacing: String,
    pub avatar_size: String,
    /// A px length or a percentage of the preview width
    pub max_bubble_width: String,
    pub padding: Padding,
    pub margins: Margins,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimestampFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    pub has_status_indicators: bool,
    pub has_typing_indicator: bool,
    pub has_online_status: bool,
    pub has_message_reactions: bool,
    pub timestamp_format: TimestampFormat,
}

/// Flags only one platform has.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "platform", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum PlatformExtras {
    Instagram {
        has_story_ring: bool,
        has_verified_badge: bool,
    },
    Twitter {
        has_verified_badge: bool,
        has_encryption: bool,
    },
    WhatsApp {
        has_delivery_status: bool,
        has_last_seen: bool,
    },
    Facebook {
        has_active_status: bool,
    },
    Tinder {
        has_match_info: bool,
        has_gif_support: bool,
    },
    LinkedIn {
        has_professional_info: bool,
        has_connection_status: bool,
    },
}

impl PlatformExtras {
    pub fn platform(&self) -> PlatformId {
        match self {
            PlatformExtras::Instagram { .. } => PlatformId::Instagram,
            PlatformExtras::Twitter { .. } => PlatformId::Twitter,
            PlatformExtras::WhatsApp { .. } => PlatformId::WhatsApp,
            PlatformExtras::Facebook { .. } => PlatformId::Facebook,
            PlatformExtras::Tinder { .. } => PlatformId::Tinder,
            PlatformExtras::LinkedIn { .. } => PlatformId::LinkedIn,
        }
    }
}

/// Everything the preview renderer needs to draw one platform skin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleDescriptor {
    pub id: PlatformId,
    pub name: String,
    pub display_name: String,
    pub colors: Colors,
    pub typography: Typography,
    pub layout: Layout,
    pub features: Features,
    pub extras: PlatformExtras,
}

impl StyleDescriptor {
    /// Structural check: colours parse, sizes are lengths, and the extras
    /// belong to the same platform as the descriptor.
    pub fn validate(&self) -> Result<()> {
        let c = &self.colors;
        let mut colors = vec![
            ("primary", &c.primary),
            ("secondary", &c.secondary),
            ("background", &c.background),
            ("userBubble", &c.user_bubble),
            ("contactBubble", &c.contact_bubble),
            ("text", &c.text),
            ("textSecondary", &c.text_secondary),
        ];
        if let Some(accent) = &c.accent {
            colors.push(("accent", accent));
        }
        if let Some(g) = &c.gradient {
            colors.push(("gradient.from", &g.from));
            colors.push(("gradient.to", &g.to));
        }
        for (field, value) in colors {
            if Rgba::parse(value).is_none() {
                return Err(Error::Config(format!(
                    "{}: invalid colour {} = '{}'",
                    self.id, field, value
                )));
            }
        }

        let t = &self.typography;
        let l = &self.layout;
        for (field, value) in [
            ("messageSize", &t.message_size),
            ("nameSize", &t.name_size),
            ("timestampSize", &t.timestamp_size),
            ("bubbleRadius", &l.bubble_radius),
            ("spacing", &l.spacing),
            ("avatarSize", &l.avatar_size),
        ] {
            if crate::dom::style::parse_length(value).is_none() {
                return Err(Error::Config(format!(
                    "{}: invalid length {} = '{}'",
                    self.id, field, value
                )));
            }
        }
        if t.font_family.trim().is_empty() {
            return Err(Error::Config(format!("{}: empty fontFamily", self.id)));
        }
        if self.extras.platform() != self.id {
            return Err(Error::Config(format!(
                "{}: extras belong to {}",
                self.id,
                self.extras.platform()
            )));
        }
        Ok(())
    }

    /// `--{id}-*` custom properties for embedding the skin in a page.
    pub fn css_variables(&self) -> Vec<(String, String)> {
        let id = self.id.as_str();
        let var = |name: &str, value: &str| (format!("--{}-{}", id, name), value.to_string());
        vec![
            var("primary", &self.colors.primary),
            var("secondary", &self.colors.secondary),
            var("background", &self.colors.background),
            var("user-bubble", &self.colors.user_bubble),
            var("contact-bubble", &self.colors.contact_bubble),
            var("text", &self.colors.text),
            var("text-secondary", &self.colors.text_secondary),
            var("font-family", &self.typography.font_family),
            var("message-size", &self.typography.message_size),
            var("bubble-radius", &self.layout.bubble_radius),
            var("spacing", &self.layout.spacing),
            var("avatar-size", &self.layout.avatar_size),
        ]
    }
}

/// Descriptor for `id`.
pub fn get_config(id: PlatformId) -> StyleDescriptor {
    match id {
        PlatformId::Instagram => presets::instagram(),
        PlatformId::Twitter => presets::twitter(),
        PlatformId::WhatsApp => presets::whatsapp(),
        PlatformId::Facebook => presets::facebook(),
        PlatformId::Tinder => presets::tinder(),
        PlatformId::LinkedIn => presets::linkedin(),
    }
}

/// The descriptor used when nothing better is available.
pub fn default_config() -> StyleDescriptor {
    get_config(PlatformId::default())
}

/// Descriptor for a platform name, falling back to the default on unknown
/// names.
pub fn config_for(name: &str) -> StyleDescriptor {
    match name.parse::<PlatformId>() {
        Ok(id) => get_config(id),
        Err(_) => {
            log::warn!(
                "Platform configuration not found for: {}. Falling back to {}.",
                name,
                PlatformId::default()
            );
            default_config()
        }
    }
}

pub fn all_configs() -> Vec<StyleDescriptor> {
    PlatformId::ALL.into_iter().map(get_config).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_is_valid_and_matches_its_id() {
        for config in all_configs() {
            config.validate().unwrap();
            assert_eq!(config.name, config.id.as_str());
        }
    }

    #[test]
    fn lookup_by_name() {
        assert_eq!(config_for("WhatsApp").id, PlatformId::WhatsApp);
        assert_eq!(config_for(" linkedin ").display_name, "LinkedIn");
        assert_eq!(config_for("myspace").id, PlatformId::Instagram);
        assert_eq!(config_for(""), default_config());
    }

    #[test]
    fn facebook_values() {
        let fb = get_config(PlatformId::Facebook);
        assert_eq!(fb.display_name, "Facebook Messenger");
        assert_eq!(fb.colors.user_bubble, "#0084FF");
        assert_eq!(fb.typography.font_family, "Helvetica, Arial, sans-serif");
        assert_eq!(
            fb.colors.gradient,
            Some(Gradient {
                from: "#0084FF".into(),
                to: "#44BDF6".into()
            })
        );
    }

    #[test]
    fn mismatched_extras_are_invalid() {
        let mut config = get_config(PlatformId::Tinder);
        config.extras = get_config(PlatformId::Twitter).extras;
        assert!(config.validate().is_err());
        let mut config = get_config(PlatformId::Tinder);
        config.colors.text = "blurple".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(get_config(PlatformId::WhatsApp)).unwrap();
        assert_eq!(json["id"], "whatsapp");
        assert_eq!(json["colors"]["userBubble"], "#DCF8C6");
        assert_eq!(json["features"]["timestampFormat"], "24h");
        assert_eq!(json["extras"]["platform"], "whatsapp");
        assert_eq!(json["extras"]["hasLastSeen"], true);

        let back: StyleDescriptor = serde_json::from_value(json).unwrap();
        assert_eq!(back, get_config(PlatformId::WhatsApp));
    }

    #[test]
    fn css_variables_are_prefixed() {
        let vars = get_config(PlatformId::Twitter).css_variables();
        assert!(vars.contains(&("--twitter-primary".to_string(), "#1DA1F2".to_string())));
        assert_eq!(vars.len(), 12);
    }
}
