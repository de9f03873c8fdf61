//! Light/dark theme handling for platform descriptors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{get_config, PlatformId, StyleDescriptor};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        })
    }
}

impl FromStr for Theme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(Error::Config(format!("unknown theme '{}'", other))),
        }
    }
}

/// Descriptor for `id` with colours adjusted for `theme`.
pub fn config_with_theme(id: PlatformId, theme: Theme) -> StyleDescriptor {
    apply_theme(get_config(id), theme)
}

/// Rewrite the surface colours of `config` for `theme`. Brand colours and
/// the user bubble keep their light values.
pub fn apply_theme(mut config: StyleDescriptor, theme: Theme) -> StyleDescriptor {
    if theme == Theme::Dark {
        let c = &mut config.colors;
        c.background = dark_background(&c.background).to_string();
        c.text = dark_text(&c.text).to_string();
        c.text_secondary = dark_text_secondary(&c.text_secondary).to_string();
        c.contact_bubble = dark_contact_bubble(&c.contact_bubble).to_string();
    }
    config
}

fn dark_background(light: &str) -> &'static str {
    match light.to_ascii_uppercase().as_str() {
        "#FFFFFF" => "#000000",
        "#E5DDD5" => "#0B141A",
        _ => "#1A1A1A",
    }
}

fn dark_text(light: &str) -> &'static str {
    match light.to_ascii_uppercase().as_str() {
        "#303030" => "#E1E9F0",
        "#1C1E21" => "#E4E6EA",
        // #262626, #14171A, #424242 and #000000 all map to white
        _ => "#FFFFFF",
    }
}

fn dark_text_secondary(light: &str) -> &'static str {
    match light.to_ascii_uppercase().as_str() {
        "#8E8E8E" => "#A8A8A8",
        "#657786" => "#8B98A5",
        "#667781" => "#8696A0",
        "#65676B" => "#B0B3B8",
        "#999999" => "#CCCCCC",
        _ => "#AAAAAA",
    }
}

fn dark_contact_bubble(light: &str) -> &'static str {
    match light.to_ascii_uppercase().as_str() {
        "#EFEFEF" => "#262626",
        "#F7F9FA" => "#192734",
        "#FFFFFF" => "#262D31",
        "#F1F1F1" => "#3A3B3C",
        "#F5F5F5" | "#F3F2EF" => "#2A2A2A",
        _ => "#333333",
    }
}
