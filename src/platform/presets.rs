use super::{
    Colors, Features, FontWeights, Gradient, Layout, Margins, Padding, PlatformExtras, PlatformId,
    StyleDescriptor, TimestampFormat, Typography,
};

const SYSTEM_FONTS: &str =
    "-apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, Helvetica, Arial, sans-serif";

fn s(v: &str) -> String {
    v.to_string()
}

fn gradient(from: &str, to: &str) -> Option<Gradient> {
    Some(Gradient {
        from: s(from),
        to: s(to),
    })
}

fn weights(bold: &str) -> FontWeights {
    FontWeights {
        normal: s("400"),
        medium: s("500"),
        bold: s(bold),
    }
}

fn typography(font_family: &str, sizes: [&str; 3], bold: &str) -> Typography {
    let [message, name, timestamp] = sizes;
    Typography {
        font_family: s(font_family),
        message_size: s(message),
        name_size: s(name),
        timestamp_size: s(timestamp),
        font_weight: weights(bold),
    }
}

fn features(flags: [bool; 4], timestamp_format: TimestampFormat) -> Features {
    let [status, typing, online, reactions] = flags;
    Features {
        has_status_indicators: status,
        has_typing_indicator: typing,
        has_online_status: online,
        has_message_reactions: reactions,
        timestamp_format,
    }
}

fn descriptor(
    id: PlatformId,
    display_name: &str,
    colors: Colors,
    typography: Typography,
    layout: Layout,
    features: Features,
    extras: PlatformExtras,
) -> StyleDescriptor {
    StyleDescriptor {
        id,
        name: s(id.as_str()),
        display_name: s(display_name),
        colors,
        typography,
        layout,
        features,
        extras,
    }
}

pub(super) fn instagram() -> StyleDescriptor {
    descriptor(
        PlatformId::Instagram,
        "Instagram",
        Colors {
            primary: s("#E4405F"),
            secondary: s("#833AB4"),
            background: s("#FFFFFF"),
            user_bubble: s("#E4405F"),
            contact_bubble: s("#EFEFEF"),
            text: s("#262626"),
            text_secondary: s("#8E8E8E"),
            accent: Some(s("#F77737")),
            gradient: gradient("#833AB4", "#E4405F"),
        },
        typography(SYSTEM_FONTS, ["14px", "14px", "11px"], "600"),
        Layout {
            bubble_radius: s("18px"),
            spacing: s("8px"),
            avatar_size: s("24px"),
            max_bubble_width: s("236px"),
            padding: Padding {
                message: s("8px 12px"),
                container: s("16px"),
            },
            margins: Margins {
                message: s("2px 0"),
                timestamp: s("8px 0"),
            },
        },
        features([true, true, true, true], TimestampFormat::TwelveHour),
        PlatformExtras::Instagram {
            has_story_ring: true,
            has_verified_badge: true,
        },
    )
}

pub(super) fn twitter() -> StyleDescriptor {
    descriptor(
        PlatformId::Twitter,
        "Twitter",
        Colors {
            primary: s("#1DA1F2"),
            secondary: s("#14171A"),
            background: s("#FFFFFF"),
            user_bubble: s("#1DA1F2"),
            contact_bubble: s("#F7F9FA"),
            text: s("#14171A"),
            text_secondary: s("#657786"),
            accent: Some(s("#1DA1F2")),
            gradient: None,
        },
        typography(SYSTEM_FONTS, ["15px", "15px", "13px"], "700"),
        Layout {
            bubble_radius: s("16px"),
            spacing: s("12px"),
            avatar_size: s("32px"),
            max_bubble_width: s("320px"),
            padding: Padding {
                message: s("12px 16px"),
                container: s("16px"),
            },
            margins: Margins {
                message: s("4px 0"),
                timestamp: s("8px 0"),
            },
        },
        features([true, false, false, true], TimestampFormat::TwelveHour),
        PlatformExtras::Twitter {
            has_verified_badge: true,
            has_encryption: true,
        },
    )
}

pub(super) fn whatsapp() -> StyleDescriptor {
    descriptor(
        PlatformId::WhatsApp,
        "WhatsApp",
        Colors {
            primary: s("#25D366"),
            secondary: s("#128C7E"),
            background: s("#E5DDD5"),
            user_bubble: s("#DCF8C6"),
            contact_bubble: s("#FFFFFF"),
            text: s("#303030"),
            text_secondary: s("#667781"),
            accent: Some(s("#25D366")),
            gradient: None,
        },
        typography(SYSTEM_FONTS, ["14px", "16px", "11px"], "500"),
        Layout {
            bubble_radius: s("7.5px"),
            spacing: s("2px"),
            avatar_size: s("40px"),
            max_bubble_width: s("65%"),
            padding: Padding {
                message: s("6px 7px 8px 9px"),
                container: s("12px"),
            },
            margins: Margins {
                message: s("1px 0"),
                timestamp: s("4px 0"),
            },
        },
        features([true, true, true, false], TimestampFormat::TwentyFourHour),
        PlatformExtras::WhatsApp {
            has_delivery_status: true,
            has_last_seen: true,
        },
    )
}

pub(super) fn facebook() -> StyleDescriptor {
    descriptor(
        PlatformId::Facebook,
        "Facebook Messenger",
        Colors {
            primary: s("#0084FF"),
            secondary: s("#4267B2"),
            background: s("#FFFFFF"),
            user_bubble: s("#0084FF"),
            contact_bubble: s("#F1F1F1"),
            text: s("#1C1E21"),
            text_secondary: s("#65676B"),
            accent: Some(s("#0084FF")),
            gradient: gradient("#0084FF", "#44BDF6"),
        },
        typography("Helvetica, Arial, sans-serif", ["15px", "13px", "12px"], "600"),
        Layout {
            bubble_radius: s("18px"),
            spacing: s("2px"),
            avatar_size: s("28px"),
            max_bubble_width: s("236px"),
            padding: Padding {
                message: s("8px 12px"),
                container: s("16px"),
            },
            margins: Margins {
                message: s("2px 0"),
                timestamp: s("8px 0"),
            },
        },
        features([true, true, true, true], TimestampFormat::TwelveHour),
        PlatformExtras::Facebook {
            has_active_status: true,
        },
    )
}

pub(super) fn tinder() -> StyleDescriptor {
    descriptor(
        PlatformId::Tinder,
        "Tinder",
        Colors {
            primary: s("#FD5068"),
            secondary: s("#FF4458"),
            background: s("#FFFFFF"),
            user_bubble: s("#FD5068"),
            contact_bubble: s("#F5F5F5"),
            text: s("#424242"),
            text_secondary: s("#999999"),
            accent: Some(s("#FF4458")),
            gradient: gradient("#FD5068", "#FF4458"),
        },
        typography(SYSTEM_FONTS, ["16px", "18px", "12px"], "600"),
        Layout {
            bubble_radius: s("20px"),
            spacing: s("8px"),
            avatar_size: s("40px"),
            max_bubble_width: s("280px"),
            padding: Padding {
                message: s("12px 16px"),
                container: s("20px"),
            },
            margins: Margins {
                message: s("4px 0"),
                timestamp: s("12px 0"),
            },
        },
        features([false, true, false, false], TimestampFormat::TwelveHour),
        PlatformExtras::Tinder {
            has_match_info: true,
            has_gif_support: true,
        },
    )
}

pub(super) fn linkedin() -> StyleDescriptor {
    descriptor(
        PlatformId::LinkedIn,
        "LinkedIn",
        Colors {
            primary: s("#0A66C2"),
            secondary: s("#004182"),
            background: s("#FFFFFF"),
            user_bubble: s("#0A66C2"),
            contact_bubble: s("#F3F2EF"),
            text: s("#000000"),
            text_secondary: s("#666666"),
            accent: Some(s("#057642")),
            gradient: gradient("#0A66C2", "#004182"),
        },
        typography(SYSTEM_FONTS, ["14px", "16px", "11px"], "600"),
        Layout {
            bubble_radius: s("16px"),
            spacing: s("8px"),
            avatar_size: s("40px"),
            max_bubble_width: s("320px"),
            padding: Padding {
                message: s("10px 14px"),
                container: s("16px"),
            },
            margins: Margins {
                message: s("2px 0"),
                timestamp: s("8px 0"),
            },
        },
        features([false, true, true, false], TimestampFormat::TwelveHour),
        PlatformExtras::LinkedIn {
            has_professional_info: true,
            has_connection_status: true,
        },
    )
}
