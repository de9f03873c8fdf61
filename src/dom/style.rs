//! Inline styles, a minimal stylesheet and computed-style resolution.

use std::collections::HashMap;

/// Properties whose computed value is taken from the parent when unset.
const INHERITED: &[&str] = &["visibility", "color", "font-size", "line-height"];

/// Elements that never produce boxes.
const NON_RENDERED: &[&str] = &[
    "head", "script", "style", "title", "meta", "link", "template", "noscript",
];

/// An element's `style` attribute as an ordered declaration list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InlineStyle {
    declarations: Vec<(String, String)>,
    readonly: bool,
}

impl InlineStyle {
    pub fn parse(css: &str) -> Self {
        Self {
            declarations: parse_declarations(css),
            readonly: false,
        }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|(k, _)| k == property)
            .map(|(_, v)| v.as_str())
    }

    /// Set a property in place, keeping declaration order stable.
    ///
    /// An empty value removes the declaration, like assigning `""` through
    /// the DOM style object.
    pub fn set(&mut self, property: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            self.remove(property);
            return;
        }
        match self.declarations.iter_mut().find(|(k, _)| k == property) {
            Some(decl) => decl.1 = value.to_string(),
            None => self
                .declarations
                .push((property.to_ascii_lowercase(), value.to_string())),
        }
    }

    pub fn remove(&mut self, property: &str) -> Option<String> {
        let idx = self.declarations.iter().position(|(k, _)| k == property)?;
        Some(self.declarations.remove(idx).1)
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn set_readonly(&mut self, readonly: bool) {
        self.readonly = readonly;
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.declarations.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_css_text(&self) -> String {
        self.declarations
            .iter()
            .map(|(k, v)| format!("{}: {};", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn parse_declarations(css: &str) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    for decl in css.split(';') {
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim().trim_end_matches("!important").trim();
        if name.is_empty() || value.is_empty() {
            continue;
        }
        match out.iter_mut().find(|(k, _)| *k == name) {
            Some(existing) => existing.1 = value.to_string(),
            None => out.push((name, value.to_string())),
        }
    }
    out
}

/// One compound selector: `tag`, `.class`, `#id`, `*` or a combination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SimpleSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl SimpleSelector {
    /// Parse a compound selector. Descendant/child combinators and pseudo
    /// classes are not supported and yield `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty()
            || text
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ':' | '['))
        {
            return None;
        }

        let mut sel = SimpleSelector::default();
        let mut rest = text;
        if let Some(stripped) = rest.strip_prefix('*') {
            rest = stripped;
        } else {
            let end = rest.find(['.', '#']).unwrap_or(rest.len());
            if end > 0 {
                sel.tag = Some(rest[..end].to_ascii_lowercase());
            }
            rest = &rest[end..];
        }

        while !rest.is_empty() {
            let (is_class, body) = if let Some(body) = rest.strip_prefix('.') {
                (true, body)
            } else if let Some(body) = rest.strip_prefix('#') {
                (false, body)
            } else {
                return None;
            };
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }
            if is_class {
                sel.classes.push(name.to_string());
            } else {
                sel.id = Some(name.to_string());
            }
            rest = &body[end..];
        }
        Some(sel)
    }

    pub fn matches(&self, tag: &str, id: Option<&str>, classes: &[String]) -> bool {
        if let Some(t) = &self.tag {
            if t != tag {
                return false;
            }
        }
        if let Some(want) = &self.id {
            if id != Some(want.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| classes.contains(c))
    }

    /// (ids, classes, tags) as in CSS specificity.
    pub fn specificity(&self) -> (usize, usize, usize) {
        (
            usize::from(self.id.is_some()),
            self.classes.len(),
            usize::from(self.tag.is_some()),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: SimpleSelector,
    pub declarations: Vec<(String, String)>,
    order: usize,
}

/// Rules collected from the document's `<style>` blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let mut sheet = Stylesheet::default();
        sheet.append(css);
        sheet
    }

    /// Append the rules of another style block, preserving source order.
    pub fn append(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();
        while let Some(open) = rest.find('{') {
            let Some(close_rel) = rest[open..].find('}') else {
                break;
            };
            let close = open + close_rel;
            let selectors = &rest[..open];
            let body = &rest[open + 1..close];
            // at-rules (@media and friends) are skipped wholesale
            if !selectors.trim_start().starts_with('@') {
                let declarations = parse_declarations(body);
                for sel in selectors.split(',') {
                    if let Some(selector) = SimpleSelector::parse(sel) {
                        let order = self.rules.len();
                        self.rules.push(Rule {
                            selector,
                            declarations: declarations.clone(),
                            order,
                        });
                    }
                }
            }
            rest = &rest[close + 1..];
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Matching rules ordered by ascending precedence.
    pub fn matching<'a>(
        &'a self,
        tag: &str,
        id: Option<&str>,
        classes: &[String],
    ) -> Vec<&'a Rule> {
        let mut matched: Vec<&Rule> = self
            .rules
            .iter()
            .filter(|r| r.selector.matches(tag, id, classes))
            .collect();
        matched.sort_by_key(|r| (r.selector.specificity(), r.order));
        matched
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

/// Resolved style of one element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    values: HashMap<String, String>,
}

impl ComputedStyle {
    /// Cascade UA defaults, stylesheet rules and the inline style, then fill
    /// inherited properties from `parent`.
    pub fn resolve(
        tag: &str,
        id: Option<&str>,
        classes: &[String],
        inline: &InlineStyle,
        sheet: &Stylesheet,
        parent: Option<&ComputedStyle>,
    ) -> Self {
        let mut values = HashMap::new();
        let display = if NON_RENDERED.contains(&tag) { "none" } else { "block" };
        values.insert("display".to_string(), display.to_string());

        for rule in sheet.matching(tag, id, classes) {
            for (k, v) in &rule.declarations {
                values.insert(k.clone(), v.clone());
            }
        }
        for (k, v) in inline.iter() {
            values.insert(k.to_string(), v.to_string());
        }
        // UA sheet wins over author display for elements that never render
        if NON_RENDERED.contains(&tag) {
            values.insert("display".to_string(), "none".to_string());
        }

        if let Some(parent) = parent {
            for prop in INHERITED {
                let inherit = match values.get(*prop) {
                    None => true,
                    Some(v) => v == "inherit",
                };
                if inherit {
                    if let Some(pv) = parent.get(prop) {
                        values.insert(prop.to_string(), pv.to_string());
                    }
                }
            }
        }
        ComputedStyle { values }
    }

    pub fn get(&self, property: &str) -> Option<&str> {
        self.values.get(property).map(String::as_str)
    }

    pub fn display(&self) -> &str {
        self.get("display").unwrap_or("block")
    }

    pub fn visibility(&self) -> &str {
        self.get("visibility").unwrap_or("visible")
    }

    pub fn opacity(&self) -> f32 {
        self.get("opacity")
            .and_then(|v| v.trim().parse::<f32>().ok())
            .map(|o| o.clamp(0.0, 1.0))
            .unwrap_or(1.0)
    }

    pub fn is_hidden(&self) -> bool {
        self.display() == "none" || self.visibility() == "hidden" || self.opacity() <= 0.0
    }

    /// Length in CSS px for `px` or unitless values.
    pub fn length(&self, property: &str) -> Option<f32> {
        self.get(property).and_then(parse_length)
    }

    /// Length resolved against `basis` for percentages.
    pub fn length_or_percent(&self, property: &str, basis: f32) -> Option<f32> {
        let raw = self.get(property)?.trim();
        match raw.strip_suffix('%') {
            Some(pct) => pct.trim().parse::<f32>().ok().map(|p| basis * p / 100.0),
            None => parse_length(raw),
        }
    }

    pub fn color(&self, property: &str) -> Option<Rgba> {
        self.get(property).and_then(Rgba::parse)
    }

    /// Box edges from a shorthand (`padding: 8px 12px`) plus longhands.
    pub fn edges(&self, property: &str) -> Edges {
        let mut edges = self
            .get(property)
            .map(Edges::parse_shorthand)
            .unwrap_or_default();
        let sides = ["top", "right", "bottom", "left"];
        for side in sides {
            if let Some(v) = self.length(&format!("{}-{}", property, side)) {
                match side {
                    "top" => edges.top = v,
                    "right" => edges.right = v,
                    "bottom" => edges.bottom = v,
                    _ => edges.left = v,
                }
            }
        }
        edges
    }

    /// Border width from `border`/`border-width` (uniform borders only).
    pub fn border_width(&self) -> f32 {
        if let Some(w) = self.length("border-width") {
            return w;
        }
        self.get("border")
            .and_then(|b| b.split_whitespace().find_map(parse_length))
            .unwrap_or(0.0)
    }

    pub fn border_color(&self) -> Option<Rgba> {
        if let Some(c) = self.color("border-color") {
            return Some(c);
        }
        self.get("border")
            .and_then(|b| b.split_whitespace().find_map(Rgba::parse))
    }
}

/// Parse `12px`, `12` or `0`; other units are unsupported.
pub fn parse_length(value: &str) -> Option<f32> {
    let v = value.trim();
    let number = v.strip_suffix("px").unwrap_or(v).trim();
    let parsed = number.parse::<f32>().ok()?;
    parsed.is_finite().then_some(parsed)
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    /// CSS 1-4 value shorthand; `auto` counts as zero.
    pub fn parse_shorthand(value: &str) -> Self {
        let vals: Vec<f32> = value
            .split_whitespace()
            .map(|p| parse_length(p).unwrap_or(0.0))
            .collect();
        match vals.as_slice() {
            [a] => Edges::uniform(*a),
            [v, h] => Edges {
                top: *v,
                right: *h,
                bottom: *v,
                left: *h,
            },
            [t, h, b] => Edges {
                top: *t,
                right: *h,
                bottom: *b,
                left: *h,
            },
            [t, r, b, l, ..] => Edges {
                top: *t,
                right: *r,
                bottom: *b,
                left: *l,
            },
            [] => Edges::default(),
        }
    }

    pub fn horizontal(&self) -> f32 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f32 {
        self.top + self.bottom
    }
}

/// Straight (non-premultiplied) RGBA colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const TRANSPARENT: Rgba = Rgba {
        r: 0,
        g: 0,
        b: 0,
        a: 0,
    };

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba { r, g, b, a: 255 }
    }

    pub fn with_opacity(self, opacity: f32) -> Self {
        let a = (f32::from(self.a) * opacity.clamp(0.0, 1.0)).round() as u8;
        Rgba { a, ..self }
    }

    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    pub fn parse(value: &str) -> Option<Self> {
        let v = value.trim().to_ascii_lowercase();
        if let Some(hex) = v.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = v
            .strip_prefix("rgba(")
            .or_else(|| v.strip_prefix("rgb("))
            .and_then(|s| s.strip_suffix(')'))
        {
            let parts: Vec<&str> = args.split(',').map(str::trim).collect();
            if parts.len() != 3 && parts.len() != 4 {
                return None;
            }
            let channel = |s: &str| s.parse::<f32>().ok().map(|c| c.clamp(0.0, 255.0).round() as u8);
            let a = match parts.get(3) {
                Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
                None => 255,
            };
            return Some(Rgba {
                r: channel(parts[0])?,
                g: channel(parts[1])?,
                b: channel(parts[2])?,
                a,
            });
        }
        match v.as_str() {
            "white" => Some(Rgba::WHITE),
            "black" => Some(Rgba::BLACK),
            "transparent" => Some(Rgba::TRANSPARENT),
            "red" => Some(Rgba::rgb(255, 0, 0)),
            "green" => Some(Rgba::rgb(0, 128, 0)),
            "blue" => Some(Rgba::rgb(0, 0, 255)),
            "gray" | "grey" => Some(Rgba::rgb(128, 128, 128)),
            _ => None,
        }
    }
}

fn parse_hex(hex: &str) -> Option<Rgba> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Rgba {
            r: nibble(0)?,
            g: nibble(1)?,
            b: nibble(2)?,
            a: nibble(3)?,
        }),
        6 => Some(Rgba::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Rgba {
            r: byte(0)?,
            g: byte(2)?,
            b: byte(4)?,
            a: byte(6)?,
        }),
        _ => None,
    }
}
