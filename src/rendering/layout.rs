/// Block layout for the document model.
///
/// Every rendered element is a block stacked vertically inside its parent's
/// content box. Widths and heights are border-box sizes. Text runs are
/// wrapped on whitespace with a fixed advance of 0.6em per character.

use crate::dom::{Child, ComputedStyle, Document, Edges, NodeId};

pub const DEFAULT_FONT_SIZE: f32 = 16.0;
/// Horizontal advance of one glyph, in em.
pub const ADVANCE_EM: f32 = 0.6;
const LINE_HEIGHT_EM: f32 = 1.25;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn translate(&self, dx: f32, dy: f32) -> Rect {
        Rect {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxModel {
    pub margin: Edges,
    pub border: f32,
    pub padding: Edges,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutBox {
    /// Border box
    pub rect: Rect,
    pub box_model: BoxModel,
}

impl LayoutBox {
    pub fn content_width(&self) -> f32 {
        let total = self.box_model.border * 2.0 + self.box_model.padding.horizontal();
        (self.rect.width - total).max(0.0)
    }

    pub fn outer_height(&self) -> f32 {
        self.rect.height + self.box_model.margin.vertical()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Block,
    Image { src: String },
}

/// One wrapped line of text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub font_size: f32,
    pub line_height: f32,
}

#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub node: NodeId,
    pub rect: Rect,
    pub lb: LayoutBox,
    pub elem_type: ElementType,
    pub style: ComputedStyle,
    pub text: Vec<TextRun>,
    pub children: Vec<LayoutNode>,
}

impl LayoutNode {
    pub fn find(&self, node: NodeId) -> Option<&LayoutNode> {
        if self.node == node {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(node))
    }
}

#[derive(Debug, Clone, Default)]
pub struct LayoutTree {
    pub root: Option<LayoutNode>,
}

impl LayoutTree {
    pub fn find(&self, node: NodeId) -> Option<&LayoutNode> {
        self.root.as_ref().and_then(|r| r.find(node))
    }
}

/// Lay out the attached document at its viewport width.
pub fn layout_document(document: &Document) -> LayoutTree {
    let width = document.viewport().width as f32;
    LayoutTree {
        root: layout_node(document, document.root(), None, 0.0, 0.0, width),
    }
}

fn layout_node(
    doc: &Document,
    id: NodeId,
    parent_style: Option<&ComputedStyle>,
    x: f32,
    y: f32,
    avail: f32,
) -> Option<LayoutNode> {
    let el = doc.get(id)?;
    let style = ComputedStyle::resolve(
        &el.tag,
        el.id.as_deref(),
        &el.classes,
        &el.style,
        doc.stylesheet(),
        parent_style,
    );
    if style.display() == "none" {
        return None;
    }

    let margin = style.edges("margin");
    let padding = style.edges("padding");
    let border = style.border_width();

    let elem_type = if el.tag == "img" {
        ElementType::Image {
            src: el.attr("src").unwrap_or_default().to_string(),
        }
    } else {
        ElementType::Block
    };

    let attr_len = |name: &str| el.attr(name).and_then(crate::dom::style::parse_length);
    let width = match elem_type {
        ElementType::Image { .. } => style
            .length_or_percent("width", avail)
            .or_else(|| attr_len("width"))
            .unwrap_or(0.0),
        ElementType::Block => style
            .length_or_percent("width", avail)
            .unwrap_or(avail - margin.horizontal()),
    }
    .max(0.0);

    let content_x = x + margin.left + border + padding.left;
    let content_w = (width - border * 2.0 - padding.horizontal()).max(0.0);
    let start_y = y + margin.top + border + padding.top;
    let mut cursor = start_y;

    let font_size = style.length("font-size").unwrap_or(DEFAULT_FONT_SIZE);
    let line_height = style
        .length("line-height")
        .unwrap_or(font_size * LINE_HEIGHT_EM);

    let mut text = Vec::new();
    let mut children = Vec::new();
    for child in el.children() {
        match child {
            Child::Text(t) => {
                for line in wrap_text(t, content_w, font_size) {
                    text.push(TextRun {
                        x: content_x,
                        y: cursor,
                        text: line,
                        font_size,
                        line_height,
                    });
                    cursor += line_height;
                }
            }
            Child::Element(c) => {
                if let Some(n) = layout_node(doc, *c, Some(&style), content_x, cursor, content_w) {
                    cursor += n.lb.outer_height();
                    children.push(n);
                }
            }
        }
    }

    let natural = cursor - start_y + padding.vertical() + border * 2.0;
    let height = match elem_type {
        ElementType::Image { .. } => style
            .length("height")
            .or_else(|| attr_len("height"))
            .unwrap_or(width),
        ElementType::Block => style.length("height").unwrap_or(natural),
    }
    .max(0.0);

    let rect = Rect {
        x: x + margin.left,
        y: y + margin.top,
        width,
        height,
    };
    Some(LayoutNode {
        node: id,
        rect,
        lb: LayoutBox {
            rect,
            box_model: BoxModel {
                margin,
                border,
                padding,
            },
        },
        elem_type,
        style,
        text,
        children,
    })
}

/// Collapse whitespace and greedily wrap words to the content width.
pub fn wrap_text(raw: &str, content_width: f32, font_size: f32) -> Vec<String> {
    let advance = font_size * ADVANCE_EM;
    let chars_per_line = if advance > 0.0 && content_width >= advance {
        (content_width / advance) as usize
    } else {
        1
    };

    let mut lines = Vec::new();
    let mut cur = String::new();
    for word in raw.split_whitespace() {
        if !cur.is_empty() && cur.chars().count() + word.chars().count() + 1 > chars_per_line {
            lines.push(std::mem::take(&mut cur));
        }
        if !cur.is_empty() {
            cur.push(' ');
        }
        cur.push_str(word);
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    lines
}
