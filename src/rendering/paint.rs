/// Paint commands built from a layout subtree.

use crate::dom::Rgba;
use crate::rendering::layout::{ElementType, LayoutNode};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        rgba: Rgba,
    },
    Text {
        x: f32,
        y: f32,
        text: String,
        font_size: f32,
        line_height: f32,
        rgba: Rgba,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        src: String,
        opacity: f32,
    },
}

/// Walk `root` and emit commands in paint order with coordinates relative
/// to the root's border box.
pub fn build_display_list(root: &LayoutNode) -> Vec<PaintCommand> {
    let mut out = Vec::new();
    let (dx, dy) = (-root.rect.x, -root.rect.y);
    paint_node(root, dx, dy, 1.0, &mut out);
    out
}

/// Image sources referenced by a display list, deduplicated in order.
pub fn image_sources(commands: &[PaintCommand]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for cmd in commands {
        if let PaintCommand::Image { src, .. } = cmd {
            if !src.is_empty() && !out.contains(src) {
                out.push(src.clone());
            }
        }
    }
    out
}

fn paint_node(node: &LayoutNode, dx: f32, dy: f32, inherited_opacity: f32, out: &mut Vec<PaintCommand>) {
    let opacity = inherited_opacity * node.style.opacity();
    if opacity <= 0.0 {
        return;
    }
    let visible = node.style.visibility() != "hidden";
    let rect = node.rect.translate(dx, dy);

    if visible {
        if let Some(bg) = node.style.color("background-color").or_else(|| {
            node.style
                .get("background")
                .and_then(|b| b.split_whitespace().find_map(Rgba::parse))
        }) {
            if bg.a > 0 {
                out.push(PaintCommand::SolidRect {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    rgba: bg.with_opacity(opacity),
                });
            }
        }

        let bw = node.lb.box_model.border;
        if bw > 0.0 {
            let color = node.style.border_color().unwrap_or(Rgba::BLACK).with_opacity(opacity);
            let edges = [
                (rect.x, rect.y, rect.width, bw),
                (rect.x, rect.y + rect.height - bw, rect.width, bw),
                (rect.x, rect.y, bw, rect.height),
                (rect.x + rect.width - bw, rect.y, bw, rect.height),
            ];
            for (x, y, width, height) in edges {
                out.push(PaintCommand::SolidRect {
                    x,
                    y,
                    width,
                    height,
                    rgba: color,
                });
            }
        }

        if let ElementType::Image { src } = &node.elem_type {
            if !rect.is_empty() {
                out.push(PaintCommand::Image {
                    x: rect.x,
                    y: rect.y,
                    width: rect.width,
                    height: rect.height,
                    src: src.clone(),
                    opacity,
                });
            }
        }

        let color = node.style.color("color").unwrap_or(Rgba::BLACK).with_opacity(opacity);
        for run in &node.text {
            out.push(PaintCommand::Text {
                x: run.x + dx,
                y: run.y + dy,
                text: run.text.clone(),
                font_size: run.font_size,
                line_height: run.line_height,
                rgba: color,
            });
        }
    }

    // visibility: hidden children may opt back in with visibility: visible
    for child in &node.children {
        paint_node(child, dx, dy, opacity, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    #[test]
    fn display_list_is_relative_to_target() {
        let html = r#"<html><body><div style="height: 50px"></div>
<div id="t" style="width: 100px; background-color: #ff0000; color: #00ff00">hi
<img src="data:image/png;base64,AAAA" width="10" height="10"></div></body></html>"#;
        let doc = Document::parse(html);
        let tree = doc.layout();
        let target = tree.find(doc.element_by_id("t").unwrap()).unwrap();
        let cmds = build_display_list(target);

        match &cmds[0] {
            PaintCommand::SolidRect { x, y, width, rgba, .. } => {
                assert_eq!((*x, *y, *width), (0.0, 0.0, 100.0));
                assert_eq!(*rgba, Rgba::rgb(255, 0, 0));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(cmds.iter().any(|c| matches!(c, PaintCommand::Text { text, y, .. } if text == "hi" && *y == 0.0)));
        assert_eq!(image_sources(&cmds), vec!["data:image/png;base64,AAAA".to_string()]);
    }

    #[test]
    fn hidden_nodes_paint_nothing_but_children_may() {
        let html = r#"<html><body><div id="t" style="visibility: hidden; background: #000">
<p style="visibility: visible">shown</p><p>hidden</p></div></body></html>"#;
        let doc = Document::parse(html);
        let tree = doc.layout();
        let cmds = build_display_list(tree.find(doc.element_by_id("t").unwrap()).unwrap());
        let texts: Vec<&str> = cmds
            .iter()
            .filter_map(|c| match c {
                PaintCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(texts, vec!["shown"]);
        assert!(!cmds.iter().any(|c| matches!(c, PaintCommand::SolidRect { .. })));
    }
}
