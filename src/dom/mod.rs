//! In-process document model used as the capture target.
//!
//! Markup is parsed with `scraper` and walked into an arena of [`Element`]s
//! linked by parent index, the same traversal the page harness uses. Nodes
//! keep their ids after being detached, so a handle taken before a removal
//! still refers to the (now detached) element.

pub mod style;

use std::sync::{Arc, Mutex};

use scraper::{ElementRef, Html};

use crate::rendering::layout::{self, LayoutTree, Rect};
use crate::Viewport;
pub use style::{ComputedStyle, Edges, InlineStyle, Rgba, Stylesheet};

/// A document shared between the caller and a capture attempt.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Index of an element in its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Content of an element, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Child {
    Text(String),
    Element(NodeId),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<(String, String)>,
    pub style: InlineStyle,
    parent: Option<NodeId>,
    children: Vec<Child>,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[Child] {
        &self.children
    }

    pub fn element_children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children.iter().filter_map(|c| match c {
            Child::Element(id) => Some(*id),
            Child::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Element>,
    root: NodeId,
    stylesheet: Stylesheet,
    viewport: Viewport,
    base_url: Option<url::Url>,
}

impl Document {
    /// Parse an HTML document. Parsing is lenient, as in browsers.
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut nodes: Vec<Element> = Vec::new();
        let mut stylesheet = Stylesheet::default();

        // Depth-first walk preserving document order; children are linked
        // after their parent has an index.
        let mut stack: Vec<(ElementRef, Option<NodeId>)> = vec![(parsed.root_element(), None)];
        while let Some((node, parent)) = stack.pop() {
            let value = node.value();
            let tag = value.name().to_ascii_lowercase();
            let attributes = value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<Vec<_>>();
            let id = value.attr("id").map(|s| s.to_string());
            let classes = value
                .attr("class")
                .map(|c| c.split_whitespace().map(str::to_string).collect())
                .unwrap_or_default();
            let style = value.attr("style").map(InlineStyle::parse).unwrap_or_default();

            let this = NodeId(nodes.len());
            let mut children = Vec::new();
            let mut element_children = Vec::new();
            for child in node.children() {
                if let Some(el) = ElementRef::wrap(child) {
                    // placeholder, patched once the child gets its id
                    children.push(Child::Element(NodeId(usize::MAX)));
                    element_children.push(el);
                } else if let Some(text) = child.value().as_text() {
                    let text: &str = text;
                    if tag == "style" {
                        stylesheet.append(text);
                    }
                    children.push(Child::Text(text.to_string()));
                }
            }

            nodes.push(Element {
                tag,
                id,
                classes,
                attributes,
                style,
                parent,
                children,
            });
            if let Some(p) = parent {
                let slot = nodes[p.0]
                    .children
                    .iter_mut()
                    .find(|c| matches!(c, Child::Element(NodeId(usize::MAX))));
                if let Some(slot) = slot {
                    *slot = Child::Element(this);
                }
            }
            for el in element_children.into_iter().rev() {
                stack.push((el, Some(this)));
            }
        }

        Document {
            nodes,
            root: NodeId(0),
            stylesheet,
            viewport: Viewport::default(),
            base_url: None,
        }
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    pub fn base_url(&self) -> Option<&url::Url> {
        self.base_url.as_ref()
    }

    pub fn set_base_url(&mut self, base: url::Url) {
        self.base_url = Some(base);
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        &self.stylesheet
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len()
    }

    pub fn get(&self, node: NodeId) -> Option<&Element> {
        self.nodes.get(node.0)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut Element> {
        self.nodes.get_mut(node.0)
    }

    /// First attached element with the given `id` attribute.
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.nodes[n.0].id.as_deref() == Some(id))
    }

    /// `node` and every element below it, in document order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(node) {
            return out;
        }
        let mut stack = vec![node];
        while let Some(n) = stack.pop() {
            out.push(n);
            let children: Vec<NodeId> = self.nodes[n.0].element_children().collect();
            stack.extend(children.into_iter().rev());
        }
        out
    }

    /// Concatenated text of the element's direct text children.
    pub fn own_text(&self, node: NodeId) -> String {
        self.get(node)
            .map(|el| {
                el.children
                    .iter()
                    .filter_map(|c| match c {
                        Child::Text(t) => Some(t.as_str()),
                        Child::Element(_) => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `node` is reachable from the document root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut cur = Some(node);
        while let Some(n) = cur {
            if n == self.root {
                return true;
            }
            cur = self.get(n).and_then(|el| el.parent);
        }
        false
    }

    /// Remove `node` from its parent. The element and its subtree stay in
    /// the arena and keep their ids.
    pub fn detach(&mut self, node: NodeId) -> bool {
        let Some(parent) = self.get(node).and_then(|el| el.parent) else {
            return false;
        };
        self.nodes[parent.0]
            .children
            .retain(|c| *c != Child::Element(node));
        self.nodes[node.0].parent = None;
        true
    }

    /// Append a detached element under `parent`.
    pub fn append_child(&mut self, parent: NodeId, node: NodeId) -> bool {
        if !self.contains(parent) || !self.contains(node) || node == self.root {
            return false;
        }
        if self.nodes[node.0].parent.is_some() || self.ancestors(parent).contains(&node) {
            return false;
        }
        self.nodes[parent.0].children.push(Child::Element(node));
        self.nodes[node.0].parent = Some(parent);
        true
    }

    /// `node` and its ancestors, innermost first.
    pub fn ancestors(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cur = Some(node);
        while let Some(n) = cur {
            if !self.contains(n) {
                break;
            }
            out.push(n);
            cur = self.nodes[n.0].parent;
        }
        out
    }

    pub fn style_property(&self, node: NodeId, property: &str) -> Option<&str> {
        self.get(node).and_then(|el| el.style.get(property))
    }

    pub fn computed_style(&self, node: NodeId) -> Option<ComputedStyle> {
        if !self.contains(node) {
            return None;
        }
        let mut chain = self.ancestors(node);
        chain.reverse();
        let mut parent: Option<ComputedStyle> = None;
        for n in chain {
            let el = &self.nodes[n.0];
            let cs = ComputedStyle::resolve(
                &el.tag,
                el.id.as_deref(),
                &el.classes,
                &el.style,
                &self.stylesheet,
                parent.as_ref(),
            );
            parent = Some(cs);
        }
        parent
    }

    /// Whether the node or any ancestor has `display: none`.
    pub fn is_display_none(&self, node: NodeId) -> bool {
        self.ancestors(node).into_iter().any(|n| {
            self.computed_style(n)
                .map(|cs| cs.display() == "none")
                .unwrap_or(false)
        })
    }

    pub fn layout(&self) -> LayoutTree {
        layout::layout_document(self)
    }

    /// Border box of `node` in document coordinates; `None` when the node
    /// does not produce a box (detached or not displayed).
    pub fn bounding_box(&self, node: NodeId) -> Option<Rect> {
        if !self.is_attached(node) {
            return None;
        }
        self.layout().find(node).map(|n| n.rect)
    }
}
