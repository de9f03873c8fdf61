//! Temporary style overrides applied for the duration of a capture.

use std::sync::PoisonError;

use crate::dom::{NodeId, SharedDocument};
use crate::{Error, Result};

/// Inline overrides that promote the node to its own stacking context so it
/// paints on top of siblings while captured.
pub const CAPTURE_OVERRIDES: &[(&str, &str)] = &[
    ("transform", "translateZ(0)"),
    ("position", "relative"),
    ("z-index", "1"),
];

/// Restores the inline style of a prepared node.
///
/// Restoration happens on [`StyleGuard::restore`] or on drop, whichever
/// comes first; it runs at most once.
#[derive(Debug)]
pub struct StyleGuard {
    document: SharedDocument,
    node: NodeId,
    saved: Vec<(&'static str, Option<String>)>,
    restored: bool,
}

impl StyleGuard {
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Put every overridden property back to its prior literal value.
    ///
    /// A poisoned document lock is recovered; the overrides are still undone.
    pub fn restore(&mut self) -> Result<()> {
        if self.restored {
            return Ok(());
        }
        let mut doc = self.document.lock().unwrap_or_else(PoisonError::into_inner);
        self.restored = true;
        let Some(el) = doc.get_mut(self.node) else {
            return Ok(());
        };
        for (property, previous) in self.saved.drain(..) {
            match previous {
                Some(value) => el.style.set(property, &value),
                None => {
                    el.style.remove(property);
                }
            }
        }
        log::debug!("restored capture styles on node {}", self.node.index());
        Ok(())
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }
}

impl Drop for StyleGuard {
    fn drop(&mut self) {
        if let Err(e) = self.restore() {
            log::warn!("failed to restore capture styles: {}", e);
        }
    }
}

/// Apply [`CAPTURE_OVERRIDES`] to `node` and return the guard that undoes
/// them.
pub fn prepare(document: &SharedDocument, node: NodeId) -> Result<StyleGuard> {
    let mut doc = document
        .lock()
        .map_err(|_| Error::Preparation("document lock poisoned".into()))?;
    let el = doc
        .get_mut(node)
        .ok_or_else(|| Error::Preparation("node does not belong to the document".into()))?;
    if el.style.is_readonly() {
        return Err(Error::Preparation("inline style is read-only".into()));
    }

    let mut saved = Vec::with_capacity(CAPTURE_OVERRIDES.len());
    for (property, value) in CAPTURE_OVERRIDES {
        saved.push((*property, el.style.get(property).map(str::to_string)));
        el.style.set(property, value);
    }

    Ok(StyleGuard {
        document: document.clone(),
        node,
        saved,
        restored: false,
    })
}
