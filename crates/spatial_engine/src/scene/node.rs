//! Interior nodes
//!
//! A [`Node`] owns an ordered list of child spatials behind its own lock.
//! Attaching and detaching go through [`Spatial`] so the child's parent
//! link is kept in step with the list.

use std::sync::{Arc, Weak};

use parking_lot::{RwLock, RwLockReadGuard};

use crate::scene::spatial::Spatial;

/// Children of an interior node
#[derive(Debug, Default)]
pub struct Node {
    children: RwLock<Vec<Arc<Spatial>>>,
}

impl Node {
    pub(crate) fn read_children(&self) -> RwLockReadGuard<'_, Vec<Arc<Spatial>>> {
        self.children.read()
    }

    /// Snapshot of the children in attachment order
    pub fn children(&self) -> Vec<Arc<Spatial>> {
        self.children.read().clone()
    }

    /// Number of children
    pub fn child_count(&self) -> usize {
        self.children.read().len()
    }

    /// Child at `index`
    pub fn child(&self, index: usize) -> Option<Arc<Spatial>> {
        self.children.read().get(index).cloned()
    }

    /// Whether `spatial` is a direct child
    pub fn contains(&self, spatial: &Spatial) -> bool {
        self.children.read().iter().any(|child| std::ptr::eq(Arc::as_ptr(child), spatial))
    }

    fn remove(&self, spatial: &Spatial) -> Option<Arc<Spatial>> {
        let mut children = self.children.write();
        let index = children.iter().position(|child| std::ptr::eq(Arc::as_ptr(child), spatial))?;
        Some(children.remove(index))
    }
}

impl Spatial {
    /// Attach `child` to this node, detaching it from any previous parent
    ///
    /// Refuses (with a warning) when this spatial is a leaf or when the
    /// attachment would make `child` its own ancestor.
    pub fn attach_child(self: &Arc<Self>, child: &Arc<Spatial>) -> bool {
        let Some(node) = self.as_node() else {
            log::warn!("Cannot attach {} to {} {}: not a node", child.name(), self.kind().label(), self.name());
            return false;
        };
        if Arc::ptr_eq(self, child) || self.has_ancestor(child) {
            log::warn!("Attaching {} to {} would create a cycle", child.name(), self.name());
            return false;
        }

        if let Some(previous) = child.parent() {
            previous.detach_child(child);
        }
        node.children.write().push(Arc::clone(child));
        child.set_parent(Arc::downgrade(self));
        log::trace!("Attached {} to {}", child.name(), self.name());
        true
    }

    /// Detach a direct child; `false` when it is not a child of this node
    pub fn detach_child(&self, child: &Spatial) -> bool {
        match self.as_node().and_then(|node| node.remove(child)) {
            Some(removed) => {
                removed.set_parent(Weak::new());
                true
            }
            None => false,
        }
    }

    /// Detach the child at `index`
    pub fn detach_child_at(&self, index: usize) -> Option<Arc<Spatial>> {
        let node = self.as_node()?;
        let removed = {
            let mut children = node.children.write();
            (index < children.len()).then(|| children.remove(index))
        }?;
        removed.set_parent(Weak::new());
        Some(removed)
    }

    /// Detach every child and return them
    pub fn detach_all_children(&self) -> Vec<Arc<Spatial>> {
        let Some(node) = self.as_node() else {
            return Vec::new();
        };
        let removed = std::mem::take(&mut *node.children.write());
        for child in &removed {
            child.set_parent(Weak::new());
        }
        removed
    }

    /// Snapshot of the children; empty for leaves
    pub fn children(&self) -> Vec<Arc<Spatial>> {
        self.as_node().map(Node::children).unwrap_or_default()
    }

    /// Number of children; zero for leaves
    pub fn child_count(&self) -> usize {
        self.as_node().map_or(0, Node::child_count)
    }

    /// First descendant named `name`, depth first
    pub fn find(&self, name: &str) -> Option<Arc<Spatial>> {
        let node = self.as_node()?;
        for child in node.read_children().iter() {
            if child.name() == name {
                return Some(Arc::clone(child));
            }
            if let Some(found) = child.find(name) {
                return Some(found);
            }
        }
        None
    }

    /// Call `visit` on this spatial and every descendant, parents first
    pub fn for_each(&self, visit: &mut dyn FnMut(&Spatial)) {
        visit(self);
        if let Some(node) = self.as_node() {
            for child in node.read_children().iter() {
                child.for_each(visit);
            }
        }
    }
}
