//! Page-level pointer listeners and outside-click dismissal.
//!
//! The page is a tree of nodes. A modal mounts by registering a
//! pointer-down listener on the page and unmounts by dropping the
//! returned [`ListenerGuard`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::composer::CloseSignal;

/// A node in the page tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

/// Parent links of every node; node 0 is the page root.
#[derive(Debug, Clone)]
pub struct ElementTree {
    parents: Vec<Option<NodeId>>,
}

impl ElementTree {
    pub fn new() -> Self {
        Self {
            parents: vec![None],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Add a child under `parent` and return its id.
    pub fn append(&mut self, parent: NodeId) -> NodeId {
        let id = NodeId(self.parents.len() as u32);
        self.parents.push(Some(parent));
        id
    }

    /// Whether `node` is `container` or one of its descendants.
    ///
    /// Unknown nodes are contained by nothing.
    pub fn contains(&self, container: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == container {
                return true;
            }
            current = self.parents.get(n.0 as usize).copied().flatten();
        }
        false
    }
}

impl Default for ElementTree {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub target: NodeId,
}

type Listener = Arc<dyn Fn(&ElementTree, &PointerEvent) + Send + Sync>;

/// The page: its element tree plus document-level pointer listeners.
///
/// Listeners run synchronously in registration order. They must not
/// mutate the tree.
pub struct Page {
    tree: RwLock<ElementTree>,
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Page {
    pub fn new(tree: ElementTree) -> Arc<Self> {
        Arc::new(Self {
            tree: RwLock::new(tree),
            listeners: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        })
    }

    /// Mutate the element tree.
    pub fn with_tree<R>(&self, f: impl FnOnce(&mut ElementTree) -> R) -> R {
        f(&mut self.tree.write().unwrap())
    }

    /// Register a pointer-down listener. It stays installed until the
    /// guard is dropped.
    pub fn add_listener<F>(self: &Arc<Self>, listener: F) -> ListenerGuard
    where
        F: Fn(&ElementTree, &PointerEvent) + Send + Sync + 'static,
    {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .write()
            .unwrap()
            .push((id, Arc::new(listener)));
        ListenerGuard {
            page: Arc::downgrade(self),
            id,
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().unwrap().len()
    }

    /// Deliver a pointer-down to every listener.
    pub fn pointer_down(&self, event: PointerEvent) {
        // Listeners may drop their own guard while running.
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        let tree = self.tree.read().unwrap();
        for listener in listeners {
            listener(&tree, &event);
        }
    }

    fn remove_listener(&self, id: u64) {
        self.listeners.write().unwrap().retain(|(i, _)| *i != id);
    }
}

/// Removes its listener from the page on drop.
pub struct ListenerGuard {
    page: Weak<Page>,
    id: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        if let Some(page) = self.page.upgrade() {
            page.remove_listener(self.id);
        }
    }
}

/// Install the outside-click rule for a modal whose content is rooted at
/// `content`: a pointer-down outside it fires `on_close`, inside does
/// nothing.
pub fn install_outside_click(page: &Arc<Page>, content: NodeId, on_close: CloseSignal) -> ListenerGuard {
    page.add_listener(move |tree, event| {
        if !tree.contains(content, event.target) {
            tracing::debug!(target_node = ?event.target, "pointer-down outside modal content");
            on_close();
        }
    })
}
