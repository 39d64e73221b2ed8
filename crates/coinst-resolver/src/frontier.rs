use crate::universe::PackageId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct NodeId(usize);

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) candidates: Vec<PackageId>,
    pub(crate) cursor: Option<usize>,
    /// Tail of the frontier when this node was entered; everything spliced
    /// in after it belongs to the current choice and is trimmed on retry.
    pub(crate) cutoff: Option<NodeId>,
    /// Forced dependencies have already been spliced in right after this node.
    pub(crate) expanded: bool,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    live: bool,
}

impl Node {
    pub(crate) fn chosen(&self) -> Option<PackageId> {
        self.cursor.map(|index| self.candidates[index])
    }
}

#[derive(Debug)]
pub(crate) struct Frontier {
    nodes: Vec<Node>,
    free: Vec<usize>,
    head: NodeId,
    tail: NodeId,
}

impl Frontier {
    pub(crate) fn new(root: Vec<PackageId>) -> Self {
        Self {
            nodes: vec![Node {
                candidates: root,
                cursor: None,
                cutoff: None,
                expanded: false,
                prev: None,
                next: None,
                live: true,
            }],
            free: Vec::new(),
            head: NodeId(0),
            tail: NodeId(0),
        }
    }

    pub(crate) fn head(&self) -> NodeId {
        self.head
    }

    pub(crate) fn tail(&self) -> NodeId {
        self.tail
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node {
        debug_assert!(self.nodes[id.0].live);
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        debug_assert!(self.nodes[id.0].live);
        &mut self.nodes[id.0]
    }

    pub(crate) fn next(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next
    }

    pub(crate) fn prev(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev
    }

    pub(crate) fn insert_after(&mut self, at: NodeId, candidates: Vec<PackageId>) -> NodeId {
        let next = self.node(at).next;
        let node = Node {
            candidates,
            cursor: None,
            cutoff: None,
            expanded: false,
            prev: Some(at),
            next,
            live: true,
        };
        let id = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                NodeId(slot)
            }
            None => {
                self.nodes.push(node);
                NodeId(self.nodes.len() - 1)
            }
        };

        self.node_mut(at).next = Some(id);
        match next {
            Some(next) => self.node_mut(next).prev = Some(id),
            None => self.tail = id,
        }
        id
    }

    /// Drops every node after `at`, which becomes the new tail.
    pub(crate) fn trim_after(&mut self, at: NodeId) {
        let mut cursor = self.node_mut(at).next.take();
        while let Some(id) = cursor {
            let node = &mut self.nodes[id.0];
            debug_assert!(node.live);
            cursor = node.next.take();
            node.prev = None;
            node.live = false;
            node.candidates = Vec::new();
            self.free.push(id.0);
        }
        self.tail = at;
    }

    pub(crate) fn chosen_from_tail(&self) -> Vec<PackageId> {
        let mut chosen = Vec::new();
        let mut cursor = Some(self.tail);
        while let Some(id) = cursor {
            let node = self.node(id);
            if let Some(pkg) = node.chosen() {
                chosen.push(pkg);
            }
            cursor = node.prev;
        }
        chosen
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }
}
