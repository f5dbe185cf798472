use std::{collections::BTreeSet, fmt, hash::Hash, rc::Rc};

use indexmap::IndexMap;

use super::{action::Action, literal::Literal};

/// Parent, child and sibling links of a planning graph node.
///
/// `parents` and `children` index into the neighbouring levels, `mutex` indexes into
/// the node's own level.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Links {
    pub parents: BTreeSet<usize>,
    pub children: BTreeSet<usize>,
    pub mutex: BTreeSet<usize>,
}

/// Common surface of literal and action nodes.
pub trait PgNode {
    /// Semantic identity of the node, independent of the level it lives in.
    type Key: Clone + Eq + Hash + fmt::Debug;

    fn key(&self) -> Self::Key;
    fn links(&self) -> &Links;
    fn links_mut(&mut self) -> &mut Links;

    fn parents(&self) -> &BTreeSet<usize> {
        &self.links().parents
    }

    fn children(&self) -> &BTreeSet<usize> {
        &self.links().children
    }

    fn mutex(&self) -> &BTreeSet<usize> {
        &self.links().mutex
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralNode {
    pub literal: Literal,
    links: Links,
}

impl LiteralNode {
    pub fn new(literal: Literal) -> Self {
        Self { literal, links: Links::default() }
    }

    pub fn is_pos(&self) -> bool {
        self.literal.is_pos
    }
}

impl PgNode for LiteralNode {
    type Key = Literal;

    fn key(&self) -> Literal {
        self.literal.clone()
    }

    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

/// Action nodes compare by action name and persistence, not by level.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionKey {
    pub name: String,
    pub persistent: bool,
}

#[derive(Debug, Clone)]
pub struct ActionNode {
    pub action: Rc<Action>,
    prenodes: BTreeSet<Literal>,
    effnodes: BTreeSet<Literal>,
    is_persistent: bool,
    links: Links,
}

impl ActionNode {
    pub fn new(action: Rc<Action>) -> Self {
        let prenodes = action.preconditions();
        let effnodes = action.effects();
        let is_persistent = prenodes == effnodes;
        Self { action, prenodes, effnodes, is_persistent, links: Links::default() }
    }

    /// Literals that must be present in the previous literal level.
    pub fn prenodes(&self) -> &BTreeSet<Literal> {
        &self.prenodes
    }

    /// Literals this action produces in the next literal level.
    pub fn effnodes(&self) -> &BTreeSet<Literal> {
        &self.effnodes
    }

    pub fn is_persistent(&self) -> bool {
        self.is_persistent
    }

    /// Same action with no links, ready to be placed in another level.
    pub fn detached(&self) -> Self {
        Self {
            action: Rc::clone(&self.action),
            prenodes: self.prenodes.clone(),
            effnodes: self.effnodes.clone(),
            is_persistent: self.is_persistent,
            links: Links::default(),
        }
    }
}

impl PartialEq for ActionNode {
    fn eq(&self, other: &Self) -> bool {
        self.is_persistent == other.is_persistent && self.action.name == other.action.name
    }
}

impl Eq for ActionNode {}

impl PgNode for ActionNode {
    type Key = ActionKey;

    fn key(&self) -> ActionKey {
        ActionKey { name: self.action.name.clone(), persistent: self.is_persistent }
    }

    fn links(&self) -> &Links {
        &self.links
    }

    fn links_mut(&mut self) -> &mut Links {
        &mut self.links
    }
}

/// One graph level: exactly one node per semantic identity, in insertion order.
#[derive(Debug, Clone)]
pub struct Level<N: PgNode> {
    nodes: IndexMap<N::Key, N>,
}

impl<N: PgNode> Default for Level<N> {
    fn default() -> Self {
        Self { nodes: IndexMap::new() }
    }
}

impl<N: PgNode> Level<N> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the index of the node with the same identity, inserting `node` if there
    /// is none yet. An existing node keeps its links.
    pub fn insert(&mut self, node: N) -> usize {
        let entry = self.nodes.entry(node.key());
        let idx = entry.index();
        entry.or_insert(node);
        idx
    }

    pub fn index_of(&self, key: &N::Key) -> Option<usize> {
        self.nodes.get_index_of(key)
    }

    pub fn contains(&self, key: &N::Key) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn get(&self, idx: usize) -> Option<&N> {
        self.nodes.get_index(idx).map(|(_, node)| node)
    }

    pub fn find(&self, key: &N::Key) -> Option<&N> {
        self.nodes.get(key)
    }

    /// # Panics
    /// When `idx` is out of range.
    pub fn node(&self, idx: usize) -> &N {
        &self.nodes[idx]
    }

    pub(crate) fn node_mut(&mut self, idx: usize) -> &mut N {
        &mut self.nodes[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = &N> {
        self.nodes.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &N::Key> {
        self.nodes.keys()
    }

    /// True when both levels hold the same set of node identities.
    pub fn same_nodes(&self, other: &Self) -> bool {
        self.len() == other.len() && self.keys().all(|k| other.contains(k))
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.keys().all(|k| other.contains(k))
    }

    /// Marks two distinct siblings mutually exclusive, in both directions.
    ///
    /// # Panics
    /// When `a == b`: a node is never mutex with itself.
    pub fn mutexify(&mut self, a: usize, b: usize) {
        assert_ne!(
            a,
            b,
            "Attempted to mutex node {:?} with itself",
            self.nodes.get_index(a).map(|(k, _)| k)
        );
        self.node_mut(a).links_mut().mutex.insert(b);
        self.node_mut(b).links_mut().mutex.insert(a);
    }

    pub fn is_mutex(&self, a: usize, b: usize) -> bool {
        self.get(a).map_or(false, |node| node.mutex().contains(&b))
    }

    /// Number of unordered mutex pairs in the level.
    pub fn mutex_pairs(&self) -> usize {
        self.iter().map(|n| n.mutex().len()).sum::<usize>() / 2
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::{ActionNode, Level, LiteralNode, PgNode};
    use crate::planning::{
        action::{noop_actions, Action},
        literal::{symbol, Literal},
    };

    #[test]
    fn test_persistence() {
        let have = symbol("Have(Cake)");
        let eat = ActionNode::new(Rc::new(Action::new(
            "Eat(Cake)",
            (vec![have.clone()], Vec::new()),
            (vec![symbol("Eaten(Cake)")], vec![have.clone()]),
        )));
        assert!(!eat.is_persistent());
        for noop in noop_actions(&[have]) {
            assert!(ActionNode::new(noop).is_persistent());
        }
    }

    #[test]
    fn test_level_deduplicates_by_identity() {
        let at = symbol("At(C1, SFO)");
        let mut level = Level::new();
        let a = level.insert(LiteralNode::new(Literal::pos(&at)));
        let b = level.insert(LiteralNode::new(Literal::neg(&at)));
        level.node_mut(a).links_mut().parents.insert(7);
        assert_eq!(level.insert(LiteralNode::new(Literal::pos(&at))), a);
        assert_eq!(level.len(), 2);
        assert_eq!(level.node(a).parents().len(), 1);
        assert_ne!(a, b);
    }

    #[test]
    fn test_mutexify_is_symmetric() {
        let at = symbol("At(C1, SFO)");
        let mut level = Level::new();
        let a = level.insert(LiteralNode::new(Literal::pos(&at)));
        let b = level.insert(LiteralNode::new(Literal::neg(&at)));
        level.mutexify(a, b);
        assert!(level.is_mutex(a, b));
        assert!(level.is_mutex(b, a));
        assert_eq!(level.mutex_pairs(), 1);
    }

    #[test]
    #[should_panic]
    fn test_self_mutex_panics() {
        let mut level = Level::new();
        let a = level.insert(LiteralNode::new(Literal::pos(&symbol("At(C1, SFO)"))));
        level.mutexify(a, a);
    }

    #[test]
    fn test_same_nodes_ignores_order() {
        let x = symbol("X");
        let y = symbol("Y");
        let mut l1 = Level::new();
        l1.insert(LiteralNode::new(Literal::pos(&x)));
        l1.insert(LiteralNode::new(Literal::pos(&y)));
        let mut l2 = Level::new();
        l2.insert(LiteralNode::new(Literal::pos(&y)));
        assert!(l2.is_subset(&l1));
        assert!(!l2.same_nodes(&l1));
        l2.insert(LiteralNode::new(Literal::pos(&x)));
        assert!(l2.same_nodes(&l1));
    }
}
