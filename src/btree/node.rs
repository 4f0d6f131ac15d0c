use crate::{btree::NodeId, record::RecordRef};

/// The records sharing one key, in insertion order.
pub(crate) type RecordList = Vec<RecordRef>;

/// A tree node. Leaves hold the actual key to record-list associations,
/// branches hold only keys and child links for routing.
#[derive(Debug)]
pub(crate) enum Node {
    Leaf(Leaf),
    Branch(Branch),
}

/// Keys and record lists are kept in two parallel vectors sorted by key,
/// strictly increasing, at most [`ORDER`] entries.
///
/// `next_leaf` chains the leaves in key order. The chain is relinked on every
/// leaf split but no current traversal walks it; it is kept as a cheap
/// invariant for a future range scan.
///
/// [`ORDER`]: crate::btree::ORDER
#[derive(Debug, Default)]
pub(crate) struct Leaf {
    pub(super) keys: Vec<String>,
    pub(super) lists: Vec<RecordList>,
    pub(super) next_leaf: Option<NodeId>,
}

/// An interior node: `children.len() == keys.len() + 1`, keys strictly
/// increasing, at most [`ORDER`] keys.
///
/// [`ORDER`]: crate::btree::ORDER
#[derive(Debug)]
pub(crate) struct Branch {
    pub(super) keys: Vec<String>,
    pub(super) children: Vec<NodeId>,
}

impl Leaf {
    /// Binary-searches the leaf keys.
    ///
    /// `Ok` carries the position of an exact match, `Err` the position the
    /// key would be inserted at to keep the keys sorted.
    #[inline]
    pub(super) fn search(&self, key: &str) -> Result<usize, usize> {
        self.keys.binary_search_by(|probe| probe.as_str().cmp(key))
    }

    /// Inserts into a leaf that is known to have room.
    ///
    /// A duplicate key appends the record to the existing list, a new key
    /// starts a singleton list in sorted position.
    pub(super) fn put(&mut self, key: &str, record: RecordRef) {
        match self.search(key) {
            Ok(index) => self.lists[index].push(record),
            Err(index) => {
                self.keys.insert(index, key.to_owned());
                self.lists.insert(index, vec![record]);
            }
        }
    }
}

impl Branch {
    /// The child to descend into for `key`: the first position whose key is
    /// greater than the target, equal keys routing right of their separator.
    #[inline]
    pub(super) fn child_for(&self, key: &str) -> NodeId {
        let index = match self.keys.binary_search_by(|probe| probe.as_str().cmp(key)) {
            Ok(index) => index + 1,
            Err(index) => index,
        };
        self.children[index]
    }
}
