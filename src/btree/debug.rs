use std::fmt::{self, Write};

use crate::btree::{BTree, Node, NodeId};

impl BTree {
    /// Writes an in-order rendering of the tree for diagnostics.
    ///
    /// Leaves emit one `key record-id` line per live record sharing the key,
    /// indented by tree depth; branch keys emit at their own depth,
    /// interleaved with the recursive descent into their children.
    pub(crate) fn dump(&self, out: &mut impl Write) -> fmt::Result {
        self.dump_node(self.root, 0, out)
    }

    fn dump_node(&self, id: NodeId, level: usize, out: &mut impl Write) -> fmt::Result {
        match self.node(id) {
            Node::Leaf(leaf) => {
                for (key, list) in leaf.keys.iter().zip(&leaf.lists) {
                    for record in list.iter().filter(|r| !r.is_delete_pending()) {
                        indent(level, out)?;
                        writeln!(out, "{key} {}", record.id())?;
                    }
                }
            }
            Node::Branch(branch) => {
                for (key, &child) in branch.keys.iter().zip(&branch.children) {
                    self.dump_node(child, level + 1, out)?;
                    indent(level, out)?;
                    writeln!(out, "{key}")?;
                }
                self.dump_node(branch.children[branch.keys.len()], level + 1, out)?;
            }
        }
        Ok(())
    }
}

fn indent(level: usize, out: &mut impl Write) -> fmt::Result {
    for _ in 0..level {
        out.write_char('\t')?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use crate::{
        btree::{BTree, ORDER},
        record::{Record, RecordId, Values},
    };

    fn dumped(tree: &BTree) -> String {
        let mut out = String::new();
        tree.dump(&mut out).unwrap();
        out
    }

    #[test]
    fn test_single_leaf_dump() {
        let mut tree = BTree::new();
        tree.insert("b", Rc::new(Record::new(RecordId::from(0), Values::new())));
        tree.insert("a", Rc::new(Record::new(RecordId::from(1), Values::new())));
        tree.insert("b", Rc::new(Record::new(RecordId::from(2), Values::new())));

        assert_eq!(dumped(&tree), "a 1\nb 0\nb 2\n");
    }

    #[test]
    fn test_dump_skips_soft_deleted_records() {
        let mut tree = BTree::new();
        let record = Rc::new(Record::new(RecordId::from(0), Values::new()));
        tree.insert("gone", Rc::clone(&record));
        tree.insert("kept", Rc::new(Record::new(RecordId::from(1), Values::new())));

        record.mark_delete_pending();
        assert_eq!(dumped(&tree), "kept 1\n");
    }

    #[test]
    fn test_split_tree_dump_interleaves_levels() {
        let mut tree = BTree::new();
        for i in 0..=ORDER {
            tree.insert(
                &format!("k{i}"),
                Rc::new(Record::new(RecordId::from(i as u64), Values::new())),
            );
        }

        let out = dumped(&tree);
        // Leaf lines sit one level below the root key line.
        assert!(out.contains("\tk0 0\n"));
        assert!(out.contains("\nk4\n"));
        // In-order: every key appears exactly once per record, sorted.
        let mut keys: Vec<&str> = out
            .lines()
            .map(|line| line.trim().split(' ').next().unwrap())
            .collect();
        let sorted = {
            let mut s = keys.clone();
            s.sort();
            s
        };
        assert_eq!(keys, sorted);
        keys.dedup();
        assert_eq!(keys.len(), ORDER + 1);
    }
}
