use crate::language::Language;
use tree_sitter::{Node, Tree};

/// An owned parse result: the tree-sitter tree plus the source it was built
/// from. `recovered` marks trees accepted with markup-confined error nodes
/// (the permissive/error-recovery outcome) as opposed to clean parses.
#[derive(Debug)]
pub struct SyntaxTree {
    tree: Tree,
    source: String,
    language: Language,
    recovered: bool,
}

impl SyntaxTree {
    pub(crate) fn new(tree: Tree, source: String, language: Language, recovered: bool) -> Self {
        Self {
            tree,
            source,
            language,
            recovered,
        }
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn language(&self) -> Language {
        self.language
    }

    /// True when the tree was accepted despite recoverable error nodes.
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// Source text covered by a node of this tree.
    pub fn text_of(&self, node: Node<'_>) -> &str {
        &self.source[node.start_byte()..node.end_byte()]
    }
}

/// Visit every node of the subtree rooted at `root` in document order,
/// including anonymous, error, and missing nodes.
pub(crate) fn walk_preorder<'tree>(root: Node<'tree>, visit: &mut dyn FnMut(Node<'tree>)) {
    let mut cursor = root.walk();
    'outer: loop {
        visit(cursor.node());
        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                continue 'outer;
            }
            if !cursor.goto_parent() {
                break 'outer;
            }
        }
    }
}
