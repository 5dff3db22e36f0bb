//! Accessor contract for the already-parsed script document.
//!
//! The interpreter only walks the document through this trait, so any
//! labelled tree with child/sibling links and string attributes can back it.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Element,
    Text,
}

pub trait ScriptTree {
    fn root(&self) -> NodeId;
    fn kind(&self, node: NodeId) -> NodeKind;
    /// Element name; text nodes have an empty label.
    fn label(&self, node: NodeId) -> &str;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn attribute(&self, node: NodeId, name: &str) -> Option<&str>;
    /// Own value for text nodes.
    fn text(&self, node: NodeId) -> Option<&str>;

    /// Human-readable node reference used in diagnostics.
    fn describe(&self, node: NodeId) -> String {
        format!("<{}>", self.label(node))
    }

    fn is_element(&self, node: NodeId) -> bool {
        self.kind(node) == NodeKind::Element
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.first_child(node);
        while let Some(child) = cursor {
            out.push(child);
            cursor = self.next_sibling(child);
        }
        out
    }

    fn child_elements(&self, node: NodeId) -> Vec<NodeId> {
        self.children(node)
            .into_iter()
            .filter(|child| self.is_element(*child))
            .collect()
    }

    /// Concatenated text of the node and all of its descendants.
    fn content(&self, node: NodeId) -> String {
        if let Some(value) = self.text(node) {
            return value.to_string();
        }
        self.children(node)
            .into_iter()
            .map(|child| self.content(child))
            .collect()
    }

    fn find_child(&self, node: NodeId, label: &str) -> Option<NodeId> {
        self.children(node)
            .into_iter()
            .find(|child| self.is_element(*child) && self.label(*child) == label)
    }

    /// Depth-first search below `from` (document order) for an element named
    /// `label`; when `attribute` is given its value must match ignoring ASCII case.
    fn find_descendant(
        &self,
        from: NodeId,
        label: &str,
        attribute: Option<(&str, &str)>,
    ) -> Option<NodeId> {
        for child in self.children(from) {
            if !self.is_element(child) {
                continue;
            }
            if self.label(child) == label {
                let accepted = match attribute {
                    Some((name, expected)) => self
                        .attribute(child, name)
                        .is_some_and(|value| value.eq_ignore_ascii_case(expected)),
                    None => true,
                };
                if accepted {
                    return Some(child);
                }
            }
            if let Some(found) = self.find_descendant(child, label, attribute) {
                return Some(found);
            }
        }
        None
    }
}
