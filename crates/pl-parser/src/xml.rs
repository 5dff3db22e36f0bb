use std::collections::BTreeMap;

use pl_core::{NodeId, NodeKind, ParleyError, ScriptTree};
use roxmltree::{Document, Node, NodeType};

pub const LIBRARY_ROOT_LABEL: &str = "library";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq)]
struct XmlNode {
    kind: NodeKind,
    label: String,
    attributes: BTreeMap<String, String>,
    text: Option<String>,
    first_child: Option<NodeId>,
    next_sibling: Option<NodeId>,
    source: Option<String>,
    location: SourceLocation,
}

/// Arena-backed element/text tree.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlTree {
    nodes: Vec<XmlNode>,
    root: NodeId,
}

impl XmlTree {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn location(&self, node: NodeId) -> SourceLocation {
        self.nodes[node.0].location
    }

    fn push(&mut self, node: XmlNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    fn append_child(&mut self, parent: NodeId, last: &mut Option<NodeId>, child: NodeId) {
        match last {
            Some(previous) => self.nodes[previous.0].next_sibling = Some(child),
            None => self.nodes[parent.0].first_child = Some(child),
        }
        *last = Some(child);
    }

    fn import_element(
        &mut self,
        document: &Document<'_>,
        node: Node<'_, '_>,
        source: &str,
    ) -> NodeId {
        let mut attributes = BTreeMap::new();
        for attribute in node.attributes() {
            attributes.insert(attribute.name().to_string(), attribute.value().to_string());
        }

        let id = self.push(XmlNode {
            kind: NodeKind::Element,
            label: node.tag_name().name().to_string(),
            attributes,
            text: None,
            first_child: None,
            next_sibling: None,
            source: Some(source.to_string()),
            location: text_location(document, node.range().start),
        });

        let mut last = None;
        for child in node.children() {
            match child.node_type() {
                NodeType::Element => {
                    let child_id = self.import_element(document, child, source);
                    self.append_child(id, &mut last, child_id);
                }
                NodeType::Text => {
                    let value = child.text().unwrap_or_default();
                    if value.is_empty() {
                        continue;
                    }
                    let child_id = self.push(XmlNode {
                        kind: NodeKind::Text,
                        label: String::new(),
                        attributes: BTreeMap::new(),
                        text: Some(value.to_string()),
                        first_child: None,
                        next_sibling: None,
                        source: Some(source.to_string()),
                        location: text_location(document, child.range().start),
                    });
                    self.append_child(id, &mut last, child_id);
                }
                _ => {}
            }
        }

        id
    }
}

impl ScriptTree for XmlTree {
    fn root(&self) -> NodeId {
        self.root
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.nodes[node.0].kind
    }

    fn label(&self, node: NodeId) -> &str {
        &self.nodes[node.0].label
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].first_child
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].next_sibling
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0].attributes.get(name).map(String::as_str)
    }

    fn text(&self, node: NodeId) -> Option<&str> {
        self.nodes[node.0].text.as_deref()
    }

    fn describe(&self, node: NodeId) -> String {
        let entry = &self.nodes[node.0];
        let label = match entry.kind {
            NodeKind::Element => format!("<{}>", entry.label),
            NodeKind::Text => "text".to_string(),
        };
        match &entry.source {
            Some(source) => format!(
                "{} at {}:{}:{}",
                label, source, entry.location.line, entry.location.column
            ),
            None => label,
        }
    }
}

pub fn parse_xml_tree(source_name: &str, source: &str) -> Result<XmlTree, ParleyError> {
    let document = parse_document(source_name, source)?;
    let mut tree = XmlTree {
        nodes: Vec::new(),
        root: NodeId(0),
    };
    let root = root_element(source_name, &document)?;
    tree.root = tree.import_element(&document, root, source_name);
    Ok(tree)
}

/// Merges several documents under one synthetic `<library>` root, in path order.
pub fn parse_xml_library(sources: &BTreeMap<String, String>) -> Result<XmlTree, ParleyError> {
    if sources.is_empty() {
        return Err(ParleyError::new(
            "XML_LIBRARY_EMPTY",
            "Script library needs at least one document.",
        ));
    }

    let mut tree = XmlTree {
        nodes: Vec::new(),
        root: NodeId(0),
    };
    tree.root = tree.push(XmlNode {
        kind: NodeKind::Element,
        label: LIBRARY_ROOT_LABEL.to_string(),
        attributes: BTreeMap::new(),
        text: None,
        first_child: None,
        next_sibling: None,
        source: None,
        location: SourceLocation { line: 1, column: 1 },
    });

    let mut last = None;
    for (source_name, source) in sources {
        let document = parse_document(source_name, source)?;
        let element = root_element(source_name, &document)?;
        let child = tree.import_element(&document, element, source_name);
        let root = tree.root;
        tree.append_child(root, &mut last, child);
    }

    Ok(tree)
}

fn parse_document<'a>(source_name: &str, source: &'a str) -> Result<Document<'a>, ParleyError> {
    Document::parse(source).map_err(|error| {
        let message = format!("{}: {}", source_name, error);
        ParleyError::new("XML_PARSE_ERROR", message)
    })
}

fn root_element<'a, 'input>(
    source_name: &str,
    document: &'a Document<'input>,
) -> Result<Node<'a, 'input>, ParleyError> {
    document
        .root()
        .children()
        .find(|node| node.is_element())
        .ok_or_else(|| {
            ParleyError::new(
                "XML_PARSE_ERROR",
                format!("{}: XML document must contain a root element.", source_name),
            )
        })
}

fn text_location(document: &Document<'_>, offset: usize) -> SourceLocation {
    let position = document.text_pos_at(offset);
    SourceLocation {
        line: position.row as usize,
        column: position.col as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_xml_tree_links_children_and_siblings() {
        let source = r#"<scripts><script id="inn"><intro>Welcome<end/></intro></script></scripts>"#;
        let tree = parse_xml_tree("inn.xml", source).expect("xml should parse");
        let root = tree.root();
        assert_eq!(tree.label(root), "scripts");

        let script = tree.first_child(root).expect("script element");
        assert_eq!(tree.attribute(script, "id"), Some("inn"));
        assert_eq!(tree.next_sibling(script), None);

        let intro = tree.find_child(script, "intro").expect("intro block");
        let children = tree.children(intro);
        assert_eq!(children.len(), 2);
        assert_eq!(tree.kind(children[0]), NodeKind::Text);
        assert_eq!(tree.text(children[0]), Some("Welcome"));
        assert_eq!(tree.label(children[1]), "end");
        assert_eq!(tree.content(intro), "Welcome");
    }

    #[test]
    fn find_descendant_matches_attribute_ignoring_case() {
        let source = r#"<script id="shop">
            <topic id="buy">b</topic>
            <nested><topic id="Sell">s</topic></nested>
            <topic default="true">d</topic>
        </script>"#;
        let tree = parse_xml_tree("shop.xml", source).expect("xml should parse");
        let root = tree.root();

        let sell = tree
            .find_descendant(root, "topic", Some(("id", "sell")))
            .expect("nested topic should be found");
        assert_eq!(tree.content(sell), "s");

        let fallback = tree
            .find_descendant(root, "topic", Some(("default", "true")))
            .expect("default topic should be found");
        assert_eq!(tree.content(fallback), "d");

        assert!(tree
            .find_descendant(root, "topic", Some(("id", "steal")))
            .is_none());
    }

    #[test]
    fn describe_mentions_source_and_line() {
        let tree = parse_xml_tree("a.xml", "<script>\n<end/></script>").expect("xml should parse");
        let end = tree.find_child(tree.root(), "end").expect("end element");
        assert_eq!(tree.describe(end), "<end> at a.xml:2:1");
        assert_eq!(tree.location(end), SourceLocation { line: 2, column: 1 });
        assert_eq!(
            tree.location(tree.root()),
            SourceLocation { line: 1, column: 1 }
        );
    }

    #[test]
    fn parse_xml_library_wraps_documents_in_path_order() {
        let mut sources = BTreeMap::new();
        sources.insert("b.xml".to_string(), r#"<script id="b"/>"#.to_string());
        sources.insert("a.xml".to_string(), r#"<script id="a"/>"#.to_string());
        let tree = parse_xml_library(&sources).expect("library should parse");

        assert_eq!(tree.label(tree.root()), LIBRARY_ROOT_LABEL);
        let ids = tree
            .child_elements(tree.root())
            .into_iter()
            .filter_map(|node| tree.attribute(node, "id").map(str::to_string))
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn parse_errors_carry_xml_code() {
        let error = parse_xml_tree("bad.xml", "<script>").expect_err("invalid xml should fail");
        assert_eq!(error.code, "XML_PARSE_ERROR");
        assert!(error.message.starts_with("bad.xml"));

        let empty = parse_xml_library(&BTreeMap::new()).expect_err("empty library should fail");
        assert_eq!(empty.code, "XML_LIBRARY_EMPTY");
    }
}
