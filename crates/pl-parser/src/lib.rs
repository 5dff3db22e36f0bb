mod xml;

pub use xml::{parse_xml_library, parse_xml_tree, SourceLocation, XmlTree, LIBRARY_ROOT_LABEL};
