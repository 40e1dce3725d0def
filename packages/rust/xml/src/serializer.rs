//! Tree-to-text serialization.

use xee_xpath::Documents;
use xot::Node;

use catenate_shared::{CatenateError, Result};

const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialize the document containing `node`, starting with an XML
/// declaration.
pub fn to_string(documents: &Documents, node: Node) -> Result<String> {
    let xot = documents.xot();
    let body = xot
        .to_string(xot.root(node))
        .map_err(|e| CatenateError::Serialize(e.to_string()))?;
    Ok(format!("{XML_DECLARATION}\n{body}\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PathSelector, parse};

    #[test]
    fn writes_declaration_and_document() {
        let mut documents = Documents::new();
        let doc = parse(
            &mut documents,
            r#"<kml xmlns="urn:k"><Document><name>a &lt; b</name></Document></kml>"#,
        )
        .unwrap();
        let name = PathSelector::new(Some("urn:k"))
            .select("//kml:name", &mut documents, doc)
            .unwrap();

        let xml = to_string(&documents, name[0]).unwrap();
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains(
            r#"<kml xmlns="urn:k"><Document><name>a &lt; b</name></Document></kml>"#
        ));
    }

    #[test]
    fn output_parses_back() {
        let mut documents = Documents::new();
        let doc = parse(&mut documents, "<a>\n  <b k=\"v\">1 &amp; 2</b>\n</a>").unwrap();
        let root = PathSelector::unbound().select("/a", &mut documents, doc).unwrap();
        let xml = to_string(&documents, root[0]).unwrap();

        let reparsed = parse(&mut documents, &xml).unwrap();
        let b = PathSelector::unbound()
            .select("/a/b[@k='v']", &mut documents, reparsed)
            .unwrap();
        assert_eq!(documents.xot().string_value(b[0]), "1 & 2");
    }
}
