//! XPath evaluation with an optional single namespace binding.
//!
//! Expressions are compiled and run by `xee-xpath`. When a namespace URI is
//! configured it is bound to [`NAMESPACE_PREFIX`]; unprefixed names always
//! match elements in no namespace.

use xee_xpath::context::StaticContextBuilder;
use xee_xpath::{DocumentHandle, Documents, Queries, Query};
use xot::Node;

use catenate_shared::{CatenateError, Result};

/// Prefix bound to the selector's namespace URI.
pub const NAMESPACE_PREFIX: &str = "kml";

/// Evaluates XPath expressions, optionally with one namespace binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSelector {
    namespace: Option<String>,
}

impl PathSelector {
    /// Build a selector. A non-empty URI is bound to [`NAMESPACE_PREFIX`];
    /// otherwise queries run unbound.
    pub fn new(namespace: Option<&str>) -> Self {
        Self {
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        }
    }

    /// A selector with no namespace binding.
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Evaluate `expr` with the document node of `document` as the context
    /// item. Every item of the result must be a node.
    pub fn select(
        &self,
        expr: &str,
        documents: &mut Documents,
        document: DocumentHandle,
    ) -> Result<Vec<Node>> {
        let queries = self.queries();
        let query = queries
            .many(expr, |_, item| Ok(item.to_node()?))
            .map_err(|e| CatenateError::path(expr, e.to_string()))?;
        let nodes = query
            .execute(documents, document)
            .map_err(|e| CatenateError::path(expr, e.to_string()))?;

        tracing::trace!(expr, matches = nodes.len(), "evaluated path");
        Ok(nodes)
    }

    fn queries(&self) -> Queries<'_> {
        let mut context = StaticContextBuilder::default();
        if let Some(uri) = self.namespace.as_deref() {
            context.namespaces([(NAMESPACE_PREFIX, uri)]);
        }
        Queries::new(context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    const PLAIN: &str = r#"<kml><Document>
        <Placemark id="a"><name>a</name></Placemark>
        <Folder><Placemark id="b"><name>b</name></Placemark></Folder>
        <Placemark id="c"><name>c</name></Placemark>
    </Document></kml>"#;

    const NAMESPACED: &str = r#"<kml xmlns="urn:k" xmlns:gx="urn:gx"><Document>
        <Placemark><name>a</name><gx:Track/></Placemark>
        <Placemark><name>b</name></Placemark>
    </Document></kml>"#;

    /// String values of the nodes `expr` selects from `xml`.
    fn values(selector: &PathSelector, xml: &str, expr: &str) -> Vec<String> {
        let mut documents = Documents::new();
        let doc = parse(&mut documents, xml).unwrap();
        let nodes = selector.select(expr, &mut documents, doc).unwrap();
        let xot = documents.xot();
        nodes.into_iter().map(|node| xot.string_value(node)).collect()
    }

    fn select_err(selector: &PathSelector, xml: &str, expr: &str) -> CatenateError {
        let mut documents = Documents::new();
        let doc = parse(&mut documents, xml).unwrap();
        selector.select(expr, &mut documents, doc).unwrap_err()
    }

    #[test]
    fn descendant_and_child_paths() {
        let unbound = PathSelector::unbound();
        assert_eq!(values(&unbound, PLAIN, "//Placemark"), ["a", "b", "c"]);
        assert_eq!(values(&unbound, PLAIN, "/kml/Document/Placemark"), ["a", "c"]);
        assert_eq!(values(&unbound, PLAIN, "/descendant::Placemark"), ["a", "b", "c"]);
        assert!(values(&unbound, PLAIN, "//Missing").is_empty());
    }

    #[test]
    fn predicates_and_attribute_tests() {
        let unbound = PathSelector::unbound();
        assert_eq!(values(&unbound, PLAIN, "//Placemark[name='b']"), ["b"]);
        assert_eq!(values(&unbound, PLAIN, "//Placemark[@id='c']"), ["c"]);
        assert_eq!(values(&unbound, PLAIN, "/kml/Document/Placemark[last()]"), ["c"]);
        assert_eq!(values(&unbound, PLAIN, "(//Placemark)[2]"), ["b"]);
    }

    #[test]
    fn unions_come_back_in_document_order() {
        let unbound = PathSelector::unbound();
        assert_eq!(
            values(&unbound, PLAIN, "//Folder | //Placemark[@id='a']"),
            ["a", "b"]
        );
    }

    #[test]
    fn text_node_tests() {
        let unbound = PathSelector::unbound();
        assert_eq!(values(&unbound, PLAIN, "//name/text()"), ["a", "b", "c"]);
    }

    #[test]
    fn bound_prefix_selects_namespaced_elements() {
        let kml = PathSelector::new(Some("urn:k"));
        assert_eq!(values(&kml, NAMESPACED, "//kml:Placemark/kml:name"), ["a", "b"]);
        assert_eq!(values(&kml, NAMESPACED, "//kml:Placemark[kml:name='b']"), ["b"]);

        // Unprefixed names only match elements in no namespace.
        assert!(values(&kml, NAMESPACED, "//Placemark").is_empty());
        assert!(values(&PathSelector::unbound(), NAMESPACED, "//Placemark").is_empty());
    }

    #[test]
    fn empty_namespace_means_unbound() {
        assert_eq!(PathSelector::new(Some("")), PathSelector::unbound());
        assert_eq!(PathSelector::new(None), PathSelector::unbound());
    }

    #[test]
    fn unknown_prefixes_are_errors() {
        let err = select_err(&PathSelector::unbound(), NAMESPACED, "//kml:Placemark");
        assert!(matches!(err, CatenateError::Path { .. }));

        let err = select_err(&PathSelector::new(Some("urn:k")), NAMESPACED, "//gx:Track");
        assert!(matches!(err, CatenateError::Path { .. }));
    }

    #[test]
    fn malformed_expressions_are_errors() {
        for expr in ["//", "//Placemark[", "///a", "Placemark |"] {
            let err = select_err(&PathSelector::unbound(), PLAIN, expr);
            match err {
                CatenateError::Path { expr: reported, .. } => assert_eq!(reported, expr),
                other => panic!("expected path error for {expr:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn non_node_results_are_errors() {
        let err = select_err(&PathSelector::unbound(), PLAIN, "count(//Placemark)");
        assert!(matches!(err, CatenateError::Path { .. }));
    }
}
