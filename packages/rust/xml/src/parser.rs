//! Text-to-tree parsing into a shared document store.

use xee_xpath::{DocumentHandle, Documents};

use catenate_shared::{CatenateError, Result};

/// Parse a complete XML document and add it to `documents`.
pub fn parse(documents: &mut Documents, text: &str) -> Result<DocumentHandle> {
    let handle = documents
        .add_string_without_uri(text)
        .map_err(|e| CatenateError::parse(e.to_string()))?;
    tracing::trace!(bytes = text.len(), "parsed document");
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PathSelector;

    #[test]
    fn parsed_documents_share_one_store() {
        let mut documents = Documents::new();
        let first = parse(&mut documents, "<a><b>one</b></a>").unwrap();
        let second = parse(&mut documents, "<a><b>two</b></a>").unwrap();

        let selector = PathSelector::unbound();
        let b1 = selector.select("/a/b", &mut documents, first).unwrap();
        let b2 = selector.select("/a/b", &mut documents, second).unwrap();

        let xot = documents.xot();
        assert_eq!(xot.string_value(b1[0]), "one");
        assert_eq!(xot.string_value(b2[0]), "two");
    }

    #[test]
    fn rejects_malformed_input() {
        let mut documents = Documents::new();
        for text in ["<a>", "<a><b></a>", "", "<k:a/>"] {
            let err = parse(&mut documents, text).unwrap_err();
            assert!(
                matches!(err, CatenateError::Parse { .. }),
                "{text:?} should not parse, got {err:?}"
            );
        }
    }
}
