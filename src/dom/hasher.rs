//! Content-only DOM hashing.
//!
//! Identity of a page state must survive layout shifts, so bounding boxes
//! and visibility flags never feed the hash. Two trees hash equal iff they
//! are content-equal after class sorting and attribute-key sorting.

use sha2::{Digest, Sha256};

use super::node::DomNode;

/// Stable SHA-256 hex digest of a DOM subtree's content.
///
/// Serialization is depth-first: tag, id-or-empty, sorted class list joined
/// by spaces, text content, then attribute pairs with keys in lexicographic
/// order, recursing into children in declared order. Tokens are joined with
/// a NUL delimiter before hashing.
#[must_use]
pub fn hash_dom(root: &DomNode) -> String {
    let mut tokens: Vec<String> = Vec::new();
    serialize(root, &mut tokens);
    let mut hasher = Sha256::new();
    hasher.update(tokens.join("\x00").as_bytes());
    hex::encode(hasher.finalize())
}

fn serialize(node: &DomNode, out: &mut Vec<String>) {
    out.push(node.tag.clone());
    out.push(node.id.clone().unwrap_or_default());

    let mut classes = node.classes.clone();
    classes.sort();
    out.push(classes.join(" "));

    out.push(node.text.clone());

    // BTreeMap iteration is already key-sorted.
    for (key, value) in &node.attributes {
        out.push(key.clone());
        out.push(value.clone());
    }

    for child in &node.children {
        serialize(child, out);
    }
}
