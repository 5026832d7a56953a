//! Registry XML → player record mapping
//!
//! The licence endpoint answers with a document shaped like:
//!
//! ```xml
//! <liste>
//!   <licence>
//!     <idlicence>...</idlicence>
//!     <licence>1234567</licence>
//!     <nom>DUPONT</nom>
//!     ...
//!   </licence>
//! </liste>
//! ```
//!
//! An unknown licence yields `<liste/>` (no record), and a refused call
//! yields `<erreurs><erreur>message</erreur></erreurs>`.

use roxmltree::{Document, Node, ParsingOptions};
use serde::{Deserialize, Serialize};

use crate::LookupError;

/// Element enclosing one player
pub const RECORD_TAG: &str = "licence";

/// Element carrying a registry-side error message
pub const ERROR_TAG: &str = "erreur";

/// One player as returned by the licence lookup
///
/// Field values are passed through exactly as the registry sent them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub licence: String,
    #[serde(rename = "nom")]
    pub surname: String,
    #[serde(rename = "prenom")]
    pub first_name: String,
    pub club: String,
    #[serde(rename = "classement")]
    pub ranking: String,
    pub points: String,
    #[serde(rename = "categorie")]
    pub category: String,
}

impl PlayerRecord {
    /// Points as a number, if the registry sent something numeric
    pub fn points_value(&self) -> Option<f64> {
        self.points.trim().replace(',', ".").parse().ok()
    }
}

/// Extract the player record from a registry response body
pub fn map_player(xml: &str, licence: &str) -> Result<PlayerRecord, LookupError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let doc = Document::parse_with_options(xml, options)
        .map_err(|e| LookupError::MalformedResponse(e.to_string()))?;

    let Some(record) = find_record(&doc) else {
        if let Some(message) = registry_error(&doc) {
            return Err(LookupError::Rejected(message));
        }
        return Err(LookupError::NotFound {
            licence: licence.to_string(),
        });
    };

    Ok(PlayerRecord {
        licence: field(record, "licence"),
        surname: field(record, "nom"),
        first_name: field(record, "prenom"),
        club: field(record, "nomclub"),
        ranking: field(record, "clglob"),
        points: field(record, "point"),
        category: field(record, "cat"),
    })
}

/// First `<licence>` element that has element children
///
/// The record and its licence-number leaf share a tag name; only the
/// record has children.
fn find_record<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    doc.descendants()
        .find(|n| n.has_tag_name(RECORD_TAG) && n.children().any(|c| c.is_element()))
}

fn registry_error(doc: &Document) -> Option<String> {
    doc.descendants()
        .find(|n| n.has_tag_name(ERROR_TAG))
        .map(|n| text_content(n).trim().to_string())
}

/// Text of the first descendant named `tag`, or empty
fn field(record: Node, tag: &str) -> String {
    record
        .descendants()
        .skip(1)
        .find(|n| n.has_tag_name(tag))
        .map(text_content)
        .unwrap_or_default()
}

/// All text under `node`, in document order
///
/// Comments and processing instructions split text into several nodes.
fn text_content(node: Node) -> String {
    node.descendants()
        .filter(Node::is_text)
        .filter_map(|t| t.text())
        .collect()
}
