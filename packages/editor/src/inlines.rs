//! Inline insertion: attribute tokens, hyperlinks, images.
//!
//! Tokens and hyperlinks are inserted as text first and then wrapped, so the
//! inline always ends up with the canonical text layout around it and the
//! cursor right after it.

use crate::errors::OpResult;
use crate::transaction::Transaction;
use crate::value::{Point, Selection};
use ontask_document::node::encode_params;
use ontask_document::{keys, Data, Inline, InlineKind};

impl Transaction {
    /// Insert an attribute token for `field` at the cursor.
    pub fn insert_attribute(&mut self, field: &str) -> OpResult {
        self.insert_wrapped(field, InlineKind::Attribute, Data::new().with(keys::FIELD, field))
    }

    /// Insert a hyperlink labelled `label`. A single bound parameter is
    /// stored as `paramName`/`paramValue`, several as an encoded `params`.
    pub fn insert_hyperlink(&mut self, label: &str, href: &str, params: &[(String, String)]) -> OpResult {
        let mut data = Data::new().with(keys::HREF, href);
        match params {
            [] => {}
            [(name, value)] => {
                data.insert(keys::PARAM_NAME, name.as_str());
                data.insert(keys::PARAM_VALUE, value.as_str());
            }
            _ => data.insert(keys::PARAMS, encode_params(params)),
        }
        self.insert_wrapped(label, InlineKind::Hyperlink, data)
    }

    pub fn insert_image(&mut self, src: &str, alt: Option<&str>) -> OpResult {
        let data = Data::new().with(keys::SRC, src).with_opt(keys::ALT, alt);
        self.insert_inline(Inline::new(InlineKind::Image, data))
    }

    fn insert_wrapped(&mut self, text: &str, kind: InlineKind, data: Data) -> OpResult {
        if text.is_empty() {
            return Ok(());
        }
        self.delete_selection()?;
        let start = self.selection().anchor.clone();
        self.insert_text_at(start.path.clone(), start.offset, text)?;

        let end = Point { path: start.path.clone(), offset: start.offset + text.chars().count() };
        self.select(Selection::range(start, end));
        self.wrap_inline(kind, data)
    }
}

/// The link target shown in the hyperlink popover.
pub fn hyperlink_target(inline: &Inline) -> String {
    let href = inline.data.get(keys::HREF).unwrap_or("");
    let mut target = if href.starts_with("http://") || href.starts_with("https://") {
        href.to_string()
    } else {
        format!("//{}", href)
    };

    let params = inline.hyperlink_params();
    if !params.is_empty() {
        let pairs: Vec<String> = params.iter().map(|(name, value)| format!("{}=<{}>", name, value)).collect();
        target.push('?');
        target.push_str(&pairs.join("&"));
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use ontask_document::{serialize, Block, Document, Node, Path, Text};

    fn tx(text: &str, offset: usize) -> Transaction {
        let mut tx = Transaction::new(Value::new(Document::new(vec![Block::paragraph(text).into()])));
        tx.collapse_to(Point::new([0, 0], offset));
        tx
    }

    #[test]
    fn test_insert_attribute_wraps_field_text() {
        let mut tx = tx("Hello ", 6);
        tx.insert_attribute("name").unwrap();

        let children = tx.document().nodes[0].children().unwrap();
        assert_eq!(children.len(), 3);
        let token = children[1].as_inline().unwrap();
        assert_eq!(token.kind, InlineKind::Attribute);
        assert_eq!(token.data.get(keys::FIELD), Some("name"));
        assert_eq!(children[2], Text::new("").into());
        assert_eq!(tx.selection().anchor, Point::new([0, 2], 0));
        assert_eq!(serialize(tx.document()), "<p>Hello <attribute>name</attribute></p>");
    }

    #[test]
    fn test_insert_attribute_replaces_selection() {
        let mut tx = tx("Dear you,", 5);
        tx.select(Selection::range(Point::new([0, 0], 5), Point::new([0, 0], 8)));
        tx.insert_attribute("first_name").unwrap();
        assert_eq!(tx.document().nodes[0].text_content(), "Dear first_name,");
    }

    #[test]
    fn test_hyperlink_parameter_encodings() {
        let mut tx = tx("", 0);
        tx.insert_hyperlink("one", "example.com", &[("id".to_string(), "sid".to_string())])
            .unwrap();
        let link = tx.document().node(&Path::from([0, 1])).and_then(Node::as_inline).unwrap();
        assert_eq!(link.data.get(keys::PARAM_NAME), Some("id"));
        assert_eq!(link.data.get(keys::PARAM_VALUE), Some("sid"));

        let mut tx = self::tx("", 0);
        let params = vec![("a".to_string(), "x".to_string()), ("b".to_string(), "y".to_string())];
        tx.insert_hyperlink("two", "https://example.com", &params).unwrap();
        let link = tx.document().node(&Path::from([0, 1])).and_then(Node::as_inline).unwrap();
        assert_eq!(link.data.get(keys::PARAMS), Some("?a=x&b=y"));
        assert_eq!(link.hyperlink_params(), params);
    }

    #[test]
    fn test_insert_image_splits_text() {
        let mut tx = tx("ab", 1);
        tx.insert_image("http://img/x.png", None).unwrap();
        let children = tx.document().nodes[0].children().unwrap();
        assert_eq!(children.len(), 3);
        assert_eq!(children[1].as_inline().map(|image| image.kind), Some(InlineKind::Image));
        assert_eq!(children[2], Text::new("b").into());
    }

    #[test]
    fn test_hyperlink_target() {
        let bare = Inline::new(InlineKind::Hyperlink, Data::new().with(keys::HREF, "example.com"));
        assert_eq!(hyperlink_target(&bare), "//example.com");

        let bound = Inline::new(
            InlineKind::Hyperlink,
            Data::new()
                .with(keys::HREF, "https://example.com/form")
                .with(keys::PARAM_NAME, "id")
                .with(keys::PARAM_VALUE, "sid"),
        );
        assert_eq!(hyperlink_target(&bound), "https://example.com/form?id=<sid>");
    }
}
