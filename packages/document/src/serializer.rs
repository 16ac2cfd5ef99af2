use crate::markup::{escape_text, push_attribute};
use crate::node::{keys, Block, BlockKind, Document, Inline, InlineKind, Mark, MarkKind, Node, Text};
use crate::style::FontTable;

/// Serializer converts a document tree to markup
///
/// The output is what the content store persists and what the rules engine
/// renders, so it is stable: no whitespace is added between elements and
/// attributes are written in a fixed order. Empty text writes nothing.
pub struct Serializer {
    fonts: FontTable,
}

impl Serializer {
    pub fn new() -> Self {
        Self { fonts: FontTable::default() }
    }

    pub fn with_fonts(fonts: FontTable) -> Self {
        Self { fonts }
    }

    /// Serialize a Document; each top-level node is written in turn.
    pub fn serialize(&self, doc: &Document) -> String {
        self.serialize_nodes(&doc.nodes)
    }

    pub fn serialize_nodes(&self, nodes: &[Node]) -> String {
        let mut output = String::new();
        for node in nodes {
            self.serialize_node(node, &mut output);
        }
        output
    }

    fn serialize_node(&self, node: &Node, output: &mut String) {
        match node {
            Node::Block(block) => self.serialize_block(block, output),
            Node::Inline(inline) => self.serialize_inline(inline, output),
            Node::Text(text) => self.serialize_text(text, output),
        }
    }

    fn serialize_children(&self, nodes: &[Node], output: &mut String) {
        for child in nodes {
            self.serialize_node(child, output);
        }
    }

    fn serialize_block(&self, block: &Block, output: &mut String) {
        let tag = match block.kind {
            BlockKind::Paragraph => "p",
            BlockKind::HeadingOne => "h1",
            BlockKind::HeadingTwo => "h2",
            BlockKind::ListItem => "li",
            BlockKind::BulletedList => "ul",
            BlockKind::NumberedList => "ol",
            BlockKind::Code => "pre",
            BlockKind::Rule => "rule",
            BlockKind::Condition => "condition",
        };

        output.push('<');
        output.push_str(tag);
        match block.kind {
            BlockKind::Rule => {
                push_present(output, "ruleid", block.data.get(keys::RULE_ID));
            }
            BlockKind::Condition => {
                push_present(output, "conditionid", block.data.get(keys::CONDITION_ID));
                push_present(output, "ruleid", block.data.get(keys::RULE_ID));
                push_present(output, "label", block.data.get(keys::LABEL));
            }
            _ => {}
        }
        output.push('>');
        self.serialize_children(&block.nodes, output);
        output.push_str("</");
        output.push_str(tag);
        output.push('>');
    }

    fn serialize_inline(&self, inline: &Inline, output: &mut String) {
        match inline.kind {
            InlineKind::Hyperlink | InlineKind::Link => {
                output.push_str("<hyperlink");
                push_present(output, "href", inline.data.get(keys::HREF));
                let param = inline.data.get(keys::PARAM_NAME);
                let field = inline.data.get(keys::PARAM_VALUE);
                match inline.data.get(keys::PARAMS) {
                    Some(params) if param.is_none() || field.is_none() => {
                        push_attribute(output, "params", params);
                    }
                    // Empty param/field are written even when unbound; the
                    // rules engine expects both attributes on every link.
                    _ => {
                        push_attribute(output, "param", param.unwrap_or(""));
                        push_attribute(output, "field", field.unwrap_or(""));
                    }
                }
                output.push('>');
                self.serialize_children(&inline.nodes, output);
                output.push_str("</hyperlink>");
            }
            InlineKind::Image => {
                output.push_str("<img");
                push_present(output, "src", inline.data.get(keys::SRC));
                push_present(output, "alt", inline.data.get(keys::ALT));
                push_attribute(output, "style", "max-width:100%");
                output.push('>');
            }
            InlineKind::Attribute => {
                output.push_str("<attribute>");
                self.serialize_children(&inline.nodes, output);
                output.push_str("</attribute>");
            }
        }
    }

    fn serialize_text(&self, text: &Text, output: &mut String) {
        if text.is_empty() {
            return;
        }

        let mut inner = text
            .text
            .split('\n')
            .map(escape_text)
            .collect::<Vec<_>>()
            .join("<br>");

        // First mark innermost.
        for mark in &text.marks {
            let (open, close) = self.mark_tags(mark);
            inner = format!("{}{}{}", open, inner, close);
        }
        output.push_str(&inner);
    }

    fn mark_tags(&self, mark: &Mark) -> (String, &'static str) {
        let span = |style: String| {
            let mut open = String::from("<span");
            push_attribute(&mut open, "style", &style);
            open.push('>');
            (open, "</span>")
        };

        match mark.kind {
            MarkKind::Bold => ("<strong>".to_string(), "</strong>"),
            MarkKind::Italic => ("<em>".to_string(), "</em>"),
            MarkKind::Underlined => ("<u>".to_string(), "</u>"),
            MarkKind::Code => ("<code>".to_string(), "</code>"),
            MarkKind::Color => span(format!("color:{}", mark.data.get(keys::HEX).unwrap_or(""))),
            MarkKind::FontFamily => {
                let font = mark.data.get(keys::FONT).unwrap_or("");
                span(format!("font-family:{}", self.fonts.stack(font)))
            }
            MarkKind::Span => match mark.data.get(keys::STYLE) {
                Some(style) => span(style.to_string()),
                None => ("<span>".to_string(), "</span>"),
            },
        }
    }
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

fn push_present(output: &mut String, name: &str, value: Option<&str>) {
    if let Some(value) = value {
        push_attribute(output, name, value);
    }
}

/// Convenience function to serialize a document
pub fn serialize(doc: &Document) -> String {
    Serializer::new().serialize(doc)
}
