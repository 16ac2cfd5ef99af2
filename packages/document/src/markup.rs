//! Generic element tree produced by the markup parser.
//!
//! Both the deserializer and the paste sanitizer work on this tree; it knows
//! nothing about editor node types.

/// Elements that never have children or a closing tag. `link` is void only
/// as a document-head element (with `rel`); the legacy content `<link href>`
/// wraps its text.
pub const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "meta", "source", "wbr",
];

/// Elements whose content is dropped along with the element.
pub const NON_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "option", "noscript"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(Element),
    /// Decoded character data.
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercased tag name.
    pub tag: String,
    /// Decoded attribute values in source order.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into(), attributes: Vec::new(), children: Vec::new() }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.tag.as_str()) || (self.tag == "link" && self.attribute("rel").is_some())
    }

    /// Concatenated text of all descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                MarkupNode::Text(text) => out.push_str(text),
                MarkupNode::Element(element) => out.push_str(&element.text_content()),
            }
        }
        out
    }
}

/// Render a tree back to markup.
pub fn render(nodes: &[MarkupNode]) -> String {
    let mut output = String::new();
    for node in nodes {
        render_node(node, &mut output);
    }
    output
}

fn render_node(node: &MarkupNode, output: &mut String) {
    match node {
        MarkupNode::Text(text) => output.push_str(&escape_text(text)),
        MarkupNode::Element(element) => {
            output.push('<');
            output.push_str(&element.tag);
            for (name, value) in &element.attributes {
                push_attribute(output, name, value);
            }
            output.push('>');
            if element.is_void() {
                return;
            }
            for child in &element.children {
                render_node(child, output);
            }
            output.push_str("</");
            output.push_str(&element.tag);
            output.push('>');
        }
    }
}

pub(crate) fn push_attribute(output: &mut String, name: &str, value: &str) {
    output.push(' ');
    output.push_str(name);
    output.push_str("=\"");
    output.push_str(&escape_attribute(value));
    output.push('"');
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Decode character references. Unknown entities are kept verbatim.
pub fn decode_entities(raw: &str) -> String {
    if !raw.contains('&') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let candidate = &rest[start..];
        match candidate.find(';').filter(|end| *end <= 10) {
            Some(end) => match decode_entity(&candidate[1..end]) {
                Some(c) => {
                    out.push(c);
                    rest = &candidate[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &candidate[1..];
                }
            },
            None => {
                out.push('&');
                rest = &candidate[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let code = if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse::<u32>().ok()?
            };
            char::from_u32(code)
        }
    }
}
