//! Paste sanitizer.
//!
//! Clipboard HTML (word processors, web pages) is reduced to an allow-list
//! before it is deserialized:
//!
//! - tags outside the allow-list are removed but their content is kept,
//!   except `script`, `style`, `textarea`, `option` and `noscript`, which go
//!   with their content;
//! - `b` becomes `strong` and `i` becomes `em`;
//! - attributes are limited to `style` everywhere, `href`/`name`/`target`
//!   on `a` and `src` on `img`;
//! - `href`/`src` with a scheme other than http, https, ftp or mailto are
//!   dropped;
//! - only `color` and `font-family` survive inside `style`.

use crate::deserializer::from_markup;
use crate::markup::{render, Element, MarkupNode, NON_TEXT_ELEMENTS};
use crate::node::Node;
use crate::parser::parse_markup;
use crate::style::{parse_declarations, render_declarations};
use tracing::{debug, instrument};

/// The general-purpose allow-list, extended with the tags the editor
/// needs from pasted content.
pub const ALLOWED_TAGS: &[&str] = &[
    "h3", "h4", "h5", "h6", "blockquote", "p", "a", "ul", "ol", "nl", "li", "b", "i", "strong",
    "em", "strike", "abbr", "code", "hr", "br", "div", "table", "thead", "caption", "tbody", "tr",
    "th", "td", "pre", "iframe", "h1", "h2", "span", "img", "u",
];

pub const ALLOWED_STYLES: &[&str] = &["color", "font-family"];

pub const ALLOWED_SCHEMES: &[&str] = &["http", "https", "ftp", "mailto"];

fn allowed_attributes(tag: &str) -> &'static [&'static str] {
    match tag {
        "a" => &["style", "href", "name", "target"],
        "img" => &["style", "src"],
        _ => &["style"],
    }
}

/// Sanitize clipboard markup, returning markup.
#[instrument(skip(markup), fields(bytes = markup.len()))]
pub fn sanitize(markup: &str) -> String {
    render(&sanitize_tree(&parse_markup(markup)))
}

/// Sanitize clipboard markup and import it as blocks ready for insertion.
pub fn sanitize_fragment(markup: &str) -> Vec<Node> {
    let nodes = from_markup(&sanitize_tree(&parse_markup(markup)));
    debug!(blocks = nodes.len(), "Sanitized paste");
    nodes
}

pub fn sanitize_tree(nodes: &[MarkupNode]) -> Vec<MarkupNode> {
    let mut out = Vec::new();
    for node in nodes {
        sanitize_node(node, &mut out);
    }
    out
}

fn sanitize_node(node: &MarkupNode, out: &mut Vec<MarkupNode>) {
    let element = match node {
        MarkupNode::Text(text) => {
            out.push(MarkupNode::Text(text.clone()));
            return;
        }
        MarkupNode::Element(element) => element,
    };

    if NON_TEXT_ELEMENTS.contains(&element.tag.as_str()) {
        return;
    }

    let tag = match element.tag.as_str() {
        "b" => "strong",
        "i" => "em",
        other => other,
    };

    if !ALLOWED_TAGS.contains(&tag) {
        for child in &element.children {
            sanitize_node(child, out);
        }
        return;
    }

    let mut clean = Element::new(tag);
    for (name, value) in &element.attributes {
        if !allowed_attributes(tag).contains(&name.as_str()) {
            continue;
        }
        match name.as_str() {
            "style" => {
                let kept: Vec<(String, String)> = parse_declarations(value)
                    .into_iter()
                    .filter(|(property, _)| ALLOWED_STYLES.contains(&property.as_str()))
                    .collect();
                if !kept.is_empty() {
                    clean.attributes.push((name.clone(), render_declarations(&kept)));
                }
            }
            "href" | "src" => {
                if scheme_allowed(value) {
                    clean.attributes.push((name.clone(), value.clone()));
                }
            }
            _ => clean.attributes.push((name.clone(), value.clone())),
        }
    }
    clean.children = sanitize_tree(&element.children);
    out.push(MarkupNode::Element(clean));
}

/// Relative URLs pass; absolute ones need an allowed scheme.
fn scheme_allowed(url: &str) -> bool {
    let url = url.trim();
    let Some(colon) = url.find(':') else {
        return true;
    };
    let scheme = &url[..colon];
    if scheme.contains(['/', '?', '#']) {
        return true;
    }
    ALLOWED_SCHEMES.contains(&scheme.to_ascii_lowercase().as_str())
}
