//! Markup → document tree.
//!
//! | markup                                   | node                          |
//! |------------------------------------------|-------------------------------|
//! | `p`, `h3`-`h6`, `blockquote`             | paragraph                     |
//! | `h1` / `h2`                              | heading-one / heading-two     |
//! | `ul` / `ol` / `li`                       | bulleted / numbered list, item|
//! | `pre`                                    | code                          |
//! | `rule ruleid`                            | rule                          |
//! | `condition conditionid ruleid label`     | condition                     |
//! | `hyperlink href param field params`      | hyperlink                     |
//! | `a href`, `link href`                    | hyperlink (legacy migration)  |
//! | `img src alt`                            | image                         |
//! | `attribute`                              | attribute, field = its text   |
//! | `strong` `em` `u` `code`                 | bold italic underlined code   |
//! | `span style`                             | color / font-family / span    |
//! | `s`, `strike`                            | span (line-through)           |
//! | `br`                                     | `\n`                          |
//!
//! Unknown elements are transparent: their children are imported in place.
//! Whitespace-only text is dropped where blocks are expected (top level,
//! lists, rules and conditions) and kept inside text.

use crate::layout;
use crate::markup::{Element, MarkupNode, NON_TEXT_ELEMENTS};
use crate::node::{keys, Block, BlockKind, Data, Document, Inline, InlineKind, Mark, MarkKind, Node};
use crate::parser::parse_markup;
use crate::style::{leading_declaration, primary_family};
use tracing::{debug, instrument};

/// Import a whole document.
#[instrument(skip(markup), fields(bytes = markup.len()))]
pub fn deserialize(markup: &str) -> Document {
    let nodes = deserialize_fragment(markup);
    debug!(top_level = nodes.len(), "Deserialized document");
    Document::new(nodes)
}

/// Import markup as a list of top-level blocks.
pub fn deserialize_fragment(markup: &str) -> Vec<Node> {
    from_markup(&parse_markup(markup))
}

/// Convert an element tree. Runs of loose text and inlines at the top level
/// are wrapped in paragraphs.
pub fn from_markup(nodes: &[MarkupNode]) -> Vec<Node> {
    let mut blocks = Vec::new();
    let mut loose = Vec::new();

    for node in convert_all(nodes) {
        if node.is_block() {
            flush_loose(&mut loose, &mut blocks);
            blocks.push(node);
        } else {
            loose.push(node);
        }
    }
    flush_loose(&mut loose, &mut blocks);
    blocks
}

/// Wrap a run of loose nodes in a paragraph, trimming blank text at its
/// edges. A run of nothing but blank text is formatting and goes away.
fn flush_loose(loose: &mut Vec<Node>, blocks: &mut Vec<Node>) {
    let mut run = std::mem::take(loose);
    while run.last().is_some_and(is_blank) {
        run.pop();
    }
    let start = run.iter().position(|node| !is_blank(node)).unwrap_or(run.len());
    run.drain(..start);
    if !run.is_empty() {
        blocks.push(paragraph(run));
    }
}

fn is_blank(node: &Node) -> bool {
    node.as_text().is_some_and(|text| text.text.trim().is_empty())
}

fn paragraph(children: Vec<Node>) -> Node {
    Block::with_nodes(BlockKind::Paragraph, layout::canonicalize(children)).into()
}

fn convert_all(nodes: &[MarkupNode]) -> Vec<Node> {
    nodes.iter().flat_map(convert).collect()
}

fn convert(node: &MarkupNode) -> Vec<Node> {
    match node {
        MarkupNode::Text(text) if text.is_empty() => Vec::new(),
        MarkupNode::Text(text) => vec![Node::text(text.clone())],
        MarkupNode::Element(element) => convert_element(element),
    }
}

fn block_kind(tag: &str) -> Option<BlockKind> {
    Some(match tag {
        "p" | "h3" | "h4" | "h5" | "h6" | "blockquote" => BlockKind::Paragraph,
        "h1" => BlockKind::HeadingOne,
        "h2" => BlockKind::HeadingTwo,
        "li" => BlockKind::ListItem,
        "ul" => BlockKind::BulletedList,
        "ol" => BlockKind::NumberedList,
        "pre" => BlockKind::Code,
        "rule" => BlockKind::Rule,
        "condition" => BlockKind::Condition,
        _ => return None,
    })
}

fn mark_kind(tag: &str) -> Option<MarkKind> {
    Some(match tag {
        "strong" => MarkKind::Bold,
        "em" => MarkKind::Italic,
        "u" => MarkKind::Underlined,
        "code" => MarkKind::Code,
        "span" | "s" | "strike" => MarkKind::Span,
        _ => return None,
    })
}

/// Attribute value, with empty strings treated as absent.
fn attr<'a>(element: &'a Element, name: &str) -> Option<&'a str> {
    element.attribute(name).filter(|value| !value.is_empty())
}

fn convert_element(element: &Element) -> Vec<Node> {
    let tag = element.tag.as_str();

    if NON_TEXT_ELEMENTS.contains(&tag) {
        return Vec::new();
    }

    if let Some(kind) = block_kind(tag) {
        let data = match kind {
            BlockKind::Rule => Data::new().with_opt(keys::RULE_ID, attr(element, "ruleid")),
            BlockKind::Condition => Data::new()
                .with_opt(keys::LABEL, attr(element, "label"))
                .with_opt(keys::CONDITION_ID, attr(element, "conditionid"))
                .with_opt(keys::RULE_ID, attr(element, "ruleid")),
            _ => Data::new(),
        };
        let mut children = convert_all(&element.children);
        let children = if kind.holds_blocks() {
            children.retain(|child| !is_blank(child));
            children
        } else if children.iter().any(Node::is_block) {
            children
        } else {
            layout::canonicalize(children)
        };
        return vec![Block::with_nodes(kind, children).with_data(data).into()];
    }

    if let Some(kind) = mark_kind(tag) {
        let Some(mark) = mark_for(kind, element) else {
            return convert_all(&element.children);
        };
        let mut children = convert_all(&element.children);
        for child in &mut children {
            apply_mark(child, &mark);
        }
        return children;
    }

    match tag {
        "br" => vec![Node::text("\n")],
        "img" => {
            let data = Data::new()
                .with_opt(keys::SRC, attr(element, "src"))
                .with_opt(keys::ALT, attr(element, "alt"));
            vec![Inline::new(InlineKind::Image, data).into()]
        }
        "hyperlink" => {
            let data = Data::new()
                .with_opt(keys::HREF, attr(element, "href"))
                .with_opt(keys::PARAM_NAME, attr(element, "param"))
                .with_opt(keys::PARAM_VALUE, attr(element, "field"))
                .with_opt(keys::PARAMS, attr(element, "params"));
            vec![inline(InlineKind::Hyperlink, data, element)]
        }
        "link" if element.is_void() => Vec::new(),
        "a" | "link" => {
            let data = Data::new().with_opt(keys::HREF, attr(element, "href"));
            vec![inline(InlineKind::Hyperlink, data, element)]
        }
        "attribute" => {
            let data = Data::new().with(keys::FIELD, element.text_content());
            vec![inline(InlineKind::Attribute, data, element)]
        }
        _ => convert_all(&element.children),
    }
}

fn inline(kind: InlineKind, data: Data, element: &Element) -> Node {
    let children: Vec<Node> = convert_all(&element.children)
        .into_iter()
        .filter(|child| !child.is_block())
        .collect();
    Inline::with_nodes(kind, data, layout::canonicalize(children)).into()
}

const LINE_THROUGH: &str = "text-decoration:line-through";

/// The mark a mark element imports as. A `<span>` without a usable style
/// imports as nothing.
fn mark_for(kind: MarkKind, element: &Element) -> Option<Mark> {
    if kind != MarkKind::Span {
        return Some(Mark::new(kind));
    }
    if element.tag != "span" {
        return Some(Mark::span(LINE_THROUGH));
    }
    let style = element.attribute("style")?;
    let (property, value) = leading_declaration(style)?;
    Some(match property.as_str() {
        "color" => Mark::color(value),
        "font-family" => Mark::font(primary_family(&value)),
        _ => Mark::span(style.trim()),
    })
}

/// Add `mark` to every text below `node`. Inner marks come first, so nested
/// mark elements keep their order when exported again.
fn apply_mark(node: &mut Node, mark: &Mark) {
    match node {
        Node::Text(text) => {
            if !text.marks.contains(mark) {
                text.marks.push(mark.clone());
            }
        }
        _ => {
            if let Some(children) = node.children_mut() {
                for child in children {
                    apply_mark(child, mark);
                }
            }
        }
    }
}
