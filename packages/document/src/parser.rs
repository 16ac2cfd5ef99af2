use crate::error::{ParseError, ParseErrors, ParseResult};
use crate::markup::{decode_entities, Element, MarkupNode};
use crate::tokenizer::{close_tag_name, parse_open_tag, tokenize, Token};
use std::ops::Range;

/// Elements whose closing tag may be omitted.
const OPTIONAL_CLOSE: &[&str] = &["p", "li"];

/// Opening one of these implicitly closes an open `<p>`.
const CLOSES_PARAGRAPH: &[&str] = &[
    "p", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6", "div", "table", "pre",
    "blockquote", "rule", "condition",
];

/// Elements whose content is raw text up to the matching close tag.
const RAW_TEXT: &[&str] = &["script", "style"];

struct OpenElement {
    element: Element,
    span: Range<usize>,
}

/// Builds a [`MarkupNode`] tree from markup, tolerating malformed input.
///
/// Problems that a browser would silently repair are recorded in
/// [`Parser::errors`]; the tree is always produced.
pub struct Parser<'src> {
    source: &'src str,
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    stack: Vec<OpenElement>,
    roots: Vec<MarkupNode>,
    errors: ParseErrors,
}

impl<'src> Parser<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            tokens: tokenize(source),
            pos: 0,
            stack: Vec::new(),
            roots: Vec::new(),
            errors: ParseErrors::new(),
        }
    }

    pub fn parse(mut self) -> (Vec<MarkupNode>, ParseErrors) {
        while let Some((token, span)) = self.advance() {
            match token {
                Token::OpenTag(raw) => self.open(raw, span),
                Token::CloseTag(raw) => self.close(&close_tag_name(raw), span),
                Token::Text(text) => self.push(MarkupNode::Text(decode_entities(text))),
                Token::Stray(text) => {
                    self.errors.push(ParseError::StrayAngle { span });
                    self.push(MarkupNode::Text(text.to_string()));
                }
                Token::Comment(_) | Token::Declaration | Token::ProcessingInstruction => {}
            }
        }

        while let Some(open) = self.stack.pop() {
            if !OPTIONAL_CLOSE.contains(&open.element.tag.as_str()) {
                self.errors.push(ParseError::unclosed(open.element.tag.clone(), open.span));
            }
            self.push(MarkupNode::Element(open.element));
        }

        (self.roots, self.errors)
    }

    fn advance(&mut self) -> Option<(Token<'src>, Range<usize>)> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn push(&mut self, node: MarkupNode) {
        match self.stack.last_mut() {
            Some(open) => open.element.children.push(node),
            None => self.roots.push(node),
        }
    }

    fn current_tag(&self) -> Option<&str> {
        self.stack.last().map(|open| open.element.tag.as_str())
    }

    fn open(&mut self, raw: &str, span: Range<usize>) {
        let head = parse_open_tag(raw);
        let mut element = Element::new(head.name);
        element.attributes = head
            .attributes
            .into_iter()
            .map(|(name, value)| (name, decode_entities(&value)))
            .collect();

        let tag = element.tag.clone();
        if self.current_tag() == Some("p") && CLOSES_PARAGRAPH.contains(&tag.as_str()) {
            self.pop_into_parent();
        }
        if tag == "li" && self.current_tag() == Some("li") {
            self.pop_into_parent();
        }

        if element.is_void() || head.self_closing {
            self.push(MarkupNode::Element(element));
            return;
        }

        if RAW_TEXT.contains(&tag.as_str()) {
            let content = self.skip_raw_text(&tag, span.end);
            element.children.push(MarkupNode::Text(content));
            self.push(MarkupNode::Element(element));
            return;
        }

        self.stack.push(OpenElement { element, span });
    }

    /// Consume everything up to `</tag>` and return it unparsed.
    fn skip_raw_text(&mut self, tag: &str, from: usize) -> String {
        let rest = &self.source[from..];
        let needle = format!("</{}", tag);
        let end = rest.to_ascii_lowercase().find(&needle).map(|at| from + at);
        let (content_end, resume) = match end {
            Some(at) => {
                let close = self.source[at..].find('>').map(|gt| at + gt + 1).unwrap_or(self.source.len());
                (at, close)
            }
            None => (self.source.len(), self.source.len()),
        };
        while self
            .tokens
            .get(self.pos)
            .map(|(_, span)| span.start < resume)
            .unwrap_or(false)
        {
            self.pos += 1;
        }
        self.source[from..content_end].to_string()
    }

    fn pop_into_parent(&mut self) {
        if let Some(open) = self.stack.pop() {
            self.push(MarkupNode::Element(open.element));
        }
    }

    fn close(&mut self, tag: &str, span: Range<usize>) {
        let Some(depth) = self.stack.iter().rposition(|open| open.element.tag == tag) else {
            if !crate::markup::VOID_ELEMENTS.contains(&tag) {
                self.errors.push(ParseError::unmatched(tag, span));
            }
            return;
        };

        while self.stack.len() > depth + 1 {
            if let Some(open) = self.stack.pop() {
                if !OPTIONAL_CLOSE.contains(&open.element.tag.as_str()) {
                    self.errors.push(ParseError::unclosed(open.element.tag.clone(), open.span));
                }
                self.push(MarkupNode::Element(open.element));
            }
        }
        self.pop_into_parent();
    }
}

/// Parse markup leniently. Never fails.
pub fn parse_markup(source: &str) -> Vec<MarkupNode> {
    Parser::new(source).parse().0
}

/// Parse markup, failing on anything a browser would have to repair.
pub fn parse_markup_strict(source: &str) -> ParseResult<Vec<MarkupNode>> {
    let (nodes, errors) = Parser::new(source).parse();
    if errors.is_empty() {
        Ok(nodes)
    } else {
        Err(errors)
    }
}
