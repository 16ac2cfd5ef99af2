//! Markup tokenizer using logos.
//!
//! Two lexers: [`Token`] splits a document into tags and text, and
//! [`AttrToken`] splits the inside of an opening tag into attributes.
//! Characters neither lexer accepts (a stray `<`) are reported as
//! [`Token::Stray`] so callers can keep them as text.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, PartialEq, Eq)]
pub enum Token<'src> {
    #[token("<!--", lex_comment)]
    Comment(&'src str),

    /// `<!DOCTYPE ...>`, `<![CDATA[...]>`
    #[regex(r"<![a-zA-Z\[][^>]*>")]
    Declaration,

    /// `<?xml ...?>` from word-processor clipboards.
    #[regex(r"<\?[^>]*>")]
    ProcessingInstruction,

    #[regex(r#"<[a-zA-Z][a-zA-Z0-9:_-]*([^>"']|"[^"]*"|'[^']*')*>"#, |lex| lex.slice())]
    OpenTag(&'src str),

    #[regex(r"</[a-zA-Z][a-zA-Z0-9:_-]*[ \t\r\n]*>", |lex| lex.slice())]
    CloseTag(&'src str),

    #[regex(r"[^<]+", |lex| lex.slice())]
    Text(&'src str),

    /// A `<` that does not start a tag. Unlexable input is folded in here too.
    #[token("<", |lex| lex.slice())]
    Stray(&'src str),
}

fn lex_comment<'src>(lex: &mut logos::Lexer<'src, Token<'src>>) -> &'src str {
    let rest = lex.remainder();
    match rest.find("-->") {
        Some(end) => {
            lex.bump(end + 3);
            &rest[..end]
        }
        None => {
            lex.bump(rest.len());
            rest
        }
    }
}

/// Tokens inside an opening tag, after the tag name.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
pub enum AttrToken<'src> {
    #[regex(r#"[^ \t\r\n\f"'>=]+"#, |lex| lex.slice())]
    Word(&'src str),

    #[token("=")]
    Eq,

    #[regex(r#""[^"]*""#, |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    #[regex(r"'[^']*'", |lex| { let s = lex.slice(); &s[1..s.len() - 1] })]
    Quoted(&'src str),
}

/// Tokenize markup into tokens with byte spans.
pub fn tokenize(source: &str) -> Vec<(Token<'_>, Range<usize>)> {
    Token::lexer(source)
        .spanned()
        .map(|(result, span)| match result {
            Ok(token) => (token, span),
            Err(()) => (Token::Stray(&source[span.clone()]), span),
        })
        .collect()
}

/// A parsed opening tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagHead {
    /// Lowercased tag name.
    pub name: String,
    /// Attributes in source order, names lowercased, values still escaped.
    pub attributes: Vec<(String, String)>,
    pub self_closing: bool,
}

/// Split `<name attr="v" ...>` into its parts.
pub fn parse_open_tag(raw: &str) -> TagHead {
    let inner = raw.trim_start_matches('<').trim_end_matches('>');
    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();

    let mut attributes: Vec<(String, String)> = Vec::new();
    let mut self_closing = false;
    let mut pending: Option<String> = None;
    let mut expecting_value = false;

    for token in AttrToken::lexer(&inner[name_end..]).flatten() {
        match token {
            AttrToken::Word(word) if expecting_value => {
                if let Some(attr) = pending.take() {
                    attributes.push((attr, word.to_string()));
                }
                expecting_value = false;
            }
            AttrToken::Quoted(value) if expecting_value => {
                if let Some(attr) = pending.take() {
                    attributes.push((attr, value.to_string()));
                }
                expecting_value = false;
            }
            AttrToken::Word("/") => self_closing = true,
            AttrToken::Word(word) => {
                if let Some(attr) = pending.replace(word.to_ascii_lowercase()) {
                    attributes.push((attr, String::new()));
                }
                self_closing = false;
            }
            AttrToken::Eq => expecting_value = pending.is_some(),
            AttrToken::Quoted(_) => {}
        }
    }
    if let Some(attr) = pending {
        attributes.push((attr, String::new()));
    }

    TagHead { name, attributes, self_closing }
}

/// Lowercased name of a closing tag.
pub fn close_tag_name(raw: &str) -> String {
    raw.trim_start_matches("</")
        .trim_end_matches('>')
        .trim()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_tags_and_text() {
        let tokens = tokenize("<p class=\"a\">Hello <b>you</b></p>");
        let kinds: Vec<_> = tokens.iter().map(|(t, _)| t.clone()).collect();
        assert_eq!(
            kinds,
            vec![
                Token::OpenTag("<p class=\"a\">"),
                Token::Text("Hello "),
                Token::OpenTag("<b>"),
                Token::Text("you"),
                Token::CloseTag("</b>"),
                Token::CloseTag("</p>"),
            ]
        );
    }

    #[test]
    fn test_comment_and_stray_angle() {
        let tokens = tokenize("<!-- a > b -->x < y");
        assert_eq!(tokens[0].0, Token::Comment(" a > b "));
        assert_eq!(tokens[1].0, Token::Text("x "));
        assert_eq!(tokens[2].0, Token::Stray("<"));
        assert_eq!(tokens[3].0, Token::Text(" y"));
    }

    #[test]
    fn test_quoted_gt_inside_attribute() {
        let tokens = tokenize("<a title=\"1 > 0\">x</a>");
        assert_eq!(tokens[0].0, Token::OpenTag("<a title=\"1 > 0\">"));
    }

    #[test]
    fn test_parse_open_tag_attributes() {
        let head = parse_open_tag("<Hyperlink HREF=http://x/y param='id' field=\"sid\" disabled>");
        assert_eq!(head.name, "hyperlink");
        assert_eq!(
            head.attributes,
            vec![
                ("href".to_string(), "http://x/y".to_string()),
                ("param".to_string(), "id".to_string()),
                ("field".to_string(), "sid".to_string()),
                ("disabled".to_string(), String::new()),
            ]
        );
        assert!(!head.self_closing);
        assert!(parse_open_tag("<br/>").self_closing);
        assert!(parse_open_tag("<img src=\"a.png\" />").self_closing);
        assert_eq!(close_tag_name("</P >"), "p");
    }
}
