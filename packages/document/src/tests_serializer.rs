//! Serializer tests: exported markup and stability under re-import.

use crate::node::*;
use crate::{deserialize, serialize, Serializer};

fn round_trip(markup: &str) -> String {
    serialize(&deserialize(markup))
}

#[test]
fn test_round_trip_paragraph_with_attribute() {
    let markup = "<p>Hello <attribute>name</attribute></p>";
    assert_eq!(round_trip(markup), markup);
}

#[test]
fn test_round_trip_rule() {
    let markup = "<p></p><rule ruleid=\"r1\"><condition conditionid=\"c1\" ruleid=\"r1\"><p>Adult</p></condition>\
                  <condition conditionid=\"c2\" ruleid=\"r1\" label=\"else\"><p>Minor</p></condition></rule><p></p>";
    assert_eq!(round_trip(markup), markup);
}

#[test]
fn test_round_trip_lists_and_headings() {
    let markup = "<h1>Title</h1><h2>Sub</h2><ul><li>a</li><ul><li>nested</li></ul></ul><ol><li>one</li></ol><pre>code</pre>";
    assert_eq!(round_trip(markup), markup);
}

#[test]
fn test_round_trip_marks() {
    let markup = "<p><strong><em>both</em></strong> and <u>under</u>, <code>x</code>\
                  <span style=\"color:#00ff00\">green</span></p>";
    assert_eq!(round_trip(markup), markup);
}

#[test]
fn test_round_trip_keeps_spaces_between_tokens() {
    let markup = "<p>Dear <attribute>first</attribute> <attribute>last</attribute></p>";
    assert_eq!(round_trip(markup), markup);
    assert_eq!(round_trip("<p><strong>a</strong> <em>b</em></p>"), "<p><strong>a</strong> <em>b</em></p>");
}

#[test]
fn test_formatting_whitespace_between_blocks_is_dropped() {
    let markup = "<p>a</p>\n  <ul>\n    <li>b</li>\n  </ul>\n<rule ruleid=\"r\">\n  \
                  <condition conditionid=\"c\" ruleid=\"r\" label=\"else\"><p>c</p></condition>\n</rule>\n";
    assert_eq!(
        round_trip(markup),
        "<p>a</p><ul><li>b</li></ul><rule ruleid=\"r\"><condition conditionid=\"c\" ruleid=\"r\" label=\"else\"><p>c</p></condition></rule>"
    );
}

#[test]
fn test_legacy_link_imports_as_hyperlink() {
    assert_eq!(
        round_trip("<p>see <link href=\"http://x\">here</link> now</p>"),
        "<p>see <hyperlink href=\"http://x\" param=\"\" field=\"\">here</hyperlink> now</p>"
    );
    assert_eq!(round_trip("<link rel=\"stylesheet\" href=\"a.css\"><p>x</p>"), "<p>x</p>");
}

#[test]
fn test_heading_levels_collapse_to_paragraph() {
    assert_eq!(round_trip("<h3>a</h3><blockquote>b</blockquote>"), "<p>a</p><p>b</p>");
}

#[test]
fn test_hyperlink_writes_dummy_attributes() {
    let doc = Document::new(vec![Block::with_nodes(
        BlockKind::Paragraph,
        vec![
            Node::text(""),
            Inline::with_nodes(
                InlineKind::Hyperlink,
                Data::new().with(keys::HREF, "https://ontask.org"),
                vec![Node::text("site")],
            )
            .into(),
            Node::text(""),
        ],
    )
    .into()]);
    assert_eq!(
        serialize(&doc),
        "<p><hyperlink href=\"https://ontask.org\" param=\"\" field=\"\">site</hyperlink></p>"
    );
    assert_eq!(deserialize(&serialize(&doc)), doc);
}

#[test]
fn test_hyperlink_with_parameter() {
    let markup = "<p><hyperlink href=\"https://x.org\" param=\"sid\" field=\"student id\">x</hyperlink></p>";
    assert_eq!(round_trip(markup), markup);
}

#[test]
fn test_hyperlink_with_several_parameters() {
    let markup = "<p><hyperlink href=\"https://x.org\" params=\"?a=f1&amp;b=f2\">x</hyperlink></p>";
    let doc = deserialize(markup);
    let link = doc.node(&Path::from([0, 1])).and_then(Node::as_inline).unwrap();
    assert_eq!(link.hyperlink_params().len(), 2);
    assert_eq!(serialize(&doc), markup);
}

#[test]
fn test_legacy_link_exports_as_hyperlink() {
    assert_eq!(
        round_trip("<p><a href=\"http://old\" target=\"_blank\">old</a></p>"),
        "<p><hyperlink href=\"http://old\" param=\"\" field=\"\">old</hyperlink></p>"
    );
}

#[test]
fn test_image_export() {
    let markup = "<p><img src=\"https://x.org/a.png\" alt=\"logo\"></p>";
    assert_eq!(
        round_trip(markup),
        "<p><img src=\"https://x.org/a.png\" alt=\"logo\" style=\"max-width:100%\"></p>"
    );
}

#[test]
fn test_font_mark_exports_stack() {
    let doc = Document::new(vec![Block::with_nodes(
        BlockKind::Paragraph,
        vec![Text::with_marks("serif", vec![Mark::font("Georgia")]).into()],
    )
    .into()]);
    let markup = serialize(&doc);
    assert_eq!(markup, "<p><span style=\"font-family:Georgia, serif\">serif</span></p>");
    assert_eq!(deserialize(&markup), doc);
}

#[test]
fn test_custom_font_table() {
    let mut fonts = crate::FontTable::new();
    fonts.insert("Brand", vec!["Brand".to_string(), "Arial".to_string()]);
    let doc = Document::new(vec![Block::with_nodes(
        BlockKind::Paragraph,
        vec![Text::with_marks("b", vec![Mark::font("Brand")]).into()],
    )
    .into()]);
    assert_eq!(
        Serializer::with_fonts(fonts).serialize(&doc),
        "<p><span style=\"font-family:Brand, Arial\">b</span></p>"
    );
}

#[test]
fn test_text_is_escaped() {
    let doc = Document::new(vec![Block::paragraph("a < b & c\nd").into()]);
    let markup = serialize(&doc);
    assert_eq!(markup, "<p>a &lt; b &amp; c<br>d</p>");
    assert_eq!(deserialize(&markup), doc);
}

#[test]
fn test_empty_document_serializes_to_nothing() {
    assert_eq!(serialize(&Document::default()), "");
    assert_eq!(serialize(&Document::empty()), "<p></p>");
}
