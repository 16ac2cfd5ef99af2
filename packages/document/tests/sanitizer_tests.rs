//! Paste sanitizer integration tests.

use ontask_document::{sanitize, sanitize_fragment, BlockKind, MarkKind, Node};

#[test]
fn test_word_clipboard_is_reduced() {
    let clipboard = r#"<?xml version="1.0"?><html><head><meta charset="utf-8">
        <style>p.MsoNormal { margin: 0 }</style></head>
        <body><!--StartFragment--><p class="MsoNormal" style="margin:0;color:#333333;font-family:Calibri, sans-serif">
        <b>Dear</b> <i>student</i></p><!--EndFragment--></body></html>"#;

    let clean = sanitize(clipboard);
    assert!(!clean.contains("MsoNormal"));
    assert!(!clean.contains("margin"));
    assert!(!clean.contains("<html"));
    assert!(!clean.contains("<meta"));
    assert!(clean.contains("<p style=\"color:#333333;font-family:Calibri, sans-serif\">"));
    assert!(clean.contains("<strong>Dear</strong>"));
    assert!(clean.contains("<em>student</em>"));
}

#[test]
fn test_scripts_are_removed_with_content() {
    let clean = sanitize("<p>ok</p><script>alert('x')</script><noscript>no</noscript>");
    assert_eq!(clean, "<p>ok</p>");
}

#[test]
fn test_attribute_allow_list() {
    let clean = sanitize(
        "<a href=\"https://ontask.org\" onclick=\"evil()\" target=\"_blank\">x</a>\
         <a href=\"javascript:evil()\">y</a><img src=\"a.png\" alt=\"dropped\" width=\"10\">",
    );
    assert_eq!(
        clean,
        "<a href=\"https://ontask.org\" target=\"_blank\">x</a><a>y</a><img src=\"a.png\">"
    );
}

#[test]
fn test_disallowed_tags_keep_their_text() {
    assert_eq!(sanitize("<section><font>kept</font></section>"), "kept");
}

#[test]
fn test_pasted_fragment_imports_marks_and_blocks() {
    let nodes = sanitize_fragment("<h1>Title</h1><p><b>bold</b> text</p><ul><li>item</li></ul>");
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0].block_kind(), Some(BlockKind::HeadingOne));
    assert_eq!(nodes[2].block_kind(), Some(BlockKind::BulletedList));

    let paragraph = nodes[1].children().unwrap();
    match &paragraph[0] {
        Node::Text(text) => {
            assert_eq!(text.text, "bold");
            assert!(text.has_mark(MarkKind::Bold));
        }
        other => panic!("expected text, found {:?}", other),
    }
}

#[test]
fn test_pasted_span_colour_becomes_colour_mark() {
    let nodes = sanitize_fragment("<span style=\"font-size:20px;color:red\">hot</span>");
    assert_eq!(nodes.len(), 1);
    let text = nodes[0].children().unwrap()[0].as_text().unwrap();
    assert!(text.has_mark(MarkKind::Color));
}
