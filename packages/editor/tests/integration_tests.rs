//! End-to-end editing scenarios

use ontask_document::{deserialize, keys, serialize, BlockKind};
use ontask_editor::{
    is_normalized, validate, Editor, EditorConfig, Key, KeyEvent, Path, Point, Rule, RuleContext, Selection,
    CATCH_ALL_LABEL,
};

const AGE_RULE: &str = r#"{
    "ruleId": "r1",
    "catchAll": "c3",
    "parameters": ["age"],
    "conditions": [{ "conditionId": "c1", "formulas": [{ "operator": ">", "comparator": 18 }] }]
}"#;

fn context() -> anyhow::Result<RuleContext> {
    let rule: Rule = serde_json::from_str(AGE_RULE)?;
    let context = RuleContext::from_json(r#"{ "types": { "age": "number" } }"#)?;
    Ok(RuleContext { rules: vec![rule], ..context })
}

fn editor(markup: &str) -> Editor {
    Editor::load(markup, EditorConfig::default(), RuleContext::default())
}

#[test]
fn test_attribute_markup_round_trips() {
    let markup = "<p>Hello <attribute>name</attribute></p>";
    assert_eq!(serialize(&deserialize(markup)), markup);

    let editor = editor(markup);
    assert_eq!(editor.serialize(), markup);
    assert!(!editor.is_dirty());
}

#[test]
fn test_backspace_unwraps_single_item_list() {
    let mut editor = editor("<ul><li>a</li></ul>");
    assert_eq!(editor.on_key_down(KeyEvent::new(Key::Backspace)), Some("list-backspace"));
    assert_eq!(editor.serialize(), "<p>a</p>");
}

#[test]
fn test_inserted_rule_labels() -> anyhow::Result<()> {
    let context = context()?;
    let rule = context.rules[0].clone();
    let mut editor = Editor::load("", EditorConfig::default(), context);

    editor.insert_rule(&rule).expect("rule inserted");

    let labels: Vec<String> = editor.condition_headings().into_iter().map(|(_, heading)| heading.label).collect();
    assert_eq!(labels, vec!["age > 18".to_string(), CATCH_ALL_LABEL.to_string()]);
    Ok(())
}

#[test]
fn test_numbered_list_shortcut() {
    let mut editor = editor("");
    editor.type_text("1. ");

    let doc = editor.document();
    assert_eq!(doc.nodes.len(), 1);
    assert_eq!(doc.nodes[0].block_kind(), Some(BlockKind::NumberedList));
    let item = &doc.nodes[0].children().unwrap()[0];
    assert_eq!(item.block_kind(), Some(BlockKind::ListItem));
    assert_eq!(item.text_content(), "");
    assert!(!editor.serialize().contains("1."));
}

#[test]
fn test_rule_insertion_shape() -> anyhow::Result<()> {
    let rule: Rule = serde_json::from_str(
        r#"{
            "ruleId": "r9",
            "catchAll": "else-9",
            "parameters": ["score"],
            "conditions": [
                { "conditionId": "low", "formulas": [{ "operator": "<", "comparator": 50 }] },
                { "conditionId": "high", "formulas": [{ "operator": ">=", "comparator": 50 }] }
            ]
        }"#,
    )?;
    let mut editor = editor("<p>Intro</p>");
    editor.select(Selection::collapsed(Point::new([0, 0], 5)));
    let path = editor.insert_rule(&rule).expect("rule inserted");
    assert_eq!(path, Path::from([1]));

    let block = editor.document().node(&path).and_then(|node| node.as_block()).expect("rule block");
    assert_eq!(block.kind, BlockKind::Rule);
    assert_eq!(block.data.get(keys::RULE_ID), Some("r9"));
    assert_eq!(block.nodes.len(), rule.conditions.len() + 1);

    for (node, condition) in block.nodes.iter().zip(&rule.conditions) {
        let data = node.data().expect("condition data");
        assert_eq!(node.block_kind(), Some(BlockKind::Condition));
        assert_eq!(data.get(keys::CONDITION_ID), Some(condition.condition_id.as_str()));
        assert_eq!(data.get(keys::RULE_ID), Some("r9"));
    }
    let catch_all = block.nodes.last().and_then(|node| node.data()).expect("catch-all data");
    assert_eq!(catch_all.get(keys::LABEL), Some(CATCH_ALL_LABEL));
    assert_eq!(catch_all.get(keys::CONDITION_ID), Some("else-9"));

    // The rule never sits at a document edge.
    assert_eq!(editor.document().nodes.last().and_then(|node| node.block_kind()), Some(BlockKind::Paragraph));
    Ok(())
}

#[test]
fn test_space_between_tokens_survives_reload() {
    let mut editor = editor("<p>Dear </p>");
    editor.select(Selection::collapsed(Point::new([0, 0], 5)));
    editor.insert_attribute("first");
    editor.type_text(" ");
    editor.insert_attribute("last");

    let saved = editor.serialize();
    assert_eq!(saved, "<p>Dear <attribute>first</attribute> <attribute>last</attribute></p>");
    let reloaded = Editor::load(&saved, EditorConfig::default(), RuleContext::default());
    assert_eq!(reloaded.document(), editor.document());
    assert_eq!(reloaded.document().nodes[0].text_content(), "Dear first last");
}

#[test]
fn test_edited_documents_round_trip() -> anyhow::Result<()> {
    let context = context()?;
    let rule = context.rules[0].clone();
    let mut editor = Editor::load("<p>Dear </p>", EditorConfig::default(), context);

    editor.select(Selection::collapsed(Point::new([0, 0], 5)));
    editor.type_text("Jo");
    editor.insert_attribute("last_name");
    editor.on_key_down(KeyEvent::new(Key::Enter));
    editor.on_click_block(BlockKind::BulletedList);
    editor.type_text("item");
    editor.on_key_down(KeyEvent::new(Key::Enter));
    editor.on_key_down(KeyEvent::new(Key::Enter));
    editor.insert_rule(&rule);

    let doc = editor.document();
    assert!(validate(doc).is_empty());
    assert!(is_normalized(doc));
    assert_eq!(&deserialize(&editor.serialize()), doc);
    Ok(())
}
