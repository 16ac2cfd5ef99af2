//! Canonical child layout for text-holding nodes.
//!
//! Text runs and inlines alternate; every inline is surrounded by text
//! nodes (possibly empty); adjacent texts with identical marks are merged;
//! an empty text survives only when it is the sole child or sits next to an
//! inline. The deserializer produces this layout and the editor's normalizer
//! restores it after edits, both through [`find_layout_issue`].

use crate::node::{Node, Text};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutIssue {
    /// An empty text must be inserted at this index.
    MissingText(usize),
    /// The text at this index must be merged into the text before it.
    MergeTexts(usize),
    /// The empty text at this index is redundant.
    RedundantText(usize),
}

/// First layout problem among `children` of a text-holding node.
///
/// Block children are not considered; they are unwrapped before layout
/// is checked.
pub fn find_layout_issue(children: &[Node]) -> Option<LayoutIssue> {
    if children.is_empty() {
        return Some(LayoutIssue::MissingText(0));
    }

    let mut previous: Option<&Node> = None;
    for (index, child) in children.iter().enumerate() {
        match (previous, child) {
            (None, Node::Inline(_)) | (Some(Node::Inline(_)), Node::Inline(_)) => {
                return Some(LayoutIssue::MissingText(index));
            }
            (Some(Node::Text(before)), Node::Text(current)) => {
                if before.marks == current.marks {
                    return Some(LayoutIssue::MergeTexts(index));
                }
                if current.is_empty() {
                    return Some(LayoutIssue::RedundantText(index));
                }
                if before.is_empty() {
                    return Some(LayoutIssue::RedundantText(index - 1));
                }
            }
            _ => {}
        }
        previous = Some(child);
    }

    match children.last() {
        Some(Node::Inline(_)) => Some(LayoutIssue::MissingText(children.len())),
        _ => None,
    }
}

/// Rewrite `children` into canonical layout.
pub fn canonicalize(mut children: Vec<Node>) -> Vec<Node> {
    while let Some(issue) = find_layout_issue(&children) {
        match issue {
            LayoutIssue::MissingText(index) => children.insert(index, Node::Text(Text::default())),
            LayoutIssue::MergeTexts(index) => {
                let merged = children.remove(index);
                if let (Some(Node::Text(before)), Node::Text(after)) = (children.get_mut(index - 1), merged) {
                    before.text.push_str(&after.text);
                }
            }
            LayoutIssue::RedundantText(index) => {
                children.remove(index);
            }
        }
    }
    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Data, Inline, InlineKind, Mark, MarkKind};

    fn token() -> Node {
        Inline::with_nodes(InlineKind::Attribute, Data::new(), vec![Node::text("name")]).into()
    }

    #[test]
    fn test_pads_inlines_with_text() {
        let children = canonicalize(vec![token(), token()]);
        assert_eq!(children.len(), 5);
        assert!(children[0].is_text() && children[2].is_text() && children[4].is_text());
        assert_eq!(find_layout_issue(&children), None);
    }

    #[test]
    fn test_merges_and_drops_texts() {
        let bold = Text::with_marks("b", vec![Mark::new(MarkKind::Bold)]);
        let children = canonicalize(vec![
            Node::text("a"),
            Node::text("c"),
            Node::text(""),
            bold.into(),
        ]);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].text_content(), "ac");
    }

    #[test]
    fn test_empty_container_gets_text() {
        assert_eq!(canonicalize(Vec::new()), vec![Node::text("")]);
    }
}
