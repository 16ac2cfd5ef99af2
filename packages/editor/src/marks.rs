//! Mark commands for the formatting toolbar.

use crate::errors::{OpResult, OperationError};
use crate::operation::Properties;
use crate::transaction::Transaction;
use crate::value::{Point, Selection};
use ontask_document::{Mark, MarkKind, Path};

impl Transaction {
    pub fn add_mark(&mut self, mark: Mark) -> OpResult {
        self.update_marks(|marks| {
            if !marks.contains(&mark) {
                marks.push(mark.clone());
            }
        })
    }

    pub fn remove_mark(&mut self, kind: MarkKind) -> OpResult {
        self.update_marks(|marks| marks.retain(|mark| mark.kind != kind))
    }

    /// Remove `kind` when the whole selection already carries it, add it otherwise.
    pub fn toggle_mark(&mut self, kind: MarkKind) -> OpResult {
        if self.value().has_mark(kind) {
            self.remove_mark(kind)
        } else {
            self.add_mark(Mark::new(kind))
        }
    }

    /// Replace the colour of the selected text.
    pub fn set_color(&mut self, hex: &str) -> OpResult {
        self.replace_mark(Mark::color(hex))
    }

    pub fn set_font(&mut self, font: &str) -> OpResult {
        self.replace_mark(Mark::font(font))
    }

    fn replace_mark(&mut self, mark: Mark) -> OpResult {
        self.update_marks(|marks| {
            marks.retain(|existing| existing.kind != mark.kind);
            marks.push(mark.clone());
        })
    }

    /// Apply `update` to the marks of every selected character. A collapsed
    /// selection updates the pending marks instead.
    fn update_marks(&mut self, update: impl Fn(&mut Vec<Mark>)) -> OpResult {
        if self.selection().is_collapsed() {
            let mut marks = self.value().active_marks();
            update(&mut marks);
            self.set_pending_marks(Some(marks));
            return Ok(());
        }

        let targets = self.isolate_selected_texts()?;
        for path in &targets {
            let Some(text) = self.value().text(path) else {
                continue;
            };
            let mut marks = text.marks.clone();
            update(&mut marks);
            self.set_node(path.clone(), Properties::Text { marks })?;
        }

        if let (Some(first), Some(last)) = (targets.first(), targets.last()) {
            let end = self.value().text_len(last);
            self.select(Selection::range(Point { path: first.clone(), offset: 0 }, Point { path: last.clone(), offset: end }));
        }
        Ok(())
    }

    /// Split the texts at the selection edges so the selection covers whole
    /// text nodes, returning those nodes in document order.
    fn isolate_selected_texts(&mut self) -> OpResult<Vec<Path>> {
        let start = self.selection().start().clone();
        let end = self.selection().end().clone();

        if start.path == end.path {
            if end.offset < self.value().text_len(&end.path) {
                self.split_node(end.path.clone(), end.offset)?;
            }
            if start.offset == 0 {
                return Ok(vec![start.path]);
            }
            self.split_node(start.path.clone(), start.offset)?;
            return Ok(start.path.next().into_iter().collect());
        }

        let end_ref = self.path_ref(end.path.clone());
        if end.offset > 0 && end.offset < self.value().text_len(&end.path) {
            self.split_node(end.path.clone(), end.offset)?;
        }

        // A start at the very end of its text selects nothing in it.
        let start_len = self.value().text_len(&start.path);
        let (first, skip_first) = if start.offset > 0 && start.offset < start_len {
            self.split_node(start.path.clone(), start.offset)?;
            let next = start
                .path
                .next()
                .ok_or_else(|| OperationError::ParentNotFound(start.path.clone()))?;
            (next, false)
        } else {
            (start.path.clone(), start.offset > 0)
        };
        let last = self.resolve(end_ref)?;
        let include_last = end.offset > 0;

        Ok(self
            .document()
            .text_paths()
            .into_iter()
            .filter(|path| *path >= first && *path <= last)
            .filter(|path| !(skip_first && *path == first))
            .filter(|path| include_last || *path != last)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use ontask_document::{Block, Document, Node, Text};

    fn tx(nodes: Vec<Node>, selection: Selection) -> Transaction {
        let mut tx = Transaction::new(Value::new(Document::new(nodes)));
        tx.select(selection);
        tx
    }

    fn bold() -> Mark {
        Mark::new(MarkKind::Bold)
    }

    #[test]
    fn test_toggle_mark_inside_one_text() {
        let mut tx = tx(
            vec![Block::paragraph("hello").into()],
            Selection::range(Point::new([0, 0], 1), Point::new([0, 0], 3)),
        );
        tx.toggle_mark(MarkKind::Bold).unwrap();
        let children = tx.document().nodes[0].children().unwrap();
        assert_eq!(children[0], Text::new("h").into());
        assert_eq!(children[1], Text::with_marks("el", vec![bold()]).into());
        assert_eq!(children[2], Text::new("lo").into());
        assert!(tx.value().has_mark(MarkKind::Bold));

        tx.toggle_mark(MarkKind::Bold).unwrap();
        let children = tx.document().nodes[0].children().unwrap();
        assert_eq!(children[1], Text::new("el").into());
    }

    #[test]
    fn test_mark_across_blocks() {
        let mut tx = tx(
            vec![Block::paragraph("ab").into(), Block::paragraph("cd").into()],
            Selection::range(Point::new([0, 0], 1), Point::new([1, 0], 1)),
        );
        tx.add_mark(Mark::new(MarkKind::Italic)).unwrap();
        let first = tx.document().nodes[0].children().unwrap();
        let second = tx.document().nodes[1].children().unwrap();
        assert_eq!(first[1], Text::with_marks("b", vec![Mark::new(MarkKind::Italic)]).into());
        assert_eq!(second[0], Text::with_marks("c", vec![Mark::new(MarkKind::Italic)]).into());
        assert_eq!(second[1], Text::new("d").into());
    }

    #[test]
    fn test_collapsed_toggle_sets_pending_marks() {
        let mut tx = tx(vec![Block::paragraph("ab").into()], Selection::collapsed(Point::new([0, 0], 1)));
        tx.toggle_mark(MarkKind::Bold).unwrap();
        assert_eq!(tx.selection().marks, Some(vec![bold()]));
        tx.toggle_mark(MarkKind::Bold).unwrap();
        assert_eq!(tx.selection().marks, Some(vec![]));
    }

    #[test]
    fn test_set_color_replaces_existing_colour() {
        let text = Text::with_marks("red", vec![Mark::color("#ff0000")]);
        let mut tx = tx(
            vec![Block::with_nodes(ontask_document::BlockKind::Paragraph, vec![text.into()]).into()],
            Selection::range(Point::new([0, 0], 0), Point::new([0, 0], 3)),
        );
        tx.set_color("#00ff00").unwrap();
        let text = tx.document().node(&Path::from([0, 0])).and_then(Node::as_text).unwrap();
        assert_eq!(text.marks, vec![Mark::color("#00ff00")]);
    }
}
