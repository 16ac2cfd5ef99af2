//! Inline `style` attribute handling for colour, font and span marks.

use std::collections::BTreeMap;

/// Split a style attribute into `(property, value)` declarations.
/// Property names are lowercased; both sides are trimmed.
pub fn parse_declarations(style: &str) -> Vec<(String, String)> {
    style
        .split(';')
        .filter_map(|declaration| {
            let (property, value) = declaration.split_once(':')?;
            let property = property.trim().to_ascii_lowercase();
            let value = value.trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }
            Some((property, value.to_string()))
        })
        .collect()
}

/// The first declaration of a style attribute, which decides the mark a
/// `<span>` imports as.
pub fn leading_declaration(style: &str) -> Option<(String, String)> {
    let first = style.split(';').next()?;
    parse_declarations(first).into_iter().next()
}

pub fn render_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(property, value)| format!("{}:{}", property, value))
        .collect::<Vec<_>>()
        .join(";")
}

/// First family of a `font-family` value with quotes removed.
pub fn primary_family(value: &str) -> String {
    value
        .split(',')
        .next()
        .unwrap_or("")
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .to_string()
}

/// Font name → CSS font stack. A font mark stores the name; export writes
/// the whole stack and import reads the name back from its first family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontTable {
    stacks: BTreeMap<String, Vec<String>>,
}

impl FontTable {
    pub fn new() -> Self {
        Self { stacks: BTreeMap::new() }
    }

    pub fn insert(&mut self, name: impl Into<String>, stack: Vec<String>) {
        self.stacks.insert(name.into(), stack);
    }

    /// Merge extra entries over this table.
    pub fn extend(&mut self, entries: impl IntoIterator<Item = (String, Vec<String>)>) {
        self.stacks.extend(entries);
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.stacks.keys().map(String::as_str)
    }

    /// The `font-family` value for `name`; unknown names export as themselves.
    pub fn stack(&self, name: &str) -> String {
        match self.stacks.get(name) {
            Some(stack) => stack.join(", "),
            None => name.to_string(),
        }
    }
}

impl Default for FontTable {
    fn default() -> Self {
        let mut table = Self::new();
        for (name, stack) in [
            ("Arial", &["Arial", "Helvetica", "sans-serif"][..]),
            ("Arial Black", &["Arial Black", "Gadget", "sans-serif"][..]),
            ("Comic Sans MS", &["Comic Sans MS", "cursive", "sans-serif"][..]),
            ("Courier New", &["Courier New", "Courier", "monospace"][..]),
            ("Georgia", &["Georgia", "serif"][..]),
            ("Impact", &["Impact", "Charcoal", "sans-serif"][..]),
            ("Lucida Console", &["Lucida Console", "Monaco", "monospace"][..]),
            ("Tahoma", &["Tahoma", "Geneva", "sans-serif"][..]),
            ("Times New Roman", &["Times New Roman", "Times", "serif"][..]),
            ("Trebuchet MS", &["Trebuchet MS", "Helvetica", "sans-serif"][..]),
            ("Verdana", &["Verdana", "Geneva", "sans-serif"][..]),
        ] {
            table.insert(name, stack.iter().map(|family| family.to_string()).collect());
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_declaration() {
        assert_eq!(
            leading_declaration("Color: #ff0000; font-weight: bold"),
            Some(("color".to_string(), "#ff0000".to_string()))
        );
        assert_eq!(leading_declaration("; color: red"), None);
        assert_eq!(leading_declaration(""), None);
    }

    #[test]
    fn test_primary_family() {
        assert_eq!(primary_family("'Times New Roman', Times, serif"), "Times New Roman");
        assert_eq!(primary_family("Verdana"), "Verdana");
    }

    #[test]
    fn test_font_stack_round_trip() {
        let fonts = FontTable::default();
        let stack = fonts.stack("Georgia");
        assert_eq!(stack, "Georgia, serif");
        assert_eq!(primary_family(&stack), "Georgia");
        assert_eq!(fonts.stack("Papyrus"), "Papyrus");
    }
}
