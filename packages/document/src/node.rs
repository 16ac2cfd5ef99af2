//! # Document Model
//!
//! The tree edited by `ontask-editor` and exchanged as markup.
//!
//! ```text
//! Document
//!  └─ Block (paragraph, heading-one, list-item, rule, condition, ...)
//!      ├─ Block              (container blocks: lists, rules, conditions)
//!      ├─ Inline             (hyperlink, image, attribute)
//!      │   └─ Text
//!      └─ Text { text, marks }
//! ```
//!
//! Nodes are addressed by [`Path`]: the child indices leading from the
//! document root to the node. Parent lookup is `path.parent()`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Keys used in node and mark [`Data`] maps.
pub mod keys {
    pub const HREF: &str = "href";
    pub const PARAM_NAME: &str = "paramName";
    pub const PARAM_VALUE: &str = "paramValue";
    pub const PARAMS: &str = "params";
    pub const SRC: &str = "src";
    pub const ALT: &str = "alt";
    pub const FIELD: &str = "field";
    pub const RULE_ID: &str = "ruleId";
    pub const CONDITION_ID: &str = "conditionId";
    pub const LABEL: &str = "label";
    pub const HEX: &str = "hex";
    pub const FONT: &str = "font";
    pub const STYLE: &str = "style";
}

/// Child-index address of a node. The empty path is the document root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the node within its parent.
    pub fn last(&self) -> Option<usize> {
        self.0.last().copied()
    }

    pub fn parent(&self) -> Option<Path> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Same parent, different index.
    pub fn sibling(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        if let Some(last) = indices.last_mut() {
            *last = index;
        }
        Self(indices)
    }

    pub fn next(&self) -> Option<Path> {
        self.last().map(|index| self.sibling(index + 1))
    }

    pub fn previous(&self) -> Option<Path> {
        match self.last() {
            Some(index) if index > 0 => Some(self.sibling(index - 1)),
            _ => None,
        }
    }

    /// True when `self` is a strict prefix of `other`.
    pub fn is_ancestor_of(&self, other: &Path) -> bool {
        self.0.len() < other.0.len() && other.0.starts_with(&self.0)
    }

    /// True when `prefix` equals `self` or is one of its ancestors.
    pub fn starts_with(&self, prefix: &Path) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Longest shared prefix of two paths.
    pub fn common_ancestor(&self, other: &Path) -> Path {
        let shared = self
            .0
            .iter()
            .zip(other.0.iter())
            .take_while(|(a, b)| a == b)
            .count();
        Self(self.0[..shared].to_vec())
    }

    /// Replace the prefix `from` with `to`, keeping the remaining indices.
    pub fn rebase(&self, from: &Path, to: &Path) -> Path {
        let mut indices = to.0.clone();
        indices.extend_from_slice(&self.0[from.0.len().min(self.0.len())..]);
        Self(indices)
    }

    /// Copy of the path with the index at `depth` replaced.
    pub fn with_index(&self, depth: usize, index: usize) -> Path {
        let mut indices = self.0.clone();
        if let Some(slot) = indices.get_mut(depth) {
            *slot = index;
        }
        Self(indices)
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl<const N: usize> From<[usize; N]> for Path {
    fn from(indices: [usize; N]) -> Self {
        Self(indices.to_vec())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

/// Block node types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    HeadingOne,
    HeadingTwo,
    ListItem,
    BulletedList,
    NumberedList,
    Code,
    Rule,
    Condition,
}

impl BlockKind {
    pub const ALL: [BlockKind; 9] = [
        BlockKind::Paragraph,
        BlockKind::HeadingOne,
        BlockKind::HeadingTwo,
        BlockKind::ListItem,
        BlockKind::BulletedList,
        BlockKind::NumberedList,
        BlockKind::Code,
        BlockKind::Rule,
        BlockKind::Condition,
    ];

    /// Container blocks hold other blocks; the rest hold text and inlines.
    pub fn holds_blocks(self) -> bool {
        matches!(
            self,
            BlockKind::BulletedList | BlockKind::NumberedList | BlockKind::Rule | BlockKind::Condition
        )
    }

    pub fn is_list(self) -> bool {
        matches!(self, BlockKind::BulletedList | BlockKind::NumberedList)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::HeadingOne => "heading-one",
            BlockKind::HeadingTwo => "heading-two",
            BlockKind::ListItem => "list-item",
            BlockKind::BulletedList => "bulleted-list",
            BlockKind::NumberedList => "numbered-list",
            BlockKind::Code => "code",
            BlockKind::Rule => "rule",
            BlockKind::Condition => "condition",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inline node types. `Link` is the legacy alias of `Hyperlink`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InlineKind {
    Hyperlink,
    Link,
    Image,
    Attribute,
}

impl InlineKind {
    /// Void inlines carry no children.
    pub fn is_void(self) -> bool {
        matches!(self, InlineKind::Image)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            InlineKind::Hyperlink => "hyperlink",
            InlineKind::Link => "link",
            InlineKind::Image => "image",
            InlineKind::Attribute => "attribute",
        }
    }
}

impl fmt::Display for InlineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkKind {
    Bold,
    Italic,
    Underlined,
    Code,
    Color,
    FontFamily,
    Span,
}

/// Type discriminator shared by every node, used by schema rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Document,
    Block(BlockKind),
    Inline(InlineKind),
    Text,
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeType::Document => f.write_str("document"),
            NodeType::Block(kind) => kind.fmt(f),
            NodeType::Inline(kind) => kind.fmt(f),
            NodeType::Text => f.write_str("text"),
        }
    }
}

/// String-valued, type-specific fields of a node or mark.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Data(BTreeMap<String, String>);

impl Data {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder form of [`Data::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert only when a value is present.
    pub fn with_opt(mut self, key: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Data {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: MarkKind,
    #[serde(default, skip_serializing_if = "Data::is_empty")]
    pub data: Data,
}

impl Mark {
    pub fn new(kind: MarkKind) -> Self {
        Self { kind, data: Data::new() }
    }

    pub fn color(hex: impl Into<String>) -> Self {
        Self { kind: MarkKind::Color, data: Data::new().with(keys::HEX, hex) }
    }

    pub fn font(font: impl Into<String>) -> Self {
        Self { kind: MarkKind::FontFamily, data: Data::new().with(keys::FONT, font) }
    }

    pub fn span(style: impl Into<String>) -> Self {
        Self { kind: MarkKind::Span, data: Data::new().with(keys::STYLE, style) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "object", rename_all = "lowercase")]
pub enum Node {
    Block(Block),
    Inline(Inline),
    Text(Text),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Data::is_empty")]
    pub data: Data,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Block {
    pub fn new(kind: BlockKind) -> Self {
        Self { kind, data: Data::new(), nodes: Vec::new() }
    }

    pub fn with_nodes(kind: BlockKind, nodes: Vec<Node>) -> Self {
        Self { kind, data: Data::new(), nodes }
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    /// A text-holding block with a single plain text child.
    pub fn text_block(kind: BlockKind, text: impl Into<String>) -> Self {
        Self::with_nodes(kind, vec![Node::Text(Text::new(text))])
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::text_block(BlockKind::Paragraph, text)
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph("")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inline {
    #[serde(rename = "type")]
    pub kind: InlineKind,
    #[serde(default, skip_serializing_if = "Data::is_empty")]
    pub data: Data,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Inline {
    pub fn new(kind: InlineKind, data: Data) -> Self {
        Self { kind, data, nodes: Vec::new() }
    }

    pub fn with_nodes(kind: InlineKind, data: Data, nodes: Vec<Node>) -> Self {
        Self { kind, data, nodes }
    }

    /// Query parameters bound to a hyperlink, from either encoding.
    pub fn hyperlink_params(&self) -> Vec<(String, String)> {
        if let (Some(name), Some(value)) = (self.data.get(keys::PARAM_NAME), self.data.get(keys::PARAM_VALUE)) {
            return vec![(name.to_string(), value.to_string())];
        }
        self.data
            .get(keys::PARAMS)
            .map(parse_params)
            .unwrap_or_default()
    }
}

/// Decode a `?k=v&k2=v2` parameter list.
pub fn parse_params(encoded: &str) -> Vec<(String, String)> {
    encoded
        .trim_start_matches('?')
        .split(['&', '?'])
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((name, value)) => (name.to_string(), value.to_string()),
            None => (pair.to_string(), String::new()),
        })
        .collect()
}

/// Encode a parameter list as `?k=v&k2=v2`.
pub fn encode_params(params: &[(String, String)]) -> String {
    let pairs: Vec<String> = params
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    format!("?{}", pairs.join("&"))
}

/// A run of characters sharing one set of marks.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Text {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Text {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), marks: Vec::new() }
    }

    pub fn with_marks(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self { text: text.into(), marks }
    }

    /// Length in characters. Offsets throughout the editor count characters.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn has_mark(&self, kind: MarkKind) -> bool {
        self.marks.iter().any(|mark| mark.kind == kind)
    }

    pub fn insert(&mut self, offset: usize, text: &str) {
        let at = byte_offset(&self.text, offset);
        self.text.insert_str(at, text);
    }

    /// Remove `len` characters starting at `offset`, returning them.
    pub fn remove(&mut self, offset: usize, len: usize) -> String {
        let start = byte_offset(&self.text, offset);
        let end = byte_offset(&self.text, offset + len);
        self.text.drain(start..end).collect()
    }

    /// Characters `offset..offset + len` without removing them.
    pub fn slice(&self, offset: usize, len: usize) -> String {
        self.text.chars().skip(offset).take(len).collect()
    }

    pub fn split_off(&mut self, offset: usize) -> String {
        let at = byte_offset(&self.text, offset);
        self.text.split_off(at)
    }
}

fn byte_offset(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(Text::new(text))
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Block(block) => NodeType::Block(block.kind),
            Node::Inline(inline) => NodeType::Inline(inline.kind),
            Node::Text(_) => NodeType::Text,
        }
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Block(block) => Some(&block.nodes),
            Node::Inline(inline) => Some(&inline.nodes),
            Node::Text(_) => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Block(block) => Some(&mut block.nodes),
            Node::Inline(inline) => Some(&mut inline.nodes),
            Node::Text(_) => None,
        }
    }

    pub fn data(&self) -> Option<&Data> {
        match self {
            Node::Block(block) => Some(&block.data),
            Node::Inline(inline) => Some(&inline.data),
            Node::Text(_) => None,
        }
    }

    pub fn as_block(&self) -> Option<&Block> {
        match self {
            Node::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn as_inline(&self) -> Option<&Inline> {
        match self {
            Node::Inline(inline) => Some(inline),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&Text> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text_mut(&mut self) -> Option<&mut Text> {
        match self {
            Node::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_block(&self) -> bool {
        matches!(self, Node::Block(_))
    }

    pub fn is_inline(&self) -> bool {
        matches!(self, Node::Inline(_))
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Node::Text(_))
    }

    pub fn block_kind(&self) -> Option<BlockKind> {
        self.as_block().map(|block| block.kind)
    }

    /// Concatenated text of every descendant text node.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    /// Character length of the node's text content.
    pub fn text_len(&self) -> usize {
        match self {
            Node::Text(text) => text.len(),
            _ => self.children().unwrap_or(&[]).iter().map(Node::text_len).sum(),
        }
    }

    /// Structural size used by split/merge: characters for text, children otherwise.
    pub fn length(&self) -> usize {
        match self {
            Node::Text(text) => text.len(),
            _ => self.children().map(<[Node]>::len).unwrap_or(0),
        }
    }
}

fn collect_text(node: &Node, out: &mut String) {
    match node {
        Node::Text(text) => out.push_str(&text.text),
        _ => {
            for child in node.children().unwrap_or(&[]) {
                collect_text(child, out);
            }
        }
    }
}

impl From<Block> for Node {
    fn from(block: Block) -> Self {
        Node::Block(block)
    }
}

impl From<Inline> for Node {
    fn from(inline: Inline) -> Self {
        Node::Inline(inline)
    }
}

impl From<Text> for Node {
    fn from(text: Text) -> Self {
        Node::Text(text)
    }
}

/// Root of the tree.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Document {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// The initial editor value: one empty paragraph.
    pub fn empty() -> Self {
        Self::new(vec![Block::empty_paragraph().into()])
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.nodes.get(*first)?;
        for index in rest {
            node = node.children()?.get(*index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &Path) -> Option<&mut Node> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.nodes.get_mut(*first)?;
        for index in rest {
            node = node.children_mut()?.get_mut(*index)?;
        }
        Some(node)
    }

    /// Children of the node at `path`; the root path yields the top-level nodes.
    pub fn children(&self, path: &Path) -> Option<&[Node]> {
        if path.is_root() {
            return Some(&self.nodes);
        }
        self.node(path)?.children()
    }

    pub fn children_mut(&mut self, path: &Path) -> Option<&mut Vec<Node>> {
        if path.is_root() {
            return Some(&mut self.nodes);
        }
        self.node_mut(path)?.children_mut()
    }

    pub fn node_type(&self, path: &Path) -> Option<NodeType> {
        if path.is_root() {
            return Some(NodeType::Document);
        }
        self.node(path).map(Node::node_type)
    }

    pub fn block_kind(&self, path: &Path) -> Option<BlockKind> {
        self.node(path).and_then(Node::block_kind)
    }

    /// Every node in document order, paired with its path.
    pub fn descendants(&self) -> Vec<(Path, &Node)> {
        let mut out = Vec::new();
        walk(&self.nodes, &Path::root(), &mut out);
        out
    }

    /// Paths of every text node in document order.
    pub fn text_paths(&self) -> Vec<Path> {
        self.descendants()
            .into_iter()
            .filter(|(_, node)| node.is_text())
            .map(|(path, _)| path)
            .collect()
    }

    /// Paths of blocks that contain no other blocks, in document order.
    pub fn leaf_block_paths(&self) -> Vec<Path> {
        self.descendants()
            .into_iter()
            .filter(|(_, node)| match node {
                Node::Block(block) => !block.nodes.iter().any(Node::is_block),
                _ => false,
            })
            .map(|(path, _)| path)
            .collect()
    }

    /// Nearest block at or above `path`.
    pub fn closest_block(&self, path: &Path) -> Option<Path> {
        let mut current = path.clone();
        loop {
            if current.is_root() {
                return None;
            }
            if self.node(&current)?.is_block() {
                return Some(current);
            }
            current = current.parent()?;
        }
    }

    /// Nearest ancestor (excluding `path` itself) that is a block of `kind`.
    pub fn closest_ancestor_of_kind(&self, path: &Path, kind: BlockKind) -> Option<Path> {
        let mut current = path.parent()?;
        while !current.is_root() {
            if self.block_kind(&current) == Some(kind) {
                return Some(current);
            }
            current = current.parent()?;
        }
        None
    }

    /// First and last text path under `path` (or under the root).
    pub fn first_text(&self, path: &Path) -> Option<Path> {
        self.text_paths().into_iter().find(|text| text.starts_with(path))
    }

    pub fn last_text(&self, path: &Path) -> Option<Path> {
        self.text_paths().into_iter().rev().find(|text| text.starts_with(path))
    }

    /// Plain text of the whole document, one line per leaf block.
    pub fn plain_text(&self) -> String {
        self.leaf_block_paths()
            .iter()
            .filter_map(|path| self.node(path))
            .map(Node::text_content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn walk<'a>(nodes: &'a [Node], parent: &Path, out: &mut Vec<(Path, &'a Node)>) {
    for (index, node) in nodes.iter().enumerate() {
        let path = parent.child(index);
        out.push((path.clone(), node));
        if let Some(children) = node.children() {
            walk(children, &path, out);
        }
    }
}
