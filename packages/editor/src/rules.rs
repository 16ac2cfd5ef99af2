//! Rules and condition branches.
//!
//! Rule definitions come from the rules engine; the document only stores
//! their ids. Branch labels are derived from the definitions on demand and
//! never written back, except for the catch-all branch's literal "else".

use crate::errors::{EditorError, OpResult, OperationError};
use crate::schema::{is_catch_all, CATCH_ALL_LABEL};
use crate::transaction::Transaction;
use ontask_document::{keys, Block, BlockKind, Data, Document, Node, Path};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::path::Path as FsPath;
use tracing::debug;

pub const MISSING_RULE: &str = "MISSING_RULE";
pub const MISSING_CONDITION: &str = "MISSING_CONDITION";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub rule_id: String,
    /// Condition id of the catch-all branch
    #[serde(default)]
    pub catch_all: String,
    #[serde(default)]
    pub parameters: Vec<String>,
    #[serde(default)]
    pub conditions: Vec<RuleCondition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleCondition {
    pub condition_id: String,
    /// One formula per rule parameter, by index
    #[serde(default)]
    pub formulas: Vec<Formula>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Formula {
    pub operator: String,
    #[serde(default)]
    pub comparator: JsonValue,
    #[serde(default)]
    pub range_from: JsonValue,
    #[serde(default)]
    pub range_to: JsonValue,
}

/// What the rules engine supplies for a session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleContext {
    #[serde(default)]
    pub rules: Vec<Rule>,
    /// Parameter name → field type
    #[serde(default)]
    pub types: BTreeMap<String, String>,
    /// Branch colours, indexed like `rules`
    #[serde(default)]
    pub colours: Vec<String>,
}

impl RuleContext {
    pub fn from_json(json: &str) -> Result<Self, EditorError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &FsPath) -> Result<Self, EditorError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn rule(&self, rule_id: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.rule_id == rule_id)
    }

    /// Colour of the branches of `rule_id`.
    pub fn colour(&self, rule_id: &str) -> Option<&str> {
        let index = self.rules.iter().position(|rule| rule.rule_id == rule_id)?;
        self.colours.get(index).map(String::as_str)
    }

    fn is_date(&self, parameter: &str) -> bool {
        self.types.get(parameter).map(String::as_str) == Some("date")
    }
}

/// Human-readable label of a condition branch, e.g. `age > 18, city = Sydney`.
pub fn generate_label(rule_id: &str, condition_id: &str, context: &RuleContext) -> String {
    let Some(rule) = context.rule(rule_id) else {
        return MISSING_RULE.to_string();
    };
    if !rule.catch_all.is_empty() && rule.catch_all == condition_id {
        return CATCH_ALL_LABEL.to_string();
    }
    let Some(condition) = rule.conditions.iter().find(|condition| condition.condition_id == condition_id) else {
        return MISSING_CONDITION.to_string();
    };

    let mut clauses = Vec::new();
    for (index, parameter) in rule.parameters.iter().enumerate() {
        let Some(formula) = condition.formulas.get(index) else {
            continue;
        };
        let is_date = context.is_date(parameter);
        if formula.operator == "between" {
            clauses.push(format!("{} >= {}", parameter, render_value(&formula.range_from, is_date)));
            clauses.push(format!("{} <= {}", parameter, render_value(&formula.range_to, is_date)));
        } else if is_present(&formula.comparator) {
            clauses.push(format!(
                "{} {} {}",
                parameter,
                operator_alias(&formula.operator),
                render_value(&formula.comparator, is_date)
            ));
        } else {
            clauses.push(format!("{} {}", parameter, formula.operator));
        }
    }
    clauses.join(", ")
}

fn operator_alias(operator: &str) -> &str {
    match operator {
        "==" => "=",
        other => other,
    }
}

/// JavaScript truthiness.
fn is_present(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(flag) => *flag,
        JsonValue::Number(number) => number.as_f64().map(|n| n != 0.0 && !n.is_nan()).unwrap_or(true),
        JsonValue::String(text) => !text.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Dates keep their first ten characters (`YYYY-MM-DD`).
fn render_value(value: &JsonValue, is_date: bool) -> String {
    match value {
        JsonValue::String(text) if is_date => text.chars().take(10).collect(),
        JsonValue::String(text) => text.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Display data for a condition branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionHeading {
    pub label: String,
    pub colour: Option<String>,
    pub catch_all: bool,
}

/// Heading of a condition node; `None` for any other node.
pub fn condition_heading(node: &Node, context: &RuleContext) -> Option<ConditionHeading> {
    if node.block_kind() != Some(BlockKind::Condition) {
        return None;
    }
    let data = node.data()?;
    let rule_id = data.get(keys::RULE_ID).unwrap_or("");
    let label = match data.get(keys::LABEL) {
        Some(label) => label.to_string(),
        None => generate_label(rule_id, data.get(keys::CONDITION_ID).unwrap_or(""), context),
    };
    let colour = match label.as_str() {
        MISSING_RULE | MISSING_CONDITION => None,
        _ => context.colour(rule_id).map(str::to_string),
    };
    Some(ConditionHeading { label, colour, catch_all: is_catch_all(node) })
}

/// Every condition branch in the document with its heading.
pub fn condition_headings(doc: &Document, context: &RuleContext) -> Vec<(Path, ConditionHeading)> {
    doc.descendants()
        .into_iter()
        .filter_map(|(path, node)| condition_heading(node, context).map(|heading| (path, heading)))
        .collect()
}

/// The block `insert_rule` inserts: one branch per condition plus the
/// catch-all, each holding an empty paragraph.
pub fn rule_block(rule: &Rule) -> Block {
    let branch = |data: Data| Block::with_nodes(BlockKind::Condition, vec![Block::empty_paragraph().into()]).with_data(data);

    let mut branches: Vec<Node> = rule
        .conditions
        .iter()
        .map(|condition| {
            Node::from(branch(
                Data::new()
                    .with(keys::CONDITION_ID, condition.condition_id.as_str())
                    .with(keys::RULE_ID, rule.rule_id.as_str()),
            ))
        })
        .collect();
    branches.push(
        branch(
            Data::new()
                .with(keys::LABEL, CATCH_ALL_LABEL)
                .with(keys::CONDITION_ID, rule.catch_all.as_str())
                .with(keys::RULE_ID, rule.rule_id.as_str()),
        )
        .into(),
    );

    Block::with_nodes(BlockKind::Rule, branches).with_data(Data::new().with(keys::RULE_ID, rule.rule_id.as_str()))
}

impl Transaction {
    /// Insert `rule` next to the cursor's block and put the cursor at its end.
    pub fn insert_rule(&mut self, rule: &Rule) -> OpResult<Path> {
        let path = self.insert_block(rule_block(rule))?;
        self.move_to_end_of_node(&path)?;
        debug!(rule_id = %rule.rule_id, at = %path, "Inserted rule");
        Ok(path)
    }

    /// Remove a condition branch. The catch-all branch is never removed;
    /// returns false when the removal was refused.
    pub fn remove_condition(&mut self, path: Path) -> OpResult<bool> {
        let node = self
            .document()
            .node(&path)
            .ok_or_else(|| OperationError::NodeNotFound(path.clone()))?;
        if node.block_kind() != Some(BlockKind::Condition) || is_catch_all(node) {
            return Ok(false);
        }
        self.remove_node(path)?;
        Ok(true)
    }
}
