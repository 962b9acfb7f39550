//! Rule vocabulary: `RuleId`, `Rule`, `RuleSet`.
//!
//! Rules are static configuration, defined at startup and never mutated.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ReviewError};

/// Stable rule identifier such as `G01`: an alphabetic prefix followed by digits.
///
/// Ordering is natural (`G2 < G10`); ties on the numeric value fall back to
/// the raw text so `G1` and `G01` stay distinct.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RuleId(String);

impl RuleId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn split(&self) -> (&str, &str) {
        let at = self.0.find(|c: char| c.is_ascii_digit()).unwrap_or(self.0.len());
        self.0.split_at(at)
    }

    fn numeric(&self) -> u64 {
        self.split().1.parse().unwrap_or(u64::MAX)
    }
}

impl Ord for RuleId {
    fn cmp(&self, other: &Self) -> Ordering {
        let (prefix_a, _) = self.split();
        let (prefix_b, _) = other.split();
        prefix_a
            .cmp(prefix_b)
            .then_with(|| self.numeric().cmp(&other.numeric()))
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for RuleId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for RuleId {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let at = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let (prefix, digits) = s.split_at(at);
        let valid = !prefix.is_empty()
            && prefix.chars().all(|c| c.is_ascii_alphabetic())
            && !digits.is_empty()
            && digits.len() <= 18
            && digits.chars().all(|c| c.is_ascii_digit());
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(ReviewError::InvalidRuleId(s.to_string()))
        }
    }
}

impl TryFrom<String> for RuleId {
    type Error = ReviewError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<RuleId> for String {
    fn from(id: RuleId) -> Self {
        id.0
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fixed, named review criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub title: String,
    pub description: String,
}

impl Rule {
    pub fn new(id: &str, title: &str, description: &str) -> Result<Self> {
        Ok(Self {
            id: id.parse()?,
            title: title.to_string(),
            description: description.to_string(),
        })
    }
}

/// Ordered, duplicate-free, non-empty set of rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rule: Vec<Rule>,
}

impl RuleSet {
    pub fn new(mut rules: Vec<Rule>) -> Result<Self> {
        if rules.is_empty() {
            return Err(ReviewError::InvalidRuleSet(
                "at least one rule is required".to_string(),
            ));
        }
        let mut seen = BTreeSet::new();
        for rule in &rules {
            if !seen.insert(rule.id.clone()) {
                return Err(ReviewError::InvalidRuleSet(format!(
                    "duplicate rule id {}",
                    rule.id
                )));
            }
        }
        rules.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(Self { rules })
    }

    /// Parse `[[rule]]` tables with `id`, `title` and `description`.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let file: RuleFile = toml::from_str(source)?;
        Self::new(file.rule)
    }

    /// The ten Java review guidelines G01..G10.
    pub fn java_guidelines() -> Self {
        const GUIDES: [(&str, &str, &str); 10] = [
            (
                "G01",
                "Follow Java code conventions",
                "Naming, package, constants style, visibility and formatting.",
            ),
            (
                "G02",
                "Prefer streams/lambdas for simple transformations",
                "Replace simple loops with streams when safe.",
            ),
            (
                "G03",
                "Null-safety / avoid NPE",
                "Find potential NPEs and add minimal null-safety.",
            ),
            (
                "G04",
                "Defensive copies / don't expose mutables",
                "Return defensive copies or unmodifiable wrappers for internal state.",
            ),
            (
                "G05",
                "Handle exceptions properly",
                "Avoid overly broad catches; catch specific exceptions; don't swallow.",
            ),
            (
                "G06",
                "Choose appropriate data structures",
                "Prefer modern collections and interfaces over legacy types.",
            ),
            (
                "G07",
                "Minimize visibility / encapsulate",
                "Avoid public mutable fields; prefer private with accessors.",
            ),
            (
                "G08",
                "Code to interfaces",
                "Expose interfaces (List) in signatures rather than concretes (ArrayList).",
            ),
            (
                "G09",
                "Avoid unnecessary interfaces",
                "Detect trivial interfaces that add noise rather than value.",
            ),
            (
                "G10",
                "Override hashCode when overriding equals",
                "Ensure equals/hashCode contract is satisfied.",
            ),
        ];

        let rules = GUIDES
            .iter()
            .map(|(id, title, description)| Rule {
                id: RuleId(id.to_string()),
                title: title.to_string(),
                description: description.to_string(),
            })
            .collect();
        Self { rules }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// Rule ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = &RuleId> {
        self.rules.iter().map(|r| &r.id)
    }

    pub fn get(&self, id: &RuleId) -> Option<&Rule> {
        self.rules.iter().find(|r| &r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::java_guidelines()
    }
}
