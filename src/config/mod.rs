use serde::{Deserialize, Deserializer, Serialize};
use std::path::Path;
use std::str::FromStr;

/// A style file: an ordered list of rules.
///
/// ```yaml
/// on_invalid: skip
/// rules:
///   - name: outer_ring
///     conditions:
///       - { key: building }
///     link:
///       parent:
///         - { key: type, op: "=", value: multipolygon }
///       conditions:
///         - { key: role, op: "=", value: outer }
/// ```
#[derive(Debug, Deserialize, Serialize)]
pub struct StyleConfig {
    #[serde(default)]
    pub on_invalid: InvalidRulePolicy,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl StyleConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

/// What the loader does with a rule containing an invalid condition.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InvalidRulePolicy {
    /// Drop the rule, log a warning, keep loading.
    Skip,
    /// Fail the whole style.
    #[default]
    Abort,
}

impl FromStr for InvalidRulePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "skip" => Ok(InvalidRulePolicy::Skip),
            "abort" => Ok(InvalidRulePolicy::Abort),
            _ => Err(format!("invalid on_invalid policy: {value}")),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RuleConfig {
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<ClauseConfig>,
    #[serde(default)]
    pub link: Option<LinkConfig>,
}

/// `parent >[conditions] child`: the rule's own conditions apply to the child.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct LinkConfig {
    #[serde(default)]
    pub parent: Vec<ClauseConfig>,
    #[serde(default)]
    pub conditions: Vec<ClauseConfig>,
}

/// One atomic selector clause.
///
/// Variants are told apart by their fields; a clause with a field its shape
/// does not know is rejected rather than read as a different clause.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged, deny_unknown_fields)]
pub enum ClauseConfig {
    KeyValue {
        key: String,
        op: String,
        #[serde(deserialize_with = "scalar_string")]
        value: String,
    },
    Key {
        key: String,
        #[serde(default)]
        not: bool,
        #[serde(default)]
        yes: bool,
    },
    Pseudo {
        pseudo: String,
        #[serde(default)]
        not: bool,
    },
    Expr {
        expr: String,
    },
}

/// Any YAML scalar, so `value: 4` and `value: "4"` read the same.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Scalar::deserialize(deserializer)? {
        Scalar::Text(text) => text,
        Scalar::Integer(n) => n.to_string(),
        Scalar::Float(x) => x.to_string(),
        Scalar::Bool(b) => b.to_string(),
    })
}
