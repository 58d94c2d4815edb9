//! Rule compilation and evaluation.

use anyhow::{Context as _, Result, anyhow};
use std::path::Path;

use crate::config::{ClauseConfig, InvalidRulePolicy, LinkConfig, RuleConfig, StyleConfig};
use crate::mapcss::{Condition, Context, Mode, Op};

/// A compiled rule: a conjunction of conditions on the matched primitive,
/// optionally reached through a relation membership.
#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub conditions: Vec<Condition>,
    pub link: Option<LinkRule>,
}

/// Conditions on the parent relation and on the membership linking it to the
/// matched primitive.
#[derive(Debug, Clone, Default)]
pub struct LinkRule {
    pub parent: Vec<Condition>,
    pub conditions: Vec<Condition>,
}

impl Rule {
    pub fn compile(config: &RuleConfig) -> Result<Self> {
        let conditions = compile_clauses(&config.name, "", &config.conditions, Mode::Entity)?;
        let link = config
            .link
            .as_ref()
            .map(|link| LinkRule::compile(&config.name, link))
            .transpose()?;

        Ok(Rule {
            name: config.name.clone(),
            conditions,
            link,
        })
    }

    /// True if every condition on the subject holds.
    pub fn applies(&self, ctx: &Context<'_>) -> bool {
        all_apply(&self.conditions, ctx)
    }
}

impl LinkRule {
    fn compile(rule: &str, config: &LinkConfig) -> Result<Self> {
        Ok(LinkRule {
            parent: compile_clauses(rule, "link.parent ", &config.parent, Mode::Entity)?,
            conditions: compile_clauses(rule, "link.conditions ", &config.conditions, Mode::Link)?,
        })
    }

    pub fn parent_applies(&self, ctx: &Context<'_>) -> bool {
        all_apply(&self.parent, ctx)
    }

    pub fn link_applies(&self, ctx: &Context<'_>) -> bool {
        all_apply(&self.conditions, ctx)
    }
}

fn all_apply(conditions: &[Condition], ctx: &Context<'_>) -> bool {
    conditions.iter().all(|c| c.applies(ctx))
}

fn compile_clauses(
    rule: &str,
    section: &str,
    clauses: &[ClauseConfig],
    mode: Mode,
) -> Result<Vec<Condition>> {
    clauses
        .iter()
        .enumerate()
        .map(|(i, clause)| {
            compile_clause(clause, mode).map_err(|e| {
                anyhow!(
                    "Rules: Error in {}clause {} of rule '{}': {}",
                    section,
                    i + 1,
                    rule,
                    e
                )
            })
        })
        .collect()
}

/// Build one condition from its YAML form.
pub fn compile_clause(clause: &ClauseConfig, mode: Mode) -> Result<Condition> {
    let condition = match clause {
        ClauseConfig::KeyValue { key, op, value } => {
            let op: Op = op.parse().map_err(|e: String| anyhow!(e))?;
            Condition::key_value(key.as_str(), value.as_str(), op, mode)?
        }
        ClauseConfig::Key { key, not, yes } => Condition::key(key.as_str(), *not, *yes, mode)?,
        ClauseConfig::Pseudo { pseudo, not } => {
            let condition = Condition::pseudo_class(pseudo.as_str(), *not, mode);
            if let Condition::PseudoClass(pc) = &condition
                && !pc.class().is_known()
            {
                tracing::warn!(
                    "Rules: Unknown pseudo-class ':{}' matches every primitive",
                    pseudo
                );
            }
            condition
        }
        ClauseConfig::Expr { expr } => Condition::expression(expr, mode)?,
    };
    Ok(condition)
}

/// All rules of a style, in file order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
    skipped: Vec<String>,
}

impl RuleSet {
    pub fn compile(config: &StyleConfig) -> Result<Self> {
        let mut rules = Vec::with_capacity(config.rules.len());
        let mut skipped = Vec::new();

        for rule in &config.rules {
            match Rule::compile(rule) {
                Ok(compiled) => rules.push(compiled),
                Err(e) => match config.on_invalid {
                    InvalidRulePolicy::Abort => return Err(e),
                    InvalidRulePolicy::Skip => {
                        tracing::warn!("{}; skipping rule", e);
                        skipped.push(rule.name.clone());
                    }
                },
            }
        }

        tracing::info!(
            "Rules: {} compiled, {} skipped",
            rules.len(),
            skipped.len()
        );
        Ok(RuleSet { rules, skipped })
    }

    /// Load and compile a style file. `policy` overrides the file's
    /// `on_invalid` setting.
    pub fn load(path: &Path, policy: Option<InvalidRulePolicy>) -> Result<Self> {
        let mut config = StyleConfig::load(path)
            .with_context(|| format!("Config: Failed to load style {:?}", path))?;
        if let Some(policy) = policy {
            config.on_invalid = policy;
        }
        Self::compile(&config)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Names of rules dropped under [`InvalidRulePolicy::Skip`].
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Tags, Way};

    fn tags(pairs: &[(&str, &str)]) -> Tags {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn kv(key: &str, op: &str, value: &str) -> ClauseConfig {
        ClauseConfig::KeyValue {
            key: key.into(),
            op: op.into(),
            value: value.into(),
        }
    }

    fn style(on_invalid: InvalidRulePolicy) -> StyleConfig {
        StyleConfig {
            on_invalid,
            rules: vec![
                RuleConfig {
                    name: "wide_roads".into(),
                    conditions: vec![kv("highway", "=", "primary"), kv("lanes", ">=", "2")],
                    link: None,
                },
                RuleConfig {
                    name: "broken".into(),
                    conditions: vec![kv("lanes", ">", "many")],
                    link: None,
                },
                RuleConfig {
                    name: "outer".into(),
                    conditions: vec![],
                    link: Some(LinkConfig {
                        parent: vec![kv("type", "=", "multipolygon")],
                        conditions: vec![kv("role", "=", "outer")],
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_abort_policy_fails_load() {
        let err = RuleSet::compile(&style(InvalidRulePolicy::Abort)).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("broken"), "{message}");
        assert!(message.contains("clause 1"), "{message}");
    }

    #[test]
    fn test_skip_policy_drops_only_bad_rule() {
        let rules = RuleSet::compile(&style(InvalidRulePolicy::Skip)).unwrap();
        let names: Vec<&str> = rules.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["wide_roads", "outer"]);
        assert_eq!(rules.skipped(), ["broken".to_string()]);
    }

    #[test]
    fn test_link_clauses_built_in_link_mode() {
        let rules = RuleSet::compile(&style(InvalidRulePolicy::Skip)).unwrap();
        let link = rules.rules()[1].link.as_ref().unwrap();
        assert_eq!(link.parent[0].mode(), Mode::Entity);
        assert_eq!(link.conditions[0].mode(), Mode::Link);
    }

    #[test]
    fn test_link_clause_with_tag_key_rejected() {
        let config = RuleConfig {
            name: "bad_link".into(),
            conditions: vec![],
            link: Some(LinkConfig {
                parent: vec![],
                conditions: vec![kv("highway", "=", "primary")],
            }),
        };
        let err = Rule::compile(&config).unwrap_err();
        assert!(err.to_string().contains("link.conditions clause 1"));
    }

    #[test]
    fn test_unknown_operator_rejected() {
        assert!(compile_clause(&kv("a", "~~", "b"), Mode::Entity).is_err());
    }

    #[test]
    fn test_rule_is_conjunction() {
        let rules = RuleSet::compile(&style(InvalidRulePolicy::Skip)).unwrap();
        let rule = &rules.rules()[0];

        let wide = Way {
            id: 1,
            tags: tags(&[("highway", "primary"), ("lanes", "4")]),
            ..Default::default()
        };
        let narrow = Way {
            id: 2,
            tags: tags(&[("highway", "primary"), ("lanes", "1")]),
            ..Default::default()
        };
        assert!(rule.applies(&Context::for_subject(&wide)));
        assert!(!rule.applies(&Context::for_subject(&narrow)));
    }
}
