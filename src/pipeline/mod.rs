//! Matching driver: evaluates a rule set over every primitive of a data set.

use rayon::prelude::*;
use serde::Serialize;

use crate::mapcss::{Context, Mode};
use crate::model::{DataSet, ElementKind, Primitive};
use crate::rules::{LinkRule, Rule, RuleSet};

/// One rule that matched a primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleMatch {
    pub rule: String,
    /// Ids of the parent relations that satisfied the rule's link part.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<i64>,
}

/// All rules matching one primitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    #[serde(rename = "type")]
    pub kind: ElementKind,
    pub id: i64,
    pub matches: Vec<RuleMatch>,
}

/// Match `rule` against `element`.
///
/// Returns the context the rule matched in: for link rules it carries the
/// parent relations that satisfied the link as matching referrers.
pub fn match_element<'a>(
    rule: &Rule,
    element: &'a dyn Primitive,
    dataset: &'a DataSet,
) -> Option<Context<'a>> {
    let ctx = Context::for_subject(element);
    if !rule.applies(&ctx) {
        return None;
    }

    let Some(link) = &rule.link else {
        return Some(ctx);
    };

    let parents: Vec<&'a dyn Primitive> = dataset
        .parent_relations(element.member_ref())
        .map(|rel| rel as &dyn Primitive)
        .filter(|rel| link_matches(link, &ctx, *rel))
        .collect();

    if parents.is_empty() {
        None
    } else {
        Some(ctx.with_matching_referrers(parents))
    }
}

/// Parent conditions hold on `parent`, and at least one membership of the
/// subject in `parent` satisfies the link conditions.
fn link_matches<'a>(link: &LinkRule, ctx: &Context<'a>, parent: &'a dyn Primitive) -> bool {
    if !link.parent_applies(&Context::for_subject(parent)) {
        return false;
    }

    let Some(subject) = ctx.subject() else {
        return false;
    };
    let target = subject.member_ref();
    let link_ctx = ctx.with_parent(parent).with_mode(Mode::Link);

    parent
        .members()
        .iter()
        .enumerate()
        .filter(|(_, member)| member.member == target)
        .any(|(index, _)| link.link_applies(&link_ctx.with_index(index)))
}

/// Evaluate every rule against every primitive, in parallel.
///
/// Records come back in data set order (nodes, ways, relations) and only for
/// primitives matched by at least one rule.
pub fn match_dataset(rules: &RuleSet, dataset: &DataSet) -> Vec<MatchRecord> {
    let elements: Vec<&dyn Primitive> = dataset.primitives().collect();
    tracing::info!(
        "Matching {} rules against {} primitives",
        rules.len(),
        elements.len()
    );

    elements
        .par_iter()
        .filter_map(|element| {
            let matches: Vec<RuleMatch> = rules
                .iter()
                .filter_map(|rule| {
                    let ctx = match_element(rule, *element, dataset)?;
                    let parents = ctx
                        .matching_referrers()
                        .unwrap_or_default()
                        .iter()
                        .map(|p| p.id())
                        .collect();
                    Some(RuleMatch {
                        rule: rule.name.clone(),
                        parents,
                    })
                })
                .collect();

            if matches.is_empty() {
                None
            } else {
                Some(MatchRecord {
                    kind: element.kind(),
                    id: element.id(),
                    matches,
                })
            }
        })
        .collect()
}
