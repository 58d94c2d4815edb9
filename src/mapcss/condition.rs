//! Atomic selector conditions.
//!
//! Each variant is validated when it is built and is immutable afterwards, so
//! a compiled condition can be shared across matching threads. Evaluation via
//! [`Condition::applies`] never fails: missing or malformed data resolves to a
//! plain `false` (or `true` for `!=` against an absent value).

use regex::Regex;
use std::fmt;

use super::context::{Context, Mode};
use super::error::{ConditionError, Result};
use super::op::Op;
use crate::expr::{CelContext, CelProgram, coerce_bool, compile_cel, evaluate_cel};
use crate::model::ElementKind;
use crate::utils::{is_true, parse_float};

#[derive(Debug, Clone)]
pub enum Condition {
    KeyValue(KeyValueCondition),
    Key(KeyCondition),
    PseudoClass(PseudoClassCondition),
    Expression(ExpressionCondition),
}

impl Condition {
    pub fn key_value(
        key: impl Into<String>,
        value: impl Into<String>,
        op: Op,
        mode: Mode,
    ) -> Result<Self> {
        KeyValueCondition::new(key, value, op, mode).map(Condition::KeyValue)
    }

    pub fn key(
        label: impl Into<String>,
        negate: bool,
        require_truthy: bool,
        mode: Mode,
    ) -> Result<Self> {
        KeyCondition::new(label, negate, require_truthy, mode).map(Condition::Key)
    }

    pub fn pseudo_class(id: impl Into<String>, negate: bool, mode: Mode) -> Self {
        Condition::PseudoClass(PseudoClassCondition::new(id, negate, mode))
    }

    pub fn expression(source: &str, mode: Mode) -> Result<Self> {
        ExpressionCondition::new(source, mode).map(Condition::Expression)
    }

    pub fn applies(&self, ctx: &Context<'_>) -> bool {
        match self {
            Condition::KeyValue(c) => c.applies(ctx),
            Condition::Key(c) => c.applies(ctx),
            Condition::PseudoClass(c) => c.applies(ctx),
            Condition::Expression(c) => c.applies(ctx),
        }
    }

    /// The mode this condition was built for.
    pub fn mode(&self) -> Mode {
        match self {
            Condition::KeyValue(c) => c.mode,
            Condition::Key(c) => c.mode,
            Condition::PseudoClass(c) => c.mode,
            Condition::Expression(c) => c.mode,
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::KeyValue(c) => fmt::Display::fmt(c, f),
            Condition::Key(c) => fmt::Display::fmt(c, f),
            Condition::PseudoClass(c) => fmt::Display::fmt(c, f),
            Condition::Expression(c) => fmt::Display::fmt(c, f),
        }
    }
}

/// What a key/value condition reads in a link context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkTarget {
    Role,
    Index,
}

impl LinkTarget {
    fn for_key(key: &str) -> Option<Self> {
        if key.eq_ignore_ascii_case("role") {
            Some(LinkTarget::Role)
        } else if key.eq_ignore_ascii_case("index") {
            Some(LinkTarget::Index)
        } else {
            None
        }
    }
}

/// Literal prepared at construction time.
#[derive(Debug, Clone)]
enum Literal {
    Text,
    Number(f64),
    Pattern(Regex),
}

/// `[key op value]`: compares a tag (or, in a link context, the member role
/// or 1-based member index) against a literal.
///
/// The context's mode decides what is read. Keys other than `role` and
/// `index` never match in a link context.
#[derive(Debug, Clone)]
pub struct KeyValueCondition {
    key: String,
    value: String,
    op: Op,
    mode: Mode,
    link_target: Option<LinkTarget>,
    literal: Literal,
}

impl KeyValueCondition {
    pub fn new(
        key: impl Into<String>,
        value: impl Into<String>,
        op: Op,
        mode: Mode,
    ) -> Result<Self> {
        let key = key.into();
        let value = value.into();

        let literal = if op.is_comparison() {
            let number =
                parse_float(&value).ok_or_else(|| ConditionError::NonNumericLiteral {
                    key: key.clone(),
                    op,
                    literal: value.clone(),
                })?;
            Literal::Number(number)
        } else if op == Op::Regex {
            let pattern = Regex::new(&value).map_err(|e| ConditionError::InvalidRegex {
                key: key.clone(),
                pattern: value.clone(),
                message: e.to_string(),
            })?;
            Literal::Pattern(pattern)
        } else {
            Literal::Text
        };

        let link_target = LinkTarget::for_key(&key);
        if mode == Mode::Link && link_target.is_none() {
            return Err(ConditionError::UnsupportedLinkKey { key });
        }

        Ok(Self {
            key,
            value,
            op,
            mode,
            link_target,
            literal,
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn op(&self) -> Op {
        self.op
    }

    pub fn applies(&self, ctx: &Context<'_>) -> bool {
        match (ctx.mode(), self.link_target) {
            (Mode::Entity, _) => {
                self.matches_value(ctx.subject().and_then(|s| s.get(&self.key)))
            }
            (Mode::Link, None) => false,
            (Mode::Link, Some(LinkTarget::Role)) => {
                if !ctx.has_relation_parent() {
                    return false;
                }
                match ctx.member_role() {
                    Some(role) => self.matches_value(Some(role)),
                    None => false,
                }
            }
            (Mode::Link, Some(LinkTarget::Index)) => match ctx.index() {
                Some(index) => self.matches_value(Some((index + 1).to_string().as_str())),
                None => false,
            },
        }
    }

    fn matches_value(&self, value: Option<&str>) -> bool {
        // An absent value counts as "not equal" and fails everything else.
        let Some(value) = value else {
            return self.op == Op::Neq;
        };

        match self.op {
            Op::Eq => value == self.value,
            Op::Neq => value != self.value,
            Op::Regex => match &self.literal {
                Literal::Pattern(pattern) => pattern.is_match(value),
                _ => false,
            },
            Op::OneOf => list_parts(value).any(|part| part.trim() == self.value),
            Op::BeginsWith => value.starts_with(&self.value),
            Op::EndsWith => value.ends_with(&self.value),
            Op::Contains => value.contains(&self.value),
            Op::GreaterOrEqual | Op::Greater | Op::LessOrEqual | Op::Less => {
                let Literal::Number(expected) = self.literal else {
                    return false;
                };
                match parse_float(value) {
                    Some(actual) => compare(self.op, actual, expected),
                    None => false,
                }
            }
        }
    }
}

/// `;`-separated parts, without trailing empty ones. A value with no
/// separator is a single part, even when empty.
fn list_parts(value: &str) -> impl Iterator<Item = &str> {
    let mut parts: Vec<&str> = value.split(';').collect();
    if parts.len() > 1 {
        while parts.last().is_some_and(|part| part.is_empty()) {
            parts.pop();
        }
    }
    parts.into_iter()
}

fn compare(op: Op, left: f64, right: f64) -> bool {
    match op {
        Op::GreaterOrEqual => left >= right,
        Op::Greater => left > right,
        Op::LessOrEqual => left <= right,
        Op::Less => left < right,
        _ => false,
    }
}

impl fmt::Display for KeyValueCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}{}{}]", self.key, self.op, self.value)
    }
}

/// `[key]`, `[!key]` and `[key?]`.
///
/// In a link context the label is compared against the member role instead:
/// `relation >[outer] way` holds when the way is an `outer` member. A truthy
/// test has no meaning there and never matches.
#[derive(Debug, Clone)]
pub struct KeyCondition {
    label: String,
    negate: bool,
    require_truthy: bool,
    mode: Mode,
}

impl KeyCondition {
    pub fn new(
        label: impl Into<String>,
        negate: bool,
        require_truthy: bool,
        mode: Mode,
    ) -> Result<Self> {
        let label = label.into();
        if mode == Mode::Link && require_truthy {
            return Err(ConditionError::TruthyTestInLink { key: label });
        }
        Ok(Self {
            label,
            negate,
            require_truthy,
            mode,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn applies(&self, ctx: &Context<'_>) -> bool {
        match ctx.mode() {
            Mode::Entity => {
                let subject = ctx.subject();
                let base = if self.require_truthy {
                    is_true(subject.and_then(|s| s.get(&self.label)))
                } else {
                    subject.is_some_and(|s| s.has_key(&self.label))
                };
                base ^ self.negate
            }
            Mode::Link => {
                if self.require_truthy || !ctx.has_relation_parent() {
                    return false;
                }
                match ctx.member_role() {
                    Some(role) => (role == self.label) ^ self.negate,
                    None => false,
                }
            }
        }
    }
}

impl fmt::Display for KeyCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bang = if self.negate { "!" } else { "" };
        let question = if self.require_truthy { "?" } else { "" };
        write!(f, "[{}{}{}]", bang, self.label, question)
    }
}

/// Built-in pseudo-classes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudoClass {
    Closed,
    Modified,
    New,
    Connection,
    Tagged,
    /// Unrecognized names always match.
    Other(String),
}

impl PseudoClass {
    pub fn name(&self) -> &str {
        match self {
            PseudoClass::Closed => "closed",
            PseudoClass::Modified => "modified",
            PseudoClass::New => "new",
            PseudoClass::Connection => "connection",
            PseudoClass::Tagged => "tagged",
            PseudoClass::Other(name) => name.as_str(),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "closed" => PseudoClass::Closed,
            "modified" => PseudoClass::Modified,
            "new" => PseudoClass::New,
            "connection" => PseudoClass::Connection,
            "tagged" => PseudoClass::Tagged,
            other => PseudoClass::Other(other.to_string()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, PseudoClass::Other(_))
    }
}

/// `:closed`, `:!tagged`, ...; always evaluated against the subject.
#[derive(Debug, Clone)]
pub struct PseudoClassCondition {
    class: PseudoClass,
    negate: bool,
    mode: Mode,
}

impl PseudoClassCondition {
    pub fn new(id: impl Into<String>, negate: bool, mode: Mode) -> Self {
        let id = id.into();
        let class = PseudoClass::from_name(&id);
        if !class.is_known() {
            tracing::debug!("Pseudo-class ':{}' is not built in; it always matches", id);
        }
        Self {
            class,
            negate,
            mode,
        }
    }

    pub fn class(&self) -> &PseudoClass {
        &self.class
    }

    pub fn applies(&self, ctx: &Context<'_>) -> bool {
        self.base(ctx) ^ self.negate
    }

    fn base(&self, ctx: &Context<'_>) -> bool {
        if let PseudoClass::Other(_) = self.class {
            return true;
        }
        let Some(subject) = ctx.subject() else {
            return false;
        };
        match self.class {
            PseudoClass::Closed => match subject.kind() {
                ElementKind::Way => subject.is_closed(),
                ElementKind::Relation => subject.is_multipolygon(),
                ElementKind::Node => false,
            },
            PseudoClass::Modified => subject.is_modified() || subject.is_new_or_undeleted(),
            PseudoClass::New => subject.is_new(),
            PseudoClass::Connection => {
                subject.kind() == ElementKind::Node && subject.is_connection_node()
            }
            PseudoClass::Tagged => subject.is_tagged(),
            PseudoClass::Other(_) => true,
        }
    }
}

impl fmt::Display for PseudoClassCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bang = if self.negate { "!" } else { "" };
        write!(f, ":{}{}", bang, self.class.name())
    }
}

/// `[expr]`: a CEL expression; holds only when it evaluates to `true`.
#[derive(Debug, Clone)]
pub struct ExpressionCondition {
    program: CelProgram,
    mode: Mode,
}

impl ExpressionCondition {
    pub fn new(source: &str, mode: Mode) -> Result<Self> {
        let program = compile_cel(source).map_err(|e| ConditionError::InvalidExpression {
            source_text: source.to_string(),
            message: format!("{e:#}"),
        })?;
        Ok(Self::from_program(program, mode))
    }

    pub fn from_program(program: CelProgram, mode: Mode) -> Self {
        Self { program, mode }
    }

    pub fn applies(&self, ctx: &Context<'_>) -> bool {
        match evaluate_cel(&self.program, CelContext::from_context(ctx)) {
            Ok(value) => coerce_bool(&value),
            Err(e) => {
                tracing::trace!("Expression [{}] failed: {:#}", self.program.source(), e);
                false
            }
        }
    }
}

impl fmt::Display for ExpressionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.program.source())
    }
}
