//! Evaluation context for conditions.

use std::fmt;
use std::sync::Arc;

use crate::model::{ElementKind, Primitive};

/// Where a condition is evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Plain selector on a primitive, e.g. `way[highway=residential]`.
    #[default]
    Entity,
    /// Link between a relation and one of its members, e.g.
    /// `relation >[role=outer] way`.
    Link,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Entity => write!(f, "entity"),
            Mode::Link => write!(f, "link"),
        }
    }
}

/// The primitive being matched plus, in link mode, the parent relation and
/// the member position linking the two.
///
/// Contexts are values: every `with_*` call returns a new context and leaves
/// the receiver untouched.
#[derive(Debug, Clone, Default)]
pub struct Context<'a> {
    subject: Option<&'a dyn Primitive>,
    parent: Option<&'a dyn Primitive>,
    index: Option<usize>,
    mode: Mode,
    matching_referrers: Option<Arc<[&'a dyn Primitive]>>,
}

impl<'a> Context<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_subject(subject: &'a dyn Primitive) -> Self {
        Self {
            subject: Some(subject),
            ..Self::default()
        }
    }

    pub fn with_subject(&self, subject: &'a dyn Primitive) -> Self {
        Self {
            subject: Some(subject),
            ..self.clone()
        }
    }

    pub fn with_parent(&self, parent: &'a dyn Primitive) -> Self {
        Self {
            parent: Some(parent),
            ..self.clone()
        }
    }

    pub fn with_index(&self, index: usize) -> Self {
        Self {
            index: Some(index),
            ..self.clone()
        }
    }

    /// `None` resets the mode to [`Mode::Entity`].
    pub fn with_mode(&self, mode: impl Into<Option<Mode>>) -> Self {
        Self {
            mode: mode.into().unwrap_or_default(),
            ..self.clone()
        }
    }

    /// Parents that satisfied a link rule for the current subject.
    pub fn with_matching_referrers(&self, referrers: Vec<&'a dyn Primitive>) -> Self {
        Self {
            matching_referrers: Some(referrers.into()),
            ..self.clone()
        }
    }

    pub fn without_matching_referrers(&self) -> Self {
        Self {
            matching_referrers: None,
            ..self.clone()
        }
    }

    pub fn subject(&self) -> Option<&'a dyn Primitive> {
        self.subject
    }

    pub fn parent(&self) -> Option<&'a dyn Primitive> {
        self.parent
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_link(&self) -> bool {
        self.mode == Mode::Link
    }

    pub fn matching_referrers(&self) -> Option<&[&'a dyn Primitive]> {
        self.matching_referrers.as_deref()
    }

    pub fn has_relation_parent(&self) -> bool {
        self.parent.is_some_and(|p| p.kind() == ElementKind::Relation)
    }

    /// Role of the membership at `index` in the parent relation.
    ///
    /// `None` if there is no relation parent, no index, or the index is past
    /// the end of the member list.
    pub fn member_role(&self) -> Option<&'a str> {
        let parent = self.parent.filter(|p| p.kind() == ElementKind::Relation)?;
        let member = parent.members().get(self.index?)?;
        Some(member.role.as_str())
    }
}
