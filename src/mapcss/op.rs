//! Key/value comparison operators.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Eq,
    Neq,
    Regex,
    OneOf,
    BeginsWith,
    EndsWith,
    Contains,
    GreaterOrEqual,
    Greater,
    LessOrEqual,
    Less,
}

impl Op {
    pub const COMPARISON: [Op; 4] = [
        Op::GreaterOrEqual,
        Op::Greater,
        Op::LessOrEqual,
        Op::Less,
    ];

    /// Numeric ordering operators; their literal must parse as a number.
    pub fn is_comparison(&self) -> bool {
        Self::COMPARISON.contains(self)
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Neq => "!=",
            Op::Regex => "=~",
            Op::OneOf => "~=",
            Op::BeginsWith => "^=",
            Op::EndsWith => "$=",
            Op::Contains => "*=",
            Op::GreaterOrEqual => ">=",
            Op::Greater => ">",
            Op::LessOrEqual => "<=",
            Op::Less => "<",
        }
    }
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Op {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let op = match value.trim().to_ascii_lowercase().as_str() {
            "=" | "eq" => Op::Eq,
            "!=" | "neq" => Op::Neq,
            "=~" | "regex" => Op::Regex,
            "~=" | "one_of" => Op::OneOf,
            "^=" | "begins_with" => Op::BeginsWith,
            "$=" | "ends_with" => Op::EndsWith,
            "*=" | "contains" => Op::Contains,
            ">=" | "greater_or_equal" => Op::GreaterOrEqual,
            ">" | "greater" => Op::Greater,
            "<=" | "less_or_equal" => Op::LessOrEqual,
            "<" | "less" => Op::Less,
            _ => return Err(format!("invalid operator: {value}")),
        };
        Ok(op)
    }
}
