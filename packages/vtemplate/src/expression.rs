//! Expression Model
//!
//! An expression is either literal text or a variable reference followed by
//! a chain of field and method accessors, e.g. `$#page.user.name.upper()`.

use std::fmt;

use smallvec::SmallVec;

use crate::chars;
use crate::error::RenderError;
use crate::reflect;
use crate::template::{VariableId, VariableStore};
use crate::value::Value;

/// Scope selector written before a variable name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopePrefix {
    /// `#name.` selects the nearest enclosing template called `name`.
    Named(String),
    /// `#.`, `##.` ... select the parent, grandparent ... template.
    Ancestor(usize),
}

impl fmt::Display for ScopePrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopePrefix::Named(name) => write!(f, "{}{}", chars::HASH, name),
            ScopePrefix::Ancestor(depth) => {
                for _ in 0..*depth {
                    write!(f, "{}", chars::HASH)?;
                }
                Ok(())
            }
        }
    }
}

/// One step of a member chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub name: String,
    pub is_method: bool,
}

impl Accessor {
    pub fn field(name: impl Into<String>) -> Self {
        Accessor {
            name: name.into(),
            is_method: false,
        }
    }

    pub fn method(name: impl Into<String>) -> Self {
        Accessor {
            name: name.into(),
            is_method: true,
        }
    }
}

pub type AccessorChain = SmallVec<[Accessor; 4]>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstantExpression {
    pub value: String,
}

/// Reference to a variable of a specific scope, plus its accessor chain.
///
/// The variable name is kept next to the handle so the expression can be
/// re-bound by name when its tree is cloned into another scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableExpression {
    pub prefix: Option<ScopePrefix>,
    pub name: String,
    pub variable: VariableId,
    pub accessors: AccessorChain,
}

impl VariableExpression {
    /// Read the variable and walk the accessor chain. A null anywhere in the
    /// chain ends the walk with null; a missing member on a present value is
    /// an error.
    pub fn get_value(&self, store: &VariableStore) -> Result<Value, RenderError> {
        let mut current = store.value(self.variable).clone();
        for accessor in &self.accessors {
            if current.is_null() {
                return Ok(Value::Null);
            }
            current = reflect::get_member(&current, &accessor.name, accessor.is_method)?;
        }
        Ok(current)
    }
}

impl fmt::Display for VariableExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", chars::DOLLAR)?;
        if let Some(prefix) = &self.prefix {
            write!(f, "{}{}", prefix, chars::PERIOD)?;
        }
        write!(f, "{}", self.name)?;
        for accessor in &self.accessors {
            write!(f, "{}{}", chars::PERIOD, accessor.name)?;
            if accessor.is_method {
                write!(f, "()")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Constant(ConstantExpression),
    Variable(VariableExpression),
}

impl Expression {
    pub fn constant(value: impl Into<String>) -> Self {
        Expression::Constant(ConstantExpression {
            value: value.into(),
        })
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Expression::Variable(_))
    }

    pub fn as_variable(&self) -> Option<&VariableExpression> {
        match self {
            Expression::Variable(exp) => Some(exp),
            Expression::Constant(_) => None,
        }
    }

    pub fn get_value(&self, store: &VariableStore) -> Result<Value, RenderError> {
        match self {
            Expression::Constant(c) => Ok(Value::String(c.value.clone())),
            Expression::Variable(v) => v.get_value(store),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(c) => f.write_str(&c.value),
            Expression::Variable(v) => fmt::Display::fmt(v, f),
        }
    }
}
