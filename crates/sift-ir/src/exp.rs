use std::fmt;
use std::sync::Arc;

use crate::block::Block;

/// An interned variable name.
///
/// Variables are plain names: registers, formals, locals and globals all use
/// the same namespace. Cloning shares the underlying allocation.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Var(Arc<str>);

impl Var {
    pub fn new(name: impl AsRef<str>) -> Self {
        Var(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Var {
    fn from(name: &str) -> Self {
        Var::new(name)
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

impl fmt::Debug for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// An interned function name.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FuncName(Arc<str>);

impl FuncName {
    pub fn new(name: impl AsRef<str>) -> Self {
        FuncName(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FuncName {
    fn from(name: &str) -> Self {
        FuncName::new(name)
    }
}

impl fmt::Display for FuncName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

impl fmt::Debug for FuncName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Expressions.
///
/// This is the fragment the engine and its domains consume: leaves (variable
/// reads, integer literals, block labels, function addresses) and the
/// comparison/conjunction forms the switch refinement builds with
/// [`Exp::eq`], [`Exp::dq`] and [`Exp::and`].
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Exp {
    /// Read of a variable.
    Var(Var),
    /// Integer literal.
    Int(i64),
    /// Address of a basic block (the target of an indirect switch).
    Label(Block),
    /// Address of a function.
    Func(FuncName),
    /// Equality of two expressions.
    Eq(Box<Exp>, Box<Exp>),
    /// Disequality of two expressions.
    Dq(Box<Exp>, Box<Exp>),
    /// Conjunction of two expressions.
    And(Box<Exp>, Box<Exp>),
}

impl Exp {
    pub fn var(v: impl Into<Var>) -> Exp {
        Exp::Var(v.into())
    }

    pub fn eq(lhs: Exp, rhs: Exp) -> Exp {
        Exp::Eq(Box::new(lhs), Box::new(rhs))
    }

    pub fn dq(lhs: Exp, rhs: Exp) -> Exp {
        Exp::Dq(Box::new(lhs), Box::new(rhs))
    }

    pub fn and(lhs: Exp, rhs: Exp) -> Exp {
        Exp::And(Box::new(lhs), Box::new(rhs))
    }
}

impl fmt::Display for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Exp::Var(v) => write!(f, "{v}"),
            Exp::Int(i) => write!(f, "{i}"),
            Exp::Label(b) => write!(f, "{b}"),
            Exp::Func(n) => write!(f, "{n}"),
            Exp::Eq(x, y) => write!(f, "({x} = {y})"),
            Exp::Dq(x, y) => write!(f, "({x} != {y})"),
            Exp::And(x, y) => write!(f, "({x} && {y})"),
        }
    }
}

impl fmt::Debug for Exp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
