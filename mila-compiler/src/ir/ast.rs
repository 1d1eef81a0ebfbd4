//! Abstract syntax tree for Mila programs.
//!
//! The tree is produced by [`crate::frontend`] (or deserialized from JSON by an
//! external producer) and consumed by the IR generator. Each parent owns its
//! children; nothing in here is mutated after parsing.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub name: String,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stmt {
    /// `target := value`
    Assign { target: Expr, value: Expr },
    /// `readln(target)`
    Read { target: Expr },
    /// `writeln(value)`
    Write { value: Expr },
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        #[serde(default)]
        else_branch: Option<Box<Stmt>>,
    },
    While { condition: Expr, body: Box<Stmt> },
    Break,
    /// `begin ... end`
    Block(Vec<Stmt>),
}

/// Whether a reference yields the loaded value or the storage address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Rvalue,
    Lvalue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Number(i32),
    Variable {
        name: String,
        #[serde(default)]
        access: Access,
    },
    /// Array element reference: `name[index]`
    Index {
        name: String,
        index: Box<Expr>,
        #[serde(default)]
        access: Access,
    },
    Neg(Box<Expr>),
    Binary {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    And,
    Or,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}

impl Expr {
    /// Rvalue reference to a scalar.
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Variable {
            name: name.into(),
            access: Access::Rvalue,
        }
    }

    /// Lvalue reference to a scalar, as used by assignment and `readln` targets.
    pub fn place(name: impl Into<String>) -> Self {
        Expr::Variable {
            name: name.into(),
            access: Access::Lvalue,
        }
    }

    pub fn element(name: impl Into<String>, index: Expr) -> Self {
        Expr::Index {
            name: name.into(),
            index: Box::new(index),
            access: Access::Rvalue,
        }
    }

    pub fn element_place(name: impl Into<String>, index: Expr) -> Self {
        Expr::Index {
            name: name.into(),
            index: Box::new(index),
            access: Access::Lvalue,
        }
    }

    pub fn neg(operand: Expr) -> Self {
        Expr::Neg(Box::new(operand))
    }

    pub fn binary(op: BinOp, left: Expr, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Identifier named by a variable or element reference.
    pub fn reference_name(&self) -> Option<&str> {
        match self {
            Expr::Variable { name, .. } | Expr::Index { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl Stmt {
    pub fn assign(target: Expr, value: Expr) -> Self {
        Stmt::Assign { target, value }
    }

    pub fn if_else(condition: Expr, then_branch: Stmt, else_branch: Option<Stmt>) -> Self {
        Stmt::If {
            condition,
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        }
    }

    pub fn while_do(condition: Expr, body: Stmt) -> Self {
        Stmt::While {
            condition,
            body: Box::new(body),
        }
    }
}
