//! Abstract syntax tree for the traced teaching language.
//!
//! Every statement and expression carries the 1-based source line it started
//! on. The tracing engine keys its line events off [`Stmt::line`], so the
//! parser must attribute each statement to the line of its first token.

/// A statement with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub line: u32,
    pub kind: StmtKind,
}

/// Statement forms of the language.
#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// A bare expression evaluated for its side effects.
    Expr(Expr),
    /// `target = value`
    Assign { target: Target, value: Expr },
    /// `target op= value`
    AugAssign {
        target: Target,
        op: BinOp,
        value: Expr,
    },
    /// `def name(params):` with an indented body.
    Def {
        name: String,
        params: Vec<String>,
        body: Vec<Stmt>,
    },
    /// `return [expr]`
    Return(Option<Expr>),
    /// `if`/`elif` arms in order, then the optional `else` suite.
    If {
        arms: Vec<(Expr, Vec<Stmt>)>,
        orelse: Vec<Stmt>,
    },
    /// `while cond:`
    While { cond: Expr, body: Vec<Stmt> },
    /// `for var in iter:`
    For {
        var: String,
        iter: Expr,
        body: Vec<Stmt>,
    },
    Break,
    Continue,
    Pass,
    /// `global a, b` — names that resolve to module scope in this function.
    Global(Vec<String>),
}

/// An assignable place.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Name(String),
    /// `base[index] = ...`
    Index { base: Expr, index: Expr },
}

/// An expression with its source line.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub line: u32,
    pub kind: ExprKind,
}

/// Expression forms of the language.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Str(String),
    Bool(bool),
    NoneLit,
    Name(String),
    /// `[a, b, c]`
    List(Vec<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Compare {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Short-circuiting `and`/`or`.
    BoolOp {
        op: BoolOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `recv.name(args)` — only list methods exist today.
    MethodCall {
        recv: Box<Expr>,
        name: String,
        args: Vec<Expr>,
    },
    /// `base[index]`
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
}

/// Binary arithmetic operators. Also reused for augmented assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    /// True division (always produces a float).
    Div,
    /// Floor division.
    FloorDiv,
    Mod,
}

/// Comparison operators, including membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}
