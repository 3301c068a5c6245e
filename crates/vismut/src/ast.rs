//! The AST model: one sum type over every node variant, plus the [`Ast`]
//! container that owns nodes, scopes, signatures, and interned names for a
//! whole compilation.
//!
//! Statement sequences, argument lists, and print-argument lists are
//! intrusive singly-linked sibling chains through [`Node::next`]: built
//! tail-attaching during parse and never mutated afterwards except to splice
//! replacements in the optimizer. A node appears in at most one chain.

use ahash::AHashMap;
use strum::IntoStaticStr;

use crate::{
    arena::{Arena, Id},
    intern::{Interner, NameId},
    scope::{ScopeId, Scopes},
    token::Span,
    value::{Value, ValueType},
};

pub type NodeId = Id<Node>;
pub type SigId = Id<FunctionSig>;

/// Binary operator set. `%`, bitwise, and shift operators have no
/// precedence entry in the grammar and are unreachable from source text,
/// but the typing and folding tables keep their rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "**")]
    Pow,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "//")]
    IntDiv,
    #[strum(serialize = "%")]
    Mod,
    #[strum(serialize = "=")]
    Assign,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = "<=")]
    LessEq,
    #[strum(serialize = ">")]
    Greater,
    #[strum(serialize = ">=")]
    GreaterEq,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    NotEq,
    #[strum(serialize = "|")]
    BitOr,
    #[strum(serialize = "&")]
    BitAnd,
    #[strum(serialize = "||")]
    Or,
    #[strum(serialize = "&&")]
    And,
    #[strum(serialize = "<<")]
    Shl,
    #[strum(serialize = ">>")]
    Shr,
}

impl BinaryOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Unary prefix operator set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
pub enum UnaryOp {
    #[strum(serialize = "+")]
    Plus,
    #[strum(serialize = "-")]
    Minus,
    #[strum(serialize = "!")]
    Not,
    #[strum(serialize = "~")]
    BitNot,
    #[strum(serialize = "++")]
    Increment,
    #[strum(serialize = "--")]
    Decrement,
}

impl UnaryOp {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// One function parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: NameId,
    pub ty: ValueType,
}

/// A function signature, shared by the declaration that owns it and every
/// call site that resolves to it.
#[derive(Debug)]
pub struct FunctionSig {
    pub name: NameId,
    pub hash: u32,
    pub return_type: ValueType,
    pub params: Vec<Param>,
}

/// The payload of one AST node.
#[derive(Debug, IntoStaticStr)]
pub enum NodeKind {
    #[strum(serialize = "<module>")]
    Module {
        name: String,
        scope: ScopeId,
        statements: Option<NodeId>,
        functions: Option<NodeId>,
    },
    #[strum(serialize = "<block>")]
    Block {
        scope: ScopeId,
        statements: Option<NodeId>,
    },
    #[strum(serialize = "<literal>")]
    Literal { value: Value },
    #[strum(serialize = "<var ref>")]
    VarRef {
        name: NameId,
        /// Resolved type, filled during analysis.
        ty: ValueType,
    },
    #[strum(serialize = "<var decl>")]
    VarDecl {
        name: NameId,
        /// Declared type; starts as `Auto` when the annotation is omitted.
        ty: ValueType,
        init_ty: ValueType,
        init: Option<NodeId>,
    },
    #[strum(serialize = "<print stmt>")]
    PrintStmt { args: Option<NodeId> },
    #[strum(serialize = "<if stmt>")]
    IfStmt {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    #[strum(serialize = "<while stmt>")]
    WhileStmt { condition: NodeId, body: NodeId },
    #[strum(serialize = "<func decl>")]
    FunctionDecl {
        sig: SigId,
        body: NodeId,
        scope: ScopeId,
    },
    #[strum(serialize = "<func call>")]
    FunctionCall {
        callee: NameId,
        /// The declaration's signature, resolved during analysis.
        sig: Option<SigId>,
        args: Option<NodeId>,
        arg_count: u32,
        ty: ValueType,
    },
    #[strum(serialize = "<unary>")]
    Unary {
        op: UnaryOp,
        operand: NodeId,
        ty: ValueType,
        pure: bool,
    },
    #[strum(serialize = "<binary>")]
    Binary {
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        ty: ValueType,
        pure: bool,
    },
    #[strum(serialize = "<ternary>")]
    Ternary {
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
        ty: ValueType,
        pure: bool,
    },
    #[strum(serialize = "<type cast>")]
    TypeCast {
        /// Source type, filled during analysis.
        from: ValueType,
        to: ValueType,
        expr: NodeId,
        /// True for casts written in the source, false for casts the
        /// analyzer inserted.
        explicit: bool,
        pure: bool,
    },
}

impl NodeKind {
    /// The `<kind>` name used by the AST dump.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.into()
    }
}

/// One AST node: payload, source span, and the sibling link.
#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub next: Option<NodeId>,
}

/// The arena-owned tree of one compilation, together with the scope tree,
/// function signatures, and interned names every stage shares.
#[derive(Debug)]
pub struct Ast {
    pub nodes: Arena<Node>,
    pub scopes: Scopes,
    pub sigs: Arena<FunctionSig>,
    pub interner: Interner,
    /// Module-level function registry: declared name to signature.
    pub functions: AHashMap<NameId, SigId>,
}

impl Ast {
    #[must_use]
    pub fn new(interner: Interner) -> Self {
        Self {
            nodes: Arena::new(),
            scopes: Scopes::new(),
            sigs: Arena::new(),
            interner,
            functions: AHashMap::new(),
        }
    }

    fn alloc(&mut self, kind: NodeKind, span: Span) -> NodeId {
        self.nodes.alloc(Node {
            kind,
            span,
            next: None,
        })
    }

    pub fn literal(&mut self, span: Span, value: Value) -> NodeId {
        self.alloc(NodeKind::Literal { value }, span)
    }

    pub fn var_ref(&mut self, span: Span, name: NameId) -> NodeId {
        self.alloc(
            NodeKind::VarRef {
                name,
                ty: ValueType::Unknown,
            },
            span,
        )
    }

    pub fn var_decl(
        &mut self,
        span: Span,
        name: NameId,
        ty: ValueType,
        init: Option<NodeId>,
    ) -> NodeId {
        self.alloc(
            NodeKind::VarDecl {
                name,
                ty,
                init_ty: ValueType::Unknown,
                init,
            },
            span,
        )
    }

    pub fn binary(
        &mut self,
        span: Span,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        pure: bool,
    ) -> NodeId {
        self.alloc(
            NodeKind::Binary {
                op,
                left,
                right,
                ty: ValueType::Unknown,
                pure,
            },
            span,
        )
    }

    pub fn unary(&mut self, span: Span, op: UnaryOp, operand: NodeId, pure: bool) -> NodeId {
        self.alloc(
            NodeKind::Unary {
                op,
                operand,
                ty: ValueType::Unknown,
                pure,
            },
            span,
        )
    }

    pub fn ternary(
        &mut self,
        span: Span,
        condition: NodeId,
        then_expr: NodeId,
        else_expr: NodeId,
    ) -> NodeId {
        self.alloc(
            NodeKind::Ternary {
                condition,
                then_expr,
                else_expr,
                ty: ValueType::Unknown,
                pure: true,
            },
            span,
        )
    }

    /// A cast node. Explicit casts come from the parser pre-flagged pure;
    /// the analyzer inserts implicit ones and recomputes purity.
    pub fn type_cast(&mut self, span: Span, expr: NodeId, to: ValueType, explicit: bool) -> NodeId {
        self.alloc(
            NodeKind::TypeCast {
                from: ValueType::Unknown,
                to,
                expr,
                explicit,
                pure: true,
            },
            span,
        )
    }

    pub fn if_stmt(
        &mut self,
        span: Span,
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    ) -> NodeId {
        self.alloc(
            NodeKind::IfStmt {
                condition,
                then_branch,
                else_branch,
            },
            span,
        )
    }

    pub fn while_stmt(&mut self, span: Span, condition: NodeId, body: NodeId) -> NodeId {
        self.alloc(NodeKind::WhileStmt { condition, body }, span)
    }

    pub fn block(&mut self, span: Span, scope: ScopeId, statements: Option<NodeId>) -> NodeId {
        self.alloc(NodeKind::Block { scope, statements }, span)
    }

    pub fn print_stmt(&mut self, span: Span, args: Option<NodeId>) -> NodeId {
        self.alloc(NodeKind::PrintStmt { args }, span)
    }

    pub fn module(&mut self, name: &str, scope: ScopeId) -> NodeId {
        self.alloc(
            NodeKind::Module {
                name: name.to_owned(),
                scope,
                statements: None,
                functions: None,
            },
            Span::default(),
        )
    }

    pub fn function_decl(&mut self, span: Span, sig: SigId, body: NodeId, scope: ScopeId) -> NodeId {
        self.alloc(NodeKind::FunctionDecl { sig, body, scope }, span)
    }

    pub fn function_call(
        &mut self,
        span: Span,
        callee: NameId,
        args: Option<NodeId>,
        arg_count: u32,
    ) -> NodeId {
        self.alloc(
            NodeKind::FunctionCall {
                callee,
                sig: None,
                args,
                arg_count,
                ty: ValueType::Unknown,
            },
            span,
        )
    }

    /// The static type of an expression node after analysis.
    ///
    /// Statement nodes type as `Void`, mirroring the analyzer's contract.
    #[must_use]
    pub fn expr_type(&self, id: NodeId) -> ValueType {
        match &self.nodes[id].kind {
            NodeKind::Literal { value } => value.value_type(),
            NodeKind::VarRef { ty, .. }
            | NodeKind::Unary { ty, .. }
            | NodeKind::Binary { ty, .. }
            | NodeKind::Ternary { ty, .. }
            | NodeKind::FunctionCall { ty, .. } => *ty,
            NodeKind::TypeCast { to, .. } => *to,
            _ => ValueType::Void,
        }
    }

    /// Walks a sibling chain starting at `first`.
    pub fn chain(&self, first: Option<NodeId>) -> ChainIter<'_> {
        ChainIter {
            ast: self,
            cursor: first,
        }
    }
}

/// Iterator over a sibling chain.
pub struct ChainIter<'a> {
    ast: &'a Ast,
    cursor: Option<NodeId>,
}

impl Iterator for ChainIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.cursor?;
        self.cursor = self.ast.nodes[id].next;
        Some(id)
    }
}

/// Tail-attaching sibling chain builder used by the parser.
#[derive(Debug, Default, Clone, Copy)]
pub struct ChainBuilder {
    first: Option<NodeId>,
    last: Option<NodeId>,
}

impl ChainBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ast: &mut Ast, id: NodeId) {
        match self.last {
            Some(last) => ast.nodes[last].next = Some(id),
            None => self.first = Some(id),
        }
        self.last = Some(id);
    }

    #[must_use]
    pub fn first(self) -> Option<NodeId> {
        self.first
    }
}
