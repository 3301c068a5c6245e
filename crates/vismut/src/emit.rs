//! Lowering the final AST to target text.
//!
//! [`Emitter`] is the seam between the middle-end and the artifact writer:
//! it consumes a fully analyzed and optimized module (every expression
//! typed, every coercion explicit as a cast node) and performs no checking
//! of its own. [`CEmitter`] is the standard-procedural-C backend: one
//! self-contained translation unit with the module's functions forward
//! declared and top-level statements in `main`.

use std::fmt;

use crate::{
    ast::{Ast, BinaryOp, FunctionSig, NodeId, NodeKind, UnaryOp},
    value::{Value, ValueType},
};

/// Consumes the final AST and writes target text.
pub trait Emitter {
    fn emit(&mut self, ast: &Ast, module: NodeId, out: &mut dyn fmt::Write) -> fmt::Result;
}

/// The standard C backend.
#[derive(Debug, Default)]
pub struct CEmitter;

impl CEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Emitter for CEmitter {
    fn emit(&mut self, ast: &Ast, module: NodeId, out: &mut dyn fmt::Write) -> fmt::Result {
        CEmission {
            ast,
            out,
            indent: 0,
        }
        .emit_module(module)
    }
}

fn c_type(ty: ValueType) -> &'static str {
    match ty {
        ValueType::I64 => "int64_t",
        ValueType::F64 => "double",
        ValueType::Str => "const char *",
        _ => "void",
    }
}

/// Helper routines the emitted unit needs, discovered by a reachability
/// scan before the prologue is written.
#[derive(Debug, Default, Clone, Copy)]
struct Helpers {
    ipow: bool,
    concat: bool,
}

struct CEmission<'a> {
    ast: &'a Ast,
    out: &'a mut dyn fmt::Write,
    indent: usize,
}

impl CEmission<'_> {
    fn write_indent(&mut self) -> fmt::Result {
        for _ in 0..self.indent {
            self.out.write_str("    ")?;
        }
        Ok(())
    }

    fn scan_helpers(&self, id: NodeId, helpers: &mut Helpers) {
        match &self.ast.nodes[id].kind {
            NodeKind::Module {
                statements,
                functions,
                ..
            } => {
                for statement in self.ast.chain(*statements) {
                    self.scan_helpers(statement, helpers);
                }
                for function in self.ast.chain(*functions) {
                    self.scan_helpers(function, helpers);
                }
            }
            NodeKind::Block { statements, .. } => {
                for statement in self.ast.chain(*statements) {
                    self.scan_helpers(statement, helpers);
                }
            }
            NodeKind::PrintStmt { args } => {
                for arg in self.ast.chain(*args) {
                    self.scan_helpers(arg, helpers);
                }
            }
            NodeKind::FunctionCall { args, .. } => {
                for arg in self.ast.chain(*args) {
                    self.scan_helpers(arg, helpers);
                }
            }
            NodeKind::VarDecl { init, .. } => {
                if let Some(init) = init {
                    self.scan_helpers(*init, helpers);
                }
            }
            NodeKind::IfStmt {
                condition,
                then_branch,
                else_branch,
            } => {
                self.scan_helpers(*condition, helpers);
                self.scan_helpers(*then_branch, helpers);
                if let Some(else_branch) = else_branch {
                    self.scan_helpers(*else_branch, helpers);
                }
            }
            NodeKind::WhileStmt { condition, body } => {
                self.scan_helpers(*condition, helpers);
                self.scan_helpers(*body, helpers);
            }
            NodeKind::FunctionDecl { body, .. } => self.scan_helpers(*body, helpers),
            NodeKind::Unary { operand, .. } => self.scan_helpers(*operand, helpers),
            NodeKind::TypeCast { expr, .. } => self.scan_helpers(*expr, helpers),
            NodeKind::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                self.scan_helpers(*condition, helpers);
                self.scan_helpers(*then_expr, helpers);
                self.scan_helpers(*else_expr, helpers);
            }
            NodeKind::Binary {
                op, left, right, ty, ..
            } => {
                if *op == BinaryOp::Pow && *ty == ValueType::I64 {
                    helpers.ipow = true;
                }
                if *op == BinaryOp::Add && *ty == ValueType::Str {
                    helpers.concat = true;
                }
                self.scan_helpers(*left, helpers);
                self.scan_helpers(*right, helpers);
            }
            NodeKind::Literal { .. } | NodeKind::VarRef { .. } => {}
        }
    }

    fn emit_module(&mut self, module: NodeId) -> fmt::Result {
        let NodeKind::Module {
            name,
            statements,
            functions,
            ..
        } = &self.ast.nodes[module].kind
        else {
            unreachable!("emission starts at the module node");
        };

        let mut helpers = Helpers::default();
        self.scan_helpers(module, &mut helpers);

        writeln!(self.out, "/* generated from module \"{name}\" */")?;
        writeln!(self.out, "#include <stdint.h>")?;
        writeln!(self.out, "#include <stdio.h>")?;
        writeln!(self.out, "#include <math.h>")?;
        if helpers.concat {
            writeln!(self.out, "#include <stdlib.h>")?;
            writeln!(self.out, "#include <string.h>")?;
        }
        writeln!(self.out)?;

        if helpers.ipow {
            writeln!(
                self.out,
                "static int64_t vismut_ipow(int64_t base, int64_t exp) {{\n    \
                 if (exp <= 0) return exp == 0 ? 1 : 0;\n    \
                 int64_t result = 1;\n    \
                 while (exp > 0) {{\n        \
                 if (exp & 1) result *= base;\n        \
                 base *= base;\n        \
                 exp >>= 1;\n    \
                 }}\n    \
                 return result;\n}}\n"
            )?;
        }
        if helpers.concat {
            writeln!(
                self.out,
                "static const char *vismut_concat(const char *a, const char *b) {{\n    \
                 size_t la = strlen(a), lb = strlen(b);\n    \
                 char *joined = malloc(la + lb + 1);\n    \
                 memcpy(joined, a, la);\n    \
                 memcpy(joined + la, b, lb + 1);\n    \
                 return joined;\n}}\n"
            )?;
        }

        let functions: Vec<NodeId> = self.ast.chain(*functions).collect();
        let statements: Vec<NodeId> = self.ast.chain(*statements).collect();

        for &function in &functions {
            self.emit_function_prototype(function)?;
            writeln!(self.out, ";")?;
        }
        if !functions.is_empty() {
            writeln!(self.out)?;
        }

        for &function in &functions {
            self.emit_function_definition(function)?;
            writeln!(self.out)?;
        }

        writeln!(self.out, "int main(void) {{")?;
        self.indent += 1;
        for statement in statements {
            self.emit_statement(statement)?;
        }
        self.write_indent()?;
        writeln!(self.out, "return 0;")?;
        self.indent -= 1;
        writeln!(self.out, "}}")
    }

    fn emit_function_prototype(&mut self, function: NodeId) -> fmt::Result {
        let NodeKind::FunctionDecl { sig, .. } = &self.ast.nodes[function].kind else {
            unreachable!("function chain holds declarations only");
        };
        let sig: &FunctionSig = &self.ast.sigs[*sig];
        write!(
            self.out,
            "static {} {}(",
            c_type(sig.return_type),
            self.ast.interner.name(sig.name)
        )?;
        if sig.params.is_empty() {
            write!(self.out, "void")?;
        } else {
            for (index, param) in sig.params.iter().enumerate() {
                if index > 0 {
                    write!(self.out, ", ")?;
                }
                write!(
                    self.out,
                    "{} {}",
                    c_type(param.ty),
                    self.ast.interner.name(param.name)
                )?;
            }
        }
        write!(self.out, ")")
    }

    fn emit_function_definition(&mut self, function: NodeId) -> fmt::Result {
        let NodeKind::FunctionDecl { body, .. } = self.ast.nodes[function].kind else {
            unreachable!();
        };
        self.emit_function_prototype(function)?;
        writeln!(self.out, " {{")?;
        self.indent += 1;
        if matches!(self.ast.nodes[body].kind, NodeKind::Block { .. }) {
            self.emit_block_statements(body)?;
        } else {
            self.write_indent()?;
            write!(self.out, "return ")?;
            self.emit_expression(body)?;
            writeln!(self.out, ";")?;
        }
        self.indent -= 1;
        writeln!(self.out, "}}")
    }

    fn emit_block_statements(&mut self, block: NodeId) -> fmt::Result {
        let NodeKind::Block { statements, .. } = self.ast.nodes[block].kind else {
            unreachable!("caller holds a block");
        };
        let statements: Vec<NodeId> = self.ast.chain(statements).collect();
        for statement in statements {
            self.emit_statement(statement)?;
        }
        Ok(())
    }

    /// A statement position: either a real statement form or an expression
    /// used for effect.
    fn emit_statement(&mut self, id: NodeId) -> fmt::Result {
        match &self.ast.nodes[id].kind {
            NodeKind::VarDecl { name, ty, init, .. } => {
                let (name, ty, init) = (*name, *ty, *init);
                self.write_indent()?;
                write!(self.out, "{} {}", c_type(ty), self.ast.interner.name(name))?;
                if let Some(init) = init {
                    write!(self.out, " = ")?;
                    self.emit_expression(init)?;
                }
                writeln!(self.out, ";")
            }

            NodeKind::PrintStmt { args } => self.emit_print(*args),

            NodeKind::IfStmt {
                condition,
                then_branch,
                else_branch,
            } => {
                let (condition, then_branch, else_branch) =
                    (*condition, *then_branch, *else_branch);
                self.write_indent()?;
                write!(self.out, "if (")?;
                self.emit_expression(condition)?;
                writeln!(self.out, ") {{")?;
                self.emit_branch(then_branch)?;
                self.write_indent()?;
                if let Some(else_branch) = else_branch {
                    writeln!(self.out, "}} else {{")?;
                    self.emit_branch(else_branch)?;
                    self.write_indent()?;
                }
                writeln!(self.out, "}}")
            }

            NodeKind::WhileStmt { condition, body } => {
                let (condition, body) = (*condition, *body);
                self.write_indent()?;
                write!(self.out, "while (")?;
                self.emit_expression(condition)?;
                writeln!(self.out, ") {{")?;
                self.emit_branch(body)?;
                self.write_indent()?;
                writeln!(self.out, "}}")
            }

            NodeKind::Block { .. } => {
                self.write_indent()?;
                writeln!(self.out, "{{")?;
                self.indent += 1;
                self.emit_block_statements(id)?;
                self.indent -= 1;
                self.write_indent()?;
                writeln!(self.out, "}}")
            }

            // An expression in statement position.
            _ => {
                self.write_indent()?;
                self.emit_expression(id)?;
                writeln!(self.out, ";")
            }
        }
    }

    /// The body of an `if`/`while` arm: a block's statements inline, or a
    /// single expression as a statement.
    fn emit_branch(&mut self, id: NodeId) -> fmt::Result {
        self.indent += 1;
        if matches!(self.ast.nodes[id].kind, NodeKind::Block { .. }) {
            self.emit_block_statements(id)?;
        } else {
            self.emit_statement(id)?;
        }
        self.indent -= 1;
        Ok(())
    }

    fn emit_print(&mut self, args: Option<NodeId>) -> fmt::Result {
        let args: Vec<NodeId> = self.ast.chain(args).collect();
        self.write_indent()?;
        write!(self.out, "printf(\"")?;
        for (index, &arg) in args.iter().enumerate() {
            if index > 0 {
                write!(self.out, " ")?;
            }
            let spec = match self.ast.expr_type(arg) {
                ValueType::F64 => "%g",
                ValueType::Str => "%s",
                _ => "%lld",
            };
            write!(self.out, "{spec}")?;
        }
        write!(self.out, "\\n\"")?;
        for &arg in &args {
            write!(self.out, ", ")?;
            if self.ast.expr_type(arg) == ValueType::I64 {
                write!(self.out, "(long long) ")?;
            }
            self.emit_expression(arg)?;
        }
        writeln!(self.out, ");")
    }

    fn emit_expression(&mut self, id: NodeId) -> fmt::Result {
        match &self.ast.nodes[id].kind {
            NodeKind::Literal { value } => self.emit_literal(*value),

            NodeKind::VarRef { name, .. } => {
                write!(self.out, "{}", self.ast.interner.name(*name))
            }

            NodeKind::Unary { op, operand, .. } => {
                let (op, operand) = (*op, *operand);
                let symbol = match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                    // Rejected during analysis; nothing to lower.
                    UnaryOp::Increment | UnaryOp::Decrement => unreachable!(),
                };
                write!(self.out, "({symbol}")?;
                self.emit_expression(operand)?;
                write!(self.out, ")")
            }

            NodeKind::Binary {
                op, left, right, ty, ..
            } => self.emit_binary(*op, *left, *right, *ty),

            NodeKind::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                let (condition, then_expr, else_expr) = (*condition, *then_expr, *else_expr);
                write!(self.out, "(")?;
                self.emit_expression(condition)?;
                write!(self.out, " ? ")?;
                self.emit_expression(then_expr)?;
                write!(self.out, " : ")?;
                self.emit_expression(else_expr)?;
                write!(self.out, ")")
            }

            NodeKind::TypeCast { to, expr, .. } => {
                let (to, expr) = (*to, *expr);
                write!(self.out, "(({})", c_type(to))?;
                self.emit_expression(expr)?;
                write!(self.out, ")")
            }

            NodeKind::FunctionCall { callee, args, .. } => {
                let (callee, args) = (*callee, *args);
                write!(self.out, "{}(", self.ast.interner.name(callee))?;
                let args: Vec<NodeId> = self.ast.chain(args).collect();
                for (index, arg) in args.into_iter().enumerate() {
                    if index > 0 {
                        write!(self.out, ", ")?;
                    }
                    self.emit_expression(arg)?;
                }
                write!(self.out, ")")
            }

            _ => unreachable!("statement node in expression position"),
        }
    }

    fn emit_binary(
        &mut self,
        op: BinaryOp,
        left: NodeId,
        right: NodeId,
        ty: ValueType,
    ) -> fmt::Result {
        let operand_ty = self.ast.expr_type(left);

        match op {
            BinaryOp::Pow => {
                if ty == ValueType::I64 {
                    write!(self.out, "vismut_ipow(")?;
                } else {
                    write!(self.out, "pow(")?;
                }
                self.emit_expression(left)?;
                write!(self.out, ", ")?;
                self.emit_expression(right)?;
                write!(self.out, ")")
            }
            BinaryOp::Add if ty == ValueType::Str => {
                write!(self.out, "vismut_concat(")?;
                self.emit_expression(left)?;
                write!(self.out, ", ")?;
                self.emit_expression(right)?;
                write!(self.out, ")")
            }
            // `/` over integers promotes both sides to double.
            BinaryOp::Div if operand_ty == ValueType::I64 => {
                write!(self.out, "((double)")?;
                self.emit_expression(left)?;
                write!(self.out, " / (double)")?;
                self.emit_expression(right)?;
                write!(self.out, ")")
            }
            // `//` over floats is the floored quotient, truncated back to
            // the node's integer type.
            BinaryOp::IntDiv if operand_ty == ValueType::F64 => {
                write!(self.out, "((int64_t)floor(")?;
                self.emit_expression(left)?;
                write!(self.out, " / ")?;
                self.emit_expression(right)?;
                write!(self.out, "))")
            }
            _ => {
                let symbol = match op {
                    BinaryOp::Add => "+",
                    BinaryOp::Sub => "-",
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    BinaryOp::IntDiv => "/",
                    BinaryOp::Mod => "%",
                    BinaryOp::Assign => "=",
                    BinaryOp::Less => "<",
                    BinaryOp::LessEq => "<=",
                    BinaryOp::Greater => ">",
                    BinaryOp::GreaterEq => ">=",
                    BinaryOp::Eq => "==",
                    BinaryOp::NotEq => "!=",
                    BinaryOp::BitOr => "|",
                    BinaryOp::BitAnd => "&",
                    BinaryOp::Or => "||",
                    BinaryOp::And => "&&",
                    BinaryOp::Shl => "<<",
                    BinaryOp::Shr => ">>",
                    BinaryOp::Pow => unreachable!(),
                };
                write!(self.out, "(")?;
                self.emit_expression(left)?;
                write!(self.out, " {symbol} ")?;
                self.emit_expression(right)?;
                write!(self.out, ")")
            }
        }
    }

    fn emit_literal(&mut self, value: Value) -> fmt::Result {
        match value {
            Value::Void => write!(self.out, "0"),
            Value::I64(v) => {
                // INT64_MIN has no literal form in C.
                if v == i64::MIN {
                    write!(self.out, "INT64_MIN")
                } else {
                    write!(self.out, "INT64_C({v})")
                }
            }
            Value::F64(v) => {
                if v.is_infinite() {
                    write!(self.out, "{}INFINITY", if v < 0.0 { "-" } else { "" })
                } else if v.is_nan() {
                    write!(self.out, "NAN")
                } else {
                    write!(self.out, "{}", ryu::Buffer::new().format(v))
                }
            }
            Value::Str(id) => {
                write!(self.out, "\"")?;
                for &byte in self.ast.interner.str_bytes(id) {
                    match byte {
                        b'"' => write!(self.out, "\\\"")?,
                        b'\\' => write!(self.out, "\\\\")?,
                        b'\n' => write!(self.out, "\\n")?,
                        b'\t' => write!(self.out, "\\t")?,
                        b'\r' => write!(self.out, "\\r")?,
                        0x20..=0x7e => write!(self.out, "{}", byte as char)?,
                        other => write!(self.out, "\\x{other:02x}")?,
                    }
                }
                write!(self.out, "\"")
            }
        }
    }
}
