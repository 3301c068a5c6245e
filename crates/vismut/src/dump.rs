//! Human-readable AST dump.
//!
//! One node per line, indented four spaces per depth level, each node
//! printed as `<kind> [payload] (<type>) [offset-endoffset]`. The format is
//! stable across runs for a given input and is what the driver writes to
//! the `.ast.txt` artifact.

use std::fmt::Write as _;

use crate::{
    ast::{Ast, NodeId, NodeKind},
    value::Value,
};

/// Renders the tree rooted at `node` (normally the module).
#[must_use]
pub fn dump(ast: &Ast, node: NodeId) -> String {
    let mut out = String::new();
    write_node(ast, node, 0, &mut out);
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("    ");
    }
}

fn write_label(ast: &Ast, label: &str, child: NodeId, depth: usize, out: &mut String) {
    indent(out, depth);
    out.push_str(label);
    out.push('\n');
    write_node(ast, child, depth + 1, out);
}

fn format_value(ast: &Ast, value: Value) -> String {
    match value {
        Value::Void => "void".to_owned(),
        Value::I64(v) => v.to_string(),
        Value::F64(v) => ryu::Buffer::new().format(v).to_owned(),
        Value::Str(id) => format!("\"{}\"", ast.interner.str_text(id)),
    }
}

fn write_span(ast: &Ast, id: NodeId, out: &mut String) {
    let span = ast.nodes[id].span;
    let _ = write!(out, " [{}-{}]", span.offset, span.end());
}

fn write_pure(pure: bool, out: &mut String) {
    out.push_str(if pure { " pure" } else { " !pure" });
}

fn write_node(ast: &Ast, id: NodeId, depth: usize, out: &mut String) {
    indent(out, depth);
    let node = &ast.nodes[id];
    out.push_str(node.kind.name());

    match &node.kind {
        NodeKind::Module {
            name,
            statements,
            functions,
            ..
        } => {
            let _ = write!(out, " [{name}]");
            write_span(ast, id, out);
            out.push('\n');
            if functions.is_some() {
                indent(out, depth + 1);
                out.push_str("functions\n");
                for function in ast.chain(*functions) {
                    write_node(ast, function, depth + 2, out);
                }
            }
            if statements.is_some() {
                indent(out, depth + 1);
                out.push_str("statements\n");
                for statement in ast.chain(*statements) {
                    write_node(ast, statement, depth + 2, out);
                }
            }
        }

        NodeKind::Block { statements, .. } => {
            write_span(ast, id, out);
            out.push('\n');
            for statement in ast.chain(*statements) {
                write_node(ast, statement, depth + 1, out);
            }
        }

        NodeKind::Literal { value } => {
            let _ = write!(out, " [{}]", format_value(ast, *value));
            let _ = write!(out, " ({})", value.value_type());
            write_span(ast, id, out);
            out.push('\n');
        }

        NodeKind::VarRef { name, ty } => {
            let _ = write!(out, " [{}] ({ty})", ast.interner.name(*name));
            write_span(ast, id, out);
            out.push('\n');
        }

        NodeKind::VarDecl { name, ty, init, .. } => {
            let _ = write!(out, " [{}] ({ty})", ast.interner.name(*name));
            write_span(ast, id, out);
            out.push('\n');
            if let Some(init) = init {
                write_label(ast, "value", *init, depth + 1, out);
            }
        }

        NodeKind::PrintStmt { args } => {
            write_span(ast, id, out);
            out.push('\n');
            for arg in ast.chain(*args) {
                write_node(ast, arg, depth + 1, out);
            }
        }

        NodeKind::IfStmt {
            condition,
            then_branch,
            else_branch,
        } => {
            write_span(ast, id, out);
            out.push('\n');
            write_node(ast, *condition, depth + 1, out);
            write_label(ast, "then", *then_branch, depth + 1, out);
            if let Some(else_branch) = else_branch {
                write_label(ast, "else", *else_branch, depth + 1, out);
            }
        }

        NodeKind::WhileStmt { condition, body } => {
            write_span(ast, id, out);
            out.push('\n');
            write_label(ast, "condition", *condition, depth + 1, out);
            write_label(ast, "body", *body, depth + 1, out);
        }

        NodeKind::FunctionDecl { sig, body, .. } => {
            let sig = &ast.sigs[*sig];
            let _ = write!(out, " [{}(", ast.interner.name(sig.name));
            for (index, param) in sig.params.iter().enumerate() {
                if index > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{}: {}", ast.interner.name(param.name), param.ty);
            }
            let _ = write!(out, ") -> {}]", sig.return_type);
            write_span(ast, id, out);
            out.push('\n');
            write_node(ast, *body, depth + 1, out);
        }

        NodeKind::FunctionCall {
            callee, args, ty, ..
        } => {
            let _ = write!(out, " [{}] ({ty})", ast.interner.name(*callee));
            write_span(ast, id, out);
            out.push('\n');
            for arg in ast.chain(*args) {
                write_node(ast, arg, depth + 1, out);
            }
        }

        NodeKind::Unary {
            op,
            operand,
            ty,
            pure,
        } => {
            let _ = write!(out, " [{}] ({ty})", op.as_str());
            write_pure(*pure, out);
            write_span(ast, id, out);
            out.push('\n');
            write_node(ast, *operand, depth + 1, out);
        }

        NodeKind::Binary {
            op,
            left,
            right,
            ty,
            pure,
        } => {
            let _ = write!(out, " [{}] ({ty})", op.as_str());
            write_pure(*pure, out);
            write_span(ast, id, out);
            out.push('\n');
            write_label(ast, "left", *left, depth + 1, out);
            write_label(ast, "right", *right, depth + 1, out);
        }

        NodeKind::Ternary {
            condition,
            then_expr,
            else_expr,
            ty,
            pure,
        } => {
            let _ = write!(out, " ({ty})");
            write_pure(*pure, out);
            write_span(ast, id, out);
            out.push('\n');
            write_node(ast, *condition, depth + 1, out);
            write_label(ast, "then", *then_expr, depth + 1, out);
            write_label(ast, "else", *else_expr, depth + 1, out);
        }

        NodeKind::TypeCast {
            from,
            to,
            expr,
            explicit,
            pure,
        } => {
            let _ = write!(out, " [{from} -> {to}]");
            if *explicit {
                out.push_str(" explicit");
            }
            write_pure(*pure, out);
            write_span(ast, id, out);
            out.push('\n');
            write_node(ast, *expr, depth + 1, out);
        }
    }
}
