//! Structural invariants checked over whole reachable trees, on a corpus of
//! representative programs.

use vismut::{
    ast::{Ast, NodeId, NodeKind},
    compile,
    intern::Interner,
    tokenizer::Tokenizer,
    value::ValueType,
};

/// Programs that exercise every statement and expression form.
const CORPUS: &[&str] = &[
    "$ x = (2 + 3) * 4; :: x",
    "$ y = 1 + 2.5; :: y",
    "$ a = 7 / 2; $ b = 7 // 2; :: a, b",
    "$ v = 2; $ w = i64(v); :: w",
    "$ s = \"a\" + \"b\"; :: s",
    "$ t = 1 ? 2.5 : 3; :: t",
    "$ i = 0; @ i < 10 { i = i + 1; # i > 5 { :: i } ! { :: 0 - i } }",
    "$ f(n: i64) -> i64 => n * n\n$ g() -> f64 => 0.5\n:: f(3), g()",
    "{ $ inner = 1; :: inner } :: 2 ** 10",
    "$ c = 1; :: c ? -c : +c, !c, ~c",
];

fn walk(ast: &Ast, id: NodeId, visit: &mut impl FnMut(&Ast, NodeId)) {
    visit(ast, id);
    match &ast.nodes[id].kind {
        NodeKind::Module {
            statements,
            functions,
            ..
        } => {
            for statement in ast.chain(*statements) {
                walk(ast, statement, visit);
            }
            for function in ast.chain(*functions) {
                walk(ast, function, visit);
            }
        }
        NodeKind::Block { statements, .. } => {
            for statement in ast.chain(*statements) {
                walk(ast, statement, visit);
            }
        }
        NodeKind::PrintStmt { args } => {
            for arg in ast.chain(*args) {
                walk(ast, arg, visit);
            }
        }
        NodeKind::FunctionCall { args, .. } => {
            for arg in ast.chain(*args) {
                walk(ast, arg, visit);
            }
        }
        NodeKind::VarDecl { init, .. } => {
            if let Some(init) = init {
                walk(ast, *init, visit);
            }
        }
        NodeKind::IfStmt {
            condition,
            then_branch,
            else_branch,
        } => {
            walk(ast, *condition, visit);
            walk(ast, *then_branch, visit);
            if let Some(else_branch) = else_branch {
                walk(ast, *else_branch, visit);
            }
        }
        NodeKind::WhileStmt { condition, body } => {
            walk(ast, *condition, visit);
            walk(ast, *body, visit);
        }
        NodeKind::FunctionDecl { body, .. } => walk(ast, *body, visit),
        NodeKind::Unary { operand, .. } => walk(ast, *operand, visit),
        NodeKind::Binary { left, right, .. } => {
            walk(ast, *left, visit);
            walk(ast, *right, visit);
        }
        NodeKind::Ternary {
            condition,
            then_expr,
            else_expr,
            ..
        } => {
            walk(ast, *condition, visit);
            walk(ast, *then_expr, visit);
            walk(ast, *else_expr, visit);
        }
        NodeKind::TypeCast { expr, .. } => walk(ast, *expr, visit),
        NodeKind::Literal { .. } | NodeKind::VarRef { .. } => {}
    }
}

fn is_literal(ast: &Ast, id: NodeId) -> bool {
    matches!(ast.nodes[id].kind, NodeKind::Literal { .. })
}

#[test]
fn token_spans_reassemble_the_meaningful_source() {
    // Universal invariant 1: concatenating the emitted token spans yields
    // the source minus whitespace and comments.
    for source in CORPUS {
        let bytes = source.as_bytes();
        let mut interner = Interner::new();
        let mut tokenizer = Tokenizer::new(bytes);
        let mut rebuilt: Vec<u8> = Vec::new();
        loop {
            let token = tokenizer.next_token(&mut interner).expect("lex failure");
            if token.kind == vismut::token::TokenKind::Eof {
                break;
            }
            rebuilt.extend_from_slice(&bytes[token.span.offset as usize..token.span.end() as usize]);
        }
        let expected: Vec<u8> = bytes
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();
        assert_eq!(rebuilt, expected, "source: {source}");
    }
}

#[test]
fn no_auto_or_unknown_survives_analysis() {
    // Universal invariant 3, first half.
    for source in CORPUS {
        let compilation = compile(source.as_bytes(), "test").expect("compilation failure");
        walk(&compilation.ast, compilation.module, &mut |ast, id| {
            let ty = ast.expr_type(id);
            assert_ne!(ty, ValueType::Auto, "auto leaked in {source}");
            assert_ne!(ty, ValueType::Unknown, "unknown leaked in {source}");
            if let NodeKind::VarDecl { ty, init_ty, init, .. } = &ast.nodes[id].kind {
                assert_ne!(*ty, ValueType::Auto, "auto decl in {source}");
                if init.is_some() {
                    assert_ne!(*init_ty, ValueType::Unknown, "unknown init in {source}");
                }
            }
        });
    }
}

#[test]
fn differing_adjacent_types_are_separated_by_casts() {
    // Universal invariant 3, second half: a binary node's operands both
    // carry the types its rule row names; mixed inputs got cast nodes.
    for source in CORPUS {
        let compilation = compile(source.as_bytes(), "test").expect("compilation failure");
        walk(&compilation.ast, compilation.module, &mut |ast, id| {
            if let NodeKind::Binary { op, left, right, .. } = &ast.nodes[id].kind {
                let left_ty = ast.expr_type(*left);
                let right_ty = ast.expr_type(*right);
                if *op == vismut::ast::BinaryOp::Assign {
                    assert_eq!(left_ty, right_ty, "uncast assignment in {source}");
                } else {
                    assert_eq!(left_ty, right_ty, "uncast operands in {source}");
                }
            }
        });
    }
}

#[test]
fn optimizer_leaves_no_foldable_shapes_behind() {
    // Universal invariant 4.
    for source in CORPUS {
        let compilation = compile(source.as_bytes(), "test").expect("compilation failure");
        walk(&compilation.ast, compilation.module, &mut |ast, id| {
            match &ast.nodes[id].kind {
                NodeKind::Binary { left, right, pure, .. } => {
                    assert!(
                        !(*pure && is_literal(ast, *left) && is_literal(ast, *right)),
                        "unfolded pure binary in {source}"
                    );
                }
                NodeKind::TypeCast { from, to, .. } => {
                    assert_ne!(from, to, "identity cast survived in {source}");
                }
                NodeKind::Ternary { condition, .. } => {
                    assert!(
                        !is_literal(ast, *condition),
                        "ternary with literal condition survived in {source}"
                    );
                }
                _ => {}
            }
        });
    }
}

#[test]
fn optimizer_preserves_declaration_types() {
    // Universal invariant 5, observed at the declaration boundary: the
    // initializer's type still matches the declared type after rewriting.
    for source in CORPUS {
        let compilation = compile(source.as_bytes(), "test").expect("compilation failure");
        walk(&compilation.ast, compilation.module, &mut |ast, id| {
            if let NodeKind::VarDecl { ty, init: Some(init), .. } = &ast.nodes[id].kind {
                assert_eq!(
                    *ty,
                    ast.expr_type(*init),
                    "declaration type drifted in {source}"
                );
            }
        });
    }
}

#[test]
fn sibling_chains_are_acyclic_and_disjoint() {
    // Data-model invariant: every node appears in at most one chain.
    for source in CORPUS {
        let compilation = compile(source.as_bytes(), "test").expect("compilation failure");
        let mut seen = std::collections::HashSet::new();
        walk(&compilation.ast, compilation.module, &mut |ast, id| {
            let heads = match &ast.nodes[id].kind {
                NodeKind::Module {
                    statements,
                    functions,
                    ..
                } => vec![*statements, *functions],
                NodeKind::Block { statements, .. } => vec![*statements],
                NodeKind::PrintStmt { args } => vec![*args],
                NodeKind::FunctionCall { args, .. } => vec![*args],
                _ => vec![],
            };
            for head in heads {
                for (count, member) in ast.chain(head).enumerate() {
                    assert!(
                        seen.insert(member),
                        "node in two chains in {source}"
                    );
                    assert!(count < 10_000, "cycle detected in {source}");
                }
            }
        });
    }
}
