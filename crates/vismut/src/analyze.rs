//! The type analyzer: a single post-order walk over the module.
//!
//! Resolves identifiers against the scope tree, computes every expression's
//! type from the rule tables, inserts implicit cast nodes where operand
//! types differ but are compatible, recomputes purity bottom-up, and prunes
//! unused symbols at each block's close. Analysis is fail-fast: the first
//! error aborts the walk.
//!
//! After a successful pass no reachable expression node carries `Auto` or
//! `Unknown`, and every binary/unary/cast/ternary node has its purity set.

use crate::{
    ast::{Ast, BinaryOp, NodeId, NodeKind, UnaryOp},
    error::{CompileError, ErrorKind},
    scope::{ScopeId, SymbolFlags},
    typing,
    value::ValueType,
};

/// Type-checks the module in place.
pub fn analyze(ast: &mut Ast, module: NodeId) -> Result<(), CompileError> {
    let NodeKind::Module { scope, .. } = ast.nodes[module].kind else {
        unreachable!("analysis starts at the module node");
    };
    let mut analyzer = Analyzer {
        ast,
        current_scope: scope,
    };
    analyzer.analyze_node(module)?;
    Ok(())
}

struct Analyzer<'a> {
    ast: &'a mut Ast,
    current_scope: ScopeId,
}

impl Analyzer<'_> {
    /// Purity of an already-analyzed operand.
    fn is_node_pure(&self, id: NodeId) -> bool {
        match &self.ast.nodes[id].kind {
            NodeKind::Binary { pure, .. }
            | NodeKind::Unary { pure, .. }
            | NodeKind::TypeCast { pure, .. }
            | NodeKind::Ternary { pure, .. } => *pure,
            NodeKind::FunctionCall { .. } => false,
            _ => true,
        }
    }

    fn error(&self, kind: ErrorKind, node: NodeId) -> CompileError {
        CompileError::new(kind, self.ast.nodes[node].span)
    }

    /// Wraps `node` in an implicit cast to `to`, stamping the source type
    /// and the inner expression's purity.
    fn insert_cast(&mut self, node: NodeId, from: ValueType, to: ValueType) -> NodeId {
        let span = self.ast.nodes[node].span;
        let cast_pure = self.is_node_pure(node);
        let cast = self.ast.type_cast(span, node, to, false);
        let NodeKind::TypeCast {
            from: from_slot,
            pure,
            ..
        } = &mut self.ast.nodes[cast].kind
        else {
            unreachable!("just built a cast");
        };
        *from_slot = from;
        *pure = cast_pure;
        cast
    }

    /// Conditions of `if`, `while`, and `?:` must be numeric; truthiness is
    /// "nonzero".
    fn check_condition(&self, condition: NodeId, ty: ValueType) -> Result<(), CompileError> {
        if ty.is_numeric() {
            Ok(())
        } else {
            Err(self.error(ErrorKind::UnsupportedOperation, condition))
        }
    }

    fn analyze_node(&mut self, id: NodeId) -> Result<ValueType, CompileError> {
        match &self.ast.nodes[id].kind {
            NodeKind::Literal { value } => Ok(value.value_type()),

            NodeKind::VarRef { name, .. } => {
                let name = *name;
                let hash = self.ast.interner.name_hash(name);
                let Some((owner, index)) = self.ast.scopes.resolve(self.current_scope, name, hash)
                else {
                    return Err(self.error(ErrorKind::SymbolNotDefined, id));
                };
                let ty = self.ast.scopes.symbol(owner, index).ty;
                self.ast.scopes.mark_used(self.current_scope, name, hash);
                let NodeKind::VarRef { ty: slot, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *slot = ty;
                Ok(ty)
            }

            NodeKind::VarDecl {
                name, ty, init, ..
            } => {
                let (name, declared, init) = (*name, *ty, *init);
                // The initializer is analyzed before the name is declared,
                // so `$ x = x` resolves against the outer scope or fails.
                let init_ty = match init {
                    Some(expr) => {
                        let t = self.analyze_node(expr)?;
                        let NodeKind::VarDecl { init_ty, .. } = &mut self.ast.nodes[id].kind
                        else {
                            unreachable!();
                        };
                        *init_ty = t;
                        t
                    }
                    None => declared,
                };

                let final_ty = if declared == ValueType::Auto {
                    init_ty
                } else if declared == init_ty {
                    declared
                } else {
                    return Err(self.error(ErrorKind::TypeIsIncompatible, id));
                };
                let NodeKind::VarDecl { ty, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *ty = final_ty;

                let hash = self.ast.interner.name_hash(name);
                self.ast
                    .scopes
                    .declare(
                        self.current_scope,
                        name,
                        hash,
                        final_ty,
                        SymbolFlags::empty(),
                    )
                    .map_err(|kind| self.error(kind, id))?;
                Ok(ValueType::Void)
            }

            NodeKind::Binary {
                op, left, right, ..
            } => {
                let (op, left, right) = (*op, *left, *right);
                let left_ty = self.analyze_node(left)?;
                let right_ty = self.analyze_node(right)?;

                let operands_pure = self.is_node_pure(left) && self.is_node_pure(right);
                let NodeKind::Binary { pure, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *pure = operands_pure && *pure;

                if op == BinaryOp::Assign {
                    return self.analyze_assignment(id, left, right, left_ty, right_ty);
                }

                let result = typing::binary_result_type(op, left_ty, right_ty);
                if result != ValueType::Unknown {
                    self.set_binary_type(id, result);
                    return Ok(result);
                }

                // No direct rule; try again at the common type, casting the
                // operand that is not there yet.
                let common = typing::common_type(left_ty, right_ty);
                if common == ValueType::Unknown {
                    return Err(self.error(ErrorKind::UnsupportedOperation, id));
                }
                if common == left_ty {
                    let cast = self.insert_cast(right, right_ty, common);
                    let NodeKind::Binary { right, .. } = &mut self.ast.nodes[id].kind else {
                        unreachable!();
                    };
                    *right = cast;
                } else {
                    let cast = self.insert_cast(left, left_ty, common);
                    let NodeKind::Binary { left, .. } = &mut self.ast.nodes[id].kind else {
                        unreachable!();
                    };
                    *left = cast;
                }
                let result = typing::binary_result_type(op, common, common);
                if result == ValueType::Unknown {
                    return Err(self.error(ErrorKind::UnsupportedOperation, id));
                }
                self.set_binary_type(id, result);
                Ok(result)
            }

            NodeKind::Unary { op, operand, .. } => {
                let (op, operand) = (*op, *operand);
                let operand_ty = self.analyze_node(operand)?;

                let operand_pure = self.is_node_pure(operand);
                let NodeKind::Unary { pure, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *pure = operand_pure && *pure;

                // No lvalue model exists, so increment and decrement have no
                // defined semantics anywhere.
                if matches!(op, UnaryOp::Increment | UnaryOp::Decrement) {
                    return Err(self.error(ErrorKind::UnsupportedOperation, id));
                }

                let result = typing::unary_result_type(op, operand_ty);
                if result == ValueType::Unknown {
                    return Err(self.error(ErrorKind::UnsupportedOperation, id));
                }
                let NodeKind::Unary { ty, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *ty = result;
                Ok(result)
            }

            NodeKind::Ternary {
                condition,
                then_expr,
                else_expr,
                ..
            } => {
                let (condition, then_expr, else_expr) = (*condition, *then_expr, *else_expr);
                let cond_ty = self.analyze_node(condition)?;
                self.check_condition(condition, cond_ty)?;
                let then_ty = self.analyze_node(then_expr)?;
                let else_ty = self.analyze_node(else_expr)?;

                // The condition's purity is irrelevant to the value.
                let branches_pure = self.is_node_pure(then_expr) && self.is_node_pure(else_expr);
                let NodeKind::Ternary { pure, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *pure = branches_pure;

                let result = if then_ty == else_ty {
                    then_ty
                } else {
                    let common = typing::common_type(then_ty, else_ty);
                    if common == ValueType::Unknown {
                        return Err(self.error(ErrorKind::CastIsNotAllowed, id));
                    }
                    if common == then_ty {
                        let cast = self.insert_cast(else_expr, else_ty, common);
                        let NodeKind::Ternary { else_expr, .. } = &mut self.ast.nodes[id].kind
                        else {
                            unreachable!();
                        };
                        *else_expr = cast;
                    } else {
                        let cast = self.insert_cast(then_expr, then_ty, common);
                        let NodeKind::Ternary { then_expr, .. } = &mut self.ast.nodes[id].kind
                        else {
                            unreachable!();
                        };
                        *then_expr = cast;
                    }
                    common
                };
                let NodeKind::Ternary { ty, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *ty = result;
                Ok(result)
            }

            NodeKind::TypeCast { to, expr, explicit, .. } => {
                let (to, expr, explicit) = (*to, *expr, *explicit);
                let from = self.analyze_node(expr)?;

                let expr_pure = self.is_node_pure(expr);
                let NodeKind::TypeCast { from: from_slot, pure, .. } =
                    &mut self.ast.nodes[id].kind
                else {
                    unreachable!();
                };
                *from_slot = from;
                *pure = expr_pure;

                if !typing::is_cast_allowed(from, to, explicit) {
                    return Err(self.error(ErrorKind::CastIsNotAllowed, id));
                }
                Ok(to)
            }

            NodeKind::PrintStmt { args } => {
                let args: Vec<NodeId> = self.ast.chain(*args).collect();
                for arg in args {
                    self.analyze_node(arg)?;
                }
                Ok(ValueType::Void)
            }

            NodeKind::IfStmt {
                condition,
                then_branch,
                else_branch,
            } => {
                let (condition, then_branch, else_branch) =
                    (*condition, *then_branch, *else_branch);
                let cond_ty = self.analyze_node(condition)?;
                self.check_condition(condition, cond_ty)?;
                self.analyze_node(then_branch)?;
                if let Some(else_branch) = else_branch {
                    self.analyze_node(else_branch)?;
                }
                Ok(ValueType::Void)
            }

            NodeKind::WhileStmt { condition, body } => {
                let (condition, body) = (*condition, *body);
                let cond_ty = self.analyze_node(condition)?;
                self.check_condition(condition, cond_ty)?;
                self.analyze_node(body)?;
                Ok(ValueType::Void)
            }

            NodeKind::Block { scope, statements } => {
                let (scope, statements) = (*scope, *statements);
                let outer = self.current_scope;
                self.current_scope = scope;

                let statements: Vec<NodeId> = self.ast.chain(statements).collect();
                for statement in statements {
                    self.analyze_node(statement)?;
                }

                // Unused symbols are reported and dropped exactly once, at
                // the semantic close of the block.
                self.ast.scopes.remove_unused(scope);
                self.current_scope = outer;
                Ok(ValueType::Void)
            }

            NodeKind::Module {
                statements,
                functions,
                ..
            } => {
                // Function declarations are analyzed strictly before any
                // top-level statement.
                let functions: Vec<NodeId> = self.ast.chain(*functions).collect();
                let statements: Vec<NodeId> = self.ast.chain(*statements).collect();
                for function in functions {
                    self.analyze_node(function)?;
                }
                for statement in statements {
                    self.analyze_node(statement)?;
                }
                Ok(ValueType::Void)
            }

            NodeKind::FunctionDecl { sig, body, scope } => {
                let (sig, body, scope) = (*sig, *body, *scope);

                for i in 0..self.ast.sigs[sig].params.len() {
                    let param = self.ast.sigs[sig].params[i];
                    let hash = self.ast.interner.name_hash(param.name);
                    self.ast
                        .scopes
                        .declare(scope, param.name, hash, param.ty, SymbolFlags::empty())
                        .map_err(|kind| self.error(kind, id))?;
                }

                if matches!(self.ast.nodes[body].kind, NodeKind::Block { .. }) {
                    let outer = self.current_scope;
                    self.current_scope = scope;
                    self.analyze_node(body)?;
                    self.current_scope = outer;
                    return Ok(ValueType::Void);
                }

                // Expression-bodied function.
                let declared = self.ast.sigs[sig].return_type;
                if declared == ValueType::Void {
                    return Err(self.error(ErrorKind::VoidForExpressionFunction, id));
                }

                let outer = self.current_scope;
                self.current_scope = scope;
                let body_ty = self.analyze_node(body)?;
                self.current_scope = outer;

                let declared = if declared == ValueType::Auto {
                    body_ty
                } else {
                    declared
                };
                if declared == body_ty {
                    self.ast.sigs[sig].return_type = declared;
                    return Ok(ValueType::Void);
                }
                if !typing::is_cast_allowed(body_ty, declared, false) {
                    return Err(self.error(ErrorKind::CastIsNotAllowed, id));
                }
                let cast = self.insert_cast(body, body_ty, declared);
                let NodeKind::FunctionDecl { body, .. } = &mut self.ast.nodes[id].kind else {
                    unreachable!();
                };
                *body = cast;
                self.ast.sigs[sig].return_type = declared;
                Ok(ValueType::Void)
            }

            NodeKind::FunctionCall {
                callee,
                args,
                arg_count,
                ..
            } => {
                let (callee, args, arg_count) = (*callee, *args, *arg_count);
                let Some(&sig) = self.ast.functions.get(&callee) else {
                    return Err(self.error(ErrorKind::FunctionNotDefined, id));
                };
                let return_type = self.ast.sigs[sig].return_type;
                let NodeKind::FunctionCall { sig: sig_slot, ty, .. } =
                    &mut self.ast.nodes[id].kind
                else {
                    unreachable!();
                };
                *sig_slot = Some(sig);
                *ty = return_type;

                if arg_count as usize != self.ast.sigs[sig].params.len() {
                    return Err(self.error(ErrorKind::InvalidArgumentsCount, id));
                }

                // No coercion at call sites: each argument's type must equal
                // its parameter's type exactly.
                let args: Vec<NodeId> = self.ast.chain(args).collect();
                for (index, arg) in args.into_iter().enumerate() {
                    let arg_ty = self.analyze_node(arg)?;
                    let param_ty = self.ast.sigs[sig].params[index].ty;
                    if arg_ty != param_ty {
                        return Err(self.error(ErrorKind::InvalidArgumentType, arg));
                    }
                }
                Ok(return_type)
            }
        }
    }

    fn analyze_assignment(
        &mut self,
        id: NodeId,
        left: NodeId,
        right: NodeId,
        left_ty: ValueType,
        right_ty: ValueType,
    ) -> Result<ValueType, CompileError> {
        if !matches!(self.ast.nodes[left].kind, NodeKind::VarRef { .. }) {
            return Err(self.error(ErrorKind::AssignNotToVar, id));
        }

        if left_ty != right_ty {
            if !typing::is_cast_allowed(right_ty, left_ty, false) {
                return Err(self.error(ErrorKind::CastIsNotAllowed, id));
            }
            let cast = self.insert_cast(right, right_ty, left_ty);
            let NodeKind::Binary { right, .. } = &mut self.ast.nodes[id].kind else {
                unreachable!();
            };
            *right = cast;
        }
        self.set_binary_type(id, left_ty);
        Ok(left_ty)
    }

    fn set_binary_type(&mut self, id: NodeId, ty: ValueType) {
        let NodeKind::Binary { ty: slot, .. } = &mut self.ast.nodes[id].kind else {
            unreachable!("caller holds a binary node");
        };
        *slot = ty;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parse::parse;

    fn analyzed(source: &str) -> (Ast, NodeId) {
        let parsed = parse(source.as_bytes(), "test").expect("parse failure");
        let mut ast = parsed.ast;
        analyze(&mut ast, parsed.module).expect("analysis failure");
        (ast, parsed.module)
    }

    fn analyze_err(source: &str) -> CompileError {
        let parsed = parse(source.as_bytes(), "test").expect("parse failure");
        let mut ast = parsed.ast;
        analyze(&mut ast, parsed.module).expect_err("expected analysis error")
    }

    fn first_statement(ast: &Ast, module: NodeId) -> NodeId {
        let NodeKind::Module { statements, .. } = &ast.nodes[module].kind else {
            panic!("not a module");
        };
        ast.chain(*statements).next().expect("no statements")
    }

    #[test]
    fn auto_declaration_adopts_the_initializer_type() {
        let (ast, module) = analyzed("$ x = 1 + 2;");
        let decl = first_statement(&ast, module);
        let NodeKind::VarDecl { ty, init_ty, .. } = &ast.nodes[decl].kind else {
            panic!("expected var decl");
        };
        assert_eq!(*ty, ValueType::I64);
        assert_eq!(*init_ty, ValueType::I64);
    }

    #[test]
    fn mixed_addition_inserts_a_cast_on_the_integer_side() {
        let (ast, module) = analyzed("$ y = 1 + 2.5;");
        let decl = first_statement(&ast, module);
        let NodeKind::VarDecl { ty, init, .. } = &ast.nodes[decl].kind else {
            panic!("expected var decl");
        };
        assert_eq!(*ty, ValueType::F64);
        let NodeKind::Binary { left, right, ty, .. } = &ast.nodes[init.unwrap()].kind else {
            panic!("expected binary initializer");
        };
        assert_eq!(*ty, ValueType::F64);
        let NodeKind::TypeCast { from, to, explicit, .. } = &ast.nodes[*left].kind else {
            panic!("expected implicit cast around the left operand");
        };
        assert_eq!((*from, *to, *explicit), (ValueType::I64, ValueType::F64, false));
        assert_eq!(ast.expr_type(*right), ValueType::F64);
    }

    #[test]
    fn division_types_follow_the_rule_table() {
        let (ast, module) = analyzed("$ a = 7 / 2; $ b = 7 // 2;");
        let NodeKind::Module { statements, .. } = &ast.nodes[module].kind else {
            panic!("not a module");
        };
        let stmts: Vec<_> = ast.chain(*statements).collect();
        let NodeKind::VarDecl { ty: a_ty, .. } = &ast.nodes[stmts[0]].kind else {
            panic!("expected var decl");
        };
        let NodeKind::VarDecl { ty: b_ty, .. } = &ast.nodes[stmts[1]].kind else {
            panic!("expected var decl");
        };
        assert_eq!(*a_ty, ValueType::F64);
        assert_eq!(*b_ty, ValueType::I64);
    }

    #[test]
    fn annotated_declaration_requires_equal_types() {
        let err = analyze_err("$ x: i64 = 2.5;");
        assert_eq!(err.kind, ErrorKind::TypeIsIncompatible);
    }

    #[test]
    fn undefined_variable_is_reported_at_its_span() {
        let source = ":: z";
        let parsed = parse(source.as_bytes(), "test").unwrap();
        let mut ast = parsed.ast;
        let err = analyze(&mut ast, parsed.module).expect_err("expected error");
        assert_eq!(err.kind, ErrorKind::SymbolNotDefined);
        assert_eq!(
            &source[err.span.offset as usize..err.span.end() as usize],
            "z"
        );
    }

    #[test]
    fn assignment_requires_a_variable_on_the_left() {
        let err = analyze_err("(1+1) = 2");
        assert_eq!(err.kind, ErrorKind::AssignNotToVar);
    }

    #[test]
    fn assignment_coerces_int_into_float_variable() {
        let (ast, module) = analyzed("$ x = 1.5; x = 2");
        let NodeKind::Module { statements, .. } = &ast.nodes[module].kind else {
            panic!("not a module");
        };
        let stmts: Vec<_> = ast.chain(*statements).collect();
        let NodeKind::Binary { right, ty, .. } = &ast.nodes[stmts[1]].kind else {
            panic!("expected assignment");
        };
        assert_eq!(*ty, ValueType::F64);
        assert!(matches!(
            ast.nodes[*right].kind,
            NodeKind::TypeCast {
                explicit: false,
                ..
            }
        ));
    }

    #[test]
    fn float_to_int_assignment_is_rejected() {
        let err = analyze_err("$ x = 1; x = 2.5");
        assert_eq!(err.kind, ErrorKind::CastIsNotAllowed);
    }

    #[test]
    fn string_arithmetic_is_unsupported() {
        let err = analyze_err("$ s = \"a\" - \"b\";");
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn string_concatenation_is_allowed() {
        let (ast, module) = analyzed("$ s = \"a\" + \"b\";");
        let decl = first_statement(&ast, module);
        let NodeKind::VarDecl { ty, .. } = &ast.nodes[decl].kind else {
            panic!("expected var decl");
        };
        assert_eq!(*ty, ValueType::Str);
    }

    #[test]
    fn duplicate_declaration_in_one_scope_is_rejected() {
        let err = analyze_err("$ x = 1; $ x = 2;");
        assert_eq!(err.kind, ErrorKind::SymbolAlreadyDefined);
    }

    #[test]
    fn explicit_float_to_int_cast_is_allowed() {
        let (ast, module) = analyzed("$ x = i64(2.5);");
        let decl = first_statement(&ast, module);
        let NodeKind::VarDecl { ty, .. } = &ast.nodes[decl].kind else {
            panic!("expected var decl");
        };
        assert_eq!(*ty, ValueType::I64);
    }

    #[test]
    fn implicit_float_to_int_is_rejected_in_ternary_fallback() {
        // str and i64 have no common type.
        let err = analyze_err("$ x = 1 ? \"a\" : 2;");
        assert_eq!(err.kind, ErrorKind::CastIsNotAllowed);
    }

    #[test]
    fn ternary_branches_coerce_to_the_common_type() {
        let (ast, module) = analyzed("$ x = 1 ? 1 : 2.5;");
        let decl = first_statement(&ast, module);
        let NodeKind::VarDecl { ty, init, .. } = &ast.nodes[decl].kind else {
            panic!("expected var decl");
        };
        assert_eq!(*ty, ValueType::F64);
        let NodeKind::Ternary { then_expr, .. } = &ast.nodes[init.unwrap()].kind else {
            panic!("expected ternary");
        };
        assert!(matches!(
            ast.nodes[*then_expr].kind,
            NodeKind::TypeCast { .. }
        ));
    }

    #[test]
    fn non_numeric_condition_is_rejected() {
        let err = analyze_err("# \"s\" { }");
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn increment_is_rejected() {
        let err = analyze_err("$ x = 1; ++x");
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn bitwise_not_requires_an_integer() {
        let err = analyze_err("~1.5");
        assert_eq!(err.kind, ErrorKind::UnsupportedOperation);
    }

    #[test]
    fn unused_symbol_is_pruned_at_block_close() {
        let (ast, module) = analyzed("{ $ t = 1; $ u = 2; :: u }");
        let block = first_statement(&ast, module);
        let NodeKind::Block { scope, .. } = &ast.nodes[block].kind else {
            panic!("expected block");
        };
        // `t` was never referenced, `u` was printed.
        assert_eq!(ast.scopes.get(*scope).len(), 1);
    }

    #[test]
    fn impure_subexpressions_poison_purity_upward() {
        let (ast, module) = analyzed("$ x = 1; $ y = (x = 2) + 3;");
        let NodeKind::Module { statements, .. } = &ast.nodes[module].kind else {
            panic!("not a module");
        };
        let stmts: Vec<_> = ast.chain(*statements).collect();
        let NodeKind::VarDecl { init, .. } = &ast.nodes[stmts[1]].kind else {
            panic!("expected var decl");
        };
        let NodeKind::Binary { pure, .. } = &ast.nodes[init.unwrap()].kind else {
            panic!("expected binary");
        };
        assert!(!pure);
    }

    #[test]
    fn call_to_unknown_function_is_rejected() {
        let err = analyze_err("missing(1)");
        assert_eq!(err.kind, ErrorKind::FunctionNotDefined);
    }

    #[test]
    fn call_argument_count_must_match() {
        let err = analyze_err("$ f(a: i64) -> i64 => a\nf(1, 2)");
        assert_eq!(err.kind, ErrorKind::InvalidArgumentsCount);
    }

    #[test]
    fn call_argument_types_must_match_exactly() {
        let err = analyze_err("$ f(a: i64) -> i64 => a\nf(1.5)");
        assert_eq!(err.kind, ErrorKind::InvalidArgumentType);
    }

    #[test]
    fn call_site_never_coerces_even_when_a_cast_would_be_implicit() {
        // i64 -> f64 is an implicit cast elsewhere, but not at call sites.
        let err = analyze_err("$ f(a: f64) -> f64 => a\nf(1)");
        assert_eq!(err.kind, ErrorKind::InvalidArgumentType);
    }

    #[test]
    fn functions_resolve_regardless_of_declaration_order() {
        let (ast, module) = analyzed(":: later(1)\n$ later(a: i64) -> i64 => a + 1");
        let stmt = first_statement(&ast, module);
        let NodeKind::PrintStmt { args } = &ast.nodes[stmt].kind else {
            panic!("expected print");
        };
        let call = ast.chain(*args).next().unwrap();
        assert_eq!(ast.expr_type(call), ValueType::I64);
    }

    #[test]
    fn expression_function_with_void_return_is_rejected() {
        let err = analyze_err("$ f() -> void => 1");
        // `void` is not a type keyword, so the annotation itself fails.
        assert_eq!(err.kind, ErrorKind::UnknownType);
    }

    #[test]
    fn expression_function_infers_auto_return_from_its_body() {
        let (ast, _) = analyzed("$ half(x: f64) => x / 2.0\n:: half(3.0)");
        let name = ast
            .functions
            .keys()
            .copied()
            .next()
            .expect("one function registered");
        let sig = ast.functions[&name];
        assert_eq!(ast.sigs[sig].return_type, ValueType::F64);
    }

    #[test]
    fn expression_function_body_coerces_to_the_declared_return() {
        let (ast, _) = analyzed("$ f() -> f64 => 1\n:: f()");
        let name = ast.functions.keys().copied().next().unwrap();
        let sig = ast.functions[&name];
        assert_eq!(ast.sigs[sig].return_type, ValueType::F64);
    }

    #[test]
    fn block_bodied_function_params_resolve_in_the_body() {
        let (_, _) = analyzed("$ show(a: i64) { :: a }");
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let err = analyze_err("$ f(a: i64, a: i64) -> i64 => a");
        assert_eq!(err.kind, ErrorKind::SymbolAlreadyDefined);
    }
}
