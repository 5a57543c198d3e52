//! Bottom-up constant folding and algebraic simplification (`spec.md` §4.5).
//!
//! Three passes run to a fixpoint at `--opt>=1` (a single pass at exactly
//! `--opt=1` would still converge for the shallow trees this grammar
//! produces, but running to a fixpoint costs nothing and matches the
//! idempotence property `spec.md` §8 tests for). At `--opt=0` `optimize`
//! is a pass-through.

use crate::ast::AstNode;
use crate::diagnostics::{EccoError, SourceSpan};
use crate::token::{TokenKind, TokenPayload};

/// Fold `node` to a fixpoint. `opt_level == 0` disables folding entirely;
/// `opt_level >= 1` runs the three passes below until nothing changes.
pub fn optimize(node: AstNode, opt_level: u8) -> Result<AstNode, EccoError> {
    if opt_level == 0 {
        return Ok(node);
    }
    let mut current = node;
    loop {
        let next = fold_once(current.clone())?;
        if same_shape(&next, &current) {
            return Ok(next);
        }
        current = next;
    }
}

fn is_arith(kind: TokenKind) -> bool {
    matches!(kind, TokenKind::Plus | TokenKind::Minus | TokenKind::Star | TokenKind::Slash)
}

fn fold_once(mut node: AstNode) -> Result<AstNode, EccoError> {
    if let Some(left) = node.left.take() {
        node.left = Some(Box::new(fold_once(*left)?));
    }
    if let Some(middle) = node.middle.take() {
        node.middle = Some(Box::new(fold_once(*middle)?));
    }
    if let Some(right) = node.right.take() {
        node.right = Some(Box::new(fold_once(*right)?));
    }

    if !is_arith(node.kind) {
        return Ok(node);
    }

    let node = fold_two_literals(node)?;
    let node = fold_zero_identities(node)?;
    fold_reassociate(node)
}

fn eval(op: TokenKind, a: i64, b: i64, span: SourceSpan) -> Result<i64, EccoError> {
    Ok(match op {
        TokenKind::Plus => a.wrapping_add(b),
        TokenKind::Minus => a.wrapping_sub(b),
        TokenKind::Star => a.wrapping_mul(b),
        TokenKind::Slash => {
            if b == 0 {
                return Err(EccoError::Fatal {
                    span,
                    message: "division by zero in constant expression".to_string(),
                });
            }
            a / b // truncates toward zero, matching Rust's integer division
        }
        _ => unreachable!("fold_two_literals only called on arithmetic nodes"),
    })
}

/// If both children are integer literals, replace the node with the
/// computed literal.
fn fold_two_literals(node: AstNode) -> Result<AstNode, EccoError> {
    let (Some(left), Some(right)) = (&node.left, &node.right) else {
        return Ok(node);
    };
    if !left.is_integer_literal() || !right.is_integer_literal() {
        return Ok(node);
    }
    let a = left.int_value().unwrap();
    let b = right.int_value().unwrap();
    let value = eval(node.kind, a, b, node.span)?;
    Ok(AstNode::integer_literal(value, node.span))
}

fn is_zero(node: &AstNode) -> bool {
    node.is_integer_literal() && node.int_value() == Some(0)
}

/// `x+0`, `0+x`, `x-0`, `0-x`, `x*0`, `0*x`, `0/x`, `x/0` identities.
fn fold_zero_identities(node: AstNode) -> Result<AstNode, EccoError> {
    let Some(left) = &node.left else { return Ok(node) };
    let Some(right) = &node.right else { return Ok(node) };

    match node.kind {
        TokenKind::Plus => {
            if is_zero(left) {
                return Ok(*node.right.unwrap());
            }
            if is_zero(right) {
                return Ok(*node.left.unwrap());
            }
        }
        TokenKind::Minus => {
            if is_zero(right) {
                return Ok(*node.left.unwrap());
            }
            if is_zero(left) {
                let span = node.span;
                let inner = *node.right.unwrap();
                return Ok(AstNode::unary(TokenKind::Minus, TokenPayload::None, span, inner));
            }
        }
        TokenKind::Star => {
            if is_zero(left) || is_zero(right) {
                return Ok(AstNode::integer_literal(0, node.span));
            }
        }
        TokenKind::Slash => {
            if is_zero(left) {
                return Ok(AstNode::integer_literal(0, node.span));
            }
            if is_zero(right) {
                return Err(EccoError::Fatal {
                    span: node.span,
                    message: "division by zero in constant expression".to_string(),
                });
            }
        }
        _ => {}
    }
    Ok(node)
}

/// Re-associate so a matching top/child operator combines first:
/// `x+y+z -> (x+y)+z`, `x*y*z -> (x*y)*z`, `x-y-z -> x-(y+z)`,
/// `x/y/z -> x/(y*z)`. Only fires when the left child has the same
/// top-level operator (or its algebraic inverse for `-`/`/`).
fn fold_reassociate(node: AstNode) -> Result<AstNode, EccoError> {
    let AstNode { kind, span, left, right, .. } = node.clone();
    let (Some(left), Some(right)) = (left, right) else { return Ok(node) };

    match kind {
        TokenKind::Plus | TokenKind::Star if left.kind == kind => {
            let AstNode { left: ll, right: lr, .. } = *left;
            let (Some(ll), Some(lr)) = (ll, lr) else { return Ok(node) };
            let inner = fold_once(AstNode::binary(kind, span, *lr, *right))?;
            Ok(fold_once(AstNode::binary(kind, span, *ll, inner))?)
        }
        TokenKind::Minus if left.kind == TokenKind::Minus => {
            let AstNode { left: ll, right: lr, .. } = *left;
            let (Some(ll), Some(lr)) = (ll, lr) else { return Ok(node) };
            let combined = fold_once(AstNode::binary(TokenKind::Plus, span, *lr, *right))?;
            Ok(fold_once(AstNode::binary(TokenKind::Minus, span, *ll, combined))?)
        }
        TokenKind::Slash if left.kind == TokenKind::Slash => {
            let AstNode { left: ll, right: lr, .. } = *left;
            let (Some(ll), Some(lr)) = (ll, lr) else { return Ok(node) };
            let combined = fold_once(AstNode::binary(TokenKind::Star, span, *lr, *right))?;
            Ok(fold_once(AstNode::binary(TokenKind::Slash, span, *ll, combined))?)
        }
        _ => Ok(node),
    }
}

/// Structural equality used to detect the folding fixpoint. Cheap: only
/// the fields folding can change are compared.
fn same_shape(a: &AstNode, b: &AstNode) -> bool {
    if a.kind != b.kind || a.payload != b.payload {
        return false;
    }
    match (&a.left, &b.left) {
        (Some(x), Some(y)) => same_shape(x, y),
        (None, None) => true,
        _ => false,
    }
    && match (&a.middle, &b.middle) {
        (Some(x), Some(y)) => same_shape(x, y),
        (None, None) => true,
        _ => false,
    }
    && match (&a.right, &b.right) {
        (Some(x), Some(y)) => same_shape(x, y),
        (None, None) => true,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lit(v: i64) -> AstNode {
        AstNode::integer_literal(v, SourceSpan::new(1, 1))
    }

    fn bin(kind: TokenKind, l: AstNode, r: AstNode) -> AstNode {
        AstNode::binary(kind, SourceSpan::new(1, 1), l, r)
    }

    #[test]
    fn folds_two_literals() {
        let expr = bin(TokenKind::Plus, lit(2), bin(TokenKind::Star, lit(3), lit(4)));
        let folded = optimize(expr, 1).unwrap();
        assert_eq!(folded.int_value(), Some(14));
    }

    #[test]
    fn zero_identity_add() {
        let expr = bin(TokenKind::Plus, lit(0), AstNode::identifier("x", SourceSpan::new(1, 1)));
        let folded = optimize(expr, 1).unwrap();
        assert_eq!(folded.kind, TokenKind::Identifier);
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let expr = bin(TokenKind::Slash, lit(1), lit(0));
        let err = optimize(expr, 1).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn opt_level_zero_is_pass_through() {
        let expr = bin(TokenKind::Plus, lit(1), lit(2));
        let result = optimize(expr.clone(), 0).unwrap();
        assert_eq!(result.kind, TokenKind::Plus);
    }

    #[test]
    fn idempotent() {
        let expr = bin(
            TokenKind::Plus,
            bin(TokenKind::Plus, AstNode::identifier("a", SourceSpan::new(1, 1)), lit(0)),
            lit(5),
        );
        let once = optimize(expr.clone(), 1).unwrap();
        let twice = optimize(once.clone(), 1).unwrap();
        assert!(same_shape(&once, &twice));
    }
}
