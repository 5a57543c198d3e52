//! Typed abstract syntax tree (`spec.md` §3).
//!
//! Ternary children (`left`/`middle`/`right`) encode `if (cond) then
//! else`, `for (init; cond; post) body` (reshaped to glue+while by the
//! parser before it ever reaches an `AstNode`), and generic statement
//! sequencing (`AST_GLUE`). Unary nodes (`&`, `*`, `print`, `return`)
//! use only `left`.

use crate::diagnostics::SourceSpan;
use crate::token::{TokenKind, TokenPayload};
use crate::types::TypeDescriptor;

#[derive(Debug, Clone)]
pub struct AstNode {
    pub kind: TokenKind,
    pub payload: TokenPayload,
    pub left: Option<Box<AstNode>>,
    pub middle: Option<Box<AstNode>>,
    pub right: Option<Box<AstNode>>,
    pub ty: TypeDescriptor,
    /// For most node kinds this marks whether the node denotes a value
    /// rather than a place. `VAR_DECL` repurposes it to record
    /// writeability, since `const` is otherwise nowhere else to carry
    /// through to code generation once parsing is done.
    pub is_rvalue: bool,
    pub call_args: Vec<AstNode>,
    pub span: SourceSpan,
}

impl AstNode {
    pub fn new(kind: TokenKind, payload: TokenPayload, span: SourceSpan) -> Self {
        AstNode {
            kind,
            payload,
            left: None,
            middle: None,
            right: None,
            ty: TypeDescriptor::void(),
            is_rvalue: true,
            call_args: Vec::new(),
            span,
        }
    }

    pub fn leaf(kind: TokenKind, payload: TokenPayload, span: SourceSpan) -> Self {
        AstNode::new(kind, payload, span)
    }

    pub fn unary(kind: TokenKind, payload: TokenPayload, span: SourceSpan, child: AstNode) -> Self {
        let mut node = AstNode::new(kind, payload, span);
        node.left = Some(Box::new(child));
        node
    }

    pub fn binary(kind: TokenKind, span: SourceSpan, left: AstNode, right: AstNode) -> Self {
        let mut node = AstNode::new(kind, TokenPayload::None, span);
        node.left = Some(Box::new(left));
        node.right = Some(Box::new(right));
        node
    }

    /// Glue two statements for sequential side effects: `AST_GLUE(a, b)`.
    pub fn glue(span: SourceSpan, first: AstNode, second: AstNode) -> Self {
        AstNode::binary(TokenKind::AstGlue, span, first, second)
    }

    pub fn integer_literal(value: i64, span: SourceSpan) -> Self {
        AstNode::leaf(TokenKind::IntegerLiteral, TokenPayload::Int(value), span)
    }

    pub fn identifier(name: impl Into<String>, span: SourceSpan) -> Self {
        AstNode::leaf(TokenKind::Identifier, TokenPayload::Name(name.into()), span)
    }

    pub fn name(&self) -> Option<&str> {
        self.payload.as_name()
    }

    pub fn int_value(&self) -> Option<i64> {
        self.payload.as_int()
    }

    pub fn is_integer_literal(&self) -> bool {
        self.kind == TokenKind::IntegerLiteral
    }
}

/// A parsed compilation unit, in source order. Struct/union declarations
/// carry their registered type (for `codegen`'s type-line emission);
/// enum declarations contribute only global constants to the symbol
/// table and produce no top-level item.
#[derive(Debug, Clone)]
pub enum TopLevelItem {
    Function(AstNode),
    GlobalVarDecl(AstNode),
    StructDecl(crate::types::StructType),
    UnionDecl(crate::types::UnionType),
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    pub items: Vec<TopLevelItem>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glue_wires_left_and_right() {
        let span = SourceSpan::new(1, 1);
        let node = AstNode::glue(
            span,
            AstNode::integer_literal(1, span),
            AstNode::integer_literal(2, span),
        );
        assert_eq!(node.kind, TokenKind::AstGlue);
        assert_eq!(node.left.unwrap().int_value(), Some(1));
        assert_eq!(node.right.unwrap().int_value(), Some(2));
    }
}
