//! Tokens -> typed AST: Pratt expression parsing plus recursive-descent
//! statements and declarations (`spec.md` §4.4).

use crate::ast::{AstNode, Program, TopLevelItem};
use crate::diagnostics::{EccoError, SourceSpan};
use crate::lexer::Lexer;
use crate::symtab::{SymbolTableEntry, SymbolTableStack};
use crate::token::{Token, TokenKind, TokenPayload};
use crate::types::{
    ArrayType, FunctionType, NumberType, PrimitiveKind, StructType, TypeDescriptor, TypeRegistry,
    UnionType,
};

/// Result of `match_type`: either a plain (possibly pointer) integer
/// type, or a reference to a previously-declared compound type.
enum ParsedType {
    Number(NumberType),
    Struct(StructType),
    Union(UnionType),
}

pub struct Parser {
    lexer: Lexer,
    symtab: SymbolTableStack,
    types: TypeRegistry,
}

/// Pratt-parser binding powers. Higher binds tighter; `=` is the lone
/// right-associative operator (`spec.md` §4.4's precedence table).
fn infix_binding_power(kind: TokenKind) -> Option<(u8, u8)> {
    Some(match kind {
        TokenKind::Star | TokenKind::Slash => (13, 14),
        TokenKind::Plus | TokenKind::Minus => (12, 13),
        TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq => (11, 12),
        TokenKind::Eq | TokenKind::NotEq => (10, 11),
        TokenKind::Assign => (1, 1),
        _ => return None,
    })
}

fn is_comparison(kind: TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Eq | TokenKind::NotEq | TokenKind::Lt | TokenKind::LtEq | TokenKind::Gt | TokenKind::GtEq
    )
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, EccoError> {
        Ok(Parser { lexer: Lexer::new(source)?, symtab: SymbolTableStack::new(), types: TypeRegistry::new() })
    }

    fn current(&self) -> &Token {
        self.lexer.current_token()
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn span(&self) -> SourceSpan {
        SourceSpan::new(self.current().line, self.current().column)
    }

    fn bump(&mut self) -> Result<Token, EccoError> {
        let tok = self.current().clone();
        self.lexer.advance()?;
        Ok(tok)
    }

    /// `match(kind)` from `spec.md` §4.2: assert the current token's
    /// kind, capture it, and advance.
    fn expect(&mut self, kind: TokenKind) -> Result<Token, EccoError> {
        if self.kind() != kind {
            return Err(EccoError::SyntaxError {
                span: self.span(),
                message: format!("expected {:?}, found {:?}", kind, self.kind()),
            });
        }
        self.bump()
    }

    fn expect_identifier(&mut self) -> Result<String, EccoError> {
        let tok = self.expect(TokenKind::Identifier)?;
        Ok(tok.payload.as_name().unwrap().to_string())
    }

    fn declared_type_of(&self, parsed: &ParsedType) -> TypeDescriptor {
        match parsed {
            ParsedType::Number(n) => TypeDescriptor::Number(n.clone()),
            ParsedType::Struct(s) => TypeDescriptor::Struct(s.clone()),
            ParsedType::Union(u) => TypeDescriptor::Union(u.clone()),
        }
    }

    // ---------------------------------------------------------------
    // Program
    // ---------------------------------------------------------------

    pub fn parse_program(&mut self) -> Result<Program, EccoError> {
        let mut program = Program::new();
        while self.kind() != TokenKind::Eof {
            if let Some(item) = self.parse_top_level_item()? {
                program.items.push(item);
            }
        }
        Ok(program)
    }

    fn parse_top_level_item(&mut self) -> Result<Option<TopLevelItem>, EccoError> {
        match self.kind() {
            TokenKind::Struct | TokenKind::Union if self.peek_is_type_decl() => {
                self.parse_struct_or_union_decl().map(Some)
            }
            TokenKind::Enum => {
                self.parse_enum_decl()?;
                Ok(None)
            }
            _ => self.parse_declaration().map(Some),
        }
    }

    /// Distinguish `struct Name { ... }` (a type declaration) from
    /// `struct Name var;` (a variable of a previously-declared type).
    /// The lexer exposes only a single token of lookahead, so this peeks
    /// two tokens ahead on a cloned lexer rather than backtracking.
    fn peek_is_type_decl(&mut self) -> bool {
        let mut probe = self.lexer.clone();
        if probe.advance().is_err() {
            return false;
        }
        if probe.current_token().kind != TokenKind::Identifier {
            return false;
        }
        if probe.advance().is_err() {
            return false;
        }
        probe.current_token().kind == TokenKind::LBrace
    }

    fn parse_struct_or_union_decl(&mut self) -> Result<TopLevelItem, EccoError> {
        let is_union = self.kind() == TokenKind::Union;
        self.bump()?; // struct/union
        let name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while self.kind() != TokenKind::RBrace {
            let field_parsed = self.match_type()?;
            let field_ty = self.declared_type_of(&field_parsed);
            let field_name = self.expect_identifier()?;
            self.expect(TokenKind::Semicolon)?;
            fields.push((field_name, field_ty));
        }
        self.expect(TokenKind::RBrace)?;
        self.expect(TokenKind::Semicolon)?;

        if is_union {
            let union_ty = UnionType { name, fields };
            self.types.declare_union(union_ty.clone());
            Ok(TopLevelItem::UnionDecl(union_ty))
        } else {
            let struct_ty = StructType { name, fields };
            self.types.declare_struct(struct_ty.clone());
            Ok(TopLevelItem::StructDecl(struct_ty))
        }
    }

    fn parse_enum_decl(&mut self) -> Result<(), EccoError> {
        let span = self.span();
        self.expect(TokenKind::Enum)?;
        let _name = self.expect_identifier()?;
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        let mut next_value: i64 = 0;
        while self.kind() != TokenKind::RBrace {
            let member_name = self.expect_identifier()?;
            let value = if self.kind() == TokenKind::Assign {
                self.bump()?;
                let tok = self.expect(TokenKind::IntegerLiteral)?;
                tok.payload.as_int().unwrap()
            } else {
                next_value
            };
            members.push((member_name, value));
            next_value = value + 1;
            if self.kind() == TokenKind::Comma {
                self.bump()?;
            }
        }
        self.expect(TokenKind::RBrace)?;
        self.expect(TokenKind::Semicolon)?;
        self.symtab.declare_enum(&members, span)
    }

    /// Recognizes `int|char|short|long|void|struct NAME|union NAME`
    /// followed by zero or more `*` (`spec.md` §4.3's `match_type`).
    fn match_type(&mut self) -> Result<ParsedType, EccoError> {
        let span = self.span();
        match self.kind() {
            TokenKind::Struct => {
                self.bump()?;
                let name = self.expect_identifier()?;
                let struct_ty = self
                    .types
                    .lookup_struct(&name)
                    .cloned()
                    .ok_or_else(|| EccoError::IdentifierError {
                        span,
                        message: format!("unknown struct '{}'", name),
                    })?;
                let depth = self.consume_stars();
                if depth > 0 {
                    Ok(ParsedType::Number(NumberType::pointer_to(PrimitiveKind::Long, depth)))
                } else {
                    Ok(ParsedType::Struct(struct_ty))
                }
            }
            TokenKind::Union => {
                self.bump()?;
                let name = self.expect_identifier()?;
                let union_ty = self
                    .types
                    .lookup_union(&name)
                    .cloned()
                    .ok_or_else(|| EccoError::IdentifierError {
                        span,
                        message: format!("unknown union '{}'", name),
                    })?;
                let depth = self.consume_stars();
                if depth > 0 {
                    Ok(ParsedType::Number(NumberType::pointer_to(PrimitiveKind::Long, depth)))
                } else {
                    Ok(ParsedType::Union(union_ty))
                }
            }
            kind => {
                let prim = PrimitiveKind::from_keyword(kind).ok_or_else(|| EccoError::SyntaxError {
                    span,
                    message: format!("expected a type, found {:?}", kind),
                })?;
                self.bump()?;
                let depth = self.consume_stars();
                Ok(ParsedType::Number(NumberType::pointer_to(prim, depth)))
            }
        }
    }

    fn consume_stars(&mut self) -> u32 {
        let mut depth = 0;
        while self.kind() == TokenKind::Star {
            let _ = self.bump();
            depth += 1;
        }
        depth
    }

    // ---------------------------------------------------------------
    // Declarations (§4.4.1)
    // ---------------------------------------------------------------

    /// Top-level declaration: a global variable or a function
    /// prototype/definition.
    fn parse_declaration(&mut self) -> Result<TopLevelItem, EccoError> {
        let span = self.span();
        let is_const = if self.kind() == TokenKind::Const {
            self.bump()?;
            true
        } else {
            false
        };
        let parsed_type = self.match_type()?;
        let name = self.expect_identifier()?;

        if self.kind() == TokenKind::LParen {
            return self.parse_function_decl(parsed_type, name, span);
        }

        self.parse_global_var_decl(is_const, parsed_type, name, span)
    }

    fn array_suffix(&mut self) -> Result<Option<i64>, EccoError> {
        if self.kind() != TokenKind::LBracket {
            return Ok(None);
        }
        let span = self.span();
        self.bump()?;
        let tok = self.expect(TokenKind::IntegerLiteral)?;
        let len = tok.payload.as_int().unwrap();
        if len < 0 {
            return Err(EccoError::ArrayError {
                span,
                message: "array length must be non-negative".to_string(),
            });
        }
        self.expect(TokenKind::RBracket)?;
        Ok(Some(len))
    }

    fn declared_type(&self, parsed_type: &ParsedType, length: Option<i64>) -> Result<TypeDescriptor, EccoError> {
        match (parsed_type, length) {
            (ParsedType::Number(n), Some(len)) => Ok(TypeDescriptor::Array(ArrayType {
                element: n.clone(),
                length: len,
                dimension: 1,
            })),
            (ParsedType::Number(n), None) => Ok(TypeDescriptor::Number(n.clone())),
            (ParsedType::Struct(s), None) => Ok(TypeDescriptor::Struct(s.clone())),
            (ParsedType::Union(u), None) => Ok(TypeDescriptor::Union(u.clone())),
            (ParsedType::Struct(_), Some(_)) | (ParsedType::Union(_), Some(_)) => {
                Err(EccoError::ArrayError {
                    span: self.span(),
                    message: "arrays of struct/union are not supported".to_string(),
                })
            }
        }
    }

    fn parse_global_var_decl(
        &mut self,
        is_const: bool,
        parsed_type: ParsedType,
        name: String,
        span: SourceSpan,
    ) -> Result<TopLevelItem, EccoError> {
        let length = self.array_suffix()?;
        let ty = self.declared_type(&parsed_type, length)?;

        let mut node = AstNode::new(TokenKind::VarDecl, TokenPayload::Name(name.clone()), span);
        node.ty = ty.clone();
        node.is_rvalue = !is_const;

        let init = if self.kind() == TokenKind::Assign {
            self.bump()?;
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        self.symtab.declare(SymbolTableEntry::new(name.clone(), ty, !is_const), span)?;

        let item_node = if let Some(init) = init {
            let target = AstNode::identifier(name, span);
            let assign = AstNode::binary(TokenKind::Assign, span, init, target);
            AstNode::glue(span, node, assign)
        } else {
            node
        };
        Ok(TopLevelItem::GlobalVarDecl(item_node))
    }

    fn parse_local_var_decl(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        let is_const = if self.kind() == TokenKind::Const {
            self.bump()?;
            true
        } else {
            false
        };
        let parsed_type = self.match_type()?;
        let name = self.expect_identifier()?;
        let length = self.array_suffix()?;
        let ty = self.declared_type(&parsed_type, length)?;

        let mut node = AstNode::new(TokenKind::VarDecl, TokenPayload::Name(name.clone()), span);
        node.ty = ty.clone();
        node.is_rvalue = !is_const;

        let init = if self.kind() == TokenKind::Assign {
            self.bump()?;
            Some(self.parse_expr(0)?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon)?;

        self.symtab.declare(SymbolTableEntry::new(name.clone(), ty, !is_const), span)?;

        if let Some(init) = init {
            let target = AstNode::identifier(name, span);
            let assign = AstNode::binary(TokenKind::Assign, span, init, target);
            Ok(AstNode::glue(span, node, assign))
        } else {
            Ok(node)
        }
    }

    fn parse_function_decl(
        &mut self,
        parsed_type: ParsedType,
        name: String,
        span: SourceSpan,
    ) -> Result<TopLevelItem, EccoError> {
        let return_type = match parsed_type {
            ParsedType::Number(n) => n,
            _ => {
                return Err(EccoError::SyntaxError {
                    span,
                    message: "function return type must be a primitive or pointer type".to_string(),
                })
            }
        };

        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.kind() == TokenKind::Void {
            self.bump()?; // `(void)`: no parameters
        } else if self.kind() != TokenKind::RParen {
            loop {
                let arg_type = self.match_type()?;
                let arg_name = self.expect_identifier()?;
                let arg_number = match arg_type {
                    ParsedType::Number(n) => n,
                    _ => {
                        return Err(EccoError::SyntaxError {
                            span,
                            message: "parameters must be primitive or pointer types".to_string(),
                        })
                    }
                };
                args.push((arg_name, arg_number));
                if self.kind() == TokenKind::Comma {
                    self.bump()?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        let is_prototype = self.kind() == TokenKind::Semicolon;
        let fn_type = FunctionType { return_type, args: args.clone(), is_prototype };

        if let Some(existing) = self.symtab.lookup(&name) {
            match existing.ty.as_function() {
                Some(existing_fn) => {
                    if !existing_fn.is_prototype && !is_prototype {
                        return Err(EccoError::IdentifierError {
                            span,
                            message: format!("redefinition of function '{}'", name),
                        });
                    }
                    let args_match = existing_fn.args.len() == fn_type.args.len()
                        && existing_fn.args.iter().zip(fn_type.args.iter()).all(|(a, b)| a.1 == b.1);
                    if existing_fn.return_type != fn_type.return_type || !args_match {
                        return Err(EccoError::IdentifierError {
                            span,
                            message: format!("definition of '{}' does not match its prototype", name),
                        });
                    }
                }
                None => {
                    return Err(EccoError::IdentifierError {
                        span,
                        message: format!("redeclaration of '{}' as a function", name),
                    })
                }
            }
        }

        if self.symtab.lookup(&name).is_some() {
            let entry = self.symtab.lookup_mut(&name).unwrap();
            entry.ty = TypeDescriptor::Function(fn_type.clone());
        } else {
            self.symtab.declare(
                SymbolTableEntry::new(name.clone(), TypeDescriptor::Function(fn_type.clone()), false),
                span,
            )?;
        }

        if is_prototype {
            self.expect(TokenKind::Semicolon)?;
            let mut node = AstNode::new(TokenKind::Function, TokenPayload::Name(name), span);
            node.ty = TypeDescriptor::Function(fn_type);
            return Ok(TopLevelItem::Function(node));
        }

        self.symtab.push();
        for (arg_name, arg_number) in &args {
            self.symtab.declare(
                SymbolTableEntry::new(arg_name.clone(), TypeDescriptor::Number(arg_number.clone()), true),
                span,
            )?;
        }
        let body = self.parse_block()?;
        self.symtab.pop();

        let mut node = AstNode::new(TokenKind::Function, TokenPayload::Name(name), span);
        node.ty = TypeDescriptor::Function(fn_type);
        node.left = Some(Box::new(body));
        Ok(TopLevelItem::Function(node))
    }

    // ---------------------------------------------------------------
    // Statements (§4.4)
    // ---------------------------------------------------------------

    fn is_type_start(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Int
                | TokenKind::Char
                | TokenKind::Short
                | TokenKind::Long
                | TokenKind::Void
                | TokenKind::Struct
                | TokenKind::Union
                | TokenKind::Const
        )
    }

    /// An empty block becomes a single `Unknown`-kind no-op node; a
    /// non-empty block is a left-associative `AST_GLUE` chain
    /// (`spec.md` §4.4).
    fn parse_block(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        self.expect(TokenKind::LBrace)?;
        if self.kind() == TokenKind::RBrace {
            self.bump()?;
            return Ok(AstNode::new(TokenKind::Unknown, TokenPayload::None, span));
        }
        let mut seq = self.parse_statement()?;
        while self.kind() != TokenKind::RBrace {
            let next = self.parse_statement()?;
            seq = AstNode::glue(span, seq, next);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(seq)
    }

    fn parse_statement(&mut self) -> Result<AstNode, EccoError> {
        match self.kind() {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Print => self.parse_print(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            _ if self.is_type_start() => self.parse_local_var_decl(),
            _ => self.parse_expr_statement(),
        }
    }

    fn parse_print(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        self.expect(TokenKind::Print)?;
        let expr = self.parse_expr(0)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(AstNode::unary(TokenKind::Print, TokenPayload::None, span, expr))
    }

    /// The condition of `if`/`while`/`for` must be a comparison-producing
    /// expression (`spec.md` §4.4.2).
    fn expect_condition(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        self.expect(TokenKind::LParen)?;
        let cond = self.parse_expr(0)?;
        if !is_comparison(cond.kind) {
            return Err(EccoError::SyntaxError {
                span,
                message: "condition must be a comparison expression".to_string(),
            });
        }
        self.expect(TokenKind::RParen)?;
        Ok(cond)
    }

    fn parse_if(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        self.expect(TokenKind::If)?;
        let cond = self.expect_condition()?;
        let then_branch = self.parse_statement()?;
        let mut node = AstNode::new(TokenKind::If, TokenPayload::None, span);
        node.left = Some(Box::new(cond));
        node.middle = Some(Box::new(then_branch));
        if self.kind() == TokenKind::Else {
            self.bump()?;
            let else_branch = self.parse_statement()?;
            node.right = Some(Box::new(else_branch));
        }
        Ok(node)
    }

    fn parse_while(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        self.expect(TokenKind::While)?;
        let cond = self.expect_condition()?;
        let body = self.parse_statement()?;
        let mut node = AstNode::new(TokenKind::While, TokenPayload::None, span);
        node.left = Some(Box::new(cond));
        node.middle = Some(Box::new(body));
        Ok(node)
    }

    /// `for (init; cond; post) body` rewritten into
    /// `AST_GLUE(init, WHILE(cond, AST_GLUE(body, post)))` (`spec.md` §4.4).
    fn parse_for(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        let init = if self.is_type_start() {
            self.parse_local_var_decl()?
        } else {
            let e = self.parse_expr_or_empty()?;
            self.expect(TokenKind::Semicolon)?;
            e
        };

        let cond = self.parse_expr(0)?;
        if !is_comparison(cond.kind) {
            return Err(EccoError::SyntaxError {
                span,
                message: "for-loop condition must be a comparison expression".to_string(),
            });
        }
        self.expect(TokenKind::Semicolon)?;

        let post = self.parse_expr_or_empty()?;
        self.expect(TokenKind::RParen)?;

        let body = self.parse_statement()?;

        let mut while_node = AstNode::new(TokenKind::While, TokenPayload::None, span);
        while_node.left = Some(Box::new(cond));
        while_node.middle = Some(Box::new(AstNode::glue(span, body, post)));

        Ok(AstNode::glue(span, init, while_node))
    }

    fn parse_expr_or_empty(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        if self.kind() == TokenKind::Semicolon || self.kind() == TokenKind::RParen {
            return Ok(AstNode::new(TokenKind::Unknown, TokenPayload::None, span));
        }
        self.parse_expr(0)
    }

    fn parse_return(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        self.expect(TokenKind::Return)?;
        let mut node = AstNode::new(TokenKind::Return, TokenPayload::None, span);
        if self.kind() != TokenKind::Semicolon {
            let expr = self.parse_expr(0)?;
            node.left = Some(Box::new(expr));
        }
        self.expect(TokenKind::Semicolon)?;
        Ok(node)
    }

    fn parse_expr_statement(&mut self) -> Result<AstNode, EccoError> {
        let expr = self.parse_expr(0)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(expr)
    }

    // ---------------------------------------------------------------
    // Expressions (Pratt parser, §4.4)
    // ---------------------------------------------------------------

    fn parse_expr(&mut self, min_bp: u8) -> Result<AstNode, EccoError> {
        let mut lhs = self.parse_prefix()?;
        loop {
            let op = self.kind();
            let Some((lbp, rbp)) = infix_binding_power(op) else { break };
            if lbp < min_bp {
                break;
            }
            let span = self.span();
            self.bump()?;
            let rhs = self.parse_expr(rbp)?;
            lhs = Self::build_infix(op, span, lhs, rhs);
        }
        Ok(lhs)
    }

    /// For `=`, swap children: the source's right-hand side becomes the
    /// tree's left child, so right-associativity and chained assignment
    /// fall out of the ordinary left-recursive Pratt loop (`spec.md` §4.4).
    fn build_infix(op: TokenKind, span: SourceSpan, lhs: AstNode, rhs: AstNode) -> AstNode {
        if op == TokenKind::Assign {
            AstNode::binary(TokenKind::Assign, span, rhs, lhs)
        } else {
            AstNode::binary(op, span, lhs, rhs)
        }
    }

    fn parse_prefix(&mut self) -> Result<AstNode, EccoError> {
        match self.kind() {
            TokenKind::Amp => {
                let span = self.span();
                self.bump()?;
                let operand = self.parse_prefix()?;
                Ok(AstNode::unary(TokenKind::Amp, TokenPayload::None, span, operand))
            }
            TokenKind::Star => {
                let span = self.span();
                self.bump()?;
                let operand = self.parse_prefix()?;
                Ok(AstNode::unary(TokenKind::Dereference, TokenPayload::None, span, operand))
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<AstNode, EccoError> {
        let mut node = self.parse_primary()?;
        loop {
            match self.kind() {
                TokenKind::LBracket => {
                    let span = self.span();
                    self.bump()?;
                    let index = self.parse_expr(0)?;
                    self.expect(TokenKind::RBracket)?;
                    node = AstNode::binary(TokenKind::ArrayAccess, span, node, index);
                }
                TokenKind::Dot => {
                    let span = self.span();
                    self.bump()?;
                    let field = self.expect_identifier()?;
                    let mut field_node = AstNode::new(TokenKind::FieldAccess, TokenPayload::Name(field), span);
                    field_node.left = Some(Box::new(node));
                    node = field_node;
                }
                _ => break,
            }
        }
        Ok(node)
    }

    fn parse_primary(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        match self.kind() {
            TokenKind::IntegerLiteral => {
                let tok = self.bump()?;
                Ok(AstNode::integer_literal(tok.payload.as_int().unwrap(), span))
            }
            TokenKind::LParen => {
                self.bump()?;
                let inner = self.parse_expr(0)?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Identifier => self.parse_identifier_expr(),
            TokenKind::Eof => Err(EccoError::EofMissingSemicolon {
                span,
                message: "unexpected end of file in expression".to_string(),
            }),
            other => Err(EccoError::SyntaxError {
                span,
                message: format!("unexpected token {:?} in expression", other),
            }),
        }
    }

    fn parse_identifier_expr(&mut self) -> Result<AstNode, EccoError> {
        let span = self.span();
        let tok = self.bump()?;
        let name = tok.payload.as_name().unwrap().to_string();

        let entry = self.symtab.lookup(&name).cloned().ok_or_else(|| EccoError::IdentifierError {
            span,
            message: format!("use of undeclared identifier '{}'", name),
        })?;

        if let TypeDescriptor::Function(fn_ty) = &entry.ty {
            if self.kind() == TokenKind::LParen {
                return self.parse_function_call(name, fn_ty.clone(), span);
            }
        }

        let mut node = AstNode::identifier(name, span);
        node.ty = entry.ty.clone();
        Ok(node)
    }

    fn parse_function_call(
        &mut self,
        name: String,
        fn_ty: FunctionType,
        span: SourceSpan,
    ) -> Result<AstNode, EccoError> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        if self.kind() != TokenKind::RParen {
            loop {
                // Bind tighter than `=`'s binding power of 1: a bare
                // assignment is not accepted as a call argument.
                args.push(self.parse_expr(2)?);
                if self.kind() == TokenKind::Comma {
                    self.bump()?;
                } else {
                    break;
                }
            }
        }
        self.expect(TokenKind::RParen)?;

        if args.len() != fn_ty.args.len() {
            return Err(EccoError::IdentifierError {
                span,
                message: format!(
                    "'{}' expects {} argument(s), found {}",
                    name,
                    fn_ty.args.len(),
                    args.len()
                ),
            });
        }

        let mut node = AstNode::new(TokenKind::FunctionCall, TokenPayload::Name(name), span);
        node.ty = TypeDescriptor::Number(fn_ty.return_type.clone());
        node.call_args = args;
        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> Program {
        Parser::new(src).unwrap().parse_program().unwrap()
    }

    #[test]
    fn parses_global_and_function() {
        let program = parse("int x; int main(){ x=5; print x+1; }");
        assert_eq!(program.items.len(), 2);
    }

    #[test]
    fn precedence_multiplies_before_adds() {
        let program = parse("int main(){ print 2+3*4; }");
        let TopLevelItem::Function(func) = &program.items[0] else { panic!() };
        let print_node = func.left.as_ref().unwrap();
        let expr = print_node.left.as_ref().unwrap();
        assert_eq!(expr.kind, TokenKind::Plus);
        assert_eq!(expr.right.as_ref().unwrap().kind, TokenKind::Star);
    }

    #[test]
    fn assignment_swaps_children() {
        let program = parse("int main(){ int x; x=5; }");
        let TopLevelItem::Function(func) = &program.items[0] else { panic!() };
        let seq = func.left.as_ref().unwrap();
        let assign = seq.right.as_ref().unwrap();
        assert_eq!(assign.kind, TokenKind::Assign);
        assert_eq!(assign.left.as_ref().unwrap().int_value(), Some(5));
        assert_eq!(assign.right.as_ref().unwrap().name(), Some("x"));
    }

    #[test]
    fn undeclared_identifier_is_identifier_error() {
        let err = Parser::new("int main(){ print y; }").unwrap().parse_program().unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }

    #[test]
    fn non_comparison_condition_is_syntax_error() {
        let err = Parser::new("int main(){ if (1) { print 1; } }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn for_loop_rewritten_to_glue_and_while() {
        let program = parse("int main(){ for(int i; i<5; i=i+1){ print i; } }");
        let TopLevelItem::Function(func) = &program.items[0] else { panic!() };
        let glue = func.left.as_ref().unwrap();
        assert_eq!(glue.kind, TokenKind::AstGlue);
        assert_eq!(glue.right.as_ref().unwrap().kind, TokenKind::While);
    }

    #[test]
    fn struct_decl_and_field_access() {
        let program = parse(
            "struct Point { int x; int y; } int main(){ struct Point p; p.x=1; print p.x; }",
        );
        assert!(matches!(program.items[0], TopLevelItem::StructDecl(_)));
    }

    #[test]
    fn function_prototype_then_definition_must_match() {
        let err = Parser::new("int f(int a); int f(int a, int b){ return a; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert_eq!(err.exit_code(), 6);
    }
}
