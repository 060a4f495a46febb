//! Abstract syntax tree for the C subset, built from the pest parse tree.
//!
//! Nodes keep the `Span` of the source text they came from so that the
//! emitter can report semantic errors (unknown names, bad builtin
//! arguments, unsupported constructs) with full file/line context.

use lazy_static::lazy_static;
use matches::debug_assert_matches;
use pest::iterators::Pair;
use pest::prec_climber::{Assoc, Operator, PrecClimber};
use pest::{Parser, Span};

use crate::parser::{CParser, Rule};
use crate::{new_parser_error, Result};

lazy_static! {
    // C binary-operator precedence, lowest first.
    static ref CLIMBER: PrecClimber<Rule> = PrecClimber::new(vec![
        Operator::new(Rule::op_bor, Assoc::Left),
        Operator::new(Rule::op_bxor, Assoc::Left),
        Operator::new(Rule::op_band, Assoc::Left),
        Operator::new(Rule::op_eq, Assoc::Left) | Operator::new(Rule::op_ne, Assoc::Left),
        Operator::new(Rule::op_lt, Assoc::Left)
            | Operator::new(Rule::op_le, Assoc::Left)
            | Operator::new(Rule::op_gt, Assoc::Left)
            | Operator::new(Rule::op_ge, Assoc::Left),
        Operator::new(Rule::op_shl, Assoc::Left) | Operator::new(Rule::op_shr, Assoc::Left),
        Operator::new(Rule::op_add, Assoc::Left) | Operator::new(Rule::op_sub, Assoc::Left),
        Operator::new(Rule::op_mul, Assoc::Left)
            | Operator::new(Rule::op_div, Assoc::Left)
            | Operator::new(Rule::op_mod, Assoc::Left),
    ]);
}

#[derive(Debug)]
pub struct Program<'i> {
    pub items: Vec<Item<'i>>,
    pub span: Span<'i>,
}

#[derive(Debug)]
pub enum Item<'i> {
    Function(FuncDef<'i>),
    ForwardDecl {
        name: &'i str,
        params: Vec<&'i str>,
    },
    Globals(Vec<VarDecl<'i>>),
}

#[derive(Debug)]
pub struct FuncDef<'i> {
    pub name: &'i str,
    pub params: Vec<&'i str>,
    pub body: Stmt<'i>,
}

#[derive(Debug)]
pub struct VarDecl<'i> {
    pub name: &'i str,
    pub init: Option<Expr<'i>>,
    pub span: Span<'i>,
}

#[derive(Debug)]
pub enum Stmt<'i> {
    Block(Vec<Stmt<'i>>),
    Decl(Vec<VarDecl<'i>>),
    Expr(Expr<'i>),
    If {
        cond: Expr<'i>,
        then: Box<Stmt<'i>>,
        els: Option<Box<Stmt<'i>>>,
    },
    While {
        cond: Expr<'i>,
        body: Box<Stmt<'i>>,
    },
    DoWhile {
        body: Box<Stmt<'i>>,
        cond: Expr<'i>,
    },
    For {
        init: Option<Box<Stmt<'i>>>,
        cond: Option<Expr<'i>>,
        step: Option<Expr<'i>>,
        body: Box<Stmt<'i>>,
    },
    Break(Span<'i>),
    Continue(Span<'i>),
    Return {
        value: Option<Expr<'i>>,
    },
    Label {
        name: &'i str,
        stmt: Box<Stmt<'i>>,
        span: Span<'i>,
    },
    Goto {
        label: &'i str,
        span: Span<'i>,
    },
    Empty,
}

#[derive(Debug)]
pub enum Expr<'i> {
    Num {
        text: &'i str,
        span: Span<'i>,
    },
    Str {
        text: &'i str,
        span: Span<'i>,
    },
    Ident {
        name: &'i str,
        span: Span<'i>,
    },
    Unary {
        op: &'i str,
        expr: Box<Expr<'i>>,
        span: Span<'i>,
    },
    IncDec {
        op: &'i str,
        name: &'i str,
        postfix: bool,
        span: Span<'i>,
    },
    Binary {
        op: &'i str,
        lhs: Box<Expr<'i>>,
        rhs: Box<Expr<'i>>,
        span: Span<'i>,
    },
    Assign {
        name: &'i str,
        op: &'i str,
        value: Box<Expr<'i>>,
        span: Span<'i>,
    },
    Call {
        name: &'i str,
        args: Vec<Expr<'i>>,
        span: Span<'i>,
    },
}

impl<'i> Expr<'i> {
    pub fn span(&self) -> Span<'i> {
        use Expr::*;

        match self {
            Num { span, .. }
            | Str { span, .. }
            | Ident { span, .. }
            | Unary { span, .. }
            | IncDec { span, .. }
            | Binary { span, .. }
            | Assign { span, .. }
            | Call { span, .. } => span.clone(),
        }
    }
}

/// Parse a preprocessed source file into a [`Program`].
pub fn parse(input: &str) -> Result<Program> {
    let pair = CParser::parse(Rule::program, input)?.next().unwrap();
    let span = pair.as_span();
    let mut items = Vec::new();
    for item in pair.into_inner() {
        match item.as_rule() {
            Rule::function => items.push(process_function(item)?),
            Rule::declaration => items.push(Item::Globals(process_declaration(item)?)),
            Rule::EOI => {}
            _ => unreachable!(),
        }
    }
    Ok(Program { items, span })
}

fn process_function(pair: Pair<Rule>) -> Result<Item> {
    debug_assert_matches!(pair.as_rule(), Rule::function);
    let mut pairs = pair.into_inner();
    check_type(pairs.next().unwrap())?;
    let name = pairs.next().unwrap().as_str();
    let mut params = Vec::new();
    let mut body = None;
    for p in pairs {
        match p.as_rule() {
            Rule::param_list => params = process_params(p)?,
            Rule::block => body = Some(process_block(p)?),
            _ => unreachable!(),
        }
    }
    Ok(match body {
        Some(body) => Item::Function(FuncDef { name, params, body }),
        None => Item::ForwardDecl { name, params },
    })
}

fn process_params(pair: Pair<Rule>) -> Result<Vec<&str>> {
    let mut params = Vec::new();
    for param in pair.into_inner() {
        let span = param.as_span();
        let mut pairs = param.into_inner();
        let ty = pairs.next().unwrap();
        let is_void = ty.as_str() == "void";
        check_type(ty)?;
        match pairs.next() {
            Some(ident) => params.push(ident.as_str()),
            None if is_void => {}
            None => {
                return Err(new_parser_error(span, "parameter needs a name".to_owned()));
            }
        }
    }
    Ok(params)
}

fn check_type(pair: Pair<Rule>) -> Result<()> {
    debug_assert_matches!(pair.as_rule(), Rule::type_spec);
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::struct_type => {
                let span = inner.as_span();
                let name = inner.into_inner().next().unwrap().as_str();
                if name != "MindustryObject" {
                    return Err(new_parser_error(
                        span,
                        format!("unsupported struct type `{}`", name),
                    ));
                }
            }
            Rule::enum_type => {
                return Err(new_parser_error(
                    inner.as_span(),
                    "enums are not supported".to_owned(),
                ));
            }
            _ => {}
        }
    }
    Ok(())
}

fn process_declaration(pair: Pair<Rule>) -> Result<Vec<VarDecl>> {
    debug_assert_matches!(pair.as_rule(), Rule::declaration | Rule::for_decl);
    let mut pairs = pair.into_inner();
    check_type(pairs.next().unwrap())?;
    let mut decls = Vec::new();
    for d in pairs {
        debug_assert_matches!(d.as_rule(), Rule::init_declarator);
        let span = d.as_span();
        let mut parts = d.into_inner();
        let name = parts.next().unwrap().as_str();
        let init = match parts.next() {
            Some(e) => Some(process_expr(e)?),
            None => None,
        };
        decls.push(VarDecl { name, init, span });
    }
    Ok(decls)
}

fn process_block(pair: Pair<Rule>) -> Result<Stmt> {
    let mut stmts = Vec::new();
    for p in pair.into_inner() {
        stmts.push(process_stmt(p)?);
    }
    Ok(Stmt::Block(stmts))
}

fn process_stmt(pair: Pair<Rule>) -> Result<Stmt> {
    let span = pair.as_span();
    Ok(match pair.as_rule() {
        Rule::block => process_block(pair)?,
        Rule::if_stmt => {
            let mut pairs = pair.into_inner();
            let cond = process_expr(pairs.next().unwrap())?;
            let then = Box::new(process_stmt(pairs.next().unwrap())?);
            let els = match pairs.next() {
                Some(kw) => {
                    debug_assert_matches!(kw.as_rule(), Rule::else_kw);
                    Some(Box::new(process_stmt(pairs.next().unwrap())?))
                }
                None => None,
            };
            Stmt::If { cond, then, els }
        }
        Rule::while_stmt => {
            let mut pairs = pair.into_inner();
            let cond = process_expr(pairs.next().unwrap())?;
            let body = Box::new(process_stmt(pairs.next().unwrap())?);
            Stmt::While { cond, body }
        }
        Rule::do_stmt => {
            let mut pairs = pair.into_inner();
            let body = Box::new(process_stmt(pairs.next().unwrap())?);
            let cond = process_expr(pairs.next().unwrap())?;
            Stmt::DoWhile { body, cond }
        }
        Rule::for_stmt => {
            let mut pairs = pair.into_inner();
            let init = pairs.next().unwrap();
            let cond = pairs.next().unwrap();
            let step = pairs.next().unwrap();
            let body = Box::new(process_stmt(pairs.next().unwrap())?);
            let init = match init.into_inner().next() {
                Some(i) => Some(Box::new(match i.as_rule() {
                    Rule::for_decl => Stmt::Decl(process_declaration(i)?),
                    Rule::expr => Stmt::Expr(process_expr(i)?),
                    _ => unreachable!(),
                })),
                None => None,
            };
            let cond = match cond.into_inner().next() {
                Some(e) => Some(process_expr(e)?),
                None => None,
            };
            let step = match step.into_inner().next() {
                Some(e) => Some(process_expr(e)?),
                None => None,
            };
            Stmt::For {
                init,
                cond,
                step,
                body,
            }
        }
        Rule::break_stmt => Stmt::Break(span),
        Rule::continue_stmt => Stmt::Continue(span),
        Rule::return_stmt => {
            let value = match pair.into_inner().next() {
                Some(e) => Some(process_expr(e)?),
                None => None,
            };
            Stmt::Return { value }
        }
        Rule::goto_stmt => {
            let label = pair.into_inner().next().unwrap().as_str();
            Stmt::Goto { label, span }
        }
        Rule::labeled_stmt => {
            let mut pairs = pair.into_inner();
            let name = pairs.next().unwrap().as_str();
            let stmt = Box::new(process_stmt(pairs.next().unwrap())?);
            Stmt::Label { name, stmt, span }
        }
        Rule::declaration => Stmt::Decl(process_declaration(pair)?),
        Rule::expr_stmt => Stmt::Expr(process_expr(pair.into_inner().next().unwrap())?),
        Rule::empty_stmt => Stmt::Empty,
        _ => unreachable!(),
    })
}

fn process_expr(pair: Pair<Rule>) -> Result<Expr> {
    debug_assert_matches!(pair.as_rule(), Rule::expr);
    let inner = pair.into_inner().next().unwrap();
    match inner.as_rule() {
        Rule::assignment => {
            let span = inner.as_span();
            let mut pairs = inner.into_inner();
            let name = pairs.next().unwrap().as_str();
            let op = pairs.next().unwrap().as_str();
            let value = Box::new(process_expr(pairs.next().unwrap())?);
            Ok(Expr::Assign {
                name,
                op,
                value,
                span,
            })
        }
        Rule::binary => process_binary(inner),
        _ => unreachable!(),
    }
}

fn process_binary(pair: Pair<Rule>) -> Result<Expr> {
    CLIMBER.climb(
        pair.into_inner(),
        process_unary,
        |lhs: Result<Expr>, op: Pair<Rule>, rhs: Result<Expr>| {
            let lhs = lhs?;
            let rhs = rhs?;
            let span = lhs.span().start_pos().span(&rhs.span().end_pos());
            Ok(Expr::Binary {
                op: op.as_str(),
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
                span,
            })
        },
    )
}

fn process_unary(pair: Pair<Rule>) -> Result<Expr> {
    debug_assert_matches!(pair.as_rule(), Rule::unary);
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let first = pairs.next().unwrap();
    match first.as_rule() {
        Rule::incdec_prefix => {
            let mut inner = first.into_inner();
            let op = inner.next().unwrap().as_str();
            let name = inner.next().unwrap().as_str();
            Ok(Expr::IncDec {
                op,
                name,
                postfix: false,
                span,
            })
        }
        Rule::unary_op => {
            let expr = Box::new(process_unary(pairs.next().unwrap())?);
            Ok(Expr::Unary {
                op: first.as_str(),
                expr,
                span,
            })
        }
        Rule::postfix => process_postfix(first),
        _ => unreachable!(),
    }
}

fn process_postfix(pair: Pair<Rule>) -> Result<Expr> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let first = pairs.next().unwrap();
    let primary = match first.as_rule() {
        Rule::call => process_call(first)?,
        Rule::ident => Expr::Ident {
            name: first.as_str(),
            span: first.as_span(),
        },
        Rule::number => Expr::Num {
            text: first.as_str(),
            span: first.as_span(),
        },
        Rule::string => {
            let str_span = first.as_span();
            Expr::Str {
                text: first.into_inner().next().unwrap().as_str(),
                span: str_span,
            }
        }
        Rule::expr => process_expr(first)?,
        _ => unreachable!(),
    };
    match pairs.next() {
        Some(incdec) => match primary {
            Expr::Ident { name, .. } => Ok(Expr::IncDec {
                op: incdec.as_str(),
                name,
                postfix: true,
                span,
            }),
            _ => Err(new_parser_error(
                span,
                "`++`/`--` target must be a variable".to_owned(),
            )),
        },
        None => Ok(primary),
    }
}

fn process_call(pair: Pair<Rule>) -> Result<Expr> {
    let span = pair.as_span();
    let mut pairs = pair.into_inner();
    let name = pairs.next().unwrap().as_str();
    let mut args = Vec::new();
    if let Some(list) = pairs.next() {
        for arg in list.into_inner() {
            args.push(process_expr(arg)?);
        }
    }
    Ok(Expr::Call { name, args, span })
}
