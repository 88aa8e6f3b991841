//! Line-oriented parser for control scripts.
//!
//! Each source line is split with `shell-words`, so quoting groups words the
//! way a shell would. Blocks (`def`, `repeat`, `loop`, `while`, `if`) close
//! with `end`.
use super::value::{parse_number, Value};
use anyhow::{anyhow, Context, Result};
use std::rc::Rc;

/// Deepest allowed nesting of `def`, loop and `if` blocks.
pub const MAX_BLOCK_DEPTH: usize = 32;

/// A parsed operand.
#[derive(Debug, Clone, PartialEq)]
pub enum Atom {
    Literal(Value),
    /// `$name`
    Var(String),
    /// A bare word. Calls the named operation when it names one in an
    /// expression position, otherwise it is text.
    Word(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub key: Option<String>,
    pub value: Atom,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: String,
    pub args: Vec<Arg>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Call(Call),
    Atom(Atom),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
}

impl CmpOp {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "==" => CmpOp::Eq,
            "!=" => CmpOp::Ne,
            "<" => CmpOp::Lt,
            ">" => CmpOp::Gt,
            "<=" => CmpOp::Le,
            ">=" => CmpOp::Ge,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    Truthy(Atom),
    Not(Atom),
    Compare(Atom, CmpOp, Atom),
}

#[derive(Debug)]
pub enum Stmt {
    Let { name: String, expr: Expr },
    Call(Call),
    Def { name: String, body: Rc<[Node]> },
    Repeat { count: Atom, body: Vec<Node> },
    Loop { body: Vec<Node> },
    While { cond: Cond, body: Vec<Node> },
    If { cond: Cond, then: Vec<Node>, otherwise: Vec<Node> },
    Break,
    Return(Option<Atom>),
}

/// A statement tagged with its line number in the original file.
#[derive(Debug)]
pub struct Node {
    pub line: usize,
    pub stmt: Stmt,
}

#[derive(Debug, Default)]
pub struct Program {
    pub body: Vec<Node>,
}

struct SourceLine {
    number: usize,
    tokens: Vec<String>,
}

#[derive(Clone, Copy, Default)]
struct BlockContext {
    in_loop: bool,
    in_def: bool,
    depth: usize,
}

enum Terminator {
    End,
    Else,
    Eof,
}

/// Parse `text`, numbering lines from `first_line`.
pub fn parse_program(text: &str, first_line: usize) -> Result<Program> {
    let lines = tokenize(text, first_line)?;
    let mut cursor = 0;
    let (body, terminator) = parse_block(&lines, &mut cursor, BlockContext::default())?;
    match terminator {
        Terminator::Eof => Ok(Program { body }),
        Terminator::End | Terminator::Else => {
            let line = lines[cursor - 1].number;
            Err(anyhow!(
                "line {line}: `{}` without an open block",
                lines[cursor - 1].tokens[0]
            ))
        }
    }
}

fn tokenize(text: &str, first_line: usize) -> Result<Vec<SourceLine>> {
    let mut lines = Vec::new();
    for (offset, raw) in text.lines().enumerate() {
        let number = first_line + offset;
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        // shell-words drops unquoted `#` comments itself
        let tokens =
            shell_words::split(trimmed).with_context(|| format!("line {number}: tokenize"))?;
        if !tokens.is_empty() {
            lines.push(SourceLine { number, tokens });
        }
    }
    Ok(lines)
}

fn parse_block(
    lines: &[SourceLine],
    cursor: &mut usize,
    ctx: BlockContext,
) -> Result<(Vec<Node>, Terminator)> {
    let mut nodes = Vec::new();
    while let Some(line) = lines.get(*cursor) {
        *cursor += 1;
        let head = line.tokens[0].as_str();
        let rest = &line.tokens[1..];
        let number = line.number;
        let stmt = match head {
            "end" => {
                expect_arity(number, "end", rest, 0)?;
                return Ok((nodes, Terminator::End));
            }
            "else" => {
                expect_arity(number, "else", rest, 0)?;
                return Ok((nodes, Terminator::Else));
            }
            "let" => parse_let(number, rest)?,
            "def" => {
                expect_arity(number, "def", rest, 1)?;
                let name = identifier(number, &rest[0])?;
                let inner = BlockContext {
                    in_loop: false,
                    in_def: true,
                    ..nested(ctx, number, "def")?
                };
                let body = parse_closed_block(lines, cursor, inner, number, "def")?;
                Stmt::Def {
                    name,
                    body: Rc::from(body),
                }
            }
            "repeat" => {
                expect_arity(number, "repeat", rest, 1)?;
                let count = parse_atom(&rest[0]);
                let inner = loop_ctx(nested(ctx, number, "repeat")?);
                let body = parse_closed_block(lines, cursor, inner, number, "repeat")?;
                Stmt::Repeat { count, body }
            }
            "loop" => {
                expect_arity(number, "loop", rest, 0)?;
                let inner = loop_ctx(nested(ctx, number, "loop")?);
                let body = parse_closed_block(lines, cursor, inner, number, "loop")?;
                Stmt::Loop { body }
            }
            "while" => {
                let cond = parse_cond(number, rest)?;
                let inner = loop_ctx(nested(ctx, number, "while")?);
                let body = parse_closed_block(lines, cursor, inner, number, "while")?;
                Stmt::While { cond, body }
            }
            "if" => {
                let cond = parse_cond(number, rest)?;
                let inner = nested(ctx, number, "if")?;
                let (then, terminator) = parse_block(lines, cursor, inner)?;
                let otherwise = match terminator {
                    Terminator::End => Vec::new(),
                    Terminator::Else => parse_closed_block(lines, cursor, inner, number, "if")?,
                    Terminator::Eof => return Err(unterminated(number, "if")),
                };
                Stmt::If {
                    cond,
                    then,
                    otherwise,
                }
            }
            "break" => {
                expect_arity(number, "break", rest, 0)?;
                if !ctx.in_loop {
                    return Err(anyhow!("line {number}: `break` outside a loop"));
                }
                Stmt::Break
            }
            "return" => {
                if !ctx.in_def {
                    return Err(anyhow!("line {number}: `return` outside a def"));
                }
                match rest {
                    [] => Stmt::Return(None),
                    [value] => Stmt::Return(Some(parse_atom(value))),
                    _ => return Err(anyhow!("line {number}: `return` takes at most one value")),
                }
            }
            _ => Stmt::Call(parse_call(number, &line.tokens)?),
        };
        nodes.push(Node { line: number, stmt });
    }
    Ok((nodes, Terminator::Eof))
}

/// Parse a block that must close with `end`; `else` is not allowed here.
fn parse_closed_block(
    lines: &[SourceLine],
    cursor: &mut usize,
    ctx: BlockContext,
    opened_at: usize,
    keyword: &str,
) -> Result<Vec<Node>> {
    let (body, terminator) = parse_block(lines, cursor, ctx)?;
    match terminator {
        Terminator::End => Ok(body),
        Terminator::Else => Err(anyhow!(
            "line {}: `else` inside `{keyword}` opened at line {opened_at}",
            lines[*cursor - 1].number
        )),
        Terminator::Eof => Err(unterminated(opened_at, keyword)),
    }
}

fn nested(ctx: BlockContext, line: usize, keyword: &str) -> Result<BlockContext> {
    if ctx.depth >= MAX_BLOCK_DEPTH {
        return Err(anyhow!(
            "line {line}: `{keyword}` nested deeper than {MAX_BLOCK_DEPTH} blocks"
        ));
    }
    Ok(BlockContext {
        depth: ctx.depth + 1,
        ..ctx
    })
}

fn loop_ctx(ctx: BlockContext) -> BlockContext {
    BlockContext {
        in_loop: true,
        ..ctx
    }
}

fn unterminated(line: usize, keyword: &str) -> anyhow::Error {
    anyhow!("line {line}: `{keyword}` block is missing `end`")
}

fn expect_arity(line: usize, keyword: &str, rest: &[String], count: usize) -> Result<()> {
    if rest.len() != count {
        return Err(anyhow!(
            "line {line}: `{keyword}` expects {count} argument(s), got {}",
            rest.len()
        ));
    }
    Ok(())
}

fn parse_let(line: usize, rest: &[String]) -> Result<Stmt> {
    let [name, eq, expr @ ..] = rest else {
        return Err(anyhow!("line {line}: expected `let NAME = VALUE`"));
    };
    if eq != "=" || expr.is_empty() {
        return Err(anyhow!("line {line}: expected `let NAME = VALUE`"));
    }
    let name = identifier(line, name)?;
    let expr = if expr.len() == 1 {
        Expr::Atom(parse_atom(&expr[0]))
    } else {
        Expr::Call(parse_call(line, expr)?)
    };
    Ok(Stmt::Let { name, expr })
}

fn parse_call(line: usize, tokens: &[String]) -> Result<Call> {
    let name = tokens[0].clone();
    if !is_identifier(&name) {
        return Err(anyhow!("line {line}: `{name}` is not a valid operation name"));
    }
    let args = tokens[1..].iter().map(String::as_str).map(parse_arg).collect();
    Ok(Call { name, args })
}

fn parse_arg(token: &str) -> Arg {
    if let Some((key, value)) = token.split_once('=') {
        if is_identifier(key) && !value.is_empty() {
            return Arg {
                key: Some(key.to_string()),
                value: parse_atom(value),
            };
        }
    }
    Arg {
        key: None,
        value: parse_atom(token),
    }
}

fn parse_cond(line: usize, rest: &[String]) -> Result<Cond> {
    match rest {
        [atom] => Ok(Cond::Truthy(parse_atom(atom))),
        [not, atom] if not == "not" => Ok(Cond::Not(parse_atom(atom))),
        [lhs, op, rhs] => {
            let op = CmpOp::from_token(op)
                .ok_or_else(|| anyhow!("line {line}: unknown comparison `{op}`"))?;
            Ok(Cond::Compare(parse_atom(lhs), op, parse_atom(rhs)))
        }
        _ => Err(anyhow!(
            "line {line}: expected `VALUE`, `not VALUE` or `VALUE OP VALUE`"
        )),
    }
}

pub fn parse_atom(token: &str) -> Atom {
    if let Some(name) = token.strip_prefix('$') {
        if is_identifier(name) {
            return Atom::Var(name.to_string());
        }
    }
    match token {
        "true" => return Atom::Literal(Value::Bool(true)),
        "false" => return Atom::Literal(Value::Bool(false)),
        "nil" => return Atom::Literal(Value::Nil),
        _ => {}
    }
    if let Some(number) = parse_number(token) {
        return Atom::Literal(Value::Number(number));
    }
    Atom::Word(token.to_string())
}

fn identifier(line: usize, token: &str) -> Result<String> {
    if !is_identifier(token) {
        return Err(anyhow!("line {line}: `{token}` is not a valid name"));
    }
    Ok(token.to_string())
}

fn is_identifier(token: &str) -> bool {
    let mut chars = token.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
