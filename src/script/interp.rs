use super::args::CallArgs;
use super::bindings;
use super::builtins;
use super::namespace::Namespace;
use super::parse::{Atom, Call, CmpOp, Cond, Expr, Node, Program, Stmt};
use super::value::Value;
use crate::sim::RobotApi;
use anyhow::{anyhow, Context, Result};
use std::io::Write;

/// Nesting limit for payload procedure calls.
const MAX_CALL_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    /// Abort after this many executed statements. `None` lets the payload
    /// run forever.
    pub max_steps: Option<u64>,
}

enum Flow {
    Next,
    Break,
    Return(Value),
}

/// Executes a parsed payload against an injected robot and namespace.
pub struct Interpreter<'a> {
    robot: &'a mut dyn RobotApi,
    ns: &'a mut Namespace,
    out: &'a mut dyn Write,
    limits: Limits,
    steps: u64,
    depth: usize,
}

impl<'a> Interpreter<'a> {
    pub fn new(
        robot: &'a mut dyn RobotApi,
        ns: &'a mut Namespace,
        out: &'a mut dyn Write,
        limits: Limits,
    ) -> Self {
        Self {
            robot,
            ns,
            out,
            limits,
            steps: 0,
            depth: 0,
        }
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Run the top level of `program`.
    pub fn run(&mut self, program: &Program) -> Result<()> {
        match self.exec_block(&program.body)? {
            Flow::Next => Ok(()),
            // parse rejects break/return at top level
            Flow::Break | Flow::Return(_) => Err(anyhow!("control flow escaped the payload")),
        }
    }

    /// Call a payload procedure with no arguments.
    pub fn call_procedure(&mut self, name: &str) -> Result<Value> {
        let body = self
            .ns
            .procedure(name)
            .ok_or_else(|| anyhow!("payload defines no `{name}`"))?;
        self.enter_procedure(name, &body)
    }

    fn exec_block(&mut self, nodes: &[Node]) -> Result<Flow> {
        for node in nodes {
            let flow = self
                .exec(node)
                .with_context(|| format!("payload line {}", node.line))?;
            if !matches!(flow, Flow::Next) {
                return Ok(flow);
            }
        }
        Ok(Flow::Next)
    }

    fn exec(&mut self, node: &Node) -> Result<Flow> {
        self.count_step()?;
        match &node.stmt {
            Stmt::Let { name, expr } => {
                let value = self.eval_expr(expr)?;
                self.ns.set(name, value);
            }
            Stmt::Call(call) => {
                self.call(call)?;
            }
            Stmt::Def { name, body } => {
                tracing::debug!(name = name.as_str(), line = node.line, "procedure defined");
                self.ns.define(name, body.clone());
            }
            Stmt::Repeat { count, body } => {
                let count = self.repeat_count(count)?;
                for _ in 0..count {
                    match self.exec_block(body)? {
                        Flow::Next => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            Stmt::Loop { body } => loop {
                match self.exec_block(body)? {
                    Flow::Next => self.count_step()?,
                    Flow::Break => break,
                    flow @ Flow::Return(_) => return Ok(flow),
                }
            },
            Stmt::While { cond, body } => {
                while self.eval_cond(cond)? {
                    match self.exec_block(body)? {
                        Flow::Next => self.count_step()?,
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                let branch = if self.eval_cond(cond)? { then } else { otherwise };
                return self.exec_block(branch);
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Return(value) => {
                let value = match value {
                    Some(atom) => self.eval_operand(atom)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn count_step(&mut self) -> Result<()> {
        self.steps += 1;
        match self.limits.max_steps {
            Some(max) if self.steps > max => Err(anyhow!("step limit of {max} exceeded")),
            _ => Ok(()),
        }
    }

    fn repeat_count(&mut self, atom: &Atom) -> Result<u64> {
        let value = self.eval_operand(atom)?;
        let count = value
            .as_number()
            .ok_or_else(|| anyhow!("`repeat` count must be a number, got `{value}`"))?;
        if count < 0.0 || count.fract() != 0.0 || !count.is_finite() {
            return Err(anyhow!("`repeat` count must be a whole number, got {count}"));
        }
        Ok(count as u64)
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Call(call) => self.call(call),
            Expr::Atom(atom) => self.eval_operand(atom),
        }
    }

    /// Evaluate an operand in expression position: a bare word that names
    /// an operation is called with no arguments.
    fn eval_operand(&mut self, atom: &Atom) -> Result<Value> {
        match atom {
            Atom::Word(word) if self.is_callable(word) => self.call_named(word, CallArgs::default()),
            _ => self.eval_atom(atom),
        }
    }

    fn eval_atom(&self, atom: &Atom) -> Result<Value> {
        match atom {
            Atom::Literal(value) => Ok(value.clone()),
            Atom::Var(name) => self
                .ns
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("undefined variable `${name}`")),
            Atom::Word(word) => Ok(Value::Text(word.clone())),
        }
    }

    fn eval_cond(&mut self, cond: &Cond) -> Result<bool> {
        match cond {
            Cond::Truthy(atom) => Ok(self.eval_operand(atom)?.is_truthy()),
            Cond::Not(atom) => Ok(!self.eval_operand(atom)?.is_truthy()),
            // bare words in comparisons are always text
            Cond::Compare(lhs, op, rhs) => {
                let lhs = self.eval_atom(lhs)?;
                let rhs = self.eval_atom(rhs)?;
                compare(&lhs, *op, &rhs)
            }
        }
    }

    fn is_callable(&self, name: &str) -> bool {
        self.ns.procedure(name).is_some()
            || builtins::is_builtin(name)
            || bindings::is_mock_operation(name)
    }

    fn call(&mut self, call: &Call) -> Result<Value> {
        let mut args = CallArgs::default();
        for arg in &call.args {
            let value = self.eval_atom(&arg.value)?;
            match &arg.key {
                Some(key) => {
                    args.keyword.insert(key.clone(), value);
                }
                None => args.positional.push(value),
            }
        }
        self.call_named(&call.name, args)
    }

    /// Resolve `name` in order: payload procedures, builtins, mock
    /// operations.
    fn call_named(&mut self, name: &str, args: CallArgs) -> Result<Value> {
        if let Some(body) = self.ns.procedure(name) {
            if !args.is_empty() {
                return Err(anyhow!("procedure `{name}` takes no arguments"));
            }
            return self.enter_procedure(name, &body);
        }
        if let Some(result) = builtins::invoke(name, &args, self.out) {
            return result;
        }
        if let Some(result) = bindings::invoke(self.robot, name, &args) {
            tracing::trace!(op = name, "mock operation");
            return result;
        }
        Err(anyhow!("unknown operation `{name}`"))
    }

    fn enter_procedure(&mut self, name: &str, body: &[Node]) -> Result<Value> {
        if self.depth >= MAX_CALL_DEPTH {
            return Err(anyhow!("call depth limit of {MAX_CALL_DEPTH} exceeded in `{name}`"));
        }
        self.depth += 1;
        let flow = self.exec_block(body);
        self.depth -= 1;
        let flow = flow.with_context(|| format!("in procedure `{name}`"))?;
        Ok(match flow {
            Flow::Return(value) => value,
            Flow::Next | Flow::Break => Value::Nil,
        })
    }
}

fn compare(lhs: &Value, op: CmpOp, rhs: &Value) -> Result<bool> {
    match op {
        CmpOp::Eq => return Ok(lhs.loosely_equals(rhs)),
        CmpOp::Ne => return Ok(!lhs.loosely_equals(rhs)),
        _ => {}
    }
    let (Some(a), Some(b)) = (lhs.as_number(), rhs.as_number()) else {
        return Err(anyhow!(
            "cannot order {} `{lhs}` and {} `{rhs}`",
            lhs.type_name(),
            rhs.type_name()
        ));
    };
    Ok(match op {
        CmpOp::Lt => a < b,
        CmpOp::Gt => a > b,
        CmpOp::Le => a <= b,
        CmpOp::Ge => a >= b,
        CmpOp::Eq | CmpOp::Ne => unreachable!("handled above"),
    })
}

#[cfg(test)]
#[path = "interp_tests.rs"]
mod tests;
