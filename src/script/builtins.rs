//! Helpers available to every payload alongside the mock operations.
use super::args::CallArgs;
use super::value::Value;
use crate::sim::{Detection, Observation};
use anyhow::{anyhow, Result};
use std::io::Write;

pub const BUILTINS: &[&str] = &[
    "print",
    "fail",
    "add",
    "sub",
    "count",
    "label",
    "position",
    "confidence",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Run builtin `name`. Returns `None` when no such builtin exists.
pub fn invoke(name: &str, args: &CallArgs, out: &mut dyn Write) -> Option<Result<Value>> {
    let result = match name {
        "print" => print(args, out),
        "fail" => Err(anyhow!("payload failed: {}", join(args))),
        "add" => arithmetic(name, args, |a, b| a + b),
        "sub" => arithmetic(name, args, |a, b| a - b),
        "count" => observation(name, args).map(|obs| Value::Number(obs.detections.len() as f64)),
        "label" => detection(name, args).map(|d| Value::Text(d.label.clone())),
        "position" => detection(name, args).map(|d| Value::Number(d.x)),
        "confidence" => detection(name, args).map(|d| Value::Number(d.confidence)),
        _ => return None,
    };
    Some(result)
}

fn join(args: &CallArgs) -> String {
    let positional = args.positional.iter().map(Value::to_string);
    let keyword = args.keyword.iter().map(|(k, v)| format!("{k}={v}"));
    positional.chain(keyword).collect::<Vec<_>>().join(" ")
}

fn print(args: &CallArgs, out: &mut dyn Write) -> Result<Value> {
    writeln!(out, "{}", join(args))?;
    Ok(Value::Nil)
}

fn arithmetic(name: &str, args: &CallArgs, op: impl Fn(f64, f64) -> f64) -> Result<Value> {
    args.expect_at_most(name, 2, &[])?;
    let a = args.required_number(name, 0, &["lhs"])?;
    let b = args.required_number(name, 1, &["rhs"])?;
    Ok(Value::Number(op(a, b)))
}

fn observation<'a>(name: &str, args: &'a CallArgs) -> Result<&'a Observation> {
    args.expect_at_most(name, 2, &[])?;
    match args.required(name, 0, "observation")? {
        Value::Observation(obs) => Ok(obs),
        other => Err(anyhow!(
            "`{name}` expects an observation, got {} `{other}`",
            other.type_name()
        )),
    }
}

/// `NAME OBSERVATION [INDEX]`, index defaulting to the first detection.
fn detection<'a>(name: &str, args: &'a CallArgs) -> Result<&'a Detection> {
    let obs = observation(name, args)?;
    let index = args.number(name, 1, &["index"])?.unwrap_or(0.0);
    if index < 0.0 || index.fract() != 0.0 {
        return Err(anyhow!("`{name}` index must be a whole number, got {index}"));
    }
    obs.detections.get(index as usize).ok_or_else(|| {
        anyhow!(
            "`{name}` index {index} out of range for {} detection(s)",
            obs.detections.len()
        )
    })
}
