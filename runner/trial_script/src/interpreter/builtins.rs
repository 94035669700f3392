//! Builtin functions. Scripts cannot define their own.

use crate::capability::Capabilities;
use crate::errors::{ExecResult, RuntimeErrorKind};
use crate::value::Value;

use super::type_mismatch;

pub(super) fn call(caps: &mut Capabilities, name: &str, args: &[Value]) -> ExecResult<Value> {
    match name {
        "print" => {
            let line = args
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(" ");
            caps.print(&line);
            Ok(Value::Nil)
        }
        "printed" => {
            arity(name, args, 0)?;
            Ok(Value::str(caps.printed()))
        }
        "random" => {
            arity(name, args, 1)?;
            match &args[0] {
                Value::Int(bound) => Ok(Value::Int(caps.random(*bound)?)),
                other => Err(type_mismatch("int", other)),
            }
        }
        "now" => {
            arity(name, args, 0)?;
            Ok(Value::Int(caps.now()))
        }
        "len" => {
            arity(name, args, 1)?;
            match &args[0] {
                Value::Str(s) => Ok(Value::Int(
                    i64::try_from(s.chars().count()).unwrap_or(i64::MAX),
                )),
                other => Err(type_mismatch("string", other)),
            }
        }
        "str" => {
            arity(name, args, 1)?;
            Ok(Value::str(&args[0].to_string()))
        }
        _ => Err(RuntimeErrorKind::UnknownFunction {
            name: name.to_string(),
        }
        .into()),
    }
}

fn arity(name: &str, args: &[Value], expected: usize) -> ExecResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RuntimeErrorKind::ArityMismatch {
            name: name.to_string(),
            expected,
            got: args.len(),
        }
        .into())
    }
}
