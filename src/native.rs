//! Host functions seeded into the global environment.

use chrono::Utc;
use log::debug;

use crate::environment::Environment;
use crate::error::Result;
use crate::value::{Callable, NativeFunction, Value};

/// `clock()`: seconds since the Unix epoch, with sub-second precision.
fn clock<'a>(_args: &[Value<'a>]) -> Result<Value<'a>> {
    let micros = Utc::now().timestamp_micros();
    let seconds = micros as f64 / 1_000_000.0;

    debug!("clock() returned {}", seconds);

    Ok(Value::Number(seconds))
}

/// Bind every native function into `globals`.
pub fn define_natives<'a>(globals: &mut Environment<'a>) {
    globals.define(
        "clock",
        Value::Callable(Callable::Native(NativeFunction {
            name: "clock",
            arity: 0,
            func: clock,
        })),
    );
}
