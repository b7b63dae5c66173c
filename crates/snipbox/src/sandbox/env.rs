//! Snippet environment
//!
//! Snippets never see the interpreter's real globals. Each run compiles the
//! chunk against a fresh table holding a whitelist of safe functions and
//! libraries, plus the output interceptor bound as `print` and `console.*`.
//! The Lua-side guards in `prelude.lua` call back into Rust through a small
//! host table.

use std::cell::RefCell;
use std::rc::Rc;

use mlua::{Function, Lua, StdLib, Table, Value, Variadic};

use crate::config::OutputConfig;
use crate::output::{OutputFormat, OutputSink, SinkError, render_arg};
use crate::sandbox::budget::{Breach, BreachCell, Meter};
use crate::sandbox::patterns;

const PRELUDE: &str = include_str!("prelude.lua");

/// Message Lua uses for allocation failures
const OUT_OF_MEMORY: &str = "not enough memory";

/// Base functions and libraries copied into the environment as-is
const SAFE_GLOBALS: &[&str] = &[
    "assert",
    "error",
    "getmetatable",
    "ipairs",
    "next",
    "pairs",
    "rawequal",
    "rawget",
    "rawlen",
    "rawset",
    "select",
    "setmetatable",
    "tonumber",
    "tostring",
    "type",
    "_VERSION",
    "math",
    "string",
    "table",
    "utf8",
];

/// Entries of `console` that print exactly like `print`
const CONSOLE_METHODS: &[&str] = &["log", "info", "warn"];

/// Standard libraries opened in a sandbox interpreter. No io, os, package or debug.
pub fn sandbox_libs() -> StdLib {
    StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE
}

/// A built snippet environment
pub struct Environment<'lua> {
    /// Globals table the chunk is compiled against
    pub table: Table<'lua>,

    /// Calls a compiled chunk; raised values come back as readable errors
    pub run: Function<'lua>,
}

/// Build the environment a snippet chunk runs in
pub fn build<'lua>(
    lua: &'lua Lua,
    sink: Rc<RefCell<OutputSink>>,
    meter: Meter,
    output: &OutputConfig,
) -> mlua::Result<Environment<'lua>> {
    let globals = lua.globals();
    let table = lua.create_table()?;
    for name in SAFE_GLOBALS {
        table.set(*name, globals.get::<_, Value>(*name)?)?;
    }

    let breach = meter.breach();
    let guards = prelude(lua, meter)?;
    table.set("pcall", guards.get::<_, Function>("pcall")?)?;
    table.set("xpcall", guards.get::<_, Function>("xpcall")?)?;

    let coroutine = lua.create_table()?;
    for pair in globals.get::<_, Table>("coroutine")?.pairs::<Value, Value>() {
        let (key, value) = pair?;
        coroutine.set(key, value)?;
    }
    coroutine.set("resume", guards.get::<_, Function>("resume")?)?;
    coroutine.set("wrap", guards.get::<_, Function>("wrap")?)?;
    table.set("coroutine", coroutine)?;

    let print = interceptor(lua, Rc::clone(&sink), Rc::clone(&breach), None)?;
    let console = lua.create_table()?;
    for method in CONSOLE_METHODS {
        console.set(*method, print.clone())?;
    }
    console.set(
        "error",
        interceptor(lua, sink, breach, Some(output.error_tag.clone()))?,
    )?;
    table.set("print", print)?;
    table.set("console", console)?;
    table.set("_G", table.clone())?;

    if output.strict_globals {
        let meta = lua.create_table()?;
        meta.set("__index", guards.get::<_, Function>("undefined")?)?;
        table.set_metatable(Some(meta));
    }

    Ok(Environment {
        table,
        run: guards.get("run")?,
    })
}

/// Load the Lua-side guards: breach-aware `pcall`/`xpcall`, metered
/// coroutines, the strict-globals handler and the chunk runner. Loading
/// also puts the cost check in front of the string library's matchers.
fn prelude<'lua>(lua: &'lua Lua, meter: Meter) -> mlua::Result<Table<'lua>> {
    let host = lua.create_table()?;

    let breach = meter.breach();
    host.set(
        "breached",
        lua.create_function(move |_, ()| Ok(breach.get().map(|tripped| tripped.to_string())))?,
    )?;
    host.set(
        "arm",
        lua.create_function(move |_, thread: Value| {
            if let Value::Thread(thread) = thread {
                meter.attach(&thread);
            }
            Ok(())
        })?,
    )?;
    host.set("describe", lua.create_function(describe)?)?;
    host.set(
        "out_of_memory",
        lua.create_function(|_, ()| {
            Err::<(), _>(mlua::Error::MemoryError(OUT_OF_MEMORY.to_string()))
        })?,
    )?;
    host.set(
        "check_pattern",
        lua.create_function(|_, (subject, pattern): (Value, Value)| {
            if let (Value::String(subject), Value::String(pattern)) = (&subject, &pattern) {
                patterns::check(subject.as_bytes().len(), pattern.as_bytes())
                    .map_err(mlua::Error::RuntimeError)?;
            }
            Ok(())
        })?,
    )?;

    lua.load(PRELUDE).set_name("=prelude").call(host)
}

/// Turn a raised value into something worth printing. Strings and host
/// errors pass through; anything else is rendered as JSON so the message
/// never carries a heap address.
fn describe<'lua>(lua: &'lua Lua, value: Value<'lua>) -> mlua::Result<Value<'lua>> {
    match value {
        Value::String(_) | Value::Error(_) | Value::UserData(_) => Ok(value),
        other => {
            let text = render_arg(&other, OutputFormat::Json)
                .unwrap_or_else(|_| other.type_name().to_string());
            lua.create_string(&text).map(Value::String)
        }
    }
}

/// The diagnostic-call interceptor: one call, one line in the sink
fn interceptor<'lua>(
    lua: &'lua Lua,
    sink: Rc<RefCell<OutputSink>>,
    breach: BreachCell,
    prefix: Option<String>,
) -> mlua::Result<Function<'lua>> {
    lua.create_function(move |_, args: Variadic<Value>| {
        let recorded = match &prefix {
            Some(prefix) => sink.borrow_mut().record_prefixed(prefix, &args),
            None => sink.borrow_mut().record(&args),
        };
        if let Err(SinkError::LimitExceeded(limit)) = &recorded
            && breach.get().is_none()
        {
            breach.set(Some(Breach::OutputLines(*limit)));
        }
        recorded.map_err(mlua::Error::external)
    })
}
