use snipbox::{
    ExecutionResult, FailureKind, OutputConfig, OutputFormat, ResourceLimits, Sandbox,
};

use super::{expect_failure, fixture_source};

fn display() -> Sandbox {
    Sandbox::default().with_output(OutputConfig {
        format: OutputFormat::Display,
        ..OutputConfig::default()
    })
}

#[test]
fn test_print_arithmetic() {
    let result = Sandbox::default().execute("print(1+1)").result;
    assert_eq!(
        result,
        ExecutionResult::Success {
            output: "2".to_string()
        }
    );
}

#[test]
fn test_two_prints_json() {
    let result = Sandbox::default().execute("print('a'); print('b')").result;
    assert_eq!(result.output(), Some("\"a\"\n\"b\""));
}

#[test]
fn test_two_prints_display() {
    let result = display().execute("print('a'); print('b')").result;
    assert_eq!(result.output(), Some("a\nb"));
}

#[test]
fn test_raised_error() {
    let failure = expect_failure("error('boom')");
    assert_eq!(failure.message, "Error: boom");
    assert_eq!(failure.kind, FailureKind::Runtime);
}

#[test]
fn test_missing_end() {
    let failure = expect_failure("if true then");
    assert_eq!(failure.kind, FailureKind::Syntax);
    assert!(failure.message.starts_with("Error: "));
}

#[test]
fn test_no_output() {
    let result = Sandbox::default().execute("local x = 42").result;
    assert_eq!(result.output(), Some(""));
}

#[test]
fn test_calls_become_lines_in_order() {
    let result = Sandbox::default()
        .execute(&fixture_source("many_lines.lua"))
        .result;
    assert_eq!(
        result.output(),
        Some("\"line\" 1\n\"line\" 2\n\"line\" 3\n\"line\" 4\n\"line\" 5")
    );
}

#[test]
fn test_hello_fixture() {
    let result = display().execute(&fixture_source("hello.lua")).result;
    assert_eq!(result.output(), Some("Hello, World!"));
}

#[test]
fn test_syntax_error_fixture() {
    let failure = expect_failure(&fixture_source("syntax_error.lua"));
    assert_eq!(failure.kind, FailureKind::Syntax);
    assert!(failure.line.is_some());
}

#[test]
fn test_runtime_error_discards_output() {
    let failure = expect_failure(&fixture_source("runtime_error.lua"));
    assert_eq!(failure.kind, FailureKind::Runtime);
    assert_eq!(failure.line, Some(3));
    assert!(failure.message.starts_with("Error: attempt to index a nil value"));
    assert!(!failure.message.contains("before"));
}

#[test]
fn test_every_failure_starts_with_tag() {
    let sources = [
        "error('x')",
        "error({})",
        "error()",
        "local t = nil; t.x = 1",
        "print(undefinedName)",
        "return 1 +",
        "local t = {} t.t = t print(t)",
    ];
    for source in sources {
        let failure = expect_failure(source);
        assert!(
            failure.message.starts_with("Error: "),
            "{source}: {}",
            failure.message
        );
    }
}

#[test]
fn test_idempotent_runs() {
    let sandbox = Sandbox::default();
    let source = "local t = {z = 1, a = {2, 3}, m = 'x'} print(t) print(#t, 1.5, 2^10)";
    let first = sandbox.execute(source).result;
    for _ in 0..5 {
        assert_eq!(sandbox.execute(source).result, first);
    }
    assert_eq!(
        first.output(),
        Some("{\"a\":[2,3],\"m\":\"x\",\"z\":1}\n0 1.5 1024")
    );
}

#[test]
fn test_unbound_host_name_is_reference_error() {
    let failure = expect_failure("print(document.title)");
    assert_eq!(failure.kind, FailureKind::Runtime);
    assert_eq!(failure.message, "Error: document is not defined");
    assert_eq!(failure.line, Some(1));
}

#[test]
fn test_host_libraries_are_unreachable() {
    let failure = expect_failure(&fixture_source("escape_attempt.lua"));
    assert_eq!(failure.message, "Error: io is not defined");

    let lenient = Sandbox::default().with_output(OutputConfig {
        strict_globals: false,
        ..OutputConfig::default()
    });
    let result = lenient.execute(&fixture_source("escape_attempt.lua")).result;
    assert_eq!(result.output(), Some("{}"));
}

#[test]
fn test_no_leakage_between_runs() {
    let sandbox = Sandbox::default();
    assert_eq!(sandbox.execute("print('x')").result.output(), Some("\"x\""));
    assert_eq!(sandbox.execute("local y = 1").result.output(), Some(""));

    let first = sandbox
        .execute("shared = 'secret' string.leak = true print(shared)")
        .result;
    assert_eq!(first.output(), Some("\"secret\""));

    let second = sandbox.execute("print(string.leak == nil)").result;
    assert_eq!(second.output(), Some("true"));

    let third = sandbox.execute("print(shared)").result;
    assert_eq!(
        third.failure().map(|f| f.message.as_str()),
        Some("Error: shared is not defined")
    );
}

#[test]
fn test_infinite_loop_times_out() {
    let sandbox =
        Sandbox::default().with_limits(ResourceLimits::default().with_timeout_ms(100));
    let result = sandbox.execute(&fixture_source("infinite_loop.lua")).result;
    let failure = result.failure().expect("loop should fail");
    assert_eq!(failure.kind, FailureKind::Timeout);
    assert_eq!(failure.message, "Error: time limit of 100 ms exceeded");
}

#[test]
fn test_pcall_cannot_swallow_timeout() {
    let sandbox =
        Sandbox::default().with_limits(ResourceLimits::default().with_timeout_ms(100));
    let result = sandbox.execute(&fixture_source("swallow_timeout.lua")).result;
    assert_eq!(
        result.failure().map(|f| f.kind),
        Some(FailureKind::Timeout)
    );
}

#[test]
fn test_coroutine_cannot_swallow_timeout() {
    let sandbox = Sandbox::default()
        .with_limits(ResourceLimits::default().with_instruction_limit(100_000));
    let source = "
        local co = coroutine.create(function() while true do end end)
        while true do coroutine.resume(co) end
    ";
    let result = sandbox.execute(source).result;
    assert_eq!(
        result.failure().map(|f| f.kind),
        Some(FailureKind::Timeout)
    );
}

#[test]
fn test_wrapped_coroutine_times_out() {
    let sandbox =
        Sandbox::default().with_limits(ResourceLimits::default().with_timeout_ms(50));
    let failure = sandbox
        .execute("coroutine.wrap(function() while true do end end)()")
        .result;
    assert_eq!(failure.text(), "Error: time limit of 50 ms exceeded");
}

#[test]
fn test_backtracking_pattern_is_refused() {
    let failure = expect_failure("print(string.find(string.rep('a', 300), '.-.-.-b'))");
    assert_eq!(failure.kind, FailureKind::Runtime);
    assert_eq!(
        failure.message,
        "Error: pattern '.-.-.-b' is too expensive to match against 300 bytes"
    );
}

#[test]
fn test_raised_table_message_is_stable() {
    let source = "error({code = 1, reason = 'bad'})";
    let first = expect_failure(source);
    assert_eq!(first.message, "Error: {\"code\":1,\"reason\":\"bad\"}");
    assert_eq!(first, expect_failure(source));
}

#[test]
fn test_message_with_colon_number_is_kept() {
    let failure = expect_failure("error('http://x:80: y', 0)");
    assert_eq!(failure.message, "Error: http://x:80: y");
    assert_eq!(failure.line, None);
}

#[test]
fn test_console_error_line_is_tagged() {
    let result = Sandbox::default()
        .execute("console.log('ok') console.error('bad')")
        .result;
    assert_eq!(result.output(), Some("\"ok\"\nError: \"bad\""));
}

#[test]
fn test_output_limit() {
    let sandbox =
        Sandbox::default().with_limits(ResourceLimits::default().with_max_output_lines(10));
    let failure = sandbox.execute("while true do print('x') end").result;
    assert_eq!(
        failure.text(),
        "Error: output limit of 10 lines exceeded"
    );
}

#[test]
fn test_memory_limit() {
    let sandbox = Sandbox::default()
        .with_limits(ResourceLimits::default().with_memory_limit(2 * ResourceLimits::MIB));
    let result = sandbox
        .execute("local parts = {} while true do parts[#parts + 1] = string.rep('y', 1024) end")
        .result;
    assert_eq!(
        result.failure().map(|f| f.kind),
        Some(FailureKind::MemoryLimit)
    );
}

#[test]
fn test_source_size_limit() {
    let sandbox =
        Sandbox::default().with_limits(ResourceLimits::default().with_max_source_bytes(16));
    let failure = sandbox.execute("print('this source is too long')").result;
    let failure = failure.failure().expect("source should be rejected");
    assert_eq!(failure.kind, FailureKind::Rejected);
    assert_eq!(failure.message, "Error: source is 32 bytes, limit is 16");
}

#[test]
fn test_render_values() {
    let result = Sandbox::default()
        .execute("print(nil, true, 3, 2.0, 0.5, 'q\"', {}, {1, nil, 3}, print)")
        .result;
    assert_eq!(
        result.output(),
        Some("null true 3 2 0.5 \"q\\\"\" {} {\"1\":1,\"3\":3} null")
    );
}

#[test]
fn test_functions_in_tables() {
    let result = Sandbox::default()
        .execute("print({1, print, 3}, {f = print, n = 1})")
        .result;
    assert_eq!(result.output(), Some("[1,null,3] {\"n\":1}"));
}

#[test]
fn test_shared_sandbox_across_threads() {
    let sandbox = Sandbox::default();
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let sandbox = sandbox.clone();
            std::thread::spawn(move || sandbox.execute(&format!("print({i} * 10)")).result)
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let result = handle.join().unwrap();
        let expected = (i * 10).to_string();
        assert_eq!(result.output(), Some(expected.as_str()));
    }
}
