use snipbox::{ConfigError, FailureKind, ResourceLimits, Runner, RunnerError};

use super::fixture_source;

#[tokio::test]
async fn test_run_source() {
    let runner = Runner::with_defaults();
    let execution = runner
        .run(fixture_source("many_lines.lua"), None)
        .await
        .expect("run failed");
    assert_eq!(execution.stats.output_lines, 5);
    assert!(execution.result.is_success());
}

#[tokio::test]
async fn test_run_example() {
    let runner = Runner::with_defaults();
    let execution = runner
        .run_example("closures", "Counter", None)
        .await
        .expect("run failed");
    assert_eq!(execution.result.output(), Some("1\n2\n3"));
}

#[tokio::test]
async fn test_run_unknown_topic() {
    let runner = Runner::with_defaults();
    let result = runner.run_example("missing", "counter", None).await;
    assert!(matches!(
        result,
        Err(RunnerError::Config(ConfigError::TopicNotFound(_)))
    ));
}

#[tokio::test]
async fn test_concurrent_runs() {
    let runner = Runner::with_defaults();
    let limits = ResourceLimits::unset().with_timeout_ms(50);

    let (looping, quick) = tokio::join!(
        runner.run(fixture_source("infinite_loop.lua"), Some(&limits)),
        runner.run("print('quick')".to_string(), None),
    );

    assert_eq!(
        looping.unwrap().result.failure().map(|f| f.kind),
        Some(FailureKind::Timeout)
    );
    assert_eq!(quick.unwrap().result.output(), Some("\"quick\""));
}
