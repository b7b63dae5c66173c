use snipbox::config::{Config, ConfigError};
use snipbox::{OutputFormat, Sandbox};

use super::fixture_config;

#[test]
fn test_load_valid_config() {
    let config = Config::from_file(fixture_config("valid_full.toml")).expect("Failed to load config");

    assert!(config.topics.contains_key("basics"));
    assert_eq!(config.limits.timeout_ms, Some(500));
    assert_eq!(config.limits.max_output_lines, Some(100));
    assert_eq!(config.output.format, OutputFormat::Display);
    assert_eq!(config.output.error_tag, "Oops: ");
    assert!(!config.output.strict_globals);

    let topic = config.get_topic("basics").unwrap();
    assert_eq!(topic.examples.len(), 2);
    assert!(topic.example("broken").unwrap().expect_error);
}

#[test]
fn test_load_minimal_config() {
    let config =
        Config::from_file(fixture_config("valid_minimal.toml")).expect("Failed to load config");

    assert!(config.topics.contains_key("test"));
    assert_eq!(config.output.error_tag, "Error: ");
    assert_eq!(config.output.format, OutputFormat::Json);
    assert_eq!(
        config.effective_limits(None).timeout_ms,
        snipbox::ResourceLimits::default().timeout_ms
    );
}

#[test]
fn test_load_invalid_empty_title() {
    let result = Config::from_file(fixture_config("invalid_empty_title.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_duplicate_example() {
    let result = Config::from_file(fixture_config("invalid_duplicate_example.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_invalid_zero_limit() {
    let result = Config::from_file(fixture_config("invalid_zero_limit.toml"));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));
}

#[test]
fn test_load_missing_file() {
    let result = Config::from_file(fixture_config("does_not_exist.toml"));
    assert!(matches!(result, Err(ConfigError::Parse(_))));
}

#[test]
fn test_loaded_settings_reach_sandbox() {
    let config = Config::from_file(fixture_config("valid_full.toml")).unwrap();
    let sandbox = Sandbox::new(&config);

    let hello = config.get_example("basics", "hello").unwrap();
    assert_eq!(sandbox.execute(&hello.code).result.output(), Some("hello"));

    let broken = config.get_example("basics", "broken").unwrap();
    let result = sandbox.execute(&broken.code).result;
    assert!(result.text().starts_with("Oops: "));

    // Lenient globals read as nil
    assert_eq!(
        sandbox.execute("print(missing)").result.output(),
        Some("null")
    );
}
