//! Snipbox CLI
//!
//! A command-line tool for running Lua snippets in a sandbox and browsing the
//! topic catalog.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use snipbox::{
    Config, EXAMPLE_CONFIG, ExecutionResult, OutputFormat, Playground, ResourceLimits, RunState,
    Runner, Snippet, SnippetId,
};
use tracing::{Level, debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snipbox")]
#[command(about = "Run code snippets in a sandbox")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new configuration file
    Init {
        /// Output path (default: snipbox.toml)
        #[arg(short, long, default_value = "snipbox.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(short, long)]
        force: bool,
    },

    /// Run a snippet file
    Run {
        /// Source file to run
        #[arg(value_name = "FILE")]
        source: PathBuf,

        /// Output format (default: from configuration)
        #[arg(short, long)]
        format: Option<Format>,

        /// Time limit in milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
    },

    /// List topics and their examples
    Topics,

    /// Show a topic and the code of its examples
    Show {
        /// Topic ID (e.g., closures)
        topic: String,
    },

    /// Run an example from the catalog
    Example {
        /// Topic ID (e.g., closures)
        topic: String,

        /// Example name or slug (e.g., counter)
        example: String,
    },

    /// Edit and run a snippet interactively
    Repl,

    /// Show effective configuration
    ShowConfig,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Display,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Display => OutputFormat::Display,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::from_default_env().add_directive(Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load configuration
    let mut config = if let Some(ref path) = cli.config {
        info!(?path, "loading configuration");
        Config::from_file(path).context("failed to load configuration")?
    } else {
        debug!("using default configuration");
        Config::default()
    };

    match cli.command {
        Commands::Init { output, force } => init_config(&output, force).await,
        Commands::Run {
            source,
            format,
            timeout_ms,
        } => {
            if let Some(format) = format {
                config.output.format = format.into();
            }
            run_file(config, &source, timeout_ms).await
        }
        Commands::Topics => {
            list_topics(&config);
            Ok(())
        }
        Commands::Show { topic } => show_topic(&config, &topic),
        Commands::Example { topic, example } => run_example(config, &topic, &example).await,
        Commands::Repl => repl(config),
        Commands::ShowConfig => {
            show_config(&config);
            Ok(())
        }
    }
}

async fn run_file(config: Config, source: &Path, timeout_ms: Option<u64>) -> Result<()> {
    let source_content = tokio::fs::read(source)
        .await
        .context("failed to read source file")?;
    let source_content = String::from_utf8(source_content).context("source is not UTF-8")?;

    // Only include explicitly-specified values so they don't override the configured limits
    let user_limits = timeout_ms.map(|ms| ResourceLimits::unset().with_timeout_ms(ms));

    info!(path = %source.display(), "running snippet");
    let runner = Runner::new(config);
    let execution = runner
        .run(source_content, user_limits.as_ref())
        .await
        .context("run failed")?;

    report(&execution.result);
    Ok(())
}

async fn run_example(config: Config, topic: &str, example: &str) -> Result<()> {
    let runner = Runner::new(config);
    let execution = runner
        .run_example(topic, example, None)
        .await
        .context("failed to run example")?;

    report(&execution.result);
    Ok(())
}

/// Print the output on stdout, or the failure on stderr and exit with 1
fn report(result: &ExecutionResult) {
    match result {
        ExecutionResult::Success { output } => {
            if !output.is_empty() {
                println!("{output}");
            }
        }
        ExecutionResult::Failure(failure) => {
            debug!(kind = %failure.kind, line = ?failure.line, "snippet failed");
            match failure.line {
                Some(line) => eprintln!("{} (line {line})", failure.message),
                None => eprintln!("{}", failure.message),
            }
            std::process::exit(1);
        }
    }
}

fn list_topics(config: &Config) {
    println!("Available topics:\n");

    for (id, topic) in &config.topics {
        println!("  {:<18} {}", id, topic.title);
        for example in &topic.examples {
            let marker = if example.expect_error {
                " (fails)"
            } else {
                ""
            };
            println!("      {:<32} {}{}", example.slug(), example.name, marker);
        }
    }
}

fn show_topic(config: &Config, topic_id: &str) -> Result<()> {
    let topic = config.get_topic(topic_id).context("unknown topic")?;

    println!("# {}\n", topic.title);
    if !topic.summary.is_empty() {
        println!("{}\n", topic.summary.trim());
    }

    for example in &topic.examples {
        println!("## {}", example.name);
        if !example.description.is_empty() {
            println!("{}", example.description.trim());
        }
        println!("\n{}\n", example.code.trim_end());
    }
    Ok(())
}

fn repl(config: Config) -> Result<()> {
    let sandbox = Runner::new(config).sandbox(None);
    let mut playground = Playground::new(Snippet::new(SnippetId::new("repl"), ""), sandbox);

    eprintln!("Enter Lua code. :run runs, :show prints, :clear resets, :quit exits.");
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("failed to read from stdin")?;

        match line.trim() {
            ":quit" | ":q" => break,
            ":run" => match playground.run() {
                RunState::Succeeded(output) => {
                    if !output.is_empty() {
                        writeln!(stdout, "{output}")?;
                    }
                }
                RunState::Failed(failure) => writeln!(stdout, "{}", failure.message)?,
                RunState::Idle | RunState::Running => {}
            },
            ":show" => writeln!(stdout, "{}", playground.snippet().source())?,
            ":clear" => playground.edit(""),
            _ => {
                let mut source = playground.snippet().source().to_owned();
                if !source.is_empty() {
                    source.push('\n');
                }
                source.push_str(&line);
                playground.edit(source);
            }
        }
        stdout.flush()?;
    }

    Ok(())
}

fn show_config(config: &Config) {
    let limits = config.effective_limits(None);
    println!("Resource limits:");
    println!("  Timeout: {:?} ms", limits.timeout_ms);
    println!("  Instruction limit: {:?}", limits.instruction_limit);
    println!("  Memory limit: {:?} bytes", limits.memory_limit);
    println!("  Max output lines: {:?}", limits.max_output_lines);
    println!("  Max source size: {:?} bytes", limits.max_source_bytes);
    println!();
    println!("Output format: {:?}", config.output.format);
    println!("Error tag: {:?}", config.output.error_tag);
    println!("Strict globals: {}", config.output.strict_globals);
    println!();
    println!("Topics configured: {}", config.topics.len());
}

async fn init_config(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at '{}'. Use --force to overwrite.",
            output.display()
        );
    }

    tokio::fs::write(output, EXAMPLE_CONFIG)
        .await
        .context("failed to write configuration file")?;

    println!("Created configuration file at '{}'", output.display());
    Ok(())
}
