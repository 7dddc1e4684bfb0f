mod catalog;

use catalog::{load_flow, parse_answers, resolve_flows_path};
use clap::{Args, Parser, Subcommand, ValueEnum};
use flow_rules::{
    EngineConfig, EngineKind, Flow, RuleEngine, build_report, flow_schema, lint_flow,
    next_question_index, render_json, render_text,
};
use serde_json::json;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const ENGINE_ENV: &str = "FLOW_RULES_ENGINE";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Diagnostic CLI for question-flow rules",
    long_about = "Evaluates visibility and navigation rules of a flow against a set of answers, \
                  and lints rule text"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum EngineArg {
    Strict,
    Legacy,
}

impl From<EngineArg> for EngineKind {
    fn from(value: EngineArg) -> Self {
        match value {
            EngineArg::Strict => EngineKind::Strict,
            EngineArg::Legacy => EngineKind::Legacy,
        }
    }
}

#[derive(Args)]
struct FlowArgs {
    /// Name of the flow to load.
    #[arg(long, value_name = "NAME")]
    flow: String,
    /// Directory of `<name>.json` flows or a catalog file.
    /// Defaults to FLOW_RULES_FLOWS, then ./flows.
    #[arg(long, value_name = "PATH")]
    flows: Option<PathBuf>,
}

#[derive(Args)]
struct EngineArgs {
    /// Rule engine; overrides FLOW_RULES_ENGINE and the config file.
    #[arg(long, value_enum)]
    engine: Option<EngineArg>,
    /// JSON engine config (`engine`, `max_visibility_passes`, `max_nav_hops`, `cache`).
    #[arg(long, value_name = "CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the visibility mapping of every question.
    Eval {
        #[command(flatten)]
        flow: FlowArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Answers as inline JSON or `@path`.
        #[arg(long, value_name = "ANSWERS", default_value = "{}")]
        answers: String,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Print where the flow goes after the current question.
    Next {
        #[command(flatten)]
        flow: FlowArgs,
        #[command(flatten)]
        engine: EngineArgs,
        /// Current question, by qid or index.
        #[arg(long, value_name = "QID")]
        current: String,
        /// Answers as inline JSON or `@path`.
        #[arg(long, value_name = "ANSWERS", default_value = "{}")]
        answers: String,
    },
    /// Check rule text for parse errors and unresolved targets.
    Lint {
        #[command(flatten)]
        flow: FlowArgs,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the JSON schema of flow documents.
    Schema,
}

fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Eval {
            flow,
            engine,
            answers,
            format,
        } => run_eval(flow, engine, &answers, format),
        Command::Next {
            flow,
            engine,
            current,
            answers,
        } => run_next(flow, engine, &current, &answers),
        Command::Lint { flow, format } => run_lint(flow, format),
        Command::Schema => run_schema(),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_eval(
    flow_args: FlowArgs,
    engine_args: EngineArgs,
    answers: &str,
    format: OutputFormat,
) -> CliResult<()> {
    let flow = open_flow(flow_args)?;
    let engine = build_engine(engine_args)?;
    let answers = parse_answers(answers)?;

    let report = build_report(&flow, &engine, &answers, None);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&render_json(&report))?),
        OutputFormat::Text => println!("{}", render_text(&report)),
    }
    Ok(())
}

fn run_next(
    flow_args: FlowArgs,
    engine_args: EngineArgs,
    current: &str,
    answers: &str,
) -> CliResult<()> {
    let flow = open_flow(flow_args)?;
    let engine = build_engine(engine_args)?;
    let answers = parse_answers(answers)?;
    let current = resolve_current(&flow, current)?;

    let visibility = engine.evaluate_visibility(&flow.questions, &answers);
    let override_index = engine.next_index_by_rules(&flow.questions, current, &answers);
    let next_index = next_question_index(&engine, &flow.questions, current, &answers, &visibility);

    let output = json!({
        "override": override_index,
        "next_index": next_index,
        "next_qid": next_index.map(|index| flow.questions[index].qid.clone()),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn run_lint(flow_args: FlowArgs, format: OutputFormat) -> CliResult<()> {
    let flow = open_flow(flow_args)?;
    let report = lint_flow(&flow);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            println!(
                "Lint result for '{}': {}",
                flow.name,
                if report.valid { "valid" } else { "invalid" }
            );
            for issue in &report.issues {
                println!(
                    "  [{:?}] {} {} ({}): {}",
                    issue.severity, issue.qid, issue.field, issue.code, issue.message
                );
                if let Some(raw) = &issue.raw {
                    println!("      {}", raw.replace('\n', "\n      "));
                }
            }
        }
    }

    if report.valid {
        Ok(())
    } else {
        Err("lint failed".into())
    }
}

fn run_schema() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&flow_schema())?);
    Ok(())
}

fn open_flow(args: FlowArgs) -> CliResult<Flow> {
    let source = resolve_flows_path(args.flows);
    load_flow(&source, &args.flow)
}

fn build_engine(args: EngineArgs) -> CliResult<RuleEngine> {
    let config_json = match &args.config {
        Some(path) => Some(fs::read_to_string(path)?),
        None => None,
    };
    let config = resolve_config(
        config_json.as_deref(),
        env::var(ENGINE_ENV).ok().as_deref(),
        args.engine,
    )?;
    Ok(RuleEngine::from_config(&config))
}

/// Config file, then `FLOW_RULES_ENGINE`, then `--engine`; later sources win.
fn resolve_config(
    config_json: Option<&str>,
    env_engine: Option<&str>,
    flag: Option<EngineArg>,
) -> CliResult<EngineConfig> {
    let mut config = match config_json {
        Some(raw) => EngineConfig::from_json(raw)?,
        None => EngineConfig::default(),
    };
    if let Some(raw) = env_engine.filter(|raw| !raw.trim().is_empty()) {
        config.engine = raw.parse()?;
    }
    if let Some(flag) = flag {
        config.engine = flag.into();
    }
    Ok(config)
}

/// Accepts a qid or a zero-based index.
fn resolve_current(flow: &Flow, current: &str) -> CliResult<usize> {
    let current = current.trim();
    if let Some(index) = flow.index_of(current) {
        return Ok(index);
    }
    match current.parse::<usize>() {
        Ok(index) if index < flow.questions.len() => Ok(index),
        _ => Err(format!("unknown question '{}' in flow '{}'", current, flow.name).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_rules::Question;

    #[test]
    fn engine_precedence_is_flag_env_config() {
        let config = r#"{ "engine": "legacy", "max_nav_hops": 3 }"#;

        let from_file = resolve_config(Some(config), None, None).unwrap();
        assert_eq!(from_file.engine, EngineKind::Legacy);
        assert_eq!(from_file.max_nav_hops, 3);

        let from_env = resolve_config(Some(config), Some("strict"), None).unwrap();
        assert_eq!(from_env.engine, EngineKind::Strict);
        assert_eq!(from_env.max_nav_hops, 3);

        let from_flag = resolve_config(None, Some("strict"), Some(EngineArg::Legacy)).unwrap();
        assert_eq!(from_flag.engine, EngineKind::Legacy);

        assert!(resolve_config(None, Some("fuzzy"), None).is_err());
        assert_eq!(
            resolve_config(None, Some("  "), None).unwrap(),
            EngineConfig::default()
        );
    }

    #[test]
    fn current_accepts_qid_or_index() {
        let flow = Flow::new(
            "f",
            vec![Question::new("a", "1"), Question::new("b", "2")],
        );
        assert_eq!(resolve_current(&flow, "b").unwrap(), 1);
        assert_eq!(resolve_current(&flow, "0").unwrap(), 0);
        assert!(resolve_current(&flow, "7").is_err());
        assert!(resolve_current(&flow, "ghost").is_err());
    }
}
