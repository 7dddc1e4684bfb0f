//! Locating flows on disk and reading answer bags.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use flow_rules::{AnswerBag, Flow};
use serde_json::Value;
use tracing::debug;

use crate::CliResult;

pub const FLOWS_ENV: &str = "FLOW_RULES_FLOWS";
const DEFAULT_FLOWS_DIR: &str = "flows";

/// `--flows`, then `FLOW_RULES_FLOWS`, then `./flows`.
pub fn resolve_flows_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| env::var_os(FLOWS_ENV).map(PathBuf::from))
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FLOWS_DIR))
}

/// Loads `name` from a directory of `<name>.json` files or from a catalog file
/// (`{ "<name>": Flow, ... }`). Questions come back sorted by order.
pub fn load_flow(source: &Path, name: &str) -> CliResult<Flow> {
    ensure_flow_name(name)?;

    let mut flow = if source.is_dir() {
        let path = source.join(format!("{name}.json"));
        if !path.is_file() {
            return Err(format!("flow '{}' not found in {}", name, source.display()).into());
        }
        debug!(path = %path.display(), "loading flow file");
        let contents = fs::read_to_string(&path)?;
        serde_json::from_str::<Flow>(&contents)
            .map_err(|err| format!("invalid flow {}: {}", path.display(), err))?
    } else if source.is_file() {
        debug!(path = %source.display(), "loading flow catalog");
        let contents = fs::read_to_string(source)?;
        let mut catalog: BTreeMap<String, Flow> = serde_json::from_str(&contents)
            .map_err(|err| format!("invalid flow catalog {}: {}", source.display(), err))?;
        catalog.remove(name).ok_or_else(|| {
            format!(
                "flow '{}' not found in catalog {} (available: {})",
                name,
                source.display(),
                catalog.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })?
    } else {
        return Err(format!("flows path '{}' does not exist", source.display()).into());
    };

    if flow.name.is_empty() {
        flow.name = name.to_string();
    }
    flow.sort_by_order();
    Ok(flow)
}

/// Inline JSON, or `@path` to read it from a file. Must be a JSON object.
pub fn parse_answers(raw: &str) -> CliResult<AnswerBag> {
    let raw = raw.trim();
    let contents = match raw.strip_prefix('@') {
        Some(path) => fs::read_to_string(path)
            .map_err(|err| format!("failed to read answers from {}: {}", path, err))?,
        None => raw.to_string(),
    };
    if contents.trim().is_empty() {
        return Ok(AnswerBag::new());
    }
    let value: Value =
        serde_json::from_str(&contents).map_err(|err| format!("invalid answers JSON: {}", err))?;
    if !value.is_object() {
        return Err("answers must be a JSON object keyed by qid".into());
    }
    Ok(AnswerBag::from_json(&value))
}

fn ensure_flow_name(name: &str) -> CliResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err("flow name cannot be empty".into());
    }
    if name.contains(['/', '\\']) || name.contains("..") {
        return Err(format!("flow name '{}' must not contain path separators", name).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FLOW: &str = r#"{
        "name": "signup",
        "questions": [
            { "qid": "b", "order": "2" },
            { "qid": "a", "order": 1 },
            { "qid": "a2", "order": "1B" }
        ]
    }"#;

    #[test]
    fn loads_from_directory_and_sorts() {
        let dir = TempDir::new().expect("temp dir");
        fs::write(dir.path().join("signup.json"), FLOW).expect("write flow");
        let flow = load_flow(dir.path(), "signup").expect("load flow");
        let qids = flow
            .questions
            .iter()
            .map(|question| question.qid.as_str())
            .collect::<Vec<_>>();
        assert_eq!(qids, vec!["a", "a2", "b"]);
        assert!(load_flow(dir.path(), "missing").is_err());
    }

    #[test]
    fn loads_from_catalog_file() {
        let dir = TempDir::new().expect("temp dir");
        let catalog = dir.path().join("flows.json");
        fs::write(&catalog, format!(r#"{{ "onboarding": {FLOW} }}"#)).expect("write catalog");
        let flow = load_flow(&catalog, "onboarding").expect("load flow");
        assert_eq!(flow.name, "signup");
        assert_eq!(flow.questions.len(), 3);
        let err = load_flow(&catalog, "promotion").unwrap_err();
        assert!(err.to_string().contains("available: onboarding"));
    }

    #[test]
    fn rejects_path_like_names() {
        let dir = TempDir::new().expect("temp dir");
        assert!(load_flow(dir.path(), "../secrets").is_err());
        assert!(load_flow(dir.path(), "").is_err());
    }

    #[test]
    fn answers_inline_or_from_file() {
        let inline = parse_answers(r#"{ "role": "tank" }"#).expect("inline answers");
        assert_eq!(inline.tokens("role"), vec!["tank"]);

        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("answers.json");
        fs::write(&path, r#"{ "role": { "value": "heal" } }"#).expect("write answers");
        let from_file = parse_answers(&format!("@{}", path.display())).expect("file answers");
        assert_eq!(from_file.tokens("role"), vec!["heal"]);

        assert!(parse_answers("[1, 2]").is_err());
        assert!(parse_answers("{ nope").is_err());
        assert!(parse_answers("").expect("blank answers").is_empty());
    }
}
