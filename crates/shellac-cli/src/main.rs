use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use serde::Serialize;
use shellac_ast::CompilationUnit;
use shellac_core::{EngineConfig, KnowledgeBase, ShellContext};
use shellac_error::{Result, ShellacError};
use shellac_types::Diagnostic;
use tracing::info;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "SHELLAC_LOG";

type CompletionMarks = BTreeMap<String, BTreeMap<String, bool>>;

#[derive(Debug, Default)]
struct CliConfig {
    units: Vec<PathBuf>,
    completions: Option<PathBuf>,
    engine: Option<PathBuf>,
    json_output: bool,
    deny_open: bool,
}

#[derive(Debug, Serialize)]
struct UnitReport {
    unit: String,
    diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Serialize)]
struct Report {
    units: Vec<UnitReport>,
    obligations: usize,
    open: usize,
    errors: usize,
}

impl Report {
    fn is_clean(&self) -> bool {
        self.open == 0 && self.errors == 0
    }
}

fn print_help() {
    let help = "\
shellac - report proof obligations for annotated compilation units

USAGE:
    shellac --unit <PATH> [--unit <PATH> ...] [OPTIONS]

OPTIONS:
    --unit <PATH>              Compilation unit (JSON); repeat to analyze several in order
    --completions <PATH>       Completion marks (JSON: unit -> obligation text -> done)
    --config <PATH>            Engine configuration (JSON)
    --json                     Emit machine-readable JSON output
    --deny-open                Exit with status 1 on open obligations or errors
    -h, --help                 Show this help

ENVIRONMENT:
    SHELLAC_LOG                Log filter (default: warn)
";
    println!("{help}");
}

fn parse_args(args: &[String]) -> std::result::Result<CliConfig, String> {
    let mut config = CliConfig::default();

    let mut index = 0;
    while index < args.len() {
        match args[index].as_str() {
            "--unit" => {
                index += 1;
                if index >= args.len() {
                    return Err("--unit requires a value".to_owned());
                }
                config.units.push(PathBuf::from(&args[index]));
            }
            "--completions" => {
                index += 1;
                if index >= args.len() {
                    return Err("--completions requires a value".to_owned());
                }
                config.completions = Some(PathBuf::from(&args[index]));
            }
            "--config" => {
                index += 1;
                if index >= args.len() {
                    return Err("--config requires a value".to_owned());
                }
                config.engine = Some(PathBuf::from(&args[index]));
            }
            "--json" => config.json_output = true,
            "--deny-open" => config.deny_open = true,
            "-h" | "--help" => {
                print_help();
                return Err(String::new());
            }
            unknown => return Err(format!("unknown option: {unknown}")),
        }
        index += 1;
    }

    if config.units.is_empty() {
        return Err("at least one --unit is required".to_owned());
    }
    Ok(config)
}

fn load_unit(path: &Path) -> Result<CompilationUnit> {
    let text = std::fs::read_to_string(path)?;
    let unit: CompilationUnit = serde_json::from_str(&text)?;
    if unit.name.is_empty() {
        return Err(ShellacError::internal(format!(
            "{} declares a unit with an empty name",
            path.display()
        )));
    }
    Ok(unit)
}

fn load_completions(path: Option<&Path>) -> Result<CompletionMarks> {
    match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(CompletionMarks::new()),
    }
}

fn analyze(config: &CliConfig) -> Result<Report> {
    let engine = match &config.engine {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    let completions = load_completions(config.completions.as_deref())?;

    let mut ctx = ShellContext::new();
    let mut kb = KnowledgeBase::with_config(engine);
    let units = config
        .units
        .iter()
        .map(|path| load_unit(path))
        .collect::<Result<Vec<_>>>()?;

    // Earlier units may reference checkers declared in later ones; the last
    // sweep reports against the complete registry.
    for unit in &units {
        kb.reanalyze(&mut ctx, unit, &completions);
    }
    let mut report = Report {
        units: Vec::with_capacity(units.len()),
        obligations: 0,
        open: 0,
        errors: 0,
    };
    for unit in &units {
        let diagnostics = kb.reanalyze(&mut ctx, unit, &completions).to_vec();
        report.obligations += kb.obligations(&unit.name).len();
        report.open += diagnostics.iter().filter(|d| d.is_open_obligation()).count();
        report.errors += diagnostics.iter().filter(|d| d.is_error()).count();
        report.units.push(UnitReport {
            unit: unit.name.clone(),
            diagnostics,
        });
    }
    info!(
        units = report.units.len(),
        obligations = report.obligations,
        open = report.open,
        errors = report.errors,
        "analysis complete"
    );
    Ok(report)
}

fn render_text_report(report: &Report) -> String {
    let mut out = String::new();
    for unit in &report.units {
        for diagnostic in &unit.diagnostics {
            out.push_str(&diagnostic.to_string());
            out.push('\n');
        }
    }
    out.push_str(&format!(
        "{} unit(s), {} obligation(s), {} open, {} error(s)",
        report.units.len(),
        report.obligations,
        report.open,
        report.errors
    ));
    out
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run(args: &[String]) -> std::result::Result<bool, String> {
    let config = parse_args(args)?;
    let report = analyze(&config).map_err(|error| error.to_string())?;

    if config.json_output {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|error| format!("report_json_serialize_failed: {error}"))?;
        println!("{json}");
    } else {
        println!("{}", render_text_report(&report));
    }

    Ok(!config.deny_open || report.is_clean())
}

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(error) if error.is_empty() => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("ERROR shellac failed: {error}");
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    const UNIT_JSON: &str = r#"{
        "name": "IfStatements.java",
        "types": [{
            "name": "IfStatements",
            "methods": [
                {"name": "x", "satisfies": ["x"]},
                {"name": "y", "satisfies": ["y"]},
                {"name": "run", "satisfies": ["claimedRequirement"],
                 "span": {"start": 200, "len": 60},
                 "body": [{
                    "stmt": "if",
                    "then_branch": [{"stmt": "call", "callee": {"type_name": "IfStatements", "method": "x"}}],
                    "else_branch": [{"stmt": "call", "callee": {"type_name": "IfStatements", "method": "y"}}]
                 }]}
            ]
        }]
    }"#;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn parse_args_collects_units_and_flags() {
        let config = parse_args(&args(&[
            "--unit",
            "a.json",
            "--unit",
            "b.json",
            "--json",
            "--deny-open",
            "--completions",
            "marks.json",
        ]))
        .unwrap();
        assert_eq!(config.units, vec![PathBuf::from("a.json"), PathBuf::from("b.json")]);
        assert!(config.json_output);
        assert!(config.deny_open);
        assert_eq!(config.completions, Some(PathBuf::from("marks.json")));
        assert!(config.engine.is_none());
    }

    #[test]
    fn parse_args_rejects_bad_input() {
        assert_eq!(
            parse_args(&args(&["--unit"])).unwrap_err(),
            "--unit requires a value"
        );
        assert_eq!(
            parse_args(&args(&["--verbose"])).unwrap_err(),
            "unknown option: --verbose"
        );
        assert_eq!(
            parse_args(&args(&[])).unwrap_err(),
            "at least one --unit is required"
        );
    }

    #[test]
    fn analyze_reports_open_obligation() {
        let dir = tempfile::tempdir().unwrap();
        let unit = write_file(&dir, "unit.json", UNIT_JSON);
        let config = CliConfig {
            units: vec![unit],
            ..CliConfig::default()
        };
        let report = analyze(&config).unwrap();
        // The leaves x and y owe their own claims as well.
        assert_eq!(report.obligations, 3);
        assert_eq!(report.open, 3);
        assert_eq!(report.errors, 3);
        assert!(!report.is_clean());

        let text = render_text_report(&report);
        assert!(
            text.contains("IfStatements.java:200..260 [proof] ( x || y ) -> claimedRequirement (open)"),
            "{text}"
        );
        assert!(text.contains("[proof] -> x (open)"), "{text}");
        assert!(text.ends_with("1 unit(s), 3 obligation(s), 3 open, 3 error(s)"));
    }

    #[test]
    fn completion_file_closes_the_obligation() {
        let dir = tempfile::tempdir().unwrap();
        let unit = write_file(&dir, "unit.json", UNIT_JSON);
        let marks = write_file(
            &dir,
            "marks.json",
            r#"{"IfStatements.java": {
                "-> x": true,
                "-> y": true,
                "( x || y ) -> claimedRequirement": true
            }}"#,
        );
        let config = CliConfig {
            units: vec![unit],
            completions: Some(marks),
            ..CliConfig::default()
        };
        let report = analyze(&config).unwrap();
        assert_eq!(report.obligations, 3);
        assert!(report.is_clean());

        let json = serde_json::to_value(&report).unwrap();
        let diagnostics = json["units"][0]["diagnostics"].as_array().unwrap();
        assert_eq!(diagnostics.len(), 3);
        assert!(diagnostics.iter().all(|d| d["completed"] == true));
    }

    #[test]
    fn engine_config_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let unit = write_file(&dir, "unit.json", UNIT_JSON);
        let engine = write_file(
            &dir,
            "engine.json",
            r#"{"incomplete_proof_message": "discharge me"}"#,
        );
        let config = CliConfig {
            units: vec![unit],
            engine: Some(engine),
            ..CliConfig::default()
        };
        let report = analyze(&config).unwrap();
        let messages: Vec<&str> = report.units[0]
            .diagnostics
            .iter()
            .filter(|d| d.is_error())
            .map(|d| d.message.as_str())
            .collect();
        assert_eq!(messages, vec!["discharge me"; 3]);
    }

    #[test]
    fn missing_or_malformed_files_are_errors() {
        let dir = tempfile::tempdir().unwrap();
        let config = CliConfig {
            units: vec![dir.path().join("absent.json")],
            ..CliConfig::default()
        };
        assert!(matches!(analyze(&config), Err(ShellacError::Io(_))));

        let broken = write_file(&dir, "broken.json", "{\"name\": ");
        let config = CliConfig {
            units: vec![broken],
            ..CliConfig::default()
        };
        assert!(matches!(analyze(&config), Err(ShellacError::Json(_))));
    }

    #[test]
    fn units_see_checkers_declared_in_later_units() {
        let dir = tempfile::tempdir().unwrap();
        let unit = write_file(&dir, "unit.json", UNIT_JSON);
        let checkers = write_file(
            &dir,
            "checkers.json",
            r#"{"name": "Checks.java", "types": [{"name": "Checks", "methods": [
                {"name": "checkX", "checks": "x"},
                {"name": "checkY", "checks": "y"}
            ]}]}"#,
        );
        let config = CliConfig {
            units: vec![unit, checkers],
            deny_open: true,
            ..CliConfig::default()
        };
        let report = analyze(&config).unwrap();
        assert_eq!(report.obligations, 0);
        assert!(report.is_clean());
    }
}
