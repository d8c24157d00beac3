use clap::{Parser, Subcommand, ValueEnum};
use form_engine::{
    EngineConfig, HttpClient, PreviewSession, ReqwestClient, preview_options, settle,
};
use form_spec::{
    Form, OptionLookup, StaticOptions, ValidationResult, ValueEnv, build_preview, form_schema,
    render_json_ui, render_text, submit, validate,
};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const LOG_ENV: &str = "FORMKIT_LOG";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Form definition toolkit",
    long_about = "Validates values against form definitions, renders previews and resolves remote option lists"
)]
struct Cli {
    /// Engine config JSON (request timeout, user agent).
    #[arg(long, global = true, value_name = "CONFIG", env = "FORMKIT_CONFIG")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Validate values against the visible fields of a form.
    Validate {
        /// Path to the form JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Path to the values JSON file.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Build the submission payload, or report why it was rejected.
    Submit {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
        /// Only keep values of fields visible at submit time.
        #[arg(long)]
        visible_only: bool,
    },
    /// Normalise a form document.
    Fmt {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Rewrite the file instead of printing.
        #[arg(long)]
        write: bool,
    },
    /// Print the JSON Schema of form documents.
    Schema,
    /// Render the visible fields of a form.
    Preview {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
        /// Fetch remote option lists before rendering.
        #[arg(long)]
        resolve: bool,
        /// Attach validation messages.
        #[arg(long)]
        validate: bool,
    },
    /// Resolve remote option lists and print them.
    Options {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        /// Preview the options of a single field as the form editor does.
        #[arg(long, value_name = "FIELD")]
        field: Option<String>,
    },
    /// Commit a value and apply the autofill lookup of its field.
    Autofill {
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "VALUES")]
        values: Option<PathBuf>,
        #[arg(long, value_name = "FIELD")]
        field: String,
        /// JSON value; anything else is taken as a plain string.
        #[arg(long, value_name = "VALUE")]
        value: String,
    },
}

#[tokio::main]
async fn main() -> CliResult<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Validate {
            form,
            values,
            format,
        } => run_validate(&form, &values, format),
        Command::Submit {
            form,
            values,
            visible_only,
        } => run_submit(&form, &values, visible_only),
        Command::Fmt { form, write } => run_fmt(&form, write),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&form_schema())?);
            Ok(())
        }
        Command::Preview {
            form,
            values,
            format,
            resolve,
            validate: check,
        } => run_preview(&config, &form, values.as_deref(), format, resolve, check).await,
        Command::Options {
            form,
            values,
            field,
        } => run_options(&config, &form, values.as_deref(), field.as_deref()).await,
        Command::Autofill {
            form,
            values,
            field,
            value,
        } => run_autofill(&config, &form, values.as_deref(), &field, &value).await,
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> CliResult<EngineConfig> {
    let Some(path) = path else {
        return Ok(EngineConfig::default());
    };
    debug!(path = %path.display(), "loading engine config");
    let contents = fs::read_to_string(path)?;
    Ok(EngineConfig::from_json_str(&contents)?)
}

fn load_form(path: &Path) -> CliResult<Form> {
    let contents = fs::read_to_string(path)?;
    Ok(Form::from_json(&contents)?)
}

fn load_values(path: Option<&Path>) -> CliResult<ValueEnv> {
    let Some(path) = path else {
        return Ok(ValueEnv::new());
    };
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    Ok(ValueEnv::try_from(value)?)
}

fn http_client(config: &EngineConfig) -> CliResult<Arc<dyn HttpClient>> {
    Ok(Arc::new(ReqwestClient::new(config)?))
}

fn parse_value_arg(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn run_validate(form_path: &Path, values_path: &Path, format: OutputFormat) -> CliResult<()> {
    let form = load_form(form_path)?;
    let values = load_values(Some(values_path))?;

    let result = validate(&form, &values);
    match format {
        OutputFormat::Text => {
            println!(
                "Validation result: {}",
                if result.valid { "valid" } else { "invalid" }
            );
            describe_validation(&result);
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    if result.valid {
        Ok(())
    } else {
        Err("validation failed".into())
    }
}

fn describe_validation(result: &ValidationResult) {
    if !result.errors.is_empty() {
        println!("Errors:");
        for error in &result.errors {
            println!("  {} - {} ({})", error.field_id, error.message, error.code);
        }
    }
}

fn run_submit(form_path: &Path, values_path: &Path, visible_only: bool) -> CliResult<()> {
    let form = load_form(form_path)?;
    let values = load_values(Some(values_path))?;

    match submit(&form, &values) {
        Ok(submission) => {
            info!(fields = submission.visible_fields.len(), "submission accepted");
            let payload = if visible_only {
                serde_json::to_string_pretty(&json!({
                    "values": submission.visible_values(),
                    "visibleFields": submission.visible_fields,
                }))?
            } else {
                submission.to_pretty_json()?
            };
            println!("{payload}");
            Ok(())
        }
        Err(result) => {
            println!("Submission rejected");
            describe_validation(&result);
            Err("submission rejected".into())
        }
    }
}

fn run_fmt(form_path: &Path, write: bool) -> CliResult<()> {
    let form = load_form(form_path)?;
    let formatted = form.to_pretty_json()?;
    if write {
        fs::write(form_path, format!("{formatted}\n"))?;
        println!("Formatted {}", form_path.display());
    } else {
        println!("{formatted}");
    }
    Ok(())
}

async fn run_preview(
    config: &EngineConfig,
    form_path: &Path,
    values_path: Option<&Path>,
    format: OutputFormat,
    resolve: bool,
    check: bool,
) -> CliResult<()> {
    let form = Arc::new(load_form(form_path)?);
    let values = load_values(values_path)?;

    let payload = if resolve {
        let session = PreviewSession::with_values(Arc::clone(&form), http_client(config)?, values);
        settle(session.refresh_options()).await;
        let validation = check.then(|| session.validate());
        session.preview(validation.as_ref())
    } else {
        let validation = check.then(|| validate(&form, &values));
        build_preview(&form, &values, &StaticOptions, validation.as_ref())
    };

    match format {
        OutputFormat::Text => println!("{}", render_text(&payload)),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&render_json_ui(&payload))?)
        }
    }
    Ok(())
}

async fn run_options(
    config: &EngineConfig,
    form_path: &Path,
    values_path: Option<&Path>,
    field_id: Option<&str>,
) -> CliResult<()> {
    let form = Arc::new(load_form(form_path)?);

    if let Some(field_id) = field_id {
        let field = form
            .field(field_id)
            .ok_or_else(|| format!("field '{field_id}' does not exist"))?;
        let options = match field.remote_source() {
            Some(api_config) => {
                let client = http_client(config)?;
                preview_options(client.as_ref(), api_config)
                    .await
                    .map_err(|err| format!("Failed to fetch API options: {err}"))?
            }
            None => StaticOptions.field_options(field).options,
        };
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let values = load_values(values_path)?;
    let session = PreviewSession::with_values(form, http_client(config)?, values);
    settle(session.refresh_options()).await;
    println!(
        "{}",
        serde_json::to_string_pretty(&session.cache().snapshot())?
    );
    Ok(())
}

async fn run_autofill(
    config: &EngineConfig,
    form_path: &Path,
    values_path: Option<&Path>,
    field_id: &str,
    raw_value: &str,
) -> CliResult<()> {
    let form = Arc::new(load_form(form_path)?);
    let field = form
        .field(field_id)
        .ok_or_else(|| format!("field '{field_id}' does not exist"))?;
    if field.autofill_source().is_none() {
        return Err(format!("field '{field_id}' has no autofill source").into());
    }

    let values = load_values(values_path)?;
    let session = PreviewSession::with_values(Arc::clone(&form), http_client(config)?, values);
    settle(session.commit(field_id, parse_value_arg(raw_value))?).await;
    println!("{}", session.values().to_pretty_json()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_cmd::Command;
    use assert_fs::prelude::*;
    use predicates::prelude::*;
    use tempfile::TempDir;

    const FORM: &str = include_str!("../../form-spec/tests/fixtures/address_form.json");

    const STATIC_FORM: &str = r#"[
        {
            "id": "main",
            "label": "Main",
            "fields": [
                { "id": "color", "type": "radio", "label": "Color", "required": true,
                  "options": [{ "id": "red", "label": "Red" }, { "id": "blue", "label": "Blue" }] },
                { "id": "shade", "type": "text", "label": "Shade",
                  "dependency": { "fieldId": "color", "value": "blue" } }
            ]
        }
    ]"#;

    fn workspace(form: &str, values: &str) -> assert_fs::TempDir {
        let dir = assert_fs::TempDir::new().expect("temp dir");
        dir.child("form.json").write_str(form).expect("write form");
        dir.child("values.json").write_str(values).expect("write values");
        dir
    }

    fn formkit() -> Command {
        let mut cmd = Command::cargo_bin("formkit").expect("binary");
        cmd.env_remove("FORMKIT_CONFIG").env_remove(LOG_ENV);
        cmd
    }

    #[test]
    fn value_args_fall_back_to_strings() {
        assert_eq!(parse_value_arg("12"), json!(12));
        assert_eq!(parse_value_arg(r#"{"id":"US"}"#), json!({ "id": "US" }));
        assert_eq!(parse_value_arg("Springfield"), json!("Springfield"));
    }

    #[test]
    fn validate_lists_missing_required_fields() {
        let dir = workspace(FORM, "{}");
        formkit()
            .arg("validate")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--values")
            .arg(dir.child("values.json").path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("Validation result: invalid"))
            .stdout(predicate::str::contains("name - This field is required (required)"))
            .stdout(predicate::str::contains("country - Please select an option"))
            .stdout(predicate::str::contains("state").not());
    }

    #[test]
    fn validate_accepts_complete_values() {
        let dir = workspace(
            FORM,
            r#"{ "name": "Ada", "country": { "id": "US" }, "state": { "id": "Ohio" } }"#,
        );
        formkit()
            .arg("validate")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--values")
            .arg(dir.child("values.json").path())
            .arg("--format")
            .arg("json")
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""valid": true"#));
    }

    #[test]
    fn submit_can_drop_hidden_values() {
        let dir = workspace(STATIC_FORM, r#"{ "color": { "id": "red" }, "shade": "navy" }"#);
        let output = formkit()
            .arg("submit")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--values")
            .arg(dir.child("values.json").path())
            .arg("--visible-only")
            .output()
            .expect("run");
        assert!(output.status.success());
        let payload: Value = serde_json::from_slice(&output.stdout).expect("json");
        assert_eq!(payload["visibleFields"], json!(["color"]));
        assert_eq!(payload["values"], json!({ "color": { "id": "red" } }));
    }

    #[test]
    fn submit_rejects_invalid_values() {
        let dir = workspace(STATIC_FORM, "{}");
        formkit()
            .arg("submit")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--values")
            .arg(dir.child("values.json").path())
            .assert()
            .failure()
            .stdout(predicate::str::contains("color - Please select an option"));
    }

    #[test]
    fn fmt_writes_canonical_form() -> CliResult<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("form.json");
        fs::write(&path, FORM)?;

        formkit()
            .arg("fmt")
            .arg("--form")
            .arg(&path)
            .arg("--write")
            .assert()
            .success();

        let rewritten = fs::read_to_string(&path)?;
        assert!(!rewritten.contains(r#""type": "section""#));
        assert_eq!(Form::from_json(&rewritten)?, Form::from_json(FORM)?);
        Ok(())
    }

    #[test]
    fn schema_describes_sections() {
        formkit()
            .arg("schema")
            .assert()
            .success()
            .stdout(predicate::str::contains("Section"))
            .stdout(predicate::str::contains("apiConfig"));
    }

    #[test]
    fn preview_renders_visible_fields_with_errors() {
        let dir = workspace(STATIC_FORM, r#"{ "color": { "id": "blue", "label": "Blue" } }"#);
        formkit()
            .arg("preview")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--values")
            .arg(dir.child("values.json").path())
            .arg("--validate")
            .assert()
            .success()
            .stdout(predicate::str::contains("Visible fields: 2/2"))
            .stdout(predicate::str::contains("color (Color, radio) [required] = Blue"))
            .stdout(predicate::str::contains("options: Red, Blue"));
    }

    #[test]
    fn options_for_static_field_need_no_network() {
        let dir = workspace(STATIC_FORM, "{}");
        formkit()
            .arg("options")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--field")
            .arg("color")
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""id": "blue""#));

        formkit()
            .arg("options")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .assert()
            .success()
            .stdout(predicate::str::contains("{}"));
    }

    #[test]
    fn autofill_requires_a_lookup_field() {
        let dir = workspace(FORM, "{}");
        formkit()
            .arg("autofill")
            .arg("--form")
            .arg(dir.child("form.json").path())
            .arg("--field")
            .arg("city")
            .arg("--value")
            .arg("Springfield")
            .assert()
            .failure()
            .stderr(predicate::str::contains("has no autofill source"));
    }

    #[test]
    fn bad_config_is_reported() {
        let dir = workspace(STATIC_FORM, "{}");
        dir.child("config.json").write_str("{").expect("write config");
        formkit()
            .arg("--config")
            .arg(dir.child("config.json").path())
            .arg("schema")
            .assert()
            .failure()
            .stderr(predicate::str::contains("ConfigParse"));
    }
}
