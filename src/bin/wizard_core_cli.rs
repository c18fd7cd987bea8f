//! Demo binary: an interactive project-scaffold wizard.
//!
//! With `WIZARD_CORE_CLI_SCRIPT` set, answers are read from stdin (one per
//! line) instead of the terminal, which is how the integration tests drive
//! the flow. An optional first argument names a file to receive the
//! collected state as pretty-printed JSON.

use std::io::{self, BufRead};
use std::{env, fs};

use colored::Colorize;
use once_cell::sync::Lazy;
use serde::Deserialize;
use serde_json::json;

use wizard_core::errors::FlowError;
use wizard_core::flow::{Binding, FormBuilder, Wizard};
use wizard_core::prompters::{
    ConfirmPrompter, PickItem, PickPrompter, Prompter, ScriptSource, ScriptedPrompter,
    TextPrompter, Validator,
};

const SCRIPT_ENV: &str = "WIZARD_CORE_CLI_SCRIPT";

static RUNTIMES: Lazy<Vec<(&str, &str)>> = Lazy::new(|| {
    vec![
        ("Node.js 18", "nodejs18.x"),
        ("Python 3.12", "python3.12"),
        ("Java 17", "java17"),
    ]
});

static DEPENDENCY_MANAGERS: Lazy<Vec<(&str, &str)>> =
    Lazy::new(|| vec![("Maven", "maven"), ("Gradle", "gradle")]);

static TEMPLATES: Lazy<Vec<(&str, &str)>> = Lazy::new(|| {
    vec![
        ("Hello world", "hello-world"),
        ("Event handler", "event-handler"),
        ("REST API", "rest-api"),
    ]
});

static REGIONS: Lazy<Vec<(&str, &str)>> = Lazy::new(|| {
    vec![
        ("Europe (Ireland)", "eu-west-1"),
        ("US East (Virginia)", "us-east-1"),
        ("Asia Pacific (Tokyo)", "ap-northeast-1"),
    ]
});

#[derive(Debug, Deserialize)]
struct ProjectConfig {
    name: String,
    runtime: String,
    #[serde(rename = "dependencyManager")]
    dependency_manager: Option<String>,
    template: String,
    destination: Destination,
}

#[derive(Debug, Deserialize)]
struct Destination {
    region: String,
    bucket: String,
}

fn text_prompter(
    label: &str,
    validator: Validator,
    script: &Option<ScriptSource>,
) -> Box<dyn Prompter> {
    match script {
        Some(source) => Box::new(ScriptedPrompter::new(source.clone())),
        None => Box::new(TextPrompter::new(label).with_validator(validator)),
    }
}

fn pick_prompter(
    title: &str,
    table: &[(&str, &str)],
    script: &Option<ScriptSource>,
) -> Box<dyn Prompter> {
    match script {
        Some(source) => Box::new(ScriptedPrompter::new(source.clone())),
        None => {
            let items = table
                .iter()
                .map(|(label, value)| PickItem::new(*label, *value))
                .collect();
            Box::new(PickPrompter::new(title, items).with_back_entry())
        }
    }
}

fn build_wizard(script: Option<ScriptSource>) -> Wizard {
    let name_script = script.clone();
    let runtime_script = script.clone();
    let manager_script = script.clone();
    let template_script = script.clone();
    let region_script = script.clone();

    let form = FormBuilder::new()
        .composite("destination")
        .bind(Binding::new("name", move |_ctx| {
            text_prompter("Project name", Validator::NonEmpty, &name_script)
        }))
        .bind(Binding::new("runtime", move |_ctx| {
            pick_prompter("Runtime", &RUNTIMES, &runtime_script)
        }))
        .bind(
            Binding::new("dependencyManager", move |_ctx| {
                pick_prompter("Dependency manager", &DEPENDENCY_MANAGERS, &manager_script)
            })
            .with_visibility(|state| state.get_str("runtime") == Some("java17")),
        )
        .bind(Binding::new("template", move |_ctx| {
            pick_prompter("Starter template", &TEMPLATES, &template_script)
        }))
        .bind(Binding::new("destination.region", move |_ctx| {
            pick_prompter("Deployment region", &REGIONS, &region_script)
        }))
        .bind(Binding::computed("destination.bucket", |state| {
            state
                .get_str("name")
                .map(|name| json!(format!("{name}-artifacts")))
        }))
        .build();

    let exit_script = script;
    Wizard::new(form).with_exit_prompter(move |_state| match &exit_script {
        Some(source) => Box::new(ScriptedPrompter::new(source.clone())) as Box<dyn Prompter>,
        None => Box::new(ConfirmPrompter::new("Abandon the wizard?")) as Box<dyn Prompter>,
    })
}

fn script_source() -> Result<Option<ScriptSource>, FlowError> {
    if env::var(SCRIPT_ENV).is_err() {
        return Ok(None);
    }
    let stdin = io::stdin();
    let lines: Vec<String> = stdin.lock().lines().collect::<Result<_, _>>()?;
    Ok(Some(ScriptSource::from_lines(lines)))
}

fn run() -> Result<(), FlowError> {
    let script = script_source()?;
    if script.is_none() {
        println!("{}", "Project scaffold".bold().cyan());
        println!();
    }

    let mut wizard = build_wizard(script);
    match wizard.run() {
        Some(state) => {
            let value = state.into_value();
            if let Some(path) = env::args().nth(1) {
                fs::write(path, serde_json::to_string_pretty(&value)?)?;
            }
            let config: ProjectConfig = serde_json::from_value(value)?;

            println!("{}", "Project configured".green().bold());
            println!("  Name:     {}", config.name);
            println!("  Runtime:  {}", config.runtime);
            if let Some(manager) = &config.dependency_manager {
                println!("  Manager:  {}", manager);
            }
            println!("  Template: {}", config.template);
            println!(
                "  Deploy:   {} ({})",
                config.destination.bucket, config.destination.region
            );
        }
        None => println!("{}", "Wizard cancelled.".yellow()),
    }
    Ok(())
}

fn main() {
    wizard_core::init();

    if let Err(err) = run() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
