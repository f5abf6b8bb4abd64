use anyhow::Context;
use clap::{Arg, Command};
use log::LevelFilter;
use phishguard::pipeline::PipelineContext;
use phishguard::{ModelFamily, PipelineConfig, PredictionResult};
use std::process;

fn main() {
    let matches = Command::new("phishguard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Dual-model phishing classification for emails and URLs")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("phishguard.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("test-config")
                .long("test-config")
                .help("Validate the configuration and artifact set, then exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("email")
                .long("email")
                .value_name("TEXT")
                .help("Classify email text")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .help("Classify a URL")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("model-family")
                .long("model-family")
                .value_name("FAMILY")
                .help("Use one model family (ensemble or linear) instead of arbitration")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print the result as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue),
        )
        .get_matches();

    let log_level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if let Some(generate_path) = matches.get_one::<String>("generate-config") {
        if let Err(e) = std::fs::write(generate_path, PipelineConfig::default_yaml()) {
            eprintln!("Error writing configuration: {e}");
            process::exit(1);
        }
        println!("Default configuration written to {generate_path}");
        return;
    }

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = match load_config(config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("test-config") {
        match build_pipeline(&config) {
            Ok(_) => {
                println!("Configuration valid; all artifacts loaded.");
                return;
            }
            Err(e) => {
                eprintln!("Configuration test failed: {e}");
                process::exit(1);
            }
        }
    }

    let (input, input_type) = match (
        matches.get_one::<String>("email"),
        matches.get_one::<String>("url"),
    ) {
        (Some(text), None) => (text.clone(), "email"),
        (None, Some(url)) => (url.clone(), "url"),
        _ => {
            eprintln!("Provide exactly one of --email or --url");
            process::exit(2);
        }
    };

    let result = match run(&config, &input, input_type, matches.get_one::<String>("model-family")) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        match &result.error {
            Some(message) => println!("{}: {message}", result.label),
            None => println!("{} (confidence {:.2})", result.label, result.confidence),
        }
    }

    if result.is_error() {
        process::exit(1);
    }
}

fn load_config(path: &str) -> anyhow::Result<PipelineConfig> {
    if std::path::Path::new(path).exists() {
        Ok(PipelineConfig::from_file(path)?)
    } else {
        log::info!("no configuration at {path}, using defaults");
        Ok(PipelineConfig::default())
    }
}

fn build_pipeline(config: &PipelineConfig) -> anyhow::Result<PipelineContext> {
    let store = config.open_store()?;
    PipelineContext::load(store.as_ref(), config).context("failed to load pipeline artifacts")
}

fn run(
    config: &PipelineConfig,
    input: &str,
    input_type: &str,
    family: Option<&String>,
) -> anyhow::Result<PredictionResult> {
    let pipeline = build_pipeline(config)?;

    let result = match family {
        Some(family) => {
            let family: ModelFamily = family.parse()?;
            match input_type {
                "email" => pipeline.predict_email(input, family),
                _ => pipeline.predict_url(input, family),
            }
        }
        None => pipeline.predict(input, input_type)?,
    };
    Ok(result)
}
