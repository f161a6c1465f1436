use clap::{Arg, Command};
use log::LevelFilter;
use phish_signal::image_analyzer::{ImageCollaborators, ImageSignalEngine};
use phish_signal::sender_analyzer::SenderIdentityAnalyzer;
use phish_signal::signal::{merge_strongest, SignalResult};
use phish_signal::text_analyzer::TextSignalEngine;
use phish_signal::DetectionConfig;
use std::process;

fn main() {
    let matches = Command::new("phish-signal")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multi-signal phishing risk analysis for message text, senders and screenshots")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("/etc/phish-signal.yaml"),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .value_name("FILE")
                .help("Generate a default configuration file")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("text")
                .long("text")
                .value_name("TEXT")
                .help("Analyze message text")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("sender")
                .long("sender")
                .value_name("ADDRESS")
                .help("Analyze a sender address (combined with --text when both are given)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .value_name("URL")
                .help("Analyze a url")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("image")
                .long("image")
                .value_name("REF")
                .help("Analyze an image (file path, http(s) url, or data:image url)")
                .action(clap::ArgAction::Set),
        )
        .arg(
            Arg::new("health")
                .long("health")
                .help("Report analyzer health and exit")
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
        generate_default_config(generate_path);
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

    let text_engine = TextSignalEngine::new(config.text.clone());
    let image_engine =
        ImageSignalEngine::with_collaborators(config.image.clone(), Some(image_collaborators()));

    if matches.get_flag("health") {
        let text_healthy = text_engine.is_healthy();
        let image_healthy = image_engine.is_healthy();
        let status = if text_healthy && image_healthy {
            "healthy"
        } else {
            "degraded"
        };

        print_json(&serde_json::json!({
            "status": status,
            "text_engine": text_healthy,
            "image_engine": image_healthy,
        }));
        if !(text_healthy && image_healthy) {
            process::exit(1);
        }
        return;
    }

    if let Some(image_ref) = matches.get_one::<String>("image") {
        finish(&image_engine.analyze(image_ref));
    }

    if let Some(url) = matches.get_one::<String>("url") {
        finish(&text_engine.analyze_url(url));
    }

    match (
        matches.get_one::<String>("text"),
        matches.get_one::<String>("sender"),
    ) {
        (Some(text), Some(sender)) => {
            let sender_analyzer = SenderIdentityAnalyzer::new(config.sender.clone());
            finish(&merge_strongest(
                &text_engine.analyze(text),
                &sender_analyzer.analyze_sender(sender),
            ));
        }
        (Some(text), None) => finish(&text_engine.analyze(text)),
        (None, Some(sender)) => {
            let sender_analyzer = SenderIdentityAnalyzer::new(config.sender.clone());
            finish(&sender_analyzer.analyze_sender(sender));
        }
        (None, None) => {
            eprintln!("Nothing to analyze: pass --text, --sender, --url or --image (see --help)");
            process::exit(2);
        }
    }
}

fn image_collaborators() -> ImageCollaborators {
    match ImageCollaborators::with_http_fetcher() {
        Ok(collaborators) => collaborators,
        Err(e) => {
            log::warn!("HTTP fetcher unavailable ({e}), remote image references will fail");
            ImageCollaborators::software_defaults()
        }
    }
}

fn finish(result: &SignalResult) -> ! {
    print_json(&verdict_json(result));
    match result {
        SignalResult::Error { .. } => process::exit(1),
        _ => process::exit(0),
    }
}

fn verdict_json(result: &SignalResult) -> serde_json::Value {
    match result {
        SignalResult::Error {
            message,
            indicators,
        } => serde_json::json!({
            "error": message,
            "risk_level": "error",
            "risk_score": 0,
            "indicators": indicators,
        }),
        _ => serde_json::json!({
            "risk_score": round2(result.risk_score()),
            "risk_level": result.risk_level().map(|level| level.as_str()),
            "confidence": round2(result.confidence()),
            "indicators": result.indicators(),
            "degraded": matches!(result, SignalResult::Degraded(_)),
        }),
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            eprintln!("Error rendering verdict: {e}");
            process::exit(1);
        }
    }
}

fn load_config(path: &str) -> anyhow::Result<DetectionConfig> {
    if std::path::Path::new(path).exists() {
        DetectionConfig::from_file(path)
    } else {
        log::warn!("Configuration file '{path}' not found, using default configuration");
        Ok(DetectionConfig::default())
    }
}

fn generate_default_config(path: &str) {
    let config = DetectionConfig::default();
    match config.to_file(path) {
        Ok(()) => {
            println!("Default configuration written to: {path}");
            println!("Please edit the configuration file to suit your needs.");
        }
        Err(e) => {
            eprintln!("Error writing configuration file: {e}");
            process::exit(1);
        }
    }
}
