use std::env;

use compound::config::{NarrativeSettings, Settings, load_dotenv};

fn exit_on_config_error<T>(loaded: Result<T, compound::config::ConfigError>) -> T {
    match loaded {
        Ok(value) => value,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    // `.env` may carry RUST_LOG, so it is read before the subscriber is built.
    let dotenv_path = load_dotenv();
    compound::telemetry::init();
    match dotenv_path {
        Some(path) => tracing::debug!(path = %path.display(), "loaded .env"),
        None => tracing::debug!("no .env file found; using process environment only"),
    }

    let raw_args: Vec<String> = env::args().collect();
    if raw_args.get(1).map(|s| s.as_str()) == Some("serve") {
        let settings = exit_on_config_error(Settings::from_env());
        let port = raw_args
            .get(2)
            .and_then(|s| s.parse::<u16>().ok())
            .unwrap_or(settings.port);
        if let Err(e) = compound::api::run_http_server(port, settings).await {
            eprintln!("Server error: {e}");
            std::process::exit(1);
        }
        return;
    }

    let narrative = exit_on_config_error(NarrativeSettings::from_env());
    if let Err(e) = compound::api::run_cli(narrative).await {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
