//! Issuetrack CLI
//!
//! Binary name: `issuetrack`

use std::process;

use issuetrack::{
    cli::{build_cli, handlers},
    output::ErrorOutput,
};
use issuetrack_core::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let result = match load_config(&matches).await {
        Ok(config) => {
            init_tracing(&config);
            handlers::dispatch(&matches, &config).await
        }
        Err(err) => Err(err),
    };

    if let Err(err) = result {
        #[allow(clippy::print_stderr)]
        {
            eprintln!("{}", ErrorOutput::from_error(&err).render());
        }

        let code = err
            .downcast_ref::<issuetrack_core::Error>()
            .map_or(2, issuetrack_core::Error::exit_code);

        #[allow(clippy::exit)]
        process::exit(code);
    }
}

async fn load_config(matches: &clap::ArgMatches) -> anyhow::Result<Config> {
    let mut config = issuetrack_core::load_config().await?;
    if let Some(url) = matches.get_one::<String>("database") {
        config.database_url.clone_from(url);
        config.validate()?;
    }
    Ok(config)
}

/// `RUST_LOG` wins over the configured level.
fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
