use clap::{Parser, Subcommand};
use futures::StreamExt;
use ksql_api::{handlers::AppState, ApiServer, HttpResourceClient, LiveHub};
use ksql_config::{AppConfig, LoggingConfig};
use ksql_connector::KsqlStreamHandler;
use ksql_core::{
    DataQueryRequest, KsqlDataSource, PluginSettings, Query, ValidatorOptions,
    VariableTemplateSrv,
};
use std::sync::Arc;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "ksql-cli")]
#[command(about = "ksqlDB live data source", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the backend server
    Serve {
        /// Path to configuration directory
        #[arg(short, long, default_value = "config")]
        config_dir: String,
    },

    /// Test the data source against a running backend
    Test {
        /// Path to configuration directory
        #[arg(short, long, default_value = "config")]
        config_dir: String,

        /// Backend base URL, defaults to the configured API address
        #[arg(short, long)]
        backend_url: Option<String>,

        /// Show the username in connection failure messages
        #[arg(long)]
        include_credentials: bool,
    },

    /// Run a push query and print every response
    Query {
        /// Path to configuration directory
        #[arg(short, long, default_value = "config")]
        config_dir: String,

        #[arg(short, long, default_value = "A")]
        ref_id: String,

        /// Seconds before the stream is closed
        #[arg(short, long)]
        timeout: Option<u64>,

        /// KSQL statement, e.g. "SELECT * FROM pageviews EMIT CHANGES;"
        sql: String,
    },

    /// Validate configuration files
    Validate {
        /// Path to configuration directory
        #[arg(short, long, default_value = "config")]
        config_dir: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config_dir } => {
            let app_config = AppConfig::load(&config_dir)?;
            init_tracing(&app_config.logging);

            info!("Starting ksqlDB backend with config directory: {}", config_dir);
            info!("ksqlDB server: {}", app_config.datasource.ksqlserver);

            let hub = LiveHub::new(
                app_config.datasource.instance_settings()?,
                Arc::new(KsqlStreamHandler::new()),
            );

            let api_config = app_config.api.clone();
            let server = ApiServer::new(
                api_config.host,
                api_config.port,
                api_config.cors_enabled,
                AppState { hub },
            );

            info!("API server available at {}", app_config.api.base_url());

            tokio::select! {
                res = server.run() => {
                    if let Err(e) = res {
                        error!("API server error: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Shutting down ksqlDB backend...");
                }
            }
        }

        Commands::Test {
            config_dir,
            backend_url,
            include_credentials,
        } => {
            let app_config = AppConfig::load(&config_dir)?;
            init_tracing(&app_config.logging);

            let backend_url = backend_url.unwrap_or_else(|| app_config.api.base_url());
            info!("Testing data source through backend {}", backend_url);

            let datasource = build_datasource(&app_config, HttpResourceClient::new(backend_url))?
                .with_validator_options(ValidatorOptions {
                    include_credentials: include_credentials
                        || app_config.datasource.include_credentials_in_diagnostics,
                });

            let result = datasource.test_datasource().await;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if !result.is_success() {
                std::process::exit(1);
            }
        }

        Commands::Query {
            config_dir,
            ref_id,
            timeout,
            sql,
        } => {
            let app_config = AppConfig::load(&config_dir)?;
            init_tracing(&app_config.logging);

            let datasource = build_datasource(
                &app_config,
                HttpResourceClient::new(app_config.api.base_url()),
            )?;

            let query = Query::new(ref_id, sql).with_timeout(timeout);
            info!(
                "Running query {} for up to {}s",
                query.ref_id,
                query.effective_timeout()
            );

            let mut responses = datasource.query(DataQueryRequest::new(vec![query]));
            while let Some(response) = responses.next().await {
                println!("{}", serde_json::to_string(&response)?);
            }
        }

        Commands::Validate { config_dir } => {
            let app_config = AppConfig::load(&config_dir)?;
            let settings = PluginSettings::load(&app_config.datasource.instance_settings()?)?;

            if settings.ksqlserver.is_empty() {
                anyhow::bail!("KsqlDB server is a mandatory parameter");
            }

            println!("✓ Configuration is valid");
            println!("\n📦 Data source: {}", app_config.datasource.uid);
            println!("  • server: {}", settings.ksqlserver);
            println!("  • http/2: {}", settings.http);
            match settings.credentials() {
                Some((username, _)) => println!("  • basic auth as {}", username),
                None => println!("  • no authentication"),
            }
            println!("\n🌐 API: {}", app_config.api.base_url());
            println!(
                "\n📝 Logging: {}{}",
                app_config.logging.level,
                if app_config.logging.json { " (json)" } else { "" }
            );
        }
    }

    Ok(())
}

/// Front end wired to an in-process live hub
fn build_datasource(
    app_config: &AppConfig,
    resources: HttpResourceClient,
) -> anyhow::Result<KsqlDataSource> {
    let hub = LiveHub::new(
        app_config.datasource.instance_settings()?,
        Arc::new(KsqlStreamHandler::new()),
    );

    Ok(KsqlDataSource::new(
        app_config.datasource.uid.clone(),
        app_config.datasource.json_data(),
        Arc::new(hub),
        Arc::new(resources),
        Arc::new(VariableTemplateSrv::new()),
    ))
}

fn init_tracing(config: &LoggingConfig) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(env_filter);
    let result = if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()
    };

    // Ignore if already initialized
    result.ok();
}
