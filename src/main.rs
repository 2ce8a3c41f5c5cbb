use anyhow::Context;
use sophia::{
    api,
    cli::{output::Output, Cli, Commands},
    llm::stream::StdoutObserver,
    rag::RecommendationPipeline,
    utils::toml_config::SophiaConfig,
    AppState,
};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG: &str = "sophia.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = load_config(&cli.config, &output)?;
    init_tracing(&config.server.log_level, cli.verbose, cli.json_logs);

    let command = cli.command.unwrap_or(Commands::Serve {
        host: None,
        port: None,
    });

    match command {
        Commands::Serve { host, port } => serve(config, host, port, &output).await,
        Commands::Ingest { file } => ingest(&config, &file, &output).await,
        Commands::Query { question, json } => query(&config, &question, json, &output).await,
        Commands::DeleteAll { yes } => delete_all(&config, yes, &output).await,
        Commands::Config { validate } => show_config(&config, &cli.config, validate, &output),
    }
}

/// Load `path`; a missing default file falls back to built-in defaults.
fn load_config(path: &Path, output: &Output) -> anyhow::Result<SophiaConfig> {
    if !path.exists() && path == Path::new(DEFAULT_CONFIG) {
        output.warning(&format!(
            "{} not found, using built-in defaults",
            DEFAULT_CONFIG
        ));
        return Ok(SophiaConfig::default());
    }

    SophiaConfig::load(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))
}

fn init_tracing(log_level: &str, verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { log_level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    // Logs go to stderr so streamed tokens and JSON results own stdout
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

async fn serve(
    config: SophiaConfig,
    host: Option<String>,
    port: Option<u16>,
    output: &Output,
) -> anyhow::Result<()> {
    output.banner();

    let pipeline = RecommendationPipeline::from_config(&config).await?;
    match pipeline.record_count().await {
        Ok(records) => tracing::info!(
            namespace = pipeline.namespace(),
            records,
            "Vector index connected"
        ),
        Err(e) => tracing::warn!(error = %e, "Vector index not reachable at startup"),
    }

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr = format!("{}:{}", host, port);

    let state = AppState {
        config: Arc::new(config),
        pipeline: Arc::new(pipeline),
    };
    let app = api::build_app(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.success(&format!("Listening on http://{}", addr));
    tracing::info!(%addr, "Server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}

fn require_persistent_index(
    config: &SophiaConfig,
    command: &str,
    output: &Output,
) -> anyhow::Result<()> {
    config.require_persistent_index(command).map_err(|e| {
        output.error(&e.to_string());
        e.into()
    })
}

async fn ingest(config: &SophiaConfig, file: &Path, output: &Output) -> anyhow::Result<()> {
    require_persistent_index(config, "ingest", output)?;
    let pipeline = RecommendationPipeline::from_config(config).await?;

    match pipeline.ingest(file).await {
        Ok(result) => {
            output.ingested(&result);
            Ok(())
        }
        Err(e) => {
            output.error(&e.to_string());
            Err(e.into())
        }
    }
}

async fn query(
    config: &SophiaConfig,
    question: &str,
    json: bool,
    output: &Output,
) -> anyhow::Result<()> {
    require_persistent_index(config, "query", output)?;
    let pipeline = RecommendationPipeline::from_config(config).await?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let result = if json {
        pipeline
            .query(question, &sophia::llm::NoopObserver, &cancel)
            .await
    } else {
        pipeline.query(question, &StdoutObserver, &cancel).await
    };

    let result = match result {
        Ok(result) => result,
        Err(e) => {
            output.error(&e.to_string());
            return Err(e.into());
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    output.header("Recommendations");
    for (i, item) in result.items.iter().enumerate() {
        output.recommendation(i + 1, item);
    }
    output.header("Sources");
    for doc in &result.source_documents {
        output.source(doc);
    }
    Ok(())
}

async fn delete_all(config: &SophiaConfig, yes: bool, output: &Output) -> anyhow::Result<()> {
    require_persistent_index(config, "delete-all", output)?;
    let namespace = &config.rag.namespace;
    if !yes
        && !output.confirm(&format!(
            "Delete every record in namespace '{}'?",
            namespace
        ))
    {
        output.info("Aborted");
        return Ok(());
    }

    let pipeline = RecommendationPipeline::from_config(config).await?;
    pipeline.delete_all().await?;
    output.success(&format!("Namespace '{}' cleared", namespace));
    Ok(())
}

fn show_config(
    config: &SophiaConfig,
    path: &Path,
    validate: bool,
    output: &Output,
) -> anyhow::Result<()> {
    if !validate {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    output.header("Configuration");
    output.kv("file", &path.display().to_string());
    config.validate()?;
    output.success("Values are valid");

    let mut missing = 0;
    for var in config.required_env_vars() {
        if config.resolve_env(var).is_some() {
            output.success(&format!("{} is set", var));
        } else {
            output.warning(&format!("{} is not set", var));
            missing += 1;
        }
    }

    if missing > 0 {
        output.hint("Set the missing variables in the environment or a .env file");
        anyhow::bail!("{} required environment variable(s) missing", missing);
    }
    Ok(())
}
