use clap::Parser;
use tweet_stream::utils::{logger, validation::Validate};
use tweet_stream::{CliConfig, Credentials, OutputSink, StreamError, StreamSession};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌 (stderr)
    logger::init_cli_logger(cli.verbose, cli.log_json);

    tracing::info!("Starting tweet-stream");
    tracing::debug!("CLI config: {:?}", cli);

    if let Err(e) = run(&cli).await {
        tracing::error!(
            "❌ Stream failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());

        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig) -> Result<(), StreamError> {
    let settings = cli.resolve()?;
    settings.validate()?;

    let credentials = Credentials::from_file(&cli.keyfile)?;
    tracing::debug!("Loaded {:?}", credentials);

    let mut session = StreamSession::configure_with(&settings, &credentials, || {
        OutputSink::from_path(settings.output.as_deref())
    })?;

    let summary = session.run(shutdown_signal()).await?;

    eprintln!(
        "Stopped: {} ({} records written to {})",
        summary.stop,
        summary.forwarded,
        session.into_sink().describe()
    );
    eprintln!("Total run time {:?}", summary.elapsed);

    Ok(())
}

/// Resolves on Ctrl+C. If the handler cannot be installed the session runs
/// until a budget stops it.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
