//! Command line front-end of the Xooa gateway client.

pub mod arguments;
mod commands;
mod shutdown;

use {
    anyhow::Result,
    arguments::{Arguments, Command},
    clap::Parser,
    std::process::ExitCode,
};

pub async fn start(args: impl Iterator<Item = String>) -> ExitCode {
    let args = Arguments::parse_from(args);
    let obs_config = observe::Config::new(
        args.logging.log_filter.as_str(),
        args.logging.log_stderr_threshold,
        args.logging.use_json_logs,
    );
    observe::tracing::initialize(&obs_config);
    observe::metrics::setup_registry(Some("xooa".into()));
    tracing::info!("running xooa with validated arguments:\n{}", args);

    let result = run(&args.client, args.command).await;
    if args.print_metrics {
        eprint!(
            "{}",
            observe::metrics::encode(observe::metrics::get_registry())
        );
    }
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(?err, "command failed");
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(arguments: &xooa_client::Arguments, command: Command) -> Result<()> {
    let client = arguments.client()?;
    match command {
        Command::Gateway(command) => {
            let output = commands::execute(&client, command, client.timeout()).await?;
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Command::Subscribe(subscribe) => {
            let subscription = client.subscribe_events(subscribe.filter()?)?;
            commands::follow(
                subscription,
                shutdown::signal_handler(),
                &mut std::io::stdout(),
            )
            .await
        }
    }
}
