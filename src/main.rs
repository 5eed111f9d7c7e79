use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use ecobundle::cli::{
    Commands, GlobalArgs, run_install, run_list, run_uninstall, run_verify,
};

#[derive(Parser)]
#[command(name = "ecobundle")]
#[command(about = "Install and uninstall database-backed bundles", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

/// Cancels `token` on Ctrl-C so in-flight statements are abandoned and
/// cleanup can run.
fn cancel_on_interrupt(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("ecobundle=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let cancel = CancellationToken::new();
    cancel_on_interrupt(cancel.clone());

    match cli.command {
        Commands::Install {
            bundle,
            demodata,
            reinstall,
            yes,
            non_interactive,
            json,
        } => {
            run_install(
                &cli.global,
                bundle,
                demodata,
                reinstall,
                yes,
                non_interactive,
                json,
                &cancel,
            )
            .await?;
        }
        Commands::Uninstall {
            bundle,
            yes,
            non_interactive,
            json,
        } => {
            run_uninstall(&cli.global, bundle, yes, non_interactive, json, &cancel).await?;
        }
        Commands::List { json } => run_list(&cli.global, json)?,
        Commands::Verify { repair, json } => {
            run_verify(&cli.global, repair, json, &cancel).await?;
        }
    }

    Ok(())
}
