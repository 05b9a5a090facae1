use crate::process::{run_process_nbn, ProcessNbnArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use nbn_ordering::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "NBN Order Worker",
    about = "Sweep awaiting applications and place their NBN service orders",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service with the worker pool and periodic sweeps (default command)
    Serve(ServeArgs),
    /// One-shot operations against the application registry
    Applications {
        #[command(subcommand)]
        command: ApplicationsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ApplicationsCommand {
    /// Run one NBN order sweep, wait for every dispatched order, and print a summary
    ProcessNbn(ProcessNbnArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Applications {
            command: ApplicationsCommand::ProcessNbn(args),
        } => run_process_nbn(args).await,
    }
}
