use crate::generate::{list_parameter_sets, run_generate, GenerateArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use rollcall::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Roster Roll-Number Generator",
    about = "Expand school rosters into per-student roll numbers from the command line or over HTTP",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Generate roll-number reports from a roster CSV
    Generate(GenerateArgs),
    /// List the identifier templates A1 through A8
    ParameterSets,
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
        Command::Generate(args) => run_generate(args),
        Command::ParameterSets => {
            list_parameter_sets();
            Ok(())
        }
    }
}
