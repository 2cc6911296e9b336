use crate::demo::{run_demo, run_top_workers, DemoArgs, TopWorkersArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use gigboard::config::AppConfig;
use gigboard::error::AppError;
use gigboard::telemetry;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "gigboard",
    about = "Run the gig marketplace service or explore it from the command line",
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
    /// Print the ranked worker directory
    TopWorkers(TopWorkersArgs),
    /// Seed a sample marketplace, walk the application lifecycle, and rank workers
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Profile export (CSV) used to seed the profile source
    #[arg(long)]
    pub(crate) profiles_csv: Option<PathBuf>,
    /// Populate the application store with sample history on startup
    #[arg(long)]
    pub(crate) seed_demo: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::TopWorkers(args) => {
            let config = AppConfig::load()?;
            telemetry::init(&config.telemetry)?;
            run_top_workers(args, config.ranking).await
        }
        Command::Demo(args) => {
            let config = AppConfig::load()?;
            telemetry::init(&config.telemetry)?;
            run_demo(args, config.ranking).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn top_workers_subcommand_parses_limit_and_csv() {
        let cli = Cli::try_parse_from([
            "gigboard",
            "top-workers",
            "--limit",
            "3",
            "--profiles-csv",
            "profiles.csv",
        ])
        .expect("arguments parse");

        match cli.command {
            Some(Command::TopWorkers(args)) => {
                assert_eq!(args.limit, Some(3));
                assert_eq!(args.profiles_csv, Some(PathBuf::from("profiles.csv")));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["gigboard"]).expect("arguments parse");
        assert!(cli.command.is_none());
    }
}
