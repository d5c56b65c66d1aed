use clap::{Parser, Subcommand};
use log::info;
use thiserror::Error;

use super::{
    ProjectArgs, ProjectRequest, RequestError, SolveArgs, SolveRequest, build_config,
    build_project_response, build_solve_config, run_http_server, run_solve,
};

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("failed to render output: {0}")]
    Render(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(
    name = "sip",
    about = "SIP and lumpsum investment projections (step-ups, inflation and tax on gains)"
)]
pub struct App {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Project one plan and print the result as JSON
    Project(ProjectArgs),
    /// Find the amount or annual return that reaches a target maturity value
    Solve(SolveArgs),
    /// Serve the JSON API
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
}

pub async fn run(app: App) -> Result<(), CliError> {
    match app.command {
        Command::Project(args) => {
            let request = ProjectRequest {
                plan: build_config(&args)?,
                breakdown: args.breakdown,
            };
            let response = build_project_response(&request)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Solve(args) => {
            let (plan, config) = build_solve_config(&args)?;
            let response = run_solve(&SolveRequest { plan, config })?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Serve { port } => {
            info!("starting projection API on port {port}");
            run_http_server(port).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContributionFrequency, InvestmentMode, StepUpCadence};

    #[test]
    fn parses_project_flags() {
        let app = App::try_parse_from([
            "sip",
            "project",
            "--amount",
            "5000",
            "--years",
            "10",
            "--rate",
            "12",
            "--frequency",
            "daily",
            "--step-up-cadence",
            "half-yearly",
            "--step-up-percent",
            "10",
            "--inflation",
            "6",
            "--breakdown",
        ])
        .expect("flags should parse");

        let Command::Project(args) = app.command else {
            panic!("expected project command");
        };
        assert!(args.breakdown);
        let plan = build_config(&args).expect("valid config");
        let InvestmentMode::Recurring { frequency, step_up } = plan.mode else {
            panic!("expected recurring plan");
        };
        assert_eq!(frequency, ContributionFrequency::Daily);
        assert_eq!(
            step_up.map(|s| s.cadence),
            Some(StepUpCadence::HalfYearly)
        );
        assert_eq!(plan.inflation_percent, Some(6.0));
        assert_eq!(plan.tax_percent, None);
    }

    #[test]
    fn project_requires_core_flags() {
        assert!(App::try_parse_from(["sip", "project", "--amount", "5000"]).is_err());
    }

    #[test]
    fn parses_lumpsum_solve_flags() {
        let app = App::try_parse_from([
            "sip",
            "solve",
            "--mode",
            "lumpsum",
            "--amount",
            "100000",
            "--years",
            "10",
            "--rate",
            "8",
            "--goal",
            "return",
            "--target-value",
            "310585",
        ])
        .expect("flags should parse");

        let Command::Solve(args) = app.command else {
            panic!("expected solve command");
        };
        let (plan, config) = build_solve_config(&args).expect("valid solve config");
        assert_eq!(plan.mode, InvestmentMode::Lumpsum);
        assert_eq!(config.search_max, 100.0);

        let response = run_solve(&SolveRequest { plan, config }).expect("solver should run");
        let solved = response.solved_value.expect("solved value");
        assert!((solved - 12.0).abs() < 1e-3, "got {solved}");
    }

    #[test]
    fn serve_defaults_to_port_8080() {
        let app = App::try_parse_from(["sip", "serve"]).expect("serve should parse");
        assert!(matches!(app.command, Command::Serve { port: 8080 }));
    }
}
