use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use fence_core::telemetry;
use fence_model::TenantId;
use fence_rewrite::{ArgumentRewriter, RewriteError};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

mod commands;

/// Exit status for a call the policy rejects
const EXIT_POLICY_VIOLATION: u8 = 2;

fn cli() -> Command {
    let config = Arg::new("config")
        .long("config")
        .short('c')
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file (FENCE_* variables override it)");

    Command::new("fencectl")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Inspect tenant isolation policy and preview rewrites")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("policy")
                .about("Print how every operation kind is scoped for each entity")
                .arg(config.clone()),
        )
        .subcommand(
            Command::new("rewrite")
                .about("Rewrite an operation descriptor (JSON) for a tenant")
                .arg(config)
                .arg(
                    Arg::new("tenant")
                        .long("tenant")
                        .short('t')
                        .required(true)
                        .help("Tenant the call is made on behalf of"),
                )
                .arg(
                    Arg::new("input")
                        .long("input")
                        .short('i')
                        .value_parser(value_parser!(PathBuf))
                        .help("Descriptor file (stdin if omitted)"),
                )
                .arg(
                    Arg::new("compact")
                        .long("compact")
                        .action(ArgAction::SetTrue)
                        .help("Print single-line JSON"),
                ),
        )
}

fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    match matches.subcommand() {
        Some(("policy", args)) => {
            let config = commands::load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
            telemetry::init(&config.log);

            print!("{}", commands::policy_report(&config.policy()));
            Ok(())
        }
        Some(("rewrite", args)) => {
            let config = commands::load_config(args.get_one::<PathBuf>("config").map(PathBuf::as_path))?;
            telemetry::init(&config.log);

            let tenant = args
                .get_one::<String>("tenant")
                .map(|t| TenantId::new(t.as_str()))
                .context("--tenant is required")?;
            let input = commands::read_input(args.get_one::<PathBuf>("input").map(PathBuf::as_path))?;

            let rewriter = ArgumentRewriter::new(Arc::new(config.policy()));
            let op = commands::rewrite_json(&rewriter, &tenant, &input)?;

            let rendered = if args.get_flag("compact") {
                serde_json::to_string(&op)?
            } else {
                serde_json::to_string_pretty(&op)?
            };
            println!("{rendered}");
            Ok(())
        }
        _ => Ok(()),
    }
}

fn main() -> ExitCode {
    let matches = cli().get_matches();

    match run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            let violation = err
                .downcast_ref::<RewriteError>()
                .is_some_and(RewriteError::is_policy_violation);
            if violation {
                ExitCode::from(EXIT_POLICY_VIOLATION)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        cli().debug_assert();
    }

    #[test]
    fn rewrite_requires_tenant() {
        let result = cli().try_get_matches_from(["fencectl", "rewrite"]);
        assert!(result.is_err());

        let matches = cli()
            .try_get_matches_from(["fencectl", "rewrite", "--tenant", "T1", "--compact"])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "rewrite");
        assert_eq!(args.get_one::<String>("tenant").map(String::as_str), Some("T1"));
        assert!(args.get_flag("compact"));
    }
}
