mod anchors;
mod chain;
mod cli;
mod crypto;
mod denial;
mod records;
mod reorder;
mod validate;

#[cfg(test)]
mod proptest_helpers;

use anyhow::Result;
use chain::ChainValidator;
use cli::Invocation;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use validate::ValidationRequest;

fn main() -> ExitCode {
    // Logging goes to stderr; stdout carries only the one result line.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dnsvet=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        eprintln!("{}", cli::USAGE);
        return ExitCode::from(2);
    }

    match run(&args) {
        Ok(status) => {
            println!("{status}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &[String]) -> Result<validate::ValidationStatus> {
    let invocation = Invocation::from_args(args)?;

    let to_validate = records::parse_rr_file(&invocation.to_validate, records::DEFAULT_TTL)?;
    let support = records::parse_rr_file(&invocation.support, records::DEFAULT_TTL)?;
    let trust_anchors = anchors::load(invocation.trust_anchors.as_deref())?;

    tracing::debug!(
        to_validate = to_validate.len(),
        support = support.len(),
        trust_anchors = trust_anchors.len(),
        "record sets loaded"
    );

    let request = ValidationRequest {
        records: &to_validate,
        support: &support,
        trust_anchors: &trust_anchors,
        at: invocation.at,
        query: invocation.query,
    };

    validate::classify(&ChainValidator::new(), &request)
}
