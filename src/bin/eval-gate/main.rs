use anyhow::{Context, Result};
use std::process::ExitCode;

use eval_gate::judge::foundry::FoundryJudge;
use eval_gate::observability::DecisionLog;
use eval_gate::report::StepSummary;
use eval_gate::{
    AgentDefinition, EvaluationRunPoller, GateConfig, GateError, GateRunner, RunSpec,
    ThresholdConfig, load_test_rows, ui,
};

mod args;
use args::CliArgs;

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if available, before RUST_LOG is read
    let _ = dotenvy::dotenv();
    ui::init_logging();

    tokio::select! {
        result = run() => match result {
            Ok(code) => code,
            Err(e) => {
                ui::error(failure_message(&e));
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            ui::error("Interrupted before the evaluation gate finished.");
            ExitCode::FAILURE
        }
    }
}

fn failure_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<GateError>() {
        Some(gate) if gate.is_configuration() => format!("Configuration error: {e:#}"),
        _ => format!("{e:#}"),
    }
}

async fn run() -> Result<ExitCode> {
    let args = CliArgs::parse()?;
    ui::set_machine_log(args.json_output);

    let mut config = GateConfig::from_env()?;
    if let Some(secs) = args.poll_interval {
        config.poll.interval = std::time::Duration::from_secs(secs);
    }
    if let Some(secs) = args.max_wait {
        config.poll.max_wait = (secs > 0).then(|| std::time::Duration::from_secs(secs));
    }

    let agent = AgentDefinition::load(&args.agent_config)
        .context("loading agent definition")?
        .with_name_override(config.agent_name_override.as_deref());
    let judge = FoundryJudge::from_config(&config)?;

    if args.register_only {
        let version = judge.register_agent(&agent).await?;
        ui::info(format!(
            "Created agent '{}' version {} (id: {})",
            version.name, version.version, version.id
        ));
        println!("AGENT_NAME={}", version.name);
        println!("AGENT_VERSION={}", version.version);
        return Ok(ExitCode::SUCCESS);
    }

    let thresholds =
        ThresholdConfig::load(&args.thresholds).context("loading threshold configuration")?;
    let rows = load_test_rows(&args.test_data).context("loading test data")?;
    log::info!("loaded {} test rows from {}", rows.len(), args.test_data.display());

    let spec = RunSpec {
        agent,
        judge_deployment: config.judge_deployment.clone(),
        rows,
    };

    let outcome = GateRunner::new(&judge, EvaluationRunPoller::new(config.poll))
        .with_step_summary(StepSummary::new(config.step_summary.clone()))
        .with_decision_log(config.log_dir.as_deref().map(DecisionLog::in_dir))
        .run(&spec, &thresholds)
        .await?;

    Ok(outcome.exit_code())
}
