use anyhow::{Result, anyhow};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_AGENT_CONFIG: &str = "agent/config/agent.yaml";
pub const DEFAULT_THRESHOLDS: &str = "evals/eval_thresholds.json";
pub const DEFAULT_TEST_DATA: &str = "evals/test_data.jsonl";

#[derive(Debug, Clone)]
pub struct CliArgs {
    pub agent_config: PathBuf,       // --agent-config
    pub thresholds: PathBuf,         // --thresholds
    pub test_data: PathBuf,          // --test-data
    pub poll_interval: Option<u64>,  // --poll-interval (seconds)
    pub max_wait: Option<u64>,       // --max-wait (seconds, 0 = unlimited)
    pub register_only: bool,         // --register-only
    pub json_output: bool,           // --json
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse() -> Result<Self> {
        let args: Vec<String> = env::args().collect();
        Self::parse_from(&args[1..])
    }

    /// Parse from a slice of arguments (for testing)
    pub fn parse_from(args: &[String]) -> Result<Self> {
        let mut result = CliArgs {
            agent_config: PathBuf::from(DEFAULT_AGENT_CONFIG),
            thresholds: PathBuf::from(DEFAULT_THRESHOLDS),
            test_data: PathBuf::from(DEFAULT_TEST_DATA),
            poll_interval: None,
            max_wait: None,
            register_only: false,
            json_output: false,
        };

        let mut i = 0;
        while i < args.len() {
            let arg = &args[i];

            match arg.as_str() {
                "--agent-config" => {
                    result.agent_config = PathBuf::from(value(args, &mut i)?);
                }
                "--thresholds" => {
                    result.thresholds = PathBuf::from(value(args, &mut i)?);
                }
                "--test-data" => {
                    result.test_data = PathBuf::from(value(args, &mut i)?);
                }
                "--poll-interval" => {
                    result.poll_interval = Some(seconds(args, &mut i)?);
                }
                "--max-wait" => {
                    result.max_wait = Some(seconds(args, &mut i)?);
                }
                "--register-only" => {
                    result.register_only = true;
                }
                "--json" => {
                    result.json_output = true;
                }
                unknown => {
                    return Err(anyhow!("Unknown argument: {unknown}"));
                }
            }

            i += 1;
        }

        Ok(result)
    }
}

fn value<'a>(args: &'a [String], i: &mut usize) -> Result<&'a str> {
    let flag = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{flag} requires a value"))
}

fn seconds(args: &[String], i: &mut usize) -> Result<u64> {
    let flag = args[*i].clone();
    let raw = value(args, i)?;
    raw.parse()
        .map_err(|_| anyhow!("{flag} expects a number of seconds, got '{raw}'"))
}
