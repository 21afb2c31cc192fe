use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use super::criteria::{default_testing_criteria, item_schema, target_data_source};
use super::{EvaluationRun, JudgeService, OutputItem, RunHandle, RunSpec, RunStatus};
use crate::config::GateConfig;
use crate::config_file::AgentDefinition;
use crate::errors::GateError;
use crate::types::{EvalId, RunId};
use crate::ui;

const OUTPUT_PAGE_SIZE: u32 = 100;

/// A registered version of the agent under test.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentVersion {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub id: String,
}

/// Judge backed by an Azure AI Foundry project: agent versions through the project API,
/// evaluations through its OpenAI-compatible `evals` surface.
pub struct FoundryJudge {
    client: Client,
    endpoint: String,
    token: Option<String>,
    api_version: String,
}

impl FoundryJudge {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        api_version: impl Into<String>,
    ) -> Result<Self, GateError> {
        let client = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            token,
            api_version: api_version.into(),
        })
    }

    pub fn from_config(config: &GateConfig) -> Result<Self, GateError> {
        Self::new(
            config.endpoint.clone(),
            config.token.clone(),
            config.api_version.clone(),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint, path.trim_start_matches('/'))
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        let req = req.query(&[("api-version", self.api_version.as_str())]);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn send(&self, req: RequestBuilder) -> Result<Value, GateError> {
        let res: Response = self.authorize(req).send().await?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().await.unwrap_or_default();
            return Err(GateError::Service { status, body });
        }
        Ok(res.json().await?)
    }

    /// Create a new version of the named agent from its definition.
    pub async fn register_agent(&self, agent: &AgentDefinition) -> Result<AgentVersion, GateError> {
        let body = json!({
            "definition": {
                "kind": "prompt",
                "model": agent.model.as_str(),
                "instructions": agent.instructions(),
            }
        });
        let path = format!("agents/{}/versions", agent.name);
        let value = self.send(self.client.post(self.url(&path)).json(&body)).await?;
        let version: AgentVersion = serde_json::from_value(value)
            .map_err(|e| GateError::Protocol(format!("agent version: {e}")))?;
        debug!("registered agent {} version {}", version.name, version.version);
        Ok(version)
    }

    async fn create_evaluation(&self, name: &str, spec: &RunSpec) -> Result<EvalId, GateError> {
        let body = json!({
            "name": name,
            "data_source_config": item_schema(),
            "testing_criteria": default_testing_criteria(&spec.judge_deployment),
        });
        let value = self
            .send(self.client.post(self.url("openai/evals")).json(&body))
            .await?;
        let id = str_field(&value, "id")?;
        Ok(EvalId::new(id))
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Result<&'a str, GateError> {
    value
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| GateError::Protocol(format!("missing '{key}' in response")))
}

/// Parse a run object as returned by the `evals/{id}/runs` endpoints.
pub fn parse_run(eval_id: &EvalId, value: &Value) -> Result<EvaluationRun, GateError> {
    let run_id = str_field(value, "id")?;
    let status = str_field(value, "status")?;
    Ok(EvaluationRun {
        handle: RunHandle {
            eval_id: eval_id.clone(),
            run_id: RunId::new(run_id),
        },
        status: RunStatus::parse(status),
        report_url: value
            .get("report_url")
            .and_then(Value::as_str)
            .filter(|u| !u.is_empty())
            .map(str::to_string),
    })
}

/// One page of `output_items`, plus the cursor for the next page if there is one.
pub fn parse_output_page(value: &Value) -> Result<(Vec<OutputItem>, Option<String>), GateError> {
    let data = value
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| GateError::Protocol("missing 'data' in output items page".to_string()))?;
    let items: Vec<OutputItem> = data.iter().map(OutputItem::from_value).collect();

    let has_more = value
        .get("has_more")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let cursor = if has_more {
        let last = value
            .get("last_id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| items.last().and_then(|item| item.id.clone()));
        Some(last.ok_or_else(|| {
            GateError::Protocol("output items page has more data but no cursor".to_string())
        })?)
    } else {
        None
    };
    Ok((items, cursor))
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl JudgeService for FoundryJudge {
    async fn submit(&self, spec: &RunSpec) -> Result<EvaluationRun, GateError> {
        let agent = self.register_agent(&spec.agent).await?;
        ui::info(format!(
            "Agent: {}  version={}  id={}",
            agent.name, agent.version, agent.id
        ));

        let eval_name = format!("{}-gate-{}", agent.name, unix_secs());
        let eval_id = self.create_evaluation(&eval_name, spec).await?;
        ui::info(format!("Eval created: {eval_id}"));

        let body = json!({
            "name": format!("gate-{}-v{}", agent.name, agent.version),
            "data_source": target_data_source(&spec.rows, &agent.name, &agent.version),
        });
        let path = format!("openai/evals/{eval_id}/runs");
        let value = self.send(self.client.post(self.url(&path)).json(&body)).await?;
        let run = parse_run(&eval_id, &value)?;
        ui::info(format!("Eval run started: {}", run.handle.run_id));
        Ok(run)
    }

    async fn poll(&self, handle: &RunHandle) -> Result<EvaluationRun, GateError> {
        let path = format!("openai/evals/{}/runs/{}", handle.eval_id, handle.run_id);
        let value = self.send(self.client.get(self.url(&path))).await?;
        parse_run(&handle.eval_id, &value)
    }

    async fn fetch_output(&self, handle: &RunHandle) -> Result<Vec<OutputItem>, GateError> {
        let path = format!(
            "openai/evals/{}/runs/{}/output_items",
            handle.eval_id, handle.run_id
        );
        let mut items = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let mut req = self
                .client
                .get(self.url(&path))
                .query(&[("limit", OUTPUT_PAGE_SIZE.to_string())]);
            if let Some(cursor) = &after {
                req = req.query(&[("after", cursor.as_str())]);
            }
            let value = self.send(req).await?;
            let (page, next) = parse_output_page(&value)?;
            debug!("fetched {} output items for {handle}", page.len());
            items.extend(page);
            match next {
                Some(cursor) if after.as_deref() == Some(cursor.as_str()) => {
                    return Err(GateError::Protocol(format!(
                        "output items cursor did not advance past '{cursor}'"
                    )));
                }
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }
        Ok(items)
    }

    fn name(&self) -> &str {
        "foundry"
    }
}
