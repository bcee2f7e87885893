//! REST client for a Camunda 8 cluster (v2 API).
//!
//! Only the six calls the probe needs. Keys are accepted as JSON strings or
//! numbers since older gateways serialize them as int64.

use std::path::PathBuf;
use std::time::Instant;

use async_trait::async_trait;
use opentelemetry::KeyValue;
use reqwest::{Method, RequestBuilder, Response, multipart};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::json;
use tracing::debug;

use super::WorkflowClient;
use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::model::{
    DataItem, Definition, Deployment, DerivedRecord, Page, RecordFilter, RecordKey, Sort, UnitKey,
    UnitOfWork,
};
use crate::telemetry::metrics;

pub struct RestClient {
    http: reqwest::Client,
    base: String,
    token: Option<SecretString>,
}

impl RestClient {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("consistency-probe/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base: config.rest_address.trim_end_matches('/').to_string(),
            token: config.token,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, format!("{}/v2{path}", self.base));
        match self.token {
            Some(ref token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// Send a request, turning transport failures and non-2xx statuses into
    /// [`Error::Remote`].
    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> Result<Response> {
        let start = Instant::now();
        let result = builder.send().await;
        metrics::operation_duration_ms().record(
            start.elapsed().as_secs_f64() * 1000.0,
            &[KeyValue::new("operation", operation)],
        );

        let response = result.map_err(|e| Error::remote(operation, None, e.to_string()))?;
        let status = response.status();
        debug!(operation, status = status.as_u16(), "remote call finished");
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::remote(operation, Some(status.as_u16()), body))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> Result<T> {
        self.send(operation, builder)
            .await?
            .json::<T>()
            .await
            .map_err(|e| Error::remote(operation, None, format!("bad response body: {e}")))
    }
}

#[async_trait]
impl WorkflowClient for RestClient {
    async fn deploy_fixtures(&self, paths: &[PathBuf]) -> Result<Deployment> {
        let mut form = multipart::Form::new();
        for path in paths {
            let bytes = tokio::fs::read(path).await?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| Error::Config(format!("fixture path {} has no file name", path.display())))?;
            form = form.part("resources", multipart::Part::bytes(bytes).file_name(name));
        }

        let wire: DeploymentWire = self
            .send_json("deploy", self.request(Method::POST, "/deployments").multipart(form))
            .await?;
        let definitions = wire
            .deployments
            .into_iter()
            .filter_map(|d| d.process_definition)
            .map(|p| Definition {
                id: p.process_definition_id,
                key: p.process_definition_key,
            })
            .collect();
        Ok(Deployment { definitions })
    }

    async fn create_unit_of_work(
        &self,
        definition_id: &str,
        tag_variable: &str,
        tag: &str,
    ) -> Result<UnitOfWork> {
        let mut variables = serde_json::Map::new();
        variables.insert(tag_variable.to_string(), json!(tag));
        let body = json!({
            "processDefinitionId": definition_id,
            "variables": variables,
        });
        let wire: ProcessInstanceWire = self
            .send_json("create process instance", self.request(Method::POST, "/process-instances").json(&body))
            .await?;
        Ok(UnitOfWork {
            key: UnitKey(wire.process_instance_key),
            definition_id: wire.process_definition_id,
            tag: tag.to_string(),
        })
    }

    async fn search_derived(
        &self,
        filter: &RecordFilter,
        sort: &[Sort],
        page: Page,
    ) -> Result<Vec<DerivedRecord>> {
        let body = json!({
            "filter": {
                "state": filter.state,
                "processInstanceKey": filter.owner.0,
            },
            "sort": sort,
            "page": page,
        });
        let wire: SearchWire<UserTaskWire> = self
            .send_json("search user tasks", self.request(Method::POST, "/user-tasks/search").json(&body))
            .await?;
        Ok(wire.items.into_iter().map(DerivedRecord::from).collect())
    }

    async fn get_by_key(&self, key: &RecordKey) -> Result<DerivedRecord> {
        let wire: UserTaskWire = self
            .send_json("get user task", self.request(Method::GET, &format!("/user-tasks/{key}")))
            .await?;
        Ok(wire.into())
    }

    async fn search_derived_data(&self, key: &RecordKey, sort: &[Sort]) -> Result<Vec<DataItem>> {
        let wire: SearchWire<VariableWire> = self
            .send_json(
                "search user task variables",
                self.request(Method::POST, &format!("/user-tasks/{key}/variables/search"))
                    .json(&json!({ "sort": sort })),
            )
            .await?;
        Ok(wire
            .items
            .into_iter()
            .map(|v| DataItem {
                name: v.name,
                value: v.value,
            })
            .collect())
    }

    async fn cancel_unit_of_work(&self, key: &UnitKey) -> Result<()> {
        self.send(
            "cancel process instance",
            self.request(Method::POST, &format!("/process-instances/{key}/cancellation"))
                .json(&json!({})),
        )
        .await?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

fn key_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    match serde_json::Value::deserialize(d)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!("expected key, got {other}"))),
    }
}

#[derive(Deserialize)]
struct DeploymentWire {
    #[serde(default)]
    deployments: Vec<DeployedResourceWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployedResourceWire {
    process_definition: Option<ProcessDefinitionWire>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessDefinitionWire {
    process_definition_id: String,
    #[serde(deserialize_with = "key_string")]
    process_definition_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProcessInstanceWire {
    #[serde(deserialize_with = "key_string")]
    process_instance_key: String,
    process_definition_id: String,
}

#[derive(Deserialize)]
struct SearchWire<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserTaskWire {
    #[serde(deserialize_with = "key_string")]
    user_task_key: String,
    #[serde(deserialize_with = "key_string")]
    process_instance_key: String,
    #[serde(default)]
    state: String,
    creation_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<UserTaskWire> for DerivedRecord {
    fn from(w: UserTaskWire) -> Self {
        DerivedRecord {
            key: RecordKey(w.user_task_key),
            owner: UnitKey(w.process_instance_key),
            state: w.state,
            created_at: w.creation_date,
        }
    }
}

#[derive(Deserialize)]
struct VariableWire {
    name: String,
    value: String,
}
