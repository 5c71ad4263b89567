//! The inference query: one POST of a JSON payload, one JSON value back.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sonic_rs::Value;
use tracing::debug;

use crate::adapter::{Client, RestRequest, RestResponse, RestResult, RestTransport};
use crate::config::EndpointConfig;

/// Sampling knobs understood by the deployed handler. Unset fields are left
/// out of the body so the handler applies its own defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GenerationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryPayload {
    pub business_description: String,
    pub inputs: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<GenerationParameters>,
}

impl QueryPayload {
    pub fn new(business_description: impl Into<String>) -> Self {
        Self {
            business_description: business_description.into(),
            inputs: String::new(),
            parameters: None,
        }
    }

    pub fn with_inputs(mut self, inputs: impl Into<String>) -> Self {
        self.inputs = inputs.into();
        self
    }

    pub fn with_parameters(mut self, parameters: GenerationParameters) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Success,
    Blocked,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DomainSuggestion {
    pub domain: String,
}

/// Reply shape of the domain-suggestion handler. Blocked and failed requests
/// carry an empty `suggestions` list and a `message`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct DomainSuggestions {
    #[serde(default)]
    pub suggestions: Vec<DomainSuggestion>,
    pub status: SuggestionStatus,
    #[serde(default)]
    pub message: Option<String>,
}

impl DomainSuggestions {
    pub fn domains(&self) -> impl Iterator<Item = &str> {
        self.suggestions.iter().map(|s| s.domain.as_str())
    }
}

/// Status and parsed body of one call, for callers that need to tell an
/// error document from a normal one.
#[derive(Clone, Debug)]
pub struct InferenceResponse {
    pub status: u16,
    pub body: Value,
    pub elapsed: Duration,
}

impl InferenceResponse {
    fn from_rest(response: RestResponse) -> RestResult<Self> {
        Ok(Self {
            status: response.status(),
            body: response.json::<Value>()?,
            elapsed: response.elapsed,
        })
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_body(self) -> Value {
        self.body
    }
}

#[derive(Clone)]
pub struct InferenceClient {
    client: Client,
    config: EndpointConfig,
}

impl InferenceClient {
    pub fn new(config: EndpointConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn with_transport<T>(config: EndpointConfig, transport: T) -> Self
    where
        T: RestTransport + 'static,
    {
        Self {
            client: Client::with_transport(transport),
            config,
        }
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// Builds the POST for `payload` without sending it.
    pub fn request<P: Serialize>(&self, payload: &P) -> RestResult<RestRequest> {
        let mut request = RestRequest::post(self.config.url())
            .with_header("Accept", "application/json")
            .with_header("Content-Type", "application/json")
            .with_bearer_auth(self.config.token())
            .with_json(payload)?;
        if let Some(timeout) = self.config.timeout() {
            request = request.with_timeout(timeout);
        }
        Ok(request)
    }

    /// Sends `payload` and returns the parsed body. The status code is not
    /// inspected: a 500 with a JSON body comes back as `Ok`.
    pub async fn query<P: Serialize>(&self, payload: &P) -> RestResult<Value> {
        Ok(self.query_response(payload).await?.into_body())
    }

    pub async fn query_response<P: Serialize>(
        &self,
        payload: &P,
    ) -> RestResult<InferenceResponse> {
        InferenceResponse::from_rest(self.send(payload).await?)
    }

    pub async fn query_as<P, T>(&self, payload: &P) -> RestResult<T>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        self.send(payload).await?.json::<T>()
    }

    async fn send<P: Serialize>(&self, payload: &P) -> RestResult<RestResponse> {
        let request = self.request(payload)?;
        debug!(url = %request.url, "sending inference query");
        let response = self.client.execute(request).await?;
        debug!(
            status = response.status(),
            elapsed_ms = response.elapsed.as_millis() as u64,
            bytes = response.body().len(),
            "inference endpoint replied"
        );
        Ok(response)
    }

    pub async fn suggest_domains(
        &self,
        business_description: impl Into<String>,
    ) -> RestResult<DomainSuggestions> {
        self.query_as(&QueryPayload::new(business_description)).await
    }
}
