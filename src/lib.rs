//! Client for a hosted inference endpoint: one JSON POST per query, with an
//! in-memory mock transport for fully deterministic tests.

pub mod adapter;
pub mod config;
pub mod mock;
pub mod query;

pub use reqwest::Method;

pub use adapter::{
    Client, ReqwestTransport, RestBytes, RestError, RestErrorKind, RestFuture, RestRequest,
    RestResponse, RestResult, RestTransport, RestTransportState,
};
pub use config::{ConfigError, DEFAULT_ENDPOINT_URL, EndpointConfig};
pub use mock::{
    MockBehavior, MockBehaviorPlan, MockResponse, MockRestAdapter, MockRestStateSnapshot,
};
pub use query::{
    DomainSuggestion, DomainSuggestions, GenerationParameters, InferenceClient,
    InferenceResponse, QueryPayload, SuggestionStatus,
};
