use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Instant,
};

use bytes::Bytes;
use reqwest::Method;
use serde::Serialize;
use sonic_rs::to_vec;

use super::adapter::{
    RestBytes, RestError, RestFuture, RestRequest, RestResponse, RestResult, RestTransport,
    RestTransportState,
};

/// Transport-level outcome injected ahead of the queued responses.
#[derive(Clone, Debug, Default)]
pub enum MockBehavior {
    #[default]
    Pass,
    ConnectError {
        reason: String,
        retryable: bool,
    },
    SendError {
        reason: String,
        retryable: bool,
    },
    ReceiveError {
        reason: String,
        retryable: bool,
    },
    TimeoutError {
        reason: String,
    },
    InternalError {
        reason: String,
    },
    Drop,
}

impl MockBehavior {
    pub fn pass() -> Self {
        Self::Pass
    }

    pub fn connect_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::ConnectError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn send_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::SendError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn receive_error(reason: impl Into<String>, retryable: bool) -> Self {
        Self::ReceiveError {
            reason: reason.into(),
            retryable,
        }
    }

    pub fn timeout_error(reason: impl Into<String>) -> Self {
        Self::TimeoutError {
            reason: reason.into(),
        }
    }

    pub fn internal_error(reason: impl Into<String>) -> Self {
        Self::InternalError {
            reason: reason.into(),
        }
    }

    pub fn drop_response() -> Self {
        Self::Drop
    }
}

#[derive(Clone, Debug, Default)]
pub struct MockBehaviorPlan {
    request: VecDeque<MockBehavior>,
}

impl MockBehaviorPlan {
    pub fn push(&mut self, behavior: MockBehavior) -> &mut Self {
        self.request.push_back(behavior);
        self
    }

    fn pop(&mut self) -> MockBehavior {
        self.request.pop_front().unwrap_or_default()
    }
}

#[derive(Clone, Debug)]
pub struct MockResponse {
    pub status: u16,
    pub body: RestBytes,
}

impl MockResponse {
    pub fn new(status: u16, body: impl Into<RestBytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body.into())
    }

    pub fn json<T: Serialize>(status: u16, payload: &T) -> RestResult<Self> {
        let body = to_vec(payload).map_err(RestError::from_json)?;
        Ok(Self::new(status, body))
    }
}

#[derive(Clone, Debug)]
pub struct MockRestStateSnapshot {
    pub state: RestTransportState,
    pub request_count: usize,
    pub last_status: Option<u16>,
    pub behavior_remaining: usize,
    pub response_queue_len: usize,
    pub route_queue_len: usize,
    pub inbound_count: usize,
    pub outbound_count: usize,
    pub last_error: Option<String>,
}

#[derive(Debug)]
struct MockRestAdapterState {
    state: RestTransportState,
    request_count: usize,
    last_status: Option<u16>,
    behavior_plan: MockBehaviorPlan,
    default_response_queue: VecDeque<MockResponse>,
    route_response_queues: HashMap<(Method, String), VecDeque<MockResponse>>,
    outbound_log: Vec<RestRequest>,
    inbound_log: Vec<RestResponse>,
    last_error: Option<String>,
}

impl MockRestAdapterState {
    fn snapshot(&self) -> MockRestStateSnapshot {
        MockRestStateSnapshot {
            state: self.state,
            request_count: self.request_count,
            last_status: self.last_status,
            behavior_remaining: self.behavior_plan.request.len(),
            response_queue_len: self.default_response_queue.len(),
            route_queue_len: self.route_response_queues.values().map(VecDeque::len).sum(),
            inbound_count: self.inbound_log.len(),
            outbound_count: self.outbound_log.len(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Default for MockRestAdapterState {
    fn default() -> Self {
        Self {
            state: RestTransportState::Idle,
            request_count: 0,
            last_status: None,
            behavior_plan: MockBehaviorPlan::default(),
            default_response_queue: VecDeque::new(),
            route_response_queues: HashMap::new(),
            outbound_log: Vec::new(),
            inbound_log: Vec::new(),
            last_error: None,
        }
    }
}

/// In-memory stand-in for the inference endpoint. Clones share state, so a test
/// can hand one clone to the client and inspect the other.
#[derive(Clone, Debug)]
pub struct MockRestAdapter {
    state: Arc<Mutex<MockRestAdapterState>>,
}

impl MockRestAdapter {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockRestAdapterState::default())),
        }
    }

    pub fn with_behavior_plan(behavior_plan: MockBehaviorPlan) -> Self {
        let state = MockRestAdapterState {
            behavior_plan,
            ..MockRestAdapterState::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    pub fn snapshot(&self) -> MockRestStateSnapshot {
        self.state
            .lock()
            .expect("mock-restapi mutex poisoned while taking snapshot")
            .snapshot()
    }

    pub fn queue_response(&self, response: MockResponse) {
        self.state
            .lock()
            .expect("mock-restapi mutex poisoned while queueing response")
            .default_response_queue
            .push_back(response);
    }

    pub fn queue_response_for(
        &self,
        method: Method,
        url: impl Into<String>,
        response: MockResponse,
    ) {
        let key = (method, url.into());
        self.state
            .lock()
            .expect("mock-restapi mutex poisoned while queueing response by route")
            .route_response_queues
            .entry(key)
            .or_default()
            .push_back(response);
    }

    pub fn queue_post_response(&self, url: impl Into<String>, response: MockResponse) {
        self.queue_response_for(Method::POST, url, response);
    }

    pub fn outbound_requests(&self) -> Vec<RestRequest> {
        self.state
            .lock()
            .expect("mock-restapi mutex poisoned while reading outbound log")
            .outbound_log
            .clone()
    }

    pub fn last_request(&self) -> Option<RestRequest> {
        self.state
            .lock()
            .expect("mock-restapi mutex poisoned while reading outbound log")
            .outbound_log
            .last()
            .cloned()
    }

    fn pop_behavior(&self) -> MockBehavior {
        self.state
            .lock()
            .expect("mock-restapi mutex poisoned while reading behavior plan")
            .behavior_plan
            .pop()
    }

    fn next_response(&self, request: &RestRequest) -> Option<MockResponse> {
        let mut state = self
            .state
            .lock()
            .expect("mock-restapi mutex poisoned while selecting response");
        let route_key = (request.method.clone(), request.url.clone());
        if let Some(response) = state
            .route_response_queues
            .get_mut(&route_key)
            .and_then(VecDeque::pop_front)
        {
            return Some(response);
        }
        state.default_response_queue.pop_front()
    }

    fn record_outbound(&self, request: RestRequest) {
        let mut state = self
            .state
            .lock()
            .expect("mock-restapi mutex poisoned while pushing outbound log");
        state.request_count += 1;
        state.state = RestTransportState::Busy;
        state.last_error = None;
        state.outbound_log.push(request);
    }

    fn record_inbound(&self, response: RestResponse) {
        let mut state = self
            .state
            .lock()
            .expect("mock-restapi mutex poisoned while recording inbound response");
        state.last_status = Some(response.status);
        state.state = RestTransportState::Idle;
        state.inbound_log.push(response);
    }

    fn error(&self, error: RestError) -> RestError {
        let mut state = self
            .state
            .lock()
            .expect("mock-restapi mutex poisoned while recording error");
        state.state = RestTransportState::Error;
        state.last_error = Some(error.message.clone());
        state.last_status = error.status;
        error
    }
}

impl Default for MockRestAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RestTransport for MockRestAdapter {
    fn execute(&self, request: RestRequest) -> RestFuture<RestResult<RestResponse>> {
        let adapter = self.clone();
        Box::pin(async move {
            let behavior = adapter.pop_behavior();
            let start = Instant::now();
            adapter.record_outbound(request.clone());

            let failure = match behavior {
                MockBehavior::Pass => None,
                MockBehavior::Drop => {
                    Some(RestError::timeout("mock transport dropped response", false))
                }
                MockBehavior::ConnectError { reason, retryable } => {
                    Some(RestError::connect(reason, retryable))
                }
                MockBehavior::SendError { reason, retryable } => {
                    Some(RestError::send(reason, retryable))
                }
                MockBehavior::ReceiveError { reason, retryable } => {
                    Some(RestError::receive(reason, retryable))
                }
                MockBehavior::TimeoutError { reason } => Some(RestError::timeout(reason, true)),
                MockBehavior::InternalError { reason } => Some(RestError::internal(reason)),
            };
            if let Some(error) = failure {
                return Err(adapter.error(error));
            }

            let response = match adapter.next_response(&request) {
                Some(response) => RestResponse {
                    status: response.status,
                    body: response.body,
                    elapsed: start.elapsed(),
                },
                None => RestResponse {
                    status: 200,
                    body: Bytes::new(),
                    elapsed: start.elapsed(),
                },
            };
            adapter.record_inbound(response.clone());
            Ok(response)
        })
    }
}
