//! Deterministic clock and transport for unit tests.

use crate::clock::Clock;
use crate::error::TransportError;
use crate::transport::RemoteCall;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

/// Local clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(start: f64) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, millis: f64) {
        *self.now.lock().unwrap() += millis;
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> f64 {
        *self.now.lock().unwrap()
    }
}

type Handler = Box<dyn Fn(usize, &Url) -> Result<Value, TransportError> + Send + Sync>;

/// Transport that answers from a closure and records every URL it was given.
pub struct ScriptedTransport {
    handler: Handler,
    requests: Mutex<Vec<Url>>,
    /// Timeout passed with the latest call, `None` for plain `call`
    last_timeout: Mutex<Option<Duration>>,
    /// Clock moved forward by `round_trip` during each call
    clock: Option<(Arc<ManualClock>, f64)>,
}

impl ScriptedTransport {
    pub fn new(
        handler: impl Fn(usize, &Url) -> Result<Value, TransportError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            last_timeout: Mutex::new(None),
            clock: None,
        }
    }

    pub fn replying(body: Value) -> Self {
        Self::new(move |_, _| Ok(body.clone()))
    }

    /// Each call takes `round_trip` ms of local time, elapsed before the
    /// handler runs.
    pub fn with_clock(mut self, clock: Arc<ManualClock>, round_trip: f64) -> Self {
        self.clock = Some((clock, round_trip));
        self
    }

    pub fn requests(&self) -> Vec<Url> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<Url> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        *self.last_timeout.lock().unwrap()
    }

    fn respond(&self, url: &Url, timeout: Option<Duration>) -> Result<Value, TransportError> {
        let index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(url.clone());
            requests.len() - 1
        };
        *self.last_timeout.lock().unwrap() = timeout;
        if let Some((clock, round_trip)) = &self.clock {
            clock.advance(*round_trip);
        }
        (self.handler)(index, url)
    }
}

#[async_trait]
impl RemoteCall for ScriptedTransport {
    async fn call(&self, url: &Url) -> Result<Value, TransportError> {
        self.respond(url, None)
    }

    async fn call_with_timeout(
        &self,
        url: &Url,
        timeout: Duration,
    ) -> Result<Value, TransportError> {
        self.respond(url, Some(timeout))
    }
}

/// A `getServerTime` endpoint whose measured samples have exactly the given
/// offsets, cycling through them. The first call is the warm-up and reports
/// a wildly wrong time that must not influence the estimate.
pub fn time_server(
    clock: Arc<ManualClock>,
    round_trip: f64,
    offsets: Vec<f64>,
) -> ScriptedTransport {
    let reader = clock.clone();
    ScriptedTransport::new(move |index, _| {
        if index == 0 {
            return Ok(json!({ "serverTime": 0 }));
        }
        let received_at = reader.now_millis();
        let offset = offsets[(index - 1) % offsets.len()];
        Ok(json!({ "serverTime": received_at + offset - round_trip / 2.0 }))
    })
    .with_clock(clock, round_trip)
}

/// Query parameter lookup for recorded URLs.
pub fn query_param(url: &Url, name: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
