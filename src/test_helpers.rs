//! Shared test helpers: an in-memory transport and load-context builders.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{FetchQueue, RawResponse, Transport};
use crate::loader::LoadContext;
use crate::progress::Progress;
use crate::types::{Event, ProjectId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

enum Route {
    Respond {
        status: u16,
        body: Vec<u8>,
        delay: Option<Duration>,
    },
    Fail(String),
}

/// Transport answering from a URL → response table
///
/// Unknown URLs answer 404. Tracks request order, per-URL hit counts and the
/// highest number of calls that were in progress at the same time.
pub(crate) struct StubTransport {
    routes: Mutex<HashMap<String, Route>>,
    default_delay: Option<Duration>,
    log: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubTransport {
    pub(crate) fn new() -> Self {
        Self {
            routes: Mutex::new(HashMap::new()),
            default_delay: None,
            log: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    pub(crate) fn respond(&self, url: &str, status: u16, body: impl Into<Vec<u8>>) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route::Respond {
                status,
                body: body.into(),
                delay: None,
            },
        );
    }

    pub(crate) fn respond_after(&self, url: &str, delay: Duration, body: impl Into<Vec<u8>>) {
        self.routes.lock().unwrap().insert(
            url.to_string(),
            Route::Respond {
                status: 200,
                body: body.into(),
                delay: Some(delay),
            },
        );
    }

    pub(crate) fn fail(&self, url: &str, reason: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(url.to_string(), Route::Fail(reason.to_string()));
    }

    pub(crate) fn request_log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn total_requests(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub(crate) fn hits(&self, url: &str) -> usize {
        self.log.lock().unwrap().iter().filter(|u| *u == url).count()
    }

    pub(crate) fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, url: &str) -> Result<RawResponse> {
        self.log.lock().unwrap().push(url.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let answer = {
            let routes = self.routes.lock().unwrap();
            match routes.get(url) {
                Some(Route::Respond {
                    status,
                    body,
                    delay,
                }) => Ok((*status, body.clone(), delay.or(self.default_delay))),
                Some(Route::Fail(reason)) => Err(reason.clone()),
                None => Ok((404, Vec::new(), self.default_delay)),
            }
        };

        let result = match answer {
            Ok((status, body, delay)) => {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                Ok(RawResponse::new(url, status, body))
            }
            Err(reason) => {
                if let Some(delay) = self.default_delay {
                    tokio::time::sleep(delay).await;
                }
                Err(Error::Transport {
                    url: url.to_string(),
                    reason,
                    status: None,
                })
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Build a load context over a stub transport, with a subscribed event receiver
pub(crate) fn test_context(
    transport: Arc<StubTransport>,
    config: Config,
    id: ProjectId,
) -> (LoadContext, broadcast::Receiver<Event>) {
    let (event_tx, event_rx) = broadcast::channel(1000);
    let queue = FetchQueue::new(transport, config.fetch.max_concurrent_requests);
    let progress = Progress::new(id, event_tx);
    (LoadContext::new(queue, Arc::new(config), progress), event_rx)
}

/// Drain every event currently buffered in a receiver
pub(crate) fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Count (started, finished) task events
pub(crate) fn task_balance(events: &[Event]) -> (usize, usize) {
    let started = events
        .iter()
        .filter(|e| matches!(e, Event::TaskStarted { .. }))
        .count();
    let finished = events
        .iter()
        .filter(|e| matches!(e, Event::TaskFinished { .. }))
        .count();
    (started, finished)
}
