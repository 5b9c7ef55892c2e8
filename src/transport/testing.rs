//! Scripted transport for testing
//!
//! Each `open` consumes the next queued script. Connections replay their
//! script step by step and count every `close` call so tests can check that
//! a connection is released exactly once.

use super::{Connection, Transport, TransportError};
use async_trait::async_trait;
use reqwest::Url;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum Step {
    /// Raw `data:` payload
    Data(String),
    /// Transport failure with this HTTP status
    Fail(u16),
    /// Never resolves
    Stall,
}

impl Step {
    pub fn data(raw: impl Into<String>) -> Self {
        Step::Data(raw.into())
    }
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<Vec<Step>>>,
    opened: Mutex<Vec<Url>>,
    closes: Arc<AtomicUsize>,
    refuse_open: bool,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport whose `open` always fails
    pub fn refusing() -> Self {
        Self {
            refuse_open: true,
            ..Self::default()
        }
    }

    pub fn with_script(self, steps: Vec<Step>) -> Self {
        self.scripts.lock().unwrap().push_back(steps);
        self
    }

    pub fn opened_urls(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

impl Transport for ScriptedTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Connection>, TransportError> {
        if self.refuse_open {
            return Err(TransportError::InvalidUrl(url.to_string()));
        }
        self.opened.lock().unwrap().push(url.clone());
        let steps = self.scripts.lock().unwrap().pop_front().unwrap_or_default();
        Ok(Box::new(ScriptedConnection {
            steps: steps.into(),
            closes: Arc::clone(&self.closes),
        }))
    }
}

pub struct ScriptedConnection {
    steps: VecDeque<Step>,
    closes: Arc<AtomicUsize>,
}

impl ScriptedConnection {
    pub fn new(steps: Vec<Step>, closes: Arc<AtomicUsize>) -> Self {
        Self {
            steps: steps.into(),
            closes,
        }
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn next_event(&mut self) -> Option<Result<String, TransportError>> {
        match self.steps.pop_front()? {
            Step::Data(raw) => Some(Ok(raw)),
            Step::Fail(status) => Some(Err(TransportError::Status(status))),
            Step::Stall => {
                self.steps.push_front(Step::Stall);
                futures::future::pending().await
            }
        }
    }

    fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
