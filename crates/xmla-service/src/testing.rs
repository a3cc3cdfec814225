//! Scripted engine used by the unit tests.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::engine::{ConnectionDescriptor, Connector, EngineError, EngineSession, Rowset};
use crate::types::{ConnectionCoordinates, ImpersonationIdentity};

pub fn coordinates() -> ConnectionCoordinates {
    ConnectionCoordinates {
        tenant_id: "tenant".into(),
        client_id: "client".into(),
        client_secret: "secret".into(),
        endpoint: "powerbi://api.powerbi.com/v1.0/myorg/Analytics".into(),
        dataset: "Payments".into(),
    }
}

pub fn identity() -> ImpersonationIdentity {
    ImpersonationIdentity::new("a@b.com".into())
}

pub fn rowset(columns: &[&str], rows: Vec<Vec<serde_json::Value>>) -> Rowset {
    Rowset {
        columns: columns.iter().map(|c| (*c).to_owned()).collect(),
        rows,
    }
}

#[derive(Default)]
struct Shared {
    script: Mutex<VecDeque<Result<Rowset, EngineError>>>,
    executed: Mutex<Vec<String>>,
    descriptor: Mutex<Option<ConnectionDescriptor>>,
    connects: AtomicUsize,
    closes: AtomicUsize,
}

/// Replays one scripted response per executed statement.
pub struct ScriptedConnector {
    shared: Arc<Shared>,
    connect_error: Option<String>,
}

impl ScriptedConnector {
    pub fn new(script: Vec<Result<Rowset, EngineError>>) -> Self {
        let shared = Shared::default();
        *shared.script.lock() = script.into();
        Self {
            shared: Arc::new(shared),
            connect_error: None,
        }
    }

    pub fn failing_connect(message: &str) -> Self {
        Self {
            shared: Arc::new(Shared::default()),
            connect_error: Some(message.to_owned()),
        }
    }

    pub fn connects(&self) -> usize {
        self.shared.connects.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.shared.closes.load(Ordering::SeqCst)
    }

    pub fn executed(&self) -> Vec<String> {
        self.shared.executed.lock().clone()
    }

    pub fn last_descriptor(&self) -> Option<ConnectionDescriptor> {
        self.shared.descriptor.lock().clone()
    }
}

#[async_trait::async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        if let Some(msg) = &self.connect_error {
            return Err(EngineError::Client(msg.clone()));
        }
        self.shared.connects.fetch_add(1, Ordering::SeqCst);
        *self.shared.descriptor.lock() = Some(descriptor.clone());
        Ok(Box::new(ScriptedSession {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct ScriptedSession {
    shared: Arc<Shared>,
}

#[async_trait::async_trait]
impl EngineSession for ScriptedSession {
    async fn execute(&mut self, statement: &str) -> Result<Rowset, EngineError> {
        self.shared.executed.lock().push(statement.to_owned());
        self.shared
            .script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(EngineError::Client("script exhausted".into())))
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        self.shared.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
