//! `XmlaConnector` implements the engine capability over XMLA/HTTP.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use url::Url;
use xmla_service::engine::{ConnectionDescriptor, Connector, EngineError, EngineSession, Rowset};

use crate::endpoint;
use crate::envelope::{self, EXECUTE_ACTION, ExecuteProperties, SessionHeader};
use crate::error::XmlaError;
use crate::response::{self, ExecuteResponse};

/// Longest slice of an unexpected HTTP body kept in error messages.
const BODY_SNIPPET: usize = 512;

/// Opens XMLA sessions. Cheap to clone; shares one HTTP connection pool.
#[derive(Clone)]
pub struct XmlaConnector {
    http: reqwest::Client,
}

impl XmlaConnector {
    /// Creates a connector with the default HTTP client settings.
    pub fn new() -> Result<Self, XmlaError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("xmla-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http })
    }

    /// Creates a connector on top of an existing client.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl Connector for XmlaConnector {
    async fn connect(
        &self,
        descriptor: &ConnectionDescriptor,
    ) -> Result<Box<dyn EngineSession>, EngineError> {
        let url = endpoint::resolve(&descriptor.data_source)?;
        let transport = Transport {
            http: self.http.clone(),
            url,
            user_id: descriptor.user_id.clone(),
            password: descriptor.password.clone(),
        };
        let properties = ExecuteProperties {
            catalog: descriptor.catalog.clone(),
            effective_user_name: descriptor.effective_user_name.clone(),
        };

        let begin = envelope::execute("", &properties, SessionHeader::Begin);
        let resp = transport.post(begin).await?;
        resp.result?;
        let session_id = resp.session_id.ok_or(XmlaError::MissingSession)?;

        tracing::debug!(%session_id, url = %transport.url, "XMLA session started");
        Ok(Box::new(XmlaSession {
            transport,
            properties,
            session_id,
            lost: false,
        }))
    }
}

struct Transport {
    http: reqwest::Client,
    url: Url,
    user_id: String,
    password: String,
}

impl Transport {
    async fn post(&self, body: String) -> Result<ExecuteResponse, XmlaError> {
        let resp = self
            .http
            .post(self.url.clone())
            .basic_auth(&self.user_id, Some(&self.password))
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header("SOAPAction", EXECUTE_ACTION)
            .body(body)
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(XmlaError::Unauthorized(status.as_u16()));
        }

        let text = resp.text().await?;
        match response::parse(&text) {
            // Faults usually arrive with HTTP 500; the envelope explains them.
            Ok(parsed) if status.is_success() || parsed.result.is_err() => Ok(parsed),
            _ if !status.is_success() => Err(XmlaError::Status {
                status: status.as_u16(),
                body: snippet(&text),
            }),
            other => other,
        }
    }
}

fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    match trimmed.char_indices().nth(BODY_SNIPPET) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_owned(),
    }
}

/// A live XMLA session bound to one catalog and effective user.
struct XmlaSession {
    transport: Transport,
    properties: ExecuteProperties,
    session_id: String,
    lost: bool,
}

#[async_trait]
impl EngineSession for XmlaSession {
    async fn execute(&mut self, statement: &str) -> Result<Rowset, EngineError> {
        let request = envelope::execute(
            statement,
            &self.properties,
            SessionHeader::Use(&self.session_id),
        );
        let outcome = self.transport.post(request).await.and_then(|resp| resp.result);
        outcome.map_err(|e| {
            let err = e.into_session_error();
            if matches!(err, EngineError::SessionLost(_)) {
                self.lost = true;
            }
            err
        })
    }

    async fn close(&mut self) -> Result<(), EngineError> {
        if self.lost {
            tracing::debug!(session_id = %self.session_id, "XMLA session already lost; skipping EndSession");
            return Ok(());
        }
        let request = envelope::execute(
            "",
            &self.properties,
            SessionHeader::End(&self.session_id),
        );
        let resp = self.transport.post(request).await?;
        resp.result?;
        tracing::debug!(session_id = %self.session_id, "XMLA session ended");
        Ok(())
    }
}
