//! Client side of the similarity oracle.
//!
//! The oracle is an external service that, given a variable's context and
//! its known bounds, returns a ranked list of type descriptions. Only the
//! request/response contract lives here. A failed or timed-out request is
//! reported as an `OracleError`; the extractor treats that as "no
//! candidates".

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use gradus_types::{parse_ty, Ty};

use crate::config::OracleConfig;
use crate::error::OracleError;

/// What the oracle is told about one variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleRequest {
    pub owner: String,
    /// `arg`, `ret` or `var`.
    pub position: String,
    pub name: String,
    pub lower: Vec<String>,
    pub upper: Vec<String>,
    pub top_n: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OracleResponse {
    #[serde(default)]
    pub candidates: Vec<String>,
}

/// A source of ranked type guesses.
///
/// `open` is called once before the first query of an extraction run and
/// `close` once after the last, on every exit path.
pub trait SimilarityOracle {
    fn open(&mut self) -> Result<(), OracleError> {
        Ok(())
    }

    /// Ranked type descriptions, best first.
    fn query(&mut self, request: &OracleRequest) -> Result<Vec<String>, OracleError>;

    fn close(&mut self) {}
}

/// JSON over HTTP POST to a local endpoint.
pub struct HttpOracle {
    endpoint: String,
    timeout: Duration,
    agent: Option<ureq::Agent>,
}

impl HttpOracle {
    pub fn new(config: &OracleConfig) -> Self {
        HttpOracle {
            endpoint: config.endpoint.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
            agent: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.agent.is_some()
    }
}

impl SimilarityOracle for HttpOracle {
    fn open(&mut self) -> Result<(), OracleError> {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(self.timeout)
            .timeout_read(self.timeout)
            .timeout_write(self.timeout)
            .build();
        self.agent = Some(agent);
        Ok(())
    }

    fn query(&mut self, request: &OracleRequest) -> Result<Vec<String>, OracleError> {
        let agent = self.agent.as_ref().ok_or(OracleError::NotOpen)?;
        let body = serde_json::to_string(request).map_err(|e| OracleError::Decode(e.to_string()))?;
        let response = agent
            .post(&self.endpoint)
            .set("Content-Type", "application/json")
            .send_string(&body)
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        let text = response
            .into_string()
            .map_err(|e| OracleError::Transport(e.to_string()))?;
        decode_response(&text)
    }

    fn close(&mut self) {
        self.agent = None;
    }
}

/// Decode a response body into its candidate descriptions.
pub fn decode_response(body: &str) -> Result<Vec<String>, OracleError> {
    serde_json::from_str::<OracleResponse>(body)
        .map(|r| r.candidates)
        .map_err(|e| OracleError::Decode(e.to_string()))
}

/// Parse candidate descriptions, skipping (and logging) the unparseable.
pub fn parse_candidates(raw: &[String]) -> Vec<Ty> {
    raw.iter()
        .filter_map(|desc| match parse_ty(desc) {
            Ok(ty) => Some(ty),
            Err(e) => {
                warn!(candidate = %desc, error = %e, "skipping unparseable oracle candidate");
                None
            }
        })
        .collect()
}
