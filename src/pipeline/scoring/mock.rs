use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use super::types::{OracleRequest, ReasoningOracle};
use super::OracleError;

type Script = Box<dyn Fn(&OracleRequest, usize) -> Result<String, OracleError> + Send + Sync>;

/// Test oracle answering from per-principle scripts.
///
/// A script receives the request and the 1-based call number for that
/// principle. Principles without a script use the default.
pub struct ScriptedOracle {
    scripts: HashMap<String, Script>,
    default: Script,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, usize>>,
    requests: Mutex<Vec<OracleRequest>>,
    total: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedOracle {
    /// Every principle scores `score`, citing the first evidence chunk.
    pub fn uniform(score: u8) -> Self {
        Self::with_default(move |req, _| Ok(answer_citing_first(req, score)))
    }

    pub fn with_default(
        default: impl Fn(&OracleRequest, usize) -> Result<String, OracleError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            scripts: HashMap::new(),
            default: Box::new(default),
            delay: None,
            calls: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            total: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn script(
        mut self,
        principle_id: &str,
        script: impl Fn(&OracleRequest, usize) -> Result<String, OracleError> + Send + Sync + 'static,
    ) -> Self {
        self.scripts.insert(principle_id.to_string(), Box::new(script));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls_for(&self, principle_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(principle_id)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn requests_for(&self, principle_id: &str) -> Vec<OracleRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.principle.id == principle_id)
            .cloned()
            .collect()
    }
}

impl ReasoningOracle for ScriptedOracle {
    async fn invoke(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let call_no = {
            let mut calls = self.calls.lock().unwrap();
            let n = calls.entry(request.principle.id.clone()).or_insert(0);
            *n += 1;
            *n
        };
        self.requests.lock().unwrap().push(request.clone());
        self.total.fetch_add(1, Ordering::SeqCst);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let script = self
            .scripts
            .get(&request.principle.id)
            .unwrap_or(&self.default);
        script(request, call_no)
    }
}

/// Well-formed answer citing the first evidence chunk.
pub fn answer_citing_first(request: &OracleRequest, score: u8) -> String {
    let chunk_id = request
        .evidence
        .first()
        .map(|e| e.chunk_id.to_string())
        .unwrap_or_default();
    serde_json::json!({
        "score": score,
        "rationale": format!("Evidence for {}.", request.principle.name),
        "citations": [{"chunk_id": chunk_id}],
    })
    .to_string()
}

/// Well-formed answer citing a chunk that is not in any bundle.
pub fn answer_citing_unknown(score: u8) -> String {
    serde_json::json!({
        "score": score,
        "rationale": "Looks promising.",
        "citations": ["00000000-0000-0000-0000-000000000000#999"],
    })
    .to_string()
}
