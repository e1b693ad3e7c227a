#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use riskscope::{Field, OracleError, ParameterVector, PredictionOracle, PredictionResult};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Oracle whose probability is `age / 100`, with per-call latency and
/// switchable failure. Records every vector it is asked about.
pub struct ScriptedOracle {
    seen: Mutex<Vec<ParameterVector>>,
    latency: Box<dyn Fn(&ParameterVector) -> Duration + Send + Sync>,
    failing: AtomicBool,
}

impl ScriptedOracle {
    pub fn instant() -> Arc<Self> {
        Self::with_latency(|_| Duration::ZERO)
    }

    pub fn with_latency(
        latency: impl Fn(&ParameterVector) -> Duration + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            latency: Box::new(latency),
            failing: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<ParameterVector> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl PredictionOracle for ScriptedOracle {
    async fn predict(&self, vector: &ParameterVector) -> Result<PredictionResult, OracleError> {
        self.seen.lock().unwrap().push(vector.clone());
        let delay = (self.latency)(vector);
        let failing = self.failing.load(Ordering::SeqCst);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(OracleError::Unavailable("connection refused".to_string()));
        }
        PredictionResult::from_probability(vector.get(Field::Age) / 100.0, 0.5)
            .map_err(|e| OracleError::InvalidResponse(e.to_string()))
    }
}

pub fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
