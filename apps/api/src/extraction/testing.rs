//! Stand-in models for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::model::{Generation, GenerationRequest, GenerativeModel, ModelError};

pub(crate) const COMBINED_REPLY: &str = r#"{"full_name": "Иван Петров", "raw_summary": "Сварщик с 10 годами опыта. Имеет действующие сертификаты.", "vector": {"skills_verified_count": 8, "years_experience": 10.0, "commute_time_minutes": 20, "shift_preference": 0, "salary_expectation": 80000, "has_certifications": true}}"#;

pub(crate) const VECTOR_REPLY: &str = r#"{"skills_verified_count": 2, "years_experience": 1.0, "commute_time_minutes": 120, "shift_preference": 1, "salary_expectation": 120000, "has_certifications": false}"#;

pub(crate) const PROFILE_REPLY: &str = r#"{"full_name": "Анна Смирнова", "raw_summary": "Кладовщик. Готова к ночным сменам."}"#;

/// Replays canned generations in order and records every request.
pub(crate) struct ScriptedModel {
    replies: Mutex<VecDeque<Generation>>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedModel {
    pub(crate) fn new(replies: Vec<&str>) -> Self {
        Self::with_generations(
            replies
                .into_iter()
                .map(|text| Generation {
                    text: text.to_string(),
                    truncated: false,
                })
                .collect(),
        )
    }

    pub(crate) fn with_generations(replies: Vec<Generation>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<Generation, ModelError> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(ModelError::EmptyContent)
    }
}

/// Always answers `reply` after holding the "device" for `hold`, recording the
/// entry/exit instants of every generation.
pub(crate) struct InstrumentedModel {
    reply: String,
    hold: Duration,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    spans: Mutex<Vec<(Instant, Instant)>>,
}

impl InstrumentedModel {
    pub(crate) fn new(reply: &str, hold: Duration) -> Self {
        Self {
            reply: reply.to_string(),
            hold,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            spans: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Critical-section spans sorted by entry time.
    pub(crate) fn spans(&self) -> Vec<(Instant, Instant)> {
        let mut spans = self.spans.lock().unwrap().clone();
        spans.sort_by_key(|(entry, _)| *entry);
        spans
    }
}

#[async_trait]
impl GenerativeModel for InstrumentedModel {
    fn name(&self) -> &str {
        "instrumented"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<Generation, ModelError> {
        let entry = Instant::now();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.hold).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let exit = Instant::now();
        self.spans.lock().unwrap().push((entry, exit));
        Ok(Generation {
            text: self.reply.clone(),
            truncated: false,
        })
    }
}
