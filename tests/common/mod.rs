//! Shared helpers for integration tests: a scripted chat backend and
//! small builders for observations and training runs.
#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use triage_engine::config::TrainingConfig;
use triage_engine::error::{AppError, Result};
use triage_engine::llm::{ChatApi, ChatRequest};
use triage_engine::models::{Gender, PatientObservation};

/// Chat backend that replays a fixed script and records every prompt.
pub struct ScriptedChat {
    replies: Mutex<Vec<Result<String>>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedChat {
    pub fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatApi for ScriptedChat {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        self.prompts
            .lock()
            .unwrap()
            .push(request.messages.last().map(|m| m.content.clone()).unwrap_or_default());
        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Err(AppError::RemoteCall("script exhausted".to_string()))
        } else {
            replies.remove(0)
        }
    }
}

/// Unremarkable adult baseline; tests mutate what they need.
pub fn baseline_observation() -> PatientObservation {
    PatientObservation {
        age: 45,
        gender: Gender::Male,
        systolic: 120,
        diastolic: 80,
        heart_rate: 72,
        temperature: 98.6,
        symptoms: vec!["fatigue".to_string()],
        symptom_notes: None,
        conditions: vec![],
    }
}

/// Training run small enough for test time but large enough to learn
/// the dominant synthetic patterns.
pub fn small_training_config() -> TrainingConfig {
    TrainingConfig {
        samples: 400,
        seed: 7,
        trees: 12,
        max_depth: 10,
        test_split: 0.2,
    }
}
