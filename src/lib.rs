//! Hybrid medical triage engine: a hard safety gate, bagged-tree risk and
//! department classifiers, optional LLM explanation and direct assessment
//! with a counterfactual bias audit, and a deterministic rule floor.

pub mod api;
pub mod config;
pub mod error;
pub mod llm;
pub mod ml;
pub mod models;
pub mod triage;
