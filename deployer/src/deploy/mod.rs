//! Deployment pipeline

pub mod builder;
pub mod detector;
pub mod fsm;
pub mod gateway;
pub mod git;
pub mod orchestrator;
pub mod providers;
pub mod queue;
pub mod registry;
pub mod selector;
pub mod sink;
