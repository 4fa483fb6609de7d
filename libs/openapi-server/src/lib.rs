//! Request and response models of the Deployify HTTP API

pub mod models;
