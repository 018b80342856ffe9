use std::collections::HashMap;

use serde::Serialize;

pub(crate) mod auth;
pub(crate) mod class;
pub(crate) mod exam;
pub(crate) mod plagiarism;
pub(crate) mod report;
pub(crate) mod session;
pub(crate) mod user;
pub(crate) mod violation;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}
