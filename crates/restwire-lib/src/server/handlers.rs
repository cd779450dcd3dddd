//! HTTP endpoint handlers.
//!
//! Every handler reads and writes through the [`JsonProcessor`] in router
//! state, so responses follow the configured output rules.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::extract::{respond, Wire};
use crate::json::JsonProcessor;
use crate::timepoint::Timepoint;

#[derive(Debug, Serialize)]
pub struct Health {
    pub success: bool,
    pub message: &'static str,
}

pub async fn health(State(processor): State<JsonProcessor>) -> Response {
    respond(
        &processor,
        StatusCode::OK,
        &Health {
            success: true,
            message: "ok",
        },
    )
}

/// Round-trip an arbitrary JSON document.
pub async fn echo(State(processor): State<JsonProcessor>, Wire(document): Wire<Value>) -> Response {
    respond(&processor, StatusCode::OK, &document)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Clock {
    pub now: Timepoint,
}

pub async fn time(State(processor): State<JsonProcessor>) -> Response {
    respond(&processor, StatusCode::OK, &Clock { now: Timepoint::now() })
}

/// A scheduled event as clients submit it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
    pub starts_at: Timepoint,
    pub ends_at: Option<Timepoint>,
    pub location: Option<Location>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub venue: String,
    pub city: Option<String>,
}

/// Accept an event and send back its normalized form.
pub async fn normalize_event(
    State(processor): State<JsonProcessor>,
    Wire(event): Wire<Event>,
) -> Response {
    tracing::debug!(name = %event.name, "normalizing event");
    respond(&processor, StatusCode::OK, &event)
}
