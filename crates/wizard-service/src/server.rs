//! HTTP server for the wizard API.
//!
//! This module exposes the running journeys over a minimal JSON API. Each
//! endpoint reads or advances a journey through its flow controller; journey
//! state lives in the workers, never in the HTTP layer, so the API stays a
//! thin projection.

use axum::{
	extract::{DefaultBodyLimit, Path, State},
	http::StatusCode,
	response::{IntoResponse, Json},
	routing::{get, post},
	Router,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use wizard_config::ApiConfig;
use wizard_core::{DerivedFlags, FlowController, FlowError, WizardHost};
use wizard_types::{Journey, JourneyContext, StatePath, WizardEvent, WizardSnapshot};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the journey host for processing requests.
	pub host: Arc<WizardHost>,
	/// Deadline for a single event dispatch.
	pub request_timeout: Duration,
}

/// Errors returned by the API.
#[derive(Debug, Error)]
pub enum ApiError {
	/// The path names a journey that does not exist.
	#[error("unknown journey '{0}'")]
	UnknownJourney(String),
	/// The journey exists but is not hosted by this instance.
	#[error("journey '{0}' is not enabled")]
	JourneyDisabled(Journey),
	/// The journey worker is no longer running.
	#[error("{0} journey worker is not running")]
	WorkerStopped(Journey),
	/// The dispatch exceeded the configured request timeout.
	#[error("request timed out")]
	Timeout,
	/// Unexpected internal failure.
	#[error("{0}")]
	Internal(String),
}

impl ApiError {
	fn status_code(&self) -> StatusCode {
		match self {
			ApiError::UnknownJourney(_) | ApiError::JourneyDisabled(_) => StatusCode::NOT_FOUND,
			ApiError::WorkerStopped(_) => StatusCode::SERVICE_UNAVAILABLE,
			ApiError::Timeout => StatusCode::GATEWAY_TIMEOUT,
			ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn kind(&self) -> &'static str {
		match self {
			ApiError::UnknownJourney(_) => "unknown_journey",
			ApiError::JourneyDisabled(_) => "journey_disabled",
			ApiError::WorkerStopped(_) => "worker_stopped",
			ApiError::Timeout => "timeout",
			ApiError::Internal(_) => "internal",
		}
	}
}

impl From<FlowError> for ApiError {
	fn from(error: FlowError) -> Self {
		match error {
			FlowError::WorkerStopped(journey) => ApiError::WorkerStopped(journey),
			FlowError::Definition(e) => ApiError::Internal(e.to_string()),
		}
	}
}

/// JSON body for error responses.
#[derive(Debug, Serialize)]
struct ErrorResponse {
	error: &'static str,
	message: String,
}

impl IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		let body = ErrorResponse {
			error: self.kind(),
			message: self.to_string(),
		};
		(self.status_code(), Json(body)).into_response()
	}
}

/// A journey's current position, as returned by the API.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JourneyView {
	pub journey: Journey,
	/// Dotted state path, e.g. `catering.browsing`.
	pub state: StatePath,
	pub context: JourneyContext,
	pub flags: DerivedFlags,
}

impl JourneyView {
	/// Builds the view from one snapshot read, so state and flags agree.
	fn with_snapshot(controller: &FlowController, snapshot: WizardSnapshot) -> Self {
		let flags = DerivedFlags::project(controller.definition(), &snapshot);
		Self {
			journey: controller.journey(),
			state: snapshot.value,
			context: snapshot.context,
			flags,
		}
	}

	fn read(controller: &FlowController) -> Self {
		Self::with_snapshot(controller, controller.snapshot())
	}
}

/// One entry in the journey listing.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct JourneyListEntry {
	journey: Journey,
	state: StatePath,
}

/// Response body for the journey listing endpoint.
#[derive(Debug, Serialize)]
struct JourneysResponse {
	journeys: Vec<JourneyListEntry>,
}

/// Starts the HTTP server for the API.
///
/// This function creates and configures the HTTP server with routing,
/// middleware, and error handling for the journey endpoints.
pub async fn start_server(
	api_config: ApiConfig,
	host: Arc<WizardHost>,
) -> Result<(), Box<dyn std::error::Error>> {
	let state = AppState {
		host,
		request_timeout: Duration::from_secs(api_config.timeout_seconds),
	};

	let app = router(state).layer(DefaultBodyLimit::max(api_config.max_request_size));

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Wizard API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Builds the router with the /api base path and journey endpoints.
fn router(state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/journeys", get(handle_list_journeys))
				.route("/journeys/{journey}", get(handle_get_journey))
				.route("/journeys/{journey}/events", post(handle_event))
				.route("/journeys/{journey}/reset", post(handle_reset)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(state)
}

/// Resolves a path slug to the controller hosting that journey.
fn lookup<'a>(state: &'a AppState, slug: &str) -> Result<&'a FlowController, ApiError> {
	let journey: Journey = slug
		.parse()
		.map_err(|_| ApiError::UnknownJourney(slug.to_string()))?;
	state
		.host
		.controller(journey)
		.ok_or(ApiError::JourneyDisabled(journey))
}

/// Dispatches an event and waits for it to be processed, bounded by the
/// request timeout. The worker keeps running if the request times out;
/// only the HTTP response gives up.
async fn settle_with_timeout(
	state: &AppState,
	controller: &FlowController,
	event: WizardEvent,
) -> Result<WizardSnapshot, ApiError> {
	match tokio::time::timeout(state.request_timeout, controller.settle(event)).await {
		Ok(result) => Ok(result?),
		Err(_) => Err(ApiError::Timeout),
	}
}

/// Handles GET /api/journeys requests.
///
/// Lists the hosted journeys with their current state paths.
async fn handle_list_journeys(State(state): State<AppState>) -> Json<JourneysResponse> {
	let journeys = state
		.host
		.journeys()
		.into_iter()
		.filter_map(|journey| state.host.controller(journey))
		.map(|controller| JourneyListEntry {
			journey: controller.journey(),
			state: controller.snapshot().value,
		})
		.collect();
	Json(JourneysResponse { journeys })
}

/// Handles GET /api/journeys/{journey} requests.
///
/// Returns the journey's current state, context and derived flags without
/// advancing it.
async fn handle_get_journey(
	Path(journey): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<JourneyView>, ApiError> {
	let controller = lookup(&state, &journey)?;
	Ok(Json(JourneyView::read(controller)))
}

/// Handles POST /api/journeys/{journey}/events requests.
///
/// The body is a single wizard event. The response reflects the journey
/// after the event was processed; an event the current state does not
/// accept leaves the journey unchanged and still returns 200.
async fn handle_event(
	Path(journey): Path<String>,
	State(state): State<AppState>,
	Json(event): Json<WizardEvent>,
) -> Result<Json<JourneyView>, ApiError> {
	let controller = lookup(&state, &journey)?;
	match settle_with_timeout(&state, controller, event).await {
		Ok(snapshot) => Ok(Json(JourneyView::with_snapshot(controller, snapshot))),
		Err(e) => {
			tracing::warn!("Event dispatch failed: {}", e);
			Err(e)
		}
	}
}

/// Handles POST /api/journeys/{journey}/reset requests.
///
/// Resets the journey to its initial state and clears its persisted
/// snapshot.
async fn handle_reset(
	Path(journey): Path<String>,
	State(state): State<AppState>,
) -> Result<Json<JourneyView>, ApiError> {
	let controller = lookup(&state, &journey)?;
	match settle_with_timeout(&state, controller, WizardEvent::Reset).await {
		Ok(snapshot) => Ok(Json(JourneyView::with_snapshot(controller, snapshot))),
		Err(e) => {
			tracing::warn!("Reset failed: {}", e);
			Err(e)
		}
	}
}
