use std::sync::Arc;

use axum::{
	Json, Router,
	body::Body,
	extract::{
		Path, Query, State,
		rejection::{JsonRejection, QueryRejection},
	},
	http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::AppState;
use catalog_domain::Course;
use catalog_service::{
	DeleteResponse, Error, HealthReport, IndexHealth, IndexResponse, RebuildReport,
	SearchRequest, SearchResponse, SuggestRequest, SuggestResponse,
};

pub fn router(state: AppState) -> Router {
	let writes = Router::new()
		.route("/v1/index/course", post(index_course))
		.route("/v1/index/course/{id}", delete(delete_course))
		.route_layer(middleware::from_fn_with_state(
			BearerAuth::new(state.service.cfg.security.api_auth_token.as_deref()),
			require_bearer,
		));

	Router::new()
		.route("/health", get(health))
		.route("/v1/search/courses", get(search_courses))
		.route("/v1/search/suggestions", get(search_suggestions))
		.merge(writes)
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new()
		.route("/v1/admin/rebuild", post(rebuild))
		.route_layer(middleware::from_fn_with_state(
			BearerAuth::new(state.service.cfg.security.admin_auth_token.as_deref()),
			require_bearer,
		))
		.with_state(state)
}

/// Raw query parameters. Numbers are parsed here so bad input gets a JSON error body.
#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
	pub q: Option<String>,
	pub category: Option<String>,
	pub level: Option<String>,
	pub page: Option<String>,
	pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
	pub q: Option<String>,
}

async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthReport>) {
	let report = state.service.health().await;
	let status = match report.index {
		IndexHealth::Connected => StatusCode::OK,
		IndexHealth::Disconnected => StatusCode::SERVICE_UNAVAILABLE,
	};

	(status, Json(report))
}

async fn search_courses(
	State(state): State<AppState>,
	params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
	let Query(params) = params.map_err(ApiError::from_query)?;
	let search = &state.service.cfg.search;
	let page = parse_number(params.page.as_deref(), "page")?.unwrap_or(1);
	let limit = parse_number(params.limit.as_deref(), "limit")?.unwrap_or(search.default_limit);

	if page == 0 {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"page must be at least 1.",
			Some(vec!["page".to_string()]),
		));
	}
	if !(1..=search.max_limit).contains(&limit) {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			format!("limit must be between 1 and {}.", search.max_limit),
			Some(vec!["limit".to_string()]),
		));
	}
	if !catalog_service::within_result_window(page, limit, search.max_result_window) {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			format!("page * limit must not exceed {}.", search.max_result_window),
			Some(vec!["page".to_string(), "limit".to_string()]),
		));
	}

	let request = SearchRequest {
		q: params.q,
		category: params.category,
		level: params.level,
		page: Some(page),
		limit: Some(limit),
	};
	let response = state.service.search(request).await?;

	Ok(Json(response))
}

async fn search_suggestions(
	State(state): State<AppState>,
	params: Result<Query<SuggestParams>, QueryRejection>,
) -> Result<Json<SuggestResponse>, ApiError> {
	let Query(params) = params.map_err(ApiError::from_query)?;
	let q = params.q.unwrap_or_default();

	if q.trim().is_empty() {
		return Err(json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			"q must be a non-empty string.",
			Some(vec!["q".to_string()]),
		));
	}

	let response = state.service.suggest(SuggestRequest { q, limit: None }).await?;

	Ok(Json(response))
}

async fn index_course(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<IndexResponse>, ApiError> {
	let Json(payload) = payload.map_err(ApiError::from_json)?;
	let response = state.service.index_course_json(payload).await?;

	Ok(Json(response))
}

async fn delete_course(
	State(state): State<AppState>,
	Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
	let response = state.service.delete_course(&id).await?;

	Ok(Json(response))
}

async fn rebuild(
	State(state): State<AppState>,
	payload: Result<Json<Vec<Value>>, JsonRejection>,
) -> Result<Json<RebuildReport>, ApiError> {
	let Json(payload) = payload.map_err(ApiError::from_json)?;
	let mut courses = Vec::with_capacity(payload.len());

	for (i, value) in payload.into_iter().enumerate() {
		let course = Course::from_value(value).map_err(|err| {
			json_error(
				StatusCode::BAD_REQUEST,
				"invalid_course",
				err.to_string(),
				Some(vec![format!("$[{i}]")]),
			)
		})?;

		courses.push(course);
	}

	let response = state.service.rebuild(&courses).await?;

	Ok(Json(response))
}

fn parse_number(raw: Option<&str>, field: &str) -> Result<Option<u32>, ApiError> {
	let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
		return Ok(None);
	};

	raw.parse::<u32>().map(Some).map_err(|_| {
		json_error(
			StatusCode::BAD_REQUEST,
			"invalid_request",
			format!("{field} must be a non-negative integer."),
			Some(vec![field.to_string()]),
		)
	})
}

#[derive(Clone)]
struct BearerAuth {
	token: Option<Arc<str>>,
}
impl BearerAuth {
	fn new(token: Option<&str>) -> Self {
		Self { token: token.map(Arc::from) }
	}

	fn allows(&self, headers: &HeaderMap) -> bool {
		match &self.token {
			None => true,
			Some(expected) => read_bearer_token(headers).is_some_and(|token| token == &**expected),
		}
	}
}

async fn require_bearer(
	State(auth): State<BearerAuth>,
	req: Request<Body>,
	next: Next,
) -> Response {
	if !auth.allows(req.headers()) {
		return json_error(
			StatusCode::UNAUTHORIZED,
			"unauthorized",
			"A valid Bearer token is required.",
			None,
		)
		.into_response();
	}

	next.run(req).await
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
	fields: Option<Vec<String>>,
}
impl ApiError {
	fn new(
		status: StatusCode,
		error_code: impl Into<String>,
		message: impl Into<String>,
		fields: Option<Vec<String>>,
	) -> Self {
		Self { status, error_code: error_code.into(), message: message.into(), fields }
	}

	fn from_query(err: QueryRejection) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "invalid_request", err.body_text(), None)
	}

	fn from_json(err: JsonRejection) -> Self {
		Self::new(err.status(), "invalid_request", err.body_text(), None)
	}
}

impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_request", message, None),
			Error::Transform { message } =>
				json_error(StatusCode::BAD_REQUEST, "invalid_course", message, None),
			Error::Index { message } =>
				json_error(StatusCode::BAD_GATEWAY, "index_failed", message, None),
			Error::Query { .. } => json_error(
				StatusCode::SERVICE_UNAVAILABLE,
				"search_unavailable",
				"Search is temporarily unavailable.",
				None,
			),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body =
			ErrorBody { error_code: self.error_code, message: self.message, fields: self.fields };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(
	status: StatusCode,
	code: &str,
	message: impl Into<String>,
	fields: Option<Vec<String>>,
) -> ApiError {
	ApiError::new(status, code, message, fields)
}
