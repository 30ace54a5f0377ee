use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode, header::AUTHORIZATION},
	response::Response,
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use catalog_api::{routes, state::AppState};
use catalog_config::Config;
use catalog_domain::Course;
use catalog_service::{
	BoxFuture, Error, IndexGateway, Result, SearchService,
	gateway::{Completion, QueryResult},
	search::planner::BuiltQuery,
};
use catalog_testkit::fixtures;

struct DownIndex;
impl IndexGateway for DownIndex {
	fn index<'a>(
		&'a self,
		_doc: &'a catalog_domain::SearchDocument,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Err(Error::index("bulk queue full")) })
	}

	fn delete<'a>(&'a self, _id: &'a str) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async { Err(Error::index("bulk queue full")) })
	}

	fn query<'a>(&'a self, _query: &'a BuiltQuery) -> BoxFuture<'a, Result<QueryResult>> {
		Box::pin(async { Err(Error::query("cluster unreachable")) })
	}

	fn suggest<'a>(
		&'a self,
		_prefix: &'a str,
		_limit: u32,
	) -> BoxFuture<'a, Result<Vec<Completion>>> {
		Box::pin(async { Err(Error::query("cluster unreachable")) })
	}

	fn rebuild<'a>(
		&'a self,
		_docs: &'a [catalog_domain::SearchDocument],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Err(Error::index("bulk queue full")) })
	}

	fn ping(&self) -> BoxFuture<'_, Result<()>> {
		Box::pin(async { Err(Error::query("cluster unreachable")) })
	}
}

async fn memory_state(config: Config) -> AppState {
	AppState::new(config).await.expect("memory backend starts")
}

fn course_json(course: &Course) -> Value {
	serde_json::to_value(course).expect("course serializes")
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("request builds")
}

fn post_json(uri: &str, body: &Value, token: Option<&str>) -> Request<Body> {
	let mut builder =
		Request::builder().method("POST").uri(uri).header("content-type", "application/json");

	if let Some(token) = token {
		builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
	}

	builder.body(Body::from(body.to_string())).expect("request builds")
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
	let response: Response = app.clone().oneshot(req).await.expect("router responds");
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("body reads");
	let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

	(status, json)
}

async fn seeded_app() -> Router {
	let app = routes::router(memory_state(fixtures::test_config()).await);

	for course in fixtures::react_vue_catalog() {
		let (status, _) = send(&app, post_json("/v1/index/course", &course_json(&course), None)).await;

		assert_eq!(status, StatusCode::OK);
	}

	app
}

#[tokio::test]
async fn health_reports_connected_index() {
	let app = routes::router(memory_state(fixtures::test_config()).await);
	let (status, body) = send(&app, get("/health")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["index"], "connected");
	assert_eq!(body["service"], "catalog-search");
}

#[tokio::test]
async fn search_returns_ranked_courses_and_facets() {
	let app = seeded_app().await;
	let (status, body) = send(&app, get("/v1/search/courses?q=react&limit=5")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["total"], 2);
	assert_eq!(body["page"], 1);
	assert_eq!(body["limit"], 5);
	assert_eq!(body["pages"], 1);
	assert_eq!(body["courses"][0]["title"], "React Advanced");
	assert_eq!(body["courses"][0]["totalStudents"], 500);
	assert_eq!(body["courses"][1]["title"], "React Basics");
	assert!(body["facets"]["categories"].is_array());
	assert!(body["facets"]["levels"].is_array());
	assert_eq!(body["facets"]["priceRanges"].as_array().map(Vec::len), Some(4));
}

#[tokio::test]
async fn search_bounds_are_enforced() {
	let app = seeded_app().await;

	for (uri, field) in [
		("/v1/search/courses?page=0", "page"),
		("/v1/search/courses?limit=0", "limit"),
		("/v1/search/courses?limit=101", "limit"),
		("/v1/search/courses?page=abc", "page"),
	] {
		let (status, body) = send(&app, get(uri)).await;

		assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
		assert_eq!(body["error_code"], "invalid_request");
		assert_eq!(body["fields"], json!([field]));
	}
}

#[tokio::test]
async fn deep_pages_are_client_errors() {
	let service = SearchService::with_gateway(fixtures::test_config(), Arc::new(DownIndex));
	let app = routes::router(AppState::from_service(service));
	let (status, body) = send(&app, get("/v1/search/courses?page=1000&limit=100")).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "invalid_request");
	assert_eq!(body["fields"], json!(["page", "limit"]));
}

#[tokio::test]
async fn suggestions_require_a_prefix() {
	let app = seeded_app().await;
	let (status, body) = send(&app, get("/v1/search/suggestions")).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["fields"], json!(["q"]));

	let (status, body) = send(&app, get("/v1/search/suggestions?q=re")).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["suggestions"], json!(["React Basics", "React Advanced"]));
}

#[tokio::test]
async fn write_routes_require_the_api_token_when_configured() {
	let mut config = fixtures::test_config();

	config.security.api_auth_token = Some("secret".to_string());

	let app = routes::router(memory_state(config).await);
	let course = course_json(&fixtures::course("course-1", "Guarded Course"));
	let (status, body) = send(&app, post_json("/v1/index/course", &course, None)).await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);
	assert_eq!(body["error_code"], "unauthorized");

	let (status, _) = send(&app, post_json("/v1/index/course", &course, Some("wrong"))).await;

	assert_eq!(status, StatusCode::UNAUTHORIZED);

	let (status, body) = send(&app, post_json("/v1/index/course", &course, Some("secret"))).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["op"], "INDEXED");

	let (status, _) = send(&app, get("/v1/search/courses?q=guarded")).await;

	assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn deleting_an_unknown_course_is_ok() {
	let app = seeded_app().await;
	let req = Request::builder()
		.method("DELETE")
		.uri("/v1/index/course/missing-course")
		.body(Body::empty())
		.expect("request builds");
	let (status, body) = send(&app, req).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["existed"], false);
}

#[tokio::test]
async fn malformed_courses_are_rejected() {
	let app = seeded_app().await;
	let (status, body) =
		send(&app, post_json("/v1/index/course", &json!({ "id": "broken" }), None)).await;

	assert_eq!(status, StatusCode::BAD_REQUEST);
	assert_eq!(body["error_code"], "invalid_course");
}

#[tokio::test]
async fn admin_rebuild_reports_counts() {
	let state = memory_state(fixtures::test_config()).await;
	let admin = routes::admin_router(state.clone());
	let app = routes::router(state);
	let mut draft = fixtures::course("draft", "Draft Course");

	draft.status = catalog_domain::CourseStatus::Draft;

	let mut courses = fixtures::react_vue_catalog().iter().map(course_json).collect::<Vec<_>>();

	courses.push(course_json(&draft));

	let (status, body) = send(&admin, post_json("/v1/admin/rebuild", &json!(courses), None)).await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, json!({ "indexed": 3, "skipped": 1 }));

	let (_, body) = send(&app, get("/v1/search/courses")).await;

	assert_eq!(body["total"], 3);
}

#[tokio::test]
async fn backend_outages_are_explicit_errors() {
	let service = SearchService::with_gateway(fixtures::test_config(), Arc::new(DownIndex));
	let app = routes::router(AppState::from_service(service));
	let (status, body) = send(&app, get("/v1/search/courses?q=react")).await;

	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(body["error_code"], "search_unavailable");

	let course = course_json(&fixtures::course("course-1", "Any"));
	let (status, body) = send(&app, post_json("/v1/index/course", &course, None)).await;

	assert_eq!(status, StatusCode::BAD_GATEWAY);
	assert_eq!(body["error_code"], "index_failed");

	let (status, body) = send(&app, get("/health")).await;

	assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
	assert_eq!(body["index"], "disconnected");
}
