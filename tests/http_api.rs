//! Router and middleware behaviour driven in process, without a database.

use axum::{
    body::{to_bytes, Body},
    extract::Request,
    http::StatusCode,
    response::Response,
    routing::{get, MethodFilter},
    Router,
};
use build_tracker::api::{
    self, handler, middleware, Api, Handler, Middleware, Shutdown, ShutdownListener,
};
use build_tracker::error::FieldErrors;
use build_tracker::sql::{Pagination, PaginationConfig};
use build_tracker::{AppError, RequestContext};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

const TRACER: &str = "6f1c1e1a-3d2b-4c1e-9a53-2f0b8d1c7e44";
const USER: &str = "9b2f7c1e-0d4a-4f5e-8c3b-1a2d3e4f5a6b";
const SITE: &str = "0e7d5c3b-8a9f-4b2e-9d1c-7f6e5d4c3b2a";

fn ok_handler() -> Handler {
    handler(|_ctx, _req| async { Ok(api::respond(StatusCode::OK, json!({"ok": true}))) })
}

fn failing(err: fn() -> AppError) -> Handler {
    handler(move |_ctx, _req| async move { Err(err()) })
}

fn app(enforce_headers: bool, routes: Vec<(&str, Handler)>) -> (Router, ShutdownListener) {
    let (shutdown, listener) = Shutdown::channel();
    let mut api = Api::new(shutdown, middleware::standard(enforce_headers));
    for (path, h) in routes {
        api.handle(MethodFilter::GET, path, h, &[]);
    }
    (api.into_router(), listener)
}

fn get_req(uri: &str) -> Request {
    Request::builder()
        .uri(uri)
        .header("tracer_uid", TRACER)
        .header("user_uid", USER)
        .header("site_uid", SITE)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(resp: Response) -> Value {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn valid_request_reaches_handler() {
    let (router, mut shutdown) = app(true, vec![("/v1/ping", ok_handler())]);
    let resp = router.oneshot(get_req("/v1/ping")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({"ok": true}));
    assert!(shutdown.try_recv().is_none());
}

#[tokio::test]
async fn missing_tracer_is_rejected_before_handler() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let h = handler(move |_ctx, _req| {
        flag.store(true, Ordering::SeqCst);
        async { Ok(api::respond(StatusCode::OK, ())) }
    });
    let (router, _shutdown) = app(true, vec![("/v1/ping", h)]);

    let req = Request::builder()
        .uri("/v1/ping")
        .header("user_uid", USER)
        .header("site_uid", SITE)
        .body(Body::empty())
        .unwrap();
    let resp = router.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "data validation error", "fields": {"tracer_uid": "required"}})
    );
    assert!(!ran.load(Ordering::SeqCst));
}

#[tokio::test]
async fn headers_not_checked_when_enforcement_is_off() {
    let (router, _shutdown) = app(false, vec![("/v1/ping", ok_handler())]);
    let req = Request::builder().uri("/v1/ping").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn field_errors_are_listed() {
    fn label_required() -> AppError {
        let mut fe = FieldErrors::new();
        fe.add("label", "required");
        AppError::Validation(fe)
    }
    let (router, mut shutdown) = app(true, vec![("/v1/build", failing(label_required))]);
    let resp = router.oneshot(get_req("/v1/build")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(resp).await,
        json!({"error": "data validation error", "fields": {"label": "required"}})
    );
    assert!(shutdown.try_recv().is_none());
}

#[tokio::test]
async fn duplicate_entry_is_conflict() {
    let (router, _shutdown) = app(
        true,
        vec![("/v1/build", failing(|| AppError::DuplicateEntry.context("tran")))],
    );
    let resp = router.oneshot(get_req("/v1/build")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(resp).await, json!({"error": "duplicated entry"}));
}

#[tokio::test]
async fn domain_not_found_and_invalid_id() {
    let (router, _shutdown) = app(
        true,
        vec![
            ("/v1/build/:id", failing(|| AppError::NotFound("build not found".into()))),
            (
                "/v1/build_status/:id",
                failing(|| AppError::InvalidId("ID is not in its proper form".into())),
            ),
        ],
    );
    let resp = router.clone().oneshot(get_req("/v1/build/9")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await, json!({"error": "build not found"}));

    let resp = router.oneshot(get_req("/v1/build_status/x")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn panic_becomes_internal_error() {
    let h = handler(|_ctx, _req| async {
        if true {
            panic!("boom");
        }
        Ok(api::respond(StatusCode::OK, ()))
    });
    let (router, mut shutdown) = app(true, vec![("/v1/explode", h)]);
    let resp = router.oneshot(get_req("/v1/explode")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert_eq!(body["error"], "PANIC [boom]");
    assert!(shutdown.try_recv().is_none());
}

#[tokio::test]
async fn unmatched_route_is_plain_404() {
    let (router, _shutdown) = app(true, vec![("/v1/ping", ok_handler())]);
    let resp = router.oneshot(get_req("/v1/nope?x=1")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"path not found: /v1/nope?x=1");
}

#[tokio::test]
async fn shutdown_error_still_answers_and_signals_once() {
    let (router, mut shutdown) = app(
        true,
        vec![("/v1/integrity", failing(|| AppError::Shutdown("ledger mismatch".into())))],
    );
    let resp = router.oneshot(get_req("/v1/integrity")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({"error": "ledger mismatch"}));

    assert_eq!(shutdown.try_recv().as_deref(), Some("ledger mismatch"));
    assert!(shutdown.try_recv().is_none());
}

#[tokio::test]
async fn path_params_and_context_reach_handler() {
    let h = handler(|ctx: RequestContext, req: Request| async move {
        Ok(api::respond(
            StatusCode::OK,
            json!({"id": api::param(&req, "id"), "trace_id": ctx.trace_id(), "path": ctx.path()}),
        ))
    });
    let (router, _shutdown) = app(true, vec![("/v1/build/:id/undelete", h)]);
    let resp = router
        .oneshot(get_req("/v1/build/42/undelete"))
        .await
        .unwrap();
    assert_eq!(
        body_json(resp).await,
        json!({"id": "42", "trace_id": TRACER, "path": "/v1/build/:id/undelete"})
    );
}

#[tokio::test]
async fn route_middleware_runs_inside_global_stack() {
    let tag: Middleware = middleware(|next: Handler| {
        handler(move |ctx: RequestContext, req: Request| {
            let next = Arc::clone(&next);
            async move {
                let mut resp = next(ctx, req).await?;
                resp.headers_mut().insert("x-route", "tagged".parse().unwrap());
                Ok::<_, AppError>(resp)
            }
        })
    });
    let (shutdown, _listener) = Shutdown::channel();
    let mut api = Api::new(shutdown, middleware::standard(true));
    api.handle(MethodFilter::GET, "/v1/ping", ok_handler(), &[tag]);
    api.handle(MethodFilter::POST, "/v1/ping", failing(|| AppError::DuplicateEntry), &[]);
    let router = api.into_router();

    let resp = router.clone().oneshot(get_req("/v1/ping")).await.unwrap();
    assert_eq!(resp.headers()["x-route"], "tagged");

    let mut post = get_req("/v1/ping");
    *post.method_mut() = axum::http::Method::POST;
    let resp = router.oneshot(post).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_pagination_is_a_field_error() {
    const SORTABLE: &[&str] = &["id", "label"];
    let h = handler(|_ctx, req: Request| async move {
        let params: HashMap<String, String> = req
            .uri()
            .query()
            .unwrap_or("")
            .split('&')
            .filter_map(|kv| kv.split_once('='))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let page = Pagination::from_query(&params, &PaginationConfig::default(), SORTABLE)?;
        Ok::<_, AppError>(api::respond(StatusCode::OK, json!({"clause": page.clause()})))
    });
    let (router, _shutdown) = app(true, vec![("/v1/build", h)]);

    let resp = router
        .clone()
        .oneshot(get_req("/v1/build?page=2&per_page=10&sort=id&direction=descending"))
        .await
        .unwrap();
    assert_eq!(
        body_json(resp).await,
        json!({"clause": " ORDER BY \"id\" DESC LIMIT 10 OFFSET 10"})
    );

    let resp = router.oneshot(get_req("/v1/build?sort=password")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["fields"]["sort"], "must be one of: id, label");
}

#[tokio::test]
async fn context_lookup_outside_router_requires_shutdown() {
    let (shutdown, mut listener) = Shutdown::channel();
    let mut api = Api::new(shutdown.clone(), middleware::standard(true));
    api.handle(MethodFilter::GET, "/v1/ping", ok_handler(), &[]);
    let raw: Router = Router::new().route(
        "/raw",
        get(|ctx: RequestContext| async move { ctx.trace_id().to_string() }),
    );
    let router = api::shutdown::watch(raw.merge(api.into_router()), shutdown);

    let req = Request::builder().uri("/raw").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(resp).await, json!({"error": "request context missing"}));

    assert_eq!(listener.try_recv().as_deref(), Some("request context missing"));
    assert!(listener.try_recv().is_none());
}

#[tokio::test]
async fn handler_panicking_before_its_future_is_answered() {
    let eager: Handler = handler(|_ctx, _req| {
        let picks: Vec<u8> = Vec::new();
        let first = picks[3];
        async move { Ok(api::respond(StatusCode::OK, first)) }
    });
    let (router, mut shutdown) = app(false, vec![("/v1/eager", eager)]);
    let req = Request::builder().uri("/v1/eager").body(Body::empty()).unwrap();
    let resp = router.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(resp).await;
    assert!(body["error"].as_str().unwrap().starts_with("PANIC [index out of bounds"));
    assert!(shutdown.try_recv().is_none());
}
