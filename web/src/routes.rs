//! # Routing
//!
//! Endpoint registration, CORS headers and the JSON fallbacks for unknown
//! paths and methods.

use actix_web::http::{Method, StatusCode};
use actix_web::middleware::DefaultHeaders;
use actix_web::{error, web, HttpRequest, HttpResponse};
use dialysis_core::resources::{
    AdminGateway, AppointmentGateway, NotificationGateway, PatientGateway, PatientHistoryGateway,
    PaymentDetailGateway, PostGateway, StaffGateway,
};
use dialysis_core::{DbPool, Gateway, HistoryStore};

use crate::error::ApiError;
use crate::handlers;
use crate::history::{self, HistoryState};

/// Methods every endpoint advertises to browsers.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Request headers browsers may send cross-origin.
pub const ALLOWED_HEADERS: &str = "Content-Type, Authorization";

/// Adds permissive CORS headers to every response.
pub fn cors_headers() -> DefaultHeaders {
    DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", ALLOWED_METHODS))
        .add(("Access-Control-Allow-Headers", ALLOWED_HEADERS))
}

/// Renders JSON body errors in the standard error format.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let status = match &err {
            error::JsonPayloadError::Overflow { .. }
            | error::JsonPayloadError::OverflowKnownLength { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::BAD_REQUEST,
        };
        ApiError::with_status(status, &err, "Invalid request payload").into()
    })
}

/// Renders bad path ids in the standard error format.
pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::bad_request(&err, "Invalid ID").into())
}

/// Answers CORS preflight requests; anything else gets `status`.
fn preflight_or(req: &HttpRequest, status: StatusCode, message: &str) -> Result<HttpResponse, ApiError> {
    if req.method() == Method::OPTIONS {
        return Ok(HttpResponse::NoContent().finish());
    }
    Err(ApiError::with_status(
        status,
        format!("{} {}", req.method(), req.path()),
        message,
    ))
}

/// Default service for known paths hit with an unsupported method.
pub async fn method_not_allowed(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    preflight_or(&req, StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Default service for unknown paths.
pub async fn not_found(req: HttpRequest) -> Result<HttpResponse, ApiError> {
    preflight_or(&req, StatusCode::NOT_FOUND, "Endpoint not found")
}

/// The five CRUD routes for one gateway, mounted at `path`.
pub fn resource<G: Gateway>(path: &str, gateway: G) -> actix_web::Scope {
    web::scope(path)
        .app_data(web::Data::new(gateway))
        .service(
            web::resource("")
                .route(web::get().to(handlers::list::<G>))
                .route(web::post().to(handlers::create::<G>))
                .route(web::put().to(handlers::update::<G>))
                .route(web::delete().to(handlers::delete::<G>))
                .default_service(web::to(method_not_allowed)),
        )
        .service(
            web::resource("/{id}")
                .route(web::get().to(handlers::get::<G>))
                .route(web::put().to(handlers::update_by_path::<G>))
                .route(web::delete().to(handlers::delete_by_path::<G>))
                .default_service(web::to(method_not_allowed)),
        )
}

/// The patient history endpoint.
pub fn history_resource(state: HistoryState) -> actix_web::Resource {
    web::resource("/patient_history")
        .app_data(web::Data::new(state))
        .route(web::get().to(history::get))
        .route(web::post().to(history::upload))
        .route(web::delete().to(history::delete))
        .default_service(web::to(method_not_allowed))
}

/// Registers every clinic endpoint against the PostgreSQL pool.
pub fn configure(cfg: &mut web::ServiceConfig, pool: &DbPool, store: &HistoryStore) {
    cfg.app_data(json_config())
        .app_data(path_config())
        .service(crate::health_check)
        .service(resource("/patients", PatientGateway::new(pool.clone())))
        .service(resource("/hospital_staff", StaffGateway::new(pool.clone())))
        .service(resource("/appointments", AppointmentGateway::new(pool.clone())))
        .service(resource("/system_admins", AdminGateway::new(pool.clone())))
        .service(resource("/notifications", NotificationGateway::new(pool.clone())))
        .service(resource("/posts", PostGateway::new(pool.clone())))
        .service(resource("/payment_details", PaymentDetailGateway::new(pool.clone())))
        .service(history_resource(HistoryState::new(
            store.clone(),
            PatientHistoryGateway::new(pool.clone()),
        )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{test, App};

    #[actix_web::test]
    async fn test_unknown_endpoint_is_json_404() {
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .service(crate::health_check)
                .default_service(web::to(not_found)),
        )
        .await;
        let req = test::TestRequest::get().uri("/doctors").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Origin").unwrap(),
            "*"
        );

        let body: serde_json::Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Endpoint not found");
        assert_eq!(body["error"], "GET /doctors");
    }

    #[actix_web::test]
    async fn test_preflight_is_answered_everywhere() {
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .service(crate::health_check)
                .default_service(web::to(not_found)),
        )
        .await;
        let req = test::TestRequest::default()
            .method(Method::OPTIONS)
            .uri("/patients")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            resp.headers().get("Access-Control-Allow-Methods").unwrap(),
            ALLOWED_METHODS
        );
    }

    #[actix_web::test]
    async fn test_configure_mounts_every_resource() {
        let pool = diesel::r2d2::Pool::builder()
            .min_idle(Some(0))
            .connection_timeout(std::time::Duration::from_millis(200))
            .build_unchecked(diesel::r2d2::ConnectionManager::<diesel::pg::PgConnection>::new(
                "postgres://clinic@127.0.0.1:1/clinic",
            ));
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        let app = test::init_service(
            App::new()
                .wrap(cors_headers())
                .configure(|cfg| configure(cfg, &pool, &store))
                .default_service(web::to(not_found)),
        )
        .await;

        let req = test::TestRequest::get().uri("/health").to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        for path in [
            "/patients",
            "/hospital_staff",
            "/appointments",
            "/system_admins",
            "/notifications",
            "/posts",
            "/payment_details",
        ] {
            let req = test::TestRequest::patch().uri(&format!("{path}/1")).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED, "{path}");

            let req = test::TestRequest::default()
                .method(Method::OPTIONS)
                .uri(&format!("{path}/1"))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::NO_CONTENT, "{path}");
            assert!(resp.headers().contains_key("Access-Control-Allow-Origin"));

            let req = test::TestRequest::get().uri(&format!("{path}/abc")).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{path}");
        }

        let req = test::TestRequest::get().uri("/patients/1").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);

        let req = test::TestRequest::get()
            .uri("/patient_history?identifier=list&patient_name=Achieng")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let req = test::TestRequest::patch().uri("/patient_history").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[actix_web::test]
    async fn test_health_gets_cors_headers() {
        let app = test::init_service(App::new().wrap(cors_headers()).service(crate::health_check)).await;
        let req = test::TestRequest::get().uri("/health").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
        assert!(resp.headers().contains_key("Access-Control-Allow-Headers"));
    }
}
