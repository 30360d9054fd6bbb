use crate::{
    api::{attendance, manager},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{HttpResponse, Responder, middleware::from_fn, web};
use serde_json::json;
use std::sync::Arc;

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = Object, example = json!({ "status": "ok" }))
    ),
    tag = "Health"
)]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    // Helper to build per-route limiter
    fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
        let requests_per_min = requests_per_min.max(1);
        let cfg = GovernorConfigBuilder::default()
            .per_millisecond((60_000 / requests_per_min as u64).max(1))
            .burst_size(requests_per_min)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
            .expect("non-zero period and burst size");
        Governor::new(&cfg)
    }

    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    cfg.route("/health", web::get().to(health));

    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter.clone())
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware))
            .wrap(protected_limiter)
            .service(web::resource("/auth/me").route(web::get().to(handlers::me)))
            .service(
                web::scope("/attendance")
                    // employee self-service
                    .route("/checkin", web::post().to(attendance::check_in))
                    .route("/checkout", web::post().to(attendance::check_out))
                    .route("/today", web::get().to(attendance::today))
                    .route("/my-history", web::get().to(attendance::my_history))
                    .route("/my-summary", web::get().to(attendance::my_summary))
                    // manager only
                    .route("/all", web::get().to(manager::all_attendance))
                    .route("/employee/{id}", web::get().to(manager::employee_attendance))
                    .route("/export", web::get().to(manager::export_csv))
                    .route("/today-status", web::get().to(manager::today_status))
                    .route("/summary", web::get().to(manager::team_summary_report)),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

#[cfg(test)]
pub(crate) mod testing {
    use super::configure;
    use crate::attendance::AttendancePolicy;
    use crate::auth::jwt::generate_access_token;
    use crate::config::{Config, test_config};
    use crate::model::role::Role;
    use crate::model::user::{NewUser, User};
    use crate::state::AppState;
    use actix_web::{
        App, Error,
        body::MessageBody,
        dev::{ServiceFactory, ServiceRequest, ServiceResponse},
        test::TestRequest,
        web::Data,
    };
    use chrono::{DateTime, Utc};
    use std::net::SocketAddr;
    use std::sync::Arc;

    /// In-memory state whose clock is stopped at `now`.
    pub fn fixed_state(now: DateTime<Utc>) -> Data<AppState> {
        Data::new(AppState::in_memory(AttendancePolicy::default()).with_clock(Arc::new(move || now)))
    }

    pub fn test_app(
        state: Data<AppState>,
    ) -> App<
        impl ServiceFactory<
            ServiceRequest,
            Config = (),
            Response = ServiceResponse<impl MessageBody>,
            Error = Error,
            InitError = (),
        >,
    > {
        let config: Config = test_config();
        App::new()
            .app_data(state)
            .app_data(Data::new(config.clone()))
            .configure(move |cfg| configure(cfg, config))
    }

    fn peer() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 40_000))
    }

    // the rate limiter keys on the peer address
    pub fn get(uri: &str) -> TestRequest {
        TestRequest::get().uri(uri).peer_addr(peer())
    }

    pub fn post(uri: &str) -> TestRequest {
        TestRequest::post().uri(uri).peer_addr(peer())
    }

    pub fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {token}"))
    }

    /// Stores a user directly and returns it with a valid access token.
    pub async fn seed_user(
        state: &AppState,
        employee_code: &str,
        role: Role,
        department: Option<&str>,
    ) -> (User, String) {
        let user = state
            .users
            .create_user(NewUser {
                name: format!("Employee {employee_code}"),
                email: format!("{}@example.com", employee_code.to_lowercase()),
                password: String::new(),
                role,
                employee_code: employee_code.to_string(),
                department: department.map(Into::into),
            })
            .await
            .unwrap();

        let config = test_config();
        let token = generate_access_token(
            user.id,
            user.email.clone(),
            user.role_id,
            &config.jwt_secret,
            config.access_token_ttl,
        )
        .unwrap();

        (user, token)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{fixed_state, get, test_app};
    use actix_web::{http::StatusCode, test};
    use chrono::Utc;
    use serde_json::{Value, json};

    #[actix_web::test]
    async fn health_is_public() {
        let app = test::init_service(test_app(fixed_state(Utc::now()))).await;

        let resp = test::call_service(&app, get("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[actix_web::test]
    async fn attendance_routes_require_authentication() {
        let app = test::init_service(test_app(fixed_state(Utc::now()))).await;

        let resp = test::call_service(&app, get("/api/attendance/today").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
}
