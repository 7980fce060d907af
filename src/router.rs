use crate::{
    auth::{
        AuthSession, Backend, UserDirectory,
        router::{self as auth_router, login_page},
    },
    error::{AppError, ErrorMessage},
    routes,
    store::DataStore,
    util::assets::AssetManifest,
};
use axum::{
    Router,
    extract::{Request, State},
    http::Uri,
    middleware::{self, Next},
    response::{Html, IntoResponse, Response},
    routing::get_service,
};
use axum_login::{
    AuthManagerLayerBuilder,
    tower_sessions::{
        Expiry, MemoryStore, SessionManagerLayer,
        cookie::{SameSite, time},
    },
};
use minijinja::{Environment, context};
use std::sync::Arc;
use tokio::signal;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

#[derive(Clone)]
pub struct AppState {
    pub directory: UserDirectory,
    pub data: DataStore,
    pub templates: Arc<Environment<'static>>,
}

impl AppState {
    pub fn new(directory: UserDirectory, data: DataStore, templates: Environment<'static>) -> Self {
        Self {
            directory,
            data,
            templates: Arc::new(templates),
        }
    }
}

pub fn create_router(state: AppState, session_expiry_hours: i64, static_dir: &str) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::hours(
            session_expiry_hours,
        )));

    // Auth service.
    //
    // This combines the session layer with our backend to establish the auth
    // service which will provide the auth session as a request extension.
    let backend = Backend::new(state.directory.clone());
    let auth_layer = AuthManagerLayerBuilder::new(backend, session_layer).build();

    Router::new()
        .merge(routes::dashboard::routes())
        .merge(routes::events::routes())
        .merge(routes::tasks::routes())
        .merge(routes::registrations::routes())
        .merge(routes::feedback::routes())
        .merge(routes::notifications::routes())
        .merge(routes::users::routes())
        .merge(routes::analytics::routes())
        .merge(routes::settings::routes())
        .merge(routes::profile::routes())
        .merge(routes::services::routes())
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session))
        .merge(auth_router::router())
        .fallback(fallback)
        .layer(middleware::map_response_with_state(state.clone(), render_errors))
        .with_state(state)
        .nest_service("/static", get_service(ServeDir::new(static_dir)))
        .layer(TraceLayer::new_for_http())
        .layer(auth_layer)
}

pub fn setup_templates(templates_dir: &str, assets: AssetManifest) -> Environment<'static> {
    let mut env = Environment::new();
    env.set_loader(minijinja::path_loader(templates_dir.to_string()));
    assets.register(&mut env);
    env
}

/// Signed-out requests to any gated path get the sign-in form instead.
async fn require_session(
    State(state): State<AppState>,
    auth_session: AuthSession,
    request: Request,
    next: Next,
) -> Response {
    if auth_session.user.is_some() {
        return next.run(request).await;
    }

    let target = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string());
    login_page(&state, target.as_deref()).unwrap_or_else(IntoResponse::into_response)
}

async fn fallback(State(state): State<AppState>, auth_session: AuthSession, uri: Uri) -> Response {
    if auth_session.user.is_none() {
        return login_page(&state, Some(uri.path())).unwrap_or_else(IntoResponse::into_response);
    }
    AppError::NotFound("Page").into_response()
}

/// Swaps the plain-text body of an [`AppError`] response for the message page.
async fn render_errors(State(state): State<AppState>, response: Response) -> Response {
    let Some(ErrorMessage(message)) = response.extensions().get::<ErrorMessage>().cloned() else {
        return response;
    };
    let status = response.status();
    let site = state.data.read().settings().clone();

    let page = state.templates.get_template("message.html").and_then(|template| {
        template.render(context! {
            title => status.canonical_reason().unwrap_or("Error"),
            message => message,
            site => site,
        })
    });
    match page {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            error!("failed to render message page: {:?}", err);
            response
        }
    }
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!("failed to install signal handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutting down");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::DEMO_PASSWORD,
        model::{Registration, RegistrationStatus},
        seed,
        store::AppData,
    };
    use axum::{
        body::{Body, to_bytes},
        http::{self, StatusCode, header},
    };
    use chrono::Utc;
    use tower::ServiceExt;

    fn app() -> Router {
        app_with(|_| {}).0
    }

    /// Seeded app plus a handle on its data, after `tweak` has adjusted it.
    fn app_with(tweak: impl FnOnce(&mut AppData)) -> (Router, DataStore) {
        let users = seed::demo_users();
        let mut data = seed::demo_data(&users, Utc::now());
        tweak(&mut data);
        let store = DataStore::new(data);
        let state = AppState::new(
            UserDirectory::new(users),
            store.clone(),
            setup_templates("templates", AssetManifest::default()),
        );
        (create_router(state, 24, "static"), store)
    }

    fn registration(id: &str, event_id: &str, user_id: &str) -> Registration {
        Registration {
            id: id.to_string(),
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            user_name: "Jordan Lee".to_string(),
            user_email: "jordan.lee@example.com".to_string(),
            registered_at: Utc::now(),
            status: RegistrationStatus::Confirmed,
            check_in_time: None,
        }
    }

    fn login_request(email: &str, password: &str) -> Request {
        http::Request::post("/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("email={email}&password={password}")))
            .unwrap()
    }

    async fn sign_in(app: &Router, email: &str) -> String {
        let response = app
            .clone()
            .oneshot(login_request(email, DEMO_PASSWORD))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    async fn get(app: &Router, path: &str, cookie: Option<&str>) -> (StatusCode, String) {
        let mut request = http::Request::get(path);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        let response = app
            .clone()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    async fn post(app: &Router, path: &str, cookie: &str) -> StatusCode {
        post_form(app, path, cookie, "").await
    }

    async fn post_form(app: &Router, path: &str, cookie: &str, form: &str) -> StatusCode {
        let request = http::Request::post(path)
            .header(header::COOKIE, cookie)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(form.to_string()))
            .unwrap();
        app.clone().oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn signed_in_user_sees_their_dashboard() {
        let app = app();
        let cookie = sign_in(&app, "admin@ems.com").await;

        let (status, body) = get(&app, "/", Some(&cookie)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("System Administrator"));
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let app = app();
        let response = app
            .clone()
            .oneshot(login_request("admin@ems.com", "nope"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8(body.to_vec()).unwrap().contains("Invalid credentials"));
    }

    #[tokio::test]
    async fn missing_records_render_a_message_page() {
        let app = app();
        let cookie = sign_in(&app, "admin@ems.com").await;

        let (status, body) = get(&app, "/events/nope", Some(&cookie)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Event not found"));
        assert!(body.contains(r#"role="alertdialog""#));
    }

    #[tokio::test]
    async fn message_pages_escape_the_error_text() {
        let state = AppState::new(
            UserDirectory::default(),
            DataStore::default(),
            setup_templates("templates", AssetManifest::default()),
        );
        let failed = AppError::invalid("title", "<b>'x'</b>").into_response();

        let response = render_errors(State(state), failed).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let page = String::from_utf8(body.to_vec()).unwrap();
        assert!(page.contains("&lt;b&gt;&#x27;x&#x27;"));
        assert!(!page.contains("<b>"));
    }

    #[tokio::test]
    async fn gated_paths_render_the_login_form() {
        let app = app();

        let (status, body) = get(&app, "/events", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains(r#"name="password""#));
        assert!(body.contains("next=%2Fevents"));

        let (_, body) = get(&app, "/no/such/page", None).await;
        assert!(body.contains(r#"name="password""#));
    }

    #[tokio::test]
    async fn roles_cannot_reach_foreign_pages() {
        let app = app();
        let attendee = sign_in(&app, "attendee@ems.com").await;
        let vendor = sign_in(&app, "vendor@ems.com").await;

        assert_eq!(get(&app, "/users", Some(&attendee)).await.0, StatusCode::FORBIDDEN);
        assert_eq!(get(&app, "/tasks", Some(&attendee)).await.0, StatusCode::FORBIDDEN);
        assert_eq!(get(&app, "/registrations", Some(&vendor)).await.0, StatusCode::FORBIDDEN);
        assert_eq!(get(&app, "/services", Some(&vendor)).await.0, StatusCode::OK);
    }

    #[tokio::test]
    async fn attendee_registers_only_once() {
        let app = app();
        let cookie = sign_in(&app, "attendee@ems.com").await;

        assert_eq!(post(&app, "/events/2/register", &cookie).await, StatusCode::SEE_OTHER);
        assert_eq!(post(&app, "/events/2/register", &cookie).await, StatusCode::CONFLICT);

        let (_, body) = get(&app, "/registrations", Some(&cookie)).await;
        assert!(body.contains("Community Food Drive"));
    }

    #[tokio::test]
    async fn organizer_exports_registrations_as_csv() {
        let app = app();
        let cookie = sign_in(&app, "organizer@ems.com").await;

        let request = http::Request::get("/registrations/export.csv")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let csv = String::from_utf8(body.to_vec()).unwrap();
        assert!(csv.starts_with("Event,Attendee Name,Email,Registration Date,Status"));
    }

    #[tokio::test]
    async fn logout_ends_the_session() {
        let app = app();
        let cookie = sign_in(&app, "vendor@ems.com").await;

        let (status, _) = get(&app, "/logout", Some(&cookie)).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let (_, body) = get(&app, "/", Some(&cookie)).await;
        assert!(body.contains(r#"name="password""#));
    }

    #[tokio::test]
    async fn deactivated_users_lose_their_session() {
        let app = app();
        let admin = sign_in(&app, "admin@ems.com").await;
        let attendee = sign_in(&app, "attendee@ems.com").await;

        assert_eq!(post(&app, "/users/4/toggle-active", &admin).await, StatusCode::SEE_OTHER);
        let (_, body) = get(&app, "/", Some(&attendee)).await;
        assert!(body.contains(r#"name="password""#));
        let own = post(&app, "/users/1/toggle-active", &admin).await;
        assert_eq!(own, StatusCode::UNPROCESSABLE_ENTITY);

        let missing = post(&app, "/users/99/toggle-active", &admin).await;
        assert_eq!(missing, StatusCode::NOT_FOUND);
        assert_eq!(post(&app, "/users/4/toggle-active", &admin).await, StatusCode::SEE_OTHER);
        let attendee = sign_in(&app, "attendee@ems.com").await;
        assert_eq!(get(&app, "/", Some(&attendee)).await.0, StatusCode::OK);
    }

    const REVIEW: &str = "rating=4&organization=5&content=4&venue=3&catering=4&comment=Nice";

    #[tokio::test]
    async fn attendees_review_an_event_once() {
        let (app, store) = app_with(|data| data.add_registration(registration("7", "4", "5")));
        let jordan = sign_in(&app, "jordan.lee@example.com").await;

        let first = post_form(&app, "/events/4/feedback", &jordan, REVIEW).await;
        let second = post_form(&app, "/events/4/feedback", &jordan, REVIEW).await;
        assert_eq!(first, StatusCode::SEE_OTHER);
        assert_eq!(second, StatusCode::UNPROCESSABLE_ENTITY);

        let data = store.read();
        let mine = data
            .feedback()
            .iter()
            .filter(|f| f.event_id == "4" && f.user_id == "5")
            .count();
        assert_eq!(mine, 1);
    }

    #[tokio::test]
    async fn only_registered_attendees_leave_feedback() {
        let app = app();
        let vendor = sign_in(&app, "vendor@ems.com").await;
        let jordan = sign_in(&app, "jordan.lee@example.com").await;

        let from_vendor = post_form(&app, "/events/4/feedback", &vendor, REVIEW).await;
        assert_eq!(from_vendor, StatusCode::FORBIDDEN);

        let out_of_range = post_form(&app, "/events/1/feedback", &jordan, "rating=9").await;
        assert_eq!(out_of_range, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn attendee_cancels_only_their_own_registration() {
        let (app, store) = app_with(|_| {});
        let attendee = sign_in(&app, "attendee@ems.com").await;
        let before = store.read().event("1").map(|e| e.registered_count);

        assert_eq!(post(&app, "/registrations/1/cancel", &attendee).await, StatusCode::SEE_OTHER);
        let after = store.read().event("1").map(|e| e.registered_count);
        assert_eq!(after, before.map(|n| n - 1));

        assert_eq!(post(&app, "/registrations/1/cancel", &attendee).await, StatusCode::SEE_OTHER);
        assert_eq!(store.read().event("1").map(|e| e.registered_count), after);

        assert_eq!(post(&app, "/registrations/3/cancel", &attendee).await, StatusCode::NOT_FOUND);
        assert!(store.read().registration("3").is_some_and(|r| r.is_active()));
    }

    #[tokio::test]
    async fn organizers_check_in_only_at_their_own_events() {
        let (app, store) = app_with(|data| {
            if let Some(mut gala) = data.event("4").cloned() {
                gala.id = "9".to_string();
                gala.organizer_id = "1".to_string();
                gala.registered_count = 0;
                data.add_event(gala);
            }
            data.add_registration(registration("8", "9", "5"));
        });
        let organizer = sign_in(&app, "organizer@ems.com").await;

        let foreign = post(&app, "/registrations/8/check-in", &organizer).await;
        assert_eq!(foreign, StatusCode::NOT_FOUND);
        assert!(store.read().registration("8").is_some_and(|r| r.check_in_time.is_none()));

        let own = post(&app, "/registrations/3/check-in", &organizer).await;
        assert_eq!(own, StatusCode::SEE_OTHER);
        assert!(store.read().registration("3").is_some_and(|r| r.check_in_time.is_some()));
    }
}
