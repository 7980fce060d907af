use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use minijinja::context;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use strum::VariantArray;
use tracing::info;

use super::{
    directory::{DEMO_PASSWORD, NewAccount},
    user::{AuthSession, Credentials},
};
use crate::{
    error::{AppError, AppResult},
    model::Role,
    router::AppState,
    routes::back_to,
    util::form,
};

// This allows us to extract the "next" field from the query string. We use this
// to redirect after log in.
#[derive(Debug, Deserialize)]
pub struct NextUrl {
    next: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(self::get::login).post(self::post::login))
        .route("/register", get(self::get::login).post(self::post::register))
        .route("/logout", get(self::get::logout))
}

/// The sign-in page, remembering where to go afterwards.
pub fn login_page(state: &AppState, next: Option<&str>) -> AppResult<Response> {
    let next = next.filter(|n| *n != "/" && *n != "/login");
    let next_query = next.map(|n| utf8_percent_encode(n, NON_ALPHANUMERIC).to_string());
    let data = state.data.read();

    let html = state.templates.get_template("login.html")?.render(context! {
        next => next,
        next_query => next_query,
        site => data.settings(),
        roles => Role::VARIANTS,
        demo_password => DEMO_PASSWORD,
    })?;

    Ok(Html(html).into_response())
}

mod post {
    use super::*;

    #[derive(Debug, Deserialize)]
    pub struct LoginForm {
        email: String,
        password: String,
        next: Option<String>,
    }

    pub async fn login(
        mut auth_session: AuthSession,
        Query(NextUrl { next: query_next }): Query<NextUrl>,
        Form(input): Form<LoginForm>,
    ) -> AppResult<Response> {
        let creds = Credentials {
            email: input.email.trim().to_string(),
            password: input.password,
        };

        let user = match auth_session.authenticate(creds).await {
            Ok(Some(user)) => user,
            Ok(None) => return Err(AppError::InvalidCredentials),
            Err(err) => return Err(AppError::Session(err.to_string())),
        };

        auth_session
            .login(&user)
            .await
            .map_err(|err| AppError::Session(err.to_string()))?;
        info!("{} signed in", user.email);

        let next = form::optional(input.next).or(query_next);
        Ok(back_to(next.as_deref(), "/"))
    }

    #[derive(Debug, Deserialize)]
    pub struct RegisterForm {
        email: Option<String>,
        password: Option<String>,
        name: Option<String>,
        role: Option<String>,
    }

    pub async fn register(
        State(state): State<AppState>,
        mut auth_session: AuthSession,
        Form(input): Form<RegisterForm>,
    ) -> AppResult<Response> {
        let role = match form::optional(input.role) {
            Some(raw) => form::parse::<Role>(&raw, "role")?,
            None => Role::Attendee,
        };
        let account = NewAccount {
            email: form::required(input.email, "email")?,
            password: input.password.unwrap_or_default(),
            name: form::required(input.name, "name")?,
            role,
        };

        let user = state.directory.register(account)?;
        auth_session
            .login(&user)
            .await
            .map_err(|err| AppError::Session(err.to_string()))?;

        Ok(Redirect::to("/").into_response())
    }
}

mod get {
    use super::*;

    pub async fn login(
        State(state): State<AppState>,
        auth_session: AuthSession,
        Query(NextUrl { next }): Query<NextUrl>,
    ) -> AppResult<Response> {
        if auth_session.user.is_some() {
            return Ok(Redirect::to("/").into_response());
        }
        login_page(&state, next.as_deref())
    }

    pub async fn logout(mut auth_session: AuthSession) -> AppResult<Response> {
        if let Some(user) = auth_session
            .logout()
            .await
            .map_err(|err| AppError::Session(err.to_string()))?
        {
            info!("{} signed out", user.email);
        }
        Ok(Redirect::to("/login").into_response())
    }
}
