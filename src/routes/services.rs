use axum::{
    Form, Router,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use minijinja::context;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::render;
use crate::{
    capability::{Page, Permission, Viewer},
    error::{AppError, AppResult},
    model::{ServiceUpdate, VendorService, service::SERVICE_CATEGORIES, split_list},
    router::AppState,
    util::form,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/services", get(list).post(create))
        .route("/services/{id}/edit", get(edit).post(update))
        .route("/services/{id}/toggle", post(toggle))
        .route("/services/{id}/delete", post(delete))
}

fn guard(viewer: &Viewer) -> AppResult<()> {
    viewer.require(Page::Services)?;
    viewer.require_permission(Permission::ManageServices)
}

async fn list(State(state): State<AppState>, viewer: Viewer) -> AppResult<Response> {
    guard(&viewer)?;
    let data = state.data.read();
    let services: Vec<_> = data.services_of(&viewer.user.id).collect();
    let available = services.iter().filter(|s| s.available).count();

    render(
        &state,
        &viewer,
        &data,
        "services.html",
        "/services",
        context! {
            services => services,
            available => available,
            categories => SERVICE_CATEGORIES,
        },
    )
}

#[derive(Debug, Default, Deserialize)]
pub struct ServiceForm {
    name: Option<String>,
    description: Option<String>,
    category: Option<String>,
    price: Option<String>,
    duration: Option<String>,
    location: Option<String>,
    features: Option<String>,
}

impl ServiceForm {
    fn validate(self) -> AppResult<ServiceUpdate> {
        let name = form::required(self.name, "name")?;
        let description = form::required(self.description, "description")?;
        let category = form::required(self.category, "category")?;
        if !SERVICE_CATEGORIES.contains(&category.as_str()) {
            return Err(AppError::invalid("category", format!("unknown category `{category}`")));
        }
        let price: f64 = form::parse(&form::required(self.price, "price")?, "price")?;
        if !price.is_finite() || price < 0.0 {
            return Err(AppError::invalid("price", "must be zero or more"));
        }

        Ok(ServiceUpdate {
            name: Some(name),
            description: Some(description),
            category: Some(category),
            price: Some(price),
            duration: Some(form::optional(self.duration).unwrap_or_default()),
            location: Some(form::optional(self.location).unwrap_or_default()),
            features: Some(self.features.as_deref().map(split_list).unwrap_or_default()),
        })
    }
}

async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(input): Form<ServiceForm>,
) -> AppResult<Response> {
    guard(&viewer)?;
    let update = input.validate()?;
    let mut service = VendorService {
        id: Uuid::new_v4().to_string(),
        vendor_id: viewer.user.id.clone(),
        name: String::new(),
        description: String::new(),
        category: String::new(),
        price: 0.0,
        duration: String::new(),
        location: String::new(),
        rating: 0.0,
        reviews: 0,
        available: true,
        features: Vec::new(),
    };
    update.apply(&mut service);
    state.data.write().add_service(service);

    Ok(Redirect::to("/services").into_response())
}

async fn edit(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    guard(&viewer)?;
    let data = state.data.read();
    let service = data
        .services_of(&viewer.user.id)
        .find(|s| s.id == id)
        .ok_or(AppError::NotFound("Service"))?;

    render(
        &state,
        &viewer,
        &data,
        "service_form.html",
        "/services",
        context! {
            service => service,
            categories => SERVICE_CATEGORIES,
        },
    )
}

async fn update(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
    Form(input): Form<ServiceForm>,
) -> AppResult<Response> {
    guard(&viewer)?;
    let update = input.validate()?;
    if !state.data.write().update_service(&viewer.user.id, &id, update) {
        return Err(AppError::NotFound("Service"));
    }

    Ok(Redirect::to("/services").into_response())
}

async fn toggle(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    guard(&viewer)?;
    let available = state
        .data
        .write()
        .toggle_service_availability(&viewer.user.id, &id)
        .ok_or(AppError::NotFound("Service"))?;
    info!("{} set service {} available={}", viewer.user.email, id, available);

    Ok(Redirect::to("/services").into_response())
}

async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(id): Path<String>,
) -> AppResult<Response> {
    guard(&viewer)?;
    if !state.data.write().delete_service(&viewer.user.id, &id) {
        return Err(AppError::NotFound("Service"));
    }

    Ok(Redirect::to("/services").into_response())
}
