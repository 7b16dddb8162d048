use std::sync::Arc;

use atlas::{AtlasApi, AtlasClient};
use axum::extract::{FromRequestParts, Path, Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;
use crate::instances::Operation;
use crate::{
    BindDetails, Broker, ConnectionDetails, ProvisionDetails, Service, UpdateDetails,
};

// Per-request Atlas client, attached to request extensions by the auth
// middleware and recovered by handlers as an extractor.
#[derive(Clone)]
pub struct AtlasHandle(pub Arc<dyn AtlasApi>);

impl<S: Send + Sync> FromRequestParts<S> for AtlasHandle {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // The middleware installs the client on every authenticated
        // request; absence is a wiring bug, not a client error.
        parts
            .extensions
            .get::<AtlasHandle>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("no Atlas client in request context".into()))
    }
}

pub fn router(atlas_base_url: String, broker: Broker) -> Router {
    Router::new()
        .route("/v2/catalog", get(catalog))
        .route(
            "/v2/service_instances/{instance_id}",
            axum::routing::put(provision)
                .patch(update)
                .delete(deprovision)
                .get(get_instance),
        )
        .route(
            "/v2/service_instances/{instance_id}/last_operation",
            get(last_operation),
        )
        .route(
            "/v2/service_instances/{instance_id}/service_bindings/{binding_id}",
            axum::routing::put(bind).delete(unbind).get(get_binding),
        )
        .route(
            "/v2/service_instances/{instance_id}/service_bindings/{binding_id}/last_operation",
            get(last_binding_operation),
        )
        .layer(middleware::from_fn_with_state(
            Arc::<str>::from(atlas_base_url),
            auth,
        ))
        .with_state(Arc::new(broker))
}

async fn auth(State(base_url): State<Arc<str>>, mut request: Request, next: Next) -> Response {
    let Some((username, password)) = basic_credentials(request.headers()) else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    // The username carries both the public key and the project group ID
    // as "<PUBLIC_KEY>@<GROUP_ID>"; the password is the private key.
    let parts: Vec<&str> = username.split('@').collect();
    let (public_key, group_id) = match parts.as_slice() {
        [public_key, group_id] if !public_key.is_empty() && !group_id.is_empty() => {
            (*public_key, *group_id)
        }
        _ => return StatusCode::UNAUTHORIZED.into_response(),
    };
    if password.is_empty() {
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let client = AtlasClient::new(&base_url, group_id, public_key, &password);
    request.extensions_mut().insert(AtlasHandle(Arc::new(client)));

    next.run(request).await
}

fn basic_credentials(headers: &HeaderMap) -> Option<(String, String)> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let encoded = header.strip_prefix("Basic ")?;
    let decoded = String::from_utf8(BASE64.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_owned(), password.to_owned()))
}

#[derive(Debug, Default, Deserialize)]
struct AsyncQuery {
    #[serde(default)]
    accepts_incomplete: bool,
}

#[derive(Debug, Deserialize)]
struct LastOperationQuery {
    operation: Option<String>,
}

#[derive(Serialize)]
struct CatalogResponse {
    services: Vec<Service>,
}

#[derive(Serialize)]
struct OperationResponse {
    operation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dashboard_url: Option<String>,
}

#[derive(Serialize)]
struct LastOperationResponse {
    state: &'static str,
}

#[derive(Serialize)]
struct BindingResponse {
    credentials: ConnectionDetails,
}

#[derive(Serialize)]
struct Empty {}

async fn catalog(State(broker): State<Arc<Broker>>) -> Json<CatalogResponse> {
    Json(CatalogResponse {
        services: broker.services(),
    })
}

async fn provision(
    State(broker): State<Arc<Broker>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    AtlasHandle(atlas): AtlasHandle,
    Json(details): Json<ProvisionDetails>,
) -> Result<Response, ApiError> {
    let result = broker
        .provision(atlas.as_ref(), &instance_id, &details, query.accepts_incomplete)
        .await?;

    // An equivalent instance that already exists answers 200, a freshly
    // started provision 202.
    let status = if result.already_exists {
        StatusCode::OK
    } else {
        StatusCode::ACCEPTED
    };
    let body = OperationResponse {
        operation: result.operation.as_str(),
        dashboard_url: Some(result.dashboard_url),
    };
    Ok((status, Json(body)).into_response())
}

async fn update(
    State(broker): State<Arc<Broker>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    AtlasHandle(atlas): AtlasHandle,
    Json(details): Json<UpdateDetails>,
) -> Result<Response, ApiError> {
    let result = broker
        .update(atlas.as_ref(), &instance_id, &details, query.accepts_incomplete)
        .await?;

    let body = OperationResponse {
        operation: result.operation.as_str(),
        dashboard_url: Some(result.dashboard_url),
    };
    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

async fn deprovision(
    State(broker): State<Arc<Broker>>,
    Path(instance_id): Path<String>,
    Query(query): Query<AsyncQuery>,
    AtlasHandle(atlas): AtlasHandle,
) -> Result<Response, ApiError> {
    let result = broker
        .deprovision(atlas.as_ref(), &instance_id, query.accepts_incomplete)
        .await?;

    let body = OperationResponse {
        operation: result.operation.as_str(),
        dashboard_url: None,
    };
    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

async fn last_operation(
    State(broker): State<Arc<Broker>>,
    Path(instance_id): Path<String>,
    Query(query): Query<LastOperationQuery>,
    AtlasHandle(atlas): AtlasHandle,
) -> Result<Json<LastOperationResponse>, ApiError> {
    let operation: Operation = query
        .operation
        .as_deref()
        .ok_or_else(|| ApiError::InvalidParameters("missing operation poll data".into()))?
        .parse()?;

    let result = broker
        .last_operation(atlas.as_ref(), &instance_id, operation)
        .await?;

    Ok(Json(LastOperationResponse {
        state: result.state.as_str(),
    }))
}

// Not supported, as advertised by instances_retrievable = false.
async fn get_instance(Path(instance_id): Path<String>) -> ApiError {
    ApiError::NotSupported(format!("unknown instance ID {instance_id:?}"))
}

async fn bind(
    State(broker): State<Arc<Broker>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    AtlasHandle(atlas): AtlasHandle,
    Json(details): Json<BindDetails>,
) -> Result<Response, ApiError> {
    let binding = broker
        .bind(atlas.as_ref(), &instance_id, &binding_id, &details)
        .await?;

    let body = BindingResponse {
        credentials: binding.credentials,
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

async fn unbind(
    State(broker): State<Arc<Broker>>,
    Path((instance_id, binding_id)): Path<(String, String)>,
    AtlasHandle(atlas): AtlasHandle,
) -> Result<Json<Empty>, ApiError> {
    broker
        .unbind(atlas.as_ref(), &instance_id, &binding_id)
        .await?;
    Ok(Json(Empty {}))
}

// Not supported, as advertised by bindings_retrievable = false.
async fn get_binding(Path((_, binding_id)): Path<(String, String)>) -> ApiError {
    ApiError::NotSupported(format!("unknown binding ID {binding_id:?}"))
}

async fn last_binding_operation() -> ApiError {
    ApiError::NotSupported("binding operations are not pollable".into())
}
