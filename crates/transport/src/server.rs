//! HTTP handlers for one node.
//!
//! Handlers are thin: decode the request, call the node, map the outcome to
//! a status code. Peer failures never surface here since the node absorbs
//! them; only ring-level errors do.

use crate::error::HttpError;
use crate::protocol::{
    ExchangeRequest, ExchangeResponse, StatsResponse, ENDPOINT_DATA, ENDPOINT_EXCHANGE,
    ENDPOINT_GET_INTERNAL, ENDPOINT_JOIN, ENDPOINT_PEERS, ENDPOINT_RECONCILE, ENDPOINT_REPLICATE,
    ENDPOINT_ROUTE, ENDPOINT_SETTINGS_N, ENDPOINT_STATS_KEYS, VERSION_HEADER,
};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use corelib::{Error, NodeId};
use replication::{
    ClusterNode, ParseVersionError, PeerTransport, ReplicationError, Version, Versioned,
};
use std::sync::Arc;
use tokio::net::TcpListener;

type Shared<T> = State<Arc<ClusterNode<T>>>;

/// All public and internal routes of `node`.
pub fn router<T: PeerTransport>(node: Arc<ClusterNode<T>>) -> Router {
    Router::new()
        .route(
            &format!("{ENDPOINT_DATA}/:key"),
            put(put_data::<T>).get(get_data::<T>),
        )
        .route(ENDPOINT_PEERS, get(list_peers::<T>))
        .route(ENDPOINT_JOIN, put(join::<T>))
        .route(
            ENDPOINT_SETTINGS_N,
            put(set_replication_factor::<T>).get(replication_factor::<T>),
        )
        .route(ENDPOINT_STATS_KEYS, get(stats_keys::<T>))
        .route(&format!("{ENDPOINT_REPLICATE}/:key"), put(replicate::<T>))
        .route(&format!("{ENDPOINT_ROUTE}/:key"), put(route::<T>))
        .route(&format!("{ENDPOINT_GET_INTERNAL}/:key"), get(get_local::<T>))
        .route(ENDPOINT_EXCHANGE, post(exchange::<T>))
        .route(ENDPOINT_RECONCILE, post(reconcile::<T>))
        .with_state(node)
}

/// Serves `node` on `listener` until the task is dropped or the listener
/// fails.
pub async fn serve<T: PeerTransport>(
    listener: TcpListener,
    node: Arc<ClusterNode<T>>,
) -> Result<(), HttpError> {
    tracing::info!(
        node = %node.local_id(),
        addr = ?listener.local_addr().ok(),
        "HTTP server listening"
    );
    axum::serve(listener, router(node)).await?;
    Ok(())
}

fn error_response(err: ReplicationError) -> Response {
    let status = match &err {
        ReplicationError::Ring(Error::NoAliveNodes) => StatusCode::SERVICE_UNAVAILABLE,
        ReplicationError::Ring(
            Error::InvalidNode(_) | Error::InvalidReplicationFactor(_) | Error::InvalidToken(_),
        ) => StatusCode::BAD_REQUEST,
    };
    tracing::error!(error = %err, "request failed");
    (status, err.to_string()).into_response()
}

/// Reads the version a peer attached to a copy.
fn copy_version(headers: &HeaderMap) -> Result<Version, Response> {
    let reject = |message: String| (StatusCode::BAD_REQUEST, message).into_response();
    let raw = headers
        .get(VERSION_HEADER)
        .ok_or_else(|| reject(format!("missing {VERSION_HEADER} header")))?;
    raw.to_str()
        .map_err(|err| reject(err.to_string()))?
        .parse()
        .map_err(|err: ParseVersionError| reject(err.to_string()))
}

/// Peer listing, one per line, dead peers prefixed with `dead:`.
fn peer_listing<T>(node: &ClusterNode<T>) -> String {
    node.membership()
        .peers()
        .iter()
        .map(|peer| format!("{peer}\n"))
        .collect()
}

// --- Public API ---

async fn put_data<T: PeerTransport>(
    State(node): Shared<T>,
    Path(key): Path<String>,
    value: String,
) -> Response {
    match node.write(&key, &value).await {
        Ok(report) => {
            tracing::debug!(key, copies = report.copies(), "write accepted");
            (StatusCode::CREATED, value).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn get_data<T: PeerTransport>(State(node): Shared<T>, Path(key): Path<String>) -> Response {
    match node.read(&key).await {
        Ok(Some(value)) => (StatusCode::OK, value).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "key not found").into_response(),
        Err(err) => error_response(err),
    }
}

async fn list_peers<T: PeerTransport>(State(node): Shared<T>) -> String {
    peer_listing(&node)
}

async fn join<T: PeerTransport>(State(node): Shared<T>, body: String) -> Response {
    let peer = match NodeId::parse(&body) {
        Ok(peer) => peer,
        Err(err) => return (StatusCode::BAD_REQUEST, err.to_string()).into_response(),
    };
    match node.join(&peer).await {
        Ok(report) => {
            tracing::info!(
                %peer,
                learned = report.learned.len(),
                unreachable = report.unreachable.len(),
                pushed = report.reconcile.pushed,
                "join finished"
            );
            (StatusCode::OK, peer_listing(&node)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn replication_factor<T: PeerTransport>(State(node): Shared<T>) -> String {
    node.replication_factor().to_string()
}

async fn set_replication_factor<T: PeerTransport>(State(node): Shared<T>, body: String) -> Response {
    let factor = match body.trim().parse::<usize>() {
        Ok(factor) => factor,
        Err(err) => {
            let message = format!("invalid replication factor {body:?}: {err}");
            return (StatusCode::BAD_REQUEST, message).into_response();
        }
    };
    match node.set_replication_factor(factor) {
        Ok(()) => (StatusCode::OK, factor.to_string()).into_response(),
        Err(err) => error_response(err.into()),
    }
}

async fn stats_keys<T: PeerTransport>(State(node): Shared<T>) -> Json<StatsResponse> {
    Json(StatsResponse::new(node.store().snapshot()))
}

// --- Internal API ---

async fn replicate<T: PeerTransport>(
    State(node): Shared<T>,
    Path(key): Path<String>,
    headers: HeaderMap,
    value: String,
) -> Response {
    let version = match copy_version(&headers) {
        Ok(version) => version,
        Err(rejection) => return rejection,
    };
    node.store_replica(&key, Versioned::new(value, version));
    StatusCode::NO_CONTENT.into_response()
}

async fn route<T: PeerTransport>(
    State(node): Shared<T>,
    Path(key): Path<String>,
    headers: HeaderMap,
    value: String,
) -> Response {
    let version = match copy_version(&headers) {
        Ok(version) => version,
        Err(rejection) => return rejection,
    };
    match node.write_forwarded(&key, &Versioned::new(value, version)).await {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => error_response(err),
    }
}

async fn get_local<T: PeerTransport>(State(node): Shared<T>, Path(key): Path<String>) -> Response {
    match node.read_local(&key) {
        Some(value) => (StatusCode::OK, value).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn exchange<T: PeerTransport>(
    State(node): Shared<T>,
    Json(request): Json<ExchangeRequest>,
) -> Response {
    match node.accept_exchange(&request.from, &request.peers).await {
        Ok(peers) => Json(ExchangeResponse { peers }).into_response(),
        Err(err) => error_response(err),
    }
}

async fn reconcile<T: PeerTransport>(State(node): Shared<T>) -> Response {
    match node.reconcile().await {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(err),
    }
}
