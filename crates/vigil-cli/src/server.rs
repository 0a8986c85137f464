//! Static file server
//!
//! Serves the application directory with a JSON health endpoint at
//! `GET /api/health`. Unknown paths outside `/api` fall back to
//! `index.html` so client-side views survive a reload.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use vigil_core::HealthStatus;
use warp::Filter;

/// Health endpoint
pub fn health() -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    warp::path!("api" / "health")
        .and(warp::get())
        .map(|| warp::reply::json(&HealthStatus::ok(vigil_core::VERSION)))
}

/// Every route: health, static files, then the SPA fallback
pub fn routes(root: PathBuf) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let index = root.join("index.html");
    let not_api = warp::path::peek()
        .and_then(|tail: warp::path::Peek| async move {
            if tail.segments().next() == Some("api") {
                Err(warp::reject::not_found())
            } else {
                Ok(())
            }
        })
        .untuple_one();
    let spa = warp::get().and(not_api).and(warp::fs::file(index));

    health()
        .or(warp::get().and(warp::fs::dir(root)))
        .or(spa)
        .with(warp::trace::request())
}

/// Parse a bind address such as `127.0.0.1:8080`
///
/// # Errors
/// Returns an error if `bind` is not a socket address.
pub fn parse_bind(bind: &str) -> Result<SocketAddr> {
    bind.parse()
        .with_context(|| format!("invalid bind address '{bind}'"))
}

/// Serve `root` on `addr` until the process exits
///
/// # Errors
/// Returns an error if `root` is not a directory.
pub async fn serve(addr: SocketAddr, root: &Path) -> Result<()> {
    if !root.is_dir() {
        anyhow::bail!("static root {} is not a directory", root.display());
    }
    tracing::info!(%addr, root = %root.display(), "serving");
    warp::serve(routes(root.to_path_buf())).run(addr).await;
    Ok(())
}
