//! Small-Body Database route handlers

use crate::error::ProxyResult;
use crate::proxy::sbdb::{self, SbdbQuery};
use crate::proxy::{QueryParams, Relayed};
use crate::resolver::{self, UpstreamLookup};
use crate::state::SharedState;
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
    Json,
};

/// GET /api/sbdb?spk=&des=&sstr=
pub async fn small_body(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ProxyResult<Relayed> {
    let query = SbdbQuery::from_query(&QueryParams::from(pairs));
    sbdb::handle(state.upstream.as_ref(), &state.config, &query).await
}

/// GET /api/sbdb/resolve?spk=&des=&name=
///
/// Ordered fallback, one identifier per upstream call. `sstr` is accepted as
/// an alias for `name`.
pub async fn resolve(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ProxyResult<impl IntoResponse> {
    let params = QueryParams::from(pairs);
    let keys = resolver::candidates(
        params.get("spk"),
        params.get("des"),
        params.get("name").or_else(|| params.get("sstr")),
    );

    let lookup = UpstreamLookup {
        upstream: state.upstream.as_ref(),
        config: &state.config,
    };
    let data = resolver::resolve(&lookup, &keys).await?;

    Ok(([(header::CACHE_CONTROL, sbdb::CACHE_CONTROL)], Json(data)))
}
