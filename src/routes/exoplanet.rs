//! Exoplanet archive route handler

use crate::error::ProxyResult;
use crate::proxy::exoplanet::{self, ExoplanetQueryParams};
use crate::proxy::{QueryParams, Relayed};
use crate::state::SharedState;
use axum::extract::{Query, State};

/// GET /api/exo?max_pc=&min_p=&limit=
pub async fn exoplanets(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ProxyResult<Relayed> {
    let params = ExoplanetQueryParams::from_query(&QueryParams::from(pairs));
    exoplanet::handle(state.upstream.as_ref(), &state.config, params).await
}
