//! NeoWS route handler
//!
//! `target=jpl` switches the endpoint into SBDB mode, taking `spk`, `des`
//! and `sstr` instead of a NeoWS subpath.

use crate::error::ProxyResult;
use crate::proxy::neo::{self, NeoRequest};
use crate::proxy::sbdb::{self, SbdbQuery};
use crate::proxy::{QueryParams, Relayed};
use crate::state::SharedState;
use axum::extract::{Query, State};
use tracing::debug;

const JPL_TARGET: &str = "jpl";

/// GET /api/neo?path=&target=&...
pub async fn neo(
    State(state): State<SharedState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> ProxyResult<Relayed> {
    let params = QueryParams::from(pairs);

    if params.get("target") == Some(JPL_TARGET) {
        debug!("NEO endpoint in SBDB mode");
        return sbdb::handle(
            state.upstream.as_ref(),
            &state.config,
            &SbdbQuery::from_query(&params),
        )
        .await;
    }

    neo::handle(
        state.upstream.as_ref(),
        &state.config,
        &NeoRequest::from_query(&params),
    )
    .await
}
