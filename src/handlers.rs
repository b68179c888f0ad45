//! Request handlers: orchestration of query building, the engine call and
//! the response projection.

use std::convert::TryFrom;
use tracing::{debug, error};
use warp::http::StatusCode;
use warp::reply::{json, with_status, Json, WithStatus};

use crate::api::{ApiError, DocumentsResponseBody, SearchQueryParams};
use crate::client::SearchBackend;
use crate::query::{self, SearchParams};
use crate::response;

/// Engine and transport failures are surfaced to the client behind this
/// generic message; the detail only goes to the server log.
const SEARCH_FAILED: &str = "Erro ao realizar a pesquisa";

fn bad_request(message: String) -> WithStatus<Json> {
    with_status(json(&ApiError { error: message }), StatusCode::BAD_REQUEST)
}

pub async fn search<B>(
    raw_params: SearchQueryParams,
    backend: B,
) -> Result<impl warp::Reply, warp::Rejection>
where
    B: SearchBackend,
{
    let params = match SearchParams::try_from(raw_params) {
        Ok(params) => params,
        Err(err) => return Ok(bad_request(err.to_string())),
    };

    // Validation failures short-circuit here: no network call is made.
    let query = match query::build_query(&params) {
        Ok(query) => query,
        Err(err) => return Ok(bad_request(err.to_string())),
    };

    let dsl = query.dsl();
    debug!("query: {}", dsl);

    match backend.search(&dsl).await {
        Ok(raw) => {
            let documentos = response::project(&raw);
            Ok(with_status(
                json(&DocumentsResponseBody { documentos }),
                StatusCode::OK,
            ))
        }
        Err(err) => {
            error!("Erro ao realizar a pesquisa no Elasticsearch: {}", err);
            Ok(with_status(
                json(&ApiError {
                    error: SEARCH_FAILED.to_string(),
                }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ))
        }
    }
}
