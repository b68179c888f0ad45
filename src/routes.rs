//! Warp filters composing the REST API.

use std::convert::Infallible;
use warp::{http::StatusCode, path, Filter, Rejection, Reply};

use crate::api::{ApiError, SearchQueryParams};
use crate::client::SearchBackend;
use crate::handlers;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn search<B>(
    backend: B,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone
where
    B: SearchBackend + Clone + Send + Sync + 'static,
{
    warp::get()
        .and(path!("search"))
        .and(search_query())
        .and(with_backend(backend))
        .and_then(handlers::search)
}

/// Reads the raw query string of a search request. All validation beyond
/// deserialization happens in the handler, so that rejections here only
/// mean a malformed query string.
pub fn search_query() -> impl Filter<Extract = (SearchQueryParams,), Error = Rejection> + Copy {
    warp::filters::query::query()
}

pub fn version() -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    warp::get().and(path!("version")).map(|| VERSION)
}

pub fn with_backend<B>(
    backend: B,
) -> impl Filter<Extract = (B,), Error = Infallible> + Clone
where
    B: SearchBackend + Clone + Send,
{
    warp::any().map(move || backend.clone())
}

/// Converts rejections to the API's JSON error shape.
pub async fn report_invalid(rejection: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if rejection.is_not_found() {
        (StatusCode::NOT_FOUND, "rota não encontrada")
    } else if rejection
        .find::<warp::reject::InvalidQuery>()
        .is_some()
    {
        (StatusCode::BAD_REQUEST, "parâmetros de consulta inválidos")
    } else {
        (StatusCode::INTERNAL_SERVER_ERROR, "erro interno")
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiError {
            error: message.to_string(),
        }),
        status,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_serve_version() {
        let filter = version();
        let resp = warp::test::request().path("/version").reply(&filter).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.body(), VERSION);
    }

    #[tokio::test]
    async fn should_extract_raw_search_parameters() {
        let filter = search_query();
        let params = warp::test::request()
            .path("/search?texto_pesquisa=contrato&numDoe=123&size=10")
            .filter(&filter)
            .await
            .unwrap();
        assert_eq!(params.texto_pesquisa.as_deref(), Some("contrato"));
        assert_eq!(params.num_doe.as_deref(), Some("123"));
        assert_eq!(params.size.as_deref(), Some("10"));
        assert!(params.post_date_inicial.is_none());
    }
}
