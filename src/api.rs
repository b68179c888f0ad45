//! Wire types of the REST API: the raw inbound query string and the
//! response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// The query string of `GET /search`, as received. Numeric and enum
/// parameters arrive as strings and are validated in [`crate::query`].
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchQueryParams {
    pub texto_pesquisa: Option<String>,
    #[serde(rename = "numDoe")]
    pub num_doe: Option<String>,
    #[serde(rename = "postDateInicial")]
    pub post_date_inicial: Option<String>,
    #[serde(rename = "postDateFinal")]
    pub post_date_final: Option<String>,
    #[serde(rename = "tipoOrdenacao")]
    pub tipo_ordenacao: Option<String>,
    #[serde(rename = "tipoBuscaTextual")]
    pub tipo_busca_textual: Option<String>,
    pub size: Option<String>,
}

/// One projected document: the opaque metadata object of the hit, plus the
/// highlighted excerpts of the body text, in engine order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentHit {
    pub metadados: JsonValue,
    pub highlight: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentsResponseBody {
    pub documentos: Vec<DocumentHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}
