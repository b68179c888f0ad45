//! Translation of the validated search parameters into the Elasticsearch
//! query DSL sent to the gazette index.

use serde_json::json;
use snafu::Snafu;
use std::convert::TryFrom;
use tracing::info;

use crate::api::SearchQueryParams;

pub const DEFAULT_RESULT_LIMIT: u64 = 50;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum ValidationError {
    #[snafu(display("O parâmetro 'size' deve ser um número inteiro válido"))]
    InvalidResultLimit,

    #[snafu(display("Pelo menos um parâmetro de busca é obrigatório"))]
    MissingCriterion,

    #[snafu(display("Valor inválido para o parâmetro '{}'", param))]
    InvalidParam { param: &'static str },
}

/// How the terms of `texto_pesquisa` are combined when matching the
/// document body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatchMode {
    /// All terms must appear ("e").
    And,
    /// Any term may appear ("ou").
    Or,
    /// The exact phrase must appear, in order ("frase").
    ExactPhrase,
}

impl Default for TextMatchMode {
    fn default() -> Self {
        TextMatchMode::And
    }
}

impl TextMatchMode {
    fn from_param(value: &str) -> Result<Self, ValidationError> {
        match value {
            "e" => Ok(TextMatchMode::And),
            "ou" => Ok(TextMatchMode::Or),
            "frase" => Ok(TextMatchMode::ExactPhrase),
            _ => Err(ValidationError::InvalidParam {
                param: "tipoBuscaTextual",
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    Relevance,
    DateAsc,
    DateDesc,
}

impl Default for SortMode {
    fn default() -> Self {
        SortMode::Relevance
    }
}

impl SortMode {
    fn from_param(value: &str) -> Result<Self, ValidationError> {
        match value {
            "relevancia" => Ok(SortMode::Relevance),
            "date_asc" => Ok(SortMode::DateAsc),
            "date_desc" => Ok(SortMode::DateDesc),
            _ => Err(ValidationError::InvalidParam {
                param: "tipoOrdenacao",
            }),
        }
    }
}

/// Search parameters once the raw query string has been validated: the
/// result limit has been parsed and the mode parameters resolved to their
/// enums. Criterion fields keep the optionality of the inbound request.
#[derive(Debug, Clone, Default)]
pub struct SearchParams {
    pub texto_pesquisa: Option<String>,
    pub num_doe: Option<String>,
    pub post_date_inicial: Option<String>,
    pub post_date_final: Option<String>,
    pub tipo_ordenacao: SortMode,
    pub tipo_busca_textual: TextMatchMode,
    pub size: u64,
}

// An empty parameter value is treated like an absent one.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl TryFrom<SearchQueryParams> for SearchParams {
    type Error = ValidationError;

    fn try_from(raw: SearchQueryParams) -> Result<Self, Self::Error> {
        // The result limit is checked before anything else, so that an
        // invalid 'size' is reported even when no criterion is present.
        let size = match raw.size.as_deref() {
            None => DEFAULT_RESULT_LIMIT,
            Some(s) => s
                .trim()
                .parse()
                .map_err(|_| ValidationError::InvalidResultLimit)?,
        };

        let tipo_ordenacao = raw
            .tipo_ordenacao
            .as_deref()
            .map(SortMode::from_param)
            .transpose()?
            .unwrap_or_default();

        let tipo_busca_textual = raw
            .tipo_busca_textual
            .as_deref()
            .map(TextMatchMode::from_param)
            .transpose()?
            .unwrap_or_default();

        Ok(SearchParams {
            texto_pesquisa: non_empty(raw.texto_pesquisa),
            num_doe: non_empty(raw.num_doe),
            post_date_inicial: non_empty(raw.post_date_inicial),
            post_date_final: non_empty(raw.post_date_final),
            tipo_ordenacao,
            tipo_busca_textual,
            size,
        })
    }
}

/// A single must-clause of the query. Every condition a matching document
/// is required to satisfy is one of these.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Term-based match on the document body, AND or OR across terms.
    Match { query: String, operator: Operator },
    /// Exact, contiguous phrase match on the document body.
    MatchPhrase { query: String },
    /// Exact match on the gazette number.
    Term { num_doe: i64 },
    /// Inclusive range on the publication date, either bound optional.
    Range {
        gte: Option<String>,
        lte: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

impl Condition {
    fn render(&self) -> serde_json::Value {
        match self {
            Condition::Match { query, operator } => json!({
                "match": {
                    "texto_page_doe": {
                        "query": query,
                        "operator": operator.as_str(),
                    }
                }
            }),
            Condition::MatchPhrase { query } => json!({
                "match_phrase": {
                    "texto_page_doe": query,
                }
            }),
            Condition::Term { num_doe } => json!({
                "term": {
                    "metadados.numDoe": num_doe,
                }
            }),
            Condition::Range { gte, lte } => {
                let mut range = json!({ "format": "yyyy-MM-dd" });
                if let Some(gte) = gte {
                    range["gte"] = json!(gte);
                }
                if let Some(lte) = lte {
                    range["lte"] = json!(lte);
                }
                json!({
                    "range": {
                        "metadados.postDate": range,
                    }
                })
            }
        }
    }
}

/// The query sent to the index for one request: conjunctive must-clauses,
/// an optional sort on the publication date, and the result cap. Built per
/// request and discarded after use.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub must: Vec<Condition>,
    pub sort: Option<SortMode>,
    pub size: u64,
}

impl SearchQuery {
    /// Renders the full Elasticsearch request body. The highlight
    /// configuration (5 fragments of 200 characters, ordered by score) and
    /// the source restriction to the metadata object are always attached.
    pub fn dsl(&self) -> serde_json::Value {
        let mut body = json!({
            "query": {
                "bool": {
                    "must": self.must.iter().map(Condition::render).collect::<Vec<_>>(),
                }
            },
            "highlight": {
                "fields": {
                    "texto_page_doe": {
                        "number_of_fragments": 5,
                        "fragment_size": 200,
                        "order": "score",
                    }
                }
            },
            "_source": [ "metadados" ],
            "size": self.size,
        });

        if let Some(order) = match self.sort {
            Some(SortMode::DateAsc) => Some("asc"),
            Some(SortMode::DateDesc) => Some("desc"),
            _ => None,
        } {
            body["sort"] = json!([{ "metadados.postDate": { "order": order } }]);
        }

        body
    }
}

/// Builds the index query from the validated parameters, or fails when no
/// search criterion is present.
pub fn build_query(params: &SearchParams) -> Result<SearchQuery, ValidationError> {
    let mut must = Vec::new();

    if let Some(text) = params.texto_pesquisa.as_ref() {
        must.push(match params.tipo_busca_textual {
            TextMatchMode::And => Condition::Match {
                query: text.clone(),
                operator: Operator::And,
            },
            TextMatchMode::Or => Condition::Match {
                query: text.clone(),
                operator: Operator::Or,
            },
            TextMatchMode::ExactPhrase => Condition::MatchPhrase {
                query: text.clone(),
            },
        });
    }

    if let Some(raw) = params.num_doe.as_ref() {
        // An unparseable gazette number does not fail the request: the
        // condition is dropped and the search proceeds without it. This is
        // asymmetric with the 'size' parameter, which is a hard error, but
        // it is the contractual behavior.
        match raw.parse::<i64>() {
            Ok(num_doe) => must.push(Condition::Term { num_doe }),
            Err(_) => info!("Valor inválido para numDoe, ignorando este campo na pesquisa."),
        }
    }

    if params.post_date_inicial.is_some() || params.post_date_final.is_some() {
        must.push(Condition::Range {
            gte: params.post_date_inicial.clone(),
            lte: params.post_date_final.clone(),
        });
    }

    if must.is_empty() {
        return Err(ValidationError::MissingCriterion);
    }

    let sort = match params.tipo_ordenacao {
        SortMode::Relevance => None,
        order => Some(order),
    };

    Ok(SearchQuery {
        must,
        sort,
        size: params.size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_params(text: &str, mode: TextMatchMode) -> SearchParams {
        SearchParams {
            texto_pesquisa: Some(text.to_string()),
            tipo_busca_textual: mode,
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        }
    }

    #[test]
    fn should_reject_request_without_any_criterion() {
        let params = SearchParams {
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        };
        assert_eq!(
            build_query(&params).unwrap_err(),
            ValidationError::MissingCriterion
        );
    }

    #[test]
    fn should_check_result_limit_before_criteria() {
        // size=abc with no criterion at all: the limit error wins.
        let raw = SearchQueryParams {
            size: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(
            SearchParams::try_from(raw).unwrap_err(),
            ValidationError::InvalidResultLimit
        );
    }

    #[test]
    fn should_default_result_limit_to_50() {
        let raw = SearchQueryParams {
            texto_pesquisa: Some("contrato".to_string()),
            ..Default::default()
        };
        let params = SearchParams::try_from(raw).unwrap();
        assert_eq!(params.size, 50);
    }

    #[test]
    fn should_treat_empty_parameters_as_absent() {
        let raw = SearchQueryParams {
            texto_pesquisa: Some(String::new()),
            num_doe: Some(String::new()),
            ..Default::default()
        };
        let params = SearchParams::try_from(raw).unwrap();
        assert_eq!(
            build_query(&params).unwrap_err(),
            ValidationError::MissingCriterion
        );
    }

    #[test]
    fn should_reject_unknown_text_match_mode() {
        let raw = SearchQueryParams {
            texto_pesquisa: Some("contrato".to_string()),
            tipo_busca_textual: Some("xor".to_string()),
            ..Default::default()
        };
        assert_eq!(
            SearchParams::try_from(raw).unwrap_err(),
            ValidationError::InvalidParam {
                param: "tipoBuscaTextual"
            }
        );
    }

    #[test]
    fn should_build_and_match_condition() {
        let query = build_query(&text_params("contrato licitação", TextMatchMode::And)).unwrap();
        assert_eq!(query.must.len(), 1);
        assert_eq!(
            query.must[0],
            Condition::Match {
                query: "contrato licitação".to_string(),
                operator: Operator::And,
            }
        );
    }

    #[test]
    fn should_build_or_match_condition() {
        let query = build_query(&text_params("contrato", TextMatchMode::Or)).unwrap();
        assert_eq!(
            query.must[0],
            Condition::Match {
                query: "contrato".to_string(),
                operator: Operator::Or,
            }
        );
    }

    #[test]
    fn should_build_phrase_condition() {
        let query = build_query(&text_params("dispensa de licitação", TextMatchMode::ExactPhrase))
            .unwrap();
        assert_eq!(
            query.must[0],
            Condition::MatchPhrase {
                query: "dispensa de licitação".to_string(),
            }
        );
    }

    #[test]
    fn should_build_term_condition_from_valid_num_doe() {
        let params = SearchParams {
            num_doe: Some("12345".to_string()),
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        };
        let query = build_query(&params).unwrap();
        assert_eq!(query.must, vec![Condition::Term { num_doe: 12345 }]);
    }

    #[test]
    fn should_silently_drop_invalid_num_doe() {
        // numDoe=abc must yield the exact same clauses as an absent numDoe,
        // and never an error.
        let with_invalid = SearchParams {
            texto_pesquisa: Some("contrato".to_string()),
            num_doe: Some("abc".to_string()),
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        };
        let without = SearchParams {
            texto_pesquisa: Some("contrato".to_string()),
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        };
        assert_eq!(
            build_query(&with_invalid).unwrap().must,
            build_query(&without).unwrap().must
        );
    }

    #[test]
    fn should_reject_invalid_num_doe_alone() {
        // With the invalid gazette number dropped, no criterion remains.
        let params = SearchParams {
            num_doe: Some("abc".to_string()),
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        };
        assert_eq!(
            build_query(&params).unwrap_err(),
            ValidationError::MissingCriterion
        );
    }

    #[test]
    fn should_build_range_with_only_supplied_bounds() {
        let params = SearchParams {
            post_date_inicial: Some("2024-01-01".to_string()),
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        };
        let query = build_query(&params).unwrap();
        assert_eq!(
            query.must,
            vec![Condition::Range {
                gte: Some("2024-01-01".to_string()),
                lte: None,
            }]
        );

        let rendered = query.must[0].render();
        let range = &rendered["range"]["metadados.postDate"];
        assert_eq!(range["format"], "yyyy-MM-dd");
        assert_eq!(range["gte"], "2024-01-01");
        assert!(range.get("lte").is_none());
    }

    #[test]
    fn should_build_range_with_both_bounds() {
        let params = SearchParams {
            post_date_inicial: Some("2024-01-01".to_string()),
            post_date_final: Some("2024-12-31".to_string()),
            size: DEFAULT_RESULT_LIMIT,
            ..Default::default()
        };
        let query = build_query(&params).unwrap();
        let rendered = query.must[0].render();
        let range = &rendered["range"]["metadados.postDate"];
        assert_eq!(range["gte"], "2024-01-01");
        assert_eq!(range["lte"], "2024-12-31");
    }

    #[test]
    fn should_attach_sort_only_for_date_orders() {
        let mut params = text_params("contrato", TextMatchMode::And);

        params.tipo_ordenacao = SortMode::Relevance;
        let dsl = build_query(&params).unwrap().dsl();
        assert!(dsl.get("sort").is_none());

        params.tipo_ordenacao = SortMode::DateAsc;
        let dsl = build_query(&params).unwrap().dsl();
        assert_eq!(dsl["sort"][0]["metadados.postDate"]["order"], "asc");

        params.tipo_ordenacao = SortMode::DateDesc;
        let dsl = build_query(&params).unwrap().dsl();
        assert_eq!(dsl["sort"][0]["metadados.postDate"]["order"], "desc");
    }

    #[test]
    fn should_always_attach_highlight_source_and_size() {
        let mut params = text_params("contrato", TextMatchMode::And);
        params.size = 7;
        let dsl = build_query(&params).unwrap().dsl();

        let highlight = &dsl["highlight"]["fields"]["texto_page_doe"];
        assert_eq!(highlight["number_of_fragments"], 5);
        assert_eq!(highlight["fragment_size"], 200);
        assert_eq!(highlight["order"], "score");

        assert_eq!(dsl["_source"], json!(["metadados"]));
        assert_eq!(dsl["size"], 7);
    }

    #[test]
    fn should_render_and_match_dsl() {
        let dsl = build_query(&text_params("contrato", TextMatchMode::And))
            .unwrap()
            .dsl();
        let must = dsl["query"]["bool"]["must"].as_array().unwrap();
        assert_eq!(must.len(), 1);
        assert_eq!(
            must[0],
            json!({
                "match": {
                    "texto_page_doe": {
                        "query": "contrato",
                        "operator": "and",
                    }
                }
            })
        );
    }
}
