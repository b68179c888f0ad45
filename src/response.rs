//! Projection of the raw Elasticsearch response into the client-facing
//! document list.

use serde_json::Value as JsonValue;

use crate::api::DocumentHit;

/// Extracts the documents from the engine response, preserving its
/// relevance/sort ordering. A response without a `hits.hits` array yields
/// an empty list, not an error.
pub fn project(raw: &JsonValue) -> Vec<DocumentHit> {
    raw.pointer("/hits/hits")
        .and_then(JsonValue::as_array)
        .map(|hits| hits.iter().map(project_hit).collect())
        .unwrap_or_default()
}

fn project_hit(hit: &JsonValue) -> DocumentHit {
    DocumentHit {
        // The metadata object is passed through unmodified.
        metadados: hit
            .pointer("/_source/metadados")
            .cloned()
            .unwrap_or(JsonValue::Null),
        // A hit without highlights yields an empty list.
        highlight: hit
            .pointer("/highlight/texto_page_doe")
            .and_then(JsonValue::as_array)
            .map(|fragments| {
                fragments
                    .iter()
                    .filter_map(JsonValue::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn should_project_hits_in_engine_order() {
        let raw = json!({
            "took": 3,
            "hits": {
                "total": { "value": 2 },
                "hits": [
                    {
                        "_source": { "metadados": { "numDoe": 1, "postDate": "2024-01-02" } },
                        "highlight": { "texto_page_doe": ["primeiro <em>contrato</em>"] }
                    },
                    {
                        "_source": { "metadados": { "numDoe": 2 } },
                        "highlight": { "texto_page_doe": ["segundo", "trecho"] }
                    }
                ]
            }
        });

        let documentos = project(&raw);
        assert_eq!(documentos.len(), 2);
        assert_eq!(documentos[0].metadados["numDoe"], 1);
        assert_eq!(documentos[0].highlight, vec!["primeiro <em>contrato</em>"]);
        assert_eq!(documentos[1].metadados["numDoe"], 2);
        assert_eq!(documentos[1].highlight, vec!["segundo", "trecho"]);
    }

    #[test]
    fn should_default_missing_highlight_to_empty() {
        let raw = json!({
            "hits": {
                "hits": [
                    { "_source": { "metadados": { "numDoe": 7 } } }
                ]
            }
        });

        let documentos = project(&raw);
        assert_eq!(documentos.len(), 1);
        assert!(documentos[0].highlight.is_empty());
    }

    #[test]
    fn should_treat_missing_hits_as_empty() {
        assert!(project(&json!({})).is_empty());
        assert!(project(&json!({ "hits": {} })).is_empty());
        assert!(project(&json!({ "hits": { "hits": null } })).is_empty());
    }
}
