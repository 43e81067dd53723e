//! Conversions from external infrastructure errors into domain errors.

use reqwest::Error as HttpError;
use serde_json::Value;
use stockbridge_domain::BridgeError;
use thiserror::Error;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct InfraError(pub BridgeError);

impl From<InfraError> for BridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<BridgeError> for InfraError {
    fn from(value: BridgeError) -> Self {
        InfraError(value)
    }
}

trait IntoBridgeError {
    fn into_bridge(self) -> BridgeError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → BridgeError */
/* -------------------------------------------------------------------------- */

impl IntoBridgeError for HttpError {
    fn into_bridge(self) -> BridgeError {
        if self.is_timeout() {
            return BridgeError::Network("HTTP request timed out".into());
        }

        #[cfg(not(target_arch = "wasm32"))]
        if self.is_connect() {
            return BridgeError::Network("HTTP connection failure".into());
        }

        if let Some(status) = self.status() {
            return map_status_error(status.as_u16(), "");
        }

        if self.is_decode() {
            return BridgeError::Internal(format!("malformed response body: {self}"));
        }

        BridgeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_bridge())
    }
}

/* -------------------------------------------------------------------------- */
/* HTTP status → BridgeError */
/* -------------------------------------------------------------------------- */

/// Classify a non-2xx response.
///
/// The catalog's `{ message, parameters }` body, when present, becomes the
/// error message.
pub fn map_status_error(status: u16, body: &str) -> BridgeError {
    let reason = reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("unknown status");
    let message = render_catalog_message(body).unwrap_or_else(|| format!("HTTP {status} {reason}"));

    match status {
        401 | 403 => BridgeError::Auth(message),
        404 => BridgeError::NotFound(message),
        408 => BridgeError::Network(message),
        429 => BridgeError::RateLimited(message),
        400..=499 => BridgeError::Validation(message),
        500..=599 => BridgeError::ServerError(message),
        _ => BridgeError::Network(message),
    }
}

/// Render a catalog error body, substituting its parameters.
///
/// Positional parameters (`"parameters": ["A", 3]`) replace `%1`, `%2`, ...;
/// named ones (`"parameters": {"sku": "A"}`) replace `%sku`. Returns `None`
/// when the body carries no message.
pub fn render_catalog_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    let template = json.get("message")?.as_str()?.trim();
    if template.is_empty() {
        return None;
    }

    let mut rendered = template.to_string();
    match json.get("parameters") {
        Some(Value::Array(values)) => {
            // Highest index first so `%1` never eats the prefix of `%10`.
            for (index, value) in values.iter().enumerate().rev() {
                rendered = rendered.replace(&format!("%{}", index + 1), &plain(value));
            }
        }
        Some(Value::Object(named)) => {
            let mut keys: Vec<&String> = named.keys().collect();
            keys.sort_by_key(|key| std::cmp::Reverse(key.len()));
            for key in keys {
                rendered = rendered.replace(&format!("%{key}"), &plain(&named[key.as_str()]));
            }
        }
        _ => {}
    }
    Some(rendered)
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn statuses_map_onto_the_taxonomy() {
        assert!(matches!(map_status_error(401, ""), BridgeError::Auth(_)));
        assert!(matches!(map_status_error(403, ""), BridgeError::Auth(_)));
        assert!(matches!(map_status_error(404, ""), BridgeError::NotFound(_)));
        assert!(matches!(map_status_error(408, ""), BridgeError::Network(_)));
        assert!(matches!(map_status_error(429, ""), BridgeError::RateLimited(_)));
        assert!(matches!(map_status_error(422, ""), BridgeError::Validation(_)));
        assert!(matches!(map_status_error(503, ""), BridgeError::ServerError(_)));
    }

    #[test]
    fn bad_request_carries_rendered_message() {
        let body = serde_json::json!({
            "message": "Product %1 not found in source %2",
            "parameters": ["SKU-1", "warehouse_paris"]
        })
        .to_string();
        assert_eq!(
            map_status_error(400, &body),
            BridgeError::Validation("Product SKU-1 not found in source warehouse_paris".into())
        );
    }

    #[test]
    fn named_parameters_are_substituted() {
        let body =
            r#"{"message":"Invalid quantity %qty for %sku","parameters":{"sku":"A","qty":-1}}"#;
        assert_eq!(render_catalog_message(body).unwrap(), "Invalid quantity -1 for A");
    }

    #[test]
    fn positional_parameters_beyond_nine() {
        let params: Vec<String> = (1..=10).map(|i| format!("p{i}")).collect();
        let body = serde_json::json!({"message": "%10 then %1", "parameters": params}).to_string();
        assert_eq!(render_catalog_message(&body).unwrap(), "p10 then p1");
    }

    #[test]
    fn non_json_bodies_fall_back_to_status_text() {
        assert_eq!(render_catalog_message("<html>oops</html>"), None);
        assert_eq!(
            map_status_error(400, "<html>"),
            BridgeError::Validation("HTTP 400 Bad Request".into())
        );
    }

    #[tokio::test]
    async fn http_status_401_maps_to_auth_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(StatusCode::UNAUTHORIZED))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        let error = client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err();

        let mapped: BridgeError = InfraError::from(error).into();
        match mapped {
            BridgeError::Auth(msg) => assert!(msg.contains("401")),
            other => panic!("expected auth error, got {:?}", other),
        }
    }
}
