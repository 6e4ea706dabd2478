//! Alert headers attached to write responses.
//!
//! Clients show a translated notification for every successful write and for rejected requests.
//! The message key travels in `X-cwcrmApp-alert` (or `X-cwcrmApp-error`), its parameter in
//! `X-cwcrmApp-params`.

use crate::types::{APPLICATION_NAME, EntityId, Operation};
use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub const ALERT_HEADER: &str = "x-cwcrmapp-alert";
pub const ERROR_HEADER: &str = "x-cwcrmapp-error";
pub const PARAMS_HEADER: &str = "x-cwcrmapp-params";

fn insert(headers: &mut HeaderMap, name: &'static str, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            headers.insert(HeaderName::from_static(name), value);
        }
        Err(_) => tracing::warn!("Skipping {} header with invalid value {:?}", name, value),
    }
}

/// `cwcrmApp.waiver.created` + the entity id
pub fn entity_alert(operation: Operation, entity_key: &str, id: EntityId) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(
        &mut headers,
        ALERT_HEADER,
        &format!("{APPLICATION_NAME}.{entity_key}.{}", operation.past_tense()),
    );
    insert(&mut headers, PARAMS_HEADER, &id.to_string());
    headers
}

/// `error.idexists` + the entity key
pub fn failure_alert(entity_key: &str, error_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    insert(&mut headers, ERROR_HEADER, &format!("error.{error_key}"));
    insert(&mut headers, PARAMS_HEADER, entity_key);
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_alert() {
        let headers = entity_alert(Operation::Update, "priority", 1001);
        assert_eq!(headers[ALERT_HEADER], "cwcrmApp.priority.updated");
        assert_eq!(headers[PARAMS_HEADER], "1001");
        assert!(headers.get(ERROR_HEADER).is_none());
    }

    #[test]
    fn test_failure_alert() {
        let headers = failure_alert("waiver", "idnull");
        assert_eq!(headers[ERROR_HEADER], "error.idnull");
        assert_eq!(headers[PARAMS_HEADER], "waiver");
        assert!(headers.get(ALERT_HEADER).is_none());
    }

    #[test]
    fn test_invalid_values_are_skipped() {
        let headers = failure_alert("bad\nkey", "idnull");
        assert!(headers.get(PARAMS_HEADER).is_none());
        assert_eq!(headers[ERROR_HEADER], "error.idnull");
    }
}
