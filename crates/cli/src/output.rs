#![forbid(unsafe_code)]

use cm_service::ServiceError;
use cm_storage::StoreError;
use serde_json::{Value, json};

pub(crate) fn ok(command: &str, result: Value) -> Value {
    json!({
        "ok": true,
        "command": command,
        "result": result,
        "error": null
    })
}

pub(crate) fn error(err: &anyhow::Error) -> Value {
    let message = format!("{err:#}");
    json!({
        "ok": false,
        "result": {},
        "error": {
            "code": error_code(err),
            "message": message.trim(),
        }
    })
}

/// Code of the outermost typed error in the chain, `INTERNAL` otherwise.
pub(crate) fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if let Some(service) = cause.downcast_ref::<ServiceError>() {
            return service.code();
        }
        if let Some(store) = cause.downcast_ref::<StoreError>() {
            return store.code();
        }
    }
    "INTERNAL"
}
