//! Record encoding shared by the store adapters.

use payment_types::StoreError;

pub(crate) fn encode(credit: i64) -> String {
    credit.to_string()
}

pub(crate) fn decode(key: &str, raw: &[u8]) -> Result<i64, StoreError> {
    let text = std::str::from_utf8(raw).map_err(|e| StoreError::Decode {
        key: key.to_string(),
        reason: e.to_string(),
    })?;
    text.trim().parse::<i64>().map_err(|e| StoreError::Decode {
        key: key.to_string(),
        reason: format!("expected an integer credit, got {text:?}: {e}"),
    })
}
