use async_trait::async_trait;
use rev_core::{cell_text, Error, Record, Result};
use serde_json::{json, Value};

/// Error code BillingPlatform reports for a record that was applied
pub const SUCCESS_CODE: &str = "0";

/// Calls a BillingPlatform session can make
#[async_trait]
pub trait BillingPlatformClient: Send + Sync {
    /// Run a query and return the `queryResponse` rows
    async fn query(&self, sql: &str) -> Result<Vec<Record>>;

    /// Send one `brmObjects` batch and return the `<op>Response` entries, in order
    async fn submit(&self, request: &BrmRequest) -> Result<Vec<Value>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrmOperation {
    Create,
    Update,
    Upsert { external_id_field: String },
    Delete,
}

impl BrmOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrmOperation::Create => "create",
            BrmOperation::Update => "update",
            BrmOperation::Upsert { .. } => "upsert",
            BrmOperation::Delete => "delete",
        }
    }

    /// Key of the response array, e.g. `createResponse`
    pub fn response_key(&self) -> String {
        format!("{}Response", self.as_str())
    }
}

/// One batch of entity records
#[derive(Debug, Clone)]
pub struct BrmRequest {
    pub entity: String,
    pub operation: BrmOperation,
    pub records: Vec<Record>,
}

impl BrmRequest {
    /// `{brmObjects: [...]}` body. Null cells are left out; deletes carry only `Id`.
    pub fn body(&self) -> Result<Value> {
        let objects: Vec<Value> = match self.operation {
            BrmOperation::Delete => self
                .ids()?
                .into_iter()
                .map(|id| json!({ "Id": id }))
                .collect(),
            _ => self
                .records
                .iter()
                .map(|record| {
                    Value::Object(
                        record
                            .iter()
                            .filter(|(_, v)| !v.is_null())
                            .map(|(k, v)| (k.clone(), v.clone()))
                            .collect(),
                    )
                })
                .collect(),
        };

        let mut body = json!({ "brmObjects": objects });
        if let BrmOperation::Upsert { external_id_field } = &self.operation {
            body["externalIDFieldName"] = json!(external_id_field);
        }
        Ok(body)
    }

    pub fn ids(&self) -> Result<Vec<String>> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, record)| match record.get("Id") {
                Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
                Some(Value::Number(n)) => Ok(n.to_string()),
                _ => Err(Error::Validation(format!(
                    "record {} has no Id to delete",
                    i
                ))),
            })
            .collect()
    }
}

/// `ErrorCode` of zero, sent either as text or as a number
pub fn is_success_code(code: &Value) -> bool {
    match code {
        Value::String(s) => s.trim() == SUCCESS_CODE,
        Value::Number(n) => n.as_i64() == Some(0),
        _ => false,
    }
}

/// Session id of a login response.
///
/// Reads `loginResponse[0].SessionID` from the body and rejects a non-zero
/// `ErrorCode`. The `sessionid` response header is used only when the body
/// carries no session id.
pub fn login_session(body: &Value, header: Option<&str>) -> Result<String> {
    let context = "BillingPlatform login failed";
    let entry = body.get("loginResponse").and_then(|entries| entries.get(0));

    if let Some(entry) = entry {
        if let Some(code) = entry.get("ErrorCode").filter(|code| !is_success_code(code)) {
            let text = entry
                .get("ErrorText")
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or("");
            return Err(Error::execution(
                context,
                format!("ErrorCode {}: {}", cell_text(code), text),
            ));
        }
        if let Some(id) = entry
            .get("SessionID")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
        {
            return Ok(id.to_string());
        }
    }

    header
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::execution(context, "response carried no SessionID"))
}

/// Pull the response entries out of a write response and mark each with
/// `success`.
pub fn response_entries(response: Value, operation: &BrmOperation) -> Result<Vec<Value>> {
    let key = operation.response_key();
    let entries = match response {
        Value::Object(mut map) => map.remove(&key),
        _ => None,
    };

    let Some(Value::Array(entries)) = entries else {
        return Err(Error::execution(
            format!("BillingPlatform {} failed", operation.as_str()),
            format!("response has no '{}' array", key),
        ));
    };

    Ok(entries
        .into_iter()
        .map(|entry| match entry {
            Value::Object(mut fields) => {
                let success = fields.get("ErrorCode").is_some_and(is_success_code);
                fields.insert("success".to_string(), Value::Bool(success));
                Value::Object(fields)
            }
            other => other,
        })
        .collect())
}

/// Rows of a `queryResponse`. A missing key means no rows.
pub fn query_rows(response: Value) -> Vec<Record> {
    match response.get("queryResponse") {
        Some(Value::Array(rows)) => rows
            .iter()
            .filter_map(|row| row.as_object().cloned())
            .collect(),
        _ => Vec::new(),
    }
}
