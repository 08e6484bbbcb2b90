use rev_core::{cell_text, Record};
use serde_json::Value;

/// Encode a record as Stripe form fields.
///
/// Nested objects become `key[sub]`, arrays `key[0]`, and dotted column
/// names (as produced by flattened reads) are split the same way. Null
/// cells and the fields named in `skip` are left out.
pub fn form_fields(record: &Record, skip: &[&str]) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    for (key, value) in record {
        if skip.contains(&key.as_str()) {
            continue;
        }
        let mut parts = key.split('.');
        let mut name = parts.next().unwrap_or_default().to_string();
        for part in parts {
            name = format!("{}[{}]", name, part);
        }
        push_value(&mut fields, name, value);
    }
    fields
}

fn push_value(fields: &mut Vec<(String, String)>, name: String, value: &Value) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, inner) in map {
                push_value(fields, format!("{}[{}]", name, key), inner);
            }
        }
        Value::Array(items) => {
            for (i, inner) in items.iter().enumerate() {
                push_value(fields, format!("{}[{}]", name, i), inner);
            }
        }
        scalar => fields.push((name, cell_text(scalar))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_nested_fields() {
        let fields = form_fields(
            &record(json!({
                "name": "Ada",
                "metadata": {"tier": "gold"},
                "expand": ["invoice", "customer"],
                "livemode": false,
                "balance": 250,
                "phone": null
            })),
            &[],
        );

        assert_eq!(
            fields,
            vec![
                ("name".to_string(), "Ada".to_string()),
                ("metadata[tier]".to_string(), "gold".to_string()),
                ("expand[0]".to_string(), "invoice".to_string()),
                ("expand[1]".to_string(), "customer".to_string()),
                ("livemode".to_string(), "false".to_string()),
                ("balance".to_string(), "250".to_string()),
            ]
        );
    }

    #[test]
    fn test_dotted_columns_and_skip() {
        let fields = form_fields(
            &record(json!({"id": "cus_1", "address.city": "Paris", "metadata.a.b": "x"})),
            &["id"],
        );
        assert_eq!(
            fields,
            vec![
                ("address[city]".to_string(), "Paris".to_string()),
                ("metadata[a][b]".to_string(), "x".to_string()),
            ]
        );
    }
}
