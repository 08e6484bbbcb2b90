use async_trait::async_trait;
use rev_chuck_connector::{ChuckClient, ChuckConnector};
use rev_core::{Connector, Error, QueryMethod, Result};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

/// Canned joke API that records requested paths and parameters
#[derive(Default)]
struct FakeJokes {
    requests: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ChuckClient for FakeJokes {
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> Result<Value> {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        self.requests
            .lock()
            .unwrap()
            .push(format!("{}?{}", path, query.join("&")));

        Ok(match path {
            "categories" => json!(["animal", "dev", "food"]),
            "random" => json!({
                "id": "j1",
                "value": "Chuck Norris can divide by zero.",
                "categories": params.first().map(|(_, c)| vec![c.to_string()]).unwrap_or_default()
            }),
            "search" if params[0].1 == "nothing" => json!({"total": 0, "result": []}),
            "search" => json!({
                "total": 2,
                "result": [
                    {"id": "j2", "value": "Chuck Norris writes code that optimizes itself."},
                    {"id": "j3", "value": "Chuck Norris compiles on the first try."}
                ]
            }),
            _ => Value::Null,
        })
    }
}

fn connector() -> (ChuckConnector, Arc<Mutex<Vec<String>>>) {
    let fake = FakeJokes::default();
    let requests = fake.requests.clone();
    (ChuckConnector::new().with_client(Box::new(fake)), requests)
}

#[tokio::test]
async fn test_categories() {
    let (connector, requests) = connector();
    let table = connector.read("categories", QueryMethod::Rest).await.unwrap();

    assert_eq!(table.columns(), &["category"]);
    assert_eq!(table.len(), 3);
    assert_eq!(table.get(1, "category"), Some(json!("dev")));
    assert_eq!(*requests.lock().unwrap(), vec!["categories?"]);
}

#[tokio::test]
async fn test_random_by_category() {
    let (connector, requests) = connector();
    let table = connector.read("random:dev", QueryMethod::Rest).await.unwrap();

    assert_eq!(table.len(), 1);
    // nested values are kept as JSON text
    assert_eq!(table.get(0, "categories"), Some(json!("[\"dev\"]")));
    assert_eq!(*requests.lock().unwrap(), vec!["random?category=dev"]);

    let table = connector.random().await.unwrap();
    assert_eq!(table.get(0, "id"), Some(json!("j1")));
}

#[tokio::test]
async fn test_search() {
    let (connector, _) = connector();

    let table = connector.read("search:code", QueryMethod::Rest).await.unwrap();
    assert_eq!(table.len(), 2);
    assert_eq!(table.columns(), &["id", "value"]);

    let table = connector.search("nothing").await.unwrap();
    assert!(table.is_empty());
}

#[tokio::test]
async fn test_bad_query_sends_nothing() {
    let (connector, requests) = connector();

    let result = connector.read("jokes", QueryMethod::Rest).await;
    assert!(matches!(result, Err(Error::Validation(_))));
    let result = connector.read("random", QueryMethod::Bulk).await;
    assert!(matches!(result, Err(Error::Unsupported(_))));
    assert!(requests.lock().unwrap().is_empty());
}
