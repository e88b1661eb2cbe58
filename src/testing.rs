use http::{Request, Response, StatusCode};
use kube::client::Body;
use kube::Client;
use serde_json::{json, Value};

type ApiServerHandle = tower_test::mock::Handle<Request<Body>, Response<Body>>;

/// Plays the API server for a mocked client, one request at a time
pub struct ApiServerVerifier(ApiServerHandle);

pub fn mock_client() -> (Client, ApiServerVerifier) {
    let (mock_service, handle) = tower_test::mock::pair::<Request<Body>, Response<Body>>();
    (
        Client::new(mock_service, "default"),
        ApiServerVerifier(handle),
    )
}

impl ApiServerVerifier {
    /// Expect the next request to be `method path`, answer it and return the request body
    pub async fn respond(
        &mut self,
        method: &str,
        path: &str,
        status: StatusCode,
        body: Value,
    ) -> Value {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method().as_str(), method, "method of {path}");
        assert_eq!(request.uri().path(), path);

        let bytes = request
            .into_body()
            .collect_bytes()
            .await
            .expect("request body");
        let received = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("request body is json")
        };

        send.send_response(
            Response::builder()
                .status(status)
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        );
        received
    }

    /// Expect the next request to be `method path` and answer it with its own body
    pub async fn echo(&mut self, method: &str, path: &str) -> Value {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method().as_str(), method, "method of {path}");
        assert_eq!(request.uri().path(), path);

        let bytes = request
            .into_body()
            .collect_bytes()
            .await
            .expect("request body");
        let received: Value = serde_json::from_slice(&bytes).expect("request body is json");
        send.send_response(
            Response::builder()
                .body(Body::from(bytes.to_vec()))
                .unwrap(),
        );
        received
    }

    /// Expect the next request to be a list, answer it with `items`, and return its query string
    pub async fn respond_list(&mut self, path: &str, kind: &str, items: Vec<Value>) -> String {
        let (request, send) = self.0.next_request().await.expect("service not called");
        assert_eq!(request.method().as_str(), "GET");
        assert_eq!(request.uri().path(), path);
        let query = request.uri().query().unwrap_or_default().to_string();

        let api_version = items
            .first()
            .and_then(|i| i.get("apiVersion"))
            .cloned()
            .unwrap_or_else(|| json!("v1"));
        let list = json!({
            "apiVersion": api_version,
            "kind": format!("{kind}List"),
            "metadata": {},
            "items": items,
        });
        send.send_response(
            Response::builder()
                .body(Body::from(serde_json::to_vec(&list).unwrap()))
                .unwrap(),
        );
        query
    }
}

fn status(reason: &str, code: u16, message: String) -> Value {
    json!({
        "kind": "Status",
        "apiVersion": "v1",
        "metadata": {},
        "status": "Failure",
        "message": message,
        "reason": reason,
        "code": code,
    })
}

pub fn not_found(name: &str) -> Value {
    status("NotFound", 404, format!("\"{name}\" not found"))
}

pub fn conflict(name: &str) -> Value {
    status(
        "Conflict",
        409,
        format!("Operation cannot be fulfilled on \"{name}\": the object has been modified"),
    )
}
