#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oxide_d1_client::config::ConnectionConfig;
use oxide_d1_client::connection::Connection;
use oxide_d1_client::transport::{HttpRequest, HttpResponse, Transport};
use oxide_d1_client::{ClientError, Result};
use serde_json::{json, Value};

pub const DATABASE_ID: &str = "3f2a1b4c-5d6e-4f70-8192-a3b4c5d6e7f8";
pub const TOKEN: &str = "tok-5ecr3t";

/// A transport that records requests and replays canned responses.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<Result<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, body: Value) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status: 200,
            body: body.to_string(),
        }));
    }

    pub fn respond_raw(&self, status: u16, body: &str) {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            body: body.to_string(),
        }));
    }

    pub fn fail(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ClientError::transport(message)));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_body(&self) -> Value {
        let requests = self.requests();
        let body = requests
            .last()
            .and_then(|r| r.body.clone())
            .expect("no request body recorded");
        serde_json::from_str(&body).unwrap()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ClientError::transport("no canned response left")))
    }
}

pub fn dsn() -> String {
    format!("d1://acct:{TOKEN}@{DATABASE_ID}?timeout=5")
}

pub fn connection(transport: &Arc<FakeTransport>) -> Connection {
    let config = ConnectionConfig::parse(&dsn()).unwrap();
    Connection::with_config(config, transport.clone())
}

pub fn success(result: Value) -> Value {
    json!({"success": true, "errors": [], "messages": [], "result": result})
}

pub fn raw_result(columns: Value, rows: Value) -> Value {
    success(json!([{
        "meta": {"changes": 0, "last_row_id": 0, "duration": 0.1},
        "results": {"columns": columns, "rows": rows},
        "success": true
    }]))
}

pub fn token_ok() -> Value {
    success(json!({"id": "abc", "status": "active"}))
}
