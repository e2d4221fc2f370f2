use crate::error::{ClientError, ClientResult};
use campuspool_shared::protocol::HttpMethod;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

#[cfg(test)]
use std::{cell::RefCell, collections::VecDeque};

// =========================================================
// 核心抽象层 (HTTP Interface Abstraction)
// =========================================================

/// 通用 HTTP 请求结构
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(url: &str, method: HttpMethod) -> Self {
        Self {
            url: url.to_string(),
            method,
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body.to_string());
        self
    }
}

/// 通用 HTTP 响应结构
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: DeserializeOwned>(&self) -> ClientResult<T> {
        serde_json::from_str(&self.body).map_err(ClientError::from)
    }
}

/// HTTP 客户端特性 (Trait)
///
/// 传输失败返回 `ClientError::Network`；任何拿到的响应（包括 4xx/5xx）都是 Ok。
/// (?Send) 是因为客户端运行在单线程事件循环上
#[async_trait::async_trait(?Send)]
pub trait HttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse>;
}

#[async_trait::async_trait(?Send)]
impl<T: HttpClient + ?Sized> HttpClient for Rc<T> {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        (**self).send(req).await
    }
}

// =========================================================
// 实现层: reqwest 客户端
// =========================================================

#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    pub fn new(timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait(?Send)]
impl HttpClient for ReqwestHttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        let method = match req.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Patch => reqwest::Method::PATCH,
        };

        let mut builder = self.client.request(method, &req.url);

        for (k, v) in req.headers {
            builder = builder.header(k, v);
        }

        if let Some(body) = req.body {
            builder = builder.body(body);
        }

        let resp = builder.send().await?;
        let status = resp.status().as_u16();
        let body = resp.text().await?;

        Ok(HttpResponse { status, body })
    }
}

// =========================================================
// 测试工具: MockHttpClient
// =========================================================

#[cfg(test)]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: HashMap<String, String>,
    pub body: Option<String>,
}

#[cfg(test)]
impl RecordedRequest {
    pub fn json_body(&self) -> serde_json::Value {
        self.body
            .as_deref()
            .map(|b| serde_json::from_str(b).unwrap())
            .unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
#[derive(Debug, Clone)]
enum MockReply {
    Response(u16, String),
    NetworkError,
}

/// 按 URL 预设响应的测试客户端
///
/// 同一 URL 可以预设一个响应序列，依次返回，最后一个会一直重复。
#[cfg(test)]
pub struct MockHttpClient {
    responses: RefCell<HashMap<String, VecDeque<MockReply>>>,
    delay: std::cell::Cell<Option<Duration>>,
    pub requests: RefCell<Vec<RecordedRequest>>,
}

#[cfg(test)]
impl MockHttpClient {
    pub fn new() -> Self {
        Self {
            responses: RefCell::new(HashMap::new()),
            delay: std::cell::Cell::new(None),
            requests: RefCell::new(Vec::new()),
        }
    }

    pub fn mock_response(&self, url: &str, status: u16, body: serde_json::Value) {
        self.responses.borrow_mut().insert(
            url.to_string(),
            VecDeque::from([MockReply::Response(status, body.to_string())]),
        );
    }

    /// 预设响应序列
    pub fn mock_sequence(&self, url: &str, replies: Vec<(u16, serde_json::Value)>) {
        let queue = replies
            .into_iter()
            .map(|(status, body)| MockReply::Response(status, body.to_string()))
            .collect();
        self.responses.borrow_mut().insert(url.to_string(), queue);
    }

    pub fn mock_network_error(&self, url: &str) {
        self.responses
            .borrow_mut()
            .insert(url.to_string(), VecDeque::from([MockReply::NetworkError]));
    }

    /// 每个响应前等待（配合暂停的 tokio 时钟使用）
    pub fn set_delay(&self, delay: Duration) {
        self.delay.set(Some(delay));
    }

    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }

    pub fn requests_to(&self, url: &str) -> Vec<RecordedRequest> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.url == url)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
#[async_trait::async_trait(?Send)]
impl HttpClient for MockHttpClient {
    async fn send(&self, req: HttpRequest) -> ClientResult<HttpResponse> {
        self.requests.borrow_mut().push(RecordedRequest {
            url: req.url.clone(),
            method: req.method,
            headers: req.headers.clone(),
            body: req.body.clone(),
        });

        if let Some(delay) = self.delay.get() {
            tokio::time::sleep(delay).await;
        }

        let reply = {
            let mut responses = self.responses.borrow_mut();
            match responses.get_mut(&req.url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };

        match reply {
            Some(MockReply::Response(status, body)) => Ok(HttpResponse { status, body }),
            Some(MockReply::NetworkError) => {
                Err(ClientError::Network("connection refused".to_string()))
            }
            None => Ok(HttpResponse {
                status: 404,
                body: r#"{"error":"Not Found"}"#.to_string(),
            }),
        }
    }
}
