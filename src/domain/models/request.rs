use reqwest::Method;
use serde_json::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Regular authenticated call, renewed and retried once on 401.
    Standard,
    /// Login, signup, and logout. A 401 here is an answer, not an expired
    /// credential, so it is never renewed.
    Auth,
}

/// A request description the pipeline can send more than once. Retries
/// re-issue an identical copy with the rotated credential.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub kind: RequestKind,
    /// Long lived response bodies are not subject to the request timeout.
    pub streaming: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> ApiRequest {
        return ApiRequest {
            method,
            path: path.to_string(),
            body: None,
            kind: RequestKind::Standard,
            streaming: false,
        };
    }

    pub fn get(path: &str) -> ApiRequest {
        return ApiRequest::new(Method::GET, path);
    }

    pub fn post(path: &str, body: Value) -> ApiRequest {
        return ApiRequest::new(Method::POST, path).with_body(body);
    }

    pub fn patch(path: &str, body: Value) -> ApiRequest {
        return ApiRequest::new(Method::PATCH, path).with_body(body);
    }

    pub fn delete(path: &str) -> ApiRequest {
        return ApiRequest::new(Method::DELETE, path);
    }

    pub fn with_body(mut self, body: Value) -> ApiRequest {
        self.body = Some(body);
        return self;
    }

    pub fn auth(mut self) -> ApiRequest {
        self.kind = RequestKind::Auth;
        return self;
    }

    pub fn streaming(mut self) -> ApiRequest {
        self.streaming = true;
        return self;
    }

    pub fn is_auth(&self) -> bool {
        return self.kind == RequestKind::Auth;
    }
}
