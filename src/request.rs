//! Transport-neutral request and response values.
//!
//! A `RequestSpec` is what callers hand to the coordinator: method, path,
//! headers and an optional body, without any authorization header. The
//! coordinator clones it for each attempt and injects the current access
//! credential itself.

use bytes::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Method, StatusCode,
};
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Relative to the transport base URL, or absolute.
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl RequestSpec {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `body` as JSON and set the content type.
    ///
    /// # Errors
    /// Returns an error if `body` cannot be serialized.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        let payload = serde_json::to_vec(body)?;
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self.body = Some(Bytes::from(payload));
        Ok(self)
    }

    /// Copy of this request carrying exactly one `name` header, or none.
    pub(crate) fn authorized(&self, name: &HeaderName, value: Option<HeaderValue>) -> Self {
        let mut request = self.clone();
        request.headers.remove(name);
        if let Some(value) = value {
            request.headers.insert(name.clone(), value);
        }
        request
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Response {
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// # Errors
    /// Returns an error if the body is not valid JSON for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::AUTHORIZATION;
    use serde_json::json;

    #[test]
    fn authorized_replaces_caller_supplied_header() {
        let request = RequestSpec::get("/v1/users/me")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer forged"))
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer forged-2"));

        let authorized =
            request.authorized(&AUTHORIZATION, Some(HeaderValue::from_static("Bearer t1")));
        let values: Vec<_> = authorized.headers.get_all(AUTHORIZATION).iter().collect();
        assert_eq!(values, vec![HeaderValue::from_static("Bearer t1")]);

        let anonymous = request.authorized(&AUTHORIZATION, None);
        assert!(anonymous.headers.get(AUTHORIZATION).is_none());
    }

    #[test]
    fn json_sets_body_and_content_type() {
        let request = RequestSpec::post("/v1/subscriptions/create-payment")
            .json(&json!({ "amount": 10 }))
            .unwrap();

        assert_eq!(
            request.headers.get(CONTENT_TYPE),
            Some(&HeaderValue::from_static("application/json"))
        );
        assert_eq!(request.body.as_deref(), Some(&b"{\"amount\":10}"[..]));
    }

    #[test]
    fn response_decodes_json() {
        let response = Response::new(StatusCode::OK).with_body(r#"{"userName":"ann"}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["userName"], "ann");
        assert!(response.is_success());
    }
}
