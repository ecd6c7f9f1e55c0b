use reqwest::Method;
use serde_json::Value;

/// One Taiga REST call, independent of credentials
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
    pub operation: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self { method, path: path.into(), body: None, operation: None }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PATCH, path).with_body(body)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Name used for retry bookkeeping, e.g. `create_task`
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Explicit operation name, or `METHOD path` when none was given
    pub fn operation_name(&self) -> String {
        match &self.operation {
            Some(operation) => operation.clone(),
            None => format!("{} {}", self.method, self.path),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_operation_name_falls_back_to_method_and_path() {
        let request = ApiRequest::get("/api/v1/projects");
        assert_eq!(request.operation_name(), "GET /api/v1/projects");

        let request = ApiRequest::patch("/api/v1/tasks/7", json!({"status": 3}))
            .with_operation("update_task");
        assert_eq!(request.operation_name(), "update_task");
        assert_eq!(request.method, Method::PATCH);
        assert_eq!(request.body, Some(json!({"status": 3})));
    }
}
