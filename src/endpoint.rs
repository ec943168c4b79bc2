//! Service endpoints, one per operation.

use crocodoc_http::{Method, Request};

/// A remote operation and the path it lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Upload,
    Status,
    CreateSession,
    Delete,
    Download,
    Thumbnail,
    Text,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Upload => "/document/upload",
            Endpoint::Status => "/document/status",
            Endpoint::CreateSession => "/session/create",
            Endpoint::Delete => "/document/delete",
            Endpoint::Download => "/download/document",
            Endpoint::Thumbnail => "/download/thumbnail",
            Endpoint::Text => "/download/text",
        }
    }

    pub fn method(self) -> Method {
        match self {
            Endpoint::Upload | Endpoint::CreateSession | Endpoint::Delete => Method::Post,
            Endpoint::Status | Endpoint::Download | Endpoint::Thumbnail | Endpoint::Text => {
                Method::Get
            }
        }
    }

    /// Operation name used in error messages and logs.
    pub fn operation(self) -> &'static str {
        match self {
            Endpoint::Upload => "Upload",
            Endpoint::Status => "GetStatuses",
            Endpoint::CreateSession => "CreateSession",
            Endpoint::Delete => "Delete",
            Endpoint::Download => "Download",
            Endpoint::Thumbnail => "Thumbnail",
            Endpoint::Text => "GetText",
        }
    }

    pub fn url(self, base_url: &str) -> String {
        format!("{}{}", base_url, self.path())
    }

    /// Start a request carrying the token, in the query for GET and in the
    /// form body for POST.
    pub fn request(self, base_url: &str, token: &str) -> Request {
        let request = Request::new(self.method(), self.url(base_url));
        match self.method() {
            Method::Get => request.query("token", token),
            Method::Post => request.form("token", token),
        }
    }
}

/// Add a parameter on the side of the request that matches its method.
pub(crate) fn with_param(request: Request, key: &str, value: impl Into<String>) -> Request {
    match request.method {
        Method::Get => request.query(key, value),
        Method::Post => request.form(key, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_goes_where_the_method_expects() {
        let get = Endpoint::Status.request("https://h/api/v2", "t");
        assert_eq!(get.url, "https://h/api/v2/document/status");
        assert_eq!(get.query, vec![("token".to_string(), "t".to_string())]);
        assert!(get.form.is_empty());

        let post = with_param(Endpoint::Delete.request("https://h/api/v2", "t"), "uuid", "u");
        assert_eq!(post.method, Method::Post);
        assert!(post.query.is_empty());
        assert_eq!(post.param("uuid"), Some("u"));
    }
}
