#[cfg(test)]
mod tests {
    use filechunk_common::{
        AuthMethod, Bytes, CommonRequestError, Endpoint, RequestBuilder, RequestConfig,
        StatusCode,
    };
    use wiremock::matchers::{body_bytes, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_config() -> RequestConfig {
        RequestConfig::new()
            .with_auth(AuthMethod::Header {
                header_name: "X-File-Token".to_string(),
                token: "tok-123".to_string(),
            })
            .with_header("Accept", "application/json")
            .with_user_agent("filechunk-test/1.0")
    }

    #[test]
    fn test_endpoint_creation() {
        let endpoint = Endpoint::new("https://example.com/upload");
        assert_eq!(endpoint.url, "https://example.com/upload");
        assert!(endpoint.extra_headers.is_none());

        let endpoint = endpoint
            .with_header("X-File-Field", "none")
            .with_header("Content-Type", "application/octet-stream");
        let headers = endpoint.extra_headers.unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(headers["X-File-Field"], "none");
    }

    #[test]
    fn test_request_config_builder() {
        let config = token_config();
        assert!(matches!(
            config.auth,
            Some(AuthMethod::Header { ref header_name, ref token })
                if header_name == "X-File-Token" && token == "tok-123"
        ));
        assert_eq!(config.default_headers.len(), 1);
        assert_eq!(config.user_agent.as_deref(), Some("filechunk-test/1.0"));
    }

    #[test]
    fn test_build_request_sets_headers() {
        let builder = RequestBuilder::new(reqwest::Client::new(), token_config());
        let endpoint = Endpoint::new("https://example.com/upload").with_header("X-File-Field", "docs");

        let request = builder
            .build_request(&endpoint)
            .expect("request should build")
            .build()
            .expect("request should be valid");

        assert_eq!(request.method(), reqwest::Method::POST);
        let headers = request.headers();
        assert_eq!(headers["x-file-token"], "tok-123");
        assert_eq!(headers["accept"], "application/json");
        assert_eq!(headers["x-file-field"], "docs");
        assert_eq!(headers["user-agent"], "filechunk-test/1.0");
    }

    #[test]
    fn test_token_header_is_the_only_auth() {
        let builder = RequestBuilder::new(reqwest::Client::new(), token_config());
        let request = builder
            .build_request(&Endpoint::new("https://example.com/upload"))
            .unwrap()
            .build()
            .unwrap();

        let headers = request.headers();
        assert_eq!(headers["x-file-token"], "tok-123");
        assert!(!headers.contains_key("authorization"));
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let config = RequestConfig::new().with_auth(AuthMethod::Header {
            header_name: "X-File-Token".to_string(),
            token: "line\nbreak".to_string(),
        });
        let builder = RequestBuilder::new(reqwest::Client::new(), config);
        let result = builder.build_request(&Endpoint::new("https://example.com/upload"));

        match result {
            Err(CommonRequestError::InvalidHeader { name, .. }) => assert_eq!(name, "X-File-Token"),
            other => panic!("Expected InvalidHeader, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_header_name_is_rejected() {
        let builder = RequestBuilder::new(reqwest::Client::new(), RequestConfig::new());
        let endpoint = Endpoint::new("https://example.com/upload").with_header("bad header", "x");
        assert!(matches!(
            builder.build_request(&endpoint),
            Err(CommonRequestError::InvalidHeader { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_bytes_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload"))
            .and(header("x-file-token", "tok-123"))
            .and(header_exists("x-file-field"))
            .and(body_bytes(b"chunk-data".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"offset": 10}"#))
            .expect(1)
            .mount(&server)
            .await;

        let builder = RequestBuilder::new(reqwest::Client::new(), token_config());
        let endpoint = Endpoint::new(format!("{}/upload", server.uri())).with_header("X-File-Field", "none");

        let response = builder
            .send_bytes(&endpoint, Bytes::from_static(b"chunk-data"))
            .await
            .expect("request should succeed");

        assert!(response.is_success());
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(&response.body[..], br#"{"offset": 10}"#);
    }

    #[tokio::test]
    async fn test_send_empty_keeps_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/remove"))
            .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
            .mount(&server)
            .await;

        let builder = RequestBuilder::new(reqwest::Client::new(), token_config());
        let response = builder
            .send_empty(&Endpoint::new(format!("{}/remove", server.uri())))
            .await
            .expect("a non-success status is still a response");

        assert!(!response.is_success());
        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert_eq!(&response.body[..], b"denied");
    }

    #[tokio::test]
    async fn test_connection_failure_is_http_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let builder = RequestBuilder::new(reqwest::Client::new(), RequestConfig::new());
        let result = builder
            .send_empty(&Endpoint::new(format!("http://127.0.0.1:{port}/upload")))
            .await;
        assert!(matches!(result, Err(CommonRequestError::Http(_))));
    }
}
