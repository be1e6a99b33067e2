//! Shared constructors for route-level tests.

use axum_test::TestServer;
use url::Url;
use wiremock::matchers::{method, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::config::Config;
use crate::{AppState, build_router};

/// Config wired to mock render and host services.
pub fn test_config(renderer_uri: &str, host_uri: &str) -> Config {
    let mut config = Config::default();
    config.public_base_url = Url::parse("http://addon.test:3000").unwrap();
    config.renderer.url = Url::parse(renderer_uri).unwrap();
    config.renderer.timeout = std::time::Duration::from_secs(5);
    config.host_api.base_url = Url::parse(host_uri).unwrap();
    config.host_api.timeout = std::time::Duration::from_secs(5);
    config
}

/// In-process test server over the full router.
pub fn create_test_app(config: Config) -> TestServer {
    let state = AppState::from_config(&config).expect("test app state");
    TestServer::new(build_router(state)).expect("Failed to create test server")
}

/// Mount a well-behaved render service: envelope POST plus image GET.
pub async fn mount_render_service(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"img": "?png=msc1234", "errors": []}"#))
        .mount(mock_server)
        .await;
    Mock::given(method("GET"))
        .and(query_param("png", "msc1234"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(b"\x89PNG-bytes".to_vec())
                .insert_header("content-type", "image/png"),
        )
        .mount(mock_server)
        .await;
}
