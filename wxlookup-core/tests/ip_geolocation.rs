//! Integration tests for the IP lookup position source using wiremock.

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxlookup_core::geolocation::IpPositionSource;
use wxlookup_core::{GeolocationErrorKind, GeolocationOptions, Geolocator, Position};

fn options() -> GeolocationOptions {
    GeolocationOptions {
        timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

fn geolocator(server: &MockServer, options: GeolocationOptions) -> Geolocator {
    let source = IpPositionSource::new(format!("{}/json", server.uri()));
    Geolocator::new(Arc::new(source), options)
}

async fn mount(server: &MockServer, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(response)
        .mount(server)
        .await;
}

async fn error_kind(response: ResponseTemplate) -> GeolocationErrorKind {
    let mock_server = MockServer::start().await;
    mount(&mock_server, response).await;

    geolocator(&mock_server, options())
        .locate()
        .await
        .unwrap_err()
        .kind
}

#[tokio::test]
async fn test_loc_field_becomes_position() {
    let mock_server = MockServer::start().await;
    mount(
        &mock_server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "ip": "203.0.113.7",
            "city": "Paris",
            "loc": "48.8534,2.3488"
        })),
    )
    .await;

    let position = geolocator(&mock_server, options()).locate().await.unwrap();
    assert_eq!(position, Some(Position::new(48.8534, 2.3488)));
}

#[tokio::test]
async fn test_unauthorized_and_forbidden_are_permission_denied() {
    assert_eq!(
        error_kind(ResponseTemplate::new(401)).await,
        GeolocationErrorKind::PermissionDenied
    );
    assert_eq!(
        error_kind(ResponseTemplate::new(403)).await,
        GeolocationErrorKind::PermissionDenied
    );
}

#[tokio::test]
async fn test_server_error_is_position_unavailable() {
    assert_eq!(
        error_kind(ResponseTemplate::new(500)).await,
        GeolocationErrorKind::PositionUnavailable
    );
}

#[tokio::test]
async fn test_missing_loc_is_position_unavailable() {
    let response = ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "ip": "203.0.113.7",
        "bogon": true
    }));
    assert_eq!(
        error_kind(response).await,
        GeolocationErrorKind::PositionUnavailable
    );
}

#[tokio::test]
async fn test_unreadable_loc_is_position_unavailable() {
    let response = ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "loc": "somewhere"
    }));
    assert_eq!(
        error_kind(response).await,
        GeolocationErrorKind::PositionUnavailable
    );
}

#[tokio::test]
async fn test_malformed_body_is_unknown() {
    let response = ResponseTemplate::new(200).set_body_string("<html>rate limited</html>");
    assert_eq!(error_kind(response).await, GeolocationErrorKind::Unknown);
}

#[tokio::test]
async fn test_recent_fix_is_reused_within_maximum_age() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "loc": "35.6895,139.6917"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let geo = geolocator(
        &mock_server,
        GeolocationOptions {
            maximum_age: Duration::from_secs(60),
            ..options()
        },
    );

    let first = geo.locate().await.unwrap();
    let second = geo.locate().await.unwrap();
    assert_eq!(first, Some(Position::new(35.6895, 139.6917)));
    assert_eq!(second, first);
}

#[tokio::test]
async fn test_zero_maximum_age_asks_again() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "loc": "35.6895,139.6917"
        })))
        .expect(2)
        .mount(&mock_server)
        .await;

    let geo = geolocator(&mock_server, options());
    geo.locate().await.unwrap();
    geo.locate().await.unwrap();
}
