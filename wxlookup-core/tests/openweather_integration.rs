//! Integration tests for the OpenWeather provider using wiremock.

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use wxlookup_core::provider::openweather::OpenWeatherProvider;
use wxlookup_core::{FetchError, FetchErrorKind, Units, fetch, group_by_day};

/// 2024-06-10 12:00 UTC.
const START: i64 = 1718020800;

fn current_json(name: &str) -> serde_json::Value {
    serde_json::json!({
        "weather": [{"id": 800, "main": "Clear", "description": "clear sky", "icon": "01d"}],
        "main": {
            "temp": 18.4, "feels_like": 17.9, "temp_min": 16.0, "temp_max": 20.1,
            "pressure": 1018, "humidity": 55
        },
        "wind": {"speed": 3.6, "deg": 225},
        "dt": START,
        "sys": {"country": "FR", "sunrise": 1717991000, "sunset": 1718048000},
        "name": name,
        "cod": 200
    })
}

fn forecast_json(name: &str, start: i64, points: i64) -> serde_json::Value {
    let list: Vec<_> = (0..points)
        .map(|i| {
            serde_json::json!({
                "dt": start + i * 3 * 3600,
                "main": {
                    "temp": 10.0 + i as f64, "feels_like": 9.0, "pressure": 1015, "humidity": 60
                },
                "weather": [{"main": "Clouds", "description": "few clouds", "icon": "02d"}],
                "wind": {"speed": 2.0, "deg": 90},
                "dt_txt": ""
            })
        })
        .collect();

    serde_json::json!({
        "cod": "200",
        "cnt": points,
        "list": list,
        "city": {"name": name, "country": "FR"}
    })
}

async fn mount_ok(server: &MockServer, name: &str) {
    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json(name)))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json(name, START, 16)))
        .mount(server)
        .await;
}

fn provider(server: &MockServer) -> OpenWeatherProvider {
    OpenWeatherProvider::new("test-key".to_string()).with_base_url(server.uri())
}

#[tokio::test]
async fn test_place_name_query_sends_q_key_and_units() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("q", "Paris"))
        .and(query_param("appid", "test-key"))
        .and(query_param("units", "metric"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Paris")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("q", "Paris"))
        .and(query_param("appid", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json("Paris", START, 16)))
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = fetch(&provider(&mock_server), "  Paris ").await.unwrap();

    assert_eq!(report.current.location_name, "Paris");
    assert_eq!(report.current.country, "FR");
    assert_eq!(report.current.wind.compass(), "SW");
    assert_eq!(report.forecast.entries.len(), 16);
    assert_eq!(report.forecast.entries[1].temperature, 11.0);
}

#[tokio::test]
async fn test_coordinate_query_sends_lat_lon() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("lat", "48.85"))
        .and(query_param("lon", "-2.35"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Somewhere")))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("lat", "48.85"))
        .and(query_param("lon", "-2.35"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(forecast_json("Somewhere", START, 8)),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let report = fetch(&provider(&mock_server), "48.85,-2.35").await.unwrap();
    assert_eq!(report.current.location_name, "Somewhere");
}

#[tokio::test]
async fn test_imperial_units_are_requested() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Austin")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .and(query_param("units", "imperial"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json("Austin", START, 1)))
        .mount(&mock_server)
        .await;

    let provider = provider(&mock_server).with_units(Units::Imperial);
    let report = fetch(&provider, "Austin").await.unwrap();
    assert_eq!(report.current.units, Units::Imperial);
    assert_eq!(report.forecast.units, Units::Imperial);
}

#[tokio::test]
async fn test_unknown_city_surfaces_provider_message() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "cod": "404",
            "message": "city not found"
        })))
        .mount(&mock_server)
        .await;

    let err = fetch(&provider(&mock_server), "Atlantis").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::Api);
    assert_eq!(err.to_string(), "city not found");
}

#[tokio::test]
async fn test_error_without_message_uses_endpoint_fallback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_json(current_json("Lyon")))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&mock_server)
        .await;

    let err = fetch(&provider(&mock_server), "Lyon").await.unwrap_err();
    match err {
        FetchError::Api { message } => assert_eq!(message, "Failed to fetch forecast data"),
        other => panic!("expected api error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_invalid_api_key_is_api_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "cod": 401,
            "message": "Invalid API key. Please see \
                        https://openweathermap.org/faq#error401 for more info."
        })))
        .mount(&mock_server)
        .await;

    let err = fetch(&provider(&mock_server), "Rome").await.unwrap_err();
    assert!(err.to_string().starts_with("Invalid API key"));
}

#[tokio::test]
async fn test_malformed_success_body_is_decode_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/weather"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/forecast"))
        .respond_with(ResponseTemplate::new(200).set_body_json(forecast_json("Nice", START, 1)))
        .mount(&mock_server)
        .await;

    let err = fetch(&provider(&mock_server), "Nice").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::Decode);
}

#[tokio::test]
async fn test_unreachable_provider_is_network_error() {
    // Nothing listens on port 1.
    let provider = OpenWeatherProvider::new("k".to_string()).with_base_url("http://127.0.0.1:1");

    let err = fetch(&provider, "Berlin").await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::Network);
    assert_eq!(err.to_string(), "Network error");
}

#[tokio::test]
async fn test_fetched_forecast_groups_into_days() {
    let mock_server = MockServer::start().await;
    mount_ok(&mock_server, "Marseille").await;

    let report = fetch(&provider(&mock_server), "Marseille").await.unwrap();

    // 16 points every 3 hours from 2024-06-10T12:00Z span three UTC dates.
    let days = group_by_day(&report.forecast.entries, &chrono::Utc);
    assert_eq!(days.len(), 3);
    assert_eq!(days[0].entries.len(), 4);
    assert_eq!(days[1].entries.len(), 8);
    assert_eq!(days[2].entries.len(), 4);
    assert_eq!(
        days[1].representative().timestamp.format("%H").to_string(),
        "12"
    );
}
