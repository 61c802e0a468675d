//! OpenWeatherMap current-conditions client.

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::bot::error::WeatherError;
use crate::bot::message::html_escape;
use crate::bot::ports::WeatherLookup;

const OWM_API_URL: &str = "https://api.openweathermap.org";

/// Reply used whenever the lookup fails, whatever the reason.
pub const WEATHER_NOT_FOUND: &str = "🚫 Không tìm thấy thông tin thời tiết cho thành phố này!";

#[derive(Deserialize, Debug)]
struct CurrentWeather {
    weather: Vec<Condition>,
    main: Main,
    wind: Wind,
}

#[derive(Deserialize, Debug)]
struct Condition {
    description: String,
}

#[derive(Deserialize, Debug)]
struct Main {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize, Debug)]
struct Wind {
    speed: f64,
}

/// Conditions extracted from a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    pub description: String,
    /// Degrees Celsius.
    pub temperature: f64,
    /// Percent.
    pub humidity: f64,
    /// Metres per second.
    pub wind_speed: f64,
}

impl WeatherReport {
    /// Render the reply for `city` as Telegram HTML.
    pub fn render(&self, city: &str) -> String {
        format!(
            "🌤 <b>Thời tiết tại {}</b>:\n\
             Trạng thái: {}\n\
             Nhiệt độ: {}°C\n\
             Độ ẩm: {}%\n\
             Gió: {} m/s",
            html_escape(city),
            html_escape(&self.description),
            self.temperature,
            self.humidity,
            self.wind_speed,
        )
    }
}

pub struct WeatherClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl WeatherClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, OWM_API_URL.to_string())
    }

    /// Point the client at another host, e.g. a local stub server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            api_key,
            base_url,
            client: reqwest::Client::new(),
        }
    }

    /// Fail-soft lookup: the rendered report, or [`WEATHER_NOT_FOUND`].
    pub async fn get_weather(&self, city: &str) -> String {
        weather_reply(self, city).await
    }

    async fn fetch(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        info!("🌤 Weather lookup: {}", city);

        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "vi"),
            ])
            .send()
            .await?;

        let status = response.status();
        debug!("Weather response status: {status}");

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(WeatherError::NotFound(city.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WeatherError::Upstream { status: status.as_u16(), body });
        }

        let body = response.text().await?;
        let parsed: CurrentWeather =
            serde_json::from_str(&body).map_err(|e| WeatherError::Malformed(e.to_string()))?;

        let condition = parsed
            .weather
            .into_iter()
            .next()
            .ok_or_else(|| WeatherError::Malformed("empty weather array".to_string()))?;

        Ok(WeatherReport {
            description: condition.description,
            temperature: parsed.main.temp,
            humidity: parsed.main.humidity,
            wind_speed: parsed.wind.speed,
        })
    }
}

#[async_trait::async_trait]
impl WeatherLookup for WeatherClient {
    async fn lookup(&self, city: &str) -> Result<WeatherReport, WeatherError> {
        self.fetch(city).await
    }
}

/// Look up `city` and turn any failure into the fixed not-found reply.
pub async fn weather_reply(lookup: &dyn WeatherLookup, city: &str) -> String {
    match lookup.lookup(city).await {
        Ok(report) => report.render(city),
        Err(e) => {
            warn!("Weather lookup for {:?} failed: {}", city, e);
            WEATHER_NOT_FOUND.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::get;
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn hanoi_body() -> serde_json::Value {
        serde_json::json!({
            "weather": [{ "id": 802, "main": "Clouds", "description": "mây rải rác" }],
            "main": { "temp": 28.5, "humidity": 70, "pressure": 1009 },
            "wind": { "speed": 3.2, "deg": 120 },
            "name": "Hanoi"
        })
    }

    #[tokio::test]
    async fn test_success_renders_report() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("q").map(String::as_str), Some("Hanoi"));
                assert_eq!(q.get("appid").map(String::as_str), Some("key"));
                assert_eq!(q.get("units").map(String::as_str), Some("metric"));
                assert_eq!(q.get("lang").map(String::as_str), Some("vi"));
                axum::Json(hanoi_body())
            }),
        );
        let client = WeatherClient::with_base_url("key".into(), serve(app).await);

        let reply = client.get_weather("Hanoi").await;
        assert_eq!(
            reply,
            "🌤 <b>Thời tiết tại Hanoi</b>:\n\
             Trạng thái: mây rải rác\n\
             Nhiệt độ: 28.5°C\n\
             Độ ẩm: 70%\n\
             Gió: 3.2 m/s"
        );
    }

    #[tokio::test]
    async fn test_not_found_is_fail_soft() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|| async { (StatusCode::NOT_FOUND, r#"{"cod":"404","message":"city not found"}"#) }),
        );
        let client = WeatherClient::with_base_url("key".into(), serve(app).await);

        assert!(matches!(client.lookup("Atlantis").await, Err(WeatherError::NotFound(_))));
        assert_eq!(client.get_weather("Atlantis").await, WEATHER_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_server_error() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|| async { (StatusCode::UNAUTHORIZED, "bad key") }),
        );
        let client = WeatherClient::with_base_url("key".into(), serve(app).await);

        match client.lookup("Hanoi").await {
            Err(WeatherError::Upstream { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let app = Router::new().route(
            "/data/2.5/weather",
            get(|| async {
                axum::Json(serde_json::json!({
                    "weather": [],
                    "main": { "temp": 1.0, "humidity": 2 },
                    "wind": { "speed": 3.0 }
                }))
            }),
        );
        let client = WeatherClient::with_base_url("key".into(), serve(app).await);

        assert!(matches!(client.lookup("Hanoi").await, Err(WeatherError::Malformed(_))));
        assert_eq!(client.get_weather("Hanoi").await, WEATHER_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unreachable_host() {
        // Port 9 (discard) is closed on test machines.
        let client = WeatherClient::with_base_url("key".into(), "http://127.0.0.1:9".into());
        assert!(matches!(client.lookup("Hanoi").await, Err(WeatherError::Http(_))));
        assert_eq!(client.get_weather("Hanoi").await, WEATHER_NOT_FOUND);
    }

    #[test]
    fn test_render_escapes_city() {
        let report = WeatherReport {
            description: "nắng".into(),
            temperature: 30.0,
            humidity: 50.0,
            wind_speed: 1.5,
        };
        let reply = report.render("<script>");
        assert!(reply.starts_with("🌤 <b>Thời tiết tại &lt;script&gt;</b>:"));
        assert!(reply.contains("Nhiệt độ: 30°C"));
    }
}
