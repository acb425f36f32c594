//! End-to-end runs of the refresh job against a mocked Open-Meteo server
//! and the in-memory document store.

use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};

use meteo_core::{
    CollectionLayout, DocumentPath, DocumentStore, FieldValue, ForecastConfig, Location,
    RefreshError, RefreshJob,
    provider::openmeteo::OpenMeteoProvider,
    store::{
        Document,
        memory::{MemoryStore, WriteKind},
    },
};
use serde_json::{Value, json};
use tracing_subscriber::fmt::MakeWriter;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Helper to build an Open-Meteo style response with `days` daily entries.
fn forecast_json(temperature: f64, days: usize) -> Value {
    let time: Vec<String> = (0..days).map(|d| format!("2026-10-{:02}", 19 + d)).collect();
    let probabilities: Vec<i64> = (0..days as i64).map(|d| d * 10).collect();
    json!({
        "latitude": -21.0,
        "longitude": 165.0,
        "timezone": "Pacific/Noumea",
        "current": {
            "time": "2026-10-19T10:00",
            "interval": 900,
            "temperature_2m": temperature,
            "wind_speed_10m": 12.4,
            "wind_direction_10m": 110,
            "wind_gusts_10m": 18.1,
            "pressure_msl": 1016.2,
            "weather_code": 2
        },
        "daily": {
            "time": time,
            "weather_code": vec![3; days],
            "temperature_2m_max": vec![29.5; days],
            "temperature_2m_min": vec![20.1; days],
            "wind_speed_10m_max": vec![15.2; days],
            "wind_gusts_10m_max": vec![25.0; days],
            "wind_direction_10m_dominant": vec![120; days],
            "uv_index_max": vec![9.1; days],
            "precipitation_sum": vec![0.4; days],
            "precipitation_probability_max": probabilities
        }
    })
}

async fn mount_forecast(server: &MockServer, latitude: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", latitude))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

fn job_for(server_uri: &str, timeout: Option<u64>, store: Arc<MemoryStore>) -> RefreshJob {
    let config = ForecastConfig {
        base_url: server_uri.to_string(),
        request_timeout_secs: timeout,
        ..ForecastConfig::default()
    };
    let provider = OpenMeteoProvider::from_config(&config).unwrap();
    RefreshJob::new(Box::new(provider), store, CollectionLayout::default())
}

fn current(name: &str) -> DocumentPath {
    DocumentPath::new("meteo_caledonie", name)
}

fn day(name: &str, n: usize) -> DocumentPath {
    current(name).child("previsions", format!("jour_{n}"))
}

#[tokio::test]
async fn seven_day_response_writes_six_forecasts() {
    let server = MockServer::start().await;
    mount_forecast(&server, "-21.5", forecast_json(27.5, 7)).await;

    let store = Arc::new(MemoryStore::new());
    let job = job_for(&server.uri(), None, store.clone());

    let report = job.run(&[Location::new("TestVille", -21.5, 165.5)]).await;
    assert!(report.is_complete_success());

    let doc = store.get(&current("TestVille")).unwrap();
    assert_eq!(doc.get("temperature"), Some(&FieldValue::Double(27.5)));
    assert_eq!(doc.get("meteo"), Some(&FieldValue::Integer(2)));
    assert!(matches!(doc.get("derniere_maj"), Some(FieldValue::Timestamp(_))));

    for n in 1..=6 {
        assert!(store.get(&day("TestVille", n)).is_some(), "jour_{n} missing");
    }
    assert!(store.get(&day("TestVille", 7)).is_none());
    assert!(store.get(&day("TestVille", 0)).is_none());

    let writes = store.writes();
    assert_eq!(writes.iter().filter(|w| w.kind == WriteKind::Merge).count(), 1);
    assert_eq!(writes.iter().filter(|w| w.kind == WriteKind::Set).count(), 6);

    let jour_3 = store.get(&day("TestVille", 3)).unwrap();
    assert_eq!(jour_3.get("date"), Some(&FieldValue::from("2026-10-22")));
    assert_eq!(jour_3.get("prob_pluie"), Some(&FieldValue::Integer(30)));
}

#[tokio::test]
async fn fortnight_response_is_clamped_to_a_week() {
    let server = MockServer::start().await;
    mount_forecast(&server, "-22.27", forecast_json(24.0, 14)).await;

    let store = Arc::new(MemoryStore::new());
    let job = job_for(&server.uri(), None, store.clone());
    let report = job.run(&[Location::new("Nouméa", -22.27, 166.44)]).await;

    let refresh = report.outcomes[0].result.as_ref().unwrap();
    assert_eq!(refresh.forecast_days, 7);
    assert_eq!(refresh.days_available, 14);
    assert!(store.get(&day("Nouméa", 7)).is_some());
    assert!(store.get(&day("Nouméa", 8)).is_none());
}

#[tokio::test]
async fn single_day_response_writes_no_forecasts() {
    let server = MockServer::start().await;
    mount_forecast(&server, "-20.23", forecast_json(25.0, 1)).await;

    let store = Arc::new(MemoryStore::new());
    let job = job_for(&server.uri(), None, store.clone());
    let report = job.run(&[Location::new("Poum", -20.23, 164.02)]).await;

    assert!(report.is_complete_success());
    assert_eq!(store.writes().len(), 1);
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn current_conditions_merge_keeps_other_fields() {
    let server = MockServer::start().await;
    mount_forecast(&server, "-21.5", forecast_json(25.0, 3)).await;

    let store = Arc::new(MemoryStore::new());
    store
        .merge(
            &current("TestVille"),
            Document::new().with("notes", "x").with("temperature", 19.0),
        )
        .await
        .unwrap();

    let job = job_for(&server.uri(), None, store.clone());
    job.run(&[Location::new("TestVille", -21.5, 165.5)]).await;

    let doc = store.get(&current("TestVille")).unwrap();
    assert_eq!(doc.get("notes"), Some(&FieldValue::from("x")));
    assert_eq!(doc.get("temperature"), Some(&FieldValue::Double(25.0)));
}

#[tokio::test]
async fn forecast_write_replaces_previous_day() {
    let server = MockServer::start().await;
    let mut body = forecast_json(25.0, 3);
    body["daily"]["precipitation_probability_max"] = json!([null, null, null]);
    mount_forecast(&server, "-21.5", body).await;

    let store = Arc::new(MemoryStore::new());
    store
        .set(
            &day("TestVille", 1),
            Document::new().with("prob_pluie", 90_i64).with("stale", true),
        )
        .await
        .unwrap();

    let job = job_for(&server.uri(), None, store.clone());
    job.run(&[Location::new("TestVille", -21.5, 165.5)]).await;

    let doc = store.get(&day("TestVille", 1)).unwrap();
    assert!(!doc.contains("stale"));
    assert_eq!(doc.get("prob_pluie"), Some(&FieldValue::Null));
}

#[tokio::test]
async fn failing_location_does_not_stop_the_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/forecast"))
        .and(query_param("latitude", "-21.52"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(forecast_json(20.0, 8))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;
    mount_forecast(&server, "-21.57", forecast_json(26.0, 8)).await;
    mount_forecast(&server, "-21.65", forecast_json(22.0, 8)).await;

    let store = Arc::new(MemoryStore::new());
    let job = job_for(&server.uri(), Some(1), store.clone());

    let locations = [
        Location::new("Bourail", -21.57, 165.49),
        Location::new("Canala", -21.52, 165.96),
        Location::new("Farino", -21.65, 165.77),
    ];
    let report = job.run(&locations).await;

    assert_eq!(report.succeeded(), 2);
    assert_eq!(report.failed(), 1);

    let failure = report.failures().next().unwrap();
    assert_eq!(failure.location, "Canala");
    assert!(matches!(failure.result, Err(RefreshError::Provider(_))));
    let line = failure.to_string();
    assert!(line.contains("Canala"));
    assert!(line.contains("network error"));

    assert!(store.get(&current("Canala")).is_none());
    assert!(store.get(&current("Farino")).is_some());
    assert!(store.get(&day("Farino", 7)).is_some());
}

#[tokio::test]
async fn unreachable_api_fails_every_location_but_completes() {
    let store = Arc::new(MemoryStore::new());
    // Nothing listens on port 9 locally.
    let job = job_for("http://127.0.0.1:9", Some(2), store.clone());

    let locations = meteo_core::locations::communes();
    let report = job.run(&locations[..3]).await;

    assert_eq!(report.outcomes.len(), 3);
    assert_eq!(report.failed(), 3);
    assert!(store.is_empty());
}

#[tokio::test]
async fn missing_daily_block_keeps_current_write() {
    let server = MockServer::start().await;
    let mut body = forecast_json(23.0, 3);
    body.as_object_mut().unwrap().remove("daily");
    mount_forecast(&server, "-20.96", body).await;

    let store = Arc::new(MemoryStore::new());
    let job = job_for(&server.uri(), None, store.clone());
    let report = job.run(&[Location::new("Voh", -20.96, 164.70)]).await;

    assert!(matches!(report.outcomes[0].result, Err(RefreshError::MissingDaily)));
    assert!(store.get(&current("Voh")).is_some());
}

#[tokio::test]
async fn malformed_daily_block_keeps_current_write() {
    let server = MockServer::start().await;
    let mut list = forecast_json(23.0, 3);
    list["daily"] = json!([1, 2]);
    mount_forecast(&server, "-20.96", list).await;
    let mut scalar_time = forecast_json(24.0, 3);
    scalar_time["daily"] = json!({"time": "x"});
    mount_forecast(&server, "-21.36", scalar_time).await;

    let store = Arc::new(MemoryStore::new());
    let job = job_for(&server.uri(), None, store.clone());
    let report = job
        .run(&[
            Location::new("Voh", -20.96, 164.70),
            Location::new("Houaïlou", -21.36, 165.63),
        ])
        .await;

    assert_eq!(report.failed(), 2);
    for outcome in &report.outcomes {
        assert!(matches!(outcome.result, Err(RefreshError::InvalidDaily(_))));
        let doc = store.get(&current(&outcome.location)).unwrap();
        assert!(doc.contains("derniere_maj"));
    }
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn fractional_weather_codes_are_stored_as_sent() {
    let server = MockServer::start().await;
    let mut body = forecast_json(26.0, 3);
    body["current"]["weather_code"] = json!(3.0);
    body["daily"]["weather_code"] = json!([3.0, 61.0, 80.5]);
    mount_forecast(&server, "-22.27", body).await;

    let store = Arc::new(MemoryStore::new());
    let job = job_for(&server.uri(), None, store.clone());
    let report = job.run(&[Location::new("Nouméa", -22.27, 166.44)]).await;

    assert!(report.is_complete_success());
    let doc = store.get(&current("Nouméa")).unwrap();
    assert_eq!(doc.get("meteo"), Some(&FieldValue::Double(3.0)));
    let jour_2 = store.get(&day("Nouméa", 2)).unwrap();
    assert_eq!(jour_2.get("code_meteo"), Some(&FieldValue::Double(80.5)));
}

/// Collects formatted log output for assertions.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LogBuffer;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[tokio::test]
async fn connection_errors_are_logged_and_the_banner_follows() {
    let logs = LogBuffer::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = Arc::new(MemoryStore::new());
    let job = job_for("http://127.0.0.1:9", Some(2), store.clone());
    job.run(&[Location::new("Poya", -21.35, 165.16)]).await;

    let output = logs.contents();
    let warning = output
        .lines()
        .find(|line| line.contains("WARN"))
        .expect("no warning logged");
    assert!(warning.contains("⚠️ Poya:"));
    assert!(warning.contains("network error"));

    let banner = output.lines().last().unwrap();
    assert!(banner.contains("✨ Weather refresh complete: 0 ok, 1 failed"));
}
