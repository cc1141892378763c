//! Integration tests for the step counter HTTP server

#[cfg(feature = "server")]
mod server_tests {
    use std::path::Path;
    use std::time::Duration;
    use stepper::server::{run, ServerConfig};
    use stepper::{Config, ResetPolicy};

    fn server_config(dir: &Path, policy: ResetPolicy) -> ServerConfig {
        let app = Config {
            data_path: dir.to_path_buf(),
            reset_policy: policy,
            ..Config::default()
        };
        ServerConfig::new(0, app)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown_tx) = run(server_config(dir.path(), ResetPolicy::RetainBaseline))
            .await
            .expect("Failed to start server");

        // Give server time to start
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let response = client
            .get(format!("http://{}/health", addr))
            .send()
            .await
            .expect("Failed to send request");

        assert!(response.status().is_success());

        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["status"], "ok");
        assert!(body["version"].as_str().is_some());

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_sensor_reading_updates_steps() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown_tx) = run(server_config(dir.path(), ResetPolicy::PinToCumulative))
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let response = client
            .post(format!("http://{}/sensor", addr))
            .json(&serde_json::json!({ "cumulative": 42.0 }))
            .send()
            .await
            .expect("Failed to send request");
        assert!(response.status().is_success());

        let body: serde_json::Value = client
            .get(format!("http://{}/steps", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(body["displayed"], 42.0);
        assert_eq!(body["text"], "42");
        assert_eq!(body["running"], true);

        let body: serde_json::Value = client
            .post(format!("http://{}/reset", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(body["displayed"], 0.0);
        assert_eq!(body["baseline"], 42.0);

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_empty_reading_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (addr, shutdown_tx) = run(server_config(dir.path(), ResetPolicy::RetainBaseline))
            .await
            .expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let response = reqwest::Client::new()
            .post(format!("http://{}/sensor", addr))
            .json(&serde_json::json!({}))
            .send()
            .await
            .expect("Failed to send request");

        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: serde_json::Value = response.json().await.expect("Failed to parse JSON");
        assert_eq!(body["code"], "EMPTY_READING");

        let _ = shutdown_tx.send(());
    }

    #[tokio::test]
    async fn test_missing_sensor_notice_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = server_config(dir.path(), ResetPolicy::RetainBaseline);
        config.sensor_present = false;

        let (addr, shutdown_tx) = run(config).await.expect("Failed to start server");
        tokio::time::sleep(Duration::from_millis(100)).await;

        let client = reqwest::Client::new();
        let first: serde_json::Value = client
            .get(format!("http://{}/notices", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(first.as_array().map(|a| a.len()), Some(1));
        assert_eq!(first[0]["message"], "No sensor detected on this device");

        let second: serde_json::Value = client
            .get(format!("http://{}/notices", addr))
            .send()
            .await
            .expect("Failed to send request")
            .json()
            .await
            .expect("Failed to parse JSON");
        assert_eq!(second.as_array().map(|a| a.len()), Some(0));

        let response = client
            .post(format!("http://{}/sensor", addr))
            .json(&serde_json::json!({ "cumulative": 5.0 }))
            .send()
            .await
            .expect("Failed to send request");
        assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);

        let _ = shutdown_tx.send(());
    }
}
