//! Simulates the macOS agent: pushes a handful of sensor states into a
//! running macbridged instance.
//!
//! ```sh
//! cargo run --example agent_push -- http://127.0.0.1:8126 [token]
//! ```

use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let base = args
        .next()
        .unwrap_or_else(|| "http://127.0.0.1:8126".to_string());
    let token = args.next();

    let client = reqwest::Client::new();

    let readings = [
        ("cpu_usage", "12.5"),
        ("memory_usage", "63.0"),
        ("disk_usage", "48.2"),
        ("battery_level", "88"),
        ("is_charging", "true"),
    ];

    for (object_id, value) in readings {
        let body = json!({
            "state": value,
            "attributes": {
                "source": "hass_mac_sensor_agent",
                "unique_id": format!("hass_mac_sensor_agent_{object_id}"),
            },
        });

        let mut request = client
            .post(format!("{base}/api/states/sensor.{object_id}"))
            .json(&body);
        if let Some(token) = &token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        println!("sensor.{object_id}: {}", response.status());
    }

    Ok(())
}
