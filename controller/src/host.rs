use std::{
    collections::HashMap,
    net::SocketAddr,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
    time::{Duration, Instant},
};

use anyhow::Context;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use serde::Serialize;
use tokio::{net::TcpListener, sync::Mutex};
use tracing::{debug, info, warn};

use climate_thermostat_common::{
    trigger_topic, ClimateConfig, Edge, RuntimeConfig, ThermostatEngine, ThermostatEvent,
    TriggerTable, TOPIC_CMD_AWAY, TOPIC_CMD_FAN_MODE, TOPIC_CMD_MODE, TOPIC_CMD_SWING_MODE,
    TOPIC_CMD_TARGET, TOPIC_SENSOR_TEMP, TOPIC_STATE,
};

use crate::command::{self, Command, CommandError};

#[derive(Clone)]
struct AppState {
    engine: Arc<Mutex<ThermostatEngine>>,
    triggers: Arc<Mutex<TriggerTable>>,
    mqtt: AsyncClient,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

const MAX_MQTT_PAYLOAD_BYTES: usize = 512;

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = std::env::var("THERMOSTAT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("thermostat.json"));
    let runtime = load_runtime_config(&config_path).await?;

    let settings = runtime
        .climate
        .validate()
        .context("invalid climate configuration")?;
    let publish_interval = Duration::from_millis(runtime.thermostat.state_publish_interval_ms);
    let mut engine = ThermostatEngine::new(runtime.thermostat.clone(), settings);

    let mqtt_host = std::env::var("MQTT_HOST").unwrap_or(runtime.network.mqtt_host.clone());
    let mqtt_port = std::env::var("MQTT_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.mqtt_port);

    let mut mqtt_options = MqttOptions::new("climate-thermostat-controller", mqtt_host, mqtt_port);
    let mqtt_user = std::env::var("MQTT_USER").unwrap_or(runtime.network.mqtt_user.clone());
    let mqtt_pass = std::env::var("MQTT_PASS").unwrap_or(runtime.network.mqtt_pass.clone());
    if !mqtt_user.is_empty() {
        mqtt_options.set_credentials(mqtt_user, mqtt_pass);
    }

    let (mqtt, eventloop) = AsyncClient::new(mqtt_options, 64);

    let mut triggers = build_trigger_table(&runtime.climate, &mqtt);
    info!(
        "loaded {} with {} trigger handlers, starting in {}",
        config_path.display(),
        triggers.len(),
        engine.mode()
    );
    let initial = engine.start();
    dispatch_events(&mut triggers, &initial);

    let app_state = AppState {
        engine: Arc::new(Mutex::new(engine)),
        triggers: Arc::new(Mutex::new(triggers)),
        mqtt,
    };

    subscribe_topics(&app_state.mqtt).await?;
    spawn_mqtt_loop(app_state.clone(), eventloop);
    spawn_control_loop(app_state.clone());
    spawn_state_publish_loop(app_state.clone(), publish_interval);

    let app = Router::new()
        .route("/api/status", get(handle_get_status))
        .route("/api/mode", post(handle_set_mode))
        .route("/api/away", post(handle_set_away))
        .route("/api/target", post(handle_set_target))
        .route("/api/fan", post(handle_set_fan_mode))
        .route("/api/swing", post(handle_set_swing_mode))
        .with_state(app_state);

    let port = std::env::var("CONTROLLER_HTTP_PORT")
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(runtime.network.http_port);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind controller server at {addr}"))?;

    info!("controller listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn load_runtime_config(path: &Path) -> anyhow::Result<RuntimeConfig> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    RuntimeConfig::from_json(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

/// One enter handler per configured action sequence. Each publishes the
/// sequence id to the trigger's topic for the automation layer to run.
fn build_trigger_table(climate: &ClimateConfig, mqtt: &AsyncClient) -> TriggerTable {
    let mut table = TriggerTable::new();
    for (trigger, sequence) in climate.triggers() {
        let client = mqtt.clone();
        let topic = trigger_topic(&trigger.name());
        let sequence = sequence.to_string();
        table.on_enter(trigger, move || {
            if let Err(err) =
                client.try_publish(topic.as_str(), QoS::AtLeastOnce, false, sequence.clone())
            {
                warn!("failed to publish trigger {topic}: {err}");
            }
        });
    }
    table
}

fn dispatch_events(triggers: &mut TriggerTable, events: &[ThermostatEvent]) {
    for event in events {
        match event.edge {
            Edge::Enter => info!("enter {}", event.trigger),
            Edge::Leave => debug!("leave {}", event.trigger),
        }
        if !triggers.fire(*event) && event.edge == Edge::Enter {
            debug!("no action sequence registered for {}", event.trigger);
        }
    }
}

async fn subscribe_topics(mqtt: &AsyncClient) -> anyhow::Result<()> {
    let topics = [
        TOPIC_SENSOR_TEMP,
        TOPIC_CMD_MODE,
        TOPIC_CMD_AWAY,
        TOPIC_CMD_TARGET,
        TOPIC_CMD_FAN_MODE,
        TOPIC_CMD_SWING_MODE,
    ];

    for topic in topics {
        mqtt.subscribe(topic, QoS::AtMostOnce).await?;
    }
    Ok(())
}

fn spawn_mqtt_loop(app_state: AppState, mut eventloop: rumqttc::EventLoop) {
    tokio::spawn(async move {
        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::Publish(message))) => {
                    if let Err(err) =
                        handle_mqtt_message(&app_state, &message.topic, &message.payload).await
                    {
                        warn!("mqtt message handling error: {err:#}");
                    }
                }
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    info!("mqtt connected");
                }
                Ok(_) => {}
                Err(err) => {
                    warn!("mqtt poll error: {err}");
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
            }
        }
    });
}

fn spawn_control_loop(app_state: AppState) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(1));

        loop {
            interval.tick().await;
            let now_ms = monotonic_ms();

            let events = {
                let mut engine = app_state.engine.lock().await;
                engine.tick(now_ms)
            };

            if !events.is_empty() {
                let mut triggers = app_state.triggers.lock().await;
                dispatch_events(&mut triggers, &events);
            }
        }
    });
}

fn spawn_state_publish_loop(app_state: AppState, period: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;

            let payload = {
                let engine = app_state.engine.lock().await;
                serde_json::to_vec(&engine.state_payload())
            };

            match payload {
                Ok(body) => {
                    if let Err(err) = app_state
                        .mqtt
                        .publish(TOPIC_STATE, QoS::AtLeastOnce, true, body)
                        .await
                    {
                        warn!("climate state publish failed: {err}");
                    }
                }
                Err(err) => warn!("climate state serialization failed: {err}"),
            }
        }
    });
}

async fn handle_mqtt_message(
    app_state: &AppState,
    topic: &str,
    payload: &[u8],
) -> anyhow::Result<()> {
    if payload.len() > MAX_MQTT_PAYLOAD_BYTES {
        warn!(
            "dropping oversized MQTT payload on topic {} ({} bytes)",
            topic,
            payload.len()
        );
        return Ok(());
    }

    let message = std::str::from_utf8(payload).context("non utf8 mqtt payload")?;

    if topic == TOPIC_SENSOR_TEMP {
        let Ok(temp) = message.trim().parse::<f32>() else {
            debug!("ignoring unparsable temperature '{message}'");
            return Ok(());
        };
        let accepted = {
            let mut engine = app_state.engine.lock().await;
            engine.update_sensor_data(temp, monotonic_ms())
        };
        if !accepted {
            debug!("ignoring out-of-range temperature {temp}");
        }
        return Ok(());
    }

    let Some(command) = Command::from_topic(topic, message)? else {
        return Ok(());
    };
    let mut engine = app_state.engine.lock().await;
    command.apply(&mut engine)?;
    Ok(())
}

async fn handle_get_status(State(state): State<AppState>) -> impl IntoResponse {
    let now_ms = monotonic_ms();
    let status = {
        let engine = state.engine.lock().await;
        engine.status(now_ms)
    };

    Json(status)
}

async fn handle_set_mode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    apply_query(state, &params, command::parse_mode, Command::Mode).await
}

async fn handle_set_away(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    apply_query(state, &params, command::parse_away, Command::Away).await
}

async fn handle_set_target(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    apply_query(state, &params, command::parse_target, Command::Target).await
}

async fn handle_set_fan_mode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    apply_query(state, &params, command::parse_fan_mode, Command::FanMode).await
}

async fn handle_set_swing_mode(
    State(state): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    apply_query(state, &params, command::parse_swing_mode, Command::SwingMode).await
}

/// Parses `?value=`, queues the command and answers with the current
/// status. The change itself lands on the next control tick.
async fn apply_query<T>(
    state: AppState,
    params: &HashMap<String, String>,
    parse: fn(&str) -> Result<T, CommandError>,
    build: fn(T) -> Command,
) -> axum::response::Response {
    let Some(value) = params.get("value") else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'value' parameter");
    };

    let command = match parse(value) {
        Ok(parsed) => build(parsed),
        Err(err) => return error_response(StatusCode::BAD_REQUEST, &err.to_string()),
    };

    let applied = {
        let mut engine = state.engine.lock().await;
        command.apply(&mut engine)
    };
    if let Err(err) = applied {
        warn!("rejected {command:?}: {err}");
        let status = match err {
            CommandError::Unsupported(_) => StatusCode::CONFLICT,
            _ => StatusCode::BAD_REQUEST,
        };
        return error_response(status, &err.to_string());
    }

    (StatusCode::ACCEPTED, handle_get_status(State(state)).await).into_response()
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}

fn monotonic_ms() -> u64 {
    static START: OnceLock<Instant> = OnceLock::new();
    START
        .get_or_init(Instant::now)
        .elapsed()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
