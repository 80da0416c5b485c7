// MIT License - Copyright (c) 2026 Peter Wright
// MQTT bridge

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use serde::{Deserialize, Serialize};
use tokio::signal::unix::{SignalKind, signal};
use tokio::time::{Duration, interval};
use tracing::{debug, error, info, warn};

use simon_says::{AlarmEvent, AlarmService, Config, SensorState, ServiceEvent};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "simon-says")]
#[command(about = "Bridge between a Simon XT alarm panel (via Asterisk) and MQTT")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = "config.toml")]
    config: String,

    /// Process pending event files once, print them as JSON and exit
    #[arg(long)]
    once: bool,
}

// ---------------------------------------------------------------------------
// MQTT JSON types
// ---------------------------------------------------------------------------

// Published messages: all share {now, op, ...} flat structure

#[derive(Serialize)]
struct MqttSnapshot {
    now: u64,
    op: String,
    state: MqttSnapshotState,
}

#[derive(Serialize)]
struct MqttSnapshotState {
    sensors: Vec<MqttSensorState>,
    events: usize,
}

#[derive(Serialize)]
struct MqttSensorState {
    id: u32,
    name: String,
    state: SensorState,
}

// {now, op: "EVENT", event}
#[derive(Serialize)]
struct MqttEvent {
    now: u64,
    op: String,
    event: AlarmEvent,
}

// {now, op: "SENSOR_CHANGE", zone, name, from, to}
#[derive(Serialize)]
struct MqttSensorChange {
    now: u64,
    op: String,
    zone: u32,
    name: String,
    from: SensorState,
    to: SensorState,
}

#[derive(Serialize)]
struct MqttCmdAck {
    now: u64,
    op: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    src: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
}

#[derive(Serialize)]
struct MqttSimpleEvent {
    now: u64,
    op: String,
}

// Inbound command (subscribed)
#[derive(Deserialize)]
struct MqttCommand {
    op: String,
    #[serde(default)]
    #[allow(dead_code)]
    op_id: Option<String>,
    #[serde(default)]
    zone: Option<u32>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    uid: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn now_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

async fn publish_json(client: &AsyncClient, topic: &str, payload: &impl Serialize, retain: bool) {
    match serde_json::to_string(payload) {
        Ok(json) => {
            if let Err(e) = client.publish(topic, QoS::AtLeastOnce, retain, json).await {
                error!("Failed to publish to {topic}: {e}");
            }
        }
        Err(e) => error!("Failed to serialize MQTT payload: {e}"),
    }
}

async fn publish_cmd_ack(
    client: &AsyncClient,
    topic: &str,
    success: bool,
    src: Option<serde_json::Value>,
    data: Option<serde_json::Value>,
) {
    let msg = MqttCmdAck {
        now: now_epoch_ms(),
        op: "CMD_ACK".to_string(),
        success,
        src,
        data,
    };
    publish_json(client, topic, &msg, false).await;
}

async fn build_snapshot(service: &AlarmService) -> MqttSnapshot {
    let sensors = service
        .sensors()
        .await
        .into_iter()
        .map(|s| MqttSensorState {
            id: s.number,
            name: s.name,
            state: s.state,
        })
        .collect();
    let events = service.events().await.len();

    MqttSnapshot {
        now: now_epoch_ms(),
        op: "SNAPSHOT".to_string(),
        state: MqttSnapshotState { sensors, events },
    }
}

async fn publish_snapshot(client: &AsyncClient, topic: &str, service: &AlarmService) {
    let snapshot = build_snapshot(service).await;
    publish_json(client, topic, &snapshot, true).await;
}

// ---------------------------------------------------------------------------
// Service event → MQTT
// ---------------------------------------------------------------------------

async fn handle_service_event(event: ServiceEvent, client: &AsyncClient, topic: &str) {
    match event {
        ServiceEvent::EventRecorded(event) => {
            let msg = MqttEvent {
                now: now_epoch_ms(),
                op: "EVENT".to_string(),
                event,
            };
            publish_json(client, topic, &msg, false).await;
        }

        ServiceEvent::SensorChanged { change, name } => {
            info!("Sensor {} ({name}) {} -> {}", change.number, change.from, change.to);
            let msg = MqttSensorChange {
                now: now_epoch_ms(),
                op: "SENSOR_CHANGE".to_string(),
                zone: change.number,
                name,
                from: change.from,
                to: change.to,
            };
            publish_json(client, topic, &msg, false).await;
        }

        ServiceEvent::SensorsCleared => {
            let msg = MqttSimpleEvent {
                now: now_epoch_ms(),
                op: "SENSORS_CLEARED".to_string(),
            };
            publish_json(client, topic, &msg, false).await;
        }

        ServiceEvent::CommandSent { action } => {
            debug!("Command '{action}' sent");
        }
    }
}

// ---------------------------------------------------------------------------
// MQTT command handler
// ---------------------------------------------------------------------------

/// Run a service command and log the result. Returns `true` on success.
async fn exec_service_cmd<T, E: std::fmt::Display>(
    op: &str,
    fut: impl std::future::Future<Output = std::result::Result<T, E>>,
) -> bool {
    match fut.await {
        Ok(_) => {
            info!("{op}: success");
            true
        }
        Err(e) => {
            error!("{op} failed: {e}");
            false
        }
    }
}

async fn handle_command(
    payload_str: &str,
    cmd: MqttCommand,
    client: &AsyncClient,
    topic: &str,
    service: &AlarmService,
) {
    // Parse the raw payload as a JSON value for the CMD_ACK src field
    let src_json = serde_json::from_str::<serde_json::Value>(payload_str).ok();

    match cmd.op.as_str() {
        "SNAPSHOT" => {
            debug!("Command: SNAPSHOT");
            let snapshot = build_snapshot(service).await;
            let snapshot_value = serde_json::to_value(&snapshot).ok();
            publish_json(client, topic, &snapshot, true).await;
            publish_cmd_ack(client, topic, true, src_json, snapshot_value).await;
        }

        "PING" => {
            info!("Command: PING");
            publish_cmd_ack(client, topic, true, src_json, None).await;
        }

        "DISARM" => {
            info!("Command: DISARM");
            let success = exec_service_cmd("DISARM", service.disarm()).await;
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        "ARM_HOME" => {
            info!("Command: ARM_HOME");
            let success = exec_service_cmd("ARM_HOME", service.arm_home()).await;
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        "ARM_AWAY" => {
            info!("Command: ARM_AWAY");
            let success = exec_service_cmd("ARM_AWAY", service.arm_away()).await;
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        "COMMAND" => {
            let Some(action) = cmd.action else {
                warn!("COMMAND: missing action");
                publish_cmd_ack(client, topic, false, src_json, None).await;
                return;
            };
            info!("Command: COMMAND {action}");
            let success = exec_service_cmd("COMMAND", service.send_command(&action)).await;
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        "ZONE_BYPASS" => {
            let Some(id) = cmd.zone else {
                warn!("ZONE_BYPASS: missing zone");
                publish_cmd_ack(client, topic, false, src_json, None).await;
                return;
            };
            info!("Command: ZONE_BYPASS zone {id}");
            let success = exec_service_cmd("ZONE_BYPASS", service.bypass(id)).await;
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        "EVENTS" => {
            debug!("Command: EVENTS");
            let events = service.events().await;
            let data = serde_json::to_value(&events).ok();
            publish_cmd_ack(client, topic, data.is_some(), src_json, data).await;
        }

        "DELETE_EVENT" => {
            let Some(uid) = cmd.uid else {
                warn!("DELETE_EVENT: missing uid");
                publish_cmd_ack(client, topic, false, src_json, None).await;
                return;
            };
            info!("Command: DELETE_EVENT {uid}");
            let success = exec_service_cmd("DELETE_EVENT", service.delete_event(&uid)).await;
            publish_cmd_ack(client, topic, success, src_json, None).await;
        }

        other => {
            warn!("Unknown command: {other}");
            publish_cmd_ack(client, topic, false, src_json, None).await;
        }
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn load_config(path: &str) -> Result<Config> {
    Config::load(path).with_context(|| format!("Failed to load config file {path}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG controls verbosity (e.g. RUST_LOG=debug or RUST_LOG=simon_says=trace).
    // Default: info.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // systemd journal already adds timestamps, so omit them when running under systemd
    if std::env::var_os("JOURNAL_STREAM").is_some() {
        tracing_subscriber::fmt().without_time().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;
    let mut service =
        Arc::new(AlarmService::from_config(&config).context("Failed to start alarm service")?);

    if cli.once {
        for event in service.process_spool().await? {
            println!("{}", event.to_json()?);
        }
        return Ok(());
    }

    let mut poll_interval = config.poll_interval()?;
    let mut mqtt_client_id = config.mqtt.client_id;
    let mut publish_topic = config.mqtt.publish_topic;
    let mut subscribe_topic = config.mqtt.subscribe_topic;
    let mut snapshot_interval_secs = config.mqtt.snapshot_interval_secs;

    let (mut mqtt_host, mut mqtt_port) = parse_mqtt_url(&config.mqtt.url)?;

    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    loop {
        // Set up MQTT
        let mut mqtt_opts = MqttOptions::new(&mqtt_client_id, &mqtt_host, mqtt_port);
        mqtt_opts.set_keep_alive(Duration::from_secs(30));
        let (client, mut eventloop) = AsyncClient::new(mqtt_opts, 256);

        // Subscribe to command topic
        client
            .subscribe(&subscribe_topic, QoS::AtLeastOnce)
            .await
            .context("Failed to subscribe to MQTT topic")?;
        info!("MQTT: subscribed to {subscribe_topic}");

        // Publish initial snapshot
        publish_snapshot(&client, &publish_topic, &service).await;

        // Task 1: Service event listener
        let client_events = client.clone();
        let topic_events = publish_topic.clone();
        let mut event_rx = service.subscribe();
        let event_handle = tokio::spawn(async move {
            loop {
                match event_rx.recv().await {
                    Ok(event) => handle_service_event(event, &client_events, &topic_events).await,
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!("Event receiver lagged, missed {n} events");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!("Event channel closed");
                        break;
                    }
                }
            }
        });

        // Task 2: MQTT event loop (receives messages, handles commands)
        let service_cmds = Arc::clone(&service);
        let client_cmds = client.clone();
        let topic_cmds = publish_topic.clone();
        let sub_topic = subscribe_topic.clone();
        let mqtt_handle = tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        // rumqttc does not resubscribe after a broker reconnect
                        info!("MQTT: connected, subscribing to {sub_topic}");
                        if let Err(e) = client_cmds.subscribe(&sub_topic, QoS::AtLeastOnce).await {
                            error!("Failed to subscribe to {sub_topic}: {e}");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(msg))) => {
                        if msg.topic == sub_topic {
                            let payload = String::from_utf8_lossy(&msg.payload);
                            match serde_json::from_str::<MqttCommand>(&payload) {
                                Ok(cmd) => {
                                    if cmd.op == "SNAPSHOT" || cmd.op == "EVENTS" {
                                        debug!("MQTT command received: {payload}");
                                    } else {
                                        info!("MQTT command received: {payload}");
                                    }
                                    handle_command(
                                        &payload,
                                        cmd,
                                        &client_cmds,
                                        &topic_cmds,
                                        &service_cmds,
                                    )
                                    .await;
                                }
                                Err(e) => {
                                    warn!("Failed to parse MQTT command: {e}");
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!("MQTT event loop error: {e}");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        // Task 3: Snapshot timer
        let service_snap = Arc::clone(&service);
        let client_snap = client.clone();
        let topic_snap = publish_topic.clone();
        let snap_handle = tokio::spawn(async move {
            let mut ticker = interval(Duration::from_secs(snapshot_interval_secs));
            // Skip the first immediate tick (we already published an initial snapshot)
            ticker.tick().await;
            loop {
                ticker.tick().await;
                publish_snapshot(&client_snap, &topic_snap, &service_snap).await;
            }
        });

        // Task 4: Event file poller
        let service_spool = Arc::clone(&service);
        let spool_handle = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            loop {
                ticker.tick().await;
                if let Err(e) = service_spool.process_spool().await {
                    warn!("Event file scan failed: {e}");
                }
            }
        });

        // Wait for a signal
        info!("MQTT bridge running. Send SIGHUP to restart, SIGINT/SIGTERM to stop.");
        let restart = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down...");
                false
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down...");
                false
            }
            _ = sighup.recv() => {
                info!("Received SIGHUP, reloading config and restarting...");
                true
            }
        };

        // Abort tasks
        event_handle.abort();
        mqtt_handle.abort();
        snap_handle.abort();
        spool_handle.abort();

        if !restart {
            break;
        }

        // Reload config from disk; keep previous config on failure
        info!("Reloading config from {}", cli.config);
        match load_config(&cli.config).and_then(|new_config| {
            let new_service = AlarmService::from_config(&new_config)
                .context("Invalid alarm service config")?;
            new_config.poll_interval()?;
            let (new_host, new_port) = parse_mqtt_url(&new_config.mqtt.url)?;
            Ok((new_config, new_service, new_host, new_port))
        }) {
            Ok((new_config, new_service, new_host, new_port)) => {
                service = Arc::new(new_service);
                mqtt_host = new_host;
                mqtt_port = new_port;
                mqtt_client_id = new_config.mqtt.client_id;
                publish_topic = new_config.mqtt.publish_topic;
                subscribe_topic = new_config.mqtt.subscribe_topic;
                snapshot_interval_secs = new_config.mqtt.snapshot_interval_secs;
                poll_interval = Duration::from_secs(new_config.events.poll_interval_secs);
                info!("Config reloaded successfully");
            }
            Err(e) => warn!("Failed to reload config, keeping previous: {e:#}"),
        }

        info!("Restarting...");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Parse an MQTT URL like "mqtt://host:port" into (host, port).
fn parse_mqtt_url(url: &str) -> Result<(String, u16)> {
    let stripped = url
        .strip_prefix("mqtt://")
        .or_else(|| url.strip_prefix("tcp://"))
        .unwrap_or(url);

    let (host, port_str) = stripped
        .rsplit_once(':')
        .context("MQTT URL must be in format mqtt://host:port")?;

    let port: u16 = port_str.parse().context("Invalid MQTT port number")?;

    Ok((host.to_string(), port))
}
