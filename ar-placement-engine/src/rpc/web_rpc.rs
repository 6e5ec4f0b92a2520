use bevy::diagnostic::DiagnosticsStore;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::systems::fps_tracking::{current_fps, fps_notification_system};
use crate::session::{
    ArCommand, ArCommandEvent, ArCommandSource, ArPhase, ArSession, ArSet, ArStatus, SupportState,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::JsValue;

#[cfg(target_arch = "wasm32")]
use web_sys::{MessageEvent, window};

/// JSON-RPC 2.0 request structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub result: Option<serde_json::Value>,
    pub error: Option<RpcError>,
    pub id: Option<serde_json::Value>,
}

/// JSON-RPC 2.0 notification structure for one-way communication.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RpcNotification {
    pub jsonrpc: String,
    pub method: String,
    pub params: serde_json::Value,
}

/// JSON-RPC 2.0 error object.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

/// Outbound queue towards the hosting page.
#[derive(Resource, Default)]
pub struct WebRpcInterface {
    outgoing_notifications: Vec<RpcNotification>,
    outgoing_responses: Vec<RpcResponse>,
}

impl WebRpcInterface {
    /// Send notification to the page without expecting a response.
    pub fn send_notification(&mut self, method: &str, params: serde_json::Value) {
        self.outgoing_notifications.push(RpcNotification {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
        });
    }

    /// Notifications not yet flushed to the page.
    pub fn pending_notifications(&self) -> &[RpcNotification] {
        &self.outgoing_notifications
    }

    /// Queue response for transmission to the page.
    fn queue_response(&mut self, response: RpcResponse) {
        self.outgoing_responses.push(response);
    }
}

/// Plugin establishing the postMessage bridge to the hosting page.
pub struct WebRpcPlugin;

impl Plugin for WebRpcPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<WebRpcInterface>()
            .add_event::<IncomingRpcMessage>()
            .add_systems(
                Update,
                (process_incoming_messages, handle_rpc_messages)
                    .chain()
                    .in_set(ArSet::Ingest),
            )
            .add_systems(
                Update,
                (fps_notification_system, send_outgoing_messages)
                    .chain()
                    .in_set(ArSet::Outbound),
            );

        #[cfg(target_arch = "wasm32")]
        app.add_systems(Startup, setup_message_listener);
    }
}

#[cfg(target_arch = "wasm32")]
fn setup_message_listener(mut commands: Commands) {
    use std::sync::Arc;
    use std::sync::Mutex;

    let message_queue: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let queue_clone = message_queue.clone();

    let closure = Closure::wrap(Box::new(move |event: MessageEvent| {
        // Only string payloads that look like JSON-RPC are queued.
        if let Ok(data) = event.data().dyn_into::<js_sys::JsString>() {
            let message_str: String = data.into();

            if message_str.contains("jsonrpc") {
                if let Ok(mut queue) = queue_clone.lock() {
                    queue.push(message_str);
                }
            }
        }
    }) as Box<dyn FnMut(MessageEvent)>);

    if let Some(window) = window() {
        if let Err(e) =
            window.add_event_listener_with_callback("message", closure.as_ref().unchecked_ref())
        {
            error!("Failed to register message listener: {:?}", e);
        }
    }

    // Ownership moves to JS; the listener lives as long as the page.
    closure.forget();
    commands.insert_resource(MessageQueue(message_queue));
}

/// Resource wrapping the message queue filled by the page listener.
#[derive(Resource)]
struct MessageQueue(std::sync::Arc<std::sync::Mutex<Vec<String>>>);

/// Event representing an incoming RPC message from the page.
#[derive(Event)]
struct IncomingRpcMessage {
    content: String,
}

fn process_incoming_messages(
    message_queue: Option<Res<MessageQueue>>,
    mut message_events: EventWriter<IncomingRpcMessage>,
) {
    let Some(queue_res) = message_queue else {
        return;
    };

    let messages = if let Ok(mut queue) = queue_res.0.lock() {
        std::mem::take(&mut *queue)
    } else {
        Vec::new()
    };

    for message_str in messages {
        message_events.write(IncomingRpcMessage {
            content: message_str,
        });
    }
}

fn handle_rpc_messages(
    mut events: EventReader<IncomingRpcMessage>,
    diagnostics: Option<Res<DiagnosticsStore>>,
    session: Res<ArSession>,
    support: Res<SupportState>,
    mut rpc_interface: ResMut<WebRpcInterface>,
    mut commands: EventWriter<ArCommandEvent>,
) {
    for event in events.read() {
        match serde_json::from_str::<RpcRequest>(&event.content) {
            Ok(request) => {
                debug!("RPC request: {}", request.method);
                let status = ArStatus::capture(&session, &support);
                let fps = diagnostics.as_deref().and_then(current_fps);
                let outcome = handle_rpc_request(&request, &status, fps);

                if let Some(command) = outcome.command {
                    commands.write(ArCommandEvent {
                        command,
                        source: ArCommandSource::Rpc,
                    });
                }
                if let Some(response) = outcome.response {
                    rpc_interface.queue_response(response);
                }
            }
            Err(parse_error) => {
                warn!("Dropping malformed RPC message: {}", parse_error);
            }
        }
    }
}

/// What one request produced: an optional reply and an optional command
/// for the session controller.
#[derive(Debug, Default)]
pub struct RpcOutcome {
    pub response: Option<RpcResponse>,
    pub command: Option<ArCommand>,
}

/// Handle an individual request against the current status.
pub fn handle_rpc_request(request: &RpcRequest, status: &ArStatus, fps: Option<f64>) -> RpcOutcome {
    let (result, command) = match request.method.as_str() {
        "start_ar" => handle_start_ar(status),
        "end_ar" => (
            Ok(serde_json::json!({ "accepted": status.phase.is_active() })),
            Some(ArCommand::EndAr),
        ),
        "place_object" => handle_place_object(status),
        "get_status" => (status_json(status), None),
        "get_fps" => (Ok(serde_json::json!({ "fps": fps.unwrap_or(0.0) as f32 })), None),
        _ => {
            warn!("Unknown RPC method: {}", request.method);
            (
                Err(RpcError {
                    code: -32601,
                    message: "Method not found".to_string(),
                    data: Some(serde_json::json!({ "method": request.method })),
                }),
                None,
            )
        }
    };

    // Notifications (no id) still trigger commands but get no reply.
    let command = if result.is_ok() { command } else { None };
    let response = request.id.clone().map(|id| match result {
        Ok(value) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: Some(value),
            error: None,
            id: Some(id),
        },
        Err(error) => RpcResponse {
            jsonrpc: "2.0".to_string(),
            result: None,
            error: Some(error),
            id: Some(id),
        },
    });

    RpcOutcome { response, command }
}

fn handle_start_ar(status: &ArStatus) -> (Result<serde_json::Value, RpcError>, Option<ArCommand>) {
    if !status.supported {
        let message = if status.phase == ArPhase::Probing {
            "AR support check still running"
        } else {
            status.message.as_str()
        };
        return (Err(RpcError::ar_unavailable(message)), None);
    }
    if status.phase != ArPhase::Idle {
        return (
            Err(RpcError::ar_unavailable("An AR session is already active")),
            None,
        );
    }
    (
        Ok(serde_json::json!({ "accepted": true })),
        Some(ArCommand::StartAr),
    )
}

fn handle_place_object(status: &ArStatus) -> (Result<serde_json::Value, RpcError>, Option<ArCommand>) {
    if status.phase != ArPhase::Running {
        return (
            Err(RpcError::ar_unavailable("No AR session is running")),
            None,
        );
    }
    (
        Ok(serde_json::json!({ "accepted": true })),
        Some(ArCommand::PlaceObject),
    )
}

fn status_json(status: &ArStatus) -> Result<serde_json::Value, RpcError> {
    serde_json::to_value(status).map_err(|e| RpcError::internal_error(&e.to_string()))
}

/// Send queued notifications and responses to the page.
fn send_outgoing_messages(mut rpc_interface: ResMut<WebRpcInterface>) {
    for notification in rpc_interface.outgoing_notifications.drain(..) {
        send_message_to_parent(&notification);
    }

    for response in rpc_interface.outgoing_responses.drain(..) {
        send_message_to_parent(&response);
    }
}

/// Send a serialized message to the parent window.
fn send_message_to_parent<T: Serialize>(message: &T) {
    #[cfg(target_arch = "wasm32")]
    {
        match serde_json::to_string(message) {
            Ok(json) => {
                if let Some(window) = window() {
                    // Top-level pages post to themselves.
                    let target = window.parent().ok().flatten().unwrap_or(window);
                    if let Err(e) = target.post_message(&JsValue::from_str(&json), "*") {
                        error!("Failed to send message to page: {:?}", e);
                    }
                } else {
                    error!("Window object not available");
                }
            }
            Err(e) => {
                error!("Failed to serialize message: {}", e);
            }
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        let _ = message;
    }
}

/// Standard RPC error codes and constructors.
impl RpcError {
    pub fn internal_error(message: &str) -> Self {
        Self {
            code: -32603,
            message: message.to_string(),
            data: None,
        }
    }

    /// Application error: the AR path is not reachable right now.
    pub fn ar_unavailable(message: &str) -> Self {
        Self {
            code: -32000,
            message: message.to_string(),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, id: Option<i64>) -> RpcRequest {
        RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params: serde_json::Value::Null,
            id: id.map(serde_json::Value::from),
        }
    }

    fn status(supported: bool, phase: ArPhase) -> ArStatus {
        ArStatus {
            supported,
            message: if supported {
                String::new()
            } else {
                "AR is not supported on this device or browser.".to_string()
            },
            phase,
            world_space: None,
            used_fallback_space: false,
            indicator_visible: false,
            placed: false,
            anchored: false,
            last_error: None,
        }
    }

    #[test]
    fn start_ar_is_unreachable_when_unsupported() {
        let outcome = handle_rpc_request(
            &request("start_ar", Some(1)),
            &status(false, ArPhase::Unsupported),
            None,
        );

        assert!(outcome.command.is_none());
        let error = outcome.response.unwrap().error.unwrap();
        assert_eq!(error.code, -32000);
        assert!(error.message.contains("not supported"));
    }

    #[test]
    fn start_ar_from_idle_dispatches_command() {
        let outcome =
            handle_rpc_request(&request("start_ar", Some(2)), &status(true, ArPhase::Idle), None);

        assert_eq!(outcome.command, Some(ArCommand::StartAr));
        let response = outcome.response.unwrap();
        assert_eq!(response.id, Some(serde_json::Value::from(2)));
        assert_eq!(response.result.unwrap()["accepted"], true);
    }

    #[test]
    fn notification_requests_get_no_response() {
        let outcome =
            handle_rpc_request(&request("end_ar", None), &status(true, ArPhase::Running), None);

        assert!(outcome.response.is_none());
        assert_eq!(outcome.command, Some(ArCommand::EndAr));
    }

    #[test]
    fn place_object_requires_running_session() {
        let rejected =
            handle_rpc_request(&request("place_object", Some(3)), &status(true, ArPhase::Idle), None);
        assert!(rejected.command.is_none());

        let accepted = handle_rpc_request(
            &request("place_object", Some(4)),
            &status(true, ArPhase::Running),
            None,
        );
        assert_eq!(accepted.command, Some(ArCommand::PlaceObject));
    }

    #[test]
    fn unknown_method_reports_not_found() {
        let outcome =
            handle_rpc_request(&request("teleport", Some(5)), &status(true, ArPhase::Idle), None);

        let error = outcome.response.unwrap().error.unwrap();
        assert_eq!(error.code, -32601);
    }

    #[test]
    fn status_and_fps_queries() {
        let outcome = handle_rpc_request(
            &request("get_status", Some(6)),
            &status(true, ArPhase::Running),
            None,
        );
        let result = outcome.response.unwrap().result.unwrap();
        assert_eq!(result["phase"], "running");
        assert_eq!(result["supported"], true);

        let outcome =
            handle_rpc_request(&request("get_fps", Some(7)), &status(true, ArPhase::Idle), Some(59.5));
        assert_eq!(outcome.response.unwrap().result.unwrap()["fps"], 59.5);
    }

    #[test]
    fn request_without_params_parses() {
        let parsed: RpcRequest =
            serde_json::from_str(r#"{"jsonrpc":"2.0","method":"get_status","id":1}"#).unwrap();
        assert_eq!(parsed.method, "get_status");
        assert!(parsed.params.is_null());
    }
}
