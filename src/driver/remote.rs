use std::time::Duration;

use base64::Engine as _;
use reqwest::Method;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::driver::capability::{LaunchCapability, LaunchPreference};
use crate::driver::driver_model::{AppState, AppTarget, ElementHandle, Key, Locator, UiDriver};
use crate::error::{PilotError, PilotResult};

/// W3C element reference key.
pub const W3C_ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735a1b8a6a";

/// Connection settings for the remote automation server.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Server base URL, e.g. `http://127.0.0.1:4723`
    pub url: String,
    pub launch: LaunchPreference,
    /// Seconds the server waits for a command before ending the session
    pub new_command_timeout_secs: u64,
    /// Client-side HTTP timeout; `None` waits as long as the server does
    pub request_timeout: Option<Duration>,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:4723".to_string(),
            launch: LaunchPreference::Auto,
            new_command_timeout_secs: 6000,
            request_timeout: None,
        }
    }
}

// ============================================================================
// Wire types
// ============================================================================

/// Capabilities for a UiAutomator2 session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionCapabilities {
    #[serde(rename = "platformName")]
    pub platform_name: String,
    #[serde(rename = "appium:automationName")]
    pub automation_name: String,
    #[serde(rename = "appium:deviceName")]
    pub device_name: String,
    #[serde(rename = "appium:udid")]
    pub udid: String,
    #[serde(rename = "appium:appPackage")]
    pub app_package: String,
    #[serde(rename = "appium:appActivity", skip_serializing_if = "Option::is_none")]
    pub app_activity: Option<String>,
    #[serde(rename = "appium:platformVersion", skip_serializing_if = "Option::is_none")]
    pub platform_version: Option<String>,
    #[serde(rename = "appium:noReset")]
    pub no_reset: bool,
    #[serde(rename = "appium:newCommandTimeout")]
    pub new_command_timeout: u64,
}

impl SessionCapabilities {
    pub fn android(
        device_id: &str,
        target: &AppTarget,
        platform_version: Option<&str>,
        new_command_timeout: u64,
    ) -> Self {
        Self {
            platform_name: "Android".into(),
            automation_name: "UiAutomator2".into(),
            device_name: device_id.to_string(),
            udid: device_id.to_string(),
            app_package: target.package.clone(),
            app_activity: (!target.activity.is_empty()).then(|| target.activity.clone()),
            platform_version: platform_version
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            no_reset: true,
            new_command_timeout,
        }
    }
}

/// Body of `POST /session`.
#[derive(Debug, Serialize)]
pub struct NewSessionRequest {
    pub capabilities: CapabilityRequest,
}

#[derive(Debug, Serialize)]
pub struct CapabilityRequest {
    #[serde(rename = "alwaysMatch")]
    pub always_match: SessionCapabilities,
    #[serde(rename = "firstMatch")]
    pub first_match: Vec<Value>,
}

impl NewSessionRequest {
    pub fn new(capabilities: SessionCapabilities) -> Self {
        Self {
            capabilities: CapabilityRequest {
                always_match: capabilities,
                first_match: vec![json!({})],
            },
        }
    }
}

/// Response envelope shared by every W3C command.
#[derive(Debug, Deserialize)]
pub struct WireResponse {
    #[serde(default)]
    pub value: Value,
    /// Legacy (JSONWP) servers put the session id at the top level
    #[serde(rename = "sessionId", default)]
    pub session_id: Option<String>,
}

/// Error payload inside `value` on failed commands.
#[derive(Debug, Deserialize)]
pub struct WireError {
    pub error: String,
    #[serde(default)]
    pub message: String,
}

/// Pull the element id out of a W3C (or legacy `ELEMENT`) reference.
pub fn element_id_from(value: &Value) -> Option<String> {
    value
        .get(W3C_ELEMENT_KEY)
        .or_else(|| value.get("ELEMENT"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// Session id from a `POST /session` response in either protocol dialect.
pub fn session_id_from(response: &WireResponse) -> Option<String> {
    response
        .value
        .get("sessionId")
        .and_then(Value::as_str)
        .map(str::to_string)
        .or_else(|| response.session_id.clone())
}

/// Single key press as a W3C action sequence.
pub fn key_press_actions(key: Key) -> Value {
    json!({
        "actions": [{
            "type": "key",
            "id": "keyboard",
            "actions": [
                { "type": "keyDown", "value": key.code_point() },
                { "type": "keyUp", "value": key.code_point() }
            ]
        }]
    })
}

// ============================================================================
// RemoteDriver
// ============================================================================

/// A live session on an Appium-compatible server.
pub struct RemoteDriver {
    client: Client,
    base_url: String,
    session_id: String,
    launch: LaunchCapability,
    closed: bool,
}

impl RemoteDriver {
    /// Create a session and resolve its launch capability.
    pub fn connect(settings: &DriverSettings, capabilities: SessionCapabilities) -> PilotResult<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = settings.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;
        let base_url = settings.url.trim_end_matches('/').to_string();

        let server_version = fetch_server_version(&client, &base_url);
        let launch = LaunchCapability::resolve(
            settings.launch,
            server_version.as_deref(),
            capabilities.app_activity.is_some(),
        );

        let device = capabilities.udid.clone();
        let body = serde_json::to_value(NewSessionRequest::new(capabilities)).map_err(|e| {
            PilotError::JsonParse {
                context: "new session request".into(),
                source: e,
            }
        })?;

        let response = client.post(format!("{}/session", base_url)).json(&body).send()?;
        let wire = read_wire(response, "new_session")?;
        let session_id = session_id_from(&wire).ok_or_else(|| {
            PilotError::SessionSetup("no sessionId in new session response".into())
        })?;

        info!(
            session_id = %session_id,
            device = %device,
            server_version = server_version.as_deref().unwrap_or("unknown"),
            launch = ?launch,
            "driver session created"
        );

        Ok(Self {
            client,
            base_url,
            session_id,
            launch,
            closed: false,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    fn session_url(&self, path: &str) -> String {
        if path.is_empty() {
            format!("{}/session/{}", self.base_url, self.session_id)
        } else {
            format!("{}/session/{}/{}", self.base_url, self.session_id, path)
        }
    }

    /// Send a command and return its `value`.
    fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        command: &str,
    ) -> PilotResult<Value> {
        debug!(command, path, "driver command");
        let mut request = self.client.request(method, self.session_url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send()?;
        Ok(read_wire(response, command)?.value)
    }

    fn element_bool(&self, element: &ElementHandle, property: &str) -> PilotResult<bool> {
        let path = format!("element/{}/{}", element.id(), property);
        let value = self.execute(Method::GET, &path, None, property)?;
        value.as_bool().ok_or_else(|| PilotError::Driver {
            command: property.to_string(),
            message: format!("expected boolean, got {}", value),
        })
    }
}

impl UiDriver for RemoteDriver {
    fn launch_capability(&self) -> LaunchCapability {
        self.launch
    }

    fn page_source(&mut self) -> PilotResult<String> {
        let value = self.execute(Method::GET, "source", None, "page_source")?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| PilotError::Driver {
                command: "page_source".into(),
                message: "source was not a string".into(),
            })
    }

    fn find_elements(&mut self, locator: &Locator) -> PilotResult<Vec<ElementHandle>> {
        let body = json!({ "using": locator.strategy(), "value": locator.value() });
        let value = self.execute(Method::POST, "elements", Some(body), "find_elements")?;
        Ok(value
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(element_id_from)
                    .map(ElementHandle)
                    .collect()
            })
            .unwrap_or_default())
    }

    fn is_displayed(&mut self, element: &ElementHandle) -> PilotResult<bool> {
        self.element_bool(element, "displayed")
    }

    fn is_enabled(&mut self, element: &ElementHandle) -> PilotResult<bool> {
        self.element_bool(element, "enabled")
    }

    fn click(&mut self, element: &ElementHandle) -> PilotResult<()> {
        let path = format!("element/{}/click", element.id());
        self.execute(Method::POST, &path, Some(json!({})), "click")?;
        Ok(())
    }

    fn send_keys(&mut self, element: &ElementHandle, text: &str) -> PilotResult<()> {
        let path = format!("element/{}/value", element.id());
        let chars: Vec<String> = text.chars().map(String::from).collect();
        let body = json!({ "text": text, "value": chars });
        self.execute(Method::POST, &path, Some(body), "send_keys")?;
        Ok(())
    }

    fn press_key(&mut self, key: Key) -> PilotResult<()> {
        self.execute(Method::POST, "actions", Some(key_press_actions(key)), "actions")?;
        Ok(())
    }

    fn screenshot_png(&mut self) -> PilotResult<Vec<u8>> {
        let value = self.execute(Method::GET, "screenshot", None, "screenshot")?;
        let encoded = value.as_str().ok_or_else(|| PilotError::Driver {
            command: "screenshot".into(),
            message: "screenshot was not a base64 string".into(),
        })?;
        Ok(base64::engine::general_purpose::STANDARD.decode(encoded.trim())?)
    }

    fn launch_app(&mut self, target: &AppTarget) -> PilotResult<()> {
        match self.launch {
            LaunchCapability::LaunchApp => {
                self.execute(Method::POST, "appium/app/launch", Some(json!({})), "launch_app")?;
            }
            LaunchCapability::StartActivity => {
                let intent = format!("{}/{}", target.package, target.activity);
                let body = json!({
                    "script": "mobile: startActivity",
                    "args": [{ "intent": intent }]
                });
                self.execute(Method::POST, "execute/sync", Some(body), "start_activity")?;
            }
            LaunchCapability::ActivateApp => {
                let body = json!({ "appId": target.package });
                self.execute(Method::POST, "appium/device/activate_app", Some(body), "activate_app")?;
            }
        }
        Ok(())
    }

    fn app_state(&mut self, package: &str) -> PilotResult<AppState> {
        let body = json!({ "appId": package });
        let value = self.execute(Method::POST, "appium/device/app_state", Some(body), "app_state")?;
        value
            .as_i64()
            .and_then(AppState::from_code)
            .ok_or_else(|| PilotError::Driver {
                command: "app_state".into(),
                message: format!("unexpected app state {}", value),
            })
    }

    fn terminate_app(&mut self, package: &str) -> PilotResult<bool> {
        let body = json!({ "appId": package });
        let value = self.execute(
            Method::POST,
            "appium/device/terminate_app",
            Some(body),
            "terminate_app",
        )?;
        Ok(value.as_bool().unwrap_or(false))
    }

    fn quit(&mut self) -> PilotResult<()> {
        if self.closed {
            return Ok(());
        }
        self.execute(Method::DELETE, "", None, "quit")?;
        self.closed = true;
        info!(session_id = %self.session_id, "driver session closed");
        Ok(())
    }
}

impl Drop for RemoteDriver {
    fn drop(&mut self) {
        // Best-effort cleanup
        if let Err(e) = self.quit() {
            warn!(error = %e, "failed to close driver session");
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Decode a W3C response, turning error payloads into `PilotError::Driver`.
fn read_wire(response: reqwest::blocking::Response, command: &str) -> PilotResult<WireResponse> {
    let status = response.status();
    let text = response.text()?;
    decode_wire(status.as_u16(), &text, command)
}

/// Decode a response body given its HTTP status.
///
/// Error statuses always become `PilotError::Driver`, whether or not the
/// body is a W3C error payload.
pub fn decode_wire(status: u16, body: &str, command: &str) -> PilotResult<WireResponse> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<WireResponse>(body)
            .ok()
            .and_then(|wire| serde_json::from_value::<WireError>(wire.value).ok())
            .map(|err| format!("{}: {}", err.error, err.message))
            .unwrap_or_else(|| format!("HTTP {}: {}", status, body.trim()));
        return Err(PilotError::Driver {
            command: command.to_string(),
            message,
        });
    }

    serde_json::from_str(body).map_err(|e| PilotError::JsonParse {
        context: format!("{} response (status {})", command, status),
        source: e,
    })
}

/// `GET /status` build version, if the server reports one.
fn fetch_server_version(client: &Client, base_url: &str) -> Option<String> {
    let response = match client.get(format!("{}/status", base_url)).send() {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "could not query driver status");
            return None;
        }
    };
    let wire = read_wire(response, "status").ok()?;
    wire.value["build"]["version"].as_str().map(str::to_string)
}
