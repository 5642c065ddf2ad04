use serde::{Deserialize, Serialize};

use crate::domain::{Code, CodeChannel, MessageType};

/// Protocol version announced in the init message.
pub const PROTOCOL_VERSION: u32 = 12;
/// Oldest server protocol version that still understands intercept init messages.
pub const MIN_PROTOCOL_VERSION: u32 = 11;
pub const DEFAULT_SOCKET_PATH: &str = "/run/dsf/dcs.sock";

/// First message the server sends on every new connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInitMessage {
    pub version: u32,
    #[serde(default)]
    pub id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionMode {
    Intercept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterceptionMode {
    /// Before the code is processed by the controller.
    Pre,
    Post,
    Executed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptInitMessage {
    pub mode: ConnectionMode,
    pub version: u32,
    pub interception_mode: InterceptionMode,
    pub channels: Vec<CodeChannel>,
    pub filters: Vec<String>,
    pub priority_codes: bool,
    pub auto_flush: bool,
}

impl InterceptInitMessage {
    pub fn new(
        interception_mode: InterceptionMode,
        channels: &[CodeChannel],
        filters: &[&str],
    ) -> Self {
        Self {
            mode: ConnectionMode::Intercept,
            version: PROTOCOL_VERSION,
            interception_mode,
            channels: channels.to_vec(),
            filters: filters.iter().map(|filter| filter.to_string()).collect(),
            priority_codes: false,
            auto_flush: true,
        }
    }
}

/// Commands an interceptor sends back while it holds an intercepted code.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "command")]
pub enum InterceptCommand<'a> {
    /// Let the controller execute the intercepted code as received.
    Ignore,
    /// Drop the intercepted code.
    Cancel,
    /// Finish the intercepted code with the given message instead of executing it.
    Resolve {
        #[serde(rename = "type")]
        kind: MessageType,
        content: &'a str,
    },
    /// Execute another code; answered with a [`BaseResponse`].
    Code { code: &'a Code },
}

impl InterceptCommand<'_> {
    /// Whether the server answers this command with a [`BaseResponse`].
    pub fn expects_response(&self) -> bool {
        matches!(self, Self::Code { .. })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl BaseResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            result: None,
            error_type: None,
            error_message: None,
        }
    }

    pub fn failed(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error_type: Some(error_type.into()),
            error_message: Some(error_message.into()),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
