use std::path::Path;

use async_trait::async_trait;
use shared::{
    domain::{Code, CodeChannel, Message, MessageType},
    protocol::{
        BaseResponse, InterceptCommand, InterceptInitMessage, InterceptionMode, ServerInitMessage,
        MIN_PROTOCOL_VERSION,
    },
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::UnixStream,
};
use tracing::{debug, info};

use crate::{error::DsfError, transport::JsonStream, CancelToken, CodeInterceptor};

/// Intercepting session with the controller.
pub struct InterceptConnection<S = UnixStream> {
    stream: JsonStream<S>,
    server_version: u32,
    connection_id: i64,
}

impl InterceptConnection<UnixStream> {
    pub async fn connect(
        socket_path: impl AsRef<Path>,
        mode: InterceptionMode,
        channels: &[CodeChannel],
        filters: &[&str],
    ) -> Result<Self, DsfError> {
        let socket_path = socket_path.as_ref();
        debug!(socket = %socket_path.display(), "dsf: connecting");
        let stream = UnixStream::connect(socket_path).await?;
        Self::handshake(stream, InterceptInitMessage::new(mode, channels, filters)).await
    }
}

impl<S> InterceptConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Runs the init exchange on an already open stream.
    pub async fn handshake(stream: S, init: InterceptInitMessage) -> Result<Self, DsfError> {
        let mut stream = JsonStream::new(stream);

        let server_init: ServerInitMessage = stream.read().await?;
        if server_init.version < MIN_PROTOCOL_VERSION {
            return Err(DsfError::IncompatibleVersion {
                server: server_init.version,
                required: MIN_PROTOCOL_VERSION,
            });
        }

        stream.write(&init).await?;
        let response: BaseResponse = stream.read().await?;
        check_response(&response)?;

        info!(
            server_version = server_init.version,
            connection_id = server_init.id,
            interception_mode = ?init.interception_mode,
            channels = ?init.channels,
            filters = ?init.filters,
            "dsf: intercept connection established"
        );

        Ok(Self {
            stream,
            server_version: server_init.version,
            connection_id: server_init.id,
        })
    }

    pub fn server_version(&self) -> u32 {
        self.server_version
    }

    pub fn connection_id(&self) -> i64 {
        self.connection_id
    }

    async fn send(&mut self, command: InterceptCommand<'_>) -> Result<Option<BaseResponse>, DsfError> {
        self.stream.write(&command).await?;
        if !command.expects_response() {
            return Ok(None);
        }
        let response: BaseResponse = self.stream.read().await?;
        check_response(&response)?;
        Ok(Some(response))
    }
}

fn check_response(response: &BaseResponse) -> Result<(), DsfError> {
    if response.success {
        return Ok(());
    }
    Err(DsfError::Rejected {
        error_type: response.error_type.clone().unwrap_or_default(),
        message: response.error_message.clone().unwrap_or_default(),
    })
}

fn code_result(result: Option<serde_json::Value>) -> Result<Option<Message>, DsfError> {
    match result {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(content)) => Ok(Some(Message {
            kind: MessageType::Success,
            content,
        })),
        Some(value @ serde_json::Value::Object(_)) => Ok(Some(serde_json::from_value(value)?)),
        Some(other) => Err(DsfError::UnexpectedResponse(format!(
            "code result must be a message, got {other}"
        ))),
    }
}

#[async_trait]
impl<S> CodeInterceptor for InterceptConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn receive_code(&mut self, cancel: &CancelToken) -> Result<Option<Code>, DsfError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(None),
            code = self.stream.read::<Code>() => code.map(Some),
        }
    }

    async fn ignore_code(&mut self) -> Result<(), DsfError> {
        self.send(InterceptCommand::Ignore).await.map(|_| ())
    }

    async fn cancel_code(&mut self) -> Result<(), DsfError> {
        self.send(InterceptCommand::Cancel).await.map(|_| ())
    }

    async fn perform_code(&mut self, code: &Code) -> Result<Option<Message>, DsfError> {
        let response = self
            .send(InterceptCommand::Code { code })
            .await?
            .ok_or_else(|| DsfError::UnexpectedResponse("missing code response".into()))?;
        code_result(response.result)
    }

    async fn resolve_code(&mut self, kind: MessageType, content: &str) -> Result<(), DsfError> {
        self.send(InterceptCommand::Resolve { kind, content })
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
#[path = "tests/connection_tests.rs"]
mod tests;
