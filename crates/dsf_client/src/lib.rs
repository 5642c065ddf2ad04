//! Client side of the controller's code interception IPC.

use async_trait::async_trait;
use shared::domain::{Code, Message, MessageType};

mod cancel;
mod connection;
pub mod error;
pub mod transport;

pub use cancel::CancelToken;
pub use connection::InterceptConnection;
pub use error::DsfError;

/// Operations available while intercepting codes.
///
/// Every intercepted code must be finished with exactly one of
/// [`ignore_code`](Self::ignore_code), [`cancel_code`](Self::cancel_code) or
/// [`resolve_code`](Self::resolve_code); any number of
/// [`perform_code`](Self::perform_code) calls may come first.
#[async_trait]
pub trait CodeInterceptor: Send {
    /// Waits for the next intercepted code. Returns `Ok(None)` once `cancel` fires.
    async fn receive_code(&mut self, cancel: &CancelToken) -> Result<Option<Code>, DsfError>;
    /// Executes the intercepted code unmodified.
    async fn ignore_code(&mut self) -> Result<(), DsfError>;
    /// Drops the intercepted code.
    async fn cancel_code(&mut self) -> Result<(), DsfError>;
    /// Executes an additional code in the context of the intercepted one.
    async fn perform_code(&mut self, code: &Code) -> Result<Option<Message>, DsfError>;
    /// Finishes the intercepted code without executing it.
    async fn resolve_code(&mut self, kind: MessageType, content: &str) -> Result<(), DsfError>;
}
