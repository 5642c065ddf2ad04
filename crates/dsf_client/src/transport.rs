use serde::{de::DeserializeOwned, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::DsfError;

const READ_CHUNK: usize = 4096;

/// Back-to-back JSON documents over a byte stream.
///
/// The controller does not delimit messages, so frames are found by parsing
/// one complete document at a time. Unconsumed bytes stay in `buffer`, which
/// keeps [`JsonStream::read`] safe to drop mid-await.
pub struct JsonStream<S> {
    stream: S,
    buffer: Vec<u8>,
}

impl<S> JsonStream<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: Vec::with_capacity(READ_CHUNK),
        }
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    pub async fn read<T: DeserializeOwned>(&mut self) -> Result<T, DsfError> {
        loop {
            if let Some(message) = self.try_decode()? {
                return Ok(message);
            }
            self.buffer.reserve(READ_CHUNK);
            if self.stream.read_buf(&mut self.buffer).await? == 0 {
                return Err(DsfError::ConnectionClosed);
            }
        }
    }

    pub async fn write<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<(), DsfError> {
        let payload = serde_json::to_vec(message)?;
        self.stream.write_all(&payload).await?;
        self.stream.flush().await?;
        Ok(())
    }

    fn try_decode<T: DeserializeOwned>(&mut self) -> Result<Option<T>, DsfError> {
        let Some(start) = self
            .buffer
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
        else {
            self.buffer.clear();
            return Ok(None);
        };

        let mut documents =
            serde_json::Deserializer::from_slice(&self.buffer[start..]).into_iter::<T>();
        match documents.next() {
            Some(Ok(message)) => {
                let consumed = start + documents.byte_offset();
                self.buffer.drain(..consumed);
                Ok(Some(message))
            }
            Some(Err(err)) if err.is_eof() => Ok(None),
            Some(Err(err)) => Err(err.into()),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
