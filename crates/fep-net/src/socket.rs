//! One half (or the single shared half, in unified-port mode) of a
//! connection: a `TcpStream` plus the framing/schema needed to turn it into
//! a stream of [`fep_core::Message`]s (§4.1, §4.2).

use std::sync::Arc;

use fep_codec::{FramingConfig, Schema};
use fep_core::Message;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;

use crate::error::NetError;

/// A framed TCP socket: reassembles length-prefixed frames from the stream
/// and decodes them against a schema, or encodes+frames outbound messages.
///
/// Read and write halves are independently mutexed so a blocked read (no
/// data yet) never blocks a concurrent write, matching the duplex nature of
/// a TCP socket even though both travel over the same `TcpStream` handle.
pub struct FramedSocket {
    read_half: Mutex<tokio::net::tcp::OwnedReadHalf>,
    write_half: Mutex<tokio::net::tcp::OwnedWriteHalf>,
    framing: FramingConfig,
    schema: Arc<Schema>,
    read_buf: Mutex<Vec<u8>>,
    peer_addr: std::net::SocketAddr,
}

impl FramedSocket {
    pub fn new(stream: TcpStream, framing: FramingConfig, schema: Arc<Schema>) -> std::io::Result<Self> {
        let peer_addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        Ok(FramedSocket {
            read_half: Mutex::new(read_half),
            write_half: Mutex::new(write_half),
            framing,
            schema,
            read_buf: Mutex::new(Vec::new()),
            peer_addr,
        })
    }

    pub fn peer_addr(&self) -> std::net::SocketAddr {
        self.peer_addr
    }

    /// Read the next full frame, decoding it into a `Message`. Suspends
    /// until a full frame is available or the socket closes.
    pub async fn read_message(&self) -> Result<Message, NetError> {
        let mut read_half = self.read_half.lock().await;
        let mut buf = self.read_buf.lock().await;

        loop {
            if let Some((payload, consumed)) = self.framing.split_frame(&buf)? {
                let msg = fep_codec::decode(payload, &self.schema)?;
                buf.drain(..consumed);
                return Ok(msg);
            }

            let mut chunk = [0u8; 4096];
            let n = read_half.read(&mut chunk).await?;
            if n == 0 {
                return Err(NetError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "peer closed the connection",
                )));
            }
            buf.extend_from_slice(&chunk[..n]);
        }
    }

    /// Encode and write one message, framed per `self.framing`.
    pub async fn write_message(&self, msg: &Message) -> Result<(), NetError> {
        let payload = fep_codec::encode(msg, &self.schema)?;
        let framed = self.framing.frame(&payload)?;
        let mut write_half = self.write_half.lock().await;
        write_half.write_all(&framed).await?;
        Ok(())
    }

    pub async fn shutdown(&self) {
        let mut write_half = self.write_half.lock().await;
        let _ = write_half.shutdown().await;
    }
}
