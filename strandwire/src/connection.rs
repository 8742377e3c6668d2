// Async connection: runs the handshake over a byte stream, then exchanges
// encrypted transport messages.
//
//   connect:  hello ->, <- server hello, finish -> (+ finish_init)
//   accept:   <- hello, server hello ->, <- finish (+ finish_init)
//
// During the handshake frames are pulled one at a time, so transport frames
// that arrive coalesced with the last handshake frame stay buffered until the
// keys are split.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use strandnoise::cert::unix_now;
use strandnoise::handshake::messages::{ClientFinish, ClientHello, HandshakeMessage};
use strandnoise::{Initiator, KeyPair, Responder};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

use crate::codec::MessageCodec;
use crate::config::WireConfig;
use crate::error::{Result, WireError};
use crate::framer::{Framer, Inbound};

pub struct Connection<S, C: MessageCodec> {
    stream: S,
    framer: Framer<C>,
    read_buf: Vec<u8>,
    remote_static: [u8; 32],
}

impl<S, C> Connection<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: MessageCodec,
{
    /// Run the initiator side of the handshake, sending `login` encrypted in
    /// the final handshake message.
    pub async fn connect(
        stream: S,
        initiator: &Initiator,
        config: &WireConfig,
        codec: C,
        login: &[u8],
    ) -> Result<Self> {
        config.validate()?;
        let framer = Framer::new(initiator.new_state(&config.noise), codec, config);
        let mut conn = Self::from_parts(stream, framer, config);

        let handshake = conn.initiator_handshake(initiator, login);
        with_deadline(config.handshake_timeout(), handshake).await?;
        info!(remote = %hex(&conn.remote_static), "connected");
        Ok(conn)
    }

    /// Run the responder side of the handshake. Returns the connection and the
    /// initiator's login payload.
    pub async fn accept(
        stream: S,
        responder: &Responder,
        config: &WireConfig,
        codec: C,
    ) -> Result<(Self, Vec<u8>)> {
        config.validate()?;
        let framer = Framer::new(responder.new_state(&config.noise), codec, config);
        let mut conn = Self::from_parts(stream, framer, config);

        let handshake = conn.responder_handshake(responder);
        let login = with_deadline(config.handshake_timeout(), handshake).await?;
        info!(remote = %hex(&conn.remote_static), "accepted");
        Ok((conn, login))
    }

    fn from_parts(stream: S, framer: Framer<C>, config: &WireConfig) -> Self {
        Self {
            stream,
            framer,
            read_buf: vec![0u8; config.read_buffer_size],
            remote_static: [0u8; 32],
        }
    }

    async fn initiator_handshake(&mut self, initiator: &Initiator, login: &[u8]) -> Result<()> {
        let result: Result<()> = async {
            self.write_frame(&initiator.hello().encode()).await?;

            let body = self.read_handshake_frame().await?;
            let message = HandshakeMessage::decode(&body)?;
            let local_ephemeral = KeyPair::generate();
            let state = self.framer.state_mut();
            let accepted = initiator.verify_server_hello(
                state,
                &message,
                &local_ephemeral,
                unix_now(),
            )?;
            let finish = initiator.finish(state, accepted.response, login)?;

            let frame = self.framer.encode(&finish.encode()?)?;
            self.framer.state_mut().finish_init()?;
            self.write_raw(&frame).await?;

            self.remote_static = accepted.certificate.key;
            debug!(serial = accepted.certificate.serial, "initiator handshake complete");
            Ok(())
        }
        .await;
        self.poison_on_error(result)
    }

    async fn responder_handshake(&mut self, responder: &Responder) -> Result<Vec<u8>> {
        let result: Result<Vec<u8>> = async {
            let body = self.read_handshake_frame().await?;
            let hello = ClientHello::decode(&body)?;
            let local_ephemeral = KeyPair::generate();
            let message =
                responder.process_hello(self.framer.state_mut(), &hello, &local_ephemeral)?;
            self.write_frame(&message.encode()?).await?;

            let body = self.read_handshake_frame().await?;
            let finish = ClientFinish::decode(&body)?;
            let login =
                responder.process_finish(self.framer.state_mut(), &finish, &local_ephemeral)?;
            self.framer.state_mut().finish_init()?;

            self.remote_static = hello.ephemeral;
            debug!(login_len = login.len(), "responder handshake complete");
            Ok(login)
        }
        .await;
        self.poison_on_error(result)
    }

    fn poison_on_error<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            self.framer.state_mut().poison();
        }
        result
    }

    /// Encrypt and send one message.
    pub async fn send(&mut self, payload: &[u8]) -> Result<()> {
        if !self.framer.is_finished() {
            return Err(WireError::UnexpectedFrame("pre-handshake transport"));
        }
        self.write_frame(payload).await
    }

    /// Receive the next message. `None` means the peer closed the stream on
    /// a frame boundary.
    pub async fn recv(&mut self) -> Result<Option<C::Message>> {
        loop {
            match self.framer.decode_one()? {
                Some(Inbound::Message(message)) => return Ok(Some(message)),
                Some(Inbound::Handshake(_)) => {
                    return Err(WireError::UnexpectedFrame("handshake"));
                }
                None => {}
            }
            if self.fill().await? == 0 {
                let buffered = self.framer.buffered();
                if buffered == 0 {
                    return Ok(None);
                }
                return Err(WireError::Truncated { buffered });
            }
        }
    }

    /// The peer's static key: the certified server key on the initiator, the
    /// initiator's hello key on the responder.
    pub fn remote_static(&self) -> [u8; 32] {
        self.remote_static
    }

    pub fn framer(&self) -> &Framer<C> {
        &self.framer
    }

    /// Flush and shut down the write half.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.stream.shutdown().await?;
        Ok(())
    }

    async fn read_handshake_frame(&mut self) -> Result<Bytes> {
        loop {
            match self.framer.decode_one()? {
                Some(Inbound::Handshake(body)) => return Ok(body),
                Some(Inbound::Message(_)) => return Err(WireError::UnexpectedFrame("transport")),
                None => {}
            }
            if self.fill().await? == 0 {
                return Err(WireError::ConnectionClosed);
            }
        }
    }

    async fn fill(&mut self) -> Result<usize> {
        let n = self.stream.read(&mut self.read_buf).await?;
        self.framer.push(&self.read_buf[..n]);
        Ok(n)
    }

    async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let frame = self.framer.encode(payload)?;
        self.write_raw(&frame).await
    }

    async fn write_raw(&mut self, frame: &[u8]) -> Result<()> {
        self.stream.write_all(frame).await?;
        self.stream.flush().await?;
        Ok(())
    }
}

impl<S, C: MessageCodec> std::fmt::Debug for Connection<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("framer", &self.framer)
            .field("remote_static", &hex(&self.remote_static))
            .finish_non_exhaustive()
    }
}

async fn with_deadline<T>(
    limit: Option<Duration>,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| WireError::HandshakeTimeout(limit))?,
        None => fut.await,
    }
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
