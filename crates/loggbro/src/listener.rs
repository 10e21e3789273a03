// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Syslog server receiving RFC 3164 and RFC 5424 messages over UDP and TCP.
//!
//! Both transports listen on the same port. UDP datagrams and TCP lines are
//! parsed into [`LogRecord`]s and handed to the scheduler over an unbounded
//! channel, so a slow consumer never pushes back on senders.

use std::net::SocketAddr;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::errors::ListenerError;
use crate::record::LogRecord;

// Largest UDP payload, so a datagram is never truncated by the receive.
const BUFFER_SIZE: usize = 65_535;

/// Longest accepted TCP line; longer lines are skipped.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

pub struct ListenerConfig {
    /// Host to bind to (e.g., "0.0.0.0")
    pub host: String,
    /// Port shared by the UDP and TCP sockets; 0 picks a free port per socket
    pub port: u16,
}

enum BufferReader {
    UdpSocket(UdpSocket),

    /// Replays a fixed datagram
    #[cfg(test)]
    MirrorTest(Vec<u8>, SocketAddr),
}

impl BufferReader {
    async fn read(&self) -> std::io::Result<(Vec<u8>, SocketAddr)> {
        match self {
            BufferReader::UdpSocket(socket) => {
                let mut buf = vec![0; BUFFER_SIZE];
                let (amt, src) = socket.recv_from(&mut buf).await?;
                buf.truncate(amt);
                Ok((buf, src))
            }
            #[cfg(test)]
            BufferReader::MirrorTest(data, src) => Ok((data.clone(), *src)),
        }
    }
}

pub struct SyslogServer {
    cancel_token: CancellationToken,
    records_tx: mpsc::UnboundedSender<LogRecord>,
    buffer_reader: BufferReader,
    tcp_listener: Option<TcpListener>,
}

impl SyslogServer {
    /// Binds both sockets. Failing to bind either one is fatal for the caller.
    pub async fn bind(
        config: &ListenerConfig,
        records_tx: mpsc::UnboundedSender<LogRecord>,
        cancel_token: CancellationToken,
    ) -> Result<SyslogServer, ListenerError> {
        let address = format!("{}:{}", config.host, config.port);

        let socket = UdpSocket::bind(&address)
            .await
            .map_err(|source| ListenerError::Bind {
                transport: "udp",
                address: address.clone(),
                source,
            })?;
        let tcp_listener =
            TcpListener::bind(&address)
                .await
                .map_err(|source| ListenerError::Bind {
                    transport: "tcp",
                    address: address.clone(),
                    source,
                })?;

        info!("syslog: listening on {address} (udp, tcp)");

        Ok(SyslogServer {
            cancel_token,
            records_tx,
            buffer_reader: BufferReader::UdpSocket(socket),
            tcp_listener: Some(tcp_listener),
        })
    }

    pub fn udp_local_addr(&self) -> Option<SocketAddr> {
        match &self.buffer_reader {
            BufferReader::UdpSocket(socket) => socket.local_addr().ok(),
            #[cfg(test)]
            BufferReader::MirrorTest(..) => None,
        }
    }

    pub fn tcp_local_addr(&self) -> Option<SocketAddr> {
        self.tcp_listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
    }

    /// Serves both transports until the cancel token fires.
    pub async fn spin(self) {
        let SyslogServer {
            cancel_token,
            records_tx,
            buffer_reader,
            tcp_listener,
        } = self;

        let udp = async {
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    read = buffer_reader.read() => match read {
                        Ok((buf, src)) => {
                            forward(&records_tx, &buf, src);
                        }
                        Err(e) => error!("syslog-udp: receive failed: {e}"),
                    }
                }
            }
            debug!("syslog-udp: stopped");
        };

        let tcp = async {
            let Some(listener) = tcp_listener else {
                return;
            };
            loop {
                tokio::select! {
                    _ = cancel_token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, peer)) => {
                            debug!("syslog-tcp: connection from {peer}");
                            let records_tx = records_tx.clone();
                            let cancel_token = cancel_token.clone();
                            tokio::spawn(async move {
                                tokio::select! {
                                    _ = cancel_token.cancelled() => {}
                                    res = handle_connection(stream, peer, records_tx) => {
                                        if let Err(e) = res {
                                            debug!("syslog-tcp: connection {peer} closed with error: {e}");
                                        }
                                    }
                                }
                            });
                        }
                        Err(e) => warn!("syslog-tcp: accept failed: {e}"),
                    }
                }
            }
            debug!("syslog-tcp: stopped");
        };

        tokio::join!(udp, tcp);
    }

    /// Receives and forwards a single datagram.
    #[cfg(test)]
    async fn consume_datagram(&self) -> usize {
        match self.buffer_reader.read().await {
            Ok((buf, src)) => forward(&self.records_tx, &buf, src),
            Err(e) => {
                error!("syslog-udp: receive failed: {e}");
                0
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    records_tx: mpsc::UnboundedSender<LogRecord>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream);
    let mut line = Vec::with_capacity(1024);

    loop {
        line.clear();
        let limit = (MAX_MESSAGE_SIZE + 1) as u64;
        let n = (&mut reader).take(limit).read_until(b'\n', &mut line).await?;
        if n == 0 {
            return Ok(());
        }
        if line.len() > MAX_MESSAGE_SIZE && !line.ends_with(b"\n") {
            warn!("syslog-tcp: dropping message from {peer} longer than {MAX_MESSAGE_SIZE} bytes");
            skip_line(&mut reader).await?;
            continue;
        }
        forward(&records_tx, &line, peer);
    }
}

// Consumes input up to and including the next newline.
async fn skip_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> std::io::Result<()> {
    loop {
        let buf = reader.fill_buf().await?;
        if buf.is_empty() {
            return Ok(());
        }
        if let Some(pos) = buf.iter().position(|&b| b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = buf.len();
        reader.consume(len);
    }
}

/// Parses every non-empty line of `data` and sends the records on.
/// Returns how many records were forwarded.
fn forward(records_tx: &mpsc::UnboundedSender<LogRecord>, data: &[u8], src: SocketAddr) -> usize {
    let text = String::from_utf8_lossy(data);
    trace!("Received message: {} from {}", text, src);

    let mut forwarded = 0;
    for line in text.split('\n') {
        let line = line.trim_end_matches(['\r', '\0']);
        if line.trim().is_empty() {
            continue;
        }
        if let Err(e) = records_tx.send(LogRecord::parse(line, Some(src))) {
            error!("Failed to hand record to the scheduler: {e}");
            break;
        }
        forwarded += 1;
    }
    forwarded
}
