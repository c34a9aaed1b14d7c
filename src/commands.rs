use crate::address::{TargetAddress, encode_ipv4_bound, read_target_address};
use crate::error::{ProxyError, read_field};
use crate::protocol::{Command, RSV, ReplyCode, Version};
use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::TcpStream,
};
use tracing::{debug, warn};

/// Replies always carry an IPv4 bound address: 4 + 4 + 2 bytes
pub const REPLY_LEN: usize = 10;

/// read_request reads the client's request and returns the CONNECT destination.
/// Any other command ends the session without a reply
pub async fn read_request<S>(stream: &mut S) -> Result<TargetAddress, ProxyError>
where
    S: AsyncRead + Unpin,
{
    // SOCKS5 request format
    // +----+-----+-------+------+----------+----------+
    // |VER | CMD |  RSV  | ATYP | DST.ADDR | DST.PORT |
    // +----+-----+-------+------+----------+----------+
    // | 1  |  1  | X'00' |  1   | Variable |    2     |
    // +----+-----+-------+------+----------+----------+

    // Instantiate a request buffer & read
    let mut reqbuf = [0u8; 4];
    stream
        .read_exact(&mut reqbuf)
        .await
        .map_err(read_field("request header"))?;

    // Parse
    let version = reqbuf[0];
    let command = reqbuf[1];
    // reqbuf[2] is RSV, not validated
    let atyp = reqbuf[3];

    // Ensure version is 0x05 -> SOCKS5
    if version != Version::SOCKS5 as u8 {
        return Err(ProxyError::ProtocolVersion(version));
    }

    // Check command and route: only CONNECT reads on
    match Command::from_byte(command) {
        Some(Command::Connect) => read_target_address(stream, atyp).await,
        Some(unsupported) => Err(ProxyError::UnsupportedCommand(unsupported)),
        None => Err(ProxyError::UnknownCommand(command)),
    }
}

// ================
// CONNECT COMMAND
// ================

/// connect_target dials the destination. On failure the client is told
/// host unreachable and the dial is not retried
pub async fn connect_target<S>(
    stream: &mut S,
    target: &TargetAddress,
    connect_timeout: Option<Duration>,
) -> Result<TcpStream, ProxyError>
where
    S: AsyncWrite + Unpin,
{
    // Domains are resolved here, not at parse time
    let host = target.host();
    let dial = TcpStream::connect((host.as_str(), target.port));

    let result = match connect_timeout {
        Some(limit) => tokio::time::timeout(limit, dial).await.unwrap_or_else(|_| {
            Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect timed out after {limit:?}"),
            ))
        }),
        None => dial.await,
    };

    match result {
        Ok(outbound) => Ok(outbound),
        Err(e) => {
            // Tell the client, then give up on this session
            if let Err(reply_err) = send_reply(stream, &Reply::host_unreachable()).await {
                warn!("failed to report unreachable target {}: {}", target, reply_err);
            }
            Err(ProxyError::TargetUnreachable {
                target: target.to_string(),
                source: e,
            })
        }
    }
}

// =========
// REPLIES
// =========

/// Reply is a server reply to the client's request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reply {
    pub code: ReplyCode,
    pub bound: SocketAddr,
}

/// Reply implementation block
impl Reply {
    /// success carries the local address of the outbound connection
    pub fn success(bound: SocketAddr) -> Self {
        Self {
            code: ReplyCode::Succeeded,
            bound,
        }
    }

    /// host_unreachable is the fixed failure reply with a zeroed bound address
    pub fn host_unreachable() -> Self {
        Self {
            code: ReplyCode::HostUnreachable,
            bound: SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0)),
        }
    }

    /// encode builds the fixed 10-byte wire form. A bound address that is
    /// not IPv4 (or IPv4-mapped) is sent as 0.0.0.0
    pub fn encode(&self) -> Vec<u8> {
        // SOCKS5 reply format
        // +----+-----+-------+------+----------+----------+
        // |VER | REP |  RSV  | ATYP | BND.ADDR | BND.PORT |
        // +----+-----+-------+------+----------+----------+
        // | 1  |  1  | X'00' |  1   |    4     |    2     |
        // +----+-----+-------+------+----------+----------+

        // Build initial reply vec
        let mut reply = Vec::with_capacity(REPLY_LEN);
        reply.extend_from_slice(&[Version::SOCKS5 as u8, self.code as u8, RSV]);

        // ATYP, BND.ADDR, BND.PORT
        encode_ipv4_bound(self.bound, &mut reply);
        reply
    }
}

/// send_reply writes a reply to the client
pub async fn send_reply<S>(stream: &mut S, reply: &Reply) -> Result<(), ProxyError>
where
    S: AsyncWrite + Unpin,
{
    debug!("sending reply {:?} bound to {}", reply.code, reply.bound);

    stream
        .write_all(&reply.encode())
        .await
        .map_err(ProxyError::ReplyWrite)?;
    stream.flush().await.map_err(ProxyError::ReplyWrite)
}
