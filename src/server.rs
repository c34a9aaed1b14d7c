use crate::{
    address::TargetAddress,
    auth,
    commands::{self, Reply},
    config::ProxyConfig,
    error::ProxyError,
    relay,
};
use anyhow::{Context, Result, bail};
use std::{net::SocketAddr, sync::Arc};
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, debug, error, info, info_span};

/// Socks5Server represents a SOCKS5 server and houses related
/// configuration data
pub struct Socks5Server {
    config: Arc<ProxyConfig>,
    listener: Option<TcpListener>,
}

/// Socks5Server implementation block
impl Socks5Server {
    /// new is a constructor for the Socks5Server type
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config: Arc::new(config),
            listener: None,
        }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// bind to the listen address and return the bound address. Only once
    pub async fn bind(&mut self) -> Result<SocketAddr> {
        if self.listener.is_some() {
            bail!("listener already bound");
        }

        let listen_addr = self.config.listen_addr();
        let listener = TcpListener::bind(&listen_addr)
            .await
            .with_context(|| format!("failed to bind {listen_addr}"))?;
        let addr = listener.local_addr()?;

        info!("SOCKS5 proxy listening on {}", addr);

        self.listener = Some(listener);
        Ok(addr)
    }

    /// run accepts connections forever, one task per connection.
    /// Accept errors are logged and the loop keeps going
    pub async fn run(mut self) -> Result<()> {
        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => {
                self.bind().await?;
                self.listener
                    .take()
                    .context("listener missing after bind")?
            }
        };

        loop {
            let (inbound, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("failed to accept connection: {}", e);
                    continue;
                }
            };

            let session = Session::new(inbound, peer_addr, Arc::clone(&self.config));
            let span = info_span!("session", peer = %peer_addr);

            tokio::spawn(
                async move {
                    debug!("new client");

                    if let Err(e) = session.run().await {
                        error!("session error: {}", e);
                    }
                }
                .instrument(span),
            );
        }
    }
}

/// Session is the per-connection state. The client stream is owned here and
/// the target stream only exists once the dial succeeded; both close on drop
pub struct Session {
    client: TcpStream,
    target: Option<TcpStream>,
    target_addr: Option<TargetAddress>,
    peer_addr: SocketAddr,
    config: Arc<ProxyConfig>,
}

/// Session implementation block
impl Session {
    pub fn new(client: TcpStream, peer_addr: SocketAddr, config: Arc<ProxyConfig>) -> Self {
        Self {
            client,
            target: None,
            target_addr: None,
            peer_addr,
            config,
        }
    }

    /// target_addr is the decoded CONNECT destination, once the request was read
    pub fn target_addr(&self) -> Option<&TargetAddress> {
        self.target_addr.as_ref()
    }

    /// run drives auth -> request -> connect -> reply -> relay in order
    pub async fn run(mut self) -> Result<(), ProxyError> {
        let handshake_timeout = self.config.handshake_timeout;
        let target_addr = match handshake_timeout {
            Some(limit) => tokio::time::timeout(limit, self.handshake())
                .await
                .map_err(|_| ProxyError::HandshakeTimeout(limit))??,
            None => self.handshake().await?,
        };

        info!("CONNECT {} -> {}", self.peer_addr, target_addr);

        let outbound =
            commands::connect_target(&mut self.client, &target_addr, self.config.connect_timeout)
                .await?;
        let bound = outbound.local_addr()?;
        self.target = Some(outbound);

        commands::send_reply(&mut self.client, &Reply::success(bound)).await?;

        let retry = self.config.retry;
        if let Some(target) = self.target.take() {
            relay::relay(self.client, target, retry).await?;
        }

        debug!("session with {} closed", self.peer_addr);
        Ok(())
    }

    /// handshake covers the phases a slow client can stall
    async fn handshake(&mut self) -> Result<TargetAddress, ProxyError> {
        auth::negotiate_auth(&mut self.client, self.config.auth.as_ref()).await?;
        let target_addr = commands::read_request(&mut self.client).await?;
        self.target_addr = Some(target_addr.clone());
        Ok(target_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::config::RetryPolicy;
    use std::net::Ipv4Addr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn session_pair(config: ProxyConfig) -> (TcpStream, Session) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap())
            .await
            .unwrap();
        let (inbound, peer_addr) = listener.accept().await.unwrap();
        (client, Session::new(inbound, peer_addr, Arc::new(config)))
    }

    #[tokio::test]
    async fn test_handshake_records_target_before_dial() {
        let (mut client, mut session) = session_pair(ProxyConfig::default()).await;
        assert!(session.target_addr().is_none());

        client.write_all(&[0x05, 0x01, 0x00]).await.unwrap();
        client
            .write_all(&[0x05, 0x01, 0x00, 0x01, 10, 0, 0, 1, 0x00, 0x50])
            .await
            .unwrap();

        let target_addr = session.handshake().await.unwrap();
        assert_eq!(
            target_addr,
            TargetAddress::new(Address::IPv4(Ipv4Addr::new(10, 0, 0, 1)), 80)
        );
        assert_eq!(session.target_addr(), Some(&target_addr));
        assert!(session.target.is_none());

        let mut resp = [0u8; 2];
        client.read_exact(&mut resp).await.unwrap();
        assert_eq!(resp, [0x05, 0x00]);
    }

    #[test]
    fn test_server_keeps_configured_retry_policy() {
        let retry = RetryPolicy {
            max_attempts: 5,
            base_backoff: Duration::from_millis(10),
        };
        let server = Socks5Server::new(ProxyConfig::new("127.0.0.1", 0).with_retry(retry));

        assert_eq!(server.config().retry.max_attempts, 5);
        assert_eq!(server.config().retry.backoff(1), Duration::from_millis(20));
        assert_eq!(server.config().listen_addr(), "127.0.0.1:0");
    }
}
