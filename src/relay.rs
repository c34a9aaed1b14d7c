//! Duplex byte relay between the client and the target.
//!
//! Each direction is an independent copy loop that retries on connection
//! reset / broken pipe with a linear backoff. The session ends as soon as
//! either direction reaches a terminal outcome; half-close is not kept
//! alive, both directions are torn down together.

use crate::config::RetryPolicy;
use crate::error::{ProxyError, is_connection_reset};
use tokio::io::{self, AsyncRead, AsyncWrite};
use tracing::debug;

/// relay copies bytes both ways until the first direction finishes
pub async fn relay<A, B>(client: A, target: B, policy: RetryPolicy) -> Result<(), ProxyError>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = io::split(client);
    let (mut target_read, mut target_write) = io::split(target);

    let (direction, outcome) = tokio::select! {
        res = pipe("client -> target", &mut client_read, &mut target_write, policy) => {
            ("client -> target", res)
        }
        res = pipe("target -> client", &mut target_read, &mut client_write, policy) => {
            ("target -> client", res)
        }
    };

    // Halves drop here, closing both transports
    finish(direction, outcome)
}

/// pipe runs one direction: copy, and on reset/broken pipe wait and copy again
async fn pipe<R, W>(
    direction: &str,
    reader: &mut R,
    writer: &mut W,
    policy: RetryPolicy,
) -> Result<u64, ProxyError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    for attempt in 0..policy.max_attempts {
        match io::copy(reader, writer).await {
            Ok(bytes) => return Ok(bytes),
            Err(e) if is_connection_reset(&e) => {
                let wait = policy.backoff(attempt);
                debug!(
                    "{}: {} (attempt {}/{}), retrying in {:?}",
                    direction,
                    e,
                    attempt + 1,
                    policy.max_attempts,
                    wait
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(ProxyError::Relay(e)),
        }
    }

    Err(ProxyError::MaxRetriesExceeded(policy.max_attempts))
}

/// finish maps the first terminal outcome to the session result.
/// A reset at this point is a normal peer close, not an error
fn finish(direction: &str, outcome: Result<u64, ProxyError>) -> Result<(), ProxyError> {
    match outcome {
        Ok(bytes) => {
            debug!("{} finished: {} bytes", direction, bytes);
            Ok(())
        }
        Err(ProxyError::Relay(e)) if is_connection_reset(&e) => {
            debug!("{} closed by peer: {}", direction, e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};
    use tokio_test::io::Builder;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_pipe_retries_after_reset() {
        let mut reader = Builder::new()
            .read_error(io::Error::from(ErrorKind::ConnectionReset))
            .read(b"hello")
            .build();
        let mut writer = Builder::new().write(b"hello").build();

        let bytes = pipe("test", &mut reader, &mut writer, fast_policy())
            .await
            .unwrap();
        assert_eq!(bytes, 5);
    }

    #[tokio::test]
    async fn test_pipe_gives_up_after_max_attempts() {
        let mut reader = Builder::new()
            .read_error(io::Error::from(ErrorKind::ConnectionReset))
            .read_error(io::Error::from(ErrorKind::BrokenPipe))
            .read_error(io::Error::from(ErrorKind::ConnectionReset))
            .build();
        let mut writer = Builder::new().build();

        let err = pipe("test", &mut reader, &mut writer, fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::MaxRetriesExceeded(3)));
    }

    #[tokio::test]
    async fn test_pipe_other_errors_are_not_retried() {
        let mut reader = Builder::new()
            .read_error(io::Error::from(ErrorKind::PermissionDenied))
            .build();
        let mut writer = Builder::new().build();

        let err = pipe("test", &mut reader, &mut writer, fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::Relay(ref e) if e.kind() == ErrorKind::PermissionDenied));
    }

    #[test]
    fn test_finish_downgrades_reset() {
        let reset = ProxyError::Relay(io::Error::from(ErrorKind::ConnectionReset));
        assert!(finish("test", Err(reset)).is_ok());

        let aborted = ProxyError::Relay(io::Error::from(ErrorKind::ConnectionAborted));
        assert!(matches!(
            finish("test", Err(aborted)),
            Err(ProxyError::Relay(_))
        ));

        assert!(matches!(
            finish("test", Err(ProxyError::MaxRetriesExceeded(3))),
            Err(ProxyError::MaxRetriesExceeded(3))
        ));
    }

    #[tokio::test]
    async fn test_relay_bidirectional() {
        let (mut client, client_side) = duplex(1024);
        let (mut target, target_side) = duplex(1024);

        let handle =
            tokio::spawn(async move { relay(client_side, target_side, fast_policy()).await });

        client.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        target.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        target.write_all(b"pong").await.unwrap();
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        drop(client);
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_relay_ends_when_first_direction_ends() {
        let (client, client_side) = duplex(1024);
        let (mut target, target_side) = duplex(1024);

        let handle =
            tokio::spawn(async move { relay(client_side, target_side, fast_policy()).await });

        // Only the client closes; the target stays open
        drop(client);
        let result = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(result.is_ok());

        // Target sees its side torn down too
        let mut rest = Vec::new();
        target.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn test_relay_large_transfer() {
        let (mut client, client_side) = duplex(65536);
        let (mut target, target_side) = duplex(65536);

        let handle =
            tokio::spawn(async move { relay(client_side, target_side, fast_policy()).await });

        let payload = vec![0xAB; 50_000];
        client.write_all(&payload).await.unwrap();

        let mut received = vec![0u8; payload.len()];
        target.read_exact(&mut received).await.unwrap();
        assert_eq!(received, payload);

        drop(client);
        drop(target);
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
