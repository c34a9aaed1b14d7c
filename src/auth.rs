use crate::config::UserPass;
use crate::error::{ProxyError, read_field};
use crate::protocol::{AuthMethod, AuthStatus, USERPASS_VERSION, Version};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

/// negotiate_auth handles authentication negotiation between the SOCKS server and client
/// and returns the method that was agreed on
pub async fn negotiate_auth<S>(
    stream: &mut S,
    auth_config: Option<&UserPass>,
) -> Result<AuthMethod, ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // ClientHello format
    // +----+----------+----------+
    // |VER | NMETHODS | METHODS  |
    // +----+----------+----------+
    // | 1  |    1     | 1 to 255 |
    // +----+----------+----------+

    // Instantiate handshake buffer & read
    let mut buf = [0u8; 2];
    stream
        .read_exact(&mut buf)
        .await
        .map_err(read_field("greeting header"))?;

    // Parse version and client method count from handshake
    let version = buf[0];
    let n_methods = buf[1];

    // Ensure version is 0x05 -> SOCKS5
    if version != Version::SOCKS5 as u8 {
        return Err(ProxyError::ProtocolVersion(version));
    }

    // A greeting must offer at least one method
    if n_methods == 0 {
        return Err(ProxyError::NoAuthMethods);
    }

    // Read auth methods
    let mut methods = vec![0u8; n_methods as usize];
    stream
        .read_exact(&mut methods)
        .await
        .map_err(read_field("auth methods"))?;

    // Retrieve desired method
    let selected = select_auth_method(&methods, auth_config);

    // ServerChoice method selection reply format
    // +----+--------+
    // |VER | METHOD |
    // +----+--------+
    // | 1  |   1    |
    // +----+--------+
    // Write response to client with selected method, 0xFF if none
    let method_byte = selected.unwrap_or(AuthMethod::NoAcceptable) as u8;
    stream
        .write_all(&[Version::SOCKS5 as u8, method_byte])
        .await?;
    stream.flush().await?;

    let method = selected.ok_or(ProxyError::UnsupportedMethod(methods))?;

    // Credentials are only ever checked here, never skipped once configured
    if let (AuthMethod::UserPass, Some(creds)) = (method, auth_config) {
        authenticate_userpass(stream, creds).await?;
    }

    debug!("client authenticated with method {:?}", method);
    Ok(method)
}

/// authenticate_userpass handles username/password authentication according to the RFC1929
async fn authenticate_userpass<S>(stream: &mut S, server_creds: &UserPass) -> Result<(), ProxyError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    // Client Username/Password Request
    // +----+------+----------+------+----------+
    // |VER | ULEN |  UNAME   | PLEN |  PASSWD  |
    // +----+------+----------+------+----------+
    // | 1  |  1   | 1 to 255 |  1   | 1 to 255 |
    // +----+------+----------+------+----------+

    // Get sub-negotiation version -> 0x01 expected
    let mut ver = [0u8; 1];
    stream
        .read_exact(&mut ver)
        .await
        .map_err(read_field("sub-negotiation version"))?;

    if ver[0] != USERPASS_VERSION {
        return Err(ProxyError::ProtocolVersion(ver[0]));
    }

    // Read username, then password
    let username = read_length_prefixed(stream, "username").await?;
    let password = read_length_prefixed(stream, "password").await?;

    // Validate credentials: byte-exact comparison
    if username != server_creds.username.as_bytes() || password != server_creds.password.as_bytes() {
        // No status reply on failure, the connection is simply dropped
        return Err(ProxyError::Authentication(
            String::from_utf8_lossy(&username).into_owned(),
        ));
    }

    // Username/Password Server response
    // +----+--------+
    // |VER | STATUS |
    // +----+--------+
    // | 1  |   1    |
    // +----+--------+
    stream
        .write_all(&[USERPASS_VERSION, AuthStatus::Success as u8])
        .await?;
    stream.flush().await?;

    Ok(())
}

/// read_length_prefixed reads a one-byte length followed by that many bytes
async fn read_length_prefixed<S>(stream: &mut S, field: &'static str) -> Result<Vec<u8>, ProxyError>
where
    S: AsyncRead + Unpin,
{
    let mut len = [0u8; 1];
    stream.read_exact(&mut len).await.map_err(read_field(field))?;

    let mut value = vec![0u8; len[0] as usize];
    stream.read_exact(&mut value).await.map_err(read_field(field))?;
    Ok(value)
}

/// select_auth_method picks the method from the client's offer.
/// With credentials configured only username/password is acceptable,
/// otherwise only no-auth is
fn select_auth_method(client_methods: &[u8], auth_config: Option<&UserPass>) -> Option<AuthMethod> {
    let wanted = match auth_config {
        Some(_) => AuthMethod::UserPass,
        None => AuthMethod::NoAuth,
    };

    client_methods.contains(&(wanted as u8)).then_some(wanted)
}
