use crate::error::{ProxyError, read_field};
use crate::protocol::AddressType;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use tokio::io::{AsyncRead, AsyncReadExt};

/// Address represents a network address or domain to be used as the
/// SOCKS5 target address
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    IPv4(Ipv4Addr),
    DomainName(String),
    IPv6(Ipv6Addr),
}

/// TargetAddress represents a decoded destination: address plus port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddress {
    pub address: Address,
    pub port: u16,
}

/// TargetAddress implementation block
impl TargetAddress {
    pub fn new(address: Address, port: u16) -> Self {
        Self { address, port }
    }

    /// host returns the address as text. Domains are returned verbatim,
    /// resolution happens at dial time
    pub fn host(&self) -> String {
        match &self.address {
            Address::IPv4(ip) => ip.to_string(),
            Address::DomainName(domain) => domain.clone(),
            Address::IPv6(ip) => ip.to_string(),
        }
    }
}

impl From<SocketAddr> for TargetAddress {
    fn from(addr: SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(v4) => Self::new(Address::IPv4(*v4.ip()), v4.port()),
            SocketAddr::V6(v6) => Self::new(Address::IPv6(*v6.ip()), v6.port()),
        }
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.address {
            Address::IPv6(ip) => write!(f, "[{ip}]:{}", self.port),
            _ => write!(f, "{}:{}", self.host(), self.port),
        }
    }
}

/// encode_ipv4_bound appends ATYP | BND.ADDR | BND.PORT for a reply.
/// The address type is always IPv4; IPv4-mapped addresses are unwrapped
/// and any other IPv6 address is zero-filled
pub fn encode_ipv4_bound(bound: SocketAddr, buf: &mut Vec<u8>) {
    let ip = match bound {
        SocketAddr::V4(v4) => *v4.ip(),
        SocketAddr::V6(v6) => v6.ip().to_ipv4_mapped().unwrap_or(Ipv4Addr::UNSPECIFIED),
    };

    buf.push(AddressType::IPv4 as u8);
    buf.extend_from_slice(&ip.octets());
    // Port in BE -> 2 bytes
    buf.extend_from_slice(&bound.port().to_be_bytes());
}

/// read_target_address decodes DST.ADDR and DST.PORT following an already
/// consumed ATYP byte: IPv4, IPv6, or domain name
pub async fn read_target_address<S>(stream: &mut S, atyp: u8) -> Result<TargetAddress, ProxyError>
where
    S: AsyncRead + Unpin,
{
    let address = match AddressType::from_byte(atyp) {
        Some(AddressType::IPv4) => {
            let mut addr = [0u8; 4];
            stream
                .read_exact(&mut addr)
                .await
                .map_err(read_field("IPv4 address"))?;
            Address::IPv4(Ipv4Addr::from(addr))
        }
        Some(AddressType::DomainName) => {
            // First octet in DomainName contains the number of
            // octets to follow
            let mut len = [0u8; 1];
            stream
                .read_exact(&mut len)
                .await
                .map_err(read_field("domain length"))?;

            let mut domain = vec![0u8; len[0] as usize];
            stream
                .read_exact(&mut domain)
                .await
                .map_err(read_field("domain name"))?;
            // Used verbatim as text, a bad name fails at dial time
            let domain = String::from_utf8_lossy(&domain).into_owned();

            Address::DomainName(domain)
        }
        Some(AddressType::IPv6) => {
            let mut addr = [0u8; 16];
            stream
                .read_exact(&mut addr)
                .await
                .map_err(read_field("IPv6 address"))?;
            Address::IPv6(Ipv6Addr::from(addr))
        }
        None => return Err(ProxyError::UnsupportedAddressType(atyp)),
    };

    let mut port_buf = [0u8; 2];
    stream
        .read_exact(&mut port_buf)
        .await
        .map_err(read_field("port"))?;

    Ok(TargetAddress::new(address, u16::from_be_bytes(port_buf)))
}
