use std::fmt;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 9200;
pub const HOST_DELIMITER: char = '+';

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("Invalid address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },
    #[error("Invalid port '{port}' in '{token}'")]
    InvalidPort { token: String, port: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self, tls: bool) -> String {
        let scheme = if tls { "https" } else { "http" };
        format!("{scheme}://{self}")
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Resolves a connection string such as `loges://10.0.0.1+10.0.0.2:9201`.
///
/// Hosts are joined with `+`. A host may carry its own port; hosts without one
/// use `port_override` when given, else [`DEFAULT_PORT`]. The order of the
/// returned endpoints matches the input.
pub fn resolve_endpoints(
    address: &str,
    port_override: Option<u16>,
) -> Result<Vec<Endpoint>, EndpointError> {
    let invalid = |reason: &str| EndpointError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    let without_scheme = address
        .split_once("://")
        .map_or(address, |(_, rest)| rest)
        .trim();
    let hosts = without_scheme
        .split_once('/')
        .map_or(without_scheme, |(hosts, _)| hosts);

    if hosts.is_empty() {
        return Err(invalid("no hosts given"));
    }

    let default_port = port_override.unwrap_or(DEFAULT_PORT);
    hosts
        .split(HOST_DELIMITER)
        .map(|token| {
            let token = token.trim();
            if token.is_empty() {
                return Err(invalid("empty host between delimiters"));
            }
            parse_token(token, default_port)
        })
        .collect()
}

fn parse_token(token: &str, default_port: u16) -> Result<Endpoint, EndpointError> {
    let (host, port) = if let Some(rest) = token.strip_prefix('[') {
        let (host, after) = rest
            .split_once(']')
            .ok_or_else(|| EndpointError::InvalidAddress {
                address: token.to_string(),
                reason: "unterminated IPv6 literal".to_string(),
            })?;
        (host, after.strip_prefix(':'))
    } else {
        match token.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (token, None),
        }
    };

    if host.is_empty() {
        return Err(EndpointError::InvalidAddress {
            address: token.to_string(),
            reason: "empty host".to_string(),
        });
    }

    let port = match port {
        Some(p) => match p.parse::<u16>() {
            Ok(n) if n > 0 => n,
            _ => {
                return Err(EndpointError::InvalidPort {
                    token: token.to_string(),
                    port: p.to_string(),
                });
            }
        },
        None => default_port,
    };

    Ok(Endpoint::new(host, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_host_defaults_port() {
        let endpoints = resolve_endpoints("loges://10.240.0.1", None).unwrap();
        assert_eq!(endpoints, vec![Endpoint::new("10.240.0.1", 9200)]);
    }

    #[test]
    fn test_multi_host_keeps_order() {
        let endpoints = resolve_endpoints("10.0.0.1+10.0.0.2+10.0.0.3:9200", None).unwrap();
        assert_eq!(
            endpoints,
            vec![
                Endpoint::new("10.0.0.1", 9200),
                Endpoint::new("10.0.0.2", 9200),
                Endpoint::new("10.0.0.3", 9200),
            ]
        );
    }

    #[test]
    fn test_explicit_port_per_host() {
        let endpoints = resolve_endpoints("es-a:9201+es-b", None).unwrap();
        assert_eq!(endpoints[0], Endpoint::new("es-a", 9201));
        assert_eq!(endpoints[1], Endpoint::new("es-b", 9200));
    }

    #[test]
    fn test_port_override_only_fills_missing_ports() {
        let endpoints = resolve_endpoints("es-a+es-b:9300", Some(9201)).unwrap();
        assert_eq!(endpoints[0], Endpoint::new("es-a", 9201));
        assert_eq!(endpoints[1], Endpoint::new("es-b", 9300));
    }

    #[test]
    fn test_path_is_ignored() {
        let endpoints = resolve_endpoints("http://es-a:9201/ignored", None).unwrap();
        assert_eq!(endpoints, vec![Endpoint::new("es-a", 9201)]);
    }

    #[test]
    fn test_ipv6_literal() {
        let endpoints = resolve_endpoints("[::1]:9250+[fe80::1]", None).unwrap();
        assert_eq!(endpoints[0], Endpoint::new("::1", 9250));
        assert_eq!(endpoints[1], Endpoint::new("fe80::1", 9200));
        assert_eq!(endpoints[0].base_url(false), "http://[::1]:9250");
    }

    #[test]
    fn test_empty_address_is_invalid() {
        assert!(matches!(
            resolve_endpoints("", None),
            Err(EndpointError::InvalidAddress { .. })
        ));
        assert!(matches!(
            resolve_endpoints("loges://", None),
            Err(EndpointError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_empty_token_is_invalid() {
        assert!(matches!(
            resolve_endpoints("es-a++es-b", None),
            Err(EndpointError::InvalidAddress { .. })
        ));
        assert!(matches!(
            resolve_endpoints("es-a+", None),
            Err(EndpointError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn test_bad_port_is_invalid() {
        assert!(matches!(
            resolve_endpoints("es-a:http", None),
            Err(EndpointError::InvalidPort { .. })
        ));
        assert!(matches!(
            resolve_endpoints("es-a:0", None),
            Err(EndpointError::InvalidPort { .. })
        ));
    }

    #[test]
    fn test_base_url() {
        let endpoint = Endpoint::new("es-a", 9200);
        assert_eq!(endpoint.base_url(false), "http://es-a:9200");
        assert_eq!(endpoint.base_url(true), "https://es-a:9200");
    }
}
