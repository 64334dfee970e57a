//! Command-line assembly for iperf3 invocations.
//!
//! Keyword arguments arrive from automation frameworks where everything may
//! be text, so the boolean-like and scalar fields accept both native JSON
//! values and their textual forms. Validation happens here, before any
//! process is spawned; address syntax is deliberately not checked (iperf3
//! rejects bad values itself).

use std::fmt;

use serde::Deserialize;

use crate::KeywordError;

/// A boolean-like keyword argument: a native bool, or a string whose
/// lowercase form is exactly `true` or `false`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum BoolArg {
    Native(bool),
    Text(String),
}

impl Default for BoolArg {
    fn default() -> Self {
        BoolArg::Native(false)
    }
}

impl From<bool> for BoolArg {
    fn from(value: bool) -> Self {
        BoolArg::Native(value)
    }
}

impl BoolArg {
    /// Coerce to a plain bool; anything not bool-like is an invalid argument.
    pub fn coerce(&self) -> Result<bool, KeywordError> {
        match self {
            BoolArg::Native(value) => Ok(*value),
            BoolArg::Text(text) => match text.to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(KeywordError::InvalidArgument {
                    reason: format!("value not bool-like: {text:?}"),
                }),
            },
        }
    }
}

/// A scalar keyword argument rendered into its argv token verbatim, whether
/// it arrived as an integer or as text (`"5M"`, `"0x34"`, `"af21"`, ...).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Text(String),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Int(value) => write!(f, "{value}"),
            Scalar::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_owned())
    }
}

impl From<i64> for Scalar {
    fn from(value: i64) -> Self {
        Scalar::Int(value)
    }
}

/// Arguments for the server-mode keyword.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerOptions {
    /// Port to listen on; unset (or zero) keeps the iperf3 default.
    pub server_port: Option<u16>,
    /// IPv4/IPv6 address to bind to; unset listens on all interfaces.
    pub bind_address: Option<String>,
}

/// Arguments for the client-mode keyword.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientOptions {
    /// IPv4/IPv6 address of the peer server. Required.
    pub server_address: String,
    /// Port to connect to; unset (or zero) keeps the iperf3 default.
    pub server_port: Option<u16>,
    /// IPv4/IPv6 address to bind the client side to.
    pub bind_address: Option<String>,
    /// `tcp` or `udp`.
    pub protocol: String,
    /// Seconds to transmit for.
    pub duration: u64,
    /// Number of parallel client streams.
    pub num_streams: Option<u32>,
    /// Reverse the test direction (server sends to client).
    pub reverse: BoolArg,
    /// Target bitrate, `n[KM]`; `"0"` disables the limit.
    pub bitrate: Option<Scalar>,
    /// Number of bytes to transmit instead of a duration, `n[KM]`.
    pub num_bytes: Option<Scalar>,
    /// Run the test in both directions at once.
    pub bidir: BoolArg,
    /// IP type-of-service value, decimal/octal/hex forms accepted.
    pub tos: Option<Scalar>,
    /// IP DSCP bits, numeric or symbolic.
    pub dscp: Option<Scalar>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            server_address: String::new(),
            server_port: None,
            bind_address: None,
            protocol: "tcp".to_owned(),
            duration: 10,
            num_streams: None,
            reverse: BoolArg::default(),
            bitrate: None,
            num_bytes: None,
            bidir: BoolArg::default(),
            tos: None,
            dscp: None,
        }
    }
}

/// Render the argv for a server-mode invocation.
pub fn server_args(options: &ServerOptions) -> Vec<String> {
    let mut args = vec!["-s".to_owned(), "-J".to_owned()];

    if let Some(port) = options.server_port.filter(|port| *port > 0) {
        args.push("-p".to_owned());
        args.push(port.to_string());
    }
    if let Some(address) = &options.bind_address {
        args.push("-B".to_owned());
        args.push(address.clone());
    }

    args
}

/// Render the argv for a client-mode invocation, validating the protocol
/// and boolean-like fields first.
pub fn client_args(options: &ClientOptions) -> Result<Vec<String>, KeywordError> {
    if options.server_address.is_empty() {
        return Err(KeywordError::InvalidArgument {
            reason: "server_address is required".to_owned(),
        });
    }

    let mut args = vec![
        "-J".to_owned(),
        "-c".to_owned(),
        options.server_address.clone(),
    ];

    if let Some(port) = options.server_port.filter(|port| *port > 0) {
        args.push("-p".to_owned());
        args.push(port.to_string());
    }
    if let Some(address) = &options.bind_address {
        args.push("-B".to_owned());
        args.push(address.clone());
    }

    match options.protocol.as_str() {
        "tcp" => {}
        "udp" => args.push("-u".to_owned()),
        other => {
            return Err(KeywordError::InvalidArgument {
                reason: format!("unsupported protocol: {other}"),
            })
        }
    }

    args.push("--time".to_owned());
    args.push(options.duration.to_string());

    if let Some(streams) = options.num_streams {
        args.push("--parallel".to_owned());
        args.push(streams.to_string());
    }
    if options.reverse.coerce()? {
        args.push("--reverse".to_owned());
    }
    if let Some(bitrate) = &options.bitrate {
        args.push("-b".to_owned());
        args.push(bitrate.to_string());
    }
    if let Some(num_bytes) = &options.num_bytes {
        args.push("--bytes".to_owned());
        args.push(num_bytes.to_string());
    }
    if options.bidir.coerce()? {
        args.push("--bidir".to_owned());
    }
    if let Some(tos) = &options.tos {
        args.push("--tos".to_owned());
        args.push(tos.to_string());
    }
    if let Some(dscp) = &options.dscp {
        args.push("--dscp".to_owned());
        args.push(dscp.to_string());
    }

    Ok(args)
}
