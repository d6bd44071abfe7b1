// rust-radius: a RADIUS (RFC 2865/2866/2869/3162/5176/6929) protocol
// library -- dictionary parsing, packet codec, client request/retry
// handling, and a server dispatch loop. CLI front-ends, server config-file
// loading, and user-supplied authentication/authorization policy are left
// to embedders; see `server::RequestHandler`.

pub mod attr_type;
pub mod client;
pub mod crypto;
pub mod dictionary;
pub mod error;
pub mod host;
pub mod packet;
pub mod server;

pub use attr_type::{DataType, Ipv4Prefix, Ipv6Prefix, Value};
pub use client::{Client, RetryPolicy};
pub use dictionary::{AttrCode, AttributeDef, Dictionary, Vendor};
pub use error::{AuthError, DecodeError, DictionaryError, EncodeError, RadiusError, TimeoutError};
pub use host::{Host, HostMap, HostPorts};
pub use packet::{Packet, PacketCode, RawAttribute};
pub use server::{DispatchEvent, RequestHandler, Server};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
