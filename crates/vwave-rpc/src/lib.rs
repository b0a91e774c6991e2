//! JSON-RPC access to the chain for the VWAVE client.
//!
//! - `RpcTransport`: the request seam, with HTTP and mock implementations
//! - `FallbackTransport`: primary-with-timeout, then one fallback call
//! - `ContractReader`: typed `eth_call` over the `abi` interfaces

pub mod abi;
pub mod error;
pub mod fallback;
pub mod reader;
pub mod transport;

pub use error::{RpcError, RpcResult};
pub use fallback::{FallbackTransport, DEFAULT_PRIMARY_TIMEOUT};
pub use reader::{parse_bytes, parse_quantity, to_quantity, CallRequest, ContractReader};
pub use transport::{BoxFuture, DynTransport, HttpTransport, MockTransport, RpcTransport};
