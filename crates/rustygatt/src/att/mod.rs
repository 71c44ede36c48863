//! Attribute Protocol (ATT) client-side definitions
//!
//! Opcodes, status codes and the PDU codec used by the session controller.
//! Only the PDUs a GATT client sends or receives are modelled here.

pub mod codec;
pub mod constants;
pub mod error;

pub use self::codec::*;
pub use self::constants::*;
pub use self::error::{AttError, AttErrorCode, AttResult};
