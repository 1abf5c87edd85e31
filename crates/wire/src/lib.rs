// SPDX-License-Identifier: MIT

//! sk-wire: the control-socket line protocol.
//!
//! Requests are `\n`-terminated command lines; responses are an
//! exit-code byte followed by a UTF-8 body and a trailing NUL.

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod codec;
pub mod error;
pub mod request;
pub mod response;
pub mod types;

pub use codec::{parse_line, read_request, tokenize, write_response};
pub use error::ProtocolError;
pub use request::Request;
pub use response::{ExitCode, Response};
pub use types::{RuntimeDetail, RuntimeSummary};
