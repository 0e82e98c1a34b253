// Copyright (C) 2023 Tristan Gerritsen <tristan@thewoosh.org>
// All Rights Reserved.

//! This crate contains the HTTP model shared by the wire protocol and the
//! request handling layers: messages, headers, byte ranges, and cookies.

pub mod abnf;
pub mod body;
pub mod cookie;
pub mod error;
pub mod header_map;
pub mod header_name;
pub mod header_value;
pub mod media_type;
pub mod method;
pub mod multipart;
pub mod range;
pub mod request;
pub mod request_target;
pub mod response;
pub mod status;
pub mod syntax;
pub mod version;

pub use body::*;
pub use cookie::*;
pub use error::*;
pub use header_map::*;
pub use header_name::*;
pub use header_value::*;
pub use media_type::*;
pub use method::*;
pub use multipart::*;
pub use range::*;
pub use request::*;
pub use request_target::*;
pub use response::*;
pub use status::*;
pub use version::*;
