//! Generated protobuf bindings for the SSL-Vision and referee box wire formats.
//!
//! The schemas live in `src/protos` and are compiled by `build.rs`.

include!(concat!(env!("OUT_DIR"), "/protos/mod.rs"));

pub use protobuf::{self, EnumOrUnknown, Message, MessageField};
