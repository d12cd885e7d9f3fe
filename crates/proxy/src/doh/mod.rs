//! DoH JSON bridge
//!
//! Consumes the JSON body served by public DoH resolvers and rebuilds the
//! wire-format record sections a stub resolver expects. Pure data
//! transformation; the HTTPS exchange itself lives in `upstream::doh`.

pub mod json;
pub mod reconstruct;

pub use json::{DohAnswer, DohReply};
pub use reconstruct::{build_record, build_sections, Sections};
