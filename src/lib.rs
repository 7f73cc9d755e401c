#![forbid(unsafe_code)]
pub mod config;
pub mod crs;
pub mod decode;
pub mod dms;
pub mod encode;
pub mod error;
pub mod external;
pub mod navigator;
pub mod regex_patterns;
pub mod scale_zoom;
pub mod server;
pub mod session;
pub mod templates;
pub mod theme;
pub mod transform;
pub mod view_state;

pub use crate::crs::Crs;
pub use crate::decode::{Decoded, UrlShape, decode, decode_query};
pub use crate::encode::PermalinkEncoder;
pub use crate::error::{PermalinkError, PermalinkResult};
pub use crate::navigator::{NavigationOutcome, Navigator};
pub use crate::session::{InMemorySession, MapSession};
pub use crate::theme::ThemeToken;
pub use crate::view_state::ViewState;
