//! Runtime side of a form: remote option lists, autofill and submission
//! for a published [`form_spec::Form`].

pub mod autofill;
pub mod cache;
pub mod config;
pub mod error;
pub mod http;
pub mod resolver;
pub mod session;
pub mod table;

pub use autofill::{ValuePatch, apply_response_map, autofill};
pub use cache::{CacheKey, OptionCache};
pub use config::EngineConfig;
pub use error::{EngineError, FetchError};
pub use http::{ApiRequest, HttpClient, ReqwestClient};
pub use resolver::{OptionResolver, Refresh, fetch_options, preview_options};
pub use session::{PreviewSession, settle};
