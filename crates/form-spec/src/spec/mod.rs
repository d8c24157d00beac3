pub mod api;
pub mod field;
pub mod form;
pub mod option;

pub use api::{ApiConfig, HttpMethod, MapOptions};
pub use field::{Column, ColumnKind, Dependency, Field, FieldKind, WILDCARD};
pub use form::{Form, Section};
pub use option::FieldOption;
