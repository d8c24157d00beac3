#![allow(missing_docs)]

pub mod answers;
pub mod designer;
pub mod draft;
pub mod error;
pub mod expr;
pub mod options;
pub mod render;
pub mod spec;
pub mod submit;
pub mod validate;
pub mod values;
pub mod visibility;

pub use answers::{Submission, ValidationError, ValidationResult};
pub use designer::Designer;
pub use draft::FormDraft;
pub use error::FormError;
pub use expr::{Placeholder, interpolate, interpolate_url};
pub use options::{
    OptionLookup, OptionState, StaticOptions, dependencies_ready, dependency_values,
    extract_items, has_blank_param, map_options, request_signature,
};
pub use render::{RenderPayload, build_preview, render_json_ui, render_text};
pub use spec::form::form_schema;
pub use spec::{
    ApiConfig, Column, ColumnKind, Dependency, Field, FieldKind, FieldOption, Form, HttpMethod,
    MapOptions, Section, WILDCARD,
};
pub use submit::submit;
pub use validate::{validate, validate_field};
pub use values::{ValueEnv, is_blank, scalar_text};
pub use visibility::{VisibilityMap, is_cell_visible, is_visible, resolve_visibility, visible_fields};
