//! Resource wrappers over the executor.
//!
//! # Design
//! Each resource is a capability trait with one implementation holding a
//! shared `Arc<Executor>`. A wrapper only builds its paths and typed
//! payloads; retry, status classification and error decoding all happen in
//! the executor. Path segments built from caller input go through
//! [`segment`] or [`dataset_segment`] before they are joined.

pub mod auth;
pub mod boards;
pub mod burn_alerts;
pub mod columns;
pub mod datasets;
pub mod derived_columns;
pub mod markers;
pub mod queries;
pub mod query_results;
pub mod recipients;
pub mod slos;
pub mod triggers;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Dataset slug addressing every dataset in an environment.
pub const ALL_DATASETS: &str = "__all__";

const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Percent-encode `value` as a single path segment.
///
/// Empty, `.` and `..` values pass through and are rejected by the executor.
pub fn segment(value: &str) -> String {
    utf8_percent_encode(value, PATH_SEGMENT).to_string()
}

/// Encode a dataset name for use in a path.
///
/// Slashes become dashes, matching how the API slugs dataset names.
pub fn dataset_segment(dataset: &str) -> String {
    segment(&dataset.replace('/', "-"))
}

/// Append a single query parameter to `path`.
pub(crate) fn with_param(path: &str, key: &str, value: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair(key, value)
        .finish();
    format!("{path}?{query}")
}
