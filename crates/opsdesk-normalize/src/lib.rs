//! Total, side-effect free projections of admin API JSON into typed records.
//!
//! Every field access goes through a picker in [`pick`]; no normalizer in
//! this crate panics or returns an error, whatever the server sends.

pub mod pick;
pub mod schema;

pub use pick::{
    ensure_array, ensure_count_map, ensure_number_map, field, field_any, pick_boolean, pick_count,
    pick_nullable_string, pick_number, pick_ratio, pick_string, rows, sum_counts, unwrap_envelope,
    Nullable,
};
pub use schema::*;
