mod get_query_string_search;
mod get_typed_search;

pub use get_query_string_search::*;
pub use get_typed_search::*;
