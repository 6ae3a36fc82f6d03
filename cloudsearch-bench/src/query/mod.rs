//! Provides the queries sent to the remote document services
//!
//! Available queries
//! - CloudSearch:
//!   - Document service: [Upload a document batch][PostDocumentBatchQuery]
//!   - Search service: [2011 query string search][GetQueryStringSearchQuery],
//!     [2013 typed search][GetTypedSearchQuery]
//! - Elasticsearch:
//!   - Index: [Check existence][HeadIndexQuery], [Create][PutIndexQuery], [Delete][DeleteIndexQuery]
//!   - Document: [Get][GetDocumentQuery], [Index][PutDocumentQuery], [Delete][DeleteDocumentQuery]
//!   - Search: [Search an index][PostIndexSearchQuery]
//!
mod api;
mod elasticsearch;
mod get;
mod post;

pub use api::*;
pub use elasticsearch::*;
pub use get::*;
pub use post::*;
