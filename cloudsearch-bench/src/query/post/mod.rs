mod post_document_batch;

pub use post_document_batch::*;
