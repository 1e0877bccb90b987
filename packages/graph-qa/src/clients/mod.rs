//! HTTP clients for the remote services.

pub mod dictionary;
pub mod parser;
pub mod references;
pub mod sparql;

pub use dictionary::HttpTermMapper;
pub use parser::HttpParserService;
pub use references::HttpReferenceResolver;
pub use sparql::SparqlEndpoint;
