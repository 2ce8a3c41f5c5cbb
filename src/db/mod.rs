//! Vector index clients.
//!
//! - `memory` (default) - process-local cosine index
//! - `pinecone` - managed cloud index over REST
//!
//! Pick one in the `[index]` table of `sophia.toml`:
//! ```toml
//! [index]
//! provider = "pinecone"
//! host = "https://books-abc123.svc.us-east-1.pinecone.io"
//! ```

#![allow(missing_docs)]

// Vector index abstraction layer
pub mod vectorstore;

// Provider implementations
pub mod pinecone;

// Re-exports
pub use pinecone::PineconeIndex;
pub use vectorstore::{InMemoryVectorIndex, VectorIndex, VectorIndexProvider};
