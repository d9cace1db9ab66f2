pub mod hybrid;
pub mod index;
pub mod lexical;
pub mod semantic;

pub use hybrid::{HybridRetriever, RetrievalMethod, RetrievalResult};
pub use index::Index;
pub use semantic::Degradation;
