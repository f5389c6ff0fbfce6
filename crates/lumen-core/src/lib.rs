//! All retrieval logic independent of how the app is run (CLI or desktop shell).
//!
//! Documents are split into overlapping word windows, weighted with TF-IDF
//! over the whole corpus, and ranked by cosine similarity to build prompt
//! context. Lumen stores only config and the index snapshot in its own app
//! data directory (see [app_data]).

pub mod app_data;
pub mod chunks;
pub mod config;
pub mod documents;
pub mod extract;
pub mod index;
pub mod search;
pub mod snapshot;
pub mod store;
pub mod tokenize;
pub mod vectorize;
pub mod vocabulary;

pub use app_data::app_data_dir;
pub use chunks::{Chunk, Chunker, ChunkerConfig, Metadata, DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE};
pub use config::{
    get_index_dir, load_config, save_config, set_index_dir, set_index_dir_in, Config, ConfigError,
};
pub use documents::{discover_files, Document, DocumentReader, IngestError};
pub use extract::{ExtractError, Extractor, ExtractorRegistry};
pub use index::{source_for_path, DirectoryReport, IndexSettings, RagIndex};
pub use search::{format_context, SearchOptions, SearchResult};
pub use snapshot::{PersistError, SnapshotStore};
pub use store::{IndexStats, IndexStore};
pub use tokenize::tokenize;
pub use vectorize::{cosine_similarity, vectorize, SparseVector};
pub use vocabulary::Vocabulary;
