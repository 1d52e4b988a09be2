pub mod jsonrpc;
pub mod methods;
pub mod router;

use notegraph_core::sqlite::SqliteNoteStore;
use notegraph_core::NoteService;

pub use jsonrpc::{JsonRpcRequest, JsonRpcResponse};
pub use router::dispatch_request;

/// The service every method runs against.
pub type AppService = NoteService<SqliteNoteStore>;
