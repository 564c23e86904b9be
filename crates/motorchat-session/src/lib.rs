//! motorchat-session: client-side runtime for a streamed chat session
//!
//! This crate reconstructs partially-delivered bot replies into coherent
//! messages and keeps multiple conversation threads consistent despite
//! out-of-order or interleaved delivery. The [`SessionController`] wires a
//! [`Channel`] (live streaming connection), a [`ConversationRegistry`]
//! (which thread is active), the [`Assembler`] (fragment-to-message state
//! machine), and a [`HistoryLoader`] (persisted turns) into one
//! run-to-completion event loop.

pub mod assembler;
pub mod channel;
pub mod error;
pub mod events;
pub mod history;
pub mod registry;
pub mod session;

pub use assembler::{Assembler, NormalizedReply, ReplyState, normalize};
pub use channel::{Channel, ChannelEvent, WebSocketChannel};
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use history::{HistoryLoader, RestHistoryLoader};
pub use registry::{ConversationRegistry, RemovalOutcome};
pub use session::SessionController;
