//! Adapters between the conversation engine and the outside world: the HTTP
//! webhook, its XML reply envelope, and CSV conversation scripts.

mod envelope;
mod router;
mod script;

pub use envelope::{render_reply, EnvelopeError};
pub use router::{conversation_router, InboundMessage, MessageReply, MessageRequest};
pub use script::{ScriptLine, ScriptReader};
