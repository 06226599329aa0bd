//! Socket connection management and event fan-out.

pub mod client;
pub mod events;
pub mod fanout;

pub use client::{ConnectionState, SocketClient};
pub use events::{CommentDeleted, EventName, SocketFrame};
pub use fanout::{EventBus, EventSubscription, SocketEvent};
