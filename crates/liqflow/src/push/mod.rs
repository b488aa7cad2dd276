pub mod channel;
pub mod events;
pub mod ws;

pub use channel::{ChannelError, PushChannel};
pub use events::{parse_event, PushEvent};
pub use ws::WsChannel;
