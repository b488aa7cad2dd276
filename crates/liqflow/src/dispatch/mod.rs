pub mod coordinator;
pub mod ui;

pub use coordinator::{ChannelState, Coordinator, ViewState};
pub use ui::{stdin_lines, Confirm, LineConfirm, Lines, LogNotifier, Notice, NoticeLevel, Notifier};
