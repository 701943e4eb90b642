mod event;

pub use event::ProtocolEvent;
