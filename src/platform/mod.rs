//! Platform-specific terminal integrations.

pub mod key_decoder;
pub mod process_terminal;

pub use key_decoder::{KeyDecoder, DEFAULT_ESCAPE_TIMEOUT};
pub use process_terminal::{
    install_signal_handlers, ModeRestorer, ProcessTerminal, SignalHookGuard, DEFAULT_DEVICE,
};
