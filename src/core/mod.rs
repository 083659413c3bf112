//! Terminal-independent types: keys, events, output commands and the terminal trait.

pub mod input;
pub mod input_event;
pub mod output;
pub mod terminal;
