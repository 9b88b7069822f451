//! Admin commands received in the control channel

mod handler;
mod parser;

pub use handler::CommandHandler;
pub use parser::{parse, AdminCommand, CommandError, UserRef};
