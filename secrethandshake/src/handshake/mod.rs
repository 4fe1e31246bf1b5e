// Handshake module declarations

pub mod context;
pub mod derive;
pub mod io;
pub mod messages;
pub mod protocol;
pub mod state;
