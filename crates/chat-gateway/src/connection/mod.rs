//! Connection lifetime: the pre-auth gate and the authenticated session

pub mod gate;
mod session;

pub use gate::AuthenticatedUser;
pub use session::{EnqueueError, Session, OUTBOUND_QUEUE_SIZE};
