//! Built-in action types.

mod return_response;
mod wait;

pub use return_response::{ReturnResponse, ReturnResponseType, RETURN_RESPONSE};
pub use wait::{Wait, WaitType, WAIT};
