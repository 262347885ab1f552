//! Ground console link: a TCP endpoint speaking length-prefixed protobuf
//! frames (`console_endpoint`), the bridge to the control loop
//! (`console_messenger`) and the wire messages (`polaris_messages`).

mod console_endpoint;
mod console_messenger;
mod polaris_messages;

pub(crate) use console_messenger::ConsoleMessenger;
