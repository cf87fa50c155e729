mod deserialize;
pub mod msg;
mod queue;
mod receiver;
mod sender;
mod serialize;
pub mod specs;
mod updates;
mod vector;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use queue::{BroadcastQueue, BroadcastReceiver, MessageQueue};
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;
pub use updates::{GlobalUpdate, GradientUpdate};
pub use vector::ParameterVector;

/// The queue feeding worker gradients into the master.
pub type GradientQueue = MessageQueue<GradientUpdate>;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// The largest frame body either end accepts, in bytes.
pub const MAX_FRAME_LEN: usize = 1 << 31;

/// Creates both `OnoReceiver` and `OnoSender` network channel parts.
///
/// Given a writer and reader creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of an ono receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}
