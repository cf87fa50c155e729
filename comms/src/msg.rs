use std::{borrow::Cow, io};

use crate::{
    Deserialize, GlobalUpdate, GradientUpdate, ParameterVector, Serialize,
    deserialize::ByteReader,
};

type Header = u32;
const HEADER_SIZE: usize = size_of::<Header>();

const ERR_KIND: Header = 0;
const CONTROL_KIND: Header = 1;
const GRADIENT_KIND: Header = 2;
const PARAMS_KIND: Header = 3;

/// The payload data for the `Data` variant of the `Msg` enum.
#[derive(Debug)]
pub enum Payload<'a> {
    Gradient(Cow<'a, GradientUpdate>),
    Params(Cow<'a, GlobalUpdate>),
}

/// The command for the `Control` variant of the `Msg` enum.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// A worker announces itself and the size of its parameter vector.
    Join { worker_id: String, params: usize },
    /// The master accepted the worker, training runs for `rounds` rounds.
    Start { rounds: usize },
    Disconnect,
}

/// The application layer message for the entire system.
#[derive(Debug)]
pub enum Msg<'a> {
    Control(Command),
    Data(Payload<'a>),
    Err(Cow<'a, str>),
}

impl Msg<'_> {
    /// Returns a short name of the message kind, used for logging and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Msg::Control(Command::Join { .. }) => "control/join",
            Msg::Control(Command::Start { .. }) => "control/start",
            Msg::Control(Command::Disconnect) => "control/disconnect",
            Msg::Data(Payload::Gradient(_)) => "data/gradient",
            Msg::Data(Payload::Params(_)) => "data/params",
            Msg::Err(_) => "err",
        }
    }

    fn buf_is_too_small<T>(size: usize) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("The given buffer is too small {size}, must at least be {HEADER_SIZE} bytes"),
        ))
    }

    fn invalid_kind<T>(kind: Header) -> io::Result<T> {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Received an invalid kind header {kind}"),
        ))
    }
}

impl<'a> Serialize<'a> for Msg<'a> {
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>> {
        match self {
            Msg::Err(e) => {
                buf.extend_from_slice(&ERR_KIND.to_be_bytes());
                Ok(Some(e.as_bytes()))
            }
            Msg::Control(cmd) => {
                buf.extend_from_slice(&CONTROL_KIND.to_be_bytes());
                serde_json::to_writer(buf, cmd)?;
                Ok(None)
            }
            Msg::Data(Payload::Gradient(update)) => {
                let id = update.worker_id.as_bytes();
                let id_len = Header::try_from(id.len()).map_err(|_| {
                    io::Error::new(io::ErrorKind::InvalidInput, "worker id is too long")
                })?;

                buf.extend_from_slice(&GRADIENT_KIND.to_be_bytes());
                buf.extend_from_slice(&update.round_id.to_be_bytes());
                buf.extend_from_slice(&update.observed_batch_size.to_be_bytes());
                buf.extend_from_slice(&id_len.to_be_bytes());
                buf.extend_from_slice(id);
                buf.extend_from_slice(&(update.delta.len() as u64).to_be_bytes());
                Ok(Some(bytemuck::cast_slice(update.delta.as_slice())))
            }
            Msg::Data(Payload::Params(update)) => {
                buf.extend_from_slice(&PARAMS_KIND.to_be_bytes());
                buf.extend_from_slice(&update.round_id.to_be_bytes());
                buf.extend_from_slice(&(update.vector.len() as u64).to_be_bytes());
                Ok(Some(bytemuck::cast_slice(update.vector.as_slice())))
            }
        }
    }
}

impl<'a> Deserialize<'a> for Msg<'a> {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self> {
        if buf.len() < HEADER_SIZE {
            return Self::buf_is_too_small(buf.len());
        }

        let mut reader = ByteReader::new(buf);
        let kind = reader.u32()?;

        match kind {
            ERR_KIND => {
                let rest = reader.rest();
                let string = std::str::from_utf8(rest)
                    .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

                Ok(Self::Err(Cow::Borrowed(string)))
            }
            CONTROL_KIND => {
                let cmd = serde_json::from_slice(reader.rest())?;
                Ok(Self::Control(cmd))
            }
            GRADIENT_KIND => {
                let round_id = reader.u64()?;
                let observed_batch_size = reader.u64()?;
                let id_len = reader.u32()? as usize;
                let worker_id = reader.str(id_len)?.to_owned();
                let delta = ParameterVector::from(reader.f32s()?);
                reader.finish()?;

                let update = GradientUpdate {
                    worker_id,
                    delta,
                    observed_batch_size,
                    round_id,
                };

                Ok(Self::Data(Payload::Gradient(Cow::Owned(update))))
            }
            PARAMS_KIND => {
                let round_id = reader.u64()?;
                let vector = ParameterVector::from(reader.f32s()?);
                reader.finish()?;

                let update = GlobalUpdate { vector, round_id };
                Ok(Self::Data(Payload::Params(Cow::Owned(update))))
            }
            kind => Self::invalid_kind(kind),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serializes `msg` the same way `OnoSender` frames it, without the length prefix.
    fn to_bytes(msg: &Msg) -> Vec<u8> {
        let mut buf = Vec::new();
        let tail = msg.serialize(&mut buf).unwrap();
        if let Some(tail) = tail {
            buf.extend_from_slice(tail);
        }
        buf
    }

    #[test]
    fn gradient_keeps_header_fields() {
        let update = GradientUpdate::new("worker-7", vec![1.5, -2., 0.25].into(), 200, 12);
        let msg = Msg::Data(Payload::Gradient(Cow::Borrowed(&update)));
        let bytes = to_bytes(&msg);

        let Msg::Data(Payload::Gradient(got)) = Msg::deserialize(&bytes).unwrap() else {
            panic!("expected a gradient");
        };

        assert_eq!(got.worker_id, "worker-7");
        assert_eq!(got.round_id, 12);
        assert_eq!(got.observed_batch_size, 200);
        assert!(got.delta.bits_eq(&update.delta));
    }

    #[test]
    fn params_header_layout() {
        let update = GlobalUpdate::new(vec![3.; 2].into(), 4);
        let msg = Msg::Data(Payload::Params(Cow::Borrowed(&update)));
        let bytes = to_bytes(&msg);

        // kind + round + len + 2 floats
        assert_eq!(bytes.len(), 4 + 8 + 8 + 2 * 4);
        assert_eq!(&bytes[..4], &PARAMS_KIND.to_be_bytes());
        assert_eq!(&bytes[4..12], &4u64.to_be_bytes());
    }

    #[test]
    fn control_is_json() {
        let msg = Msg::Control(Command::Join {
            worker_id: "0".into(),
            params: 10,
        });
        let bytes = to_bytes(&msg);

        assert_eq!(&bytes[HEADER_SIZE..], br#"{"join":{"worker_id":"0","params":10}}"#);

        let Msg::Control(cmd) = Msg::deserialize(&bytes).unwrap() else {
            panic!("expected a command");
        };
        assert_eq!(
            cmd,
            Command::Join {
                worker_id: "0".into(),
                params: 10
            }
        );
    }

    #[test]
    fn truncated_vector_is_rejected() {
        let update = GlobalUpdate::new(vec![1.; 4].into(), 0);
        let msg = Msg::Data(Payload::Params(Cow::Borrowed(&update)));
        let bytes = to_bytes(&msg);

        let err = Msg::deserialize(&bytes[..bytes.len() - 3]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let update = GlobalUpdate::new(vec![1.; 1].into(), 0);
        let msg = Msg::Data(Payload::Params(Cow::Borrowed(&update)));
        let mut bytes = to_bytes(&msg);
        bytes.push(0);

        assert!(Msg::deserialize(&bytes).is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let bytes = 9u32.to_be_bytes();
        assert!(Msg::deserialize(&bytes).is_err());
        assert!(Msg::deserialize(&bytes[..2]).is_err());
    }

    #[test]
    fn err_borrows_from_the_frame() {
        let msg = Msg::Err(Cow::Borrowed("dimension mismatch"));
        let bytes = to_bytes(&msg);

        let Msg::Err(text) = Msg::deserialize(&bytes).unwrap() else {
            panic!("expected an error message");
        };
        assert!(matches!(text, Cow::Borrowed("dimension mismatch")));
    }
}
