//! SocketCAN backend
//!
//! Opens separate raw CAN sockets for receiving and transmitting on a Linux
//! network interface (e.g. `can0`). Link configuration such as the bitrate is
//! left to the system (`ip link set can0 type can bitrate 500000`).

use std::io;
use std::time::Duration;

use socketcan::{CanFrame, CanSocket, EmbeddedFrame, ExtendedId, Id, Socket, StandardId};

use super::{BusConnector, BusError, BusReceiver, BusTransmitter, Frame};

/// Connector for a SocketCAN interface
#[derive(Debug, Clone)]
pub struct SocketCanConnector {
    interface: String,
}

impl SocketCanConnector {
    /// Create a connector for the named interface
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    fn open(&self) -> Result<CanSocket, BusError> {
        CanSocket::open(&self.interface)
            .map_err(|e| BusError::Unavailable(format!("{}: {}", self.interface, e)))
    }
}

impl BusConnector for SocketCanConnector {
    type Receiver = SocketCanReceiver;
    type Transmitter = SocketCanTransmitter;

    fn open_receiver(&mut self) -> Result<SocketCanReceiver, BusError> {
        Ok(SocketCanReceiver {
            socket: self.open()?,
        })
    }

    fn open_transmitter(&mut self) -> Result<SocketCanTransmitter, BusError> {
        Ok(SocketCanTransmitter {
            socket: self.open()?,
        })
    }

    fn describe(&self) -> String {
        self.interface.clone()
    }
}

/// Receiving socket
pub struct SocketCanReceiver {
    socket: CanSocket,
}

impl BusReceiver for SocketCanReceiver {
    fn receive(&mut self, timeout: Duration) -> Result<Option<Frame>, BusError> {
        self.socket.set_read_timeout(timeout)?;
        match self.socket.read_frame() {
            Ok(CanFrame::Data(frame)) => Ok(Some(from_socketcan(&frame))),
            Ok(_) => Ok(None),
            Err(e) if is_timeout(&e) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Transmitting socket
pub struct SocketCanTransmitter {
    socket: CanSocket,
}

impl BusTransmitter for SocketCanTransmitter {
    fn transmit(&mut self, frame: &Frame, timeout: Duration) -> Result<(), BusError> {
        let can_frame = to_socketcan(frame)?;
        self.socket.set_write_timeout(timeout)?;
        match self.socket.write_frame(&can_frame) {
            Ok(()) => Ok(()),
            Err(e) if is_timeout(&e) => Err(BusError::TransmitTimeout { frame_id: frame.id }),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

fn from_socketcan(frame: &impl EmbeddedFrame) -> Frame {
    match frame.id() {
        Id::Standard(id) => Frame::new(id.as_raw() as u32, frame.data()),
        Id::Extended(id) => Frame::extended(id.as_raw(), frame.data()),
    }
}

fn to_socketcan(frame: &Frame) -> Result<CanFrame, BusError> {
    let invalid = |reason: &str| BusError::InvalidFrame {
        frame_id: frame.id,
        reason: reason.to_string(),
    };

    let id = if frame.extended {
        ExtendedId::new(frame.id).map(Id::Extended)
    } else {
        u16::try_from(frame.id)
            .ok()
            .and_then(StandardId::new)
            .map(Id::Standard)
    }
    .ok_or_else(|| invalid("identifier out of range"))?;

    CanFrame::new(id, &frame.data).ok_or_else(|| invalid("payload longer than 8 bytes"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_frame_conversion() {
        let frame = Frame::new(0x120, vec![0xFA, 0x00]);
        let can_frame = to_socketcan(&frame).unwrap();
        assert_eq!(from_socketcan(&can_frame), frame);
    }

    #[test]
    fn test_extended_frame_conversion() {
        let frame = Frame::extended(0x18FEF100, vec![1, 2, 3]);
        let can_frame = to_socketcan(&frame).unwrap();
        assert_eq!(from_socketcan(&can_frame), frame);
    }

    #[test]
    fn test_standard_id_out_of_range() {
        let frame = Frame::new(0x800, vec![]);
        assert!(matches!(
            to_socketcan(&frame),
            Err(BusError::InvalidFrame { frame_id: 0x800, .. })
        ));
    }

    #[test]
    fn test_payload_too_long() {
        let frame = Frame::new(0x100, vec![0; 9]);
        assert!(to_socketcan(&frame).is_err());
    }
}
