//! GoldSource connectionless rcon datagrams.
//!
//! Every datagram starts with four `0xFF` bytes. A client first asks for a
//! challenge number, then sends `rcon <challenge> "<password>" <command>`;
//! replies are print packets (`'l'` type byte) carrying console output.

use crate::error::{self, ProtocolError};

/// Connectionless packet header.
pub const HEADER: [u8; 4] = [0xFF; 4];

/// Type byte of a print reply.
const PRINT: u8 = b'l';

const CHALLENGE_PREFIX: &str = "challenge rcon ";

/// Reply to a GoldSource rcon command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Console output produced by the command.
    Output(String),
    /// The server rejected the rcon password.
    BadPassword,
    /// The challenge number expired or was never issued.
    BadChallenge,
}

/// Datagram requesting an rcon challenge number.
pub fn challenge_request() -> Vec<u8> {
    let mut out = HEADER.to_vec();
    out.extend_from_slice(b"challenge rcon\n");
    out
}

/// Extract the challenge number from the server's reply.
pub fn parse_challenge(datagram: &[u8]) -> error::Result<String> {
    let text = payload_text(datagram)?;
    let challenge = text
        .strip_prefix(CHALLENGE_PREFIX)
        .map(str::trim)
        .filter(|c| !c.is_empty() && c.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| ProtocolError::BadChallenge(text.clone()))?;
    Ok(challenge.to_string())
}

/// Datagram executing `command` with a previously obtained challenge.
pub fn command_datagram(challenge: &str, password: &str, command: &str) -> error::Result<Vec<u8>> {
    if let Some(pos) = command.bytes().position(|b| b == 0) {
        return Err(ProtocolError::InteriorNul(pos));
    }
    let mut out = HEADER.to_vec();
    out.extend_from_slice(format!("rcon {challenge} \"{password}\" {command}").as_bytes());
    out.push(0);
    Ok(out)
}

/// Classify a command reply.
pub fn parse_reply(datagram: &[u8]) -> error::Result<Reply> {
    let body = datagram
        .strip_prefix(&HEADER[..])
        .ok_or(ProtocolError::MissingHeader)?;
    let text = match body.split_first() {
        Some((&PRINT, rest)) => clean(rest),
        _ => clean(body),
    };

    if text.starts_with("Bad rcon_password") {
        Ok(Reply::BadPassword)
    } else if text.starts_with("Bad challenge") {
        Ok(Reply::BadChallenge)
    } else {
        Ok(Reply::Output(text))
    }
}

fn payload_text(datagram: &[u8]) -> error::Result<String> {
    let body = datagram
        .strip_prefix(&HEADER[..])
        .ok_or(ProtocolError::MissingHeader)?;
    Ok(clean(body))
}

fn clean(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', '\n', '\r'])
        .to_string()
}
