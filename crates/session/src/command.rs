//! Outbound protocol commands

use std::fmt;

use bytes::Bytes;
use contracts::ChannelName;

/// A command the client sends to the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    User(String),
    Nick(String),
    /// `CAP REQ :<capability>`
    CapReq(String),
    Join(ChannelName),
    Pong(String),
}

impl Command {
    /// Wire form, CRLF-terminated
    pub fn encode(&self) -> Bytes {
        let mut line = self.to_string();
        line.push_str("\r\n");
        Bytes::from(line)
    }

    /// Anonymous login sequence: USER, NICK, then one CAP REQ per
    /// capability in order. The nick is lower-cased.
    pub fn handshake(nick: &str, capabilities: &[String]) -> Vec<Command> {
        let nick = nick.to_lowercase();
        let mut commands = Vec::with_capacity(2 + capabilities.len());
        commands.push(Command::User(nick.clone()));
        commands.push(Command::Nick(nick));
        commands.extend(capabilities.iter().cloned().map(Command::CapReq));
        commands
    }

    /// Command name, for logs
    pub fn verb(&self) -> &'static str {
        match self {
            Self::User(_) => "USER",
            Self::Nick(_) => "NICK",
            Self::CapReq(_) => "CAP",
            Self::Join(_) => "JOIN",
            Self::Pong(_) => "PONG",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(nick) => write!(f, "USER {nick}"),
            Self::Nick(nick) => write!(f, "NICK {nick}"),
            Self::CapReq(cap) => write!(f, "CAP REQ :{cap}"),
            Self::Join(channel) => write!(f, "JOIN {}", channel.join_target()),
            Self::Pong(target) => write!(f, "PONG {target}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let foo = ChannelName::parse("#Foo").unwrap();
        assert_eq!(&Command::Join(foo).encode()[..], b"JOIN #foo\r\n");
        assert_eq!(
            &Command::Pong("tmi.twitch.tv".into()).encode()[..],
            b"PONG tmi.twitch.tv\r\n"
        );
        assert_eq!(
            &Command::CapReq("twitch.tv/tags".into()).encode()[..],
            b"CAP REQ :twitch.tv/tags\r\n"
        );
    }

    #[test]
    fn test_handshake_order_and_case() {
        let caps = vec!["a/b".to_string(), "c/d".to_string()];
        let lines: Vec<String> = Command::handshake("JustinFan0", &caps)
            .iter()
            .map(ToString::to_string)
            .collect();

        assert_eq!(
            lines,
            ["USER justinfan0", "NICK justinfan0", "CAP REQ :a/b", "CAP REQ :c/d"]
        );
    }

    #[test]
    fn test_handshake_without_capabilities() {
        assert_eq!(Command::handshake("x", &[]).len(), 2);
    }
}
