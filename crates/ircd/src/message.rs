use std::fmt;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::{alpha1, char, satisfy},
    combinator::{all_consuming, opt, recognize},
    multi::{count, many0},
    sequence::{preceded, terminated},
};

use crate::errors::IrcError;
use crate::parsers::{middle_parser, sp, trailing_parser};

/// Hard wire limit from RFC 2812 §2.3: 512 bytes per message including CRLF.
pub const MAX_LINE_LEN: usize = 512;

// 2.3.1 Message format in Augmented BNF
//
//     message    =  [ ":" prefix SPACE ] command [ params ] crlf
//     prefix     =  servername / ( nickname [ [ "!" user ] "@" host ] )
//     command    =  1*letter / 3digit
//     params     =  *14( SPACE middle ) [ SPACE ":" trailing ]
//                =/ 14( SPACE middle ) [ SPACE [ ":" ] trailing ]
//     crlf       =  %x0D %x0A   ; "carriage return" "linefeed"
//
// The crlf terminator is consumed upstream by RecvBuffer, so the parser here
// sees one bare line at a time.

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// Client-supplied source. Parsed so the grammar round-trips, but the
    /// dispatcher ignores it; the server always knows who is talking.
    pub prefix: Option<String>,
    /// Verb, case-folded to uppercase.
    pub command: String,
    pub params: Vec<String>,
}

// command = 1*letter / 3digit
fn command_parser(input: &str) -> IResult<&str, &str> {
    alt((
        alpha1,
        recognize(count(satisfy(|c: char| c.is_ascii_digit()), 3)),
    ))
    .parse(input)
}

// prefix = servername / ( nickname [ [ "!" user ] "@" host ] )
fn prefix_parser(input: &str) -> IResult<&str, &str> {
    preceded(char(':'), take_while1(|c: char| c != ' ')).parse(input)
}

// params = *14( SPACE middle ) [ SPACE ":" trailing ]
fn params_parser(input: &str) -> IResult<&str, Vec<String>> {
    let (rem, (middles, trailing)) = (
        many0(preceded(sp, middle_parser)),
        opt(preceded((sp, char(':')), trailing_parser)),
    )
        .parse(input)?;
    let mut params: Vec<String> = middles.into_iter().map(str::to_owned).collect();
    if let Some(trailing) = trailing {
        params.push(trailing.to_owned());
    }
    Ok((rem, params))
}

impl Message {
    pub fn parse(line: &str) -> Result<Self, IrcError> {
        let parser = (
            opt(terminated(prefix_parser, sp)),
            command_parser,
            params_parser,
            opt(sp),
        );
        let (_, (prefix, command, params, _)) = all_consuming(parser)
            .parse(line)
            .map_err(|_| IrcError::Parse(line.to_owned()))?;
        Ok(Message {
            prefix: prefix.map(str::to_owned),
            command: command.to_ascii_uppercase(),
            params,
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{prefix} ")?;
        }
        f.write_str(&self.command)?;
        if let Some((last, init)) = self.params.split_last() {
            for param in init {
                write!(f, " {param}")?;
            }
            if last.is_empty() || last.contains(' ') || last.starts_with(':') {
                write!(f, " :{last}")?;
            } else {
                write!(f, " {last}")?;
            }
        }
        Ok(())
    }
}

/// Per-connection accumulator for raw socket bytes. Reads are appended with
/// [`feed`](RecvBuffer::feed); complete lines are pulled out one at a time
/// with [`next_line`](RecvBuffer::next_line).
#[derive(Debug, Default)]
pub struct RecvBuffer {
    buf: Vec<u8>,
}

impl RecvBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Splits off the next complete line. The terminator is CRLF, with a
    /// bare LF tolerated. Empty lines and undecodable lines are skipped.
    /// `Err` means the peer ran past the 512 byte line limit, registered or
    /// not, and must be disconnected.
    pub fn next_line(&mut self) -> Result<Option<String>, IrcError> {
        loop {
            match self.buf.iter().position(|&b| b == b'\n') {
                Some(pos) => {
                    if pos + 1 > MAX_LINE_LEN {
                        return Err(IrcError::LineTooLong);
                    }
                    let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    if line.is_empty() {
                        continue;
                    }
                    match String::from_utf8(line) {
                        Ok(line) => return Ok(Some(line)),
                        Err(_) => continue,
                    }
                }
                None => {
                    if self.buf.len() > MAX_LINE_LEN {
                        return Err(IrcError::LineTooLong);
                    }
                    return Ok(None);
                }
            }
        }
    }
}

/// Terminates an outbound line with CRLF, truncating the payload to 510
/// bytes first so no message ever exceeds the wire limit.
pub fn terminate(mut line: String) -> String {
    const MAX_PAYLOAD: usize = MAX_LINE_LEN - 2;
    if line.len() > MAX_PAYLOAD {
        let mut cut = MAX_PAYLOAD;
        while !line.is_char_boundary(cut) {
            cut -= 1;
        }
        line.truncate(cut);
    }
    line.push_str("\r\n");
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_verb_and_positional_params() {
        let msg = Message::parse("JOIN #chat key").unwrap();
        assert_eq!(msg.command, "JOIN");
        assert_eq!(msg.params, vec!["#chat", "key"]);
        assert!(msg.prefix.is_none());
    }

    #[test]
    fn verb_is_case_folded() {
        assert_eq!(Message::parse("privmsg #c :x").unwrap().command, "PRIVMSG");
        assert_eq!(Message::parse("Nick alice").unwrap().command, "NICK");
    }

    #[test]
    fn trailing_swallows_the_rest_of_the_line() {
        let msg = Message::parse("PRIVMSG #chat :hello there :-)").unwrap();
        assert_eq!(msg.params, vec!["#chat", "hello there :-)"]);
    }

    #[test]
    fn empty_trailing_is_a_param() {
        let msg = Message::parse("TOPIC #chat :").unwrap();
        assert_eq!(msg.params, vec!["#chat", ""]);
    }

    #[test]
    fn client_prefix_is_parsed_off() {
        let msg = Message::parse(":alice!a@host PRIVMSG bob :hi").unwrap();
        assert_eq!(msg.prefix.as_deref(), Some("alice!a@host"));
        assert_eq!(msg.command, "PRIVMSG");
        assert_eq!(msg.params, vec!["bob", "hi"]);
    }

    #[test]
    fn numeric_verbs_parse() {
        let msg = Message::parse("001 alice :Welcome").unwrap();
        assert_eq!(msg.command, "001");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Message::parse(":").is_err());
        assert!(Message::parse("   ").is_err());
    }

    #[test]
    fn extra_spaces_between_tokens_are_tolerated() {
        let msg = Message::parse("NICK   alice ").unwrap();
        assert_eq!(msg.params, vec!["alice"]);
    }

    #[test]
    fn format_and_reparse_is_identity() {
        for line in [
            "NICK alice",
            "PRIVMSG #chat :hello world",
            "JOIN #a,#b key1,key2",
            ":src TOPIC #chat :",
            "PING token",
        ] {
            let first = Message::parse(line).unwrap();
            let second = Message::parse(&first.to_string()).unwrap();
            assert_eq!(first, second, "round-trip of {line}");
        }
    }

    #[test]
    fn recv_buffer_splits_two_messages_in_one_feed() {
        let mut buf = RecvBuffer::new();
        buf.feed(b"NICK alice\r\nUSER a 0 * :Alice\r\n");
        assert_eq!(buf.next_line().unwrap().as_deref(), Some("NICK alice"));
        assert_eq!(
            buf.next_line().unwrap().as_deref(),
            Some("USER a 0 * :Alice")
        );
        assert_eq!(buf.next_line().unwrap(), None);
    }

    #[test]
    fn recv_buffer_joins_a_message_split_across_feeds() {
        let mut buf = RecvBuffer::new();
        buf.feed(b"NICK al");
        assert_eq!(buf.next_line().unwrap(), None);
        buf.feed(b"ice\r\n");
        assert_eq!(buf.next_line().unwrap().as_deref(), Some("NICK alice"));
    }

    #[test]
    fn recv_buffer_tolerates_bare_lf() {
        let mut buf = RecvBuffer::new();
        buf.feed(b"PING x\n");
        assert_eq!(buf.next_line().unwrap().as_deref(), Some("PING x"));
    }

    #[test]
    fn recv_buffer_skips_empty_lines() {
        let mut buf = RecvBuffer::new();
        buf.feed(b"\r\n\r\nPING x\r\n");
        assert_eq!(buf.next_line().unwrap().as_deref(), Some("PING x"));
    }

    #[test]
    fn recv_buffer_rejects_oversize_line() {
        let mut buf = RecvBuffer::new();
        buf.feed(&[b'a'; MAX_LINE_LEN + 1]);
        assert_eq!(buf.next_line(), Err(IrcError::LineTooLong));
    }

    #[test]
    fn terminate_truncates_at_the_wire_limit() {
        let long = "x".repeat(600);
        let out = terminate(long);
        assert_eq!(out.len(), MAX_LINE_LEN);
        assert!(out.ends_with("\r\n"));
        assert_eq!(terminate("PONG".to_owned()), "PONG\r\n");
    }
}
