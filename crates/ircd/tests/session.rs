//! End-to-end scenarios over real TCP connections: one server task on an
//! ephemeral port, plain socket clients driving the wire protocol.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use ircd::config::Config;
use ircd::server::Server;

async fn start_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(Config::default(), addr.port(), "secret".to_owned());
    tokio::spawn(server.serve(listener));
    addr
}

struct Session {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Session {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (reader, writer) = stream.into_split();
        Session {
            reader: BufReader::new(reader),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .await
            .unwrap();
    }

    async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    async fn read_line(&mut self) -> String {
        let mut line = String::new();
        let n = timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for a line")
            .unwrap();
        assert!(n > 0, "connection closed unexpectedly");
        line.trim_end().to_owned()
    }

    /// Reads lines until one contains `needle`, returning it.
    async fn expect(&mut self, needle: &str) -> String {
        loop {
            let line = self.read_line().await;
            if line.contains(needle) {
                return line;
            }
        }
    }

    async fn register(&mut self, nick: &str) {
        let user = &nick[..1];
        self.send("PASS secret").await;
        self.send(&format!("NICK {nick}")).await;
        self.send(&format!("USER {user} 0 * :{nick}")).await;
        self.expect(" 376 ").await;
    }
}

#[tokio::test]
async fn handshake_produces_the_welcome_quartet_in_order() {
    let addr = start_server().await;
    let mut alice = Session::connect(addr).await;
    alice.send("PASS secret").await;
    alice.send("NICK alice").await;
    alice.send("USER a 0 * :Alice").await;

    let first = alice.expect(" 001 alice ").await;
    assert!(first.contains("Welcome"));
    assert!(alice.read_line().await.contains(" 002 alice "));
    assert!(alice.read_line().await.contains(" 003 alice "));
    assert!(alice.read_line().await.contains(" 004 alice "));
}

#[tokio::test]
async fn wrong_password_never_registers() {
    let addr = start_server().await;
    let mut mallory = Session::connect(addr).await;
    mallory.send("PASS wrong").await;
    assert!(mallory.read_line().await.contains(" 464 "));

    mallory.send("NICK mallory").await;
    mallory.send("USER m 0 * :M").await;
    mallory.send("PING sentinel").await;
    loop {
        let line = mallory.read_line().await;
        assert!(!line.contains(" 001 "), "registered without the password");
        if line.contains("sentinel") {
            break;
        }
    }
}

#[tokio::test]
async fn channel_creation_and_join_broadcast() {
    let addr = start_server().await;
    let mut alice = Session::connect(addr).await;
    alice.register("alice").await;

    alice.send("JOIN #chat").await;
    assert_eq!(alice.read_line().await, ":alice JOIN #chat");
    assert!(alice.read_line().await.contains(" 331 alice #chat :No topic is set"));
    assert!(alice.read_line().await.contains(" 353 alice #chat :@alice"));
    assert!(alice.read_line().await.contains(" 366 alice #chat :End of /NAMES list"));

    let mut bob = Session::connect(addr).await;
    bob.register("bob").await;
    bob.send("JOIN #chat").await;
    assert_eq!(alice.read_line().await, ":bob JOIN #chat");
    assert_eq!(bob.read_line().await, ":bob JOIN #chat");
    assert!(bob.read_line().await.contains(" 331 bob #chat "));
    assert!(bob.read_line().await.contains(" 353 bob #chat :@alice bob"));
}

#[tokio::test]
async fn privmsg_reaches_other_members_only() {
    let addr = start_server().await;
    let mut alice = Session::connect(addr).await;
    let mut bob = Session::connect(addr).await;
    alice.register("alice").await;
    bob.register("bob").await;
    alice.send("JOIN #chat").await;
    alice.expect(" 366 ").await;
    bob.send("JOIN #chat").await;
    bob.expect(" 366 ").await;
    alice.expect(":bob JOIN #chat").await;

    bob.send("PRIVMSG #chat :hi").await;
    assert_eq!(
        alice.read_line().await,
        ":bob!b@127.0.0.1 PRIVMSG #chat :hi"
    );

    // the sender gets nothing back: the next line bob sees is his PONG
    bob.send("PING sentinel").await;
    let line = bob.read_line().await;
    assert!(line.starts_with("PONG "), "unexpected echo: {line}");
    assert!(line.contains(":sentinel"));
}

#[tokio::test]
async fn kick_is_operator_only() {
    let addr = start_server().await;
    let mut alice = Session::connect(addr).await;
    let mut bob = Session::connect(addr).await;
    alice.register("alice").await;
    bob.register("bob").await;
    alice.send("JOIN #chat").await;
    alice.expect(" 366 ").await;
    bob.send("JOIN #chat").await;
    bob.expect(" 366 ").await;
    alice.expect(":bob JOIN #chat").await;

    bob.send("KICK #chat alice :bye").await;
    assert!(
        bob.read_line()
            .await
            .contains(" 482 bob #chat :You're not channel operator")
    );

    alice.send("KICK #chat bob :bye").await;
    assert_eq!(alice.read_line().await, ":alice KICK #chat bob :bye");
    assert_eq!(bob.read_line().await, ":alice KICK #chat bob :bye");

    // bob is out: speaking now draws 404
    bob.send("PRIVMSG #chat :hello?").await;
    assert!(bob.read_line().await.contains(" 404 bob #chat "));
}

#[tokio::test]
async fn invite_only_channels_gate_on_invites() {
    let addr = start_server().await;
    let mut alice = Session::connect(addr).await;
    let mut carol = Session::connect(addr).await;
    alice.register("alice").await;
    carol.register("carol").await;
    alice.send("JOIN #chat").await;
    alice.expect(" 366 ").await;
    alice.send("MODE #chat +i").await;
    assert_eq!(alice.read_line().await, ":alice MODE #chat +i");

    carol.send("JOIN #chat").await;
    assert!(
        carol
            .read_line()
            .await
            .contains(" 473 carol #chat :Cannot join channel (+i)")
    );

    alice.send("INVITE carol #chat").await;
    assert_eq!(carol.read_line().await, ":alice INVITE carol #chat");

    carol.send("JOIN #chat").await;
    assert_eq!(carol.read_line().await, ":carol JOIN #chat");
}

#[tokio::test]
async fn pipelined_and_split_messages_are_framed_correctly() {
    let addr = start_server().await;
    let mut alice = Session::connect(addr).await;
    alice.register("alice").await;

    // two messages in a single segment, dispatched in order
    alice.send_raw(b"PING one\r\nPING two\r\n").await;
    assert!(alice.read_line().await.contains(":one"));
    assert!(alice.read_line().await.contains(":two"));

    // one message split across two segments, dispatched exactly once
    alice.send_raw(b"PING spl").await;
    alice.send_raw(b"it\r\n").await;
    assert!(alice.read_line().await.contains(":split"));
}

#[tokio::test]
async fn quit_is_announced_to_shared_channels() {
    let addr = start_server().await;
    let mut alice = Session::connect(addr).await;
    let mut bob = Session::connect(addr).await;
    alice.register("alice").await;
    bob.register("bob").await;
    alice.send("JOIN #chat").await;
    alice.expect(" 366 ").await;
    bob.send("JOIN #chat").await;
    bob.expect(" 366 ").await;
    alice.expect(":bob JOIN #chat").await;

    bob.send("QUIT :gone fishing").await;
    assert_eq!(alice.read_line().await, ":bob QUIT :gone fishing");
}
