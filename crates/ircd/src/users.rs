use std::collections::HashSet;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::mpsc::{Sender, error::TrySendError};

use crate::message::terminate;
use crate::types::{ChannelName, ConnId};

const MODE_WALLOPS: u8 = 0b0000_0100; // Bit 2 = mode 'w' (wallops)
const MODE_INVISIBLE: u8 = 0b0000_1000; // Bit 3 = mode 'i' (invisible)

static NEXT_CONN_ID: AtomicUsize = AtomicUsize::new(1);

pub fn next_conn_id() -> ConnId {
    NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed)
}

/// One accepted TCP connection. Owned exclusively by the registry; channels
/// refer to it by `conn_id` only.
#[derive(Debug)]
pub struct Client {
    pub conn_id: ConnId,
    pub addr: SocketAddr,
    /// Display host in relayed sources: the resolved peer address.
    pub host: String,
    pub nick: Option<String>,
    pub user: Option<String>,
    pub realname: Option<String>,
    /// User mode flags; stored on USER, no semantics enforced.
    pub modes: HashSet<char>,
    /// A PASS succeeded on this connection. Drives the 462 on a repeat.
    pub pass_accepted: bool,
    /// Password gate for registration. Starts true when the server runs
    /// without a password.
    pub password_ok: bool,
    pub registered: bool,
    /// Lowercased names of joined channels, in join order.
    pub channels: Vec<ChannelName>,
    /// Set when the connection must be torn down at the next sweep; holds
    /// the QUIT reason. A doomed client receives nothing further.
    pub doomed: Option<String>,
    tx: Sender<String>,
}

impl Client {
    pub fn new(
        conn_id: ConnId,
        addr: SocketAddr,
        password_required: bool,
        tx: Sender<String>,
    ) -> Self {
        Self {
            conn_id,
            addr,
            host: addr.ip().to_string(),
            nick: None,
            user: None,
            realname: None,
            modes: HashSet::new(),
            pass_accepted: false,
            password_ok: !password_required,
            registered: false,
            channels: Vec::new(),
            doomed: None,
            tx,
        }
    }

    pub fn nick_or_star(&self) -> &str {
        self.nick.as_deref().unwrap_or("*")
    }

    pub fn user_or_star(&self) -> &str {
        self.user.as_deref().unwrap_or("*")
    }

    /// Enqueues one line on the outbound queue. A queue that is full or
    /// whose writer died marks the client for deferred teardown instead of
    /// blocking the broker.
    pub fn send(&mut self, line: String) {
        if self.doomed.is_some() {
            return;
        }
        match self.tx.try_send(terminate(line)) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.doomed = Some("output buffer full".to_owned());
            }
            Err(TrySendError::Closed(_)) => {
                self.doomed = Some("connection lost".to_owned());
            }
        }
    }

    pub fn joined(&mut self, channel: &str) {
        if !self.channels.iter().any(|c| c == channel) {
            self.channels.push(channel.to_owned());
        }
    }

    pub fn parted(&mut self, channel: &str) {
        self.channels.retain(|c| c != channel);
    }
}

/// USER's <mode> parameter is a bitmask per RFC 2812 §3.1.3: bit 2 requests
/// 'w', bit 3 requests 'i'.
pub fn modes_from_bitmask(mode: u8) -> HashSet<char> {
    let mut modes = HashSet::new();
    if (mode & MODE_WALLOPS) != 0 {
        modes.insert('w');
    }
    if (mode & MODE_INVISIBLE) != 0 {
        modes.insert('i');
    }
    modes
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn test_client(queue: usize) -> (Client, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(queue);
        let addr: SocketAddr = "127.0.0.1:12345".parse().unwrap();
        (Client::new(7, addr, true, tx), rx)
    }

    #[test]
    fn send_terminates_lines() {
        let (mut client, mut rx) = test_client(4);
        client.send("PING :x".to_owned());
        assert_eq!(rx.try_recv().unwrap(), "PING :x\r\n");
    }

    #[test]
    fn full_queue_dooms_the_client() {
        let (mut client, _rx) = test_client(1);
        client.send("a".to_owned());
        client.send("b".to_owned());
        assert_eq!(client.doomed.as_deref(), Some("output buffer full"));
        // nothing further is queued once doomed
        client.send("c".to_owned());
    }

    #[test]
    fn dropped_writer_dooms_the_client() {
        let (mut client, rx) = test_client(4);
        drop(rx);
        client.send("a".to_owned());
        assert_eq!(client.doomed.as_deref(), Some("connection lost"));
    }

    #[test]
    fn bitmask_modes() {
        assert!(modes_from_bitmask(0).is_empty());
        assert_eq!(modes_from_bitmask(8), HashSet::from(['i']));
        assert_eq!(modes_from_bitmask(12), HashSet::from(['i', 'w']));
    }

    #[test]
    fn channel_membership_is_ordered_and_deduplicated() {
        let (mut client, _rx) = test_client(4);
        client.joined("#a");
        client.joined("#b");
        client.joined("#a");
        assert_eq!(client.channels, vec!["#a", "#b"]);
        client.parted("#a");
        assert_eq!(client.channels, vec!["#b"]);
    }
}
