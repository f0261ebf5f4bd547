use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use tokio::sync::mpsc::Sender;

use crate::casemap::{irc_eq, irc_to_lower};
use crate::channels::IrcChannel;
use crate::config::Config;
use crate::replies::IrcReply;
use crate::types::{ChannelName, ConnId};
use crate::users::Client;

/// The session registry: sole owner of every Client and Channel record.
/// Lives inside the broker loop, which hands out `&mut` access one event at
/// a time, so no intermediate state is ever observable.
#[derive(Debug)]
pub struct ServerState {
    pub config: Config,
    password: String,
    created_at: String,
    clients: HashMap<ConnId, Client>,
    /// Keyed by the lowercased (RFC 1459 casemap) channel name.
    channels: HashMap<ChannelName, IrcChannel>,
}

impl ServerState {
    pub fn new(config: Config, password: String) -> Self {
        Self {
            config,
            password,
            created_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            clients: HashMap::new(),
            channels: HashMap::new(),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.config.server.name
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn password_required(&self) -> bool {
        !self.password.is_empty()
    }

    pub fn created_at(&self) -> &str {
        &self.created_at
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn add_client(&mut self, conn_id: ConnId, addr: SocketAddr, tx: Sender<String>) {
        let client = Client::new(conn_id, addr, self.password_required(), tx);
        self.clients.insert(conn_id, client);
    }

    pub fn client(&self, conn_id: ConnId) -> Option<&Client> {
        self.clients.get(&conn_id)
    }

    pub fn client_mut(&mut self, conn_id: ConnId) -> Option<&mut Client> {
        self.clients.get_mut(&conn_id)
    }

    /// Display nick of a connection, `*` until one is set.
    pub fn nick_of(&self, conn_id: ConnId) -> String {
        self.client(conn_id)
            .map(|c| c.nick_or_star().to_owned())
            .unwrap_or_else(|| "*".to_owned())
    }

    pub fn find_by_nick(&self, nick: &str) -> Option<ConnId> {
        self.clients
            .values()
            .find(|c| c.nick.as_deref().is_some_and(|n| irc_eq(n, nick)))
            .map(|c| c.conn_id)
    }

    pub fn nick_in_use(&self, nick: &str, excluding: ConnId) -> bool {
        self.clients.values().any(|c| {
            c.conn_id != excluding && c.nick.as_deref().is_some_and(|n| irc_eq(n, nick))
        })
    }

    pub fn channel(&self, name: &str) -> Option<&IrcChannel> {
        self.channels.get(&irc_to_lower(name))
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut IrcChannel> {
        self.channels.get_mut(&irc_to_lower(name))
    }

    /// Resolves or creates a channel. The caller applies the first-join
    /// operator rule when `true` comes back.
    pub fn get_or_create_channel(&mut self, name: &str) -> (&mut IrcChannel, bool) {
        let key = irc_to_lower(name);
        let created = !self.channels.contains_key(&key);
        let channel = self
            .channels
            .entry(key)
            .or_insert_with(|| IrcChannel::new(name));
        (channel, created)
    }

    pub fn drop_channel_if_empty(&mut self, name: &str) {
        let key = irc_to_lower(name);
        if self
            .channels
            .get(&key)
            .is_some_and(|c| c.members.is_empty())
        {
            self.channels.remove(&key);
        }
    }

    pub fn reply(&mut self, conn_id: ConnId, reply: &IrcReply<'_>) {
        let line = reply.format(&self.config.server.name);
        self.send_raw(conn_id, line);
    }

    pub fn send_raw(&mut self, conn_id: ConnId, line: String) {
        if let Some(client) = self.clients.get_mut(&conn_id) {
            client.send(line);
        }
    }

    /// Delivers a line to every member of a channel except the optional
    /// excluded sender. A member whose queue overflows is marked for
    /// teardown; the pass itself never aborts.
    pub fn broadcast_channel(&mut self, name: &str, line: &str, exclude: Option<ConnId>) {
        let members: Vec<ConnId> = match self.channel(name) {
            Some(channel) => channel.members.iter().copied().collect(),
            None => return,
        };
        for member in members {
            if Some(member) == exclude {
                continue;
            }
            self.send_raw(member, line.to_owned());
        }
    }

    /// Delivers a line once to every client sharing at least one channel
    /// with `conn_id`, deduplicated across channels.
    pub fn broadcast_peers(&mut self, conn_id: ConnId, line: &str, include_self: bool) {
        let names: Vec<ChannelName> = match self.clients.get(&conn_id) {
            Some(client) => client.channels.clone(),
            None => return,
        };
        let mut recipients: HashSet<ConnId> = HashSet::new();
        for name in &names {
            if let Some(channel) = self.channels.get(name) {
                recipients.extend(channel.members.iter().copied());
            }
        }
        if include_self {
            recipients.insert(conn_id);
        } else {
            recipients.remove(&conn_id);
        }
        for recipient in recipients {
            self.send_raw(recipient, line.to_owned());
        }
    }

    /// Detaches the client from every channel it belongs to, garbage
    /// collects channels left empty and deletes the record. Dropping the
    /// record closes the outbound queue, which ends the writer task and
    /// with it the socket.
    pub fn remove_client(&mut self, conn_id: ConnId) {
        let Some(client) = self.clients.remove(&conn_id) else {
            return;
        };
        for name in &client.channels {
            let now_empty = match self.channels.get_mut(name) {
                Some(channel) => {
                    channel.remove_member(conn_id);
                    channel.members.is_empty()
                }
                None => false,
            };
            if now_empty {
                self.channels.remove(name);
            }
        }
    }

    /// Clients marked dead during the current event, to be torn down before
    /// the next one is processed.
    pub fn take_doomed(&mut self) -> Vec<(ConnId, String)> {
        self.clients
            .values()
            .filter_map(|c| c.doomed.clone().map(|reason| (c.conn_id, reason)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn state() -> ServerState {
        ServerState::new(Config::default(), String::new())
    }

    fn connect(state: &mut ServerState, conn_id: ConnId) -> mpsc::Receiver<String> {
        let (tx, rx) = mpsc::channel(16);
        let addr: SocketAddr = "127.0.0.1:6667".parse().unwrap();
        state.add_client(conn_id, addr, tx);
        rx
    }

    #[test]
    fn nick_lookup_is_case_insensitive() {
        let mut state = state();
        let _rx = connect(&mut state, 1);
        state.client_mut(1).unwrap().nick = Some("Alice[1]".to_owned());
        assert_eq!(state.find_by_nick("alice{1}"), Some(1));
        assert!(state.nick_in_use("ALICE[1]", 2));
        assert!(!state.nick_in_use("ALICE[1]", 1), "self is excluded");
    }

    #[test]
    fn channels_are_keyed_case_insensitively() {
        let mut state = state();
        let (channel, created) = state.get_or_create_channel("#Chat");
        assert!(created);
        assert_eq!(channel.name, "#Chat", "display casing preserved");
        let (_, created_again) = state.get_or_create_channel("#CHAT");
        assert!(!created_again);
    }

    #[test]
    fn removing_a_client_collects_empty_channels() {
        let mut state = state();
        let _rx = connect(&mut state, 1);
        let (channel, _) = state.get_or_create_channel("#chat");
        channel.add_member(1);
        channel.operators.insert(1);
        state.client_mut(1).unwrap().joined("#chat");

        state.remove_client(1);
        assert!(state.channel("#chat").is_none());
        assert!(state.client(1).is_none());
    }

    #[test]
    fn removing_a_client_keeps_populated_channels() {
        let mut state = state();
        let _rx1 = connect(&mut state, 1);
        let _rx2 = connect(&mut state, 2);
        let (channel, _) = state.get_or_create_channel("#chat");
        channel.add_member(1);
        channel.add_member(2);
        state.client_mut(1).unwrap().joined("#chat");
        state.client_mut(2).unwrap().joined("#chat");

        state.remove_client(1);
        let channel = state.channel("#chat").unwrap();
        assert!(channel.is_member(2));
        assert!(!channel.is_member(1));
    }

    #[test]
    fn peer_broadcast_deduplicates_across_shared_channels() {
        let mut state = state();
        let _rx1 = connect(&mut state, 1);
        let mut rx2 = connect(&mut state, 2);
        for name in ["#a", "#b"] {
            let (channel, _) = state.get_or_create_channel(name);
            channel.add_member(1);
            channel.add_member(2);
            state.client_mut(1).unwrap().joined(name);
            state.client_mut(2).unwrap().joined(name);
        }

        state.broadcast_peers(1, ":a QUIT :bye", false);
        assert_eq!(rx2.try_recv().unwrap(), ":a QUIT :bye\r\n");
        assert!(rx2.try_recv().is_err(), "exactly one copy");
    }

    #[test]
    fn doomed_clients_are_reported_once_removed_never() {
        let mut state = state();
        let _rx = connect(&mut state, 1);
        state.client_mut(1).unwrap().doomed = Some("output buffer full".to_owned());
        let doomed = state.take_doomed();
        assert_eq!(doomed.len(), 1);
        state.remove_client(1);
        assert!(state.take_doomed().is_empty());
    }
}
