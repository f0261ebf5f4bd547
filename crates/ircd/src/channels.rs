use std::collections::HashSet;

use crate::types::ConnId;

/// Channel mode flags over the alphabet {i, t, k, l, m, n, p, s}.
/// `m`, `p` and `s` are stored and reported but carry no further semantics
/// here; the rest gate JOIN, TOPIC and message delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelModes {
    pub invite_only: bool,         // +i
    pub moderated: bool,           // +m
    pub no_external_msgs: bool,    // +n
    pub private: bool,             // +p
    pub secret: bool,              // +s
    pub topic_lock: bool,          // +t
    pub key: Option<String>,       // +k <key>
    pub user_limit: Option<usize>, // +l <count>
}

impl Default for ChannelModes {
    /// New channels start with 'n' set.
    fn default() -> Self {
        Self {
            invite_only: false,
            moderated: false,
            no_external_msgs: true,
            private: false,
            secret: false,
            topic_lock: false,
            key: None,
            user_limit: None,
        }
    }
}

/// Created on first JOIN, dropped by the registry when the last member
/// leaves. Members and operators are connection ids resolved through the
/// registry; the operator set is always a subset of the members.
#[derive(Debug)]
pub struct IrcChannel {
    /// Display name, in the casing of the creating JOIN.
    pub name: String,
    pub topic: Option<String>,
    pub members: HashSet<ConnId>,
    pub operators: HashSet<ConnId>,
    /// Lowercased nicknames holding a pending INVITE; consumed by the next
    /// successful JOIN.
    pub invited: HashSet<String>,
    pub modes: ChannelModes,
}

impl IrcChannel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: None,
            members: HashSet::new(),
            operators: HashSet::new(),
            invited: HashSet::new(),
            modes: ChannelModes::default(),
        }
    }

    pub fn add_member(&mut self, conn_id: ConnId) -> bool {
        self.members.insert(conn_id)
    }

    pub fn remove_member(&mut self, conn_id: ConnId) {
        self.members.remove(&conn_id);
        self.operators.remove(&conn_id);
    }

    pub fn is_member(&self, conn_id: ConnId) -> bool {
        self.members.contains(&conn_id)
    }

    pub fn is_operator(&self, conn_id: ConnId) -> bool {
        self.operators.contains(&conn_id)
    }

    /// Current mode string for RPL_CHANNELMODEIS, parameters for `k` and
    /// `l` appended after the flags.
    pub fn mode_string(&self) -> String {
        let mut flags = String::from("+");
        let mut params: Vec<String> = Vec::new();
        if self.modes.invite_only {
            flags.push('i');
        }
        if self.modes.moderated {
            flags.push('m');
        }
        if self.modes.no_external_msgs {
            flags.push('n');
        }
        if self.modes.private {
            flags.push('p');
        }
        if self.modes.secret {
            flags.push('s');
        }
        if self.modes.topic_lock {
            flags.push('t');
        }
        if let Some(key) = &self.modes.key {
            flags.push('k');
            params.push(key.clone());
        }
        if let Some(limit) = self.modes.user_limit {
            flags.push('l');
            params.push(limit.to_string());
        }
        if params.is_empty() {
            flags
        } else {
            format!("{} {}", flags, params.join(" "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_channels_carry_n() {
        let chan = IrcChannel::new("#chat");
        assert_eq!(chan.mode_string(), "+n");
    }

    #[test]
    fn mode_string_appends_key_and_limit_params() {
        let mut chan = IrcChannel::new("#chat");
        chan.modes.topic_lock = true;
        chan.modes.key = Some("sekrit".to_owned());
        chan.modes.user_limit = Some(10);
        assert_eq!(chan.mode_string(), "+ntkl sekrit 10");
    }

    #[test]
    fn removing_a_member_also_revokes_operator() {
        let mut chan = IrcChannel::new("#chat");
        chan.add_member(1);
        chan.operators.insert(1);
        chan.remove_member(1);
        assert!(!chan.is_member(1));
        assert!(!chan.is_operator(1));
        assert!(chan.operators.is_subset(&chan.members));
    }
}
