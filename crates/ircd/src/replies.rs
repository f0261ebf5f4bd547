use crate::constants::*;

/// Every line the server originates, numeric replies and command relays
/// alike. `format` renders the wire form without the trailing CRLF; the
/// outbound path appends it.
///
/// Numerics carry the addressee nick (`*` before one is known). Relays are
/// prefixed with the acting client's bare nick, except PRIVMSG and NOTICE
/// which carry the full `nick!user@host` source.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum IrcReply<'a> {
    // Connection registration
    Welcome {
        nick: &'a str,
        user: &'a str,
        host: &'a str,
    },
    YourHost {
        nick: &'a str,
        version: &'a str,
    },
    Created {
        nick: &'a str,
        date: &'a str,
    },
    MyInfo {
        nick: &'a str,
        version: &'a str,
    },
    MotdStart {
        nick: &'a str,
    },
    Motd {
        nick: &'a str,
        text: &'a str,
    },
    EndOfMotd {
        nick: &'a str,
    },

    // Channel state
    ChannelModeIs {
        nick: &'a str,
        channel: &'a str,
        modes: &'a str,
    },
    NoTopic {
        nick: &'a str,
        channel: &'a str,
    },
    Topic {
        nick: &'a str,
        channel: &'a str,
        topic: &'a str,
    },
    NamReply {
        nick: &'a str,
        channel: &'a str,
        names: &'a str,
    },
    EndOfNames {
        nick: &'a str,
        channel: &'a str,
    },

    // Command relays
    Join {
        nick: &'a str,
        channel: &'a str,
    },
    Part {
        nick: &'a str,
        channel: &'a str,
        reason: Option<&'a str>,
    },
    Quit {
        nick: &'a str,
        reason: &'a str,
    },
    NickChange {
        old: &'a str,
        new: &'a str,
    },
    TopicChange {
        nick: &'a str,
        channel: &'a str,
        topic: &'a str,
    },
    Kick {
        op: &'a str,
        channel: &'a str,
        target: &'a str,
        reason: &'a str,
    },
    Invite {
        op: &'a str,
        target: &'a str,
        channel: &'a str,
    },
    ModeChange {
        nick: &'a str,
        channel: &'a str,
        changes: &'a str,
    },
    Privmsg {
        nick: &'a str,
        user: &'a str,
        host: &'a str,
        target: &'a str,
        text: &'a str,
    },
    Notice {
        nick: &'a str,
        user: &'a str,
        host: &'a str,
        target: &'a str,
        text: &'a str,
    },
    Pong {
        token: &'a str,
    },

    // Errors
    ErrNoSuchNick {
        nick: &'a str,
        target: &'a str,
    },
    ErrNoSuchChannel {
        nick: &'a str,
        channel: &'a str,
    },
    ErrCannotSendToChan {
        nick: &'a str,
        channel: &'a str,
    },
    ErrNoRecipient {
        nick: &'a str,
        command: &'a str,
    },
    ErrNoTextToSend {
        nick: &'a str,
    },
    ErrUnknownCommand {
        nick: &'a str,
        command: &'a str,
    },
    ErrNoNicknameGiven {
        nick: &'a str,
    },
    ErrErroneusNickname {
        nick: &'a str,
        attempted: &'a str,
    },
    ErrNicknameInUse {
        nick: &'a str,
        attempted: &'a str,
    },
    ErrNotOnChannel {
        nick: &'a str,
        channel: &'a str,
    },
    ErrUserOnChannel {
        nick: &'a str,
        target: &'a str,
        channel: &'a str,
    },
    ErrNeedMoreParams {
        nick: &'a str,
        command: &'a str,
    },
    ErrAlreadyRegistered {
        nick: &'a str,
    },
    ErrPasswdMismatch {
        nick: &'a str,
    },
    ErrChannelIsFull {
        nick: &'a str,
        channel: &'a str,
    },
    ErrInviteOnlyChan {
        nick: &'a str,
        channel: &'a str,
    },
    ErrBadChannelKey {
        nick: &'a str,
        channel: &'a str,
    },
    ErrChanOPrivsNeeded {
        nick: &'a str,
        channel: &'a str,
    },
}

impl<'a> IrcReply<'a> {
    pub fn format(&self, server: &str) -> String {
        match self {
            // registration replies
            IrcReply::Welcome { nick, user, host } => format!(
                ":{server} {RPL_WELCOME_NB:03} {nick} :{RPL_WELCOME_STR} {nick}!{user}@{host}"
            ),
            IrcReply::YourHost { nick, version } => format!(
                ":{server} {RPL_YOURHOST_NB:03} {nick} :Your host is {server}, running version {version}"
            ),
            IrcReply::Created { nick, date } => format!(
                ":{server} {RPL_CREATED_NB:03} {nick} :This server was created {date}"
            ),
            IrcReply::MyInfo { nick, version } => format!(
                ":{server} {RPL_MYINFO_NB:03} {nick} {server} {version} {USER_MODES} {CHANNEL_MODES}"
            ),
            IrcReply::MotdStart { nick } => format!(
                ":{server} {RPL_MOTDSTART_NB:03} {nick} :- {server} Message of the day - "
            ),
            IrcReply::Motd { nick, text } => {
                format!(":{server} {RPL_MOTD_NB:03} {nick} :- {text}")
            }
            IrcReply::EndOfMotd { nick } => {
                format!(":{server} {RPL_ENDOFMOTD_NB:03} {nick} :{RPL_ENDOFMOTD_STR}")
            }

            // channel state replies
            IrcReply::ChannelModeIs {
                nick,
                channel,
                modes,
            } => format!(":{server} {RPL_CHANNELMODEIS_NB:03} {nick} {channel} {modes}"),
            IrcReply::NoTopic { nick, channel } => {
                format!(":{server} {RPL_NOTOPIC_NB:03} {nick} {channel} :{RPL_NOTOPIC_STR}")
            }
            IrcReply::Topic {
                nick,
                channel,
                topic,
            } => format!(":{server} {RPL_TOPIC_NB:03} {nick} {channel} :{topic}"),
            IrcReply::NamReply {
                nick,
                channel,
                names,
            } => format!(":{server} {RPL_NAMREPLY_NB:03} {nick} {channel} :{names}"),
            IrcReply::EndOfNames { nick, channel } => format!(
                ":{server} {RPL_ENDOFNAMES_NB:03} {nick} {channel} :{RPL_ENDOFNAMES_STR}"
            ),

            // command relays
            IrcReply::Join { nick, channel } => format!(":{nick} JOIN {channel}"),
            IrcReply::Part {
                nick,
                channel,
                reason,
            } => match reason {
                Some(reason) => format!(":{nick} PART {channel} :{reason}"),
                None => format!(":{nick} PART {channel}"),
            },
            IrcReply::Quit { nick, reason } => format!(":{nick} QUIT :{reason}"),
            IrcReply::NickChange { old, new } => format!(":{old} NICK {new}"),
            IrcReply::TopicChange {
                nick,
                channel,
                topic,
            } => format!(":{nick} TOPIC {channel} :{topic}"),
            IrcReply::Kick {
                op,
                channel,
                target,
                reason,
            } => format!(":{op} KICK {channel} {target} :{reason}"),
            IrcReply::Invite {
                op,
                target,
                channel,
            } => format!(":{op} INVITE {target} {channel}"),
            IrcReply::ModeChange {
                nick,
                channel,
                changes,
            } => format!(":{nick} MODE {channel} {changes}"),
            IrcReply::Privmsg {
                nick,
                user,
                host,
                target,
                text,
            } => format!(":{nick}!{user}@{host} PRIVMSG {target} :{text}"),
            IrcReply::Notice {
                nick,
                user,
                host,
                target,
                text,
            } => format!(":{nick}!{user}@{host} NOTICE {target} :{text}"),
            IrcReply::Pong { token } => format!("PONG {server} :{token}"),

            // errors
            IrcReply::ErrNoSuchNick { nick, target } => {
                format!(":{server} {ERR_NOSUCHNICK_NB:03} {nick} {target} :{ERR_NOSUCHNICK_STR}")
            }
            IrcReply::ErrNoSuchChannel { nick, channel } => format!(
                ":{server} {ERR_NOSUCHCHANNEL_NB:03} {nick} {channel} :{ERR_NOSUCHCHANNEL_STR}"
            ),
            IrcReply::ErrCannotSendToChan { nick, channel } => format!(
                ":{server} {ERR_CANNOTSENDTOCHAN_NB:03} {nick} {channel} :{ERR_CANNOTSENDTOCHAN_STR}"
            ),
            IrcReply::ErrNoRecipient { nick, command } => format!(
                ":{server} {ERR_NORECIPIENT_NB:03} {nick} :No recipient given ({command})"
            ),
            IrcReply::ErrNoTextToSend { nick } => {
                format!(":{server} {ERR_NOTEXTTOSEND_NB:03} {nick} :{ERR_NOTEXTTOSEND_STR}")
            }
            IrcReply::ErrUnknownCommand { nick, command } => format!(
                ":{server} {ERR_UNKNOWNCOMMAND_NB:03} {nick} {command} :{ERR_UNKNOWNCOMMAND_STR}"
            ),
            IrcReply::ErrNoNicknameGiven { nick } => format!(
                ":{server} {ERR_NONICKNAMEGIVEN_NB:03} {nick} :{ERR_NONICKNAMEGIVEN_STR}"
            ),
            IrcReply::ErrErroneusNickname { nick, attempted } => format!(
                ":{server} {ERR_ERRONEUSNICKNAME_NB:03} {nick} {attempted} :{ERR_ERRONEUSNICKNAME_STR}"
            ),
            IrcReply::ErrNicknameInUse { nick, attempted } => format!(
                ":{server} {ERR_NICKNAMEINUSE_NB:03} {nick} {attempted} :{ERR_NICKNAMEINUSE_STR}"
            ),
            IrcReply::ErrNotOnChannel { nick, channel } => format!(
                ":{server} {ERR_NOTONCHANNEL_NB:03} {nick} {channel} :{ERR_NOTONCHANNEL_STR}"
            ),
            IrcReply::ErrUserOnChannel {
                nick,
                target,
                channel,
            } => format!(
                ":{server} {ERR_USERONCHANNEL_NB:03} {nick} {target} {channel} :{ERR_USERONCHANNEL_STR}"
            ),
            IrcReply::ErrNeedMoreParams { nick, command } => format!(
                ":{server} {ERR_NEEDMOREPARAMS_NB:03} {nick} {command} :{ERR_NEEDMOREPARAMS_STR}"
            ),
            IrcReply::ErrAlreadyRegistered { nick } => format!(
                ":{server} {ERR_ALREADYREGISTRED_NB:03} {nick} :{ERR_ALREADYREGISTRED_STR}"
            ),
            IrcReply::ErrPasswdMismatch { nick } => format!(
                ":{server} {ERR_PASSWDMISMATCH_NB:03} {nick} :{ERR_PASSWDMISMATCH_STR}"
            ),
            IrcReply::ErrChannelIsFull { nick, channel } => format!(
                ":{server} {ERR_CHANNELISFULL_NB:03} {nick} {channel} :{ERR_CHANNELISFULL_STR}"
            ),
            IrcReply::ErrInviteOnlyChan { nick, channel } => format!(
                ":{server} {ERR_INVITEONLYCHAN_NB:03} {nick} {channel} :{ERR_INVITEONLYCHAN_STR}"
            ),
            IrcReply::ErrBadChannelKey { nick, channel } => format!(
                ":{server} {ERR_BADCHANNELKEY_NB:03} {nick} {channel} :{ERR_BADCHANNELKEY_STR}"
            ),
            IrcReply::ErrChanOPrivsNeeded { nick, channel } => format!(
                ":{server} {ERR_CHANOPRIVSNEEDED_NB:03} {nick} {channel} :{ERR_CHANOPRIVSNEEDED_STR}"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SERVER: &str = "irc.test.net";

    #[test]
    fn welcome_line() {
        let reply = IrcReply::Welcome {
            nick: "alice",
            user: "a",
            host: "127.0.0.1",
        };
        assert_eq!(
            reply.format(SERVER),
            ":irc.test.net 001 alice :Welcome to the IRC Network alice!a@127.0.0.1"
        );
    }

    #[test]
    fn numeric_codes_are_zero_padded() {
        let reply = IrcReply::MyInfo {
            nick: "alice",
            version: "1.0.0",
        };
        assert!(reply.format(SERVER).starts_with(":irc.test.net 004 alice "));
    }

    #[test]
    fn password_mismatch_before_any_nick() {
        let reply = IrcReply::ErrPasswdMismatch { nick: "*" };
        assert_eq!(
            reply.format(SERVER),
            ":irc.test.net 464 * :Password incorrect"
        );
    }

    #[test]
    fn relays_use_bare_nick_prefix() {
        let reply = IrcReply::Kick {
            op: "alice",
            channel: "#chat",
            target: "bob",
            reason: "bye",
        };
        assert_eq!(reply.format(SERVER), ":alice KICK #chat bob :bye");
    }

    #[test]
    fn privmsg_carries_the_full_source() {
        let reply = IrcReply::Privmsg {
            nick: "bob",
            user: "b",
            host: "127.0.0.1",
            target: "#chat",
            text: "hi",
        };
        assert_eq!(reply.format(SERVER), ":bob!b@127.0.0.1 PRIVMSG #chat :hi");
    }

    #[test]
    fn part_reason_is_optional() {
        let with = IrcReply::Part {
            nick: "bob",
            channel: "#chat",
            reason: Some("gone"),
        };
        let without = IrcReply::Part {
            nick: "bob",
            channel: "#chat",
            reason: None,
        };
        assert_eq!(with.format(SERVER), ":bob PART #chat :gone");
        assert_eq!(without.format(SERVER), ":bob PART #chat");
    }

    #[test]
    fn pong_echoes_the_token() {
        let reply = IrcReply::Pong { token: "abc" };
        assert_eq!(reply.format(SERVER), "PONG irc.test.net :abc");
    }
}
