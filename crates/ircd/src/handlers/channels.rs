use crate::casemap::irc_to_lower;
use crate::parsers::{is_valid_channel_name, is_valid_key};
use crate::replies::IrcReply;
use crate::server_state::ServerState;
use crate::types::ConnId;

// 3.2.1 Join message
//
//       Command: JOIN
//    Parameters: ( <channel> *( "," <channel> ) [ <key> *( "," <key> ) ] )
//                / "0"
//
//    If a JOIN is successful, the user receives a JOIN message as
//    confirmation and is then sent the channel's topic (using RPL_TOPIC)
//    and the list of users who are on the channel (using RPL_NAMREPLY),
//    which MUST include the user joining.
//
//    Note that this message accepts a special argument ("0"), which is
//    a special request to leave all channels the user is currently a
//    member of.
pub fn join(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    let Some(first) = params.first() else {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "JOIN",
            },
        );
        return;
    };
    if first == "0" {
        part_all(state, conn_id, &nick);
        return;
    }
    let keys: Vec<&str> = params
        .get(1)
        .map(|k| k.split(',').collect())
        .unwrap_or_default();
    let names: Vec<&str> = first.split(',').collect();
    for (i, name) in names.iter().enumerate() {
        join_one(state, conn_id, &nick, name, keys.get(i).copied());
    }
}

fn join_one(state: &mut ServerState, conn_id: ConnId, nick: &str, name: &str, key: Option<&str>) {
    if !is_valid_channel_name(name) {
        state.reply(
            conn_id,
            &IrcReply::ErrNoSuchChannel {
                nick,
                channel: name,
            },
        );
        return;
    }
    let lower_nick = irc_to_lower(nick);

    // Admission checks apply only to an existing channel; the creator walks
    // straight in and takes operator.
    let gate = state.channel(name).map(|channel| {
        (
            channel.is_member(conn_id),
            channel.modes.key.clone(),
            channel.modes.invite_only && !channel.invited.contains(&lower_nick),
            channel
                .modes
                .user_limit
                .is_some_and(|limit| channel.members.len() >= limit),
        )
    });
    if let Some((already_member, required_key, invite_blocked, full)) = gate {
        if already_member {
            return;
        }
        if let Some(required) = required_key {
            if key != Some(required.as_str()) {
                state.reply(
                    conn_id,
                    &IrcReply::ErrBadChannelKey {
                        nick,
                        channel: name,
                    },
                );
                return;
            }
        }
        if invite_blocked {
            state.reply(
                conn_id,
                &IrcReply::ErrInviteOnlyChan {
                    nick,
                    channel: name,
                },
            );
            return;
        }
        if full {
            state.reply(
                conn_id,
                &IrcReply::ErrChannelIsFull {
                    nick,
                    channel: name,
                },
            );
            return;
        }
    }

    let (channel, created) = state.get_or_create_channel(name);
    channel.invited.remove(&lower_nick);
    channel.add_member(conn_id);
    if created {
        channel.operators.insert(conn_id);
    }
    let display = channel.name.clone();
    let lower_name = irc_to_lower(name);
    if let Some(client) = state.client_mut(conn_id) {
        client.joined(&lower_name);
    }

    let line = IrcReply::Join {
        nick,
        channel: &display,
    }
    .format(state.server_name());
    state.broadcast_channel(&display, &line, None);

    match state.channel(name).and_then(|c| c.topic.clone()) {
        Some(topic) => state.reply(
            conn_id,
            &IrcReply::Topic {
                nick,
                channel: &display,
                topic: &topic,
            },
        ),
        None => state.reply(
            conn_id,
            &IrcReply::NoTopic {
                nick,
                channel: &display,
            },
        ),
    }
    let names = names_of(state, name);
    state.reply(
        conn_id,
        &IrcReply::NamReply {
            nick,
            channel: &display,
            names: &names,
        },
    );
    state.reply(
        conn_id,
        &IrcReply::EndOfNames {
            nick,
            channel: &display,
        },
    );
}

/// NAMES listing: operators first with their `@` prefix, then the rest,
/// each group ordered by casemapped nick.
fn names_of(state: &ServerState, name: &str) -> String {
    let Some(channel) = state.channel(name) else {
        return String::new();
    };
    let mut entries: Vec<(bool, String)> = channel
        .members
        .iter()
        .filter_map(|&member| {
            state
                .client(member)
                .map(|c| (channel.is_operator(member), c.nick_or_star().to_owned()))
        })
        .collect();
    entries.sort_by_key(|(op, nick)| (!*op, irc_to_lower(nick)));
    entries
        .into_iter()
        .map(|(op, nick)| if op { format!("@{nick}") } else { nick })
        .collect::<Vec<_>>()
        .join(" ")
}

// 3.2.2 Part message
//
//       Command: PART
//    Parameters: <channel> *( "," <channel> ) [ <Part Message> ]
pub fn part(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    let Some(first) = params.first() else {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "PART",
            },
        );
        return;
    };
    let reason = params.get(1).cloned();
    let names: Vec<&str> = first.split(',').collect();
    for name in names {
        part_one(state, conn_id, &nick, name, reason.as_deref());
    }
}

fn part_one(
    state: &mut ServerState,
    conn_id: ConnId,
    nick: &str,
    name: &str,
    reason: Option<&str>,
) {
    let Some(channel) = state.channel(name) else {
        state.reply(
            conn_id,
            &IrcReply::ErrNoSuchChannel {
                nick,
                channel: name,
            },
        );
        return;
    };
    if !channel.is_member(conn_id) {
        let display = channel.name.clone();
        state.reply(
            conn_id,
            &IrcReply::ErrNotOnChannel {
                nick,
                channel: &display,
            },
        );
        return;
    }
    let display = channel.name.clone();
    let line = IrcReply::Part {
        nick,
        channel: &display,
        reason,
    }
    .format(state.server_name());
    state.broadcast_channel(&display, &line, None);
    detach(state, conn_id, name);
}

/// JOIN 0: leave every channel, oldest membership first.
fn part_all(state: &mut ServerState, conn_id: ConnId, nick: &str) {
    let names: Vec<String> = state
        .client(conn_id)
        .map(|c| c.channels.clone())
        .unwrap_or_default();
    for name in names {
        part_one(state, conn_id, nick, &name, None);
    }
}

/// Paired removal: channel membership and the client's channel set always
/// change together, and an emptied channel leaves the registry.
fn detach(state: &mut ServerState, conn_id: ConnId, name: &str) {
    let lower_name = irc_to_lower(name);
    if let Some(channel) = state.channel_mut(name) {
        channel.remove_member(conn_id);
    }
    if let Some(client) = state.client_mut(conn_id) {
        client.parted(&lower_name);
    }
    state.drop_channel_if_empty(name);
}

// 3.2.4 Topic message
//
//       Command: TOPIC
//    Parameters: <channel> [ <topic> ]
//
//    The topic for channel <channel> is returned if there is no <topic>
//    given. If the <topic> parameter is an empty string, the topic for
//    that channel will be removed.
pub fn topic(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    let Some(name) = params.first() else {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "TOPIC",
            },
        );
        return;
    };
    let snapshot = state.channel(name).map(|channel| {
        (
            channel.name.clone(),
            channel.is_member(conn_id),
            channel.is_operator(conn_id),
            channel.topic.clone(),
            channel.modes.topic_lock,
        )
    });
    let Some((display, member, operator, current, locked)) = snapshot else {
        state.reply(
            conn_id,
            &IrcReply::ErrNoSuchChannel {
                nick: &nick,
                channel: name,
            },
        );
        return;
    };
    if !member {
        state.reply(
            conn_id,
            &IrcReply::ErrNotOnChannel {
                nick: &nick,
                channel: &display,
            },
        );
        return;
    }
    let Some(text) = params.get(1) else {
        match current {
            Some(topic) => state.reply(
                conn_id,
                &IrcReply::Topic {
                    nick: &nick,
                    channel: &display,
                    topic: &topic,
                },
            ),
            None => state.reply(
                conn_id,
                &IrcReply::NoTopic {
                    nick: &nick,
                    channel: &display,
                },
            ),
        }
        return;
    };
    if locked && !operator {
        state.reply(
            conn_id,
            &IrcReply::ErrChanOPrivsNeeded {
                nick: &nick,
                channel: &display,
            },
        );
        return;
    }
    if let Some(channel) = state.channel_mut(name) {
        channel.topic = if text.is_empty() {
            None
        } else {
            Some(text.clone())
        };
    }
    let line = IrcReply::TopicChange {
        nick: &nick,
        channel: &display,
        topic: text,
    }
    .format(state.server_name());
    state.broadcast_channel(&display, &line, None);
}

// 3.2.3 Channel mode message
//
//       Command: MODE
//    Parameters: <channel> *( ( "-" / "+" ) *<modes> *<modeparams> )
//
//    Of the RFC 2811 mode alphabet this server carries i, t, k, l, m, n,
//    p, s plus the member flag o. Parameters for k, l and o are drawn in
//    order from the argument list after the mode string.
pub fn mode(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    let Some(target) = params.first() else {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "MODE",
            },
        );
        return;
    };
    if !target.starts_with('#') && !target.starts_with('&') {
        // user modes are stored only; nothing to do here
        return;
    }
    let snapshot = state
        .channel(target)
        .map(|c| (c.name.clone(), c.is_operator(conn_id), c.mode_string()));
    let Some((display, operator, mode_string)) = snapshot else {
        state.reply(
            conn_id,
            &IrcReply::ErrNoSuchChannel {
                nick: &nick,
                channel: target,
            },
        );
        return;
    };
    let Some(modes) = params.get(1) else {
        state.reply(
            conn_id,
            &IrcReply::ChannelModeIs {
                nick: &nick,
                channel: &display,
                modes: &mode_string,
            },
        );
        return;
    };
    if !operator {
        state.reply(
            conn_id,
            &IrcReply::ErrChanOPrivsNeeded {
                nick: &nick,
                channel: &display,
            },
        );
        return;
    }
    if let Some(changes) = apply_mode_changes(state, conn_id, target, modes, &params[2..]) {
        let line = IrcReply::ModeChange {
            nick: &nick,
            channel: &display,
            changes: &changes,
        }
        .format(state.server_name());
        state.broadcast_channel(&display, &line, None);
    }
}

/// Walks the mode string under the current +/- sign, consuming one argument
/// per parameterised flag. Returns the aggregated change string of what was
/// actually applied, or None when nothing stuck.
fn apply_mode_changes(
    state: &mut ServerState,
    conn_id: ConnId,
    name: &str,
    modes: &str,
    args: &[String],
) -> Option<String> {
    let mut args = args.iter();
    let mut adding = true;
    let mut applied: Vec<(bool, char, Option<String>)> = Vec::new();

    for flag in modes.chars() {
        match flag {
            '+' => adding = true,
            '-' => adding = false,
            'i' | 'm' | 'n' | 'p' | 's' | 't' => {
                let Some(channel) = state.channel_mut(name) else {
                    break;
                };
                let slot = match flag {
                    'i' => &mut channel.modes.invite_only,
                    'm' => &mut channel.modes.moderated,
                    'n' => &mut channel.modes.no_external_msgs,
                    'p' => &mut channel.modes.private,
                    's' => &mut channel.modes.secret,
                    _ => &mut channel.modes.topic_lock,
                };
                if *slot != adding {
                    *slot = adding;
                    applied.push((adding, flag, None));
                }
            }
            'k' => {
                if adding {
                    let Some(key) = args.next() else { continue };
                    if !is_valid_key(key) {
                        continue;
                    }
                    if let Some(channel) = state.channel_mut(name) {
                        channel.modes.key = Some(key.clone());
                        applied.push((true, 'k', Some(key.clone())));
                    }
                } else if let Some(channel) = state.channel_mut(name) {
                    if channel.modes.key.take().is_some() {
                        applied.push((false, 'k', None));
                    }
                }
            }
            'l' => {
                if adding {
                    let Some(arg) = args.next() else { continue };
                    let Ok(limit) = arg.parse::<usize>() else {
                        continue;
                    };
                    if limit == 0 {
                        continue;
                    }
                    if let Some(channel) = state.channel_mut(name) {
                        channel.modes.user_limit = Some(limit);
                        applied.push((true, 'l', Some(limit.to_string())));
                    }
                } else if let Some(channel) = state.channel_mut(name) {
                    if channel.modes.user_limit.take().is_some() {
                        applied.push((false, 'l', None));
                    }
                }
            }
            'o' => {
                let Some(target_nick) = args.next() else { continue };
                let Some(target_id) = state.find_by_nick(target_nick) else {
                    let nick = state.nick_of(conn_id);
                    state.reply(
                        conn_id,
                        &IrcReply::ErrNoSuchNick {
                            nick: &nick,
                            target: target_nick,
                        },
                    );
                    continue;
                };
                let target_display = state.nick_of(target_id);
                let Some(channel) = state.channel_mut(name) else {
                    break;
                };
                if !channel.is_member(target_id) {
                    continue;
                }
                let changed = if adding {
                    channel.operators.insert(target_id)
                } else {
                    channel.operators.remove(&target_id)
                };
                if changed {
                    applied.push((adding, 'o', Some(target_display)));
                }
            }
            _ => {} // unknown flags are ignored
        }
    }

    if applied.is_empty() {
        return None;
    }
    let mut flags = String::new();
    let mut mode_args: Vec<String> = Vec::new();
    let mut last_sign: Option<bool> = None;
    for (sign, flag, arg) in applied {
        if last_sign != Some(sign) {
            flags.push(if sign { '+' } else { '-' });
            last_sign = Some(sign);
        }
        flags.push(flag);
        if let Some(arg) = arg {
            mode_args.push(arg);
        }
    }
    Some(if mode_args.is_empty() {
        flags
    } else {
        format!("{} {}", flags, mode_args.join(" "))
    })
}

// 3.2.8 Kick command
//
//       Command: KICK
//    Parameters: <channel> <user> [<comment>]
//
//    The KICK command can be used to request the forced removal of a user
//    from a channel. If a "comment" is given, this will be sent instead
//    of the default message, the nickname of the user issuing the KICK.
pub fn kick(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    if params.len() < 2 {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "KICK",
            },
        );
        return;
    }
    let name = &params[0];
    let snapshot = state
        .channel(name)
        .map(|c| (c.name.clone(), c.is_operator(conn_id)));
    let Some((display, operator)) = snapshot else {
        state.reply(
            conn_id,
            &IrcReply::ErrNoSuchChannel {
                nick: &nick,
                channel: name,
            },
        );
        return;
    };
    if !operator {
        state.reply(
            conn_id,
            &IrcReply::ErrChanOPrivsNeeded {
                nick: &nick,
                channel: &display,
            },
        );
        return;
    }
    let target = state
        .find_by_nick(&params[1])
        .filter(|&t| state.channel(name).is_some_and(|c| c.is_member(t)));
    let Some(target_id) = target else {
        state.reply(
            conn_id,
            &IrcReply::ErrNotOnChannel {
                nick: &nick,
                channel: &display,
            },
        );
        return;
    };
    let target_display = state.nick_of(target_id);
    let reason = params.get(2).cloned().unwrap_or_else(|| nick.clone());
    let line = IrcReply::Kick {
        op: &nick,
        channel: &display,
        target: &target_display,
        reason: &reason,
    }
    .format(state.server_name());
    state.broadcast_channel(&display, &line, None);
    detach(state, target_id, name);
}

// 3.2.7 Invite message
//
//       Command: INVITE
//    Parameters: <nickname> <channel>
//
//    If the channel exists, only members of the channel are allowed to
//    invite other users. When the channel has invite-only flag set, only
//    channel operators may issue INVITE.
pub fn invite(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    if params.len() < 2 {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "INVITE",
            },
        );
        return;
    }
    let target_nick = &params[0];
    let name = &params[1];
    let Some(target_id) = state.find_by_nick(target_nick) else {
        state.reply(
            conn_id,
            &IrcReply::ErrNoSuchNick {
                nick: &nick,
                target: target_nick,
            },
        );
        return;
    };
    let snapshot = state.channel(name).map(|c| {
        (
            c.name.clone(),
            c.is_member(conn_id),
            c.modes.invite_only,
            c.is_operator(conn_id),
            c.is_member(target_id),
        )
    });
    let Some((display, member, invite_only, operator, target_member)) = snapshot else {
        state.reply(
            conn_id,
            &IrcReply::ErrNoSuchChannel {
                nick: &nick,
                channel: name,
            },
        );
        return;
    };
    if !member {
        state.reply(
            conn_id,
            &IrcReply::ErrNotOnChannel {
                nick: &nick,
                channel: &display,
            },
        );
        return;
    }
    if invite_only && !operator {
        state.reply(
            conn_id,
            &IrcReply::ErrChanOPrivsNeeded {
                nick: &nick,
                channel: &display,
            },
        );
        return;
    }
    let target_display = state.nick_of(target_id);
    if target_member {
        state.reply(
            conn_id,
            &IrcReply::ErrUserOnChannel {
                nick: &nick,
                target: &target_display,
                channel: &display,
            },
        );
        return;
    }
    if let Some(channel) = state.channel_mut(name) {
        channel.invited.insert(irc_to_lower(&target_display));
    }
    let line = IrcReply::Invite {
        op: &nick,
        target: &target_display,
        channel: &display,
    }
    .format(state.server_name());
    state.send_raw(target_id, line);
}
