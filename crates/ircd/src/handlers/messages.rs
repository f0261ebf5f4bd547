use crate::replies::IrcReply;
use crate::server_state::ServerState;
use crate::types::ConnId;

// 3.3.1 Private messages
//
//       Command: PRIVMSG
//    Parameters: <msgtarget> <text to be sent>
//
//    PRIVMSG is used to send private messages between users, as well as
//    to send messages to channels.
pub fn privmsg(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    relay(state, conn_id, params, false);
}

// 3.3.2 Notice
//
//       Command: NOTICE
//    Parameters: <msgtarget> <text>
//
//    The difference between NOTICE and PRIVMSG is that automatic replies
//    MUST NEVER be sent in response to a NOTICE message.
pub fn notice(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    relay(state, conn_id, params, true);
}

/// Delivery shared by PRIVMSG and NOTICE; with `silent` set every error
/// drops the target instead of drawing a numeric.
fn relay(state: &mut ServerState, conn_id: ConnId, params: &[String], silent: bool) {
    let nick = state.nick_of(conn_id);
    let Some(targets) = params.first() else {
        if !silent {
            state.reply(
                conn_id,
                &IrcReply::ErrNoRecipient {
                    nick: &nick,
                    command: "PRIVMSG",
                },
            );
        }
        return;
    };
    let Some(text) = params.get(1) else {
        if !silent {
            state.reply(conn_id, &IrcReply::ErrNoTextToSend { nick: &nick });
        }
        return;
    };
    let (user, host) = match state.client(conn_id) {
        Some(client) => (client.user_or_star().to_owned(), client.host.clone()),
        None => return,
    };

    let targets: Vec<&str> = targets.split(',').collect();
    for target in targets {
        if target.starts_with('#') || target.starts_with('&') {
            let snapshot = state
                .channel(target)
                .map(|c| (c.name.clone(), c.is_member(conn_id)));
            match snapshot {
                None => {
                    if !silent {
                        state.reply(
                            conn_id,
                            &IrcReply::ErrNoSuchChannel {
                                nick: &nick,
                                channel: target,
                            },
                        );
                    }
                }
                Some((display, false)) => {
                    // membership is required to speak; this also covers the
                    // 'n' no-external-messages flag
                    if !silent {
                        state.reply(
                            conn_id,
                            &IrcReply::ErrCannotSendToChan {
                                nick: &nick,
                                channel: &display,
                            },
                        );
                    }
                }
                Some((display, true)) => {
                    let line = relay_line(silent, &nick, &user, &host, &display, text, state);
                    state.broadcast_channel(&display, &line, Some(conn_id));
                }
            }
        } else {
            match state.find_by_nick(target) {
                None => {
                    if !silent {
                        state.reply(
                            conn_id,
                            &IrcReply::ErrNoSuchNick {
                                nick: &nick,
                                target,
                            },
                        );
                    }
                }
                Some(target_id) => {
                    let line = relay_line(silent, &nick, &user, &host, target, text, state);
                    state.send_raw(target_id, line);
                }
            }
        }
    }
}

fn relay_line(
    silent: bool,
    nick: &str,
    user: &str,
    host: &str,
    target: &str,
    text: &str,
    state: &ServerState,
) -> String {
    let reply = if silent {
        IrcReply::Notice {
            nick,
            user,
            host,
            target,
            text,
        }
    } else {
        IrcReply::Privmsg {
            nick,
            user,
            host,
            target,
            text,
        }
    };
    reply.format(state.server_name())
}
