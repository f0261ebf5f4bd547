use log::info;

use crate::parsers::is_valid_nickname;
use crate::replies::IrcReply;
use crate::server_state::ServerState;
use crate::types::ConnId;
use crate::users::modes_from_bitmask;

// 3.1.1 Password message
//
//       Command: PASS
//    Parameters: <password>
//
//    The PASS command is used to set a 'connection password'.  The
//    optional password can and MUST be set before any attempt to register
//    the connection is made.
pub fn pass(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    let Some(client) = state.client(conn_id) else {
        return;
    };
    if client.registered || client.pass_accepted {
        state.reply(conn_id, &IrcReply::ErrAlreadyRegistered { nick: &nick });
        return;
    }
    let Some(attempt) = params.first() else {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "PASS",
            },
        );
        return;
    };
    if !state.password_required() || attempt.as_str() == state.password() {
        if let Some(client) = state.client_mut(conn_id) {
            client.pass_accepted = true;
            client.password_ok = true;
        }
    } else {
        state.reply(conn_id, &IrcReply::ErrPasswdMismatch { nick: &nick });
    }
}

// 3.1.2 Nick message
//
//       Command: NICK
//    Parameters: <nickname>
//
//    NICK command is used to give user a nickname or change the existing
//    one.
pub fn nick(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    let Some(attempt) = params.first() else {
        state.reply(conn_id, &IrcReply::ErrNoNicknameGiven { nick: &nick });
        return;
    };
    if !is_valid_nickname(attempt) {
        state.reply(
            conn_id,
            &IrcReply::ErrErroneusNickname {
                nick: &nick,
                attempted: attempt,
            },
        );
        return;
    }
    if state.nick_in_use(attempt, conn_id) {
        state.reply(
            conn_id,
            &IrcReply::ErrNicknameInUse {
                nick: &nick,
                attempted: attempt,
            },
        );
        return;
    }
    let Some(client) = state.client_mut(conn_id) else {
        return;
    };
    let old = client.nick.replace(attempt.clone());
    if client.registered {
        if let Some(old) = old {
            let line = IrcReply::NickChange {
                old: &old,
                new: attempt,
            }
            .format(state.server_name());
            state.broadcast_peers(conn_id, &line, true);
        }
    } else {
        try_complete_registration(state, conn_id);
    }
}

// 3.1.3 User message
//
//       Command: USER
//    Parameters: <user> <mode> <unused> <realname>
//
//    The USER command is used at the beginning of connection to specify
//    the username, hostname and realname of a new user. The <mode>
//    parameter is a bitmask; bit 2 sets 'w', bit 3 sets 'i'.
pub fn user(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let nick = state.nick_of(conn_id);
    let Some(client) = state.client(conn_id) else {
        return;
    };
    if client.registered {
        state.reply(conn_id, &IrcReply::ErrAlreadyRegistered { nick: &nick });
        return;
    }
    if params.len() < 4 {
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "USER",
            },
        );
        return;
    }
    let bitmask = params[1].parse::<u8>().unwrap_or(0);
    if let Some(client) = state.client_mut(conn_id) {
        client.user = Some(params[0].clone());
        client.realname = Some(params[3].clone());
        client.modes = modes_from_bitmask(bitmask);
    }
    try_complete_registration(state, conn_id);
}

/// Registration completes as soon as the password gate, NICK and USER all
/// hold, in whatever order the client supplied them. Emits the welcome
/// burst followed by the MOTD.
fn try_complete_registration(state: &mut ServerState, conn_id: ConnId) {
    let Some(client) = state.client(conn_id) else {
        return;
    };
    if client.registered || !client.password_ok {
        return;
    }
    let (Some(nick), Some(user)) = (client.nick.clone(), client.user.clone()) else {
        return;
    };
    let host = client.host.clone();
    if let Some(client) = state.client_mut(conn_id) {
        client.registered = true;
    }
    info!("[{conn_id}] {nick} registered from {host}");

    let version = state.config.server.version.clone();
    let created = state.created_at().to_owned();
    let motd = state.config.server.motd.clone();
    state.reply(
        conn_id,
        &IrcReply::Welcome {
            nick: &nick,
            user: &user,
            host: &host,
        },
    );
    state.reply(
        conn_id,
        &IrcReply::YourHost {
            nick: &nick,
            version: &version,
        },
    );
    state.reply(
        conn_id,
        &IrcReply::Created {
            nick: &nick,
            date: &created,
        },
    );
    state.reply(
        conn_id,
        &IrcReply::MyInfo {
            nick: &nick,
            version: &version,
        },
    );
    state.reply(conn_id, &IrcReply::MotdStart { nick: &nick });
    for line in motd.lines() {
        state.reply(conn_id, &IrcReply::Motd { nick: &nick, text: line });
    }
    state.reply(conn_id, &IrcReply::EndOfMotd { nick: &nick });
}

// 3.1.7 Quit
//
//       Command: QUIT
//    Parameters: [ <Quit Message> ]
pub fn quit(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let reason = params.first().cloned().unwrap_or_default();
    quit_client(state, conn_id, &reason);
}

/// Shared teardown path for QUIT, read/write failure and outbound-queue
/// overflow: one QUIT broadcast per peer sharing a channel, then registry
/// removal.
pub fn quit_client(state: &mut ServerState, conn_id: ConnId, reason: &str) {
    let Some(client) = state.client(conn_id) else {
        return;
    };
    let nick = client.nick_or_star().to_owned();
    info!("[{conn_id}] {nick} disconnected: {reason}");
    let line = IrcReply::Quit {
        nick: &nick,
        reason,
    }
    .format(state.server_name());
    state.broadcast_peers(conn_id, &line, false);
    state.remove_client(conn_id);
}
