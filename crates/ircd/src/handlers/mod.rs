pub mod channels;
pub mod messages;
pub mod misc;
pub mod registration;

use log::{debug, trace};

use crate::message::Message;
use crate::replies::IrcReply;
use crate::server_state::ServerState;
use crate::types::ConnId;

/// Verbs a connection may use before completing registration. Anything
/// else is ignored until the handshake is done.
const PRE_REGISTRATION_VERBS: [&str; 5] = ["PASS", "NICK", "USER", "QUIT", "PING"];

/// Runs one complete line from one client against the registry. Every
/// handler finishes before the broker looks at the next event, so each
/// either commits all of its mutations or none.
pub fn dispatch(state: &mut ServerState, conn_id: ConnId, line: &str) {
    let message = match Message::parse(line) {
        Ok(message) => message,
        Err(err) => {
            debug!("[{conn_id}] dropping malformed line: {err}");
            return;
        }
    };
    trace!("[{conn_id}] >> {message}");

    let verb = message.command.as_str();
    let registered = state.client(conn_id).is_some_and(|c| c.registered);
    if !registered && !PRE_REGISTRATION_VERBS.contains(&verb) {
        return;
    }

    let params = &message.params;
    match verb {
        "PASS" => registration::pass(state, conn_id, params),
        "NICK" => registration::nick(state, conn_id, params),
        "USER" => registration::user(state, conn_id, params),
        "QUIT" => registration::quit(state, conn_id, params),
        "JOIN" => channels::join(state, conn_id, params),
        "PART" => channels::part(state, conn_id, params),
        "TOPIC" => channels::topic(state, conn_id, params),
        "MODE" => channels::mode(state, conn_id, params),
        "KICK" => channels::kick(state, conn_id, params),
        "INVITE" => channels::invite(state, conn_id, params),
        "PRIVMSG" => messages::privmsg(state, conn_id, params),
        "NOTICE" => messages::notice(state, conn_id, params),
        "PING" => misc::ping(state, conn_id, params),
        "PONG" => misc::pong(state, conn_id, params),
        _ => {
            let nick = state.nick_of(conn_id);
            state.reply(
                conn_id,
                &IrcReply::ErrUnknownCommand {
                    nick: &nick,
                    command: verb,
                },
            );
        }
    }
}
