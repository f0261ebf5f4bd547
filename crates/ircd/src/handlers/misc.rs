use crate::replies::IrcReply;
use crate::server_state::ServerState;
use crate::types::ConnId;

// 3.7.2 Ping message
//
//       Command: PING
//    Parameters: <server1> [ <server2> ]
pub fn ping(state: &mut ServerState, conn_id: ConnId, params: &[String]) {
    let Some(token) = params.first() else {
        let nick = state.nick_of(conn_id);
        state.reply(
            conn_id,
            &IrcReply::ErrNeedMoreParams {
                nick: &nick,
                command: "PING",
            },
        );
        return;
    };
    let line = IrcReply::Pong { token }.format(state.server_name());
    state.send_raw(conn_id, line);
}

// 3.7.3 Pong message
//
//       Command: PONG
//    Parameters: <server> [ <server2> ]
//
//    Acknowledged and dropped; no idle timer is kept.
pub fn pong(_state: &mut ServerState, _conn_id: ConnId, _params: &[String]) {}
