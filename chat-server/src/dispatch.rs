//! Handlers for one line of client input.

use tokio::time::Instant;
use tracing::{debug, info};

use crate::{
    command::{Command, CommandError, Input},
    config::minutes,
    message::ServerMessage,
    moderation::Verdict,
    room::Room,
    session::SessionId,
};

/// Parses `line` from session `id` and runs the matching handler.
///
/// Misuse is reported to the sender only; nothing here fails. Lines from a
/// session that is no longer registered are ignored.
pub fn dispatch(room: &Room, id: SessionId, line: &str) {
    match Input::parse(line) {
        Ok(Input::Chat(text)) => chat(room, id, text),
        Ok(Input::Command(command)) => run_command(room, id, command),
        Err(err) => {
            debug!(session = %id, %err, "rejected command");
            room.registry().send_to(id, &ServerMessage::Rejected(err));
        }
    }
}

fn run_command(room: &Room, id: SessionId, command: Command) {
    match command {
        Command::Nick { name } => rename(room, id, name),
        Command::PrivateMessage { target, text } => private_message(room, id, &target, text),
        Command::Complaint { target } => complaint(room, id, &target),
        Command::Delay { minutes, text } => delay(room, id, minutes, text),
        Command::Help => {
            room.registry().send_to(id, &ServerMessage::Help);
        }
    }
}

fn chat(room: &Room, id: SessionId, text: &str) {
    let registry = room.registry();
    let limits = &room.config().limits;
    let now = Instant::now();

    let admitted = registry.with_session(id, |session| {
        match session.moderation.admit(limits, now) {
            Verdict::Allow => {
                session.moderation.record_message(now);
                Some(session.nickname.clone())
            }
            Verdict::Deny(denial) => {
                debug!(session = %id, nickname = %session.nickname, %denial, "chat message denied");
                session.send(ServerMessage::Denied(denial).to_string());
                None
            }
        }
    });

    if let Some(Some(nickname)) = admitted {
        registry.broadcast(
            &ServerMessage::Chat {
                nickname,
                text: text.to_string(),
            },
            &[],
        );
    }
}

fn rename(room: &Room, id: SessionId, name: String) {
    let renamed = room.registry().with_session(id, |session| {
        let previous = std::mem::replace(&mut session.nickname, name);
        info!(session = %id, %previous, nickname = %session.nickname, "nickname changed");
        session.send(
            ServerMessage::NicknameChanged {
                nickname: session.nickname.clone(),
            }
            .to_string(),
        );
    });

    if renamed.is_none() {
        debug!(session = %id, "rename for unknown session ignored");
    }
}

fn private_message(room: &Room, id: SessionId, target: &str, text: String) {
    let registry = room.registry();
    let Some(sender) = registry.nickname(id) else {
        return;
    };

    if sender == target {
        registry.send_to(id, &ServerMessage::SelfMessage);
        return;
    }

    let delivered = registry.send_to_nickname(
        target,
        &ServerMessage::Private {
            from: sender.clone(),
            text,
        },
    );

    // One notice at most, and only when nobody in the room has that name.
    if delivered == 0 {
        registry.send_to(
            id,
            &ServerMessage::NoSuchUser {
                nickname: target.to_string(),
            },
        );
    }
    debug!(session = %id, %sender, to = target, delivered, "private message");
}

fn complaint(room: &Room, id: SessionId, target: &str) {
    let registry = room.registry();
    let limits = &room.config().limits;
    let Some(sender) = registry.nickname(id) else {
        return;
    };

    if sender == target {
        registry.send_to(id, &ServerMessage::SelfComplaint);
        return;
    }

    let now = Instant::now();
    let matched = registry.with_nickname(target, |session| {
        if session.moderation.register_complaint(limits, now) {
            info!(
                session = %session.id(),
                nickname = %session.nickname,
                complaints = session.moderation.complaint_count(),
                "user banned"
            );
        }
    });

    let reply = if matched == 0 {
        ServerMessage::NoSuchUser {
            nickname: target.to_string(),
        }
    } else {
        ServerMessage::ComplaintAccepted {
            nickname: target.to_string(),
        }
    };
    registry.send_to(id, &reply);
}

fn delay(room: &Room, id: SessionId, delay_minutes: u64, text: String) {
    let registry = room.registry();
    let max = room.config().max_delay_minutes;
    let too_long = ServerMessage::Rejected(CommandError::DelayTooLong { max });
    if delay_minutes > max {
        registry.send_to(id, &too_long);
        return;
    }

    let Some(nickname) = registry.nickname(id) else {
        return;
    };

    let scheduled = room
        .scheduler()
        .schedule(minutes(delay_minutes), ServerMessage::Chat { nickname, text });
    if scheduled.is_none() {
        debug!(session = %id, minutes = delay_minutes, "delay overflows the clock");
        registry.send_to(id, &too_long);
        return;
    }
    registry.send_to(
        id,
        &ServerMessage::DelayScheduled {
            minutes: delay_minutes,
        },
    );
    debug!(session = %id, minutes = delay_minutes, "delayed message scheduled");
}
