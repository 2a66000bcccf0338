use serde_json::Value;

#[derive(Debug, PartialEq)]
pub enum ParsedClientMessage {
    MovePlayer { key_pressed: String },
    Ping { t: f64 },
}

/// Clients may only steer their own player; the connection decides `playerId`,
/// so a `playerId` in the payload is ignored.
pub fn parse_client_message(raw: &str) -> Option<ParsedClientMessage> {
    let value: Value = serde_json::from_str(raw).ok()?;
    let object = value.as_object()?;
    let message_type = object.get("type")?.as_str()?;

    match message_type {
        "move-player" => {
            let key_pressed = object.get("keyPressed")?.as_str()?;
            if key_pressed.is_empty() || key_pressed.len() > 32 {
                return None;
            }
            Some(ParsedClientMessage::MovePlayer {
                key_pressed: key_pressed.to_string(),
            })
        }
        "ping" => {
            let t = object.get("t")?.as_f64()?;
            if !t.is_finite() {
                return None;
            }
            Some(ParsedClientMessage::Ping { t })
        }
        _ => None,
    }
}
