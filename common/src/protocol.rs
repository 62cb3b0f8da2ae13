use serde::{Deserialize, Serialize};

use crate::models::{BoardLayout, BoardParams, Pos, TileId};

#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "action")]
pub enum ClientMessage {
    /// Per-tick pick report: the identity of the tile object under the
    /// view's pointer, or `None` when nothing is hit.
    #[serde(rename = "pick")]
    Pick { tile: Option<TileId> },
    #[serde(rename = "restart")]
    Restart { params: BoardParams },
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum HoverTransition {
    #[serde(rename = "entered")]
    Entered { pos: Pos },
    #[serde(rename = "left")]
    Left { pos: Pos },
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "init")]
    Init {
        layout: BoardLayout,
        hovered: Option<Pos>,
    },
    #[serde(rename = "hover")]
    Hover {
        transitions: Vec<HoverTransition>,
        hovered: Option<Pos>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_messages_tag_by_action() {
        let msg: ClientMessage = serde_json::from_str(r#"{"action":"pick","tile":null}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Pick { tile: None }));
    }

    #[test]
    fn transitions_tag_by_event() {
        let json = serde_json::to_string(&HoverTransition::Entered {
            pos: Pos { x: 3, y: 3 },
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"entered","pos":{"x":3,"y":3}}"#);
    }
}
