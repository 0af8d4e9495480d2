// ── Push topic names ──
//
// Topic strings subscribed for a snapshot's locations. The naming scheme
// is a best guess at what the vendor publishes to; see DESIGN.md.

use diafon_api::Location;

/// Topic every installation is subscribed to.
pub const GLOBAL_TOPIC: &str = "diafon_all";

/// `location_{id}` per location, `block_{id}_{block}` and
/// `room_{id}_{block}{room}` per room, then the global topic. Duplicates
/// are dropped, first occurrence wins.
pub fn push_topics(locations: &[Location]) -> Vec<String> {
    let mut topics = Vec::new();

    for location in locations {
        let id = &location.location_id;
        push_unique(&mut topics, format!("location_{id}"));

        for room in &location.location_rooms {
            push_unique(&mut topics, format!("block_{id}_{}", room.block_num));
            push_unique(&mut topics, format!("room_{id}_{}", room.room_id()));
        }
    }

    push_unique(&mut topics, GLOBAL_TOPIC.to_owned());
    topics
}

fn push_unique(topics: &mut Vec<String>, topic: String) {
    if !topics.contains(&topic) {
        topics.push(topic);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn topics_per_location_block_and_room() {
        let locations: Vec<Location> = serde_json::from_value(json!([
            {
                "location_id": "L1",
                "location_rooms": [
                    {"block_num": "A", "room_num": "1"},
                    {"block_num": "A", "room_num": "2"}
                ]
            },
            {"location_id": "L2"}
        ]))
        .unwrap();

        assert_eq!(
            push_topics(&locations),
            vec![
                "location_L1",
                "block_L1_A",
                "room_L1_A1",
                "room_L1_A2",
                "location_L2",
                "diafon_all",
            ]
        );
    }

    #[test]
    fn no_locations_still_subscribes_globally() {
        assert_eq!(push_topics(&[]), vec!["diafon_all"]);
    }
}
