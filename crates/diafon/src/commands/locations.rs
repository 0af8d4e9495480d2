//! Location command handler.

use diafon_core::{Coordinator, Location};
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{Listed, Output};

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct LocationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Door SIP")]
    sip: String,
    #[tabled(rename = "MAC")]
    mac: String,
    #[tabled(rename = "Rooms")]
    rooms: String,
}

impl Listed for Location {
    type Row = LocationRow;

    fn row(&self) -> LocationRow {
        let device = self.device();
        LocationRow {
            id: self.location_id.clone(),
            name: self.location_name.clone(),
            sip: device.map(|d| d.sip.clone()).unwrap_or_default(),
            mac: device.map(|d| d.mac.clone()).unwrap_or_default(),
            rooms: self
                .location_rooms
                .iter()
                .map(diafon_core::Room::room_id)
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    fn plain(&self) -> String {
        format!("{}\t{}", self.location_id, self.location_name)
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(coordinator: &Coordinator, global: &GlobalOpts) -> Result<(), CliError> {
    let snap = util::snapshot(coordinator)?;
    Output::new(global).list(&snap.locations);
    Ok(())
}
