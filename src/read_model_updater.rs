use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::compartment::Liters;
use crate::trailer::{Kilograms, TrailerEvent, TrailerId};


/// Types which update the read model.
pub trait ReadModelUpdater {
    /// Associated Type representing the event for set of Aggregates.
    type SetEvent;

    /// Error type of handling ReadModelUpdater.
    type Error;

    /// Update the read model with events that were already saved.
    fn update(&mut self, events: Vec<Self::SetEvent>) -> Result<(), Self::Error>;
}

/// One row of the trailer table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailerSummary {
    pub id: TrailerId,
    pub trailer_code: String,
    pub trailer_name: String,
    pub registration_number: String,
    pub volume_capacity: Liters,
    pub weight_capacity: Kilograms,
    pub number_of_compartments: usize,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("no summary for trailer {0}")]
    UnknownTrailer(TrailerId),
}

/// The trailer list read model: summaries ordered by id.
#[derive(Debug, Default)]
pub struct TrailerDirectory {
    rows: BTreeMap<TrailerId, TrailerSummary>,
}

impl TrailerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TrailerId) -> Option<&TrailerSummary> {
        self.rows.get(&id)
    }

    pub fn list(&self) -> impl Iterator<Item = &TrailerSummary> {
        self.rows.values()
    }

    pub fn find_by_code(&self, code: &str) -> Option<&TrailerSummary> {
        self.rows.values().find(|row| row.trailer_code == code)
    }

    fn row(&mut self, id: TrailerId) -> Result<&mut TrailerSummary, DirectoryError> {
        self.rows.get_mut(&id).ok_or(DirectoryError::UnknownTrailer(id))
    }
}

impl ReadModelUpdater for TrailerDirectory {
    type SetEvent = TrailerEvent;
    type Error = DirectoryError;

    fn update(&mut self, events: Vec<Self::SetEvent>) -> Result<(), Self::Error> {
        for event in events {
            match event {
                TrailerEvent::Registered { id, details } => {
                    self.rows.insert(
                        id,
                        TrailerSummary {
                            id,
                            trailer_code: details.trailer_code,
                            trailer_name: details.trailer_name,
                            registration_number: details.registration_number,
                            volume_capacity: details.volume_capacity,
                            weight_capacity: details.weight_capacity,
                            number_of_compartments: 0,
                            active: false,
                        },
                    );
                }
                TrailerEvent::DetailsUpdated { id, update } => {
                    let row = self.row(id)?;
                    row.trailer_name = update.trailer_name;
                    row.registration_number = update.registration_number;
                    row.volume_capacity = update.volume_capacity;
                    row.weight_capacity = update.weight_capacity;
                }
                TrailerEvent::CompartmentAdded { id, .. } => {
                    self.row(id)?.number_of_compartments += 1;
                }
                TrailerEvent::CompartmentUpdated { id, .. } => {
                    // count is unchanged, but the trailer must still be known
                    let _row = self.row(id)?;
                }
                TrailerEvent::CompartmentRemoved { id, .. } => {
                    let row = self.row(id)?;
                    row.number_of_compartments = row.number_of_compartments.saturating_sub(1);
                }
                TrailerEvent::ActivityChanged { id, active } => {
                    self.row(id)?.active = active;
                }
            }
        }
        Ok(())
    }
}
