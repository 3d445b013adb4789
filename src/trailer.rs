use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::compartment::{
    Compartment, CompartmentChange, CompartmentError, CompartmentFields, CompartmentId,
    CompartmentManager, Liters,
};


/// Weight in kilograms.
pub type Kilograms = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrailerId(pub u64);

impl fmt::Display for TrailerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Registration data of a trailer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailerDetails {
    pub trailer_code: String,
    pub trailer_name: String,
    pub registration_number: String,
    pub volume_capacity: Liters,
    pub weight_capacity: Kilograms,
}

/// Editable trailer data. The trailer code is fixed at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsUpdate {
    pub trailer_name: String,
    pub registration_number: String,
    pub volume_capacity: Liters,
    pub weight_capacity: Kilograms,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrailerCommand {
    AddCompartment(CompartmentFields),
    UpdateCompartment(CompartmentId, CompartmentFields),
    RemoveCompartment(CompartmentId),
    UpdateDetails(DetailsUpdate),
    /// Force the trailer inactive. There is no matching activate command.
    Deactivate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrailerEvent {
    Registered {
        id: TrailerId,
        details: TrailerDetails,
    },
    DetailsUpdated {
        id: TrailerId,
        update: DetailsUpdate,
    },
    CompartmentAdded {
        id: TrailerId,
        compartment: Compartment,
    },
    CompartmentUpdated {
        id: TrailerId,
        compartment: Compartment,
    },
    #[serde(rename_all = "camelCase")]
    CompartmentRemoved {
        id: TrailerId,
        compartment_id: CompartmentId,
        gap_report: Vec<u32>,
    },
    ActivityChanged {
        id: TrailerId,
        active: bool,
    },
}

impl TrailerEvent {
    pub fn trailer_id(&self) -> TrailerId {
        match self {
            TrailerEvent::Registered { id, .. }
            | TrailerEvent::DetailsUpdated { id, .. }
            | TrailerEvent::CompartmentAdded { id, .. }
            | TrailerEvent::CompartmentUpdated { id, .. }
            | TrailerEvent::CompartmentRemoved { id, .. }
            | TrailerEvent::ActivityChanged { id, .. } => *id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TrailerError {
    #[error(transparent)]
    Compartment(#[from] CompartmentError),

    #[error("trailer code is required")]
    MissingTrailerCode,

    #[error("{0} capacity must not be negative")]
    NegativeCapacity(&'static str),
}

fn check_capacities(volume: Liters, weight: Kilograms) -> Result<(), TrailerError> {
    if volume < 0 {
        return Err(TrailerError::NegativeCapacity("volume"));
    }
    if weight < 0 {
        return Err(TrailerError::NegativeCapacity("weight"));
    }
    Ok(())
}

impl TrailerDetails {
    pub fn check(&self) -> Result<(), TrailerError> {
        if self.trailer_code.trim().is_empty() {
            return Err(TrailerError::MissingTrailerCode);
        }
        check_capacities(self.volume_capacity, self.weight_capacity)
    }
}

impl DetailsUpdate {
    pub fn check(&self) -> Result<(), TrailerError> {
        check_capacities(self.volume_capacity, self.weight_capacity)
    }
}

/// A trailer and the compartments it owns.
///
/// Every compartment command re-derives `active`; an `ActivityChanged` event
/// is emitted only when the value flips.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    id: TrailerId,
    details: TrailerDetails,
    compartments: CompartmentManager,
    active: bool,
}

impl Trailer {
    /// A freshly registered trailer: no compartments, inactive.
    pub fn create(id: TrailerId, details: TrailerDetails) -> Self {
        Self {
            id,
            details,
            compartments: CompartmentManager::default(),
            active: false,
        }
    }

    /// Rebuild a trailer from its event history. The first event must be
    /// its registration, and it must be the only one.
    pub fn replay<'a, I>(events: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a TrailerEvent>,
    {
        let mut events = events.into_iter();
        let mut trailer = match events.next()? {
            TrailerEvent::Registered { id, details } => Trailer::create(*id, details.clone()),
            _ => return None,
        };
        for event in events {
            if let TrailerEvent::Registered { .. } = event {
                return None;
            }
            trailer.apply_event(event);
        }
        Some(trailer)
    }

    pub fn details(&self) -> &TrailerDetails {
        &self.details
    }

    pub fn compartments(&self) -> &[Compartment] {
        self.compartments.compartments()
    }

    pub fn number_of_compartments(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Numbers missing from the compartment sequence.
    pub fn missing_numbers(&self) -> Vec<u32> {
        self.compartments.missing_numbers()
    }

    fn compartment_events(&self, event: TrailerEvent, change: &CompartmentChange) -> Vec<TrailerEvent> {
        let mut events = vec![event];
        if change.active != self.active {
            events.push(TrailerEvent::ActivityChanged {
                id: self.id,
                active: change.active,
            });
        }
        events
    }
}

impl Aggregate for Trailer {
    type Id = TrailerId;
    type Command = TrailerCommand;
    type Event = TrailerEvent;
    type Error = TrailerError;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let id = self.id;
        match command {
            TrailerCommand::AddCompartment(fields) => {
                let change = self.compartments.add(fields.clone())?;
                let event = TrailerEvent::CompartmentAdded {
                    id,
                    compartment: change.compartment.clone(),
                };
                Ok(self.compartment_events(event, &change))
            }
            TrailerCommand::UpdateCompartment(compartment_id, fields) => {
                let change = self.compartments.update(*compartment_id, fields.clone())?;
                let event = TrailerEvent::CompartmentUpdated {
                    id,
                    compartment: change.compartment.clone(),
                };
                Ok(self.compartment_events(event, &change))
            }
            TrailerCommand::RemoveCompartment(compartment_id) => {
                let change = self.compartments.remove(*compartment_id)?;
                let event = TrailerEvent::CompartmentRemoved {
                    id,
                    compartment_id: *compartment_id,
                    gap_report: change.gap_report.clone(),
                };
                Ok(self.compartment_events(event, &change))
            }
            TrailerCommand::UpdateDetails(update) => {
                update.check()?;
                Ok(vec![TrailerEvent::DetailsUpdated {
                    id,
                    update: update.clone(),
                }])
            }
            TrailerCommand::Deactivate if self.active => {
                Ok(vec![TrailerEvent::ActivityChanged { id, active: false }])
            }
            TrailerCommand::Deactivate => Ok(Vec::new()),
        }
    }

    fn apply_event(&mut self, event: &Self::Event) {
        match event {
            TrailerEvent::Registered { details, .. } => {
                self.details = details.clone();
            }
            TrailerEvent::DetailsUpdated { update, .. } => {
                self.details.trailer_name = update.trailer_name.clone();
                self.details.registration_number = update.registration_number.clone();
                self.details.volume_capacity = update.volume_capacity;
                self.details.weight_capacity = update.weight_capacity;
            }
            TrailerEvent::CompartmentAdded { compartment, .. } => {
                self.compartments.insert(compartment.clone());
            }
            TrailerEvent::CompartmentUpdated { compartment, .. } => {
                self.compartments.replace(compartment.clone());
            }
            TrailerEvent::CompartmentRemoved { compartment_id, .. } => {
                self.compartments.delete(*compartment_id);
            }
            TrailerEvent::ActivityChanged { active, .. } => {
                self.active = *active;
            }
        }
    }
}
