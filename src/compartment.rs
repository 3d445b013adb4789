use std::collections::BTreeSet;
use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
mod tests;

/// Volume in liters.
pub type Liters = i64;

/// Opaque compartment identifier, allocated when a compartment is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompartmentId(Uuid);

impl CompartmentId {
    /// Allocate a fresh identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CompartmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CompartmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Editable fields of a compartment, as submitted by the edit form.
///
/// `compartment_no` is `None` when the caller wants the lowest free number.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compartment_no: Option<u32>,
    pub capacity: Liters,
    #[serde(default)]
    pub min_volume: Liters,
    #[serde(default)]
    pub max_volume: Liters,
    #[serde(default)]
    pub allowed_products: BTreeSet<String>,
    #[serde(default)]
    pub partial_load_allowed: bool,
    #[serde(default)]
    pub must_use: bool,
}

impl CompartmentFields {
    pub fn new(capacity: Liters, min_volume: Liters, max_volume: Liters) -> Self {
        Self {
            capacity,
            min_volume,
            max_volume,
            ..Self::default()
        }
    }

    pub fn numbered(mut self, compartment_no: u32) -> Self {
        self.compartment_no = Some(compartment_no);
        self
    }

    pub fn partial_load_allowed(mut self, allowed: bool) -> Self {
        self.partial_load_allowed = allowed;
        self
    }

    pub fn must_use(mut self, must_use: bool) -> Self {
        self.must_use = must_use;
        self
    }

    pub fn products<I, S>(mut self, products: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_products = products.into_iter().map(Into::into).collect();
        self
    }
}

/// A stored compartment: normalized fields plus identity and a resolved number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compartment {
    pub id: CompartmentId,
    pub compartment_no: u32,
    pub capacity: Liters,
    pub min_volume: Liters,
    pub max_volume: Liters,
    pub allowed_products: BTreeSet<String>,
    pub partial_load_allowed: bool,
    pub must_use: bool,
}

impl Compartment {
    fn from_fields(id: CompartmentId, compartment_no: u32, fields: CompartmentFields) -> Self {
        Self {
            id,
            compartment_no,
            capacity: fields.capacity,
            min_volume: fields.min_volume,
            max_volume: fields.max_volume,
            allowed_products: fields.allowed_products,
            partial_load_allowed: fields.partial_load_allowed,
            must_use: fields.must_use,
        }
    }

    /// The editable fields of this compartment, with its number filled in.
    pub fn fields(&self) -> CompartmentFields {
        CompartmentFields {
            compartment_no: Some(self.compartment_no),
            capacity: self.capacity,
            min_volume: self.min_volume,
            max_volume: self.max_volume,
            allowed_products: self.allowed_products.clone(),
            partial_load_allowed: self.partial_load_allowed,
            must_use: self.must_use,
        }
    }
}

/// Volume rule violations, reported in the order the rules are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("capacity must be greater than zero")]
    CapacityRequired,

    #[error("minimum volume exceeds capacity")]
    MinExceedsCapacity,

    #[error("maximum volume exceeds capacity")]
    MaxExceedsCapacity,

    #[error("minimum volume exceeds maximum volume")]
    MinExceedsMax,
}

/// Reasons a compartment mutation is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompartmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("compartment number must be between 1 and {max}")]
    InvalidNumber { max: u32 },

    #[error("compartment number {0} is already in use")]
    DuplicateNumber(u32),

    #[error("compartment {0} not found")]
    NotFound(CompartmentId),
}

/// Check the volume rules and normalize the candidate.
///
/// The first failing rule wins. On success the result satisfies
/// `0 <= min_volume <= max_volume <= capacity`; a must-use compartment is
/// forced full when partial loads are not allowed and otherwise gets a
/// minimum volume of at least one liter.
pub fn validate(candidate: CompartmentFields) -> Result<CompartmentFields, ValidationError> {
    let capacity = candidate.capacity;
    let (mut min_volume, mut max_volume) = (candidate.min_volume, candidate.max_volume);

    if capacity <= 0 {
        return Err(ValidationError::CapacityRequired);
    }
    if min_volume > capacity {
        return Err(ValidationError::MinExceedsCapacity);
    }
    if max_volume > capacity {
        return Err(ValidationError::MaxExceedsCapacity);
    }
    if min_volume > max_volume {
        return Err(ValidationError::MinExceedsMax);
    }

    if candidate.must_use && !candidate.partial_load_allowed {
        min_volume = capacity;
        max_volume = capacity;
    } else if candidate.must_use {
        min_volume = min_volume.max(1);
        max_volume = max_volume.max(min_volume);
    }

    let max_volume = max_volume.clamp(0, capacity);
    let min_volume = min_volume.clamp(0, max_volume);

    Ok(CompartmentFields {
        min_volume,
        max_volume,
        ..candidate
    })
}

/// Lowest positive number not used by `existing`.
pub fn next_compartment_number(existing: &[Compartment]) -> u32 {
    let taken: BTreeSet<u32> = existing.iter().map(|c| c.compartment_no).collect();
    let mut next = 1;
    for no in taken {
        if no == next {
            next += 1;
        } else if no > next {
            break;
        }
    }
    next
}

/// Whether the compartment numbers are exactly `1..=N`.
pub fn is_sequential(compartments: &[Compartment]) -> bool {
    let mut numbers: Vec<u32> = compartments.iter().map(|c| c.compartment_no).collect();
    numbers.sort_unstable();
    numbers.iter().zip(1u32..).all(|(no, expected)| *no == expected)
}

/// Numbers in `1..=max` that no compartment uses, ascending.
pub fn missing_numbers(compartments: &[Compartment]) -> Vec<u32> {
    let taken: BTreeSet<u32> = compartments.iter().map(|c| c.compartment_no).collect();
    let max = taken.last().copied().unwrap_or(0);
    (1..=max).filter(|no| !taken.contains(no)).collect()
}

/// Result of an accepted compartment mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompartmentChange {
    /// The compartment that was added, replaced or removed.
    pub compartment: Compartment,
    /// The full collection afterwards, ascending by number.
    pub compartments: Vec<Compartment>,
    /// Derived trailer status for the new collection.
    pub active: bool,
    /// Missing numbers left behind by a removal. Empty for add and update.
    pub gap_report: Vec<u32>,
}

/// Owns the compartments of a single trailer.
///
/// Every mutation is computed on a copy and handed back as a
/// [`CompartmentChange`], so a rejected candidate never touches the list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompartmentManager {
    compartments: Vec<Compartment>,
}

impl CompartmentManager {
    pub fn new(mut compartments: Vec<Compartment>) -> Self {
        compartments.sort_by_key(|c| c.compartment_no);
        Self { compartments }
    }

    /// Compartments ascending by number.
    pub fn compartments(&self) -> &[Compartment] {
        &self.compartments
    }

    pub fn len(&self) -> usize {
        self.compartments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compartments.is_empty()
    }

    pub fn get(&self, id: CompartmentId) -> Option<&Compartment> {
        self.compartments.iter().find(|c| c.id == id)
    }

    /// At least one compartment and no gaps in the numbering.
    pub fn is_active(&self) -> bool {
        !self.compartments.is_empty() && is_sequential(&self.compartments)
    }

    pub fn missing_numbers(&self) -> Vec<u32> {
        missing_numbers(&self.compartments)
    }

    /// Validate `candidate` and compute the collection with it appended.
    pub fn add(&self, candidate: CompartmentFields) -> Result<CompartmentChange, CompartmentError> {
        let requested = candidate.compartment_no;
        let fields = validate(candidate)?;
        let compartment_no = match requested {
            Some(no) => self.check_number(no, self.slots() + 1, None)?,
            None => next_compartment_number(&self.compartments),
        };

        let compartment = Compartment::from_fields(CompartmentId::new(), compartment_no, fields);
        let mut next = self.clone();
        next.insert(compartment.clone());
        debug!("compartment {} added as number {}", compartment.id, compartment_no);
        Ok(next.into_change(compartment, Vec::new()))
    }

    /// Validate `candidate` and compute the collection with compartment `id`
    /// replaced. Without an explicit number the compartment keeps its own.
    pub fn update(
        &self,
        id: CompartmentId,
        candidate: CompartmentFields,
    ) -> Result<CompartmentChange, CompartmentError> {
        let current = self.get(id).ok_or(CompartmentError::NotFound(id))?;
        let requested = candidate.compartment_no;
        let fields = validate(candidate)?;
        let compartment_no = match requested {
            Some(no) => self.check_number(no, self.slots(), Some(id))?,
            None => current.compartment_no,
        };

        let compartment = Compartment::from_fields(id, compartment_no, fields);
        let mut next = self.clone();
        next.replace(compartment.clone());
        debug!("compartment {} updated as number {}", id, compartment_no);
        Ok(next.into_change(compartment, Vec::new()))
    }

    /// Compute the collection without compartment `id`. Gaps left behind are
    /// reported, never repaired.
    pub fn remove(&self, id: CompartmentId) -> Result<CompartmentChange, CompartmentError> {
        let mut next = self.clone();
        let removed = next.delete(id).ok_or(CompartmentError::NotFound(id))?;
        let gap_report = if is_sequential(&next.compartments) {
            Vec::new()
        } else {
            next.missing_numbers()
        };
        debug!("compartment {} removed, gaps: {:?}", id, gap_report);
        Ok(next.into_change(removed, gap_report))
    }

    /// Store a compartment that was already accepted.
    pub fn insert(&mut self, compartment: Compartment) {
        self.compartments.push(compartment);
        self.sort();
    }

    /// Swap in an accepted replacement for the compartment with the same id.
    pub fn replace(&mut self, compartment: Compartment) {
        if let Some(slot) = self.compartments.iter_mut().find(|c| c.id == compartment.id) {
            *slot = compartment;
            self.sort();
        }
    }

    pub fn delete(&mut self, id: CompartmentId) -> Option<Compartment> {
        let index = self.compartments.iter().position(|c| c.id == id)?;
        Some(self.compartments.remove(index))
    }

    fn slots(&self) -> u32 {
        u32::try_from(self.compartments.len()).unwrap_or(u32::MAX - 1)
    }

    /// Explicit numbers stay within `1..=max`; gap filling never needs more,
    /// and it keeps gap reports as small as the collection.
    fn check_number(
        &self,
        no: u32,
        max: u32,
        editing: Option<CompartmentId>,
    ) -> Result<u32, CompartmentError> {
        if no == 0 || no > max {
            return Err(CompartmentError::InvalidNumber { max });
        }
        let clash = self
            .compartments
            .iter()
            .any(|c| c.compartment_no == no && Some(c.id) != editing);
        if clash {
            return Err(CompartmentError::DuplicateNumber(no));
        }
        Ok(no)
    }

    fn sort(&mut self) {
        self.compartments.sort_by_key(|c| c.compartment_no);
    }

    fn into_change(self, compartment: Compartment, gap_report: Vec<u32>) -> CompartmentChange {
        let active = self.is_active();
        CompartmentChange {
            compartment,
            compartments: self.compartments,
            active,
            gap_report,
        }
    }
}
