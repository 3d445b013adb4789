use std::collections::HashMap;
use std::convert::Infallible;
use std::hash::Hash;


/// Types which persist and load events for set of Aggregates.
pub trait EventStore {
    /// Associated Type representing Aggregate ID.
    type Id;

    /// Associated Type representing the event for set of Aggregates.
    type SetEvent;

    /// Error type of handling EventStore.
    type Error;

    /// Save the events.
    /// Arrange to call EventBroker::publish() when saving the events.
    fn save(&mut self, id: Self::Id, events: Vec<Self::SetEvent>) -> Result<(), Self::Error>;

    /// Load the events, oldest first. Unknown ids have no events.
    fn load(&self, id: Self::Id) -> Result<Vec<Self::SetEvent>, Self::Error>;

    /// Ids of every Aggregate with at least one saved event.
    fn ids(&self) -> Result<Vec<Self::Id>, Self::Error>;
}

/// Event store kept in memory, one append-only stream per Aggregate.
///
/// Writers are not versioned: concurrent sessions editing the same Aggregate
/// simply append after each other.
#[derive(Debug, Clone)]
pub struct InMemoryEventStore<Id, E> {
    streams: HashMap<Id, Vec<E>>,
}

impl<Id, E> Default for InMemoryEventStore<Id, E> {
    fn default() -> Self {
        Self {
            streams: HashMap::new(),
        }
    }
}

impl<Id: Eq + Hash, E> InMemoryEventStore<Id, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events stored for `id`.
    pub fn len(&self, id: &Id) -> usize {
        self.streams.get(id).map_or(0, Vec::len)
    }
}

impl<Id: Eq + Hash + Clone, E: Clone> EventStore for InMemoryEventStore<Id, E> {
    type Id = Id;
    type SetEvent = E;
    type Error = Infallible;

    fn save(&mut self, id: Self::Id, events: Vec<Self::SetEvent>) -> Result<(), Self::Error> {
        self.streams.entry(id).or_default().extend(events);
        Ok(())
    }

    fn load(&self, id: Self::Id) -> Result<Vec<Self::SetEvent>, Self::Error> {
        Ok(self.streams.get(&id).cloned().unwrap_or_default())
    }

    fn ids(&self) -> Result<Vec<Self::Id>, Self::Error> {
        Ok(self
            .streams
            .iter()
            .filter(|(_, events)| !events.is_empty())
            .map(|(id, _)| id.clone())
            .collect())
    }
}
