use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;
use crate::compartment::Compartment;
use crate::config::FleetConfig;
use crate::event_broker::EventBroker;
use crate::event_store::EventStore;
use crate::read_model_updater::ReadModelUpdater;
use crate::trailer::{Trailer, TrailerCommand, TrailerDetails, TrailerError, TrailerEvent, TrailerId};


/// Types which manage the set of Aggregates.
pub trait Repository {
    /// Associated Type representing Aggregate to manage.
    type Aggregate: Aggregate;

    /// Associated Type representing the response of handling Command.
    type CommandResponse;

    /// Associated Type representing the identifier of Aggregate.
    type Id;

    /// Error type of handling Repository.
    type Error;

    /// Associated Type representing the data to create Aggregate.
    type Data;

    /// Create a new Aggregate from Data.
    fn create(&mut self, data: Self::Data) -> Result<Self::Id, Self::Error>;

    fn find(&self, id: Self::Id) -> Result<Option<Self::Aggregate>, Self::Error>;

    /// Handle a command for an existing Aggregate.
    fn handle_command(
        &mut self,
        id: Self::Id,
        command: &<Self::Aggregate as Aggregate>::Command,
    ) -> Result<Self::CommandResponse, Self::Error>;
}

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Trailer(#[from] TrailerError),

    #[error("trailer {0} not found")]
    NotFound(TrailerId),

    #[error("trailer code {0} is already registered")]
    DuplicateCode(String),

    #[error("unknown product: {0}")]
    UnknownProduct(String),

    #[error("event history of trailer {0} must hold exactly one registration, first")]
    CorruptHistory(TrailerId),

    #[error("trailer id {0} already has an event history")]
    IdInUse(TrailerId),

    #[error("event store error: {0}")]
    Store(#[source] BoxError),

    #[error("event broker error: {0}")]
    Broker(#[source] BoxError),

    #[error("read model error: {0}")]
    ReadModel(#[source] BoxError),
}

/// What the caller persists and shows after a trailer command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandOutcome {
    pub compartments: Vec<Compartment>,
    pub active: bool,
    /// Missing compartment numbers after a removal; a warning, not an error.
    pub gap_report: Vec<u32>,
}

/// Event-sourced trailer repository.
///
/// Every accepted command is saved to the store, then published to the
/// broker, then folded into the read model. The store is authoritative: once
/// the save succeeds the command has happened, and a broker or read model
/// error is reported after the fact without undoing it.
pub struct TrailerRepository<S, B, R> {
    store: S,
    broker: B,
    read_model: R,
    config: FleetConfig,
    codes: HashMap<String, TrailerId>,
    next_id: u64,
}

impl<S, B, R> TrailerRepository<S, B, R>
where
    S: EventStore<Id = TrailerId, SetEvent = TrailerEvent>,
    S::Error: Into<BoxError>,
    B: EventBroker<SetEvent = TrailerEvent>,
    B::Error: Into<BoxError>,
    R: ReadModelUpdater<SetEvent = TrailerEvent>,
    R::Error: Into<BoxError>,
{
    /// Build a repository over `store`, picking up the trailers it already
    /// holds. The read model is expected to match the store.
    pub fn new(store: S, broker: B, read_model: R, config: FleetConfig) -> Result<Self, RepositoryError> {
        let mut codes = HashMap::new();
        let mut next_id = 1;
        for id in store.ids().map_err(|e| RepositoryError::Store(e.into()))? {
            let events = store.load(id).map_err(|e| RepositoryError::Store(e.into()))?;
            let trailer = Trailer::replay(&events).ok_or(RepositoryError::CorruptHistory(id))?;
            if codes.insert(trailer.details().trailer_code.clone(), id).is_some() {
                return Err(RepositoryError::DuplicateCode(trailer.details().trailer_code.clone()));
            }
            next_id = next_id.max(id.0 + 1);
        }
        debug!("loaded {} trailers from the event store", codes.len());

        Ok(Self {
            store,
            broker,
            read_model,
            config,
            codes,
            next_id,
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn broker(&self) -> &B {
        &self.broker
    }

    pub fn broker_mut(&mut self) -> &mut B {
        &mut self.broker
    }

    pub fn read_model(&self) -> &R {
        &self.read_model
    }

    pub fn config(&self) -> &FleetConfig {
        &self.config
    }

    fn save(&mut self, id: TrailerId, events: &[TrailerEvent]) -> Result<(), RepositoryError> {
        self.store
            .save(id, events.to_vec())
            .map_err(|e| RepositoryError::Store(e.into()))
    }

    /// Fan saved events out to the broker and the read model.
    fn notify(&mut self, events: Vec<TrailerEvent>) -> Result<(), RepositoryError> {
        self.broker
            .publish(events.clone())
            .map_err(|e| RepositoryError::Broker(e.into()))?;
        self.read_model
            .update(events)
            .map_err(|e| RepositoryError::ReadModel(e.into()))
    }

    fn check_products(&self, command: &TrailerCommand) -> Result<(), RepositoryError> {
        let fields = match command {
            TrailerCommand::AddCompartment(fields) => fields,
            TrailerCommand::UpdateCompartment(_, fields) => fields,
            _ => return Ok(()),
        };
        match fields
            .allowed_products
            .iter()
            .find(|product| !self.config.is_known_product(product))
        {
            Some(product) => Err(RepositoryError::UnknownProduct(product.clone())),
            None => Ok(()),
        }
    }
}

impl<S, B, R> Repository for TrailerRepository<S, B, R>
where
    S: EventStore<Id = TrailerId, SetEvent = TrailerEvent>,
    S::Error: Into<BoxError>,
    B: EventBroker<SetEvent = TrailerEvent>,
    B::Error: Into<BoxError>,
    R: ReadModelUpdater<SetEvent = TrailerEvent>,
    R::Error: Into<BoxError>,
{
    type Aggregate = Trailer;
    type CommandResponse = CommandOutcome;
    type Id = TrailerId;
    type Error = RepositoryError;
    type Data = TrailerDetails;

    fn create(&mut self, data: Self::Data) -> Result<Self::Id, Self::Error> {
        data.check()?;
        if self.codes.contains_key(&data.trailer_code) {
            return Err(RepositoryError::DuplicateCode(data.trailer_code));
        }

        let id = TrailerId(self.next_id);
        let stored = self
            .store
            .load(id)
            .map_err(|e| RepositoryError::Store(e.into()))?;
        if !stored.is_empty() {
            return Err(RepositoryError::IdInUse(id));
        }

        debug!("registering trailer {} as {}", data.trailer_code, id);
        let code = data.trailer_code.clone();
        let events = vec![TrailerEvent::Registered { id, details: data }];
        self.save(id, &events)?;
        self.next_id += 1;
        self.codes.insert(code, id);
        self.notify(events)?;
        Ok(id)
    }

    fn find(&self, id: Self::Id) -> Result<Option<Self::Aggregate>, Self::Error> {
        let events = self
            .store
            .load(id)
            .map_err(|e| RepositoryError::Store(e.into()))?;
        if events.is_empty() {
            return Ok(None);
        }
        Trailer::replay(&events)
            .map(Some)
            .ok_or(RepositoryError::CorruptHistory(id))
    }

    fn handle_command(
        &mut self,
        id: Self::Id,
        command: &<Self::Aggregate as Aggregate>::Command,
    ) -> Result<Self::CommandResponse, Self::Error> {
        let mut trailer = self.find(id)?.ok_or(RepositoryError::NotFound(id))?;
        self.check_products(command)?;

        let events = trailer.execute(command).map_err(|e| {
            warn!("trailer {} rejected {:?}: {}", id, command, e);
            e
        })?;

        let gap_report = events
            .iter()
            .find_map(|event| match event {
                TrailerEvent::CompartmentRemoved { gap_report, .. } => Some(gap_report.clone()),
                _ => None,
            })
            .unwrap_or_default();
        if !gap_report.is_empty() {
            warn!("trailer {} has compartment gaps at {:?}", id, gap_report);
        }

        if !events.is_empty() {
            self.save(id, &events)?;
            self.notify(events)?;
        }
        Ok(CommandOutcome {
            compartments: trailer.compartments().to_vec(),
            active: trailer.is_active(),
            gap_report,
        })
    }
}
