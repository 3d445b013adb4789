/// Types which manage the state of aggregate.
pub trait Aggregate: Sized {
    /// Associated type representing the identifier of the Aggregate.
    type Id: Copy;

    /// Associated type representing the command type to change state of Aggregate.
    type Command;

    /// Associated type representing the event type for the state change of Aggregate.
    type Event;

    /// Associated type representing the error type to handle Command.
    type Error;

    /// Get the identifier of the Aggregate.
    fn id(&self) -> Self::Id;

    /// Handle Command and return the result of events.
    /// Must not change state: a rejected Command leaves the Aggregate untouched.
    fn handle_command(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error>;

    /// Apply an Event to update the state of the Aggregate.
    fn apply_event(&mut self, event: &Self::Event);

    /// Handle Command and apply the resulting events in order.
    fn execute(&mut self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        let events = self.handle_command(command)?;
        for event in &events {
            self.apply_event(event);
        }
        Ok(events)
    }
}
