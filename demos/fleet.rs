use crux_fleet::{
    compartment::CompartmentFields,
    config::FleetConfig,
    event_broker::Notifier,
    event_store::InMemoryEventStore,
    read_model_updater::TrailerDirectory,
    repository::{Repository, TrailerRepository},
    trailer::{TrailerCommand, TrailerDetails},
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config: FleetConfig = r#"
        [catalog]
        products = ["Diesel", "Petrol 95", "AdBlue"]
    "#
    .parse()?;
    let all_products = config.all_products();

    let mut repo = TrailerRepository::new(
        InMemoryEventStore::new(),
        Notifier::new(),
        TrailerDirectory::new(),
        config,
    )?;

    let id = repo.create(TrailerDetails {
        trailer_code: "TR-001".to_string(),
        trailer_name: "Tanker one".to_string(),
        registration_number: "AB 1234".to_string(),
        volume_capacity: 10000,
        weight_capacity: 24000,
    })?;

    let outcome = repo.handle_command(
        id,
        &TrailerCommand::AddCompartment(
            CompartmentFields::new(5000, 0, 5000)
                .must_use(true)
                .products(all_products.clone()),
        ),
    )?;
    println!("after first compartment: active = {}", outcome.active);

    repo.handle_command(
        id,
        &TrailerCommand::AddCompartment(
            CompartmentFields::new(5000, 500, 5000)
                .partial_load_allowed(true)
                .products(["Diesel"]),
        ),
    )?;

    let first = outcome.compartments[0].id;
    let outcome = repo.handle_command(id, &TrailerCommand::RemoveCompartment(first))?;
    println!(
        "after removing compartment 1: active = {}, missing = {:?}",
        outcome.active, outcome.gap_report
    );

    for notification in repo.broker_mut().drain() {
        println!("[{:?}] {}", notification.severity, notification.message);
    }
    for row in repo.read_model().list() {
        println!(
            "{} {} compartments={} active={}",
            row.trailer_code, row.trailer_name, row.number_of_compartments, row.active
        );
    }

    let rejected = repo.handle_command(
        id,
        &TrailerCommand::AddCompartment(CompartmentFields::new(10000, 12000, 10000)),
    );
    if let Err(e) = rejected {
        println!("rejected: {e}");
    }
    Ok(())
}
