use proptest::prelude::*;

use super::*;

fn numbered(numbers: &[u32]) -> CompartmentManager {
    let compartments = numbers
        .iter()
        .map(|no| {
            Compartment::from_fields(
                CompartmentId::new(),
                *no,
                CompartmentFields::new(5000, 0, 5000),
            )
        })
        .collect();
    CompartmentManager::new(compartments)
}

fn numbers(compartments: &[Compartment]) -> Vec<u32> {
    compartments.iter().map(|c| c.compartment_no).collect()
}

fn id_of(manager: &CompartmentManager, no: u32) -> CompartmentId {
    manager
        .compartments()
        .iter()
        .find(|c| c.compartment_no == no)
        .map(|c| c.id)
        .unwrap()
}

#[test]
fn test_next_number_fills_lowest_gap() {
    assert_eq!(next_compartment_number(numbered(&[1, 2, 4]).compartments()), 3);
    assert_eq!(next_compartment_number(&[]), 1);
    assert_eq!(next_compartment_number(numbered(&[1, 2, 3]).compartments()), 4);
    assert_eq!(next_compartment_number(numbered(&[2, 3]).compartments()), 1);
    assert_eq!(next_compartment_number(numbered(&[4, 1, 2]).compartments()), 3);
}

#[test]
fn test_validate_rule_order() {
    assert_eq!(
        validate(CompartmentFields::new(0, 10, 5)),
        Err(ValidationError::CapacityRequired)
    );
    assert_eq!(
        validate(CompartmentFields::new(-100, 0, 0)),
        Err(ValidationError::CapacityRequired)
    );
    assert_eq!(
        validate(CompartmentFields::new(100, 200, 300)),
        Err(ValidationError::MinExceedsCapacity)
    );
    assert_eq!(
        validate(CompartmentFields::new(100, 50, 300)),
        Err(ValidationError::MaxExceedsCapacity)
    );
    assert_eq!(
        validate(CompartmentFields::new(100, 80, 60)),
        Err(ValidationError::MinExceedsMax)
    );
}

#[test]
fn test_validate_keeps_valid_partial_load() {
    let fields = CompartmentFields::new(8000, 1000, 7000)
        .partial_load_allowed(true)
        .products(["Diesel", "Petrol"]);
    assert_eq!(validate(fields.clone()), Ok(fields));
}

#[test]
fn test_validate_forces_full_load() {
    let fields = validate(CompartmentFields::new(5000, 0, 4000).must_use(true)).unwrap();
    assert_eq!(fields.min_volume, 5000);
    assert_eq!(fields.max_volume, 5000);
}

#[test]
fn test_validate_must_use_partial_raises_min() {
    let fields = validate(
        CompartmentFields::new(5000, 0, 0)
            .must_use(true)
            .partial_load_allowed(true),
    )
    .unwrap();
    assert_eq!(fields.min_volume, 1);
    assert_eq!(fields.max_volume, 1);
}

#[test]
fn test_validate_floors_negative_volumes() {
    let fields = validate(CompartmentFields::new(100, -20, -10)).unwrap();
    assert_eq!((fields.min_volume, fields.max_volume), (0, 0));
}

#[test]
fn test_sequential_and_missing() {
    assert!(is_sequential(&[]));
    assert!(is_sequential(numbered(&[3, 1, 2]).compartments()));
    assert!(!is_sequential(numbered(&[1, 3]).compartments()));
    assert!(!is_sequential(numbered(&[2]).compartments()));
    assert!(!is_sequential(numbered(&[1, 1]).compartments()));

    assert_eq!(missing_numbers(&[]), Vec::<u32>::new());
    assert_eq!(missing_numbers(numbered(&[1, 3]).compartments()), vec![2]);
    assert_eq!(missing_numbers(numbered(&[5, 2]).compartments()), vec![1, 3, 4]);
}

#[test]
fn test_empty_manager_is_inactive() {
    let manager = CompartmentManager::default();
    assert!(!manager.is_active());
    assert!(manager.is_empty());
}

// Scenario A
#[test]
fn test_add_rejects_min_over_capacity() {
    let manager = numbered(&[1]);
    let before = manager.clone();
    let result = manager.add(CompartmentFields::new(10000, 12000, 10000).partial_load_allowed(true));
    assert_eq!(
        result,
        Err(CompartmentError::Validation(ValidationError::MinExceedsCapacity))
    );
    assert_eq!(manager, before);
}

// Scenario B
#[test]
fn test_add_first_full_load_compartment() {
    let manager = CompartmentManager::default();
    let change = manager
        .add(CompartmentFields::new(5000, 0, 5000).must_use(true))
        .unwrap();
    assert_eq!(change.compartment.compartment_no, 1);
    assert_eq!(change.compartment.min_volume, 5000);
    assert_eq!(change.compartment.max_volume, 5000);
    assert!(change.active);
    assert!(change.gap_report.is_empty());
    assert_eq!(change.compartments, vec![change.compartment.clone()]);
}

#[test]
fn test_add_fills_gap_and_sorts() {
    let manager = numbered(&[1, 2, 4]);
    let change = manager.add(CompartmentFields::new(3000, 0, 3000)).unwrap();
    assert_eq!(change.compartment.compartment_no, 3);
    assert_eq!(numbers(&change.compartments), vec![1, 2, 3, 4]);
    assert!(change.active);
}

#[test]
fn test_add_explicit_number() {
    let manager = numbered(&[1, 4]);
    let change = manager
        .add(CompartmentFields::new(3000, 0, 3000).numbered(3))
        .unwrap();
    assert_eq!(numbers(&change.compartments), vec![1, 3, 4]);
    assert!(!change.active);

    assert_eq!(
        manager.add(CompartmentFields::new(3000, 0, 3000).numbered(1)),
        Err(CompartmentError::DuplicateNumber(1))
    );
    assert_eq!(
        manager.add(CompartmentFields::new(3000, 0, 3000).numbered(0)),
        Err(CompartmentError::InvalidNumber { max: 3 })
    );
}

#[test]
fn test_add_rejects_number_past_next_slot() {
    let manager = numbered(&[1]);
    let before = manager.clone();
    for no in [3, 50_000_000, u32::MAX] {
        assert_eq!(
            manager.add(CompartmentFields::new(3000, 0, 3000).numbered(no)),
            Err(CompartmentError::InvalidNumber { max: 2 })
        );
    }
    assert_eq!(manager, before);

    let change = manager
        .add(CompartmentFields::new(3000, 0, 3000).numbered(2))
        .unwrap();
    assert_eq!(numbers(&change.compartments), vec![1, 2]);

    let removed = CompartmentManager::new(change.compartments)
        .remove(id_of(&manager, 1))
        .unwrap();
    assert_eq!(removed.gap_report, vec![1]);
}

#[test]
fn test_update_replaces_in_place() {
    let manager = numbered(&[1, 2, 3]);
    let id = id_of(&manager, 2);
    let change = manager
        .update(id, CompartmentFields::new(9000, 100, 8000).partial_load_allowed(true))
        .unwrap();
    assert_eq!(change.compartment.id, id);
    assert_eq!(change.compartment.compartment_no, 2);
    assert_eq!(change.compartment.capacity, 9000);
    assert_eq!(numbers(&change.compartments), vec![1, 2, 3]);
    assert!(change.active);
}

#[test]
fn test_update_renumber_resorts() {
    let manager = numbered(&[1, 2, 4]);
    let id = id_of(&manager, 1);
    let change = manager
        .update(id, CompartmentFields::new(5000, 0, 5000).numbered(3))
        .unwrap();
    assert_eq!(numbers(&change.compartments), vec![2, 3, 4]);
    assert!(!change.active);
    assert_eq!(change.compartments[1].id, id);
}

#[test]
fn test_update_rejects_number_past_collection() {
    let manager = numbered(&[1, 2, 3]);
    let id = id_of(&manager, 1);
    for no in [4, u32::MAX] {
        assert_eq!(
            manager.update(id, CompartmentFields::new(5000, 0, 5000).numbered(no)),
            Err(CompartmentError::InvalidNumber { max: 3 })
        );
    }
}

#[test]
fn test_update_keeping_own_number_is_not_a_duplicate() {
    let manager = numbered(&[1, 2]);
    let id = id_of(&manager, 2);
    assert!(manager
        .update(id, CompartmentFields::new(5000, 0, 5000).numbered(2))
        .is_ok());
    assert_eq!(
        manager.update(id, CompartmentFields::new(5000, 0, 5000).numbered(1)),
        Err(CompartmentError::DuplicateNumber(1))
    );
}

#[test]
fn test_update_rejects_invalid_fields() {
    let manager = numbered(&[1]);
    let id = id_of(&manager, 1);
    assert_eq!(
        manager.update(id, CompartmentFields::new(100, 0, 200)),
        Err(CompartmentError::Validation(ValidationError::MaxExceedsCapacity))
    );

    let unknown = CompartmentId::new();
    assert_eq!(
        manager.update(unknown, CompartmentFields::new(100, 0, 100)),
        Err(CompartmentError::NotFound(unknown))
    );
}

// P6
#[test]
fn test_remove_middle_reports_gap() {
    let manager = numbered(&[1, 2, 3]);
    assert!(manager.is_active());
    let change = manager.remove(id_of(&manager, 2)).unwrap();
    assert_eq!(numbers(&change.compartments), vec![1, 3]);
    assert!(!change.active);
    assert_eq!(change.gap_report, vec![2]);
    assert_eq!(change.compartment.compartment_no, 2);
}

// Scenario C
#[test]
fn test_remove_first_reports_gap() {
    let manager = numbered(&[1, 2]);
    let change = manager.remove(id_of(&manager, 1)).unwrap();
    assert_eq!(numbers(&change.compartments), vec![2]);
    assert!(!change.active);
    assert_eq!(change.gap_report, vec![1]);
}

#[test]
fn test_remove_last_keeps_sequence() {
    let manager = numbered(&[1, 2, 3]);
    let change = manager.remove(id_of(&manager, 3)).unwrap();
    assert!(change.active);
    assert!(change.gap_report.is_empty());

    let single = numbered(&[1]);
    let change = single.remove(id_of(&single, 1)).unwrap();
    assert!(change.compartments.is_empty());
    assert!(!change.active);
    assert!(change.gap_report.is_empty());
}

#[test]
fn test_remove_unknown() {
    let manager = numbered(&[1]);
    let unknown = CompartmentId::new();
    assert_eq!(manager.remove(unknown), Err(CompartmentError::NotFound(unknown)));
}

#[test]
fn test_fields_wire_names() {
    let json = serde_json::to_value(
        CompartmentFields::new(5000, 10, 4000)
            .numbered(2)
            .partial_load_allowed(true)
            .products(["Diesel"]),
    )
    .unwrap();
    assert_eq!(json["compartmentNo"], 2);
    assert_eq!(json["minVolume"], 10);
    assert_eq!(json["maxVolume"], 4000);
    assert_eq!(json["allowedProducts"][0], "Diesel");
    assert_eq!(json["partialLoadAllowed"], true);
    assert_eq!(json["mustUse"], false);
}

fn candidate() -> impl Strategy<Value = CompartmentFields> {
    (
        1i64..20_000,
        -100i64..20_000,
        -100i64..20_000,
        any::<bool>(),
        any::<bool>(),
    )
        .prop_map(|(capacity, a, b, partial, must_use)| CompartmentFields {
            capacity,
            min_volume: a.min(b).min(capacity),
            max_volume: a.max(b).min(capacity),
            partial_load_allowed: partial,
            must_use,
            ..CompartmentFields::default()
        })
}

proptest! {
    #[test]
    fn prop_capacity_floor(capacity in -20_000i64..=0, min in -100i64..100, max in -100i64..100) {
        let manager = numbered(&[1, 2]);
        let before = manager.clone();
        prop_assert_eq!(
            manager.add(CompartmentFields::new(capacity, min, max)),
            Err(CompartmentError::Validation(ValidationError::CapacityRequired))
        );
        prop_assert_eq!(manager, before);
    }

    #[test]
    fn prop_normalized_bounds(fields in candidate()) {
        let normalized = validate(fields).unwrap();
        prop_assert!(0 <= normalized.min_volume);
        prop_assert!(normalized.min_volume <= normalized.max_volume);
        prop_assert!(normalized.max_volume <= normalized.capacity);
    }

    #[test]
    fn prop_must_use_rules(fields in candidate()) {
        let normalized = validate(fields.clone()).unwrap();
        if fields.must_use && !fields.partial_load_allowed {
            prop_assert_eq!(normalized.min_volume, fields.capacity);
            prop_assert_eq!(normalized.max_volume, fields.capacity);
        }
        if fields.must_use && fields.partial_load_allowed {
            prop_assert!(normalized.min_volume >= 1);
        }
    }

    #[test]
    fn prop_validate_idempotent(fields in candidate()) {
        let once = validate(fields).unwrap();
        prop_assert_eq!(validate(once.clone()), Ok(once));
    }

    #[test]
    fn prop_mutations_keep_ascending_order(
        existing in proptest::collection::btree_set(1u32..12, 0..8),
        explicit in any::<bool>(),
        pick in any::<prop::sample::Index>(),
    ) {
        let existing: Vec<u32> = existing.into_iter().collect();
        let manager = numbered(&existing);
        let ascending = |c: &[Compartment]| c.windows(2).all(|w| w[0].compartment_no < w[1].compartment_no);
        // highest number in 1..=max not held by any compartment other than `own`
        let free = |max: usize, own: Option<CompartmentId>| {
            (1..=max as u32)
                .rev()
                .find(|no| {
                    !manager
                        .compartments()
                        .iter()
                        .any(|c| c.compartment_no == *no && Some(c.id) != own)
                })
                .unwrap()
        };

        let mut fields = CompartmentFields::new(1000, 0, 1000);
        if explicit {
            fields.compartment_no = Some(free(manager.len() + 1, None));
        }
        let added = manager.add(fields).unwrap();
        prop_assert!(ascending(&added.compartments));

        if !manager.is_empty() {
            let target = manager.compartments()[pick.index(manager.len())].id;
            let renumbered = free(manager.len(), Some(target));
            let updated = manager
                .update(target, CompartmentFields::new(1000, 0, 1000).numbered(renumbered))
                .unwrap();
            prop_assert!(ascending(&updated.compartments));

            let removed = manager.remove(target).unwrap();
            prop_assert!(ascending(&removed.compartments));
            prop_assert_eq!(
                removed.active,
                !removed.compartments.is_empty() && removed.gap_report.is_empty()
            );
        }
    }
}
