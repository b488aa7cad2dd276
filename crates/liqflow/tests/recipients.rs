mod common;

use common::{fleet, ids, settlement};
use liqflow::settlements::{dedup_selection, resolve_recipients};
use liqflow::DispatchError;

#[test]
fn resolves_selected_emails_in_collection_order() {
    let all = fleet();
    let recipients = resolve_recipients(&all, &ids(&["s3", "s1"])).unwrap();
    assert_eq!(recipients, vec!["ana@fleet.co", "marta@fleet.co"]);
}

#[test]
fn duplicate_addresses_keep_first_occurrence() {
    let all = vec![
        settlement("a", "Ana", "Rojas", Some("ana@fleet.co")),
        settlement("b", "Ana", "Rojas", Some(" ana@fleet.co ")),
        settlement("c", "Luis", "Gómez", Some("luis@fleet.co")),
    ];
    let recipients = resolve_recipients(&all, &ids(&["a", "b", "c"])).unwrap();
    assert_eq!(recipients, vec!["ana@fleet.co", "luis@fleet.co"]);
}

#[test]
fn every_driver_without_email_is_reported() {
    let all = vec![
        settlement("a", "Ana", "Rojas", Some("ana@fleet.co")),
        settlement("b", "Luis", "Gómez", None),
        settlement("c", "Marta", "Díaz", Some("")),
    ];

    let err = resolve_recipients(&all, &ids(&["a", "b", "c"])).unwrap_err();
    match &err {
        DispatchError::MissingEmails { names } => {
            assert_eq!(names, &vec!["Luis Gómez".to_string(), "Marta Díaz".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.is_validation());
    assert_eq!(
        err.to_string(),
        "recipients without email: Luis Gómez, Marta Díaz"
    );
}

#[test]
fn settlement_without_driver_is_named_by_id() {
    let mut orphan = settlement("s9", "x", "y", None);
    orphan.driver = None;

    let err = resolve_recipients(&[orphan], &ids(&["s9"])).unwrap_err();
    assert!(matches!(err, DispatchError::MissingEmails { names } if names == vec!["s9".to_string()]));
}

#[test]
fn empty_or_unknown_selection_is_rejected() {
    let all = fleet();
    assert!(matches!(
        resolve_recipients(&all, &[]),
        Err(DispatchError::EmptySelection)
    ));
    assert!(matches!(
        resolve_recipients(&all, &ids(&["nope"])),
        Err(DispatchError::NoRecipients)
    ));
}

#[test]
fn unknown_ids_fail_the_whole_selection() {
    let all = fleet();
    let err = resolve_recipients(&all, &ids(&["s1", "ghost", "s2", "phantom", "ghost"])).unwrap_err();

    assert!(err.is_validation());
    match &err {
        DispatchError::UnknownSettlements { ids } => {
            assert_eq!(ids, &vec!["ghost".to_string(), "phantom".to_string()]);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.to_string(), "unknown settlements: ghost, phantom");
}

#[test]
fn repeated_selection_ids_collapse_to_first_occurrence() {
    assert_eq!(
        dedup_selection(&ids(&["s2", "s1", "s2", "s3", "s1"])),
        ids(&["s2", "s1", "s3"])
    );
}
