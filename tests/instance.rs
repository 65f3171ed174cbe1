use medcenter::{instance, Center, CenterError, Patient};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// One test only: the shared center lives for the whole test binary.
#[test]
fn shared_center_is_created_once_and_replaced_in_place() {
    assert!(instance::current().is_none());
    let err = instance::with_center(|center| Ok(center.name().to_string())).unwrap_err();
    assert!(matches!(err, CenterError::OperationFailed(_)));

    let first = instance::get_or_create("Primero");
    let second = instance::get_or_create("Segundo");
    assert!(std::ptr::eq(first, second));
    assert_eq!(
        instance::with_center(|center| Ok(center.name().to_string())).unwrap(),
        "Primero"
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    instance::with_center(|center| {
        center.subscribe(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        center.add_person(Patient::new("1", "Ana", "Lopez", "")?)
    })
    .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let mut replacement = Center::new("Reemplazo");
    replacement
        .add_person(Patient::new("2", "Juan", "Gomez", "").unwrap())
        .unwrap();
    instance::replace(replacement).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let (name, documents) = instance::with_center(|center| {
        let documents: Vec<String> = center.patients().iter().map(|p| p.document.clone()).collect();
        Ok((center.name().to_string(), documents))
    })
    .unwrap();
    assert_eq!(name, "Reemplazo");
    assert_eq!(documents, vec!["2".to_string()]);

    // Subscribers carried over from the first center keep firing.
    instance::with_center(|center| center.add_person(Patient::new("3", "Eva", "Diaz", "")?))
        .unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
