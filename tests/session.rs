use molquery::registry::EngineObject;
use molquery::{EngineError, SessionPool};

#[test]
fn handles_are_session_scoped() {
    let mut pool = SessionPool::new();
    let s1 = pool.open_session();
    let s2 = pool.open_session();

    let target = pool
        .session_mut(s1)
        .unwrap()
        .molecule_from_smiles("CCO")
        .unwrap();

    // A handle valid in one session is InvalidHandle in another.
    let err = pool
        .session_mut(s2)
        .unwrap()
        .create_matcher(target, "")
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidHandle { .. }));

    // The owning session resolves it fine.
    assert!(pool
        .session_mut(s1)
        .unwrap()
        .create_matcher(target, "")
        .is_ok());
}

#[test]
fn removal_is_idempotent() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let mol = session.molecule_from_smiles("C").unwrap();
    session.remove_object(mol);
    session.remove_object(mol);

    let err = session.create_matcher(mol, "").unwrap_err();
    assert!(matches!(err, EngineError::InvalidHandle { .. }));
}

#[test]
fn handle_ids_are_monotonic() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let a = session.molecule_from_smiles("C").unwrap();
    let b = session.molecule_from_smiles("N").unwrap();
    assert!(b.id > a.id);

    session.remove_object(a);
    let c = session.molecule_from_smiles("O").unwrap();
    assert!(c.id > b.id, "ids are not reused while the session lives");
}

#[test]
fn close_session_drops_everything() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    pool.session_mut(id)
        .unwrap()
        .molecule_from_smiles("CCO")
        .unwrap();

    pool.close_session(id);
    assert!(pool.session(id).is_none());
}

#[test]
fn option_parsing() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    session.set_option("max-embeddings", "42").unwrap();
    assert_eq!(session.config.max_embeddings, 42);

    session.set_option("embedding-uniqueness", "none").unwrap();
    session.set_option("embedding-uniqueness", "bonds").unwrap();
    session.set_option("embedding-uniqueness", "atoms").unwrap();

    session.set_option("timeout", "250").unwrap();
    assert_eq!(session.config.timeout_ms, 250);
    session.set_option("timeout", "0").unwrap();

    assert!(matches!(
        session.set_option("max-embeddings", "0"),
        Err(EngineError::InvalidOption(_))
    ));
    assert!(matches!(
        session.set_option("max-embeddings", "many"),
        Err(EngineError::InvalidOption(_))
    ));
    assert!(matches!(
        session.set_option("embedding-uniqueness", "sometimes"),
        Err(EngineError::InvalidOption(_))
    ));
    assert!(matches!(
        session.set_option("no-such-option", "1"),
        Err(EngineError::InvalidOption(_))
    ));
}

#[test]
fn last_error_is_recorded_and_cleared() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    assert!(session.last_error().is_none());

    let target = session.molecule_from_smiles("CCO").unwrap();
    assert!(session.create_matcher(target, "BOGUS").is_err());
    let message = session.last_error().expect("failure recorded");
    assert!(message.contains("BOGUS"), "{message}");

    // The next successful call clears it.
    session.create_matcher(target, "").unwrap();
    assert!(session.last_error().is_none());
}

#[test]
fn variant_cache_is_shared_across_queries() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let target = session.molecule_from_smiles("c1ccccc1").unwrap();
    let query = session.pattern_from_smiles("c").unwrap();
    let matcher = session.create_matcher(target, "").unwrap();

    session.count_matches(matcher, query, 0).unwrap();
    session.count_matches(matcher, query, 0).unwrap();
    session.match_once(matcher, query).unwrap();

    // Counting twice reuses one variant; the existence check may build the
    // other. Never more than the two cache entries.
    match session.registry().get(matcher).unwrap() {
        EngineObject::Matcher(m) => assert!(m.build_count() <= 2),
        _ => panic!("matcher handle lost its object"),
    }
}

#[test]
fn smiles_errors_surface_through_the_session() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let err = session.molecule_from_smiles("C1CC").unwrap_err();
    assert!(matches!(err, EngineError::Smiles(_)));
    assert!(session.last_error().is_some());
}
