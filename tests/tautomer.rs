use petgraph::graph::NodeIndex;

use molquery::registry::EngineObject;
use molquery::{BondOrder, EngineError, SessionPool};

#[test]
fn tautomer_rule_table_management() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    session.set_tautomer_rule(1, "N,O", "N,O").unwrap();
    session.set_tautomer_rule(2, "1N", "0C").unwrap();
    session.remove_tautomer_rule(2).unwrap();
    session.clear_tautomer_rules();

    assert!(matches!(
        session.set_tautomer_rule(0, "N", "N"),
        Err(EngineError::InvalidOption(_))
    ));
    assert!(matches!(
        session.set_tautomer_rule(33, "N", "N"),
        Err(EngineError::InvalidOption(_))
    ));
    assert!(matches!(
        session.set_tautomer_rule(1, "2N", "O"),
        Err(EngineError::InvalidModeSpec(_))
    ));
    assert!(matches!(
        session.set_tautomer_rule(1, "", "O"),
        Err(EngineError::InvalidModeSpec(_))
    ));
    assert!(matches!(
        session.remove_tautomer_rule(5),
        Err(EngineError::InvalidOption(_))
    ));
}

#[test]
fn basic_method_matches_keto_against_enol_query() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    // Acetone, queried with its enol form.
    let target = session.molecule_from_smiles("CC(=O)C").unwrap();
    let enol = session.pattern_from_smiles("C=C(O)C").unwrap();

    let exact = session.create_matcher(target, "").unwrap();
    assert!(session.match_once(exact, enol).unwrap().is_none());

    let tau = session.create_matcher(target, "TAU").unwrap();
    assert!(session.match_once(tau, enol).unwrap().is_some());
}

#[test]
fn basic_method_negative_is_none_not_error() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let target = session.molecule_from_smiles("CC(=O)C").unwrap();
    let query = session.pattern_from_smiles("N").unwrap();
    let tau = session.create_matcher(target, "TAU").unwrap();

    assert!(session.match_once(tau, query).unwrap().is_none());
    assert!(session.last_error().is_none());
}

#[test]
fn basic_method_respects_selected_rules() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    session.set_tautomer_rule(1, "N", "N").unwrap();

    let target = session.molecule_from_smiles("CC(=O)C").unwrap();
    let enol = session.pattern_from_smiles("C=C(O)C").unwrap();

    // Hydrogen may only migrate between nitrogens under rule 1, so the
    // keto/enol relaxation is gone.
    let tau = session.create_matcher(target, "TAU R1").unwrap();
    assert!(session.match_once(tau, enol).unwrap().is_none());
}

#[test]
fn basic_method_does_not_iterate_or_count() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let target = session.molecule_from_smiles("CC(=O)C").unwrap();
    let query = session.pattern_from_smiles("CO").unwrap();
    let tau = session.create_matcher(target, "TAU").unwrap();

    assert!(matches!(
        session.iterate_matches(tau, query),
        Err(EngineError::UnsupportedModeOperation(_))
    ));
    assert!(matches!(
        session.count_matches(tau, query, 0),
        Err(EngineError::UnsupportedModeOperation(_))
    ));
}

#[test]
fn inchi_like_iteration_finds_the_enol_layer() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    // Acetaldehyde; its enol (vinyl alcohol) exists only as a tautomer
    // layer.
    let target = session.molecule_from_smiles("CC=O").unwrap();
    let enol = session.pattern_from_smiles("C=CO").unwrap();
    let tau = session.create_matcher(target, "TAU INCHI").unwrap();

    let iter = session.iterate_matches(tau, enol).unwrap();
    assert!(session.iterator_has_next(iter).unwrap());
    let mapping = session.iterator_next(iter).unwrap().unwrap();

    // The mapping's target is the materialized enol form: the C-C bond
    // became double and the oxygen gained the hydrogen.
    let tautomer_handle = match session.registry().get(mapping).unwrap() {
        EngineObject::Mapping(m) => m.target_handle,
        _ => panic!("expected a mapping"),
    };
    match session.registry().get(tautomer_handle).unwrap() {
        EngineObject::Molecule(mol) => {
            let cc = mol
                .bond_between(NodeIndex::new(0), NodeIndex::new(1))
                .expect("carbon skeleton intact");
            assert_eq!(mol.bond(cc).order, BondOrder::Double);
            let o = mol.atoms().nth(2).unwrap();
            assert_eq!(mol.atom(o).hydrogen_count, 1);
        }
        _ => panic!("expected the materialized tautomer molecule"),
    }

    assert!(!session.iterator_has_next(iter).unwrap());
}

#[test]
fn tautomer_masks_drain_before_the_embedding_advances() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    // Two layers (keto + enol), and a single-carbon query valid in both:
    // each embedding carries a two-bit mask.
    let target = session.molecule_from_smiles("CC=O").unwrap();
    let query = session.pattern_from_smiles("C").unwrap();
    let tau = session.create_matcher(target, "TAU INCHI").unwrap();

    let iter = session.iterate_matches(tau, query).unwrap();
    let mut maps = Vec::new();
    while session.iterator_has_next(iter).unwrap() {
        let mapping = session.iterator_next(iter).unwrap().unwrap();
        let map = match session.registry().get(mapping).unwrap() {
            EngineObject::Mapping(m) => m.as_slice().to_vec(),
            _ => panic!("expected a mapping"),
        };
        maps.push(map);
    }

    // Two carbon embeddings times two admissible hydrogen placements.
    assert_eq!(maps.len(), 4);
    assert_eq!(maps[0], maps[1], "mask drains before the embedding moves");
    assert_eq!(maps[2], maps[3]);
    assert_ne!(maps[0], maps[2]);
}

#[test]
fn rsmarts_like_iteration_is_rule_driven() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let target = session.molecule_from_smiles("CC=O").unwrap();
    let enol = session.pattern_from_smiles("C=CO").unwrap();

    // Carbon-to-oxygen migration allowed: the enol layer appears.
    session.set_tautomer_rule(1, "0C", "O").unwrap();
    let permissive = session.create_matcher(target, "TAU RSMARTS R1").unwrap();
    let iter = session.iterate_matches(permissive, enol).unwrap();
    assert!(session.iterator_has_next(iter).unwrap());

    // Nitrogen-only migration: no admissible shift, no enol layer.
    session.set_tautomer_rule(2, "N", "N").unwrap();
    let restricted = session.create_matcher(target, "TAU RSMARTS R2").unwrap();
    let iter = session.iterate_matches(restricted, enol).unwrap();
    assert!(!session.iterator_has_next(iter).unwrap());
}

#[test]
fn unknown_tautomer_flags_are_rejected() {
    let mut pool = SessionPool::new();
    let id = pool.open_session();
    let session = pool.session_mut(id).unwrap();

    let target = session.molecule_from_smiles("CC=O").unwrap();
    assert!(matches!(
        session.create_matcher(target, "TAU WHATEVER"),
        Err(EngineError::InvalidModeSpec(_))
    ));

    // Selecting an unset rule fails at matcher use, when the table is read.
    let tau = session.create_matcher(target, "TAU R7").unwrap();
    let query = session.pattern_from_smiles("C").unwrap();
    assert!(matches!(
        session.match_once(tau, query),
        Err(EngineError::InvalidModeSpec(_))
    ));
}
