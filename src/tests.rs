use std::sync::Arc;

use petgraph::graph::NodeIndex;

use crate::cancel::Deadline;
use crate::counters::NeighbourhoodCounters;
use crate::hydrogen::unfold_hydrogens;
use crate::matcher::{parse_mode_spec, MatchMode, Matcher};
use crate::query::{pattern_from_molecule, requires_unfolded_hydrogens, AtomExpr, BondExpr};
use crate::registry::{EngineObject, Handle, Registry, SessionId};
use crate::rings::RingInfo;
use crate::search::{EmbeddingSearch, SearchOptions, Uniqueness};
use crate::tautomer::{parse_tautomer_spec, TautomerCondition, TautomerMethod};
use crate::*;

fn handle_for_tests() -> Handle {
    Handle {
        session: SessionId(1),
        id: 1,
    }
}

#[test]
fn mol_add_atoms_and_bonds() {
    let mut mol = Mol::<Atom, Bond>::new();
    let c = mol.add_atom(Atom::of(6));
    let o = mol.add_atom(Atom::of(8));
    let bond_idx = mol.add_bond(c, o, Bond::of(BondOrder::Double));

    assert_eq!(mol.atom_count(), 2);
    assert_eq!(mol.bond_count(), 1);
    assert_eq!(mol.atom(c).atomic_num, 6);
    assert_eq!(mol.atom(o).atomic_num, 8);
    assert_eq!(mol.bond(bond_idx).order, BondOrder::Double);
}

#[test]
fn mol_neighbors_and_bond_between() {
    let mut mol = Mol::<Atom, Bond>::new();
    let a = mol.add_atom(Atom::of(6));
    let b = mol.add_atom(Atom::of(6));
    let c = mol.add_atom(Atom::of(6));
    let e = mol.add_bond(a, b, Bond::default());
    mol.add_bond(a, c, Bond::default());

    assert_eq!(mol.neighbors(a).count(), 2);
    assert_eq!(mol.bond_between(a, b), Some(e));
    assert_eq!(mol.bond_between(b, c), None);
}

#[test]
fn smiles_ethanol() {
    let mol = from_smiles("CCO").unwrap();
    assert_eq!(mol.atom_count(), 3);
    assert_eq!(mol.bond_count(), 2);
    let atoms: Vec<_> = mol.atoms().collect();
    assert_eq!(mol.atom(atoms[0]).hydrogen_count, 3);
    assert_eq!(mol.atom(atoms[1]).hydrogen_count, 2);
    assert_eq!(mol.atom(atoms[2]).atomic_num, 8);
    assert_eq!(mol.atom(atoms[2]).hydrogen_count, 1);
}

#[test]
fn smiles_benzene_is_aromatic() {
    let mol = from_smiles("c1ccccc1").unwrap();
    assert_eq!(mol.atom_count(), 6);
    assert_eq!(mol.bond_count(), 6);
    for idx in mol.atoms() {
        assert!(mol.atom(idx).is_aromatic);
        assert_eq!(mol.atom(idx).hydrogen_count, 1);
    }
    for edge in mol.bonds() {
        assert_eq!(mol.bond(edge).order, BondOrder::Aromatic);
    }
}

#[test]
fn smiles_brackets() {
    let anion = from_smiles("[O-]").unwrap();
    let o = anion.atoms().next().unwrap();
    assert_eq!(anion.atom(o).formal_charge, -1);
    assert_eq!(anion.atom(o).hydrogen_count, 0);

    let ammonium = from_smiles("[NH4+]").unwrap();
    let n = ammonium.atoms().next().unwrap();
    assert_eq!(ammonium.atom(n).formal_charge, 1);
    assert_eq!(ammonium.atom(n).hydrogen_count, 4);

    let heavy = from_smiles("[13C]").unwrap();
    assert_eq!(heavy.atom(heavy.atoms().next().unwrap()).isotope, 13);
}

#[test]
fn smiles_errors() {
    assert!(matches!(from_smiles(""), Err(SmilesError::EmptyInput)));
    assert!(matches!(
        from_smiles("C1CC"),
        Err(SmilesError::UnclosedRing { digit: 1 })
    ));
    assert!(matches!(
        from_smiles("C(C"),
        Err(SmilesError::UnmatchedParen { .. })
    ));
    assert!(matches!(
        from_smiles("=C"),
        Err(SmilesError::DanglingBond { .. })
    ));
}

#[test]
fn ring_perception_counts() {
    let benzene = from_smiles("c1ccccc1").unwrap();
    let info = RingInfo::perceive(&benzene);
    assert_eq!(info.num_rings(), 1);
    assert_eq!(info.rings()[0].len(), 6);

    let chain = from_smiles("CCCC").unwrap();
    assert_eq!(RingInfo::perceive(&chain).num_rings(), 0);

    let naphthalene = from_smiles("c1ccc2ccccc2c1").unwrap();
    assert_eq!(RingInfo::expected_ring_count(&naphthalene), 2);
}

#[test]
fn aromatize_kekule_benzene() {
    let mut mol = from_smiles("C1=CC=CC=C1").unwrap();
    for idx in mol.atoms() {
        assert!(!mol.atom(idx).is_aromatic);
    }
    aromatize(&mut mol, AromaticityOptions::default());
    for idx in mol.atoms() {
        assert!(mol.atom(idx).is_aromatic);
    }
    for edge in mol.bonds() {
        assert_eq!(mol.bond(edge).order, BondOrder::Aromatic);
    }
}

#[test]
fn aromatize_leaves_cyclohexane_alone() {
    let mut mol = from_smiles("C1CCCCC1").unwrap();
    aromatize(&mut mol, AromaticityOptions::default());
    for idx in mol.atoms() {
        assert!(!mol.atom(idx).is_aromatic);
    }
}

#[test]
fn unfold_hydrogens_appends_explicit_vertices() {
    let mol = from_smiles("CCO").unwrap();
    let unfolded = unfold_hydrogens(&mol);
    // 3 heavy atoms + 3 + 2 + 1 hydrogens.
    assert_eq!(unfolded.mol.atom_count(), 9);
    assert_eq!(unfolded.to_original.len(), 9);
    assert_eq!(&unfolded.to_original[..3], &[0, 1, 2]);
    assert!(unfolded.to_original[3..].iter().all(|&v| v == -1));
    assert_eq!(unfolded.to_variant, vec![0, 1, 2]);
    for idx in unfolded.mol.atoms().skip(3) {
        assert!(unfolded.mol.atom(idx).is_hydrogen());
        assert_eq!(unfolded.mol.atom(idx).hydrogen_count, 0);
        assert_eq!(unfolded.mol.degree(idx), 1);
    }
}

#[test]
fn query_hydrogen_inspection() {
    // Lone hydrogen query always needs the unfolded variant.
    let mut lone = Pattern::new();
    lone.add_atom(AtomExpr::element(1));
    assert!(requires_unfolded_hydrogens(&lone, false));

    // Terminal definite hydrogen folds for an existence check but not for
    // full enumeration.
    let mut nh = Pattern::new();
    let n = nh.add_atom(AtomExpr::element(7));
    let h = nh.add_atom(AtomExpr::element(1));
    nh.add_bond(n, h, BondExpr::Single);
    assert!(!requires_unfolded_hydrogens(&nh, false));
    assert!(requires_unfolded_hydrogens(&nh, true));

    // No hydrogen-capable atoms at all.
    let cc = pattern_from_molecule(
        &from_smiles("CC").unwrap(),
        AromaticityOptions::default(),
    );
    assert!(!requires_unfolded_hydrogens(&cc, true));
}

#[test]
fn counters_ethanol() {
    let mol = from_smiles("CCO").unwrap();
    let counters = NeighbourhoodCounters::calculate(&mol);
    let middle = counters.get(NodeIndex::new(1));
    assert_eq!(middle.carbon, 1);
    assert_eq!(middle.oxygen, 1);
    assert_eq!(middle.hydrogen, 2);
}

#[test]
fn search_enumerates_benzene_carbons() {
    let target = Arc::new(from_smiles("c1ccccc1").unwrap());
    let pattern = Arc::new(pattern_from_molecule(
        &from_smiles("c").unwrap(),
        AromaticityOptions::default(),
    ));
    let mut search = EmbeddingSearch::new(
        target,
        pattern,
        SearchOptions {
            uniqueness: Uniqueness::ByAtoms,
            ..SearchOptions::default()
        },
    );
    let mut count = 0;
    while search.find_next().unwrap() {
        count += 1;
    }
    assert_eq!(count, 6);
    assert_eq!(search.stored_count(), 6);
}

#[test]
fn search_uniqueness_policies() {
    let target = Arc::new(from_smiles("c1ccccc1").unwrap());
    let pattern = Arc::new(pattern_from_molecule(
        &from_smiles("cc").unwrap(),
        AromaticityOptions::default(),
    ));
    for (uniqueness, expected) in [
        (Uniqueness::None, 12),
        (Uniqueness::ByAtoms, 6),
        (Uniqueness::ByBonds, 6),
    ] {
        let mut search = EmbeddingSearch::new(
            target.clone(),
            pattern.clone(),
            SearchOptions {
                uniqueness,
                ..SearchOptions::default()
            },
        );
        let mut count = 0;
        while search.find_next().unwrap() {
            count += 1;
        }
        assert_eq!(count, expected, "{uniqueness:?}");
    }
}

#[test]
fn prepared_variant_builds_once() {
    let target = Arc::new(from_smiles("c1ccccc1").unwrap());
    let mut matcher = Matcher::new(
        target,
        handle_for_tests(),
        MatchMode::Normal,
        AromaticityOptions::default(),
    );
    let first = matcher.prepare_variant(true).mol.clone();
    assert_eq!(matcher.build_count(), 1);
    let second = matcher.prepare_variant(true).mol.clone();
    assert_eq!(matcher.build_count(), 1);
    assert!(Arc::ptr_eq(&first, &second));

    // The other variant is a separate entry with its own single build.
    matcher.prepare_variant(false);
    matcher.prepare_variant(false);
    assert_eq!(matcher.build_count(), 2);
}

#[test]
fn registry_handles() {
    let mut registry = Registry::new(SessionId(7));
    let mol = Arc::new(from_smiles("C").unwrap());
    let h1 = registry.add(EngineObject::Molecule(mol.clone()));
    let h2 = registry.add(EngineObject::Molecule(mol));
    assert_eq!(h1.session, SessionId(7));
    assert!(h2.id > h1.id);
    assert!(registry.get(h1).is_ok());

    registry.remove(h1);
    assert!(matches!(
        registry.get(h1),
        Err(EngineError::InvalidHandle { .. })
    ));
    // Idempotent removal.
    registry.remove(h1);

    // A foreign session's handle never resolves.
    let foreign = Handle {
        session: SessionId(8),
        id: h2.id,
    };
    assert!(registry.get(foreign).is_err());

    registry.clear();
    assert!(registry.get(h2).is_err());
    assert!(registry.is_empty());
}

#[test]
fn mode_spec_parsing() {
    assert_eq!(parse_mode_spec("").unwrap(), MatchMode::Normal);
    assert_eq!(parse_mode_spec("SIM").unwrap(), MatchMode::Normal);
    assert_eq!(parse_mode_spec("RES").unwrap(), MatchMode::Resonance);
    assert_eq!(parse_mode_spec("res").unwrap(), MatchMode::Resonance);
    match parse_mode_spec("TAU INCHI").unwrap() {
        MatchMode::Tautomer(params) => {
            assert_eq!(params.method, TautomerMethod::InchiLike);
            assert_eq!(params.conditions, 0);
        }
        other => panic!("expected tautomer mode, got {other:?}"),
    }
    assert!(matches!(
        parse_mode_spec("XYZ"),
        Err(EngineError::InvalidModeSpec(_))
    ));
}

#[test]
fn tautomer_spec_flags() {
    let params = parse_tautomer_spec("TAU RSMARTS R1 R3 H")
        .unwrap()
        .unwrap();
    assert_eq!(params.method, TautomerMethod::RsmartsLike);
    assert_eq!(params.conditions, 0b101);
    assert!(params.force_hydrogens);

    let ring_chain = parse_tautomer_spec("TAU R-C").unwrap().unwrap();
    assert!(ring_chain.ring_chain);
    assert_eq!(ring_chain.method, TautomerMethod::Basic);

    assert!(parse_tautomer_spec("RES").unwrap().is_none());
    assert!(parse_tautomer_spec("TAU R99").is_err());
    assert!(parse_tautomer_spec("TAU NOPE").is_err());
}

#[test]
fn tautomer_condition_parsing() {
    let cond = TautomerCondition::parse("1N,O").unwrap();
    assert_eq!(cond.aromaticity, Some(true));
    assert_eq!(cond.labels, vec![7, 8]);

    let plain = TautomerCondition::parse("N").unwrap();
    assert_eq!(plain.aromaticity, None);
    assert_eq!(plain.labels, vec![7]);

    assert!(TautomerCondition::parse("").is_err());
    assert!(TautomerCondition::parse("2N").is_err());
    assert!(TautomerCondition::parse("N;O").is_err());
    assert!(TautomerCondition::parse("Xx").is_err());
}

#[test]
fn sessions_move_between_threads() {
    fn assert_send<T: Send>() {}
    assert_send::<crate::session::Session>();

    let mut session = crate::session::Session::new(SessionId(1));
    let target = session.molecule_from_smiles("c1ccccc1").unwrap();
    let query = session.pattern_from_smiles("c").unwrap();
    let handle = std::thread::spawn(move || {
        let matcher = session.create_matcher(target, "").unwrap();
        session.count_matches(matcher, query, 0).unwrap()
    });
    assert_eq!(handle.join().unwrap(), 6);
}

#[test]
fn deadline_behaviour() {
    let none = Deadline::from_millis(0);
    assert!(!none.expired());
    assert!(none.check().is_ok());

    let short = Deadline::from_millis(1);
    std::thread::sleep(std::time::Duration::from_millis(5));
    assert!(short.expired());
    assert_eq!(short.check(), Err(EngineError::Cancelled));
}
