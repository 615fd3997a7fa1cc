/// Atom payload for a molecular graph node.
///
/// `Atom` stores intrinsic atomic properties — the things you would read off
/// a structural formula. Derived properties (ring membership, neighbourhood
/// counters, conjugation) are computed by the engine on demand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Atom {
    /// Atomic number (1 = H, 6 = C, 7 = N, …). Identifies the element.
    pub atomic_num: u8,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Mass number. `0` means natural isotopic abundance (the common case).
    pub isotope: u16,
    /// Number of implicit (suppressed) hydrogens on this atom.
    ///
    /// These are not graph nodes until hydrogen unfolding turns them into
    /// explicit vertices; see [`crate::hydrogen::unfold_hydrogens`].
    pub hydrogen_count: u8,
    /// Whether this atom is part of an aromatic system.
    ///
    /// Set by aromatic perception or directly by the SMILES reader for
    /// lowercase aromatic symbols.
    pub is_aromatic: bool,
}

impl Atom {
    /// A bare atom of the given element with no charge, isotope, or hydrogens.
    pub fn of(atomic_num: u8) -> Self {
        Self {
            atomic_num,
            ..Self::default()
        }
    }

    pub fn is_hydrogen(&self) -> bool {
        self.atomic_num == 1
    }
}
