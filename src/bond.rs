/// Bond order of a molecular graph edge.
///
/// `Aromatic` is a normalized order produced by aromatic perception; fresh
/// Kekulé input carries only `Single`/`Double`/`Triple` until aromatized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Contribution of the bond to an atom's valence sum. Aromatic bonds
    /// count as one; the delocalized contribution is accounted separately.
    pub fn valence_contrib(self) -> u8 {
        match self {
            BondOrder::Single | BondOrder::Aromatic => 1,
            BondOrder::Double => 2,
            BondOrder::Triple => 3,
        }
    }
}

/// Bond payload for a molecular graph edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Bond {
    pub order: BondOrder,
}

impl Bond {
    pub fn of(order: BondOrder) -> Self {
        Self { order }
    }
}
