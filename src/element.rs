/// Compact element table covering the symbols the SMILES reader and the
/// tautomer rule parser accept.
///
/// Each entry is `(symbol, atomic number, default valences)`. The valence
/// list is consulted when assigning implicit hydrogens to organic-subset
/// atoms; elements outside this table get no implicit hydrogens.
const ELEMENTS: &[(&str, u8, &[u8])] = &[
    ("H", 1, &[1]),
    ("He", 2, &[0]),
    ("Li", 3, &[1]),
    ("Be", 4, &[2]),
    ("B", 5, &[3]),
    ("C", 6, &[4]),
    ("N", 7, &[3, 5]),
    ("O", 8, &[2]),
    ("F", 9, &[1]),
    ("Na", 11, &[1]),
    ("Mg", 12, &[2]),
    ("Al", 13, &[3]),
    ("Si", 14, &[4]),
    ("P", 15, &[3, 5]),
    ("S", 16, &[2, 4, 6]),
    ("Cl", 17, &[1]),
    ("K", 19, &[1]),
    ("Ca", 20, &[2]),
    ("Fe", 26, &[2, 3]),
    ("Cu", 29, &[1, 2]),
    ("Zn", 30, &[2]),
    ("As", 33, &[3, 5]),
    ("Se", 34, &[2, 4, 6]),
    ("Br", 35, &[1]),
    ("Ag", 47, &[1]),
    ("Sn", 50, &[2, 4]),
    ("Te", 52, &[2, 4, 6]),
    ("I", 53, &[1]),
    ("Au", 79, &[1, 3]),
    ("Hg", 80, &[1, 2]),
    ("Pb", 82, &[2, 4]),
];

/// Resolve an element symbol (case-sensitive, e.g. `"Cl"`) to its atomic
/// number.
pub fn atomic_num_from_symbol(symbol: &str) -> Option<u8> {
    ELEMENTS
        .iter()
        .find(|(sym, _, _)| *sym == symbol)
        .map(|&(_, num, _)| num)
}

/// Symbol for an atomic number, if the table covers it.
pub fn symbol_from_atomic_num(atomic_num: u8) -> Option<&'static str> {
    ELEMENTS
        .iter()
        .find(|&&(_, num, _)| num == atomic_num)
        .map(|&(sym, _, _)| sym)
}

/// Default valences for an element, lowest first. Empty when unknown.
pub fn default_valences(atomic_num: u8) -> &'static [u8] {
    ELEMENTS
        .iter()
        .find(|&&(_, num, _)| num == atomic_num)
        .map(|&(_, _, v)| v)
        .unwrap_or(&[])
}

/// Implicit hydrogen count for an atom given its bond order sum and formal
/// charge: the smallest default valence that accommodates the bonds.
pub fn implicit_hydrogens(atomic_num: u8, bond_sum: u8, charge: i8) -> u8 {
    let valences = default_valences(atomic_num);
    // Charge shifts the effective valence for the common organic elements
    // (N+ binds four, O- binds one).
    let adjust = |v: u8| -> i16 {
        match atomic_num {
            7 | 15 => v as i16 + charge as i16,
            8 | 16 => v as i16 + charge as i16,
            6 => v as i16 - charge.abs() as i16,
            5 => v as i16 - charge as i16,
            _ => v as i16,
        }
    };
    for &v in valences {
        let eff = adjust(v);
        if eff >= bond_sum as i16 {
            return (eff - bond_sum as i16) as u8;
        }
    }
    0
}
