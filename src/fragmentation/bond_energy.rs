use std::collections::HashMap;

use crate::molecule::graph::{Bond, BondOrder, MoleculeGraph};

/// Energy assumed for bonds whose element pair and order are not listed,
/// equivalent to a carbon-carbon single bond.
pub const DEFAULT_BOND_ENERGY: f64 = 348.0;

/// Dissociation energies per (element pair, bond order), keyed by a
/// "C-C" / "C=O" / "C~N" style description. Lookup is symmetric in the two
/// endpoint symbols.
pub struct BondEnergyTable {
    energies: HashMap<&'static str, f64>,
}

impl Default for BondEnergyTable {
    fn default() -> Self {
        Self::new()
    }
}

impl BondEnergyTable {
    pub fn new() -> Self {
        let mut energies = HashMap::new();
        energies.insert("H-H", 436.0);
        energies.insert("H-C", 412.0);
        energies.insert("H-Si", 318.0);
        energies.insert("H-N", 388.0);
        energies.insert("H-P", 322.0);
        energies.insert("H-O", 463.0);
        energies.insert("H-S", 338.0);
        energies.insert("H-F", 562.0);
        energies.insert("H-Cl", 431.0);
        energies.insert("H-Br", 366.0);
        energies.insert("H-I", 299.0);
        energies.insert("H-B", 389.0);
        energies.insert("H-Ge", 288.0);
        energies.insert("H-Sn", 251.0);
        energies.insert("H-As", 247.0);
        energies.insert("H-Se", 276.0);
        energies.insert("H-T", 238.0);
        energies.insert("C-C", 348.0);
        energies.insert("C=C", 612.0);
        energies.insert("C~C", 837.0);
        energies.insert("C-O", 360.0);
        energies.insert("C=O", 743.0);
        energies.insert("C-N", 305.0);
        energies.insert("C=N", 613.0);
        energies.insert("C~N", 890.0);
        energies.insert("C-F", 484.0);
        energies.insert("C-Cl", 338.0);
        energies.insert("C-Br", 276.0);
        energies.insert("C-I", 238.0);
        energies.insert("C-S", 272.0);
        energies.insert("C=S", 573.0);
        energies.insert("C-Si", 318.0);
        energies.insert("C-Ge", 238.0);
        energies.insert("C-Sn", 192.0);
        energies.insert("C-Pb", 130.0);
        energies.insert("C-P", 264.0);
        energies.insert("C-B", 356.0);
        energies.insert("P-P", 201.0);
        energies.insert("P-O", 335.0);
        energies.insert("P=O", 544.0);
        energies.insert("P=S", 335.0);
        energies.insert("P-F", 490.0);
        energies.insert("P-Cl", 326.0);
        energies.insert("P-Br", 264.0);
        energies.insert("P-I", 184.0);
        energies.insert("F-Cl", 313.0);
        energies.insert("Si-Si", 176.0);
        energies.insert("N-N", 163.0);
        energies.insert("N=N", 409.0);
        energies.insert("N~N", 944.0);
        energies.insert("O-O", 146.0);
        energies.insert("O=O", 496.0);
        energies.insert("F-F", 158.0);
        energies.insert("Cl-Cl", 242.0);
        energies.insert("Br-Br", 193.0);
        energies.insert("I-I", 151.0);
        energies.insert("At-At", 116.0);
        energies.insert("Se-Se", 172.0);
        energies.insert("I-O", 201.0);
        energies.insert("I-F", 273.0);
        energies.insert("I-Cl", 208.0);
        energies.insert("I-Br", 175.0);
        energies.insert("B-B", 293.0);
        energies.insert("B-O", 536.0);
        energies.insert("B-F", 613.0);
        energies.insert("B-Cl", 456.0);
        energies.insert("B-Br", 377.0);
        energies.insert("S-Cl", 255.0);
        energies.insert("S-F", 284.0);
        energies.insert("S=S", 425.0);
        energies.insert("S=O", 522.0);
        energies.insert("N=O", 607.0);
        energies.insert("N-O", 222.0);
        energies.insert("S-S", 226.0);
        energies.insert("F-N", 272.0);
        energies.insert("F-O", 184.0);
        energies.insert("F-S", 226.0);
        BondEnergyTable { energies }
    }

    /// Energy for breaking the given bond; falls back to
    /// `DEFAULT_BOND_ENERGY` for unlisted element pairs.
    pub fn lookup(&self, bond: &Bond, molecule: &MoleculeGraph) -> f64 {
        let first = &molecule.atom(bond.atoms.0).symbol;
        let second = &molecule.atom(bond.atoms.1).symbol;
        self.lookup_symbols(first, second, bond.order)
    }

    pub fn lookup_symbols(&self, first: &str, second: &str, order: BondOrder) -> f64 {
        let joiner = order.joiner();
        let description = format!("{}{}{}", first, joiner, second);
        if let Some(&energy) = self.energies.get(description.as_str()) {
            return energy;
        }
        let reversed = format!("{}{}{}", second, joiner, first);
        if let Some(&energy) = self.energies.get(reversed.as_str()) {
            return energy;
        }
        DEFAULT_BOND_ENERGY
    }

    /// Sum of the dissociation energies of every bond in the molecule.
    pub fn total_bond_energy(&self, molecule: &MoleculeGraph) -> f64 {
        molecule
            .bonds
            .iter()
            .map(|bond| self.lookup(bond, molecule))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::graph::Atom;

    #[test]
    fn test_lookup_is_symmetric() {
        let table = BondEnergyTable::new();
        assert_eq!(table.lookup_symbols("H", "C", BondOrder::Single), 412.0);
        assert_eq!(table.lookup_symbols("C", "H", BondOrder::Single), 412.0);
        assert_eq!(table.lookup_symbols("N", "C", BondOrder::Triple), 890.0);
    }

    #[test]
    fn test_unknown_pair_falls_back_to_carbon_single_bond() {
        let table = BondEnergyTable::new();
        assert_eq!(table.lookup_symbols("X", "N", BondOrder::Triple), 348.0);
        assert_eq!(table.lookup_symbols("N", "X", BondOrder::Triple), 348.0);
    }

    #[test]
    fn test_total_bond_energy_empty_molecule() {
        let table = BondEnergyTable::new();
        let molecule = MoleculeGraph::new(vec![], vec![]);
        assert_eq!(table.total_bond_energy(&molecule), 0.0);
    }

    #[test]
    fn test_total_bond_energy_is_additive() {
        let table = BondEnergyTable::new();
        // C=C, C-H, C~N
        let atoms = vec![
            Atom::new(0, "C"),
            Atom::new(1, "C"),
            Atom::new(2, "H"),
            Atom::new(3, "N"),
        ];
        let bonds = vec![
            Bond::new(0, 0, 1, BondOrder::Double),
            Bond::new(1, 1, 2, BondOrder::Single),
            Bond::new(2, 1, 3, BondOrder::Triple),
        ];
        let molecule = MoleculeGraph::new(atoms, bonds);
        assert_eq!(table.total_bond_energy(&molecule), 612.0 + 412.0 + 890.0);
    }

    #[test]
    fn test_unknown_bond_adds_default_energy() {
        let table = BondEnergyTable::new();
        // C=C, C-H, C~N, N~X (unknown pair)
        let atoms = vec![
            Atom::new(0, "C"),
            Atom::new(1, "C"),
            Atom::new(2, "H"),
            Atom::new(3, "N"),
            Atom::new(4, "X"),
        ];
        let bonds = vec![
            Bond::new(0, 0, 1, BondOrder::Double),
            Bond::new(1, 1, 2, BondOrder::Single),
            Bond::new(2, 1, 3, BondOrder::Triple),
            Bond::new(3, 3, 4, BondOrder::Triple),
        ];
        let molecule = MoleculeGraph::new(atoms, bonds);
        assert_eq!(
            table.total_bond_energy(&molecule),
            612.0 + 412.0 + 890.0 + 348.0
        );
    }

    #[test]
    fn test_carbon_ring_with_hydrogens() {
        let table = BondEnergyTable::new();
        let mut atoms: Vec<Atom> = (0..5).map(|i| Atom::new(i, "C")).collect();
        for i in 5..10 {
            atoms.push(Atom::new(i, "H"));
        }
        let mut bonds = Vec::new();
        for i in 0..5 {
            bonds.push(Bond::new(i, i, (i + 1) % 5, BondOrder::Single));
        }
        for i in 0..5 {
            bonds.push(Bond::new(5 + i, i, 5 + i, BondOrder::Single));
        }
        let molecule = MoleculeGraph::new(atoms, bonds);
        assert_eq!(
            table.total_bond_energy(&molecule),
            5.0 * 348.0 + 5.0 * 412.0
        );
    }
}
