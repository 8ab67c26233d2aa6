use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::molecule::graph::MoleculeGraph;

/// A ring perceived on the original molecule: its bonds in ring order, and
/// whether the ring is aromatic.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ring {
    pub bond_ids: Vec<usize>,
    pub aromatic: bool,
}

impl Ring {
    pub fn new(bond_ids: Vec<usize>, aromatic: bool) -> Self {
        Ring { bond_ids, aromatic }
    }

    pub fn contains_bond(&self, bond_id: usize) -> bool {
        self.bond_ids.contains(&bond_id)
    }

    /// A ring is intact within a fragment only while every ring bond
    /// survives; once any ring bond is broken the ring is no longer valid
    /// for that branch of the search.
    pub fn is_intact(&self, fragment_bonds: &HashSet<usize>) -> bool {
        self.bond_ids.iter().all(|b| fragment_bonds.contains(b))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RingSet {
    pub rings: Vec<Ring>,
}

impl RingSet {
    pub fn new(rings: Vec<Ring>) -> Self {
        RingSet { rings }
    }

    /// First intact ring containing the given bond, if any.
    pub fn intact_ring_with_bond(
        &self,
        bond_id: usize,
        fragment_bonds: &HashSet<usize>,
    ) -> Option<&Ring> {
        self.rings
            .iter()
            .find(|r| r.contains_bond(bond_id) && r.is_intact(fragment_bonds))
    }

    /// Rings that are fully intact within the fragment.
    pub fn intact_rings(&self, fragment_bonds: &HashSet<usize>) -> Vec<&Ring> {
        self.rings.iter().filter(|r| r.is_intact(fragment_bonds)).collect()
    }

    /// Atom ids that belong to at least one intact ring of the fragment.
    pub fn intact_ring_atoms(
        &self,
        molecule: &MoleculeGraph,
        fragment_bonds: &HashSet<usize>,
    ) -> HashSet<usize> {
        let mut atoms = HashSet::new();
        for ring in self.intact_rings(fragment_bonds) {
            for &bond_id in &ring.bond_ids {
                let bond = molecule.bond(bond_id);
                atoms.insert(bond.atoms.0);
                atoms.insert(bond.atoms.1);
            }
        }
        atoms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::graph::{Atom, Bond, BondOrder};

    fn triangle() -> (MoleculeGraph, RingSet) {
        let atoms = vec![Atom::new(0, "C"), Atom::new(1, "C"), Atom::new(2, "C")];
        let bonds = vec![
            Bond::new(0, 0, 1, BondOrder::Single),
            Bond::new(1, 1, 2, BondOrder::Single),
            Bond::new(2, 2, 0, BondOrder::Single),
        ];
        let rings = RingSet::new(vec![Ring::new(vec![0, 1, 2], false)]);
        (MoleculeGraph::new(atoms, bonds), rings)
    }

    #[test]
    fn test_intact_ring_lookup() {
        let (_, rings) = triangle();
        let all: HashSet<usize> = [0, 1, 2].into_iter().collect();
        assert!(rings.intact_ring_with_bond(1, &all).is_some());

        // once a ring bond is broken, the ring is invalid for that branch
        let broken: HashSet<usize> = [0, 1].into_iter().collect();
        assert!(rings.intact_ring_with_bond(1, &broken).is_none());
    }

    #[test]
    fn test_intact_ring_atoms() {
        let (molecule, rings) = triangle();
        let all: HashSet<usize> = [0, 1, 2].into_iter().collect();
        let atoms = rings.intact_ring_atoms(&molecule, &all);
        assert_eq!(atoms.len(), 3);
    }
}
