use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::chemistry::elements::atomic_weights_mono_isotopic;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondOrder {
    Single,
    Double,
    Triple,
}

impl BondOrder {
    /// Joiner character used in bond descriptions, e.g. "C-C", "C=O", "C~N".
    pub fn joiner(&self) -> char {
        match self {
            BondOrder::Single => '-',
            BondOrder::Double => '=',
            BondOrder::Triple => '~',
        }
    }
}

/// An atom as delivered by the structure-perception collaborator. The exact
/// mass is `None` for placeholder elements whose mass cannot be resolved.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Atom {
    pub id: usize,
    pub symbol: String,
    pub exact_mass: Option<f64>,
}

impl Atom {
    /// Creates an atom, resolving its exact mass from the element table.
    pub fn new(id: usize, symbol: &str) -> Self {
        let exact_mass = atomic_weights_mono_isotopic().get(symbol).copied();
        Atom {
            id,
            symbol: symbol.to_string(),
            exact_mass,
        }
    }

    pub fn with_mass(id: usize, symbol: &str, exact_mass: f64) -> Self {
        Atom {
            id,
            symbol: symbol.to_string(),
            exact_mass: Some(exact_mass),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bond {
    pub id: usize,
    pub order: BondOrder,
    pub atoms: (usize, usize),
}

impl Bond {
    pub fn new(id: usize, first: usize, second: usize, order: BondOrder) -> Self {
        Bond {
            id,
            order,
            atoms: (first, second),
        }
    }

    /// The endpoint opposite to `atom_id`.
    pub fn partner(&self, atom_id: usize) -> usize {
        if self.atoms.0 == atom_id {
            self.atoms.1
        } else {
            self.atoms.0
        }
    }

}

/// A molecular graph. Atom and bond ids are their indices, stable for the
/// lifetime of the candidate; fragments reference subsets of these ids.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoleculeGraph {
    pub atoms: Vec<Atom>,
    pub bonds: Vec<Bond>,
}

impl MoleculeGraph {
    pub fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Self {
        MoleculeGraph { atoms, bonds }
    }

    pub fn atom(&self, id: usize) -> &Atom {
        &self.atoms[id]
    }

    pub fn bond(&self, id: usize) -> &Bond {
        &self.bonds[id]
    }

    /// Incident-bond map restricted to the given bond subset. The per-atom
    /// bond lists keep the iteration order of `bond_ids`.
    pub fn adjacency(&self, bond_ids: &[usize]) -> HashMap<usize, Vec<usize>> {
        let mut map: HashMap<usize, Vec<usize>> = HashMap::new();
        for &bond_id in bond_ids {
            let bond = self.bond(bond_id);
            map.entry(bond.atoms.0).or_default().push(bond_id);
            map.entry(bond.atoms.1).or_default().push(bond_id);
        }
        map
    }

    /// Total exact mass, `None` when any atom mass is unresolvable.
    pub fn exact_mass(&self) -> Option<f64> {
        self.atoms.iter().map(|a| a.exact_mass).sum()
    }

    /// Element counts over a subset of atoms.
    pub fn element_counts(&self, atom_ids: &[usize]) -> HashMap<String, i32> {
        let mut counts: HashMap<String, i32> = HashMap::new();
        for &atom_id in atom_ids {
            *counts.entry(self.atom(atom_id).symbol.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Splits the induced subgraph over (`atom_ids`, `bond_ids`) into its
    /// connected components. Atoms without surviving bonds form single-atom
    /// components. Component order follows the order of `atom_ids`.
    pub fn connected_components(
        &self,
        atom_ids: &[usize],
        bond_ids: &[usize],
    ) -> Vec<(Vec<usize>, Vec<usize>)> {
        let adjacency = self.adjacency(bond_ids);
        let atom_set: HashSet<usize> = atom_ids.iter().copied().collect();
        let mut seen: HashSet<usize> = HashSet::new();
        let mut components = Vec::new();

        for &seed in atom_ids {
            if seen.contains(&seed) {
                continue;
            }
            let mut component_atoms = Vec::new();
            let mut component_bonds = Vec::new();
            let mut bond_seen: HashSet<usize> = HashSet::new();
            let mut stack = vec![seed];
            seen.insert(seed);

            while let Some(atom_id) = stack.pop() {
                component_atoms.push(atom_id);
                if let Some(incident) = adjacency.get(&atom_id) {
                    for &bond_id in incident {
                        if bond_seen.insert(bond_id) {
                            component_bonds.push(bond_id);
                        }
                        let partner = self.bond(bond_id).partner(atom_id);
                        if atom_set.contains(&partner) && seen.insert(partner) {
                            stack.push(partner);
                        }
                    }
                }
            }
            components.push((component_atoms, component_bonds));
        }
        components
    }
}
