use std::collections::{HashMap, HashSet};

use tracing::trace;

use crate::fragmentation::fragmenter::Fragment;
use crate::fragmentation::neutral_loss::NeutralLossRule;
use crate::molecule::graph::MoleculeGraph;
use crate::molecule::ring::RingSet;

/// Locates and removes the substructure a neutral-loss rule describes.
/// Holds only shared read-only context; one instance serves a whole
/// candidate run.
pub struct PostProcessor<'a> {
    molecule: &'a MoleculeGraph,
    rings: &'a RingSet,
}

impl<'a> PostProcessor<'a> {
    pub fn new(molecule: &'a MoleculeGraph, rings: &'a RingSet) -> Self {
        PostProcessor { molecule, rings }
    }

    /// Applies one rule to one fragment. Every anchor atom that carries the
    /// complete loss yields an output; removal may disconnect the fragment,
    /// in which case each connected component becomes its own output
    /// fragment. Energy, depth and loss label are set by the caller.
    pub fn process(
        &self,
        fragment: &Fragment,
        rule: &NeutralLossRule,
        atom_masses: &HashMap<String, f64>,
    ) -> Vec<Fragment> {
        let fragment_bonds = fragment.bond_id_set();
        let ring_atoms = self.rings.intact_ring_atoms(self.molecule, &fragment_bonds);
        let adjacency = self.molecule.adjacency(&fragment.bond_ids);

        let mut outputs = Vec::new();
        let mut done_atoms: HashSet<usize> = HashSet::new();
        let mut done_bonds: HashSet<usize> = HashSet::new();

        for &bond_id in &fragment.bond_ids {
            if !done_bonds.insert(bond_id) {
                continue;
            }
            let bond = self.molecule.bond(bond_id);

            for atom_id in [bond.atoms.0, bond.atoms.1] {
                if !done_atoms.insert(atom_id) {
                    continue;
                }
                let atom = self.molecule.atom(atom_id);
                if atom.symbol != rule.atom_to_start || ring_atoms.contains(&atom_id) {
                    continue;
                }
                // the anchor must be terminal, not in between
                let heavy_neighbours = adjacency
                    .get(&atom_id)
                    .map_or(0, |incident| {
                        incident
                            .iter()
                            .filter(|&&b| {
                                let partner = self.molecule.bond(b).partner(atom_id);
                                self.molecule.atom(partner).symbol != "H"
                            })
                            .count()
                    });
                if heavy_neighbours > 1 {
                    continue;
                }

                let Some(removed) = self.find_complete_loss(&adjacency, &ring_atoms, atom_id, rule)
                else {
                    continue;
                };
                trace!(
                    anchor = atom_id,
                    loss = %rule.elemental_composition.formula,
                    "neutral loss located"
                );

                let remaining_atoms: Vec<usize> = fragment
                    .atom_ids
                    .iter()
                    .copied()
                    .filter(|a| !removed.contains(a))
                    .collect();
                let remaining_bonds: Vec<usize> = fragment
                    .bond_ids
                    .iter()
                    .copied()
                    .filter(|&b| {
                        let bond = self.molecule.bond(b);
                        !removed.contains(&bond.atoms.0) && !removed.contains(&bond.atoms.1)
                    })
                    .collect();
                if remaining_atoms.is_empty() {
                    continue;
                }

                for (atom_ids, bond_ids) in self
                    .molecule
                    .connected_components(&remaining_atoms, &remaining_bonds)
                {
                    let mass = atom_ids
                        .iter()
                        .map(|&a| atom_masses[&self.molecule.atom(a).symbol])
                        .sum();
                    outputs.push(Fragment {
                        atom_ids,
                        bond_ids,
                        mass,
                        bond_energy: fragment.bond_energy,
                        tree_depth: fragment.tree_depth,
                        neutral_loss: fragment.neutral_loss.clone(),
                    });
                }
            }
        }

        outputs
    }

    /// Breadth-limited walk from the anchor atom, following only carbon
    /// atoms outward, collecting the rule's required atom multiset. Ring
    /// atoms are never collected. Returns the atoms to remove, or `None`
    /// when the loss is incomplete or the anchor lacks the required
    /// hydrogens.
    fn find_complete_loss(
        &self,
        adjacency: &HashMap<usize, Vec<usize>>,
        ring_atoms: &HashSet<usize>,
        anchor_id: usize,
        rule: &NeutralLossRule,
    ) -> Option<Vec<usize>> {
        let anchor_symbol = self.molecule.atom(anchor_id).symbol.as_str();

        // the atoms that make up the loss: elemental composition for plain
        // losses, topological composition when a hydrogen is rearranged
        let source = if rule.hydrogen_difference == -1 {
            &rule.elemental_composition.elements
        } else {
            &rule.topo_fragment.elements
        };
        let mut required: Vec<&str> = Vec::new();
        for (symbol, &count) in source {
            for _ in 0..count {
                required.push(symbol.as_str());
            }
        }

        let mut hydrogens_needed = rule.hydrogen_on_start_atom;
        let mut distance = rule.distance;
        let mut first_level = true;

        let mut found: Vec<usize> = Vec::new();
        let mut checked_bonds: HashSet<usize> = HashSet::new();
        let mut checked_atoms: HashSet<usize> = HashSet::new();
        let mut bond_queue: Vec<usize> = adjacency.get(&anchor_id).cloned().unwrap_or_default();
        let mut bonds_further: Vec<usize> = Vec::new();

        while distance > 0 {
            let current = bond_queue.pop();

            if let Some(bond_id) = current {
                if !checked_bonds.insert(bond_id) {
                    continue;
                }
                let bond = self.molecule.bond(bond_id);

                for atom_id in [bond.atoms.0, bond.atoms.1] {
                    if !checked_atoms.insert(atom_id) {
                        continue;
                    }
                    let symbol = self.molecule.atom(atom_id).symbol.as_str();

                    if first_level && symbol == "H" {
                        hydrogens_needed -= 1;
                    }

                    if symbol == anchor_symbol {
                        if let Some(position) = required.iter().position(|&s| s == symbol) {
                            required.remove(position);
                            found.push(atom_id);
                        }
                        continue;
                    }

                    // collect a required atom, but never out of a ring
                    if !ring_atoms.contains(&atom_id) {
                        if let Some(position) = required.iter().position(|&s| s == symbol) {
                            required.remove(position);
                            found.push(atom_id);
                            continue;
                        }
                    }

                    // the walk only continues along carbon
                    if symbol != "C" {
                        continue;
                    }
                    if let Some(incident) = adjacency.get(&atom_id) {
                        bonds_further.extend(incident.iter().copied());
                    }
                }
            }

            if current.is_none() && bond_queue.is_empty() && bonds_further.is_empty() {
                break;
            }

            if bond_queue.is_empty() {
                distance -= 1;
                bond_queue.append(&mut bonds_further);
                first_level = false;
            }
        }

        if required.is_empty() && hydrogens_needed <= 0 {
            Some(found)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragmentation::neutral_loss::NeutralLossCatalog;
    use crate::molecule::graph::{Atom, Bond, BondOrder};
    use crate::molecule::ring::Ring;

    fn atom_masses(molecule: &MoleculeGraph) -> HashMap<String, f64> {
        molecule
            .atoms
            .iter()
            .map(|a| (a.symbol.clone(), a.exact_mass.unwrap()))
            .collect()
    }

    /// CH3-CH2-OH with explicit hydrogens.
    fn ethanol() -> MoleculeGraph {
        let atoms = vec![
            Atom::new(0, "C"),
            Atom::new(1, "C"),
            Atom::new(2, "O"),
            Atom::new(3, "H"),
            Atom::new(4, "H"),
            Atom::new(5, "H"),
            Atom::new(6, "H"),
            Atom::new(7, "H"),
            Atom::new(8, "H"),
        ];
        let bonds = vec![
            Bond::new(0, 0, 1, BondOrder::Single),
            Bond::new(1, 1, 2, BondOrder::Single),
            Bond::new(2, 2, 8, BondOrder::Single),
            Bond::new(3, 0, 3, BondOrder::Single),
            Bond::new(4, 0, 4, BondOrder::Single),
            Bond::new(5, 0, 5, BondOrder::Single),
            Bond::new(6, 1, 6, BondOrder::Single),
            Bond::new(7, 1, 7, BondOrder::Single),
        ];
        MoleculeGraph::new(atoms, bonds)
    }

    fn whole_fragment(molecule: &MoleculeGraph) -> Fragment {
        let masses = atom_masses(molecule);
        let atom_ids: Vec<usize> = (0..molecule.atoms.len()).collect();
        let mass = atom_ids
            .iter()
            .map(|&a| masses[&molecule.atom(a).symbol])
            .sum();
        Fragment {
            atom_ids,
            bond_ids: (0..molecule.bonds.len()).collect(),
            mass,
            bond_energy: 0.0,
            tree_depth: 1,
            neutral_loss: None,
        }
    }

    fn water_rule() -> NeutralLossRule {
        NeutralLossCatalog::standard().unwrap().rules[0].clone()
    }

    #[test]
    fn test_water_loss_from_ethanol() {
        let molecule = ethanol();
        let rings = RingSet::default();
        let post = PostProcessor::new(&molecule, &rings);
        let fragment = whole_fragment(&molecule);

        let outputs = post.process(&fragment, &water_rule(), &atom_masses(&molecule));
        assert_eq!(outputs.len(), 1);

        let remainder = &outputs[0];
        assert_eq!(remainder.sum_formula(&molecule), "C2H4");
        assert!((remainder.mass - 28.03130012892).abs() < 1e-6);
        assert!(!remainder.atom_ids.contains(&2));
    }

    #[test]
    fn test_water_loss_needs_hydrogen_on_anchor() {
        // dimethyl ether: the oxygen is in between and carries no hydrogen
        let atoms = vec![
            Atom::new(0, "C"),
            Atom::new(1, "O"),
            Atom::new(2, "C"),
            Atom::new(3, "H"),
            Atom::new(4, "H"),
            Atom::new(5, "H"),
            Atom::new(6, "H"),
            Atom::new(7, "H"),
            Atom::new(8, "H"),
        ];
        let bonds = vec![
            Bond::new(0, 0, 1, BondOrder::Single),
            Bond::new(1, 1, 2, BondOrder::Single),
            Bond::new(2, 0, 3, BondOrder::Single),
            Bond::new(3, 0, 4, BondOrder::Single),
            Bond::new(4, 0, 5, BondOrder::Single),
            Bond::new(5, 2, 6, BondOrder::Single),
            Bond::new(6, 2, 7, BondOrder::Single),
            Bond::new(7, 2, 8, BondOrder::Single),
        ];
        let molecule = MoleculeGraph::new(atoms, bonds);
        let rings = RingSet::default();
        let post = PostProcessor::new(&molecule, &rings);
        let fragment = whole_fragment(&molecule);

        let outputs = post.process(&fragment, &water_rule(), &atom_masses(&molecule));
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_ring_atoms_are_never_removed() {
        // oxygen bonded into a three-membered carbon ring via one carbon,
        // with the ring intact the ring carbons must not be collected
        let atoms = vec![
            Atom::new(0, "C"),
            Atom::new(1, "C"),
            Atom::new(2, "C"),
            Atom::new(3, "O"),
            Atom::new(4, "H"),
        ];
        let bonds = vec![
            Bond::new(0, 0, 1, BondOrder::Single),
            Bond::new(1, 1, 2, BondOrder::Single),
            Bond::new(2, 2, 0, BondOrder::Single),
            Bond::new(3, 0, 3, BondOrder::Single),
            Bond::new(4, 3, 4, BondOrder::Single),
        ];
        let molecule = MoleculeGraph::new(atoms, bonds);
        let rings = RingSet::new(vec![Ring::new(vec![0, 1, 2], false)]);
        let post = PostProcessor::new(&molecule, &rings);
        let fragment = whole_fragment(&molecule);

        // H2O needs two hydrogens; only the hydroxyl hydrogen is reachable
        let outputs = post.process(&fragment, &water_rule(), &atom_masses(&molecule));
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_each_matching_anchor_yields_an_output() {
        // HO-CH2-OH: either hydroxyl oxygen can carry the water loss
        let atoms = vec![
            Atom::new(0, "O"),
            Atom::new(1, "C"),
            Atom::new(2, "O"),
            Atom::new(3, "H"),
            Atom::new(4, "H"),
            Atom::new(5, "H"),
            Atom::new(6, "H"),
        ];
        let bonds = vec![
            Bond::new(0, 0, 1, BondOrder::Single),
            Bond::new(1, 1, 2, BondOrder::Single),
            Bond::new(2, 0, 3, BondOrder::Single),
            Bond::new(3, 2, 4, BondOrder::Single),
            Bond::new(4, 1, 5, BondOrder::Single),
            Bond::new(5, 1, 6, BondOrder::Single),
        ];
        let molecule = MoleculeGraph::new(atoms, bonds);
        let rings = RingSet::default();
        let post = PostProcessor::new(&molecule, &rings);
        let fragment = whole_fragment(&molecule);

        let outputs = post.process(&fragment, &water_rule(), &atom_masses(&molecule));
        assert_eq!(outputs.len(), 2);
        for output in &outputs {
            assert_eq!(output.sum_formula(&molecule), "CH2O");
        }
    }
}
