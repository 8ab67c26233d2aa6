use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chemistry::constants::MASS_HYDROGEN;
use crate::chemistry::sum_formula::{hill_formula_string, is_possible_neutral_loss};
use crate::error::FragmentationError;
use crate::fragmentation::bond_energy::BondEnergyTable;
use crate::fragmentation::cancellation::CancellationToken;
use crate::fragmentation::neutral_loss::NeutralLossCatalog;
use crate::fragmentation::post_processor::PostProcessor;
use crate::molecule::graph::MoleculeGraph;
use crate::molecule::ring::RingSet;
use crate::spectra::peak::{ppm_deviation, Peak};

/// Energy booked for a neutral-loss removal, on top of the parent
/// fragment's accumulated cost.
pub const NEUTRAL_LOSS_ENERGY: f64 = 500.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FragmentationConfig {
    pub mzabs: f64,
    pub mzppm: f64,
    /// Ion polarity, +1 or -1.
    pub mode: i32,
    pub tree_depth: usize,
}

impl FragmentationConfig {
    /// The reference configuration fixes the tree depth at 2; deeper trees
    /// grow combinatorially.
    pub fn new(mzabs: f64, mzppm: f64, mode: i32) -> Self {
        FragmentationConfig {
            mzabs,
            mzppm,
            mode,
            tree_depth: 2,
        }
    }

    pub fn with_tree_depth(mut self, tree_depth: usize) -> Self {
        self.tree_depth = tree_depth;
        self
    }
}

/// A substructure of the candidate molecule, identified by the atom and
/// bond ids it retains. Produced by the fragmenter, never mutated after
/// creation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Fragment {
    pub atom_ids: Vec<usize>,
    pub bond_ids: Vec<usize>,
    /// Sum of the member atom masses; neutral-loss atoms are already gone
    /// from the member set.
    pub mass: f64,
    /// Cumulative dissociation energy spent to reach this fragment.
    pub bond_energy: f64,
    /// Number of sequential breaking steps applied to reach it.
    pub tree_depth: usize,
    /// Formula of a removed neutral loss, e.g. "H2O".
    pub neutral_loss: Option<String>,
}

impl Fragment {
    pub fn sum_formula(&self, molecule: &MoleculeGraph) -> String {
        hill_formula_string(&molecule.element_counts(&self.atom_ids))
    }

    pub fn bond_id_set(&self) -> HashSet<usize> {
        self.bond_ids.iter().copied().collect()
    }
}

/// Sum-formula keyed deduplication. For a given formula only the
/// minimal-energy fragment(s) are retained: a cheaper newcomer replaces all
/// previous entries, an equal-or-costlier one leaves the map untouched.
#[derive(Debug, Default)]
pub struct DedupMap {
    map: HashMap<String, Vec<Fragment>>,
}

impl DedupMap {
    /// Returns true when the formula was already represented; the caller
    /// then drops the fragment from the output pool. Among equal energies
    /// the first-seen fragment wins.
    pub fn check_and_insert(&mut self, formula: &str, fragment: &Fragment) -> bool {
        match self.map.get_mut(formula) {
            Some(existing) => {
                if existing.iter().any(|f| f.bond_energy > fragment.bond_energy) {
                    existing.clear();
                    existing.push(fragment.clone());
                }
                true
            }
            None => {
                self.map.insert(formula.to_string(), vec![fragment.clone()]);
                false
            }
        }
    }

    /// Registers a fragment without duplicate suppression; neutral-loss
    /// outputs always enter the pool.
    pub fn insert(&mut self, formula: &str, fragment: &Fragment) {
        self.map
            .entry(formula.to_string())
            .or_default()
            .push(fragment.clone());
    }

    pub fn min_energy(&self, formula: &str) -> Option<f64> {
        self.map.get(formula).and_then(|fragments| {
            fragments
                .iter()
                .map(|f| f.bond_energy)
                .min_by(|a, b| a.total_cmp(b))
        })
    }
}

/// Accumulator for the fragment-collecting graph traversal.
struct Traversal {
    bonds: Vec<usize>,
    atoms: Vec<usize>,
    atom_set: HashSet<usize>,
    bond_set: HashSet<usize>,
    mass: f64,
}

impl Traversal {
    fn new() -> Self {
        Traversal {
            bonds: Vec::new(),
            atoms: Vec::new(),
            atom_set: HashSet::new(),
            bond_set: HashSet::new(),
            mass: 0.0,
        }
    }
}

/// Breadth-first generator of all fragments of a candidate molecule up to
/// the configured tree depth. One fragmenter handles one candidate run at a
/// time; state is reset at the start of each run.
pub struct Fragmenter<'a> {
    peaks: &'a [Peak],
    config: FragmentationConfig,
    energies: &'a BondEnergyTable,
    catalog: &'a NeutralLossCatalog,
    min_weight: f64,
    atom_masses: HashMap<String, f64>,
    dedup: DedupMap,
}

impl<'a> Fragmenter<'a> {
    pub fn new(
        peaks: &'a [Peak],
        config: FragmentationConfig,
        energies: &'a BondEnergyTable,
        catalog: &'a NeutralLossCatalog,
    ) -> Self {
        Fragmenter {
            peaks,
            config,
            energies,
            catalog,
            min_weight: 0.0,
            atom_masses: HashMap::new(),
            dedup: DedupMap::default(),
        }
    }

    /// Generates the complete fragment pool: the whole molecule plus every
    /// retained fragment at every depth up to the configured maximum, each
    /// carrying its cumulative bond energy and depth.
    ///
    /// A molecule containing an atom whose mass cannot be resolved yields
    /// an empty pool; the candidate is unusable for matching.
    pub fn generate_fragments(
        &mut self,
        molecule: &MoleculeGraph,
        rings: &RingSet,
        cancel: &CancellationToken,
    ) -> Result<Vec<Fragment>, FragmentationError> {
        if cancel.is_cancelled() {
            return Err(FragmentationError::Cancelled);
        }

        self.dedup = DedupMap::default();
        self.min_weight = self
            .peaks
            .iter()
            .map(|p| p.mass)
            .fold(f64::INFINITY, f64::min);
        if !self.min_weight.is_finite() {
            self.min_weight = 0.0;
        }
        // slack for the hydrogen adjustments applied during matching
        self.min_weight -= self.config.tree_depth as f64;

        self.atom_masses = match Self::prepare_atom_masses(molecule) {
            Some(masses) => masses,
            None => {
                debug!(
                    atoms = molecule.atoms.len(),
                    "unresolvable atom mass, candidate yields no fragments"
                );
                return Ok(Vec::new());
            }
        };

        let whole = self.whole_molecule_fragment(molecule);
        debug!(
            atoms = molecule.atoms.len(),
            bonds = molecule.bonds.len(),
            tree_depth = self.config.tree_depth,
            "starting fragmentation run"
        );

        let mut results = vec![whole.clone()];
        let mut queue: VecDeque<Fragment> = VecDeque::new();
        queue.push_back(whole.clone());

        let mut tree_depth = 1usize;

        // neutral losses are attempted on the intact molecule unconditionally
        for nl_fragment in self.add_neutral_losses(&whole, molecule, rings, true, tree_depth) {
            queue.push_back(nl_fragment.clone());
            results.push(nl_fragment);
        }

        let mut level_count = queue.len();
        let mut level_children: Vec<Fragment> = Vec::new();

        while let Some(current) = queue.pop_front() {
            level_count -= 1;

            // fragments with fewer than 2 bonds are not split further
            if current.bond_ids.len() >= 2 {
                // ring-bond pairs already tried while splitting this fragment
                let mut known_pairs: HashSet<(usize, usize)> = HashSet::new();
                let adjacency = molecule.adjacency(&current.bond_ids);

                for bond_id in self.splitable_bonds(&current, molecule, &adjacency) {
                    let parts = self.split_fragment(
                        &current,
                        bond_id,
                        molecule,
                        rings,
                        &adjacency,
                        &mut known_pairs,
                        tree_depth,
                    );
                    for fragment in parts {
                        queue.push_back(fragment.clone());
                        level_children.push(fragment.clone());
                        results.push(fragment);
                    }
                }
            }

            if level_count == 0 {
                if cancel.is_cancelled() {
                    return Err(FragmentationError::Cancelled);
                }
                tree_depth += 1;
                debug!(
                    depth = tree_depth,
                    pool = results.len(),
                    queued = queue.len(),
                    "depth level drained"
                );
                if tree_depth >= self.config.tree_depth {
                    break;
                }
                for fragment in std::mem::take(&mut level_children) {
                    let losses =
                        self.add_neutral_losses(&fragment, molecule, rings, false, tree_depth);
                    for nl_fragment in losses {
                        queue.push_back(nl_fragment.clone());
                        results.push(nl_fragment);
                    }
                }
                level_count = queue.len();
            }
        }

        Ok(results)
    }

    fn prepare_atom_masses(molecule: &MoleculeGraph) -> Option<HashMap<String, f64>> {
        let mut masses = HashMap::new();
        for atom in &molecule.atoms {
            match atom.exact_mass {
                Some(mass) => {
                    masses.insert(atom.symbol.clone(), mass);
                }
                None => return None,
            }
        }
        Some(masses)
    }

    fn whole_molecule_fragment(&self, molecule: &MoleculeGraph) -> Fragment {
        let atom_ids: Vec<usize> = (0..molecule.atoms.len()).collect();
        let bond_ids: Vec<usize> = (0..molecule.bonds.len()).collect();
        let mass = atom_ids
            .iter()
            .map(|&a| self.atom_masses[&molecule.atom(a).symbol])
            .sum();
        Fragment {
            atom_ids,
            bond_ids,
            mass,
            bond_energy: 0.0,
            tree_depth: 1,
            neutral_loss: None,
        }
    }

    /// Every bond except those whose removal would only strip a terminal
    /// hydrogen.
    fn splitable_bonds(
        &self,
        fragment: &Fragment,
        molecule: &MoleculeGraph,
        adjacency: &HashMap<usize, Vec<usize>>,
    ) -> Vec<usize> {
        fragment
            .bond_ids
            .iter()
            .copied()
            .filter(|&bond_id| {
                let bond = molecule.bond(bond_id);
                let terminal_hydrogen = [bond.atoms.0, bond.atoms.1].into_iter().any(|atom_id| {
                    adjacency.get(&atom_id).map_or(0, |b| b.len()) == 1
                        && molecule.atom(atom_id).symbol.starts_with('H')
                });
                !terminal_hydrogen
            })
            .collect()
    }

    /// Splits a fragment at one bond. A chain bond yields the two connected
    /// components left by its removal; a bond on an intact ring must be
    /// paired with a second bond of the same ring, each untried pairing
    /// yielding two candidates at the summed cost.
    fn split_fragment(
        &mut self,
        current: &Fragment,
        bond_id: usize,
        molecule: &MoleculeGraph,
        rings: &RingSet,
        adjacency: &HashMap<usize, Vec<usize>>,
        known_pairs: &mut HashSet<(usize, usize)>,
        tree_depth: usize,
    ) -> Vec<Fragment> {
        let bond = molecule.bond(bond_id);
        let bond_set = current.bond_id_set();
        let energy = self.energies.lookup(bond, molecule);
        let mut parts = Vec::new();

        if let Some(ring) = rings.intact_ring_with_bond(bond_id, &bond_set) {
            for &ring_bond_id in &ring.bond_ids {
                if ring_bond_id == bond_id {
                    continue;
                }
                let pair = (
                    bond_id.min(ring_bond_id),
                    bond_id.max(ring_bond_id),
                );
                if !known_pairs.insert(pair) {
                    continue;
                }
                let ring_energy = self.energies.lookup(molecule.bond(ring_bond_id), molecule);
                let cost = energy + ring_energy;

                for start in [bond.atoms.0, bond.atoms.1] {
                    let traversal =
                        traverse(molecule, adjacency, start, &[bond_id, ring_bond_id], &self.atom_masses);
                    if let Some(fragment) =
                        self.accept_candidate(current, traversal, start, cost, tree_depth, molecule)
                    {
                        parts.push(fragment);
                    }
                }
            }
        } else {
            for start in [bond.atoms.0, bond.atoms.1] {
                let traversal = traverse(molecule, adjacency, start, &[bond_id], &self.atom_masses);
                if let Some(fragment) =
                    self.accept_candidate(current, traversal, start, energy, tree_depth, molecule)
                {
                    parts.push(fragment);
                }
            }
        }

        parts
    }

    /// Filters a traversal result: non-empty, has bonds, is a proper
    /// subgraph, heavy enough to possibly explain a peak, and not a
    /// formula-duplicate of an already retained fragment.
    fn accept_candidate(
        &mut self,
        current: &Fragment,
        traversal: Traversal,
        start_atom: usize,
        cost: f64,
        tree_depth: usize,
        molecule: &MoleculeGraph,
    ) -> Option<Fragment> {
        let mut atom_ids = traversal.atoms;
        if !traversal.atom_set.contains(&start_atom) {
            atom_ids.insert(0, start_atom);
        }
        if atom_ids.is_empty() || traversal.bonds.is_empty() {
            return None;
        }
        // a split that kept every atom did not split anything
        if atom_ids.len() == current.atom_ids.len() {
            return None;
        }
        if !self.is_heavy_enough(traversal.mass) {
            return None;
        }

        let fragment = Fragment {
            atom_ids,
            bond_ids: traversal.bonds,
            mass: traversal.mass,
            bond_energy: current.bond_energy + cost,
            tree_depth,
            neutral_loss: current.neutral_loss.clone(),
        };
        let formula = fragment.sum_formula(molecule);
        if self.dedup.check_and_insert(&formula, &fragment) {
            return None;
        }
        Some(fragment)
    }

    /// A fragment is worth keeping only if its adjusted mass can still reach
    /// the lightest observed peak within tolerance.
    fn is_heavy_enough(&self, mass: f64) -> bool {
        let proton = MASS_HYDROGEN * self.config.mode as f64;
        let min = self.min_weight
            - (self.config.mzabs + ppm_deviation(self.min_weight, self.config.mzppm));
        mass + proton > min
    }

    /// Attempts every mode-compatible neutral-loss rule on a fragment. On
    /// the intact molecule (`initial`) all rules are tried; afterwards a
    /// rule fires only when the loss is elementally feasible and the
    /// resulting mass falls within tolerance of at least one observed peak.
    fn add_neutral_losses(
        &mut self,
        fragment: &Fragment,
        molecule: &MoleculeGraph,
        rings: &RingSet,
        initial: bool,
        depth: usize,
    ) -> Vec<Fragment> {
        let counts = molecule.element_counts(&fragment.atom_ids);
        let adjusted = fragment.mass + MASS_HYDROGEN * self.config.mode as f64;
        let post = PostProcessor::new(molecule, rings);
        let catalog = self.catalog;
        let mut losses = Vec::new();

        for rule in &catalog.rules {
            if !rule.applies_to_mode(self.config.mode) {
                continue;
            }
            if !initial {
                let feasible =
                    is_possible_neutral_loss(&counts, &rule.elemental_composition.elements);
                let explains_peak = self.peaks.iter().any(|peak| {
                    let tol = self.config.mzabs + ppm_deviation(peak.mass, self.config.mzppm);
                    let loss_mass = adjusted - rule.exact_mass;
                    loss_mass >= peak.mass - tol && loss_mass <= peak.mass + tol
                });
                if !feasible || !explains_peak {
                    continue;
                }
            }

            for mut nl_fragment in post.process(fragment, rule, &self.atom_masses) {
                // lighter than the smallest peak, cannot explain anything
                if nl_fragment.mass < self.min_weight {
                    continue;
                }
                nl_fragment.bond_energy = fragment.bond_energy + NEUTRAL_LOSS_ENERGY;
                nl_fragment.tree_depth = depth;
                nl_fragment.neutral_loss = Some(rule.elemental_composition.formula.clone());

                let formula = nl_fragment.sum_formula(molecule);
                self.dedup.insert(&formula, &nl_fragment);
                losses.push(nl_fragment);
            }
        }

        losses
    }
}

/// Collects all bonds reachable from `start` without crossing the excluded
/// bonds, accumulating member atoms and their masses. Recursion stops at
/// atoms with a single incident bond.
fn traverse(
    molecule: &MoleculeGraph,
    adjacency: &HashMap<usize, Vec<usize>>,
    start: usize,
    excluded: &[usize],
    atom_masses: &HashMap<String, f64>,
) -> Traversal {
    let mut traversal = Traversal::new();
    visit(molecule, adjacency, start, excluded, atom_masses, &mut traversal);
    traversal
}

fn visit(
    molecule: &MoleculeGraph,
    adjacency: &HashMap<usize, Vec<usize>>,
    atom_id: usize,
    excluded: &[usize],
    atom_masses: &HashMap<String, f64>,
    traversal: &mut Traversal,
) {
    let Some(incident) = adjacency.get(&atom_id) else {
        return;
    };
    for &bond_id in incident {
        if excluded.contains(&bond_id) || traversal.bond_set.contains(&bond_id) {
            continue;
        }
        traversal.bond_set.insert(bond_id);
        traversal.bonds.push(bond_id);

        let bond = molecule.bond(bond_id);
        for endpoint in [bond.atoms.0, bond.atoms.1] {
            if traversal.atom_set.insert(endpoint) {
                traversal.atoms.push(endpoint);
                traversal.mass += atom_masses[&molecule.atom(endpoint).symbol];
            }
        }

        let next = bond.partner(atom_id);
        // dead ends need no recursion
        if adjacency.get(&next).map_or(0, |bonds| bonds.len()) == 1 {
            continue;
        }
        visit(molecule, adjacency, next, excluded, atom_masses, traversal);
    }
}
