use serde::{Deserialize, Serialize};

use crate::chemistry::constants::MASS_HYDROGEN;
use crate::fragmentation::fragmenter::Fragment;
use crate::molecule::graph::MoleculeGraph;
use crate::spectra::peak::{ppm_deviation, Peak};

/// Penalty booked per hydrogen unit of adjustment, equivalent to an extra
/// H-C bond.
pub const HYDROGEN_PENALTY: f64 = 1000.0;

/// A fragment explaining an observed peak.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PeakMatch {
    pub peak: Peak,
    pub fragment: Fragment,
    pub matched_mass: f64,
    pub sum_formula: String,
    pub hydrogen_penalty: f64,
    pub bond_energy: f64,
    pub neutral_change: String,
}

/// Matches every observed peak against the fragment pool, allowing a
/// bounded number of hydrogen gains or losses per fragment.
#[derive(Debug, Default)]
pub struct FragmentPeakAssigner {
    hits: Vec<PeakMatch>,
    all_hits: Vec<PeakMatch>,
}

impl FragmentPeakAssigner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Best match per peak: the first found, replaced only by a later match
    /// with a strictly lower hydrogen penalty. Unmatched peaks are absent.
    pub fn hits(&self) -> &[PeakMatch] {
        &self.hits
    }

    /// Every match recorded, for inspection.
    pub fn all_hits(&self) -> &[PeakMatch] {
        &self.all_hits
    }

    pub fn assign_fragment_peaks(
        &mut self,
        fragments: &[Fragment],
        molecule: &MoleculeGraph,
        peaks: &[Peak],
        mzabs: f64,
        mzppm: f64,
    ) {
        self.hits.clear();
        self.all_hits.clear();

        for peak in peaks {
            let mut have_found_a_match = false;
            for fragment in fragments {
                let Some((matched_mass, hydrogen_penalty, hydrogens_added)) =
                    match_by_mass(fragment, peak.mass, mzabs, mzppm)
                else {
                    continue;
                };
                let matched = PeakMatch {
                    peak: *peak,
                    fragment: fragment.clone(),
                    matched_mass,
                    sum_formula: fragment.sum_formula(molecule),
                    hydrogen_penalty,
                    bond_energy: fragment.bond_energy,
                    neutral_change: neutral_change(fragment, hydrogens_added),
                };
                self.all_hits.push(matched.clone());

                if !have_found_a_match {
                    self.hits.push(matched);
                    have_found_a_match = true;
                } else if self
                    .hits
                    .last()
                    .map_or(false, |best| hydrogen_penalty < best.hydrogen_penalty)
                {
                    self.hits.pop();
                    self.hits.push(matched);
                }
            }
        }
    }
}

/// Tries hydrogen adjustments from 0 up to the fragment's tree depth, the
/// smallest matching count wins. Returns the matched mass, the penalty and
/// the signed hydrogen count.
fn match_by_mass(
    fragment: &Fragment,
    peak_mass: f64,
    mzabs: f64,
    mzppm: f64,
) -> Option<(f64, f64, i32)> {
    let tolerance = mzabs + ppm_deviation(peak_mass, mzppm);
    let peak_low = peak_mass - tolerance;
    let peak_high = peak_mass + tolerance;

    for i in 0..=fragment.tree_depth as i32 {
        let h_mass = i as f64 * MASS_HYDROGEN;

        if fragment.mass + h_mass >= peak_low && fragment.mass + h_mass <= peak_high {
            return Some((round4(fragment.mass + h_mass), i as f64 * HYDROGEN_PENALTY, i));
        }
        if fragment.mass - h_mass >= peak_low && fragment.mass - h_mass <= peak_high {
            return Some((round4(fragment.mass - h_mass), i as f64 * HYDROGEN_PENALTY, -i));
        }
    }
    None
}

fn round4(mass: f64) -> f64 {
    (mass * 1e4).round() / 1e4
}

/// Annotation combining the neutral-loss label and the signed hydrogen
/// adjustment, e.g. "-H2O +2H".
fn neutral_change(fragment: &Fragment, hydrogens_added: i32) -> String {
    let loss = fragment
        .neutral_loss
        .as_ref()
        .map(|l| format!("-{} ", l))
        .unwrap_or_default();
    let sign = if hydrogens_added < 0 { "-" } else { "+" };

    match hydrogens_added.abs() {
        0 => loss.trim_end().to_string(),
        1 => format!("{}{}H", loss, sign),
        n => format!("{}{}{}H", loss, sign, n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::molecule::graph::Atom;

    fn fragment(mass: f64, tree_depth: usize, bond_energy: f64) -> Fragment {
        Fragment {
            atom_ids: vec![0],
            bond_ids: vec![],
            mass,
            bond_energy,
            tree_depth,
            neutral_loss: None,
        }
    }

    fn carbon() -> MoleculeGraph {
        MoleculeGraph::new(vec![Atom::new(0, "C")], vec![])
    }

    #[test]
    fn test_exact_match_needs_no_hydrogens() {
        let frag = fragment(100.0, 2, 0.0);
        let (mass, penalty, hydrogens) = match_by_mass(&frag, 100.0, 0.01, 10.0).unwrap();
        assert_eq!(mass, 100.0);
        assert_eq!(penalty, 0.0);
        assert_eq!(hydrogens, 0);
    }

    #[test]
    fn test_hydrogen_adjustment_is_bounded_by_tree_depth() {
        // two hydrogens short of the peak
        let frag = fragment(100.0 - 2.0 * MASS_HYDROGEN, 1, 0.0);
        assert!(match_by_mass(&frag, 100.0, 0.01, 10.0).is_none());

        let deeper = fragment(100.0 - 2.0 * MASS_HYDROGEN, 2, 0.0);
        let (_, penalty, hydrogens) = match_by_mass(&deeper, 100.0, 0.01, 10.0).unwrap();
        assert_eq!(penalty, 2000.0);
        assert_eq!(hydrogens, 2);
    }

    #[test]
    fn test_hydrogen_loss_is_signed_negative() {
        let frag = fragment(100.0 + MASS_HYDROGEN, 2, 0.0);
        let (_, penalty, hydrogens) = match_by_mass(&frag, 100.0, 0.01, 10.0).unwrap();
        assert_eq!(penalty, 1000.0);
        assert_eq!(hydrogens, -1);
    }

    #[test]
    fn test_zero_adjustment_match_is_preferred() {
        let molecule = carbon();
        let peaks = vec![Peak::new(100.0, 50.0)];
        let exact = fragment(100.0, 2, 0.0);
        let adjusted = fragment(100.0 + MASS_HYDROGEN, 2, 0.0);

        // regardless of pool order, the zero-penalty match ends up best
        for pool in [vec![exact.clone(), adjusted.clone()], vec![adjusted, exact]] {
            let mut assigner = FragmentPeakAssigner::new();
            assigner.assign_fragment_peaks(&pool, &molecule, &peaks, 0.01, 10.0);
            assert_eq!(assigner.hits().len(), 1);
            assert_eq!(assigner.hits()[0].hydrogen_penalty, 0.0);
            assert_eq!(assigner.all_hits().len(), 2);
        }
    }

    #[test]
    fn test_equal_penalty_keeps_the_earlier_match() {
        let molecule = carbon();
        let peaks = vec![Peak::new(100.0, 50.0)];
        let first = fragment(100.0, 2, 348.0);
        let second = fragment(100.001, 2, 700.0);

        let mut assigner = FragmentPeakAssigner::new();
        assigner.assign_fragment_peaks(&[first, second], &molecule, &peaks, 0.01, 10.0);
        assert_eq!(assigner.hits().len(), 1);
        assert_eq!(assigner.hits()[0].bond_energy, 348.0);
    }

    #[test]
    fn test_unmatched_peaks_are_absent_from_hits() {
        let molecule = carbon();
        let peaks = vec![Peak::new(100.0, 50.0), Peak::new(500.0, 10.0)];
        let pool = vec![fragment(100.0, 2, 0.0)];

        let mut assigner = FragmentPeakAssigner::new();
        assigner.assign_fragment_peaks(&pool, &molecule, &peaks, 0.01, 10.0);
        assert_eq!(assigner.hits().len(), 1);
        assert_eq!(assigner.hits()[0].peak.mass, 100.0);
    }

    #[test]
    fn test_neutral_change_annotation() {
        let mut frag = fragment(100.0, 2, 500.0);
        frag.neutral_loss = Some("H2O".to_string());
        assert_eq!(neutral_change(&frag, 0), "-H2O");
        assert_eq!(neutral_change(&frag, 2), "-H2O +2H");
        assert_eq!(neutral_change(&frag, -1), "-H2O -H");
        frag.neutral_loss = None;
        assert_eq!(neutral_change(&frag, 0), "");
        assert_eq!(neutral_change(&frag, 1), "+H");
    }
}
