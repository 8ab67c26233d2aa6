use serde::{Deserialize, Serialize};

use crate::scoring::scorer;
use crate::spectra::assigner::PeakMatch;
use crate::spectra::peak::Peak;

/// Everything known about one candidate molecule after matching: the best
/// match per explained peak, the full match list for inspection, and the
/// total bond-dissociation energy of the unfragmented molecule.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResultRow {
    pub id: String,
    pub hits: Vec<PeakMatch>,
    pub all_hits: Vec<PeakMatch>,
    pub total_bond_energy: f64,
}

impl ResultRow {
    pub fn new(
        id: String,
        hits: Vec<PeakMatch>,
        all_hits: Vec<PeakMatch>,
        total_bond_energy: f64,
    ) -> Self {
        ResultRow {
            id,
            hits,
            all_hits,
            total_bond_energy,
        }
    }

    /// Similarity score of this candidate against the observed spectrum.
    pub fn score(&self, spectrum_peaks: &[Peak]) -> f64 {
        let matched: Vec<(f64, f64, f64)> = self
            .hits
            .iter()
            .map(|m| {
                (
                    m.peak.mass,
                    m.peak.intensity,
                    m.bond_energy + m.hydrogen_penalty,
                )
            })
            .collect();
        scorer::score(spectrum_peaks, &matched, self.total_bond_energy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragmentation::fragmenter::Fragment;

    fn match_for(peak: Peak, bond_energy: f64, hydrogen_penalty: f64) -> PeakMatch {
        PeakMatch {
            peak,
            fragment: Fragment {
                atom_ids: vec![0],
                bond_ids: vec![],
                mass: peak.mass,
                bond_energy,
                tree_depth: 1,
                neutral_loss: None,
            },
            matched_mass: peak.mass,
            sum_formula: "CH2".to_string(),
            hydrogen_penalty,
            bond_energy,
            neutral_change: String::new(),
        }
    }

    #[test]
    fn test_score_includes_hydrogen_penalty() {
        let peaks = vec![Peak::new(20.0, 100.0), Peak::new(50.0, 200.0)];
        let row = ResultRow::new(
            "0".to_string(),
            vec![match_for(peaks[0], 10.0, 5.0)],
            vec![],
            100.0,
        );
        // 10 energy + 5 penalty behaves like a single 15-unit cost
        assert!((row.score(&peaks) - 3.44365572617687).abs() < 1e-6);
    }

    #[test]
    fn test_unmatched_candidate_scores_zero() {
        let peaks = vec![Peak::new(20.0, 100.0)];
        let row = ResultRow::new("0".to_string(), vec![], vec![], 100.0);
        assert_eq!(row.score(&peaks), 0.0);
    }
}
