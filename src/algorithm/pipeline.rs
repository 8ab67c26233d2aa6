use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::FragmentationError;
use crate::fragmentation::bond_energy::BondEnergyTable;
use crate::fragmentation::cancellation::CancellationToken;
use crate::fragmentation::fragmenter::{FragmentationConfig, Fragmenter};
use crate::fragmentation::neutral_loss::NeutralLossCatalog;
use crate::molecule::graph::MoleculeGraph;
use crate::molecule::ring::RingSet;
use crate::results::result_row::ResultRow;
use crate::spectra::assigner::FragmentPeakAssigner;
use crate::spectra::peak::{clean_peak_list, Peak};

/// One candidate: its graph and the ring set perceived on it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CandidateMolecule {
    pub id: String,
    pub molecule: MoleculeGraph,
    pub rings: RingSet,
}

/// Fragments one candidate and matches its pool against the spectrum.
/// Returns `Ok(None)` for candidates that yield no fragments (unresolvable
/// atom masses); such candidates are skipped, not failed.
pub fn process_candidate(
    candidate: &CandidateMolecule,
    peaks: &[Peak],
    config: FragmentationConfig,
    energies: &BondEnergyTable,
    catalog: &NeutralLossCatalog,
    cancel: &CancellationToken,
) -> Result<Option<ResultRow>, FragmentationError> {
    let mut fragmenter = Fragmenter::new(peaks, config, energies, catalog);
    let fragments = fragmenter.generate_fragments(&candidate.molecule, &candidate.rings, cancel)?;
    if fragments.is_empty() {
        debug!(id = %candidate.id, "candidate yielded no fragments, skipping");
        return Ok(None);
    }

    // peaks at or above the precursor mass cannot be explained
    let cleaned = match candidate.molecule.exact_mass() {
        Some(exact_mass) => clean_peak_list(peaks, exact_mass),
        None => return Ok(None),
    };

    let mut assigner = FragmentPeakAssigner::new();
    assigner.assign_fragment_peaks(
        &fragments,
        &candidate.molecule,
        &cleaned,
        config.mzabs,
        config.mzppm,
    );

    let total_bond_energy = energies.total_bond_energy(&candidate.molecule);
    Ok(Some(ResultRow::new(
        candidate.id.clone(),
        assigner.hits().to_vec(),
        assigner.all_hits().to_vec(),
        total_bond_energy,
    )))
}

/// Processes candidates on a dedicated thread pool, one candidate per task.
/// The lookup tables are shared read-only; each candidate run is fully
/// independent and deterministic. The first cancellation aborts the batch.
pub fn process_candidates(
    candidates: &[CandidateMolecule],
    peaks: &[Peak],
    config: FragmentationConfig,
    num_threads: usize,
    energies: &BondEnergyTable,
    catalog: &NeutralLossCatalog,
    cancel: &CancellationToken,
) -> Result<Vec<ResultRow>, FragmentationError> {
    let pool = ThreadPoolBuilder::new().num_threads(num_threads).build().unwrap();
    let rows: Result<Vec<Option<ResultRow>>, FragmentationError> = pool.install(|| {
        candidates
            .par_iter()
            .map(|candidate| process_candidate(candidate, peaks, config, energies, catalog, cancel))
            .collect()
    });
    Ok(rows?.into_iter().flatten().collect())
}
