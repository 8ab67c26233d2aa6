use ordered_float::OrderedFloat;

use crate::spectra::peak::Peak;

/// Scores how well the matched fragments explain the observed spectrum.
/// `matched` carries one `(peak mass, peak intensity, energy cost)` triple
/// per explained peak, where the energy cost is the fragment's cumulative
/// bond energy plus its hydrogen penalty. The result is in [0, 100].
pub fn score(
    spectrum_peaks: &[Peak],
    matched: &[(f64, f64, f64)],
    total_bond_energy: f64,
) -> f64 {
    if spectrum_peaks.is_empty() {
        return 0.0;
    }

    let max_intensity = spectrum_peaks
        .iter()
        .map(|p| OrderedFloat(p.intensity))
        .max()
        .map(|m| m.into_inner())
        .unwrap_or(0.0);

    let matched_total: f64 = matched
        .iter()
        .map(|&(mass, intensity, energy)| {
            weighted_intensity(mass, intensity, energy, total_bond_energy, max_intensity)
        })
        .sum();
    let spectrum_total: f64 = spectrum_peaks
        .iter()
        .map(|p| weighted_intensity(p.mass, p.intensity, 0.0, total_bond_energy, max_intensity))
        .sum();

    if spectrum_total > 0.0 {
        matched_total / spectrum_total * 100.0
    } else {
        0.0
    }
}

/// Combines mass, intensity and formation energy into the weight of one
/// peak. Heavier and more intense peaks weigh more; a match that consumed
/// the molecule's whole bond energy contributes nothing.
fn weighted_intensity(
    mass: f64,
    intensity: f64,
    energy_to_form_fragment: f64,
    total_bond_energy: f64,
    max_intensity: f64,
) -> f64 {
    let proportion_of_energy_lost = (energy_to_form_fragment / total_bond_energy).min(1.0);
    let weighted = (intensity / max_intensity * 999.0).powf(0.6) * mass.powi(3);

    weighted - weighted * proportion_of_energy_lost
}
