use std::collections::HashMap;

/// Exact monoisotopic masses for the elements the fragmentation chemistry
/// can encounter. Symbols absent from this table (placeholders like "R" or
/// "X") have no resolvable mass and make a candidate unusable for matching.
pub fn atomic_weights_mono_isotopic() -> HashMap<&'static str, f64> {
    let mut map = HashMap::new();
    map.insert("H", 1.00782503223);
    map.insert("He", 4.00260325415);
    map.insert("Li", 7.0160034366);
    map.insert("Be", 9.012183065);
    map.insert("B", 11.00930536);
    map.insert("C", 12.0000000);
    map.insert("N", 14.00307400443);
    map.insert("O", 15.99491461957);
    map.insert("F", 18.99840316273);
    map.insert("Na", 22.9897692820);
    map.insert("Mg", 23.985041697);
    map.insert("Al", 26.98153853);
    map.insert("Si", 27.97692653465);
    map.insert("P", 30.97376199842);
    map.insert("S", 31.9720711744);
    map.insert("Cl", 34.968852682);
    map.insert("K", 38.963706679);
    map.insert("Ca", 39.96259098);
    map.insert("Fe", 55.9349375);
    map.insert("Ni", 57.9353429);
    map.insert("Cu", 62.9295975);
    map.insert("Zn", 63.9291422);
    map.insert("Ge", 73.9211778);
    map.insert("As", 74.9215965);
    map.insert("Se", 79.9165218);
    map.insert("Br", 78.9183376);
    map.insert("Sn", 119.902199);
    map.insert("Sb", 120.903818);
    map.insert("Te", 129.906224);
    map.insert("I", 126.904473);
    map.insert("Pb", 207.976627);
    map
}
