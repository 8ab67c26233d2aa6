use serde::{Deserialize, Serialize};

use crate::chemistry::sum_formula::SumFormula;
use crate::error::FragmentationError;

/// Characteristic small-molecule losses with their matching rules. Rows
/// starting with '#' are disabled. Columns: ion mode, exact mass difference,
/// topological fragment, elemental composition, hydrogen difference,
/// furthest search distance, anchor atom, hydrogens required on the anchor.
const LOSSES_TABLE: &str = "Ion Mode\tExact DM\tTopological fragment\tElemental Composition\tH-Difference\tFurthest Distance\tAtom to start\tHydrogen Connected to Start Atom
+ -\t18.01056\tOH\tH2O\t-1\t3\tO\t1
+\t46.00548\tCOOH\tHCOOH\t-1\t3\tO\t0
+ -\t17.02655\tNH2\tNH3\t-1\t3\tN\t2
+ -\t27.01090\tCN\tHCN\t-1\t3\tN\t0
+ -\t30.01056\tCOH\tCH2O\t-1\t3\tO\t0
#+ -\t27.99491\tCOH\tCO\t1\t3\tO\t0
#+ -\t43.98983\tCOOH\tCO2\t1\t3\tO\t0
#-\t79.95681\tSO3H\tSO3\t1\t3\tS\t0
#+ -\t162.05282\tC6H11O5\tC6H10O5\t1\t6\tO\t0";

/// A single neutral-loss rule. `mode` is `+1`, `-1`, or `0` for both
/// polarities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeutralLossRule {
    pub mode: i32,
    pub exact_mass: f64,
    pub topo_fragment: SumFormula,
    pub elemental_composition: SumFormula,
    pub hydrogen_difference: i32,
    pub distance: usize,
    pub atom_to_start: String,
    pub hydrogen_on_start_atom: i32,
}

impl NeutralLossRule {
    pub fn applies_to_mode(&self, mode: i32) -> bool {
        self.mode == mode || self.mode == 0
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NeutralLossCatalog {
    pub rules: Vec<NeutralLossRule>,
}

impl NeutralLossCatalog {
    /// Parses the built-in loss table. Any malformed row is fatal; the
    /// catalog must be valid before fragmentation begins.
    pub fn standard() -> Result<Self, FragmentationError> {
        Self::parse(LOSSES_TABLE)
    }

    pub fn parse(table: &str) -> Result<Self, FragmentationError> {
        let mut rules = Vec::new();

        for (index, line) in table.lines().enumerate().skip(1) {
            if line.starts_with('#') || line.trim().is_empty() {
                continue;
            }
            rules.push(Self::parse_line(line).map_err(|reason| {
                FragmentationError::NeutralLossTable {
                    line: index + 1,
                    reason,
                }
            })?);
        }

        Ok(NeutralLossCatalog { rules })
    }

    fn parse_line(line: &str) -> Result<NeutralLossRule, String> {
        let columns: Vec<&str> = line.split('\t').collect();
        if columns.len() < 8 {
            return Err(format!("expected 8 columns, found {}", columns.len()));
        }

        let mode = match columns[0] {
            "+ -" => 0,
            "-" => -1,
            _ => 1,
        };
        let exact_mass = columns[1]
            .parse::<f64>()
            .map_err(|e| format!("exact mass: {}", e))?;
        let topo_fragment =
            SumFormula::new(columns[2]).map_err(|e| format!("topological fragment: {}", e))?;
        let elemental_composition =
            SumFormula::new(columns[3]).map_err(|e| format!("elemental composition: {}", e))?;
        let hydrogen_difference = columns[4]
            .parse::<i32>()
            .map_err(|e| format!("hydrogen difference: {}", e))?;
        let distance = columns[5]
            .parse::<usize>()
            .map_err(|e| format!("distance: {}", e))?;
        let atom_to_start = columns[6].to_string();
        let hydrogen_on_start_atom = columns[7]
            .parse::<i32>()
            .map_err(|e| format!("hydrogens on start atom: {}", e))?;

        Ok(NeutralLossRule {
            mode,
            exact_mass,
            topo_fragment,
            elemental_composition,
            hydrogen_difference,
            distance,
            atom_to_start,
            hydrogen_on_start_atom,
        })
    }
}
