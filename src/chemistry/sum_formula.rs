use std::collections::HashMap;

use itertools::Itertools;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::chemistry::elements::atomic_weights_mono_isotopic;
use crate::error::FragmentationError;

/// A parsed sum formula, e.g. "H2O" or "C6H12O6".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SumFormula {
    pub formula: String,
    pub elements: HashMap<String, i32>,
}

impl SumFormula {
    pub fn new(formula: &str) -> Result<Self, FragmentationError> {
        let elements = parse_formula(formula)?;
        Ok(SumFormula {
            formula: formula.to_string(),
            elements,
        })
    }

    /// Monoisotopic weight of the formula.
    ///
    /// # Example
    ///
    /// ```
    /// use msfrag::chemistry::sum_formula::SumFormula;
    ///
    /// let sum_formula = SumFormula::new("H2O").unwrap();
    /// assert!((sum_formula.monoisotopic_weight() - 18.01056468403).abs() < 1e-9);
    /// ```
    pub fn monoisotopic_weight(&self) -> f64 {
        monoisotopic_mass(&self.elements)
    }
}

/// Parse a chemical formula into a map of elements and their counts.
///
/// # Example
///
/// ```
/// use msfrag::chemistry::sum_formula::parse_formula;
///
/// let elements = parse_formula("H2O").unwrap();
/// assert_eq!(elements.get("H"), Some(&2));
/// assert_eq!(elements.get("O"), Some(&1));
/// ```
pub fn parse_formula(formula: &str) -> Result<HashMap<String, i32>, FragmentationError> {
    let atomic_weights = atomic_weights_mono_isotopic();
    let re = Regex::new(r"([A-Z][a-z]?)(\d*)").unwrap();
    let mut element_counts = HashMap::new();
    let mut matched_len = 0;

    for caps in re.captures_iter(formula) {
        let symbol = caps.get(1).unwrap().as_str();
        let digits = caps.get(2).unwrap().as_str();
        if !atomic_weights.contains_key(symbol) {
            return Err(FragmentationError::UnknownElement(symbol.to_string()));
        }
        let count = digits.parse::<i32>().unwrap_or(1);
        *element_counts.entry(symbol.to_string()).or_insert(0) += count;
        matched_len += symbol.len() + digits.len();
    }

    if matched_len != formula.len() {
        return Err(FragmentationError::UnknownElement(formula.to_string()));
    }

    Ok(element_counts)
}

/// Monoisotopic mass of an element-count map. All elements must be known,
/// which holds for any map produced by `parse_formula`.
pub fn monoisotopic_mass(elements: &HashMap<String, i32>) -> f64 {
    let atomic_weights = atomic_weights_mono_isotopic();
    elements.iter().fold(0.0, |acc, (element, count)| {
        acc + atomic_weights[element.as_str()] * *count as f64
    })
}

/// Hill-system formula string: carbon first, then hydrogen, then the rest
/// alphabetically; without carbon the whole formula is alphabetical.
pub fn hill_formula_string(elements: &HashMap<String, i32>) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut push = |symbol: &str, count: i32| {
        if count == 1 {
            parts.push(symbol.to_string());
        } else if count > 1 {
            parts.push(format!("{}{}", symbol, count));
        }
    };

    if elements.contains_key("C") {
        push("C", elements["C"]);
        if let Some(&h) = elements.get("H") {
            push("H", h);
        }
        for symbol in elements.keys().sorted() {
            if symbol != "C" && symbol != "H" {
                push(symbol, elements[symbol]);
            }
        }
    } else {
        for symbol in elements.keys().sorted() {
            push(symbol, elements[symbol]);
        }
    }

    parts.join("")
}

/// Whether `loss` can be subtracted from `elements` without any element
/// count going negative.
pub fn is_possible_neutral_loss(elements: &HashMap<String, i32>, loss: &HashMap<String, i32>) -> bool {
    loss.iter().all(|(element, count)| {
        elements.get(element).map_or(false, |have| have >= count)
    })
}
