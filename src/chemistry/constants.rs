// Purpose: To store constants that are used in the program
pub const MASS_PROTON: f64 = 1.007276466621; // Unified atomic mass unit
pub const MASS_NEUTRON: f64 = 1.00866491595; // Unified atomic mass unit
pub const MASS_ELECTRON: f64 = 0.00054857990946; // Unified atomic mass unit
pub const MASS_HYDROGEN: f64 = 1.00782503223; // Monoisotopic H, used for hydrogen adjustments
pub const MASS_WATER: f64 = 18.0105646863; // Unified atomic mass unit
