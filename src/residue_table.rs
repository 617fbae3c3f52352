//! Fixed constant tables: residue monoisotopic masses, elemental constants, and the canonical
//! monosaccharide name set. All values are read-only and match the reference corpus exactly.

/// Monoisotopic mass of a proton.
pub const PROTON: f64 = 1.007_277;
/// Monoisotopic mass of a hydrogen atom.
pub const H: f64 = 1.007_825;
/// Monoisotopic mass of an oxygen atom.
pub const O: f64 = 15.994_914_63;

/// Look up the monoisotopic mass of a one-letter residue code. `X`, the gap marker, has mass
/// zero. Returns `None` if the code is not in the canonical alphabet.
pub fn residue_mass(code: char) -> Option<f64> {
    let code = code.to_ascii_uppercase();
    RESIDUE_MASSES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, mass)| *mass)
}

/// Whether `code` names a residue in the canonical alphabet (including the gap marker `X`).
pub fn is_known_residue(code: char) -> bool {
    residue_mass(code).is_some()
}

const RESIDUE_MASSES: [(char, f64); 23] = [
    ('A', 71.037_114),
    ('R', 156.101_111),
    ('N', 114.042_927),
    ('D', 115.026_943),
    ('C', 103.009_185),
    ('E', 129.042_593),
    ('Q', 128.058_578),
    ('G', 57.021_464),
    ('H', 137.058_912),
    ('I', 113.084_064),
    ('L', 113.084_064),
    ('K', 128.094_963),
    ('M', 131.040_485),
    ('F', 147.068_414),
    ('P', 97.052_764),
    ('S', 87.032_028),
    ('T', 101.047_679),
    ('U', 255.158_29),
    ('W', 186.079_313),
    ('Y', 163.063_32),
    ('V', 99.068_414),
    ('X', 0.0),
    ('O', 150.037_94),
];

/// The canonical set of monosaccharide names recognized by the glycan validator (§4.3, §6).
pub const MONOSACCHARIDES: [&str; 10] = [
    "HexNAcS", "HexNAc", "NeuAc", "NeuGc", "HexS", "HexP", "dHex", "Hex", "Fuc", "Pen",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_residues() {
        assert_eq!(residue_mass('A'), Some(71.037_114));
        assert_eq!(residue_mass('a'), Some(71.037_114));
        assert_eq!(residue_mass('X'), Some(0.0));
        assert_eq!(residue_mass('B'), None);
        assert!(is_known_residue('O'));
        assert!(!is_known_residue('Z'));
    }

    #[test]
    fn monosaccharides_are_longest_first_within_shared_prefixes() {
        // HexNAcS must be tried before HexNAc and Hex, else greedy matching would
        // stop short and leave a dangling "S" unconsumed.
        assert!(MONOSACCHARIDES.iter().position(|s| *s == "HexNAcS").unwrap()
            < MONOSACCHARIDES.iter().position(|s| *s == "HexNAc").unwrap());
        assert!(MONOSACCHARIDES.iter().position(|s| *s == "HexNAc").unwrap()
            < MONOSACCHARIDES.iter().position(|s| *s == "Hex").unwrap());
    }
}
