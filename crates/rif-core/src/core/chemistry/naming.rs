use phf::{Map, phf_map};

/// Residue name to the code used when grouping equivalent rotamers.
///
/// D-amino acids map to themselves so they never group with their L forms.
static ONE_LETTER_CODES: Map<&'static str, &'static str> = phf_map! {
    "ALA" => "A", "CYS" => "C", "ASP" => "D", "GLU" => "E", "PHE" => "F",
    "GLY" => "G", "HIS" => "H", "HIS_D" => "H", "ILE" => "I", "LYS" => "K",
    "LEU" => "L", "MET" => "M", "ASN" => "N", "PRO" => "P", "GLN" => "Q",
    "ARG" => "R", "SER" => "S", "THR" => "T", "VAL" => "V", "TRP" => "W",
    "TYR" => "Y",
    "ADE" => "a", "CYT" => "c", "GUA" => "g", "THY" => "t", "RAD" => "a",
    "RCY" => "c", "RGU" => "g", "URA" => "u", "H2O" => "w", "UNP" => "z",
    "UNK" => "Z", "VRT" => "X",
    "ala" => "A", "cys" => "C", "asp" => "D", "glu" => "E", "phe" => "F",
    "gly" => "G", "his" => "H", "his_d" => "H", "ile" => "I", "lys" => "K",
    "leu" => "L", "met" => "M", "asn" => "N", "pro" => "P", "gln" => "Q",
    "arg" => "R", "ser" => "S", "thr" => "T", "val" => "V", "trp" => "W",
    "tyr" => "Y",
    "ade" => "a", "cyt" => "c", "gua" => "g", "thy" => "t", "rad" => "a",
    "rcy" => "c", "rgu" => "g", "ura" => "u", "h2o" => "w", "unp" => "z",
    "unk" => "Z", "vrt" => "X",
    "DAL" => "DAL", "DCS" => "DCS", "DAS" => "DAS", "DGU" => "DGU", "DPH" => "DPH",
    "DHI" => "DHI", "DIL" => "DIL", "DLY" => "DLY", "DLE" => "DLE", "DME" => "DME",
    "DAN" => "DAN", "DPR" => "DPR", "DGN" => "DGN", "DAR" => "DAR", "DSE" => "DSE",
    "DTH" => "DTH", "DVA" => "DVA", "DTR" => "DTR", "DTY" => "DTY",
};

static D_TO_L: Map<&'static str, &'static str> = phf_map! {
    "DAL" => "ALA", "DCS" => "CYS", "DAS" => "ASP", "DGU" => "GLU", "DPH" => "PHE",
    "DHI" => "HIS", "DIL" => "ILE", "DLY" => "LYS", "DLE" => "LEU", "DME" => "MET",
    "DAN" => "ASN", "DPR" => "PRO", "DGN" => "GLN", "DAR" => "ARG", "DSE" => "SER",
    "DTH" => "THR", "DVA" => "VAL", "DTR" => "TRP", "DTY" => "TYR",
};

/// Residues whose last chi rotates only a hydrogen.
const PROTON_CHI_RESIDUES: [&str; 4] = ["CYS", "SER", "THR", "TYR"];

/// Grouping code for a residue name; unknown names are their own code.
pub fn one_letter_code(resname: &str) -> &str {
    ONE_LETTER_CODES.get(resname).copied().unwrap_or(resname)
}

pub fn is_d_residue(resname: &str) -> bool {
    D_TO_L.contains_key(resname)
}

/// L-equivalent of a D residue name, or `None` for anything else.
pub fn l_equivalent(resname: &str) -> Option<&'static str> {
    D_TO_L.get(resname).copied()
}

/// D-equivalent of an L residue name. Names without a D form map to themselves.
pub fn d_equivalent(resname: &str) -> &str {
    D_TO_L
        .entries()
        .find(|(_, l)| **l == resname)
        .map(|(d, _)| *d)
        .unwrap_or(resname)
}

/// Number of proton chis a residue carries by default.
pub fn default_proton_chi_count(resname: &str) -> usize {
    // D residues share the proton chi of their L form; one table serves both.
    let canonical = l_equivalent(resname).unwrap_or(resname);
    usize::from(PROTON_CHI_RESIDUES.contains(&canonical))
}

/// First chi that distinguishes structurally different rotamers: isoleucine
/// branches at chi 1, everything else at chi 2.
pub fn same_struct_start_chi(resname: &str) -> usize {
    if resname == "ILE" || resname == "DIL" { 1 } else { 2 }
}
